use crate::error::{Error, ErrorKind};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Every entity type that has its own cache table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    PackTemplate,
    CollectibleTemplate,
    Collection,
    Set,
    Page,
    Faq,
    Application,
    Homepage,
    Language,
    Tag,
}

impl EntityKind {
    /// All kinds, in the order a scheduled full resync visits them.
    pub const ALL: [EntityKind; 10] = [
        Self::Language,
        Self::Application,
        Self::Homepage,
        Self::Tag,
        Self::Faq,
        Self::Page,
        Self::PackTemplate,
        Self::CollectibleTemplate,
        Self::Collection,
        Self::Set,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PackTemplate => "pack-template",
            Self::CollectibleTemplate => "collectible-template",
            Self::Collection => "collection",
            Self::Set => "set",
            Self::Page => "page",
            Self::Faq => "faq",
            Self::Application => "application",
            Self::Homepage => "homepage",
            Self::Language => "language",
            Self::Tag => "tag",
        }
    }

    /// Name of the collection on the remote content service.
    pub fn remote_name(&self) -> &'static str {
        match self {
            Self::PackTemplate => "pack_templates",
            Self::CollectibleTemplate => "nft_templates",
            Self::Collection => "collections",
            Self::Set => "sets",
            Self::Page => "static_page",
            Self::Faq => "frequently_asked_questions",
            Self::Application => "application",
            Self::Homepage => "homepage",
            Self::Language => "languages",
            Self::Tag => "tags",
        }
    }

    pub fn from_remote_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.remote_name() == name)
    }

    /// Singletons have exactly one remote record and are fetched without a key.
    pub fn is_singleton(&self) -> bool {
        matches!(self, Self::Application | Self::Homepage)
    }

    /// Whether remote records carry a draft/published/archived status.
    pub fn has_status(&self) -> bool {
        matches!(
            self,
            Self::PackTemplate | Self::CollectibleTemplate | Self::Collection | Self::Set | Self::Faq
        )
    }

    /// Remote field holding the record's identifier.
    pub fn key_field(&self) -> &'static str {
        match self {
            Self::Language => "code",
            _ => "id",
        }
    }
}

impl FromStr for EntityKind {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(kind) = Self::from_remote_name(s) {
            return Ok(kind);
        }
        let sanitized: String = s.chars().filter(char::is_ascii_alphanumeric).collect::<String>().to_ascii_lowercase();
        Ok(match sanitized.as_str() {
            "pack" | "packs" | "packtemplate" | "packtemplates" => Self::PackTemplate,
            "collectible" | "collectibles" | "collectibletemplate" | "collectibletemplates" | "nfttemplate" => {
                Self::CollectibleTemplate
            },
            "collection" | "collections" => Self::Collection,
            "set" | "sets" => Self::Set,
            "page" | "pages" | "staticpage" => Self::Page,
            "faq" | "faqs" | "frequentlyaskedquestions" => Self::Faq,
            "application" | "app" => Self::Application,
            "homepage" | "home" => Self::Homepage,
            "language" | "languages" => Self::Language,
            "tag" | "tags" => Self::Tag,
            _ => exn::bail!(ErrorKind::UnknownKind(s.to_string())),
        })
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}
