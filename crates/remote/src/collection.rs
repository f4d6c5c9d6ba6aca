use crate::error::{Error, ErrorKind};
use mirror_content::EntityKind;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// A collection on the remote content service.
///
/// Most collections back exactly one cached [`EntityKind`]. The satellites
/// (`rarities`, `countries`) have no table of their own: their records only
/// ever reach the cache embedded in another entity's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    PackTemplates,
    NftTemplates,
    Collections,
    Sets,
    StaticPage,
    FrequentlyAskedQuestions,
    Application,
    Homepage,
    Languages,
    Tags,
    Rarities,
    Countries,
}

impl Collection {
    pub const ALL: [Collection; 12] = [
        Self::PackTemplates,
        Self::NftTemplates,
        Self::Collections,
        Self::Sets,
        Self::StaticPage,
        Self::FrequentlyAskedQuestions,
        Self::Application,
        Self::Homepage,
        Self::Languages,
        Self::Tags,
        Self::Rarities,
        Self::Countries,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PackTemplates => "pack_templates",
            Self::NftTemplates => "nft_templates",
            Self::Collections => "collections",
            Self::Sets => "sets",
            Self::StaticPage => "static_page",
            Self::FrequentlyAskedQuestions => "frequently_asked_questions",
            Self::Application => "application",
            Self::Homepage => "homepage",
            Self::Languages => "languages",
            Self::Tags => "tags",
            Self::Rarities => "rarities",
            Self::Countries => "countries",
        }
    }

    /// The cached kind this collection backs, if it isn't a satellite.
    pub fn kind(&self) -> Option<EntityKind> {
        Some(match self {
            Self::PackTemplates => EntityKind::PackTemplate,
            Self::NftTemplates => EntityKind::CollectibleTemplate,
            Self::Collections => EntityKind::Collection,
            Self::Sets => EntityKind::Set,
            Self::StaticPage => EntityKind::Page,
            Self::FrequentlyAskedQuestions => EntityKind::Faq,
            Self::Application => EntityKind::Application,
            Self::Homepage => EntityKind::Homepage,
            Self::Languages => EntityKind::Language,
            Self::Tags => EntityKind::Tag,
            Self::Rarities | Self::Countries => return None,
        })
    }

    pub fn is_satellite(&self) -> bool {
        self.kind().is_none()
    }
}

impl From<EntityKind> for Collection {
    fn from(kind: EntityKind) -> Self {
        match kind {
            EntityKind::PackTemplate => Self::PackTemplates,
            EntityKind::CollectibleTemplate => Self::NftTemplates,
            EntityKind::Collection => Self::Collections,
            EntityKind::Set => Self::Sets,
            EntityKind::Page => Self::StaticPage,
            EntityKind::Faq => Self::FrequentlyAskedQuestions,
            EntityKind::Application => Self::Application,
            EntityKind::Homepage => Self::Homepage,
            EntityKind::Language => Self::Languages,
            EntityKind::Tag => Self::Tags,
        }
    }
}

impl FromStr for Collection {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|collection| collection.as_str() == s)
            .ok_or_else(|| Error::from(ErrorKind::UnknownCollection(s.to_string())))
    }
}

impl Display for Collection {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("nft_templates", Collection::NftTemplates)]
    #[case("static_page", Collection::StaticPage)]
    #[case("rarities", Collection::Rarities)]
    #[case("countries", Collection::Countries)]
    fn test_from_str(#[case] input: &str, #[case] expected: Collection) {
        assert_eq!(input.parse::<Collection>().unwrap(), expected);
    }

    #[test]
    fn test_from_str_unknown() {
        let err = "directus_users".parse::<Collection>().unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnknownCollection(name) if name == "directus_users"));
        // Remote names only; the friendly kind aliases belong to `EntityKind`.
        assert!("collectible-template".parse::<Collection>().is_err());
    }

    #[test]
    fn test_kinds_round_trip() {
        for kind in EntityKind::ALL {
            let collection = Collection::from(kind);
            assert_eq!(collection.kind(), Some(kind));
            assert_eq!(collection.as_str(), kind.remote_name());
        }
    }

    #[test]
    fn test_satellites() {
        let satellites: Vec<_> = Collection::ALL.into_iter().filter(Collection::is_satellite).collect();
        assert_eq!(satellites, vec![Collection::Rarities, Collection::Countries]);
    }
}
