//! Table layout of the cache, as seen by the query translator.
//!
//! Each table publishes a whitelist of the logical field names callers may
//! filter and sort on. Anything not listed here is unknown to the translator,
//! which keeps caller input from ever reaching SQL as an identifier.

use mirror_content::EntityKind;

/// How a column's values are stored, which decides how operands are coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    Real,
    /// Unix seconds.
    Timestamp,
    /// JSON array of strings, matched by membership.
    TagList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    /// Logical (camelCase) name exposed to callers.
    pub field: &'static str,
    /// SQL column name.
    pub column: &'static str,
    pub kind: ColumnKind,
}

impl Column {
    const fn new(field: &'static str, column: &'static str, kind: ColumnKind) -> Self {
        Self { field, column, kind }
    }

    /// Whether `name` refers to this column, in either its logical or SQL spelling.
    fn matches(&self, name: &str) -> bool {
        self.field == name || self.column == name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Table {
    pub kind: EntityKind,
    pub name: &'static str,
    pub columns: &'static [Column],
    /// The table supports the virtual, time-derived `status` field.
    pub pack_status: bool,
}

const ID: Column = Column::new("id", "id", ColumnKind::Text);
const CREATED_AT: Column = Column::new("createdAt", "created_at", ColumnKind::Timestamp);
const UPDATED_AT: Column = Column::new("updatedAt", "updated_at", ColumnKind::Timestamp);
const SLUG: Column = Column::new("slug", "slug", ColumnKind::Text);
const SORT: Column = Column::new("sort", "sort", ColumnKind::Integer);
const TAGS: Column = Column::new("tags", "tags", ColumnKind::TagList);
const COLLECTION_ID: Column = Column::new("collectionId", "collection_id", ColumnKind::Text);

static PACK_TEMPLATES: Table = Table {
    kind: EntityKind::PackTemplate,
    name: "pack_templates",
    columns: &[
        ID,
        // Packs are addressed by their template id in the domain records.
        Column::new("templateId", "id", ColumnKind::Text),
        SLUG,
        Column::new("type", "type", ColumnKind::Text),
        Column::new("price", "price", ColumnKind::Integer),
        Column::new("releasedAt", "released_at", ColumnKind::Timestamp),
        Column::new("auctionUntil", "auction_until", ColumnKind::Timestamp),
        TAGS,
        CREATED_AT,
        UPDATED_AT,
    ],
    pack_status: true,
};

static COLLECTIBLE_TEMPLATES: Table = Table {
    kind: EntityKind::CollectibleTemplate,
    name: "collectible_templates",
    columns: &[
        ID,
        Column::new("templateId", "id", ColumnKind::Text),
        COLLECTION_ID,
        Column::new("setId", "set_id", ColumnKind::Text),
        Column::new("uniqueCode", "unique_code", ColumnKind::Text),
        Column::new("totalEditions", "total_editions", ColumnKind::Integer),
        TAGS,
        CREATED_AT,
        UPDATED_AT,
    ],
    pack_status: false,
};

static COLLECTIONS: Table = Table {
    kind: EntityKind::Collection,
    name: "collections",
    columns: &[ID, SLUG, SORT, CREATED_AT, UPDATED_AT],
    pack_status: false,
};

static SETS: Table = Table {
    kind: EntityKind::Set,
    name: "sets",
    columns: &[ID, SLUG, COLLECTION_ID, SORT, CREATED_AT, UPDATED_AT],
    pack_status: false,
};

static PAGES: Table = Table {
    kind: EntityKind::Page,
    name: "pages",
    columns: &[ID, SLUG, CREATED_AT, UPDATED_AT],
    pack_status: false,
};

static FAQS: Table = Table {
    kind: EntityKind::Faq,
    name: "faqs",
    columns: &[ID, Column::new("key", "key", ColumnKind::Text), SORT, CREATED_AT, UPDATED_AT],
    pack_status: false,
};

static APPLICATION: Table = Table {
    kind: EntityKind::Application,
    name: "application",
    columns: &[ID, CREATED_AT, UPDATED_AT],
    pack_status: false,
};

static HOMEPAGE: Table = Table {
    kind: EntityKind::Homepage,
    name: "homepage",
    columns: &[ID, CREATED_AT, UPDATED_AT],
    pack_status: false,
};

static LANGUAGES: Table = Table {
    kind: EntityKind::Language,
    name: "languages",
    columns: &[
        ID,
        Column::new("code", "id", ColumnKind::Text),
        SORT,
        Column::new("label", "label", ColumnKind::Text),
        CREATED_AT,
        UPDATED_AT,
    ],
    pack_status: false,
};

static TAGS_TABLE: Table = Table {
    kind: EntityKind::Tag,
    name: "tags",
    columns: &[ID, SLUG, CREATED_AT, UPDATED_AT],
    pack_status: false,
};

impl Table {
    /// The table backing a cached entity kind.
    pub fn of(kind: EntityKind) -> &'static Table {
        match kind {
            EntityKind::PackTemplate => &PACK_TEMPLATES,
            EntityKind::CollectibleTemplate => &COLLECTIBLE_TEMPLATES,
            EntityKind::Collection => &COLLECTIONS,
            EntityKind::Set => &SETS,
            EntityKind::Page => &PAGES,
            EntityKind::Faq => &FAQS,
            EntityKind::Application => &APPLICATION,
            EntityKind::Homepage => &HOMEPAGE,
            EntityKind::Language => &LANGUAGES,
            EntityKind::Tag => &TAGS_TABLE,
        }
    }

    /// Look up a whitelisted column by logical or SQL name.
    pub fn column(&self, name: &str) -> Option<&'static Column> {
        self.columns.iter().find(|c| c.matches(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_every_kind_has_a_table() {
        for kind in EntityKind::ALL {
            let table = Table::of(kind);
            assert_eq!(table.kind, kind);
            assert!(table.column("id").is_some(), "{} is missing its id", table.name);
        }
    }

    #[rstest]
    #[case("releasedAt", Some("released_at"))]
    #[case("released_at", Some("released_at"))]
    #[case("templateId", Some("id"))]
    #[case("reserveMet", None)]
    #[case("status", None)]
    fn test_pack_template_columns(#[case] name: &str, #[case] expected: Option<&str>) {
        let table = Table::of(EntityKind::PackTemplate);
        assert_eq!(table.column(name).map(|c| c.column), expected);
    }

    #[test]
    fn test_only_pack_templates_have_status() {
        let with_status: Vec<_> = EntityKind::ALL.into_iter().filter(|k| Table::of(*k).pack_status).collect();
        assert_eq!(with_status, vec![EntityKind::PackTemplate]);
    }
}
