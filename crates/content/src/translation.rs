//! Locale selection over per-locale translation records.

use crate::error::{ErrorKind, Result};
use crate::relation::{Relation, RelationList};

/// A per-locale sub-record of some parent entity.
pub trait Translation {
    /// The locale code this record is written in (`languages_code` remotely).
    fn locale(&self) -> Option<&str>;
}

/// Pick the translation for `locale`, falling back to the first entry.
///
/// `label` describes the parent record and is only evaluated on failure.
/// Failure means the relation was not expanded when the record was fetched,
/// or the parent genuinely has no translations; either way the record can't
/// be mapped.
pub fn resolve<'a, T, F>(list: Option<&'a RelationList<T>>, locale: &str, label: F) -> Result<&'a T>
where
    T: Translation,
    F: FnOnce() -> String,
{
    let items = match list {
        Some(RelationList::Items(items)) if !items.is_empty() => items,
        Some(RelationList::Count(_)) => {
            exn::bail!(ErrorKind::DataIntegrity(format!("{}: translations were not expanded", label())))
        },
        _ => exn::bail!(ErrorKind::DataIntegrity(format!("{} has no translations", label()))),
    };
    let exact = items.iter().filter_map(Relation::expanded).find(|translation| translation.locale() == Some(locale));
    if let Some(translation) = exact {
        return Ok(translation);
    }
    // No exact match: the first entry wins, whatever its locale.
    match &items[0] {
        Relation::Expanded(translation) => {
            tracing::debug!(locale, fallback = ?translation.locale(), "translation fell back to first entry");
            Ok(translation)
        },
        Relation::Id(key) => {
            exn::bail!(ErrorKind::DataIntegrity(format!("{}: translation {key} was not expanded", label())))
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Title {
        languages_code: Option<String>,
        title: String,
    }

    impl Translation for Title {
        fn locale(&self) -> Option<&str> {
            self.languages_code.as_deref()
        }
    }

    fn list(value: serde_json::Value) -> RelationList<Title> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_exact_match() {
        let translations = list(json!([
            { "languages_code": "fr-FR", "title": "Bonjour" },
            { "languages_code": "en-UK", "title": "Hello" },
        ]));
        let resolved = resolve(Some(&translations), "en-UK", || "pack".to_string()).unwrap();
        assert_eq!(resolved.title, "Hello");
    }

    #[test]
    fn test_falls_back_to_first() {
        let translations = list(json!([{ "languages_code": "fr", "title": "A" }]));
        let resolved = resolve(Some(&translations), "en", || "pack".to_string()).unwrap();
        assert_eq!(resolved.title, "A");
    }

    #[test]
    fn test_skips_unexpanded_entries_when_matching() {
        let translations = list(json!([{ "languages_code": "fr", "title": "A" }, 12]));
        let resolved = resolve(Some(&translations), "en", || "pack".to_string()).unwrap();
        assert_eq!(resolved.title, "A");
    }

    #[test]
    fn test_empty_is_integrity_error() {
        let translations = list(json!([]));
        let err = resolve(Some(&translations), "en", || "pack p1".to_string()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::DataIntegrity(message) if message == "pack p1 has no translations"));
    }

    #[test]
    fn test_missing_is_integrity_error() {
        let err = resolve::<Title, _>(None, "en", || "faq".to_string()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::DataIntegrity(_)));
    }

    #[test]
    fn test_count_is_integrity_error() {
        let translations = list(json!(3));
        let err = resolve(Some(&translations), "en", || "set s1".to_string()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::DataIntegrity(message) if message.contains("not expanded")));
    }

    #[test]
    fn test_unexpanded_fallback_is_integrity_error() {
        let translations = list(json!([4, 5]));
        let err = resolve(Some(&translations), "en", || "tag".to_string()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::DataIntegrity(message) if message == "tag: translation 4 was not expanded"));
    }
}
