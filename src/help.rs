//! Per-culture help text storage.
//!
//! Each command carries a [`HelpCatalog`]: an ordered mapping from culture
//! identifier to help text, built once at registration time. Culture
//! identifiers follow the usual `lang` or `lang-COUNTRY` tags (ISO 639-1 and
//! ISO 3166-1 alpha-2); the empty string is the default entry.

/// Ordered mapping from culture identifier to help text.
///
/// At most one entry per culture. Lookup for a requested culture falls back to
/// the default (empty-culture) entry when no exact match exists.
#[derive(Debug, Clone, Default)]
pub struct HelpCatalog {
    entries: Vec<HelpEntry>,
}

#[derive(Debug, Clone)]
struct HelpEntry {
    culture: String,
    text: String,
}

impl HelpCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry. Returns `false` when the culture is already present
    /// (the catalog is left unchanged).
    pub(crate) fn insert(&mut self, culture: &str, text: &str) -> bool {
        if self.entries.iter().any(|e| e.culture.eq_ignore_ascii_case(culture)) {
            return false;
        }
        self.entries.push(HelpEntry {
            culture: culture.to_string(),
            text: text.to_string(),
        });
        true
    }

    /// Look up help text for a culture.
    ///
    /// Exact (case-insensitive) culture match wins; otherwise the default
    /// entry is returned; `None` when neither exists.
    pub fn lookup(&self, culture: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.culture.eq_ignore_ascii_case(culture))
            .or_else(|| self.entries.iter().find(|e| e.culture.is_empty()))
            .map(|e| e.text.as_str())
    }

    /// Whether the catalog has no entries at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered culture identifiers, in insertion order.
    pub fn cultures(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.culture.as_str())
    }
}
