use std::collections::HashMap;

/// Translates opaque model label ids (`LABEL_1`) into domain labels (`fake`).
///
/// Unknown ids pass through verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelMap {
    entries: HashMap<String, String>,
}

impl LabelMap {
    /// Empty map: every label passes through.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binary fake-news head: `LABEL_0 → real`, `LABEL_1 → fake`.
    pub fn fake_news() -> Self {
        [("LABEL_0", "real"), ("LABEL_1", "fake")]
            .into_iter()
            .collect()
    }

    /// Nine-way topic head.
    pub fn news_category() -> Self {
        [
            ("LABEL_0", "ArtsAndCulture"),
            ("LABEL_1", "Business"),
            ("LABEL_2", "Entertainment"),
            ("LABEL_3", "GeneralNews"),
            ("LABEL_4", "Health"),
            ("LABEL_5", "Other"),
            ("LABEL_6", "Politics"),
            ("LABEL_7", "Sports"),
            ("LABEL_8", "Technology"),
        ]
        .into_iter()
        .collect()
    }

    /// Add or replace one mapping.
    pub fn with(mut self, raw: impl Into<String>, label: impl Into<String>) -> Self {
        self.entries.insert(raw.into(), label.into());
        self
    }

    /// Map a raw label, falling back to the raw label itself.
    pub fn map(&self, raw: &str) -> String {
        self.entries
            .get(raw)
            .cloned()
            .unwrap_or_else(|| raw.to_string())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LabelMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fake_news_map() {
        let map = LabelMap::fake_news();
        assert_eq!(map.map("LABEL_0"), "real");
        assert_eq!(map.map("LABEL_1"), "fake");
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_unknown_label_passes_through() {
        let map = LabelMap::fake_news();
        assert_eq!(map.map("LABEL_7"), "LABEL_7");
        assert_eq!(LabelMap::new().map("satire"), "satire");
    }

    #[test]
    fn test_category_map_covers_nine_topics() {
        let map = LabelMap::news_category();
        assert_eq!(map.len(), 9);
        assert_eq!(map.map("LABEL_6"), "Politics");
        assert_eq!(map.map("LABEL_8"), "Technology");
    }

    #[test]
    fn test_with_overrides() {
        let map = LabelMap::fake_news().with("LABEL_1", "fake").with("LABEL_2", "satire");
        assert_eq!(map.map("LABEL_2"), "satire");
        assert!(!map.is_empty());
    }
}
