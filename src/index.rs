//! Position index: the derived mapping from keys to annotated spans and raw
//! marker positions. Always rebuilt wholesale by a parse pass.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::{AnnotatedSpan, TagPositions};

/// Keys mapped to the region they annotate and to their marker positions.
/// Both maps always hold the same key set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PositionIndex {
    /// Annotated region per key.
    spans: BTreeMap<String, AnnotatedSpan>,
    /// Raw begin/end marker spans per key.
    tags: BTreeMap<String, TagPositions>,
}

impl PositionIndex {
    /// Whether `key` has an entry.
    pub fn contains(&self, key: &str) -> bool {
        return self.tags.contains_key(key);
    }

    /// Add a complete entry. Only the repair engine builds indexes.
    pub(crate) fn insert(&mut self, key: String, span: AnnotatedSpan, tags: TagPositions) {
        self.spans.insert(key.clone(), span);
        self.tags.insert(key, tags);
    }

    /// Whether the index has no entries.
    pub fn is_empty(&self) -> bool {
        return self.tags.is_empty();
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        return self.tags.keys().map(String::as_str);
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        return self.tags.len();
    }

    /// Annotated region of `key`.
    pub fn span_of(&self, key: &str) -> Option<AnnotatedSpan> {
        return self.spans.get(key).copied();
    }

    /// All annotated regions, keyed and sorted.
    pub const fn spans(&self) -> &BTreeMap<String, AnnotatedSpan> {
        return &self.spans;
    }

    /// Marker positions of `key`.
    pub fn tag_positions(&self, key: &str) -> Option<TagPositions> {
        return self.tags.get(key).copied();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Span;

    #[test]
    fn keeps_both_maps_in_step() {
        let mut index = PositionIndex::default();
        let marker = Span::new(4, 9);
        index.insert(
            "k".to_string(),
            AnnotatedSpan { end: 13, start: 0 },
            TagPositions { begin: marker, end: Some(marker) },
        );
        assert!(index.contains("k"), "key recorded");
        assert_eq!(index.len(), 1, "one entry");
        assert_eq!(index.span_of("k"), Some(AnnotatedSpan { end: 13, start: 0 }), "span stored");
        assert_eq!(index.keys().collect::<Vec<_>>(), vec!["k"], "keys listed");
        assert_eq!(index.span_of("missing"), None, "absent key");
    }
}
