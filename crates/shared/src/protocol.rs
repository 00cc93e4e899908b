use serde::Deserialize;

use crate::domain::EntityId;

/// Entity records managed by a controller expose their identifier through
/// this trait so selection tracking stays independent of the record shape.
pub trait Identifiable {
    fn id(&self) -> EntityId;
}

/// Wire shape of a list response. Backends either wrap the page in a
/// `{results, count, page, page_size, next, previous}` envelope or return a
/// bare array with no pagination metadata.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListEnvelope<T> {
    Paged {
        results: Vec<T>,
        count: Option<u64>,
        page: Option<u32>,
        page_size: Option<u32>,
        next: Option<String>,
        previous: Option<String>,
    },
    Bare(Vec<T>),
}

/// Pagination metadata carried by an enveloped list response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMeta {
    pub count: Option<u64>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub next: Option<String>,
    pub previous: Option<String>,
}

impl<T> ListEnvelope<T> {
    /// Splits the response into its records and, for enveloped responses,
    /// the pagination metadata. A bare array carries none.
    pub fn into_parts(self) -> (Vec<T>, Option<PageMeta>) {
        match self {
            ListEnvelope::Paged {
                results,
                count,
                page,
                page_size,
                next,
                previous,
            } => (
                results,
                Some(PageMeta {
                    count,
                    page,
                    page_size,
                    next,
                    previous,
                }),
            ),
            ListEnvelope::Bare(results) => (results, None),
        }
    }

    pub fn from_items(results: Vec<T>) -> Self {
        ListEnvelope::Bare(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    struct Row {
        id: i64,
    }

    #[test]
    fn decodes_paged_envelope_with_metadata() {
        let raw = r#"{
            "results": [{"id": 1}, {"id": 2}],
            "count": 95,
            "page": 1,
            "page_size": 10,
            "next": "http://api/items/?page=2",
            "previous": null
        }"#;
        let envelope: ListEnvelope<Row> = serde_json::from_str(raw).expect("decode");
        let (items, meta) = envelope.into_parts();
        assert_eq!(items, vec![Row { id: 1 }, Row { id: 2 }]);
        let meta = meta.expect("meta");
        assert_eq!(meta.count, Some(95));
        assert_eq!(meta.page_size, Some(10));
        assert!(meta.next.is_some());
        assert!(meta.previous.is_none());
    }

    #[test]
    fn decodes_bare_array_without_metadata() {
        let envelope: ListEnvelope<Row> =
            serde_json::from_str(r#"[{"id": 3}]"#).expect("decode");
        let (items, meta) = envelope.into_parts();
        assert_eq!(items, vec![Row { id: 3 }]);
        assert!(meta.is_none());
    }
}
