use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

/// A record persisted as one JSON document in a named collection
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + Unpin + 'static {
    const COLLECTION: &'static str;

    /// Array field owned by push/pull. Whole-document updates keep the
    /// stored value of this field instead of the one they carry.
    const ELEMENT_ARRAY: Option<&'static str> = None;

    fn id(&self) -> Uuid;
}

/// A document that embeds an ordered array of elements.
///
/// Elements must serialize their id under the `"id"` key; the store matches
/// on it when pulling an element out of the array.
pub trait Collection: Document {
    type Element: Serialize + DeserializeOwned + Clone + Send + Sync + 'static;

    /// Name of the array field inside the document body
    const ELEMENTS_FIELD: &'static str;

    fn element_id(element: &Self::Element) -> Uuid;

    fn elements(&self) -> &[Self::Element];

    fn elements_mut(&mut self) -> &mut Vec<Self::Element>;

    fn find_element(&self, element_id: Uuid) -> Option<&Self::Element> {
        self.elements()
            .iter()
            .find(|e| Self::element_id(e) == element_id)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Equality filter on top-level document fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter(Map<String, Value>);

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// JSON object usable as a containment (`@>`) operand
    pub fn as_json(&self) -> Value {
        Value::Object(self.0.clone())
    }

    pub fn matches(&self, document: &Value) -> bool {
        self.0
            .iter()
            .all(|(field, expected)| document.get(field) == Some(expected))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Sort {
    #[default]
    Newest,
    Oldest,
    Field {
        name: String,
        descending: bool,
    },
}

impl Sort {
    /// Parse `newest`, `oldest`, `<field>` or `-<field>`
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "" | "newest" => Sort::Newest,
            "oldest" => Sort::Oldest,
            field => match field.strip_prefix('-') {
                Some(name) => Sort::Field {
                    name: name.to_string(),
                    descending: true,
                },
                None => Sort::Field {
                    name: field.to_string(),
                    descending: false,
                },
            },
        }
    }
}

/// Document persistence for one entity type
#[async_trait]
pub trait RecordStore<T: Document>: Send + Sync {
    async fn find(&self, filter: &Filter, sort: &Sort) -> Result<Vec<T>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<T>, StoreError>;

    async fn insert(&self, document: &T) -> Result<(), StoreError>;

    /// Replace the stored document with the same id, except for the
    /// `ELEMENT_ARRAY` field which keeps its stored value. `false` if the
    /// document is gone.
    async fn update(&self, document: &T) -> Result<bool, StoreError>;

    /// `false` if no document had this id
    async fn delete_by_id(&self, id: Uuid) -> Result<bool, StoreError>;
}

/// Atomic array mutation on a parent document.
///
/// Each call is a single write; concurrent pushes and pulls on the same
/// parent never overwrite each other.
#[async_trait]
pub trait ElementStore<T: Collection>: RecordStore<T> {
    /// Append to the parent's array. `false` if the parent does not exist.
    async fn push_element(&self, parent_id: Uuid, element: &T::Element)
        -> Result<bool, StoreError>;

    /// Remove the element with `element_id`. `false` if the parent or the
    /// element does not exist; the array is left untouched in that case.
    async fn pull_element(&self, parent_id: Uuid, element_id: Uuid) -> Result<bool, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_matches_top_level_fields() {
        let doc = json!({"department": "CS", "title": "Annual Report", "year": 2024});

        assert!(Filter::all().matches(&doc));
        assert!(Filter::all().eq("department", "CS").matches(&doc));
        assert!(Filter::all()
            .eq("department", "CS")
            .eq("year", 2024)
            .matches(&doc));
        assert!(!Filter::all().eq("department", "ECE").matches(&doc));
        assert!(!Filter::all().eq("missing", "x").matches(&doc));
    }

    #[test]
    fn test_sort_parse() {
        assert_eq!(Sort::parse(""), Sort::Newest);
        assert_eq!(Sort::parse("oldest"), Sort::Oldest);
        assert_eq!(
            Sort::parse("-display_order"),
            Sort::Field {
                name: "display_order".to_string(),
                descending: true
            }
        );
        assert_eq!(
            Sort::parse("title"),
            Sort::Field {
                name: "title".to_string(),
                descending: false
            }
        );
    }
}
