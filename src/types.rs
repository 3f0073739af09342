use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field mapping of a document.
pub type Fields = Map<String, Value>;

/// Key under which the document id is merged into its fields by default.
pub const DEFAULT_ID_FIELD: &str = "id";

/// Raw document snapshot as delivered by a change feed.
///
/// `data` is expected to be a JSON object. For single-document feeds
/// `exists == false` signals that the document is missing or unreadable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDocument {
    pub id: Option<String>,
    pub data: Option<Value>,
    #[serde(default = "default_exists")]
    pub exists: bool,
}

fn default_exists() -> bool {
    true
}

impl RawDocument {
    /// A present document with the given id and data.
    pub fn new(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: Some(id.into()),
            data: Some(data),
            exists: true,
        }
    }

    /// A snapshot for a document that does not exist.
    pub fn missing(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            data: None,
            exists: false,
        }
    }
}

/// Document id + fields, with the id merged into `fields` under the id key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub id: String,
    pub fields: Fields,
}

impl CanonicalRecord {
    /// Value of `field`, including the merged id field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// The record as a JSON object.
    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

/// One entry of a change batch.
///
/// Index fields are relative to the replica state after every earlier event
/// of the same batch has been applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ChangeEvent {
    #[serde(rename_all = "camelCase")]
    Added { doc: RawDocument, new_index: usize },
    #[serde(rename_all = "camelCase")]
    Removed { doc: RawDocument, old_index: usize },
    #[serde(rename_all = "camelCase")]
    Modified {
        doc: RawDocument,
        old_index: usize,
        new_index: usize,
    },
}

impl ChangeEvent {
    /// A document entering the result set at `new_index`.
    pub fn added(doc: RawDocument, new_index: usize) -> Self {
        Self::Added { doc, new_index }
    }

    /// A document leaving the result set from `old_index`.
    pub fn removed(doc: RawDocument, old_index: usize) -> Self {
        Self::Removed { doc, old_index }
    }

    /// A changed document; a move when the two indices differ.
    pub fn modified(doc: RawDocument, old_index: usize, new_index: usize) -> Self {
        Self::Modified {
            doc,
            old_index,
            new_index,
        }
    }

    /// The document carried by the event.
    pub fn doc(&self) -> &RawDocument {
        match self {
            Self::Added { doc, .. } | Self::Removed { doc, .. } | Self::Modified { doc, .. } => doc,
        }
    }
}

/// Ordered events delivered by one feed notification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeBatch {
    pub changes: Vec<ChangeEvent>,
}

impl ChangeBatch {
    /// A batch of `changes`, applied in order.
    pub fn new(changes: Vec<ChangeEvent>) -> Self {
        Self { changes }
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// True for a batch with no events.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Iterate events in delivery order.
    pub fn iter(&self) -> std::slice::Iter<'_, ChangeEvent> {
        self.changes.iter()
    }
}

impl From<Vec<ChangeEvent>> for ChangeBatch {
    fn from(changes: Vec<ChangeEvent>) -> Self {
        Self::new(changes)
    }
}

impl FromIterator<ChangeEvent> for ChangeBatch {
    fn from_iter<I: IntoIterator<Item = ChangeEvent>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
