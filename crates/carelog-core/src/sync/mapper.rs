//! Serde-backed mapper between domain models and JSON documents

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::DomainError;
use crate::models::SyncMetadata;
use crate::sync::store::RemoteMapper;

/// Document field holding [`SyncMetadata`].
pub const SYNC_METADATA_FIELD: &str = "syncMetadata";

/// Maps any serde model to a JSON object document.
///
/// Device-local ids are `#[serde(skip)]` on every model, so they never reach
/// the document; the writing device's id travels inside `syncMetadata`.
#[derive(Debug)]
pub struct JsonRemoteMapper<L> {
    _model: PhantomData<fn() -> L>,
}

impl<L> JsonRemoteMapper<L> {
    pub const fn new() -> Self {
        Self {
            _model: PhantomData,
        }
    }
}

impl<L> Default for JsonRemoteMapper<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L> RemoteMapper<L, Value> for JsonRemoteMapper<L>
where
    L: Serialize + DeserializeOwned,
{
    fn to_domain(&self, doc: &Value) -> Result<L, DomainError> {
        let mut doc = doc.clone();
        if let Value::Object(fields) = &mut doc {
            fields.remove(SYNC_METADATA_FIELD);
        }
        serde_json::from_value(doc)
            .map_err(|e| DomainError::Validation(format!("malformed remote document: {e}")))
    }

    fn to_remote(&self, record: &L, metadata: &SyncMetadata) -> Result<Value, DomainError> {
        let mut doc = serde_json::to_value(record)
            .map_err(|e| DomainError::Validation(format!("unserializable record: {e}")))?;
        let Value::Object(fields) = &mut doc else {
            return Err(DomainError::Validation(
                "record does not serialize to an object".to_string(),
            ));
        };
        let metadata = serde_json::to_value(metadata)
            .map_err(|e| DomainError::Validation(format!("unserializable metadata: {e}")))?;
        fields.insert(SYNC_METADATA_FIELD.to_string(), metadata);
        Ok(doc)
    }

    fn extract_sync_metadata(&self, doc: &Value) -> Option<SyncMetadata> {
        doc.get(SYNC_METADATA_FIELD)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CareNote;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn to_remote_embeds_metadata_and_drops_local_id() {
        let mapper = JsonRemoteMapper::<CareNote>::new();
        let mut note = CareNote::new("Blood pressure fine");
        note.local_id = Some(7);
        note.updated_at = 100;
        note.created_at = 90;

        let metadata = SyncMetadata {
            local_id: 7,
            synced_at: 120,
            deleted_at: None,
        };
        let doc = mapper.to_remote(&note, &metadata).unwrap();

        assert_eq!(
            doc,
            json!({
                "content": "Blood pressure fine",
                "createdAt": 90,
                "updatedAt": 100,
                "deletedAt": null,
                "syncMetadata": { "localId": 7, "syncedAt": 120, "deletedAt": null },
            })
        );
    }

    #[test]
    fn to_domain_ignores_metadata() {
        let mapper = JsonRemoteMapper::<CareNote>::new();
        let doc = json!({
            "content": "Walked 20 minutes",
            "createdAt": 1,
            "updatedAt": 2,
            "syncMetadata": { "localId": 3, "syncedAt": 4, "deletedAt": 2 },
        });

        let note = mapper.to_domain(&doc).unwrap();
        assert_eq!(note.content, "Walked 20 minutes");
        assert_eq!(note.local_id, None);
        assert_eq!(
            mapper.extract_sync_metadata(&doc),
            Some(SyncMetadata {
                local_id: 3,
                synced_at: 4,
                deleted_at: Some(2),
            })
        );
    }

    #[test]
    fn malformed_document_is_validation_error() {
        let mapper = JsonRemoteMapper::<CareNote>::new();
        let result = mapper.to_domain(&json!({ "content": 5 }));
        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert_eq!(mapper.extract_sync_metadata(&json!({})), None);
    }
}
