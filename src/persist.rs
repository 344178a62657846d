//! Fragment (de)serialization used by copy, paste and undo buffers.

use crate::error::{EditorError, EditorResult};
use crate::model::Fragment;

pub trait Persistence {
    fn encode(&self, fragment: &Fragment) -> EditorResult<Vec<u8>>;
    fn decode(&self, bytes: &[u8]) -> EditorResult<Fragment>;
}

/// Human-readable buffers, handy for the system clipboard.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonPersistence;

impl Persistence for JsonPersistence {
    fn encode(&self, fragment: &Fragment) -> EditorResult<Vec<u8>> {
        serde_json::to_vec(fragment).map_err(|e| EditorError::Persist(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> EditorResult<Fragment> {
        serde_json::from_slice(bytes).map_err(|e| EditorError::Persist(e.to_string()))
    }
}

/// Compact buffers using bincode's standard configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodePersistence;

impl Persistence for BincodePersistence {
    fn encode(&self, fragment: &Fragment) -> EditorResult<Vec<u8>> {
        bincode::serde::encode_to_vec(fragment, bincode::config::standard())
            .map_err(|e| EditorError::Persist(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> EditorResult<Fragment> {
        let (fragment, _) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .map_err(|e| EditorError::Persist(e.to_string()))?;
        Ok(fragment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConnectRecord, ObjectKind, ObjectRecord};

    fn sample() -> Fragment {
        Fragment {
            objects: vec![
                ObjectRecord::new(ObjectKind::Message, 0, 0, "bang"),
                ObjectRecord::new(ObjectKind::Box, 0, 40, "print ä"),
            ],
            connections: vec![ConnectRecord::new(0, 0, 1, 0)],
        }
    }

    #[test]
    fn test_both_codecs_reload() {
        let codecs: [&dyn Persistence; 2] = [&JsonPersistence, &BincodePersistence];
        for codec in codecs {
            let bytes = codec.encode(&sample()).unwrap();
            assert_eq!(codec.decode(&bytes).unwrap(), sample());
        }
    }

    #[test]
    fn test_garbage_is_persist_error() {
        let err = JsonPersistence.decode(b"{not json").unwrap_err();
        assert!(matches!(err, EditorError::Persist(_)));
    }
}
