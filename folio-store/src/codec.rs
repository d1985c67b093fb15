//! Value encoding for durable backends: bincode, then LZ4 with the
//! uncompressed size prepended.

use crate::error::{StoreError, StoreResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub(crate) fn encode<T: Serialize>(value: &T) -> StoreResult<Vec<u8>> {
    let raw = bincode::serde::encode_to_vec(value, bincode::config::standard())
        .map_err(|e| StoreError::Failure(format!("serialization error: {e}")))?;
    Ok(lz4_flex::compress_prepend_size(&raw))
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StoreResult<T> {
    let raw = lz4_flex::decompress_size_prepended(bytes)
        .map_err(|e| StoreError::Failure(format!("compression error: {e}")))?;
    let (value, _) = bincode::serde::decode_from_slice(&raw, bincode::config::standard())
        .map_err(|e| StoreError::Failure(format!("deserialization error: {e}")))?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::{Document, DocumentKey, DocumentObject, Version};

    #[test]
    fn test_document_survives_codec() {
        let mut doc = Document::new(DocumentKey::new("Main", "WebHome").with_language("fr"));
        doc.content = "Bonjour ".repeat(200);
        doc.version = Version::new(1, 4);
        doc.objects.push(DocumentObject::new("XWiki.Tag", 0).with_property("tags", "a|b"));

        let bytes = encode(&doc).unwrap();
        assert!(bytes.len() < doc.content.len());

        let back: Document = decode(&bytes).unwrap();
        assert_eq!(back.key, doc.key);
        assert_eq!(back.version, doc.version);
        assert!(back.same_state(&doc));
    }

    #[test]
    fn test_decode_garbage_is_failure() {
        let err = decode::<Document>(b"\x05\x00\x00\x00garbage").unwrap_err();
        assert!(matches!(err, StoreError::Failure(_)));
    }
}
