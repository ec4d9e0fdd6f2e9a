//! Field access on untrusted CBOR maps.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ciborium::value::Value;

use crate::error::{AppGuardError, Result};

/// Base64-decode then CBOR-decode `input` into a top-level map.
pub(crate) fn decode_b64_map(input: &str, what: &str) -> Result<Vec<(Value, Value)>> {
    let bytes = BASE64
        .decode(input.trim())
        .map_err(|e| AppGuardError::Decode(format!("{what}: invalid base64: {e}")))?;
    decode_map(&bytes, what)
}

/// CBOR-decode `bytes` into a top-level map.
pub(crate) fn decode_map(bytes: &[u8], what: &str) -> Result<Vec<(Value, Value)>> {
    let value: Value = ciborium::de::from_reader(bytes)
        .map_err(|e| AppGuardError::Decode(format!("{what}: invalid CBOR: {e}")))?;
    match value {
        Value::Map(map) => Ok(map),
        _ => Err(AppGuardError::Decode(format!("{what}: expected CBOR map"))),
    }
}

pub(crate) fn find_field<'a>(map: &'a [(Value, Value)], key: &str) -> Option<&'a Value> {
    map.iter()
        .find(|(k, _)| matches!(k, Value::Text(s) if s == key))
        .map(|(_, v)| v)
}

pub(crate) fn get_text_field(map: &[(Value, Value)], key: &str) -> Result<String> {
    match find_field(map, key) {
        Some(Value::Text(s)) => Ok(s.clone()),
        Some(_) => Err(AppGuardError::Decode(format!("field '{key}' is not text"))),
        None => Err(AppGuardError::Decode(format!("missing field '{key}'"))),
    }
}

pub(crate) fn get_bytes_field(map: &[(Value, Value)], key: &str) -> Result<Vec<u8>> {
    match find_field(map, key) {
        Some(Value::Bytes(b)) => Ok(b.clone()),
        Some(_) => Err(AppGuardError::Decode(format!("field '{key}' is not a byte string"))),
        None => Err(AppGuardError::Decode(format!("missing field '{key}'"))),
    }
}

pub(crate) fn get_map_field<'a>(
    map: &'a [(Value, Value)],
    key: &str,
) -> Result<&'a [(Value, Value)]> {
    match find_field(map, key) {
        Some(Value::Map(m)) => Ok(m),
        Some(_) => Err(AppGuardError::Decode(format!("field '{key}' is not a map"))),
        None => Err(AppGuardError::Decode(format!("missing field '{key}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::to_cbor;

    #[test]
    fn test_field_lookup() {
        let map = vec![
            (Value::Text("a".into()), Value::Text("x".into())),
            (Value::Text("b".into()), Value::Bytes(vec![1, 2])),
            (Value::Integer(3.into()), Value::Bool(true)),
        ];
        assert_eq!(get_text_field(&map, "a").unwrap(), "x");
        assert_eq!(get_bytes_field(&map, "b").unwrap(), vec![1, 2]);
        assert!(get_bytes_field(&map, "a").is_err());
        assert!(get_text_field(&map, "missing").is_err());
        assert!(get_map_field(&map, "b").is_err());
    }

    #[test]
    fn test_decode_rejects_non_map() {
        let bytes = to_cbor(&Value::Array(vec![]));
        assert!(matches!(
            decode_map(&bytes, "object"),
            Err(AppGuardError::Decode(_))
        ));
        assert!(matches!(
            decode_map(&[0xff, 0x00], "object"),
            Err(AppGuardError::Decode(_))
        ));
        assert!(matches!(
            decode_b64_map("not base64!!", "object"),
            Err(AppGuardError::Decode(_))
        ));
    }
}
