//! Gzip + base64 packing for JSON payloads.
//!
//! Payloads travel as `base64(gzip(utf8(json)))` so they can be passed
//! through tool-call strings without escaping.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use std::io::{Read, Write};
use thiserror::Error;

/// Errors from packing or unpacking a payload.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("gzip stream error: {0}")]
    Gzip(#[from] std::io::Error),

    #[error("payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CodecError>;

/// Compress a JSON string with gzip and encode it as base64.
pub fn gzip_json(json_str: &str) -> Result<String> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(json_str.as_bytes())?;
    let compressed = encoder.finish()?;

    Ok(STANDARD.encode(compressed))
}

/// Single-line JSON with `", "` and `": "` separators.
struct SpacedFormatter;

impl serde_json::ser::Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> std::io::Result<()>
    where
        W: ?Sized + Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> std::io::Result<()>
    where
        W: ?Sized + Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> std::io::Result<()>
    where
        W: ?Sized + Write,
    {
        writer.write_all(b": ")
    }
}

/// Serialize a value on one line with spaced separators.
pub fn to_spaced_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut buf = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
    value.serialize(&mut serializer)?;
    Ok(String::from_utf8(buf)?)
}

/// Serialize a value with spaced separators and pack it.
pub fn encode_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let json = to_spaced_json(value)?;
    gzip_json(&json)
}

/// Unpack a base64 gzip payload back into its UTF-8 string.
pub fn decode_gzip_base64(encoded: &str) -> Result<String> {
    let compressed = STANDARD.decode(encoded.trim())?;

    let mut decoder = GzDecoder::new(compressed.as_slice());
    let mut bytes = Vec::new();
    decoder.read_to_end(&mut bytes)?;

    Ok(String::from_utf8(bytes)?)
}

/// Unpack a payload and pretty-print it as JSON.
pub fn decode_to_pretty_json(encoded: &str) -> Result<String> {
    let json = decode_gzip_base64(encoded)?;
    let value: serde_json::Value = serde_json::from_str(&json)?;
    Ok(serde_json::to_string_pretty(&value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// A payload produced by the Python gzip_to_json helper.
    const PYTHON_PAYLOAD: &str = "H4sIAKgZhWgC/4XOwQrDIAyA4XufQjyLJGoS66uMHcoYXaG0l8IOw3eftzoHNqcc8vHnNqgyH73uj+lY9k2nsk+HTujsKCxGr9usk4glQZ+N0u/nMr/KgQIr2fS4J3dydoEazn0uMVQ8QGx47PPIcHLx1NaFLvLIVR4Ct99feOKx6gNi60Pfo9R95+XHo4UO9xbAIVWe//qO8nD/AhhKywz/AQAA";

    #[test]
    fn test_pack_and_unpack() {
        let input = r#"[{"location":{"lat":12.9165,"lng":77.6206},"weight":42.5}]"#;
        let encoded = gzip_json(input).unwrap();

        assert!(encoded.starts_with("H4sI"), "gzip magic should lead the base64");
        assert_eq!(decode_gzip_base64(&encoded).unwrap(), input);
    }

    #[test]
    fn test_decode_external_payload() {
        let pretty = decode_to_pretty_json(PYTHON_PAYLOAD).unwrap();
        let value: serde_json::Value = serde_json::from_str(&pretty).unwrap();

        let points = value.as_array().expect("payload is a JSON array");
        assert_eq!(points.len(), 8);
        assert_eq!(points[0]["location"]["lat"], 12.9767);
        assert_eq!(points[0]["weight"], 0.7);
        assert!(pretty.contains("\n  "));
    }

    #[test]
    fn test_encode_json_uses_spaced_separators() {
        let encoded = encode_json(&json!({"a": [1, 2, 3], "b": {"c": 1.5}})).unwrap();
        assert_eq!(
            decode_gzip_base64(&encoded).unwrap(),
            r#"{"a": [1, 2, 3], "b": {"c": 1.5}}"#
        );
        assert_eq!(to_spaced_json(&json!([])).unwrap(), "[]");
        assert_eq!(to_spaced_json(&json!({})).unwrap(), "{}");
    }

    #[test]
    fn test_decode_tolerates_surrounding_whitespace() {
        let encoded = gzip_json("{}").unwrap();
        let padded = format!("\n  {}  \n", encoded);
        assert_eq!(decode_gzip_base64(&padded).unwrap(), "{}");
    }

    #[test]
    fn test_non_ascii_text() {
        let input = r#"{"hub":"ಮೆಜೆಸ್ಟಿಕ್"}"#;
        let encoded = gzip_json(input).unwrap();
        assert_eq!(decode_gzip_base64(&encoded).unwrap(), input);
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(
            decode_gzip_base64("not base64!!"),
            Err(CodecError::Base64(_))
        ));

        // Valid base64, but not a gzip stream.
        let plain = STANDARD.encode(b"hello world");
        assert!(matches!(decode_gzip_base64(&plain), Err(CodecError::Gzip(_))));

        // Valid gzip, but the bytes are not UTF-8.
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&[0xff, 0xfe]).unwrap();
        let not_utf8 = STANDARD.encode(encoder.finish().unwrap());
        assert!(matches!(
            decode_gzip_base64(&not_utf8),
            Err(CodecError::Utf8(_))
        ));

        let not_json = gzip_json("definitely not json").unwrap();
        assert!(matches!(
            decode_to_pretty_json(&not_json),
            Err(CodecError::Json(_))
        ));
    }
}
