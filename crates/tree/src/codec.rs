use std::string::FromUtf8Error;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use thiserror::Error;

/// Reversible transform applied to note text before it is stored in a leaf.
/// 筆記內容在儲存前套用的可逆轉換。
///
/// Implementations must round-trip: `decode(encode(x)) == x` for every text
/// the application accepts.
pub trait Codec {
    fn encode(&self, text: &str) -> Result<String, CodecError>;
    fn decode(&self, blob: &str) -> Result<String, CodecError>;
}

impl<C: Codec + ?Sized> Codec for &C {
    fn encode(&self, text: &str) -> Result<String, CodecError> {
        (**self).encode(text)
    }

    fn decode(&self, blob: &str) -> Result<String, CodecError> {
        (**self).decode(blob)
    }
}

/// Errors produced while encoding or decoding note content.
/// 編碼或解碼筆記內容時的錯誤。
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid encoded payload: {0}")]
    InvalidPayload(#[from] base64::DecodeError),
    #[error("decoded payload is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] FromUtf8Error),
    #[error("codec failure: {0}")]
    Other(String),
}

/// Stores note text as standard-alphabet base64 over its UTF-8 bytes.
/// 以標準 base64 字母表保存 UTF-8 筆記內容。
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64Codec;

impl Codec for Base64Codec {
    fn encode(&self, text: &str) -> Result<String, CodecError> {
        Ok(BASE64.encode(text.as_bytes()))
    }

    fn decode(&self, blob: &str) -> Result<String, CodecError> {
        let bytes = BASE64.decode(blob.trim())?;
        Ok(String::from_utf8(bytes)?)
    }
}

/// Identity codec; content is stored as typed.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainCodec;

impl Codec for PlainCodec {
    fn encode(&self, text: &str) -> Result<String, CodecError> {
        Ok(text.to_string())
    }

    fn decode(&self, blob: &str) -> Result<String, CodecError> {
        Ok(blob.to_string())
    }
}
