//! Obfuscating codec for persisted records.
//!
//! Keys and payloads are scrambled so raw storage does not show cart or order
//! contents in plain text. This is obscurity, not security: the mask is a
//! fixed public constant.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::StorageError;

const MASK: &[u8] = b"shopfront::mask::v1";

/// Opaque storage key for a semantic record name (base64 of the name).
pub fn obfuscate_key(semantic: &str) -> String {
    STANDARD.encode(semantic.as_bytes())
}

/// Serialize `value` to JSON, mask it, and base64-encode the result.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String, StorageError> {
    let json = serde_json::to_vec(value).map_err(|e| StorageError::Encode(e.to_string()))?;
    Ok(STANDARD.encode(apply_mask(json)))
}

/// Outcome of reading a persisted record.
///
/// `Empty` (nothing stored) and `Fault` (something stored but unreadable) are
/// kept apart so callers can log faults, but both collapse to the record's
/// default at the call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded<T> {
    Value(T),
    Empty,
    Fault(String),
}

impl<T> Decoded<T> {
    /// Collapse to an `Option`, logging a fault under `record`.
    pub fn into_option(self, record: &str) -> Option<T> {
        match self {
            Decoded::Value(v) => Some(v),
            Decoded::Empty => None,
            Decoded::Fault(reason) => {
                tracing::warn!(record, %reason, "discarding unreadable persisted record");
                None
            }
        }
    }

    /// Collapse to the value or `T::default()`, logging a fault under `record`.
    pub fn or_default(self, record: &str) -> T
    where
        T: Default,
    {
        self.into_option(record).unwrap_or_default()
    }

    pub fn is_fault(&self) -> bool {
        matches!(self, Decoded::Fault(_))
    }
}

/// Reverse of [`encode`]. Never fails: undecodable input becomes `Fault`.
pub fn decode<T: DeserializeOwned>(raw: &str) -> Decoded<T> {
    let masked = match STANDARD.decode(raw.trim()) {
        Ok(bytes) => bytes,
        Err(e) => return Decoded::Fault(format!("invalid base64: {e}")),
    };
    match serde_json::from_slice(&apply_mask(masked)) {
        Ok(value) => Decoded::Value(value),
        Err(e) => Decoded::Fault(format!("invalid payload: {e}")),
    }
}

fn apply_mask(mut bytes: Vec<u8>) -> Vec<u8> {
    for (b, m) in bytes.iter_mut().zip(MASK.iter().cycle()) {
        *b ^= m;
    }
    bytes
}
