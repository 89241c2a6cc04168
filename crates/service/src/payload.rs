//! Upload body parsing.
//!
//! Two shapes are accepted:
//! - `{"tier": "free", ...fields}`: the stored document is the object minus `tier`.
//! - `{"filename": "free_data.json", "data": {...}}`: the older collector format.
//!   `filename` must name one of the fixed slots exactly; `data` is stored verbatim.

use serde_json::{Map, Value};

use crate::errors::RelayError;
use crate::tier::Tier;

/// A validated upload: which slot to replace and with what.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadRequest {
    pub tier: Tier,
    pub document: Value,
}

impl UploadRequest {
    pub fn from_slice(body: &[u8]) -> Result<Self, RelayError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(RelayError::invalid("empty request body"));
        }
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| RelayError::invalid(format!("body is not valid JSON: {e}")))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, RelayError> {
        let Value::Object(mut fields) = value else {
            return Err(RelayError::invalid("body must be a JSON object"));
        };

        match fields.remove("tier") {
            Some(tier) => {
                let tier = tier_field(&tier)?;
                let document = non_empty_object(Value::Object(fields))?;
                Ok(Self { tier, document })
            }
            None => Self::from_legacy(fields),
        }
    }

    fn from_legacy(mut fields: Map<String, Value>) -> Result<Self, RelayError> {
        let filename = match fields.remove("filename") {
            Some(Value::String(name)) => name,
            Some(_) => return Err(RelayError::invalid("`filename` must be a string")),
            None => return Err(RelayError::invalid("missing `tier`")),
        };
        let tier = Tier::from_file_name(&filename)
            .ok_or_else(|| RelayError::invalid(format!("unknown slot file `{filename}`")))?;
        let data = fields
            .remove("data")
            .ok_or_else(|| RelayError::invalid("missing `data`"))?;
        let document = non_empty_object(data)?;
        Ok(Self { tier, document })
    }
}

fn tier_field(value: &Value) -> Result<Tier, RelayError> {
    match value {
        Value::String(s) => s.parse(),
        _ => Err(RelayError::invalid("`tier` must be a string")),
    }
}

fn non_empty_object(value: Value) -> Result<Value, RelayError> {
    match &value {
        Value::Object(map) if map.is_empty() => Err(RelayError::invalid("document is empty")),
        Value::Object(_) => Ok(value),
        Value::Null => Err(RelayError::invalid("document is missing")),
        _ => Err(RelayError::invalid("document must be a JSON object")),
    }
}
