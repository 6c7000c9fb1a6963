use serde::Serialize;
use serde_json::{Map, Number, Value};
use tracing::warn;

use crate::error::{DecodeError, DecodeWarning, ValueError};
use crate::models::RawValueRecord;

/// Feature properties, iterated in first-occurrence order of their keys.
pub type Properties = Map<String, Value>;

/// A single scalar from a layer's value table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RawValue {
    String(String),
    Double(f64),
    Float(f32),
    Int(i64),
    UInt(u64),
    SInt(i64),
    Bool(bool),
}

impl TryFrom<&RawValueRecord> for RawValue {
    type Error = usize;

    // Err carries the number of populated fields
    fn try_from(record: &RawValueRecord) -> Result<Self, Self::Error> {
        let populated = record.populated();
        if populated != 1 {
            return Err(populated);
        }
        let value = match record {
            RawValueRecord { string_value: Some(s), .. } => RawValue::String(s.clone()),
            RawValueRecord { double_value: Some(d), .. } => RawValue::Double(*d),
            RawValueRecord { float_value: Some(f), .. } => RawValue::Float(*f),
            RawValueRecord { int_value: Some(i), .. } => RawValue::Int(*i),
            RawValueRecord { uint_value: Some(u), .. } => RawValue::UInt(*u),
            RawValueRecord { sint_value: Some(s), .. } => RawValue::SInt(*s),
            RawValueRecord { bool_value: Some(b), .. } => RawValue::Bool(*b),
            _ => return Err(0),
        };
        Ok(value)
    }
}

impl RawValue {
    // Non-finite floats have no JSON number form and become null.
    pub fn to_json(&self) -> Value {
        match self {
            RawValue::String(s) => Value::String(s.clone()),
            RawValue::Double(d) => Number::from_f64(*d).map(Value::Number).unwrap_or(Value::Null),
            RawValue::Float(f) => Number::from_f64(f64::from(*f))
                .map(Value::Number)
                .unwrap_or(Value::Null),
            RawValue::Int(i) | RawValue::SInt(i) => Value::Number(Number::from(*i)),
            RawValue::UInt(u) => Value::Number(Number::from(*u)),
            RawValue::Bool(b) => Value::Bool(*b),
        }
    }
}

/// Per-layer key and value lists that feature tags index into.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyTable {
    keys: Vec<String>,
    values: Vec<RawValue>,
}

impl PropertyTable {
    /// Builds the table, failing the layer on any value record that does
    /// not hold exactly one field.
    pub fn build(
        layer: &str,
        keys: &[String],
        records: &[RawValueRecord],
    ) -> Result<Self, DecodeError> {
        let values = records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                RawValue::try_from(record).map_err(|populated| DecodeError::MalformedLayer {
                    layer: layer.to_string(),
                    reason: ValueError::MalformedValue { index, populated },
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PropertyTable {
            keys: keys.to_vec(),
            values,
        })
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn values(&self) -> &[RawValue] {
        &self.values
    }

    /// Resolves a feature's tag sequence. Later pairs overwrite earlier ones
    /// for the same key while the key keeps its first position.
    pub fn resolve(
        &self,
        feature: usize,
        tags: &[u32],
        warnings: &mut Vec<DecodeWarning>,
    ) -> Properties {
        if tags.len() % 2 != 0 {
            warn!(feature, len = tags.len(), "Odd tag count, dropping the dangling id");
            warnings.push(DecodeWarning::OddTagCount {
                feature,
                len: tags.len(),
            });
        }

        let mut properties = Properties::new();
        for pair in tags.chunks_exact(2) {
            let (key_id, value_id) = (pair[0], pair[1]);
            match (
                self.keys.get(key_id as usize),
                self.values.get(value_id as usize),
            ) {
                (Some(key), Some(value)) => {
                    properties.insert(key.clone(), value.to_json());
                }
                _ => {
                    warn!(feature, key = key_id, value = value_id, "Tag refers past the property table");
                    warnings.push(DecodeWarning::TagOutOfRange {
                        feature,
                        key: key_id,
                        value: value_id,
                    });
                }
            }
        }
        properties
    }
}
