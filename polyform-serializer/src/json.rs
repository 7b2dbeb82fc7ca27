//! JSON-shaped backing over `serde_json::Value` with ordered object keys.

use serde_json::{Map, Value};

use crate::archive::{ArchiveNode, Scalar, ScalarKind, CLASS_NAME};
use crate::error::{ArchiveError, Result};
use crate::registry::{PolyRegistry, JSON_REGISTRY};

fn number_from_f64(value: f64) -> Result<Value> {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .ok_or_else(|| ArchiveError::Decode(format!("non-finite float {value} has no JSON form")))
}

fn expect_i64(node: &Value) -> Result<i64> {
    node.as_i64()
        .ok_or_else(|| ArchiveError::Decode(format!("expected signed integer, found {node}")))
}

fn expect_u64(node: &Value) -> Result<u64> {
    node.as_u64()
        .ok_or_else(|| ArchiveError::Decode(format!("expected unsigned integer, found {node}")))
}

fn narrow<T: TryFrom<i64>>(value: i64) -> Result<T> {
    T::try_from(value)
        .map_err(|_| ArchiveError::Decode(format!("integer {value} out of range for target width")))
}

fn narrow_unsigned<T: TryFrom<u64>>(value: u64) -> Result<T> {
    T::try_from(value)
        .map_err(|_| ArchiveError::Decode(format!("integer {value} out of range for target width")))
}

impl ArchiveNode for Value {
    fn put_scalar(&mut self, value: Scalar) -> Result<()> {
        *self = match value {
            Scalar::Bool(v) => Value::Bool(v),
            Scalar::Char(v) => Value::String(v.to_string()),
            Scalar::I8(v) => Value::Number(v.into()),
            Scalar::I16(v) => Value::Number(v.into()),
            Scalar::I32(v) => Value::Number(v.into()),
            Scalar::I64(v) => Value::Number(v.into()),
            Scalar::U8(v) => Value::Number(v.into()),
            Scalar::U16(v) => Value::Number(v.into()),
            Scalar::U32(v) => Value::Number(v.into()),
            Scalar::U64(v) => Value::Number(v.into()),
            Scalar::F32(v) => number_from_f64(f64::from(v))?,
            Scalar::F64(v) => number_from_f64(v)?,
            Scalar::Str(v) => Value::String(v),
            Scalar::Unit => Value::Null,
            Scalar::Enum { name, .. } => Value::String(name.to_string()),
            Scalar::Timestamp { seconds, .. } => number_from_f64(seconds)?,
        };
        Ok(())
    }

    fn take_scalar(&mut self, kind: ScalarKind) -> Result<Scalar> {
        let scalar = match kind {
            ScalarKind::Bool => Scalar::Bool(self.as_bool().ok_or_else(|| {
                ArchiveError::Decode(format!("expected boolean, found {self}"))
            })?),
            ScalarKind::Char => {
                let text = self.as_str().ok_or_else(|| {
                    ArchiveError::Decode(format!("expected character string, found {self}"))
                })?;
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Scalar::Char(c),
                    _ => {
                        return Err(ArchiveError::Decode(format!(
                            "expected a single character, found {text:?}"
                        )))
                    }
                }
            }
            ScalarKind::I8 => Scalar::I8(narrow(expect_i64(self)?)?),
            ScalarKind::I16 => Scalar::I16(narrow(expect_i64(self)?)?),
            ScalarKind::I32 => Scalar::I32(narrow(expect_i64(self)?)?),
            ScalarKind::I64 => Scalar::I64(expect_i64(self)?),
            ScalarKind::U8 => Scalar::U8(narrow_unsigned(expect_u64(self)?)?),
            ScalarKind::U16 => Scalar::U16(narrow_unsigned(expect_u64(self)?)?),
            ScalarKind::U32 => Scalar::U32(narrow_unsigned(expect_u64(self)?)?),
            ScalarKind::U64 => Scalar::U64(expect_u64(self)?),
            ScalarKind::F32 => {
                let value = self.as_f64().ok_or_else(|| {
                    ArchiveError::Decode(format!("expected number, found {self}"))
                })?;
                Scalar::F32(value as f32)
            }
            ScalarKind::F64 => Scalar::F64(self.as_f64().ok_or_else(|| {
                ArchiveError::Decode(format!("expected number, found {self}"))
            })?),
            ScalarKind::Str => Scalar::Str(
                self.as_str()
                    .ok_or_else(|| ArchiveError::Decode(format!("expected string, found {self}")))?
                    .to_owned(),
            ),
            ScalarKind::Unit => {
                if self.is_null() {
                    Scalar::Unit
                } else {
                    return Err(ArchiveError::Decode(format!(
                        "expected null placeholder, found {self}"
                    )));
                }
            }
            ScalarKind::Enum => match self {
                Value::String(name) => Scalar::Str(name.clone()),
                Value::Number(_) => Scalar::U64(expect_u64(self)?),
                other => {
                    return Err(ArchiveError::Decode(format!(
                        "expected enumeration name or ordinal, found {other}"
                    )))
                }
            },
            ScalarKind::Timestamp => match self {
                Value::Number(_) => Scalar::F64(self.as_f64().ok_or_else(|| {
                    ArchiveError::Decode(format!("expected numeric timestamp, found {self}"))
                })?),
                Value::String(text) => Scalar::Str(text.clone()),
                other => {
                    return Err(ArchiveError::Decode(format!(
                        "expected timestamp, found {other}"
                    )))
                }
            },
        };
        Ok(scalar)
    }

    fn put_type_name(&mut self, name: &str) -> Result<()> {
        if !self.is_object() {
            *self = Value::Object(Map::new());
        }
        if let Value::Object(map) = self {
            map.insert(CLASS_NAME.to_string(), Value::String(name.to_string()));
        }
        Ok(())
    }

    fn take_type_name(&mut self) -> Result<String> {
        let Some(field) = self.get(CLASS_NAME) else {
            log::warn!("archive node has no {CLASS_NAME} field");
            return Ok(String::new());
        };
        match field.as_str() {
            Some(name) => Ok(name.to_string()),
            None => {
                log::warn!("archive node's {CLASS_NAME} field is not a string");
                Ok(String::new())
            }
        }
    }

    fn put_tag(&mut self, key: &str, tag: u8) -> Result<()> {
        if !self.is_object() {
            *self = Value::Object(Map::new());
        }
        if let Value::Object(map) = self {
            map.insert(key.to_string(), Value::Number(tag.into()));
        }
        Ok(())
    }

    fn take_tag(&mut self, key: &str) -> Result<u8> {
        let tag = self
            .get(key)
            .and_then(Value::as_u64)
            .ok_or_else(|| ArchiveError::InvalidVariant(format!("missing {key} attribute")))?;
        u8::try_from(tag)
            .map_err(|_| ArchiveError::InvalidVariant(format!("{key} attribute {tag} exceeds u8")))
    }

    fn begin_items(&mut self, count: usize) -> Result<()> {
        // JSON arrays size themselves; start a fresh one so stale children
        // from a reused node cannot survive.
        *self = Value::Array(Vec::with_capacity(count));
        Ok(())
    }

    fn item_count(&mut self) -> Result<usize> {
        self.as_array()
            .map(Vec::len)
            .ok_or_else(|| ArchiveError::Decode(format!("expected array node, found {self}")))
    }

    fn named(&mut self, key: &str) -> Result<&mut Self> {
        if self.is_null() {
            *self = Value::Object(Map::new());
        }
        match self {
            Value::Object(map) => Ok(map.entry(key.to_string()).or_insert(Value::Null)),
            _ => Err(ArchiveError::Decode(format!(
                "expected object node for member {key:?}"
            ))),
        }
    }

    fn at(&mut self, index: usize) -> Result<&mut Self> {
        if self.is_null() {
            *self = Value::Array(Vec::new());
        }
        match self {
            Value::Array(items) => {
                while items.len() <= index {
                    items.push(Value::Null);
                }
                Ok(&mut items[index])
            }
            _ => Err(ArchiveError::Decode(
                "expected array node for positional child".to_string(),
            )),
        }
    }

    fn registry() -> &'static PolyRegistry<Self> {
        &JSON_REGISTRY
    }
}
