//! Type-directed leaf value coercion
//!
//! Converts between the typed field values carried by model objects
//! (`serde_json::Value`) and the raw string form carried by generic data
//! nodes, dispatching on the leaf's declared [`DataType`]. Both directions
//! validate; a value that does not fit its type is a `TypeConversion`
//! error, never a silent passthrough.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde_json::Value;

use crate::error::{BindError, Result};
use crate::schema::DataType;

/// Outcome of coercing an object field into data-node form
#[derive(Debug, Clone, PartialEq)]
pub enum RawLeaf {
    /// No data node is emitted (empty-type leaf with a false/absent flag)
    Omitted,
    /// A leaf data node is emitted; `value: None` means presence-only
    Present {
        value: Option<String>,
        namespace: Option<String>,
    },
}

impl RawLeaf {
    fn value(value: String) -> Self {
        RawLeaf::Present {
            value: Some(value),
            namespace: None,
        }
    }
}

/// Coerce a typed object field value into raw data-node form
///
/// `leaf_namespace` is the namespace of the leaf's schema node; it becomes
/// the value namespace of identityref-typed leaves.
pub fn leaf_to_raw(value: &Value, ty: &DataType, leaf_namespace: &str) -> Result<RawLeaf> {
    match ty {
        DataType::String | DataType::InstanceIdentifier => {
            let s = value
                .as_str()
                .ok_or_else(|| conversion("string", value))?;
            Ok(RawLeaf::value(s.to_string()))
        }

        DataType::Int8 => signed_to_raw(value, i8::MIN as i64, i8::MAX as i64),
        DataType::Int16 => signed_to_raw(value, i16::MIN as i64, i16::MAX as i64),
        DataType::Int32 => signed_to_raw(value, i32::MIN as i64, i32::MAX as i64),
        DataType::Int64 => signed_to_raw(value, i64::MIN, i64::MAX),
        DataType::Uint8 => unsigned_to_raw(value, u8::MAX as u64),
        DataType::Uint16 => unsigned_to_raw(value, u16::MAX as u64),
        DataType::Uint32 => unsigned_to_raw(value, u32::MAX as u64),
        DataType::Uint64 => unsigned_to_raw(value, u64::MAX),

        DataType::Decimal64 => {
            let f = value_to_f64(value)?;
            Ok(RawLeaf::value(f.to_string()))
        }

        DataType::Boolean => {
            let b = value_to_bool(value)?;
            Ok(RawLeaf::value(b.to_string()))
        }

        DataType::Binary => {
            let s = value
                .as_str()
                .ok_or_else(|| conversion("base64 string", value))?;
            BASE64
                .decode(s)
                .map_err(|e| BindError::TypeConversion(format!("base64 decode: {e}")))?;
            Ok(RawLeaf::value(s.to_string()))
        }

        DataType::Empty => match value {
            Value::Bool(true) => Ok(RawLeaf::Present {
                value: None,
                namespace: None,
            }),
            Value::Bool(false) | Value::Null => Ok(RawLeaf::Omitted),
            other => Err(conversion("boolean presence flag", other)),
        },

        DataType::Identityref => {
            let s = value
                .as_str()
                .ok_or_else(|| conversion("identity name", value))?;
            Ok(RawLeaf::Present {
                value: Some(s.to_string()),
                namespace: Some(leaf_namespace.to_string()),
            })
        }

        DataType::Bits(allowed) => {
            let s = value.as_str().ok_or_else(|| conversion("bits", value))?;
            for bit in s.split_whitespace() {
                if !allowed.iter().any(|a| a == bit) {
                    return Err(BindError::TypeConversion(format!(
                        "unknown bit name: {bit}"
                    )));
                }
            }
            Ok(RawLeaf::value(s.to_string()))
        }

        DataType::Enumeration(names) => {
            let s = value
                .as_str()
                .ok_or_else(|| conversion("enum name", value))?;
            if !names.iter().any(|n| n == s) {
                return Err(BindError::TypeConversion(format!(
                    "enumeration value not found: {s}"
                )));
            }
            Ok(RawLeaf::value(s.to_string()))
        }

        DataType::Leafref(referred) => leaf_to_raw(value, referred, leaf_namespace),

        DataType::Union(members) => {
            for member in members {
                if let Ok(raw) = leaf_to_raw(value, member, leaf_namespace) {
                    return Ok(raw);
                }
            }
            Err(BindError::TypeConversion(format!(
                "no union member accepts {value:?}"
            )))
        }
    }
}

/// Coerce a raw data-node value into a typed object field value
pub fn raw_to_leaf(
    value: Option<&str>,
    value_namespace: Option<&str>,
    ty: &DataType,
) -> Result<Value> {
    match ty {
        DataType::Empty => {
            // presence of the node is the value
            Ok(Value::Bool(true))
        }
        _ => {
            let s = value.ok_or_else(|| {
                BindError::TypeConversion(format!("missing value for non-empty type {ty:?}"))
            })?;
            raw_str_to_leaf(s, value_namespace, ty)
        }
    }
}

fn raw_str_to_leaf(s: &str, value_namespace: Option<&str>, ty: &DataType) -> Result<Value> {
    match ty {
        DataType::String | DataType::InstanceIdentifier | DataType::Identityref => {
            Ok(Value::String(s.to_string()))
        }

        DataType::Int8 => parse_signed(s, i8::MIN as i64, i8::MAX as i64),
        DataType::Int16 => parse_signed(s, i16::MIN as i64, i16::MAX as i64),
        DataType::Int32 => parse_signed(s, i32::MIN as i64, i32::MAX as i64),
        DataType::Int64 => parse_signed(s, i64::MIN, i64::MAX),
        DataType::Uint8 => parse_unsigned(s, u8::MAX as u64),
        DataType::Uint16 => parse_unsigned(s, u16::MAX as u64),
        DataType::Uint32 => parse_unsigned(s, u32::MAX as u64),
        DataType::Uint64 => parse_unsigned(s, u64::MAX),

        DataType::Decimal64 => {
            let f: f64 = s
                .parse()
                .map_err(|_| BindError::TypeConversion(format!("cannot parse '{s}' as decimal64")))?;
            serde_json::Number::from_f64(f)
                .map(Value::Number)
                .ok_or_else(|| BindError::TypeConversion(format!("non-finite decimal64: {s}")))
        }

        DataType::Boolean => match s {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            other => Err(BindError::TypeConversion(format!(
                "cannot parse '{other}' as boolean"
            ))),
        },

        DataType::Binary => {
            let bytes = BASE64
                .decode(s)
                .map_err(|e| BindError::TypeConversion(format!("base64 decode: {e}")))?;
            // canonical re-encode, so round-tripped values compare equal
            Ok(Value::String(BASE64.encode(bytes)))
        }

        DataType::Bits(allowed) => {
            for bit in s.split_whitespace() {
                if !allowed.iter().any(|a| a == bit) {
                    return Err(BindError::TypeConversion(format!(
                        "unknown bit name: {bit}"
                    )));
                }
            }
            Ok(Value::String(s.to_string()))
        }

        DataType::Enumeration(names) => {
            if !names.iter().any(|n| n == s) {
                return Err(BindError::TypeConversion(format!(
                    "enumeration value not found: {s}"
                )));
            }
            Ok(Value::String(s.to_string()))
        }

        DataType::Leafref(referred) => raw_str_to_leaf(s, value_namespace, referred),

        DataType::Union(members) => {
            for member in members {
                if let Ok(v) = raw_str_to_leaf(s, value_namespace, member) {
                    return Ok(v);
                }
            }
            Err(BindError::TypeConversion(format!(
                "no union member accepts '{s}'"
            )))
        }

        DataType::Empty => Ok(Value::Bool(true)),
    }
}

fn signed_to_raw(value: &Value, min: i64, max: i64) -> Result<RawLeaf> {
    let n = value_to_i64(value)?;
    if n < min || n > max {
        return Err(BindError::TypeConversion(format!(
            "{n} out of range [{min}, {max}]"
        )));
    }
    Ok(RawLeaf::value(n.to_string()))
}

fn unsigned_to_raw(value: &Value, max: u64) -> Result<RawLeaf> {
    let n = value_to_u64(value)?;
    if n > max {
        return Err(BindError::TypeConversion(format!(
            "{n} out of range [0, {max}]"
        )));
    }
    Ok(RawLeaf::value(n.to_string()))
}

fn parse_signed(s: &str, min: i64, max: i64) -> Result<Value> {
    let n: i64 = s
        .parse()
        .map_err(|_| BindError::TypeConversion(format!("cannot parse '{s}' as integer")))?;
    if n < min || n > max {
        return Err(BindError::TypeConversion(format!(
            "{n} out of range [{min}, {max}]"
        )));
    }
    Ok(Value::Number(n.into()))
}

fn parse_unsigned(s: &str, max: u64) -> Result<Value> {
    let n: u64 = s
        .parse()
        .map_err(|_| BindError::TypeConversion(format!("cannot parse '{s}' as unsigned integer")))?;
    if n > max {
        return Err(BindError::TypeConversion(format!(
            "{n} out of range [0, {max}]"
        )));
    }
    Ok(Value::Number(n.into()))
}

fn value_to_i64(value: &Value) -> Result<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| BindError::TypeConversion(format!("cannot convert {n} to i64"))),
        _ => Err(conversion("integer", value)),
    }
}

fn value_to_u64(value: &Value) -> Result<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| BindError::TypeConversion(format!("cannot convert {n} to u64"))),
        _ => Err(conversion("unsigned integer", value)),
    }
}

fn value_to_f64(value: &Value) -> Result<f64> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| BindError::TypeConversion(format!("cannot convert {n} to f64"))),
        _ => Err(conversion("decimal", value)),
    }
}

fn value_to_bool(value: &Value) -> Result<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        _ => Err(conversion("boolean", value)),
    }
}

fn conversion(expected: &str, got: &Value) -> BindError {
    BindError::TypeConversion(format!("expected {expected}, got {got:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integer_range_check() {
        assert!(leaf_to_raw(&json!(200), &DataType::Int8, "urn:t").is_err());
        let raw = leaf_to_raw(&json!(42), &DataType::Uint8, "urn:t").unwrap();
        assert_eq!(raw, RawLeaf::value("42".into()));
    }

    #[test]
    fn test_empty_type_flag() {
        assert_eq!(
            leaf_to_raw(&json!(false), &DataType::Empty, "urn:t").unwrap(),
            RawLeaf::Omitted
        );
        assert_eq!(
            leaf_to_raw(&json!(true), &DataType::Empty, "urn:t").unwrap(),
            RawLeaf::Present {
                value: None,
                namespace: None
            }
        );
        assert_eq!(raw_to_leaf(None, None, &DataType::Empty).unwrap(), json!(true));
    }

    #[test]
    fn test_identityref_carries_namespace() {
        let raw = leaf_to_raw(&json!("gigabit-ethernet"), &DataType::Identityref, "urn:if").unwrap();
        assert_eq!(
            raw,
            RawLeaf::Present {
                value: Some("gigabit-ethernet".into()),
                namespace: Some("urn:if".into()),
            }
        );
    }

    #[test]
    fn test_binary_roundtrip() {
        let raw = leaf_to_raw(&json!("aGVsbG8="), &DataType::Binary, "urn:t").unwrap();
        assert_eq!(raw, RawLeaf::value("aGVsbG8=".into()));
        assert_eq!(
            raw_to_leaf(Some("aGVsbG8="), None, &DataType::Binary).unwrap(),
            json!("aGVsbG8=")
        );
        assert!(leaf_to_raw(&json!("not base64!!"), &DataType::Binary, "urn:t").is_err());
    }

    #[test]
    fn test_enumeration_membership() {
        let ty = DataType::Enumeration(vec!["up".into(), "down".into()]);
        assert!(leaf_to_raw(&json!("up"), &ty, "urn:t").is_ok());
        assert!(leaf_to_raw(&json!("sideways"), &ty, "urn:t").is_err());
        assert!(raw_to_leaf(Some("sideways"), None, &ty).is_err());
    }

    #[test]
    fn test_union_tries_members_in_order() {
        let ty = DataType::Union(vec![DataType::Uint16, DataType::String]);
        assert_eq!(
            raw_to_leaf(Some("8080"), None, &ty).unwrap(),
            json!(8080)
        );
        assert_eq!(
            raw_to_leaf(Some("any"), None, &ty).unwrap(),
            json!("any")
        );
    }

    #[test]
    fn test_bits_validated() {
        let ty = DataType::Bits(vec!["sync".into(), "auto".into()]);
        assert!(leaf_to_raw(&json!("sync auto"), &ty, "urn:t").is_ok());
        assert!(leaf_to_raw(&json!("sync fast"), &ty, "urn:t").is_err());
    }

    #[test]
    fn test_leafref_resolves_through_referred_type() {
        let ty = DataType::Leafref(Box::new(DataType::Uint32));
        assert_eq!(raw_to_leaf(Some("9"), None, &ty).unwrap(), json!(9));
    }
}
