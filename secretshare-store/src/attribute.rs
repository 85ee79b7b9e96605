//! Item and attribute value model (DynamoDB wire shape)

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// An item: attribute name to value
pub type Item = HashMap<String, AttributeValue>;

/// Typed attribute value. Serializes as DynamoDB JSON, e.g. `{"S": "x"}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
#[allow(non_snake_case)]
pub enum AttributeValue {
    S { S: String },
    N { N: String },
    /// Base64-encoded binary
    B { B: String },
    BOOL { BOOL: bool },
    NULL { NULL: bool },
    L { L: Vec<AttributeValue> },
    M { M: HashMap<String, AttributeValue> },
    SS { SS: Vec<String> },
    NS { NS: Vec<String> },
}

impl AttributeValue {
    pub fn string(s: impl Into<String>) -> Self {
        AttributeValue::S { S: s.into() }
    }

    pub fn number(n: impl ToString) -> Self {
        AttributeValue::N { N: n.to_string() }
    }

    /// Get the string value if this is an S type
    pub fn as_string(&self) -> Option<&str> {
        match self {
            AttributeValue::S { S } => Some(S),
            _ => None,
        }
    }

    /// Get the number string if this is an N type
    pub fn as_number(&self) -> Option<&str> {
        match self {
            AttributeValue::N { N } => Some(N),
            _ => None,
        }
    }

    /// Get an N value as an integer
    pub fn as_i64(&self) -> Option<i64> {
        self.as_number().and_then(|n| n.trim().parse().ok())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            AttributeValue::S { .. } => "S",
            AttributeValue::N { .. } => "N",
            AttributeValue::B { .. } => "B",
            AttributeValue::BOOL { .. } => "BOOL",
            AttributeValue::NULL { .. } => "NULL",
            AttributeValue::L { .. } => "L",
            AttributeValue::M { .. } => "M",
            AttributeValue::SS { .. } => "SS",
            AttributeValue::NS { .. } => "NS",
        }
    }
}

/// Order two values of the same scalar type. Values of different types, or of
/// non-scalar types, are not comparable.
pub fn compare(a: &AttributeValue, b: &AttributeValue) -> Option<Ordering> {
    match (a, b) {
        (AttributeValue::S { S: s1 }, AttributeValue::S { S: s2 }) => Some(s1.cmp(s2)),
        (AttributeValue::N { N: n1 }, AttributeValue::N { N: n2 }) => {
            let num1: f64 = n1.trim().parse().ok()?;
            let num2: f64 = n2.trim().parse().ok()?;
            num1.partial_cmp(&num2)
        }
        (AttributeValue::B { B: b1 }, AttributeValue::B { B: b2 }) => Some(b1.cmp(b2)),
        (AttributeValue::BOOL { BOOL: b1 }, AttributeValue::BOOL { BOOL: b2 }) => {
            Some(b1.cmp(b2))
        }
        _ => None,
    }
}

/// Get an attribute from an item using dot notation for nested maps
pub fn get_path<'a>(item: &'a Item, path: &str) -> Option<&'a AttributeValue> {
    let mut parts = path.split('.');
    let mut current = item.get(parts.next()?);

    for part in parts {
        match current {
            Some(AttributeValue::M { M: map }) => current = map.get(part),
            _ => return None,
        }
    }

    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_format() {
        let value: AttributeValue = serde_json::from_value(json!({"N": "1700000000"})).unwrap();
        assert_eq!(value, AttributeValue::number(1_700_000_000));
        assert_eq!(value.as_i64(), Some(1_700_000_000));

        let encoded = serde_json::to_value(AttributeValue::string("abc")).unwrap();
        assert_eq!(encoded, json!({"S": "abc"}));
    }

    #[test]
    fn test_compare_numbers_numerically() {
        assert_eq!(
            compare(&AttributeValue::number(9), &AttributeValue::number(10)),
            Some(Ordering::Less)
        );
        assert_eq!(
            compare(&AttributeValue::number("10.0"), &AttributeValue::number(10)),
            Some(Ordering::Equal)
        );
    }

    #[test]
    fn test_compare_mismatched_types() {
        assert_eq!(
            compare(&AttributeValue::string("10"), &AttributeValue::number(10)),
            None
        );
        assert_eq!(
            compare(&AttributeValue::number("abc"), &AttributeValue::number(1)),
            None
        );
    }

    #[test]
    fn test_get_path_nested() {
        let item: Item = serde_json::from_value(json!({
            "meta": {"M": {"owner": {"S": "alice"}}},
            "flat": {"S": "x"}
        }))
        .unwrap();

        assert_eq!(get_path(&item, "meta.owner").and_then(|v| v.as_string()), Some("alice"));
        assert_eq!(get_path(&item, "flat").and_then(|v| v.as_string()), Some("x"));
        assert!(get_path(&item, "flat.inner").is_none());
        assert!(get_path(&item, "missing").is_none());
    }
}
