//! Conversion between plain JSON and Firestore's typed value encoding.
//!
//! Firestore REST wraps every value in a single-key object naming its type,
//! e.g. `{"integerValue": "3"}` or `{"arrayValue": {"values": [...]}}`.

use serde_json::{json, Map, Number, Value};

use crate::{Error, Result};

/// Encode a JSON object as a Firestore `fields` map.
pub fn encode_fields(object: &Map<String, Value>) -> Map<String, Value> {
    object
        .iter()
        .map(|(key, value)| (key.clone(), encode_value(value)))
        .collect()
}

pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(flag) => json!({ "booleanValue": flag }),
        Value::Number(number) => {
            if let Some(integer) = number.as_i64() {
                // int64 travels as a decimal string.
                json!({ "integerValue": integer.to_string() })
            } else if let Some(integer) = number.as_u64() {
                json!({ "integerValue": integer.to_string() })
            } else {
                json!({ "doubleValue": number.as_f64() })
            }
        }
        Value::String(text) => json!({ "stringValue": text }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() }
        }),
        Value::Object(object) => json!({ "mapValue": { "fields": encode_fields(object) } }),
    }
}

/// Decode a Firestore `fields` map into a plain JSON object.
pub fn decode_fields(fields: &Map<String, Value>) -> Result<Map<String, Value>> {
    fields
        .iter()
        .map(|(key, value)| {
            decode_value(value)
                .map(|decoded| (key.clone(), decoded))
                .map_err(|error| Error::Store(format!("field '{key}': {error}")))
        })
        .collect()
}

pub fn decode_value(value: &Value) -> Result<Value> {
    let Some((kind, inner)) = value.as_object().and_then(|object| object.iter().next()) else {
        return Err(Error::Store(format!("malformed Firestore value: {value}")));
    };

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => inner
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| malformed(kind, inner)),
        "integerValue" => decode_integer(inner).ok_or_else(|| malformed(kind, inner)),
        "doubleValue" => inner
            .as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| malformed(kind, inner)),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner
            .as_str()
            .map(|text| Value::String(text.to_string()))
            .ok_or_else(|| malformed(kind, inner)),
        "geoPointValue" => Ok(json!({
            "latitude": inner.get("latitude").cloned().unwrap_or(json!(0.0)),
            "longitude": inner.get("longitude").cloned().unwrap_or(json!(0.0)),
        })),
        "arrayValue" => {
            let values = match inner.get("values") {
                None => Vec::new(),
                Some(Value::Array(values)) => values
                    .iter()
                    .map(decode_value)
                    .collect::<Result<Vec<_>>>()?,
                Some(other) => return Err(malformed(kind, other)),
            };
            Ok(Value::Array(values))
        }
        "mapValue" => match inner.get("fields") {
            None => Ok(Value::Object(Map::new())),
            Some(Value::Object(fields)) => decode_fields(fields).map(Value::Object),
            Some(other) => Err(malformed(kind, other)),
        },
        other => Err(Error::Store(format!(
            "unsupported Firestore value type '{other}'"
        ))),
    }
}

fn decode_integer(inner: &Value) -> Option<Value> {
    match inner {
        Value::String(text) => text.parse::<i64>().ok().map(|integer| json!(integer)),
        Value::Number(number) => number.as_i64().map(|integer| json!(integer)),
        _ => None,
    }
}

fn malformed(kind: &str, inner: &Value) -> Error {
    Error::Store(format!("malformed {kind}: {inner}"))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn encode_distinguishes_integers_and_doubles() {
        assert_eq!(encode_value(&json!(3)), json!({ "integerValue": "3" }));
        assert_eq!(encode_value(&json!(1500.5)), json!({ "doubleValue": 1500.5 }));
        assert_eq!(encode_value(&json!(1500.0)), json!({ "doubleValue": 1500.0 }));
    }

    #[test]
    fn encode_nested_structures() {
        let encoded = encode_value(&json!({ "urls": ["a", "b"], "flag": true }));
        assert_eq!(
            encoded,
            json!({
                "mapValue": {
                    "fields": {
                        "urls": { "arrayValue": { "values": [
                            { "stringValue": "a" },
                            { "stringValue": "b" }
                        ] } },
                        "flag": { "booleanValue": true }
                    }
                }
            })
        );
    }

    #[test]
    fn decode_document_fields() {
        let fields = json!({
            "bedrooms": { "integerValue": "2" },
            "regularPrice": { "doubleValue": 1200.5 },
            "parking": { "booleanValue": true },
            "name": { "stringValue": "Flat" },
            "timestamp": { "timestampValue": "2024-03-01T10:00:00.123Z" },
            "imageUrls": { "arrayValue": {} },
            "geolocation": { "mapValue": { "fields": { "lat": { "doubleValue": 1.5 } } } },
            "discountedPrice": { "nullValue": null }
        });

        let decoded = decode_fields(fields.as_object().unwrap()).unwrap();
        assert_eq!(decoded["bedrooms"], json!(2));
        assert_eq!(decoded["regularPrice"], json!(1200.5));
        assert_eq!(decoded["parking"], json!(true));
        assert_eq!(decoded["timestamp"], json!("2024-03-01T10:00:00.123Z"));
        assert_eq!(decoded["imageUrls"], json!([]));
        assert_eq!(decoded["geolocation"]["lat"], json!(1.5));
        assert_eq!(decoded["discountedPrice"], Value::Null);
    }

    #[test]
    fn decode_rejects_malformed_values() {
        assert!(decode_value(&json!({ "integerValue": "abc" })).is_err());
        assert!(decode_value(&json!({ "unknownValue": 1 })).is_err());
        assert!(decode_value(&json!("bare")).is_err());
    }

    #[test]
    fn encode_then_decode_preserves_listing_shape() {
        let original = json!({
            "type": "sale",
            "bedrooms": 4,
            "regularPrice": 250000.0,
            "imageUrls": ["https://img/1.jpg"]
        });
        let encoded = encode_fields(original.as_object().unwrap());
        let decoded = decode_fields(&encoded).unwrap();
        assert_eq!(Value::Object(decoded), original);
    }
}
