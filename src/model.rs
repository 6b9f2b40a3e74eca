use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};

/// A product record as served by the backend.
///
/// Decoding is lenient: numeric fields that arrive as strings, `null` or
/// garbage coerce to a number (non-numeric becomes 0) and text fields that
/// arrive as `null` or are absent become empty strings. The table never
/// refuses to show a row because the backend sent a sloppy value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub id: i64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price: f64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub quantity: i64,
}

/// JSON body sent on `POST /products` and `PUT /products/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductPayload {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub quantity: Number,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

/// Coerce an arbitrary JSON value to a number: strings are parsed, booleans
/// map to 0/1, anything else (including NaN and infinities) is 0.
pub fn coerce_f64(value: &Value) -> f64 {
    let n = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                0.0
            } else {
                s.parse::<f64>().unwrap_or(0.0)
            }
        }
        Value::Bool(true) => 1.0,
        _ => 0.0,
    };
    if n.is_finite() {
        n
    } else {
        0.0
    }
}

/// JSON number for a validated quantity; whole values serialize as integers.
pub fn quantity_number(quantity: f64) -> Number {
    if quantity.fract() == 0.0 && quantity <= i64::MAX as f64 {
        Number::from(quantity as i64)
    } else {
        Number::from_f64(quantity).unwrap_or_else(|| Number::from(0))
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_f64(&value))
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if let Some(i) = value.as_i64() {
        return Ok(i);
    }
    Ok(coerce_f64(&value).trunc() as i64)
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_well_formed_product() {
        let p: Product = serde_json::from_value(json!({
            "id": 3, "name": "Pen", "description": "A blue ink pen", "price": 1.99, "quantity": 100
        }))
        .unwrap();
        assert_eq!(p.id, 3);
        assert_eq!(p.name, "Pen");
        assert_eq!(p.price, 1.99);
        assert_eq!(p.quantity, 100);
    }

    #[test]
    fn sloppy_fields_coerce() {
        let p: Product = serde_json::from_value(json!({
            "id": "7", "name": null, "price": "abc", "quantity": "12"
        }))
        .unwrap();
        assert_eq!(p.id, 7);
        assert_eq!(p.name, "");
        assert_eq!(p.description, "");
        assert_eq!(p.price, 0.0);
        assert_eq!(p.quantity, 12);
    }

    #[test]
    fn payload_omits_absent_id() {
        let payload = ProductPayload {
            name: "Lamp".into(),
            description: "Desk lamp".into(),
            price: 19.5,
            quantity: quantity_number(4.0),
            id: None,
        };
        let body = serde_json::to_value(&payload).unwrap();
        assert_eq!(body, json!({"name": "Lamp", "description": "Desk lamp", "price": 19.5, "quantity": 4}));

        let body = serde_json::to_value(ProductPayload { id: Some(42), ..payload }).unwrap();
        assert_eq!(body["id"], 42);
    }

    #[test]
    fn coerce_handles_edge_values() {
        assert_eq!(coerce_f64(&json!(" 2.5 ")), 2.5);
        assert_eq!(coerce_f64(&json!("")), 0.0);
        assert_eq!(coerce_f64(&json!("inf")), 0.0);
        assert_eq!(coerce_f64(&json!(true)), 1.0);
        assert_eq!(coerce_f64(&json!([1])), 0.0);
        assert_eq!(quantity_number(2.5), Number::from_f64(2.5).unwrap());
    }
}
