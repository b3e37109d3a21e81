//! DICOM JSON view of a data set.
//!
//! Each element becomes an entry keyed by its tag in uppercase hexadecimal
//! (`"GGGGEEEE"`), holding the VR and the values:
//!
//! ```json
//! {
//!   "00100010": { "vr": "PN", "Value": [{ "Alphabetic": "Doe^John" }] },
//!   "00280010": { "vr": "US", "Value": [512] },
//!   "7FE00010": { "vr": "OW", "InlineBinary": "AAEAAg==" }
//! }
//! ```
use crate::mem::DataSet;
use base64::Engine;
use dicomkit_core::header::Header;
use dicomkit_core::{Element, Value, VR};
use dicomkit_encoding::primitive::{encode_value, extend_swapped, word_size};
use dicomkit_encoding::Endianness;
use serde_json::{json, Map, Value as JsonValue};

impl<D> DataSet<D> {
    /// Produce the DICOM JSON representation of the data set.
    ///
    /// Encapsulated pixel data has no inline representation
    /// and is reported with its VR only.
    pub fn to_json(&self) -> JsonValue {
        elements_to_json(self.into_iter())
    }
}

fn elements_to_json<'a, I>(elements: I) -> JsonValue
where
    I: IntoIterator<Item = &'a Element>,
{
    let mut map = Map::new();
    for element in elements {
        let tag = element.tag();
        map.insert(
            format!("{:04X}{:04X}", tag.group(), tag.element()),
            element_to_json(element),
        );
    }
    JsonValue::Object(map)
}

fn element_to_json(element: &Element) -> JsonValue {
    let vr = element.vr();
    let mut map = Map::new();
    map.insert("vr".to_string(), JsonValue::from(vr.to_string()));

    match element.value() {
        Value::Empty => {}
        Value::Str(s) if s.is_empty() => {}
        Value::Sequence(items) => {
            let items = items.iter().map(|item| elements_to_json(item.elements()));
            map.insert("Value".to_string(), JsonValue::Array(items.collect()));
        }
        Value::PixelSequence(_) => {
            tracing::debug!("Encapsulated pixel data left out of JSON");
        }
        value => match vr {
            VR::OB | VR::OD | VR::OF | VR::OL | VR::OV | VR::OW | VR::UN => {
                let mut bytes = Vec::new();
                let encoded = match (value, word_size(vr)) {
                    (Value::Bytes(raw), Some(size)) if element.byte_order() != Endianness::Little => {
                        extend_swapped(&mut bytes, raw, size);
                        true
                    }
                    _ => encode_value(&mut bytes, value, Endianness::Little).is_ok(),
                };
                // primitive values always encode
                if encoded {
                    let text = base64::engine::general_purpose::STANDARD.encode(bytes);
                    map.insert("InlineBinary".to_string(), JsonValue::from(text));
                }
            }
            VR::PN => {
                let names = strings(value)
                    .into_iter()
                    .map(|name| match name {
                        JsonValue::String(s) => json!({ "Alphabetic": s }),
                        other => other,
                    })
                    .collect();
                map.insert("Value".to_string(), JsonValue::Array(names));
            }
            VR::AT => {
                let tags: Vec<JsonValue> = match value {
                    Value::Tags(tags) => tags
                        .iter()
                        .map(|t| JsonValue::from(format!("{:04X}{:04X}", t.group(), t.element())))
                        .collect(),
                    other => strings(other),
                };
                map.insert("Value".to_string(), JsonValue::Array(tags));
            }
            VR::FD | VR::FL | VR::IS | VR::DS | VR::SL | VR::SS | VR::SV | VR::UL | VR::US | VR::UV => {
                map.insert("Value".to_string(), JsonValue::Array(numbers(value)));
            }
            _ => {
                map.insert("Value".to_string(), JsonValue::Array(strings(value)));
            }
        },
    }
    JsonValue::Object(map)
}

/// Text values, with empty values as `null`.
fn strings(value: &Value) -> Vec<JsonValue> {
    match value.to_multi_str() {
        Ok(values) => values
            .into_iter()
            .map(|s| {
                if s.is_empty() {
                    JsonValue::Null
                } else {
                    JsonValue::String(s)
                }
            })
            .collect(),
        Err(_) => Vec::new(),
    }
}

fn numbers(value: &Value) -> Vec<JsonValue> {
    match value {
        Value::U16(v) => v.iter().map(|&n| json!(n)).collect(),
        Value::I16(v) => v.iter().map(|&n| json!(n)).collect(),
        Value::U32(v) => v.iter().map(|&n| json!(n)).collect(),
        Value::I32(v) => v.iter().map(|&n| json!(n)).collect(),
        Value::U64(v) => v.iter().map(|&n| json!(n)).collect(),
        Value::I64(v) => v.iter().map(|&n| json!(n)).collect(),
        Value::F32(v) => v.iter().map(|&n| json!(n)).collect(),
        Value::F64(v) => v.iter().map(|&n| json!(n)).collect(),
        // IS and DS
        other => strings(other)
            .into_iter()
            .map(|s| match s {
                JsonValue::String(s) => s
                    .parse::<i64>()
                    .map(JsonValue::from)
                    .or_else(|_| s.parse::<f64>().map(|f| json!(f)))
                    .unwrap_or(JsonValue::String(s)),
                other => other,
            })
            .collect(),
    }
}
