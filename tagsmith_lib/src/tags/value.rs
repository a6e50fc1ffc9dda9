//---------------------------------------------------------------------------//
// Copyright (c) 2025 The tagsmith contributors. All rights reserved.
//
// This file is part of the tagsmith project, a schema-driven codec and
// version migrator for game engine tag files.
//
// This file is licensed under the MIT license, which can be found here:
// https://opensource.org/licenses/MIT
//---------------------------------------------------------------------------//

//! Module with the decoded tag tree: [`Element`] records holding [`TagValue`]
//! leaves plus the framing sidecars of their blocks and structs.
//!
//! Floats are held as [`f64`], an exact superset of the stored `f32`, so the
//! sign of zero survives the round trip natively. Opaque byte runs are held
//! raw and only become base64 in JSON dumps.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{json, Map, Number, Value};

use std::collections::BTreeMap;

use crate::error::{Result, TagLibError};
use crate::groups::FourCC;

//---------------------------------------------------------------------------//
//                              Enums & Structs
//---------------------------------------------------------------------------//

/// The two unknown ints stored beside a block's element count.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BlockFrame {
    pub unk1: i64,
    pub unk2: i64,
}

/// The version stamp of a block or struct: `(name, version, size)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlockHeader {
    pub name: FourCC,
    pub version: i32,
    pub size: i32,
}

/// An inline reference to another tag: group fourcc plus a path resolved
/// against the resource stream.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TagRef {
    pub group: Option<String>,
    pub unk1: i64,
    pub length: i64,
    pub unk2: i64,
    pub path: String,
}

/// A variable-length binary blob, described inline and stored in the resource stream.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataBlob {
    pub length: i64,
    pub unk1: i64,
    pub unk2: i64,
    pub unk3: i64,
    pub unk4: i64,
    pub bytes: Vec<u8>,
}

/// One decoded leaf (or block of child records).
#[derive(Clone, Debug, PartialEq)]
pub enum TagValue {
    Int(i64),
    Real(f64),
    Ints(Vec<i64>),
    Reals(Vec<f64>),
    Bounds { min: f64, max: f64 },
    Enum { kind: String, value: i64 },
    Color { alpha: Option<f64>, red: f64, green: f64, blue: f64 },
    Str(String),
    Bytes(Vec<u8>),
    Block(Vec<Element>),
    TagRef(TagRef),
    Data(DataBlob),
}

/// One decoded record: named leaves plus the sidecar maps of its blocks and
/// structs, all keyed by the owning field name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Element {
    pub values: BTreeMap<String, TagValue>,
    pub block_frames: BTreeMap<String, BlockFrame>,
    pub block_headers: BTreeMap<String, BlockHeader>,
    pub struct_headers: BTreeMap<String, BlockHeader>,
}

//---------------------------------------------------------------------------//
//                       Implementation of BlockHeader
//---------------------------------------------------------------------------//

impl Default for BlockHeader {
    fn default() -> Self {
        Self::tbfd(0, 0)
    }
}

impl BlockHeader {

    /// This function builds a header with the standard block fourcc.
    pub fn tbfd(version: i32, size: i32) -> Self {
        Self {
            name: FourCC::new(b"tbfd"),
            version,
            size,
        }
    }

    pub fn new(name: &[u8; 4], version: i32, size: i32) -> Self {
        Self {
            name: FourCC::new(name),
            version,
            size,
        }
    }

    pub(crate) fn to_json(self) -> Value {
        json!({
            "name": self.name.to_string(),
            "version": self.version,
            "size": self.size,
        })
    }

    pub(crate) fn from_json(value: &Value) -> Option<Self> {
        Some(Self {
            name: FourCC::from_str(value.get("name")?.as_str()?)?,
            version: value.get("version")?.as_i64()? as i32,
            size: value.get("size")?.as_i64()? as i32,
        })
    }
}

//---------------------------------------------------------------------------//
//                       Implementation of TagValue
//---------------------------------------------------------------------------//

impl TagValue {

    /// Integer view of the value. Reals round, the way short fields get written.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            Self::Real(value) => Some(value.round() as i64),
            Self::Enum { value, .. } => Some(*value),
            _ => None,
        }
    }

    /// Float view of the value.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Self::Real(value) => Some(*value),
            Self::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bounds(&self) -> Option<(f64, f64)> {
        match self {
            Self::Bounds { min, max } => Some((*min, *max)),
            _ => None,
        }
    }

    /// Raw-bytes view of opaque padding values. JSON round trips store them as
    /// base64 strings, so both representations are accepted.
    pub fn as_padding_bytes(&self) -> Option<Vec<u8>> {
        match self {
            Self::Bytes(bytes) => Some(bytes.clone()),
            Self::Str(encoded) => BASE64.decode(encoded).ok(),
            _ => None,
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Self::Int(value) => json!(value),
            Self::Real(value) => json_real(*value),
            Self::Ints(values) => Value::Array(values.iter().map(|value| json!(value)).collect()),
            Self::Reals(values) => Value::Array(values.iter().map(|value| json_real(*value)).collect()),
            Self::Bounds { min, max } => json!({ "Min": json_real(*min), "Max": json_real(*max) }),
            Self::Enum { kind, value } => json!({ "type": kind, "value": value, "value name": "" }),
            Self::Color { alpha, red, green, blue } => {
                let mut map = Map::new();
                if let Some(alpha) = alpha {
                    map.insert("A".to_owned(), json_real(*alpha));
                }

                map.insert("R".to_owned(), json_real(*red));
                map.insert("G".to_owned(), json_real(*green));
                map.insert("B".to_owned(), json_real(*blue));
                Value::Object(map)
            },
            Self::Str(value) => json!(value),
            Self::Bytes(bytes) => json!(BASE64.encode(bytes)),
            Self::Block(elements) => Value::Array(elements.iter().map(Element::to_json).collect()),
            Self::TagRef(tag_ref) => json!({
                "group name": tag_ref.group,
                "unk1": tag_ref.unk1,
                "length": tag_ref.length,
                "unk2": tag_ref.unk2,
                "path": tag_ref.path,
            }),
            Self::Data(blob) => json!({
                "length": blob.length,
                "unk1": blob.unk1,
                "unk2": blob.unk2,
                "unk3": blob.unk3,
                "unk4": blob.unk4,
                "encoded": BASE64.encode(&blob.bytes),
            }),
        }
    }

    fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Number(number) => match number.as_i64() {
                Some(int) if !number.is_f64() => Ok(Self::Int(int)),
                _ => Ok(Self::Real(number.as_f64().unwrap_or_default())),
            },
            Value::String(value) => Ok(Self::Str(value.clone())),
            Value::Bool(value) => Ok(Self::Int(*value as i64)),
            Value::Null => Ok(Self::Real(0.0)),
            Value::Array(entries) => {
                if entries.iter().all(|entry| entry.is_object()) && !entries.is_empty() {
                    let elements = entries.iter().map(Element::from_json).collect::<Result<Vec<_>>>()?;
                    Ok(Self::Block(elements))
                } else if entries.iter().all(Value::is_number) && !entries.is_empty() {
                    if entries.iter().all(|entry| entry.as_i64().is_some() && !entry.is_f64()) {
                        Ok(Self::Ints(entries.iter().filter_map(Value::as_i64).collect()))
                    } else {
                        Ok(Self::Reals(entries.iter().filter_map(Value::as_f64).collect()))
                    }
                } else {
                    // Empty arrays are empty blocks.
                    Ok(Self::Block(vec![]))
                }
            },
            Value::Object(map) => {
                if map.contains_key("Min") && map.contains_key("Max") {
                    Ok(Self::Bounds {
                        min: map.get("Min").and_then(Value::as_f64).unwrap_or_default(),
                        max: map.get("Max").and_then(Value::as_f64).unwrap_or_default(),
                    })
                } else if map.contains_key("type") && map.contains_key("value") {
                    Ok(Self::Enum {
                        kind: map.get("type").and_then(Value::as_str).unwrap_or_default().to_owned(),
                        value: map.get("value").and_then(Value::as_i64).unwrap_or_default(),
                    })
                } else if map.contains_key("R") && map.contains_key("G") && map.contains_key("B") {
                    Ok(Self::Color {
                        alpha: map.get("A").and_then(Value::as_f64),
                        red: map.get("R").and_then(Value::as_f64).unwrap_or_default(),
                        green: map.get("G").and_then(Value::as_f64).unwrap_or_default(),
                        blue: map.get("B").and_then(Value::as_f64).unwrap_or_default(),
                    })
                } else if map.contains_key("path") || map.contains_key("group name") {
                    Ok(Self::TagRef(TagRef {
                        group: map.get("group name").and_then(Value::as_str).map(|group| group.to_owned()),
                        unk1: map.get("unk1").and_then(Value::as_i64).unwrap_or_default(),
                        length: map.get("length").and_then(Value::as_i64).unwrap_or_default(),
                        unk2: map.get("unk2").and_then(Value::as_i64).unwrap_or_default(),
                        path: map.get("path").and_then(Value::as_str).unwrap_or_default().to_owned(),
                    }))
                } else if map.contains_key("encoded") {
                    Ok(Self::Data(DataBlob {
                        length: map.get("length").and_then(Value::as_i64).unwrap_or_default(),
                        unk1: map.get("unk1").and_then(Value::as_i64).unwrap_or_default(),
                        unk2: map.get("unk2").and_then(Value::as_i64).unwrap_or_default(),
                        unk3: map.get("unk3").and_then(Value::as_i64).unwrap_or_default(),
                        unk4: map.get("unk4").and_then(Value::as_i64).unwrap_or_default(),
                        bytes: BASE64.decode(map.get("encoded").and_then(Value::as_str).unwrap_or_default())?,
                    }))
                } else {
                    Err(TagLibError::JsonDumpMissingKey("a recognizable value shape".to_owned()))
                }
            },
        }
    }
}

/// Non-finite floats have no JSON representation; they round-trip as strings.
fn json_real(value: f64) -> Value {
    match Number::from_f64(value) {
        Some(number) => Value::Number(number),
        None => Value::String(value.to_string()),
    }
}

//---------------------------------------------------------------------------//
//                       Implementation of Element
//---------------------------------------------------------------------------//

impl Element {

    pub fn get(&self, key: &str) -> Option<&TagValue> {
        self.values.get(key)
    }

    pub fn set(&mut self, key: &str, value: TagValue) {
        self.values.insert(key.to_owned(), value);
    }

    pub fn pop(&mut self, key: &str) -> Option<TagValue> {
        self.values.remove(key)
    }

    /// This function pops a value as an integer, or returns the provided default.
    pub fn pop_int(&mut self, key: &str, default: i64) -> i64 {
        self.pop(key).and_then(|value| value.as_int()).unwrap_or(default)
    }

    /// This function pops a value as a float, or returns the provided default.
    pub fn pop_real(&mut self, key: &str, default: f64) -> f64 {
        self.pop(key).and_then(|value| value.as_real()).unwrap_or(default)
    }

    /// This function pops a value as a string, or returns the provided default.
    pub fn pop_string(&mut self, key: &str, default: &str) -> String {
        match self.pop(key) {
            Some(TagValue::Str(value)) => value,
            _ => default.to_owned(),
        }
    }

    /// This function pops a value as a bounds pair, or returns the provided default.
    pub fn pop_bounds(&mut self, key: &str, default: (f64, f64)) -> (f64, f64) {
        self.pop(key).and_then(|value| value.as_bounds()).unwrap_or(default)
    }

    /// This function returns a block's child records, if the value is a block.
    pub fn block(&self, key: &str) -> Option<&Vec<Element>> {
        match self.values.get(key) {
            Some(TagValue::Block(elements)) => Some(elements),
            _ => None,
        }
    }

    /// Same as [`Self::block`], but mutable.
    pub fn block_mut(&mut self, key: &str) -> Option<&mut Vec<Element>> {
        match self.values.get_mut(key) {
            Some(TagValue::Block(elements)) => Some(elements),
            _ => None,
        }
    }

    /// This function pops a block's child records, or returns an empty list.
    pub fn take_block(&mut self, key: &str) -> Vec<Element> {
        match self.pop(key) {
            Some(TagValue::Block(elements)) => elements,
            _ => vec![],
        }
    }

    /// This function moves a value from one key to another, keeping it untouched if missing.
    pub fn rename(&mut self, old_key: &str, new_key: &str) {
        if let Some(value) = self.values.remove(old_key) {
            self.values.insert(new_key.to_owned(), value);
        }
    }

    /// This function dumps the record to the JSON shape used by dump files:
    /// sidecars flattened beside their fields under `TagBlock_*`,
    /// `TagBlockHeader_*` and `StructHeader_*` keys.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();

        for (key, frame) in &self.block_frames {
            map.insert(format!("TagBlock_{key}"), json!({ "unk1": frame.unk1, "unk2": frame.unk2 }));
        }

        for (key, header) in &self.block_headers {
            map.insert(format!("TagBlockHeader_{key}"), header.to_json());
        }

        for (key, header) in &self.struct_headers {
            map.insert(format!("StructHeader_{key}"), header.to_json());
        }

        for (key, value) in &self.values {
            map.insert(key.clone(), value.to_json());
        }

        Value::Object(map)
    }

    /// This function rebuilds a record from its JSON dump shape.
    pub fn from_json(value: &Value) -> Result<Self> {
        let map = value.as_object().ok_or_else(|| TagLibError::JsonDumpMissingKey("an object".to_owned()))?;
        let mut element = Self::default();

        for (key, value) in map {
            if let Some(name) = key.strip_prefix("TagBlock_") {
                element.block_frames.insert(name.to_owned(), BlockFrame {
                    unk1: value.get("unk1").and_then(Value::as_i64).unwrap_or_default(),
                    unk2: value.get("unk2").and_then(Value::as_i64).unwrap_or_default(),
                });
            } else if let Some(name) = key.strip_prefix("TagBlockHeader_") {
                if let Some(header) = BlockHeader::from_json(value) {
                    element.block_headers.insert(name.to_owned(), header);
                }
            } else if let Some(name) = key.strip_prefix("StructHeader_") {
                if let Some(header) = BlockHeader::from_json(value) {
                    element.struct_headers.insert(name.to_owned(), header);
                }
            } else {
                element.values.insert(key.clone(), TagValue::from_json(value)?);
            }
        }

        Ok(element)
    }
}
