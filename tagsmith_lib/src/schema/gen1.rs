//---------------------------------------------------------------------------//
// Copyright (c) 2025 The tagsmith contributors. All rights reserved.
//
// This file is part of the tagsmith project, a schema-driven codec and
// version migrator for game engine tag files.
//
// This file is licensed under the MIT license, which can be found here:
// https://opensource.org/licenses/MIT
//---------------------------------------------------------------------------//

//! First-generation definition front-end.
//!
//! Gen1 definitions are JSON files whose top-level entries describe groups,
//! structs, bitfields, enums and scalar aliases in a legacy key vocabulary.
//! This module translates them into the same node trees the Gen2 front-end
//! produces, so both share the resolution pipeline of [`crate::schema`]. Each
//! group gets a single field set at version 0.

use log::warn;
use serde_json::Value;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{Result, TagLibError};
use crate::groups::Generation;

use super::gen2::{collect_files, collect_regolith};
use super::raw::RawNode;
use super::{RawDefs, Schema};

/// Nesting limit for `inherits:` chains, to keep broken sources from recursing forever.
const MAX_INHERITS_DEPTH: usize = 64;

/// Translation table from the legacy field keys to the canonical field kinds.
const LEGACY_KIND_CONVERSION: &[(&str, &str)] = &[
    ("Angle", "Angle"),
    ("ColorARGBFloat", "RealArgbColor"),
    ("ColorARGBInt", "ArgbColor"),
    ("ColorRGBFloat", "RealRgbColor"),
    ("Data", "Data"),
    ("Euler2D", "RealEulerAngles2D"),
    ("ID", "LongInteger"),
    ("Index", "ShortInteger"),
    ("Rectangle", "Rectangle2D"),
    ("Reflexive", "Block"),
    ("String32", "String"),
    ("TagID", "LongInteger"),
    ("TagReference", "TagReference"),
    ("Vector2D", "RealPoint2D"),
    ("Vector2DInt", "Point2D"),
    ("Vector3D", "RealVector3D"),
    ("bitfield16", "WordFlags"),
    ("bitfield32", "LongFlags"),
    ("bitfield8", "ByteFlags"),
    ("editor_section", "Explanation"),
    ("enum", "ShortEnum"),
    ("float", "Real"),
    ("int16", "ShortInteger"),
    ("int32", "LongInteger"),
    ("int8", "CharInteger"),
    ("pad", "Pad"),
    ("struct", "Struct"),
    ("uint16", "ShortInteger"),
    ("uint32", "LongInteger"),
    ("uint8", "CharInteger"),
    ("TagGroup", "Tag"),
    ("Address", "LongInteger"),
    ("Quaternion", "RealQuaternion"),
    ("Plane3D", "RealPlane3D"),
    ("Plane2D", "RealPlane2D"),
    ("Euler3D", "RealEulerAngles3D"),
    ("Matrix3x3", "Matrix3x3"),
    ("FileData", "Data"),
    ("CompressedVector3D", "LongInteger"),
    ("CompressedFloat", "ShortInteger"),
    ("BSPVertexData", "Data"),
    ("UTF16String", "Data"),
    ("RealBounds", "RealBounds"),
    ("AngleBounds", "AngleBounds"),
    ("ShortBounds", "ShortBounds"),
];

/// This function loads and resolves a Gen1 definition folder.
pub fn load(defs_path: &Path) -> Result<Schema> {
    let defs = load_defs(defs_path)?;
    Schema::from_defs(defs, Generation::Gen1)
}

/// This function reads every JSON file in the provided folder and translates
/// its entries into tag group node trees.
pub(crate) fn load_defs(defs_path: &Path) -> Result<RawDefs> {
    let mut paths = vec![];
    collect_files(defs_path, "json", &mut paths)
        .map_err(|_| TagLibError::DefinitionFolderNotFound(defs_path.to_string_lossy().to_string()))?;

    paths.sort();

    let mut all_entries = vec![];
    for path in &paths {
        match serde_json::from_slice::<Value>(&fs::read(path)?) {
            Ok(Value::Array(entries)) => all_entries.extend(entries),
            Ok(_) => {},
            Err(error) => warn!("Error in {}: {error}", path.display()),
        }
    }

    let defs = build_defs(&all_entries)?;
    if defs.groups.is_empty() {
        return Err(TagLibError::DefinitionFolderNotFound(defs_path.to_string_lossy().to_string()));
    }

    Ok(defs)
}

/// This function translates parsed JSON entries into tag group node trees.
pub(crate) fn build_defs(all_entries: &[Value]) -> Result<RawDefs> {
    let root_lookup: BTreeMap<&str, &Value> = all_entries.iter()
        .filter_map(|entry| entry.get("name").and_then(Value::as_str).map(|name| (name, entry)))
        .collect();

    let mut defs = RawDefs::default();
    for entry in all_entries.iter().filter(|entry| entry.get("type").and_then(Value::as_str) == Some("group")) {
        let Some(name) = entry.get("name").and_then(Value::as_str) else { continue };
        let Some(struct_name) = entry.get("struct").and_then(Value::as_str) else { continue };
        let version = entry.get("version").and_then(Value::as_i64).unwrap_or(0);

        let Some(fourcc) = Generation::Gen1.group_fourcc(name) else {
            warn!("Tag group \"{name}\" is not in the Gen1 catalog. Skipping it.");
            continue;
        };

        let Some(struct_def) = root_lookup.get(struct_name) else {
            warn!("Missing struct definition for {struct_name}");
            continue;
        };

        let mut field_set = RawNode::new("FieldSet");
        field_set.set_attr("version", "0");
        field_set.set_attr("sizeofValue", "0");
        field_set.set_attr("isLatest", "true");

        let resolved_fields = resolve_inherited_fields(struct_def, &root_lookup, 0);
        add_fields(&resolved_fields, &mut field_set, &root_lookup);

        let mut layout = RawNode::new("Layout");
        layout.children.push(field_set);

        let mut root = RawNode::new("TagGroup");
        root.set_attr("group", &fourcc.to_string());
        root.set_attr("name", name);
        root.set_attr("version", &version.to_string());
        root.children.push(layout);

        defs.groups.insert(name.to_owned(), root);
    }

    for node in defs.groups.values() {
        collect_regolith(node, &mut defs.regolith);
    }

    Ok(defs)
}

/// This function flattens a struct definition's `inherits:` chain into one
/// field list, parent fields first. The second-chance lookup is
/// case-insensitive, because some sources disagree with themselves on casing.
fn resolve_inherited_fields<'a>(
    struct_def: &'a Value,
    root_lookup: &BTreeMap<&'a str, &'a Value>,
    depth: usize,
) -> Vec<&'a Value> {
    let mut fields = vec![];
    if let Some(inherits) = struct_def.get("inherits").and_then(Value::as_str) {
        let inherited = root_lookup.get(inherits).copied().or_else(|| {
            root_lookup.iter()
                .find(|(key, _)| caseless::default_caseless_match_str(key, inherits))
                .map(|(_, value)| *value)
        });

        match inherited {
            Some(inherited) if depth < MAX_INHERITS_DEPTH =>
                fields.extend(resolve_inherited_fields(inherited, root_lookup, depth + 1)),
            Some(_) => warn!("Inheritance chain for '{inherits}' is too deep. Leaving it unresolved."),
            None => warn!("Could not resolve inherited struct '{inherits}'"),
        }
    }

    if let Some(own_fields) = struct_def.get("fields").and_then(Value::as_array) {
        fields.extend(own_fields.iter());
    }

    fields
}

/// This function translates one legacy field key into its canonical kind.
fn legacy_kind(key: &str) -> Option<&'static str> {
    LEGACY_KIND_CONVERSION.iter()
        .find(|(legacy, _)| *legacy == key)
        .map(|(_, kind)| *kind)
}

/// This function copies the attributes every translated field carries.
fn set_common_attrs(node: &mut RawNode, field: &serde_json::Map<String, Value>) {
    if let Some(cache_only) = field.get("cache_only") {
        node.set_attr("cacheOnly", &cache_only.to_string().to_lowercase());
    }

    if let Some(endian_override) = field.get("endian_override").and_then(Value::as_str) {
        node.set_attr("endianOverride", endian_override);
    }
}

/// This function translates a list of legacy field descriptors into field
/// nodes under the provided field set.
fn add_fields(fields: &[&Value], parent: &mut RawNode, root_lookup: &BTreeMap<&str, &Value>) {
    for field in fields {

        // Plain strings are comments in the sources.
        let Some(field) = field.as_object() else { continue };

        let field_type = field.get("type").and_then(Value::as_str).unwrap_or_default();
        let field_name = field.get("name").and_then(Value::as_str)
            .or_else(|| field.get("heading").and_then(Value::as_str))
            .unwrap_or(field_type)
            .to_owned();

        let count = field.get("count").and_then(Value::as_u64).unwrap_or(1) as usize;

        if field_type == "editor_section" {
            for _ in 0..count {
                let mut node = RawNode::new("Explanation");
                node.set_attr("name", &field_name);
                set_common_attrs(&mut node, field);
                if let Some(description) = field.get("description").and_then(Value::as_str) {
                    node.set_attr("description", description);
                }

                parent.children.push(node);
            }

            continue;
        }

        if field_type == "pad" {
            for _ in 0..count {
                let mut node = RawNode::new("Pad");
                node.set_attr("name", &field_name);
                set_common_attrs(&mut node, field);
                if let Some(size) = field.get("size").and_then(Value::as_i64) {
                    node.set_attr("length", &size.to_string());
                }

                parent.children.push(node);
            }

            continue;
        }

        if field_type == "Reflexive" {
            for _ in 0..count {
                let mut node = RawNode::new("Block");
                node.set_attr("name", &field_name);
                set_common_attrs(&mut node, field);
                if let Some(limit) = field.get("limit").and_then(Value::as_i64) {
                    node.set_attr("maxElementCount", &limit.to_string());
                }

                let ref_struct = field.get("struct").and_then(Value::as_str)
                    .and_then(|ref_name| root_lookup.get(ref_name).copied());

                if let Some(ref_struct) = ref_struct {
                    let mut inner_field_set = RawNode::new("FieldSet");
                    inner_field_set.set_attr("version", "0");
                    inner_field_set.set_attr("sizeofValue", "0");
                    inner_field_set.set_attr("isLatest", "true");

                    let ref_fields = resolve_inherited_fields(ref_struct, root_lookup, 0);
                    add_fields(&ref_fields, &mut inner_field_set, root_lookup);

                    let mut inner_layout = RawNode::new("Layout");
                    inner_layout.children.push(inner_field_set);
                    node.children.push(inner_layout);
                }

                parent.children.push(node);
            }

            continue;
        }

        if field_type == "TagReference" {
            for _ in 0..count {
                let mut node = RawNode::new("TagReference");
                node.set_attr("name", &field_name);
                set_common_attrs(&mut node, field);

                let c_style = field_name.replace(' ', "_").to_lowercase();
                let pascal_style = field_name.split(' ')
                    .map(|word| {
                        let mut chars = word.chars();
                        match chars.next() {
                            Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
                            None => String::new(),
                        }
                    })
                    .collect::<String>();

                node.set_attr("CStyleName", &c_style);
                node.set_attr("pascalStyleName", &pascal_style);

                let groups = field.get("groups").and_then(Value::as_array).map(|groups| groups.as_slice()).unwrap_or_default();
                if groups.len() == 1 {
                    let mut tag = RawNode::new("tag");
                    tag.text = groups[0].as_str().map(|group| group.to_owned());
                    node.children.push(tag);
                } else if groups.is_empty() {
                    node.children.push(RawNode::new("tag"));
                }

                parent.children.push(node);
            }

            continue;
        }

        // `bounds: true` pairs the scalar kind with its bounds variant. Float
        // colors have no bounds kind; they get doubled into two fields instead.
        if field.get("bounds").and_then(Value::as_bool).unwrap_or(false) {
            for _ in 0..count {
                match field_type {
                    "float" | "Angle" | "int16" => {
                        let key = match field_type {
                            "float" => "RealBounds",
                            "Angle" => "AngleBounds",
                            _ => "ShortBounds",
                        };

                        let Some(xml_tag) = legacy_kind(key) else {
                            warn!("Missing conversion for type: {key}");
                            continue;
                        };

                        let mut node = RawNode::new(xml_tag);
                        node.set_attr("name", &field_name);
                        set_common_attrs(&mut node, field);
                        parent.children.push(node);
                    },
                    "ColorRGBFloat" | "ColorARGBFloat" => {
                        let Some(xml_tag) = legacy_kind(field_type) else {
                            warn!("Missing conversion for type: {field_type}");
                            continue;
                        };

                        for suffix in [" lower bound", " upper bound"] {
                            let mut node = RawNode::new(xml_tag);
                            node.set_attr("name", &format!("{field_name}{suffix}"));
                            set_common_attrs(&mut node, field);
                            parent.children.push(node);
                        }
                    },
                    _ => {},
                }
            }

            continue;
        }

        // Fields whose type names another entry: structs expand inline, enums
        // and bitfields borrow the referenced entry's width.
        if let Some(ref_struct) = root_lookup.get(field_type) {
            let actual_type = ref_struct.get("type").and_then(Value::as_str).unwrap_or_default();
            let key = if actual_type == "bitfield" {
                format!("bitfield{}", ref_struct.get("width").and_then(Value::as_i64).unwrap_or_default())
            } else {
                actual_type.to_owned()
            };

            let Some(xml_tag) = legacy_kind(&key) else {
                warn!("Missing conversion for type: {key}");
                continue;
            };

            for _ in 0..count {
                let mut node = RawNode::new(xml_tag);
                node.set_attr("name", &field_name);
                set_common_attrs(&mut node, field);

                if xml_tag == "Struct" {
                    let mut inner_field_set = RawNode::new("FieldSet");
                    inner_field_set.set_attr("version", "0");
                    inner_field_set.set_attr("sizeofValue", "0");
                    inner_field_set.set_attr("isLatest", "true");

                    let ref_fields = resolve_inherited_fields(ref_struct, root_lookup, 0);
                    add_fields(&ref_fields, &mut inner_field_set, root_lookup);

                    let mut inner_layout = RawNode::new("Layout");
                    inner_layout.children.push(inner_field_set);
                    node.children.push(inner_layout);
                }

                parent.children.push(node);
            }

            continue;
        }

        let key = if field_type == "bitfield" {
            format!("bitfield{}", field.get("width").and_then(Value::as_i64).unwrap_or_default())
        } else {
            field_type.to_owned()
        };

        let Some(xml_tag) = legacy_kind(&key) else {
            warn!("Missing conversion for type: {key}");
            continue;
        };

        for _ in 0..count {
            let mut node = RawNode::new(xml_tag);
            node.set_attr("name", &field_name);
            set_common_attrs(&mut node, field);

            if matches!(field_type, "uint8" | "uint16" | "uint32") {
                node.set_attr("unsigned", "true");
            }

            parent.children.push(node);
        }
    }
}
