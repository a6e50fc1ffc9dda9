//---------------------------------------------------------------------------//
// Copyright (c) 2025 The tagsmith contributors. All rights reserved.
//
// This file is part of the tagsmith project, a schema-driven codec and
// version migrator for game engine tag files.
//
// This file is licensed under the MIT license, which can be found here:
// https://opensource.org/licenses/MIT
//---------------------------------------------------------------------------//

//! Module with all the code to interact with Schemas.
//!
//! A [`Schema`] is the canonical, fully resolved form of the layered tag
//! definition database: one [`TagGroup`] per group fourcc, each carrying the
//! versioned [`FieldSet`]s the codec walks to decode or encode a tag file.
//!
//! Definitions come from two front-ends ([`gen1`] reads JSON sources,
//! [`gen2`] reads XML sources), both of which feed the shared resolution
//! pipeline in this module: parent layouts are merged in, cross-references
//! are replaced by the definitions they point to, fixed-count arrays are
//! unrolled, every field gets a unique name within its field set, and field-set
//! sizes are computed where the source doesn't declare them. The result is
//! frozen and never mutated again.

use getset::Getters;
use lazy_static::lazy_static;
use log::warn;
use serde_derive::{Deserialize, Serialize};

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::binary::Endian;
use crate::error::{Result, TagLibError};
use crate::groups::{FourCC, Generation, LegacyTraits};

use self::raw::RawNode;

pub mod gen1;
pub mod gen2;
pub(crate) mod raw;

#[cfg(test)] mod schema_test;

/// Maximum nesting depth for re-entrant cross-reference resolution. Definition
/// sources with references deeper than this are considered cyclic.
const MAX_XREF_DEPTH: usize = 64;

lazy_static! {

    /// Field kinds that take part in name assignment and disambiguation.
    static ref NAMEABLE_TAGS: BTreeSet<&'static str> = [
        "Angle", "AngleBounds", "ArgbColor", "Array", "Block", "ByteFlags", "CharBlockIndex",
        "CharEnum", "CharInteger", "CustomLongBlockIndex", "CustomShortBlockIndex", "Data",
        "LongBlockIndex", "LongEnum", "LongFlags", "LongInteger", "LongString", "OldStringId",
        "Pad", "Point2D", "Ptr", "Real", "RealArgbColor", "RealBounds", "RealEulerAngles2D",
        "RealEulerAngles3D", "RealFraction", "RealFractionBounds", "RealPlane2D", "RealPlane3D",
        "RealPoint2D", "RealPoint3D", "RealQuaternion", "RealRgbColor", "RealVector2D",
        "RealVector3D", "Rectangle2D", "RgbColor", "ShortBlockIndex", "ShortBounds", "ShortEnum",
        "ShortInteger", "Skip", "String", "StringId", "Struct", "Tag", "TagReference",
        "UselessPad", "VertexBuffer", "WordBlockFlags", "WordFlags",
    ].into_iter().collect();
}

//---------------------------------------------------------------------------//
//                              Enums & Structs
//---------------------------------------------------------------------------//

/// This struct represents a fully resolved schema in memory, ready to be used
/// to decode/encode tag files of one engine generation.
#[derive(Clone, Debug, Getters, Serialize, Deserialize)]
#[getset(get = "pub")]
pub struct Schema {

    /// The generation these definitions belong to.
    generation: Generation,

    /// All resolved tag groups, by group fourcc.
    groups: BTreeMap<FourCC, TagGroup>,
}

/// This struct contains the resolved definition of one tag group.
#[derive(Clone, Debug, Getters, Serialize, Deserialize)]
#[getset(get = "pub")]
pub struct TagGroup {

    /// Fourcc of the group.
    fourcc: FourCC,

    /// Human-readable name of the group. Doubles as the file extension of loose tags.
    name: String,

    /// Version the group declares for freshly built tag headers.
    version: i16,

    /// The versioned field sets of the group.
    layout: Layout,
}

/// An ordered list of versioned field sets, used by tag groups, blocks and structs.
#[derive(Clone, Debug, Default, PartialEq, Getters, Serialize, Deserialize)]
#[getset(get = "pub")]
pub struct Layout {

    /// The field sets, in source order.
    field_sets: Vec<FieldSet>,
}

/// The ordered field list for one version of a tag group, block or struct.
#[derive(Clone, Debug, PartialEq, Getters, Serialize, Deserialize)]
#[getset(get = "pub")]
pub struct FieldSet {

    /// Version this field set describes.
    version: i32,

    /// Size in bytes of one encoded element of this field set.
    size: u32,

    /// If this is the newest field set of its layout.
    is_latest: bool,

    /// The fields, in encoding order.
    fields: Vec<Field>,
}

/// One field of a field set.
#[derive(Clone, Debug, PartialEq, Getters, Serialize, Deserialize)]
#[getset(get = "pub")]
pub struct Field {

    /// Name of the field. Unique within its field set.
    name: String,

    /// Kind of the field, with its kind-specific attributes.
    kind: FieldKind,

    /// Byte order override for this field, if any. Otherwise the file-wide order applies.
    endian: Option<Endian>,

    /// If set, integer fields decode as their unsigned variant.
    unsigned: bool,
}

/// This enum defines every kind of field the lib can encode/decode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum FieldKind {
    Angle,
    AngleBounds,
    ArgbColor,
    Block(Box<BlockDef>),
    ByteFlags,
    CharBlockIndex,
    CharEnum,
    CharInteger,
    CustomLongBlockIndex,
    CustomShortBlockIndex,
    Data,
    Explanation,
    LongBlockIndex,
    LongEnum,
    LongFlags,
    LongInteger,
    LongString,
    Matrix3x3,
    OldStringId,
    Pad { length: u32, zero_sized: bool },
    Point2D,
    Ptr,
    Real,
    RealArgbColor,
    RealBounds,
    RealEulerAngles2D,
    RealEulerAngles3D,
    RealFraction,
    RealFractionBounds,
    RealPlane2D,
    RealPlane3D,
    RealPoint2D,
    RealPoint3D,
    RealQuaternion,
    RealRgbColor,
    RealVector2D,
    RealVector3D,
    Rectangle2D,
    RgbColor,
    ShortBlockIndex,
    ShortBounds,
    ShortEnum,
    ShortInteger,
    Skip { length: u32, zero_sized: bool },
    String32,
    StringId,
    Struct(Box<StructDef>),
    Tag,
    TagReference { group: Option<FourCC> },
    UselessPad { length: u32 },
    VertexBuffer,
    WordBlockFlags,
    WordFlags,
}

/// The nested definition of a `Block` field. Its body lives in the resource
/// stream, framed by an inline `(count, unk1, unk2)` triple.
#[derive(Clone, Debug, Default, PartialEq, Getters, Serialize, Deserialize)]
#[getset(get = "pub")]
pub struct BlockDef {

    /// The versioned field sets of the block's elements.
    layout: Layout,
}

/// The nested definition of a `Struct` field, consumed inline within its parent.
#[derive(Clone, Debug, Default, PartialEq, Getters, Serialize, Deserialize)]
#[getset(get = "pub")]
pub struct StructDef {

    /// Fourcc of the struct's framing record on second-generation files.
    fourcc: Option<FourCC>,

    /// Addressable key of the struct. Names its `StructHeader_*` sidecar.
    key: String,

    /// The versioned field sets of the struct.
    layout: Layout,
}

//---------------------------------------------------------------------------//
//                       Implementation of Schema
//---------------------------------------------------------------------------//

impl Schema {

    /// This function loads and resolves the definition folder of the provided generation.
    ///
    /// This is a fatal boundary: unreadable folders, broken sources and cyclic
    /// inheritance all error out. Individually broken fields or references
    /// only log warnings.
    pub fn load(generation: Generation, defs_path: &Path) -> Result<Self> {
        match generation {
            Generation::Gen1 => gen1::load(defs_path),
            Generation::Gen2 => gen2::load(defs_path),
        }
    }

    /// This function returns the resolved definition of the provided tag group, if any.
    pub fn group(&self, fourcc: FourCC) -> Option<&TagGroup> {
        self.groups.get(&fourcc)
    }

    /// This function returns the resolved definition behind a group name, if any.
    pub fn group_by_name(&self, name: &str) -> Option<&TagGroup> {
        self.generation.group_fourcc(name).and_then(|fourcc| self.groups.get(&fourcc))
    }
}

//---------------------------------------------------------------------------//
//                       Implementation of TagGroup
//---------------------------------------------------------------------------//

impl TagGroup {

    /// This function finds the first struct definition under this group whose field name matches, in document order.
    pub fn find_struct(&self, name: &str) -> Option<&StructDef> {
        self.layout.find_struct(name)
    }

    /// This function finds the first block definition under this group whose field name matches, in document order.
    pub fn find_block(&self, name: &str) -> Option<&BlockDef> {
        self.layout.find_block(name)
    }

    /// This function finds a struct definition scoped to the first matching block, mirroring
    /// a `Block[@name=x]//Struct[@name=y]` lookup.
    pub fn find_struct_in_block(&self, block_name: &str, struct_name: &str) -> Option<&StructDef> {
        self.find_block(block_name).and_then(|block| block.layout().find_struct(struct_name))
    }
}

//---------------------------------------------------------------------------//
//                       Implementation of Layout
//---------------------------------------------------------------------------//

impl Layout {

    /// This function returns the field set marked as latest, if any.
    ///
    /// If more than one is marked (sources do that), the last one wins.
    pub fn latest(&self) -> Option<&FieldSet> {
        self.field_sets.iter().rev().find(|field_set| field_set.is_latest)
    }

    /// This function returns the field set with the provided version, if any.
    pub fn by_version(&self, version: i32) -> Option<&FieldSet> {
        self.field_sets.iter().find(|field_set| field_set.version == version)
    }

    /// Depth-first, document-order search for a struct definition by field name.
    pub fn find_struct(&self, name: &str) -> Option<&StructDef> {
        for field_set in &self.field_sets {
            for field in &field_set.fields {
                match field.kind() {
                    FieldKind::Struct(def) => {
                        if field.name() == name {
                            return Some(def);
                        }

                        if let Some(found) = def.layout().find_struct(name) {
                            return Some(found);
                        }
                    },
                    FieldKind::Block(def) => if let Some(found) = def.layout().find_struct(name) {
                        return Some(found);
                    },
                    _ => {},
                }
            }
        }

        None
    }

    /// Depth-first, document-order search for a block definition by field name.
    pub fn find_block(&self, name: &str) -> Option<&BlockDef> {
        for field_set in &self.field_sets {
            for field in &field_set.fields {
                match field.kind() {
                    FieldKind::Block(def) => {
                        if field.name() == name {
                            return Some(def);
                        }

                        if let Some(found) = def.layout().find_block(name) {
                            return Some(found);
                        }
                    },
                    FieldKind::Struct(def) => if let Some(found) = def.layout().find_block(name) {
                        return Some(found);
                    },
                    _ => {},
                }
            }
        }

        None
    }
}

//---------------------------------------------------------------------------//
//                       Implementation of Field
//---------------------------------------------------------------------------//

impl Field {

    /// Byte order this field is encoded with, given the file-wide order.
    pub fn effective_endian(&self, file_endian: Endian) -> Endian {
        self.endian.unwrap_or(file_endian)
    }
}

//---------------------------------------------------------------------------//
//                       Implementation of FieldKind
//---------------------------------------------------------------------------//

impl FieldKind {

    /// Inline size of the field when computing field-set sizes. Pad runs count
    /// their declared length here, and struct sizes are handled by the caller
    /// through recursion.
    pub fn schema_size(&self) -> u32 {
        match self {
            Self::ByteFlags | Self::CharBlockIndex | Self::CharEnum | Self::CharInteger => 1,
            Self::CustomShortBlockIndex | Self::ShortBlockIndex | Self::ShortEnum |
            Self::ShortInteger | Self::WordBlockFlags | Self::WordFlags => 2,
            Self::Angle | Self::ArgbColor | Self::CustomLongBlockIndex | Self::LongBlockIndex |
            Self::LongEnum | Self::LongFlags | Self::LongInteger | Self::Point2D | Self::Ptr |
            Self::Real | Self::RealFraction | Self::RgbColor | Self::ShortBounds |
            Self::StringId | Self::Tag => 4,
            Self::AngleBounds | Self::RealBounds | Self::RealEulerAngles2D |
            Self::RealFractionBounds | Self::RealPoint2D | Self::RealVector2D | Self::Rectangle2D => 8,
            Self::Block(_) => 12,
            Self::RealEulerAngles3D | Self::RealPlane2D | Self::RealPoint3D | Self::RealVector3D |
            Self::RealRgbColor => 12,
            Self::RealArgbColor | Self::RealPlane3D | Self::RealQuaternion | Self::TagReference { .. } => 16,
            Self::Data => 20,
            Self::OldStringId | Self::String32 | Self::VertexBuffer => 32,
            Self::Matrix3x3 => 36,
            Self::LongString => 256,
            Self::Pad { length, .. } | Self::Skip { length, .. } | Self::UselessPad { length } => *length,
            Self::Explanation | Self::Struct(_) => 0,
        }
    }

    /// Inline size the codec actually consumes under the provided legacy behaviours.
    pub fn codec_size(&self, legacy: LegacyTraits) -> u32 {
        match self {
            Self::OldStringId => if legacy.contains(LegacyTraits::STRINGS) { 32 } else { 4 },
            Self::UselessPad { length } => if legacy.contains(LegacyTraits::PADDING) { *length } else { 0 },
            Self::Pad { length, zero_sized } | Self::Skip { length, zero_sized } => if *zero_sized { 0 } else { *length },
            _ => self.schema_size(),
        }
    }
}

//---------------------------------------------------------------------------//
//                       Resolution pipeline
//---------------------------------------------------------------------------//

/// The parsed-but-unresolved output of a definition front-end.
#[derive(Debug, Default)]
pub(crate) struct RawDefs {

    /// Tag group roots, by group name.
    pub groups: BTreeMap<String, RawNode>,

    /// Addressable definitions, by their ID. Used for cross-reference resolution.
    pub regolith: BTreeMap<String, RawNode>,
}

/// This function runs the shared resolution pipeline over parsed definitions
/// and freezes them into a schema.
fn resolve(defs: RawDefs, generation: Generation) -> Result<Schema> {
    let mut cache = BTreeMap::new();
    for name in defs.groups.keys() {
        let mut visiting = vec![];
        merge_group(name, &defs.groups, &mut cache, generation, &mut visiting)?;
    }

    fix_names(&mut cache, &defs.regolith);
    for merged in cache.values_mut() {
        unravel_arrays(merged);
    }

    fix_names(&mut cache, &defs.regolith);
    freeze(&cache, generation)
}

/// This function materializes one group, with its parent's field sets merged
/// in, recursively and cached.
fn merge_group(
    name: &str,
    defs: &BTreeMap<String, RawNode>,
    cache: &mut BTreeMap<String, RawNode>,
    generation: Generation,
    visiting: &mut Vec<String>,
) -> Result<RawNode> {
    if let Some(merged) = cache.get(name) {
        return Ok(merged.clone());
    }

    if visiting.iter().any(|visited| visited == name) {
        return Err(TagLibError::CyclicInheritance(name.to_owned()));
    }

    let tag_elem = defs.get(name).ok_or_else(|| TagLibError::MissingDefinition(name.to_owned()))?;
    let mut merged = tag_elem.clone();

    let parent_name = tag_elem.attr("parent")
        .and_then(FourCC::from_str)
        .and_then(|fourcc| generation.group_name(fourcc));

    if let Some(parent_name) = parent_name {
        visiting.push(name.to_owned());
        let parent_merged = merge_group(parent_name, defs, cache, generation, visiting);
        visiting.pop();

        match parent_merged {
            Ok(parent_merged) => {
                let parent_layout = find_descendant(&parent_merged, "Layout").cloned();
                if let (Some(parent_layout), Some(child_layout)) = (parent_layout, find_descendant_mut(&mut merged, "Layout")) {
                    merge_layouts(&parent_layout, child_layout);
                }
            },
            Err(error @ TagLibError::CyclicInheritance(_)) => return Err(error),
            Err(_) => warn!("Could not resolve the parent group \"{parent_name}\" of \"{name}\"."),
        }
    }

    cache.insert(name.to_owned(), merged.clone());
    Ok(merged)
}

/// This function prepends a parent layout's field-set contents to the matching
/// field sets of a child layout. Child versions with no parent counterpart fall
/// back to the parent's highest version.
fn merge_layouts(parent_layout: &RawNode, child_layout: &mut RawNode) {
    let parent_field_sets: BTreeMap<String, &RawNode> = parent_layout.children.iter()
        .filter(|child| child.tag == "FieldSet")
        .map(|child| (child.attr("version").unwrap_or_default().to_owned(), child))
        .collect();

    let latest_parent_version = parent_field_sets.keys()
        .filter_map(|version| version.parse::<i64>().ok())
        .max()
        .map(|version| version.to_string());

    for child_field_set in child_layout.children.iter_mut().filter(|child| child.tag == "FieldSet") {
        let version = child_field_set.attr("version").unwrap_or_default().to_owned();
        let parent_field_set = parent_field_sets.get(&version)
            .or_else(|| latest_parent_version.as_ref().and_then(|latest| parent_field_sets.get(latest)));

        if let Some(parent_field_set) = parent_field_set {
            let mut new_children = parent_field_set.children.clone();
            new_children.append(&mut child_field_set.children);
            child_field_set.children = new_children;
        }
    }
}

/// This function replaces every `*XRef` leaf with a copy of the definition it
/// names, re-entrant on the copy to fix nested references.
fn resolve_xrefs(node: &mut RawNode, regolith: &BTreeMap<String, RawNode>, depth: usize) {
    for index in 0..node.children.len() {
        resolve_xrefs(&mut node.children[index], regolith, depth);

        let child = &node.children[index];
        if !child.tag.ends_with("XRef") {
            continue;
        }

        let Some(key) = child.text.as_deref().map(str::trim).filter(|key| !key.is_empty()).map(str::to_owned) else {
            continue;
        };

        match regolith.get(&key) {
            Some(replacement) if depth < MAX_XREF_DEPTH => {
                let mut new_node = replacement.clone();
                resolve_xrefs(&mut new_node, regolith, depth + 1);
                node.children[index] = new_node;
            },
            Some(_) => warn!("Reference chain for \"{key}\" is too deep. Leaving it unresolved."),
            None => warn!("Could not resolve XRef {key}"),
        }
    }
}

/// This function replaces every `Array[count=N]` element with N in-order
/// copies of each of its children.
fn unravel_arrays(node: &mut RawNode) {
    for child in &mut node.children {
        unravel_arrays(child);
    }

    let mut index = 0;
    while index < node.children.len() {
        if node.children[index].tag == "Array" && node.children[index].attr("count").is_some() {
            let array = node.children.remove(index);
            let count = array.attr_int("count", 0).max(0) as usize;

            let mut expanded = Vec::with_capacity(count * array.children.len());
            for _ in 0..count {
                expanded.extend(array.children.iter().cloned());
            }

            let expanded_len = expanded.len();
            node.children.splice(index..index, expanded);
            index += expanded_len;
        } else {
            index += 1;
        }
    }
}

/// This function resolves cross-references in all merged groups, then gives
/// every field of every tag group and block layout a unique name.
fn fix_names(merged: &mut BTreeMap<String, RawNode>, regolith: &BTreeMap<String, RawNode>) {
    for node in merged.values_mut() {
        resolve_xrefs(node, regolith, 0);
    }

    for node in merged.values_mut() {
        fix_names_in_node(node);
    }
}

/// Recursive part of [`fix_names`]: fixes this node's layout if it owns one,
/// then descends.
fn fix_names_in_node(node: &mut RawNode) {
    if node.tag == "TagGroup" || node.tag == "Block" {
        if let Some(layout) = node.child_mut("Layout") {
            fix_field_set_names(layout);
        }
    }

    for child in &mut node.children {
        fix_names_in_node(child);
    }
}

/// This function assigns unique names to the fields of every field set of one
/// layout.
///
/// Fields are considered in flattened order, looking through structs. A
/// nameless field first tries to inherit the name of the same-kind field at
/// the same position in an earlier field set, so the same positional field
/// keeps one name across versions; failing that it gets `<Kind>_<n>`. A name
/// collision within one field set gets a `_<n>` suffix. Counters are shared
/// across the field sets of the layout.
fn fix_field_set_names(layout: &mut RawNode) {
    let field_set_indices: Vec<usize> = layout.children.iter().enumerate()
        .filter(|(_, child)| child.tag == "FieldSet")
        .map(|(index, _)| index)
        .collect();

    let mut counters: BTreeMap<String, usize> = BTreeMap::new();

    for (meta_index, &field_set_index) in field_set_indices.iter().enumerate() {
        let paths = flatten_field_paths(&layout.children[field_set_index]);
        let mut instance_counters: BTreeMap<String, usize> = BTreeMap::new();
        let mut seen_names: BTreeSet<String> = BTreeSet::new();

        for path in &paths {
            let (tag, current_name) = {
                let node = node_at(&layout.children[field_set_index], path);
                (node.tag.clone(), node.attr("name").map(|name| name.to_owned()))
            };

            if !NAMEABLE_TAGS.contains(&*tag) {
                continue;
            }

            let instance_index = *instance_counters.get(&tag).unwrap_or(&0);
            instance_counters.insert(tag.clone(), instance_index + 1);

            match current_name {
                None => {

                    // Look for the same-kind field at the same position in an earlier field set.
                    let mut fallback_name = None;
                    for &prev_index in &field_set_indices[..meta_index] {
                        let prev_paths = flatten_field_paths(&layout.children[prev_index]);
                        let mut match_count = 0;
                        for prev_path in &prev_paths {
                            let prev_node = node_at(&layout.children[prev_index], prev_path);
                            if prev_node.tag != tag {
                                continue;
                            }

                            if match_count == instance_index {
                                if let Some(prev_name) = prev_node.attr("name") {
                                    fallback_name = Some(prev_name.to_owned());
                                }

                                break;
                            }

                            match_count += 1;
                        }

                        if fallback_name.is_some() {
                            break;
                        }
                    }

                    let new_name = match fallback_name {
                        Some(name) => name,
                        None => {
                            let count = *counters.get(&tag).unwrap_or(&0);
                            counters.insert(tag.clone(), count + 1);
                            format!("{tag}_{count}")
                        },
                    };

                    node_at_mut(&mut layout.children[field_set_index], path).set_attr("name", &new_name);
                    seen_names.insert(new_name);
                },
                Some(name) => {
                    if seen_names.contains(&name) {
                        let count = *counters.get(&name).unwrap_or(&1);
                        let new_name = format!("{name}_{count}");
                        node_at_mut(&mut layout.children[field_set_index], path).set_attr("name", &new_name);
                        counters.insert(name, count + 1);
                        seen_names.insert(new_name);
                    } else {
                        seen_names.insert(name);
                    }
                },
            }
        }
    }
}

/// This function collects the paths of all leaf fields of a field set, looking
/// through `Struct` and `Array` wrappers into their nested field sets.
fn flatten_field_paths(field_set: &RawNode) -> Vec<Vec<usize>> {
    let mut paths = vec![];
    let mut prefix = vec![];
    collect_flattened(field_set, &mut prefix, &mut paths);
    paths
}

fn collect_flattened(node: &RawNode, prefix: &mut Vec<usize>, paths: &mut Vec<Vec<usize>>) {
    for (index, child) in node.children.iter().enumerate() {
        if child.tag == "Struct" || child.tag == "Array" {
            if let Some(layout_index) = child.children.iter().position(|inner| inner.tag == "Layout") {
                for (field_set_index, field_set) in child.children[layout_index].children.iter().enumerate() {
                    if field_set.tag == "FieldSet" {
                        prefix.push(index);
                        prefix.push(layout_index);
                        prefix.push(field_set_index);
                        collect_flattened(field_set, prefix, paths);
                        prefix.pop();
                        prefix.pop();
                        prefix.pop();
                    }
                }
            }
        } else {
            prefix.push(index);
            paths.push(prefix.clone());
            prefix.pop();
        }
    }
}

fn node_at<'a>(root: &'a RawNode, path: &[usize]) -> &'a RawNode {
    let mut node = root;
    for &index in path {
        node = &node.children[index];
    }

    node
}

fn node_at_mut<'a>(root: &'a mut RawNode, path: &[usize]) -> &'a mut RawNode {
    let mut node = root;
    for &index in path {
        node = &mut node.children[index];
    }

    node
}

fn find_descendant<'a>(node: &'a RawNode, tag: &str) -> Option<&'a RawNode> {
    for child in &node.children {
        if child.tag == tag {
            return Some(child);
        }

        if let Some(found) = find_descendant(child, tag) {
            return Some(found);
        }
    }

    None
}

fn find_descendant_mut<'a>(node: &'a mut RawNode, tag: &str) -> Option<&'a mut RawNode> {
    for child in &mut node.children {
        if child.tag == tag {
            return Some(child);
        }

        if let Some(found) = find_descendant_mut(child, tag) {
            return Some(found);
        }
    }

    None
}

//---------------------------------------------------------------------------//
//                       Freezing
//---------------------------------------------------------------------------//

/// This function freezes the resolved node trees into the immutable schema.
fn freeze(merged: &BTreeMap<String, RawNode>, generation: Generation) -> Result<Schema> {
    let mut groups = BTreeMap::new();
    for (name, node) in merged {
        let fourcc = node.attr("group")
            .and_then(FourCC::from_str)
            .or_else(|| generation.group_fourcc(name));

        let Some(fourcc) = fourcc else {
            warn!("Tag group \"{name}\" has no usable fourcc. Skipping it.");
            continue;
        };

        let Some(layout_node) = node.child("Layout") else {
            warn!("Tag group \"{name}\" has no layout. Skipping it.");
            continue;
        };

        let layout = freeze_layout(layout_node, generation);
        groups.insert(fourcc, TagGroup {
            fourcc,
            name: name.to_owned(),
            version: node.attr_int("version", 0) as i16,
            layout,
        });
    }

    Ok(Schema { generation, groups })
}

fn freeze_layout(node: &RawNode, generation: Generation) -> Layout {
    let field_sets = node.children.iter()
        .filter(|child| child.tag == "FieldSet")
        .map(|child| freeze_field_set(child, generation))
        .collect();

    Layout { field_sets }
}

fn freeze_field_set(node: &RawNode, generation: Generation) -> FieldSet {
    let fields: Vec<Field> = node.children.iter().filter_map(|child| freeze_field(child, generation)).collect();

    // Gen1 sources carry no sizes; they're computed from the resolved fields.
    // Gen2 sources declare them, and the declared value is authoritative.
    let size = match generation {
        Generation::Gen1 => fields.iter().map(|field| match field.kind() {
            FieldKind::Struct(def) => def.layout().field_sets().iter().map(|field_set| field_set.size).sum::<u32>(),
            kind => kind.schema_size(),
        }).sum(),
        Generation::Gen2 => node.attr_int("sizeofValue", 0).max(0) as u32,
    };

    FieldSet {
        version: node.attr_int("version", 0) as i32,
        size,
        is_latest: node.attr("isLatest").is_some_and(|value| value.eq_ignore_ascii_case("true")),
        fields,
    }
}

fn freeze_field(node: &RawNode, generation: Generation) -> Option<Field> {
    let kind = match node.tag.as_str() {
        "Angle" => FieldKind::Angle,
        "AngleBounds" => FieldKind::AngleBounds,
        "ArgbColor" => FieldKind::ArgbColor,
        "Block" => FieldKind::Block(Box::new(BlockDef {
            layout: node.child("Layout").map(|layout| freeze_layout(layout, generation)).unwrap_or_default(),
        })),
        "ByteFlags" => FieldKind::ByteFlags,
        "CharBlockIndex" => FieldKind::CharBlockIndex,
        "CharEnum" => FieldKind::CharEnum,
        "CharInteger" => FieldKind::CharInteger,
        "CustomLongBlockIndex" => FieldKind::CustomLongBlockIndex,
        "CustomShortBlockIndex" => FieldKind::CustomShortBlockIndex,
        "Data" => FieldKind::Data,
        "Explanation" => FieldKind::Explanation,
        "LongBlockIndex" => FieldKind::LongBlockIndex,
        "LongEnum" => FieldKind::LongEnum,
        "LongFlags" => FieldKind::LongFlags,
        "LongInteger" => FieldKind::LongInteger,
        "LongString" => FieldKind::LongString,
        "Matrix3x3" => FieldKind::Matrix3x3,
        "OldStringId" => FieldKind::OldStringId,
        "Pad" => FieldKind::Pad {
            length: node.attr_int("length", 0).max(0) as u32,
            zero_sized: node.attr("tag") == Some("pd64"),
        },
        "Point2D" => FieldKind::Point2D,
        "Ptr" => FieldKind::Ptr,
        "Real" => FieldKind::Real,
        "RealArgbColor" => FieldKind::RealArgbColor,
        "RealBounds" => FieldKind::RealBounds,
        "RealEulerAngles2D" => FieldKind::RealEulerAngles2D,
        "RealEulerAngles3D" => FieldKind::RealEulerAngles3D,
        "RealFraction" => FieldKind::RealFraction,
        "RealFractionBounds" => FieldKind::RealFractionBounds,
        "RealPlane2D" => FieldKind::RealPlane2D,
        "RealPlane3D" => FieldKind::RealPlane3D,
        "RealPoint2D" => FieldKind::RealPoint2D,
        "RealPoint3D" => FieldKind::RealPoint3D,
        "RealQuaternion" => FieldKind::RealQuaternion,
        "RealRgbColor" => FieldKind::RealRgbColor,
        "RealVector2D" => FieldKind::RealVector2D,
        "RealVector3D" => FieldKind::RealVector3D,
        "Rectangle2D" => FieldKind::Rectangle2D,
        "RgbColor" => FieldKind::RgbColor,
        "ShortBlockIndex" => FieldKind::ShortBlockIndex,
        "ShortBounds" => FieldKind::ShortBounds,
        "ShortEnum" => FieldKind::ShortEnum,
        "ShortInteger" => FieldKind::ShortInteger,
        "Skip" => FieldKind::Skip {
            length: node.attr_int("length", 0).max(0) as u32,
            zero_sized: node.attr("tag") == Some("pd64"),
        },
        "String" => FieldKind::String32,
        "StringId" => FieldKind::StringId,
        "Struct" => {
            let layout_node = node.child("Layout");
            FieldKind::Struct(Box::new(StructDef {
                fourcc: layout_node.and_then(|layout| layout.attr("tag")).and_then(FourCC::from_str),
                key: layout_node.and_then(|layout| layout.attr("regolithID")).unwrap_or_default().to_owned(),
                layout: layout_node.map(|layout| freeze_layout(layout, generation)).unwrap_or_default(),
            }))
        },
        "Tag" => FieldKind::Tag,
        "TagReference" => FieldKind::TagReference {
            group: node.child("tag")
                .and_then(|tag| tag.text.as_deref())
                .map(str::trim)
                .and_then(FourCC::from_str),
        },
        "UselessPad" => FieldKind::UselessPad { length: node.attr_int("length", 0).max(0) as u32 },
        "VertexBuffer" => FieldKind::VertexBuffer,
        "WordBlockFlags" => FieldKind::WordBlockFlags,
        "WordFlags" => FieldKind::WordFlags,
        unknown => {
            warn!("Unknown field kind \"{unknown}\". Skipping the field.");
            return None;
        },
    };

    Some(Field {
        name: node.attr("name").unwrap_or_default().to_owned(),
        kind,
        endian: match node.attr("endianOverride") {
            Some("<") => Some(Endian::Little),
            Some(">") => Some(Endian::Big),
            _ => None,
        },
        unsigned: node.attr("unsigned").is_some_and(|value| !value.is_empty()),
    })
}

impl Schema {

    /// This function builds a schema straight from parsed definitions, running
    /// the full resolution pipeline over them.
    pub(crate) fn from_defs(defs: RawDefs, generation: Generation) -> Result<Self> {
        resolve(defs, generation)
    }
}
