//---------------------------------------------------------------------------//
// Copyright (c) 2025 The tagsmith contributors. All rights reserved.
//
// This file is part of the tagsmith project, a schema-driven codec and
// version migrator for game engine tag files.
//
// This file is licensed under the MIT license, which can be found here:
// https://opensource.org/licenses/MIT
//---------------------------------------------------------------------------//

//! Module containing tests for the schema resolution pipeline.

use serde_json::Value;

use std::collections::BTreeSet;

use crate::groups::{FourCC, Generation, LegacyTraits};

use super::gen1;
use super::raw::RawNode;
use super::{FieldKind, Layout, RawDefs, Schema};

//---------------------------------------------------------------------------//
//                              Helpers
//---------------------------------------------------------------------------//

fn gen2_defs(sources: &[&str], regolith_sources: &[&str]) -> RawDefs {
    let mut defs = RawDefs::default();
    for source in sources {
        let root = RawNode::from_xml(source).unwrap();
        super::gen2::collect_regolith(&root, &mut defs.regolith);
        let name = root.attr("name").unwrap().to_owned();
        defs.groups.insert(name, root);
    }

    for source in regolith_sources {
        let root = RawNode::from_xml(source).unwrap();
        super::gen2::collect_regolith(&root, &mut defs.regolith);
    }

    defs
}

fn assert_unique_names(layout: &Layout) {
    for field_set in layout.field_sets() {
        let mut seen = BTreeSet::new();
        for field in field_set.fields() {
            if matches!(field.kind(), FieldKind::Explanation) {
                continue;
            }

            assert!(seen.insert(field.name().clone()), "duplicated field name: {}", field.name());

            match field.kind() {
                FieldKind::Block(def) => assert_unique_names(def.layout()),
                FieldKind::Struct(def) => assert_unique_names(def.layout()),
                _ => {},
            }
        }
    }
}

const PARENT_XML: &str = r#"
    <TagGroup group="obje" name="object" version="1">
        <Layout>
            <FieldSet version="0" sizeofValue="8" isLatest="true">
                <LongInteger name="flags"/>
                <Real name="scale"/>
            </FieldSet>
        </Layout>
    </TagGroup>"#;

const CHILD_XML: &str = r#"
    <TagGroup group="scen" name="scenery" parent="obje" version="1">
        <Layout>
            <FieldSet version="0" sizeofValue="24" isLatest="false">
                <Real/>
                <Real/>
                <Array count="2">
                    <ShortInteger name="lod"/>
                </Array>
                <StructXRef>shared mapping</StructXRef>
            </FieldSet>
            <FieldSet version="1" sizeofValue="20" isLatest="true">
                <Real name="extra"/>
                <Real/>
            </FieldSet>
        </Layout>
    </TagGroup>"#;

const MAPPING_XML: &str = r#"
    <Struct name="StructHeader_mapping" regolithID="shared mapping">
        <Layout regolithID="mapping" tag="MAPP">
            <FieldSet version="0" sizeofValue="4" isLatest="true">
                <Real name="value"/>
            </FieldSet>
        </Layout>
    </Struct>"#;

//---------------------------------------------------------------------------//
//                              Gen2 resolution
//---------------------------------------------------------------------------//

#[test]
fn gen2_inheritance_prepends_parent_fields_per_version() {
    let defs = gen2_defs(&[PARENT_XML, CHILD_XML], &[MAPPING_XML]);
    let schema = Schema::from_defs(defs, Generation::Gen2).unwrap();

    let scenery = schema.group(FourCC::new(b"scen")).unwrap();
    let v0 = scenery.layout().by_version(0).unwrap();
    assert_eq!(v0.fields()[0].name(), "flags");
    assert_eq!(v0.fields()[1].name(), "scale");

    // The child's version 1 has no parent counterpart, so it falls back to
    // the parent's highest version.
    let v1 = scenery.layout().by_version(1).unwrap();
    assert_eq!(v1.fields()[0].name(), "flags");
    assert_eq!(v1.fields()[1].name(), "scale");
    assert_eq!(v1.fields()[2].name(), "extra");

    assert!(scenery.layout().latest().is_some_and(|field_set| *field_set.version() == 1));
}

#[test]
fn gen2_xrefs_resolve_and_arrays_unroll() {
    let defs = gen2_defs(&[PARENT_XML, CHILD_XML], &[MAPPING_XML]);
    let schema = Schema::from_defs(defs, Generation::Gen2).unwrap();

    let scenery = schema.group(FourCC::new(b"scen")).unwrap();
    let v0 = scenery.layout().by_version(0).unwrap();

    // The array got replaced by two clones of its child, with the collision
    // disambiguated.
    let names: Vec<&str> = v0.fields().iter().map(|field| field.name().as_str()).collect();
    assert!(names.contains(&"lod"));
    assert!(names.contains(&"lod_1"));

    // The cross-reference got replaced by the struct it names.
    let mapping = v0.fields().iter().find(|field| matches!(field.kind(), FieldKind::Struct(_))).unwrap();
    assert_eq!(mapping.name(), "StructHeader_mapping");
    if let FieldKind::Struct(def) = mapping.kind() {
        assert_eq!(def.key(), "mapping");
        assert_eq!(*def.fourcc(), FourCC::from_str("MAPP"));
        assert_eq!(def.layout().by_version(0).unwrap().fields()[0].name(), "value");
    }
}

#[test]
fn gen2_nameless_fields_get_stable_names_across_versions() {
    let defs = gen2_defs(&[PARENT_XML, CHILD_XML], &[MAPPING_XML]);
    let schema = Schema::from_defs(defs, Generation::Gen2).unwrap();

    let scenery = schema.group(FourCC::new(b"scen")).unwrap();
    let v0 = scenery.layout().by_version(0).unwrap();
    let v1 = scenery.layout().by_version(1).unwrap();

    // The two nameless reals of version 0 get kind-indexed names.
    assert_eq!(v0.fields()[2].name(), "Real_0");
    assert_eq!(v0.fields()[3].name(), "Real_1");

    // The nameless real of version 1 sits at the same kind position as
    // version 0's "Real_1" (scale = 0, extra/Real_0 = 1, it = 2), so it
    // inherits that name instead of minting a fresh one.
    assert_eq!(v1.fields()[3].name(), "Real_1");

    assert_unique_names(scenery.layout());
}

#[test]
fn gen2_cyclic_inheritance_is_fatal() {
    let first = r#"
        <TagGroup group="obje" name="object" parent="scen">
            <Layout><FieldSet version="0" isLatest="true"/></Layout>
        </TagGroup>"#;
    let second = r#"
        <TagGroup group="scen" name="scenery" parent="obje">
            <Layout><FieldSet version="0" isLatest="true"/></Layout>
        </TagGroup>"#;

    let defs = gen2_defs(&[first, second], &[]);
    assert!(Schema::from_defs(defs, Generation::Gen2).is_err());
}

//---------------------------------------------------------------------------//
//                              Gen1 translation
//---------------------------------------------------------------------------//

#[test]
fn gen1_legacy_keys_translate_and_sizes_add_up() {
    let sources = r#"[
        {"type": "group", "name": "camera_track", "struct": "CameraTrack", "version": 2},
        {"type": "struct", "name": "CameraTrack", "inherits": "basetrack", "fields": [
            {"type": "float", "name": "speed"},
            {"type": "float", "name": "range", "bounds": true},
            {"type": "ColorRGBFloat", "name": "glow", "bounds": true},
            {"type": "pad", "size": 4},
            {"type": "Reflexive", "name": "control points", "struct": "ControlPoint", "limit": 16},
            {"type": "TagReference", "name": "lens", "groups": ["lens"]},
            {"type": "uint16", "name": "ticks"},
            {"type": "TrackFlags", "name": "flags"},
            {"type": "editor_section", "name": "extras", "description": "editing aids"}
        ]},
        {"type": "struct", "name": "BaseTrack", "fields": [
            {"type": "int16", "name": "kind"}
        ]},
        {"type": "bitfield", "name": "TrackFlags", "width": 16},
        {"type": "struct", "name": "ControlPoint", "fields": [
            {"type": "Vector3D", "name": "position"},
            {"type": "Quaternion", "name": "orientation"}
        ]}
    ]"#;

    let entries: Vec<Value> = serde_json::from_str::<Value>(sources).unwrap().as_array().unwrap().clone();
    let defs = gen1::build_defs(&entries).unwrap();
    let schema = Schema::from_defs(defs, Generation::Gen1).unwrap();

    let track = schema.group(FourCC::new(b"trak")).unwrap();
    assert_eq!(track.name(), "camera_track");
    assert_eq!(*track.version(), 2);

    let field_set = track.layout().latest().unwrap();
    assert_eq!(*field_set.version(), 0);

    let names: Vec<&str> = field_set.fields().iter().map(|field| field.name().as_str()).collect();

    // Inherited fields come first, resolved case-insensitively.
    assert_eq!(names[0], "kind");
    assert!(matches!(field_set.fields()[0].kind(), FieldKind::ShortInteger));

    // `bounds: true` pairs scalars with their bounds kind, and doubles float
    // colors into suffixed fields.
    let range = field_set.fields().iter().find(|field| field.name() == "range").unwrap();
    assert!(matches!(range.kind(), FieldKind::RealBounds));
    assert!(names.contains(&"glow lower bound"));
    assert!(names.contains(&"glow upper bound"));

    // Referenced kinds: bitfields borrow the referenced width, uints mark unsigned.
    let flags = field_set.fields().iter().find(|field| field.name() == "flags").unwrap();
    assert!(matches!(flags.kind(), FieldKind::WordFlags));
    let ticks = field_set.fields().iter().find(|field| field.name() == "ticks").unwrap();
    assert!(*ticks.unsigned());

    let lens = field_set.fields().iter().find(|field| field.name() == "lens").unwrap();
    assert_eq!(*lens.kind(), FieldKind::TagReference { group: Some(FourCC::new(b"lens")) });

    // Inline sizes: kind 2 + speed 4 + range 8 + glow 24 + pad 4 + block 12
    // + reference 16 + ticks 2 + flags 2 = 74.
    assert_eq!(*field_set.size(), 74);

    let points = field_set.fields().iter().find(|field| field.name() == "control points").unwrap();
    if let FieldKind::Block(def) = points.kind() {
        let inner = def.layout().latest().unwrap();

        // position 12 + orientation 16.
        assert_eq!(*inner.size(), 28);
    } else {
        panic!("control points is not a block");
    }

    assert_unique_names(track.layout());
}

#[test]
fn gen1_unknown_kinds_are_skipped_not_fatal() {
    let sources = r#"[
        {"type": "group", "name": "camera_track", "struct": "Track"},
        {"type": "struct", "name": "Track", "fields": [
            {"type": "hologram", "name": "ghost"},
            {"type": "float", "name": "speed"}
        ]}
    ]"#;

    let entries: Vec<Value> = serde_json::from_str::<Value>(sources).unwrap().as_array().unwrap().clone();
    let defs = gen1::build_defs(&entries).unwrap();
    let schema = Schema::from_defs(defs, Generation::Gen1).unwrap();

    let track = schema.group(FourCC::new(b"trak")).unwrap();
    let field_set = track.layout().latest().unwrap();
    assert_eq!(field_set.fields().len(), 1);
    assert_eq!(field_set.fields()[0].name(), "speed");
    assert_eq!(*field_set.size(), 4);
}

//---------------------------------------------------------------------------//
//                              Field sizes
//---------------------------------------------------------------------------//

#[test]
fn codec_sizes_follow_the_legacy_traits() {
    let legacy = LegacyTraits::HEADER | LegacyTraits::STRINGS | LegacyTraits::PADDING;
    let modern = LegacyTraits::empty();

    assert_eq!(FieldKind::OldStringId.codec_size(legacy), 32);
    assert_eq!(FieldKind::OldStringId.codec_size(modern), 4);

    assert_eq!(FieldKind::UselessPad { length: 24 }.codec_size(legacy), 24);
    assert_eq!(FieldKind::UselessPad { length: 24 }.codec_size(modern), 0);

    assert_eq!(FieldKind::Pad { length: 8, zero_sized: false }.codec_size(modern), 8);
    assert_eq!(FieldKind::Pad { length: 8, zero_sized: true }.codec_size(modern), 0);

    assert_eq!(FieldKind::Block(Default::default()).codec_size(modern), 12);
    assert_eq!(FieldKind::Data.codec_size(modern), 20);
    assert_eq!(FieldKind::TagReference { group: None }.codec_size(modern), 16);
    assert_eq!(FieldKind::Matrix3x3.codec_size(modern), 36);
    assert_eq!(FieldKind::LongString.codec_size(modern), 256);
}
