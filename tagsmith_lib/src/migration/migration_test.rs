//---------------------------------------------------------------------------//
// Copyright (c) 2025 The tagsmith contributors. All rights reserved.
//
// This file is part of the tagsmith project, a schema-driven codec and
// version migrator for game engine tag files.
//
// This file is licensed under the MIT license, which can be found here:
// https://opensource.org/licenses/MIT
//---------------------------------------------------------------------------//

//! Module containing tests for the migration engine.
//!
//! Beyond the per-group transforms, two global properties get verified here:
//! after migration every touched header reports its latest version, and
//! migrating twice changes nothing the second time.

use crate::binary::Endian;
use crate::groups::{EngineTag, FourCC, Generation};
use crate::migration;
use crate::schema::raw::RawNode;
use crate::schema::{RawDefs, Schema};
use crate::tags::{BlockHeader, Element, TagFile, TagHeader, TagValue};

//---------------------------------------------------------------------------//
//                              Helpers
//---------------------------------------------------------------------------//

const BIPED_XML: &str = r#"
    <TagGroup group="bipd" name="biped" version="2">
        <Layout>
            <FieldSet version="1" sizeofValue="988" isLatest="true">
                <Block name="functions">
                    <Layout>
                        <FieldSet version="0" sizeofValue="32" isLatest="true">
                            <Struct name="StructHeader_default function">
                                <Layout regolithID="default function" tag="MAPP">
                                    <FieldSet version="0" sizeofValue="12">
                                        <CharInteger name="Function Type"/>
                                        <ByteFlags name="Flags"/>
                                        <CharInteger name="pad a"/>
                                        <CharInteger name="pad b"/>
                                        <RgbColor name="color a"/>
                                        <Block name="values">
                                            <Layout>
                                                <FieldSet version="0" sizeofValue="4" isLatest="true">
                                                    <Real name="Value"/>
                                                </FieldSet>
                                            </Layout>
                                        </Block>
                                    </FieldSet>
                                    <FieldSet version="1" sizeofValue="12" isLatest="true">
                                        <Block name="data">
                                            <Layout>
                                                <FieldSet version="0" sizeofValue="1" isLatest="true">
                                                    <CharInteger name="Value"/>
                                                </FieldSet>
                                            </Layout>
                                        </Block>
                                    </FieldSet>
                                </Layout>
                            </Struct>
                        </FieldSet>
                    </Layout>
                </Block>
                <Block name="seats">
                    <Layout>
                        <FieldSet version="3" sizeofValue="192" isLatest="true">
                            <RealBounds name="yaw rate bounds"/>
                            <RealBounds name="pitch rate bounds"/>
                        </FieldSet>
                    </Layout>
                </Block>
            </FieldSet>
        </Layout>
    </TagGroup>"#;

const DAMAGE_EFFECT_XML: &str = r#"
    <TagGroup group="jpt!" name="damage_effect" version="1">
        <Layout>
            <FieldSet version="1" sizeofValue="212" isLatest="true">
                <Block name="player responses">
                    <Layout>
                        <FieldSet version="0" sizeofValue="88" isLatest="true">
                            <ShortEnum name="response type"/>
                            <Struct name="StructHeader_dirty whore">
                                <Layout regolithID="dirty whore" tag="MAPP">
                                    <FieldSet version="1" sizeofValue="12" isLatest="true">
                                        <Block name="data">
                                            <Layout>
                                                <FieldSet version="0" sizeofValue="1" isLatest="true">
                                                    <CharInteger name="Value"/>
                                                </FieldSet>
                                            </Layout>
                                        </Block>
                                    </FieldSet>
                                </Layout>
                            </Struct>
                            <Struct name="StructHeader_dirty whore_1">
                                <Layout regolithID="dirty whore_1" tag="MAPP">
                                    <FieldSet version="1" sizeofValue="12" isLatest="true">
                                        <Block name="data_1">
                                            <Layout>
                                                <FieldSet version="0" sizeofValue="1" isLatest="true">
                                                    <CharInteger name="Value"/>
                                                </FieldSet>
                                            </Layout>
                                        </Block>
                                    </FieldSet>
                                </Layout>
                            </Struct>
                            <Struct name="StructHeader_effect scale function">
                                <Layout regolithID="effect scale function" tag="MAPP">
                                    <FieldSet version="1" sizeofValue="12" isLatest="true">
                                        <Block name="data_2">
                                            <Layout>
                                                <FieldSet version="0" sizeofValue="1" isLatest="true">
                                                    <CharInteger name="Value"/>
                                                </FieldSet>
                                            </Layout>
                                        </Block>
                                    </FieldSet>
                                </Layout>
                            </Struct>
                        </FieldSet>
                    </Layout>
                </Block>
            </FieldSet>
        </Layout>
    </TagGroup>"#;

fn schema_from(xml: &str, name: &str) -> Schema {
    let mut defs = RawDefs::default();
    defs.groups.insert(name.to_owned(), RawNode::from_xml(xml).unwrap());
    Schema::from_defs(defs, Generation::Gen2).unwrap()
}

fn legacy_biped() -> TagFile {
    let mut function = Element::default();
    function.struct_headers.insert("default function".to_owned(), BlockHeader::new(b"MAPP", 0, 20));
    function.set("Function Type", TagValue::Int(2));
    function.set("Flags", TagValue::Int(1));
    function.set("pad a", TagValue::Int(0));
    function.set("pad b", TagValue::Int(0));
    function.set("color a", TagValue::Color { alpha: None, red: 10.0, green: 20.0, blue: 30.0 });
    function.set("color a_pad", TagValue::Int(0));

    let mut sample = Element::default();
    sample.set("Value", TagValue::Real(1.0));
    function.set("values", TagValue::Block(vec![sample]));

    let mut seat = Element::default();
    seat.set("yaw rate", TagValue::Real(2.0));
    seat.set("pitch rate", TagValue::Real(3.0));
    seat.set("acceleration scale", TagValue::Reals(vec![1.0, 2.0, 3.0]));

    let mut root = Element::default();
    root.set("Skip", TagValue::Bytes(vec![1, 0, 0, 0]));
    root.set("standing collision height", TagValue::Real(1.4));
    root.set("crouching collision height", TagValue::Real(0.7));
    root.set("collision radius", TagValue::Real(0.3));
    root.set("collision mass", TagValue::Real(90.0));
    root.set("collision global material name", TagValue::Str("cyborg".to_owned()));
    root.set("dead collision global material name", TagValue::Str("cyborg dead".to_owned()));
    root.set("functions", TagValue::Block(vec![function]));
    root.block_headers.insert("functions".to_owned(), BlockHeader::tbfd(0, 32));
    root.set("seats", TagValue::Block(vec![seat]));
    root.block_headers.insert("seats".to_owned(), BlockHeader::tbfd(0, 100));

    let mut tag = TagFile::default();
    tag.set_header(TagHeader::new_for(FourCC::new(b"bipd"), 2, EngineTag::Gen2V4));
    tag.set_block_header(Some(BlockHeader::tbfd(0, 900)));
    tag.set_data(root);
    tag
}

fn legacy_damage_effect() -> TagFile {
    let mut root = Element::default();
    root.set("type", TagValue::Int(3));
    root.set("priority", TagValue::Int(1));
    root.set("duration", TagValue::Real(0.25));
    root.set("fade function", TagValue::Enum { kind: "ShortEnum".to_owned(), value: 1 });
    root.set("maximum intensity", TagValue::Real(0.5));
    root.set("color", TagValue::Color { alpha: Some(1.0), red: 0.5, green: 0.25, blue: 0.125 });
    root.set("duration_1", TagValue::Real(1.0));
    root.set("duration_2", TagValue::Real(2.0));
    root.set("duration_3", TagValue::Real(3.0));
    root.set("duration_4", TagValue::Real(4.0));
    root.set("fade function_1", TagValue::Enum { kind: "ShortEnum".to_owned(), value: 5 });
    root.set("fade function_2", TagValue::Enum { kind: "ShortEnum".to_owned(), value: 6 });
    root.set("fade function_3", TagValue::Enum { kind: "ShortEnum".to_owned(), value: 2 });
    root.set("frequency", TagValue::Real(7.5));
    root.set("frequency_1", TagValue::Real(8.5));
    root.set("Real", TagValue::Real(0.1));
    root.set("Real_1", TagValue::Real(0.2));
    root.set("Real_2", TagValue::Real(0.3));

    let mut tag = TagFile::default();
    tag.set_header(TagHeader::new_for(FourCC::new(b"jpt!"), 1, EngineTag::Gen2V4));
    tag.set_block_header(Some(BlockHeader::tbfd(0, 180)));
    tag.set_data(root);
    tag
}

//---------------------------------------------------------------------------//
//                              Biped
//---------------------------------------------------------------------------//

#[test]
fn biped_upgrade_restructures_and_promotes() {
    let schema = schema_from(BIPED_XML, "biped");
    let mut tag = legacy_biped();

    assert!(migration::run(&schema, &mut tag, Endian::Little).unwrap());

    let header = tag.block_header().as_ref().unwrap();
    assert_eq!(header.version, 1);
    assert_eq!(header.size, 988);

    let root = tag.data();
    assert_eq!(root.get("flags_2"), Some(&TagValue::Bytes(vec![1, 0, 0, 0])));
    assert!(root.get("Skip").is_none());
    assert_eq!(root.get("height standing"), Some(&TagValue::Real(1.4)));
    assert_eq!(root.get("height crouching"), Some(&TagValue::Real(0.7)));
    assert_eq!(root.get("radius"), Some(&TagValue::Real(0.3)));
    assert_eq!(root.get("mass"), Some(&TagValue::Real(90.0)));
    assert_eq!(root.get("living material name"), Some(&TagValue::Str("cyborg".to_owned())));
    assert_eq!(root.get("dead material name"), Some(&TagValue::Str("cyborg dead".to_owned())));

    assert_eq!(root.struct_headers.get("ground physics"), Some(&BlockHeader::new(b"chgr", 0, 48)));
    assert_eq!(root.struct_headers.get("flying physics"), Some(&BlockHeader::new(b"chfl", 0, 44)));

    // The legacy mapping function became the version-1 signed-char block:
    // type, flag, two pads, the color bytes (BGR + pad), then the f32 sample.
    let function = &root.block("functions").unwrap()[0];
    assert_eq!(function.struct_headers.get("default function"), Some(&BlockHeader::new(b"MAPP", 1, 12)));
    assert!(function.get("values").is_none());
    assert!(function.get("Function Type").is_none());

    let data = function.block("data").unwrap();
    assert_eq!(data.len(), 12);
    assert_eq!(data[0].get("Value"), Some(&TagValue::Int(2)));
    assert_eq!(data[1].get("Value"), Some(&TagValue::Int(1)));
    assert_eq!(data[4].get("Value"), Some(&TagValue::Int(30)));
    assert_eq!(data[5].get("Value"), Some(&TagValue::Int(20)));
    assert_eq!(data[6].get("Value"), Some(&TagValue::Int(10)));
    assert_eq!(data[10].get("Value"), Some(&TagValue::Int(-128)));
    assert_eq!(data[11].get("Value"), Some(&TagValue::Int(63)));
    assert_eq!(function.block_headers.get("data"), Some(&BlockHeader::tbfd(0, 1)));

    // Seats widened their scalars into bounds and got their struct stamped.
    assert_eq!(root.block_headers.get("seats"), Some(&BlockHeader::tbfd(3, 192)));
    let seat = &root.block("seats").unwrap()[0];
    assert_eq!(seat.get("yaw rate bounds"), Some(&TagValue::Bounds { min: 2.0, max: 2.0 }));
    assert_eq!(seat.get("pitch rate bounds"), Some(&TagValue::Bounds { min: 3.0, max: 3.0 }));
    assert_eq!(seat.get("acceleration range"), Some(&TagValue::Reals(vec![1.0, 2.0, 3.0])));
    assert_eq!(seat.struct_headers.get("acceleration"), Some(&BlockHeader::new(b"usas", 0, 20)));
}

#[test]
fn biped_upgrade_is_idempotent() {
    let schema = schema_from(BIPED_XML, "biped");
    let mut tag = legacy_biped();

    migration::run(&schema, &mut tag, Endian::Little).unwrap();
    let once = tag.clone();

    migration::run(&schema, &mut tag, Endian::Little).unwrap();
    assert_eq!(once, tag);
}

//---------------------------------------------------------------------------//
//                              Damage effect
//---------------------------------------------------------------------------//

#[test]
fn damage_effect_upgrade_synthesizes_the_player_response() {
    let schema = schema_from(DAMAGE_EFFECT_XML, "damage_effect");
    let mut tag = legacy_damage_effect();

    assert!(migration::run(&schema, &mut tag, Endian::Little).unwrap());

    let header = tag.block_header().as_ref().unwrap();
    assert_eq!(header.version, 1);
    assert_eq!(header.size, 212);

    let root = tag.data();

    // The rider scales came out of the auto-named reals, and the trailing
    // durations shifted down.
    assert_eq!(root.get("rider direct damage scale"), Some(&TagValue::Real(0.1)));
    assert_eq!(root.get("rider maximum transfer damage scale"), Some(&TagValue::Real(0.2)));
    assert_eq!(root.get("rider minimum transfer damage scale"), Some(&TagValue::Real(0.3)));
    assert_eq!(root.get("duration"), Some(&TagValue::Real(3.0)));
    assert_eq!(root.get("duration_1"), Some(&TagValue::Real(4.0)));
    assert_eq!(root.get("fade function"), Some(&TagValue::Enum { kind: "ShortEnum".to_owned(), value: 2 }));

    let responses = root.block("player responses").unwrap();
    assert_eq!(responses.len(), 1);

    let response = &responses[0];
    assert_eq!(response.get("response type"), Some(&TagValue::Enum { kind: "ShortEnum".to_owned(), value: 2 }));
    assert_eq!(response.get("type"), Some(&TagValue::Int(3)));
    assert_eq!(response.get("duration"), Some(&TagValue::Real(0.25)));
    assert_eq!(response.get("duration_2"), Some(&TagValue::Real(1.0)));
    assert_eq!(response.get("duration_3"), Some(&TagValue::Real(2.0)));
    assert_eq!(response.get("effect name"), Some(&TagValue::Str(String::new())));

    // The three synthesized curves: four chars, four zeroed color quads and
    // four reals each, with the transition type first and the old fade value
    // third.
    for (block_key, expected_type, expected_value) in [("data", 2, 5), ("data_1", 2, 6), ("data_2", 0, 0)] {
        let curve = response.block(block_key).unwrap();
        assert_eq!(curve.len(), 36, "{block_key} has the wrong length");
        assert_eq!(curve[0].get("Value"), Some(&TagValue::Int(expected_type)), "{block_key} type");
        assert_eq!(curve[2].get("Value"), Some(&TagValue::Int(expected_value)), "{block_key} value");
        assert_eq!(response.block_headers.get(block_key), Some(&BlockHeader::tbfd(0, 1)));
    }

    // The vibration curve carries the old frequency as its first real:
    // 7.5f32 little-endian is [0x00, 0x00, 0xF0, 0x40].
    let vibration = response.block("data").unwrap();
    assert_eq!(vibration[20].get("Value"), Some(&TagValue::Int(0)));
    assert_eq!(vibration[22].get("Value"), Some(&TagValue::Int(-16)));
    assert_eq!(vibration[23].get("Value"), Some(&TagValue::Int(64)));
}

#[test]
fn damage_effect_upgrade_is_idempotent() {
    let schema = schema_from(DAMAGE_EFFECT_XML, "damage_effect");
    let mut tag = legacy_damage_effect();

    migration::run(&schema, &mut tag, Endian::Little).unwrap();
    let once = tag.clone();

    migration::run(&schema, &mut tag, Endian::Little).unwrap();
    assert_eq!(once, tag);
}

//---------------------------------------------------------------------------//
//                              Registry
//---------------------------------------------------------------------------//

#[test]
fn registry_covers_the_groups_with_upgrades() {
    for fourcc in [b"bipd", b"jpt!", b"bitm", b"char", b"gldf", b"jmad", b"MGS2", b"tdtl", b"bsdt", b"matg", b"hlmt"] {
        assert!(migration::migrator_for(Generation::Gen2, FourCC::new(fourcc)).is_some());
    }

    // Pass-through groups stay pass-through, and Gen1 has no migrators at all.
    assert!(migration::migrator_for(Generation::Gen2, FourCC::new(b"colo")).is_none());
    assert!(migration::migrator_for(Generation::Gen1, FourCC::new(b"bipd")).is_none());
}

#[test]
fn pass_through_groups_report_not_migrated() {
    let schema = schema_from(BIPED_XML, "biped");

    let mut tag = TagFile::default();
    tag.set_header(TagHeader::new_for(FourCC::new(b"colo"), 0, EngineTag::Gen2V4));
    tag.set_block_header(Some(BlockHeader::tbfd(0, 16)));

    let before = tag.clone();
    assert!(!migration::run(&schema, &mut tag, Endian::Little).unwrap());
    assert_eq!(before, tag);
}
