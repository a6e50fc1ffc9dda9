//---------------------------------------------------------------------------//
// Copyright (c) 2025 The tagsmith contributors. All rights reserved.
//
// This file is part of the tagsmith project, a schema-driven codec and
// version migrator for game engine tag files.
//
// This file is licensed under the MIT license, which can be found here:
// https://opensource.org/licenses/MIT
//---------------------------------------------------------------------------//

//! Module containing tests for decoding/encoding tag files.
//!
//! The main property under test is round-trip identity: for every engine
//! revision and byte order, `encode(decode(bytes))` must give back the same
//! bytes when every preserve flag is on.

use std::io::Cursor;

use crate::binary::Endian;
use crate::checksum;
use crate::error::TagLibError;
use crate::groups::{EngineTag, FourCC, Generation};
use crate::schema::raw::RawNode;
use crate::schema::{RawDefs, Schema};

use super::*;

//---------------------------------------------------------------------------//
//                              Helpers
//---------------------------------------------------------------------------//

const TRACK_XML: &str = r#"
    <TagGroup group="trak" name="camera_track" version="0">
        <Layout>
            <FieldSet version="0" sizeofValue="88" isLatest="true">
                <Real name="radius"/>
                <ShortInteger name="count"/>
                <Pad name="padding" length="2"/>
                <RealVector3D name="velocity"/>
                <RgbColor name="tint"/>
                <StringId name="label"/>
                <TagReference name="material"><tag>bitm</tag></TagReference>
                <Block name="points">
                    <Layout>
                        <FieldSet version="0" sizeofValue="8" isLatest="true">
                            <Real name="x"/>
                            <ShortBounds name="range"/>
                        </FieldSet>
                    </Layout>
                </Block>
                <Struct name="StructHeader_motion">
                    <Layout regolithID="motion" tag="MOTN">
                        <FieldSet version="0" sizeofValue="8" isLatest="true">
                            <Real name="speed"/>
                            <Real name="drag"/>
                        </FieldSet>
                    </Layout>
                </Struct>
                <Data name="blob"/>
                <Angle name="arc"/>
            </FieldSet>
        </Layout>
    </TagGroup>"#;

fn track_schema() -> Schema {
    let mut defs = RawDefs::default();
    let root = RawNode::from_xml(TRACK_XML).unwrap();
    defs.groups.insert("camera_track".to_owned(), root);
    Schema::from_defs(defs, Generation::Gen2).unwrap()
}

fn track_tag(engine: EngineTag) -> TagFile {
    let mut points = vec![];
    for (x, range) in [(1.5, (1.0, 3.0)), (-2.25, (-4.0, 4.0))] {
        let mut point = Element::default();
        point.set("x", TagValue::Real(x));
        point.set("range", TagValue::Bounds { min: range.0, max: range.1 });
        points.push(point);
    }

    let mut root = Element::default();
    root.set("radius", TagValue::Real(2.5));
    root.set("count", TagValue::Int(7));
    root.set("velocity", TagValue::Reals(vec![1.0, -0.0, 3.5]));
    root.set("tint", TagValue::Color { alpha: None, red: 10.0, green: 20.0, blue: 30.0 });
    root.set("label", TagValue::Str("alpha".to_owned()));
    root.set("material", TagValue::TagRef(TagRef {
        group: Some("bitm".to_owned()),
        unk1: 0,
        length: 0,
        unk2: 0,
        path: "shaders/metal".to_owned(),
    }));
    root.set("points", TagValue::Block(points));
    root.set("speed", TagValue::Real(12.0));
    root.set("drag", TagValue::Real(0.5));
    root.set("blob", TagValue::Data(DataBlob {
        length: 5,
        unk1: 0,
        unk2: 0,
        unk3: 0,
        unk4: 0,
        bytes: vec![1, 2, 3, 4, 5],
    }));
    root.set("arc", TagValue::Real(90.0));

    let mut tag = TagFile::default();
    tag.set_header(TagHeader::new_for(FourCC::new(b"trak"), 0, engine));
    tag.set_data(root);
    tag
}

fn encode_tag(schema: &Schema, tag: &mut TagFile, endian: Endian, engine: EngineTag, options: CodecOptions) -> Vec<u8> {
    let mut extra_data = EncodeableExtraData::default();
    extra_data.set_schema(Some(schema));
    extra_data.set_endian(endian);
    extra_data.set_engine(Some(engine));
    extra_data.set_options(options);

    let mut output = vec![];
    tag.encode(&mut output, &Some(extra_data)).unwrap();
    output
}

fn decode_tag(schema: &Schema, bytes: &[u8], endian: Endian, options: CodecOptions) -> TagFile {
    let mut extra_data = DecodeableExtraData::default();
    extra_data.set_schema(Some(schema));
    extra_data.set_endian(endian);
    extra_data.set_options(options);

    TagFile::decode(&mut Cursor::new(bytes.to_vec()), &Some(extra_data)).unwrap()
}

//---------------------------------------------------------------------------//
//                              Round trips
//---------------------------------------------------------------------------//

#[test]
fn round_trip_is_byte_identical_on_every_engine() {
    let schema = track_schema();

    let cases = [
        (EngineTag::Gen1, Endian::Big),
        (EngineTag::Gen2V1, Endian::Little),
        (EngineTag::Gen2V2, Endian::Little),
        (EngineTag::Gen2V3, Endian::Little),
        (EngineTag::Gen2V4, Endian::Little),
        (EngineTag::Gen2V4, Endian::Big),
    ];

    for (engine, endian) in cases {
        let mut tag = track_tag(engine);
        let first = encode_tag(&schema, &mut tag, endian, engine, CodecOptions::default());

        let mut decoded = decode_tag(&schema, &first, endian, CodecOptions::preserving());
        let second = encode_tag(&schema, &mut decoded, endian, engine, CodecOptions::preserving());

        assert_eq!(first, second, "round trip broke for {engine:?} {endian:?}");
    }
}

#[test]
fn decode_recovers_the_semantic_tree() {
    let schema = track_schema();
    let engine = EngineTag::Gen2V4;

    let mut tag = track_tag(engine);
    let bytes = encode_tag(&schema, &mut tag, Endian::Little, engine, CodecOptions::default());
    let decoded = decode_tag(&schema, &bytes, Endian::Little, CodecOptions::default());

    assert_eq!(decoded.header().group, FourCC::new(b"trak"));
    assert_eq!(decoded.header().engine_tag(), Some(engine));
    assert_eq!(decoded.block_header().as_ref().map(|header| header.version), Some(0));

    let root = decoded.data();
    assert_eq!(root.get("radius"), Some(&TagValue::Real(2.5)));
    assert_eq!(root.get("count"), Some(&TagValue::Int(7)));
    assert_eq!(root.get("label"), Some(&TagValue::Str("alpha".to_owned())));
    assert_eq!(root.get("speed"), Some(&TagValue::Real(12.0)));

    // The angle came back in degrees.
    let arc = root.get("arc").and_then(TagValue::as_real).unwrap();
    float_eq::assert_float_eq!(arc, 90.0, abs <= 1e-4);

    let points = root.block("points").unwrap();
    assert_eq!(points.len(), 2);
    assert_eq!(points[0].get("x"), Some(&TagValue::Real(1.5)));
    assert_eq!(points[1].get("range"), Some(&TagValue::Bounds { min: -4.0, max: 4.0 }));

    let header = root.block_headers.get("points").unwrap();
    assert_eq!(header.name, FourCC::new(b"tbfd"));
    assert_eq!(header.version, 0);
    assert_eq!(header.size, 8);

    let motion = decoded.data().struct_headers.get("motion").unwrap();
    assert_eq!(motion.name, FourCC::new(b"MOTN"));
    assert_eq!(motion.size, 8);

    match root.get("material") {
        Some(TagValue::TagRef(material)) => {
            assert_eq!(material.group.as_deref(), Some("bitm"));
            assert_eq!(material.path, "shaders/metal");
            assert_eq!(material.length, 13);
        },
        _ => panic!("material is not a tag reference"),
    }

    match root.get("blob") {
        Some(TagValue::Data(blob)) => assert_eq!(blob.bytes, vec![1, 2, 3, 4, 5]),
        _ => panic!("blob is not a data value"),
    }
}

#[test]
fn gen1_synthesizes_the_root_header_from_the_schema() {
    let schema = track_schema();
    let mut tag = track_tag(EngineTag::Gen1);
    let bytes = encode_tag(&schema, &mut tag, Endian::Big, EngineTag::Gen1, CodecOptions::default());
    let decoded = decode_tag(&schema, &bytes, Endian::Big, CodecOptions::default());

    let header = decoded.block_header().as_ref().unwrap();
    assert_eq!(header.name, FourCC::new(b"tbfd"));
    assert_eq!(header.version, 0);
    assert_eq!(header.size, 88);

    // Gen1 bodies carry no framing record: right after the 64-byte file
    // header comes the first field.
    assert_eq!(&bytes[64..68], 2.5f32.to_be_bytes().as_slice());
}

#[test]
fn gen2_legacy_revision_uses_the_short_framing_record() {
    let schema = track_schema();
    let mut tag = track_tag(EngineTag::Gen2V1);
    let bytes = encode_tag(&schema, &mut tag, Endian::Little, EngineTag::Gen2V1, CodecOptions::default());

    // Fourccs are stored reversed on little-endian files, then a 12-byte
    // legacy framing record: version i16, count i16, size i32.
    assert_eq!(&bytes[64..68], b"dfbt");
    assert_eq!(i16::from_le_bytes([bytes[68], bytes[69]]), 0);
    assert_eq!(i16::from_le_bytes([bytes[70], bytes[71]]), 1);
    assert_eq!(i32::from_le_bytes([bytes[72], bytes[73], bytes[74], bytes[75]]), 88);
}

#[test]
fn negative_zero_survives_the_round_trip() {
    let schema = track_schema();
    let mut tag = track_tag(EngineTag::Gen2V4);
    let bytes = encode_tag(&schema, &mut tag, Endian::Little, EngineTag::Gen2V4, CodecOptions::default());
    let decoded = decode_tag(&schema, &bytes, Endian::Little, CodecOptions::default());

    match decoded.data().get("velocity") {
        Some(TagValue::Reals(values)) => {
            assert_eq!(values[1], 0.0);
            assert!(values[1].is_sign_negative(), "-0.0 lost its sign");
        },
        _ => panic!("velocity is not a real tuple"),
    }
}

#[test]
fn checksum_covers_the_whole_body() {
    let schema = track_schema();
    let mut tag = track_tag(EngineTag::Gen2V4);
    let bytes = encode_tag(&schema, &mut tag, Endian::Little, EngineTag::Gen2V4, CodecOptions::default());
    let decoded = decode_tag(&schema, &bytes, Endian::Little, CodecOptions::default());

    assert_eq!(decoded.header().checksum, checksum::body_checksum(&bytes[64..]));
}

#[test]
fn both_byte_orders_decode_to_the_same_tree() {
    let schema = track_schema();

    let mut tag = track_tag(EngineTag::Gen2V4);
    let big = encode_tag(&schema, &mut tag, Endian::Big, EngineTag::Gen2V4, CodecOptions::default());

    let mut tag = track_tag(EngineTag::Gen2V4);
    let little = encode_tag(&schema, &mut tag, Endian::Little, EngineTag::Gen2V4, CodecOptions::default());

    let decoded_big = decode_tag(&schema, &big, Endian::Big, CodecOptions::default());
    let decoded_little = decode_tag(&schema, &little, Endian::Little, CodecOptions::default());

    assert_eq!(decoded_big.data(), decoded_little.data());
}

#[test]
fn truncated_blocks_decode_to_defaults() {
    let schema = track_schema();
    let mut tag = track_tag(EngineTag::Gen2V4);
    let mut bytes = encode_tag(&schema, &mut tag, Endian::Little, EngineTag::Gen2V4, CodecOptions::default());

    // Shrink the root record's declared size to 6 bytes: only `radius` and
    // `count` remain decodable, everything else falls back to its default.
    // The framing record is (fourcc, version, count, size), so size sits at
    // offset 76.
    let size_offset = 64 + 12;
    bytes[size_offset..size_offset + 4].copy_from_slice(&6i32.to_le_bytes());
    bytes.truncate(64 + 16 + 6);

    let mut extra_data = DecodeableExtraData::default();
    extra_data.set_schema(Some(&schema));
    extra_data.set_endian(Endian::Little);

    let decoded = TagFile::decode(&mut Cursor::new(bytes), &Some(extra_data)).unwrap();
    assert_eq!(decoded.data().get("radius"), Some(&TagValue::Real(2.5)));
    assert_eq!(decoded.data().get("count"), Some(&TagValue::Int(7)));
    assert_eq!(decoded.data().get("velocity"), Some(&TagValue::Reals(vec![0.0, 0.0, 0.0])));
    assert_eq!(decoded.data().block("points").map(Vec::len), Some(0));
}

//---------------------------------------------------------------------------//
//                              Failure handling
//---------------------------------------------------------------------------//

#[test]
fn unknown_engine_and_group_are_rejected() {
    let schema = track_schema();

    let mut header = TagHeader::new_for(FourCC::new(b"trak"), 0, EngineTag::Gen2V4);
    header.engine = FourCC::new(b"XXXX");

    let mut bytes = vec![];
    header.encode(&mut bytes, Endian::Little).unwrap();

    let mut extra_data = DecodeableExtraData::default();
    extra_data.set_schema(Some(&schema));
    extra_data.set_endian(Endian::Little);

    let result = TagFile::decode(&mut Cursor::new(bytes), &Some(extra_data));
    assert!(matches!(result, Err(TagLibError::UnknownEngineTag(_))));

    let mut header = TagHeader::new_for(FourCC::new(b"zzzz"), 0, EngineTag::Gen2V4);
    header.engine = EngineTag::Gen2V4.fourcc();

    let mut bytes = vec![];
    header.encode(&mut bytes, Endian::Little).unwrap();

    let mut extra_data = DecodeableExtraData::default();
    extra_data.set_schema(Some(&schema));
    extra_data.set_endian(Endian::Little);

    let result = TagFile::decode(&mut Cursor::new(bytes), &Some(extra_data));
    assert!(matches!(result, Err(TagLibError::UnknownTagGroup(_))));
}

#[test]
fn json_dump_round_trips_through_the_encoder() {
    let schema = track_schema();
    let engine = EngineTag::Gen2V4;

    let mut tag = track_tag(engine);
    let first = encode_tag(&schema, &mut tag, Endian::Little, engine, CodecOptions::default());
    let decoded = decode_tag(&schema, &first, Endian::Little, CodecOptions::default());

    let dump = decoded.to_json();
    let mut rebuilt = TagFile::from_json(&dump, &schema, FourCC::new(b"trak")).unwrap();
    let second = encode_tag(&schema, &mut rebuilt, Endian::Little, engine, CodecOptions::default());

    assert_eq!(first, second);
}
