//---------------------------------------------------------------------------//
// Copyright (c) 2025 The tagsmith contributors. All rights reserved.
//
// This file is part of the tagsmith project, a schema-driven codec and
// version migrator for game engine tag files.
//
// This file is licensed under the MIT license, which can be found here:
// https://opensource.org/licenses/MIT
//---------------------------------------------------------------------------//

//! This module contains the definition of [`TagFile`], the file abstraction
//! used by this lib to decode/encode tag files.
//!
//! A tag file is a 64-byte header, a fixed-size body laid out by the group's
//! schema, and a trailing resource stream holding everything variable-length:
//! interned strings, tag reference paths, data blobs and (past Gen1) the
//! framed bodies of nested blocks. Decoding walks the schema over the body,
//! pulling resource bytes forward as the fields demand them; encoding mirrors
//! that with the append-at-the-end pattern, so a clean round trip is
//! byte-identical.

use getset::{Getters, MutGetters, Setters};
use serde_json::{json, Map, Value};

use std::io::{Cursor, Seek, SeekFrom};

use crate::binary::{Endian, ReadBytes, WriteBytes};
use crate::checksum;
use crate::error::{Result, TagLibError};
use crate::groups::{EngineTag, FourCC, Generation, LegacyTraits};
use crate::schema::Schema;

pub use self::value::{BlockFrame, BlockHeader, DataBlob, Element, TagRef, TagValue};

mod reader;
pub mod value;
mod writer;

#[cfg(test)] mod tags_test;

//---------------------------------------------------------------------------//
//                              Enums & Structs
//---------------------------------------------------------------------------//

/// The fixed 64-byte header every tag file starts with.
#[derive(Clone, Debug, PartialEq)]
pub struct TagHeader {
    pub unk1: i16,
    pub flags: i8,
    pub tag_type: i8,
    pub name: String,
    pub group: FourCC,
    pub checksum: u32,
    pub data_offset: i32,
    pub data_length: i32,
    pub unk2: i32,
    pub version: i16,
    pub destination: i8,
    pub plugin_handle: i8,
    pub engine: FourCC,
}

/// Process-wide codec behaviour toggles.
#[derive(Clone, Copy, Debug, Getters, Setters)]
#[getset(get = "pub", set = "pub")]
pub struct CodecOptions {

    /// Keep decoded block/struct versions on re-write instead of promoting to the latest.
    preserve_version: bool,

    /// Keep string fields as their raw bytes instead of decoded text.
    preserve_strings: bool,

    /// Keep pad runs, pointers and the unknown framing ints instead of zeroing them.
    preserve_padding: bool,

    /// Expose angle fields in degrees, converting back at encode time.
    convert_radians: bool,

    /// Recompute the header checksum over the encoded body.
    generate_checksum: bool,
}

/// This struct represents a decoded tag file.
#[derive(Clone, Debug, Default, PartialEq, Getters, MutGetters, Setters)]
#[getset(get = "pub", get_mut = "pub", set = "pub")]
pub struct TagFile {

    /// Path the file was read from, if known.
    path: String,

    /// The 64-byte file header.
    header: TagHeader,

    /// The version stamp of the root record.
    block_header: Option<BlockHeader>,

    /// The decoded root record.
    data: Element,
}

/// This is a generic struct to easily pass additional data to a [Decodeable::decode] method.
#[derive(Clone, Copy, Default, Getters, Setters)]
#[getset(get = "pub", set = "pub")]
pub struct DecodeableExtraData<'a> {

    /// Schema for the decoder to use.
    schema: Option<&'a Schema>,

    /// Byte order of the file.
    endian: Endian,

    /// Codec behaviour toggles.
    options: CodecOptions,

    /// Path of the file on disk, if any.
    file_path: Option<&'a str>,
}

/// This is a generic struct to easily pass additional data to a [Encodeable::encode] method.
#[derive(Clone, Copy, Default, Getters, Setters)]
#[getset(get = "pub", set = "pub")]
pub struct EncodeableExtraData<'a> {

    /// Schema for the encoder to use.
    schema: Option<&'a Schema>,

    /// Byte order of the file.
    endian: Endian,

    /// Engine revision to stamp into the header. Defaults to the newest
    /// revision of the schema's generation.
    engine: Option<EngineTag>,

    /// Codec behaviour toggles.
    options: CodecOptions,
}

//---------------------------------------------------------------------------//
//                           Trait Definitions
//---------------------------------------------------------------------------//

/// A generic trait to implement decoding logic from anything implementing
/// [ReadBytes](crate::binary::ReadBytes) into structured types.
pub trait Decodeable: Send + Sync {

    /// This method provides a generic and expandable way to decode anything
    /// implementing [ReadBytes](crate::binary::ReadBytes) into the implementor's structure.
    fn decode<R: ReadBytes>(data: &mut R, extra_data: &Option<DecodeableExtraData>) -> Result<Self> where Self: Sized;
}

/// A generic trait to implement encoding logic from structured types into
/// anything implementing [WriteBytes](crate::binary::WriteBytes).
pub trait Encodeable: Send + Sync {

    /// This method provides a generic and expandable way to encode any
    /// implementor's structure into anything implementing [WriteBytes](crate::binary::WriteBytes).
    fn encode<W: WriteBytes>(&mut self, buffer: &mut W, extra_data: &Option<EncodeableExtraData>) -> Result<()>;
}

//---------------------------------------------------------------------------//
//                       Implementation of CodecOptions
//---------------------------------------------------------------------------//

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            preserve_version: false,
            preserve_strings: false,
            preserve_padding: false,
            convert_radians: true,
            generate_checksum: true,
        }
    }
}

impl CodecOptions {

    /// Round-trip configuration: everything preserved, checksum regenerated.
    pub fn preserving() -> Self {
        Self {
            preserve_version: true,
            preserve_strings: true,
            preserve_padding: true,
            convert_radians: true,
            generate_checksum: true,
        }
    }
}

//---------------------------------------------------------------------------//
//                       Implementation of TagHeader
//---------------------------------------------------------------------------//

impl Default for TagHeader {
    fn default() -> Self {
        Self::new_for(FourCC::new(&[0; 4]), 0, EngineTag::LATEST)
    }
}

impl TagHeader {

    /// This function builds a fresh header for a tag of the provided group and engine revision.
    pub fn new_for(group: FourCC, version: i16, engine: EngineTag) -> Self {
        Self {
            unk1: 0,
            flags: 0,
            tag_type: 0,
            name: String::new(),
            group,
            checksum: 0,
            data_offset: 0,
            data_length: 0,
            unk2: 0,
            version,
            destination: 0,
            plugin_handle: -1,
            engine: engine.fourcc(),
        }
    }

    /// This function reads the 64-byte header from the provided source.
    pub fn decode<R: ReadBytes>(data: &mut R, endian: Endian) -> Result<Self> {
        if data.len()?.saturating_sub(data.stream_position()?) < 64 {
            return Err(TagLibError::TagHeaderNotComplete);
        }

        Ok(Self {
            unk1: data.read_i16(endian)?,
            flags: data.read_i8()?,
            tag_type: data.read_i8()?,
            name: data.read_string_u8_0padded(32)?,
            group: FourCC(data.read_fourcc(endian)?),
            checksum: data.read_u32(endian)?,
            data_offset: data.read_i32(endian)?,
            data_length: data.read_i32(endian)?,
            unk2: data.read_i32(endian)?,
            version: data.read_i16(endian)?,
            destination: data.read_i8()?,
            plugin_handle: data.read_i8()?,
            engine: FourCC(data.read_fourcc(endian)?),
        })
    }

    /// This function writes the 64-byte header to the provided buffer.
    ///
    /// The name is written forward on both byte orders; only the fourcc fields swap.
    pub fn encode<W: WriteBytes>(&self, buffer: &mut W, endian: Endian) -> Result<()> {
        buffer.write_i16(self.unk1, endian)?;
        buffer.write_i8(self.flags)?;
        buffer.write_i8(self.tag_type)?;
        buffer.write_string_u8_0padded(&self.name, 32)?;
        buffer.write_fourcc(self.group.bytes(), endian)?;
        buffer.write_u32(self.checksum, endian)?;
        buffer.write_i32(self.data_offset, endian)?;
        buffer.write_i32(self.data_length, endian)?;
        buffer.write_i32(self.unk2, endian)?;
        buffer.write_i16(self.version, endian)?;
        buffer.write_i8(self.destination)?;
        buffer.write_i8(self.plugin_handle)?;
        buffer.write_fourcc(self.engine.bytes(), endian)
    }

    /// This function returns the engine revision declared by the header, if recognized.
    pub fn engine_tag(&self) -> Option<EngineTag> {
        EngineTag::from_fourcc(self.engine)
    }

    fn to_json(&self) -> Value {
        json!({
            "unk1": self.unk1,
            "flags": self.flags,
            "tag type": self.tag_type,
            "name": self.name,
            "tag group": self.group.to_string(),
            "checksum": self.checksum,
            "data offset": self.data_offset,
            "data length": self.data_length,
            "unk2": self.unk2,
            "version": self.version,
            "destination": self.destination,
            "plugin handle": self.plugin_handle,
            "engine tag": self.engine.to_string(),
        })
    }

    fn from_json(value: &Value) -> Option<Self> {
        Some(Self {
            unk1: value.get("unk1")?.as_i64()? as i16,
            flags: value.get("flags").and_then(Value::as_i64).unwrap_or_default() as i8,
            tag_type: value.get("tag type").and_then(Value::as_i64).unwrap_or_default() as i8,
            name: value.get("name").and_then(Value::as_str).unwrap_or_default().to_owned(),
            group: FourCC::from_str(value.get("tag group")?.as_str()?)?,
            checksum: value.get("checksum").and_then(Value::as_u64).unwrap_or_default() as u32,
            data_offset: value.get("data offset").and_then(Value::as_i64).unwrap_or_default() as i32,
            data_length: value.get("data length").and_then(Value::as_i64).unwrap_or_default() as i32,
            unk2: value.get("unk2").and_then(Value::as_i64).unwrap_or_default() as i32,
            version: value.get("version").and_then(Value::as_i64).unwrap_or_default() as i16,
            destination: value.get("destination").and_then(Value::as_i64).unwrap_or_default() as i8,
            plugin_handle: value.get("plugin handle").and_then(Value::as_i64).unwrap_or_default() as i8,
            engine: FourCC::from_str(value.get("engine tag")?.as_str()?)?,
        })
    }
}

//---------------------------------------------------------------------------//
//                       Implementation of TagFile
//---------------------------------------------------------------------------//

impl Decodeable for TagFile {

    fn decode<R: ReadBytes>(data: &mut R, extra_data: &Option<DecodeableExtraData>) -> Result<Self> {
        let extra_data = extra_data.as_ref().ok_or(TagLibError::DecodingMissingExtraData)?;
        let schema = extra_data.schema.ok_or(TagLibError::DecodingMissingExtraData)?;
        let endian = extra_data.endian;

        let header = TagHeader::decode(data, endian)?;
        let engine = header.engine_tag().ok_or_else(|| TagLibError::UnknownEngineTag(header.engine.to_string()))?;
        let generation = engine.generation();
        let group_name = generation.group_name(header.group)
            .ok_or_else(|| TagLibError::UnknownTagGroup(header.group.to_string()))?;
        let group = schema.group(header.group)
            .ok_or_else(|| TagLibError::MissingDefinition(group_name.to_owned()))?;

        let legacy = engine.legacy();
        let ctx = reader::ReadContext {
            endian,
            engine,
            legacy,
            options: extra_data.options,
        };

        let (block_header, block_count) = if engine.is_gen1() {
            let latest = group.layout().latest()
                .ok_or_else(|| TagLibError::MissingLatestFieldSet(group_name.to_owned()))?;
            (BlockHeader::tbfd(*latest.version(), *latest.size() as i32), 1i32)
        } else {
            let (name, version, count, size) = read_field_header(data, endian, legacy.contains(LegacyTraits::HEADER))?;
            (BlockHeader { name, version, size }, count)
        };

        let field_set = group.layout().by_version(block_header.version)
            .ok_or_else(|| TagLibError::MissingFieldSetVersion(group_name.to_owned(), block_header.version))?;

        let body_size = (block_count as i64 * block_header.size as i64).max(0) as usize;
        let mut block_stream = Cursor::new(data.read_slice(body_size, false)?);

        let mut root = Element::default();
        for block_idx in 0..block_count.max(0) as usize {
            for field in field_set.fields() {
                reader::read_fields(&ctx, data, &mut block_stream, &block_header, field, &mut root, block_idx)?;
            }

            align_to_slot(&mut block_stream, block_header.size)?;
        }

        Ok(Self {
            path: extra_data.file_path.unwrap_or_default().to_owned(),
            header,
            block_header: Some(block_header),
            data: root,
        })
    }
}

impl Encodeable for TagFile {

    fn encode<W: WriteBytes>(&mut self, buffer: &mut W, extra_data: &Option<EncodeableExtraData>) -> Result<()> {
        let extra_data = extra_data.as_ref().ok_or(TagLibError::EncodingMissingExtraData)?;
        let schema = extra_data.schema.ok_or(TagLibError::EncodingMissingExtraData)?;
        let endian = extra_data.endian;
        let options = extra_data.options;

        let target_engine = extra_data.engine.unwrap_or(match schema.generation() {
            Generation::Gen1 => EngineTag::Gen1,
            Generation::Gen2 => EngineTag::LATEST,
        });

        if !options.preserve_version() {
            self.header.engine = target_engine.fourcc();
        }

        let engine = self.header.engine_tag()
            .ok_or_else(|| TagLibError::UnknownEngineTag(self.header.engine.to_string()))?;
        let generation = engine.generation();
        let legacy = engine.legacy();

        let group_name = generation.group_name(self.header.group)
            .ok_or_else(|| TagLibError::UnknownTagGroup(self.header.group.to_string()))?;
        let group = schema.group(self.header.group)
            .ok_or_else(|| TagLibError::MissingDefinition(group_name.to_owned()))?;

        let (block_header, field_set) = match (&self.block_header, *options.preserve_version()) {
            (Some(stored), true) => {
                let field_set = group.layout().by_version(stored.version)
                    .ok_or_else(|| TagLibError::MissingFieldSetVersion(group_name.to_owned(), stored.version))?;
                (*stored, field_set)
            },
            _ => {
                let field_set = group.layout().latest()
                    .ok_or_else(|| TagLibError::MissingLatestFieldSet(group_name.to_owned()))?;
                (BlockHeader::tbfd(*field_set.version(), *field_set.size() as i32), field_set)
            },
        };

        self.block_header = Some(block_header);

        let ctx = writer::WriteContext {
            endian,
            engine,
            legacy,
            options,
        };

        let header_len = framing_len(engine, legacy);
        let mut body = Cursor::new(vec![0u8; block_header.size.max(0) as usize + header_len]);
        if !engine.is_gen1() {
            write_field_header(&mut body, &block_header, 1, endian, legacy.contains(LegacyTraits::HEADER))?;
        }

        for field in field_set.fields() {
            writer::write_fields(&ctx, &mut body, header_len as u64, &block_header, field, &self.data, 0)?;
        }

        let body = body.into_inner();
        if *options.generate_checksum() {
            self.header.checksum = checksum::body_checksum(&body);
        }

        self.header.encode(buffer, endian)?;
        buffer.write_all(&body).map_err(From::from)
    }
}

impl TagFile {

    /// This function dumps the decoded tag to the JSON shape of dump files.
    pub fn to_json(&self) -> Value {
        let generation = self.header.engine_tag().map(EngineTag::generation).unwrap_or(Generation::Gen2);
        let group_name = generation.group_name(self.header.group).unwrap_or_default();

        let mut map = Map::new();
        map.insert("TagName".to_owned(), json!(self.path));
        map.insert("Header".to_owned(), self.header.to_json());
        if let Some(block_header) = &self.block_header {
            map.insert(format!("TagBlockHeader_{group_name}"), json!({
                "name": block_header.name.to_string(),
                "version": block_header.version,
                "size": block_header.size,
            }));
        }

        map.insert("Data".to_owned(), self.data.to_json());
        Value::Object(map)
    }

    /// This function rebuilds a tag from a JSON dump. When the dump carries no
    /// header, a fresh one is stamped for the provided group and the newest
    /// revision of the schema's generation.
    pub fn from_json(value: &Value, schema: &Schema, group: FourCC) -> Result<Self> {
        let map = value.as_object().ok_or_else(|| TagLibError::JsonDumpMissingKey("a top-level object".to_owned()))?;

        let header = match map.get("Header").and_then(TagHeader::from_json) {
            Some(header) => header,
            None => {
                let group_def = schema.group(group)
                    .ok_or_else(|| TagLibError::MissingDefinition(group.to_string()))?;
                let engine = match schema.generation() {
                    Generation::Gen1 => EngineTag::Gen1,
                    Generation::Gen2 => EngineTag::LATEST,
                };

                TagHeader::new_for(group, *group_def.version(), engine)
            },
        };

        let block_header = map.iter()
            .find(|(key, _)| key.starts_with("TagBlockHeader_"))
            .and_then(|(_, value)| BlockHeader::from_json(value));

        let data = map.get("Data")
            .map(Element::from_json)
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            path: map.get("TagName").and_then(Value::as_str).unwrap_or_default().to_owned(),
            header,
            block_header,
            data,
        })
    }
}

//---------------------------------------------------------------------------//
//                       Framing helpers
//---------------------------------------------------------------------------//

/// Byte length of the framing record preceding a block body on this engine.
pub(crate) fn framing_len(engine: EngineTag, legacy: LegacyTraits) -> usize {
    if engine.is_gen1() {
        0
    } else if legacy.contains(LegacyTraits::HEADER) {
        12
    } else {
        16
    }
}

/// This function reads a block/struct framing record: `(name, version, count, size)`.
///
/// The legacy form packs version and count as i16.
pub(crate) fn read_field_header<R: ReadBytes>(data: &mut R, endian: Endian, legacy: bool) -> Result<(FourCC, i32, i32, i32)> {
    let name = FourCC(data.read_fourcc(endian)?);
    if legacy {
        let version = data.read_i16(endian)? as i32;
        let count = data.read_i16(endian)? as i32;
        let size = data.read_i32(endian)?;
        Ok((name, version, count, size))
    } else {
        let version = data.read_i32(endian)?;
        let count = data.read_i32(endian)?;
        let size = data.read_i32(endian)?;
        Ok((name, version, count, size))
    }
}

/// This function writes a block/struct framing record.
pub(crate) fn write_field_header<W: WriteBytes>(
    buffer: &mut W,
    header: &BlockHeader,
    count: i32,
    endian: Endian,
    legacy: bool,
) -> Result<()> {
    buffer.write_fourcc(header.name.bytes(), endian)?;
    if legacy {
        buffer.write_i16(header.version as i16, endian)?;
        buffer.write_i16(count as i16, endian)?;
    } else {
        buffer.write_i32(header.version, endian)?;
        buffer.write_i32(count, endian)?;
    }

    buffer.write_i32(header.size, endian)
}

/// This function skips the unread remainder of the current element slot, so
/// the next element starts at a slot boundary.
pub(crate) fn align_to_slot(stream: &mut Cursor<Vec<u8>>, slot_size: i32) -> Result<()> {
    if slot_size > 0 {
        let position = stream.position();
        let remainder = position % slot_size as u64;
        if remainder > 0 {
            stream.seek(SeekFrom::Current((slot_size as u64 - remainder) as i64))?;
        }
    }

    Ok(())
}
