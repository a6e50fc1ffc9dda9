//---------------------------------------------------------------------------//
// Copyright (c) 2025 The tagsmith contributors. All rights reserved.
//
// This file is part of the tagsmith project, a schema-driven codec and
// version migrator for game engine tag files.
//
// This file is licensed under the MIT license, which can be found here:
// https://opensource.org/licenses/MIT
//---------------------------------------------------------------------------//

//! Field-level decoder: one arm per field kind, reading inline bytes from the
//! current block substream and variable-length payloads from the main stream.
//!
//! A field that would overrun its element slot yields its kind's default
//! instead of faulting. That's how short-prefix versions in older files stay
//! readable: the missing tail simply decodes to zeros.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use std::io::{Cursor, Seek, SeekFrom};

use crate::binary::{Endian, ReadBytes};
use crate::error::{Result, TagLibError};
use crate::groups::{EngineTag, FourCC, LegacyTraits};
use crate::schema::{Field, FieldKind};
use crate::tags::{align_to_slot, read_field_header, CodecOptions};

use super::value::{BlockFrame, BlockHeader, DataBlob, Element, TagRef, TagValue};

//---------------------------------------------------------------------------//
//                              Enums & Structs
//---------------------------------------------------------------------------//

/// Everything a decode pass needs to know, threaded explicitly through the recursion.
pub(crate) struct ReadContext {
    pub endian: Endian,
    pub engine: EngineTag,
    pub legacy: LegacyTraits,
    pub options: CodecOptions,
}

//---------------------------------------------------------------------------//
//                              Field decoding
//---------------------------------------------------------------------------//

/// This function decodes one field of one element into the provided record.
pub(crate) fn read_fields<R: ReadBytes>(
    ctx: &ReadContext,
    tag_stream: &mut R,
    block_stream: &mut Cursor<Vec<u8>>,
    block_header: &BlockHeader,
    field: &Field,
    element: &mut Element,
    block_idx: usize,
) -> Result<()> {
    let endian = field.effective_endian(ctx.endian);
    let unsigned = *field.unsigned();
    let key = field.name();

    let unread = (block_idx as i64 + 1) * block_header.size as i64 - block_stream.position() as i64;
    let field_size = field.kind().codec_size(ctx.legacy);
    let fits = unread >= field_size as i64;

    match field.kind() {
        FieldKind::Angle => {
            let mut result = 0.0;
            if fits {
                result = block_stream.read_f32(endian)? as f64;
                if *ctx.options.convert_radians() {
                    result = result.to_degrees();
                }
            }

            element.set(key, TagValue::Real(result));
        },

        FieldKind::AngleBounds => {
            let mut bounds = (0.0, 0.0);
            if fits {
                bounds = (block_stream.read_f32(endian)? as f64, block_stream.read_f32(endian)? as f64);
                if *ctx.options.convert_radians() {
                    bounds = (bounds.0.to_degrees(), bounds.1.to_degrees());
                }
            }

            element.set(key, TagValue::Bounds { min: bounds.0, max: bounds.1 });
        },

        FieldKind::ArgbColor => {
            let mut channels = [0.0; 4];
            if fits {
                for channel in &mut channels {
                    *channel = read_int_1(block_stream, unsigned)? as f64;
                }
            }

            element.set(key, TagValue::Color { alpha: Some(channels[0]), red: channels[1], green: channels[2], blue: channels[3] });
        },

        FieldKind::Block(def) => {
            element.block_frames.insert(key.to_owned(), BlockFrame::default());
            element.block_headers.insert(key.to_owned(), BlockHeader::default());
            element.set(key, TagValue::Block(vec![]));

            let (mut count, mut unk1, mut unk2) = (0i32, 0i32, 0i32);
            if fits {
                count = block_stream.read_i32(endian)?;
                unk1 = block_stream.read_i32(endian)?;
                unk2 = block_stream.read_i32(endian)?;
            }

            element.block_frames.insert(key.to_owned(), BlockFrame { unk1: unk1 as i64, unk2: unk2 as i64 });

            if count > 0 {
                let header = if ctx.engine.is_gen1() {
                    let latest = def.layout().latest()
                        .ok_or_else(|| TagLibError::MissingLatestFieldSet(key.to_owned()))?;
                    BlockHeader::tbfd(*latest.version(), *latest.size() as i32)
                } else {
                    let (name, version, _count, size) = read_field_header(tag_stream, ctx.endian, ctx.legacy.contains(LegacyTraits::HEADER))?;
                    BlockHeader { name, version, size }
                };

                element.block_headers.insert(key.to_owned(), header);

                let field_set = def.layout().by_version(header.version)
                    .ok_or_else(|| TagLibError::MissingFieldSetVersion(key.to_owned(), header.version))?;

                let body_size = (count as i64 * header.size as i64).max(0) as usize;
                let mut sub_stream = Cursor::new(tag_stream.read_slice(body_size, false)?);

                let mut elements = Vec::with_capacity(count as usize);
                for idx in 0..count as usize {
                    let mut child = Element::default();
                    for sub_field in field_set.fields() {
                        read_fields(ctx, tag_stream, &mut sub_stream, &header, sub_field, &mut child, idx)?;
                    }

                    align_to_slot(&mut sub_stream, header.size)?;
                    elements.push(child);
                }

                element.set(key, TagValue::Block(elements));
            }
        },

        FieldKind::ByteFlags | FieldKind::CharBlockIndex | FieldKind::CharInteger => {
            let result = if fits { read_int_1(block_stream, unsigned)? } else { 0 };
            element.set(key, TagValue::Int(result));
        },

        FieldKind::CharEnum => {
            let result = if fits { read_int_1(block_stream, unsigned)? } else { 0 };
            element.set(key, TagValue::Enum { kind: "CharEnum".to_owned(), value: result });
        },

        FieldKind::CustomShortBlockIndex | FieldKind::ShortBlockIndex | FieldKind::ShortInteger |
        FieldKind::WordBlockFlags | FieldKind::WordFlags => {
            let result = if fits { read_int_2(block_stream, endian, unsigned)? } else { 0 };
            element.set(key, TagValue::Int(result));
        },

        FieldKind::ShortEnum => {
            let result = if fits { read_int_2(block_stream, endian, unsigned)? } else { 0 };
            element.set(key, TagValue::Enum { kind: "ShortEnum".to_owned(), value: result });
        },

        FieldKind::CustomLongBlockIndex | FieldKind::LongBlockIndex | FieldKind::LongFlags |
        FieldKind::LongInteger => {
            let result = if fits { read_int_4(block_stream, endian, unsigned)? } else { 0 };
            element.set(key, TagValue::Int(result));
        },

        FieldKind::LongEnum => {
            let result = if fits { read_int_4(block_stream, endian, unsigned)? } else { 0 };
            element.set(key, TagValue::Enum { kind: "LongEnum".to_owned(), value: result });
        },

        FieldKind::Data => {
            let mut blob = DataBlob::default();
            if fits {
                blob.length = block_stream.read_i32(endian)? as i64;
                blob.unk1 = block_stream.read_i32(endian)? as i64;
                blob.unk2 = block_stream.read_i32(endian)? as i64;
                blob.unk3 = block_stream.read_i32(endian)? as i64;
                blob.unk4 = block_stream.read_i32(endian)? as i64;
            }

            blob.bytes = tag_stream.read_slice(blob.length.max(0) as usize, false)?;
            element.set(key, TagValue::Data(blob));
        },

        FieldKind::String32 | FieldKind::LongString => {
            let length = field_size as usize;
            let mut result = String::new();
            if fits {
                result = read_inline_string(block_stream, length, 1, false, *ctx.options.preserve_strings())?;
            }

            element.set(key, TagValue::Str(result));
        },

        FieldKind::OldStringId => {
            let mut pad = 0i64;
            let mut result = String::new();
            if ctx.legacy.contains(LegacyTraits::STRINGS) {
                if fits {
                    result = read_inline_string(block_stream, 32, 1, false, *ctx.options.preserve_strings())?;
                }
            } else if fits {
                pad = block_stream.read_u16(Endian::Big)? as i64;
                let length = block_stream.read_u16(Endian::Big)? as usize;
                result = read_inline_string(tag_stream, length, 0, false, *ctx.options.preserve_strings())?;
            }

            element.set(&format!("{key}_pad"), TagValue::Int(pad));
            element.set(key, TagValue::Str(result));
        },

        FieldKind::StringId => {
            let mut pad = 0i64;
            let mut result = String::new();
            if fits {
                pad = block_stream.read_u16(Endian::Big)? as i64;
                let length = block_stream.read_u16(Endian::Big)? as usize;
                result = read_inline_string(tag_stream, length, 0, false, *ctx.options.preserve_strings())?;
            }

            element.set(&format!("{key}_pad"), TagValue::Int(pad));
            element.set(key, TagValue::Str(result));
        },

        FieldKind::Tag => {
            let mut result = String::new();
            if fits {
                result = read_inline_string(block_stream, 4, 0, false, *ctx.options.preserve_strings())?;
            }

            element.set(key, TagValue::Str(result));
        },

        FieldKind::TagReference { .. } => {
            let mut tag_ref = TagRef::default();
            if fits {
                let raw_group = block_stream.read_slice(4, false)?;
                let group_int = match endian {
                    Endian::Little => i32::from_le_bytes([raw_group[0], raw_group[1], raw_group[2], raw_group[3]]),
                    Endian::Big => i32::from_be_bytes([raw_group[0], raw_group[1], raw_group[2], raw_group[3]]),
                };

                let group = if group_int == -1 {
                    None
                } else {
                    let mut bytes = [raw_group[0], raw_group[1], raw_group[2], raw_group[3]];
                    if endian.is_little() {
                        bytes.reverse();
                    }

                    Some(String::from_utf8_lossy(&bytes).to_string())
                };

                tag_ref.unk1 = block_stream.read_i32(endian)? as i64;
                tag_ref.length = block_stream.read_i32(endian)? as i64;
                tag_ref.unk2 = block_stream.read_i32(endian)? as i64;
                tag_ref.group = group;
                tag_ref.path = read_inline_string(tag_stream, tag_ref.length.max(0) as usize, 1, true, *ctx.options.preserve_strings())?;
            }

            element.set(key, TagValue::TagRef(tag_ref));
        },

        FieldKind::Pad { .. } | FieldKind::Skip { .. } | FieldKind::Ptr |
        FieldKind::UselessPad { .. } | FieldKind::VertexBuffer => {
            let mut result = vec![0u8; field_size as usize];
            if fits {
                result = block_stream.read_slice(field_size as usize, false)?;
            }

            if *ctx.options.preserve_padding() {
                element.set(key, TagValue::Bytes(result));
            }
        },

        FieldKind::Point2D => {
            let mut values = vec![0i64; 2];
            if fits {
                for value in &mut values {
                    *value = read_int_2(block_stream, endian, unsigned)?;
                }
            }

            element.set(key, TagValue::Ints(values));
        },

        FieldKind::Rectangle2D => {
            let mut values = vec![0i64; 4];
            if fits {
                for value in &mut values {
                    *value = read_int_2(block_stream, endian, unsigned)?;
                }
            }

            element.set(key, TagValue::Ints(values));
        },

        FieldKind::Real | FieldKind::RealFraction => {
            let result = if fits { block_stream.read_f32(endian)? as f64 } else { 0.0 };
            element.set(key, TagValue::Real(result));
        },

        FieldKind::RealBounds | FieldKind::RealFractionBounds => {
            let mut bounds = (0.0, 0.0);
            if fits {
                bounds = (block_stream.read_f32(endian)? as f64, block_stream.read_f32(endian)? as f64);
            }

            element.set(key, TagValue::Bounds { min: bounds.0, max: bounds.1 });
        },

        FieldKind::ShortBounds => {
            let mut bounds = (0.0, 0.0);
            if fits {
                bounds = (read_int_2(block_stream, endian, unsigned)? as f64, read_int_2(block_stream, endian, unsigned)? as f64);
            }

            element.set(key, TagValue::Bounds { min: bounds.0, max: bounds.1 });
        },

        FieldKind::RealEulerAngles2D | FieldKind::RealEulerAngles3D => {
            let arity = if *field.kind() == FieldKind::RealEulerAngles2D { 2 } else { 3 };
            let mut values = vec![0.0; arity];
            if fits {
                for value in &mut values {
                    *value = block_stream.read_f32(endian)? as f64;
                    if *ctx.options.convert_radians() {
                        *value = value.to_degrees();
                    }
                }
            }

            element.set(key, TagValue::Reals(values));
        },

        FieldKind::RealPoint2D | FieldKind::RealVector2D => {
            element.set(key, TagValue::Reals(read_reals(block_stream, endian, 2, fits)?));
        },

        FieldKind::RealPlane2D | FieldKind::RealPoint3D | FieldKind::RealVector3D => {
            element.set(key, TagValue::Reals(read_reals(block_stream, endian, 3, fits)?));
        },

        FieldKind::RealPlane3D | FieldKind::RealQuaternion => {
            element.set(key, TagValue::Reals(read_reals(block_stream, endian, 4, fits)?));
        },

        FieldKind::Matrix3x3 => {
            element.set(key, TagValue::Reals(read_reals(block_stream, endian, 9, fits)?));
        },

        FieldKind::RealRgbColor => {
            let channels = read_reals(block_stream, endian, 3, fits)?;
            element.set(key, TagValue::Color { alpha: None, red: channels[0], green: channels[1], blue: channels[2] });
        },

        FieldKind::RealArgbColor => {
            let channels = read_reals(block_stream, endian, 4, fits)?;
            element.set(key, TagValue::Color { alpha: Some(channels[0]), red: channels[1], green: channels[2], blue: channels[3] });
        },

        FieldKind::RgbColor => {
            let (mut red, mut green, mut blue, mut pad) = (0.0, 0.0, 0.0, 0i64);
            if fits {
                blue = block_stream.read_u8()? as f64;
                green = block_stream.read_u8()? as f64;
                red = block_stream.read_u8()? as f64;
                pad = block_stream.read_u8()? as i64;
            }

            element.set(key, TagValue::Color { alpha: None, red, green, blue });
            element.set(&format!("{key}_pad"), TagValue::Int(pad));
        },

        FieldKind::Struct(def) => {
            let mut version = 0i32;
            let mut read_struct = ctx.engine.is_gen1();

            if !ctx.engine.is_gen1() {
                let stream_len = tag_stream.len()?;
                let position = tag_stream.stream_position()?;

                // Struct framing lives in the resource stream, after the block
                // bodies. A fourcc mismatch means the file predates this
                // struct; the peek is rewound and the struct contributes nothing.
                if stream_len.saturating_sub(position) >= 16 {
                    let (name, peeked_version, _count, size) = read_field_header(tag_stream, ctx.endian, ctx.legacy.contains(LegacyTraits::HEADER))?;
                    read_struct = true;
                    version = peeked_version;

                    if def.fourcc() != &Some(name) {
                        tag_stream.seek(SeekFrom::Start(position))?;
                        read_struct = false;
                        version = 0;
                    }

                    if *def.fourcc() == FourCC::from_str("cmtb") {
                        read_struct = true;
                    }

                    if read_struct {
                        element.struct_headers.insert(def.key().to_owned(), BlockHeader { name, version, size });
                    }
                }
            }

            if read_struct {
                let field_set = def.layout().by_version(version)
                    .ok_or_else(|| TagLibError::MissingFieldSetVersion(key.to_owned(), version))?;

                for sub_field in field_set.fields() {
                    read_fields(ctx, tag_stream, block_stream, block_header, sub_field, element, block_idx)?;
                }
            }
        },

        FieldKind::Explanation => {},
    }

    Ok(())
}

//---------------------------------------------------------------------------//
//                              Read helpers
//---------------------------------------------------------------------------//

fn read_int_1(stream: &mut Cursor<Vec<u8>>, unsigned: bool) -> Result<i64> {
    Ok(if unsigned { stream.read_u8()? as i64 } else { stream.read_i8()? as i64 })
}

fn read_int_2(stream: &mut Cursor<Vec<u8>>, endian: Endian, unsigned: bool) -> Result<i64> {
    Ok(if unsigned { stream.read_u16(endian)? as i64 } else { stream.read_i16(endian)? as i64 })
}

fn read_int_4(stream: &mut Cursor<Vec<u8>>, endian: Endian, unsigned: bool) -> Result<i64> {
    Ok(if unsigned { stream.read_u32(endian)? as i64 } else { stream.read_i32(endian)? as i64 })
}

fn read_reals(stream: &mut Cursor<Vec<u8>>, endian: Endian, arity: usize, fits: bool) -> Result<Vec<f64>> {
    let mut values = vec![0.0; arity];
    if fits {
        for value in &mut values {
            *value = stream.read_f32(endian)? as f64;
        }
    }

    Ok(values)
}

/// This function reads a variable-length string field.
///
/// `length` counts the full inline run including its terminator when
/// `append_terminator` is off; with it on, the terminator trails the run.
/// Under string preservation the raw bytes come back base64-encoded instead
/// of decoded.
pub(crate) fn read_inline_string<R: ReadBytes>(
    stream: &mut R,
    length: usize,
    terminator: usize,
    append_terminator: bool,
    preserve: bool,
) -> Result<String> {
    if length == 0 {
        return Ok(String::new());
    }

    let content_len = if append_terminator { length } else { length.saturating_sub(terminator) };
    let data = stream.read_slice(content_len + terminator, false)?;

    if preserve {
        Ok(BASE64.encode(&data))
    } else {
        let text = String::from_utf8_lossy(&data[..content_len]);
        Ok(text.split('\0').next().unwrap_or_default().trim_matches(' ').to_string())
    }
}
