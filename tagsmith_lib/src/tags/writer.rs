//---------------------------------------------------------------------------//
// Copyright (c) 2025 The tagsmith contributors. All rights reserved.
//
// This file is part of the tagsmith project, a schema-driven codec and
// version migrator for game engine tag files.
//
// This file is licensed under the MIT license, which can be found here:
// https://opensource.org/licenses/MIT
//---------------------------------------------------------------------------//

//! Field-level encoder, mirroring the decoder arm for arm.
//!
//! Each block body is built in its own pre-zeroed substream (framing record
//! first, then the elements, each realigned to its size slot), with
//! variable-length payloads appended at the end. Finished substreams are in
//! turn appended to the end of their parent, which reproduces the depth-first
//! document order of the resource stream.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use std::io::{Cursor, Seek, SeekFrom, Write};

use crate::binary::{Endian, WriteBytes};
use crate::error::{Result, TagLibError};
use crate::groups::{EngineTag, FourCC, LegacyTraits};
use crate::schema::{Field, FieldKind};
use crate::tags::{framing_len, write_field_header, CodecOptions};

use super::value::{BlockHeader, Element, TagValue};

//---------------------------------------------------------------------------//
//                              Enums & Structs
//---------------------------------------------------------------------------//

/// Everything an encode pass needs to know, threaded explicitly through the recursion.
pub(crate) struct WriteContext {
    pub endian: Endian,
    pub engine: EngineTag,
    pub legacy: LegacyTraits,
    pub options: CodecOptions,
}

//---------------------------------------------------------------------------//
//                              Field encoding
//---------------------------------------------------------------------------//

/// This function encodes one field of one element into the current block substream.
pub(crate) fn write_fields(
    ctx: &WriteContext,
    block_stream: &mut Cursor<Vec<u8>>,
    header_len: u64,
    block_header: &BlockHeader,
    field: &Field,
    element: &Element,
    block_idx: usize,
) -> Result<()> {
    let endian = field.effective_endian(ctx.endian);
    let key = field.name();

    // Stop once the element slot is full. Older field sets are shorter than
    // the latest; whatever they don't declare stays zero.
    if block_stream.position().saturating_sub(header_len) >= (block_idx as u64 + 1) * block_header.size.max(0) as u64 {
        return Ok(());
    }

    match field.kind() {
        FieldKind::Angle => {
            let mut value = element.get(key).and_then(TagValue::as_real).unwrap_or(0.0);
            if *ctx.options.convert_radians() {
                value = value.to_radians();
            }

            block_stream.write_f32(value as f32, endian)?;
        },

        FieldKind::AngleBounds => {
            let (mut min, mut max) = bounds_of(element.get(key));
            if *ctx.options.convert_radians() {
                min = min.to_radians();
                max = max.to_radians();
            }

            block_stream.write_f32(min as f32, endian)?;
            block_stream.write_f32(max as f32, endian)?;
        },

        FieldKind::ArgbColor => {
            let (alpha, red, green, blue) = color_of(element.get(key));
            for channel in [alpha, red, green, blue] {
                block_stream.write_i8(channel as i8)?;
            }
        },

        FieldKind::Block(def) => {
            let elements = element.block(key);
            let count = elements.map(|elements| elements.len()).unwrap_or(0) as i32;

            let frame = if *ctx.options.preserve_padding() {
                element.block_frames.get(key).copied().unwrap_or_default()
            } else {
                Default::default()
            };

            block_stream.write_i32(count, endian)?;
            block_stream.write_i32(frame.unk1 as i32, endian)?;
            block_stream.write_i32(frame.unk2 as i32, endian)?;

            let (header, field_set) = match (element.block_headers.get(key), *ctx.options.preserve_version()) {
                (Some(stored), true) => {
                    let field_set = def.layout().by_version(stored.version)
                        .ok_or_else(|| TagLibError::MissingFieldSetVersion(key.to_owned(), stored.version))?;
                    (*stored, field_set)
                },
                _ => {
                    let field_set = def.layout().latest()
                        .ok_or_else(|| TagLibError::MissingLatestFieldSet(key.to_owned()))?;
                    (BlockHeader::tbfd(*field_set.version(), *field_set.size() as i32), field_set)
                },
            };

            if let Some(elements) = elements {
                if !elements.is_empty() {
                    let sub_header_len = framing_len(ctx.engine, ctx.legacy);
                    let body_len = elements.len() * header.size.max(0) as usize + sub_header_len;
                    let mut sub_stream = Cursor::new(vec![0u8; body_len]);

                    if !ctx.engine.is_gen1() {
                        write_field_header(&mut sub_stream, &header, elements.len() as i32, ctx.endian, ctx.legacy.contains(LegacyTraits::HEADER))?;
                    }

                    for (idx, child) in elements.iter().enumerate() {
                        for sub_field in field_set.fields() {
                            write_fields(ctx, &mut sub_stream, sub_header_len as u64, &header, sub_field, child, idx)?;
                        }

                        sub_stream.seek(SeekFrom::Start(sub_header_len as u64 + (idx as u64 + 1) * header.size.max(0) as u64))?;
                    }

                    append_to_end(block_stream, sub_stream.get_ref())?;
                }
            }
        },

        FieldKind::ByteFlags | FieldKind::CharBlockIndex | FieldKind::CharInteger | FieldKind::CharEnum => {
            let value = element.get(key).and_then(TagValue::as_int).unwrap_or(0);
            write_int_1(block_stream, value, *field.unsigned())?;
        },

        FieldKind::CustomShortBlockIndex | FieldKind::ShortBlockIndex | FieldKind::ShortInteger |
        FieldKind::ShortEnum | FieldKind::WordBlockFlags | FieldKind::WordFlags => {
            let value = element.get(key).and_then(TagValue::as_int).unwrap_or(0);
            write_int_2(block_stream, value, endian, *field.unsigned())?;
        },

        FieldKind::CustomLongBlockIndex | FieldKind::LongBlockIndex | FieldKind::LongEnum |
        FieldKind::LongFlags | FieldKind::LongInteger => {
            let value = element.get(key).and_then(TagValue::as_int).unwrap_or(0);
            write_int_4(block_stream, value, endian, *field.unsigned())?;
        },

        FieldKind::Data => {
            match element.get(key) {
                Some(TagValue::Data(blob)) => {
                    block_stream.write_i32(blob.bytes.len() as i32, endian)?;
                    if *ctx.options.preserve_padding() {
                        block_stream.write_i32(blob.unk1 as i32, endian)?;
                        block_stream.write_i32(blob.unk2 as i32, endian)?;
                        block_stream.write_i32(blob.unk3 as i32, endian)?;
                        block_stream.write_i32(blob.unk4 as i32, endian)?;
                    } else {
                        for _ in 0..4 {
                            block_stream.write_i32(0, endian)?;
                        }
                    }

                    append_to_end(block_stream, &blob.bytes)?;
                },
                _ => for _ in 0..5 {
                    block_stream.write_i32(0, endian)?;
                },
            }
        },

        FieldKind::String32 | FieldKind::LongString => {
            let length = field.kind().codec_size(ctx.legacy) as usize;
            match element.get(key).and_then(TagValue::as_str) {
                Some(value) => write_inline_string(block_stream, value, length, 1, false, *ctx.options.preserve_strings())?,
                None => write_inline_string(block_stream, "", length, 1, false, false)?,
            }
        },

        FieldKind::OldStringId => {
            if ctx.legacy.contains(LegacyTraits::STRINGS) {
                match element.get(key).and_then(TagValue::as_str) {
                    Some(value) => write_inline_string(block_stream, value, 32, 1, false, *ctx.options.preserve_strings())?,
                    None => write_inline_string(block_stream, "", 32, 1, false, false)?,
                }
            } else {
                write_string_id(ctx, block_stream, key, element)?;
            }
        },

        FieldKind::StringId => write_string_id(ctx, block_stream, key, element)?,

        FieldKind::Tag => {
            match element.get(key).and_then(TagValue::as_str) {
                Some(value) => write_inline_string(block_stream, value, 4, 0, false, *ctx.options.preserve_strings())?,
                None => write_inline_string(block_stream, "", 4, 0, false, false)?,
            }
        },

        FieldKind::TagReference { .. } => {
            match element.get(key) {
                Some(TagValue::TagRef(tag_ref)) => {
                    let (unk1, unk2) = if *ctx.options.preserve_padding() {
                        (tag_ref.unk1, tag_ref.unk2)
                    } else {
                        (0, 0)
                    };

                    let length = if *ctx.options.preserve_strings() {
                        preserved_length(&tag_ref.path)?
                    } else {
                        tag_ref.path.len()
                    };

                    match &tag_ref.group {
                        Some(group) => block_stream.write_fourcc(fourcc_bytes(group), endian)?,
                        None => block_stream.write_i32(-1, endian)?,
                    }

                    block_stream.write_i32(unk1 as i32, endian)?;
                    block_stream.write_i32(length as i32, endian)?;
                    block_stream.write_i32(unk2 as i32, endian)?;

                    let position = block_stream.position();
                    block_stream.seek(SeekFrom::End(0))?;
                    write_inline_string(block_stream, &tag_ref.path, length, 1, true, *ctx.options.preserve_strings())?;
                    block_stream.set_position(position);
                },
                _ => {
                    block_stream.write_i32(-1, endian)?;
                    for _ in 0..3 {
                        block_stream.write_i32(0, endian)?;
                    }
                },
            }
        },

        FieldKind::Pad { .. } | FieldKind::Skip { .. } | FieldKind::Ptr |
        FieldKind::UselessPad { .. } | FieldKind::VertexBuffer => {
            let size = field.kind().codec_size(ctx.legacy) as usize;
            match element.get(key).and_then(TagValue::as_padding_bytes) {
                Some(bytes) if *ctx.options.preserve_padding() => {
                    let mut fitted = bytes;
                    fitted.resize(size, 0);
                    block_stream.write_all(&fitted)?;
                },
                _ => block_stream.write_all(&vec![0u8; size])?,
            }
        },

        FieldKind::Point2D => {
            let values = ints_of(element.get(key), 2);
            for value in values {
                write_int_2(block_stream, value, endian, *field.unsigned())?;
            }
        },

        FieldKind::Rectangle2D => {
            let values = ints_of(element.get(key), 4);
            for value in values {
                write_int_2(block_stream, value, endian, *field.unsigned())?;
            }
        },

        FieldKind::Real | FieldKind::RealFraction => {
            let value = element.get(key).and_then(TagValue::as_real).unwrap_or(0.0);
            block_stream.write_f32(value as f32, endian)?;
        },

        FieldKind::RealBounds => {
            // Migrations may leave a plain scalar behind; it widens to both endpoints.
            let (min, max) = match element.get(key) {
                Some(TagValue::Bounds { min, max }) => (*min, *max),
                Some(value) => {
                    let scalar = value.as_real().unwrap_or(0.0);
                    (scalar, scalar)
                },
                None => (0.0, 0.0),
            };

            block_stream.write_f32(min as f32, endian)?;
            block_stream.write_f32(max as f32, endian)?;
        },

        FieldKind::RealFractionBounds => {
            let (min, max) = bounds_of(element.get(key));
            block_stream.write_f32(min as f32, endian)?;
            block_stream.write_f32(max as f32, endian)?;
        },

        FieldKind::ShortBounds => {
            let (min, max) = bounds_of(element.get(key));
            write_int_2(block_stream, min.round() as i64, endian, *field.unsigned())?;
            write_int_2(block_stream, max.round() as i64, endian, *field.unsigned())?;
        },

        FieldKind::RealEulerAngles2D | FieldKind::RealEulerAngles3D => {
            let arity = if *field.kind() == FieldKind::RealEulerAngles2D { 2 } else { 3 };
            let values = reals_of(element.get(key), arity);
            for mut value in values {
                if *ctx.options.convert_radians() {
                    value = value.to_radians();
                }

                block_stream.write_f32(value as f32, endian)?;
            }
        },

        FieldKind::RealPoint2D | FieldKind::RealVector2D => write_reals(block_stream, element.get(key), 2, endian)?,
        FieldKind::RealPlane2D | FieldKind::RealPoint3D | FieldKind::RealVector3D => write_reals(block_stream, element.get(key), 3, endian)?,
        FieldKind::RealPlane3D | FieldKind::RealQuaternion => write_reals(block_stream, element.get(key), 4, endian)?,
        FieldKind::Matrix3x3 => write_reals(block_stream, element.get(key), 9, endian)?,

        FieldKind::RealRgbColor => {
            let (_, red, green, blue) = color_of(element.get(key));
            for channel in [red, green, blue] {
                block_stream.write_f32(channel as f32, endian)?;
            }
        },

        FieldKind::RealArgbColor => {
            let (alpha, red, green, blue) = color_of(element.get(key));
            for channel in [alpha, red, green, blue] {
                block_stream.write_f32(channel as f32, endian)?;
            }
        },

        FieldKind::RgbColor => {
            let pad = if *ctx.options.preserve_padding() {
                element.get(&format!("{key}_pad")).and_then(TagValue::as_int).unwrap_or(0)
            } else {
                0
            };

            let (_, red, green, blue) = color_of(element.get(key));
            for channel in [blue, green, red] {
                block_stream.write_u8(channel as u8)?;
            }

            block_stream.write_u8(pad as u8)?;
        },

        FieldKind::Struct(def) => {
            let (header, field_set) = match (element.struct_headers.get(def.key()), *ctx.options.preserve_version()) {
                (Some(stored), true) => {
                    let field_set = def.layout().by_version(stored.version)
                        .ok_or_else(|| TagLibError::MissingFieldSetVersion(key.to_owned(), stored.version))?;
                    (*stored, field_set)
                },
                _ => {
                    let field_set = def.layout().latest()
                        .ok_or_else(|| TagLibError::MissingLatestFieldSet(key.to_owned()))?;
                    let name = (*def.fourcc()).unwrap_or(FourCC::new(&[0; 4]));
                    (BlockHeader { name, version: *field_set.version(), size: *field_set.size() as i32 }, field_set)
                },
            };

            if !ctx.engine.is_gen1() {
                let position = block_stream.position();
                block_stream.seek(SeekFrom::End(0))?;
                write_field_header(block_stream, &header, 1, ctx.endian, ctx.legacy.contains(LegacyTraits::HEADER))?;
                block_stream.set_position(position);
            }

            for sub_field in field_set.fields() {
                write_fields(ctx, block_stream, header_len, block_header, sub_field, element, block_idx)?;
            }
        },

        FieldKind::Explanation => {},
    }

    Ok(())
}

//---------------------------------------------------------------------------//
//                              Write helpers
//---------------------------------------------------------------------------//

fn write_int_1(stream: &mut Cursor<Vec<u8>>, value: i64, unsigned: bool) -> Result<()> {
    if unsigned {
        stream.write_u8(value as u8)
    } else {
        stream.write_i8(value as i8)
    }
}

fn write_int_2(stream: &mut Cursor<Vec<u8>>, value: i64, endian: Endian, unsigned: bool) -> Result<()> {
    if unsigned {
        stream.write_u16(value as u16, endian)
    } else {
        stream.write_i16(value as i16, endian)
    }
}

fn write_int_4(stream: &mut Cursor<Vec<u8>>, value: i64, endian: Endian, unsigned: bool) -> Result<()> {
    if unsigned {
        stream.write_u32(value as u32, endian)
    } else {
        stream.write_i32(value as i32, endian)
    }
}

fn write_reals(stream: &mut Cursor<Vec<u8>>, value: Option<&TagValue>, arity: usize, endian: Endian) -> Result<()> {
    for value in reals_of(value, arity) {
        stream.write_f32(value as f32, endian)?;
    }

    Ok(())
}

fn bounds_of(value: Option<&TagValue>) -> (f64, f64) {
    value.and_then(TagValue::as_bounds).unwrap_or((0.0, 0.0))
}

fn color_of(value: Option<&TagValue>) -> (f64, f64, f64, f64) {
    match value {
        Some(TagValue::Color { alpha, red, green, blue }) => (alpha.unwrap_or(0.0), *red, *green, *blue),
        _ => (0.0, 0.0, 0.0, 0.0),
    }
}

fn reals_of(value: Option<&TagValue>, arity: usize) -> Vec<f64> {
    let mut values = match value {
        Some(TagValue::Reals(values)) => values.clone(),
        Some(TagValue::Ints(values)) => values.iter().map(|value| *value as f64).collect(),
        _ => vec![],
    };

    values.resize(arity, 0.0);
    values
}

fn ints_of(value: Option<&TagValue>, arity: usize) -> Vec<i64> {
    let mut values = match value {
        Some(TagValue::Ints(values)) => values.clone(),
        Some(TagValue::Reals(values)) => values.iter().map(|value| value.round() as i64).collect(),
        _ => vec![],
    };

    values.resize(arity, 0);
    values
}

/// The inline half of an interned string: a pad word and the pool length, both
/// big-endian whatever the file order, with the UTF-8 bytes appended to the
/// resource stream without a terminator.
fn write_string_id(ctx: &WriteContext, block_stream: &mut Cursor<Vec<u8>>, key: &str, element: &Element) -> Result<()> {
    let pad = element.get(&format!("{key}_pad")).and_then(TagValue::as_int).unwrap_or(0);

    match element.get(key).and_then(TagValue::as_str) {
        Some(value) => {
            let length = if *ctx.options.preserve_strings() {
                preserved_length(value)?
            } else {
                value.len()
            };

            block_stream.write_u16(pad as u16, Endian::Big)?;
            block_stream.write_u16(length as u16, Endian::Big)?;

            let position = block_stream.position();
            block_stream.seek(SeekFrom::End(0))?;
            write_inline_string(block_stream, value, length, 0, false, *ctx.options.preserve_strings())?;
            block_stream.set_position(position);
        },
        None => {
            block_stream.write_u16(0, Endian::Big)?;
            block_stream.write_u16(0, Endian::Big)?;
        },
    }

    Ok(())
}

/// This function writes a variable-length string field. See
/// [`read_inline_string`](super::reader::read_inline_string) for the length
/// conventions; under string preservation the value is base64 of the raw run
/// and gets written back verbatim.
fn write_inline_string(
    stream: &mut Cursor<Vec<u8>>,
    value: &str,
    fixed_length: usize,
    terminator: usize,
    append_terminator: bool,
    preserve: bool,
) -> Result<()> {
    if preserve {
        let bytes = BASE64.decode(value)?;
        stream.write_all(&bytes).map_err(From::from)
    } else {
        let bytes = value.as_bytes();
        let (content_len, terminator) = if bytes.is_empty() {
            (fixed_length, 0)
        } else if append_terminator {
            (fixed_length, terminator)
        } else {
            (fixed_length.saturating_sub(terminator), terminator)
        };

        let mut buffer = vec![0u8; content_len + terminator];
        let copied = bytes.len().min(content_len);
        buffer[..copied].copy_from_slice(&bytes[..copied]);
        stream.write_all(&buffer).map_err(From::from)
    }
}

/// Byte length of a preserved (base64) string once decoded, NUL-split and space-trimmed.
fn preserved_length(value: &str) -> Result<usize> {
    let bytes = BASE64.decode(value)?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(text.split('\0').next().unwrap_or_default().trim_matches(' ').len())
}

/// First four bytes of a group name, zero-padded. Catalog names are exactly
/// four bytes, but hand-edited dumps may not be.
fn fourcc_bytes(group: &str) -> [u8; 4] {
    let mut bytes = [0u8; 4];
    for (index, byte) in group.as_bytes().iter().take(4).enumerate() {
        bytes[index] = *byte;
    }

    bytes
}

fn append_to_end(stream: &mut Cursor<Vec<u8>>, bytes: &[u8]) -> Result<()> {
    let position = stream.position();
    stream.seek(SeekFrom::End(0))?;
    stream.write_all(bytes)?;
    stream.set_position(position);
    Ok(())
}
