//---------------------------------------------------------------------------//
// Copyright (c) 2025 The tagsmith contributors. All rights reserved.
//
// This file is part of the tagsmith project, a schema-driven codec and
// version migrator for game engine tag files.
//
// This file is licensed under the MIT license, which can be found here:
// https://opensource.org/licenses/MIT
//---------------------------------------------------------------------------//

//! Second-generation upgrade routines.
//!
//! Three patterns cover nearly everything here:
//!
//! - **Header promotion**: stamp a block/struct sidecar with the newest
//!   `(name, version, size)` triple, renaming or restructuring the fields the
//!   new layout expects.
//! - **Mapping-function re-encoding**: old files hold curve descriptions as
//!   `(type, flags, colors, samples)` structs at version 0; the new schema
//!   holds the same bytes as a block of signed chars. [`upgrade_function`]
//!   serializes the old fields through the struct's version-0 layout and
//!   emits them under the version-1 block.
//! - **Effect-function synthesis**: where the old format had no curve at all,
//!   a fixed header (type, flag, four zeroed color quads, four reals)
//!   is fabricated in the same signed-char form.

use crate::binary::{Endian, WriteBytes};
use crate::error::Result;
use crate::groups::FourCC;
use crate::schema::{FieldKind, FieldSet, Schema, StructDef};
use std::io::Write;
use crate::tags::{BlockFrame, BlockHeader, Element, TagFile, TagRef, TagValue};

use super::Migrator;

//---------------------------------------------------------------------------//
//                              Registry
//---------------------------------------------------------------------------//

/// This function returns the Gen2 upgrade routine for a tag group, if any.
pub(crate) fn migrator_for(fourcc: FourCC) -> Option<Migrator> {
    match &fourcc.bytes() {
        b"obje" => Some(object),
        b"devi" => Some(device),
        b"item" => Some(item),
        b"unit" => Some(unit),
        b"hlmt" => Some(model),
        b"bitm" => Some(bitmap),
        b"bipd" => Some(biped),
        b"vehi" => Some(vehicle),
        b"scen" => Some(scenery),
        b"bloc" => Some(crate_),
        b"crea" => Some(creature),
        b"weap" => Some(weapon),
        b"ligh" => Some(light),
        b"effe" => Some(effect),
        b"matg" => Some(globals),
        b"eqip" => Some(equipment),
        b"MGS2" => Some(light_volume),
        b"tdtl" => Some(liquid),
        b"proj" => Some(projectile),
        b"mach" => Some(device_machine),
        b"ctrl" => Some(device_control),
        b"lifi" => Some(device_light_fixture),
        b"lens" => Some(lens_flare),
        b"jpt!" => Some(damage_effect),
        b"ssce" => Some(sound_scenery),
        b"garb" => Some(garbage),
        b"char" => Some(character),
        b"bsdt" => Some(breakable_surface),
        b"gldf" => Some(chocolate_mountain),
        b"jmad" => Some(model_animation_graph),
        _ => None,
    }
}

//---------------------------------------------------------------------------//
//                              Shared machinery
//---------------------------------------------------------------------------//

/// Version stamp of an upgraded mapping function struct.
fn mapp_header() -> BlockHeader {
    BlockHeader::new(b"MAPP", 1, 12)
}

/// This function re-encodes a legacy mapping function into its version-1 form.
///
/// The struct's version-0 fields (colors, sample blocks, type and flag chars)
/// get serialized into a byte buffer, which then becomes the version-1
/// signed-char block, one `Value` child per byte.
fn upgrade_function(struct_def: &StructDef, element: &mut Element, file_endian: Endian) -> Result<()> {
    let (Some(field_set_0), Some(field_set_1)) = (struct_def.layout().by_version(0), struct_def.layout().by_version(1)) else {
        return Ok(());
    };

    let mut buffer: Vec<u8> = vec![];
    for field in field_set_0.fields() {
        let endian = field.effective_endian(file_endian);
        let key = field.name();

        match field.kind() {
            FieldKind::RgbColor => {
                let pad = element.pop_int(&format!("{key}_pad"), 0);
                let (red, green, blue) = match element.pop(key) {
                    Some(TagValue::Color { red, green, blue, .. }) => (red, green, blue),
                    _ => (0.0, 0.0, 0.0),
                };

                buffer.write_u8(blue as u8)?;
                buffer.write_u8(green as u8)?;
                buffer.write_u8(red as u8)?;
                buffer.write_u8(pad as u8)?;
            },
            FieldKind::Block(_) => {
                for child in element.take_block(key) {
                    let value = child.get("Value").and_then(TagValue::as_real).unwrap_or(0.0);
                    buffer.write_f32(value as f32, endian)?;
                }
            },
            FieldKind::CharInteger | FieldKind::ByteFlags => {
                let value = element.pop_int(key, 0);
                buffer.write_i8(value as i8)?;
            },
            _ => {},
        }
    }

    emit_function_block(field_set_1, element, &buffer);
    Ok(())
}

/// This function fabricates the fixed function header introduced at version 1
/// (type, flag, four zeroed color quads, four reals) and emits it in the
/// signed-char block form.
fn upgrade_effect_function(
    function_type: i64,
    function_1_value: i64,
    min_value: f64,
    element: &mut Element,
    struct_def: &StructDef,
    file_endian: Endian,
) -> Result<()> {
    let Some(field_set_1) = struct_def.layout().by_version(1) else {
        return Ok(());
    };

    let mut buffer: Vec<u8> = vec![];
    buffer.write_i8(function_type as i8)?;
    buffer.write_i8(0)?;
    buffer.write_i8(function_1_value as i8)?;
    buffer.write_i8(0)?;
    for _ in 0..4 {
        buffer.write_all(&[0, 0, 0, 0])?;
    }

    buffer.write_f32(min_value as f32, file_endian)?;
    for _ in 0..3 {
        buffer.write_f32(0.0, file_endian)?;
    }

    emit_function_block(field_set_1, element, &buffer);
    Ok(())
}

/// This function writes a function byte buffer as the version-1 block: one
/// `{Value}` child per byte, with fresh sidecars.
fn emit_function_block(field_set_1: &FieldSet, element: &mut Element, buffer: &[u8]) {
    for field in field_set_1.fields() {
        if let FieldKind::Block(_) = field.kind() {
            let key = field.name();
            let children = buffer.iter()
                .map(|byte| {
                    let mut child = Element::default();
                    child.set("Value", TagValue::Int(*byte as i8 as i64));
                    child
                })
                .collect();

            element.set(key, TagValue::Block(children));
            element.block_frames.insert(key.to_owned(), BlockFrame::default());
            element.block_headers.insert(key.to_owned(), BlockHeader::tbfd(0, 1));
        }
    }
}

/// This function promotes one struct-held mapping function to version 1, if
/// the element still carries it at version 0.
fn upgrade_struct_function(struct_def: &StructDef, element: &mut Element, file_endian: Endian) -> Result<()> {
    if element.struct_headers.get(struct_def.key()).map(|header| header.version) == Some(0) {
        element.struct_headers.insert(struct_def.key().to_owned(), mapp_header());
        upgrade_function(struct_def, element, file_endian)?;
    }

    Ok(())
}

/// Upgrade shared by every object-derived group: the `functions` block holds
/// one default mapping function per element.
fn upgrade_default_functions(
    schema: &Schema,
    tag: &mut TagFile,
    group_fourcc: &[u8; 4],
    file_endian: Endian,
    check_name: bool,
) -> Result<()> {
    let Some(group) = schema.group(FourCC::new(group_fourcc)) else {
        return Ok(());
    };

    let Some(struct_def) = group.find_struct("StructHeader_default function") else {
        return Ok(());
    };

    if let Some(functions) = tag.data_mut().block_mut("functions") {
        for function_element in functions.iter_mut() {
            let promote = match function_element.struct_headers.get(struct_def.key()) {
                Some(header) => header.version == 0 && (!check_name || header.name == FourCC::new(b"MAPP")),
                None => false,
            };

            if promote {
                function_element.struct_headers.insert(struct_def.key().to_owned(), mapp_header());
                upgrade_function(struct_def, function_element, file_endian)?;
            }
        }
    }

    Ok(())
}

//---------------------------------------------------------------------------//
//                              Object family
//---------------------------------------------------------------------------//

fn object(schema: &Schema, tag: &mut TagFile, endian: Endian) -> Result<()> {
    upgrade_default_functions(schema, tag, b"obje", endian, false)
}

fn device(schema: &Schema, tag: &mut TagFile, endian: Endian) -> Result<()> {
    upgrade_default_functions(schema, tag, b"devi", endian, false)
}

fn item(schema: &Schema, tag: &mut TagFile, endian: Endian) -> Result<()> {
    upgrade_default_functions(schema, tag, b"item", endian, true)
}

fn unit(schema: &Schema, tag: &mut TagFile, endian: Endian) -> Result<()> {
    upgrade_default_functions(schema, tag, b"unit", endian, false)
}

fn vehicle(schema: &Schema, tag: &mut TagFile, endian: Endian) -> Result<()> {
    upgrade_default_functions(schema, tag, b"vehi", endian, false)
}

fn scenery(schema: &Schema, tag: &mut TagFile, endian: Endian) -> Result<()> {
    upgrade_default_functions(schema, tag, b"scen", endian, false)
}

fn weapon(schema: &Schema, tag: &mut TagFile, endian: Endian) -> Result<()> {
    upgrade_default_functions(schema, tag, b"weap", endian, false)
}

fn projectile(schema: &Schema, tag: &mut TagFile, endian: Endian) -> Result<()> {
    upgrade_default_functions(schema, tag, b"proj", endian, false)
}

fn sound_scenery(schema: &Schema, tag: &mut TagFile, endian: Endian) -> Result<()> {
    upgrade_default_functions(schema, tag, b"ssce", endian, false)
}

fn equipment(schema: &Schema, tag: &mut TagFile, endian: Endian) -> Result<()> {
    upgrade_default_functions(schema, tag, b"eqip", endian, false)
}

fn garbage(schema: &Schema, tag: &mut TagFile, endian: Endian) -> Result<()> {
    upgrade_default_functions(schema, tag, b"garb", endian, false)
}

fn crate_(schema: &Schema, tag: &mut TagFile, endian: Endian) -> Result<()> {
    upgrade_default_functions(schema, tag, b"bloc", endian, false)
}

fn creature(schema: &Schema, tag: &mut TagFile, endian: Endian) -> Result<()> {
    upgrade_default_functions(schema, tag, b"crea", endian, false)
}

fn device_machine(schema: &Schema, tag: &mut TagFile, endian: Endian) -> Result<()> {
    upgrade_default_functions(schema, tag, b"mach", endian, false)
}

fn device_control(schema: &Schema, tag: &mut TagFile, endian: Endian) -> Result<()> {
    upgrade_default_functions(schema, tag, b"ctrl", endian, false)
}

fn device_light_fixture(schema: &Schema, tag: &mut TagFile, endian: Endian) -> Result<()> {
    upgrade_default_functions(schema, tag, b"lifi", endian, false)
}

//---------------------------------------------------------------------------//
//                              Biped
//---------------------------------------------------------------------------//

fn biped(schema: &Schema, tag: &mut TagFile, endian: Endian) -> Result<()> {
    if tag.block_header().as_ref().map(|header| header.version) == Some(0) {
        let root = tag.data_mut();

        let flags = root.pop("Skip").unwrap_or(TagValue::Int(0));
        root.set("flags_2", flags);

        for (old_key, new_key) in [
            ("standing collision height", "height standing"),
            ("crouching collision height", "height crouching"),
            ("collision radius", "radius"),
            ("collision mass", "mass"),
        ] {
            let value = root.pop(old_key).unwrap_or(TagValue::Real(0.0));
            root.set(new_key, value);
        }

        let living = root.pop_string("collision global material name", "");
        root.set("living material name", TagValue::Str(living));

        let dead = root.pop_string("dead collision global material name", "");
        root.set("dead material name", TagValue::Str(dead));

        root.struct_headers.insert("ground physics".to_owned(), BlockHeader::new(b"chgr", 0, 48));
        root.struct_headers.insert("flying physics".to_owned(), BlockHeader::new(b"chfl", 0, 44));
    }

    tag.set_block_header(Some(BlockHeader::tbfd(1, 988)));

    upgrade_default_functions(schema, tag, b"bipd", endian, false)?;

    let root = tag.data_mut();
    let seats_version = root.block_headers.get("seats").map(|header| header.version);
    if root.block("seats").is_some() && seats_version.is_some() && seats_version != Some(3) {
        if let Some(seats) = root.block_mut("seats") {
            for seat in seats.iter_mut() {
                if seats_version == Some(0) {
                    let yaw = seat.pop_real("yaw rate", 0.0);
                    seat.set("yaw rate bounds", TagValue::Bounds { min: yaw, max: yaw });

                    let pitch = seat.pop_real("pitch rate", 0.0);
                    seat.set("pitch rate bounds", TagValue::Bounds { min: pitch, max: pitch });
                }

                let acceleration = seat.pop("acceleration scale").unwrap_or(TagValue::Reals(vec![0.0; 3]));
                seat.set("acceleration range", acceleration);
                seat.struct_headers.insert("acceleration".to_owned(), BlockHeader::new(b"usas", 0, 20));
            }
        }

        root.block_headers.insert("seats".to_owned(), BlockHeader::tbfd(3, 192));
    }

    Ok(())
}

//---------------------------------------------------------------------------//
//                              Bitmap
//---------------------------------------------------------------------------//

fn bitmap(_schema: &Schema, tag: &mut TagFile, endian: Endian) -> Result<()> {
    let root = tag.data_mut();

    let header_version = root.block_headers.get("bitmaps").map(|header| header.version);
    if root.block("bitmaps").is_some() && header_version.is_some() {
        if header_version != Some(2) {
            let pixel_data_len = match root.get("processed pixel data") {
                Some(TagValue::Data(blob)) => blob.bytes.len() as i32,
                _ => 0,
            };

            let mut length_run = vec![];
            length_run.write_i32(pixel_data_len, endian)?;
            length_run.extend_from_slice(&[0; 8]);

            if let Some(bitmaps) = root.block_mut("bitmaps") {
                for bitmap_element in bitmaps.iter_mut() {

                    // The real contents of these runs are unknown; files
                    // already at version 2 keep whatever they decoded.
                    bitmap_element.set("Skip_0", TagValue::Bytes(vec![0; 4]));
                    bitmap_element.set("Skip_1", TagValue::Bytes(vec![0; 12]));
                    bitmap_element.set("Skip_2", TagValue::Bytes(vec![0xFF; 12]));
                    bitmap_element.set("Skip_3", TagValue::Bytes(length_run.clone()));
                    bitmap_element.set("Skip_4", TagValue::Bytes(vec![0; 4]));
                    bitmap_element.set("Skip_5", TagValue::Bytes(vec![0; 20]));

                    for index in 0..7 {
                        bitmap_element.set(&format!("Ptr_{index}"), TagValue::Bytes(vec![0; 4]));
                    }
                }
            }
        }

        root.block_headers.insert("bitmaps".to_owned(), BlockHeader::tbfd(2, 140));
    }

    Ok(())
}

//---------------------------------------------------------------------------//
//                              Breakable surface
//---------------------------------------------------------------------------//

fn breakable_surface(schema: &Schema, tag: &mut TagFile, endian: Endian) -> Result<()> {
    let Some(group) = schema.group(FourCC::new(b"bsdt")) else {
        return Ok(());
    };

    let mapping_defs: Vec<&StructDef> = [
        "StructHeader_Mapping", "StructHeader_Mapping_1", "StructHeader_Mapping_2",
        "StructHeader_Mapping_3", "StructHeader_Mapping_4", "StructHeader_Mapping_5",
        "StructHeader_Mapping_6", "StructHeader_Mapping_7", "StructHeader_Mapping_8",
    ].iter().filter_map(|name| group.find_struct(name)).collect();

    if let Some(particle_effects) = tag.data_mut().block_mut("particle effects") {
        for particle_effect in particle_effects.iter_mut() {
            if let Some(emitters) = particle_effect.block_mut("emitters") {
                for emitter in emitters.iter_mut() {
                    for mapping_def in &mapping_defs {
                        upgrade_struct_function(mapping_def, emitter, endian)?;
                    }
                }
            }
        }
    }

    Ok(())
}

//---------------------------------------------------------------------------//
//                              Character
//---------------------------------------------------------------------------//

fn character(_schema: &Schema, tag: &mut TagFile, _endian: Endian) -> Result<()> {
    if let Some(version) = tag.block_header().as_ref().map(|header| header.version) {
        let root = tag.data_mut();

        if version == 0 {
            root.rename("Look properties", "look properties");
            root.rename("Movement properties", "movement properties");
            root.rename("Engage properties", "engage properties");
            root.rename("Evasion properties", "evasion properties");
            root.rename("Cover properties", "cover properties");
        }

        if version != 2 {
            let variant_name = root.pop_string("model variant", "");

            root.block_frames.entry("variants".to_owned()).or_default();
            root.block_headers.entry("variants".to_owned()).or_insert(BlockHeader::tbfd(0, 12));
            if root.block("variants").is_none() {
                root.set("variants", TagValue::Block(vec![]));
            }

            let mut variant = Element::default();
            variant.set("variant name", TagValue::Str(variant_name));
            variant.set("variant index", TagValue::Int(-1));
            variant.set("variant designator", TagValue::Str(String::new()));

            if let Some(variants) = root.block_mut("variants") {
                variants.push(variant);
            }
        }
    }

    tag.set_block_header(Some(BlockHeader::tbfd(2, 408)));

    let root = tag.data_mut();

    let presearch_version = root.block_headers.get("pre-search properties").map(|header| header.version);
    if root.block("pre-search properties").is_some() && presearch_version.is_some() && presearch_version != Some(1) {
        root.block_headers.insert("pre-search properties".to_owned(), BlockHeader::tbfd(1, 36));
        if let Some(presearch) = root.block_mut("pre-search properties") {
            for presearch_element in presearch.iter_mut() {
                let (old_min, old_max) = presearch_element.pop_bounds("Min/Max pre-search bounds", (0.0, 0.0));
                presearch_element.set("min presearch time", TagValue::Bounds { min: old_min, max: old_min });
                presearch_element.set("max presearch time", TagValue::Bounds { min: old_max, max: old_max });
                presearch_element.set("min suppressing time", TagValue::Bounds { min: 2.0, max: 3.0 });
            }
        }
    }

    let weapons_version = root.block_headers.get("weapons properties").map(|header| header.version);
    if root.block("weapons properties").is_some() && weapons_version.is_some() && weapons_version != Some(1) {
        root.block_headers.insert("weapons properties".to_owned(), BlockHeader::tbfd(1, 224));
        if let Some(weapons) = root.block_mut("weapons properties") {
            for weapon_element in weapons.iter_mut() {
                let maximum_firing = weapon_element.pop("maximum firing distance").unwrap_or(TagValue::Real(0.0));
                weapon_element.set("maximum firing range", maximum_firing);

                let rate_of_fire = weapon_element.pop_real("rate of fire", 0.0);
                let projectile_error = weapon_element.pop_real("projectile error", 0.0);
                let desired_combat_range = weapon_element.pop_bounds("desired combat range", (0.0, 0.0));
                let target_tracking = weapon_element.pop_real("target tracking", 0.0);
                let target_leading = weapon_element.pop_real("target leading", 0.0);
                let weapon_damage_modifier = weapon_element.pop_real("weapon damage modifier", 0.0);
                let burst_origin_radius = weapon_element.pop_real("burst origin radius", 0.0);
                let burst_origin_angle = weapon_element.pop_real("burst origin angle", 0.0);
                let burst_return_length = weapon_element.pop_bounds("burst return length", (0.0, 0.0));
                let burst_return_angle = weapon_element.pop_real("burst return angle", 0.0);
                let burst_duration = weapon_element.pop_bounds("burst duration", (0.0, 0.0));
                let burst_separation = weapon_element.pop_bounds("burst separation", (0.0, 0.0));
                let burst_angular_velocity = weapon_element.pop_real("burst angular velocity", 0.0);

                for range_key in ["normal combat range", "timid combat range", "aggressive combat range"] {
                    weapon_element.set(range_key, TagValue::Bounds { min: desired_combat_range.0, max: desired_combat_range.1 });
                }

                weapon_element.block_frames.entry("firing patterns".to_owned()).or_default();
                weapon_element.block_headers.entry("firing patterns".to_owned()).or_insert(BlockHeader::tbfd(0, 64));
                if weapon_element.block("firing patterns").is_none() {
                    weapon_element.set("firing patterns", TagValue::Block(vec![]));
                }

                let mut firing_pattern = Element::default();
                firing_pattern.set("rate of fire", TagValue::Real(rate_of_fire));
                firing_pattern.set("target tracking", TagValue::Real(target_tracking));
                firing_pattern.set("target leading", TagValue::Real(target_leading));
                firing_pattern.set("burst origin radius", TagValue::Real(burst_origin_radius));
                firing_pattern.set("burst origin angle", TagValue::Real(burst_origin_angle));
                firing_pattern.set("burst return length", TagValue::Bounds { min: burst_return_length.0, max: burst_return_length.1 });
                firing_pattern.set("burst return angle", TagValue::Real(burst_return_angle));
                firing_pattern.set("burst duration", TagValue::Bounds { min: burst_duration.0, max: burst_duration.1 });
                firing_pattern.set("burst separation", TagValue::Bounds { min: burst_separation.0, max: burst_separation.1 });
                firing_pattern.set("weapon damage modifier", TagValue::Real(weapon_damage_modifier));
                firing_pattern.set("projectile error", TagValue::Real(projectile_error));
                firing_pattern.set("burst angular velocity", TagValue::Real(burst_angular_velocity));
                firing_pattern.set("maximum error angle", TagValue::Real(90f64.to_radians()));

                if let Some(firing_patterns) = weapon_element.block_mut("firing patterns") {
                    firing_patterns.push(firing_pattern);
                }
            }
        }
    }

    let charge_version = root.block_headers.get("charge properties").map(|header| header.version);
    if root.block("charge properties").is_some() && charge_version.is_some() && charge_version != Some(3) {
        root.block_headers.insert("charge properties".to_owned(), BlockHeader::tbfd(3, 72));
        if let Some(charges) = root.block_mut("charge properties") {
            for charge_element in charges.iter_mut() {
                charge_element.set("melee_chance", TagValue::Int(1));

                if charge_version.is_some_and(|version| version <= 1) {
                    let melee_leap_velocity = charge_element.pop_real("melee leap velocity", 0.0);
                    charge_element.set("ideal leap velocity", TagValue::Real(melee_leap_velocity));
                    charge_element.set("max leap velocity", TagValue::Real(melee_leap_velocity));
                }
            }
        }
    }

    Ok(())
}

//---------------------------------------------------------------------------//
//                              Chocolate mountain
//---------------------------------------------------------------------------//

fn chocolate_mountain(schema: &Schema, tag: &mut TagFile, endian: Endian) -> Result<()> {
    let Some(group) = schema.group(FourCC::new(b"gldf")) else {
        return Ok(());
    };

    let function_defs: Vec<&StructDef> = [
        "StructHeader_function", "StructHeader_function_1", "StructHeader_function_2",
        "StructHeader_function 1",
    ].iter().filter_map(|name| group.find_struct(name)).collect();

    if let Some(lighting_variables) = tag.data_mut().block_mut("lighting variables") {
        for lighting_element in lighting_variables.iter_mut() {
            for function_def in &function_defs {
                upgrade_struct_function(function_def, lighting_element, endian)?;
            }
        }
    }

    Ok(())
}

//---------------------------------------------------------------------------//
//                              Damage effect
//---------------------------------------------------------------------------//

fn damage_effect(schema: &Schema, tag: &mut TagFile, endian: Endian) -> Result<()> {
    let Some(group) = schema.group(FourCC::new(b"jpt!")) else {
        return Ok(());
    };

    if tag.block_header().as_ref().map(|header| header.version) != Some(0) {
        return Ok(());
    }

    tag.set_block_header(Some(BlockHeader::tbfd(1, 212)));

    let root = tag.data_mut();

    root.block_frames.entry("player responses".to_owned()).or_default();
    root.block_headers.entry("player responses".to_owned()).or_insert(BlockHeader::tbfd(0, 88));
    if root.block("player responses").is_none() {
        root.set("player responses", TagValue::Block(vec![]));
    }

    let mut response = Element::default();
    response.set("response type", TagValue::Enum { kind: "ShortEnum".to_owned(), value: 2 });

    for (new_key, old_key, default) in [
        ("type", "type", TagValue::Int(0)),
        ("priority", "priority", TagValue::Int(0)),
        ("duration", "duration", TagValue::Real(0.0)),
        ("fade function", "fade function", TagValue::Int(0)),
        ("maximum intensity", "maximum intensity", TagValue::Real(0.0)),
        ("color", "color", TagValue::Real(0.0)),
        ("duration_2", "duration_1", TagValue::Real(0.0)),
        ("duration_3", "duration_2", TagValue::Real(0.0)),
    ] {
        let value = root.pop(old_key).unwrap_or(default);
        response.set(new_key, value);
    }

    for data_key in ["data", "data_1", "data_2"] {
        response.block_frames.insert(data_key.to_owned(), BlockFrame::default());
        response.block_headers.insert(data_key.to_owned(), BlockHeader::tbfd(0, 1));
        response.set(data_key, TagValue::Block(vec![]));
    }

    response.set("effect name", TagValue::Str(String::new()));
    response.set("duration_1", TagValue::Real(0.0));

    for (new_key, old_key) in [
        ("rider direct damage scale", "Real"),
        ("rider maximum transfer damage scale", "Real_1"),
        ("rider minimum transfer damage scale", "Real_2"),
    ] {
        let value = root.pop(old_key).unwrap_or(TagValue::Real(0.0));
        root.set(new_key, value);
    }

    let duration = root.pop("duration_3").unwrap_or(TagValue::Real(0.0));
    root.set("duration", duration);

    let fade_function = root.pop("fade function_3").unwrap_or(TagValue::Int(0));
    root.set("fade function", fade_function);

    let duration_1 = root.pop("duration_4").unwrap_or(TagValue::Real(0.0));
    root.set("duration_1", duration_1);

    let vibration_value = root.pop("fade function_1").and_then(|value| value.as_int()).unwrap_or(0);
    let vibration_frequency = root.pop_real("frequency", 0.0);
    if let Some(vibration_def) = group.find_struct("StructHeader_dirty whore") {
        upgrade_effect_function(2, vibration_value, vibration_frequency, &mut response, vibration_def, endian)?;
    }

    let frequency_value = root.pop("fade function_2").and_then(|value| value.as_int()).unwrap_or(0);
    let frequency_min = root.pop_real("frequency_1", 0.0);
    if let Some(frequency_def) = group.find_struct("StructHeader_dirty whore_1") {
        upgrade_effect_function(2, frequency_value, frequency_min, &mut response, frequency_def, endian)?;
    }

    if let Some(scale_def) = group.find_struct("StructHeader_effect scale function") {
        upgrade_effect_function(0, 0, 0.0, &mut response, scale_def, endian)?;
    }

    if let Some(responses) = root.block_mut("player responses") {
        responses.push(response);
    }

    Ok(())
}

//---------------------------------------------------------------------------//
//                              Effect
//---------------------------------------------------------------------------//

fn effect(schema: &Schema, tag: &mut TagFile, endian: Endian) -> Result<()> {
    let Some(group) = schema.group(FourCC::new(b"effe")) else {
        return Ok(());
    };

    let beam_defs: Vec<&StructDef> = [
        "StructHeader_function", "StructHeader_function_1", "StructHeader_function_2",
        "StructHeader_function_3", "StructHeader_function_4", "StructHeader_function_5",
    ].iter().filter_map(|name| group.find_struct(name)).collect();

    let mapping_defs: Vec<&StructDef> = [
        "StructHeader_Mapping", "StructHeader_Mapping_1", "StructHeader_Mapping_2",
        "StructHeader_Mapping_3", "StructHeader_Mapping_4", "StructHeader_Mapping_5",
        "StructHeader_Mapping_6", "StructHeader_Mapping_7", "StructHeader_Mapping_8",
    ].iter().filter_map(|name| group.find_struct(name)).collect();

    if let Some(events) = tag.data_mut().block_mut("events") {
        for event_element in events.iter_mut() {
            if let Some(beams) = event_element.block_mut("beams") {
                for beam_element in beams.iter_mut() {
                    for beam_def in &beam_defs {
                        upgrade_struct_function(beam_def, beam_element, endian)?;
                    }
                }
            }

            if let Some(particle_systems) = event_element.block_mut("particle systems") {
                for particle_system in particle_systems.iter_mut() {
                    if let Some(emitters) = particle_system.block_mut("emitters") {
                        for emitter in emitters.iter_mut() {
                            for mapping_def in &mapping_defs {
                                upgrade_struct_function(mapping_def, emitter, endian)?;
                            }
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

//---------------------------------------------------------------------------//
//                              Globals
//---------------------------------------------------------------------------//

fn globals(_schema: &Schema, tag: &mut TagFile, _endian: Endian) -> Result<()> {
    let root = tag.data_mut();

    let header_version = root.block_headers.get("sound globals").map(|header| header.version);
    if root.block("sound globals").is_some() && header_version.is_some() {
        if let Some(sound_globals) = root.block_mut("sound globals") {
            for sound_globals_element in sound_globals.iter_mut() {
                if header_version == Some(0) {
                    sound_globals_element.set("legacy sound classes", TagValue::TagRef(TagRef {
                        group: Some("snmx".to_owned()),
                        unk1: 0,
                        length: 15,
                        unk2: -1,
                        path: "sound\\sound_mix".to_owned(),
                    }));
                } else {
                    sound_globals_element.rename("sound classes", "legacy sound classes");
                }
            }
        }

        root.block_headers.insert("sound globals".to_owned(), BlockHeader::tbfd(2, 84));
    }

    Ok(())
}

//---------------------------------------------------------------------------//
//                              Lens flare
//---------------------------------------------------------------------------//

fn lens_flare(schema: &Schema, tag: &mut TagFile, endian: Endian) -> Result<()> {
    let Some(group) = schema.group(FourCC::new(b"lens")) else {
        return Ok(());
    };

    for block_key in ["brightness", "color", "rotation"] {
        let Some(function_def) = group.find_struct_in_block(block_key, "StructHeader_function_1") else {
            continue;
        };

        if let Some(elements) = tag.data_mut().block_mut(block_key) {
            for element in elements.iter_mut() {
                upgrade_struct_function(function_def, element, endian)?;
            }
        }
    }

    Ok(())
}

//---------------------------------------------------------------------------//
//                              Light
//---------------------------------------------------------------------------//

fn light(schema: &Schema, tag: &mut TagFile, endian: Endian) -> Result<()> {
    let Some(group) = schema.group(FourCC::new(b"ligh")) else {
        return Ok(());
    };

    for block_key in ["brightness animation", "color animation"] {
        let Some(function_def) = group.find_struct_in_block(block_key, "StructHeader_function") else {
            continue;
        };

        if let Some(elements) = tag.data_mut().block_mut(block_key) {
            for element in elements.iter_mut() {
                upgrade_struct_function(function_def, element, endian)?;
            }
        }
    }

    let gel_defs: Vec<&StructDef> = ["StructHeader_dx", "StructHeader_dy"].iter()
        .filter_map(|name| group.find_struct_in_block("gel animation", name))
        .collect();

    if let Some(gel_animations) = tag.data_mut().block_mut("gel animation") {
        for gel_element in gel_animations.iter_mut() {
            for gel_def in &gel_defs {
                upgrade_struct_function(gel_def, gel_element, endian)?;
            }
        }
    }

    Ok(())
}

//---------------------------------------------------------------------------//
//                              Light volume
//---------------------------------------------------------------------------//

fn light_volume(schema: &Schema, tag: &mut TagFile, endian: Endian) -> Result<()> {
    let Some(group) = schema.group(FourCC::new(b"MGS2")) else {
        return Ok(());
    };

    let volume_defs: Vec<&StructDef> = [
        "StructHeader_function", "StructHeader_function_1", "StructHeader_function_2",
        "StructHeader_function_3", "StructHeader_function_4",
    ].iter().filter_map(|name| group.find_struct_in_block("volumes", name)).collect();

    let aspect_defs: Vec<&StructDef> = ["StructHeader_function", "StructHeader_function_1"].iter()
        .filter_map(|name| {
            group.find_block("volumes")
                .and_then(|volumes| volumes.layout().find_block("aspect"))
                .and_then(|aspect| aspect.layout().find_struct(name))
        })
        .collect();

    if let Some(volumes) = tag.data_mut().block_mut("volumes") {
        for volume_element in volumes.iter_mut() {
            for volume_def in &volume_defs {
                upgrade_struct_function(volume_def, volume_element, endian)?;
            }

            if let Some(aspects) = volume_element.block_mut("aspect") {
                for aspect_element in aspects.iter_mut() {
                    for aspect_def in &aspect_defs {
                        upgrade_struct_function(aspect_def, aspect_element, endian)?;
                    }
                }
            }
        }
    }

    Ok(())
}

//---------------------------------------------------------------------------//
//                              Liquid
//---------------------------------------------------------------------------//

fn liquid(schema: &Schema, tag: &mut TagFile, endian: Endian) -> Result<()> {
    let Some(group) = schema.group(FourCC::new(b"tdtl")) else {
        return Ok(());
    };

    let arc_defs: Vec<&StructDef> = [
        "StructHeader_function", "StructHeader_function_1", "StructHeader_function_2",
        "StructHeader_function_3", "StructHeader_function_4",
    ].iter().filter_map(|name| group.find_struct_in_block("arcs", name)).collect();

    let core_defs: Vec<&StructDef> = [
        "StructHeader_function", "StructHeader_function_1", "StructHeader_function_2",
        "StructHeader_function_3", "StructHeader_function_4",
    ].iter().filter_map(|name| {
        group.find_block("arcs")
            .and_then(|arcs| arcs.layout().find_block("cores"))
            .and_then(|cores| cores.layout().find_struct(name))
    }).collect();

    if let Some(arcs) = tag.data_mut().block_mut("arcs") {
        for arc_element in arcs.iter_mut() {
            for arc_def in &arc_defs {
                upgrade_struct_function(arc_def, arc_element, endian)?;
            }

            if let Some(cores) = arc_element.block_mut("cores") {
                for core_element in cores.iter_mut() {
                    for core_def in &core_defs {
                        upgrade_struct_function(core_def, core_element, endian)?;
                    }
                }
            }
        }
    }

    Ok(())
}

//---------------------------------------------------------------------------//
//                              Model
//---------------------------------------------------------------------------//

fn model(_schema: &Schema, tag: &mut TagFile, _endian: Endian) -> Result<()> {
    if tag.block_header().as_ref().map(|header| header.version) == Some(0) {
        tag.set_block_header(Some(BlockHeader::tbfd(1, 348)));

        let root = tag.data_mut();
        let physics_model = root.pop("physics model").unwrap_or(TagValue::TagRef(TagRef {
            group: None,
            unk1: 0,
            length: 0,
            unk2: -1,
            path: String::new(),
        }));

        root.set("physics_model", physics_model);

        let max_draw_distance = root.pop_real("max draw distance", 0.0);
        root.set("disappear distance", TagValue::Real(max_draw_distance));
        root.set("begin fade distance", TagValue::Real(max_draw_distance));
    }

    Ok(())
}

//---------------------------------------------------------------------------//
//                              Model animation graph
//---------------------------------------------------------------------------//

fn model_animation_graph(_schema: &Schema, tag: &mut TagFile, _endian: Endian) -> Result<()> {
    let root = tag.data_mut();

    if root.struct_headers.get("resources").map(|header| header.version) == Some(0) {
        root.struct_headers.insert("resources".to_owned(), BlockHeader::new(b"MAgr", 2, 80));
        root.rename("animation graph flags", "private flags");
    }

    let nodes_key = "skeleton nodes|ABCDCC";
    if root.block(nodes_key).is_some() && root.block_headers.get(nodes_key).map(|header| header.version) == Some(0) {
        root.block_headers.insert(nodes_key.to_owned(), BlockHeader::tbfd(1, 32));
        if let Some(nodes) = root.block_mut(nodes_key) {
            for node_element in nodes.iter_mut() {
                node_element.rename("Node joint flags", "node joint flags");
            }
        }
    }

    let animations_key = "animations|ABCDCC";
    let animations_version = root.block_headers.get(animations_key).map(|header| header.version);
    if root.block(animations_key).is_some() && animations_version.is_some() {
        let version = animations_version.unwrap_or_default();
        if let Some(animations) = root.block_mut(animations_key) {
            for animation_element in animations.iter_mut() {
                if version == 0 {
                    for (new_key, old_key, default) in [
                        ("Data", "animation data", TagValue::Int(0)),
                        ("ShortBlockIndex_1", "next animation", TagValue::Int(-1)),
                        ("CharInteger", "static node flag data size", TagValue::Int(0)),
                        ("CharInteger_1", "animated node flag data size", TagValue::Int(0)),
                        ("ShortInteger", "movement_data size", TagValue::Int(0)),
                        ("ShortInteger_2", "default_data size", TagValue::Int(0)),
                        ("LongInteger", "uncompressed_data size", TagValue::Int(0)),
                        ("LongInteger_1", "compressed_data size", TagValue::Int(0)),
                    ] {
                        let value = animation_element.pop(old_key).unwrap_or(default);
                        animation_element.set(new_key, value);
                    }

                    animation_element.struct_headers.insert("Struct".to_owned(), BlockHeader::new(b"apds", 0, 16));
                } else if (1..=4).contains(&version) {
                    for (new_key, old_key, default) in [
                        ("Data", "animation data", TagValue::Int(0)),
                        ("ShortBlockIndex", "parent animation", TagValue::Int(-1)),
                        ("ShortBlockIndex_1", "next animation", TagValue::Int(-1)),
                    ] {
                        let value = animation_element.pop(old_key).unwrap_or(default);
                        animation_element.set(new_key, value);
                    }

                    let data_sizes = animation_element.struct_headers.remove("data sizes")
                        .unwrap_or(BlockHeader::new(b"apds", 0, 16));
                    animation_element.struct_headers.insert("Struct".to_owned(), data_sizes);

                    if version == 3 {
                        for (new_key, old_key) in [
                            ("ShortInteger", "ShortInteger_3"),
                            ("ShortInteger_1", "ShortInteger_4"),
                            ("ShortInteger_2", "ShortInteger_5"),
                            ("LongInteger", "LongInteger_1"),
                            ("LongInteger_1", "LongInteger_2"),
                        ] {
                            let value = animation_element.pop(old_key).unwrap_or(TagValue::Int(0));
                            animation_element.set(new_key, value);
                        }
                    }
                }
            }
        }

        root.block_headers.insert(animations_key.to_owned(), BlockHeader::tbfd(5, 124));
    }

    Ok(())
}
