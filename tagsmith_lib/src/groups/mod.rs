//---------------------------------------------------------------------------//
// Copyright (c) 2025 The tagsmith contributors. All rights reserved.
//
// This file is part of the tagsmith project, a schema-driven codec and
// version migrator for game engine tag files.
//
// This file is licensed under the MIT license, which can be found here:
// https://opensource.org/licenses/MIT
//---------------------------------------------------------------------------//

//! Module with the tag group catalogs and the engine revision table.
//!
//! Every tag file names its group and its engine revision with a fourcc in the
//! 64-byte header. The catalogs here map those fourccs to the human-readable
//! group names (which double as the file extensions of loose tags), one catalog
//! per engine generation. They have to match the engine bit-exact, down to the
//! trailing spaces and the asterisk wildcards of the resource-only groups.

use bitflags::bitflags;
use lazy_static::lazy_static;
use serde::de::{self, Deserializer, Visitor};
use serde::ser::Serializer;
use serde_derive::{Deserialize, Serialize};

use std::collections::BTreeMap;
use std::fmt;

//---------------------------------------------------------------------------//
//                              Enums & Structs
//---------------------------------------------------------------------------//

/// A 4-byte, order-sensitive identifier. Used for tag groups, engine revisions
/// and block/struct framing records.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct FourCC(pub [u8; 4]);

/// The two engine generations the codec understands. They select the
/// definition front-end and the tag group catalog.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Generation {
    Gen1,
    Gen2,
}

/// The five engine revisions a tag file can declare in its header.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EngineTag {
    Gen1,
    Gen2V1,
    Gen2V2,
    Gen2V3,
    Gen2V4,
}

bitflags! {

    /// Legacy behaviours of the older engine revisions.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct LegacyTraits: u8 {

        /// Block/struct framing records use the short 12-byte form.
        const HEADER = 0b0000_0001;

        /// Interned strings are stored as 32-byte inline strings instead.
        const STRINGS = 0b0000_0010;

        /// `UselessPad` runs actually occupy their declared bytes.
        const PADDING = 0b0000_0100;
    }
}

//---------------------------------------------------------------------------//
//                       Implementation of FourCC
//---------------------------------------------------------------------------//

impl FourCC {

    /// This function builds a FourCC from a 4-byte literal.
    pub const fn new(bytes: &[u8; 4]) -> Self {
        Self(*bytes)
    }

    /// This function builds a FourCC from a string, as long as it's exactly 4 bytes long.
    pub fn from_str(value: &str) -> Option<Self> {
        let bytes = value.as_bytes();
        if bytes.len() != 4 {
            return None;
        }

        Some(Self([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// This function returns the raw bytes of the FourCC, in canonical forward order.
    pub fn bytes(self) -> [u8; 4] {
        self.0
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "FourCC({self})")
    }
}

impl serde::Serialize for FourCC {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for FourCC {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FourCCVisitor;

        impl Visitor<'_> for FourCCVisitor {
            type Value = FourCC;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a 4-byte fourcc string")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<FourCC, E> {
                FourCC::from_str(value).ok_or_else(|| E::custom(format!("invalid fourcc: {value}")))
            }
        }

        deserializer.deserialize_str(FourCCVisitor)
    }
}

//---------------------------------------------------------------------------//
//                       Implementation of EngineTag
//---------------------------------------------------------------------------//

impl EngineTag {

    /// The newest engine revision, and the one migrated tags are written for.
    pub const LATEST: Self = Self::Gen2V4;

    /// This function returns the fourcc this revision stamps into tag headers.
    pub fn fourcc(self) -> FourCC {
        match self {
            Self::Gen1 => FourCC::new(b"blam"),
            Self::Gen2V1 => FourCC::new(b"ambl"),
            Self::Gen2V2 => FourCC::new(b"LAMB"),
            Self::Gen2V3 => FourCC::new(b"MLAB"),
            Self::Gen2V4 => FourCC::new(b"BLM!"),
        }
    }

    /// This function identifies the engine revision behind a header fourcc.
    pub fn from_fourcc(fourcc: FourCC) -> Option<Self> {
        match &fourcc.bytes() {
            b"blam" => Some(Self::Gen1),
            b"ambl" => Some(Self::Gen2V1),
            b"LAMB" => Some(Self::Gen2V2),
            b"MLAB" => Some(Self::Gen2V3),
            b"BLM!" => Some(Self::Gen2V4),
            _ => None,
        }
    }

    /// This function returns the generation this revision belongs to.
    pub fn generation(self) -> Generation {
        match self {
            Self::Gen1 => Generation::Gen1,
            _ => Generation::Gen2,
        }
    }

    /// This function returns the legacy behaviours of this revision.
    pub fn legacy(self) -> LegacyTraits {
        match self {
            Self::Gen1 | Self::Gen2V1 => LegacyTraits::HEADER | LegacyTraits::STRINGS | LegacyTraits::PADDING,
            Self::Gen2V2 => LegacyTraits::STRINGS | LegacyTraits::PADDING,
            Self::Gen2V3 => LegacyTraits::PADDING,
            Self::Gen2V4 => LegacyTraits::empty(),
        }
    }

    /// Shortcut to check if this is the first-generation engine, which frames
    /// blocks and structs without any header record.
    pub fn is_gen1(self) -> bool {
        self == Self::Gen1
    }
}

impl Generation {

    /// This function returns the fourcc -> group name catalog of this generation.
    pub fn groups(self) -> &'static BTreeMap<FourCC, &'static str> {
        match self {
            Self::Gen1 => &GEN1_GROUPS,
            Self::Gen2 => &GEN2_GROUPS,
        }
    }

    /// This function returns the group name -> fourcc catalog of this generation.
    pub fn extensions(self) -> &'static BTreeMap<&'static str, FourCC> {
        match self {
            Self::Gen1 => &GEN1_EXTENSIONS,
            Self::Gen2 => &GEN2_EXTENSIONS,
        }
    }

    /// This function returns the group name behind a fourcc, if the fourcc is in this generation's catalog.
    pub fn group_name(self, fourcc: FourCC) -> Option<&'static str> {
        self.groups().get(&fourcc).copied()
    }

    /// This function returns the fourcc behind a group name, if the name is in this generation's catalog.
    pub fn group_fourcc(self, name: &str) -> Option<FourCC> {
        self.extensions().get(name).copied()
    }
}

//---------------------------------------------------------------------------//
//                              Catalogs
//---------------------------------------------------------------------------//

/// Fourcc/name pairs of every first-generation tag group.
const GEN1_GROUP_LIST: &[(&[u8; 4], &str)] = &[
    (b"actr", "actor"),
    (b"actv", "actor_variant"),
    (b"ant!", "antenna"),
    (b"antr", "model_animations"),
    (b"bipd", "biped"),
    (b"bitm", "bitmap"),
    (b"boom", "spheroid"),
    (b"cdmg", "continuous_damage_effect"),
    (b"coll", "model_collision_geometry"),
    (b"colo", "color_table"),
    (b"cont", "contrail"),
    (b"ctrl", "device_control"),
    (b"deca", "decal"),
    (b"DeLa", "ui_widget_definition"),
    (b"devc", "input_device_defaults"),
    (b"devi", "device"),
    (b"dobc", "detail_object_collection"),
    (b"effe", "effect"),
    (b"elec", "lightning"),
    (b"eqip", "equipment"),
    (b"flag", "flag"),
    (b"fog ", "fog"),
    (b"font", "font"),
    (b"foot", "material_effects"),
    (b"garb", "garbage"),
    (b"glw!", "glow"),
    (b"grhi", "grenade_hud_interface"),
    (b"hmt ", "hud_message_text"),
    (b"hud#", "hud_number"),
    (b"hudg", "hud_globals"),
    (b"item", "item"),
    (b"itmc", "item_collection"),
    (b"jpt!", "damage_effect"),
    (b"lens", "lens_flare"),
    (b"lifi", "device_light_fixture"),
    (b"ligh", "light"),
    (b"lsnd", "sound_looping"),
    (b"mach", "device_machine"),
    (b"matg", "globals"),
    (b"metr", "meter"),
    (b"mgs2", "light_volume"),
    (b"mod2", "gbxmodel"),
    (b"mode", "model"),
    (b"mply", "multiplayer_scenario_description"),
    (b"ngpr", "preferences_network_game"),
    (b"obje", "object"),
    (b"part", "particle"),
    (b"pctl", "particle_system"),
    (b"phys", "physics"),
    (b"plac", "placeholder"),
    (b"pphy", "point_physics"),
    (b"proj", "projectile"),
    (b"rain", "weather_particle_system"),
    (b"sbsp", "scenario_structure_bsp"),
    (b"scen", "scenery"),
    (b"scex", "shader_transparent_chicago_extended"),
    (b"schi", "shader_transparent_chicago"),
    (b"scnr", "scenario"),
    (b"senv", "shader_environment"),
    (b"sgla", "shader_transparent_glass"),
    (b"shdr", "shader"),
    (b"sky ", "sky"),
    (b"smet", "shader_transparent_meter"),
    (b"snd!", "sound"),
    (b"snde", "sound_environment"),
    (b"soso", "shader_model"),
    (b"sotr", "shader_transparent_generic"),
    (b"Soul", "ui_widget_collection"),
    (b"spla", "shader_transparent_plasma"),
    (b"ssce", "sound_scenery"),
    (b"str#", "string_list"),
    (b"swat", "shader_transparent_water"),
    (b"tagc", "tag_collection"),
    (b"trak", "camera_track"),
    (b"udlg", "dialogue"),
    (b"unhi", "unit_hud_interface"),
    (b"unit", "unit"),
    (b"ustr", "unicode_string_list"),
    (b"vcky", "virtual_keyboard"),
    (b"vehi", "vehicle"),
    (b"weap", "weapon"),
    (b"wind", "wind"),
    (b"wphi", "weapon_hud_interface"),
];

/// Fourcc/name pairs of every second-generation tag group, resource-only
/// wildcard groups included.
const GEN2_GROUP_LIST: &[(&[u8; 4], &str)] = &[
    (b"obje", "object"),
    (b"devi", "device"),
    (b"item", "item"),
    (b"unit", "unit"),
    (b"hlmt", "model"),
    (b"DECP", "decorators"),
    (b"mode", "render_model"),
    (b"coll", "collision_model"),
    (b"phmo", "physics_model"),
    (b"bitm", "bitmap"),
    (b"colo", "color_table"),
    (b"unic", "multilingual_unicode_string_list"),
    (b"bipd", "biped"),
    (b"vehi", "vehicle"),
    (b"scen", "scenery"),
    (b"bloc", "crate"),
    (b"crea", "creature"),
    (b"phys", "physics"),
    (b"cont", "contrail"),
    (b"weap", "weapon"),
    (b"ligh", "light"),
    (b"effe", "effect"),
    (b"prt3", "particle"),
    (b"PRTM", "particle_model"),
    (b"pmov", "particle_physics"),
    (b"matg", "globals"),
    (b"snd!", "sound"),
    (b"lsnd", "sound_looping"),
    (b"eqip", "equipment"),
    (b"ant!", "antenna"),
    (b"MGS2", "light_volume"),
    (b"tdtl", "liquid"),
    (b"devo", "cellular_automata"),
    (b"whip", "cellular_automata2d"),
    (b"BooM", "stereo_system"),
    (b"trak", "camera_track"),
    (b"proj", "projectile"),
    (b"mach", "device_machine"),
    (b"ctrl", "device_control"),
    (b"lifi", "device_light_fixture"),
    (b"pphy", "point_physics"),
    (b"ltmp", "scenario_structure_lightmap"),
    (b"sbsp", "scenario_structure_bsp"),
    (b"scnr", "scenario"),
    (b"shad", "shader"),
    (b"stem", "shader_template"),
    (b"slit", "shader_light_response"),
    (b"spas", "shader_pass"),
    (b"vrtx", "vertex_shader"),
    (b"pixl", "pixel_shader"),
    (b"DECR", "decorator_set"),
    (b"sky ", "sky"),
    (b"wind", "wind"),
    (b"snde", "sound_environment"),
    (b"lens", "lens_flare"),
    (b"fog ", "planar_fog"),
    (b"fpch", "patchy_fog"),
    (b"metr", "meter"),
    (b"deca", "decal"),
    (b"coln", "colony"),
    (b"jpt!", "damage_effect"),
    (b"udlg", "dialogue"),
    (b"itmc", "item_collection"),
    (b"vehc", "vehicle_collection"),
    (b"wphi", "weapon_hud_interface"),
    (b"grhi", "grenade_hud_interface"),
    (b"unhi", "unit_hud_interface"),
    (b"nhdt", "new_hud_definition"),
    (b"hud#", "hud_number"),
    (b"hudg", "hud_globals"),
    (b"mply", "multiplayer_scenario_description"),
    (b"dobc", "detail_object_collection"),
    (b"ssce", "sound_scenery"),
    (b"hmt ", "hud_message_text"),
    (b"wgit", "user_interface_screen_widget_definition"),
    (b"skin", "user_interface_list_skin_definition"),
    (b"wgtz", "user_interface_globals_definition"),
    (b"wigl", "user_interface_shared_globals_definition"),
    (b"sily", "text_value_pair_definition"),
    (b"goof", "multiplayer_variant_settings_interface_definition"),
    (b"foot", "material_effects"),
    (b"garb", "garbage"),
    (b"styl", "style"),
    (b"char", "character"),
    (b"adlg", "ai_dialogue_globals"),
    (b"mdlg", "ai_mission_dialogue"),
    (b"*cen", "scenario_scenery_resource"),
    (b"*ipd", "scenario_bipeds_resource"),
    (b"*ehi", "scenario_vehicles_resource"),
    (b"*qip", "scenario_equipment_resource"),
    (b"*eap", "scenario_weapons_resource"),
    (b"*sce", "scenario_sound_scenery_resource"),
    (b"*igh", "scenario_lights_resource"),
    (b"dgr*", "scenario_devices_resource"),
    (b"dec*", "scenario_decals_resource"),
    (b"cin*", "scenario_cinematics_resource"),
    (b"trg*", "scenario_trigger_volumes_resource"),
    (b"clu*", "scenario_cluster_data_resource"),
    (b"*rea", "scenario_creature_resource"),
    (b"dc*s", "scenario_decorators_resource"),
    (b"sslt", "scenario_structure_lighting_resource"),
    (b"hsc*", "scenario_hs_source_file"),
    (b"ai**", "scenario_ai_resource"),
    (b"/**/", "scenario_comments_resource"),
    (b"bsdt", "breakable_surface"),
    (b"mpdt", "material_physics"),
    (b"sncl", "sound_classes"),
    (b"mulg", "multiplayer_globals"),
    (b"<fx>", "sound_effect_template"),
    (b"sfx+", "sound_effect_collection"),
    (b"gldf", "chocolate_mountain"),
    (b"jmad", "model_animation_graph"),
    (b"clwd", "cloth"),
    (b"egor", "screen_effect"),
    (b"weat", "weather_system"),
    (b"snmx", "sound_mix"),
    (b"spk!", "sound_dialogue_constants"),
    (b"ugh!", "sound_cache_file_gestalt"),
    (b"$#!+", "cache_file_sound"),
    (b"mcsr", "mouse_cursor_definition"),
    (b"tag+", "tag_database"),
];

lazy_static! {

    /// First-generation catalog, fourcc -> group name.
    pub static ref GEN1_GROUPS: BTreeMap<FourCC, &'static str> = GEN1_GROUP_LIST.iter()
        .map(|(fourcc, name)| (FourCC::new(fourcc), *name))
        .collect();

    /// First-generation catalog, group name -> fourcc.
    pub static ref GEN1_EXTENSIONS: BTreeMap<&'static str, FourCC> = GEN1_GROUP_LIST.iter()
        .map(|(fourcc, name)| (*name, FourCC::new(fourcc)))
        .collect();

    /// Second-generation catalog, fourcc -> group name.
    pub static ref GEN2_GROUPS: BTreeMap<FourCC, &'static str> = GEN2_GROUP_LIST.iter()
        .map(|(fourcc, name)| (FourCC::new(fourcc), *name))
        .collect();

    /// Second-generation catalog, group name -> fourcc.
    pub static ref GEN2_EXTENSIONS: BTreeMap<&'static str, FourCC> = GEN2_GROUP_LIST.iter()
        .map(|(fourcc, name)| (*name, FourCC::new(fourcc)))
        .collect();
}

//---------------------------------------------------------------------------//
//                              Tests
//---------------------------------------------------------------------------//

#[cfg(test)]
mod groups_test {
    use super::*;

    #[test]
    fn catalogs_have_no_fourcc_collisions() {
        assert_eq!(GEN1_GROUPS.len(), GEN1_GROUP_LIST.len());
        assert_eq!(GEN2_GROUPS.len(), GEN2_GROUP_LIST.len());
    }

    #[test]
    fn group_lookups_work_both_ways() {
        assert_eq!(Generation::Gen1.group_name(FourCC::new(b"trak")), Some("camera_track"));
        assert_eq!(Generation::Gen2.group_fourcc("biped"), Some(FourCC::new(b"bipd")));
        assert_eq!(Generation::Gen2.group_name(FourCC::new(b"ai**")), Some("scenario_ai_resource"));
        assert_eq!(Generation::Gen1.group_name(FourCC::new(b"zzzz")), None);
    }

    #[test]
    fn engine_tags_round_trip_and_declare_their_legacy_traits() {
        for engine in [EngineTag::Gen1, EngineTag::Gen2V1, EngineTag::Gen2V2, EngineTag::Gen2V3, EngineTag::Gen2V4] {
            assert_eq!(EngineTag::from_fourcc(engine.fourcc()), Some(engine));
        }

        assert_eq!(EngineTag::Gen1.legacy(), LegacyTraits::HEADER | LegacyTraits::STRINGS | LegacyTraits::PADDING);
        assert_eq!(EngineTag::Gen2V2.legacy(), LegacyTraits::STRINGS | LegacyTraits::PADDING);
        assert_eq!(EngineTag::Gen2V3.legacy(), LegacyTraits::PADDING);
        assert!(EngineTag::Gen2V4.legacy().is_empty());
        assert_eq!(EngineTag::LATEST, EngineTag::Gen2V4);
    }
}
