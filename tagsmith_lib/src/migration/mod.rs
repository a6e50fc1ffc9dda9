//---------------------------------------------------------------------------//
// Copyright (c) 2025 The tagsmith contributors. All rights reserved.
//
// This file is part of the tagsmith project, a schema-driven codec and
// version migrator for game engine tag files.
//
// This file is licensed under the MIT license, which can be found here:
// https://opensource.org/licenses/MIT
//---------------------------------------------------------------------------//

//! Module with the migration engine: per-group routines that normalize a
//! decoded tag from any older schema version up to the latest one.
//!
//! Migrators run once per tag, after decode and before encode. Every step is
//! guarded on the current `TagBlockHeader`/`StructHeader` versions, so running
//! a migrator on an already-migrated tree is a no-op. Groups without an entry
//! in the registry pass through untouched.

use crate::binary::Endian;
use crate::error::Result;
use crate::groups::{FourCC, Generation};
use crate::schema::Schema;
use crate::tags::TagFile;

mod gen2;

#[cfg(test)] mod migration_test;

/// A per-group upgrade routine.
pub type Migrator = fn(&Schema, &mut TagFile, Endian) -> Result<()>;

/// This function returns the upgrade routine registered for a tag group, if any.
///
/// Gen1 tags have a single schema version, so their registry is empty.
pub fn migrator_for(generation: Generation, fourcc: FourCC) -> Option<Migrator> {
    match generation {
        Generation::Gen1 => None,
        Generation::Gen2 => gen2::migrator_for(fourcc),
    }
}

/// This function runs the registered migrator over a decoded tag, if there is
/// one. Returns whether the tag was actually put through a migrator.
pub fn run(schema: &Schema, tag: &mut TagFile, endian: Endian) -> Result<bool> {
    match migrator_for(*schema.generation(), tag.header().group) {
        Some(migrator) => {
            migrator(schema, tag, endian)?;
            Ok(true)
        },
        None => Ok(false),
    }
}
