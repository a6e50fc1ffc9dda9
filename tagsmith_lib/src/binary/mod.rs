//---------------------------------------------------------------------------//
// Copyright (c) 2025 The tagsmith contributors. All rights reserved.
//
// This file is part of the tagsmith project, a schema-driven codec and
// version migrator for game engine tag files.
//
// This file is licensed under the MIT license, which can be found here:
// https://opensource.org/licenses/MIT
//---------------------------------------------------------------------------//

//! Module with the [`ReadBytes`] and [`WriteBytes`] traits, to read/write known
//! types from/to binary streams.
//!
//! Tag files exist in both little-endian and big-endian flavours, so every
//! multi-byte accessor takes an explicit [`Endian`] argument instead of fixing
//! one byte order at the trait level.

use serde_derive::{Deserialize, Serialize};

pub use self::reader::ReadBytes;
pub use self::writer::WriteBytes;

mod reader;
mod writer;

#[cfg(test)] mod reader_test;
#[cfg(test)] mod writer_test;

//---------------------------------------------------------------------------//
//                              Enums & Structs
//---------------------------------------------------------------------------//

/// Byte order of a tag file, or of a single field when overridden by its definition.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum Endian {
    #[default]
    Little,
    Big,
}

impl Endian {

    /// Returns true if this is the little-endian byte order.
    pub fn is_little(self) -> bool {
        self == Self::Little
    }
}
