//---------------------------------------------------------------------------//
// Copyright (c) 2025 The tagsmith contributors. All rights reserved.
//
// This file is part of the tagsmith project, a schema-driven codec and
// version migrator for game engine tag files.
//
// This file is licensed under the MIT license, which can be found here:
// https://opensource.org/licenses/MIT
//---------------------------------------------------------------------------//

//! This module contains all kind of errors used inside this crate.
//!
//! Not much to say appart of that, really.

use thiserror::Error;

/// Custom `Result` type, to always return our custom error.
pub type Result<T, E = TagLibError> = core::result::Result<T, E>;

/// Custom error type for the lib.
#[derive(Error, Debug)]
pub enum TagLibError {
    #[error("The header of this file is incomplete, unsupported or damaged.")]
    TagHeaderNotComplete,

    #[error("The engine tag \"{0}\" is not one of the recognized engine revisions.")]
    UnknownEngineTag(String),

    #[error("The tag group \"{0}\" is not in the tag group catalog for this engine.")]
    UnknownTagGroup(String),

    #[error("There is no definition for the tag group \"{0}\" in the loaded schema.")]
    MissingDefinition(String),

    #[error("No field set is marked as latest in the definition of \"{0}\".")]
    MissingLatestFieldSet(String),

    #[error("There is no field set with version {1} in the definition of \"{0}\".")]
    MissingFieldSetVersion(String, i32),

    #[error("The definition folder \"{0}\" could not be read, or contains no usable definitions.")]
    DefinitionFolderNotFound(String),

    #[error("Error parsing a definition file: {0}.")]
    DefinitionParseError(String),

    #[error("Cyclic inheritance detected while resolving the tag group \"{0}\".")]
    CyclicInheritance(String),

    #[error("Error trying to encode \"{0}\": it has a length of {1} bytes, but its length should be less or equal than {2}.")]
    EncodingPaddedStringError(String, usize, usize),

    #[error("Missing extra data required to decode the file. This means the programmer messed up the code that tries to decode files.")]
    DecodingMissingExtraData,

    #[error("Missing extra data required to encode the file. This means the programmer messed up the code that tries to encode files.")]
    EncodingMissingExtraData,

    #[error("The JSON dump is missing the \"{0}\" key, so it cannot be turned back into a tag file.")]
    JsonDumpMissingKey(String),

    /// Represents all other cases of `std::io::Error`.
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Represents all other cases of `serde_json::Error`.
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    /// Represents all other cases of `base64` decoding errors.
    #[error(transparent)]
    Base64Error(#[from] base64::DecodeError),
}
