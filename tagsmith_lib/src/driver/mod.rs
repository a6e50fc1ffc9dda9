//---------------------------------------------------------------------------//
// Copyright (c) 2025 The tagsmith contributors. All rights reserved.
//
// This file is part of the tagsmith project, a schema-driven codec and
// version migrator for game engine tag files.
//
// This file is licensed under the MIT license, which can be found here:
// https://opensource.org/licenses/MIT
//---------------------------------------------------------------------------//

//! Module with the driver that wires schema, codec and migration over files
//! and directory trees.
//!
//! The schema is built once and shared; each file is then decoded, optionally
//! dumped to JSON, optionally migrated, re-encoded and optionally compared
//! against the original by hash. Failures are per-file: they go to the error
//! log with their path and processing continues.

use getset::{Getters, Setters};
use log::{info, warn};
use rayon::prelude::*;
use sha2::{Digest, Sha256};

use std::fs::{self, File};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::binary::Endian;
use crate::error::{Result, TagLibError};
use crate::groups::{EngineTag, FourCC, Generation};
use crate::migration;
use crate::schema::Schema;
use crate::tags::{CodecOptions, Decodeable, DecodeableExtraData, Encodeable, EncodeableExtraData, TagFile};

//---------------------------------------------------------------------------//
//                              Enums & Structs
//---------------------------------------------------------------------------//

/// This struct ties a loaded schema to codec and migration settings, ready to
/// push tag files through.
#[derive(Getters, Setters)]
#[getset(get = "pub", set = "pub")]
pub struct Driver {

    /// The resolved schema, built once.
    schema: Schema,

    /// Codec behaviour toggles.
    options: CodecOptions,

    /// Byte order of the files to process.
    endian: Endian,

    /// If decoded tags should be migrated to the latest schema versions.
    migrate: bool,

    /// If a JSON dump should be written beside each output file.
    dump_json: bool,
}

/// What happened to one file.
#[derive(Clone, Debug, PartialEq)]
pub enum FileOutcome {

    /// Re-encoded output is byte-identical to the input.
    Identical,

    /// Re-encoded output differs from the input.
    Mismatched,

    /// No comparison was requested or possible.
    Written,
}

/// Totals of a tree walk.
#[derive(Clone, Copy, Debug, Default, Getters)]
#[getset(get = "pub")]
pub struct TreeSummary {
    processed: usize,
    mismatched: usize,
    failed: usize,
}

//---------------------------------------------------------------------------//
//                       Implementation of Driver
//---------------------------------------------------------------------------//

impl Driver {

    /// This function builds a driver around an already-loaded schema.
    pub fn new(schema: Schema, options: CodecOptions, endian: Endian, migrate: bool, dump_json: bool) -> Self {
        Self {
            schema,
            options,
            endian,
            migrate,
            dump_json,
        }
    }

    /// Default byte order of a generation's loose files: Gen1 tags ship
    /// big-endian, Gen2 tags little-endian.
    pub fn default_endian(generation: Generation) -> Endian {
        match generation {
            Generation::Gen1 => Endian::Big,
            Generation::Gen2 => Endian::Little,
        }
    }

    /// This function processes a single file: decode, dump, migrate, encode,
    /// then compare the re-encoded bytes against the original.
    pub fn process_file(&self, input_path: &Path, output_path: &Path) -> Result<FileOutcome> {
        let input = fs::read(input_path)?;
        let mut tag = self.decode(&input, input_path)?;

        if self.dump_json {
            self.write_json_dump(&tag, output_path)?;
        }

        if self.migrate {
            migration::run(&self.schema, &mut tag, self.endian)?;
        }

        let output = self.encode(&mut tag)?;

        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(output_path, &output)?;

        Ok(if Sha256::digest(&input) == Sha256::digest(&output) {
            FileOutcome::Identical
        } else {
            FileOutcome::Mismatched
        })
    }

    /// This function re-encodes a JSON dump into a tag file. The tag group
    /// comes from the output file's extension.
    pub fn process_json(&self, input_path: &Path, output_path: &Path) -> Result<FileOutcome> {
        let dump = serde_json::from_slice(&fs::read(input_path)?)?;

        let extension = output_path.extension()
            .map(|extension| extension.to_string_lossy().to_string())
            .unwrap_or_default();

        let group = self.generation().group_fourcc(&extension)
            .ok_or_else(|| TagLibError::UnknownTagGroup(extension))?;

        let mut tag = TagFile::from_json(&dump, &self.schema, group)?;
        let output = self.encode(&mut tag)?;

        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(output_path, &output)?;
        Ok(FileOutcome::Written)
    }

    /// This function walks a directory tree, processing every file into the
    /// mirrored path under the output folder. Failures and mismatches get
    /// appended to the error log; processing always continues.
    pub fn process_tree(&self, input_dir: &Path, output_dir: &Path, log_path: &Path) -> Result<TreeSummary> {
        let mut paths = vec![];
        collect_files(input_dir, &mut paths)?;
        paths.sort();

        let log_file = Mutex::new(File::create(log_path)?);
        let summary = Mutex::new(TreeSummary::default());

        paths.par_iter().for_each(|input_path| {
            let relative = input_path.strip_prefix(input_dir).unwrap_or(input_path);
            let output_path = output_dir.join(relative);

            match self.process_file(input_path, &output_path) {
                Ok(FileOutcome::Mismatched) => {
                    warn!("Recompiled file differs from the original: {}", input_path.display());
                    append_log(&log_file, &format!(
                        "\nHash Mismatch:\n  Read Path: {}\n  Output Path: {}\n  The recompiled file differs from the original.\n",
                        input_path.display(),
                        output_path.display(),
                    ));

                    let mut summary = summary.lock().unwrap();
                    summary.processed += 1;
                    summary.mismatched += 1;
                },
                Ok(_) => {
                    info!("Processed: {}", input_path.display());
                    summary.lock().unwrap().processed += 1;
                },
                Err(error) => {
                    warn!("Failed to process {}: {error}", input_path.display());
                    append_log(&log_file, &format!(
                        "\nParse Error:\n  File: {}\n  Error: {error}\n  While processing tag file.\n",
                        input_path.display(),
                    ));

                    summary.lock().unwrap().failed += 1;
                },
            }
        });

        Ok(summary.into_inner().unwrap())
    }

    /// This function decodes one tag image from memory.
    pub fn decode(&self, input: &[u8], path: &Path) -> Result<TagFile> {
        let path = path.to_string_lossy();

        let mut extra_data = DecodeableExtraData::default();
        extra_data.set_schema(Some(&self.schema));
        extra_data.set_endian(self.endian);
        extra_data.set_options(self.options);
        extra_data.set_file_path(Some(&*path));

        TagFile::decode(&mut Cursor::new(input), &Some(extra_data))
    }

    /// This function encodes a decoded tag back into bytes.
    pub fn encode(&self, tag: &mut TagFile) -> Result<Vec<u8>> {
        let mut extra_data = EncodeableExtraData::default();
        extra_data.set_schema(Some(&self.schema));
        extra_data.set_endian(self.endian);
        extra_data.set_options(self.options);
        extra_data.set_engine(Some(self.default_engine()));

        let mut output = vec![];
        tag.encode(&mut output, &Some(extra_data))?;
        Ok(output)
    }

    /// The engine revision freshly written headers get stamped with.
    pub fn default_engine(&self) -> EngineTag {
        match self.generation() {
            Generation::Gen1 => EngineTag::Gen1,
            Generation::Gen2 => EngineTag::LATEST,
        }
    }

    /// Shortcut for the schema's generation.
    pub fn generation(&self) -> Generation {
        *self.schema.generation()
    }

    /// This function returns the migrator-aware group lookup for a fourcc, if present.
    pub fn has_migrator(&self, fourcc: FourCC) -> bool {
        migration::migrator_for(self.generation(), fourcc).is_some()
    }

    fn write_json_dump(&self, tag: &TagFile, output_path: &Path) -> Result<()> {
        let json_path = output_path.with_extension("json");
        if let Some(parent) = json_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&json_path, serde_json::to_string_pretty(&tag.to_json())?).map_err(From::from)
    }
}

//---------------------------------------------------------------------------//
//                              Helpers
//---------------------------------------------------------------------------//

fn collect_files(path: &Path, paths: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(path)? {
        let entry_path = entry?.path();
        if entry_path.is_dir() {
            collect_files(&entry_path, paths)?;
        } else {
            paths.push(entry_path);
        }
    }

    Ok(())
}

fn append_log(log_file: &Mutex<File>, message: &str) {
    if let Ok(mut log_file) = log_file.lock() {
        let _ = log_file.write_all(message.as_bytes());
    }
}
