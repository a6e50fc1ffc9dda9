//---------------------------------------------------------------------------//
// Copyright (c) 2025 The tagsmith contributors. All rights reserved.
//
// This file is part of the tagsmith project, a schema-driven codec and
// version migrator for game engine tag files.
//
// This file is licensed under the MIT license, which can be found here:
// https://opensource.org/licenses/MIT
//---------------------------------------------------------------------------//

//! Second-generation definition front-end.
//!
//! Gen2 definitions are a folder of XML files, one per tag group, where any
//! element carrying a `regolithID` is addressable and `*XRef` elements
//! name-reference those IDs. This module only parses and indexes; all the
//! resolution work happens in the shared pipeline of [`crate::schema`].

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, TagLibError};
use crate::groups::Generation;

use super::raw::RawNode;
use super::{RawDefs, Schema};

/// This function loads and resolves a Gen2 definition folder.
pub fn load(defs_path: &Path) -> Result<Schema> {
    let defs = load_defs(defs_path)?;
    Schema::from_defs(defs, Generation::Gen2)
}

/// This function parses every XML file under the provided folder (recursively)
/// into tag group roots and the addressable-definition index.
pub(crate) fn load_defs(defs_path: &Path) -> Result<RawDefs> {
    let mut paths = vec![];
    collect_files(defs_path, "xml", &mut paths)
        .map_err(|_| TagLibError::DefinitionFolderNotFound(defs_path.to_string_lossy().to_string()))?;

    paths.sort();

    let mut defs = RawDefs::default();
    for path in &paths {
        let xml = fs::read_to_string(path)?;
        let root = RawNode::from_xml(&xml)?;

        collect_regolith(&root, &mut defs.regolith);

        if root.tag == "TagGroup" {
            if let Some(name) = root.attr("name").map(|name| name.to_owned()) {
                defs.groups.insert(name, root);
            }
        }
    }

    if defs.groups.is_empty() {
        return Err(TagLibError::DefinitionFolderNotFound(defs_path.to_string_lossy().to_string()));
    }

    Ok(defs)
}

/// This function indexes every addressable definition in a tree, root included.
pub(crate) fn collect_regolith(node: &RawNode, regolith: &mut BTreeMap<String, RawNode>) {
    if let Some(id) = node.attr("regolithID") {
        regolith.insert(id.to_owned(), node.clone());
    }

    for child in &node.children {
        collect_regolith(child, regolith);
    }
}

/// This function collects all files with the provided extension under a folder, recursively.
pub(crate) fn collect_files(path: &Path, extension: &str, paths: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let entry_path = entry.path();
        if entry_path.is_dir() {
            collect_files(&entry_path, extension, paths)?;
        } else if entry_path.extension().is_some_and(|found| found.eq_ignore_ascii_case(extension)) {
            paths.push(entry_path);
        }
    }

    Ok(())
}
