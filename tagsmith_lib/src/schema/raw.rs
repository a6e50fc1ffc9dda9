//---------------------------------------------------------------------------//
// Copyright (c) 2025 The tagsmith contributors. All rights reserved.
//
// This file is part of the tagsmith project, a schema-driven codec and
// version migrator for game engine tag files.
//
// This file is licensed under the MIT license, which can be found here:
// https://opensource.org/licenses/MIT
//---------------------------------------------------------------------------//

//! Module with the mutable node tree the schema resolution pipeline works on.
//!
//! Definition sources (XML files for Gen2, JSON files for Gen1) are first
//! parsed into [`RawNode`] trees. Inheritance merging, cross-reference
//! resolution, array unrolling and name disambiguation all mutate these trees;
//! only once the pipeline is done are they frozen into the immutable
//! [`Schema`](crate::schema::Schema).

use quick_xml::events::Event;
use quick_xml::Reader;

use std::collections::BTreeMap;

use crate::error::{Result, TagLibError};

//---------------------------------------------------------------------------//
//                              Enums & Structs
//---------------------------------------------------------------------------//

/// One node of a definition tree: an element tag, its attributes, optional
/// text content and its children, in document order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawNode {
    pub tag: String,
    pub attrs: BTreeMap<String, String>,
    pub text: Option<String>,
    pub children: Vec<RawNode>,
}

//---------------------------------------------------------------------------//
//                       Implementation of RawNode
//---------------------------------------------------------------------------//

impl RawNode {

    /// This function creates an empty node with the provided tag.
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_owned(),
            ..Default::default()
        }
    }

    /// This function returns the value of the provided attribute, if set.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(|value| &**value)
    }

    /// This function sets the provided attribute.
    pub fn set_attr(&mut self, key: &str, value: &str) {
        self.attrs.insert(key.to_owned(), value.to_owned());
    }

    /// This function returns the value of the provided attribute parsed as an integer, or the provided default.
    pub fn attr_int(&self, key: &str, default: i64) -> i64 {
        self.attr(key).and_then(|value| value.parse().ok()).unwrap_or(default)
    }

    /// This function returns the first direct child with the provided tag, if any.
    pub fn child(&self, tag: &str) -> Option<&RawNode> {
        self.children.iter().find(|child| child.tag == tag)
    }

    /// Same as [`Self::child`], but mutable.
    pub fn child_mut(&mut self, tag: &str) -> Option<&mut RawNode> {
        self.children.iter_mut().find(|child| child.tag == tag)
    }

    /// This function parses an XML document into a node tree, returning its root element.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut stack: Vec<RawNode> = vec![];
        let mut root = None;

        loop {
            match reader.read_event().map_err(|error| TagLibError::DefinitionParseError(error.to_string()))? {
                Event::Start(start) => {
                    let node = Self::from_xml_start(start.name().as_ref(), start.attributes())?;
                    stack.push(node);
                },
                Event::Empty(start) => {
                    let node = Self::from_xml_start(start.name().as_ref(), start.attributes())?;
                    Self::attach(&mut stack, &mut root, node);
                },
                Event::End(_) => {
                    let node = stack.pop()
                        .ok_or_else(|| TagLibError::DefinitionParseError("unbalanced closing tag".to_owned()))?;
                    Self::attach(&mut stack, &mut root, node);
                },
                Event::Text(text) => {
                    if let Some(parent) = stack.last_mut() {
                        let unescaped = text.unescape().map_err(|error| TagLibError::DefinitionParseError(error.to_string()))?;
                        let trimmed = unescaped.trim();
                        if !trimmed.is_empty() {
                            match parent.text {
                                Some(ref mut current) => current.push_str(trimmed),
                                None => parent.text = Some(trimmed.to_owned()),
                            }
                        }
                    }
                },
                Event::Eof => break,
                _ => {},
            }
        }

        root.ok_or_else(|| TagLibError::DefinitionParseError("no root element found".to_owned()))
    }

    /// This function builds a node from an XML start tag and its attributes.
    fn from_xml_start(name: &[u8], attributes: quick_xml::events::attributes::Attributes) -> Result<Self> {
        let mut node = Self::new(&String::from_utf8_lossy(name));
        for attribute in attributes {
            let attribute = attribute.map_err(|error| TagLibError::DefinitionParseError(error.to_string()))?;
            let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            let value = attribute.unescape_value()
                .map_err(|error| TagLibError::DefinitionParseError(error.to_string()))?
                .into_owned();

            node.attrs.insert(key, value);
        }

        Ok(node)
    }

    /// This function attaches a finished node to its parent on the stack, or sets it as the root.
    fn attach(stack: &mut Vec<RawNode>, root: &mut Option<RawNode>, node: RawNode) {
        match stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => if root.is_none() {
                *root = Some(node);
            },
        }
    }
}

//---------------------------------------------------------------------------//
//                              Tests
//---------------------------------------------------------------------------//

#[cfg(test)]
mod raw_test {
    use super::*;

    #[test]
    fn parse_nested_elements_with_attributes_and_text() {
        let xml = r#"
            <TagGroup group="bipd" name="biped" version="2">
                <Layout>
                    <FieldSet version="0" sizeofValue="16" isLatest="true">
                        <Real name="radius"/>
                        <StructXRef>mapping function</StructXRef>
                    </FieldSet>
                </Layout>
            </TagGroup>"#;

        let root = RawNode::from_xml(xml).unwrap();
        assert_eq!(root.tag, "TagGroup");
        assert_eq!(root.attr("group"), Some("bipd"));
        assert_eq!(root.attr_int("version", 0), 2);

        let layout = root.child("Layout").unwrap();
        let field_set = layout.child("FieldSet").unwrap();
        assert_eq!(field_set.children.len(), 2);
        assert_eq!(field_set.children[0].tag, "Real");
        assert_eq!(field_set.children[1].tag, "StructXRef");
        assert_eq!(field_set.children[1].text.as_deref(), Some("mapping function"));
    }

    #[test]
    fn parse_rejects_broken_documents() {
        assert!(RawNode::from_xml("<a><b></a>").is_err());
        assert!(RawNode::from_xml("").is_err());
    }
}
