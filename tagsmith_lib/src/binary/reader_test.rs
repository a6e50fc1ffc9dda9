//---------------------------------------------------------------------------//
// Copyright (c) 2025 The tagsmith contributors. All rights reserved.
//
// This file is part of the tagsmith project, a schema-driven codec and
// version migrator for game engine tag files.
//
// This file is licensed under the MIT license, which can be found here:
// https://opensource.org/licenses/MIT
//---------------------------------------------------------------------------//

//! Module containing tests for the [`ReadBytes`] trait.

use std::io::{Cursor, Seek};

use super::{Endian, ReadBytes};

#[test]
fn read_integers_both_endians() {
    let mut cursor = Cursor::new(vec![0x01, 0x02]);
    assert_eq!(cursor.read_u16(Endian::Little).unwrap(), 0x0201);

    let mut cursor = Cursor::new(vec![0x01, 0x02]);
    assert_eq!(cursor.read_u16(Endian::Big).unwrap(), 0x0102);

    let mut cursor = Cursor::new(vec![254, 254, 255, 255]);
    assert_eq!(cursor.read_i32(Endian::Little).unwrap(), -258);

    let mut cursor = Cursor::new(vec![255, 255, 254, 254]);
    assert_eq!(cursor.read_i32(Endian::Big).unwrap(), -258);
}

#[test]
fn read_f32_preserves_negative_zero() {
    let mut cursor = Cursor::new(vec![0x00, 0x00, 0x00, 0x80]);
    let value = cursor.read_f32(Endian::Little).unwrap();
    assert_eq!(value, 0.0);
    assert!(value.is_sign_negative());
}

#[test]
fn read_string_u8_0padded_trims_padding() {
    let mut cursor = Cursor::new(vec![87, 97, 104, 97, 104, 97, 0, 0, 0, 0]);
    assert_eq!(cursor.read_string_u8_0padded(10).unwrap(), "Wahaha");

    // Space padding gets trimmed too.
    let mut cursor = Cursor::new(vec![32, 87, 97, 32, 0, 0]);
    assert_eq!(cursor.read_string_u8_0padded(6).unwrap(), "Wa");

    // Not enough bytes is an error.
    let mut cursor = Cursor::new(vec![87]);
    assert!(cursor.read_string_u8_0padded(10).is_err());
}

#[test]
fn read_fourcc_reverses_on_little_endian() {
    let mut cursor = Cursor::new(b"dpib".to_vec());
    assert_eq!(&cursor.read_fourcc(Endian::Little).unwrap(), b"bipd");

    let mut cursor = Cursor::new(b"bipd".to_vec());
    assert_eq!(&cursor.read_fourcc(Endian::Big).unwrap(), b"bipd");
}

#[test]
fn read_slice_rewind_restores_position() {
    let mut cursor = Cursor::new(vec![1, 2, 3, 4]);
    assert_eq!(cursor.read_slice(2, true).unwrap(), vec![1, 2]);
    assert_eq!(cursor.stream_position().unwrap(), 0);
    assert_eq!(cursor.read_slice(4, false).unwrap(), vec![1, 2, 3, 4]);
}
