//---------------------------------------------------------------------------//
// Copyright (c) 2025 The tagsmith contributors. All rights reserved.
//
// This file is part of the tagsmith project, a schema-driven codec and
// version migrator for game engine tag files.
//
// This file is licensed under the MIT license, which can be found here:
// https://opensource.org/licenses/MIT
//---------------------------------------------------------------------------//

//! Module containing tests for the [`WriteBytes`] trait.

use super::{Endian, WriteBytes};

#[test]
fn write_integers_both_endians() {
    let mut data = vec![];
    data.write_u16(0x0201, Endian::Little).unwrap();
    data.write_u16(0x0201, Endian::Big).unwrap();
    assert_eq!(data, vec![0x01, 0x02, 0x02, 0x01]);

    let mut data = vec![];
    data.write_i32(-258, Endian::Little).unwrap();
    assert_eq!(data, vec![254, 254, 255, 255]);
}

#[test]
fn write_string_u8_0padded_rejects_oversize() {
    let mut data = vec![];
    data.write_string_u8_0padded("Waha", 8).unwrap();
    assert_eq!(data, vec![87, 97, 104, 97, 0, 0, 0, 0]);

    let mut data = vec![];
    assert!(data.write_string_u8_0padded("Wahahahaha", 8).is_err());
}

#[test]
fn write_fourcc_reverses_on_little_endian() {
    let mut data = vec![];
    data.write_fourcc(*b"bipd", Endian::Little).unwrap();
    data.write_fourcc(*b"bipd", Endian::Big).unwrap();
    assert_eq!(data, b"dpibbipd".to_vec());
}

#[test]
fn write_f32_preserves_negative_zero() {
    let mut data = vec![];
    data.write_f32(-0.0, Endian::Little).unwrap();
    assert_eq!(data, vec![0x00, 0x00, 0x00, 0x80]);
}
