//---------------------------------------------------------------------------//
// Copyright (c) 2025 The tagsmith contributors. All rights reserved.
//
// This file is part of the tagsmith project, a schema-driven codec and
// version migrator for game engine tag files.
//
// This file is licensed under the MIT license, which can be found here:
// https://opensource.org/licenses/MIT
//---------------------------------------------------------------------------//

//! Module with the [`WriteBytes`] trait, to write bytes from known types to a [`Writer`].
//!
//! [`Writer`]: std::io::Write

use byteorder::{BigEndian, LittleEndian, WriteBytesExt};

use std::io::Write;

use crate::error::{Result, TagLibError};

use super::Endian;

//---------------------------------------------------------------------------//
//                            Trait Definition
//---------------------------------------------------------------------------//

/// This trait allow us to easily write all kind of data types to something that implements [`Write`].
pub trait WriteBytes: Write {

    /// This function tries to write a byte value to `self`.
    ///
    /// ```rust
    /// use tagsmith_lib::binary::WriteBytes;
    ///
    /// let mut data = vec![];
    /// assert!(data.write_u8(10).is_ok());
    /// assert_eq!(data, vec![10]);
    /// ```
    fn write_u8(&mut self, value: u8) -> Result<()> {
        WriteBytesExt::write_u8(self, value).map_err(From::from)
    }

    /// This function tries to write an i8 value to `self`.
    fn write_i8(&mut self, value: i8) -> Result<()> {
        WriteBytesExt::write_i8(self, value).map_err(From::from)
    }

    /// This function tries to write an u16 value to `self`, in the requested byte order.
    fn write_u16(&mut self, value: u16, endian: Endian) -> Result<()> {
        match endian {
            Endian::Little => WriteBytesExt::write_u16::<LittleEndian>(self, value).map_err(From::from),
            Endian::Big => WriteBytesExt::write_u16::<BigEndian>(self, value).map_err(From::from),
        }
    }

    /// This function tries to write an i16 value to `self`, in the requested byte order.
    fn write_i16(&mut self, value: i16, endian: Endian) -> Result<()> {
        match endian {
            Endian::Little => WriteBytesExt::write_i16::<LittleEndian>(self, value).map_err(From::from),
            Endian::Big => WriteBytesExt::write_i16::<BigEndian>(self, value).map_err(From::from),
        }
    }

    /// This function tries to write an u32 value to `self`, in the requested byte order.
    fn write_u32(&mut self, value: u32, endian: Endian) -> Result<()> {
        match endian {
            Endian::Little => WriteBytesExt::write_u32::<LittleEndian>(self, value).map_err(From::from),
            Endian::Big => WriteBytesExt::write_u32::<BigEndian>(self, value).map_err(From::from),
        }
    }

    /// This function tries to write an i32 value to `self`, in the requested byte order.
    ///
    /// ```rust
    /// use tagsmith_lib::binary::{Endian, WriteBytes};
    ///
    /// let mut data = vec![];
    /// assert!(data.write_i32(-258, Endian::Little).is_ok());
    /// assert_eq!(data, vec![254, 254, 255, 255]);
    /// ```
    fn write_i32(&mut self, value: i32, endian: Endian) -> Result<()> {
        match endian {
            Endian::Little => WriteBytesExt::write_i32::<LittleEndian>(self, value).map_err(From::from),
            Endian::Big => WriteBytesExt::write_i32::<BigEndian>(self, value).map_err(From::from),
        }
    }

    /// This function tries to write an f32 value to `self`, in the requested byte order.
    fn write_f32(&mut self, value: f32, endian: Endian) -> Result<()> {
        match endian {
            Endian::Little => WriteBytesExt::write_f32::<LittleEndian>(self, value).map_err(From::from),
            Endian::Big => WriteBytesExt::write_f32::<BigEndian>(self, value).map_err(From::from),
        }
    }

    /// This function writes an UTF-8 String into `self`, zero-padding it to the provided `size`.
    ///
    /// It may fail if the String is longer than the provided size, or if `self` cannot be written to.
    ///
    /// ```rust
    /// use tagsmith_lib::binary::WriteBytes;
    ///
    /// let mut data = vec![];
    /// assert!(data.write_string_u8_0padded("Waha", 8).is_ok());
    /// assert_eq!(data, vec![87, 97, 104, 97, 0, 0, 0, 0]);
    /// ```
    fn write_string_u8_0padded(&mut self, value: &str, size: usize) -> Result<()> {
        if value.len() > size {
            return Err(TagLibError::EncodingPaddedStringError(value.to_owned(), value.len(), size));
        }

        self.write_all(value.as_bytes())?;
        self.write_all(&vec![0; size - value.len()]).map_err(From::from)
    }

    /// This function writes a fourcc (4 raw bytes) to `self`.
    ///
    /// Fourccs are stored reversed in little-endian files, so this takes the
    /// canonical forward order and swaps as needed.
    fn write_fourcc(&mut self, value: [u8; 4], endian: Endian) -> Result<()> {
        let mut data = value;
        if endian.is_little() {
            data.reverse();
        }

        self.write_all(&data).map_err(From::from)
    }
}

// Automatic implementation for everything that implements `Write`.
impl<W: Write> WriteBytes for W {}
