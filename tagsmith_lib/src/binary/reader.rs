//---------------------------------------------------------------------------//
// Copyright (c) 2025 The tagsmith contributors. All rights reserved.
//
// This file is part of the tagsmith project, a schema-driven codec and
// version migrator for game engine tag files.
//
// This file is licensed under the MIT license, which can be found here:
// https://opensource.org/licenses/MIT
//---------------------------------------------------------------------------//

//! Module with the [`ReadBytes`] trait, to read bytes to known types.

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};

use std::io::{Read, Seek, SeekFrom};

use crate::error::Result;

use super::Endian;

//---------------------------------------------------------------------------//
//                            Trait Definition
//---------------------------------------------------------------------------//

/// This trait allow us to easily read all kind of data from a source that implements [`Read`] + [`Seek`].
pub trait ReadBytes: Read + Seek {

    /// This function returns the lenght of the data we're reading.
    ///
    /// ```rust
    /// use std::io::Cursor;
    ///
    /// use tagsmith_lib::binary::ReadBytes;
    ///
    /// let data = vec![1, 2, 3, 4];
    /// let mut cursor = Cursor::new(data);
    /// let len = cursor.len().unwrap();
    /// assert_eq!(len, 4);
    /// ```
    fn len(&mut self) -> Result<u64> {
        let old_pos = self.stream_position()?;
        let len = self.seek(SeekFrom::End(0))?;

        // Avoid seeking a third time when we were already at the end of the
        // stream. The branch is usually way cheaper than a seek operation.
        if old_pos != len {
            self.seek(SeekFrom::Start(old_pos))?;
        }

        Ok(len)
    }

    /// This function returns if the data is empty.
    fn is_empty(&mut self) -> Result<bool> {
        self.len().map(|len| len == 0)
    }

    /// This function returns the amount of bytes specified in the `size` argument as a [`Vec<u8>`].
    ///
    /// If `rewind` is true, the cursor will be reset to its original position once the data is returned.
    ///
    /// ```rust
    /// use std::io::Cursor;
    ///
    /// use tagsmith_lib::binary::ReadBytes;
    ///
    /// let data = vec![1, 2, 3, 4];
    /// let mut cursor = Cursor::new(data.to_vec());
    /// let data_read = cursor.read_slice(4, false).unwrap();
    /// assert_eq!(data, data_read);
    /// ```
    fn read_slice(&mut self, size: usize, rewind: bool) -> Result<Vec<u8>> {
        let mut data = vec![0; size];

        // If len is 0, just return.
        if size == 0 {
            return Ok(data)
        }

        self.read_exact(&mut data)?;

        if rewind {
            self.seek(SeekFrom::Current(-(size as i64)))?;
        }

        Ok(data)
    }

    /// This function tries to read an unsigned byte value from `self`.
    fn read_u8(&mut self) -> Result<u8> {
        ReadBytesExt::read_u8(self).map_err(From::from)
    }

    /// This function tries to read a signed byte value from `self`.
    fn read_i8(&mut self) -> Result<i8> {
        ReadBytesExt::read_i8(self).map_err(From::from)
    }

    /// This function tries to read an u16 value from `self`, in the requested byte order.
    ///
    /// ```rust
    /// use std::io::Cursor;
    ///
    /// use tagsmith_lib::binary::{Endian, ReadBytes};
    ///
    /// let data = vec![10, 0, 0, 10];
    /// let mut cursor = Cursor::new(data);
    /// assert_eq!(cursor.read_u16(Endian::Little).unwrap(), 10);
    /// assert_eq!(cursor.read_u16(Endian::Big).unwrap(), 10);
    /// ```
    fn read_u16(&mut self, endian: Endian) -> Result<u16> {
        match endian {
            Endian::Little => ReadBytesExt::read_u16::<LittleEndian>(self).map_err(From::from),
            Endian::Big => ReadBytesExt::read_u16::<BigEndian>(self).map_err(From::from),
        }
    }

    /// This function tries to read an i16 value from `self`, in the requested byte order.
    fn read_i16(&mut self, endian: Endian) -> Result<i16> {
        match endian {
            Endian::Little => ReadBytesExt::read_i16::<LittleEndian>(self).map_err(From::from),
            Endian::Big => ReadBytesExt::read_i16::<BigEndian>(self).map_err(From::from),
        }
    }

    /// This function tries to read an u32 value from `self`, in the requested byte order.
    fn read_u32(&mut self, endian: Endian) -> Result<u32> {
        match endian {
            Endian::Little => ReadBytesExt::read_u32::<LittleEndian>(self).map_err(From::from),
            Endian::Big => ReadBytesExt::read_u32::<BigEndian>(self).map_err(From::from),
        }
    }

    /// This function tries to read an i32 value from `self`, in the requested byte order.
    ///
    /// ```rust
    /// use std::io::Cursor;
    ///
    /// use tagsmith_lib::binary::{Endian, ReadBytes};
    ///
    /// let data = vec![254, 254, 255, 255];
    /// let mut cursor = Cursor::new(data);
    /// assert_eq!(cursor.read_i32(Endian::Little).unwrap(), -258);
    /// ```
    fn read_i32(&mut self, endian: Endian) -> Result<i32> {
        match endian {
            Endian::Little => ReadBytesExt::read_i32::<LittleEndian>(self).map_err(From::from),
            Endian::Big => ReadBytesExt::read_i32::<BigEndian>(self).map_err(From::from),
        }
    }

    /// This function tries to read an f32 value from `self`, in the requested byte order.
    fn read_f32(&mut self, endian: Endian) -> Result<f32> {
        match endian {
            Endian::Little => ReadBytesExt::read_f32::<LittleEndian>(self).map_err(From::from),
            Endian::Big => ReadBytesExt::read_f32::<BigEndian>(self).map_err(From::from),
        }
    }

    /// This function tries to read an UTF-8 String value of the provided `size` from `self`.
    ///
    /// Lossy, because tag files predate any sane encoding policy and may carry broken symbols.
    fn read_string_u8(&mut self, size: usize) -> Result<String> {
        let mut data = vec![0; size];
        self.read_exact(&mut data)?;

        Ok(String::from_utf8_lossy(&data).to_string())
    }

    /// This function tries to read a 00-Padded UTF-8 String value of the provided `size` from `self`.
    ///
    /// Note that `size` here is the full lenght of the String, including the 00 bytes that act as
    /// padding, and that tag strings get their padding spaces trimmed too.
    ///
    /// ```rust
    /// use std::io::Cursor;
    ///
    /// use tagsmith_lib::binary::ReadBytes;
    ///
    /// let data = vec![87, 97, 104, 97, 104, 97, 0, 0, 0, 0];
    /// let mut cursor = Cursor::new(data);
    /// let data = cursor.read_string_u8_0padded(10).unwrap();
    /// assert_eq!(data, "Wahaha");
    /// ```
    fn read_string_u8_0padded(&mut self, size: usize) -> Result<String> {
        let mut data = vec![0; size];
        self.read_exact(&mut data)?;

        let size_no_zeros = data.iter().position(|x| *x == 0).map_or(size, |x| x);
        Ok(String::from_utf8_lossy(&data[..size_no_zeros]).trim_matches(' ').to_string())
    }

    /// This function tries to read a fourcc (4 raw bytes) from `self`.
    ///
    /// Fourccs are stored reversed in little-endian files, so this hands back
    /// the bytes already in their canonical forward order.
    fn read_fourcc(&mut self, endian: Endian) -> Result<[u8; 4]> {
        let mut data = [0; 4];
        self.read_exact(&mut data)?;

        if endian.is_little() {
            data.reverse();
        }

        Ok(data)
    }
}

// Automatic implementation for everything that implements `Read + Seek`.
impl<R: Read + Seek> ReadBytes for R {}
