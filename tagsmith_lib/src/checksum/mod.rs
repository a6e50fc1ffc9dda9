//---------------------------------------------------------------------------//
// Copyright (c) 2025 The tagsmith contributors. All rights reserved.
//
// This file is part of the tagsmith project, a schema-driven codec and
// version migrator for game engine tag files.
//
// This file is licensed under the MIT license, which can be found here:
// https://opensource.org/licenses/MIT
//---------------------------------------------------------------------------//

//! Module with the checksum the engine stamps into tag headers.
//!
//! This is a reflected CRC-32 over the polynomial `0xEDB88320`, seeded with
//! `0xFFFFFFFF` and, unlike the standard CRC-32, **not** inverted at the end.
//! The engine calls its lookup table the "obfuscation buffer", so we keep the
//! name. It covers the whole body of the file (root framing, content and
//! trailing resource bytes), excluding the 64-byte header.

use lazy_static::lazy_static;

lazy_static! {

    /// Precomputed lookup table for [`body_checksum`]. Built once per process.
    static ref OBFUSCATION_BUFFER: [u32; 256] = {
        let mut buffer = [0u32; 256];
        for (index, entry) in buffer.iter_mut().enumerate() {
            let mut result = index as u32;
            for _ in 0..8 {
                if result & 1 != 0 {
                    result = (result >> 1) ^ 0xEDB8_8320;
                } else {
                    result >>= 1;
                }
            }

            *entry = result;
        }

        buffer
    };
}

/// This function calculates the header checksum of the provided body bytes.
pub fn body_checksum(source_buffer: &[u8]) -> u32 {
    let mut checksum = 0xFFFF_FFFFu32;
    for byte in source_buffer {
        let buffer_index = ((checksum ^ *byte as u32) & 0xFF) as usize;
        checksum = OBFUSCATION_BUFFER[buffer_index] ^ (checksum >> 8);
    }

    checksum
}

#[cfg(test)]
mod checksum_test {
    use super::*;

    #[test]
    fn empty_body_keeps_the_seed() {
        assert_eq!(body_checksum(&[]), 0xFFFF_FFFF);
    }

    #[test]
    fn known_value_matches_uninverted_crc32() {
        // The standard CRC-32 of "123456789" is 0xCBF43926. This checksum skips
        // the final inversion, so we expect its complement.
        assert_eq!(body_checksum(b"123456789"), !0xCBF4_3926u32);
    }

    #[test]
    fn checksum_is_position_sensitive() {
        assert_ne!(body_checksum(b"ab"), body_checksum(b"ba"));
    }
}
