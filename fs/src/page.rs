// Copyright 2024 Kevin Ludwig
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use zerocopy::{little_endian::U16, FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout};

/// Number of data bytes in every page.
pub const PAGE_DATA_SIZE: usize = 512;

/// Length of the filename field, length byte included.
pub const FILENAME_LENGTH: usize = 40;

/// Label version of a free page.
pub const VERSION_FREE: u16 = 0xFFFF;

/// Label version marking known-bad media. A well-formed bad page
/// carries it in both serial words as well.
pub const VERSION_BAD: u16 = 0x7FFF;

/// Bit set in the serial-number type word of directories.
pub const SN_DIRECTORY: u16 = 0x8000;

/// File identity: the type word (with the [`SN_DIRECTORY`] bit) and the
/// id unique within the filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SerialNumber {
    pub file_type: u16,
    pub file_id: u16,
}

impl SerialNumber {
    pub fn is_directory(&self) -> bool {
        self.file_type & SN_DIRECTORY != 0
    }
}

/// Handle to a file: its identity plus the address of its leader page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileEntry {
    pub sn: SerialNumber,
    pub version: u16,
    pub leader_vda: u16,
}

/// Byte position within an open file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub vda: u16,
    pub pgnum: u16,
    pub pos: u16,
}

/// Page label as laid out on the medium.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct Label {
    pub next_rda: U16,
    pub prev_rda: U16,
    pub unused: U16,
    pub nbytes: U16,
    pub file_pgnum: U16,
    pub version: U16,
    pub sn_type: U16,
    pub sn_id: U16,
}

impl Label {
    pub fn serial_number(&self) -> SerialNumber {
        SerialNumber {
            file_type: self.sn_type.get(),
            file_id: self.sn_id.get(),
        }
    }

    pub fn set_serial_number(&mut self, sn: SerialNumber) {
        self.sn_type.set(sn.file_type);
        self.sn_id.set(sn.file_id);
    }

    pub fn is_free(&self) -> bool {
        self.version.get() == VERSION_FREE
    }

    /// Clears the label back to the free state.
    pub fn release(&mut self) {
        *self = Label::new_zeroed();
        self.version.set(VERSION_FREE);
    }
}

/// One disk page: two header words, the label, and the data area.
///
/// The struct layout matches the little-endian metadata on the medium,
/// so the image codec moves the first [`PAGE_META_SIZE`] bytes
/// verbatim. Header word 0 must be zero and word 1 must name the
/// page's own RDA. The page's VDA is not stored; it is the index of
/// the page in the store.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct Page {
    pub header: [U16; 2],
    pub label: Label,
    pub data: [u8; PAGE_DATA_SIZE],
}

/// Bytes of header plus label preceding the data area.
pub const PAGE_META_SIZE: usize = core::mem::size_of::<Page>() - PAGE_DATA_SIZE;

/// Reads a big-endian word from the byte-order corrected data area.
pub fn read_word_be(data: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([data[offset], data[offset + 1]])
}

/// Writes a big-endian word into the data area.
pub fn write_word_be(data: &mut [u8], offset: usize, word: u16) {
    data[offset..offset + 2].copy_from_slice(&word.to_be_bytes());
}

/// Decodes a length-prefixed filename field. The length byte is the
/// character count; at most `FILENAME_LENGTH - 1` characters are taken,
/// clamped to the field actually present.
pub fn decode_name(field: &[u8]) -> String {
    if field.is_empty() {
        return String::new();
    }
    let slen = (field[0] as usize)
        .min(FILENAME_LENGTH - 1)
        .min(field.len() - 1);
    String::from_utf8_lossy(&field[1..1 + slen]).into_owned()
}

/// Encodes `name` into a length-prefixed filename field.
pub fn encode_name(field: &mut [u8], name: &str) {
    let bytes = name.as_bytes();
    let slen = bytes.len().min(FILENAME_LENGTH - 1);
    field[0] = slen as u8;
    field[1..1 + slen].copy_from_slice(&bytes[..slen]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_sizes() {
        assert_eq!(core::mem::size_of::<Label>(), 16);
        assert_eq!(core::mem::size_of::<Page>(), 532);
        assert_eq!(PAGE_META_SIZE, 20);
    }

    #[test]
    fn release_frees_label() {
        let mut label = Label::new_zeroed();
        label.next_rda.set(0x1000);
        label.nbytes.set(512);
        label.sn_id.set(7);
        label.release();
        assert!(label.is_free());
        assert_eq!(label.next_rda.get(), 0);
        assert_eq!(label.nbytes.get(), 0);
        assert_eq!(label.sn_id.get(), 0);
    }

    #[test]
    fn directory_bit() {
        let sn = SerialNumber {
            file_type: SN_DIRECTORY,
            file_id: 0x64,
        };
        assert!(sn.is_directory());
        assert!(!SerialNumber::default().is_directory());
    }

    #[test]
    fn name_decode_keeps_declared_count() {
        let mut field = [0u8; FILENAME_LENGTH];
        field[0] = 6;
        field[1..7].copy_from_slice(b"SysDir");
        assert_eq!(decode_name(&field), "SysDir");
    }

    #[test]
    fn name_decode_clamps_oversized_length() {
        let mut field = [b'x'; FILENAME_LENGTH];
        field[0] = 0xFF;
        assert_eq!(decode_name(&field).len(), FILENAME_LENGTH - 1);
    }

    #[test]
    fn name_round_trip() {
        let mut field = [0u8; FILENAME_LENGTH];
        encode_name(&mut field, "sys.boot");
        assert_eq!(field[0], 8);
        assert_eq!(decode_name(&field), "sys.boot");
    }

    #[test]
    fn word_be_round_trip() {
        let mut data = [0u8; 4];
        write_word_be(&mut data, 2, 0x0420);
        assert_eq!(data, [0, 0, 0x04, 0x20]);
        assert_eq!(read_word_be(&data, 2), 0x0420);
    }
}
