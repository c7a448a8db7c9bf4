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

//! Leader-page decoding: filename, timestamps, property blob and the
//! hint fields a file's first page carries about itself.

use alto_err::Result;

use crate::{
    page::{decode_name, read_word_be, FileEntry, Position, SerialNumber, PAGE_DATA_SIZE},
    Filesystem,
};

pub(crate) const LEADER_CREATED: usize = 0;
pub(crate) const LEADER_WRITTEN: usize = 4;
pub(crate) const LEADER_READ: usize = 8;
pub(crate) const LEADER_FILENAME: usize = 12;
pub(crate) const LEADER_PROPS: usize = 52;
pub(crate) const LEADER_SPARE: usize = 472;
pub(crate) const LEADER_PROPBEGIN: usize = 492;
pub(crate) const LEADER_PROPLEN: usize = 493;
pub(crate) const LEADER_CONSECUTIVE: usize = 494;
pub(crate) const LEADER_CHANGESN: usize = 495;
pub(crate) const LEADER_DIRFPHINT: usize = 496;
pub(crate) const LEADER_LASTPAGEHINT: usize = 506;

/// Seconds between the Alto epoch and the Unix epoch.
const ALTO_EPOCH_OFFSET: i64 = 2_117_503_696;

/// Metadata decoded from a leader page. Times are Unix seconds.
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub name: String,
    pub created: i64,
    pub written: i64,
    pub read: i64,
    /// Uninterpreted per-file attribute region.
    pub props: [u8; LEADER_SPARE - LEADER_PROPS],
    pub prop_begin: u8,
    pub prop_len: u8,
    pub consecutive: u8,
    pub change_sn: u8,
    /// Back-reference to the directory holding this file.
    pub dir_fe: FileEntry,
    /// Hint naming the last page of the file; not trusted for length
    /// computations.
    pub last_page: Position,
}

/// Reads one Alto timestamp: two big-endian words, high word at the
/// lower offset.
fn read_alto_time(data: &[u8], offset: usize) -> i64 {
    let high = read_word_be(data, offset) as i64;
    let low = read_word_be(data, offset + 2) as i64;
    (high << 16) + low + ALTO_EPOCH_OFFSET
}

impl Filesystem {
    /// Builds a file handle from the label of a leader page.
    pub fn file_entry_from_leader_vda(&self, leader_vda: u16) -> Result<FileEntry> {
        let page = self.page(leader_vda)?;
        Ok(FileEntry {
            sn: page.label.serial_number(),
            version: page.label.version.get(),
            leader_vda,
        })
    }

    /// Decodes the metadata held on a file's leader page.
    pub fn file_info(&self, fe: &FileEntry) -> Result<FileInfo> {
        let page = self.page(fe.leader_vda)?;
        let data = &page.data;

        let mut props = [0u8; LEADER_SPARE - LEADER_PROPS];
        props.copy_from_slice(&data[LEADER_PROPS..LEADER_SPARE]);

        Ok(FileInfo {
            name: decode_name(&data[LEADER_FILENAME..]),
            created: read_alto_time(data, LEADER_CREATED),
            written: read_alto_time(data, LEADER_WRITTEN),
            read: read_alto_time(data, LEADER_READ),
            props,
            prop_begin: data[LEADER_PROPBEGIN],
            prop_len: data[LEADER_PROPLEN],
            consecutive: data[LEADER_CONSECUTIVE],
            change_sn: data[LEADER_CHANGESN],
            dir_fe: FileEntry {
                sn: SerialNumber {
                    file_type: read_word_be(data, LEADER_DIRFPHINT),
                    file_id: read_word_be(data, LEADER_DIRFPHINT + 2),
                },
                version: read_word_be(data, LEADER_DIRFPHINT + 4),
                // The word at offset +6 is blank.
                leader_vda: read_word_be(data, LEADER_DIRFPHINT + 8),
            },
            last_page: Position {
                vda: read_word_be(data, LEADER_LASTPAGEHINT),
                pgnum: read_word_be(data, LEADER_LASTPAGEHINT + 2),
                pos: read_word_be(data, LEADER_LASTPAGEHINT + 4),
            },
        })
    }

    /// Sums the used bytes of every data page by walking the chain.
    pub fn file_length(&self, fe: &FileEntry) -> Result<usize> {
        let mut of = self.open(fe)?;
        let mut length = 0;
        loop {
            let nbytes = self.skip(&mut of, PAGE_DATA_SIZE);
            length += nbytes;
            if nbytes != PAGE_DATA_SIZE {
                break;
            }
        }
        if let Some(error) = of.take_error() {
            return Err(error);
        }
        Ok(length)
    }
}
