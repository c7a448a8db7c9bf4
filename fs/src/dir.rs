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

//! Directory parsing and pathname resolution.
//!
//! A directory is an ordinary file whose data is a stream of
//! variable-length records. Each record starts with a big-endian
//! control word: the top six bits tag the record as valid or deleted,
//! the low ten give its length in words, control word included.
//! Records straddle page boundaries without padding.

use alto_err::{Error, Result};

use crate::{
    page::{decode_name, read_word_be, FileEntry, SerialNumber, FILENAME_LENGTH, VERSION_BAD,
        VERSION_FREE},
    Filesystem,
};

/// Leader VDA of the root directory by convention.
pub const ROOT_DIRECTORY_VDA: u16 = 1;

const DIR_ENTRY_VALID: u16 = 1;
const DIR_ENTRY_LEN_MASK: u16 = 0x3FF;

/// Largest directory record accepted, in bytes (64 words).
const DIR_ENTRY_MAX: usize = 128;

const DIRECTORY_SN: usize = 2;
const DIRECTORY_VERSION: usize = 6;
const DIRECTORY_LEADER_VDA: usize = 10;
const DIRECTORY_FILENAME: usize = 12;

/// One decoded, valid directory record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub fe: FileEntry,
    pub name: String,
}

/// Visitor verdict for the scan operations. Stopping early is a
/// successful outcome, not an error; a visitor that fails returns its
/// error instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scan {
    Continue,
    Stop,
}

impl Filesystem {
    /// Iterates the valid records of a directory in on-disk order.
    ///
    /// Deleted records are not visited, but their declared length is
    /// still consumed so the stream stays aligned.
    pub fn scan_directory<F>(&self, fe: &FileEntry, mut visit: F) -> Result<()>
    where
        F: FnMut(&DirectoryEntry) -> Result<Scan>,
    {
        let mut of = self.open(fe)?;
        let mut buffer = [0u8; DIR_ENTRY_MAX];

        loop {
            let nbytes = self.read(&mut of, &mut buffer[..2]);
            if nbytes == 0 {
                break;
            }
            if nbytes != 2 {
                return Err(of.take_error().unwrap_or(Error::PrematureEnd));
            }

            let control = read_word_be(&buffer, 0);
            let is_valid = control >> 10 == DIR_ENTRY_VALID;
            let record_len = 2 * (control & DIR_ENTRY_LEN_MASK) as usize;
            if record_len == 0 {
                return Err(Error::DirEntryLengthZero);
            }

            if record_len > DIR_ENTRY_MAX {
                if is_valid {
                    return Err(Error::DirEntryTooLong);
                }
                if self.skip(&mut of, record_len - 2) != record_len - 2 {
                    return Err(of.take_error().unwrap_or(Error::PrematureEnd));
                }
                continue;
            }

            if self.read(&mut of, &mut buffer[2..record_len]) != record_len - 2 {
                return Err(of.take_error().unwrap_or(Error::PrematureEnd));
            }
            if !is_valid {
                continue;
            }

            let entry = DirectoryEntry {
                fe: FileEntry {
                    sn: SerialNumber {
                        file_type: read_word_be(&buffer, DIRECTORY_SN),
                        file_id: read_word_be(&buffer, DIRECTORY_SN + 2),
                    },
                    version: read_word_be(&buffer, DIRECTORY_VERSION),
                    leader_vda: read_word_be(&buffer, DIRECTORY_LEADER_VDA),
                },
                name: if record_len > DIRECTORY_FILENAME {
                    decode_name(&buffer[DIRECTORY_FILENAME..record_len])
                } else {
                    String::new()
                },
            };

            match visit(&entry)? {
                Scan::Continue => {}
                Scan::Stop => break,
            }
        }

        Ok(())
    }

    /// Visits every leader page in VDA order, ignoring the directory
    /// structure. This is the recovery path for damaged disks.
    pub fn scan_files<F>(&self, mut visit: F) -> Result<()>
    where
        F: FnMut(&FileEntry) -> Result<Scan>,
    {
        for vda in 0..self.length() {
            let label = &self.pages[vda as usize].label;
            if label.file_pgnum.get() != 0 {
                continue;
            }
            let version = label.version.get();
            if version == VERSION_FREE || version == VERSION_BAD || version == 0 {
                continue;
            }

            let fe = FileEntry {
                sn: label.serial_number(),
                version,
                leader_vda: vda,
            };
            match visit(&fe)? {
                Scan::Continue => {}
                Scan::Stop => break,
            }
        }

        Ok(())
    }

    /// Resolves a hierarchical pathname. `<` resets to the root
    /// directory at [`ROOT_DIRECTORY_VDA`]; `>` descends into the
    /// entry just resolved, which must be a directory. Components are
    /// matched case-sensitively; an empty component, including a `>`
    /// with nothing resolved before it, is a no-op.
    pub fn find_file(&self, path: &str) -> Result<FileEntry> {
        let root = self.file_entry_from_leader_vda(ROOT_DIRECTORY_VDA)?;
        let mut current = root;

        let bytes = path.as_bytes();
        let mut pos = 0;
        while pos < bytes.len() {
            if bytes[pos] == b'<' {
                current = root;
                pos += 1;
                continue;
            }
            // A separator with no component before it has nothing to
            // descend into.
            if bytes[pos] == b'>' {
                pos += 1;
                continue;
            }

            let mut end = pos + 1;
            while end < bytes.len() && bytes[end] != b'<' && bytes[end] != b'>' {
                end += 1;
            }

            let component = &path[pos..end];
            if component.len() >= FILENAME_LENGTH {
                return Err(Error::NameTooLong);
            }

            current = self.lookup(&current, component)?;

            if end < bytes.len() && bytes[end] == b'>' {
                if !current.sn.is_directory() {
                    return Err(Error::NotADirectory {
                        name: component.into(),
                    });
                }
                end += 1;
            }

            pos = end;
        }

        Ok(current)
    }

    fn lookup(&self, dir: &FileEntry, component: &str) -> Result<FileEntry> {
        let mut found = None;
        self.scan_directory(dir, |entry| {
            if entry.name == component {
                found = Some(entry.fe);
                return Ok(Scan::Stop);
            }
            Ok(Scan::Continue)
        })?;
        found.ok_or(Error::NotFound)
    }

    /// Finds a file by name alone, scanning every leader page in disk
    /// order. Succeeds only when exactly one file bears the name; used
    /// when the directory structure is damaged.
    pub fn scavenge_file(&self, name: &str) -> Result<FileEntry> {
        let mut matches = 0;
        let mut found = None;
        self.scan_files(|fe| {
            let info = self.file_info(fe)?;
            if info.name == name {
                matches += 1;
                found = Some(*fe);
            }
            Ok(Scan::Continue)
        })?;

        match found {
            Some(fe) if matches == 1 => Ok(fe),
            Some(_) => Err(Error::Ambiguous),
            None => Err(Error::NotFound),
        }
    }
}
