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

//! Read/write engine for the on-disk filesystem of the Xerox Alto.
//!
//! Every physical sector carries its own header and label, files are
//! doubly-linked chains of sectors, and directories are ordinary files
//! holding a stream of variable-length records. [`Filesystem`] owns a
//! dense page store reconstructed from a raw sector image and offers
//! verification, traversal, extraction and in-place modification on
//! top of it.

pub use alto_err::*;

mod check;
mod dir;
mod file;
mod geometry;
mod image;
mod info;
mod page;
mod report;
#[cfg(test)]
mod testutil;

pub use dir::{DirectoryEntry, Scan, ROOT_DIRECTORY_VDA};
pub use file::OpenFile;
pub use geometry::Geometry;
pub use image::PAGE_RECORD_SIZE;
pub use info::FileInfo;
pub use page::{
    decode_name, encode_name, read_word_be, write_word_be, FileEntry, Label, Page, Position,
    SerialNumber, FILENAME_LENGTH, PAGE_DATA_SIZE, PAGE_META_SIZE, SN_DIRECTORY, VERSION_BAD,
    VERSION_FREE,
};
pub use report::{LogReporter, Reporter, StderrReporter};

use std::io;

use alto_ds::DataStorage;
use zerocopy::FromZeros;

/// An in-memory Alto disk: the page store plus the geometry that maps
/// real to virtual addresses and the sink diagnostics are reported to.
pub struct Filesystem {
    geometry: Geometry,
    pub(crate) pages: Vec<Page>,
    reporter: Box<dyn Reporter>,
}

impl Filesystem {
    /// Creates a blank filesystem: every label free, every header
    /// already naming its own page.
    pub fn create(geometry: Geometry, reporter: Box<dyn Reporter>) -> Result<Filesystem> {
        geometry.validate()?;
        let length = geometry.length() as usize;

        let mut pages = Vec::new();
        pages
            .try_reserve_exact(length)
            .map_err(|_| Error::OutOfMemory)?;
        pages.resize_with(length, Page::new_zeroed);

        let mut fs = Filesystem {
            geometry,
            pages,
            reporter,
        };
        for vda in 0..fs.length() {
            let rda = fs.geometry.virtual_to_real(vda)?;
            let page = &mut fs.pages[vda as usize];
            page.header[1].set(rda);
            page.label.release();
        }
        Ok(fs)
    }

    /// [`Filesystem::create`] with the default standard-error reporter.
    pub fn create_default(geometry: Geometry) -> Result<Filesystem> {
        Self::create(geometry, Box::new(StderrReporter))
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Number of pages in the store.
    pub fn length(&self) -> u16 {
        self.pages.len() as u16
    }

    /// Read-only access to a page.
    pub fn page(&self, vda: u16) -> Result<&Page> {
        self.pages.get(vda as usize).ok_or(Error::InvalidVda { vda })
    }

    /// Mutable access to a page. Mutating a page invalidates any open
    /// cursor positioned on it.
    pub fn page_mut(&mut self, vda: u16) -> Result<&mut Page> {
        self.pages
            .get_mut(vda as usize)
            .ok_or(Error::InvalidVda { vda })
    }

    /// Loads the whole disk image from `storage`, rejecting images
    /// whose size does not match the geometry.
    pub fn load_image<DS: DataStorage>(&mut self, storage: &DS) -> Result<()> {
        image::load(self, storage).map_err(|error| {
            self.report(&error);
            error
        })
    }

    /// Writes the whole disk image to `storage`.
    pub fn save_image<DS: DataStorage>(&self, storage: &mut DS) -> Result<()> {
        image::save(self, storage).map_err(|error| {
            self.report(&error);
            error
        })
    }

    /// Streams a file's data pages into `out`.
    pub fn extract_file<W: io::Write>(&self, fe: &FileEntry, out: &mut W) -> Result<()> {
        let mut of = self.open(fe)?;
        let mut buffer = [0u8; PAGE_DATA_SIZE];
        loop {
            let nbytes = self.read(&mut of, &mut buffer);
            if nbytes > 0 {
                out.write_all(&buffer[..nbytes]).map_err(|source| {
                    let error = Error::IoWrite(source);
                    self.report(&error);
                    error
                })?;
            }
            if nbytes < buffer.len() {
                break;
            }
        }
        if let Some(error) = of.take_error() {
            return Err(error);
        }
        Ok(())
    }

    /// Replaces a file's contents with the bytes read from `input`,
    /// growing or shrinking the chain as needed.
    pub fn replace_file<R: io::Read>(&mut self, fe: &FileEntry, input: &mut R) -> Result<()> {
        let mut contents = Vec::new();
        input.read_to_end(&mut contents).map_err(|source| {
            let error = Error::IoRead(source);
            self.report(&error);
            error
        })?;

        let mut of = self.open(fe)?;
        self.write(&mut of, &contents, true);
        if let Some(error) = of.take_error() {
            return Err(error);
        }
        self.trim(&mut of)
    }

    pub(crate) fn report(&self, error: &Error) {
        self.reporter.report(error);
    }
}
