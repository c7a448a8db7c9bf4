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

//! Sequential access over the linked page chain of one file.

use alto_err::{Error, Result};

use crate::{
    page::{FileEntry, Position, PAGE_DATA_SIZE, VERSION_FREE},
    Filesystem,
};

/// Cursor over a file's page chain.
///
/// The cursor holds no borrow of the filesystem; every operation takes
/// both together. The first structural failure during a page walk
/// poisons the cursor: later reads and writes move nothing and `trim`
/// refuses to run.
#[derive(Debug)]
pub struct OpenFile {
    pub fe: FileEntry,
    pub pos: Position,
    error: Option<Error>,
}

impl OpenFile {
    /// The error that poisoned this cursor, if any.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    pub fn poisoned(&self) -> bool {
        self.error.is_some()
    }

    pub(crate) fn take_error(&mut self) -> Option<Error> {
        self.error.take()
    }
}

impl Filesystem {
    /// Opens a file positioned at its first data page.
    pub fn open(&self, fe: &FileEntry) -> Result<OpenFile> {
        let page = self.page(fe.leader_vda)?;
        let vda = self.geometry().real_to_virtual(page.label.next_rda.get())?;
        Ok(OpenFile {
            fe: *fe,
            pos: Position { vda, pgnum: 1, pos: 0 },
            error: None,
        })
    }

    /// Opens a file positioned at the leader page itself, so the
    /// metadata page is part of the byte stream.
    pub fn open_with_leader(&self, fe: &FileEntry) -> Result<OpenFile> {
        self.page(fe.leader_vda)?;
        Ok(OpenFile {
            fe: *fe,
            pos: Position {
                vda: fe.leader_vda,
                pgnum: 0,
                pos: 0,
            },
            error: None,
        })
    }

    /// Reads up to `dst.len()` bytes at the cursor and returns the
    /// count actually transferred. Reading at end of file transfers
    /// nothing and leaves the cursor in place.
    pub fn read(&self, of: &mut OpenFile, dst: &mut [u8]) -> usize {
        self.advance(of, dst.len(), Some(dst))
    }

    /// Advances the cursor over `len` bytes without copying them out.
    pub fn skip(&self, of: &mut OpenFile, len: usize) -> usize {
        self.advance(of, len, None)
    }

    fn advance(&self, of: &mut OpenFile, len: usize, mut dst: Option<&mut [u8]>) -> usize {
        if of.poisoned() {
            return 0;
        }

        let mut moved = 0;
        while moved < len {
            let vda = of.pos.vda;
            if vda == 0 {
                break;
            }
            if vda >= self.length() {
                self.poison(of, Error::InvalidVda { vda });
                break;
            }

            let page = &self.pages[vda as usize];
            if page.label.file_pgnum.get() != of.pos.pgnum {
                self.poison(of, Error::PageNumberMismatch { vda });
                break;
            }
            let nbytes = page.label.nbytes.get();
            if of.pos.pos > nbytes {
                self.poison(of, Error::LabelInvalid { vda });
                break;
            }

            if of.pos.pos < nbytes {
                let pos = of.pos.pos as usize;
                let chunk = (nbytes as usize - pos).min(len - moved);
                if let Some(dst) = dst.as_deref_mut() {
                    dst[moved..moved + chunk].copy_from_slice(&page.data[pos..pos + chunk]);
                }
                of.pos.pos += chunk as u16;
                moved += chunk;
            } else {
                match self.geometry().real_to_virtual(page.label.next_rda.get()) {
                    Ok(next) => {
                        of.pos.vda = next;
                        of.pos.pos = 0;
                        if next != 0 {
                            of.pos.pgnum += 1;
                        } else {
                            of.pos.pgnum = 0;
                        }
                    }
                    Err(error) => {
                        self.poison(of, error);
                        break;
                    }
                }
            }
        }
        moved
    }

    /// Writes `src` at the cursor, overwriting in place. With `extend`
    /// set, the chain grows at its end: a short terminal page is
    /// filled out first, then free pages are linked in. A cursor that
    /// has walked past the end of the chain seeks back to its terminal
    /// page first. Returns the count actually written; without
    /// `extend` writing stops at the current end of file.
    pub fn write(&mut self, of: &mut OpenFile, src: &[u8], extend: bool) -> usize {
        if of.poisoned() {
            return 0;
        }

        let mut moved = 0;
        while moved < src.len() {
            let vda = of.pos.vda;
            if vda == 0 {
                // End-of-chain marker, reached either by opening an
                // empty file or by reading a chain to exhaustion. The
                // terminal page (the leader, for an empty chain) is
                // found by walking from the leader again.
                if !extend {
                    break;
                }
                match self.chain_tail(of.fe.leader_vda) {
                    Ok(tail) => {
                        of.pos = tail;
                        continue;
                    }
                    Err(error) => {
                        self.poison(of, error);
                        break;
                    }
                }
            }
            if vda >= self.length() {
                self.poison(of, Error::InvalidVda { vda });
                break;
            }

            let label = &self.pages[vda as usize].label;
            let (pgnum, nbytes, next_rda) = (
                label.file_pgnum.get(),
                label.nbytes.get(),
                label.next_rda.get(),
            );
            if pgnum != of.pos.pgnum {
                self.poison(of, Error::PageNumberMismatch { vda });
                break;
            }
            if of.pos.pos > nbytes {
                self.poison(of, Error::LabelInvalid { vda });
                break;
            }

            if of.pos.pos < nbytes {
                let pos = of.pos.pos as usize;
                let chunk = (nbytes as usize - pos).min(src.len() - moved);
                self.pages[vda as usize].data[pos..pos + chunk]
                    .copy_from_slice(&src[moved..moved + chunk]);
                of.pos.pos += chunk as u16;
                moved += chunk;
            } else if next_rda != 0 {
                match self.geometry().real_to_virtual(next_rda) {
                    Ok(next) => {
                        of.pos.vda = next;
                        of.pos.pos = 0;
                        if next != 0 {
                            of.pos.pgnum += 1;
                        } else {
                            of.pos.pgnum = 0;
                        }
                    }
                    Err(error) => {
                        self.poison(of, error);
                        break;
                    }
                }
            } else if !extend {
                break;
            } else if (nbytes as usize) < PAGE_DATA_SIZE {
                // Fill out the terminal page before allocating.
                let grow = (PAGE_DATA_SIZE - nbytes as usize).min(src.len() - moved);
                self.pages[vda as usize]
                    .label
                    .nbytes
                    .set(nbytes + grow as u16);
            } else {
                match self.extend_chain(vda) {
                    Ok(next) => {
                        of.pos.vda = next;
                        of.pos.pgnum += 1;
                        of.pos.pos = 0;
                    }
                    Err(error) => {
                        self.poison(of, error);
                        break;
                    }
                }
            }
        }
        moved
    }

    /// Truncates the file at the cursor and frees the rest of the
    /// chain. A cursor sitting exactly on a full page boundary keeps
    /// the following page as the new, empty terminal page.
    pub fn trim(&mut self, of: &mut OpenFile) -> Result<()> {
        if of.poisoned() {
            return Err(Error::CursorPoisoned);
        }

        let vda = of.pos.vda;
        if vda == 0 {
            // Already past the end of the chain.
            return Ok(());
        }
        if vda >= self.length() {
            self.poison(of, Error::InvalidVda { vda });
            return Err(Error::InvalidVda { vda });
        }
        if self.pages[vda as usize].label.file_pgnum.get() != of.pos.pgnum {
            self.poison(of, Error::PageNumberMismatch { vda });
            return Err(Error::PageNumberMismatch { vda });
        }

        if (of.pos.pos as usize) < PAGE_DATA_SIZE {
            let label = &mut self.pages[vda as usize].label;
            label.nbytes.set(of.pos.pos);
            let released = label.next_rda.get();
            label.next_rda.set(0);
            self.release_chain(released)?;
        } else {
            let next_rda = self.pages[vda as usize].label.next_rda.get();
            let next_vda = match self.geometry().real_to_virtual(next_rda) {
                Ok(next) => next,
                Err(error) => {
                    self.report(&error);
                    return Err(Error::LinkBroken { vda });
                }
            };
            if next_vda != 0 {
                let label = &mut self.pages[next_vda as usize].label;
                label.nbytes.set(0);
                let released = label.next_rda.get();
                label.next_rda.set(0);
                self.release_chain(released)?;
            }
        }
        Ok(())
    }

    /// Frees every page of the chain starting at `rda`.
    fn release_chain(&mut self, mut rda: u16) -> Result<()> {
        loop {
            let vda = match self.geometry().real_to_virtual(rda) {
                Ok(vda) => vda,
                Err(error) => {
                    self.report(&error);
                    return Err(error);
                }
            };
            if vda == 0 {
                return Ok(());
            }

            let label = &mut self.pages[vda as usize].label;
            rda = label.next_rda.get();
            label.release();
        }
    }

    /// Walks the chain from the leader to its terminal page and
    /// returns a position at that page's end.
    fn chain_tail(&self, leader_vda: u16) -> Result<Position> {
        let mut vda = leader_vda;
        // A healthy chain is no longer than the disk itself.
        for _ in 0..self.length() {
            if vda >= self.length() {
                return Err(Error::InvalidVda { vda });
            }
            let label = &self.pages[vda as usize].label;
            let next = self.geometry().real_to_virtual(label.next_rda.get())?;
            if next == 0 {
                return Ok(Position {
                    vda,
                    pgnum: label.file_pgnum.get(),
                    pos: label.nbytes.get(),
                });
            }
            vda = next;
        }
        Err(Error::LinkBroken { vda })
    }

    /// Links a fresh page after `tail_vda`, inheriting the chain's
    /// identity. The new page starts out empty.
    fn extend_chain(&mut self, tail_vda: u16) -> Result<u16> {
        let free_vda = self.find_free_page()?;
        let tail_rda = self.geometry().virtual_to_real(tail_vda)?;
        let free_rda = self.geometry().virtual_to_real(free_vda)?;

        let tail = &self.pages[tail_vda as usize].label;
        let (version, sn, pgnum) = (tail.version.get(), tail.serial_number(), tail.file_pgnum.get());

        self.pages[tail_vda as usize].label.next_rda.set(free_rda);

        let label = &mut self.pages[free_vda as usize].label;
        label.next_rda.set(0);
        label.prev_rda.set(tail_rda);
        label.unused.set(0);
        label.nbytes.set(0);
        label.file_pgnum.set(pgnum + 1);
        label.version.set(version);
        label.set_serial_number(sn);

        Ok(free_vda)
    }

    /// First free page in ascending VDA order. Page 0 is never
    /// returned: its real address is the nil link, so it cannot be
    /// chained.
    pub(crate) fn find_free_page(&self) -> Result<u16> {
        for vda in 1..self.length() {
            if self.pages[vda as usize].label.version.get() == VERSION_FREE {
                return Ok(vda);
            }
        }
        Err(Error::DiskFull)
    }

    fn poison(&self, of: &mut OpenFile, error: Error) {
        self.report(&error);
        of.error = Some(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{testutil, VERSION_BAD};

    #[test]
    fn empty_file_reads_nothing() {
        let mut fs = testutil::small_fs();
        let fe = testutil::build_file(&mut fs, 1, "empty", 0x20, false, &[]);

        let mut of = fs.open(&fe).unwrap();
        assert_eq!(of.pos.vda, 0);
        let mut buffer = [0u8; 16];
        assert_eq!(fs.read(&mut of, &mut buffer), 0);
        assert!(!of.poisoned());
    }

    #[test]
    fn reads_across_pages() {
        let mut fs = testutil::small_fs();
        let chain = [(2u16, 512usize), (3, 100)];
        let fe = testutil::build_file(&mut fs, 1, "data", 0x21, false, &chain);
        let contents: Vec<u8> = (0..612u32).map(|i| i as u8).collect();
        testutil::fill_chain(&mut fs, &chain, &contents);

        let mut of = fs.open(&fe).unwrap();
        let mut buffer = vec![0u8; 1024];
        assert_eq!(fs.read(&mut of, &mut buffer), 612);
        assert_eq!(&buffer[..612], &contents[..]);

        // At end of file the cursor stays put.
        assert_eq!(fs.read(&mut of, &mut buffer), 0);
        assert_eq!(of.pos.vda, 0);
        assert_eq!(of.pos.pgnum, 0);
    }

    #[test]
    fn short_reads_resume() {
        let mut fs = testutil::small_fs();
        let chain = [(2u16, 512usize), (3, 100)];
        let fe = testutil::build_file(&mut fs, 1, "data", 0x21, false, &chain);
        let contents: Vec<u8> = (0..612u32).map(|i| (i * 7) as u8).collect();
        testutil::fill_chain(&mut fs, &chain, &contents);

        let mut of = fs.open(&fe).unwrap();
        let mut collected = Vec::new();
        let mut buffer = [0u8; 100];
        loop {
            let nbytes = fs.read(&mut of, &mut buffer);
            if nbytes == 0 {
                break;
            }
            collected.extend_from_slice(&buffer[..nbytes]);
        }
        assert_eq!(collected, contents);
    }

    #[test]
    fn open_with_leader_streams_metadata_page() {
        let mut fs = testutil::small_fs();
        let fe = testutil::build_file(&mut fs, 1, "meta", 0x22, false, &[(2, 10)]);

        let mut of = fs.open_with_leader(&fe).unwrap();
        let mut buffer = vec![0u8; 1024];
        assert_eq!(fs.read(&mut of, &mut buffer), 512 + 10);
    }

    #[test]
    fn skip_matches_read() {
        let mut fs = testutil::small_fs();
        let chain = [(2u16, 512usize), (3, 100)];
        let fe = testutil::build_file(&mut fs, 1, "data", 0x21, false, &chain);

        let mut of = fs.open(&fe).unwrap();
        assert_eq!(fs.skip(&mut of, 600), 600);
        assert_eq!(of.pos.vda, 3);
        assert_eq!(of.pos.pos, 88);
    }

    #[test]
    fn page_number_mismatch_poisons_cursor() {
        let mut fs = testutil::small_fs();
        let chain = [(2u16, 512usize), (3, 100)];
        let fe = testutil::build_file(&mut fs, 1, "data", 0x21, false, &chain);
        fs.page_mut(3).unwrap().label.file_pgnum.set(9);

        let mut of = fs.open(&fe).unwrap();
        let mut buffer = vec![0u8; 1024];
        assert_eq!(fs.read(&mut of, &mut buffer), 512);
        assert!(matches!(
            of.error(),
            Some(Error::PageNumberMismatch { vda: 3 })
        ));
        // Poisoned cursors short-circuit.
        assert_eq!(fs.read(&mut of, &mut buffer), 0);
        assert_eq!(fs.write(&mut of, b"x", true), 0);
        assert!(matches!(fs.trim(&mut of), Err(Error::CursorPoisoned)));
    }

    #[test]
    fn overwrite_in_place() {
        let mut fs = testutil::small_fs();
        let chain = [(2u16, 512usize), (3, 100)];
        let fe = testutil::build_file(&mut fs, 1, "data", 0x21, false, &chain);

        let mut of = fs.open(&fe).unwrap();
        assert_eq!(fs.skip(&mut of, 510), 510);
        assert_eq!(fs.write(&mut of, &[0xEE; 4], false), 4);

        let mut of = fs.open(&fe).unwrap();
        let mut buffer = vec![0u8; 612];
        assert_eq!(fs.read(&mut of, &mut buffer), 612);
        assert_eq!(&buffer[510..514], &[0xEE; 4]);
    }

    #[test]
    fn write_without_extend_stops_at_end_of_file() {
        let mut fs = testutil::small_fs();
        let fe = testutil::build_file(&mut fs, 1, "data", 0x21, false, &[(2, 10)]);

        let mut of = fs.open(&fe).unwrap();
        assert_eq!(fs.write(&mut of, &[1u8; 64], false), 10);
        assert!(!of.poisoned());
    }

    #[test]
    fn extend_grows_terminal_page_then_allocates() {
        let mut fs = testutil::small_fs();
        let fe = testutil::build_file(&mut fs, 1, "grow", 0x23, false, &[]);
        let contents: Vec<u8> = (0..700u32).map(|i| (i % 251) as u8).collect();

        let mut of = fs.open(&fe).unwrap();
        assert_eq!(fs.write(&mut of, &contents, true), 700);
        fs.trim(&mut of).unwrap();
        assert!(fs.check_integrity().unwrap());

        // First-fit allocation picks the lowest free pages in order.
        let first = fs.page(2).unwrap();
        assert_eq!(first.label.nbytes.get(), 512);
        assert_eq!(first.label.file_pgnum.get(), 1);
        let second = fs.page(3).unwrap();
        assert_eq!(second.label.nbytes.get(), 188);
        assert_eq!(second.label.next_rda.get(), 0);
        assert_eq!(fs.file_length(&fe).unwrap(), 700);

        let mut of = fs.open(&fe).unwrap();
        let mut buffer = vec![0u8; 1024];
        assert_eq!(fs.read(&mut of, &mut buffer), 700);
        assert_eq!(&buffer[..700], &contents[..]);
    }

    #[test]
    fn write_extends_after_reading_to_end_of_file() {
        let mut fs = testutil::small_fs();
        let chain = [(2u16, 512usize), (3, 100)];
        let fe = testutil::build_file(&mut fs, 1, "data", 0x28, false, &chain);
        let contents: Vec<u8> = (0..612u32).map(|i| (i * 5) as u8).collect();
        testutil::fill_chain(&mut fs, &chain, &contents);

        let mut of = fs.open(&fe).unwrap();
        let mut buffer = vec![0u8; 1024];
        assert_eq!(fs.read(&mut of, &mut buffer), 612);
        // The cursor has walked past the end of the chain.
        assert_eq!(of.pos.vda, 0);
        assert_eq!(of.pos.pgnum, 0);

        // Without extend there is still nothing to write into.
        assert_eq!(fs.write(&mut of, &[1u8; 4], false), 0);
        assert!(!of.poisoned());

        assert_eq!(fs.write(&mut of, &[0xC3; 500], true), 500);
        fs.trim(&mut of).unwrap();
        assert!(fs.check_integrity().unwrap());
        assert_eq!(fs.file_length(&fe).unwrap(), 1112);

        let mut of = fs.open(&fe).unwrap();
        let mut all = vec![0u8; 2048];
        assert_eq!(fs.read(&mut of, &mut all), 1112);
        assert_eq!(&all[..612], &contents[..]);
        assert_eq!(&all[612..1112], &[0xC3; 500][..]);
    }

    #[test]
    fn write_fails_with_disk_full() {
        let mut fs = testutil::small_fs();
        let fe = testutil::build_file(&mut fs, 1, "full", 0x24, false, &[]);
        // Claim every remaining free page.
        for vda in 0..fs.length() {
            let label = &mut fs.page_mut(vda).unwrap().label;
            if label.is_free() {
                label.version.set(VERSION_BAD);
                label.sn_type.set(VERSION_BAD);
                label.sn_id.set(VERSION_BAD);
            }
        }

        let mut of = fs.open(&fe).unwrap();
        assert_eq!(fs.write(&mut of, &[0u8; 16], true), 0);
        assert!(matches!(of.error(), Some(Error::DiskFull)));
    }

    #[test]
    fn trim_shrinks_and_frees_tail() {
        let mut fs = testutil::small_fs();
        let chain = [(2u16, 512usize), (3, 512), (4, 40)];
        let fe = testutil::build_file(&mut fs, 1, "data", 0x25, false, &chain);

        let mut of = fs.open(&fe).unwrap();
        assert_eq!(fs.skip(&mut of, 100), 100);
        fs.trim(&mut of).unwrap();

        assert_eq!(fs.file_length(&fe).unwrap(), 100);
        assert_eq!(fs.page(2).unwrap().label.nbytes.get(), 100);
        assert_eq!(fs.page(2).unwrap().label.next_rda.get(), 0);
        assert!(fs.page(3).unwrap().label.is_free());
        assert!(fs.page(4).unwrap().label.is_free());
        assert!(fs.check_integrity().unwrap());
    }

    #[test]
    fn trim_at_page_boundary_keeps_empty_terminal_page() {
        let mut fs = testutil::small_fs();
        let chain = [(2u16, 512usize), (3, 512), (4, 40)];
        let fe = testutil::build_file(&mut fs, 1, "data", 0x26, false, &chain);

        let mut of = fs.open(&fe).unwrap();
        assert_eq!(fs.skip(&mut of, 512), 512);
        assert_eq!(of.pos.pos, 512);
        fs.trim(&mut of).unwrap();

        assert_eq!(fs.file_length(&fe).unwrap(), 512);
        assert_eq!(fs.page(2).unwrap().label.nbytes.get(), 512);
        assert_eq!(fs.page(3).unwrap().label.nbytes.get(), 0);
        assert_eq!(fs.page(3).unwrap().label.next_rda.get(), 0);
        assert!(fs.page(4).unwrap().label.is_free());
        assert!(fs.check_integrity().unwrap());
    }

    #[test]
    fn find_free_page_is_first_fit_and_never_page_zero() {
        let mut fs = testutil::small_fs();
        testutil::build_file(&mut fs, 1, "a", 0x27, false, &[(2, 10)]);
        assert!(fs.page(0).unwrap().label.is_free());
        assert_eq!(fs.find_free_page().unwrap(), 3);
        fs.page_mut(3).unwrap().label.version.set(1);
        assert_eq!(fs.find_free_page().unwrap(), 4);
    }
}
