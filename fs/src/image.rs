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

//! External image codec. Each page occupies one fixed-size record on
//! the medium: a discarded word, the header and label as little-endian
//! words, and the data area with its bytes swapped in pairs.

use alto_ds::DataStorage;
use alto_err::{Error, Result};
use log::debug;
use zerocopy::IntoBytes;

use crate::{
    page::{PAGE_DATA_SIZE, PAGE_META_SIZE},
    Filesystem,
};

/// Bytes of one page record on the external medium.
pub const PAGE_RECORD_SIZE: usize = 2 + PAGE_META_SIZE + PAGE_DATA_SIZE;

pub(crate) fn load<DS: DataStorage>(fs: &mut Filesystem, storage: &DS) -> Result<()> {
    let expected = fs.length() as u64 * PAGE_RECORD_SIZE as u64;
    let actual = storage.size()?;
    if actual < expected {
        return Err(Error::PrematureEnd);
    }
    if actual > expected {
        return Err(Error::TrailingGarbage);
    }

    let mut record = [0u8; PAGE_RECORD_SIZE];
    for vda in 0..fs.length() {
        storage.read(vda as u64 * PAGE_RECORD_SIZE as u64, &mut record)?;

        // The first word is only a discriminator; the page index takes
        // its place.
        let page = &mut fs.pages[vda as usize];
        page.as_mut_bytes()[..PAGE_META_SIZE].copy_from_slice(&record[2..2 + PAGE_META_SIZE]);

        let data = &record[2 + PAGE_META_SIZE..];
        for j in 0..PAGE_DATA_SIZE {
            // Consecutive media bytes land swapped in memory.
            page.data[j ^ 1] = data[j];
        }
    }

    debug!("loaded {} pages", fs.length());
    Ok(())
}

pub(crate) fn save<DS: DataStorage>(fs: &Filesystem, storage: &mut DS) -> Result<()> {
    let mut record = [0u8; PAGE_RECORD_SIZE];
    for vda in 0..fs.length() {
        let page = &fs.pages[vda as usize];
        record[..2].copy_from_slice(&vda.to_le_bytes());
        record[2..2 + PAGE_META_SIZE].copy_from_slice(&page.as_bytes()[..PAGE_META_SIZE]);
        for j in 0..PAGE_DATA_SIZE {
            record[2 + PAGE_META_SIZE + j] = page.data[j ^ 1];
        }

        storage.write(vda as u64 * PAGE_RECORD_SIZE as u64, &record)?;
    }

    debug!("saved {} pages", fs.length());
    Ok(())
}
