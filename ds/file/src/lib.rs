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

use std::{fs::File, os::unix::fs::FileExt, path::Path};

use log::debug;

use alto_ds::{DataStorage, Error, Result};

/// Disk image stored in a regular file.
pub struct FileStorage {
    file: File,
}

impl FileStorage {
    /// Opens an existing image read-only.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| Error::IoOpen {
            path: path.display().to_string(),
            source,
        })?;
        debug!("opened disk image {}", path.display());
        Ok(Self { file })
    }

    /// Creates or truncates an image for writing.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|source| Error::IoOpen {
                path: path.display().to_string(),
                source,
            })?;
        debug!("created disk image {}", path.display());
        Ok(Self { file })
    }
}

impl DataStorage for FileStorage {
    fn size(&self) -> Result<u64> {
        Ok(self.file.metadata().map_err(Error::IoRead)?.len())
    }

    fn read(&self, offset: u64, buffer: &mut [u8]) -> Result<()> {
        self.file.read_exact_at(buffer, offset).map_err(Error::IoRead)
    }

    fn write(&mut self, offset: u64, buffer: &[u8]) -> Result<()> {
        self.file.write_all_at(buffer, offset).map_err(Error::IoWrite)
    }
}
