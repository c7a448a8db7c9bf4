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

pub use alto_err::*;

use std::io;

use log::error;

/// Random-access byte storage holding a raw disk image.
///
/// The image codec reads and writes whole page records through this
/// interface and uses `size` to reject images whose length does not
/// match the disk geometry.
pub trait DataStorage {
    fn size(&self) -> Result<u64>;

    fn read(&self, offset: u64, buffer: &mut [u8]) -> Result<()>;

    fn write(&mut self, offset: u64, buffer: &[u8]) -> Result<()>;
}

/// Image held entirely in memory, for tests and embedders.
pub struct MemStorage {
    bytes: Vec<u8>,
}

impl MemStorage {
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0; size],
        }
    }

    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.bytes
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl DataStorage for MemStorage {
    fn size(&self) -> Result<u64> {
        Ok(self.bytes.len() as u64)
    }

    fn read(&self, offset: u64, buffer: &mut [u8]) -> Result<()> {
        let offset = offset as usize;
        let Some(source) = self
            .bytes
            .get(offset..offset.saturating_add(buffer.len()))
        else {
            error!("read of {} bytes at {offset} past end of image", buffer.len());
            return Err(Error::IoRead(io::ErrorKind::UnexpectedEof.into()));
        };
        buffer.copy_from_slice(source);
        Ok(())
    }

    fn write(&mut self, offset: u64, buffer: &[u8]) -> Result<()> {
        let offset = offset as usize;
        let Some(target) = self
            .bytes
            .get_mut(offset..offset.saturating_add(buffer.len()))
        else {
            error!("write of {} bytes at {offset} past end of image", buffer.len());
            return Err(Error::IoWrite(io::ErrorKind::UnexpectedEof.into()));
        };
        target.copy_from_slice(buffer);
        Ok(())
    }
}
