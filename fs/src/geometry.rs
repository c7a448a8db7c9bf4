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

use alto_err::{Error, Result};

/// Disk geometry, the sole source of truth for address translation.
///
/// A real disk address (RDA) packs cylinder, head and sector into one
/// word: bits 3..11 cylinder, bit 2 head, bits 12..15 sector, bits 0..1
/// zero. RDA 0 doubles as the "no page" sentinel. A virtual disk
/// address (VDA) is the dense index of the page in the page store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub num_cylinders: u16,
    pub num_heads: u16,
    pub num_sectors: u16,
}

impl Geometry {
    /// Single-pack Diablo-31 style drive, the standard Alto
    /// configuration.
    pub const DIABLO_31: Geometry = Geometry {
        num_cylinders: 203,
        num_heads: 2,
        num_sectors: 12,
    };

    pub fn new(num_cylinders: u16, num_heads: u16, num_sectors: u16) -> Result<Self> {
        let geometry = Self {
            num_cylinders,
            num_heads,
            num_sectors,
        };
        geometry.validate()?;
        Ok(geometry)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.num_heads > 2 || self.num_sectors > 15 || self.num_cylinders >= 512 {
            return Err(Error::GeometryInvalid);
        }
        Ok(())
    }

    /// Total number of pages addressable by this geometry.
    pub fn length(&self) -> u16 {
        self.num_cylinders * self.num_heads * self.num_sectors
    }

    /// Converts a real disk address to a virtual one.
    ///
    /// RDA 0 maps to VDA 0; a caller walking a chain treats that as end
    /// of chain rather than a reference to the boot page.
    pub fn real_to_virtual(&self, rda: u16) -> Result<u16> {
        let cylinder = (rda >> 3) & 0x1FF;
        let head = (rda >> 2) & 1;
        let sector = (rda >> 12) & 0xF;

        if cylinder >= self.num_cylinders
            || head >= self.num_heads
            || sector >= self.num_sectors
            || rda & 3 != 0
        {
            return Err(Error::InvalidRda { rda });
        }

        Ok((cylinder * self.num_heads + head) * self.num_sectors + sector)
    }

    /// Converts a virtual disk address to its bit-packed real form.
    pub fn virtual_to_real(&self, vda: u16) -> Result<u16> {
        if vda >= self.length() {
            return Err(Error::InvalidVda { vda });
        }

        let sector = vda % self.num_sectors;
        let rest = vda / self.num_sectors;
        let head = rest % self.num_heads;
        let cylinder = rest / self.num_heads;

        Ok(cylinder << 3 | head << 2 | sector << 12)
    }
}
