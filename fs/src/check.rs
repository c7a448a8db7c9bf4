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

use crate::{
    info::LEADER_FILENAME,
    page::{FILENAME_LENGTH, PAGE_DATA_SIZE, VERSION_BAD, VERSION_FREE},
    Filesystem,
};

impl Filesystem {
    /// Verifies every page's self-description: header words, label
    /// sentinels, byte counts, chain linkage, page numbering and
    /// leader-page contents.
    ///
    /// Violations are reported to the diagnostic sink and the scan
    /// continues; the return value is `Ok(true)` only when the whole
    /// disk is clean. A translator that cannot map one of its own
    /// addresses is a geometry bug and aborts the scan.
    pub fn check_integrity(&self) -> Result<bool> {
        let mut success = true;
        for vda in 0..self.length() {
            let page = &self.pages[vda as usize];

            let rda = self.geometry().virtual_to_real(vda).map_err(|error| {
                self.report(&error);
                error
            })?;

            if page.header[0].get() != 0 || page.header[1].get() != rda {
                self.report(&Error::HeaderMismatch { vda });
                success = false;
                continue;
            }

            let label = &page.label;
            let version = label.version.get();
            if version == VERSION_FREE {
                continue;
            }
            if version == VERSION_BAD {
                // The bad sentinel must cover label and serial alike.
                if label.sn_type.get() != VERSION_BAD || label.sn_id.get() != VERSION_BAD {
                    self.report(&Error::LabelInvalid { vda });
                    success = false;
                }
                continue;
            }
            if version == 0 {
                self.report(&Error::LabelInvalid { vda });
                success = false;
                continue;
            }

            if label.nbytes.get() as usize > PAGE_DATA_SIZE {
                self.report(&Error::LabelInvalid { vda });
                success = false;
                continue;
            }

            if label.prev_rda.get() != 0 {
                let Ok(other_vda) = self.geometry().real_to_virtual(label.prev_rda.get()) else {
                    self.report(&Error::LinkBroken { vda });
                    success = false;
                    continue;
                };

                let other = &self.pages[other_vda as usize].label;
                if other.file_pgnum.get().wrapping_add(1) != label.file_pgnum.get() {
                    self.report(&Error::PageNumberMismatch { vda });
                    success = false;
                    continue;
                }
                if other.serial_number() != label.serial_number() {
                    self.report(&Error::SerialMismatch { vda });
                    success = false;
                    continue;
                }
                // The boot page is exempt from the back-reference test.
                if other.next_rda.get() != rda && vda != 0 {
                    self.report(&Error::LinkBroken { vda });
                    success = false;
                    continue;
                }
            } else {
                if (label.nbytes.get() as usize) < PAGE_DATA_SIZE {
                    self.report(&Error::LeaderShort { vda });
                    success = false;
                    continue;
                }
                if label.file_pgnum.get() != 0 {
                    self.report(&Error::PageNumberMismatch { vda });
                    success = false;
                    continue;
                }
                let slen = page.data[LEADER_FILENAME] as usize;
                if slen == 0 || slen >= FILENAME_LENGTH {
                    self.report(&Error::FilenameInvalid { vda });
                    success = false;
                    continue;
                }
            }

            if label.next_rda.get() != 0 {
                if (label.nbytes.get() as usize) < PAGE_DATA_SIZE {
                    self.report(&Error::ShortPageInMiddle { vda });
                    success = false;
                    continue;
                }

                let Ok(other_vda) = self.geometry().real_to_virtual(label.next_rda.get()) else {
                    self.report(&Error::LinkBroken { vda });
                    success = false;
                    continue;
                };

                let other = &self.pages[other_vda as usize].label;
                if other.file_pgnum.get() != label.file_pgnum.get().wrapping_add(1) {
                    self.report(&Error::PageNumberMismatch { vda });
                    success = false;
                    continue;
                }
                if other.serial_number() != label.serial_number() {
                    self.report(&Error::SerialMismatch { vda });
                    success = false;
                    continue;
                }
                if other.prev_rda.get() != rda && vda != 0 {
                    self.report(&Error::LinkBroken { vda });
                    success = false;
                    continue;
                }
            }
        }

        Ok(success)
    }
}
