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

//! Helpers for laying down hand-built disks in unit tests.

use std::iter::once;

use crate::{
    encode_name, info::LEADER_FILENAME, write_word_be, FileEntry, Filesystem, Geometry,
    SerialNumber, PAGE_DATA_SIZE, SN_DIRECTORY,
};

/// 4 cylinders, 2 heads, 4 sectors: 32 pages.
pub(crate) fn small_fs() -> Filesystem {
    Filesystem::create_default(Geometry::new(4, 2, 4).unwrap()).unwrap()
}

/// Lays down a file: a leader at `leader_vda` carrying `name`, then
/// the given `(vda, nbytes)` data pages chained in order. Returns the
/// file's entry.
pub(crate) fn build_file(
    fs: &mut Filesystem,
    leader_vda: u16,
    name: &str,
    file_id: u16,
    directory: bool,
    chain: &[(u16, usize)],
) -> FileEntry {
    let file_type = if directory { SN_DIRECTORY } else { 0 };
    let version = 1;

    let vdas: Vec<u16> = once(leader_vda)
        .chain(chain.iter().map(|&(vda, _)| vda))
        .collect();
    let sizes: Vec<usize> = once(PAGE_DATA_SIZE)
        .chain(chain.iter().map(|&(_, nbytes)| nbytes))
        .collect();

    for (i, &vda) in vdas.iter().enumerate() {
        let prev_rda = if i == 0 {
            0
        } else {
            fs.geometry().virtual_to_real(vdas[i - 1]).unwrap()
        };
        let next_rda = if i + 1 < vdas.len() {
            fs.geometry().virtual_to_real(vdas[i + 1]).unwrap()
        } else {
            0
        };

        let label = &mut fs.page_mut(vda).unwrap().label;
        label.next_rda.set(next_rda);
        label.prev_rda.set(prev_rda);
        label.unused.set(0);
        label.nbytes.set(sizes[i] as u16);
        label.file_pgnum.set(i as u16);
        label.version.set(version);
        label.sn_type.set(file_type);
        label.sn_id.set(file_id);
    }

    encode_name(
        &mut fs.page_mut(leader_vda).unwrap().data[LEADER_FILENAME..],
        name,
    );

    FileEntry {
        sn: SerialNumber { file_type, file_id },
        version,
        leader_vda,
    }
}

/// Spreads `bytes` over the data pages of a chain laid down by
/// [`build_file`].
pub(crate) fn fill_chain(fs: &mut Filesystem, chain: &[(u16, usize)], bytes: &[u8]) {
    let mut offset = 0;
    for &(vda, nbytes) in chain {
        let take = nbytes.min(bytes.len() - offset);
        fs.page_mut(vda).unwrap().data[..take].copy_from_slice(&bytes[offset..offset + take]);
        offset += take;
    }
}

/// Appends one directory record to `stream`.
pub(crate) fn encode_dir_entry(stream: &mut Vec<u8>, valid: bool, fe: &FileEntry, name: &str) {
    let name_words = (1 + name.len()).div_ceil(2);
    let len_words = 6 + name_words;
    let control = u16::from(valid) << 10 | len_words as u16;

    let start = stream.len();
    stream.resize(start + 2 * len_words, 0);
    let record = &mut stream[start..];
    write_word_be(record, 0, control);
    write_word_be(record, 2, fe.sn.file_type);
    write_word_be(record, 4, fe.sn.file_id);
    write_word_be(record, 6, fe.version);
    write_word_be(record, 10, fe.leader_vda);
    encode_name(&mut record[12..], name);
}
