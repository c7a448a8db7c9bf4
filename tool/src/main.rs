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

use std::{fs::File, path::PathBuf, process::ExitCode};

use clap::Parser;

use alto_ds_file::FileStorage;
use alto_fs::{Filesystem, Geometry, Scan, ROOT_DIRECTORY_VDA};

#[derive(Parser, Debug)]
#[command(name = "altodump", about = "Inspect and extract files from Xerox Alto disk images")]
struct Cli {
    /// Disk image to operate on
    disk: PathBuf,

    /// Print a summary of the filesystem
    #[arg(short = 's', long)]
    summary: bool,

    /// Extract a given file
    #[arg(short = 'e', long, value_name = "NAME")]
    extract: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("altodump: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let storage = FileStorage::open(&cli.disk).map_err(|error| error.to_string())?;

    let mut fs = Filesystem::create_default(Geometry::DIABLO_31)
        .map_err(|error| error.to_string())?;
    fs.load_image(&storage).map_err(|error| error.to_string())?;
    if !fs.check_integrity().map_err(|error| error.to_string())? {
        return Err("invalid disk image".into());
    }

    if let Some(name) = &cli.extract {
        let fe = fs
            .find_file(name)
            .map_err(|error| format!("could not find `{name}`: {error}"))?;
        let mut output = File::create(name)
            .map_err(|error| format!("could not create `{name}`: {error}"))?;
        fs.extract_file(&fe, &mut output)
            .map_err(|error| format!("could not extract `{name}`: {error}"))?;
        println!("extracted `{name}` successfully");
    }

    if cli.summary {
        print_files(&fs)?;
        println!();
        print_directory(&fs)?;
    }

    Ok(())
}

/// Lists every file reachable by the leader-page scan.
fn print_files(fs: &Filesystem) -> Result<(), String> {
    println!("VDA    FILE_ID  SIZE    FILENAME");
    fs.scan_files(|fe| {
        let info = fs.file_info(fe)?;
        let length = fs.file_length(fe)?;
        println!(
            "{:<6} {:<8} {:<7} {}",
            fe.leader_vda, fe.sn.file_id, length, info.name
        );
        Ok(Scan::Continue)
    })
    .map_err(|error| error.to_string())
}

/// Lists the entries of the root directory.
fn print_directory(fs: &Filesystem) -> Result<(), String> {
    let root = fs
        .file_entry_from_leader_vda(ROOT_DIRECTORY_VDA)
        .map_err(|error| error.to_string())?;

    println!("VDA    FILE_ID  VERSION  TYPE  FILENAME");
    fs.scan_directory(&root, |entry| {
        println!(
            "{:<6} {:<8} {:<8} {:<5} {}",
            entry.fe.leader_vda,
            entry.fe.sn.file_id,
            entry.fe.version,
            if entry.fe.sn.is_directory() { "d" } else { "f" },
            entry.name
        );
        Ok(Scan::Continue)
    })
    .map_err(|error| error.to_string())
}
