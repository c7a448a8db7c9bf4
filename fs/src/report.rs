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

use alto_err::Error;
use log::error;

/// Sink for the diagnostics the engine emits while scanning or
/// mutating a disk. Injected at filesystem construction.
pub trait Reporter {
    fn report(&self, error: &Error);
}

/// Default reporter: writes messages to the standard error stream.
pub struct StderrReporter;

impl Reporter for StderrReporter {
    fn report(&self, error: &Error) {
        eprintln!("fs: {error}");
    }
}

/// Routes diagnostics through the `log` facade.
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&self, error: &Error) {
        error!("{error}");
    }
}
