// Copyright (c) 2025 Sean McNamara <smcnam@gmail.com>
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

//! Error types for the text logger.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for logger operations
pub type Result<T> = std::result::Result<T, LogError>;

/// Errors raised by [`TextLogger`](crate::TextLogger) operations.
#[derive(Error, Debug)]
pub enum LogError {
    #[error("This log has been closed. See {} for the log file.", path.display())]
    Closed { path: PathBuf },

    #[error("This log was already closed. See {} for the log file.", path.display())]
    AlreadyClosed { path: PathBuf },

    #[error("No timer has been started. Call start_timer to begin timing a process.")]
    NoActiveTimer,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to write log file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Why a piece of environment metadata is missing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("not applicable in this environment")]
    NotApplicable,

    #[error("{what} could not be determined: {reason}")]
    Failed { what: &'static str, reason: String },
}

impl CaptureError {
    pub fn failed(what: &'static str, reason: impl ToString) -> Self {
        Self::Failed {
            what,
            reason: reason.to_string(),
        }
    }
}
