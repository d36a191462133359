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

//! Append-only text log for scripts and batch jobs.
//!
//! A [`TextLogger`] writes a header describing the environment it runs in,
//! then appends timestamped blocks for errors, outputs, messages and timer
//! readings until it is closed.

pub mod clock;
pub mod environment;
pub mod error;
pub mod format;
pub mod logger;

pub use clock::{Clock, ManualClock, SystemClock};
pub use environment::{CaptureOptions, Captured, EnvironmentInfo};
pub use error::{CaptureError, LogError, Result};
pub use logger::{TextLogger, TextLoggerBuilder};
