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

//! Wall-clock sources and the text forms of timestamps and durations.

use chrono::{DateTime, Local, TimeDelta};
use std::fmt::Write;
use std::sync::{Arc, Mutex};

const MICROS_PER_SECOND: i64 = 1_000_000;
const MICROS_PER_DAY: i64 = 86_400 * MICROS_PER_SECOND;

/// Source of the current local time.
pub trait Clock: Send {
    fn now(&self) -> DateTime<Local>;
}

/// The host's wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same instant, so a test can keep one handle and hand
/// another to a logger.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Local>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Local>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, instant: DateTime<Local>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = instant;
    }

    pub fn advance(&self, by: TimeDelta) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// `2025-03-14 09:26:53.123456`
pub fn format_timestamp(instant: &DateTime<Local>) -> String {
    instant.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

/// `log_20250314.txt`
pub fn dated_log_name(instant: &DateTime<Local>) -> String {
    format!("log_{}.txt", instant.format("%Y%m%d"))
}

/// Renders an elapsed duration as `H:MM:SS[.ffffff]`, with a leading
/// `N day(s), ` once it passes 24 hours. Negative spans render as zero.
pub fn format_elapsed(elapsed: TimeDelta) -> String {
    let total = elapsed
        .max(TimeDelta::zero())
        .num_microseconds()
        .unwrap_or(i64::MAX);

    let days = total / MICROS_PER_DAY;
    let rem = total % MICROS_PER_DAY;
    let hours = rem / (3_600 * MICROS_PER_SECOND);
    let minutes = (rem / (60 * MICROS_PER_SECOND)) % 60;
    let seconds = (rem / MICROS_PER_SECOND) % 60;
    let micros = rem % MICROS_PER_SECOND;

    let mut out = String::new();
    if days > 0 {
        let unit = if days == 1 { "day" } else { "days" };
        let _ = write!(out, "{} {}, ", days, unit);
    }
    let _ = write!(out, "{}:{:02}:{:02}", hours, minutes, seconds);
    if micros > 0 {
        let _ = write!(out, ".{:06}", micros);
    }
    out
}
