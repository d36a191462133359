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

//! Text layout of every block written to a log file.

use chrono::{DateTime, Local};
use serde_json::Value;
use std::fmt::Write;
use std::path::Path;

use crate::clock::format_timestamp;
use crate::environment::{Captured, EnvironmentInfo};

pub const HEADER_RULE_WIDTH: usize = 72;
pub const SHORT_RULE: &str = "--------------";
pub const UNAVAILABLE: &str = "<unavailable>";

pub fn header(env: &EnvironmentInfo, at: &DateTime<Local>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "LOG INITIALIZED AT :  {}", format_timestamp(at));
    let _ = writeln!(out, "Runtime version: {}", env.runtime_version);
    let _ = writeln!(out, "Executable path: {}", path_or_unavailable(&env.executable));
    let _ = writeln!(
        out,
        "Current working directory: {}",
        path_or_unavailable(&env.working_dir)
    );
    if let Ok(source) = &env.source_file {
        let _ = writeln!(out, "File path: {}", source.display());
    }
    out.push('\n');
    if let Ok(packages) = &env.packages {
        out.push_str(packages);
        if !packages.is_empty() && !packages.ends_with('\n') {
            out.push('\n');
        }
    }
    out.push_str(&"-".repeat(HEADER_RULE_WIDTH));
    out.push('\n');
    out
}

fn path_or_unavailable(path: &Captured<impl AsRef<Path>>) -> String {
    match path {
        Ok(p) => p.as_ref().display().to_string(),
        Err(_) => UNAVAILABLE.to_string(),
    }
}

fn labeled(label: &str, at: &DateTime<Local>, text: &str) -> String {
    format!("\n--- {} ---\n{}:  {}\n", format_timestamp(at), label, text)
}

pub fn error(at: &DateTime<Local>, text: &str) -> String {
    labeled("ERROR", at, text)
}

pub fn message(at: &DateTime<Local>, text: &str) -> String {
    labeled("MESSAGE", at, text)
}

/// Arrays become a `list` block with one element per line; anything else is
/// written inline.
pub fn output(at: &DateTime<Local>, value: &Value) -> String {
    match value {
        Value::Array(items) => {
            let mut out = labeled("OUTPUT", at, "list");
            for item in items {
                out.push_str(&value_text(item));
                out.push('\n');
            }
            out
        }
        other => labeled("OUTPUT", at, &value_text(other)),
    }
}

/// Strings are written raw, everything else in its JSON form.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn timestamp(at: &DateTime<Local>) -> String {
    format!(
        "\n{rule}\nTIMESTAMP:  {}\n{rule}\n",
        format_timestamp(at),
        rule = SHORT_RULE
    )
}

pub fn elapsed(message: Option<&str>, elapsed: &str) -> String {
    match message {
        Some(m) => format!("\nMESSAGE:  {}\nProcessing time:  {}\n", m, elapsed),
        None => format!("\nProcessing time:  {}\n", elapsed),
    }
}

pub fn footer(at: &DateTime<Local>) -> String {
    format!("\n\n{}\nLOG CLOSED AT: {}", SHORT_RULE, format_timestamp(at))
}
