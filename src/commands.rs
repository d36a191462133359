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

use anyhow::{Context, Result};
use chrono::Local;
use std::io::{self, Write};
use std::panic::Location;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::{debug, warn};

use textlog::{format, CaptureOptions, EnvironmentInfo, TextLogger};

pub struct ExecOptions {
    pub log_file: Option<PathBuf>,
    pub echo: bool,
    pub lock_writes: bool,
    pub capture_packages: bool,
}

pub fn cmd_exec(command: Vec<String>, options: ExecOptions) -> Result<()> {
    let (program, args) = command.split_first().context("No command given")?;

    // the header should describe the user's run, not this binary's sources
    let mut builder = TextLogger::builder()
        .lock_writes(options.lock_writes)
        .capture_packages(options.capture_packages)
        .record_source_file(false);
    if let Some(path) = &options.log_file {
        builder = builder.path(path);
    }
    let mut log = builder.create().context("Failed to create log file")?;
    println!("Logging to: {}", log.path().display());

    let outcome = record_command(&mut log, program, args, &command.join(" "), options.echo);
    finish_session(&mut log, outcome)
}

/// Runs the child and logs what it did. `Ok(Some(reason))` means the child
/// failed; `Err` means logging itself did.
fn record_command(
    log: &mut TextLogger,
    program: &str,
    args: &[String],
    command_line: &str,
    echo: bool,
) -> Result<Option<String>> {
    log.add_message(format!("Running: {}", command_line), echo)?;
    log.start_timer()?;

    debug!(%program, ?args, "spawning command");
    let failure = match Command::new(program)
        .args(args)
        .stdin(Stdio::inherit())
        .output()
    {
        Ok(output) => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);

            if !stdout.is_empty() {
                log.log_output(lines(&stdout))?;
                if echo {
                    print!("{}", stdout);
                }
            }
            if !stderr.is_empty() {
                log.add_message(format!("{} wrote to stderr", program), false)?;
                log.log_output(lines(&stderr))?;
                if echo {
                    eprint!("{}", stderr);
                }
            }
            let _ = io::stdout().flush();

            if output.status.success() {
                None
            } else {
                Some(format!("{} exited with {}", program, output.status))
            }
        }
        Err(e) => Some(format!("Failed to run {}: {}", program, e)),
    };

    if let Some(reason) = &failure {
        warn!(%reason, "command failed");
        log.log_error(reason)?;
    }
    log.end_timer(Some(&format!("{} finished", program)))?;
    Ok(failure)
}

/// Closes the log whatever happened, then reports the first failure.
fn finish_session(log: &mut TextLogger, outcome: Result<Option<String>>) -> Result<()> {
    if let Err(e) = &outcome {
        warn!(error = %e, "logging interrupted");
        let _ = log.log_error(format!("{:#}", e));
    }
    let closed = log.close();

    match outcome? {
        Some(reason) => anyhow::bail!(reason),
        None => closed.context("Failed to close log"),
    }
}

pub fn cmd_env(capture_packages: bool) -> Result<()> {
    let options = CaptureOptions {
        packages: capture_packages,
        source_file: false,
        source_root: None,
    };
    let environment = EnvironmentInfo::capture_with(Location::caller(), &options);
    print!("{}", format::header(&environment, &Local::now()));
    io::stdout().flush().context("Failed to write to stdout")?;
    Ok(())
}

fn lines(text: &str) -> Vec<String> {
    text.lines().map(str::to_string).collect()
}
