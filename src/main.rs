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

mod cli;
mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use commands::{cmd_env, cmd_exec, ExecOptions};
use config::Config;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load config from specified path or default textlog.toml
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("textlog.toml"));
    let config = Config::load(&config_path)?;

    match cli.command {
        Commands::Exec {
            log_file,
            echo,
            lock_writes,
            no_packages,
            command,
        } => {
            let merged_log_file = log_file.or_else(|| config.log_file.clone());
            let merged_echo = Config::merge_with_cli(echo, config.echo, false);
            let merged_lock_writes = Config::merge_with_cli(lock_writes, config.lock_writes, false);
            let merged_capture_packages = if no_packages {
                false
            } else {
                config.capture_packages.unwrap_or(true)
            };

            cmd_exec(
                command,
                ExecOptions {
                    log_file: merged_log_file.map(PathBuf::from),
                    echo: merged_echo,
                    lock_writes: merged_lock_writes,
                    capture_packages: merged_capture_packages,
                },
            )
        }
        Commands::Env { no_packages } => {
            let capture_packages = !no_packages && config.capture_packages.unwrap_or(true);
            cmd_env(capture_packages)
        }
    }
}
