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

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "textlog")]
#[command(about = "Append-only text logs for scripts and batch jobs")]
#[command(version)]
pub struct Cli {
    /// Path to config file (defaults to textlog.toml in current directory if it exists)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Diagnostic verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a command and record its output and running time in a log
    Exec {
        /// Log file path (defaults to log_YYYYMMDD.txt)
        #[arg(long)]
        log_file: Option<String>,

        /// Echo messages and captured output to the console
        #[arg(long)]
        echo: bool,

        /// Hold an advisory lock on the log file while writing each block
        #[arg(long)]
        lock_writes: bool,

        /// Do not record the conda package list in the header
        #[arg(long)]
        no_packages: bool,

        /// Program and arguments to run (after `--`)
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Print the environment header a new log would start with
    Env {
        /// Do not query the conda package list
        #[arg(long)]
        no_packages: bool,
    },
}
