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

//! Environment metadata recorded in the log header.
//!
//! [`EnvironmentInfo`] is a plain value: the logger never interrogates the
//! host itself. [`EnvironmentInfo::capture`] is the best-effort probe used
//! when the caller does not inject one. Every probe that can fail is kept
//! as a [`Captured`] so a missing field carries its reason.

use std::env;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

use crate::error::CaptureError;

/// Outcome of probing one piece of environment metadata.
pub type Captured<T> = Result<T, CaptureError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentInfo {
    pub runtime_version: String,
    pub executable: Captured<PathBuf>,
    pub working_dir: Captured<PathBuf>,
    pub source_file: Captured<PathBuf>,
    pub packages: Captured<String>,
}

/// What a host probe may look at.
#[derive(Debug, Clone)]
pub struct CaptureOptions {
    /// Shell out to `conda list` when a conda environment is active.
    pub packages: bool,
    /// Record the calling source file at all.
    pub source_file: bool,
    /// Directory the caller's crate was built from, normally
    /// `env!("CARGO_MANIFEST_DIR")`. Relative caller locations are only
    /// resolved against this directory and its ancestors.
    pub source_root: Option<PathBuf>,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            packages: true,
            source_file: true,
            source_root: None,
        }
    }
}

impl EnvironmentInfo {
    /// Probe the host, including the conda package list when one is active.
    ///
    /// The source file recorded is the caller's when its location is
    /// absolute; see [`CaptureOptions::source_root`] for relative ones.
    #[track_caller]
    pub fn capture() -> Self {
        Self::capture_with(Location::caller(), &CaptureOptions::default())
    }

    /// Like [`capture`](Self::capture) but never shells out for packages.
    #[track_caller]
    pub fn capture_without_packages() -> Self {
        let options = CaptureOptions {
            packages: false,
            ..Default::default()
        };
        Self::capture_with(Location::caller(), &options)
    }

    pub fn capture_with(location: &Location<'_>, options: &CaptureOptions) -> Self {
        let info = Self {
            runtime_version: runtime_version(),
            executable: env::current_exe()
                .map_err(|e| CaptureError::failed("executable path", e)),
            working_dir: env::current_dir()
                .map_err(|e| CaptureError::failed("working directory", e)),
            source_file: if options.source_file {
                resolve_source_file(Path::new(location.file()), options.source_root.as_deref())
            } else {
                Err(CaptureError::NotApplicable)
            },
            packages: if options.packages {
                capture_conda_packages()
            } else {
                Err(CaptureError::NotApplicable)
            },
        };

        for (name, result) in [
            ("executable", info.executable.as_ref().err()),
            ("working_dir", info.working_dir.as_ref().err()),
            ("source_file", info.source_file.as_ref().err()),
            ("packages", info.packages.as_ref().err()),
        ] {
            if let Some(err) = result {
                debug!(field = name, %err, "environment metadata unavailable");
            }
        }

        info
    }

    /// A fixed description, for callers that already know their environment.
    pub fn fixed(
        runtime_version: impl Into<String>,
        executable: impl Into<PathBuf>,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            runtime_version: runtime_version.into(),
            executable: Ok(executable.into()),
            working_dir: Ok(working_dir.into()),
            source_file: Err(CaptureError::NotApplicable),
            packages: Err(CaptureError::NotApplicable),
        }
    }

    pub fn with_source_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_file = Ok(path.into());
        self
    }

    pub fn with_packages(mut self, packages: impl Into<String>) -> Self {
        self.packages = Ok(packages.into());
        self
    }
}

/// Name, version and target of the running build.
pub fn runtime_version() -> String {
    format!(
        "{} {} ({} {})",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        env::consts::OS,
        env::consts::ARCH
    )
}

/// Compile-time locations are never resolved against the working directory:
/// an unrelated file of the same name there must not be recorded.
fn resolve_source_file(file: &Path, source_root: Option<&Path>) -> Captured<PathBuf> {
    if file.is_absolute() {
        return if file.is_file() {
            Ok(file.to_path_buf())
        } else {
            Err(CaptureError::NotApplicable)
        };
    }

    // workspace members report paths relative to the workspace root
    source_root
        .into_iter()
        .flat_map(Path::ancestors)
        .map(|dir| dir.join(file))
        .find(|candidate| candidate.is_file())
        .ok_or(CaptureError::NotApplicable)
}

fn capture_conda_packages() -> Captured<String> {
    let prefix = env::var_os("CONDA_PREFIX").ok_or(CaptureError::NotApplicable)?;

    let output = Command::new("conda")
        .arg("list")
        .arg("-p")
        .arg(&prefix)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .map_err(|e| CaptureError::failed("package list", e))?;

    if !output.status.success() {
        return Err(CaptureError::failed(
            "package list",
            format!("conda list exited with {}", output.status),
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
