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

use chrono::{DateTime, Local, TimeDelta};
use fs2::FileExt;
use serde_json::Value;
use std::fmt::{self, Display};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::panic::Location;
use std::path::{Path, PathBuf};
use tracing::{info, trace};

use crate::clock::{dated_log_name, format_elapsed, Clock, SystemClock};
use crate::environment::{CaptureOptions, EnvironmentInfo};
use crate::error::{LogError, Result};
use crate::format;

/// Append-only text log of errors, outputs, messages and timings.
///
/// The file is opened for every block and released before the call
/// returns, so everything written so far survives a crash. One instance is
/// not meant to be shared between threads without an outer lock.
///
/// ```no_run
/// use textlog::TextLogger;
///
/// fn main() -> textlog::Result<()> {
///     let mut log = TextLogger::new("run.log")?;
///     log.start_timer()?;
///     if let Err(e) = std::fs::read_to_string("input.csv") {
///         log.log_error(e)?;
///     }
///     log.end_timer(Some("load finished"))?;
///     log.close()
/// }
/// ```
pub struct TextLogger {
    path: PathBuf,
    closed: bool,
    timer_start: Option<DateTime<Local>>,
    environment: EnvironmentInfo,
    clock: Box<dyn Clock>,
    echo: Box<dyn Write + Send>,
    lock_writes: bool,
}

impl TextLogger {
    /// Create (or truncate) the log at `path` and write the header.
    #[track_caller]
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        Self::builder().path(path).create()
    }

    /// Create `log_YYYYMMDD.txt` in the working directory.
    ///
    /// Use [`TextLoggerBuilder::directory`] to place it elsewhere.
    #[track_caller]
    pub fn with_default_path() -> Result<Self> {
        Self::builder().create()
    }

    pub fn builder() -> TextLoggerBuilder {
        TextLoggerBuilder::default()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn timer_active(&self) -> bool {
        self.timer_start.is_some()
    }

    pub fn environment(&self) -> &EnvironmentInfo {
        &self.environment
    }

    /// Record an error and echo it to the console.
    pub fn log_error(&mut self, error: impl Display) -> Result<()> {
        self.ensure_open()?;
        let text = error.to_string();
        let block = format::error(&self.clock.now(), &text);
        self.append(&block)?;
        self.echo(&text);
        Ok(())
    }

    /// Record the result of an operation. Arrays are written one element
    /// per line under a `list` label.
    pub fn log_output(&mut self, output: impl Into<Value>) -> Result<()> {
        self.ensure_open()?;
        let block = format::output(&self.clock.now(), &output.into());
        self.append(&block)
    }

    /// Record a free-form message. Only string values are accepted.
    pub fn add_message(&mut self, message: impl Into<Value>, printed: bool) -> Result<()> {
        self.ensure_open()?;
        let text = match message.into() {
            Value::String(text) => text,
            other => {
                return Err(LogError::InvalidArgument(format!(
                    "add_message expects a string, got {}",
                    other
                )));
            }
        };

        let block = format::message(&self.clock.now(), &text);
        self.append(&block)?;
        if printed {
            self.echo(&format!("MESSAGE:  {}\n", text));
        }
        Ok(())
    }

    pub fn timestamp(&mut self) -> Result<()> {
        self.ensure_open()?;
        let block = format::timestamp(&self.clock.now());
        self.append(&block)
    }

    /// Start (or restart) the timer.
    pub fn start_timer(&mut self) -> Result<()> {
        self.ensure_open()?;
        let now = self.clock.now();
        trace!(path = %self.path.display(), "timer started");
        self.timer_start = Some(now);
        Ok(())
    }

    /// Write and echo the time elapsed since [`start_timer`](Self::start_timer).
    ///
    /// The timer keeps running: later calls measure from the same start.
    pub fn end_timer(&mut self, message: Option<&str>) -> Result<TimeDelta> {
        self.ensure_open()?;
        let start = self.timer_start.ok_or(LogError::NoActiveTimer)?;
        let elapsed = (self.clock.now() - start).max(TimeDelta::zero());
        let text = format_elapsed(elapsed);

        self.append(&format::elapsed(message, &text))?;
        match message {
            Some(m) => self.echo(&format!("MESSAGE:  {}\nProcessing time:  {}", m, text)),
            None => self.echo(&format!("Processing time:  {}", text)),
        }
        Ok(elapsed)
    }

    /// Write the closing footer. Every later call fails.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Err(LogError::AlreadyClosed {
                path: self.path.clone(),
            });
        }
        self.closed = true;
        let block = format::footer(&self.clock.now());
        self.append(&block)?;
        info!(path = %self.path.display(), "log closed");
        self.echo("Log closed.");
        Ok(())
    }

    /// The package list captured at construction, echoed when present.
    pub fn conda_pkgs(&mut self) -> Result<Option<&str>> {
        self.ensure_open()?;
        if let Ok(packages) = self.environment.packages.clone() {
            self.echo(&packages);
        }
        Ok(self.environment.packages.as_deref().ok())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(LogError::Closed {
                path: self.path.clone(),
            });
        }
        Ok(())
    }

    fn append(&self, block: &str) -> Result<()> {
        self.write_block(block, false)
    }

    fn write_block(&self, block: &str, truncate: bool) -> Result<()> {
        let mut options = OpenOptions::new();
        options.create(true);
        if truncate {
            options.write(true).truncate(true);
        } else {
            options.append(true);
        }

        let file = options.open(&self.path).map_err(|e| self.io_error(e))?;
        let mut writer = BlockWriter::acquire(file, self.lock_writes).map_err(|e| self.io_error(e))?;
        writer.write_block(block).map_err(|e| self.io_error(e))?;
        trace!(path = %self.path.display(), bytes = block.len(), "block written");
        Ok(())
    }

    fn io_error(&self, source: io::Error) -> LogError {
        LogError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn echo(&mut self, text: &str) {
        let _ = writeln!(self.echo, "{}", text);
        let _ = self.echo.flush();
    }
}

impl fmt::Debug for TextLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextLogger")
            .field("path", &self.path)
            .field("closed", &self.closed)
            .field("timer_start", &self.timer_start)
            .field("environment", &self.environment)
            .field("lock_writes", &self.lock_writes)
            .finish_non_exhaustive()
    }
}

/// Open file handle for a single block; the advisory lock, if taken, is
/// released when this is dropped.
struct BlockWriter {
    file: File,
    locked: bool,
}

impl BlockWriter {
    fn acquire(file: File, lock: bool) -> io::Result<Self> {
        if lock {
            file.lock_exclusive()?;
        }
        Ok(Self { file, locked: lock })
    }

    fn write_block(&mut self, block: &str) -> io::Result<()> {
        self.file.write_all(block.as_bytes())?;
        self.file.flush()
    }
}

impl Drop for BlockWriter {
    fn drop(&mut self) {
        if self.locked {
            let _ = FileExt::unlock(&self.file);
        }
    }
}

/// Builder for [`TextLogger`] with injectable environment, clock and console.
#[derive(Default)]
pub struct TextLoggerBuilder {
    path: Option<PathBuf>,
    directory: Option<PathBuf>,
    environment: Option<EnvironmentInfo>,
    capture: CaptureOptions,
    clock: Option<Box<dyn Clock>>,
    echo: Option<Box<dyn Write + Send>>,
    lock_writes: bool,
}

impl TextLoggerBuilder {
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Where the dated default file goes when no explicit path is given.
    pub fn directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.directory = Some(dir.into());
        self
    }

    /// Use this metadata instead of probing the host.
    pub fn environment(mut self, environment: EnvironmentInfo) -> Self {
        self.environment = Some(environment);
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    /// Send console echo somewhere other than stdout.
    pub fn echo_to(mut self, writer: impl Write + Send + 'static) -> Self {
        self.echo = Some(Box::new(writer));
        self
    }

    /// Hold an exclusive advisory lock on the file while each block is written.
    pub fn lock_writes(mut self, lock: bool) -> Self {
        self.lock_writes = lock;
        self
    }

    /// Whether host probing may shell out to list conda packages.
    pub fn capture_packages(mut self, capture: bool) -> Self {
        self.capture.packages = capture;
        self
    }

    /// Whether host probing records the calling source file.
    pub fn record_source_file(mut self, record: bool) -> Self {
        self.capture.source_file = record;
        self
    }

    /// Build root of the calling crate, usually `env!("CARGO_MANIFEST_DIR")`.
    /// Without it only absolute caller locations are recorded.
    pub fn source_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.capture.source_root = Some(root.into());
        self
    }

    #[track_caller]
    pub fn create(self) -> Result<TextLogger> {
        let location = Location::caller();
        let clock = self.clock.unwrap_or_else(|| Box::new(SystemClock));
        let now = clock.now();

        let path = match (self.path, self.directory) {
            (Some(path), _) => path,
            (None, Some(dir)) => dir.join(dated_log_name(&now)),
            (None, None) => PathBuf::from(dated_log_name(&now)),
        };
        let environment = match self.environment {
            Some(environment) => environment,
            None => EnvironmentInfo::capture_with(location, &self.capture),
        };

        let logger = TextLogger {
            path,
            closed: false,
            timer_start: None,
            environment,
            clock,
            echo: self.echo.unwrap_or_else(|| Box::new(io::stdout())),
            lock_writes: self.lock_writes,
        };

        logger.write_block(&format::header(&logger.environment, &now), true)?;
        info!(path = %logger.path.display(), "log initialized");
        Ok(logger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::CaptureError;
    use chrono::TimeZone;
    use serde_json::json;
    use std::fs;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct Fixture {
        _dir: TempDir,
        path: PathBuf,
        clock: ManualClock,
        console: SharedBuffer,
        log: TextLogger,
    }

    impl Fixture {
        fn contents(&self) -> String {
            fs::read_to_string(&self.path).unwrap()
        }
    }

    fn start_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).single().unwrap()
    }

    fn test_env() -> EnvironmentInfo {
        EnvironmentInfo::fixed("textlog-test 0.0", "/usr/bin/app", "/work")
    }

    fn fixture_with(environment: EnvironmentInfo) -> Fixture {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.log");
        let clock = ManualClock::new(start_time());
        let console = SharedBuffer::default();
        let log = TextLogger::builder()
            .path(&path)
            .environment(environment)
            .clock(clock.clone())
            .echo_to(console.clone())
            .create()
            .unwrap();
        Fixture {
            _dir: dir,
            path,
            clock,
            console,
            log,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(test_env())
    }

    #[test]
    fn test_header_written_on_create() {
        let fx = fixture();
        let contents = fx.contents();
        assert!(contents.starts_with("LOG INITIALIZED AT :  2025-06-01 12:00:00.000000\n"));
        assert!(contents.contains("Runtime version: textlog-test 0.0\n"));
        assert!(contents.contains("Executable path: /usr/bin/app\n"));
        assert!(contents.contains("Current working directory: /work\n"));
        assert!(contents.ends_with(&format!("{}\n", "-".repeat(72))));
        assert!(!fx.log.is_closed());
        assert!(!fx.log.timer_active());
    }

    #[test]
    fn test_create_truncates_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("old.log");
        fs::write(&path, "stale contents from a previous run\n").unwrap();

        let _log = TextLogger::builder()
            .path(&path)
            .environment(test_env())
            .echo_to(io::sink())
            .create()
            .unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(!contents.contains("stale contents"));
        assert!(contents.starts_with("LOG INITIALIZED AT :  "));
    }

    #[test]
    fn test_add_message_appends_block() {
        let mut fx = fixture();
        fx.log.add_message("hello", false).unwrap();

        assert!(fx
            .contents()
            .ends_with("\n--- 2025-06-01 12:00:00.000000 ---\nMESSAGE:  hello\n"));
        assert_eq!(fx.console.contents(), "");
    }

    #[test]
    fn test_add_message_printed_echoes() {
        let mut fx = fixture();
        fx.log.add_message("visible", true).unwrap();
        assert_eq!(fx.console.contents(), "MESSAGE:  visible\n\n");
    }

    #[test]
    fn test_add_message_rejects_non_string() {
        let mut fx = fixture();
        let before = fx.contents();

        let err = fx.log.add_message(123, false).unwrap_err();
        assert!(matches!(err, LogError::InvalidArgument(_)));
        assert_eq!(fx.contents(), before);
    }

    #[test]
    fn test_each_call_appends_without_truncating() {
        let mut fx = fixture();
        let mut previous = fx.contents();

        let steps: Vec<Box<dyn Fn(&mut TextLogger) -> Result<()>>> = vec![
            Box::new(|log: &mut TextLogger| log.log_error("disk full")),
            Box::new(|log: &mut TextLogger| log.log_output("result")),
            Box::new(|log: &mut TextLogger| log.add_message("note", false)),
            Box::new(|log: &mut TextLogger| log.timestamp()),
        ];

        for step in steps {
            fx.clock.advance(TimeDelta::seconds(1));
            step(&mut fx.log).unwrap();
            let current = fx.contents();
            assert!(current.starts_with(&previous));
            assert!(current.len() > previous.len());
            previous = current;
        }

        // start_timer writes nothing but must not disturb the file either
        fx.log.start_timer().unwrap();
        assert_eq!(fx.contents(), previous);
    }

    #[test]
    fn test_log_error_writes_and_echoes() {
        let mut fx = fixture();
        let err = io::Error::new(io::ErrorKind::NotFound, "missing input.csv");
        fx.log.log_error(&err).unwrap();

        assert!(fx.contents().ends_with("ERROR:  missing input.csv\n"));
        assert_eq!(fx.console.contents(), "missing input.csv\n");
    }

    #[test]
    fn test_log_output_list() {
        let mut fx = fixture();
        fx.log.log_output(vec!["a", "b", "c"]).unwrap();

        assert!(fx.contents().ends_with("OUTPUT:  list\na\nb\nc\n"));
    }

    #[test]
    fn test_log_output_non_string_value() {
        let mut fx = fixture();
        fx.log.log_output(json!({"rows": 12})).unwrap();
        fx.log.log_output(3.5).unwrap();

        let contents = fx.contents();
        assert!(contents.contains("OUTPUT:  {\"rows\":12}\n"));
        assert!(contents.ends_with("OUTPUT:  3.5\n"));
    }

    #[test]
    fn test_timestamp_twice_gives_two_blocks() {
        let mut fx = fixture();
        fx.log.timestamp().unwrap();
        fx.clock.advance(TimeDelta::minutes(1));
        fx.log.timestamp().unwrap();

        let contents = fx.contents();
        assert_eq!(contents.matches("TIMESTAMP:  ").count(), 2);
        assert_eq!(contents.matches("\n--------------\n").count(), 4);
        assert!(contents.contains("TIMESTAMP:  2025-06-01 12:00:00.000000\n"));
        assert!(contents.contains("TIMESTAMP:  2025-06-01 12:01:00.000000\n"));
    }

    #[test]
    fn test_end_timer_without_start() {
        let mut fx = fixture();
        let err = fx.log.end_timer(None).unwrap_err();
        assert!(matches!(err, LogError::NoActiveTimer));
    }

    #[test]
    fn test_end_timer_with_message() {
        let mut fx = fixture();
        fx.log.start_timer().unwrap();
        fx.clock.advance(TimeDelta::milliseconds(1_500));

        let elapsed = fx.log.end_timer(Some("done")).unwrap();
        assert_eq!(elapsed, TimeDelta::milliseconds(1_500));
        assert!(fx
            .contents()
            .ends_with("\nMESSAGE:  done\nProcessing time:  0:00:01.500000\n"));
        assert_eq!(
            fx.console.contents(),
            "MESSAGE:  done\nProcessing time:  0:00:01.500000\n"
        );
    }

    #[test]
    fn test_end_timer_samples_repeatedly() {
        let mut fx = fixture();
        fx.log.start_timer().unwrap();
        fx.clock.advance(TimeDelta::seconds(2));
        fx.log.end_timer(None).unwrap();
        fx.clock.advance(TimeDelta::seconds(3));
        let second = fx.log.end_timer(None).unwrap();

        assert!(fx.log.timer_active());
        assert_eq!(second, TimeDelta::seconds(5));
        let contents = fx.contents();
        assert!(contents.contains("Processing time:  0:00:02\n"));
        assert!(contents.contains("Processing time:  0:00:05\n"));
    }

    #[test]
    fn test_start_timer_restarts() {
        let mut fx = fixture();
        fx.log.start_timer().unwrap();
        fx.clock.advance(TimeDelta::seconds(10));
        fx.log.start_timer().unwrap();
        fx.clock.advance(TimeDelta::seconds(1));

        assert_eq!(fx.log.end_timer(None).unwrap(), TimeDelta::seconds(1));
    }

    #[test]
    fn test_end_timer_with_system_clock_is_positive() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("timer.log");
        let mut log = TextLogger::builder()
            .path(&path)
            .environment(test_env())
            .echo_to(io::sink())
            .create()
            .unwrap();

        log.start_timer().unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));
        let elapsed = log.end_timer(Some("done")).unwrap();

        assert!(elapsed > TimeDelta::zero());
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("MESSAGE:  done\nProcessing time:  0:00:00."));
    }

    #[test]
    fn test_close_writes_footer_and_blocks_everything() {
        let mut fx = fixture();
        fx.log.start_timer().unwrap();
        fx.clock.advance(TimeDelta::seconds(30));
        fx.log.close().unwrap();

        let closed = fx.contents();
        assert!(closed.ends_with("\n\n--------------\nLOG CLOSED AT: 2025-06-01 12:00:30.000000"));
        assert!(fx.console.contents().ends_with("Log closed.\n"));
        assert!(fx.log.is_closed());

        let log = &mut fx.log;
        assert!(matches!(log.log_error("x"), Err(LogError::Closed { .. })));
        assert!(matches!(log.log_output("x"), Err(LogError::Closed { .. })));
        assert!(matches!(log.add_message("x", true), Err(LogError::Closed { .. })));
        assert!(matches!(log.timestamp(), Err(LogError::Closed { .. })));
        assert!(matches!(log.start_timer(), Err(LogError::Closed { .. })));
        assert!(matches!(log.end_timer(None), Err(LogError::Closed { .. })));
        assert!(matches!(log.conda_pkgs(), Err(LogError::Closed { .. })));
        assert!(matches!(log.close(), Err(LogError::AlreadyClosed { .. })));

        assert_eq!(fx.contents(), closed);
    }

    #[test]
    fn test_closed_error_names_the_file() {
        let mut fx = fixture();
        fx.log.close().unwrap();
        let message = fx.log.timestamp().unwrap_err().to_string();
        assert!(message.contains("has been closed"));
        assert!(message.contains("test.log"));
    }

    #[test]
    fn test_conda_pkgs_returns_captured_list() {
        let mut fx = fixture_with(test_env().with_packages("numpy 2.0\n"));
        assert_eq!(fx.log.conda_pkgs().unwrap(), Some("numpy 2.0\n"));
        assert_eq!(fx.console.contents(), "numpy 2.0\n\n");
        assert!(fx.contents().contains("\nnumpy 2.0\n------"));
    }

    #[test]
    fn test_conda_pkgs_absent() {
        let mut fx = fixture();
        assert_eq!(fx.log.conda_pkgs().unwrap(), None);
        assert_eq!(fx.console.contents(), "");
    }

    #[test]
    fn test_lock_writes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("locked.log");
        let mut log = TextLogger::builder()
            .path(&path)
            .environment(test_env())
            .echo_to(io::sink())
            .lock_writes(true)
            .create()
            .unwrap();

        log.add_message("first", false).unwrap();
        log.add_message("second", false).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("MESSAGE:  first\n"));
        assert!(contents.ends_with("MESSAGE:  second\n"));
    }

    #[test]
    fn test_unwritable_path_is_io_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing-dir").join("x.log");
        let err = TextLogger::builder()
            .path(&path)
            .environment(test_env())
            .create()
            .unwrap_err();
        assert!(matches!(err, LogError::Io { .. }));
    }

    #[test]
    fn test_default_path_is_dated() {
        let midnight_eve = Local.with_ymd_and_hms(1999, 12, 31, 23, 0, 0).single().unwrap();
        let clock = ManualClock::new(midnight_eve);
        let dir = TempDir::new().unwrap();
        let log = TextLogger::builder()
            .directory(dir.path())
            .environment(test_env())
            .clock(clock)
            .echo_to(io::sink())
            .create()
            .unwrap();

        assert_eq!(log.path(), dir.path().join("log_19991231.txt"));
        assert!(log.path().is_file());
    }

    #[test]
    fn test_probed_environment_names_caller() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("probe.log");
        let log = TextLogger::builder()
            .path(&path)
            .capture_packages(false)
            .source_root(env!("CARGO_MANIFEST_DIR"))
            .echo_to(io::sink())
            .create()
            .unwrap();

        let source = log.environment().source_file.clone().unwrap();
        assert!(source.is_absolute());
        assert!(source.ends_with("src/logger.rs"));
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains(&format!("File path: {}\n", source.display())));
    }

    #[test]
    fn test_probed_environment_without_source_root_omits_file_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("probe.log");
        let log = TextLogger::builder()
            .path(&path)
            .capture_packages(false)
            .echo_to(io::sink())
            .create()
            .unwrap();

        assert_eq!(log.environment().source_file, Err(CaptureError::NotApplicable));
        let contents = fs::read_to_string(&path).unwrap();
        assert!(!contents.contains("File path: "));
    }
}
