//! Kernel log sources.

use crate::config::LogConfig;
use crate::error::{Error, Result};
use chrono::{DateTime, Local, TimeDelta};
use log::debug;
use std::path::Path;

/// One kernel log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub message: String,
    /// syslog priority, when the source reports one.
    pub priority: Option<u8>,
}

impl LogEntry {
    /// Parse one log line. A raw `<N>` syslog prefix becomes the priority,
    /// and a leading ISO timestamp (`dmesg --time-format=iso`) is dropped.
    pub fn parse(line: &str) -> Self {
        if let Some(rest) = line.strip_prefix('<')
            && let Some((level, message)) = rest.split_once('>')
            && !level.is_empty()
            && level.bytes().all(|b| b.is_ascii_digit())
            && let Ok(level) = level.parse::<u32>()
        {
            return Self {
                message: strip_iso_timestamp(message).to_string(),
                priority: Some((level & 7) as u8),
            };
        }
        Self {
            message: strip_iso_timestamp(line).to_string(),
            priority: None,
        }
    }
}

/// Remove a leading `2025-03-01T12:00:21,123456+01:00` timestamp.
fn strip_iso_timestamp(line: &str) -> &str {
    let Some((stamp, rest)) = line.split_once(' ') else {
        return line;
    };
    let b = stamp.as_bytes();
    let is_iso = b.len() >= 19
        && b[..4].iter().all(u8::is_ascii_digit)
        && b[4] == b'-'
        && b[7] == b'-'
        && b[10] == b'T'
        && b[13] == b':';
    if is_iso { rest.trim_start() } else { line }
}

pub trait KernelLog {
    /// Short provider name for diagnostics.
    fn name(&self) -> &'static str;

    /// Rewind to the start of the current boot.
    fn seek(&mut self) -> Result<()>;

    /// Skip ahead to entries logged after `since` (or to the end of the log).
    fn seek_tail(&mut self, since: Option<DateTime<Local>>) -> Result<()>;

    /// All entries from the current position.
    fn entries(&self) -> Vec<LogEntry>;
}

/// A kernel log saved to a file.
#[derive(Debug)]
pub struct InputFile {
    buffer: String,
}

impl InputFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let buffer =
            std::fs::read_to_string(&path).map_err(|e| Error::LogRead { path, source: e })?;
        Ok(Self { buffer })
    }
}

impl KernelLog for InputFile {
    fn name(&self) -> &'static str {
        "file"
    }

    fn seek(&mut self) -> Result<()> {
        Ok(())
    }

    fn seek_tail(&mut self, _since: Option<DateTime<Local>>) -> Result<()> {
        Ok(())
    }

    fn entries(&self) -> Vec<LogEntry> {
        self.buffer.lines().map(LogEntry::parse).collect()
    }
}

/// Runs an external program and returns its stdout.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<String>;
}

#[derive(Debug, Default)]
pub struct SystemCommand;

impl CommandRunner for SystemCommand {
    fn run(&self, program: &str, args: &[String]) -> Result<String> {
        let output = std::process::Command::new(program)
            .args(args)
            .output()
            .map_err(|e| Error::Command {
                program: program.to_string(),
                detail: e.to_string(),
            })?;
        if !output.status.success() {
            return Err(Error::Command {
                program: program.to_string(),
                detail: format!(
                    "{}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

const DMESG: &str = "dmesg";

/// The kernel ring buffer as read by `dmesg`.
pub struct Dmesg {
    runner: Box<dyn CommandRunner>,
    command: Vec<String>,
    since_support: bool,
    since_fuzz: TimeDelta,
    buffer: String,
    seeked: bool,
}

impl Dmesg {
    pub fn new(config: &LogConfig) -> Result<Self> {
        Self::with_runner(Box::new(SystemCommand), config)
    }

    pub fn with_runner(runner: Box<dyn CommandRunner>, config: &LogConfig) -> Result<Self> {
        let help = runner.run(DMESG, &["-h".to_string()])?;
        let since_support = help.lines().any(|l| l.contains("--since"));
        debug!("dmesg since support: {}", since_support);

        let mut dmesg = Self {
            runner,
            command: vec!["-r".to_string(), "-t".to_string(), "-k".to_string()],
            since_support,
            since_fuzz: TimeDelta::seconds(config.since_fuzz_secs as i64),
            buffer: String::new(),
            seeked: false,
        };
        dmesg.refresh_head()?;
        Ok(dmesg)
    }

    fn refresh_head(&mut self) -> Result<()> {
        self.seeked = false;
        self.buffer = self.runner.run(DMESG, &self.command)?;
        Ok(())
    }
}

impl KernelLog for Dmesg {
    fn name(&self) -> &'static str {
        "dmesg"
    }

    fn seek(&mut self) -> Result<()> {
        if self.seeked {
            self.refresh_head()?;
        }
        Ok(())
    }

    fn seek_tail(&mut self, since: Option<DateTime<Local>>) -> Result<()> {
        let Some(since) = since else {
            return Ok(());
        };
        let mut args = self.command.clone();
        if self.since_support {
            // dmesg timestamps drift, so look a little further back
            let fuzz = since - self.since_fuzz;
            args.push("--time-format=iso".to_string());
            args.push(format!("--since={}", fuzz.format("%Y-%m-%dT%H:%M:%S")));
        }
        self.buffer = self.runner.run(DMESG, &args)?;
        self.seeked = self.since_support;
        Ok(())
    }

    fn entries(&self) -> Vec<LogEntry> {
        self.buffer.lines().map(LogEntry::parse).collect()
    }
}

/// Pick the kernel log source: a saved file if given, otherwise dmesg.
pub fn open(input: Option<&Path>, config: &LogConfig) -> Result<Box<dyn KernelLog>> {
    let log: Box<dyn KernelLog> = match input {
        Some(path) => Box::new(InputFile::open(path)?),
        None => Box::new(Dmesg::new(config)?),
    };
    debug!("Kernel log provider: {}", log.name());
    Ok(log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct FakeDmesg {
        help: String,
        output: String,
        calls: Rc<RefCell<Vec<Vec<String>>>>,
    }

    impl CommandRunner for FakeDmesg {
        fn run(&self, program: &str, args: &[String]) -> Result<String> {
            assert_eq!(program, "dmesg");
            self.calls.borrow_mut().push(args.to_vec());
            if args.first().map(String::as_str) == Some("-h") {
                Ok(self.help.clone())
            } else {
                Ok(self.output.clone())
            }
        }
    }

    fn fake_with_output(
        help: &str,
        output: &str,
        config: &LogConfig,
    ) -> (Dmesg, Rc<RefCell<Vec<Vec<String>>>>) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let runner = FakeDmesg {
            help: help.to_string(),
            output: output.to_string(),
            calls: Rc::clone(&calls),
        };
        let dmesg = Dmesg::with_runner(Box::new(runner), config).unwrap();
        (dmesg, calls)
    }

    fn fake(help: &str) -> (Dmesg, Rc<RefCell<Vec<Vec<String>>>>) {
        fake_with_output(help, "<6>line1\n<6>line2\n", &LogConfig::default())
    }

    #[test]
    fn test_dmesg_initialization() {
        let (dmesg, calls) = fake(" --since <time>  display the lines since\n");
        assert!(dmesg.since_support);
        let calls = calls.borrow();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1], vec!["-r", "-t", "-k"]);
    }

    #[test]
    fn test_dmesg_entries() {
        let (dmesg, _) = fake("");
        assert!(!dmesg.since_support);
        let messages: Vec<String> = dmesg.entries().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["line1", "line2"]);
        assert!(dmesg.entries().iter().all(|e| e.priority == Some(6)));
    }

    #[test]
    fn test_dmesg_priorities() {
        let (dmesg, _) = fake_with_output(
            "",
            "<3>ACPI Error: AE_NOT_FOUND\n<4>ACPI Warning: something odd\n<7>debug chatter\n<14>userspace\n",
            &LogConfig::default(),
        );
        let entries = dmesg.entries();
        assert_eq!(
            entries[0],
            LogEntry {
                message: "ACPI Error: AE_NOT_FOUND".to_string(),
                priority: Some(3),
            }
        );
        assert_eq!(entries[1].priority, Some(4));
        assert_eq!(entries[2].priority, Some(7));
        assert_eq!(entries[3].priority, Some(6));
        assert_eq!(entries[3].message, "userspace");
    }

    #[test]
    fn test_parse_entry() {
        assert_eq!(LogEntry::parse("plain message").priority, None);
        assert_eq!(LogEntry::parse("<x>not a level").message, "<x>not a level");
        assert_eq!(LogEntry::parse("<>empty").priority, None);

        let entry = LogEntry::parse("<6>2025-03-01T12:00:21,123456+01:00 amdgpu: resumed");
        assert_eq!(entry.message, "amdgpu: resumed");
        assert_eq!(entry.priority, Some(6));

        let entry = LogEntry::parse("2025-03-01T12:00:21,123456+01:00 PM: suspend entry");
        assert_eq!(entry.message, "PM: suspend entry");
        assert_eq!(LogEntry::parse("2025 was a year").message, "2025 was a year");
    }

    #[test]
    fn test_dmesg_seek_tail_with_since() {
        let (mut dmesg, calls) = fake("--since");
        let since = Local.with_ymd_and_hms(2025, 3, 1, 12, 0, 30).unwrap();
        dmesg.seek_tail(Some(since)).unwrap();

        let last = calls.borrow().last().cloned().unwrap();
        assert_eq!(
            last,
            vec![
                "-r",
                "-t",
                "-k",
                "--time-format=iso",
                "--since=2025-03-01T12:00:20"
            ]
        );

        // A narrowed buffer is refreshed on seek
        let before = calls.borrow().len();
        dmesg.seek().unwrap();
        assert_eq!(calls.borrow().len(), before + 1);
        dmesg.seek().unwrap();
        assert_eq!(calls.borrow().len(), before + 1);
    }

    #[test]
    fn test_dmesg_seek_tail_uses_configured_fuzz() {
        let config = LogConfig { since_fuzz_secs: 60 };
        let (mut dmesg, calls) = fake_with_output("--since", "", &config);
        let since = Local.with_ymd_and_hms(2025, 3, 1, 12, 0, 30).unwrap();
        dmesg.seek_tail(Some(since)).unwrap();

        let last = calls.borrow().last().cloned().unwrap();
        assert_eq!(last.last().unwrap(), "--since=2025-03-01T11:59:30");
    }

    #[test]
    fn test_dmesg_seek_tail_without_since() {
        let (mut dmesg, calls) = fake("");
        dmesg.seek_tail(None).unwrap();
        assert_eq!(calls.borrow().len(), 2);

        let since = Local.with_ymd_and_hms(2025, 3, 1, 12, 0, 30).unwrap();
        dmesg.seek_tail(Some(since)).unwrap();
        assert_eq!(calls.borrow().last().unwrap(), &vec!["-r", "-t", "-k"]);
    }

    #[test]
    fn test_input_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("kernel.log");
        std::fs::write(&path, "first\n<3>second").unwrap();

        let mut log = InputFile::open(&path).unwrap();
        log.seek().unwrap();
        log.seek_tail(Some(Local::now())).unwrap();
        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "first");
        assert_eq!(entries[1], LogEntry {
            message: "second".to_string(),
            priority: Some(3),
        });
        assert_eq!(log.name(), "file");
    }

    #[test]
    fn test_input_file_missing() {
        let err = InputFile::open("/nonexistent/kernel.log").unwrap_err();
        assert!(matches!(err, Error::LogRead { .. }));
    }
}
