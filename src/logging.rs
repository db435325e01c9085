use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use env_logger::{Builder, Env, Target};
use serde::Serialize;
use tracing_appender::rolling::{RollingFileAppender, Rotation};

use crate::config::LogConfig;

const GENERAL_LOG_PREFIX: &str = "general-log";
const QUALIFIED_LOG_PREFIX: &str = "qualified-wallets";

/// Initialize `env_logger` writing to stdout and the dated general log file.
///
/// `RUST_LOG` overrides the default `info` filter.
pub fn init(config: &LogConfig) -> io::Result<()> {
    fs::create_dir_all(&config.dir)?;
    let tee = TeeWriter {
        stdout: io::stdout(),
        file: general_log_appender(&config.dir)?,
    };

    Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {}: {}",
                Local::now().format("%y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .target(Target::Pipe(Box::new(tee)))
        .try_init()
        .map_err(io::Error::other)
}

fn dated_file_name(prefix: &str) -> String {
    format!("{}-{}.log", prefix, Local::now().format("%Y-%m-%d"))
}

/// `<dir>/general-log.<YYYY-MM-DD>.log`, rotated daily.
pub fn general_log_appender(dir: &Path) -> io::Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(GENERAL_LOG_PREFIX)
        .filename_suffix("log")
        .build(dir)
        .map_err(io::Error::other)
}

struct TeeWriter {
    stdout: io::Stdout,
    file: RollingFileAppender,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stdout.write_all(buf)?;
        // File output is best effort.
        let _ = self.file.write_all(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stdout.flush()?;
        let _ = self.file.flush();
        Ok(())
    }
}

/// JSON-lines record of every qualified wallet.
#[derive(Debug, Clone)]
pub struct QualifiedLog {
    dir: PathBuf,
}

impl QualifiedLog {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    /// Append one record and return the file it was written to.
    pub fn append<T: Serialize>(&self, record: &T) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(dated_file_name(QUALIFIED_LOG_PREFIX));
        let line = serde_json::to_string(record).map_err(io::Error::other)?;
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(file, "{}", line)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_qualified_log_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let sink = QualifiedLog::new(&dir.path().join("logs"));

        let path = sink.append(&json!({"wallet": "A"})).unwrap();
        sink.append(&json!({"wallet": "B"})).unwrap();

        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("qualified-wallets-"));
        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines, vec![r#"{"wallet":"A"}"#, r#"{"wallet":"B"}"#]);
    }

    #[test]
    fn test_general_log_appender_writes_into_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut appender = general_log_appender(dir.path()).unwrap();
        appender.write_all(b"first\n").unwrap();
        appender.write_all(b"second\n").unwrap();
        appender.flush().unwrap();

        let files: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        assert_eq!(files.len(), 1);

        let name = files[0].file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("general-log."));
        assert!(name.ends_with(".log"));
        assert_eq!(fs::read_to_string(&files[0]).unwrap(), "first\nsecond\n");
    }
}
