//! Event Log
//!
//! Durable, append-only record of everything the relay does on behalf of a
//! caller: one `[<timestamp>] <message>` line per event. Every entry is also
//! mirrored to `tracing`, so disabling persistence still leaves a trace on
//! the console.

use crate::config::LoggingConfig;
use chrono::{DateTime, SecondsFormat, Utc};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Line-oriented event sink
#[derive(Debug)]
pub struct EventLog {
    sink: Option<FileSink>,
}

#[derive(Debug)]
struct FileSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl EventLog {
    /// Open (or create) `path` for appending.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        tracing::debug!("Event log opened at {}", path.display());

        Ok(Self {
            sink: Some(FileSink {
                path: path.to_path_buf(),
                file: Mutex::new(file),
            }),
        })
    }

    /// An event log that only mirrors to `tracing`.
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    pub fn from_config(config: &LoggingConfig) -> io::Result<Self> {
        if config.persist_events {
            Self::open(&config.event_log)
        } else {
            Ok(Self::disabled())
        }
    }

    /// Path of the backing file, if persistence is on.
    pub fn path(&self) -> Option<&Path> {
        self.sink.as_ref().map(|s| s.path.as_path())
    }

    /// Append one event. Write failures are reported through `tracing` and
    /// never reach the caller.
    pub fn record(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        tracing::info!(target: "whatsapp_relay::events", "{}", message);

        let Some(sink) = &self.sink else {
            return;
        };

        let line = format_line(Utc::now(), message);
        let mut file = match sink.file.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = file.write_all(line.as_bytes()) {
            tracing::warn!("Failed to append to {}: {}", sink.path.display(), e);
        }
    }
}

/// Render one log line. Embedded newlines are escaped so each event stays on
/// a single line.
pub fn format_line(timestamp: DateTime<Utc>, message: &str) -> String {
    let escaped = message.replace('\r', "\\r").replace('\n', "\\n");
    format!(
        "[{}] {}\n",
        timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        escaped
    )
}
