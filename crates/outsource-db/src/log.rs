// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Sink for the append-only operational log. Every notable action (connect,
/// disconnect, insert success/failure, schema reset) produces one event line.
pub trait EventSink: Send + Sync {
    fn log(&self, event: &str);
}

/// File-backed sink writing `<timestamp>: <message>` lines.
pub struct FileLog {
    file: Mutex<File>,
}

impl FileLog {
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl EventSink for FileLog {
    fn log(&self, event: &str) {
        let Ok(timestamp) = OffsetDateTime::now_utc().format(&Rfc3339) else {
            return;
        };
        let mut file = match self.file.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        // A failed append must not fail the operation being logged.
        let _ = writeln!(file, "{timestamp}: {event}");
    }
}
