//! Audit/reporting sink: step annotations and attachments for humans.
//!
//! Purely observational. Sink failures are logged and swallowed; reporting
//! must never influence control flow.

use std::fs;
use std::io;
use std::path::PathBuf;

use tracing::{debug, info, warn};

/// Receives step-scoped annotations and a final run log.
pub trait AuditSink: Send + Sync {
    /// A new auditable step began.
    fn step(&self, description: &str);
    /// Attach a named artifact (screenshot, cleaned DOM, ...) to the
    /// current step.
    fn attach(&self, label: &str, mime: &str, bytes: &[u8]);
    /// The accumulated human-readable log of the whole run.
    fn run_log(&self, log: &str);
}

/// Sink that forwards everything to the tracing subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn step(&self, description: &str) {
        info!(target: "audit", step = %description);
    }

    fn attach(&self, label: &str, mime: &str, bytes: &[u8]) {
        debug!(target: "audit", label, mime, size = bytes.len(), "attachment");
    }

    fn run_log(&self, log: &str) {
        info!(target: "audit", "run log:\n{log}");
    }
}

/// Sink that writes attachments and the run log into a directory, one file
/// per artifact with a timestamp prefix.
#[derive(Debug)]
pub struct FsAuditSink {
    dir: PathBuf,
}

impl FsAuditSink {
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn artifact_path(&self, label: &str, extension: &str) -> PathBuf {
        let stamp = chrono::Utc::now().timestamp_millis();
        let safe: String = label
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        self.dir.join(format!("{stamp}_{safe}.{extension}"))
    }

    fn extension_for(mime: &str) -> &'static str {
        match mime {
            "image/png" => "png",
            "text/html" => "html",
            "application/json" => "json",
            _ => "bin",
        }
    }
}

impl AuditSink for FsAuditSink {
    fn step(&self, description: &str) {
        info!(target: "audit", step = %description);
    }

    fn attach(&self, label: &str, mime: &str, bytes: &[u8]) {
        let path = self.artifact_path(label, Self::extension_for(mime));
        if let Err(err) = fs::write(&path, bytes) {
            warn!(target: "audit", ?path, %err, "failed to write attachment");
        }
    }

    fn run_log(&self, log: &str) {
        let path = self.dir.join("run_log.txt");
        if let Err(err) = fs::write(&path, log) {
            warn!(target: "audit", ?path, %err, "failed to write run log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fs_sink_writes_attachments() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FsAuditSink::new(dir.path()).unwrap();
        sink.attach("marked screenshot", "image/png", b"not-a-real-png");
        sink.run_log("step 1\nstep 2");

        let entries: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert!(entries.iter().any(|name| name.ends_with(".png")));
        assert!(entries.iter().any(|name| name == "run_log.txt"));
    }

    #[test]
    fn labels_are_sanitized_for_filenames() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FsAuditSink::new(dir.path()).unwrap();
        let path = sink.artifact_path("before/step: 1", "png");
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(!name.contains('/'));
        assert!(!name.contains(':'));
    }
}
