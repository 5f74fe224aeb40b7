//! Evidence sink
//!
//! Flows attach artifacts (screenshots, response previews, page sources,
//! notes) while they run. Writing evidence never fails a flow: an artifact
//! that cannot be stored is logged and dropped.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::E2eResult;

/// Kind of evidence artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    Text,
    Png,
    Html,
}

impl EvidenceKind {
    fn extension(&self) -> &'static str {
        match self {
            EvidenceKind::Text => "txt",
            EvidenceKind::Png => "png",
            EvidenceKind::Html => "html",
        }
    }
}

/// One stored artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceEntry {
    pub check: String,
    pub name: String,
    pub kind: EvidenceKind,
    pub path: PathBuf,
    pub sha256: String,
    pub bytes: usize,
    pub recorded_at: DateTime<Utc>,
}

/// Notes a flow collects on its way to a verdict
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowOutcome {
    pub notes: Vec<String>,
}

impl FlowOutcome {
    pub fn note(&mut self, note: impl Into<String>) {
        let note = note.into();
        info!("{}", note);
        self.notes.push(note);
    }

    /// A non-fatal absence or anomaly
    pub fn warn(&mut self, note: impl Into<String>) {
        let note = note.into();
        warn!("{}", note);
        self.notes.push(format!("warning: {}", note));
    }

    /// Turn a non-fatal error into a warning note; fatal errors propagate
    pub fn tolerate<T>(&mut self, result: E2eResult<T>) -> E2eResult<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(e) if !e.is_fatal() => {
                self.warn(e.to_string());
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

/// Receiver for evidence produced by checks
pub trait ReportSink: Send + Sync {
    /// Store an artifact; returns where it landed, if it was stored
    fn attach(
        &self,
        check: &str,
        name: &str,
        kind: EvidenceKind,
        content: &[u8],
    ) -> Option<PathBuf>;

    fn attach_text(&self, check: &str, name: &str, text: &str) -> Option<PathBuf> {
        self.attach(check, name, EvidenceKind::Text, text.as_bytes())
    }

    fn attach_png(&self, check: &str, name: &str, png: &[u8]) -> Option<PathBuf> {
        self.attach(check, name, EvidenceKind::Png, png)
    }

    fn attach_html(&self, check: &str, name: &str, html: &str) -> Option<PathBuf> {
        self.attach(check, name, EvidenceKind::Html, html.as_bytes())
    }
}

/// Filesystem-backed sink: `<root>/<check>/<name>.<ext>`
pub struct FsReportSink {
    root: PathBuf,
    entries: Mutex<Vec<EvidenceEntry>>,
}

impl FsReportSink {
    pub fn new(root: impl Into<PathBuf>) -> E2eResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            entries: Mutex::new(Vec::new()),
        })
    }

    /// Entries recorded for one check
    pub fn entries_for(&self, check: &str) -> Vec<EvidenceEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.check == check)
            .cloned()
            .collect()
    }

    /// Write `manifest.json` listing every artifact with its hash
    pub fn write_manifest(&self) -> E2eResult<PathBuf> {
        let path = self.root.join("manifest.json");
        let json = serde_json::to_string_pretty(&*self.entries.lock())?;
        std::fs::write(&path, json)?;
        Ok(path)
    }

    fn store(
        &self,
        check: &str,
        name: &str,
        kind: EvidenceKind,
        content: &[u8],
    ) -> std::io::Result<PathBuf> {
        let dir = self.root.join(sanitize(check));
        std::fs::create_dir_all(&dir)?;

        let mut path = dir.join(format!("{}.{}", sanitize(name), kind.extension()));
        let mut n = 1;
        while path.exists() {
            n += 1;
            path = dir.join(format!("{}-{}.{}", sanitize(name), n, kind.extension()));
        }
        std::fs::write(&path, content)?;
        Ok(path)
    }
}

impl ReportSink for FsReportSink {
    fn attach(
        &self,
        check: &str,
        name: &str,
        kind: EvidenceKind,
        content: &[u8],
    ) -> Option<PathBuf> {
        match self.store(check, name, kind, content) {
            Ok(path) => {
                debug!("Evidence {}/{} -> {}", check, name, path.display());
                self.entries.lock().push(EvidenceEntry {
                    check: check.to_string(),
                    name: name.to_string(),
                    kind,
                    path: path.clone(),
                    sha256: hex::encode(Sha256::digest(content)),
                    bytes: content.len(),
                    recorded_at: Utc::now(),
                });
                Some(path)
            }
            Err(e) => {
                warn!("Could not store evidence {}/{}: {}", check, name, e);
                None
            }
        }
    }
}

fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "unnamed".to_string()
    } else {
        cleaned
    }
}
