use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::models::SummaryRecord;

pub const EXPORT_FILE_NAME: &str = "emotion_log.csv";
pub const EXPORT_CONTENT_TYPE: &str = "text/csv";

/// Append-only log of summary records for one session.
///
/// Cloning hands out another reference to the same log. The capture loop is
/// the only writer; export requests only read.
#[derive(Clone, Default)]
pub struct SessionLog {
    records: Arc<RwLock<Vec<SummaryRecord>>>,
}

#[derive(Serialize)]
struct CsvRow {
    start_time: String,
    end_time: String,
    dominant_emotion: String,
}

impl From<&SummaryRecord> for CsvRow {
    fn from(record: &SummaryRecord) -> Self {
        Self {
            start_time: record.start_label(),
            end_time: record.end_label(),
            dominant_emotion: record.dominant_emotion.clone(),
        }
    }
}

/// A rendered export, ready to hand to the user.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub file_name: &'static str,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
    pub row_count: usize,
}

impl ExportArtifact {
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create export directory {}", dir.display()))?;
        let path = dir.join(self.file_name);
        fs::write(&path, &self.bytes)
            .with_context(|| format!("failed to write export to {}", path.display()))?;
        Ok(path)
    }
}

impl SessionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, record: SummaryRecord) {
        self.write().push(record);
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn records(&self) -> Vec<SummaryRecord> {
        self.read().clone()
    }

    /// Render the log as CSV. `None` means there is nothing to export yet.
    pub fn export(&self) -> Result<Option<ExportArtifact>> {
        let records = self.read();
        if records.is_empty() {
            return Ok(None);
        }

        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        for record in records.iter() {
            writer
                .serialize(CsvRow::from(record))
                .context("failed to serialize summary record")?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|err| anyhow::anyhow!("failed to flush csv writer: {err}"))?;

        Ok(Some(ExportArtifact {
            file_name: EXPORT_FILE_NAME,
            content_type: EXPORT_CONTENT_TYPE,
            bytes,
            row_count: records.len(),
        }))
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<SummaryRecord>> {
        match self.records.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<SummaryRecord>> {
        match self.records.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
