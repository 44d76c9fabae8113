//! JSON persistence for a whole `CandidateSet`.
//!
//! Archives are named `archive_DD_MM_YYYY.json`; `latest_in` picks the newest
//! by the date in the name, not by file mtime.
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::{CandidateRecord, CandidateSet};

const PREFIX: &str = "archive_";
const EXT: &str = "json";

pub fn archive_file_name(date: NaiveDate) -> String { format!("{PREFIX}{}.{EXT}", date.format("%d_%m_%Y")) }

pub fn save(set: &CandidateSet, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string(set)?;
    fs::write(path, json)?;
    tracing::info!(path = %path.display(), candidates = set.len(), "archive saved");
    Ok(())
}

pub fn load(path: &Path) -> Result<CandidateSet> {
    let raw = fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::NotFound(format!("archive {}", path.display())),
        _ => Error::Io(e),
    })?;
    let records: Vec<CandidateRecord> = serde_json::from_str(&raw)?;
    for r in &records {
        r.validate()?;
    }
    let set = CandidateSet::from_records(records)?;
    tracing::info!(path = %path.display(), candidates = set.len(), "archive loaded");
    Ok(set)
}

fn archive_date(file_name: &str) -> Option<NaiveDate> {
    let stem = file_name.strip_prefix(PREFIX)?.strip_suffix(&format!(".{EXT}"))?;
    NaiveDate::parse_from_str(stem, "%d_%m_%Y").ok()
}

/// The most recent `archive_DD_MM_YYYY.json` directly inside `dir`.
pub fn latest_in(dir: &Path) -> Result<PathBuf> {
    walkdir::WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let date = archive_date(e.file_name().to_str()?)?;
            Some((date, e.into_path()))
        })
        .max_by_key(|(date, _)| *date)
        .map(|(_, path)| path)
        .ok_or_else(|| Error::NotFound(format!("no archive in {}", dir.display())))
}
