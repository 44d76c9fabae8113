use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// A resume read from disk before embedding.
#[derive(Debug, Clone)]
pub struct RawResume {
    pub id: String,
    pub path: PathBuf,
    pub category: Option<String>,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    pub max_words: usize,
    pub overlap_words: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { max_words: 96, overlap_words: 38 }
    }
}

/// Splits resume bodies into overlapping fragments, paragraph first.
#[derive(Default)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        if config.max_words == 0 || config.overlap_words >= config.max_words {
            return Err(Error::InvalidConfig(format!(
                "chunk overlap {} must be smaller than the window {}",
                config.overlap_words, config.max_words
            )));
        }
        Ok(Self { config })
    }

    pub fn chunk(&self, body: &str) -> Vec<String> {
        let mut out = Vec::new();
        for paragraph in body.split("\n\n") {
            let words: Vec<&str> = paragraph.split_whitespace().collect();
            if words.is_empty() { continue; }
            if words.len() <= self.config.max_words {
                out.push(words.join(" "));
            } else {
                out.extend(self.windows(&words));
            }
        }
        out
    }

    fn windows(&self, words: &[&str]) -> Vec<String> {
        let step = self.config.max_words - self.config.overlap_words;
        let mut chunks = Vec::new();
        let mut start = 0;
        while start < words.len() {
            let end = (start + self.config.max_words).min(words.len());
            chunks.push(words[start..end].join(" "));
            if end >= words.len() { break; }
            start += step;
        }
        chunks
    }
}

/// Read every `*.txt` resume under `root`. The id is the file stem and the
/// category is the parent directory relative to `root`, if any.
pub fn read_resume_dir(root: &Path) -> Result<Vec<RawResume>> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("txt"))
        .collect();
    files.sort();
    if files.is_empty() {
        tracing::warn!(dir = %root.display(), "no .txt resumes found");
    }
    let mut resumes = Vec::with_capacity(files.len());
    for path in files {
        let body = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(_) => String::from_utf8_lossy(&fs::read(&path)?).to_string(),
        };
        let Some(id) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else { continue };
        let category = path
            .strip_prefix(root)
            .ok()
            .and_then(Path::parent)
            .and_then(Path::to_str)
            .filter(|p| !p.is_empty())
            .map(str::to_string);
        resumes.push(RawResume { id, path, category, body });
    }
    tracing::info!(count = resumes.len(), dir = %root.display(), "resumes read");
    Ok(resumes)
}
