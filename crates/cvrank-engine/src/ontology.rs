//! Skill-category proficiency matrix.
//!
//! Rows are candidate ids, columns are ontology labels, cells are proficiency
//! on a 1–5 scale with 0 for unknown or not applicable. Each label also owns
//! an embedding so that free-text query terms can be resolved to the nearest
//! column. The matrix is built once and is read-only afterwards.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use cvrank_core::similarity::best_match;
use cvrank_core::types::{validate_id, CandidateId};
use cvrank_core::{Error, Result, VectorSpace};

pub const MAX_PROFICIENCY: u8 = 5;

/// Scale of the numeric cells in a source table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellScale {
    #[default]
    FivePoint,
    /// Values 1–10, rescaled to 1–5 with `round(1 + 4·(x−1)/9)`.
    TenPoint,
}

/// Source table as exported from a spreadsheet: header labels and string cells.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTable {
    pub labels: Vec<String>,
    pub rows: Vec<RawRow>,
    #[serde(default)]
    pub scale: CellScale,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawRow {
    pub id: String,
    pub cells: Vec<String>,
}

/// Clean one spreadsheet cell into a proficiency value.
pub fn clean_cell(raw: &str, scale: CellScale) -> Result<u8> {
    let cell = raw.trim_matches(|c: char| c.is_whitespace() || c == '\u{a0}');
    let value: f32 = match cell {
        "SI" | "si" => 5.0,
        "NO" | "no" => 1.0,
        "" | "NA" | "X" | "N/A" | "nan" | "NaN" | "n/A" | "na" => 0.0,
        other => other
            .replace(',', ".")
            .parse::<f32>()
            .map_err(|_| Error::InvalidRecord(format!("unrecognised matrix cell '{raw}'")))?,
    };
    let value = match scale {
        CellScale::TenPoint if value != 0.0 => (1.0 + 4.0 * (value - 1.0) / 9.0).round(),
        _ => value.round(),
    };
    if !(0.0..=f32::from(MAX_PROFICIENCY)).contains(&value) {
        return Err(Error::InvalidRecord(format!("matrix cell '{raw}' is outside 0..={MAX_PROFICIENCY}")));
    }
    Ok(value as u8)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixRow {
    pub id: CandidateId,
    pub values: Vec<u8>,
}

/// A query term mapped to its nearest ontology label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedTerm {
    pub term: String,
    pub label: String,
    pub column: usize,
    pub similarity: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OntologyMatrix {
    name: String,
    labels: Vec<String>,
    label_embeddings: Vec<Vec<f32>>,
    rows: Vec<MatrixRow>,
}

impl OntologyMatrix {
    /// Clean `table` and embed every label through `space`.
    pub fn build(name: impl Into<String>, table: RawTable, space: &VectorSpace) -> Result<Self> {
        let width = table.labels.len();
        let mut rows = Vec::with_capacity(table.rows.len());
        for row in table.rows {
            if row.cells.len() != width {
                return Err(Error::InvalidRecord(format!(
                    "matrix row '{}' has {} cells for {width} labels",
                    row.id,
                    row.cells.len()
                )));
            }
            let values = row.cells.iter().map(|c| clean_cell(c, table.scale)).collect::<Result<Vec<u8>>>()?;
            rows.push(MatrixRow { id: row.id, values });
        }
        let label_embeddings = space.embed_batch(&table.labels)?;
        let matrix = Self::from_parts(name, table.labels, label_embeddings, rows)?;
        tracing::info!(name = %matrix.name, labels = matrix.labels.len(), rows = matrix.rows.len(), "ontology matrix built");
        Ok(matrix)
    }

    /// Assemble from already-clean parts, checking shape and uniqueness.
    pub fn from_parts(name: impl Into<String>, labels: Vec<String>, label_embeddings: Vec<Vec<f32>>, rows: Vec<MatrixRow>) -> Result<Self> {
        let matrix = Self { name: name.into(), labels, label_embeddings, rows };
        matrix.validate()?;
        Ok(matrix)
    }

    fn validate(&self) -> Result<()> {
        if self.labels.is_empty() {
            return Err(Error::InvalidRecord("matrix has no labels".to_string()));
        }
        if self.label_embeddings.len() != self.labels.len() {
            return Err(Error::InvalidRecord(format!(
                "{} label embeddings for {} labels",
                self.label_embeddings.len(),
                self.labels.len()
            )));
        }
        let dim = self.label_embeddings[0].len();
        if dim == 0 || self.label_embeddings.iter().any(|e| e.len() != dim) {
            return Err(Error::InvalidRecord("label embeddings have inconsistent width".to_string()));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.labels.iter().find(|l| !seen.insert(l.as_str())) {
            return Err(Error::InvalidRecord(format!("duplicate matrix label '{dup}'")));
        }
        let mut ids = HashSet::new();
        for row in &self.rows {
            validate_id(&row.id)?;
            if !ids.insert(row.id.as_str()) {
                return Err(Error::InvalidRecord(format!("duplicate matrix row '{}'", row.id)));
            }
            if row.values.len() != self.labels.len() {
                return Err(Error::InvalidRecord(format!("matrix row '{}' has the wrong width", row.id)));
            }
            if let Some(v) = row.values.iter().find(|v| **v > MAX_PROFICIENCY) {
                return Err(Error::InvalidRecord(format!("matrix row '{}' holds {v}, above {MAX_PROFICIENCY}", row.id)));
            }
        }
        Ok(())
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn labels(&self) -> &[String] { &self.labels }
    pub fn rows(&self) -> &[MatrixRow] { &self.rows }
    pub fn dim(&self) -> usize { self.label_embeddings.first().map_or(0, Vec::len) }

    pub fn value(&self, id: &str, label: &str) -> Option<u8> {
        let col = self.labels.iter().position(|l| l == label)?;
        self.rows.iter().find(|r| r.id == id).map(|r| r.values[col])
    }


    /// Nearest label by cosine. Linear scan in column order; on equal
    /// similarity the earlier column wins.
    pub fn resolve(&self, term: &str, vector: &[f32]) -> Result<ResolvedTerm> {
        if vector.len() != self.dim() {
            return Err(Error::InvalidQuery(format!(
                "term '{term}' has width {}, matrix labels have {}",
                vector.len(),
                self.dim()
            )));
        }
        let (column, similarity) = best_match(vector, self.label_embeddings.iter().map(Vec::as_slice))
            .ok_or_else(|| Error::InvalidRecord("matrix has no labels".to_string()))?;
        tracing::debug!(term, label = %self.labels[column], similarity, "term resolved");
        Ok(ResolvedTerm { term: term.to_string(), label: self.labels[column].clone(), column, similarity })
    }

    /// Resolve each term in order. A label reached by several terms is kept
    /// once, at the position of the first term that reached it.
    pub fn resolve_terms(&self, terms: &[&str], vectors: &[&[f32]]) -> Result<Vec<ResolvedTerm>> {
        let mut out: Vec<ResolvedTerm> = Vec::with_capacity(terms.len());
        for (term, vector) in terms.iter().zip(vectors) {
            let resolved = self.resolve(term, vector)?;
            if out.iter().all(|r| r.column != resolved.column) {
                out.push(resolved);
            }
        }
        Ok(out)
    }

    /// All rows ordered by the given columns, descending, first column as the
    /// primary key. Rows equal on every key keep their table order.
    pub fn sort_rows(&self, columns: &[usize]) -> Vec<&MatrixRow> {
        let mut rows: Vec<&MatrixRow> = self.rows.iter().collect();
        rows.sort_by(|a, b| {
            columns
                .iter()
                .map(|&c| b.values[c].cmp(&a.values[c]))
                .find(|o| *o != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
        rows
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string(self)?)?;
        tracing::info!(name = %self.name, path = %path.display(), "ontology matrix saved");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound(format!("matrix {}", path.display())),
            _ => Error::Io(e),
        })?;
        let matrix: Self = serde_json::from_str(&raw)?;
        matrix.validate()?;
        Ok(matrix)
    }
}

/// Every `*.json` matrix snapshot directly under `dir`, sorted by file name.
pub fn load_dir(dir: &Path) -> Result<Vec<OntologyMatrix>> {
    if !dir.is_dir() {
        return Err(Error::NotFound(format!("matrix directory {}", dir.display())));
    }
    let mut paths: Vec<_> = walkdir::WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && e.path().extension().is_some_and(|x| x == "json"))
        .map(|e| e.into_path())
        .collect();
    paths.sort();
    paths.iter().map(|p| OntologyMatrix::load(p)).collect()
}

/// Labels of all `matrices`, each once, in first-seen order.
pub fn union_labels<'a>(matrices: impl IntoIterator<Item = &'a OntologyMatrix>) -> Vec<String> {
    let mut seen = HashSet::new();
    matrices
        .into_iter()
        .flat_map(|m| m.labels())
        .filter(|l| seen.insert(*l))
        .cloned()
        .collect()
}
