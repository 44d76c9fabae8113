use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use cvrank_core::{Error, Result};

use crate::ontology::OntologyMatrix;

/// Scoring strategy chosen per query. The ontology strategy borrows the
/// matrix it ranks against.
#[derive(Debug, Clone, Copy)]
pub enum Strategy<'m> {
    Semantic,
    Literal,
    Ontology(&'m OntologyMatrix),
}

impl Strategy<'_> {
    pub fn kind(&self) -> StrategyKind {
        match self {
            Strategy::Semantic => StrategyKind::Semantic,
            Strategy::Literal => StrategyKind::Literal,
            Strategy::Ontology(_) => StrategyKind::Ontology,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Semantic,
    Literal,
    Ontology,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Semantic => "semantic",
            StrategyKind::Literal => "literal",
            StrategyKind::Ontology => "ontology",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for StrategyKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "semantic" | "dense" => Ok(StrategyKind::Semantic),
            "literal" | "keywords" => Ok(StrategyKind::Literal),
            "ontology" | "matrix" => Ok(StrategyKind::Ontology),
            other => Err(Error::InvalidQuery(format!("unknown strategy '{other}'"))),
        }
    }
}
