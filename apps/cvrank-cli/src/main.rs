//! cvrank - rank resumes against weighted skill queries.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "cvrank", version, about = "Rank resumes by semantic, literal or ontology match")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config environment (`cvrank.<env>.toml`); defaults to RUST_ENV or dev.
    #[arg(long, global = true)]
    pub env: Option<String>,

    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Chunk and embed a directory of `.txt` resumes into a new archive.
    Ingest(IngestArgs),
    /// Rank by embedding similarity. Terms are `term` or `term=weight`.
    Semantic(QueryArgs),
    /// Rank by case-insensitive keyword presence.
    Literal(QueryArgs),
    /// Rank by proficiency under the matrix labels nearest to each term.
    Ontology(OntologyArgs),
    /// Clean a raw skill table and store it as a matrix snapshot.
    BuildMatrix(BuildMatrixArgs),
    /// Rank by every label of a matrix at once, weighted equally.
    Coe(CoeArgs),
    /// List the labels of a matrix, or of every matrix with `--matrix ALL`.
    Labels(MatrixArg),
    /// List the candidates of an archive.
    Info(ArchiveArg),
}

#[derive(Args, Debug)]
pub struct IngestArgs {
    pub dir: PathBuf,
    /// Output archive; defaults to `<archive_dir>/archive_<today>.json`.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ArchiveArg {
    /// Archive to read; defaults to the newest one in `data.archive_dir`.
    #[arg(long)]
    pub archive: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct QueryArgs {
    #[arg(required = true)]
    pub terms: Vec<String>,
    /// `ALL` or a count; defaults to `ranking.default_top`.
    #[arg(long)]
    pub top: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    #[command(flatten)]
    pub archive: ArchiveArg,
}

#[derive(Args, Debug)]
pub struct MatrixArg {
    /// Matrix name under `data.matrix_dir`, or a path to a `.json` snapshot.
    #[arg(long)]
    pub matrix: String,
}

#[derive(Args, Debug)]
pub struct OntologyArgs {
    #[command(flatten)]
    pub matrix: MatrixArg,
    #[command(flatten)]
    pub query: QueryArgs,
}

#[derive(Args, Debug)]
pub struct CoeArgs {
    #[command(flatten)]
    pub matrix: MatrixArg,
    #[arg(long)]
    pub top: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    #[command(flatten)]
    pub archive: ArchiveArg,
}

#[derive(Args, Debug)]
pub struct BuildMatrixArgs {
    /// JSON table: `{"labels": [...], "rows": [{"id": ..., "cells": [...]}]}`.
    pub table: PathBuf,
    #[arg(long)]
    pub name: String,
    /// Cells are scored 1-10 and get rescaled to 1-5.
    #[arg(long)]
    pub ten_point: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match commands::run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(cli: &Cli) {
    if cli.quiet {
        return;
    }
    let filter = match cli.verbose {
        0 => "warn,cvrank=info",
        1 => "info,cvrank=debug",
        _ => "debug,cvrank=trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
