use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

use cvrank_core::archive;
use cvrank_core::chunking::{read_resume_dir, Chunker, ChunkingConfig};
use cvrank_core::config::{expand_path, Config, Settings};
use cvrank_core::{CandidateMetadata, CandidateRecord, CandidateSet, QuerySpec, TopN, VectorSpace};
use cvrank_embed::vector_space_from_settings;
use cvrank_engine::ontology::{load_dir, union_labels};
use cvrank_engine::{CellScale, OntologyMatrix, RankRequest, RawTable, ScoringEngine, Strategy};

use crate::{ArchiveArg, BuildMatrixArgs, Cli, CoeArgs, Commands, IngestArgs, MatrixArg};

pub fn run(cli: &Cli) -> Result<()> {
    let config = match &cli.env {
        Some(env) => Config::load_for_env(env)?,
        None => Config::load()?,
    };
    let settings = config.settings()?;

    match &cli.command {
        Commands::Ingest(args) => ingest(&settings, args),
        Commands::Semantic(args) => {
            let set = load_archive(&settings, &args.archive)?;
            let space = vector_space_from_settings(&settings)?;
            let mut query = weighted_query(&args.terms)?;
            let req = request(&settings, args.top.as_deref(), args.category.clone())?;
            let ranking = ScoringEngine::new(&set, &space).rank(Strategy::Semantic, &mut query, &req)?;
            print_json(&ranking)
        }
        Commands::Literal(args) => {
            let set = load_archive(&settings, &args.archive)?;
            let space = vector_space_from_settings(&settings)?;
            let mut query = QuerySpec::literal(args.terms.iter().cloned())?;
            let req = request(&settings, args.top.as_deref(), args.category.clone())?;
            let ranking = ScoringEngine::new(&set, &space).rank(Strategy::Literal, &mut query, &req)?;
            print_json(&ranking)
        }
        Commands::Ontology(args) => {
            let matrix = OntologyMatrix::load(&matrix_path(&settings, &args.matrix))?;
            let set = load_archive(&settings, &args.query.archive)?;
            let space = vector_space_from_settings(&settings)?;
            let mut query = weighted_query(&args.query.terms)?;
            let req = request(&settings, args.query.top.as_deref(), args.query.category.clone())?;
            let ranking = ScoringEngine::new(&set, &space).rank(Strategy::Ontology(&matrix), &mut query, &req)?;
            print_json(&ranking)
        }
        Commands::BuildMatrix(args) => build_matrix(&settings, args),
        Commands::Coe(args) => coe(&settings, args),
        Commands::Labels(args) => {
            if args.matrix.eq_ignore_ascii_case("all") {
                let matrices = load_dir(&settings.matrix_dir())?;
                return print_json(&union_labels(&matrices));
            }
            let matrix = OntologyMatrix::load(&matrix_path(&settings, args))?;
            print_json(&matrix.labels())
        }
        Commands::Info(args) => {
            let set = load_archive(&settings, args)?;
            let rows: Vec<InfoRow> = set
                .iter()
                .map(|r| InfoRow { id: r.id(), name: r.name(), category: r.category(), fragments: r.fragments().len() })
                .collect();
            print_json(&rows)
        }
    }
}

#[derive(Serialize)]
struct InfoRow<'a> {
    id: &'a str,
    name: &'a str,
    category: Option<&'a str>,
    fragments: usize,
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_archive(settings: &Settings, arg: &ArchiveArg) -> Result<CandidateSet> {
    let path = match &arg.archive {
        Some(p) => p.clone(),
        None => archive::latest_in(&settings.archive_dir())?,
    };
    archive::load(&path).with_context(|| format!("loading archive {}", path.display()))
}

fn matrix_path(settings: &Settings, arg: &MatrixArg) -> PathBuf {
    let p = expand_path(&arg.matrix);
    if p.extension().is_some_and(|e| e == "json") {
        p
    } else {
        settings.matrix_dir().join(format!("{}.json", arg.matrix))
    }
}

fn request(settings: &Settings, top: Option<&str>, category: Option<String>) -> Result<RankRequest> {
    let top = match top {
        Some(t) => t.parse::<TopN>()?,
        None => settings.ranking.default_top,
    };
    let mut req = RankRequest::new(top);
    req.category = category;
    Ok(req)
}

/// `term` or `term=weight`; a missing weight is 1.
fn weighted_query(terms: &[String]) -> Result<QuerySpec> {
    let mut pairs = Vec::with_capacity(terms.len());
    for raw in terms {
        let pair = match raw.rsplit_once('=') {
            Some((term, w)) => {
                let weight = w.trim().parse::<f32>().with_context(|| format!("bad weight in '{raw}'"))?;
                (term.to_string(), weight)
            }
            None => (raw.clone(), 1.0),
        };
        pairs.push(pair);
    }
    Ok(QuerySpec::new(pairs)?)
}

fn ingest(settings: &Settings, args: &IngestArgs) -> Result<()> {
    let resumes = read_resume_dir(&args.dir)?;
    if resumes.is_empty() {
        bail!("no .txt resumes under {}", args.dir.display());
    }
    let chunker = Chunker::new(ChunkingConfig {
        max_words: settings.ranking.chunk_words,
        overlap_words: settings.ranking.chunk_overlap_words,
    })?;
    let space: VectorSpace = vector_space_from_settings(settings)?;
    let today = chrono::Local::now().date_naive();

    let pb = ProgressBar::new(resumes.len() as u64);
    pb.set_style(ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} {msg}")?.progress_chars("=> "));

    let mut set = CandidateSet::new();
    for resume in resumes {
        pb.set_message(resume.id.clone());
        let chunks = chunker.chunk(&resume.body);
        let fragments = if chunks.is_empty() { Vec::new() } else { space.embed_batch(&chunks)? };
        if fragments.is_empty() {
            tracing::warn!(id = %resume.id, "resume has no text; it will only be scored literally");
        }
        let metadata = CandidateMetadata {
            name: resume.id.clone(),
            resume_date: Some(today),
            document_name: resume.path.file_name().map(|n| n.to_string_lossy().into_owned()),
            business_line: resume.category.clone(),
            ..CandidateMetadata::default()
        };
        set.push(CandidateRecord::new(resume.id, metadata, resume.body, fragments)?)?;
        pb.inc(1);
    }
    pb.finish_and_clear();

    let out = match &args.out {
        Some(p) => p.clone(),
        None => settings.archive_dir().join(archive::archive_file_name(today)),
    };
    archive::save(&set, &out)?;
    print_json(&serde_json::json!({ "archive": out, "candidates": set.len() }))
}

fn coe(settings: &Settings, args: &CoeArgs) -> Result<()> {
    let matrix = OntologyMatrix::load(&matrix_path(settings, &args.matrix))?;
    let set = load_archive(settings, &args.archive)?;
    let space = vector_space_from_settings(settings)?;
    let req = request(settings, args.top.as_deref(), args.category.clone())?;
    let ranking = ScoringEngine::new(&set, &space).rank_matrix_labels(&matrix, &req)?;
    print_json(&ranking)
}

fn build_matrix(settings: &Settings, args: &BuildMatrixArgs) -> Result<()> {
    let raw = fs::read_to_string(&args.table).with_context(|| format!("reading {}", args.table.display()))?;
    let mut table: RawTable = serde_json::from_str(&raw)?;
    if args.ten_point {
        table.scale = CellScale::TenPoint;
    }
    let space = vector_space_from_settings(settings)?;
    let matrix = OntologyMatrix::build(&args.name, table, &space)?;
    let out = settings.matrix_dir().join(format!("{}.json", args.name));
    matrix.save(&out)?;
    print_json(&serde_json::json!({ "matrix": out, "labels": matrix.labels().len(), "rows": matrix.rows().len() }))
}
