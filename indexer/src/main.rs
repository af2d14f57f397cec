use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use picsearch_core::config::DEFAULT_FIELD;
use picsearch_core::persist::{save_index, IndexPaths};
use picsearch_core::{IndexBuilder, SurrogateRecord, SurrogateTable};
use tracing_subscriber::{EnvFilter, fmt};
use walkdir::WalkDir;

use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build an inverted index over image textual surrogates", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from surrogate JSON files or a directory of them
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Output index directory
        #[arg(long)]
        output: String,
        /// Field name the surrogate text is indexed under
        #[arg(long, default_value = DEFAULT_FIELD)]
        field: String,
        /// Use smoothed IDF = ln(1 + N/df) instead of ln(N/df)
        #[arg(long, default_value_t = false)]
        smoothed_idf: bool,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, field, smoothed_idf } => {
            build_index(Path::new(&input), &output, &field, smoothed_idf)
        }
    }
}

fn surrogate_files(input: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && p.extension().and_then(|s| s.to_str()) == Some("json") {
                files.push(p.to_path_buf());
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    } else {
        bail!("input {} does not exist", input.display());
    }
    Ok(files)
}

fn build_index(input: &Path, output: &str, field: &str, smoothed_idf: bool) -> Result<()> {
    let mut builder = IndexBuilder::new(field).smoothed_idf(smoothed_idf);

    for file in surrogate_files(input)? {
        let table = SurrogateTable::load(&file)?;
        // Sort so doc ids (and with them the index's tie order) are reproducible.
        let mut records: Vec<&SurrogateRecord> = table.iter().collect();
        records.sort_by(|a, b| a.image_id.cmp(&b.image_id));
        let mut added = 0usize;
        for record in records {
            if builder.add_image(&record.image_id, &record.url, &record.textual_surrogate) {
                added += 1;
            }
        }
        tracing::info!(file = %file.display(), added, "ingested surrogates");
    }

    if builder.is_empty() {
        tracing::warn!("no surrogates found; writing an empty index");
    }
    let index = builder.finish();
    tracing::info!(num_docs = index.num_docs, num_terms = index.dictionary.len(), "computed weights");

    let created_at = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default();
    save_index(&IndexPaths::new(output), &index, &created_at)?;

    tracing::info!(output, "index build complete");
    Ok(())
}
