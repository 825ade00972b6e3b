use anyhow::{anyhow, Context, Result};
use book_finder_api::{config::Config, ml, ml::SentenceEmbedder, models::format_embedding};
use csv::{ReaderBuilder, StringRecord, Trim, Writer};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info};
use std::{env, path::Path};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const EMBEDDING_COLUMN: &str = "embedding";

/// Positions of the columns the embedding text is built from.
#[derive(Debug, PartialEq, Eq)]
struct Columns {
    title: usize,
    author: usize,
    description: usize,
    genre: Option<usize>,
    embedding: Option<usize>,
}

impl Columns {
    fn locate(headers: &StringRecord) -> Result<Self> {
        let find = |names: &[&str]| headers.iter().position(|h| names.contains(&h));
        let require = |names: &[&str]| {
            find(names).ok_or_else(|| anyhow!("input is missing the '{}' column", names[0]))
        };

        Ok(Self {
            title: require(&["title", "book_title", "Title"])?,
            author: require(&["author", "Author"])?,
            description: require(&["description", "Description"])?,
            genre: find(&["genre", "Genre"]),
            embedding: find(&[EMBEDDING_COLUMN]),
        })
    }
}

/// Text embedded for one catalog book. Genre appears twice to weight it.
fn embedding_text(genre: &str, description: &str, author: &str) -> String {
    format!(
        "Genre: {}. Book: {}. Genre: {}. Author: {}.",
        genre, description, genre, author
    )
}

/// Input record with the embedding column set, replacing any existing one.
fn output_record(record: &StringRecord, columns: &Columns, embedding: &[f32]) -> StringRecord {
    let embedding = format_embedding(embedding);
    match columns.embedding {
        Some(position) => record
            .iter()
            .enumerate()
            .map(|(i, field)| if i == position { embedding.as_str() } else { field })
            .collect(),
        None => {
            let mut out = record.clone();
            out.push_field(&embedding);
            out
        }
    }
}

/// Embed every row of `input` and write it, with its embedding, to `output`.
async fn generate(embedder: &dyn SentenceEmbedder, input: &Path, output: &Path) -> Result<usize> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .from_path(input)
        .with_context(|| format!("failed to open {}", input.display()))?;
    let headers = reader.headers()?.clone();
    let columns = Columns::locate(&headers)?;
    let records = reader
        .records()
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to parse input CSV")?;

    let mut writer = Writer::from_path(output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    let mut out_headers = headers.clone();
    if columns.embedding.is_none() {
        out_headers.push_field(EMBEDDING_COLUMN);
    }
    writer.write_record(&out_headers)?;

    let pb = ProgressBar::new(records.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta})"),
    );

    for (index, record) in records.iter().enumerate() {
        let field = |position: usize| record.get(position).unwrap_or_default();
        let title = field(columns.title);
        let text = embedding_text(
            columns.genre.map(field).unwrap_or_default(),
            field(columns.description),
            field(columns.author),
        );

        let embedding = embedder
            .embed(&text)
            .await
            .with_context(|| format!("failed to embed row {} ({})", index + 1, title))?;
        info!("📚 Embedded '{}' ({} dims)", title, embedding.len());

        writer.write_record(&output_record(record, &columns, &embedding))?;
        pb.inc(1);
    }

    writer.flush()?;
    pb.finish_with_message("Done");
    Ok(records.len())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "generate_embeddings=info,book_finder_api=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_level(true),
        )
        .init();

    dotenv::dotenv().ok();

    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        error!("Usage: {} <input.csv> <output.csv>", args[0]);
        std::process::exit(2);
    }
    let (input, output) = (Path::new(&args[1]), Path::new(&args[2]));

    info!("🚀 Generating catalog embeddings");
    info!("📁 Input: {}", input.display());

    let config = Config::load().context("failed to load configuration")?;
    info!("🤖 Loading embedding model ({:?} backend)...", config.model_backend);
    let embedder = ml::load_embedder(&config)
        .await
        .context("failed to load embedding model")?;

    let count = generate(embedder.as_ref(), input, output).await?;
    info!("✅ Wrote {} books to {}", count, output.display());

    Ok(())
}
