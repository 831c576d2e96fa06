//! `chunkit` command line: ingest a document directory into a vector store
//! and retrieve typed text/image passages from it.

pub mod config;
pub mod context;
mod flags;
pub mod providers;

use anyhow::{Context as AnyhowContext, Result};
use chunkit_indexer::IngestStats;
use chunkit_search::{
    passages_from, AnswerPrompt, Persona, RetrievedItem, NO_RELEVANT_CONTENT,
};
use chunkit_vector_store::StoreStats;
use clap::{Args, Parser, Subcommand};
use config::RagConfig;
use context::RagContext;
use flags::{EmbedModeFlag, PersonaFlag, RerankFlag};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "chunkit")]
#[command(about = "Multi-modal document retrieval over a persistent vector store", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Config file (defaults to ./chunkit.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the embedding backend
    #[arg(long, global = true, value_enum)]
    embed_mode: Option<EmbedModeFlag>,

    /// Override the reranker
    #[arg(long, global = true, value_enum)]
    rerank: Option<RerankFlag>,

    /// Override the index directory
    #[arg(long, global = true)]
    index_dir: Option<PathBuf>,

    /// Override the collection name
    #[arg(long, global = true)]
    collection: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the collection from a directory of documents
    Build(IngestArgs),

    /// Add or replace documents from a directory without clearing
    Insert(IngestArgs),

    /// Retrieve the passages most relevant to a question
    Retrieve(RetrieveArgs),

    /// Retrieve, then print the answer prompt for the LLM
    Prompt(PromptArgs),

    /// Show collection statistics
    Stats(JsonArgs),

    /// Remove every chunk from the collection
    Clear(JsonArgs),
}

#[derive(Args)]
struct IngestArgs {
    /// Source directory
    path: PathBuf,

    /// Descend into subdirectories
    #[arg(long)]
    recursive: bool,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct RetrieveArgs {
    /// Question to search for
    query: String,

    /// Number of results
    #[arg(short = 'n', long, default_value_t = 5)]
    top_k: usize,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct PromptArgs {
    query: String,

    #[arg(short = 'n', long, default_value_t = 8)]
    top_k: usize,

    /// Persona template (defaults to the configured one)
    #[arg(long, value_enum)]
    persona: Option<PersonaFlag>,

    /// Ask for a `[NEW_PARAGRAPH]` delimited answer
    #[arg(long)]
    stream: bool,
}

#[derive(Args)]
struct JsonArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

pub async fn main_entry() -> Result<()> {
    let mut cli = Cli::parse();

    // Keep stdout clean for JSON parsing
    let json_output = match &cli.command {
        Commands::Build(args) | Commands::Insert(args) => args.json,
        Commands::Retrieve(args) => args.json,
        Commands::Stats(args) | Commands::Clear(args) => args.json,
        Commands::Prompt(_) => false,
    };
    if json_output {
        cli.quiet = true;
    }
    init_logging(cli.verbose, cli.quiet);

    let mut config = RagConfig::load(cli.config.as_deref())?;
    if let Some(mode) = cli.embed_mode {
        config.embedding.mode = mode.as_domain();
    }
    if let Some(rerank) = cli.rerank {
        config.rerank.mode = rerank.as_domain();
    }
    if let Some(dir) = cli.index_dir.take() {
        config.index_dir = dir;
    }
    if let Some(collection) = cli.collection.take() {
        config.collection = collection;
    }
    if let Commands::Build(args) | Commands::Insert(args) = &cli.command {
        config.ingest.recursive |= args.recursive;
    }
    config.validate()?;

    let ctx = RagContext::init(config)?;

    match cli.command {
        Commands::Build(args) => run_ingest(&ctx, args, true).await?,
        Commands::Insert(args) => run_ingest(&ctx, args, false).await?,
        Commands::Retrieve(args) => run_retrieve(&ctx, args).await?,
        Commands::Prompt(args) => run_prompt(&ctx, args).await?,
        Commands::Stats(args) => run_stats(&ctx, args).await?,
        Commands::Clear(args) => run_clear(&ctx, args).await?,
    }

    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    // HTTP client internals are noisy at debug
    if !verbose {
        builder.filter_module("reqwest", log::LevelFilter::Warn);
    }
    builder.target(env_logger::Target::Stderr).init();
}

async fn run_ingest(ctx: &RagContext, args: IngestArgs, rebuild: bool) -> Result<()> {
    let pipeline = ctx.ingestion();
    let stats = if rebuild {
        pipeline.build(&args.path).await
    } else {
        pipeline.insert(&args.path).await
    }
    .with_context(|| format!("Failed to ingest {}", args.path.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print!("{}", render_ingest(&stats));
    }
    Ok(())
}

async fn run_retrieve(ctx: &RagContext, args: RetrieveArgs) -> Result<()> {
    let items = retrieve(ctx, &args.query, args.top_k).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else if items.is_empty() {
        println!("{NO_RELEVANT_CONTENT}");
    } else {
        print!("{}", render_items(&items));
    }
    Ok(())
}

async fn run_prompt(ctx: &RagContext, args: PromptArgs) -> Result<()> {
    let items = retrieve(ctx, &args.query, args.top_k).await?;
    let persona: Persona = args
        .persona
        .map_or(ctx.config().persona, PersonaFlag::as_domain);
    let passages = passages_from(&items);
    let prompt = AnswerPrompt::build(persona, &args.query, &passages, args.stream);
    println!("{}", prompt.text);
    Ok(())
}

async fn retrieve(ctx: &RagContext, query: &str, top_k: usize) -> Result<Vec<RetrievedItem>> {
    match ctx.retrieval().retrieve(query, top_k).await {
        Ok(items) => Ok(items),
        Err(err) => {
            let message = err.user_message();
            Err(anyhow::Error::new(err).context(message))
        }
    }
}

async fn run_stats(ctx: &RagContext, args: JsonArgs) -> Result<()> {
    let stats = ctx.stats().await;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print!("{}", render_store_stats(&ctx.config().collection, &stats));
    }
    Ok(())
}

async fn run_clear(ctx: &RagContext, args: JsonArgs) -> Result<()> {
    ctx.clear().await?;
    let stats = ctx.stats().await;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("Cleared collection '{}'", ctx.config().collection);
    }
    Ok(())
}

fn render_ingest(stats: &IngestStats) -> String {
    let mut out = format!(
        "Indexed {} documents ({} chunks) and {} images in {} ms\n",
        stats.documents, stats.chunks, stats.images, stats.time_ms
    );
    if stats.skipped > 0 {
        out.push_str(&format!("Skipped {} documents\n", stats.skipped));
    }
    for error in &stats.errors {
        out.push_str(&format!("  error: {error}\n"));
    }
    out
}

fn render_items(items: &[RetrievedItem]) -> String {
    let mut out = String::new();
    for (idx, item) in items.iter().enumerate() {
        if item.is_image() {
            out.push_str(&format!("{}. [image] {}\n   {}\n", idx + 1, item.document, item.source));
        } else {
            out.push_str(&format!("{}. {}\n", idx + 1, item.document));
        }
    }
    out
}

fn render_store_stats(collection: &str, stats: &StoreStats) -> String {
    format!(
        "Collection: {collection}\n  chunks: {} ({} text, {} image)\n  index size: {}\n  next slot: {}\n",
        stats.live, stats.text, stats.image, stats.index_size, stats.next_slot
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn items_render_with_image_source() {
        let items = vec![
            RetrievedItem::text("The gym opens at six."),
            RetrievedItem::image("a campus library photo", "processed_images/a.jpg"),
        ];
        assert_eq!(
            render_items(&items),
            "1. The gym opens at six.\n2. [image] a campus library photo\n   processed_images/a.jpg\n"
        );
    }

    #[test]
    fn ingest_summary_lists_errors() {
        let mut stats = IngestStats::new();
        stats.add_document(3);
        stats.add_skipped();
        stats.add_error("bad.txt: embedding service unavailable".to_string());
        let text = render_ingest(&stats);
        assert!(text.starts_with("Indexed 1 documents (3 chunks) and 0 images"));
        assert!(text.contains("Skipped 1 documents"));
        assert!(text.contains("error: bad.txt"));
    }
}
