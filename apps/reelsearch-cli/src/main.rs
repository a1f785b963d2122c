use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use reelsearch_core::cache::ArtifactStore;
use reelsearch_core::config::{Config, Settings};
use reelsearch_core::data_processor::load_collection;
use reelsearch_core::types::{FusedHit, ScoredHit};
use reelsearch_embed::{get_default_cross_encoder, get_default_embedder};
use reelsearch_hybrid::{
    normalize_scores, FusionMethod, GenerativeJudge, HybridSearchEngine, RerankSignal, RerankStrategy, Reranker,
};
use reelsearch_text::index::{DOCMAP_ARTIFACT, POSTINGS_ARTIFACT};
use reelsearch_text::Normalizer;
use reelsearch_vector::EMBEDDINGS_ARTIFACT;

#[derive(Parser)]
#[command(name = "reelsearch", about = "Hybrid lexical + semantic movie search")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build (or load) the lexical and vector indices.
    Build {
        /// Discard cached artifacts first.
        #[arg(long)]
        force: bool,
    },
    /// BM25-style keyword search.
    Search {
        query: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Embedding similarity search.
    Semantic {
        query: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Min-max normalized weighted blend; alpha 1 is all keyword, 0 all semantic.
    Weighted {
        query: String,
        #[arg(long)]
        alpha: f64,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Reciprocal rank fusion.
    Rrf {
        query: String,
        #[arg(short)]
        k: Option<u32>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// RRF followed by a reranking pass.
    Rerank {
        query: String,
        /// pointwise | listwise | cross_encoder
        #[arg(long, default_value = "listwise")]
        method: String,
        #[arg(short)]
        k: Option<u32>,
        #[arg(long)]
        limit: Option<usize>,
        /// Grade the final list 0-3 with the judge.
        #[arg(long)]
        evaluate: bool,
    },
    /// Min-max normalize a list of scores.
    Normalize {
        #[arg(required = true, allow_negative_numbers = true)]
        scores: Vec<f64>,
    },
    /// Ids of the documents containing a single term.
    Term { term: String },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn normalizer(settings: &Settings) -> anyhow::Result<Normalizer> {
    match settings.data.stopwords_path() {
        Some(path) => Normalizer::from_stopwords_file(&path).with_context(|| format!("stopwords {}", path.display())),
        None => Ok(Normalizer::default()),
    }
}

fn open_engine(settings: &Settings, reranker: Reranker) -> anyhow::Result<HybridSearchEngine> {
    let documents = load_collection(&settings.data.collection_path())?;
    let embedder = Arc::from(get_default_embedder(&settings.models)?);
    let engine = HybridSearchEngine::new(settings.fusion.clone(), reranker);
    engine.load_or_build(settings, &documents, normalizer(settings)?, embedder)?;
    Ok(engine)
}

fn reranker_for(settings: &Settings, strategy: Option<RerankStrategy>, needs_judge: bool) -> anyhow::Result<Reranker> {
    let mut reranker = Reranker::new(settings.rerank.clone());
    if needs_judge || matches!(strategy, Some(RerankStrategy::Pointwise | RerankStrategy::Listwise)) {
        let timeout = Duration::from_millis(settings.rerank.timeout_ms);
        reranker = reranker.with_judge(Arc::new(GenerativeJudge::from_settings(&settings.judge, timeout)?));
    }
    if strategy == Some(RerankStrategy::CrossEncoder) {
        reranker = reranker.with_cross_encoder(Arc::from(get_default_cross_encoder(&settings.models)?));
    }
    Ok(reranker)
}

fn print_scored(engine: &HybridSearchEngine, hits: &[ScoredHit]) -> anyhow::Result<()> {
    if hits.is_empty() {
        println!("No results");
    }
    for hit in hits {
        let title = engine.document(hit.doc_id)?.map(|d| d.title).unwrap_or_default();
        println!("{}. {} (id {}) - score {:.4}", hit.rank, title, hit.doc_id, hit.score);
    }
    Ok(())
}

fn print_fused(engine: &HybridSearchEngine, hits: &[FusedHit]) -> anyhow::Result<()> {
    if hits.is_empty() {
        println!("No results");
    }
    let na = |r: Option<usize>| r.map_or_else(|| "N/A".to_string(), |r| r.to_string());
    for (i, hit) in hits.iter().enumerate() {
        let (title, body) = engine
            .document(hit.doc_id)?
            .map_or_else(|| (format!("#{}", hit.doc_id), String::new()), |d| (d.title, d.body));
        println!("{}. {}", i + 1, title);
        println!("   Fused Score: {:.4}", hit.fused_score);
        match (hit.lexical.and_then(|m| m.normalized), hit.semantic.and_then(|m| m.normalized)) {
            (None, None) => {}
            (l, s) => println!("   BM25: {:.3}, Semantic: {:.3}", l.unwrap_or(0.0), s.unwrap_or(0.0)),
        }
        println!(
            "   BM25 Rank: {}, Semantic Rank: {}",
            na(hit.lexical.map(|m| m.rank)),
            na(hit.semantic.map(|m| m.rank))
        );
        println!("   {}...", body.chars().take(100).collect::<String>());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let settings = Config::load()?.settings()?;
    let limit = |l: Option<usize>| l.unwrap_or(settings.fusion.default_limit);

    match cli.command {
        Command::Normalize { scores } => {
            for s in normalize_scores(&scores) {
                println!("* {s:.4}");
            }
        }
        Command::Build { force } => {
            if force {
                let store = ArtifactStore::new(settings.data.cache_dir());
                for name in [POSTINGS_ARTIFACT, DOCMAP_ARTIFACT, EMBEDDINGS_ARTIFACT] {
                    store.remove(name)?;
                }
                info!(dir = %store.dir().display(), "cleared cached artifacts");
            }
            open_engine(&settings, Reranker::new(settings.rerank.clone()))?;
            println!("✅ Indices ready in {}", settings.data.cache_dir().display());
        }
        Command::Search { query, limit: l } => {
            let engine = open_engine(&settings, Reranker::new(settings.rerank.clone()))?;
            print_scored(&engine, &engine.search_lexical(&query, limit(l))?)?;
        }
        Command::Semantic { query, limit: l } => {
            let engine = open_engine(&settings, Reranker::new(settings.rerank.clone()))?;
            print_scored(&engine, &engine.search_vector(&query, limit(l))?)?;
        }
        Command::Weighted { query, alpha, limit: l } => {
            let engine = open_engine(&settings, Reranker::new(settings.rerank.clone()))?;
            print_fused(&engine, &engine.fuse_weighted(&query, alpha, limit(l))?)?;
        }
        Command::Rrf { query, k, limit: l } => {
            let engine = open_engine(&settings, Reranker::new(settings.rerank.clone()))?;
            let k = k.unwrap_or(settings.fusion.rrf_k);
            print_fused(&engine, &engine.fuse_rrf(&query, k, limit(l))?)?;
        }
        Command::Rerank { query, method, k, limit: l, evaluate } => {
            let strategy: RerankStrategy = method.parse()?;
            let engine = open_engine(&settings, reranker_for(&settings, Some(strategy), evaluate)?)?;
            let k = k.unwrap_or(settings.fusion.rrf_k);
            println!("🔎 Reranking with {strategy}...");
            let outcome = engine.search_and_rerank(&query, FusionMethod::Rrf { k }, Some(strategy), limit(l)).await?;
            if let Some(reason) = &outcome.degraded {
                println!("⚠️  Rerank unavailable, showing fused order: {reason}");
            }
            let grades = if evaluate { Some(engine.evaluate(&query, &outcome.hits).await?) } else { None };
            for (i, hit) in outcome.hits.iter().enumerate() {
                let doc = &hit.candidate.document;
                println!("{}. {} (id {})", i + 1, doc.title, doc.id);
                match hit.signal {
                    RerankSignal::Pointwise(score) => println!("   Rerank Score: {score}/10"),
                    RerankSignal::Listwise { rank } => println!("   Rerank Rank: {rank}"),
                    RerankSignal::CrossEncoder(score) => println!("   Cross Encoder Score: {score:.3}"),
                    RerankSignal::Unjudged => {}
                }
                println!("   RRF Score: {:.4}", hit.candidate.fused.fused_score);
                if let Some(Some(grade)) = grades.as_ref().and_then(|g| g.get(i)) {
                    println!("   Relevance: {grade}/3");
                }
                println!("   {}...", doc.body.chars().take(100).collect::<String>());
            }
        }
        Command::Term { term } => {
            let engine = open_engine(&settings, Reranker::new(settings.rerank.clone()))?;
            let ids = engine.get_documents(&term)?;
            println!("📚 '{term}' appears in {} documents", ids.len());
            for id in ids.iter().take(limit(None)) {
                let title = engine.document(*id)?.map(|d| d.title).unwrap_or_default();
                println!("  {id}: {title}");
            }
        }
    }
    Ok(())
}
