use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use uuid::Uuid;

use crate::models::{Config, ValidatedInputs};
use crate::pipeline::{QaPipeline, SharedServices};
use crate::services::{EmbeddingProvider, OnnxEmbedder, build_index};

#[derive(Debug, Args)]
pub struct AskArgs {
    #[arg(required = true, help = "Question to answer")]
    pub query: String,

    #[arg(long, help = "Model selector (defaults to the configured model)")]
    pub model: Option<String>,

    #[arg(long, help = "Show retrieved context chunks with their scores")]
    pub show_context: bool,
}

pub async fn handle_ask(args: AskArgs, config: Config) -> Result<()> {
    let query = args.query.trim();
    if query.is_empty() {
        anyhow::bail!("query cannot be empty");
    }

    let config = Arc::new(config);
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(
        OnnxEmbedder::load(&config.embedding).context("failed to load embedding model")?,
    );
    let index = Arc::new(
        build_index(&config, &embedder, true).context("failed to build vector index")?,
    );

    let services = SharedServices {
        config: Arc::clone(&config),
        embedder,
        index,
    };

    let inputs = ValidatedInputs {
        user_query: query.to_string(),
        model_id: args
            .model
            .unwrap_or_else(|| config.llm.default_model.clone()),
    };
    let answer_id = Uuid::new_v4().to_string();

    let mut pipeline = QaPipeline::new(services, answer_id, inputs);
    pipeline.prepare()?;
    pipeline.generate().await?;

    if args.show_context {
        for retrieved in pipeline.retrieved_chunks() {
            let score = retrieved
                .score
                .map(|s| format!("{s:.3}"))
                .unwrap_or_else(|| "-".to_string());
            eprintln!(
                "{} {}",
                style(format!("[{score}]")).dim(),
                style(&retrieved.chunk.metadata.path).dim()
            );
            eprintln!("{}", style(&retrieved.chunk.text).dim());
            eprintln!();
        }
    }

    println!("{}", pipeline.response().unwrap_or_default());
    Ok(())
}
