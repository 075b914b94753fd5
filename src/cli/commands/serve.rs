use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use crate::models::Config;
use crate::pipeline::SharedServices;
use crate::server::run_server;
use crate::services::{EmbeddingProvider, OnnxEmbedder, build_index};

#[derive(Debug, Args)]
pub struct ServeArgs {
    #[arg(long, help = "Bind port, overriding the configured value")]
    pub port: Option<u16>,
}

pub async fn handle_serve(args: ServeArgs, mut config: Config) -> Result<()> {
    if let Some(port) = args.port {
        config.service.port = port;
    }
    let config = Arc::new(config);

    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(
        OnnxEmbedder::load(&config.embedding).context("failed to load embedding model")?,
    );
    let index = Arc::new(
        build_index(&config, &embedder, true).context("failed to build vector index")?,
    );

    let services = SharedServices {
        config,
        embedder,
        index,
    };
    run_server(services).await
}
