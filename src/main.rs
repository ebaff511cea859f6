//! Rug Sentry - dynamic rug-pull detection for new EVM contracts
//!
//! Polls the configured chain for contract-creation transactions, queues each
//! created contract for invariant testing and prints findings as JSON lines.

use rug_sentry::core::traits::{ChainReader, SourceProvider, TaskProcessor, VerificationEngine};
use rug_sentry::utils::constants::{get_chain_name, APP_NAME, APP_VERSION};
use rug_sentry::{
    AgentConfig, ContractInspector, ExplorerClient, ExplorerSourceProvider, Finding, ForgeRunner,
    RpcProvider, RugPullAgent, TaskPipeline,
};

use eyre::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG overrides the default level
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    println!(
        r#"
    ==============================================================
       {} v{}
       Dynamic invariant testing for freshly deployed contracts
    ==============================================================
    "#,
        APP_NAME, APP_VERSION
    );

    let config = AgentConfig::from_env()?;
    if std::env::var("RPC_URL").is_err() {
        eprintln!("⚠️  WARNING: RPC_URL not set, using {}", config.rpc_url);
        eprintln!("   The same endpoint is used as the forge fork URL.");
        eprintln!();
    }
    if !config.has_explorer_key(config.chain_id) {
        eprintln!(
            "⚠️  WARNING: no explorer API key for {}, source lookups will fail",
            get_chain_name(config.chain_id)
        );
        eprintln!();
    }

    let mut rpc = RpcProvider::new(config.rpc_url.clone(), config.chain_id, config.rpc_timeout)?;
    if let Some(fallback) = &config.fallback_rpc_url {
        rpc = rpc.with_fallback(fallback.clone());
        info!("🔄 Fallback RPC configured");
    }
    let rpc = Arc::new(rpc);
    info!("🔗 RPC: {} ({})", rpc.masked_url(), get_chain_name(config.chain_id));

    let forge = Arc::new(ForgeRunner::new(
        config.forge_bin.clone(),
        config.forge_project_dir.clone(),
        config.rpc_url.clone(),
    ));
    forge.ensure_project()?;

    let explorer = ExplorerClient::new(
        config.explorer_keys.clone(),
        config.https_proxy.as_deref(),
        config.rpc_timeout,
    )?;
    info!("🔍 Explorer keys configured for {} network(s)", explorer.configured_networks().len());

    let sources: Arc<dyn SourceProvider> = Arc::new(ExplorerSourceProvider::new(explorer, forge.clone()));
    let chain: Arc<dyn ChainReader> = rpc.clone();
    let engine: Arc<dyn VerificationEngine> = forge;
    let inspector: Arc<dyn TaskProcessor> = Arc::new(ContractInspector::new(sources, chain, engine));

    let pipeline = Arc::new(TaskPipeline::new(config.queue_idle));
    let agent = RugPullAgent::new(pipeline.clone(), inspector);
    agent.initialize();

    tokio::select! {
        result = watch_blocks(&agent, &rpc, &config) => {
            if let Err(e) = result {
                eprintln!("❌ Error: {}", e);
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            println!("\n\n🛑 Shutting down gracefully...");

            emit(&pipeline.drain_findings());

            let stats = pipeline.stats();
            println!("\n📊 Final Statistics:");
            println!("   Submitted:  {}", stats.submitted);
            println!("   Processed:  {}", stats.processed);
            println!("   Failed:     {}", stats.failed);
            println!("   Findings:   {}", stats.findings);
            println!("   Queued:     {}", stats.queued);
        }
    }

    Ok(())
}

/// Follow the chain head and feed every creation transaction to the agent
async fn watch_blocks(agent: &RugPullAgent, rpc: &RpcProvider, config: &AgentConfig) -> Result<()> {
    let mut next_block = rpc.block_number().await?;
    info!("👀 Watching from block {}", next_block);

    let mut ticker = tokio::time::interval(config.block_poll);
    loop {
        ticker.tick().await;

        let head = match rpc.block_number().await {
            Ok(head) => head,
            Err(e) => {
                warn!("⚠️ Failed to fetch head: {}", e);
                continue;
            }
        };

        while next_block <= head {
            let block = match rpc.get_block_with_txs(next_block).await {
                Ok(Some(block)) => block,
                Ok(None) => break,
                Err(e) => {
                    warn!("⚠️ Failed to fetch block {}: {}", next_block, e);
                    break;
                }
            };

            let events = block.creation_events(rpc.chain_id());
            debug!("📦 Block {}: {} creation(s)", next_block, events.len());
            for event in &events {
                emit(&agent.handle_transaction(event));
            }
            next_block += 1;
        }

        // findings staged while no creation arrived
        emit(&agent.pipeline().drain_findings());
    }
}

fn emit(findings: &[Finding]) {
    for finding in findings {
        info!("{}", finding.summary());
        match serde_json::to_string(finding) {
            Ok(line) => println!("{}", line),
            Err(e) => warn!("⚠️ Failed to serialize finding: {}", e),
        }
    }
}
