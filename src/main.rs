//! CLI entry point: run a single research query, or start the HTTP
//! ingress with `--serve`.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use deep_research_agent::config::Config;
use deep_research_agent::llm::MistralClient;
use deep_research_agent::scrape::BrowserlessClient;
use deep_research_agent::search::SerperClient;
use deep_research_agent::server::{self, AppState};
use deep_research_agent::{KnowledgeStore, ResearchAgent, ResearchQa};

#[derive(Parser, Debug)]
#[command(
    name = "deep-research-agent",
    version,
    about = "Iterative web research agent: plan, search, scrape, write, review"
)]
struct Args {
    /// The topic to research (omit with --serve)
    #[arg(value_name = "QUERY")]
    query: Option<String>,

    /// Run the HTTP ingress instead of a one-shot query
    #[arg(long)]
    serve: bool,

    /// Chat model override
    #[arg(short = 'm', long, env = "RESEARCH_MODEL")]
    model: Option<String>,

    /// Loop budget override
    #[arg(long)]
    max_loops: Option<u32>,

    /// Enable debug logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut config = Config::from_env()?;
    if let Some(model) = args.model {
        config.model = model;
    }
    if let Some(max_loops) = args.max_loops {
        config.max_loops = max_loops;
    }
    config.validate()?;
    info!(model = %config.model, max_loops = config.max_loops, "Configuration loaded");

    let mistral = Arc::new(MistralClient::new(
        config.mistral_api_key.clone(),
        config.model.clone(),
        config.embed_model.clone(),
    ));
    let store = Arc::new(KnowledgeStore::new(mistral.clone()));
    let agent = Arc::new(ResearchAgent::new(
        mistral.clone(),
        Arc::new(SerperClient::new(config.serper_api_key.clone())),
        Arc::new(BrowserlessClient::new(config.browserless_api_key.clone())),
        store.clone(),
        &config,
    ));
    let qa = Arc::new(ResearchQa::new(mistral, store));

    if args.serve {
        let state = Arc::new(AppState { agent, qa });
        return server::serve(state, &config).await;
    }

    let query = args
        .query
        .context("a research QUERY is required unless --serve is given")?;
    let session_id = Uuid::new_v4().to_string();
    let outcome = agent.run(&query, &session_id).await;

    println!("\n{}", "=".repeat(60));
    println!("RESEARCH REPORT");
    println!("{}\n", "=".repeat(60));
    println!("{}", outcome.report);
    println!("\n{}", "=".repeat(60));
    println!(
        "urls scraped: {} | searches: {} | loops: {} | documents: {}",
        outcome.metadata.urls_scraped,
        outcome.metadata.search_queries_made,
        outcome.metadata.loop_count,
        outcome.metadata.documents_count
    );

    if !outcome.success {
        anyhow::bail!(
            "research failed: {}",
            outcome.error.unwrap_or_else(|| "unknown error".to_string())
        );
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "deep_research_agent=debug,tower_http=debug"
    } else {
        "deep_research_agent=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .with_target(true)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_parse_query() {
        let args = Args::parse_from(["test", "What is a solid-state battery?"]);
        assert_eq!(args.query.as_deref(), Some("What is a solid-state battery?"));
        assert!(!args.serve);
        assert!(!args.verbose);
    }

    #[test]
    fn args_parse_serve_without_query() {
        let args = Args::parse_from(["test", "--serve", "--max-loops", "5"]);
        assert!(args.serve);
        assert!(args.query.is_none());
        assert_eq!(args.max_loops, Some(5));
    }
}
