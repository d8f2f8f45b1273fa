//! # Parley Console
//!
//! Terminal front-end for the negotiation backend.

use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod commands;

use parley_sdk::{ClientConfig, GatewayClient};

#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(about = "Run and review multi-supplier negotiations", long_about = None)]
#[command(after_help = "Environment:\n  \
    PARLEY_API_BASE_URL  backend address (default http://localhost:5147)\n  \
    RUST_LOG             log filter (default info)")]
struct Cli {
    /// Backend address, overriding PARLEY_API_BASE_URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Check whether the backend is reachable
    Health,

    /// Search the product catalog
    Search {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },

    /// List previous negotiations
    History {
        /// Only show negotiations with this status
        #[arg(long)]
        status: Option<String>,

        /// Words matched against prompts and tactics
        query: Vec<String>,
    },

    /// Reopen a negotiation from history and follow it
    Open { negotiation_id: String },

    /// Start a negotiation and follow it until it finishes
    Negotiate {
        /// Supplier ids, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        suppliers: Vec<String>,

        /// Negotiation tone; repeat for several
        #[arg(long = "tactic")]
        tactics: Vec<String>,

        /// Product the negotiation is about
        #[arg(long)]
        product: Option<String>,

        #[arg(required = true, num_args = 1..)]
        prompt: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match cli.base_url {
        Some(url) => ClientConfig::new(url),
        None => ClientConfig::from_env(),
    };
    let client = GatewayClient::new(config)?;
    debug!(base_url = %client.config().base_url, command = ?cli.command, "Running command");

    match cli.command {
        Command::Health => commands::health(&client).await,
        Command::Search { query } => commands::search(&client, &query.join(" ")).await?,
        Command::History { status, query } => {
            commands::history(&client, commands::history_filter(status, &query)).await
        }
        Command::Open { negotiation_id } => commands::open(client, &negotiation_id).await?,
        Command::Negotiate {
            suppliers,
            tactics,
            product,
            prompt,
        } => {
            let request = commands::negotiation_request(&prompt, suppliers, tactics, product)?;
            commands::negotiate(client, request).await?
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_negotiate() {
        let cli = Cli::try_parse_from([
            "parley",
            "negotiate",
            "--suppliers",
            "s1,s2,s1",
            "--tactic",
            "professional",
            "--tactic",
            "friendly",
            "Request",
            "bulk",
            "pricing",
        ])
        .unwrap();

        assert_eq!(cli.base_url, None);
        assert_eq!(
            cli.command,
            Command::Negotiate {
                suppliers: vec!["s1".into(), "s2".into(), "s1".into()],
                tactics: vec!["professional".into(), "friendly".into()],
                product: None,
                prompt: vec!["Request".into(), "bulk".into(), "pricing".into()],
            }
        );
    }

    #[test]
    fn test_parse_history_and_base_url() {
        let cli = Cli::try_parse_from([
            "parley",
            "history",
            "--status",
            "completed",
            "hoodies",
            "--base-url",
            "http://backend:9000/",
        ])
        .unwrap();

        assert_eq!(cli.base_url.as_deref(), Some("http://backend:9000/"));
        assert_eq!(
            cli.command,
            Command::History {
                status: Some("completed".into()),
                query: vec!["hoodies".into()],
            }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(Cli::try_parse_from(["parley"]).is_err());
        assert!(Cli::try_parse_from(["parley", "negotiate", "no", "suppliers"]).is_err());
        assert!(Cli::try_parse_from(["parley", "negotiate", "--suppliers", "s1"]).is_err());
        assert!(Cli::try_parse_from(["parley", "search"]).is_err());
        assert!(Cli::try_parse_from(["parley", "open"]).is_err());
        assert!(Cli::try_parse_from(["parley", "frobnicate"]).is_err());
    }
}
