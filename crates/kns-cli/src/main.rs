mod root;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "kns", version, about = "Kingdom nurturing suite")]
struct Cli {
    /// Workspace root holding the .kns data directory.
    #[arg(long, global = true, env = "KNS_ROOT")]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the .kns data directory with default settings.
    Init,
    /// Run the HTTP server.
    Serve {
        #[arg(long, default_value_t = 8611)]
        port: u16,
        /// Public base URL used in emailed confirmation links.
        #[arg(long)]
        base_url: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let root = root::resolve_root(cli.root)?;

    match cli.command {
        Command::Init => {
            kns_core::workspace::init(&root)?;
            println!(
                "initialized {}",
                kns_core::paths::kns_dir(&root).display()
            );
            Ok(())
        }
        Command::Serve { port, base_url } => {
            // Idempotent: creates the data directory on first run.
            kns_core::workspace::init(&root)?;
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(kns_server::serve(root, port, base_url))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_defaults() {
        let cli = Cli::parse_from(["kns", "serve"]);
        match cli.command {
            Command::Serve { port, base_url } => {
                assert_eq!(port, 8611);
                assert!(base_url.is_none());
            }
            _ => panic!("expected serve"),
        }
    }
}
