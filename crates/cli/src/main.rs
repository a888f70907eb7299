use anyhow::Context;
use clap::{Parser, Subcommand};

use bookshelf_kernel::settings::Settings;

#[derive(Debug, Parser)]
#[command(name = "bookshelf", version, about = "Bookshelf service command line")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP service until interrupted
    Serve,
    /// Print a bearer token for ROLE signed with the configured secret
    IssueToken {
        #[arg(long)]
        role: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load().with_context(|| "failed to load bookshelf settings")?;

    match cli.command {
        Command::Serve => {
            bookshelf_telemetry::init(&settings.telemetry)?;
            tracing::info!(env = ?settings.environment, "bookshelf CLI starting service");
            bookshelf_app::app::run(settings).await
        }
        Command::IssueToken { role } => {
            if role.trim().is_empty() {
                anyhow::bail!("role must not be empty");
            }
            let tokens = bookshelf_app::app::token_service(&settings)?;
            let issued = tokens.issue(&role).context("failed to issue token")?;
            println!("{}", issued.token);
            Ok(())
        }
    }
}
