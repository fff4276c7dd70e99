// verity/src/main.rs

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { models, full_refresh, vars } => {
            commands::run::execute(&cli.project_dir, models, full_refresh, vars).await
        }
        Commands::RunAll { full_refresh, vars } => {
            commands::run::execute(&cli.project_dir, Vec::new(), full_refresh, vars).await
        }
        Commands::Plan { models, full_refresh, vars } => {
            commands::plan::execute(&cli.project_dir, models, full_refresh, vars).await
        }
        Commands::List => commands::list::execute(&cli.project_dir).await,
        Commands::Deps { format } => commands::deps::execute(&cli.project_dir, format).await,
        Commands::Validate => commands::validate::execute(&cli.project_dir).await,
        Commands::Serve { watch } => commands::serve::execute(&cli.project_dir, watch).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e:?}");
        std::process::exit(1);
    }

    Ok(())
}
