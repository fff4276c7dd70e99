// verity/src/cli.rs

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "verity")]
#[command(version)]
#[command(about = "A SQL transformation orchestrator", long_about = None)]
pub struct Cli {
    /// Project directory (defaults to current directory)
    #[arg(long, global = true, default_value = ".")]
    pub project_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum DepsFormat {
    Text,
    Graphviz,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run an explicit set of models and everything downstream of them
    Run {
        /// Model names to run
        #[arg(required = true)]
        models: Vec<String>,

        /// Rebuild targeted models unconditionally, ignoring change detection
        #[arg(long)]
        full_refresh: bool,

        /// `name=value` pairs bound to `$name` references in model SQL
        #[arg(long = "var", value_parser = parse_var)]
        vars: Vec<(String, String)>,
    },

    /// Run every model in the project
    RunAll {
        #[arg(long)]
        full_refresh: bool,

        #[arg(long = "var", value_parser = parse_var)]
        vars: Vec<(String, String)>,
    },

    /// Show what a run would do without executing anything
    Plan {
        /// Restrict the plan to these models and their dependencies (empty: every model)
        models: Vec<String>,

        #[arg(long)]
        full_refresh: bool,

        #[arg(long = "var", value_parser = parse_var)]
        vars: Vec<(String, String)>,
    },

    /// List every model discovered in the project
    List,

    /// Print the dependency graph
    Deps {
        #[arg(long, value_enum, default_value_t = DepsFormat::Text)]
        format: DepsFormat,
    },

    /// Run declared column tests against the warehouse
    Validate,

    /// Re-plan and re-run on every model file change
    Serve {
        #[arg(long)]
        watch: bool,
    },
}

fn parse_var(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected `name=value`, got '{raw}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_models_and_vars() {
        let args = Cli::parse_from([
            "verity",
            "run",
            "revenue",
            "--var",
            "region=EMEA",
            "--full-refresh",
        ]);
        match args.command {
            Commands::Run { models, full_refresh, vars } => {
                assert_eq!(models, vec!["revenue".to_string()]);
                assert!(full_refresh);
                assert_eq!(vars, vec![("region".to_string(), "EMEA".to_string())]);
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn run_requires_at_least_one_model() {
        let result = Cli::try_parse_from(["verity", "run"]);
        assert!(result.is_err());
    }

    #[test]
    fn parses_deps_with_graphviz_format() {
        let args = Cli::parse_from(["verity", "deps", "--format", "graphviz"]);
        match args.command {
            Commands::Deps { format } => assert!(matches!(format, DepsFormat::Graphviz)),
            _ => panic!("expected Deps command"),
        }
    }

    #[test]
    fn parses_run_all() {
        let args = Cli::parse_from(["verity", "run-all"]);
        assert!(matches!(args.command, Commands::RunAll { .. }));
    }
}
