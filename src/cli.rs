//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::config::DEFAULT_CONFIG_PATH;

/// Ask questions of your database in plain language and get charts back.
#[derive(Parser, Debug)]
#[command(name = "chartql")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Natural-language question to answer
    #[arg(value_name = "QUESTION")]
    pub question: String,

    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Schema metadata JSON path (overrides config)
    #[arg(long, value_name = "PATH")]
    pub schema: Option<PathBuf>,

    /// Database connection URL (overrides config)
    #[arg(long, value_name = "URL", env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Skip the remote model and use the deterministic fallback generator
    #[arg(long)]
    pub offline: bool,

    /// Emit the full pipeline result as JSON instead of text
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The config file path to use.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_args(args: &[&str]) -> Cli {
        Cli::parse_from(args)
    }

    #[test]
    fn test_parse_question() {
        let cli = parse_args(&["chartql", "How many subscribers signed up in 2024?"]);
        assert_eq!(cli.question, "How many subscribers signed up in 2024?");
        assert!(!cli.offline);
        assert!(!cli.json);
    }

    #[test]
    fn test_parse_flags() {
        let cli = parse_args(&[
            "chartql",
            "total revenue by month",
            "--offline",
            "--json",
            "--schema",
            "meta/schema.json",
            "--database-url",
            "postgres://localhost/telecom",
        ]);
        assert!(cli.offline);
        assert!(cli.json);
        assert_eq!(cli.schema, Some(PathBuf::from("meta/schema.json")));
        assert_eq!(
            cli.database_url.as_deref(),
            Some("postgres://localhost/telecom")
        );
    }

    #[test]
    fn test_config_path_default() {
        let cli = parse_args(&["chartql", "q"]);
        assert_eq!(cli.config_path(), PathBuf::from(DEFAULT_CONFIG_PATH));

        let cli = parse_args(&["chartql", "q", "--config", "/etc/chartql.toml"]);
        assert_eq!(cli.config_path(), PathBuf::from("/etc/chartql.toml"));
    }
}
