//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

use crate::config::DEFAULT_CONFIG_PATH;

/// Import CUCM users, devices and lines into the recording database
#[derive(Debug, Parser)]
#[command(name = "axl-importer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML or JSON)
    #[arg(long, value_name = "FILE", env = "AXL_IMPORTER_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Print the configuration with secrets omitted and exit
    #[arg(long)]
    pub show: bool,

    /// Run one directory sync and one call update, then exit
    #[arg(long, alias = "cli")]
    pub once: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["axl-importer"]);
        assert!(!cli.show);
        assert!(!cli.once);
    }

    #[test]
    fn test_flags() {
        let cli = Cli::parse_from(["axl-importer", "--config", "/etc/axl/cfg.yml", "--once"]);
        assert_eq!(cli.config, PathBuf::from("/etc/axl/cfg.yml"));
        assert!(cli.once);

        let cli = Cli::parse_from(["axl-importer", "--show"]);
        assert!(cli.show);
    }

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
