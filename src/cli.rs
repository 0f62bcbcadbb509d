//! CLI definitions for webhelm.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// webhelm CLI.
#[derive(Parser, Debug)]
#[command(name = "webhelm")]
#[command(about = "Resilient browser session host for tool-calling agents")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (defaults to ~/.webhelm/config.toml when present)
    #[arg(short, long, env = "WEBHELM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Browser driver
    #[arg(long, value_enum, default_value_t = Driver::Cdp)]
    pub driver: Driver,

    /// Directory of `<host>.html` pages served by the fixture driver
    #[arg(long)]
    pub fixture_dir: Option<PathBuf>,

    /// Override `browser.headless`
    #[arg(long)]
    pub headless: Option<bool>,

    /// Override `logging.level` (RUST_LOG still wins)
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum Driver {
    /// Chrome DevTools Protocol against a local Chrome, Chromium or Edge
    Cdp,
    /// In-memory pages for dry runs
    Fixture,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["webhelm"]);
        assert_eq!(cli.driver, Driver::Cdp);
        assert!(cli.config.is_none());
        assert!(cli.headless.is_none());
    }

    #[test]
    fn test_fixture_flags() {
        let cli = Cli::parse_from([
            "webhelm",
            "--driver",
            "fixture",
            "--fixture-dir",
            "pages",
            "--headless",
            "false",
            "--log-level",
            "debug",
        ]);
        assert_eq!(cli.driver, Driver::Fixture);
        assert_eq!(cli.fixture_dir, Some(PathBuf::from("pages")));
        assert_eq!(cli.headless, Some(false));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_unknown_driver_rejected() {
        assert!(Cli::try_parse_from(["webhelm", "--driver", "selenium"]).is_err());
    }
}
