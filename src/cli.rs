use crate::config::CatalogConfig;
use crate::io::OutputFormat;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "intcatalog")]
#[command(about = "Catalog the integer-only functions of a Python corpus", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Root of the Python corpus
    #[arg(short, long)]
    pub path: PathBuf,

    /// Do not require parameter annotations; only the return type is checked
    #[arg(
        long,
        short = 'e',
        visible_alias = "exclude-integer-parameters",
        env = "INTCATALOG_RELAXED"
    )]
    pub relaxed: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "names")]
    pub format: OutputFormat,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Configuration file (defaults to the nearest .intcatalog.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Seed for probe arguments
    #[arg(long)]
    pub seed: Option<u64>,

    /// Wall-clock limit for each probe, in milliseconds
    #[arg(long = "probe-timeout-ms", value_parser = clap::value_parser!(u64).range(1..))]
    pub probe_timeout_ms: Option<u64>,

    /// Increase verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

impl Cli {
    /// Apply command-line overrides on top of file configuration.
    pub fn apply_overrides(&self, mut config: CatalogConfig) -> CatalogConfig {
        if self.relaxed {
            config.strict = false;
        }
        if let Some(seed) = self.seed {
            config.probe.seed = Some(seed);
        }
        if let Some(timeout) = self.probe_timeout_ms {
            config.probe.limits.timeout_ms = timeout;
        }
        config
    }

    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbosity {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["intcatalog", "-p", "corpus"]).unwrap();
        assert_eq!(cli.path, PathBuf::from("corpus"));
        assert!(!cli.relaxed);
        assert_eq!(cli.format, OutputFormat::Names);
        assert_eq!(cli.log_level(), log::LevelFilter::Warn);
    }

    #[test]
    fn test_path_is_required() {
        assert!(Cli::try_parse_from(["intcatalog"]).is_err());
    }

    #[test]
    fn test_exclude_flag_aliases() {
        for flag in ["-e", "--relaxed", "--exclude-integer-parameters"] {
            let cli = Cli::try_parse_from(["intcatalog", "--path", ".", flag]).unwrap();
            assert!(cli.relaxed, "{flag}");
        }
    }

    #[test]
    fn test_overrides_win_over_config() {
        let cli = Cli::try_parse_from([
            "intcatalog",
            "-p",
            ".",
            "-e",
            "--seed",
            "9",
            "--probe-timeout-ms",
            "40",
            "-vv",
        ])
        .unwrap();
        let config = cli.apply_overrides(CatalogConfig::default());
        assert!(!config.strict);
        assert_eq!(config.probe.seed, Some(9));
        assert_eq!(config.probe.limits.timeout_ms, 40);
        assert_eq!(cli.log_level(), log::LevelFilter::Debug);
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        assert!(Cli::try_parse_from(["intcatalog", "-p", ".", "--probe-timeout-ms", "0"]).is_err());
    }
}
