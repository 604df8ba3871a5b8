use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "radiko",
    about = "Radiko timefree downloader: device auth, header rules and AAC assembly",
    version,
    author
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format for reports
    #[arg(short, long, global = true, default_value = "pretty")]
    pub output: OutputFormat,

    /// Proxy URL (supports http, https, socks5)
    #[arg(long, global = true)]
    pub proxy: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the cached credential and active header rules
    Status,

    /// Discard the cached token and authenticate again
    Reauth,

    /// Set the preferred area and re-authenticate for it
    Area {
        /// Area code, JP01 to JP47
        area_id: String,
    },

    /// List known area codes
    Areas,

    /// Download a timefree programme as AAC
    Download {
        /// A radiko.jp timefree page URL (#!/ts/<STATION>/<YYYYMMDDHHMMSS>)
        #[arg(short, long, conflicts_with_all = ["station", "start"])]
        url: Option<String>,

        /// Station id, e.g. TBS
        #[arg(short, long, requires = "start")]
        station: Option<String>,

        /// Start time, YYYYMMDDHHMMSS
        #[arg(long)]
        start: Option<String>,

        /// End time, YYYYMMDDHHMMSS (defaults to start + 60 minutes for page URLs)
        #[arg(long)]
        end: Option<String>,

        /// Output directory
        #[arg(short = 'O', long)]
        output_dir: Option<PathBuf>,

        /// Parallel segment downloads
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Print the timefree playlist URL for a range
    StreamUrl {
        #[arg(short, long)]
        station: String,

        #[arg(long)]
        start: String,

        #[arg(long)]
        end: String,
    },

    /// List header rules, optionally only those applied to a URL
    Rules {
        /// Show the headers a request to this URL would receive
        #[arg(long = "match")]
        match_url: Option<String>,
    },

    /// Keep the credential fresh and answer JSON requests on stdin until Ctrl-C
    Daemon {
        /// Force a new token at startup instead of reusing the cache
        #[arg(long)]
        fresh: bool,
    },

    /// Show configuration information
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,

        /// Reset configuration to defaults
        #[arg(long)]
        reset: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty-printed human-readable output
    #[default]
    Pretty,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_with_station() {
        let args = Args::try_parse_from([
            "radiko",
            "download",
            "--station",
            "TBS",
            "--start",
            "20240101120000",
            "--end",
            "20240101130000",
        ])
        .unwrap();
        match args.command {
            Commands::Download { station, start, url, .. } => {
                assert_eq!(station.as_deref(), Some("TBS"));
                assert_eq!(start.as_deref(), Some("20240101120000"));
                assert!(url.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_url_conflicts_with_station() {
        assert!(
            Args::try_parse_from([
                "radiko",
                "download",
                "--url",
                "https://radiko.jp/#!/ts/TBS/20240101120000",
                "--station",
                "TBS",
            ])
            .is_err()
        );
    }

    #[test]
    fn test_global_flags() {
        let args = Args::try_parse_from(["radiko", "rules", "--match", "https://radiko.jp/", "-o", "json", "-v"])
            .unwrap();
        assert!(args.verbose);
        assert_eq!(args.output, OutputFormat::Json);
        assert!(matches!(args.command, Commands::Rules { match_url: Some(_) }));
    }
}
