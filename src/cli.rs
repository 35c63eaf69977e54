use clap::Parser;
use dirsync::sync::strategy::Comparison;
use dirsync::SyncMode;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "dirsync")]
#[command(about = "Mirror or merge two directory trees", long_about = None)]
#[command(version)]
#[command(after_help = "EXAMPLES:
    # Mirror: destination becomes an exact copy of source (deletes extras)
    dirsync /source /destination

    # Merge both directions, newest modification time wins
    dirsync /left /right --bidirectional

    # Also compare content when size and mtime match
    dirsync /left /right -b --checksum

    # Machine-readable events
    dirsync /source /destination --json

    # Use a profile from ~/.config/dirsync/config.toml
    dirsync --profile photos

    # Start the HTTP control server
    dirsync --serve --port 8080 --web-root ./web")]
pub struct Cli {
    /// Source directory
    /// Optional when using --profile or --serve
    pub source: Option<PathBuf>,

    /// Destination directory
    /// Optional when using --profile or --serve
    pub destination: Option<PathBuf>,

    /// Two-way merge instead of a one-way mirror
    #[arg(short, long)]
    pub bidirectional: bool,

    /// Hash files whose size and mtime match to catch content differences
    #[arg(long)]
    pub checksum: bool,

    /// Output newline-delimited JSON events
    #[arg(long)]
    pub json: bool,

    /// Verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (only show errors)
    #[arg(short, long)]
    pub quiet: bool,

    /// Append the run log to this file
    #[arg(long, env = "DIRSYNC_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Use a named profile from the config file
    #[arg(long)]
    pub profile: Option<String>,

    /// List configured profiles and exit
    #[arg(long)]
    pub list_profiles: bool,

    /// Print a profile's settings and exit
    #[arg(long, value_name = "NAME")]
    pub show_profile: Option<String>,

    /// Run the HTTP control server instead of a single sync
    #[arg(long)]
    pub serve: bool,

    /// Address for --serve
    #[arg(long)]
    pub bind: Option<String>,

    /// Port for --serve
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory of static files served at / by --serve
    #[arg(long)]
    pub web_root: Option<PathBuf>,
}

impl Cli {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.quiet && self.verbose > 0 {
            anyhow::bail!("--quiet and --verbose cannot be used together");
        }

        if self.serve {
            if self.bidirectional || self.json {
                anyhow::bail!("--bidirectional and --json apply to single runs, not --serve");
            }
            return Ok(());
        }

        let (Some(source), Some(destination)) = (&self.source, &self.destination) else {
            anyhow::bail!("Both SOURCE and DESTINATION are required (or use --profile / --serve)");
        };

        for (label, path) in [("Source", source), ("Destination", destination)] {
            if !path.exists() {
                anyhow::bail!("{} does not exist: {}", label, path.display());
            }
            if !path.is_dir() {
                anyhow::bail!("{} is not a directory: {}", label, path.display());
            }
        }

        Ok(())
    }

    pub fn mode(&self) -> SyncMode {
        if self.bidirectional {
            SyncMode::TwoWay
        } else {
            SyncMode::OneWay
        }
    }

    pub fn comparison(&self) -> Comparison {
        if self.checksum {
            Comparison::Checksum
        } else {
            Comparison::Metadata
        }
    }

    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            return tracing::Level::ERROR;
        }

        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}
