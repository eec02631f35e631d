use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "station-qc")]
#[command(about = "Reconcile and quality-control weather station observations")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(long, global = true, help = "Configuration file (TOML, JSON or INI)")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Parquet,
    Jsonl,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Parquet => "parquet",
            OutputFormat::Jsonl => "jsonl",
        }
    }
}

/// Options shared by every command that walks a time axis
#[derive(Args, Debug, Clone)]
pub struct AxisArgs {
    #[arg(short, long, help = "First date (YYYY-MM-DD)")]
    pub begin: String,

    #[arg(short, long, help = "Last date (YYYY-MM-DD)")]
    pub end: String,

    #[arg(short, long, help = "hourly or daily [default: from config]")]
    pub granularity: Option<String>,

    #[arg(long, help = "IANA timezone [default: from config]")]
    pub timezone: Option<String>,
}

/// Inputs of a reconciliation run
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    #[arg(short, long, help = "Primary observations (CSV or JSON)")]
    pub primary: PathBuf,

    #[arg(short, long, help = "Secondary observations (CSV or JSON)")]
    pub secondary: Option<PathBuf>,

    #[arg(long, help = "Output column allow-list (one per line, or a CSV header)")]
    pub schema: PathBuf,

    #[arg(long, help = "Memory-map input files")]
    pub use_mmap: bool,

    #[arg(long, help = "Worker threads [default: from config]")]
    pub max_workers: Option<usize>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reconcile observations and write the canonical series
    Reconcile {
        #[command(flatten)]
        axis: AxisArgs,

        #[command(flatten)]
        inputs: InputArgs,

        #[arg(
            short,
            long,
            help = "Output file path [default: output/station-qc-{granularity}-{YYMMDD}.{ext}]"
        )]
        output_file: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value = "parquet")]
        format: OutputFormat,

        #[arg(short, long, help = "Parquet compression [default: from config]")]
        compression: Option<String>,

        #[arg(long, default_value = "1000")]
        chunk_size: usize,
    },

    /// Reconcile and print the integrity report without writing output
    Validate {
        #[command(flatten)]
        axis: AxisArgs,

        #[command(flatten)]
        inputs: InputArgs,
    },

    /// Print the bucket axis for a date range
    Axis {
        #[command(flatten)]
        axis: AxisArgs,

        #[arg(long, default_value = "0", help = "Maximum buckets to print (0 = all)")]
        limit: usize,
    },

    /// Display information about a Parquet output file
    Info {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(short, long, default_value = "10")]
        sample: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reconcile() {
        let cli = Cli::try_parse_from([
            "station-qc",
            "--verbose",
            "reconcile",
            "--begin",
            "2023-07-01",
            "--end",
            "2023-07-31",
            "--granularity",
            "daily",
            "--primary",
            "primary.csv",
            "--schema",
            "columns.txt",
            "--format",
            "jsonl",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command {
            Commands::Reconcile { axis, inputs, format, .. } => {
                assert_eq!(axis.granularity.as_deref(), Some("daily"));
                assert_eq!(inputs.primary, PathBuf::from("primary.csv"));
                assert!(inputs.secondary.is_none());
                assert_eq!(format, OutputFormat::Jsonl);
            }
            _ => panic!("expected reconcile"),
        }
    }

    #[test]
    fn test_axis_requires_dates() {
        assert!(Cli::try_parse_from(["station-qc", "axis", "--begin", "2023-07-01"]).is_err());
    }
}
