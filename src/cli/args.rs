use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "model-skill")]
#[command(about = "Compare model results with observed time series")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Match an observation with a model result and report skill
    Compare {
        #[arg(help = "Observation file (csv, txt or parquet)")]
        obs: PathBuf,

        #[arg(help = "Model result file (csv, txt or parquet)")]
        model: PathBuf,

        #[command(flatten)]
        selection: SelectionArgs,

        #[arg(long, help = "Start of the skill period, e.g. 2017-10-27 or 2017-10")]
        start: Option<String>,

        #[arg(long, help = "End of the skill period (inclusive)")]
        end: Option<String>,

        #[arg(
            long,
            value_delimiter = ',',
            help = "Metrics to report [default: bias,rmse,urmse,mae,cc,si,r2]"
        )]
        metrics: Vec<String>,

        #[arg(long, help = "Print results as JSON")]
        json: bool,
    },

    /// List the items of a time-series file
    Items {
        #[arg(help = "Time-series file (csv, txt or parquet)")]
        file: PathBuf,
    },

    /// Write matched observation and model values to CSV or Parquet
    Export {
        obs: PathBuf,

        model: PathBuf,

        #[command(flatten)]
        selection: SelectionArgs,

        #[arg(short, long, help = "Output file, format chosen by extension")]
        output: PathBuf,

        #[arg(short, long, default_value = "snappy", help = "Parquet compression")]
        compression: String,
    },

    /// Compare the observations and models listed in a config file
    Run {
        #[arg(short, long, help = "TOML run configuration")]
        config: PathBuf,

        #[arg(long, help = "Print results as JSON")]
        json: bool,
    },
}

/// Item selection and naming; items are given by name or by index
#[derive(clap::Args, Debug, Clone, Default)]
pub struct SelectionArgs {
    #[arg(long, allow_hyphen_values = true, help = "Observation item (name or index, negative counts from the end)")]
    pub obs_item: Option<String>,

    #[arg(long, allow_hyphen_values = true, help = "Model item (name or index, negative counts from the end)")]
    pub mod_item: Option<String>,

    #[arg(long, help = "Observation name [default: file name]")]
    pub obs_name: Option<String>,

    #[arg(long, help = "Model name [default: item name]")]
    pub mod_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_compare() {
        let cli = Cli::try_parse_from([
            "model-skill",
            "-vv",
            "compare",
            "obs.csv",
            "model.csv",
            "--mod-item",
            "-1",
            "--metrics",
            "bias,rmse",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Compare {
                selection, metrics, ..
            } => {
                assert_eq!(selection.mod_item.as_deref(), Some("-1"));
                assert_eq!(metrics, vec!["bias", "rmse"]);
            }
            _ => panic!("expected compare"),
        }
    }

    #[test]
    fn test_item_is_not_positional() {
        let result = Cli::try_parse_from(["model-skill", "compare", "obs.csv", "model.csv", "0"]);
        assert!(result.is_err());
    }
}
