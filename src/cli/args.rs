//! Command-line argument parsing for qachain
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// qachain - train and query declarative question-answering pipelines
#[derive(Parser, Debug)]
#[command(name = "qachain")]
#[command(version)]
#[command(about = "Train and query declarative question-answering pipelines", long_about = None)]
pub struct Args {
    /// Settings file (defaults to ~/.qachain/config.toml)
    #[arg(short, long, global = true)]
    pub settings: Option<PathBuf>,

    /// Verbosity level: -v (debug), -vv (trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Fit the trainable stages of a pipeline and save their state
    Train {
        /// Pipeline description (JSON)
        #[arg(value_name = "CONFIG")]
        config: PathBuf,
    },

    /// Answer a single question
    Ask {
        #[arg(value_name = "CONFIG")]
        config: PathBuf,

        #[arg(value_name = "QUESTION")]
        question: String,

        /// Number of answers to show (defaults to qa.top_n from settings)
        #[arg(short = 'n', long)]
        top_n: Option<usize>,
    },

    /// Answer questions read line by line
    Interact {
        #[arg(value_name = "CONFIG")]
        config: PathBuf,
    },

    /// Report missing resources of a pipeline
    Check {
        #[arg(value_name = "CONFIG")]
        config: PathBuf,
    },
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        match self.verbose {
            0 => Verbosity::Normal,
            1 => Verbosity::Verbose,
            _ => Verbosity::VeryVerbose,
        }
    }

    /// Pipeline description the subcommand operates on
    pub fn config_path(&self) -> &PathBuf {
        match &self.command {
            Commands::Train { config }
            | Commands::Ask { config, .. }
            | Commands::Interact { config }
            | Commands::Check { config } => config,
        }
    }
}

impl Verbosity {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Verbosity::Normal => "normal",
            Verbosity::Verbose => "verbose",
            Verbosity::VeryVerbose => "very_verbose",
        }
    }

    /// Log filter replacing the settings' filter, if any
    pub fn filter_override(&self) -> Option<&'static str> {
        match self {
            Verbosity::Normal => None,
            Verbosity::Verbose => Some("qachain=debug"),
            Verbosity::VeryVerbose => Some("qachain=trace"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask() {
        let args = Args::try_parse_from([
            "qachain",
            "ask",
            "faq.json",
            "When is the exam?",
            "--top-n",
            "3",
        ])
        .unwrap();
        assert_eq!(
            args.command,
            Commands::Ask {
                config: PathBuf::from("faq.json"),
                question: "When is the exam?".to_string(),
                top_n: Some(3),
            }
        );
        assert_eq!(args.config_path(), &PathBuf::from("faq.json"));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args =
            Args::try_parse_from(["qachain", "train", "faq.json", "-vv", "--settings", "s.toml"])
                .unwrap();
        assert_eq!(args.verbosity(), Verbosity::VeryVerbose);
        assert_eq!(args.settings, Some(PathBuf::from("s.toml")));
    }

    #[test]
    fn test_verbosity_levels() {
        let args = Args::try_parse_from(["qachain", "check", "faq.json"]).unwrap();
        assert_eq!(args.verbosity(), Verbosity::Normal);
        assert_eq!(args.verbosity().filter_override(), None);

        let args = Args::try_parse_from(["qachain", "-v", "check", "faq.json"]).unwrap();
        assert_eq!(args.verbosity(), Verbosity::Verbose);
        assert_eq!(args.verbosity().filter_override(), Some("qachain=debug"));
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Args::try_parse_from(["qachain"]).is_err());
        assert!(Args::try_parse_from(["qachain", "ask", "faq.json"]).is_err());
    }
}
