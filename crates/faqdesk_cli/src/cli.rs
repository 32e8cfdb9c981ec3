use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(
    name = "faqdesk",
    version,
    about = "Answer questions from a curated FAQ corpus"
)]
pub struct Cli {
    /// Config file (defaults to <config dir>/faqdesk/config.toml).
    #[arg(long, global = true, env = "FAQDESK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding faq.json, top_counts.json and escalations.json.
    #[arg(long, global = true, env = "FAQDESK_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[arg(short = 'o', long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Command used when no FAQ entry matches, e.g. "ollama run mistral".
    #[arg(long, global = true, env = "FAQDESK_COMPLETION")]
    pub completion: Option<String>,

    #[arg(long, global = true)]
    pub completion_timeout: Option<humantime::Duration>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Match a question against the corpus.
    Ask {
        question: String,
        #[arg(long)]
        cutoff: Option<f64>,
        #[arg(long)]
        escalate_threshold: Option<f64>,
        /// Log an escalation when the answer is not resolved.
        #[arg(long)]
        escalate: bool,
        #[arg(long, requires = "escalate")]
        context: Option<String>,
    },
    /// List FAQ entries, optionally only those carrying a tag.
    Faqs {
        #[arg(long)]
        tag: Option<String>,
    },
    /// List every tag in the corpus.
    Tags,
    /// Most frequently answered questions.
    Top {
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },
    /// Record a question for human follow-up.
    Escalate {
        question: String,
        #[arg(long)]
        context: Option<String>,
        #[arg(long = "tag", action = clap::ArgAction::Append)]
        tags: Vec<String>,
        #[arg(long)]
        confidence: Option<f64>,
    },
    /// Show the escalation log.
    Escalations,
    /// Print the effective configuration.
    Config,
    /// Answer questions read line by line from stdin.
    Chat,
}

impl Cli {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(timeout) = &self.completion_timeout {
            if timeout.as_ref().is_zero() {
                return Err("completion-timeout must be > 0".to_string());
            }
        }

        let scores = match &self.command {
            Commands::Ask {
                cutoff,
                escalate_threshold,
                ..
            } => vec![("cutoff", *cutoff), ("escalate-threshold", *escalate_threshold)],
            Commands::Escalate { confidence, .. } => vec![("confidence", *confidence)],
            _ => Vec::new(),
        };
        for (name, value) in scores {
            if let Some(value) = value {
                if !(0.0..=1.0).contains(&value) {
                    return Err(format!("{name} must be within [0, 1]"));
                }
            }
        }

        Ok(())
    }
}
