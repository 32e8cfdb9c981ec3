mod cli;
mod output;

use std::io::{self, BufRead, Write};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use faqdesk_core::{CompletionConfig, Config, FaqDesk, MatchResult, Resolution};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands, OutputFormat};

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .try_init()
        .ok();

    cli.validate().map_err(|msg| anyhow!(msg))?;
    let config = resolve_config(&cli)?;

    let open = || FaqDesk::open(&config).context("open faq desk");

    match &cli.command {
        Commands::Ask {
            question,
            cutoff,
            escalate_threshold,
            escalate,
            context,
        } => {
            let desk = open()?;
            let result = desk.answer_with(question, *cutoff, *escalate_threshold);
            output::print_answer(cli.output, question, &result)?;
            let unresolved = result.resolution == Resolution::Escalate;
            if *escalate && unresolved && !question.trim().is_empty() {
                let record = desk
                    .escalate(question, context.as_deref(), &result)
                    .context("log escalation")?;
                output::print_escalated(cli.output, &record)?;
            }
        }
        Commands::Faqs { tag } => {
            output::print_entries(cli.output, &open()?.by_tag(tag.as_deref()))?
        }
        Commands::Tags => output::print_tags(cli.output, &open()?.all_tags())?,
        Commands::Top { limit } => output::print_top(cli.output, &open()?.top_asked(*limit))?,
        Commands::Escalate {
            question,
            context,
            tags,
            confidence,
        } => {
            let tags = (!tags.is_empty()).then(|| tags.clone());
            let record = open()?
                .log_escalation(question, context.as_deref(), None, *confidence, tags)
                .context("log escalation")?;
            output::print_escalated(cli.output, &record)?;
        }
        Commands::Escalations => {
            output::print_escalations(cli.output, &open()?.escalations())?
        }
        Commands::Chat => chat(&open()?, cli.output)?,
        Commands::Config => output::print_config(cli.output, &config)?,
    }

    Ok(())
}

/// Config file first, then command-line and environment overrides.
fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref()).context("load config")?;

    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(command) = &cli.completion {
        let completion = config.completion.get_or_insert_with(CompletionConfig::default);
        completion.command = command.clone();
    }
    if let Some(timeout) = &cli.completion_timeout {
        let completion = config.completion.get_or_insert_with(CompletionConfig::default);
        completion.timeout = timeout.to_string();
    }

    config.validate().context("invalid configuration")?;
    debug!(data_dir = %config.data_dir.display(), "configuration resolved");
    Ok(config)
}

/// Line-oriented session. `:reload`, `:tags`, `:top`, `:escalate [context]`
/// and `:quit` are handled locally; anything else is a question.
fn chat(desk: &FaqDesk, format: OutputFormat) -> Result<()> {
    let stdin = io::stdin();
    let mut last: Option<(String, MatchResult)> = None;

    for line in stdin.lock().lines() {
        let line = line.context("read stdin")?;
        let trimmed = line.trim();

        match trimmed.split_once(' ').map_or((trimmed, ""), |(c, rest)| (c, rest.trim())) {
            (":quit", _) | (":q", _) => break,
            (":reload", _) => {
                let count = desk.reload_corpus();
                println!("Reloaded {count} FAQ entries.");
            }
            (":tags", _) => output::print_tags(format, &desk.all_tags())?,
            (":top", _) => output::print_top(format, &desk.top_asked(10))?,
            (":escalate", context) => match &last {
                Some((question, result)) => {
                    let context = (!context.is_empty()).then_some(context);
                    let record = desk
                        .escalate(question, context, result)
                        .context("log escalation")?;
                    output::print_escalated(format, &record)?;
                }
                None => println!("Nothing to escalate yet."),
            },
            _ => {
                let result = desk.answer(&line);
                output::print_answer(format, &line, &result)?;
                if !trimmed.is_empty() {
                    last = Some((line.clone(), result));
                }
            }
        }
        io::stdout().flush().ok();
    }

    Ok(())
}
