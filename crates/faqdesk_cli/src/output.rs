use std::io::{self, Write};

use anyhow::Result;
use chrono::SecondsFormat;
use faqdesk_core::{Config, EscalationRecord, FaqEntry, MatchResult};
use serde::Serialize;

use crate::cli::OutputFormat;

const SUMMARY_LEN: usize = 150;

#[derive(Serialize)]
struct JsonAnswer<'a> {
    query: &'a str,
    #[serde(flatten)]
    result: &'a MatchResult,
}

pub fn print_answer(format: OutputFormat, query: &str, result: &MatchResult) -> Result<()> {
    let mut out = io::stdout().lock();
    match format {
        OutputFormat::Json => write_json(&mut out, &JsonAnswer { query, result }),
        OutputFormat::Text => {
            writeln!(out, "Q: {}", query.trim())?;
            if let Some(category) = result
                .matched_entry
                .as_ref()
                .and_then(|m| m.entry.category.as_deref())
            {
                writeln!(out, "Category: {category}")?;
            }
            if result.answer_text.chars().count() > SUMMARY_LEN {
                writeln!(out, "Summary: {}", short_summary(&result.answer_text, SUMMARY_LEN))?;
            }
            writeln!(out, "{}", result.answer_text)?;
            match &result.matched_entry {
                Some(matched) => {
                    writeln!(out, "Matched: {}", matched.entry.question)?;
                    writeln!(
                        out,
                        "Confidence: {:.3}  Resolution: {}",
                        result.confidence,
                        result.resolution.as_str()
                    )?;
                }
                None => writeln!(out, "Resolution: {}", result.resolution.as_str())?,
            }
            Ok(())
        }
    }
}

pub fn print_entries(format: OutputFormat, entries: &[FaqEntry]) -> Result<()> {
    let mut out = io::stdout().lock();
    match format {
        OutputFormat::Json => write_json(&mut out, entries),
        OutputFormat::Text => {
            if entries.is_empty() {
                writeln!(out, "No FAQ entries.")?;
            }
            for entry in entries {
                if entry.tags.is_empty() {
                    writeln!(out, "{}", entry.question)?;
                } else {
                    writeln!(out, "{} [{}]", entry.question, entry.tags.join(", "))?;
                }
            }
            Ok(())
        }
    }
}

pub fn print_tags(format: OutputFormat, tags: &[String]) -> Result<()> {
    let mut out = io::stdout().lock();
    match format {
        OutputFormat::Json => write_json(&mut out, tags),
        OutputFormat::Text => {
            for tag in tags {
                writeln!(out, "{tag}")?;
            }
            Ok(())
        }
    }
}

#[derive(Serialize)]
struct JsonTop<'a> {
    question: &'a str,
    count: u64,
}

pub fn print_top(format: OutputFormat, top: &[(String, u64)]) -> Result<()> {
    let mut out = io::stdout().lock();
    match format {
        OutputFormat::Json => {
            let rows: Vec<JsonTop> = top
                .iter()
                .map(|(question, count)| JsonTop {
                    question,
                    count: *count,
                })
                .collect();
            write_json(&mut out, &rows)
        }
        OutputFormat::Text => {
            if top.is_empty() {
                writeln!(out, "No questions tracked yet.")?;
            }
            for (question, count) in top {
                writeln!(out, "{count:>5}  {question}")?;
            }
            Ok(())
        }
    }
}

pub fn print_escalations(format: OutputFormat, records: &[EscalationRecord]) -> Result<()> {
    let mut out = io::stdout().lock();
    match format {
        OutputFormat::Json => write_json(&mut out, records),
        OutputFormat::Text => {
            if records.is_empty() {
                writeln!(out, "No escalations logged.")?;
            }
            for record in records {
                write!(
                    out,
                    "{}  {}",
                    record.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
                    record.question
                )?;
                if !record.context.is_empty() {
                    write!(out, "  ({})", record.context)?;
                }
                writeln!(out)?;
            }
            Ok(())
        }
    }
}

pub fn print_escalated(format: OutputFormat, record: &EscalationRecord) -> Result<()> {
    let mut out = io::stdout().lock();
    match format {
        OutputFormat::Json => write_json(&mut out, record),
        OutputFormat::Text => {
            writeln!(out, "Escalation logged. Support will review it.")?;
            Ok(())
        }
    }
}

pub fn print_config(format: OutputFormat, config: &Config) -> Result<()> {
    let mut out = io::stdout().lock();
    match format {
        OutputFormat::Json => write_json(&mut out, config),
        OutputFormat::Text => {
            writeln!(out, "corpus:      {}", config.corpus_path().display())?;
            writeln!(out, "counters:    {}", config.counters_path().display())?;
            writeln!(out, "escalations: {}", config.escalations_path().display())?;
            writeln!(out, "cutoff:      {:.3}", config.cutoff)?;
            writeln!(out, "escalate:    {:.3}", config.escalate_threshold)?;
            match &config.completion {
                Some(c) => writeln!(out, "completion:  {} (timeout {})", c.command, c.timeout)?,
                None => writeln!(out, "completion:  none")?,
            }
            Ok(())
        }
    }
}

/// Cut `text` at the last space before `max_len` characters and add "...".
pub fn short_summary(text: &str, max_len: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let head: String = text.chars().take(max_len).collect();
    let cut = head.rfind(' ').unwrap_or(head.len());
    format!("{}...", &head[..cut])
}

fn write_json<T: Serialize + ?Sized>(out: &mut impl Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::short_summary;

    #[test]
    fn short_text_is_unchanged() {
        assert_eq!(short_summary("  Go to settings.  ", 150), "Go to settings.");
    }

    #[test]
    fn long_text_is_cut_on_a_word_boundary() {
        assert_eq!(short_summary("alpha beta gamma", 12), "alpha beta...");
    }

    #[test]
    fn long_word_is_cut_hard() {
        assert_eq!(short_summary("abcdefghij", 4), "abcd...");
    }
}
