use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::completion::TextCompletion;
use crate::corpus::CorpusStore;
use crate::counters::UsageCounterStore;
use crate::error::{FaqError, Result};
use crate::model::{AnswerSource, FaqEntry, MatchResult, MatchedEntry, Resolution};
use crate::similarity::{round3, score};

pub const DEFAULT_CUTOFF: f64 = 0.55;
pub const DEFAULT_ESCALATE_THRESHOLD: f64 = 0.40;
pub const DEFAULT_COMPLETION_TIMEOUT: Duration = Duration::from_secs(30);

pub const EMPTY_QUERY_TEXT: &str = "Please enter a question.";
pub const NO_MATCH_TEXT: &str =
    "No close FAQ match — please contact support or provide more details.";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub cutoff: f64,
    pub escalate_threshold: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            cutoff: DEFAULT_CUTOFF,
            escalate_threshold: DEFAULT_ESCALATE_THRESHOLD,
        }
    }
}

/// Scores a query against the corpus and applies the three-tier policy:
/// confident answer, weak match flagged for review, or fallback.
pub struct ResolutionEngine {
    corpus: Arc<CorpusStore>,
    counters: Arc<UsageCounterStore>,
    completion: Option<Arc<dyn TextCompletion>>,
    completion_timeout: Duration,
    thresholds: Thresholds,
}

impl ResolutionEngine {
    pub fn new(corpus: Arc<CorpusStore>, counters: Arc<UsageCounterStore>) -> Self {
        Self {
            corpus,
            counters,
            completion: None,
            completion_timeout: DEFAULT_COMPLETION_TIMEOUT,
            thresholds: Thresholds::default(),
        }
    }

    pub fn with_completion(mut self, completion: Arc<dyn TextCompletion>) -> Self {
        self.completion = Some(completion);
        self
    }

    pub fn with_completion_timeout(mut self, timeout: Duration) -> Self {
        self.completion_timeout = timeout;
        self
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    pub fn answer(&self, query: &str) -> MatchResult {
        self.answer_with(query, self.thresholds)
    }

    pub fn answer_with(&self, query: &str, thresholds: Thresholds) -> MatchResult {
        let query = query.trim();
        if query.is_empty() {
            return MatchResult {
                answer_text: EMPTY_QUERY_TEXT.to_string(),
                matched_entry: None,
                confidence: 0.0,
                resolution: Resolution::Escalate,
                source: AnswerSource::EmptyQuery,
            };
        }

        let entries = self.corpus.snapshot();
        let best = best_match(query, &entries);

        if let Some((entry, best_score)) = best {
            debug!(query, matched = %entry.question, score = best_score, "best corpus match");

            let resolution = if best_score >= thresholds.cutoff {
                Some(Resolution::Resolved)
            } else if best_score >= thresholds.escalate_threshold {
                Some(Resolution::Escalate)
            } else {
                None
            };

            if let Some(resolution) = resolution {
                let confidence = round3(best_score);
                if let Err(err) = self.counters.increment(&entry.question) {
                    warn!(error = %err, question = %entry.question, "failed to record usage");
                }
                info!(
                    resolution = resolution.as_str(),
                    confidence,
                    question = %entry.question,
                    "query answered from corpus"
                );
                return MatchResult {
                    answer_text: entry.answer.clone(),
                    matched_entry: Some(MatchedEntry {
                        entry: entry.clone(),
                        confidence,
                    }),
                    confidence,
                    resolution,
                    source: AnswerSource::Faq,
                };
            }
        }

        let (answer_text, source) = match self.complete(&build_prompt(query, &entries)) {
            Ok(text) => (text, AnswerSource::Completion),
            Err(err) => {
                if self.completion.is_some() {
                    warn!(error = %err, "text completion fallback failed");
                }
                (NO_MATCH_TEXT.to_string(), AnswerSource::Fallback)
            }
        };
        info!(source = ?source, "no close corpus match");

        MatchResult {
            answer_text,
            matched_entry: None,
            confidence: 0.0,
            resolution: Resolution::Escalate,
            source,
        }
    }

    /// Run the completion on a worker thread and stop waiting once the
    /// timeout elapses. Blank output counts as a failure.
    fn complete(&self, prompt: &str) -> Result<String> {
        let completion = self
            .completion
            .clone()
            .ok_or_else(|| FaqError::Completion("no completion configured".to_string()))?;

        let (tx, rx) = mpsc::channel();
        let prompt = prompt.to_string();
        thread::spawn(move || {
            let _ = tx.send(completion.complete(&prompt));
        });

        let text = match rx.recv_timeout(self.completion_timeout) {
            Ok(result) => result?,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                return Err(FaqError::CompletionTimeout(self.completion_timeout))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                return Err(FaqError::Completion("completion worker panicked".to_string()))
            }
        };

        let text = text.trim();
        if text.is_empty() {
            return Err(FaqError::Completion("empty completion".to_string()));
        }
        Ok(text.to_string())
    }
}

/// Highest-scoring entry; an equal score never displaces an earlier entry
/// and a zero score is no match at all.
fn best_match<'a>(query: &str, entries: &'a [FaqEntry]) -> Option<(&'a FaqEntry, f64)> {
    entries
        .iter()
        .fold(None::<(&'a FaqEntry, f64)>, |best, entry| {
            let s = score(query, &entry.question);
            match best {
                Some((_, best_score)) if s <= best_score => best,
                _ if s > 0.0 => Some((entry, s)),
                _ => best,
            }
        })
}

/// Prompt handed to the completion: the whole corpus as context, then the
/// user's question.
pub fn build_prompt(query: &str, entries: &[FaqEntry]) -> String {
    let context = entries
        .iter()
        .map(|e| format!("Q: {}\nA: {}", e.question, e.answer))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "FAQ Context:\n{context}\n\nUser question: {query}\nProvide a short, helpful answer (one paragraph)."
    )
}
