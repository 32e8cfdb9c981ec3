use std::sync::Arc;

use tracing::info;

use crate::completion::{CommandCompletion, TextCompletion};
use crate::config::Config;
use crate::corpus::CorpusStore;
use crate::counters::UsageCounterStore;
use crate::engine::{ResolutionEngine, Thresholds};
use crate::error::Result;
use crate::escalation::EscalationLog;
use crate::model::{EscalationRecord, FaqEntry, MatchResult, MatchedEntry};

/// Everything a front end needs: answering, browsing by tag, usage stats,
/// escalation logging and corpus reloads.
pub struct FaqDesk {
    engine: ResolutionEngine,
    corpus: Arc<CorpusStore>,
    counters: Arc<UsageCounterStore>,
    escalations: EscalationLog,
}

impl FaqDesk {
    /// Create missing store files, load the corpus and wire the optional
    /// command-backed completion.
    pub fn open(config: &Config) -> Result<Self> {
        config.validate()?;

        let corpus = Arc::new(CorpusStore::load(config.corpus_path()));
        let counters = Arc::new(UsageCounterStore::open(config.counters_path())?);
        let escalations = EscalationLog::open(config.escalations_path())?;

        let mut engine = ResolutionEngine::new(Arc::clone(&corpus), Arc::clone(&counters))
            .with_thresholds(config.thresholds());
        if let Some(completion) = &config.completion {
            let timeout = completion.timeout()?;
            let command = CommandCompletion::parse(&completion.command, timeout)?;
            info!(command = %command.command_line(), "text completion enabled");
            engine = engine
                .with_completion_timeout(timeout)
                .with_completion(Arc::new(command));
        }

        info!(
            corpus = %config.corpus_path().display(),
            entries = corpus.len(),
            "faq desk ready"
        );
        Ok(Self {
            engine,
            corpus,
            counters,
            escalations,
        })
    }

    /// Swap in a different completion backend.
    pub fn with_completion(mut self, completion: Arc<dyn TextCompletion>) -> Self {
        self.engine = self.engine.with_completion(completion);
        self
    }

    pub fn answer(&self, query: &str) -> MatchResult {
        self.engine.answer(query)
    }

    /// Answer with per-call thresholds; `None` keeps the configured value.
    pub fn answer_with(
        &self,
        query: &str,
        cutoff: Option<f64>,
        escalate_threshold: Option<f64>,
    ) -> MatchResult {
        let defaults = self.engine.thresholds();
        self.engine.answer_with(
            query,
            Thresholds {
                cutoff: cutoff.unwrap_or(defaults.cutoff),
                escalate_threshold: escalate_threshold.unwrap_or(defaults.escalate_threshold),
            },
        )
    }

    pub fn by_tag(&self, tag: Option<&str>) -> Vec<FaqEntry> {
        self.corpus.by_tag(tag)
    }

    pub fn all_tags(&self) -> Vec<String> {
        self.corpus.all_tags()
    }

    pub fn top_asked(&self, n: usize) -> Vec<(String, u64)> {
        self.counters.top_asked(n)
    }

    pub fn log_escalation(
        &self,
        question: &str,
        context: Option<&str>,
        matched: Option<&MatchedEntry>,
        confidence: Option<f64>,
        tags: Option<Vec<String>>,
    ) -> Result<EscalationRecord> {
        self.escalations
            .log(question, context, matched, confidence, tags)
    }

    /// Log an escalation for a result returned by [`FaqDesk::answer`].
    pub fn escalate(
        &self,
        question: &str,
        context: Option<&str>,
        result: &MatchResult,
    ) -> Result<EscalationRecord> {
        self.log_escalation(
            question,
            context,
            result.matched_entry.as_ref(),
            Some(result.confidence),
            None,
        )
    }

    pub fn escalations(&self) -> Vec<EscalationRecord> {
        self.escalations.records()
    }

    /// Re-read the corpus file; returns the new entry count.
    pub fn reload_corpus(&self) -> usize {
        self.corpus.reload()
    }
}
