pub mod completion;
pub mod config;
pub mod corpus;
pub mod counters;
pub mod desk;
pub mod engine;
pub mod error;
pub mod escalation;
pub mod model;
pub mod persist;
pub mod similarity;

pub use completion::{CommandCompletion, TextCompletion};
pub use config::{CompletionConfig, Config};
pub use corpus::CorpusStore;
pub use counters::{UsageCounterStore, UsageCounts};
pub use desk::FaqDesk;
pub use engine::{
    build_prompt, ResolutionEngine, Thresholds, DEFAULT_COMPLETION_TIMEOUT, DEFAULT_CUTOFF,
    DEFAULT_ESCALATE_THRESHOLD, EMPTY_QUERY_TEXT, NO_MATCH_TEXT,
};
pub use error::{FaqError, Result};
pub use escalation::EscalationLog;
pub use model::{
    AnswerSource, EscalationRecord, FaqEntry, MatchResult, MatchedEntry, Resolution, UsageRecord,
};
pub use similarity::score;
