//! Error taxonomy for the synthesis pipeline.
//!
//! Every kind aborts processing of the current input (fail-fast); no partial
//! waveform is ever emitted. Errors carry the input position, offending
//! symbol or rule name, and stage.

use thiserror::Error;

/// Malformed transcription markup, reported by the parser.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error(
        "unknown symbol '{symbol}' (paragraph {paragraph}, sentence {sentence}, word {word})"
    )]
    UnknownSymbol {
        symbol: String,
        paragraph: usize,
        sentence: usize,
        word: usize,
    },

    #[error("unbalanced quotation region (paragraph {paragraph}, sentence {sentence})")]
    UnbalancedQuotation { paragraph: usize, sentence: usize },

    #[error("unbalanced emphasis region (paragraph {paragraph}, sentence {sentence})")]
    UnbalancedEmphasis { paragraph: usize, sentence: usize },

    #[error(
        "stray '{marker}' inside word '{word}' (paragraph {paragraph}, sentence {sentence})"
    )]
    StrayMarker {
        marker: char,
        word: String,
        paragraph: usize,
        sentence: usize,
    },

    #[error("word {word} has no phonetic content (paragraph {paragraph}, sentence {sentence})")]
    EmptyWord {
        paragraph: usize,
        sentence: usize,
        word: usize,
    },
}

/// Invalid configuration data, rejected before any input is processed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("rule ordering is empty")]
    EmptyRuleOrdering,

    #[error("unknown rule name '{0}'")]
    UnknownRule(String),

    #[error("invalid symbol table entry for '{symbol}': {reason}")]
    InvalidSymbolEntry { symbol: String, reason: String },
}

/// A transformation pass violated its contract at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("rule '{rule}' changed structural counts but is not an inserting pass")]
    TokenCountChanged { rule: &'static str },

    #[error("rule '{rule}' needs symbol '{symbol}', which is not in the table")]
    UnsupportedSymbol { rule: &'static str, symbol: String },
}

/// Invalid acoustic parameters reaching the resonator stage.
///
/// These are raised explicitly rather than clamped, so that bad symbol-table
/// data cannot silently distort output.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SynthesisError {
    #[error("formant frequency {frequency} Hz outside (0, {nyquist}) Hz")]
    FrequencyOutOfRange { frequency: f64, nyquist: f64 },

    #[error("non-positive formant bandwidth {bandwidth} Hz")]
    InvalidBandwidth { bandwidth: f64 },

    #[error("invalid filter gain {gain}")]
    InvalidGain { gain: f64 },

    #[error("frame width {frame_ms} ms yields an empty frame at the configured sample rate")]
    InvalidFrameLength { frame_ms: f64 },
}

/// Any failure of the pipeline, by stage.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Rule(#[from] RuleError),
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
}
