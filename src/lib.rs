//! Rule-driven speech synthesis from annotated phonetic transcriptions.
//!
//! The pipeline has four stages: a parser turns extended-IPA text with
//! prosodic markup into an utterance tree; a per-language rule set finalizes
//! durations, levels and pitch factors; a prosody builder lays f0 and
//! formant control points over each sentence; a Klatt-style cascade/parallel
//! formant engine renders the samples. [`synthesize`] runs the whole chain.
//!
//! ```no_run
//! use parwave::{synthesize, SymbolTable, SynthConfig, languages};
//!
//! let table = SymbolTable::builtin();
//! let language = languages::english_canadian();
//! let config = SynthConfig::default();
//! let samples = synthesize("hɛl>o,.", &language, &table, &config).unwrap();
//! ```

#![deny(
    clippy::all,
    clippy::cargo,
    clippy::pedantic,
    unsafe_code,
    rustdoc::all
)]
// fine for us since loss of precision/sign is not that important, as long as it's the same every time.
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap
)]

pub mod error;
pub mod ipa;
pub mod languages;
pub mod parse;
pub mod prosody;
pub mod rules;
pub mod synth;
pub mod utterance;

pub use error::{ConfigError, Error, ParseError, RuleError, SynthesisError};
pub use ipa::{Formant, MannerClass, PhoneTarget, SymbolTable, VoicingClass};
pub use languages::Language;
pub use parse::parse;
pub use prosody::{PhoneContour, ProsodyParams, build_sentence_contours};
pub use rules::{Registry, RuleContext, RuleSet};
pub use synth::{SynthConfig, render_sentence, render_utterance};
pub use utterance::{PhoneToken, Sentence, SentenceType, Utterance, Word};

/// Runs the full pipeline on one transcription and returns the sample
/// buffer, normalized to the configured peak level.
///
/// # Errors
///
/// Any stage error: [`ParseError`] for malformed markup, [`ConfigError`]
/// for a bad rule ordering, [`RuleError`] for a pass contract violation,
/// [`SynthesisError`] for invalid acoustic data.
pub fn synthesize(
    text: &str,
    language: &Language,
    table: &SymbolTable,
    config: &SynthConfig,
) -> Result<Vec<f64>, Error> {
    let registry = Registry::builtin();
    let rule_set = language.rule_set(&registry)?;
    let utterance = parse(text, table)?;
    let ctx = RuleContext {
        table,
        prosody: &language.prosody,
        pause_ms: rules::DEFAULT_PAUSE_MS,
    };
    let finalized = rule_set.apply(utterance, &ctx)?;
    let buffer = render_utterance(&finalized, &language.prosody, config)?;
    Ok(buffer)
}
