//! The parsed utterance tree: paragraphs, sentences, words, phone tokens.
//!
//! The tree is built once by the parser. Rule passes finalize the numeric
//! fields; only the designated pause-insertion pass may add tokens.

use crate::ipa::{Formant, MannerClass, PhoneTarget, VoicingClass};

/// Sentence-terminal punctuation class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentenceType {
    Statement,
    Question,
    Exclamation,
    QuestionExclamation,
}

impl SentenceType {
    #[must_use]
    pub fn is_question(self) -> bool {
        matches!(
            self,
            SentenceType::Question | SentenceType::QuestionExclamation
        )
    }

    #[must_use]
    pub fn is_exclamation(self) -> bool {
        matches!(
            self,
            SentenceType::Exclamation | SentenceType::QuestionExclamation
        )
    }
}

/// One phone with its markup-derived modifier counts and resolved targets.
#[derive(Debug, Clone, PartialEq)]
pub struct PhoneToken {
    pub symbol: String,
    /// Count of `>` modifiers (each lengthens duration by x1.5).
    pub lengthen: u32,
    /// Count of `<` modifiers (each halves duration).
    pub shorten: u32,
    /// Count of `+` modifiers (each scales the pitch factor by 0.975).
    pub raise: u32,
    /// Count of `-` modifiers (each scales the pitch factor by 1.025).
    pub lower: u32,
    /// Acoustic targets resolved from the symbol table.
    pub target: PhoneTarget,
    /// Finalized duration; starts at base x 1.5^lengthen x 0.5^shorten.
    pub duration_ms: f64,
    /// Finalized level offset relative to the table's base amplitude.
    pub amplitude_db: f64,
    /// Multiplier over the prosodic baseline f0; starts at
    /// 0.975^raise x 1.025^lower.
    pub pitch_factor: f64,
    /// Formant targets at phone entry, when a coarticulation pass has
    /// blended them toward the previous phone.
    pub onset_formants: Option<Vec<Formant>>,
    /// Formant targets at phone exit, blended toward the next phone.
    pub offset_formants: Option<Vec<Formant>>,
    /// True only for tokens added by the pause-insertion pass.
    pub inserted: bool,
}

impl PhoneToken {
    #[must_use]
    pub fn new(
        symbol: impl Into<String>,
        target: PhoneTarget,
        lengthen: u32,
        shorten: u32,
        raise: u32,
        lower: u32,
    ) -> Self {
        let duration_ms = target.base_duration_ms
            * 1.5_f64.powi(lengthen as i32)
            * 0.5_f64.powi(shorten as i32);
        let pitch_factor = 0.975_f64.powi(raise as i32) * 1.025_f64.powi(lower as i32);
        let amplitude_db = target.base_amplitude_db;
        PhoneToken {
            symbol: symbol.into(),
            lengthen,
            shorten,
            raise,
            lower,
            target,
            duration_ms,
            amplitude_db,
            pitch_factor,
            onset_formants: None,
            offset_formants: None,
            inserted: false,
        }
    }

    /// A silence token of the given duration, as inserted at pause
    /// boundaries.
    #[must_use]
    pub fn silence(duration_ms: f64) -> Self {
        PhoneToken {
            symbol: "_".into(),
            lengthen: 0,
            shorten: 0,
            raise: 0,
            lower: 0,
            target: PhoneTarget::silence(duration_ms),
            duration_ms,
            amplitude_db: 0.0,
            pitch_factor: 1.0,
            onset_formants: None,
            offset_formants: None,
            inserted: true,
        }
    }

    /// Net count of length-increasing minus length-decreasing modifiers.
    #[must_use]
    pub fn duration_exponent(&self) -> i64 {
        i64::from(self.lengthen) - i64::from(self.shorten)
    }

    /// Net count of pitch-lowering minus pitch-raising modifiers.
    #[must_use]
    pub fn pitch_exponent(&self) -> i64 {
        i64::from(self.lower) - i64::from(self.raise)
    }

    #[must_use]
    pub fn is_silence(&self) -> bool {
        self.target.manner == MannerClass::Silence
    }

    #[must_use]
    pub fn voicing_mix(&self) -> f64 {
        self.target.voicing.mix_ratio()
    }

    #[must_use]
    pub fn is_vowel(&self) -> bool {
        self.target.manner == MannerClass::Vowel
    }
}

/// A word: phone tokens plus word-level markup flags.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Word {
    pub phones: Vec<PhoneToken>,
    pub stressed: bool,
    pub quoted: bool,
    pub emphasized: bool,
    pub pause_after: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sentence {
    pub words: Vec<Word>,
    pub kind: SentenceType,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Paragraph {
    pub sentences: Vec<Sentence>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Utterance {
    pub paragraphs: Vec<Paragraph>,
}

/// Structural counts, used by the rule engine to enforce the non-insertion
/// contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtteranceShape {
    pub paragraphs: usize,
    pub sentences: usize,
    pub words: usize,
    pub phones: usize,
}

impl Utterance {
    #[must_use]
    pub fn shape(&self) -> UtteranceShape {
        let mut shape = UtteranceShape {
            paragraphs: self.paragraphs.len(),
            sentences: 0,
            words: 0,
            phones: 0,
        };
        for paragraph in &self.paragraphs {
            shape.sentences += paragraph.sentences.len();
            for sentence in &paragraph.sentences {
                shape.words += sentence.words.len();
                for word in &sentence.words {
                    shape.phones += word.phones.len();
                }
            }
        }
        shape
    }

    /// All sentences in original order, across paragraph boundaries.
    pub fn sentences(&self) -> impl Iterator<Item = &Sentence> {
        self.paragraphs.iter().flat_map(|p| p.sentences.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipa::SymbolTable;
    use approx::assert_relative_eq;

    fn token(symbol: &str, lengthen: u32, shorten: u32, raise: u32, lower: u32) -> PhoneToken {
        let table = SymbolTable::builtin();
        let target = table.lookup(symbol).unwrap().clone();
        PhoneToken::new(symbol, target, lengthen, shorten, raise, lower)
    }

    #[test]
    fn duration_scales_exponentially_with_modifiers() {
        let base = token("ɛ", 0, 0, 0, 0).duration_ms;
        for k in 1..=4_u32 {
            let lengthened = token("ɛ", k, 0, 0, 0);
            assert_relative_eq!(
                lengthened.duration_ms,
                base * 1.5_f64.powi(k as i32)
            );
            let shortened = token("ɛ", 0, k, 0, 0);
            assert_relative_eq!(shortened.duration_ms, base * 0.5_f64.powi(k as i32));
        }
        // Monotonic in k.
        assert!(token("ɛ", 2, 0, 0, 0).duration_ms > token("ɛ", 1, 0, 0, 0).duration_ms);
        assert!(token("ɛ", 0, 2, 0, 0).duration_ms < token("ɛ", 0, 1, 0, 0).duration_ms);
    }

    #[test]
    fn pitch_factor_scales_exponentially_with_modifiers() {
        for k in 1..=4_u32 {
            let raised = token("ɛ", 0, 0, k, 0);
            assert_relative_eq!(raised.pitch_factor, 0.975_f64.powi(k as i32));
            let lowered = token("ɛ", 0, 0, 0, k);
            assert_relative_eq!(lowered.pitch_factor, 1.025_f64.powi(k as i32));
        }
        assert!(token("ɛ", 0, 0, 2, 0).pitch_factor < token("ɛ", 0, 0, 1, 0).pitch_factor);
        assert!(token("ɛ", 0, 0, 0, 2).pitch_factor > token("ɛ", 0, 0, 0, 1).pitch_factor);
    }

    #[test]
    fn mixed_modifier_runs_compose_independently() {
        let t = token("ɛ", 2, 1, 1, 1);
        let base = token("ɛ", 0, 0, 0, 0).duration_ms;
        assert_relative_eq!(t.duration_ms, base * 1.5 * 1.5 * 0.5);
        assert_relative_eq!(t.pitch_factor, 0.975 * 1.025);
        assert_eq!(t.duration_exponent(), 1);
        assert_eq!(t.pitch_exponent(), 0);
    }

    #[test]
    fn silence_tokens_are_flagged_as_inserted() {
        let pause = PhoneToken::silence(250.0);
        assert!(pause.inserted);
        assert!(pause.is_silence());
        assert_relative_eq!(pause.voicing_mix(), 0.0);
        assert!(!token("ɛ", 0, 0, 0, 0).inserted);
    }
}
