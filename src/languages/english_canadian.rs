//! Canadian English: rule ordering and intonation defaults.

use super::Language;
use crate::prosody::ProsodyParams;

/// Canadian English with a typical adult male register.
///
/// Segmental passes run before word-level prominence so blended formant
/// targets see the original neighbours; word bridging and coarticulation
/// run late to fill whatever the earlier passes left untouched; pause
/// insertion runs last.
#[must_use]
pub fn english_canadian() -> Language {
    Language {
        name: "english-canadian",
        rule_ordering: &[
            "vowel-nasalization",
            "diphthong-shortening",
            "stress-accent",
            "emphasis-boost",
            "quotation-register",
            "phrase-final-lengthening",
            "exclamation-energy",
            "terminal-contour",
            "word-bridging",
            "coarticulation",
            "pause-insertion",
        ],
        prosody: ProsodyParams {
            mean_f0_hz: 118.0,
            declination: 0.12,
            accent_ratio: 1.1,
            emphasis_widen: 1.3,
            terminal_fraction: 0.25,
            question_rise: 1.25,
            statement_fall: 0.85,
            exclamation_widen: 1.2,
        },
    }
}
