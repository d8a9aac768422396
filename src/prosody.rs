//! Prosody contour builder: per-phone f0 and amplitude control points.
//!
//! A sentence's pitch rides a declining baseline from the language's mean
//! f0, with local accents on stressed and emphasized words and a terminal
//! contour over the sentence's final stretch. Each phone gets onset, target
//! and offset control points; adjacent voiced phones share their boundary
//! value so the contour never jumps mid-voicing.

use crate::ipa::{Formant, MannerClass};
use crate::utterance::{Sentence, SentenceType};

/// Per-language intonation parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ProsodyParams {
    /// Speaker mean fundamental, Hz.
    pub mean_f0_hz: f64,
    /// Total fractional f0 drop across one sentence.
    pub declination: f64,
    /// f0 peak multiplier on stressed-word vowels.
    pub accent_ratio: f64,
    /// Emphasis scales the accent excursion and extends it across the word.
    pub emphasis_widen: f64,
    /// Fraction of sentence time carrying the terminal contour.
    pub terminal_fraction: f64,
    /// f0 multiplier reached at the end of a question.
    pub question_rise: f64,
    /// f0 multiplier reached at the end of a statement.
    pub statement_fall: f64,
    /// Exponent widening the terminal excursion of exclamations.
    pub exclamation_widen: f64,
}

impl Default for ProsodyParams {
    fn default() -> Self {
        ProsodyParams {
            mean_f0_hz: 120.0,
            declination: 0.12,
            accent_ratio: 1.1,
            emphasis_widen: 1.3,
            terminal_fraction: 0.25,
            question_rise: 1.25,
            statement_fall: 0.85,
            exclamation_widen: 1.2,
        }
    }
}

/// Control points for rendering one phone.
#[derive(Debug, Clone, PartialEq)]
pub struct PhoneContour {
    pub duration_ms: f64,
    /// f0 control points, Hz. `None` when the phone carries no voicing.
    pub onset_f0_hz: Option<f64>,
    pub target_f0_hz: Option<f64>,
    pub offset_f0_hz: Option<f64>,
    pub amplitude_db: f64,
    pub onset_formants: Vec<Formant>,
    pub target_formants: Vec<Formant>,
    pub offset_formants: Vec<Formant>,
    pub voicing_mix: f64,
    pub manner: MannerClass,
}

impl PhoneContour {
    #[must_use]
    pub fn is_silence(&self) -> bool {
        self.manner == MannerClass::Silence
    }
}

/// Builds the per-phone contour sequence for one finalized sentence.
#[must_use]
pub fn build_sentence_contours(sentence: &Sentence, params: &ProsodyParams) -> Vec<PhoneContour> {
    struct Slot<'a> {
        token: &'a crate::utterance::PhoneToken,
        accent: f64,
        start_ms: f64,
    }

    let mut slots = Vec::new();
    let mut cursor = 0.0;
    for word in &sentence.words {
        for token in &word.phones {
            let accent = word_accent(word.stressed, word.emphasized, token.is_vowel(), params);
            slots.push(Slot {
                token,
                accent,
                start_ms: cursor,
            });
            cursor += token.duration_ms;
        }
    }
    let total_ms = cursor.max(f64::MIN_POSITIVE);
    let end_factor = terminal_end_factor(sentence.kind, params);

    let f0_at = |t_ms: f64, accent: f64, pitch_factor: f64| {
        let progress = (t_ms / total_ms).clamp(0.0, 1.0);
        let baseline = params.mean_f0_hz * (1.0 - params.declination * progress);
        // Terminal contour: log-linear ramp from unity over the final
        // fraction of the sentence.
        let contour_start = 1.0 - params.terminal_fraction;
        let terminal = if progress > contour_start {
            let ramp = (progress - contour_start) / params.terminal_fraction;
            end_factor.powf(ramp)
        } else {
            1.0
        };
        // The modifier factor scales the glottal period, so it divides f0.
        baseline * accent * terminal / pitch_factor
    };

    let mut contours: Vec<PhoneContour> = Vec::with_capacity(slots.len());
    for slot in &slots {
        let token = slot.token;
        let voiced = token.voicing_mix() > 0.0 && !token.is_silence();
        let (onset, target, offset) = if voiced {
            let mid = slot.start_ms + token.duration_ms / 2.0;
            let end = slot.start_ms + token.duration_ms;
            (
                Some(f0_at(slot.start_ms, slot.accent, token.pitch_factor)),
                Some(f0_at(mid, slot.accent, token.pitch_factor)),
                Some(f0_at(end, slot.accent, token.pitch_factor)),
            )
        } else {
            (None, None, None)
        };

        let target_formants = token.target.formants.clone();
        let onset_formants = token
            .onset_formants
            .clone()
            .unwrap_or_else(|| target_formants.clone());
        let offset_formants = token
            .offset_formants
            .clone()
            .unwrap_or_else(|| target_formants.clone());

        let mut contour = PhoneContour {
            duration_ms: token.duration_ms,
            onset_f0_hz: onset,
            target_f0_hz: target,
            offset_f0_hz: offset,
            amplitude_db: token.amplitude_db,
            onset_formants,
            target_formants,
            offset_formants,
            voicing_mix: token.voicing_mix(),
            manner: token.target.manner,
        };

        // Stitch across word boundaries: accents change stepwise per word,
        // so force the onset to meet the previous voiced offset.
        if let (Some(previous), Some(_)) = (contours.last(), contour.onset_f0_hz) {
            if let Some(previous_offset) = previous.offset_f0_hz {
                contour.onset_f0_hz = Some(previous_offset);
            }
        }
        contours.push(contour);
    }
    contours
}

fn word_accent(stressed: bool, emphasized: bool, is_vowel: bool, params: &ProsodyParams) -> f64 {
    let excursion = params.accent_ratio - 1.0;
    if emphasized {
        // Emphasis widens the accent over the whole word, vowel or not.
        1.0 + excursion * params.emphasis_widen
    } else if stressed && is_vowel {
        params.accent_ratio
    } else {
        1.0
    }
}

fn terminal_end_factor(kind: SentenceType, params: &ProsodyParams) -> f64 {
    match kind {
        SentenceType::Statement => params.statement_fall,
        SentenceType::Question => params.question_rise,
        SentenceType::Exclamation => params.statement_fall.powf(params.exclamation_widen),
        SentenceType::QuestionExclamation => params.question_rise.powf(params.exclamation_widen),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipa::SymbolTable;
    use crate::parse::parse;
    use approx::assert_relative_eq;

    fn first_sentence(text: &str) -> Sentence {
        let table = SymbolTable::builtin();
        parse(text, &table)
            .unwrap()
            .sentences()
            .next()
            .unwrap()
            .clone()
    }

    #[test]
    fn baseline_declines_across_the_sentence() {
        let sentence = first_sentence("ɑ ɑ ɑ ɑ.");
        let contours = build_sentence_contours(&sentence, &ProsodyParams::default());
        let first = contours[0].target_f0_hz.unwrap();
        let third = contours[2].target_f0_hz.unwrap();
        assert!(third < first);
    }

    #[test]
    fn adjacent_voiced_phones_share_their_boundary_f0() {
        let sentence = first_sentence("'mo lo ɑn.");
        let contours = build_sentence_contours(&sentence, &ProsodyParams::default());
        for pair in contours.windows(2) {
            let (Some(offset), Some(onset)) = (pair[0].offset_f0_hz, pair[1].onset_f0_hz) else {
                continue;
            };
            assert_relative_eq!(offset, onset);
        }
    }

    #[test]
    fn silence_breaks_the_contour_chain() {
        let table = SymbolTable::builtin();
        let mut utterance = parse("ɑ, ɑ.", &table).unwrap();
        utterance.paragraphs[0].sentences[0].words[0]
            .phones
            .push(crate::utterance::PhoneToken::silence(250.0));
        let sentence = utterance.sentences().next().unwrap().clone();
        let contours = build_sentence_contours(&sentence, &ProsodyParams::default());
        assert!(contours[1].is_silence());
        assert!(contours[1].onset_f0_hz.is_none());
        assert!(contours[1].target_f0_hz.is_none());
    }

    #[test]
    fn question_ends_above_statement() {
        // Fully voiced words, so both ends carry f0 control points.
        let question = first_sentence("lo ɑn?");
        let statement = first_sentence("lo ɑn.");
        let params = ProsodyParams::default();
        let q = build_sentence_contours(&question, &params);
        let s = build_sentence_contours(&statement, &params);
        let q_end = q.last().unwrap().offset_f0_hz.unwrap();
        let s_end = s.last().unwrap().offset_f0_hz.unwrap();
        assert!(q_end > s_end);
        // A statement falls below its own opening.
        assert!(s_end < s[0].onset_f0_hz.unwrap());
    }

    #[test]
    fn stress_accent_raises_the_vowel() {
        let stressed = first_sentence("'lo lo.");
        let contours = build_sentence_contours(&stressed, &ProsodyParams::default());
        // Phones: l o l o. Compare the two vowels at roughly symmetric
        // positions; the accent outweighs the declination between them.
        let accented = contours[1].target_f0_hz.unwrap();
        let plain = contours[3].target_f0_hz.unwrap();
        assert!(accented > plain * 1.05);
    }

    #[test]
    fn raise_modifiers_increase_f0() {
        let raised = first_sentence("ɑ++.");
        let plain = first_sentence("ɑ.");
        let params = ProsodyParams::default();
        let raised_f0 = build_sentence_contours(&raised, &params)[0]
            .target_f0_hz
            .unwrap();
        let plain_f0 = build_sentence_contours(&plain, &params)[0]
            .target_f0_hz
            .unwrap();
        assert_relative_eq!(raised_f0, plain_f0 / (0.975 * 0.975), max_relative = 1e-9);
    }

    #[test]
    fn coarticulated_targets_flow_into_the_contour() {
        let table = SymbolTable::builtin();
        let utterance = parse("ɑn.", &table).unwrap();
        let ctx = crate::rules::RuleContext {
            table: &table,
            prosody: &ProsodyParams::default(),
            pause_ms: 250.0,
        };
        let registry = crate::rules::Registry::builtin();
        let set = crate::rules::RuleSet::resolve(&["vowel-nasalization"], &registry).unwrap();
        let out = set.apply(utterance, &ctx).unwrap();
        let sentence = out.sentences().next().unwrap().clone();
        let contours = build_sentence_contours(&sentence, &ProsodyParams::default());
        assert_ne!(contours[0].offset_formants, contours[0].target_formants);
        assert_ne!(contours[1].onset_formants, contours[1].target_formants);
    }
}
