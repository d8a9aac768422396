//! Rule engine: named transformation passes applied in a configured order.
//!
//! A pass is a pure function from utterance to utterance. Passes never touch
//! ambient state; everything they need arrives through [`RuleContext`]. Only
//! a pass registered with `inserts_tokens` may change structural counts, and
//! [`RuleSet::apply`] enforces that after every pass.

use tracing::debug;

use crate::error::{ConfigError, RuleError};
use crate::ipa::{Formant, MannerClass, SymbolTable};
use crate::prosody::ProsodyParams;
use crate::utterance::{PhoneToken, Sentence, Utterance};

/// Default silence inserted after a `pause_after` word, a quarter second.
pub const DEFAULT_PAUSE_MS: f64 = 250.0;

/// Shared read-only inputs for every pass.
pub struct RuleContext<'a> {
    pub table: &'a SymbolTable,
    pub prosody: &'a ProsodyParams,
    /// Silence inserted after a `pause_after` word, in milliseconds.
    pub pause_ms: f64,
}

pub type PassFn = fn(Utterance, &RuleContext) -> Result<Utterance, RuleError>;

/// A registered pass: name, body, and whether it may add tokens.
#[derive(Clone, Copy)]
pub struct Pass {
    pub name: &'static str,
    pub run: PassFn,
    pub inserts_tokens: bool,
}

/// The fixed set of passes a language ordering may name.
pub struct Registry {
    passes: Vec<Pass>,
}

impl Registry {
    #[must_use]
    pub fn builtin() -> Self {
        let pass = |name, run, inserts_tokens| Pass {
            name,
            run,
            inserts_tokens,
        };
        Registry {
            passes: vec![
                pass("vowel-nasalization", vowel_nasalization as PassFn, false),
                pass("coarticulation", coarticulation, false),
                pass("word-bridging", word_bridging, false),
                pass("stress-accent", stress_accent, false),
                pass("emphasis-boost", emphasis_boost, false),
                pass("quotation-register", quotation_register, false),
                pass("diphthong-shortening", diphthong_shortening, false),
                pass("phrase-final-lengthening", phrase_final_lengthening, false),
                pass("exclamation-energy", exclamation_energy, false),
                pass("terminal-contour", terminal_contour, false),
                pass("pause-insertion", pause_insertion, true),
            ],
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Pass> {
        self.passes.iter().copied().find(|p| p.name == name)
    }
}

/// An ordered, resolved sequence of passes.
pub struct RuleSet {
    passes: Vec<Pass>,
}

impl RuleSet {
    /// Resolves rule names against the registry at configuration time.
    ///
    /// # Errors
    ///
    /// [`ConfigError::EmptyRuleOrdering`] for an empty list,
    /// [`ConfigError::UnknownRule`] for a name the registry lacks.
    pub fn resolve(names: &[&str], registry: &Registry) -> Result<Self, ConfigError> {
        if names.is_empty() {
            return Err(ConfigError::EmptyRuleOrdering);
        }
        let mut passes = Vec::with_capacity(names.len());
        for &name in names {
            let pass = registry
                .get(name)
                .ok_or_else(|| ConfigError::UnknownRule(name.to_owned()))?;
            passes.push(pass);
        }
        Ok(RuleSet { passes })
    }

    /// Applies every pass in order, checking the non-insertion contract.
    ///
    /// # Errors
    ///
    /// Any pass error, or [`RuleError::TokenCountChanged`] when a
    /// non-inserting pass altered structural counts.
    pub fn apply(&self, mut utterance: Utterance, ctx: &RuleContext) -> Result<Utterance, RuleError> {
        for pass in &self.passes {
            let before = utterance.shape();
            utterance = (pass.run)(utterance, ctx)?;
            let after = utterance.shape();
            if !pass.inserts_tokens && before != after {
                return Err(RuleError::TokenCountChanged { rule: pass.name });
            }
            debug!(rule = pass.name, phones = after.phones, "applied rule pass");
        }
        Ok(utterance)
    }

    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name).collect()
    }
}

/// Pairwise weighted average of two formant stacks, over the shorter one.
#[must_use]
pub fn blend_formants(a: &[Formant], b: &[Formant], weight_a: f64, weight_b: f64) -> Vec<Formant> {
    let total = weight_a + weight_b;
    a.iter()
        .zip(b.iter())
        .map(|(fa, fb)| Formant {
            frequency_hz: (fa.frequency_hz * weight_a + fb.frequency_hz * weight_b) / total,
            bandwidth_hz: (fa.bandwidth_hz * weight_a + fb.bandwidth_hz * weight_b) / total,
            amplitude_db: (fa.amplitude_db * weight_a + fb.amplitude_db * weight_b) / total,
        })
        .collect()
}

fn for_each_sentence<F>(mut utterance: Utterance, mut f: F) -> Utterance
where
    F: FnMut(&mut Sentence),
{
    for paragraph in &mut utterance.paragraphs {
        for sentence in &mut paragraph.sentences {
            f(sentence);
        }
    }
    utterance
}

/// Loudness boost ceiling over a phone's base level.
const MAX_BOOST_DB: f64 = 6.0;

fn boost(token: &mut PhoneToken, db: f64) {
    let cap = token.target.base_amplitude_db + MAX_BOOST_DB;
    token.amplitude_db = (token.amplitude_db + db).min(cap);
}

/// A vowel moving into a nasal trades a third of its duration into a blended
/// murmur region: the vowel's exit and the nasal's entry meet halfway.
fn vowel_nasalization(utterance: Utterance, _ctx: &RuleContext) -> Result<Utterance, RuleError> {
    Ok(for_each_sentence(utterance, |sentence| {
        for word in &mut sentence.words {
            for i in 0..word.phones.len().saturating_sub(1) {
                if !(word.phones[i].is_vowel()
                    && word.phones[i + 1].target.manner == MannerClass::Nasal)
                {
                    continue;
                }
                let vowel_formants = word.phones[i].target.formants.clone();
                let nasal_formants = word.phones[i + 1].target.formants.clone();
                let shifted = word.phones[i].duration_ms / 3.0;
                word.phones[i].duration_ms -= shifted;
                word.phones[i + 1].duration_ms += shifted;
                word.phones[i].offset_formants =
                    Some(blend_formants(&vowel_formants, &nasal_formants, 1.0, 2.0));
                word.phones[i + 1].onset_formants =
                    Some(blend_formants(&nasal_formants, &vowel_formants, 1.0, 1.0));
            }
        }
    }))
}

/// Word-internal neighbours pull each other's formant targets 2:1. Stops
/// keep their onset abrupt, so only their exit side is shaped.
fn coarticulation(utterance: Utterance, _ctx: &RuleContext) -> Result<Utterance, RuleError> {
    Ok(for_each_sentence(utterance, |sentence| {
        for word in &mut sentence.words {
            for i in 0..word.phones.len().saturating_sub(1) {
                if word.phones[i].is_silence() || word.phones[i + 1].is_silence() {
                    continue;
                }
                let here = word.phones[i].target.formants.clone();
                let next = word.phones[i + 1].target.formants.clone();
                if word.phones[i].offset_formants.is_none() {
                    word.phones[i].offset_formants =
                        Some(blend_formants(&here, &next, 2.0, 1.0));
                }
                let next_is_stop = word.phones[i + 1].target.manner == MannerClass::Stop;
                if !next_is_stop && word.phones[i + 1].onset_formants.is_none() {
                    word.phones[i + 1].onset_formants =
                        Some(blend_formants(&next, &here, 2.0, 1.0));
                }
            }
        }
    }))
}

/// Adjacent words run together: the boundary phones pull toward each other
/// the way word-internal neighbours do. Two vowels meeting at the boundary
/// take a breathy onset borrowed from the `h` target instead of a straight
/// glide.
fn word_bridging(utterance: Utterance, ctx: &RuleContext) -> Result<Utterance, RuleError> {
    let breathy = ctx
        .table
        .lookup("h")
        .ok_or(RuleError::UnsupportedSymbol {
            rule: "word-bridging",
            symbol: "h".to_owned(),
        })?
        .formants
        .clone();
    Ok(for_each_sentence(utterance, |sentence| {
        for w in 1..sentence.words.len() {
            let (left, right) = sentence.words.split_at_mut(w);
            let Some(prev) = left[w - 1].phones.last_mut() else {
                continue;
            };
            let Some(next) = right[0].phones.first_mut() else {
                continue;
            };
            if prev.is_silence() || next.is_silence() {
                continue;
            }
            let prev_formants = prev.target.formants.clone();
            let next_formants = next.target.formants.clone();
            if prev.offset_formants.is_none() {
                prev.offset_formants =
                    Some(blend_formants(&prev_formants, &next_formants, 2.0, 1.0));
            }
            if prev.is_vowel() && next.is_vowel() {
                // A glottal-gap quality keeps the two vowels distinct.
                next.onset_formants = Some(blend_formants(&next_formants, &breathy, 1.0, 2.0));
            } else if next.target.manner != MannerClass::Stop && next.onset_formants.is_none() {
                next.onset_formants =
                    Some(blend_formants(&next_formants, &prev_formants, 2.0, 1.0));
            }
        }
    }))
}

/// Stressed words: longer vowels, louder, a touch higher.
fn stress_accent(utterance: Utterance, _ctx: &RuleContext) -> Result<Utterance, RuleError> {
    Ok(for_each_sentence(utterance, |sentence| {
        for word in sentence.words.iter_mut().filter(|w| w.stressed) {
            for phone in &mut word.phones {
                if phone.is_vowel() {
                    phone.duration_ms *= 1.1;
                }
                boost(phone, 2.0);
                phone.pitch_factor *= 0.975;
            }
        }
    }))
}

/// Emphasized regions: louder and slower throughout, raised pitch. Stops
/// keep their duration so bursts stay crisp.
fn emphasis_boost(utterance: Utterance, _ctx: &RuleContext) -> Result<Utterance, RuleError> {
    Ok(for_each_sentence(utterance, |sentence| {
        for word in sentence.words.iter_mut().filter(|w| w.emphasized) {
            for phone in &mut word.phones {
                if phone.target.manner != MannerClass::Stop {
                    phone.duration_ms *= 1.1;
                }
                boost(phone, 3.0);
                phone.pitch_factor *= 0.95;
            }
        }
    }))
}

/// Quoted regions read slightly faster in a raised register.
fn quotation_register(utterance: Utterance, _ctx: &RuleContext) -> Result<Utterance, RuleError> {
    Ok(for_each_sentence(utterance, |sentence| {
        for word in sentence.words.iter_mut().filter(|w| w.quoted) {
            for phone in &mut word.phones {
                phone.duration_ms *= 0.925;
                phone.pitch_factor *= 0.95;
            }
        }
    }))
}

/// The second vowel of a word-internal vowel sequence is halved, so
/// diphthong spellings glide instead of dragging.
fn diphthong_shortening(utterance: Utterance, _ctx: &RuleContext) -> Result<Utterance, RuleError> {
    Ok(for_each_sentence(utterance, |sentence| {
        for word in &mut sentence.words {
            for i in 1..word.phones.len() {
                if word.phones[i].is_vowel() && word.phones[i - 1].is_vowel() {
                    word.phones[i].duration_ms *= 0.5;
                }
            }
        }
    }))
}

/// Vowels in a sentence's final word stretch toward the terminal.
fn phrase_final_lengthening(
    utterance: Utterance,
    _ctx: &RuleContext,
) -> Result<Utterance, RuleError> {
    Ok(for_each_sentence(utterance, |sentence| {
        if let Some(word) = sentence.words.last_mut() {
            for phone in word.phones.iter_mut().filter(|p| p.is_vowel()) {
                phone.duration_ms *= 1.5;
            }
        }
    }))
}

/// Exclamatory sentences: more energy everywhere, a slightly faster body,
/// and a drawn-out final word.
fn exclamation_energy(utterance: Utterance, _ctx: &RuleContext) -> Result<Utterance, RuleError> {
    Ok(for_each_sentence(utterance, |sentence| {
        if !sentence.kind.is_exclamation() {
            return;
        }
        let last = sentence.words.len().saturating_sub(1);
        for (w, word) in sentence.words.iter_mut().enumerate() {
            for phone in &mut word.phones {
                for formant in &mut phone.target.formants {
                    formant.bandwidth_hz *= 1.1;
                }
                boost(phone, 3.0);
                phone.duration_ms *= 0.95;
                if w == last && phone.is_vowel() {
                    phone.duration_ms *= 1.35;
                }
            }
        }
    }))
}

/// Question rise: the final word's phones shorten their glottal period
/// step by step toward the terminal.
fn terminal_contour(utterance: Utterance, _ctx: &RuleContext) -> Result<Utterance, RuleError> {
    Ok(for_each_sentence(utterance, |sentence| {
        if !sentence.kind.is_question() {
            return;
        }
        if let Some(word) = sentence.words.last_mut() {
            for (i, phone) in word.phones.iter_mut().enumerate() {
                let factor = (1.0 - 0.1 * (i + 1) as f64).max(0.7);
                phone.pitch_factor *= factor;
            }
        }
    }))
}

/// The only inserting pass: a silence token after each `pause_after` word.
fn pause_insertion(utterance: Utterance, ctx: &RuleContext) -> Result<Utterance, RuleError> {
    Ok(for_each_sentence(utterance, |sentence| {
        for word in sentence.words.iter_mut().filter(|w| w.pause_after) {
            word.phones.push(PhoneToken::silence(ctx.pause_ms));
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;
    use crate::prosody::ProsodyParams;
    use approx::assert_relative_eq;

    fn ctx(table: &SymbolTable, prosody: &ProsodyParams) -> RuleContext<'static> {
        // Leak in tests only, to keep fixtures terse.
        RuleContext {
            table: Box::leak(Box::new(table.clone())),
            prosody: Box::leak(Box::new(prosody.clone())),
            pause_ms: 250.0,
        }
    }

    fn fixture() -> (SymbolTable, ProsodyParams) {
        (SymbolTable::builtin(), ProsodyParams::default())
    }

    #[test]
    fn resolve_rejects_unknown_and_empty() {
        let registry = Registry::builtin();
        assert!(matches!(
            RuleSet::resolve(&[], &registry),
            Err(ConfigError::EmptyRuleOrdering)
        ));
        assert!(matches!(
            RuleSet::resolve(&["coarticulation", "no-such-rule"], &registry),
            Err(ConfigError::UnknownRule(name)) if name == "no-such-rule"
        ));
        let set = RuleSet::resolve(&["pause-insertion", "coarticulation"], &registry).unwrap();
        assert_eq!(set.names(), vec!["pause-insertion", "coarticulation"]);
    }

    #[test]
    fn non_inserting_passes_preserve_counts() {
        let (table, prosody) = fixture();
        let ctx = ctx(&table, &prosody);
        let registry = Registry::builtin();
        let ordering: Vec<&str> = registry.passes.iter().map(|p| p.name).collect();
        let set = RuleSet::resolve(&ordering, &registry).unwrap();

        let utterance = parse("'hɛlo ɑn, \"so\" *mo*!", &table).unwrap();
        let before = utterance.shape();
        let after = set.apply(utterance, &ctx).unwrap().shape();
        // One pause_after word, so exactly one inserted token.
        assert_eq!(after.phones, before.phones + 1);
        assert_eq!(after.words, before.words);
        assert_eq!(after.sentences, before.sentences);
    }

    #[test]
    fn count_changing_pass_is_caught() {
        fn rogue(mut u: Utterance, _ctx: &RuleContext) -> Result<Utterance, RuleError> {
            u.paragraphs[0].sentences[0].words[0].phones.pop();
            Ok(u)
        }
        let (table, prosody) = fixture();
        let ctx = ctx(&table, &prosody);
        let set = RuleSet {
            passes: vec![Pass {
                name: "rogue",
                run: rogue,
                inserts_tokens: false,
            }],
        };
        let utterance = parse("hɛlo.", &table).unwrap();
        assert!(matches!(
            set.apply(utterance, &ctx),
            Err(RuleError::TokenCountChanged { rule: "rogue" })
        ));
    }

    #[test]
    fn pause_insertion_appends_silence() {
        let (table, prosody) = fixture();
        let ctx = ctx(&table, &prosody);
        let utterance = parse("hɛl>o, ɑn.", &table).unwrap();
        let out = pause_insertion(utterance, &ctx).unwrap();
        let word = &out.paragraphs[0].sentences[0].words[0];
        let pause = word.phones.last().unwrap();
        assert!(pause.inserted && pause.is_silence());
        assert_relative_eq!(pause.duration_ms, 250.0);
        // The unpaused word is untouched.
        assert!(!out.paragraphs[0].sentences[0].words[1]
            .phones
            .iter()
            .any(|p| p.inserted));
    }

    #[test]
    fn stress_lengthens_vowels_and_boosts_level() {
        let (table, prosody) = fixture();
        let ctx = ctx(&table, &prosody);
        let utterance = parse("'hɛlo hɛlo.", &table).unwrap();
        let out = stress_accent(utterance, &ctx).unwrap();
        let stressed = &out.paragraphs[0].sentences[0].words[0].phones;
        let plain = &out.paragraphs[0].sentences[0].words[1].phones;
        assert_relative_eq!(stressed[1].duration_ms, plain[1].duration_ms * 1.1);
        assert_relative_eq!(stressed[0].duration_ms, plain[0].duration_ms);
        assert_relative_eq!(stressed[1].amplitude_db, plain[1].amplitude_db + 2.0);
        assert!(stressed[1].pitch_factor < plain[1].pitch_factor);
    }

    #[test]
    fn level_boosts_are_capped() {
        let (table, prosody) = fixture();
        let ctx = ctx(&table, &prosody);
        let mut utterance = parse("'hɛlo!", &table).unwrap();
        for _ in 0..5 {
            utterance = stress_accent(utterance, &ctx).unwrap();
        }
        let phone = &utterance.paragraphs[0].sentences[0].words[0].phones[1];
        assert_relative_eq!(
            phone.amplitude_db,
            phone.target.base_amplitude_db + MAX_BOOST_DB
        );
    }

    #[test]
    fn diphthong_second_vowel_halves() {
        let (table, prosody) = fixture();
        let ctx = ctx(&table, &prosody);
        let utterance = parse("ɑɪ ɪ.", &table).unwrap();
        let out = diphthong_shortening(utterance, &ctx).unwrap();
        let pair = &out.paragraphs[0].sentences[0].words[0].phones;
        let lone = &out.paragraphs[0].sentences[0].words[1].phones[0];
        assert_relative_eq!(pair[1].duration_ms, lone.duration_ms * 0.5);
        assert_relative_eq!(pair[0].duration_ms, pair[0].target.base_duration_ms);
    }

    #[test]
    fn final_word_vowels_lengthen() {
        let (table, prosody) = fixture();
        let ctx = ctx(&table, &prosody);
        let utterance = parse("ɑn mo.", &table).unwrap();
        let out = phrase_final_lengthening(utterance, &ctx).unwrap();
        let words = &out.paragraphs[0].sentences[0].words;
        assert_relative_eq!(
            words[1].phones[1].duration_ms,
            words[1].phones[1].target.base_duration_ms * 1.5
        );
        assert_relative_eq!(
            words[0].phones[0].duration_ms,
            words[0].phones[0].target.base_duration_ms
        );
    }

    #[test]
    fn word_bridging_shapes_boundary_phones() {
        let (table, prosody) = fixture();
        let ctx = ctx(&table, &prosody);
        let utterance = parse("ɑl mo to.", &table).unwrap();
        let out = word_bridging(utterance, &ctx).unwrap();
        let words = &out.paragraphs[0].sentences[0].words;
        // The 'l' exit leans toward the following 'm', which leans back.
        assert!(words[0].phones[1].offset_formants.is_some());
        assert!(words[1].phones[0].onset_formants.is_some());
        assert!(words[1].phones[1].offset_formants.is_some());
        // Stops keep an abrupt onset across the boundary too.
        assert!(words[2].phones[0].onset_formants.is_none());
        // Word-internal phones are untouched.
        assert!(words[0].phones[0].onset_formants.is_none());
    }

    #[test]
    fn vowels_meeting_across_words_get_a_breathy_onset() {
        let (table, prosody) = fixture();
        let ctx = ctx(&table, &prosody);
        let utterance = parse("ɑ ɑ.", &table).unwrap();
        let out = word_bridging(utterance, &ctx).unwrap();
        let onset = out.paragraphs[0].sentences[0].words[1].phones[0]
            .onset_formants
            .clone()
            .unwrap();
        let breathy_f1 = table.lookup("h").unwrap().formants[0].frequency_hz;
        let vowel_f1 = table.lookup("ɑ").unwrap().formants[0].frequency_hz;
        // The onset sits closer to the glottal gap than to the vowel.
        assert!((onset[0].frequency_hz - breathy_f1).abs() < (onset[0].frequency_hz - vowel_f1).abs());
    }

    #[test]
    fn word_bridging_needs_the_breathy_target() {
        use crate::ipa::{Formant, PhoneTarget, VoicingClass};

        let vowel = PhoneTarget {
            voicing: VoicingClass::Voiced,
            manner: MannerClass::Vowel,
            base_duration_ms: 100.0,
            base_amplitude_db: 0.0,
            formants: vec![Formant {
                frequency_hz: 500.0,
                bandwidth_hz: 60.0,
                amplitude_db: 0.0,
            }],
        };
        let table = SymbolTable::from_entries([("ɑ".to_owned(), vowel)]).unwrap();
        let prosody = ProsodyParams::default();
        let ctx = RuleContext {
            table: &table,
            prosody: &prosody,
            pause_ms: 250.0,
        };
        let utterance = parse("ɑ ɑ.", &table).unwrap();
        assert!(matches!(
            word_bridging(utterance, &ctx),
            Err(RuleError::UnsupportedSymbol {
                rule: "word-bridging",
                ..
            })
        ));
    }

    #[test]
    fn emphasis_boosts_everything_but_stop_durations() {
        let (table, prosody) = fixture();
        let ctx = ctx(&table, &prosody);
        let utterance = parse("*to* to.", &table).unwrap();
        let out = emphasis_boost(utterance, &ctx).unwrap();
        let emphasized = &out.paragraphs[0].sentences[0].words[0].phones;
        let plain = &out.paragraphs[0].sentences[0].words[1].phones;
        // The burst stays crisp; the vowel slows.
        assert_relative_eq!(emphasized[0].duration_ms, plain[0].duration_ms);
        assert_relative_eq!(emphasized[1].duration_ms, plain[1].duration_ms * 1.1);
        assert_relative_eq!(emphasized[0].amplitude_db, plain[0].amplitude_db + 3.0);
        assert_relative_eq!(emphasized[1].amplitude_db, plain[1].amplitude_db + 3.0);
        assert_relative_eq!(emphasized[1].pitch_factor, 0.95);
        assert_relative_eq!(plain[1].pitch_factor, 1.0);
    }

    #[test]
    fn quotation_reads_faster_in_a_raised_register() {
        let (table, prosody) = fixture();
        let ctx = ctx(&table, &prosody);
        let utterance = parse("\"lo\" lo.", &table).unwrap();
        let out = quotation_register(utterance, &ctx).unwrap();
        let quoted = &out.paragraphs[0].sentences[0].words[0].phones;
        let plain = &out.paragraphs[0].sentences[0].words[1].phones;
        for (q, p) in quoted.iter().zip(plain.iter()) {
            assert_relative_eq!(q.duration_ms, p.duration_ms * 0.925);
            assert_relative_eq!(q.pitch_factor, 0.95);
            assert_relative_eq!(q.amplitude_db, p.amplitude_db);
        }
        assert_relative_eq!(plain[0].pitch_factor, 1.0);
    }

    #[test]
    fn nasalization_blends_and_redistributes() {
        let (table, prosody) = fixture();
        let ctx = ctx(&table, &prosody);
        let utterance = parse("ɑn.", &table).unwrap();
        let before = utterance.paragraphs[0].sentences[0].words[0].phones[0].duration_ms
            + utterance.paragraphs[0].sentences[0].words[0].phones[1].duration_ms;
        let out = vowel_nasalization(utterance, &ctx).unwrap();
        let phones = &out.paragraphs[0].sentences[0].words[0].phones;
        assert!(phones[0].offset_formants.is_some());
        assert!(phones[1].onset_formants.is_some());
        assert_relative_eq!(phones[0].duration_ms + phones[1].duration_ms, before);
        // The vowel exit sits closer to the nasal murmur than to the vowel.
        let exit = &phones[0].offset_formants.as_ref().unwrap()[0];
        let vowel_f1 = phones[0].target.formants[0].frequency_hz;
        let nasal_f1 = phones[1].target.formants[0].frequency_hz;
        assert!((exit.frequency_hz - nasal_f1).abs() < (exit.frequency_hz - vowel_f1).abs());
    }

    #[test]
    fn coarticulation_skips_stop_onsets() {
        let (table, prosody) = fixture();
        let ctx = ctx(&table, &prosody);
        let utterance = parse("ɑtɑ.", &table).unwrap();
        let out = coarticulation(utterance, &ctx).unwrap();
        let phones = &out.paragraphs[0].sentences[0].words[0].phones;
        assert!(phones[0].offset_formants.is_some());
        assert!(phones[1].onset_formants.is_none());
        assert!(phones[2].onset_formants.is_some());
    }

    #[test]
    fn question_rise_hits_only_the_final_word() {
        let (table, prosody) = fixture();
        let ctx = ctx(&table, &prosody);
        let utterance = parse("hɛlo ɑn?", &table).unwrap();
        let out = terminal_contour(utterance, &ctx).unwrap();
        let words = &out.paragraphs[0].sentences[0].words;
        assert_relative_eq!(words[0].phones[0].pitch_factor, 1.0);
        assert_relative_eq!(words[1].phones[0].pitch_factor, 0.9);
        assert_relative_eq!(words[1].phones[1].pitch_factor, 0.8);
    }

    #[test]
    fn blend_weights_favor_the_heavier_side() {
        let a = [Formant {
            frequency_hz: 300.0,
            bandwidth_hz: 60.0,
            amplitude_db: 0.0,
        }];
        let b = [Formant {
            frequency_hz: 900.0,
            bandwidth_hz: 120.0,
            amplitude_db: -6.0,
        }];
        let blended = blend_formants(&a, &b, 2.0, 1.0);
        assert_relative_eq!(blended[0].frequency_hz, 500.0);
        assert_relative_eq!(blended[0].bandwidth_hz, 80.0);
        assert_relative_eq!(blended[0].amplitude_db, -2.0);
    }
}
