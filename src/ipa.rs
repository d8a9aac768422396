//! Symbol table: maps each supported phonetic symbol to its acoustic targets.
//!
//! The table is read-only once constructed. [`SymbolTable::builtin`] covers
//! the extended-IPA inventory of the built-in language data;
//! [`SymbolTable::from_entries`] accepts externally authored data and
//! validates it for completeness before synthesis begins, so incomplete
//! entries fail at load time instead of mid-render.

use std::collections::HashMap;

use crate::error::ConfigError;

/// A single formant target: center frequency, bandwidth and peak level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Formant {
    pub frequency_hz: f64,
    pub bandwidth_hz: f64,
    pub amplitude_db: f64,
}

/// Excitation class of a phone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoicingClass {
    Voiced,
    Voiceless,
    /// Voiced frication: both glottal pulses and turbulence contribute.
    Mixed,
    Silence,
}

impl VoicingClass {
    /// Blend ratio between the glottal source (1.0) and the noise source (0.0).
    #[must_use]
    pub fn mix_ratio(self) -> f64 {
        match self {
            VoicingClass::Voiced => 1.0,
            VoicingClass::Mixed => 0.5,
            VoicingClass::Voiceless | VoicingClass::Silence => 0.0,
        }
    }
}

/// Articulatory category; selects the cascade/parallel balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MannerClass {
    Vowel,
    Nasal,
    Liquid,
    Fricative,
    Stop,
    Affricate,
    Silence,
}

impl MannerClass {
    /// Vowel-like phones are rendered purely through the cascade branch.
    #[must_use]
    pub fn is_vocalic(self) -> bool {
        matches!(
            self,
            MannerClass::Vowel | MannerClass::Nasal | MannerClass::Liquid
        )
    }
}

/// Acoustic targets for one phonetic symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct PhoneTarget {
    pub voicing: VoicingClass,
    pub manner: MannerClass,
    pub base_duration_ms: f64,
    pub base_amplitude_db: f64,
    /// Ordered low-to-high formant targets. Empty only for silence.
    pub formants: Vec<Formant>,
}

impl PhoneTarget {
    /// Target for an inserted silence segment.
    #[must_use]
    pub fn silence(duration_ms: f64) -> Self {
        PhoneTarget {
            voicing: VoicingClass::Silence,
            manner: MannerClass::Silence,
            base_duration_ms: duration_ms,
            base_amplitude_db: 0.0,
            formants: Vec::new(),
        }
    }
}

/// Read-only lookup from phonetic symbol to acoustic target.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    entries: HashMap<String, PhoneTarget>,
    /// Longest symbol length in chars, for longest-match scanning.
    max_symbol_chars: usize,
}

impl SymbolTable {
    /// Builds a table from externally authored entries, rejecting incomplete
    /// ones before synthesis begins.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidSymbolEntry`] for an empty symbol, a
    /// non-positive base duration, a non-silence entry without formants, or
    /// a formant with non-positive frequency or bandwidth.
    pub fn from_entries<I>(entries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, PhoneTarget)>,
    {
        let mut map = HashMap::new();
        let mut max_symbol_chars = 0;
        for (symbol, target) in entries {
            if symbol.is_empty() {
                return Err(ConfigError::InvalidSymbolEntry {
                    symbol,
                    reason: "empty symbol".into(),
                });
            }
            if !(target.base_duration_ms > 0.0) {
                return Err(ConfigError::InvalidSymbolEntry {
                    symbol,
                    reason: format!("non-positive base duration {}", target.base_duration_ms),
                });
            }
            if target.voicing != VoicingClass::Silence && target.formants.is_empty() {
                return Err(ConfigError::InvalidSymbolEntry {
                    symbol,
                    reason: "no formant targets on a non-silence entry".into(),
                });
            }
            for formant in &target.formants {
                if !(formant.frequency_hz > 0.0) || !(formant.bandwidth_hz > 0.0) {
                    return Err(ConfigError::InvalidSymbolEntry {
                        symbol,
                        reason: format!(
                            "formant with frequency {} Hz, bandwidth {} Hz",
                            formant.frequency_hz, formant.bandwidth_hz
                        ),
                    });
                }
            }
            max_symbol_chars = max_symbol_chars.max(symbol.chars().count());
            map.insert(symbol, target);
        }
        Ok(SymbolTable {
            entries: map,
            max_symbol_chars,
        })
    }

    #[must_use]
    pub fn lookup(&self, symbol: &str) -> Option<&PhoneTarget> {
        self.entries.get(symbol)
    }

    /// Matches the longest known symbol at the start of `chars`.
    /// Returns the match length in chars and the resolved target.
    #[must_use]
    pub fn longest_match(&self, chars: &[char]) -> Option<(usize, String, &PhoneTarget)> {
        let limit = self.max_symbol_chars.min(chars.len());
        for len in (1..=limit).rev() {
            let candidate: String = chars[..len].iter().collect();
            if let Some(target) = self.entries.get(&candidate) {
                return Some((len, candidate, target));
            }
        }
        None
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The built-in extended-IPA inventory.
    ///
    /// Vowel formants follow the classic Peterson-Barney measurements for an
    /// adult male voice; consonant targets are coarse spectral poles chosen
    /// for intelligibility rather than speaker fidelity.
    #[must_use]
    pub fn builtin() -> Self {
        let mut entries = HashMap::new();
        let mut max_symbol_chars = 0;
        let mut add = |symbol: &str, target: PhoneTarget| {
            max_symbol_chars = max_symbol_chars.max(symbol.chars().count());
            entries.insert(symbol.to_owned(), target);
        };

        // Vowels.
        add("i", vowel(270.0, 2290.0, 3010.0, 140.0));
        add("ɪ", vowel(390.0, 1990.0, 2550.0, 130.0));
        add("e", vowel(450.0, 2100.0, 2700.0, 140.0));
        add("ɛ", vowel(530.0, 1840.0, 2480.0, 130.0));
        add("æ", vowel(660.0, 1720.0, 2410.0, 150.0));
        add("ɑ", vowel(730.0, 1090.0, 2440.0, 150.0));
        add("ɔ", vowel(570.0, 840.0, 2410.0, 150.0));
        add("o", vowel(480.0, 900.0, 2500.0, 140.0));
        add("ʊ", vowel(440.0, 1020.0, 2240.0, 120.0));
        add("u", vowel(300.0, 870.0, 2240.0, 140.0));
        add("ʌ", vowel(640.0, 1190.0, 2390.0, 130.0));
        add("ə", vowel(500.0, 1500.0, 2500.0, 90.0));

        // Nasals: low murmur pole, heavily damped upper structure.
        add("m", nasal(250.0, 1100.0, 2100.0));
        add("n", nasal(250.0, 1700.0, 2600.0));
        add("ŋ", nasal(250.0, 2300.0, 2750.0));

        // Liquids and glides.
        add("l", liquid(360.0, 1300.0, 2700.0));
        add("ɹ", liquid(310.0, 1060.0, 1380.0));
        add("w", liquid(290.0, 610.0, 2150.0));
        add("j", liquid(270.0, 2100.0, 3000.0));

        // Voiceless fricatives.
        add(
            "s",
            fricative(VoicingClass::Voiceless, 110.0, &[(4500.0, 700.0, 0.0), (6500.0, 1000.0, -8.0)]),
        );
        add(
            "ʃ",
            fricative(VoicingClass::Voiceless, 110.0, &[(2300.0, 300.0, 0.0), (3400.0, 600.0, -5.0)]),
        );
        add(
            "f",
            fricative(VoicingClass::Voiceless, 100.0, &[(1400.0, 700.0, -4.0), (4000.0, 1200.0, -10.0)]),
        );
        add(
            "θ",
            fricative(VoicingClass::Voiceless, 100.0, &[(1400.0, 600.0, -6.0), (4500.0, 1500.0, -12.0)]),
        );
        add(
            "h",
            fricative(
                VoicingClass::Voiceless,
                70.0,
                &[(500.0, 300.0, 0.0), (1500.0, 400.0, -6.0), (2500.0, 500.0, -12.0)],
            ),
        );

        // Voiced fricatives: mixed excitation.
        add(
            "z",
            fricative(VoicingClass::Mixed, 100.0, &[(4300.0, 700.0, 0.0), (6000.0, 1000.0, -8.0)]),
        );
        add(
            "ʒ",
            fricative(VoicingClass::Mixed, 100.0, &[(2200.0, 300.0, 0.0), (3300.0, 600.0, -5.0)]),
        );
        add(
            "v",
            fricative(VoicingClass::Mixed, 90.0, &[(1300.0, 700.0, -4.0), (3800.0, 1200.0, -10.0)]),
        );
        add(
            "ð",
            fricative(VoicingClass::Mixed, 90.0, &[(1400.0, 600.0, -6.0), (4200.0, 1500.0, -12.0)]),
        );

        // Stops: a short burst frame; the closure gap comes from rules.
        add("p", stop(VoicingClass::Voiceless, &[(400.0, 300.0, -2.0), (1100.0, 700.0, -6.0)]));
        add("t", stop(VoicingClass::Voiceless, &[(400.0, 300.0, -2.0), (3200.0, 600.0, -4.0)]));
        add("k", stop(VoicingClass::Voiceless, &[(400.0, 300.0, -2.0), (2300.0, 500.0, -4.0)]));
        add("b", stop(VoicingClass::Mixed, &[(300.0, 200.0, -2.0), (1000.0, 700.0, -6.0)]));
        add("d", stop(VoicingClass::Mixed, &[(300.0, 200.0, -2.0), (2800.0, 600.0, -4.0)]));
        add("g", stop(VoicingClass::Mixed, &[(300.0, 200.0, -2.0), (2000.0, 500.0, -4.0)]));

        // Affricates: two-character symbols, matched longest-first.
        add(
            "tʃ",
            affricate(VoicingClass::Voiceless, &[(2300.0, 300.0, 0.0), (3400.0, 600.0, -5.0)]),
        );
        add(
            "dʒ",
            affricate(VoicingClass::Mixed, &[(2200.0, 300.0, 0.0), (3300.0, 600.0, -5.0)]),
        );

        // Glottal stop: a silent gap with articulatory identity.
        add(
            "ʔ",
            PhoneTarget {
                voicing: VoicingClass::Silence,
                manner: MannerClass::Stop,
                base_duration_ms: 25.0,
                base_amplitude_db: 0.0,
                formants: Vec::new(),
            },
        );

        SymbolTable {
            entries,
            max_symbol_chars,
        }
    }
}

fn make_formants(poles: &[(f64, f64, f64)]) -> Vec<Formant> {
    poles
        .iter()
        .map(|&(frequency_hz, bandwidth_hz, amplitude_db)| Formant {
            frequency_hz,
            bandwidth_hz,
            amplitude_db,
        })
        .collect()
}

fn vowel(f1: f64, f2: f64, f3: f64, duration_ms: f64) -> PhoneTarget {
    PhoneTarget {
        voicing: VoicingClass::Voiced,
        manner: MannerClass::Vowel,
        base_duration_ms: duration_ms,
        base_amplitude_db: 0.0,
        formants: make_formants(&[
            (f1, 60.0, 0.0),
            (f2, 90.0, -7.0),
            (f3, 120.0, -14.0),
            (3300.0, 150.0, -20.0),
        ]),
    }
}

fn nasal(f1: f64, f2: f64, f3: f64) -> PhoneTarget {
    PhoneTarget {
        voicing: VoicingClass::Voiced,
        manner: MannerClass::Nasal,
        base_duration_ms: 85.0,
        base_amplitude_db: -3.0,
        formants: make_formants(&[(f1, 100.0, 0.0), (f2, 200.0, -10.0), (f3, 300.0, -18.0)]),
    }
}

fn liquid(f1: f64, f2: f64, f3: f64) -> PhoneTarget {
    PhoneTarget {
        voicing: VoicingClass::Voiced,
        manner: MannerClass::Liquid,
        base_duration_ms: 75.0,
        base_amplitude_db: -2.0,
        formants: make_formants(&[(f1, 70.0, 0.0), (f2, 100.0, -8.0), (f3, 140.0, -16.0)]),
    }
}

fn fricative(voicing: VoicingClass, duration_ms: f64, poles: &[(f64, f64, f64)]) -> PhoneTarget {
    PhoneTarget {
        voicing,
        manner: MannerClass::Fricative,
        base_duration_ms: duration_ms,
        base_amplitude_db: if voicing == VoicingClass::Mixed { -4.0 } else { -6.0 },
        formants: make_formants(poles),
    }
}

fn stop(voicing: VoicingClass, poles: &[(f64, f64, f64)]) -> PhoneTarget {
    PhoneTarget {
        voicing,
        manner: MannerClass::Stop,
        base_duration_ms: if voicing == VoicingClass::Mixed { 60.0 } else { 70.0 },
        base_amplitude_db: -5.0,
        formants: make_formants(poles),
    }
}

fn affricate(voicing: VoicingClass, poles: &[(f64, f64, f64)]) -> PhoneTarget {
    PhoneTarget {
        voicing,
        manner: MannerClass::Affricate,
        base_duration_ms: 125.0,
        base_amplitude_db: -5.0,
        formants: make_formants(poles),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_resolves_basic_vowels_and_consonants() {
        let table = SymbolTable::builtin();
        for symbol in ["i", "ɛ", "ɑ", "u", "m", "l", "s", "t", "h"] {
            assert!(table.lookup(symbol).is_some(), "missing '{symbol}'");
        }
        let e = table.lookup("ɛ").unwrap();
        assert_eq!(e.manner, MannerClass::Vowel);
        assert_eq!(e.voicing, VoicingClass::Voiced);
        assert_eq!(e.formants.len(), 4);
    }

    #[test]
    fn longest_match_prefers_affricates() {
        let table = SymbolTable::builtin();
        let chars: Vec<char> = "tʃɑ".chars().collect();
        let (len, symbol, target) = table.longest_match(&chars).unwrap();
        assert_eq!(len, 2);
        assert_eq!(symbol, "tʃ");
        assert_eq!(target.manner, MannerClass::Affricate);

        // A bare 't' not followed by 'ʃ' still resolves as a stop.
        let chars: Vec<char> = "tɑ".chars().collect();
        let (len, symbol, target) = table.longest_match(&chars).unwrap();
        assert_eq!(len, 1);
        assert_eq!(symbol, "t");
        assert_eq!(target.manner, MannerClass::Stop);
    }

    #[test]
    fn from_entries_rejects_incomplete_data() {
        let missing_formants = PhoneTarget {
            voicing: VoicingClass::Voiced,
            manner: MannerClass::Vowel,
            base_duration_ms: 100.0,
            base_amplitude_db: 0.0,
            formants: Vec::new(),
        };
        let err = SymbolTable::from_entries([("x".to_owned(), missing_formants)]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSymbolEntry { symbol, .. } if symbol == "x"));

        let bad_bandwidth = PhoneTarget {
            voicing: VoicingClass::Voiced,
            manner: MannerClass::Vowel,
            base_duration_ms: 100.0,
            base_amplitude_db: 0.0,
            formants: vec![Formant {
                frequency_hz: 500.0,
                bandwidth_hz: 0.0,
                amplitude_db: 0.0,
            }],
        };
        assert!(SymbolTable::from_entries([("y".to_owned(), bad_bandwidth)]).is_err());

        let zero_duration = PhoneTarget {
            base_duration_ms: 0.0,
            ..PhoneTarget::silence(0.0)
        };
        assert!(SymbolTable::from_entries([("z".to_owned(), zero_duration)]).is_err());
    }

    #[test]
    fn silence_entries_need_no_formants() {
        let table =
            SymbolTable::from_entries([("_".to_owned(), PhoneTarget::silence(250.0))]).unwrap();
        assert_eq!(table.lookup("_").unwrap().manner, MannerClass::Silence);
    }
}
