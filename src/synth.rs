//! Synthesis engine: contour sequences to sample buffers.
//!
//! The signal path follows Klatt's 1980 cascade/parallel arrangement. Voiced
//! excitation comes from a KLGLOTT88 natural glottal pulse (glottal flow
//! `t^2 - t^3`, its derivative used as the source), frication from low-pass
//! filtered white noise. The cascade branch runs the blended excitation
//! through the formant resonators in series; the parallel branch runs its
//! own voicing-weighted blend of glottal pulses and frication noise through
//! per-formant resonators, individually peak-gain scaled and summed with
//! alternating signs, so mixed-voicing frication keeps its voice bar.
//!
//! Resonators are retuned every frame without clearing their delay line, so
//! filter memory carries across frame and phone boundaries within one
//! sentence. Each sentence starts from zero state.

use std::f64::consts::PI;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::debug;

use crate::error::SynthesisError;
use crate::ipa::{Formant, MannerClass};
use crate::prosody::{build_sentence_contours, PhoneContour, ProsodyParams};
use crate::utterance::Utterance;

/// Engine-wide knobs. All defaults are conventions, not contracts.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthConfig {
    pub sample_rate: usize,
    /// Frame width driving parameter interpolation, in milliseconds.
    pub frame_ms: f64,
    /// Silence appended after every sentence, in milliseconds.
    pub sentence_gap_ms: f64,
    /// Downward normalization target for the final buffer.
    pub peak_level: f64,
    /// Open glottis fraction of each F0 period.
    pub open_phase_ratio: f64,
    /// Pitch flutter depth, 0 to 1.
    pub flutter_level: f64,
    /// Base seed; each sentence derives its own stream from it.
    pub seed: u64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        SynthConfig {
            sample_rate: 22050,
            frame_ms: 5.0,
            sentence_gap_ms: 500.0,
            peak_level: 0.95,
            open_phase_ratio: 0.7,
            flutter_level: 0.25,
            seed: 0,
        }
    }
}

impl SynthConfig {
    /// Samples per interpolation frame.
    ///
    /// # Errors
    ///
    /// [`SynthesisError::InvalidFrameLength`] when the frame rounds to zero
    /// samples at this sample rate.
    pub fn samples_per_frame(&self) -> Result<usize, SynthesisError> {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let n = (self.sample_rate as f64 * self.frame_ms / 1000.0).round() as usize;
        if n == 0 || !self.frame_ms.is_finite() {
            return Err(SynthesisError::InvalidFrameLength {
                frame_ms: self.frame_ms,
            });
        }
        Ok(n)
    }
}

/// Convert a dB value into a linear amplitude. -99 dB and below, or NaN,
/// map to zero.
#[must_use]
pub fn db_to_lin(db: f64) -> f64 {
    if db <= -99.0 || db.is_nan() {
        0.0
    } else {
        10.0_f64.powf(db / 20.0)
    }
}

/// A second order IIR resonator section.
///
/// `y[n] = a * x[n] + b * y[n-1] + c * y[n-2]` with
/// `r = exp(-PI * bw / sampleRate)`, `c = -r^2`,
/// `b = 2 * r * cos(2 * PI * f / sampleRate)` and unity DC gain
/// `a = 1 - b - c`. Retuning recomputes the coefficients only; the delay
/// line `y1`/`y2` is never touched by [`Resonator::set`].
#[derive(Debug, Clone)]
pub struct Resonator {
    sample_rate: f64,
    a: f64,
    b: f64,
    c: f64,
    r: f64,
    y1: f64,
    y2: f64,
}

impl Resonator {
    #[must_use]
    pub fn new(sample_rate: usize) -> Self {
        Resonator {
            sample_rate: sample_rate as f64,
            a: 0.0,
            b: 0.0,
            c: 0.0,
            r: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// Retunes the section. Delay state persists.
    ///
    /// # Errors
    ///
    /// [`SynthesisError::FrequencyOutOfRange`] unless `0 < f < Nyquist`;
    /// [`SynthesisError::InvalidBandwidth`] unless `bw > 0`.
    pub fn set(&mut self, f: f64, bw: f64) -> Result<(), SynthesisError> {
        let nyquist = self.sample_rate / 2.0;
        if !(f > 0.0 && f < nyquist) {
            return Err(SynthesisError::FrequencyOutOfRange {
                frequency: f,
                nyquist,
            });
        }
        if !(bw > 0.0 && bw.is_finite()) {
            return Err(SynthesisError::InvalidBandwidth { bandwidth: bw });
        }
        self.r = (-PI * bw / self.sample_rate).exp();
        let w = 2.0 * PI * f / self.sample_rate;
        self.c = -(self.r * self.r);
        self.b = 2.0 * self.r * w.cos();
        self.a = 1.0 - self.b - self.c;
        Ok(())
    }

    /// Rescales `a` so the gain at the resonance frequency is `peak_gain`.
    ///
    /// # Errors
    ///
    /// [`SynthesisError::InvalidGain`] unless `peak_gain` is positive and
    /// finite.
    pub fn set_peak_gain(&mut self, peak_gain: f64) -> Result<(), SynthesisError> {
        if !(peak_gain > 0.0 && peak_gain.is_finite()) {
            return Err(SynthesisError::InvalidGain { gain: peak_gain });
        }
        self.a = peak_gain * (1.0 - self.r);
        Ok(())
    }

    pub fn step(&mut self, x: f64) -> f64 {
        let y = self.a * x + self.b * self.y1 + self.c * self.y2;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}

/// First order low-pass section used inside the noise source.
#[derive(Debug, Clone)]
struct LpFilter1 {
    sample_rate: f64,
    a: f64,
    b: f64,
    y1: f64,
}

impl LpFilter1 {
    fn new(sample_rate: usize) -> Self {
        LpFilter1 {
            sample_rate: sample_rate as f64,
            a: 1.0,
            b: 0.0,
            y1: 0.0,
        }
    }

    /// Sets the gain `g` at frequency `f`, with `extra_gain` as DC gain.
    fn set(&mut self, f: f64, g: f64, extra_gain: f64) -> Result<(), SynthesisError> {
        if !(f > 0.0 && f < self.sample_rate / 2.0) {
            return Err(SynthesisError::FrequencyOutOfRange {
                frequency: f,
                nyquist: self.sample_rate / 2.0,
            });
        }
        if !(g > 0.0 && g < 1.0) || !extra_gain.is_finite() {
            return Err(SynthesisError::InvalidGain { gain: g });
        }
        let w = 2.0 * PI * f / self.sample_rate;
        let q = (1.0 - g.powi(2) * w.cos()) / (1.0 - g.powi(2));
        self.b = q - (q.powi(2) - 1.0).sqrt();
        self.a = (1.0 - self.b) * extra_gain;
        Ok(())
    }

    fn step(&mut self, x: f64) -> f64 {
        let y = self.a * x + self.b * self.y1;
        self.y1 = y;
        y
    }
}

fn white_noise<R: Rng>(rng: &mut R) -> f64 {
    rng.random_range(-1.0..=1.0)
}

/// Low-pass filtered white noise.
///
/// Matches the behavior of a first order LP filter with b = 0.75 at a
/// 10 kHz sample rate, re-targeted to the configured rate, with an output
/// gain compensating for the -1..1 amplitude range.
struct LpNoiseSource<R> {
    lp_filter: LpFilter1,
    rng: R,
}

impl<R: Rng> LpNoiseSource<R> {
    fn new(sample_rate: usize, rng: R) -> Result<Self, SynthesisError> {
        let old_b = 0.75;
        let old_sample_rate = 10000.0;
        // Gain at 1 kHz of the original filter, with unity DC gain.
        let f = 1000.0;
        let g = (1.0 - old_b)
            / (1.0 - 2.0 * old_b * (2.0 * PI * f / old_sample_rate).cos() + old_b.powi(2)).sqrt();
        let extra_gain = 2.5 * (sample_rate as f64 / 10000.0).powf(0.33);

        let mut source = LpNoiseSource {
            lp_filter: LpFilter1::new(sample_rate),
            rng,
        };
        source.lp_filter.set(f, g, extra_gain)?;
        Ok(source)
    }

    fn get_next(&mut self) -> f64 {
        let x = white_noise(&mut self.rng);
        self.lp_filter.step(x)
    }
}

/// KLGLOTT88 natural glottal source. Glottal flow `t^2 - t^3`; the
/// derivative `2t - 3t^2` is the emitted signal. The jump back to zero at
/// the end of the open phase is left unsmoothed, as in the classic model.
struct NaturalGlottalSource {
    x: f64,
    a: f64,
    b: f64,
    open_phase_length: usize,
    position_in_period: usize,
}

impl NaturalGlottalSource {
    fn new() -> Self {
        let mut source = NaturalGlottalSource {
            x: 0.0,
            a: 0.0,
            b: 0.0,
            open_phase_length: 0,
            position_in_period: 0,
        };
        source.start_period(0);
        source
    }

    fn start_period(&mut self, open_phase_length: usize) {
        self.open_phase_length = open_phase_length;
        self.x = 0.0;
        let amplification = 5.0;
        self.b = -amplification / (open_phase_length as f64).powi(2);
        self.a = -self.b * open_phase_length as f64 / 3.0;
        self.position_in_period = 0;
    }

    fn get_next(&mut self) -> f64 {
        self.position_in_period += 1;
        if self.position_in_period >= self.open_phase_length {
            self.x = 0.0;
            return 0.0;
        }
        self.a += self.b;
        self.x += self.a;
        self.x
    }
}

/// Slow sinusoidal F0 perturbation. The 12.7, 7.1 and 4.7 Hz components
/// give a long repetition period.
fn flutter(f0: f64, level: f64, time_s: f64) -> f64 {
    if level <= 0.0 {
        return f0;
    }
    let w = 2.0 * PI * time_s;
    let a = (12.7 * w).sin() + (7.1 * w).sin() + (4.7 * w).sin();
    f0 * (1.0 + a * level / 50.0)
}

fn lerp(a: f64, b: f64, u: f64) -> f64 {
    a + (b - a) * u
}

/// Interpolation on a log scale, for frequencies and F0.
fn log_lerp(a: f64, b: f64, u: f64) -> f64 {
    (a.ln() + (b.ln() - a.ln()) * u).exp()
}

/// Fully interpolated parameters for one frame.
#[derive(Debug, Clone)]
pub struct FrameParams {
    pub f0_hz: Option<f64>,
    pub formants: Vec<Formant>,
    pub voicing_mix: f64,
    /// 1.0 is pure cascade, 0.0 pure parallel.
    pub cascade_weight: f64,
    pub amplitude_lin: f64,
}

/// Evaluates a contour's control points at phase `u` in `0..=1`:
/// onset to target over the first half, target to offset over the second.
#[must_use]
pub fn frame_params(contour: &PhoneContour, u: f64) -> FrameParams {
    let segment = |onset: f64, target: f64, offset: f64, log: bool| {
        let (a, b, v) = if u < 0.5 {
            (onset, target, u * 2.0)
        } else {
            (target, offset, (u - 0.5) * 2.0)
        };
        if log { log_lerp(a, b, v) } else { lerp(a, b, v) }
    };

    let f0_hz = match (
        contour.onset_f0_hz,
        contour.target_f0_hz,
        contour.offset_f0_hz,
    ) {
        (Some(onset), Some(target), Some(offset)) => Some(segment(onset, target, offset, true)),
        _ => None,
    };

    let formants = contour
        .target_formants
        .iter()
        .enumerate()
        .map(|(i, target)| {
            let onset = contour.onset_formants.get(i).unwrap_or(target);
            let offset = contour.offset_formants.get(i).unwrap_or(target);
            Formant {
                frequency_hz: segment(onset.frequency_hz, target.frequency_hz, offset.frequency_hz, true),
                bandwidth_hz: segment(onset.bandwidth_hz, target.bandwidth_hz, offset.bandwidth_hz, false),
                amplitude_db: segment(onset.amplitude_db, target.amplitude_db, offset.amplitude_db, false),
            }
        })
        .collect();

    let cascade_weight = match contour.manner {
        MannerClass::Vowel | MannerClass::Nasal | MannerClass::Liquid => 1.0,
        MannerClass::Fricative | MannerClass::Silence => 0.0,
        MannerClass::Stop => 0.25,
        // Affricates release from frication into a vocalic tail.
        MannerClass::Affricate => u,
    };

    FrameParams {
        f0_hz,
        formants,
        voicing_mix: contour.voicing_mix,
        cascade_weight,
        amplitude_lin: db_to_lin(contour.amplitude_db),
    }
}

/// Renders one sentence. Owns all filter and source state; construct a
/// fresh renderer per sentence so each starts silent.
pub struct SentenceRenderer<R: Rng> {
    sample_rate: f64,
    samples_per_frame: usize,
    frame_ms: f64,
    open_phase_ratio: f64,
    flutter_level: f64,
    cascade: Vec<Resonator>,
    parallel: Vec<Resonator>,
    glottal: NaturalGlottalSource,
    aspiration: LpNoiseSource<R>,
    frication: LpNoiseSource<R>,
    period_length: usize,
    position_in_period: usize,
    samples_rendered: usize,
    flutter_time_offset: f64,
}

impl<R: Rng + Clone> SentenceRenderer<R> {
    /// # Errors
    ///
    /// [`SynthesisError::InvalidFrameLength`] for a degenerate frame width.
    pub fn new(config: &SynthConfig, mut rng: R) -> Result<Self, SynthesisError> {
        let samples_per_frame = config.samples_per_frame()?;
        let flutter_time_offset = f64::from(rng.random_range(0..=1000_u32));
        Ok(SentenceRenderer {
            sample_rate: config.sample_rate as f64,
            samples_per_frame,
            frame_ms: config.frame_ms,
            open_phase_ratio: config.open_phase_ratio,
            flutter_level: config.flutter_level,
            cascade: Vec::new(),
            parallel: Vec::new(),
            glottal: NaturalGlottalSource::new(),
            aspiration: LpNoiseSource::new(config.sample_rate, rng.clone())?,
            frication: LpNoiseSource::new(config.sample_rate, rng)?,
            period_length: 0,
            position_in_period: 0,
            samples_rendered: 0,
            flutter_time_offset,
        })
    }

    /// Appends one phone's samples to `out`.
    ///
    /// # Errors
    ///
    /// Invalid formant data surfaces as the corresponding
    /// [`SynthesisError`]; nothing is clamped.
    pub fn render_phone(
        &mut self,
        contour: &PhoneContour,
        out: &mut Vec<f64>,
    ) -> Result<(), SynthesisError> {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let frames = ((contour.duration_ms / self.frame_ms).ceil() as usize).max(1);

        if contour.is_silence() {
            out.extend(std::iter::repeat_n(0.0, frames * self.samples_per_frame));
            self.samples_rendered += frames * self.samples_per_frame;
            return Ok(());
        }

        for frame_index in 0..frames {
            let u = (frame_index as f64 + 0.5) / frames as f64;
            let frame = frame_params(contour, u);
            self.render_frame(&frame, out)?;
        }
        Ok(())
    }

    fn render_frame(&mut self, frame: &FrameParams, out: &mut Vec<f64>) -> Result<(), SynthesisError> {
        let banks = frame.formants.len();
        while self.cascade.len() < banks {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let sr = self.sample_rate as usize;
            self.cascade.push(Resonator::new(sr));
            self.parallel.push(Resonator::new(sr));
        }
        // Retune in place; delay lines persist across frames and phones.
        let mut parallel_active = Vec::with_capacity(banks);
        for (i, formant) in frame.formants.iter().enumerate() {
            self.cascade[i].set(formant.frequency_hz, formant.bandwidth_hz)?;
            let gain = db_to_lin(formant.amplitude_db);
            if gain > 0.0 {
                self.parallel[i].set(formant.frequency_hz, formant.bandwidth_hz)?;
                self.parallel[i].set_peak_gain(gain)?;
                parallel_active.push(i);
            }
        }

        for _ in 0..self.samples_per_frame {
            let voice = if let Some(f0) = frame.f0_hz {
                if self.position_in_period >= self.period_length {
                    self.start_period(f0);
                }
                self.position_in_period += 1;
                self.glottal.get_next()
            } else {
                0.0
            };
            let aspiration = self.aspiration.get_next();
            let excitation = frame.voicing_mix * voice + (1.0 - frame.voicing_mix) * aspiration;

            let mut cascade_out = excitation;
            for i in 0..banks {
                cascade_out = self.cascade[i].step(cascade_out);
            }

            let frication = self.frication.get_next();
            // Voicing reaches the parallel branch too, so mixed-voicing
            // frication is audibly voiced.
            let parallel_excitation =
                frame.voicing_mix * voice + (1.0 - frame.voicing_mix) * frication;
            let mut parallel_out = 0.0;
            let mut sign = 1.0;
            for &i in &parallel_active {
                parallel_out += sign * self.parallel[i].step(parallel_excitation);
                sign = -sign;
            }

            let sample = frame.amplitude_lin
                * (frame.cascade_weight * cascade_out
                    + (1.0 - frame.cascade_weight) * parallel_out);
            out.push(sample);
            self.samples_rendered += 1;
        }
        Ok(())
    }

    fn start_period(&mut self, f0: f64) {
        let time_s = self.samples_rendered as f64 / self.sample_rate + self.flutter_time_offset;
        let modulated = flutter(f0, self.flutter_level, time_s);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let period = ((self.sample_rate / modulated).round() as usize).max(2);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let open = ((period as f64 * self.open_phase_ratio).round() as usize).max(1);
        self.period_length = period;
        self.position_in_period = 0;
        self.glottal.start_period(open);
    }
}

/// Renders one sentence's contours into a fresh zero-state buffer.
///
/// # Errors
///
/// Any [`SynthesisError`] from the contour data or configuration.
pub fn render_sentence(
    contours: &[PhoneContour],
    config: &SynthConfig,
    seed: u64,
) -> Result<Vec<f64>, SynthesisError> {
    let mut renderer = SentenceRenderer::new(config, SmallRng::seed_from_u64(seed))?;
    let mut out = Vec::new();
    for contour in contours {
        renderer.render_phone(contour, &mut out)?;
    }
    Ok(out)
}

/// Renders a finalized utterance: sentences in parallel, each with its own
/// seeded random stream, concatenated in order with the configured gap and
/// peak-normalized downward.
///
/// # Errors
///
/// The first [`SynthesisError`] from any sentence.
pub fn render_utterance(
    utterance: &Utterance,
    prosody: &ProsodyParams,
    config: &SynthConfig,
) -> Result<Vec<f64>, SynthesisError> {
    let sentences: Vec<_> = utterance.sentences().collect();
    let rendered: Vec<Vec<f64>> = sentences
        .par_iter()
        .enumerate()
        .map(|(index, &sentence)| {
            let contours = build_sentence_contours(sentence, prosody);
            let seed = sentence_seed(config.seed, index);
            render_sentence(&contours, config, seed)
        })
        .collect::<Result<_, _>>()?;

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let gap = (config.sample_rate as f64 * config.sentence_gap_ms / 1000.0).round() as usize;
    let total: usize = rendered.iter().map(|b| b.len() + gap).sum();
    let mut buffer = Vec::with_capacity(total);
    for sentence in rendered {
        buffer.extend_from_slice(&sentence);
        buffer.extend(std::iter::repeat_n(0.0, gap));
    }

    normalize(&mut buffer, config.peak_level);
    debug!(
        sentences = sentences.len(),
        samples = buffer.len(),
        "rendered utterance"
    );
    Ok(buffer)
}

/// Derives an independent per-sentence seed, so scheduling cannot affect
/// output.
fn sentence_seed(base: u64, index: usize) -> u64 {
    base ^ (index as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Downward-only peak normalization followed by a hard clip.
fn normalize(buffer: &mut [f64], peak_level: f64) {
    let peak = buffer.iter().fold(0.0_f64, |m, &s| m.max(s.abs()));
    if peak > peak_level {
        let scale = peak_level / peak;
        for sample in buffer.iter_mut() {
            *sample *= scale;
        }
    }
    for sample in buffer.iter_mut() {
        *sample = sample.clamp(-1.0, 1.0);
    }
}
