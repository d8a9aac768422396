//! Command line front end: transcription file in, 16-bit mono WAV out.

use std::fs;
use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use parwave::{SymbolTable, SynthConfig, languages, synthesize};

#[derive(Parser)]
#[command(version, about = "Synthesize speech from an annotated IPA transcription")]
struct Args {
    /// Transcription file to read; pass '-' for standard input.
    input: PathBuf,

    /// Output WAV path.
    #[arg(short, long, default_value = "speech.wav")]
    output: PathBuf,

    /// Output sample rate in Hz.
    #[arg(long, default_value_t = 22050)]
    sample_rate: u32,

    /// Seed for the noise sources; same seed, same waveform.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Log stage-by-stage detail.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let text = if args.input.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("reading standard input")?;
        buffer
    } else {
        fs::read_to_string(&args.input)
            .with_context(|| format!("reading {}", args.input.display()))?
    };

    let table = SymbolTable::builtin();
    let language = languages::english_canadian();
    let config = SynthConfig {
        sample_rate: args.sample_rate as usize,
        seed: args.seed,
        ..SynthConfig::default()
    };
    let samples = synthesize(&text, &language, &table, &config)?;

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: args.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&args.output, spec)
        .with_context(|| format!("creating {}", args.output.display()))?;
    for sample in &samples {
        #[allow(clippy::cast_possible_truncation)]
        writer.write_sample((sample * f64::from(i16::MAX)).round() as i16)?;
    }
    writer.finalize()?;

    info!(
        samples = samples.len(),
        seconds = samples.len() as f64 / f64::from(args.sample_rate),
        output = %args.output.display(),
        "wrote waveform"
    );
    Ok(())
}
