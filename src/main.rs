//! Neuramp CLI - Offline renderer
//!
//! Runs a WAV file through the full processing pipeline: optional neural
//! model, tone stack, and gain stages. Stands in for a plugin host when
//! auditioning models from the command line.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use neuramp::params::ParameterSet;
use neuramp::AudioPipeline;

#[derive(Parser)]
#[command(name = "neuramp-cli", version, about = "Render a WAV file through the neural amp pipeline")]
struct Cli {
    /// Input WAV file
    input: PathBuf,

    /// Output WAV file (32-bit float, mono)
    output: PathBuf,

    /// Neural model JSON file to load
    #[arg(long)]
    model: Option<PathBuf>,

    /// Parameter override as SYMBOL=VALUE (e.g. PREGAIN=-3 or MTYPE=1);
    /// repeatable
    #[arg(long = "param", value_name = "SYMBOL=VALUE")]
    params: Vec<String>,

    /// Processing block size in samples
    #[arg(long, default_value_t = 512)]
    block_size: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    if cli.block_size == 0 {
        bail!("block size must be non-zero");
    }

    let (mut samples, sample_rate) = read_mono_wav(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;
    tracing::info!(
        "Loaded {} samples at {} Hz from {}",
        samples.len(),
        sample_rate,
        cli.input.display()
    );

    let mut pipeline = AudioPipeline::new(sample_rate as f32);

    for override_arg in &cli.params {
        let (symbol, value) = override_arg
            .split_once('=')
            .with_context(|| format!("invalid --param '{}', expected SYMBOL=VALUE", override_arg))?;
        let id = ParameterSet::id_for_symbol(symbol)
            .with_context(|| format!("unknown parameter symbol '{}'", symbol))?;
        let value: f32 = value
            .parse()
            .with_context(|| format!("invalid value in --param '{}'", override_arg))?;
        pipeline.set_parameter(id, value);
    }

    if let Some(model_path) = &cli.model {
        pipeline
            .loader()
            .load_file(model_path)
            .with_context(|| format!("failed to load model {}", model_path.display()))?;
    }

    pipeline.activate();

    for block in samples.chunks_mut(cli.block_size) {
        pipeline.process(block);
    }

    write_mono_wav(&cli.output, &samples, sample_rate)
        .with_context(|| format!("failed to write {}", cli.output.display()))?;
    tracing::info!("Wrote {}", cli.output.display());

    Ok(())
}

/// Read a WAV file as mono f32, mixing down multi-channel input
fn read_mono_wav(path: &PathBuf) -> Result<(Vec<f32>, u32)> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let channels = spec.channels as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()?
        }
    };

    let mono: Vec<f32> = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect();

    Ok((mono, spec.sample_rate))
}

fn write_mono_wav(path: &PathBuf, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}
