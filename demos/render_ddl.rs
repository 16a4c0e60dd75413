//! Render DDL Example
//!
//! Compiles a patch description and writes its output as raw PCM
//! (signed 16-bit little-endian, stereo) to stdout.
//!
//! Run with:
//!
//! ```text
//! cargo run --example render_ddl -- demos/sine.ddl 2 > sine.raw
//! aplay -f S16_LE -c 2 -r 48000 sine.raw
//! ```
//!
//! An optional third argument names a TOML engine config. Set `RUST_LOG=debug`
//! to watch the graph being built.

use patchbay::prelude::*;
use std::error::Error;
use std::io::{self, Read, Write};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let path = args
        .next()
        .ok_or("usage: render_ddl <patch.ddl> [seconds] [config.toml]")?;
    let seconds: f64 = args.next().map(|s| s.parse()).transpose()?.unwrap_or(1.0);
    let config = match args.next() {
        Some(config) => EngineConfig::load(config)?,
        None => EngineConfig::default(),
    };

    let registry = ComponentRegistry::new();
    let mut graph = patchbay::ddl::load_with(&path, &registry, &config)?;
    if graph.output().is_none() {
        tracing::warn!("patch designates no output; rendering silence");
    }

    let total_frames = (seconds * f64::from(graph.sampling_frequency())) as usize;
    tracing::info!(
        total_frames,
        sampling_frequency = graph.sampling_frequency(),
        "rendering"
    );

    let mut buf = vec![0u8; graph.max_frames_per_read() * 4];
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut remaining = total_frames;
    while remaining > 0 {
        let frames = remaining.min(graph.max_frames_per_read());
        let n = graph.read(&mut buf[..frames * 4])?;
        out.write_all(&buf[..n])?;
        remaining -= n / 4;
    }
    out.flush()?;

    tracing::info!("done");
    Ok(())
}
