//! Steam Controller frame replay
//!
//! Reads captured input frames from stdin (one hex-encoded frame per line),
//! runs them through the full pipeline with the bindings from
//! configs/default.toml, and logs every output the mock backend receives.
//! Nothing is sent to the system.

use anyhow::{anyhow, Context as _, Result};
use crossbeam_channel::bounded;
use log::{info, warn};
use std::io::{self, BufRead};
use std::sync::Arc;
use std::thread;
use steamcon_rs::backend::MockOutputBackend;
use steamcon_rs::mapping::config::Config;
use steamcon_rs::ControllerManager;

/// Parse a frame like "01 00 01 3c ..." or "0100013c..."
fn parse_hex_frame(line: &str) -> Result<Vec<u8>> {
    let digits: String = line.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.len() % 2 != 0 {
        return Err(anyhow!("odd number of hex digits"));
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .with_context(|| format!("invalid hex byte '{}'", &digits[i..i + 2]))
        })
        .collect()
}

fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();

    println!("=== Steam Controller Frame Replay ===");
    println!();
    println!("Paste or pipe hex-encoded frames, one per line. Ctrl+D to finish.");
    println!();

    let config = Config::load_default().context("loading configs/default.toml")?;
    println!("✓ Loaded configuration from configs/default.toml");

    let output = MockOutputBackend::new();
    let mut manager = ControllerManager::new(&config, Arc::new(output.clone()))?;

    let (sender, receiver) = bounded::<Vec<u8>>(64);
    let reader = thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            for (number, line) in io::stdin().lock().lines().enumerate() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        warn!("Failed to read stdin: {}", e);
                        break;
                    }
                };
                if line.trim().is_empty() || line.starts_with('#') {
                    continue;
                }
                match parse_hex_frame(&line) {
                    Ok(frame) => {
                        if sender.send(frame).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Skipping line {}: {}", number + 1, e),
                }
            }
        })?;

    manager.start();
    manager.run(&receiver);
    manager.shutdown();
    if reader.join().is_err() {
        warn!("stdin reader panicked");
    }

    info!("Replay finished, {} output call(s)", output.calls().len());
    Ok(())
}
