//! # Voxel Streaming Demo
//!
//! Runs a headless fly-through over generated terrain and logs what the streaming
//! controller does.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run --release -- [config.json] [seed]
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);
    let config_path = args.next().map(PathBuf::from);
    let seed = args.next().and_then(|seed| seed.parse().ok()).unwrap_or(7);

    match voxel_streaming::run(config_path.as_deref(), seed) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            log::error!("{}", error);
            eprintln!("voxel-streaming: {}", error);
            ExitCode::FAILURE
        }
    }
}
