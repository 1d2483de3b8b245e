use std::env;
use std::path::PathBuf;
use tracing::{error, info};

use flac_chunker::chunking::ChunkTarget;
use flac_chunker::config::Config;
use flac_chunker::frame_scan::FrameValidation;
use flac_chunker::splitter::FrameSplitter;

fn main() {
    // Use RUST_LOG env var if set, otherwise default to info level
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(log_filter).init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage(&args[0]);
        std::process::exit(1);
    }

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    let mut chunking = config.chunking_config();

    let mut flac_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--out" => {
                chunking.output_dir = PathBuf::from(flag_value(&args, i));
                i += 2;
            }
            "--chunk-size" => {
                let value = flag_value(&args, i);
                match value.parse::<usize>() {
                    Ok(bytes) => chunking.target = ChunkTarget::Bytes(bytes),
                    Err(_) => {
                        error!("Invalid --chunk-size: {}", value);
                        std::process::exit(1);
                    }
                }
                i += 2;
            }
            "--seconds" => {
                let value = flag_value(&args, i);
                match value.parse::<f64>() {
                    Ok(seconds) => chunking.target = ChunkTarget::Seconds(seconds),
                    Err(_) => {
                        error!("Invalid --seconds: {}", value);
                        std::process::exit(1);
                    }
                }
                i += 2;
            }
            "--validate-frames" => {
                chunking.validation = FrameValidation::HeaderCrc;
                i += 1;
            }
            "--no-manifest" => {
                chunking.write_manifest = false;
                i += 1;
            }
            arg if arg.starts_with("--") => {
                error!("Unknown argument: {}", arg);
                print_usage(&args[0]);
                std::process::exit(1);
            }
            arg => {
                if flac_path.is_some() {
                    error!("Only one FLAC file can be split at a time");
                    std::process::exit(1);
                }
                flac_path = Some(PathBuf::from(arg));
                i += 1;
            }
        }
    }

    let Some(flac_path) = flac_path else {
        error!("No input file specified");
        print_usage(&args[0]);
        std::process::exit(1);
    };

    if !flac_path.exists() {
        error!("FLAC file not found: {}", flac_path.display());
        std::process::exit(1);
    }

    let splitter = match FrameSplitter::new(chunking) {
        Ok(splitter) => splitter,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    match splitter.split_file(&flac_path) {
        Ok(manifest) => {
            info!(
                "Split {} into {} chunks ({} frames, {} bytes per chunk target)",
                flac_path.display(),
                manifest.chunks.len(),
                manifest.frame_count,
                manifest.chunk_size
            );
            for chunk in &manifest.chunks {
                println!("{}", chunk.path.display());
            }
        }
        Err(e) => {
            error!("Failed to split {}: {}", flac_path.display(), e);
            std::process::exit(1);
        }
    }
}

/// Value following the flag at `i`, exiting if it is missing
fn flag_value(args: &[String], i: usize) -> &str {
    match args.get(i + 1) {
        Some(value) => value,
        None => {
            error!("{} requires a value", args[i]);
            print_usage(&args[0]);
            std::process::exit(1);
        }
    }
}

fn print_usage(program_name: &str) {
    eprintln!("Usage:");
    eprintln!(
        "  {} <flac_file> [--out <dir>] [--chunk-size <bytes>] [--seconds <secs>] [--validate-frames] [--no-manifest]",
        program_name
    );
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --validate-frames  accept a sync only if its frame header CRC-8 checks out.");
    eprintln!("                     Without it a sync pattern inside frame data can split a");
    eprintln!("                     frame and the audio around that cut will not decode.");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {} album.flac --out flac_chunks", program_name);
    eprintln!("  {} album.flac --seconds 10 --validate-frames", program_name);
}
