use std::fs::File;
use std::path::Path;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_FLAC};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

pub const SAMPLE_RATE: u32 = 44100;
pub const CHANNELS: u32 = 2;
pub const BITS_PER_SAMPLE: u32 = 16;

/// Initialize tracing for tests with proper test output handling
pub fn tracing_init() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Interleaved stereo test signal: two sines with a little noise so frames
/// don't compress down to nothing
pub fn test_samples(seconds: u32) -> Vec<i32> {
    let frames = (SAMPLE_RATE * seconds) as usize;
    let mut samples = Vec::with_capacity(frames * CHANNELS as usize);
    let mut seed: u32 = 0x1234_5678;

    for n in 0..frames {
        let t = n as f64 / SAMPLE_RATE as f64;
        for ch in 0..CHANNELS {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let noise = ((seed >> 16) % 128) as i32 - 64;
            let freq = if ch == 0 { 440.0 } else { 660.0 };
            let sine = (t * freq * std::f64::consts::TAU).sin() * 8000.0;
            samples.push(sine as i32 + noise);
        }
    }
    samples
}

/// Encode `samples` to a FLAC byte stream with 4096-sample blocks
pub fn encode_flac(samples: &[i32]) -> Vec<u8> {
    use flacenc::bitsink::ByteSink;
    use flacenc::component::BitRepr;
    use flacenc::config;
    use flacenc::error::Verify;
    use flacenc::source::MemSource;

    let source = MemSource::from_samples(
        samples,
        CHANNELS as usize,
        BITS_PER_SAMPLE as usize,
        SAMPLE_RATE as usize,
    );

    let config = config::Encoder::default()
        .into_verified()
        .map_err(|(_, e)| e)
        .expect("Failed to verify encoder config");

    let flac_stream = flacenc::encode_with_fixed_block_size(&config, source, 4096)
        .expect("Failed to encode FLAC");

    let mut sink = ByteSink::new();
    flac_stream
        .write(&mut sink)
        .expect("Failed to write stream to sink");
    sink.as_slice().to_vec()
}

/// Write an encoded test file of `seconds` length into `dir`
pub fn write_test_flac(dir: &Path, name: &str, seconds: u32) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, encode_flac(&test_samples(seconds))).expect("Failed to write test FLAC");
    path
}

/// Decode a FLAC file with symphonia and return the number of sample frames
pub fn decode_frame_count(path: &Path) -> Result<u64, String> {
    let file = File::open(path).map_err(|e| format!("Failed to open file: {}", e))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    hint.with_extension("flac");

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| format!("Failed to probe file: {}", e))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec == CODEC_TYPE_FLAC)
        .ok_or_else(|| "No FLAC track found".to_string())?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| format!("Failed to create decoder: {}", e))?;

    let mut frames = 0u64;
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => return Err(format!("Failed to read packet: {}", e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = decoder
            .decode(&packet)
            .map_err(|e| format!("Failed to decode packet: {}", e))?;
        frames += decoded.frames() as u64;
    }

    Ok(frames)
}
