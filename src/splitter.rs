// Frame Splitter
//
// Re-partitions the audio frames of a FLAC file into standalone FLAC files
// of bounded size. Each output is the source's metadata header followed by
// a contiguous run of frames, so any decoder can play it on its own as long
// as the scanned sync positions line up with real frame starts.
//
// The whole source is read into one owned buffer; the header reader and the
// frame scanner both work on borrowed slices of it.

use crate::chunking::{estimate_time_ms, plan_chunks, Chunk, ChunkTarget, ChunkingConfig};
use crate::flac_header::{FlacHeaderError, MetadataHeader};
use crate::frame_scan::{scan_frames, FrameValidation};
use crate::manifest::{ChunkFile, ManifestError, SplitManifest};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum SplitError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("FLAC header error: {0}")]
    Header(#[from] FlacHeaderError),
    #[error("No FLAC frames found in the audio data")]
    NoFramesFound,
    #[error("Input is {size} bytes, limit is {limit} bytes")]
    InputTooLarge { size: u64, limit: u64 },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),
}

/// File name of the chunk with 1-based sequence number `number`
pub fn chunk_file_name(number: usize) -> String {
    format!("chunk_{:04}.flac", number)
}

/// Splits FLAC files into chunk files according to a [`ChunkingConfig`]
#[derive(Debug, Clone)]
pub struct FrameSplitter {
    config: ChunkingConfig,
}

impl FrameSplitter {
    /// Create a splitter, rejecting targets that could never close a chunk
    pub fn new(config: ChunkingConfig) -> Result<Self, SplitError> {
        match config.target {
            ChunkTarget::Bytes(0) => {
                return Err(SplitError::InvalidConfig(
                    "chunk size must be at least 1 byte".to_string(),
                ));
            }
            ChunkTarget::Seconds(seconds) if seconds.is_nan() || seconds <= 0.0 => {
                return Err(SplitError::InvalidConfig(format!(
                    "chunk duration must be positive, got {}",
                    seconds
                )));
            }
            _ => {}
        }

        Ok(FrameSplitter { config })
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Split the FLAC file at `flac_path` into the configured output directory.
    ///
    /// Format, truncation and empty-scan failures happen before anything is
    /// written. A failure while writing chunks leaves the chunks already
    /// written in place.
    pub fn split_file(&self, flac_path: &Path) -> Result<SplitManifest, SplitError> {
        if let Some(limit) = self.config.max_input_bytes {
            let size = fs::metadata(flac_path)?.len();
            if size > limit {
                return Err(SplitError::InputTooLarge { size, limit });
            }
        }

        info!("Splitting FLAC file: {}", flac_path.display());
        let file_data = fs::read(flac_path)?;
        self.split_data(flac_path, &file_data)
    }

    /// Split an in-memory FLAC file image; `source` is only recorded in the
    /// manifest
    pub fn split_data(&self, source: &Path, file_data: &[u8]) -> Result<SplitManifest, SplitError> {
        let header = MetadataHeader::parse(file_data)?;
        let audio_data = &file_data[header.len()..];

        debug!(
            "Metadata header: {} bytes in {} blocks, {} bytes of audio data",
            header.len(),
            header.blocks().len(),
            audio_data.len()
        );

        let positions = scan_frames(audio_data, self.config.validation);
        if positions.is_empty() {
            return Err(SplitError::NoFramesFound);
        }
        info!("Found {} frame positions", positions.len());

        let frames_validated = self.config.validation != FrameValidation::SyncOnly;
        if !frames_validated {
            warn!(
                "Frame headers not validated: a sync pattern inside frame data can cut a frame \
                 in two and that audio will not decode"
            );
        }

        if positions[0] > 0 {
            warn!(
                "{} bytes before the first frame sync are not part of any chunk",
                positions[0]
            );
        }

        let stream_info = header.stream_info();
        let chunk_size = self
            .config
            .chunk_size_for(stream_info.as_ref(), audio_data.len());
        let duration_ms = stream_info.and_then(|info| info.duration_ms());

        let output_dir = &self.config.output_dir;
        fs::create_dir_all(output_dir)?;

        let mut chunks = Vec::new();
        for chunk in plan_chunks(&positions, audio_data.len(), chunk_size) {
            let chunk_file = write_chunk(output_dir, &header, audio_data, &chunk, duration_ms)?;
            info!(
                "Created {} ({} bytes, {} frames)",
                chunk_file.path.display(),
                chunk.len(),
                chunk.frame_count()
            );
            chunks.push(chunk_file);
        }

        let manifest = SplitManifest {
            source: source.to_path_buf(),
            header_len: header.len(),
            audio_len: audio_data.len(),
            frame_count: positions.len(),
            chunk_size,
            frames_validated,
            created_at: Utc::now(),
            chunks,
        };

        if self.config.write_manifest {
            let manifest_path = manifest.write_to_dir(output_dir)?;
            debug!("Wrote manifest {}", manifest_path.display());
        }

        info!(
            "Splitting complete: {} chunks in {}",
            manifest.chunks.len(),
            output_dir.display()
        );

        Ok(manifest)
    }
}

/// Split `flac_path` into chunks of about `chunk_size` bytes under
/// `output_dir`, returning the chunk paths in order
pub fn split_flac_file(
    flac_path: &Path,
    output_dir: &Path,
    chunk_size: usize,
) -> Result<Vec<PathBuf>, SplitError> {
    let config = ChunkingConfig {
        target: ChunkTarget::Bytes(chunk_size),
        output_dir: output_dir.to_path_buf(),
        write_manifest: false,
        ..Default::default()
    };

    let manifest = FrameSplitter::new(config)?.split_file(flac_path)?;
    Ok(manifest.chunks.into_iter().map(|chunk| chunk.path).collect())
}

fn write_chunk(
    output_dir: &Path,
    header: &MetadataHeader,
    audio_data: &[u8],
    chunk: &Chunk,
    duration_ms: Option<u64>,
) -> Result<ChunkFile, std::io::Error> {
    let number = chunk.index + 1;
    let path = output_dir.join(chunk_file_name(number));
    let frames = &audio_data[chunk.data_start..chunk.data_end];

    let mut writer = BufWriter::new(File::create(&path)?);
    writer.write_all(header.as_bytes())?;
    writer.write_all(frames)?;
    writer.flush()?;

    let mut hasher = Sha256::new();
    hasher.update(header.as_bytes());
    hasher.update(frames);
    let checksum = format!("{:x}", hasher.finalize());

    Ok(ChunkFile {
        id: uuid::Uuid::new_v4(),
        index: number,
        path,
        data_start: chunk.data_start,
        data_end: chunk.data_end,
        frame_count: chunk.frame_count(),
        size: (header.len() + frames.len()) as u64,
        checksum,
        start_ms: duration_ms.map(|d| estimate_time_ms(chunk.data_start, audio_data.len(), d)),
        end_ms: duration_ms.map(|d| estimate_time_ms(chunk.data_end, audio_data.len(), d)),
    })
}
