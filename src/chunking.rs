use crate::flac_header::StreamInfo;
use crate::frame_scan::FrameValidation;
use std::path::PathBuf;

/// Default target chunk size (1MB)
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// What a chunk is sized against
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChunkTarget {
    /// Accumulate frames until at least this many bytes
    Bytes(usize),
    /// Approximate playback length, converted to bytes from the stream's
    /// average bitrate
    Seconds(f64),
}

/// Configuration for splitting operations
#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    /// Chunk size target (default: 1MB)
    pub target: ChunkTarget,
    /// Directory the chunk files are written to
    pub output_dir: PathBuf,
    /// Acceptance test applied to each sync match
    pub validation: FrameValidation,
    /// Write manifest.json next to the chunks
    pub write_manifest: bool,
    /// Refuse inputs larger than this, the whole file is held in memory
    pub max_input_bytes: Option<u64>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        ChunkingConfig {
            target: ChunkTarget::Bytes(DEFAULT_CHUNK_SIZE),
            output_dir: std::env::temp_dir().join("flac_chunks"),
            validation: FrameValidation::SyncOnly,
            write_manifest: true,
            max_input_bytes: None,
        }
    }
}

impl ChunkingConfig {
    /// Resolve the target to a byte threshold for a concrete stream.
    ///
    /// A seconds target needs STREAMINFO with a known sample count; without
    /// one it falls back to [`DEFAULT_CHUNK_SIZE`].
    pub fn chunk_size_for(&self, stream_info: Option<&StreamInfo>, audio_len: usize) -> usize {
        match self.target {
            ChunkTarget::Bytes(bytes) => bytes,
            ChunkTarget::Seconds(seconds) => stream_info
                .and_then(|info| target_bytes_for_duration(seconds, info, audio_len))
                .unwrap_or(DEFAULT_CHUNK_SIZE),
        }
    }
}

/// Byte threshold that covers roughly `seconds` of audio at the stream's
/// average bitrate
pub fn target_bytes_for_duration(seconds: f64, stream_info: &StreamInfo, audio_len: usize) -> Option<usize> {
    let duration_ms = stream_info.duration_ms()?;
    if seconds.is_nan() || seconds <= 0.0 {
        return None;
    }
    let bytes = audio_len as f64 * (seconds * 1000.0) / duration_ms as f64;
    Some((bytes.round() as usize).max(1))
}

/// Estimate the playback position of an audio byte offset by assuming a
/// constant bitrate
pub fn estimate_time_ms(audio_offset: usize, audio_len: usize, duration_ms: u64) -> u64 {
    if audio_len == 0 {
        return 0;
    }
    (audio_offset as u128 * duration_ms as u128 / audio_len as u128) as u64
}

/// A run of consecutive frames written out as one file.
///
/// Offsets are relative to the audio data, i.e. the bytes after the
/// metadata header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    /// Zero-based emission order
    pub index: usize,
    pub start_frame: usize,
    /// Exclusive
    pub end_frame: usize,
    pub data_start: usize,
    /// Exclusive
    pub data_end: usize,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.data_end - self.data_start
    }

    pub fn is_empty(&self) -> bool {
        self.data_end == self.data_start
    }

    pub fn frame_count(&self) -> usize {
        self.end_frame - self.start_frame
    }
}

/// Greedy grouping of frame positions into chunks.
///
/// Each chunk takes whole frames until the accumulated frame lengths reach
/// the threshold. The last frame runs to the end of the audio data and
/// always lands in the final chunk, so the chunks tile
/// `[positions[0], data_len)` without gaps.
#[derive(Debug, Clone)]
pub struct ChunkPlan<'a> {
    positions: &'a [usize],
    data_len: usize,
    threshold: usize,
    current_frame: usize,
    next_index: usize,
}

/// Plan chunks over `positions` (ascending offsets into a buffer of
/// `data_len` bytes) with a byte `threshold`.
pub fn plan_chunks(positions: &[usize], data_len: usize, threshold: usize) -> ChunkPlan<'_> {
    ChunkPlan {
        positions,
        data_len,
        // a zero threshold would never advance past a frame
        threshold: threshold.max(1),
        current_frame: 0,
        next_index: 0,
    }
}

impl Iterator for ChunkPlan<'_> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        let frame_count = self.positions.len();
        if self.current_frame >= frame_count {
            return None;
        }

        let start_frame = self.current_frame;
        let mut accumulated = 0usize;

        while accumulated < self.threshold && self.current_frame < frame_count - 1 {
            let frame_start = self.positions[self.current_frame];
            let frame_end = self.positions[self.current_frame + 1];
            accumulated += frame_end - frame_start;
            self.current_frame += 1;
        }

        // Only the last frame is left: it runs to the end of the buffer and
        // joins this chunk
        if self.current_frame == frame_count - 1 {
            self.current_frame += 1;
        }

        let data_start = self.positions[start_frame];
        let data_end = self
            .positions
            .get(self.current_frame)
            .copied()
            .unwrap_or(self.data_len);

        let chunk = Chunk {
            index: self.next_index,
            start_frame,
            end_frame: self.current_frame,
            data_start,
            data_end,
        };
        self.next_index += 1;
        Some(chunk)
    }
}
