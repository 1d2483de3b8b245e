use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

pub const MANIFEST_FILE_NAME: &str = "manifest.json";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One chunk file produced by a split
///
/// Byte offsets are relative to the source's audio data (the bytes after
/// the metadata header), so `data_start + header_len` is the offset in the
/// source file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkFile {
    pub id: Uuid,
    /// 1-based, matches the number in the file name
    pub index: usize,
    pub path: PathBuf,
    pub data_start: usize,
    pub data_end: usize,
    pub frame_count: usize,
    /// Size on disk, header copy included
    pub size: u64,
    /// SHA-256 of the whole chunk file, lowercase hex
    pub checksum: String,
    /// Estimated from the average bitrate; absent when STREAMINFO has no length
    pub start_ms: Option<u64>,
    pub end_ms: Option<u64>,
}

/// Everything a consumer needs to serve the chunks of one source file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SplitManifest {
    pub source: PathBuf,
    pub header_len: usize,
    pub audio_len: usize,
    pub frame_count: usize,
    pub chunk_size: usize,
    /// False when boundaries come from the bare sync scan and may fall
    /// inside a frame
    pub frames_validated: bool,
    pub created_at: DateTime<Utc>,
    pub chunks: Vec<ChunkFile>,
}

impl SplitManifest {
    /// Write as pretty JSON into `dir`, returning the manifest path
    pub fn write_to_dir(&self, dir: &Path) -> Result<PathBuf, ManifestError> {
        let path = dir.join(MANIFEST_FILE_NAME);
        let json = serde_json::to_vec_pretty(self)?;
        std::fs::write(&path, json)?;
        Ok(path)
    }

    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let json = std::fs::read(path)?;
        Ok(serde_json::from_slice(&json)?)
    }

    /// Total bytes of audio data covered by the chunks
    pub fn covered_audio_bytes(&self) -> usize {
        self.chunks.iter().map(|c| c.data_end - c.data_start).sum()
    }
}
