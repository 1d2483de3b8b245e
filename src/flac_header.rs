use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Stream marker every FLAC file starts with
pub const FLAC_MARKER: &[u8; 4] = b"fLaC";

/// Block type of STREAMINFO, always the first metadata block
pub const STREAMINFO_BLOCK_TYPE: u8 = 0;

const STREAMINFO_LEN: usize = 34;

#[derive(Debug, Error)]
pub enum FlacHeaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Format error: {0}")]
    Format(String),
    #[error("Truncated input: {0}")]
    Truncated(String),
}

/// One metadata block as seen while walking the header chain.
///
/// Block types are never interpreted here: picture, seek table, vorbis
/// comment and application blocks are all copied verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataBlockDescriptor {
    pub is_last: bool,
    pub block_type: u8,
    /// Payload length, 24 bits on the wire
    pub length: u32,
    /// Offset of the block's header byte within the metadata header
    pub offset: usize,
}

impl MetadataBlockDescriptor {
    /// Range of the payload bytes within the metadata header
    pub fn payload_range(&self) -> std::ops::Range<usize> {
        let start = self.offset + 4;
        start..start + self.length as usize
    }
}

/// Audio properties decoded from the STREAMINFO block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamInfo {
    pub min_block_size: u16,
    pub max_block_size: u16,
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    /// 0 when the encoder did not know the length
    pub total_samples: u64,
}

impl StreamInfo {
    /// Stream duration, or `None` if the sample count or rate is unknown
    pub fn duration_ms(&self) -> Option<u64> {
        if self.total_samples == 0 || self.sample_rate == 0 {
            return None;
        }
        Some(self.total_samples * 1000 / self.sample_rate as u64)
    }

    fn parse(payload: &[u8]) -> Option<Self> {
        if payload.len() < STREAMINFO_LEN {
            return None;
        }

        let min_block_size = u16::from_be_bytes([payload[0], payload[1]]);
        let max_block_size = u16::from_be_bytes([payload[2], payload[3]]);
        let sample_rate =
            (u32::from_be_bytes([0, payload[10], payload[11], payload[12]]) >> 4) & 0xFFFFF;
        let channels = ((payload[12] >> 1) & 0x07) as u16 + 1;
        let bits_per_sample = (((payload[12] & 0x01) << 4) | ((payload[13] >> 4) & 0x0F)) as u16 + 1;

        // 36 bits: low nibble of byte 13 followed by four whole bytes
        let total_samples = ((payload[13] as u64 & 0x0F) << 32)
            | (u32::from_be_bytes([payload[14], payload[15], payload[16], payload[17]]) as u64);

        Some(StreamInfo {
            min_block_size,
            max_block_size,
            sample_rate,
            channels,
            bits_per_sample,
            total_samples,
        })
    }
}

/// Everything in a FLAC file before the first audio frame: the marker and
/// the complete metadata block chain.
///
/// The buffer is immutable once read and is prefixed verbatim onto every
/// chunk so that each chunk is a standalone FLAC stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataHeader {
    bytes: Vec<u8>,
    blocks: Vec<MetadataBlockDescriptor>,
}

impl MetadataHeader {
    /// Parse the header from an in-memory file image
    pub fn parse(file_data: &[u8]) -> Result<Self, FlacHeaderError> {
        read_metadata_header(file_data)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Byte offset of the first audio frame in the source file
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn blocks(&self) -> &[MetadataBlockDescriptor] {
        &self.blocks
    }

    pub fn block_payload(&self, block: &MetadataBlockDescriptor) -> &[u8] {
        &self.bytes[block.payload_range()]
    }

    /// Decode STREAMINFO if the header carries a well-sized one
    pub fn stream_info(&self) -> Option<StreamInfo> {
        self.blocks
            .iter()
            .find(|block| block.block_type == STREAMINFO_BLOCK_TYPE)
            .and_then(|block| StreamInfo::parse(self.block_payload(block)))
    }
}

/// Read the metadata header from `reader`.
///
/// On success the reader is positioned exactly at the first audio byte.
/// Pass `&mut reader` to keep using the same handle afterwards.
pub fn read_metadata_header<R: Read>(mut reader: R) -> Result<MetadataHeader, FlacHeaderError> {
    let mut bytes = Vec::with_capacity(STREAMINFO_LEN + 8);

    let read = read_up_to(&mut reader, FLAC_MARKER.len(), &mut bytes)?;
    if read < FLAC_MARKER.len() || bytes[..] != FLAC_MARKER[..] {
        return Err(FlacHeaderError::Format("not a FLAC file".to_string()));
    }

    let mut blocks = Vec::new();
    loop {
        let offset = bytes.len();

        if read_up_to(&mut reader, 1, &mut bytes)? < 1 {
            return Err(FlacHeaderError::Truncated(format!(
                "missing metadata block header at offset {}",
                offset
            )));
        }
        let header_byte = bytes[offset];
        let is_last = header_byte & 0x80 != 0;
        let block_type = header_byte & 0x7F;

        if read_up_to(&mut reader, 3, &mut bytes)? < 3 {
            return Err(FlacHeaderError::Truncated(format!(
                "short length field in metadata block at offset {}",
                offset
            )));
        }
        let length = u32::from_be_bytes([0, bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]]);

        let read = read_up_to(&mut reader, length as usize, &mut bytes)?;
        if read < length as usize {
            return Err(FlacHeaderError::Truncated(format!(
                "metadata block at offset {} declares {} bytes, only {} available",
                offset, length, read
            )));
        }

        debug!(
            "Metadata block type {} at offset {}: {} bytes{}",
            block_type,
            offset,
            length,
            if is_last { " (last)" } else { "" }
        );

        blocks.push(MetadataBlockDescriptor {
            is_last,
            block_type,
            length,
            offset,
        });

        if is_last {
            break;
        }
    }

    Ok(MetadataHeader { bytes, blocks })
}

/// Open `flac_path` and read its metadata header
pub fn read_metadata_header_from_path(flac_path: &Path) -> Result<MetadataHeader, FlacHeaderError> {
    let file = File::open(flac_path)?;
    read_metadata_header(BufReader::new(file))
}

/// Append up to `count` bytes from `reader` onto `buffer`, stopping early at EOF
fn read_up_to<R: Read>(reader: &mut R, count: usize, buffer: &mut Vec<u8>) -> std::io::Result<usize> {
    reader.by_ref().take(count as u64).read_to_end(buffer)
}
