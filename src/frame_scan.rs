// Frame sync scanning
//
// Locates probable audio-frame starts in the post-header region by matching
// the 14-bit FLAC frame sync code byte by byte. No frame is decoded, so the
// sync pattern turning up inside frame payload data yields a false
// positive. Header validation narrows that down but cannot rule it out.

use tracing::debug;

/// 14-bit frame sync code, matched against the top bits of a 16-bit word
pub const FRAME_SYNC_CODE: u16 = 0x3FFE;

/// How strictly a sync match is accepted as a frame start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameValidation {
    /// Accept every 14-bit sync match
    #[default]
    SyncOnly,
    /// Also require a well-formed frame header with a matching CRC-8
    HeaderCrc,
}

/// Byte offsets of every sync match in `audio_data`, in ascending order
pub fn find_frame_positions(audio_data: &[u8]) -> Vec<usize> {
    scan_frames(audio_data, FrameValidation::SyncOnly)
}

/// Scan `audio_data` for frame starts.
///
/// After an accepted match the cursor skips the whole sync word, so matches
/// never overlap; otherwise it advances one byte.
pub fn scan_frames(audio_data: &[u8], validation: FrameValidation) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut rejected = 0usize;
    let mut i = 0;

    while i + 1 < audio_data.len() {
        let word = u16::from_be_bytes([audio_data[i], audio_data[i + 1]]);
        if word >> 2 != FRAME_SYNC_CODE {
            i += 1;
            continue;
        }

        let accepted = match validation {
            FrameValidation::SyncOnly => true,
            FrameValidation::HeaderCrc => is_valid_frame_header(&audio_data[i..]),
        };

        if accepted {
            positions.push(i);
            i += 2;
        } else {
            rejected += 1;
            i += 1;
        }
    }

    debug!(
        "Sync scan over {} bytes: {} frames, {} rejected",
        audio_data.len(),
        positions.len(),
        rejected
    );

    positions
}

/// Check whether `data` starts with a structurally valid FLAC frame header
/// whose trailing CRC-8 matches.
pub fn is_valid_frame_header(data: &[u8]) -> bool {
    frame_header_len(data).is_some()
}

/// Length of the frame header at the start of `data`, CRC byte included
fn frame_header_len(data: &[u8]) -> Option<usize> {
    if data.len() < 4 {
        return None;
    }

    // 0xFF, then 0b111110 + reserved bit (must be 0) + blocking strategy
    if data[0] != 0xFF || data[1] & 0xFE != 0xF8 {
        return None;
    }

    let block_size_code = data[2] >> 4;
    let sample_rate_code = data[2] & 0x0F;
    if block_size_code == 0 || sample_rate_code == 0x0F {
        return None;
    }

    let channel_assignment = data[3] >> 4;
    let sample_size_code = (data[3] >> 1) & 0x07;
    if channel_assignment > 0b1010 || sample_size_code == 0b011 || data[3] & 0x01 != 0 {
        return None;
    }

    let mut pos = 4;
    pos += coded_number_len(data.get(pos..)?)?;

    pos += match block_size_code {
        6 => 1,
        7 => 2,
        _ => 0,
    };
    pos += match sample_rate_code {
        12 => 1,
        13 | 14 => 2,
        _ => 0,
    };

    let crc = *data.get(pos)?;
    if crc8(&data[..pos]) != crc {
        return None;
    }

    Some(pos + 1)
}

/// Length of the UTF-8 style coded frame/sample number at the start of `data`
fn coded_number_len(data: &[u8]) -> Option<usize> {
    let first = *data.first()?;
    let len = match first.leading_ones() {
        0 => 1,
        // continuation byte can't lead
        1 => return None,
        n @ 2..=7 => n as usize,
        _ => return None,
    };

    let continuation = data.get(1..len)?;
    if continuation.iter().all(|byte| byte & 0xC0 == 0x80) {
        Some(len)
    } else {
        None
    }
}

/// CRC-8, polynomial x^8 + x^2 + x + 1, initial value 0
pub fn crc8(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |crc, &byte| {
        let mut crc = crc ^ byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ 0x07
            } else {
                crc << 1
            };
        }
        crc
    })
}
