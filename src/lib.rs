// Library exports for the split_flac binary and integration tests

pub mod config;

pub mod chunking;
pub mod flac_header;
pub mod frame_scan;
pub mod manifest;
pub mod splitter;

pub use flac_header::{read_metadata_header, read_metadata_header_from_path, MetadataHeader};
pub use splitter::{split_flac_file, FrameSplitter, SplitError};
