//! Binary `.pwlt` artifacts for exported trees.
//!
//! An artifact is a 32-byte [`FormatHeader`] followed by a Postcard-encoded
//! [`Payload`]. The header carries the format version, flags, the payload size
//! and its CRC32 so that truncated or corrupted files are rejected before any
//! decoding happens.
//!
//! ```no_run
//! use pwlfit::persist::{read_from_path, write_to_path};
//! # fn demo(tree: &pwlfit::export::DecisionTree) -> Result<(), Box<dyn std::error::Error>> {
//! write_to_path(tree, "model.pwlt")?;
//! let loaded = read_from_path("model.pwlt")?;
//! assert_eq!(&loaded, tree);
//! # Ok(())
//! # }
//! ```

mod convert;
mod native;
mod payload;

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

pub use native::{
    DeserializeError, FormatFlags, FormatHeader, ModelKind, NativeCodec, SerializeError,
    CURRENT_VERSION_MAJOR, CURRENT_VERSION_MINOR, HEADER_SIZE, MAGIC,
};
pub use payload::{NodeRecord, Payload, TreePayloadV1};

/// Write `tree` to `path`, replacing any existing file.
pub fn write_to_path(
    tree: &crate::export::DecisionTree,
    path: impl AsRef<Path>,
) -> Result<(), SerializeError> {
    let mut writer = BufWriter::new(File::create(path)?);
    NativeCodec::new().write_tree(&mut writer, tree)?;
    writer.flush()?;
    Ok(())
}

/// Read a tree written by [`write_to_path`].
pub fn read_from_path(path: impl AsRef<Path>) -> Result<crate::export::DecisionTree, DeserializeError> {
    let mut reader = BufReader::new(File::open(path)?);
    NativeCodec::new().read_tree(&mut reader)
}
