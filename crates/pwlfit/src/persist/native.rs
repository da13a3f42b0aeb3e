//! Header and codec of the native artifact format.
//!
//! # Layout
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0       4     Magic ("PWLT")
//! 4       1     Version major
//! 5       1     Version minor
//! 6       1     Model kind
//! 7       1     Reserved
//! 8       2     Flags (little-endian bitfield)
//! 10      2     Reserved
//! 12      4     Payload size in bytes
//! 16      4     CRC32 of the payload
//! 20      4     Number of inputs
//! 24      4     Number of leaves
//! 28      4     Reserved
//! ```

use std::io::{Cursor, Read, Write};

use thiserror::Error;

use super::payload::{Payload, TreePayloadV1};
use crate::export::{DecisionTree, TreeValidationError};
use crate::repr::Evaluate;

/// Magic bytes at the start of every artifact.
pub const MAGIC: &[u8; 4] = b"PWLT";

pub const CURRENT_VERSION_MAJOR: u8 = 1;

pub const CURRENT_VERSION_MINOR: u8 = 0;

pub const HEADER_SIZE: usize = 32;

/// What the payload holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ModelKind {
    DecisionTree = 0,
}

impl ModelKind {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::DecisionTree),
            _ => None,
        }
    }
}

/// Header flag bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormatFlags(u16);

impl FormatFlags {
    /// The tree rounds MIN/MAX corners (smoothing > 0).
    pub const SMOOTHED: u16 = 1 << 0;

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn contains(self, flag: u16) -> bool {
        (self.0 & flag) != 0
    }

    pub fn set(&mut self, flag: u16) {
        self.0 |= flag;
    }
}

/// Fixed-size artifact header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatHeader {
    pub version_major: u8,
    pub version_minor: u8,
    pub kind: ModelKind,
    pub flags: FormatFlags,
    pub payload_size: u32,
    pub checksum: u32,
    pub n_inputs: u32,
    pub n_leaves: u32,
}

impl FormatHeader {
    pub fn new(kind: ModelKind, n_inputs: u32, n_leaves: u32) -> Self {
        Self {
            version_major: CURRENT_VERSION_MAJOR,
            version_minor: CURRENT_VERSION_MINOR,
            kind,
            flags: FormatFlags::empty(),
            payload_size: 0,
            checksum: 0,
            n_inputs,
            n_leaves,
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(MAGIC);
        buf[4] = self.version_major;
        buf[5] = self.version_minor;
        buf[6] = self.kind as u8;
        buf[8..10].copy_from_slice(&self.flags.bits().to_le_bytes());
        buf[12..16].copy_from_slice(&self.payload_size.to_le_bytes());
        buf[16..20].copy_from_slice(&self.checksum.to_le_bytes());
        buf[20..24].copy_from_slice(&self.n_inputs.to_le_bytes());
        buf[24..28].copy_from_slice(&self.n_leaves.to_le_bytes());
        buf
    }

    /// Parse and check magic, version and kind.
    pub fn from_bytes(buf: &[u8; HEADER_SIZE]) -> Result<Self, DeserializeError> {
        if &buf[0..4] != MAGIC {
            return Err(DeserializeError::NotAModel);
        }
        let (version_major, version_minor) = (buf[4], buf[5]);
        if version_major > CURRENT_VERSION_MAJOR {
            return Err(DeserializeError::UnsupportedVersion {
                major: version_major,
                minor: version_minor,
            });
        }
        let kind = ModelKind::from_u8(buf[6])
            .ok_or_else(|| DeserializeError::CorruptPayload(format!("unknown model kind {}", buf[6])))?;
        let le_u32 = |at: usize| u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]]);

        Ok(Self {
            version_major,
            version_minor,
            kind,
            flags: FormatFlags::from_bits(u16::from_le_bytes([buf[8], buf[9]])),
            payload_size: le_u32(12),
            checksum: le_u32(16),
            n_inputs: le_u32(20),
            n_leaves: le_u32(24),
        })
    }
}

/// Errors raised while writing an artifact.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encoding error: {0}")]
    Encoding(#[from] postcard::Error),

    #[error("payload of {0} bytes does not fit the header")]
    PayloadTooLarge(usize),
}

/// Errors raised while reading an artifact.
#[derive(Debug, Error)]
pub enum DeserializeError {
    #[error("not a pwlfit artifact")]
    NotAModel,

    #[error("artifact requires format {major}.{minor} or later")]
    UnsupportedVersion { major: u8, minor: u8 },

    #[error("checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("artifact truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("corrupt payload: {0}")]
    CorruptPayload(String),

    #[error("invalid tree structure: {0}")]
    Validation(#[from] TreeValidationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("decoding error: {0}")]
    Decoding(#[from] postcard::Error),
}

/// Reads and writes artifacts.
#[derive(Debug, Clone, Default)]
pub struct NativeCodec;

impl NativeCodec {
    pub fn new() -> Self {
        Self
    }

    /// Write the header (size and checksum filled in) followed by `payload`.
    pub fn write_to<W: Write>(
        &self,
        writer: &mut W,
        header: &mut FormatHeader,
        payload: &[u8],
    ) -> Result<(), SerializeError> {
        header.payload_size =
            u32::try_from(payload.len()).map_err(|_| SerializeError::PayloadTooLarge(payload.len()))?;
        header.checksum = crc32fast::hash(payload);
        writer.write_all(&header.to_bytes())?;
        writer.write_all(payload)?;
        Ok(())
    }

    /// Read a header and its checksummed payload bytes.
    pub fn read_from<R: Read>(&self, reader: &mut R) -> Result<(FormatHeader, Vec<u8>), DeserializeError> {
        let mut header_buf = [0u8; HEADER_SIZE];
        let got = read_fully(reader, &mut header_buf)?;
        if got < HEADER_SIZE {
            return Err(DeserializeError::Truncated {
                expected: HEADER_SIZE,
                actual: got,
            });
        }
        let header = FormatHeader::from_bytes(&header_buf)?;

        let expected = header.payload_size as usize;
        let mut payload = vec![0u8; expected];
        let got = read_fully(reader, &mut payload)?;
        if got < expected {
            return Err(DeserializeError::Truncated {
                expected: HEADER_SIZE + expected,
                actual: HEADER_SIZE + got,
            });
        }

        let actual = crc32fast::hash(&payload);
        if actual != header.checksum {
            return Err(DeserializeError::ChecksumMismatch {
                expected: header.checksum,
                actual,
            });
        }
        Ok((header, payload))
    }

    pub fn write_tree<W: Write>(&self, writer: &mut W, tree: &DecisionTree) -> Result<(), SerializeError> {
        let payload = postcard::to_allocvec(&Payload::V1(TreePayloadV1::from(tree)))?;
        let mut header = FormatHeader::new(
            ModelKind::DecisionTree,
            tree.n_inputs() as u32,
            tree.n_leaves() as u32,
        );
        if tree.smoothing() > 0.0 {
            header.flags.set(FormatFlags::SMOOTHED);
        }
        self.write_to(writer, &mut header, &payload)
    }

    pub fn read_tree<R: Read>(&self, reader: &mut R) -> Result<DecisionTree, DeserializeError> {
        let (header, bytes) = self.read_from(reader)?;
        let Payload::V1(payload): Payload = postcard::from_bytes(&bytes)?;
        if payload.n_inputs != header.n_inputs {
            return Err(DeserializeError::CorruptPayload(format!(
                "header declares {} inputs, payload has {}",
                header.n_inputs, payload.n_inputs
            )));
        }
        if header.flags.contains(FormatFlags::SMOOTHED) != (payload.smoothing > 0.0) {
            return Err(DeserializeError::CorruptPayload("smoothing flag disagrees with payload".into()));
        }
        let tree = DecisionTree::try_from(payload)?;
        if tree.n_leaves() != header.n_leaves as usize {
            return Err(DeserializeError::CorruptPayload(format!(
                "header declares {} leaves, payload has {}",
                header.n_leaves,
                tree.n_leaves()
            )));
        }
        Ok(tree)
    }

    /// Serialize a tree to a byte vector.
    pub fn serialize(&self, tree: &DecisionTree) -> Result<Vec<u8>, SerializeError> {
        let mut out = Vec::new();
        self.write_tree(&mut out, tree)?;
        Ok(out)
    }

    /// Deserialize a tree from bytes.
    pub fn deserialize(&self, bytes: &[u8]) -> Result<DecisionTree, DeserializeError> {
        self.read_tree(&mut Cursor::new(bytes))
    }
}

/// Read until `buf` is full or the reader is exhausted; returns the bytes read.
fn read_fully<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize, std::io::Error> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{DecisionLeaf, DecisionNode};
    use crate::persist::NodeRecord;

    fn vee(smoothing: f64) -> DecisionTree {
        DecisionTree::from_parts(
            vec![
                DecisionNode::Max { first: 0, len: 2 },
                DecisionNode::Leaf { leaf: 0 },
                DecisionNode::Leaf { leaf: 1 },
            ],
            vec![1, 2],
            vec![
                DecisionLeaf {
                    bias: 0.1,
                    coefficients: vec![1.0, -1.0],
                },
                DecisionLeaf {
                    bias: -0.3,
                    coefficients: vec![-1.0, -1.0],
                },
            ],
            1,
            smoothing,
            8,
        )
        .unwrap()
    }

    #[test]
    fn header_roundtrip() {
        let mut header = FormatHeader::new(ModelKind::DecisionTree, 7, 42);
        header.flags.set(FormatFlags::SMOOTHED);
        header.payload_size = 1234;
        header.checksum = 0xDEAD_BEEF;
        let parsed = FormatHeader::from_bytes(&header.to_bytes()).unwrap();
        assert_eq!(parsed, header);
        assert!(parsed.flags.contains(FormatFlags::SMOOTHED));
    }

    #[test]
    fn tree_roundtrip_is_exact() {
        for smoothing in [0.0, 0.25] {
            let tree = vee(smoothing);
            let bytes = NativeCodec::new().serialize(&tree).unwrap();
            assert_eq!(&bytes[0..4], MAGIC);
            let loaded = NativeCodec::new().deserialize(&bytes).unwrap();
            assert_eq!(loaded, tree);
            for x in [-1.0, -0.2, 0.0, 0.2, 1.0] {
                assert_eq!(loaded.predict(&[x]).to_bits(), tree.predict(&[x]).to_bits());
            }
        }
    }

    #[test]
    fn rejects_bad_magic_and_future_version() {
        let mut bytes = NativeCodec::new().serialize(&vee(0.0)).unwrap();
        let mut wrong = bytes.clone();
        wrong[0] = b'X';
        assert!(matches!(NativeCodec::new().deserialize(&wrong), Err(DeserializeError::NotAModel)));

        bytes[4] = CURRENT_VERSION_MAJOR + 1;
        assert!(matches!(
            NativeCodec::new().deserialize(&bytes),
            Err(DeserializeError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn rejects_flipped_payload_byte() {
        let mut bytes = NativeCodec::new().serialize(&vee(0.0)).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert!(matches!(
            NativeCodec::new().deserialize(&bytes),
            Err(DeserializeError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn rejects_truncation() {
        let bytes = NativeCodec::new().serialize(&vee(0.0)).unwrap();
        assert!(matches!(
            NativeCodec::new().deserialize(&bytes[..10]),
            Err(DeserializeError::Truncated { expected: HEADER_SIZE, actual: 10 })
        ));
        assert!(matches!(
            NativeCodec::new().deserialize(&bytes[..bytes.len() - 1]),
            Err(DeserializeError::Truncated { .. })
        ));
    }

    #[test]
    fn rejects_structurally_invalid_payload() {
        let payload = Payload::V1(TreePayloadV1 {
            n_inputs: 1,
            smoothing: 0.0,
            max_depth: 8,
            nodes: vec![NodeRecord::Max { children: vec![0] }],
        });
        let bytes = postcard::to_allocvec(&payload).unwrap();
        let mut out = Vec::new();
        let mut header = FormatHeader::new(ModelKind::DecisionTree, 1, 0);
        NativeCodec::new().write_to(&mut out, &mut header, &bytes).unwrap();
        assert!(matches!(
            NativeCodec::new().deserialize(&out),
            Err(DeserializeError::Validation(TreeValidationError::SelfLoop { node: 0 }))
        ));
    }
}
