//! B3DM envelope reader
//!
//! Validates the 28-byte header and slices the container into the four table
//! blocks and the trailing model payload. Nothing here allocates beyond the
//! returned range descriptors.

use std::ops::Range;

use bytemuck::{Pod, Zeroable};

use crate::error::{B3dmError, B3dmResult};

/// Magic tag at offset 0
pub const B3DM_MAGIC: [u8; 4] = *b"b3dm";
/// Size of the fixed header in bytes
pub const HEADER_LEN: usize = 28;
/// The only header version written by known producers
pub const B3DM_VERSION: u32 = 1;

/// B3DM file header (28 bytes, little-endian on disk)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct B3dmHeader {
    /// Magic bytes "b3dm"
    pub magic: [u8; 4],
    /// Version (should be 1)
    pub version: u32,
    /// Total byte length of the file
    pub byte_length: u32,
    /// Feature table JSON byte length
    pub feature_table_json_byte_length: u32,
    /// Feature table binary byte length
    pub feature_table_binary_byte_length: u32,
    /// Batch table JSON byte length
    pub batch_table_json_byte_length: u32,
    /// Batch table binary byte length
    pub batch_table_binary_byte_length: u32,
}

impl B3dmHeader {
    /// Read the header from the first 28 bytes, converting from little-endian.
    fn read(data: &[u8]) -> Self {
        let raw: B3dmHeader = bytemuck::pod_read_unaligned(&data[..HEADER_LEN]);
        Self {
            magic: raw.magic,
            version: u32::from_le(raw.version),
            byte_length: u32::from_le(raw.byte_length),
            feature_table_json_byte_length: u32::from_le(raw.feature_table_json_byte_length),
            feature_table_binary_byte_length: u32::from_le(raw.feature_table_binary_byte_length),
            batch_table_json_byte_length: u32::from_le(raw.batch_table_json_byte_length),
            batch_table_binary_byte_length: u32::from_le(raw.batch_table_binary_byte_length),
        }
    }

    /// Serialize the header back to its on-disk little-endian form.
    pub fn to_le_bytes(&self) -> [u8; HEADER_LEN] {
        let le = Self {
            magic: self.magic,
            version: self.version.to_le(),
            byte_length: self.byte_length.to_le(),
            feature_table_json_byte_length: self.feature_table_json_byte_length.to_le(),
            feature_table_binary_byte_length: self.feature_table_binary_byte_length.to_le(),
            batch_table_json_byte_length: self.batch_table_json_byte_length.to_le(),
            batch_table_binary_byte_length: self.batch_table_binary_byte_length.to_le(),
        };
        let mut out = [0u8; HEADER_LEN];
        out.copy_from_slice(bytemuck::bytes_of(&le));
        out
    }

    fn block_lengths(&self) -> [(&'static str, u32); 4] {
        [
            ("feature table JSON", self.feature_table_json_byte_length),
            ("feature table binary", self.feature_table_binary_byte_length),
            ("batch table JSON", self.batch_table_json_byte_length),
            ("batch table binary", self.batch_table_binary_byte_length),
        ]
    }
}

/// Byte ranges of every section of a validated container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeLayout {
    pub header: B3dmHeader,
    pub feature_table_json: Range<usize>,
    pub feature_table_binary: Range<usize>,
    pub batch_table_json: Range<usize>,
    pub batch_table_binary: Range<usize>,
    pub payload: Range<usize>,
}

impl EnvelopeLayout {
    /// Validate `data` as a b3dm container and compute its section ranges.
    pub fn parse(data: &[u8]) -> B3dmResult<Self> {
        if data.len() < B3DM_MAGIC.len() {
            return Err(B3dmError::TruncatedBuffer {
                section: "magic",
                end: B3DM_MAGIC.len() as u64,
                available: data.len() as u64,
            });
        }

        let mut found = [0u8; 4];
        found.copy_from_slice(&data[..4]);
        if found != B3DM_MAGIC {
            return Err(B3dmError::FormatMismatch { found });
        }

        if data.len() < HEADER_LEN {
            return Err(B3dmError::TruncatedBuffer {
                section: "header",
                end: HEADER_LEN as u64,
                available: data.len() as u64,
            });
        }

        let header = B3dmHeader::read(data);
        if header.byte_length as u64 != data.len() as u64 {
            return Err(B3dmError::LengthMismatch {
                declared: header.byte_length as u64,
                actual: data.len() as u64,
            });
        }

        if header.version != B3DM_VERSION {
            log::warn!("b3dm header declares version {}, decoding as version 1", header.version);
        }

        // u64 running sum so four u32 lengths cannot overflow
        let available = data.len() as u64;
        let mut cursor = HEADER_LEN as u64;
        let mut ranges: [Range<usize>; 4] = Default::default();
        for (slot, (section, len)) in ranges.iter_mut().zip(header.block_lengths()) {
            let end = cursor + len as u64;
            if end > available {
                return Err(B3dmError::TruncatedBuffer {
                    section,
                    end,
                    available,
                });
            }
            *slot = cursor as usize..end as usize;
            cursor = end;
        }

        let [feature_table_json, feature_table_binary, batch_table_json, batch_table_binary] =
            ranges;
        let payload = cursor as usize..data.len();

        log::debug!(
            "b3dm envelope: {} bytes, feature table {}+{}, batch table {}+{}, payload {}",
            data.len(),
            feature_table_json.len(),
            feature_table_binary.len(),
            batch_table_json.len(),
            batch_table_binary.len(),
            payload.len()
        );

        Ok(Self {
            header,
            feature_table_json,
            feature_table_binary,
            batch_table_json,
            batch_table_binary,
            payload,
        })
    }

    /// Copy-free view of the model payload, or `None` if `data` is not the
    /// buffer this layout was parsed from.
    pub fn payload<'a>(&self, data: &'a [u8]) -> Option<&'a [u8]> {
        data.get(self.payload.clone())
    }
}
