//! Binary format of row store WAL entries
//!
//! Every entry is a fixed header followed by a checksummed payload:
//! EntryHeader (32 bytes) + key_len(u16) + value_len(u32) + operation(u8)
//! + padding(u8) + key_bytes + value_bytes

use std::path::Path;

use crate::error::{StoreError, StoreResult};

/// Magic bytes opening every WAL entry: "ROWS" in ASCII
pub const MAGIC_ARRAY: [u8; 4] = *b"ROWS";

/// Header size in bytes
pub const HEADER_SIZE: usize = 32;

/// key_len(2) + value_len(4) + operation(1) + padding(1)
const PAYLOAD_PREFIX: usize = 8;

/// Mutation recorded by a WAL entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Operation {
    /// Insert or overwrite a row
    Put = 1,
    /// Remove a row
    Delete = 2,
    /// Concatenate the value onto the existing row (read-modify-write)
    Append = 3,
}

impl Operation {
    fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::Put),
            2 => Some(Self::Delete),
            3 => Some(Self::Append),
            _ => None,
        }
    }
}

/// Fixed-size header for each WAL entry
///
/// Layout:
///   [0..4]   magic:      "ROWS"
///   [4..8]   length:     u32 LE - payload length in bytes
///   [8..12]  checksum:   u32 LE - CRC32C of payload bytes
///   [12]     entry_type: u8     - operation
///   [13..32] reserved, zero
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryHeader {
    pub magic: [u8; 4],
    pub length: u32,
    pub checksum: u32,
    pub entry_type: u8,
}

/// Decoded WAL entry
#[derive(Debug, Clone)]
pub struct WalEntry {
    pub header: EntryHeader,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub operation: Operation,
}

impl EntryHeader {
    pub fn new(length: u32, checksum: u32, op: Operation) -> Self {
        Self {
            magic: MAGIC_ARRAY,
            length,
            checksum,
            entry_type: op as u8,
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.magic);
        buf[4..8].copy_from_slice(&self.length.to_le_bytes());
        buf[8..12].copy_from_slice(&self.checksum.to_le_bytes());
        buf[12] = self.entry_type;
        buf
    }

    pub fn from_bytes(bytes: &[u8; HEADER_SIZE]) -> Self {
        Self {
            magic: [bytes[0], bytes[1], bytes[2], bytes[3]],
            length: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            checksum: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            entry_type: bytes[12],
        }
    }
}

/// Size limits enforced before an entry is serialized
#[derive(Debug, Clone, Copy)]
pub struct EntryLimits {
    pub max_key_size: usize,
    pub max_value_size: usize,
}

/// Serialize one mutation into a complete WAL entry.
pub fn serialize_entry(
    key: &[u8],
    value: &[u8],
    op: Operation,
    limits: EntryLimits,
) -> StoreResult<Vec<u8>> {
    // Validate sizes before any allocation
    if key.len() > limits.max_key_size {
        return Err(StoreError::OversizedEntry {
            entry_size: key.len() as u64,
            max_size: limits.max_key_size as u64,
            component: "key",
        });
    }
    if value.len() > limits.max_value_size {
        return Err(StoreError::OversizedEntry {
            entry_size: value.len() as u64,
            max_size: limits.max_value_size as u64,
            component: "value",
        });
    }

    let payload_size = PAYLOAD_PREFIX + key.len() + value.len();
    let mut buffer = Vec::with_capacity(HEADER_SIZE + payload_size);
    buffer.resize(HEADER_SIZE, 0);
    buffer.extend_from_slice(&(key.len() as u16).to_le_bytes());
    buffer.extend_from_slice(&(value.len() as u32).to_le_bytes());
    buffer.push(op as u8);
    buffer.push(0);
    buffer.extend_from_slice(key);
    buffer.extend_from_slice(value);

    let checksum = crc32c::crc32c(&buffer[HEADER_SIZE..]);
    let header = EntryHeader::new(payload_size as u32, checksum, op);
    buffer[..HEADER_SIZE].copy_from_slice(&header.to_bytes());

    Ok(buffer)
}

/// Deserialize a WAL entry from the start of `data`.
///
/// `path` and `base_offset` only feed error context.
pub fn deserialize_entry(data: &[u8], path: &Path, base_offset: u64) -> StoreResult<WalEntry> {
    let Some(header_bytes) = data.get(..HEADER_SIZE) else {
        return Err(StoreError::WalCorrupted {
            path: path.to_path_buf(),
            offset: base_offset,
            reason: format!("entry too short: {} bytes, need at least {HEADER_SIZE}", data.len()),
        });
    };
    let mut raw = [0u8; HEADER_SIZE];
    raw.copy_from_slice(header_bytes);
    let header = EntryHeader::from_bytes(&raw);

    if header.magic != MAGIC_ARRAY {
        return Err(StoreError::NoMagicFound {
            path: path.to_path_buf(),
            offset: base_offset,
            found_bytes: header.magic,
        });
    }

    let payload_end = HEADER_SIZE + header.length as usize;
    if data.len() < payload_end {
        return Err(StoreError::TornWrite {
            path: path.to_path_buf(),
            expected_size: header.length,
            available_bytes: (data.len() - HEADER_SIZE) as u64,
            offset: base_offset + HEADER_SIZE as u64,
        });
    }

    let payload = &data[HEADER_SIZE..payload_end];
    let computed = crc32c::crc32c(payload);
    if computed != header.checksum {
        return Err(StoreError::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: header.checksum,
            actual: computed,
            offset: base_offset + HEADER_SIZE as u64,
        });
    }

    let corrupted = |reason: String| StoreError::WalCorrupted {
        path: path.to_path_buf(),
        offset: base_offset + HEADER_SIZE as u64,
        reason,
    };

    if payload.len() < PAYLOAD_PREFIX {
        return Err(corrupted("payload too short for field prefix".into()));
    }

    let key_len = u16::from_le_bytes([payload[0], payload[1]]) as usize;
    let value_len = u32::from_le_bytes([payload[2], payload[3], payload[4], payload[5]]) as usize;
    let operation = Operation::from_u8(payload[6])
        .ok_or_else(|| corrupted(format!("invalid operation type: {}", payload[6])))?;

    let key_end = PAYLOAD_PREFIX + key_len;
    let value_end = key_end + value_len;
    if payload.len() < value_end {
        return Err(corrupted(format!(
            "payload too short: need {value_end} bytes for key({key_len}) + value({value_len})"
        )));
    }

    Ok(WalEntry {
        header,
        key: payload[PAYLOAD_PREFIX..key_end].to_vec(),
        value: payload[key_end..value_end].to_vec(),
        operation,
    })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    const LIMITS: EntryLimits = EntryLimits { max_key_size: 64, max_value_size: 1024 };

    fn buffer_path() -> PathBuf {
        PathBuf::from("<buffer>")
    }

    #[test]
    fn test_put_entry_decodes() {
        let serialized = serialize_entry(b"token:09999", b"test", Operation::Put, LIMITS).unwrap();
        let entry = deserialize_entry(&serialized, &buffer_path(), 0).unwrap();

        assert_eq!(entry.key, b"token:09999");
        assert_eq!(entry.value, b"test");
        assert_eq!(entry.operation, Operation::Put);
        assert_eq!(entry.header.magic, MAGIC_ARRAY);
        assert_eq!(entry.header.length as usize, serialized.len() - HEADER_SIZE);
    }

    #[test]
    fn test_append_and_delete_ops_survive() {
        for op in [Operation::Append, Operation::Delete] {
            let bytes = serialize_entry(b"row1", b"", op, LIMITS).unwrap();
            let entry = deserialize_entry(&bytes, &buffer_path(), 0).unwrap();
            assert_eq!(entry.operation, op);
            assert!(entry.value.is_empty());
        }
    }

    #[test]
    fn test_oversized_key_rejected() {
        let key = vec![b'k'; LIMITS.max_key_size + 1];
        let result = serialize_entry(&key, b"val", Operation::Put, LIMITS);
        assert!(matches!(result, Err(StoreError::OversizedEntry { component: "key", .. })));
    }

    #[test]
    fn test_oversized_value_rejected() {
        let value = vec![0u8; LIMITS.max_value_size + 1];
        let result = serialize_entry(b"k", &value, Operation::Put, LIMITS);
        assert!(matches!(result, Err(StoreError::OversizedEntry { component: "value", .. })));
    }

    #[test]
    fn test_max_key_size_accepted() {
        let key = vec![0x41u8; LIMITS.max_key_size];
        assert!(serialize_entry(&key, b"v", Operation::Put, LIMITS).is_ok());
    }

    #[test]
    fn test_corrupted_magic_detected() {
        let mut data = serialize_entry(b"key", b"value", Operation::Put, LIMITS).unwrap();
        data[0] = 0xFF;
        assert!(matches!(
            deserialize_entry(&data, &buffer_path(), 0),
            Err(StoreError::NoMagicFound { .. })
        ));
    }

    #[test]
    fn test_corrupted_payload_detected() {
        let mut data = serialize_entry(b"key", b"value", Operation::Put, LIMITS).unwrap();
        let last = data.len() - 1;
        data[last] ^= 0xFF;
        assert!(matches!(
            deserialize_entry(&data, &buffer_path(), 0),
            Err(StoreError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_truncated_payload_is_torn() {
        let data = serialize_entry(b"key", b"value", Operation::Put, LIMITS).unwrap();
        let cut = &data[..data.len() - 2];
        assert!(matches!(
            deserialize_entry(cut, &buffer_path(), 128),
            Err(StoreError::TornWrite { offset: 160, .. })
        ));
    }
}
