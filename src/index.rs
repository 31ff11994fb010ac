//! IDXv2 pack index writer: assembles a sorted fan-out + OID + CRC + offset
//! image into a pre-sized mutable region (typically a memory map over a
//! freshly-created `.idx` file).

use crate::error::CoreError;
use crate::oid::{Oid, OID_LEN};

/// 8-byte IDXv2 magic.
pub const IDX_MAGIC: [u8; 8] = [0xff, 0x74, 0x4f, 0x63, 0x00, 0x00, 0x00, 0x02];

const FAN_ENTRIES: usize = 256;
const FAN_TABLE_LEN: usize = FAN_ENTRIES * 4;

/// One entry destined for the index: an OID, its CRC32 over the pack
/// bytes it covers, and its byte offset within the pack.
#[derive(Debug, Clone, Copy)]
pub struct IndexEntry {
    pub oid: Oid,
    pub crc32: u32,
    pub offset: u64,
}

/// Write an IDXv2 image into `region`.
///
/// `buckets` must have exactly 256 entries, one per possible first OID
/// byte; `buckets[i]` holds every entry whose OID's first byte is `i`, in
/// any order (each bucket is sorted in place). `label` is used only to
/// annotate errors (typically the destination path). Returns the total
/// number of entries written, which always equals the sum of all bucket
/// lengths.
pub fn write_idx(
    label: &str,
    region: &mut [u8],
    buckets: &mut [Vec<IndexEntry>],
) -> Result<usize, CoreError> {
    if buckets.len() != FAN_ENTRIES {
        return Err(CoreError::invalid(format!(
            "{label}: expected {FAN_ENTRIES} buckets, got {}",
            buckets.len()
        )));
    }

    let total: usize = buckets.iter().map(Vec::len).sum();
    let mut overflow: Vec<u64> = Vec::new();

    let oid_table_len = total * OID_LEN;
    let crc_table_len = total * 4;
    let ofs_table_len = total * 4;
    let header_len = IDX_MAGIC.len() + FAN_TABLE_LEN;
    let body_len = oid_table_len + crc_table_len + ofs_table_len;

    // Final size depends on the overflow count, known only after bucket 0
    // is processed at the earliest, so reserve generously and validate
    // against the caller's region once the real overflow count is known.
    if region.len() < header_len + body_len {
        return Err(CoreError::invalid(format!(
            "{label}: region too small for {total} entries"
        )));
    }

    region[..IDX_MAGIC.len()].copy_from_slice(&IDX_MAGIC);

    let fan_start = IDX_MAGIC.len();
    let oid_start = fan_start + FAN_TABLE_LEN;
    let crc_start = oid_start + oid_table_len;
    let ofs_start = crc_start + crc_table_len;

    let mut count: u64 = 0;
    let mut oid_cursor = oid_start;
    let mut crc_cursor = crc_start;
    let mut ofs_cursor = ofs_start;

    for (i, bucket) in buckets.iter_mut().enumerate() {
        bucket.sort_by_key(|e| e.oid);

        let new_count = count
            .checked_add(bucket.len() as u64)
            .ok_or_else(|| CoreError::overflow(format!("{label}: fan-out count overflow")))?;
        let fan_value = u32::try_from(new_count)
            .map_err(|_| CoreError::overflow(format!("{label}: bucket {i} count exceeds u32")))?;
        region[fan_start + i * 4..fan_start + i * 4 + 4].copy_from_slice(&fan_value.to_be_bytes());
        count = new_count;

        for entry in bucket.iter() {
            region[oid_cursor..oid_cursor + OID_LEN].copy_from_slice(entry.oid.as_bytes());
            oid_cursor += OID_LEN;

            region[crc_cursor..crc_cursor + 4].copy_from_slice(&entry.crc32.to_be_bytes());
            crc_cursor += 4;

            let ofs_value = if entry.offset > 0x7fff_ffff {
                let idx = u32::try_from(overflow.len()).map_err(|_| {
                    CoreError::overflow(format!("{label}: too many 64-bit offset overflows"))
                })?;
                overflow.push(entry.offset);
                0x8000_0000 | idx
            } else {
                entry.offset as u32
            };
            region[ofs_cursor..ofs_cursor + 4].copy_from_slice(&ofs_value.to_be_bytes());
            ofs_cursor += 4;
        }
    }

    let ofs64_start = ofs_cursor;
    let ofs64_len = overflow.len() * 8;
    if region.len() < ofs64_start + ofs64_len {
        return Err(CoreError::invalid(format!(
            "{label}: region too small for {} overflow offsets",
            overflow.len()
        )));
    }
    let mut ofs64_cursor = ofs64_start;
    for offset in &overflow {
        region[ofs64_cursor..ofs64_cursor + 8].copy_from_slice(&offset.to_be_bytes());
        ofs64_cursor += 8;
    }

    Ok(count as usize)
}

/// Flush a memory-mapped IDX region asynchronously: a best-effort
/// durability signal, not a full `fsync`-equivalent.
pub fn flush_idx_region(mmap: &memmap2::MmapMut) -> Result<(), CoreError> {
    mmap.flush_async().map_err(CoreError::from)
}
