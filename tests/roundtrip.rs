//! End-to-end round trips across the index writers: build IDXv2 images with
//! [`packidx_core::index`], merge them with [`packidx_core::midx`], and
//! confirm the Bloom filter and sparse writer agree with independently
//! computed expectations.

use packidx_core::bloom::{bloom_add, bloom_contains, BLOOM_HEADER_LEN};
use packidx_core::index::{write_idx, IDX_MAGIC, IndexEntry};
use packidx_core::midx::{merge_into, MidxInput};
use packidx_core::oid::{Oid, OID_LEN};
use packidx_core::sparse::write_sparsely;

fn oid(first: u8, rest: u8) -> Oid {
    let mut bytes = [rest; OID_LEN];
    bytes[0] = first;
    Oid::from_bytes(bytes)
}

fn write_single_idx(entries: &[(Oid, u32, u64)]) -> Vec<u8> {
    let mut buckets: Vec<Vec<IndexEntry>> = vec![Vec::new(); 256];
    for &(oid, crc32, offset) in entries {
        buckets[oid.first_byte() as usize].push(IndexEntry { oid, crc32, offset });
    }
    let total = entries.len();
    let region_len = IDX_MAGIC.len() + 256 * 4 + total * (OID_LEN + 4 + 4);
    let mut region = vec![0u8; region_len];
    let count = write_idx("test.idx", &mut region, &mut buckets).unwrap();
    assert_eq!(count, total);
    region
}

/// Pull the sorted OID array back out of an IDXv2 image built by
/// `write_single_idx`, given the entry count used to build it.
fn oids_from_idx(region: &[u8], total: usize) -> Vec<u8> {
    let oid_start = IDX_MAGIC.len() + 256 * 4;
    region[oid_start..oid_start + total * OID_LEN].to_vec()
}

#[test]
fn two_packs_merge_into_one_globally_sorted_midx() {
    let pack_a = write_single_idx(&[
        (oid(0x01, 0x00), 10, 100),
        (oid(0x05, 0x00), 11, 101),
    ]);
    let pack_b = write_single_idx(&[
        (oid(0x03, 0x00), 20, 200),
        (oid(0x07, 0x00), 21, 201),
    ]);

    let a_oids = oids_from_idx(&pack_a, 2);
    let b_oids = oids_from_idx(&pack_b, 2);

    let bits = 4;
    let total = 4;
    let header_len = 12;
    let fan_entries = 1usize << bits;
    let region_len = header_len + fan_entries * 4 + total * OID_LEN + total * 4;
    let mut midx = vec![0u8; region_len];

    let inputs = vec![
        MidxInput::new(&a_oids, None, 0).unwrap(),
        MidxInput::new(&b_oids, None, 1000).unwrap(),
    ];
    let count = merge_into(&mut midx, header_len, bits, total, inputs).unwrap();
    assert_eq!(count, total);

    let oid_start = header_len + fan_entries * 4;
    let merged: Vec<&[u8]> = (0..total)
        .map(|i| &midx[oid_start + i * OID_LEN..oid_start + (i + 1) * OID_LEN])
        .collect();
    let expected = [
        oid(0x01, 0x00),
        oid(0x03, 0x00),
        oid(0x05, 0x00),
        oid(0x07, 0x00),
    ];
    for (got, want) in merged.iter().zip(expected.iter()) {
        assert_eq!(*got, want.as_bytes());
    }

    let fan_start = header_len;
    let fan = |i: usize| {
        let start = fan_start + i * 4;
        u32::from_be_bytes(midx[start..start + 4].try_into().unwrap())
    };
    assert_eq!(fan(fan_entries - 1), total as u32);
}

#[test]
fn bloom_filter_over_merged_oids_has_no_false_negatives() {
    let oids: Vec<Oid> = (0..200u8).map(|i| oid(i, i.wrapping_mul(7))).collect();
    let flat: Vec<u8> = oids.iter().flat_map(|o| *o.as_bytes()).collect();

    let nbits = 14;
    let mut bloom = vec![0u8; BLOOM_HEADER_LEN + (1usize << nbits)];
    let added = bloom_add(&mut bloom, &flat, nbits, 4).unwrap();
    assert_eq!(added, oids.len());

    for o in &oids {
        let probe = bloom_contains(&bloom, o.as_bytes(), nbits, 4).unwrap();
        assert!(probe.present, "{o:?} must never be a false negative");
    }
}

#[test]
fn sparse_writer_output_matches_plain_copy_byte_for_byte() {
    let mut buf = vec![9u8; 50];
    buf.extend(std::iter::repeat(0u8).take(5000));
    buf.extend(vec![7u8; 50]);

    let mut sparse_file = tempfile::tempfile().unwrap();
    let pending = write_sparsely(&mut sparse_file, &buf, 4096, 0).unwrap();
    assert_eq!(pending, 0, "trailing non-zero data leaves nothing pending");

    use std::io::{Read, Seek, SeekFrom};
    sparse_file.seek(SeekFrom::Start(0)).unwrap();
    let mut out = Vec::new();
    sparse_file.read_to_end(&mut out).unwrap();
    assert_eq!(out, buf);
}
