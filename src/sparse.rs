//! Sparse file writing: write `buf` to a seekable, writable destination,
//! turning runs of at least `min_sparse_len` zero bytes into holes instead
//! of literal zero bytes on disk.

use std::io::{Seek, SeekFrom, Write};

use crate::error::CoreError;
use crate::primitives::{find_non_sparse_end, find_not_zero};

/// Advance `w`'s position by `n` bytes without writing anything, creating a
/// hole on a file that supports sparse regions. Splits the seek into chunks
/// that fit `i64`, since [`SeekFrom::Current`] takes a signed offset.
fn append_sparse_region<W: Seek>(w: &mut W, mut n: u64) -> Result<(), CoreError> {
    while n > 0 {
        let step = n.min(i64::MAX as u64);
        w.seek(SeekFrom::Current(step as i64))?;
        n -= step;
    }
    Ok(())
}

/// Fold `count` additional pending zero bytes into `prev_pending`. If the
/// sum would not fit in a `u64`, flush `prev_pending` as a hole first and
/// start a fresh pending run of `count` zeros.
fn record_sparse_zeros<W: Seek>(
    w: &mut W,
    prev_pending: u64,
    count: u64,
) -> Result<u64, CoreError> {
    match prev_pending.checked_add(count) {
        Some(sum) => Ok(sum),
        None => {
            append_sparse_region(w, prev_pending)?;
            Ok(count)
        }
    }
}

/// Write all of `buf`, retrying until the kernel either accepts every byte
/// or returns an error. A zero-byte write is not itself a kernel error and
/// must not abort the retry loop.
fn write_all_retrying<W: Write>(w: &mut W, mut buf: &[u8]) -> Result<(), CoreError> {
    while !buf.is_empty() {
        match w.write(buf) {
            Ok(n) => buf = &buf[n..],
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Write `buf` to `w`, replacing any run of at least `min_sparse_len` zero
/// bytes with a hole (a seek instead of literal writes). `prev_sparse_len`
/// carries a pending zero count left over from a previous call on the same
/// destination, for chunked callers; the returned value is the analogous
/// pending zero count after this call, to be passed to the next one (or
/// flushed by the caller once no more data follows).
pub fn write_sparsely<W: Write + Seek>(
    w: &mut W,
    buf: &[u8],
    min_sparse_len: u64,
    prev_sparse_len: u64,
) -> Result<u64, CoreError> {
    if min_sparse_len == 0 {
        return Err(CoreError::invalid("min_sparse_len must be positive"));
    }

    let mut block = 0usize;
    let end = buf.len();
    let mut zeros = prev_sparse_len;

    loop {
        if block == end {
            return Ok(zeros);
        }

        if buf[block] != 0 {
            let min_len = usize::try_from(min_sparse_len).unwrap_or(usize::MAX);
            let probe = block + 1 + find_non_sparse_end(&buf[block + 1..end], min_len);

            append_sparse_region(w, zeros)?;
            write_all_retrying(w, &buf[block..probe])?;

            let remaining = (end - probe) as u64;
            zeros = if remaining < min_sparse_len {
                remaining
            } else {
                min_sparse_len
            };
            block = probe + zeros as usize;
        } else {
            let zeros_end = block + find_not_zero(&buf[block..end]);
            zeros = record_sparse_zeros(w, zeros, (zeros_end - block) as u64)?;
            block = zeros_end;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn roundtrip(buf: &[u8], min_sparse_len: u64) -> Vec<u8> {
        let mut f = tempfile::tempfile().unwrap();
        let pending = write_sparsely(&mut f, buf, min_sparse_len, 0).unwrap();
        if pending > 0 {
            append_sparse_region(&mut f, pending).unwrap();
        }
        let len = f.stream_position().unwrap();
        f.set_len(len).unwrap();
        f.seek(SeekFrom::Start(0)).unwrap();
        let mut out = Vec::new();
        f.read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn all_zeros_round_trips() {
        let buf = vec![0u8; 1000];
        assert_eq!(roundtrip(&buf, 16), buf);
    }

    #[test]
    fn no_zeros_round_trips() {
        let buf: Vec<u8> = (0..=255u8).cycle().take(500).map(|b| b.wrapping_add(1)).collect();
        assert_eq!(roundtrip(&buf, 16), buf);
    }

    #[test]
    fn interleaved_data_and_zero_runs_round_trips() {
        let mut buf = vec![1u8; 20];
        buf.extend(std::iter::repeat(0u8).take(64));
        buf.extend(vec![2u8; 30]);
        buf.extend(std::iter::repeat(0u8).take(64));
        buf.extend(vec![3u8; 5]);
        assert_eq!(roundtrip(&buf, 16), buf);
    }

    #[test]
    fn short_zero_runs_below_threshold_are_kept_literal() {
        let mut buf = vec![1u8; 10];
        buf.extend(std::iter::repeat(0u8).take(3));
        buf.extend(vec![2u8; 10]);
        assert_eq!(roundtrip(&buf, 16), buf);
    }

    #[test]
    fn trailing_zero_run_shorter_than_min_len_still_round_trips() {
        let mut buf = vec![1u8; 50];
        buf.extend(std::iter::repeat(0u8).take(3));
        assert_eq!(roundtrip(&buf, 16), buf);
    }

    #[test]
    fn chunked_calls_carry_pending_zeros_across_boundaries() {
        let mut f = tempfile::tempfile().unwrap();
        let chunk_a = vec![1u8; 10];
        let mut chunk_b = vec![0u8; 40];
        chunk_b.extend(vec![2u8; 10]);

        let pending = write_sparsely(&mut f, &chunk_a, 16, 0).unwrap();
        let pending = write_sparsely(&mut f, &chunk_b, 16, pending).unwrap();
        if pending > 0 {
            append_sparse_region(&mut f, pending).unwrap();
        }

        let len = f.stream_position().unwrap();
        f.set_len(len).unwrap();
        f.seek(SeekFrom::Start(0)).unwrap();
        let mut out = Vec::new();
        f.read_to_end(&mut out).unwrap();

        let mut expected = chunk_a;
        expected.extend(chunk_b);
        assert_eq!(out, expected);
    }

    #[test]
    fn rejects_zero_min_sparse_len() {
        let mut f = tempfile::tempfile().unwrap();
        assert!(write_sparsely(&mut f, b"abc", 0, 0).is_err());
    }
}
