//! MIDX multi-index merger: a k-way merge of several sorted OID streams
//! into one globally sorted fan-out/OID/name image.

use std::cmp::Ordering;
use std::io::Write;

use crate::error::CoreError;
use crate::oid::OID_LEN;
use crate::primitives::{bytes_cmp, extract_bits};
use crate::tty::stderr_is_tty;

/// How often (in entries written) the merge reports progress to stderr.
const PROGRESS_INTERVAL: usize = 102_400;

/// One input to the merge: a sorted OID array, an optional parallel name
/// array (big-endian `u32` per OID), and the base value added to every
/// name this input contributes.
pub struct MidxInput<'a> {
    oids: &'a [u8],
    names: Option<&'a [u8]>,
    name_base: u32,
    cur: usize,
}

impl<'a> MidxInput<'a> {
    /// Build an input cursor. `oids` must be a flat, 20-byte-aligned
    /// buffer; `names`, if present, must hold `oids.len() / 20` big-endian
    /// `u32` entries (4 bytes each).
    pub fn new(
        oids: &'a [u8],
        names: Option<&'a [u8]>,
        name_base: u32,
    ) -> Result<Self, CoreError> {
        if oids.len() % OID_LEN != 0 {
            return Err(CoreError::invalid(format!(
                "oid buffer length {} is not a multiple of {OID_LEN}",
                oids.len()
            )));
        }
        if let Some(names) = names {
            let expected = (oids.len() / OID_LEN) * 4;
            if names.len() != expected {
                return Err(CoreError::invalid(format!(
                    "name buffer length {} does not match {expected} expected for {} oids",
                    names.len(),
                    oids.len() / OID_LEN
                )));
            }
        }
        Ok(Self {
            oids,
            names,
            name_base,
            cur: 0,
        })
    }

    fn is_done(&self) -> bool {
        self.cur * OID_LEN >= self.oids.len()
    }

    fn cur_oid(&self) -> &[u8] {
        let start = self.cur * OID_LEN;
        &self.oids[start..start + OID_LEN]
    }

    fn cur_name(&self) -> u32 {
        match self.names {
            None => self.name_base,
            Some(names) => {
                let start = self.cur * 4;
                let raw = u32::from_be_bytes(names[start..start + 4].try_into().unwrap());
                raw.wrapping_add(self.name_base)
            }
        }
    }

    fn advance(&mut self) {
        self.cur += 1;
    }
}

fn cmp_oid(a: &MidxInput<'_>, b: &MidxInput<'_>) -> Ordering {
    bytes_cmp(a.cur_oid(), b.cur_oid())
}

/// After consuming one element from the cursor at `idxs[idxs.len() - 1]`,
/// restore the reverse-sorted invariant (smallest current OID last):
/// drop the cursor if it is exhausted, otherwise binary-search its new
/// position among the remaining cursors and move it there.
fn fix_order<'a>(idxs: &mut Vec<MidxInput<'a>>) {
    let last = idxs.len() - 1;
    if idxs[last].is_done() {
        idxs.pop();
        return;
    }
    if last == 0 {
        return;
    }

    let mut low: isize = last as isize - 1;
    let mut high: isize = 0;
    let mut mid: isize = last as isize;
    let mut ordering = Ordering::Equal;

    while low >= high {
        mid = (low + high) / 2;
        ordering = cmp_oid(&idxs[last], &idxs[mid as usize]);
        match ordering {
            Ordering::Less => high = mid + 1,
            Ordering::Greater => low = mid - 1,
            Ordering::Equal => break,
        }
    }
    if ordering == Ordering::Less {
        mid += 1;
    }
    let mid = mid as usize;
    if mid == last {
        return;
    }
    let moved = idxs.remove(last);
    idxs.insert(mid, moved);
}

/// Merge `inputs` into `region`, writing a `2^bits`-entry fan-out table
/// followed by the globally sorted OID array and the parallel name array,
/// starting at byte offset `header_len` (the caller's header occupies
/// `region[..header_len]` and is left untouched). `total` must equal the
/// sum of all input lengths. Returns the number of OIDs written, which
/// always equals `total`.
pub fn merge_into(
    region: &mut [u8],
    header_len: usize,
    bits: u32,
    total: usize,
    mut inputs: Vec<MidxInput<'_>>,
) -> Result<usize, CoreError> {
    let fan_entries = 1usize << bits;
    let fan_table_len = fan_entries * 4;
    let oid_table_len = total * OID_LEN;
    let name_table_len = total * 4;

    if region.len() < header_len + fan_table_len + oid_table_len + name_table_len {
        return Err(CoreError::invalid(
            "region too small for requested fan-out width and total",
        ));
    }

    // Reverse-sorted so the smallest current OID is always at the tail.
    inputs.sort_by(|a, b| cmp_oid(b, a));
    inputs.retain(|i| !i.is_done());

    let fan_start = header_len;
    let oid_start = fan_start + fan_table_len;
    let name_start = oid_start + oid_table_len;

    let mut count: usize = 0;
    let mut prefix: usize = 0;
    let mut oid_cursor = oid_start;
    let mut name_cursor = name_start;

    while let Some(idx) = inputs.last() {
        let new_prefix = extract_bits(idx.cur_oid(), bits)? as usize;
        while prefix < new_prefix {
            let count_u32 = u32::try_from(count)
                .map_err(|_| CoreError::overflow("midx count exceeds u32"))?;
            region[fan_start + prefix * 4..fan_start + prefix * 4 + 4]
                .copy_from_slice(&count_u32.to_be_bytes());
            prefix += 1;
        }

        region[oid_cursor..oid_cursor + OID_LEN].copy_from_slice(idx.cur_oid());
        oid_cursor += OID_LEN;

        let name = idx.cur_name();
        region[name_cursor..name_cursor + 4].copy_from_slice(&name.to_be_bytes());
        name_cursor += 4;

        let last = inputs.len() - 1;
        inputs[last].advance();
        fix_order(&mut inputs);
        count += 1;

        if count % PROGRESS_INTERVAL == 0 {
            report_progress(count, total);
        }
    }

    while prefix < fan_entries {
        let count_u32 =
            u32::try_from(count).map_err(|_| CoreError::overflow("midx count exceeds u32"))?;
        region[fan_start + prefix * 4..fan_start + prefix * 4 + 4]
            .copy_from_slice(&count_u32.to_be_bytes());
        prefix += 1;
    }

    if count != total {
        return Err(CoreError::domain(format!(
            "midx merge produced {count} entries, expected {total}"
        )));
    }

    Ok(count)
}

/// Write a `count/total` progress line to stderr, if stderr is a terminal
/// (or `BUP_FORCE_TTY` says to pretend it is). Best-effort: a write failure
/// here must never fail the merge itself.
fn report_progress(count: usize, total: usize) {
    if !stderr_is_tty() {
        return;
    }
    let _ = write!(std::io::stderr(), "\rMerging indices: {count}/{total}\r");
}
