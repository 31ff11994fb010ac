//! Compact variable-length integer codecs shared by the on-disk formats:
//! `vuint` for non-negative magnitudes, `vint` for signed values, and a
//! small format-string packer built out of both plus length-prefixed byte
//! strings.

use crate::error::CoreError;

/// Worst case byte length of a `vuint`/`vint`-encoded `i64`: 7 usable bits
/// per byte, rounded up, plus the sign/continuation bit in the first byte
/// of a `vint`.
const MAX_VARINT_LEN: usize = 10;

/// Encode `val` as an unsigned varint: 7-bit groups, least-significant
/// group first, each byte's high bit set except the last.
///
/// Fails with a domain error if `val` is negative.
pub fn vuint_encode(val: i64, out: &mut Vec<u8>) -> Result<(), CoreError> {
    if val < 0 {
        return Err(CoreError::domain("vuints must not be negative"));
    }
    let mut v = val as u64;
    loop {
        let mut byte = (v & 0x7f) as u8;
        v >>= 7;
        if v != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if v == 0 {
            break;
        }
    }
    Ok(())
}

/// Decode a `vuint` from the front of `buf`, returning the value and the
/// number of bytes consumed.
pub fn vuint_decode(buf: &[u8]) -> Result<(i64, usize), CoreError> {
    if buf.is_empty() {
        return Err(CoreError::invalid("vuint_decode: empty input"));
    }
    let mut v: u64 = 0;
    for (i, &byte) in buf.iter().enumerate() {
        if i >= MAX_VARINT_LEN {
            return Err(CoreError::invalid("vuint_decode: value too long"));
        }
        v |= ((byte & 0x7f) as u64) << (7 * i);
        if byte & 0x80 == 0 {
            let val = i64::try_from(v)
                .map_err(|_| CoreError::overflow("vuint_decode: value exceeds i64 range"))?;
            return Ok((val, i + 1));
        }
    }
    Err(CoreError::invalid(
        "vuint_decode: truncated input, no terminating byte",
    ))
}

/// Encode `val` as a signed varint: the first byte carries a sign bit
/// (`0x40`) and 6 payload bits, remaining bytes are `vuint`-style 7-bit
/// groups, all continued via the high bit (`0x80`).
pub fn vint_encode(val: i64, out: &mut Vec<u8>) -> Result<(), CoreError> {
    let (mut v, sign) = if val < 0 {
        (val.unsigned_abs(), 0x40u8)
    } else {
        (val as u64, 0u8)
    };

    let mut first = (v & 0x3f) as u8 | sign;
    v >>= 6;
    if v != 0 {
        first |= 0x80;
    }
    out.push(first);

    while v != 0 {
        let mut byte = (v & 0x7f) as u8;
        v >>= 7;
        if v != 0 {
            byte |= 0x80;
        }
        out.push(byte);
    }
    Ok(())
}

/// Decode a `vint` from the front of `buf`, returning the value and the
/// number of bytes consumed.
pub fn vint_decode(buf: &[u8]) -> Result<(i64, usize), CoreError> {
    if buf.is_empty() {
        return Err(CoreError::invalid("vint_decode: empty input"));
    }
    let first = buf[0];
    let sign = first & 0x40 != 0;
    let mut v: u64 = (first & 0x3f) as u64;
    let mut shift = 6u32;
    let mut consumed = 1usize;

    if first & 0x80 != 0 {
        for &byte in &buf[1..] {
            if consumed >= MAX_VARINT_LEN {
                return Err(CoreError::invalid("vint_decode: value too long"));
            }
            v |= ((byte & 0x7f) as u64) << shift;
            shift += 7;
            consumed += 1;
            if byte & 0x80 == 0 {
                break;
            }
            if consumed == buf.len() {
                return Err(CoreError::invalid(
                    "vint_decode: truncated input, no terminating byte",
                ));
            }
        }
    }

    let magnitude = i64::try_from(v)
        .map_err(|_| CoreError::overflow("vint_decode: magnitude exceeds i64 range"))?;
    let val = if sign { -magnitude } else { magnitude };
    Ok((val, consumed))
}

/// One argument to [`limited_vint_pack`]: a `vuint`, a `vint`, or a
/// length-prefixed byte string.
pub enum PackArg<'a> {
    VUint(i64),
    VInt(i64),
    Bytes(&'a [u8]),
}

/// Pack `args` according to `fmt`, a string over `{V, v, s}`:
/// `V` for an unsigned varint, `v` for a signed varint, `s` for a
/// `vuint`-length-prefixed byte string. `args` must have exactly
/// `fmt.len()` entries, in the matching order.
///
/// Uses an intermediate buffer sized `20 * fmt.len()` bytes, mirroring the
/// headroom a caller-facing packer needs for a handful of strings before a
/// realloc, and fails with an overflow error if that headroom is exceeded.
pub fn limited_vint_pack(fmt: &str, args: &[PackArg<'_>]) -> Result<Vec<u8>, CoreError> {
    if fmt.len() != args.len() {
        return Err(CoreError::invalid(format!(
            "number of arguments ({}) does not match format string ({})",
            args.len(),
            fmt.len()
        )));
    }
    if fmt.len() > usize::MAX / 20 {
        return Err(CoreError::overflow("format is far too long"));
    }

    let bufsz = fmt.len() * 20;
    let mut out = Vec::new();
    out.try_reserve(bufsz)
        .map_err(|_| CoreError::overflow("limited_vint_pack: out of memory"))?;

    for (fmt_byte, arg) in fmt.bytes().zip(args) {
        let remaining = || bufsz - out.len();

        match (fmt_byte, arg) {
            (b'V', PackArg::VUint(val)) => {
                if remaining() < 10 {
                    return Err(CoreError::overflow("buffer (potentially) overflowed"));
                }
                vuint_encode(*val, &mut out)?;
            }
            (b'v', PackArg::VInt(val)) => {
                if remaining() < 10 {
                    return Err(CoreError::overflow("buffer (potentially) overflowed"));
                }
                vint_encode(*val, &mut out)?;
            }
            (b's', PackArg::Bytes(bytes)) => {
                if remaining() < 10 {
                    return Err(CoreError::overflow("buffer (potentially) overflowed"));
                }
                let len = i64::try_from(bytes.len())
                    .map_err(|_| CoreError::overflow("limited_vint_pack: string too long"))?;
                vuint_encode(len, &mut out)?;
                if remaining() < bytes.len() {
                    return Err(CoreError::overflow("buffer (potentially) overflowed"));
                }
                out.extend_from_slice(bytes);
            }
            (other, _) => {
                return Err(CoreError::invalid(format!(
                    "unknown pack format string item {}",
                    other as char
                )));
            }
        }
    }

    Ok(out)
}
