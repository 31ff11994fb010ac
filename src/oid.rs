//! The 20-byte content-address identifier used throughout the index formats.

use std::fmt;

use crate::error::CoreError;

/// Length in bytes of an object identifier.
pub const OID_LEN: usize = 20;

/// A fixed 20-byte content-address identifier.
///
/// `Oid` has a total order given by lexicographic comparison of its bytes,
/// which is also the order every on-disk index in this crate sorts by.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Oid([u8; OID_LEN]);

impl Oid {
    /// The all-zero OID.
    pub const NULL: Self = Self([0u8; OID_LEN]);

    /// Build an `Oid` from an exact 20-byte array.
    pub const fn from_bytes(bytes: [u8; OID_LEN]) -> Self {
        Self(bytes)
    }

    /// Build an `Oid` from a byte slice, checking its length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CoreError> {
        if bytes.len() != OID_LEN {
            return Err(CoreError::InvalidArgument(format!(
                "oid must be {OID_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let mut arr = [0u8; OID_LEN];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    /// Borrow the raw bytes.
    pub fn as_bytes(&self) -> &[u8; OID_LEN] {
        &self.0
    }

    /// The first byte, used to index fan-out tables.
    pub fn first_byte(&self) -> u8 {
        self.0[0]
    }

    /// Whether this is the all-zero OID.
    pub fn is_null(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }
}

impl AsRef<[u8]> for Oid {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; OID_LEN]> for Oid {
    fn from(bytes: [u8; OID_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oid(first: u8, last: u8) -> Oid {
        let mut bytes = [0u8; OID_LEN];
        bytes[0] = first;
        bytes[OID_LEN - 1] = last;
        Oid::from_bytes(bytes)
    }

    #[test]
    fn total_order_is_lexicographic() {
        let mut oids = vec![oid(0xff, 1), oid(0x00, 2), oid(0x00, 1)];
        oids.sort();
        assert_eq!(oids, vec![oid(0x00, 1), oid(0x00, 2), oid(0xff, 1)]);
    }

    #[test]
    fn from_slice_rejects_wrong_length() {
        assert!(Oid::from_slice(&[0u8; 19]).is_err());
        assert!(Oid::from_slice(&[0u8; 21]).is_err());
        assert!(Oid::from_slice(&[0u8; 20]).is_ok());
    }

    #[test]
    fn null_is_all_zero() {
        assert!(Oid::NULL.is_null());
        assert!(!oid(1, 0).is_null());
    }
}
