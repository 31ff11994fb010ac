//! Native performance core for a content-addressed, deduplicating backup
//! system.
//!
//! This crate does not interpret object content, compress, encrypt, or
//! schedule I/O concurrently — it manipulates the system's on-disk indices
//! of 20-byte object identifiers and performs the byte-level operations
//! that dominate backup throughput:
//!
//! - [`sparse`] — stream a buffer to a file, replacing long zero runs with
//!   holes instead of literal zero bytes.
//! - [`index`] — assemble a sorted IDXv2 pack index (fan-out + OID + CRC +
//!   offset, with 64-bit offset overflow handling) into a pre-sized region.
//! - [`midx`] — k-way merge several sorted IDX streams into one MIDX fan-out
//!   + OID + name image.
//! - [`bloom`] — set/test membership in a fixed-size bit table addressed
//!   from 20-byte identifiers, with 4 or 5 sub-hashes.
//! - [`varint`] — `vuint`/`vint` variable-length integer codecs and a small
//!   tuple packer.
//!
//! Every public entry point returns [`error::CoreError`]. The crate is
//! single-threaded and blocking: no component spawns threads, and the
//! mutable byte regions it writes into are owned by the caller for the
//! duration of a call.

pub mod bloom;
pub mod error;
pub mod index;
pub mod midx;
pub mod oid;
pub mod primitives;
pub mod sparse;
mod tty;
pub mod varint;

pub use error::CoreError;
pub use oid::{Oid, OID_LEN};
