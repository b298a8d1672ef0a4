//! Bit-granular serialization of real-time protocol payloads.
//!
//! Network messages in Quiver's protocol are packed at arbitrary bit
//! boundaries rather than byte boundaries, because every bit of payload
//! counts at high tick rates. This crate provides the [`BitWriter`] and
//! [`BitReader`] pair that all field serialization funnels through,
//! along with the lossy numeric encodings (world coordinates, angles,
//! unit normals) that trade precision for bit budget.
//!
//! # Protocol contract
//!
//! A writer and a reader are never linked in memory. Their agreement is
//! purely a matter of discipline: the reading side must issue the exact
//! sequence of operations the writing side did, with identical bit
//! widths and precision modes. Any mismatch silently decodes garbage
//! instead of raising an error, so symmetry between the two halves is
//! the single most important invariant of this crate.
//!
//! # Buffers and failure behavior
//!
//! Both halves borrow a caller-owned buffer and never allocate or free
//! backing storage. Running past the declared bit capacity sets a
//! sticky overflow flag: writes become no-ops and reads return zeroes
//! from that point on, until [`BitWriter::reset`]/[`BitReader::reset`]
//! rewinds the cursor. Callers are expected to check
//! `is_overflowed()` after a burst of operations rather than after
//! every call, and to discard the whole message on failure.

#![deny(rust_2018_idioms, rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

use std::sync::RwLock;

use thiserror::Error;

pub mod coord;
pub use coord::Vec3;

mod masks;

mod reader;
pub use reader::BitReader;

pub mod utils;

mod view;

mod writer;
pub use writer::BitWriter;

/// Errors surfaced by fallible codec operations.
///
/// All of these are local and non-fatal: the offending call leaves the
/// buffer contents intact and returns a defined degraded result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum Error {
    /// Attempted to move the cursor past the buffer's bit capacity.
    #[error("attempted to move past the buffer's bit capacity")]
    Overflow,

    /// A string read did not fit into the destination buffer.
    #[error("string data was truncated into the destination buffer")]
    Truncated,

    /// A varint continuation ran past its maximum encoded length.
    #[error("varint exceeded its maximum byte length")]
    MalformedVarint,
}

/// A process-wide hook observing codec faults.
///
/// Receives the fault class and the debug name of the instance it
/// occurred on, so a host can centralize diagnostics without handling
/// errors at every call site.
pub type FaultHandler = fn(Error, Option<&str>);

static FAULT_HANDLER: RwLock<Option<FaultHandler>> = RwLock::new(None);

/// Installs a process-wide fault handler, replacing any previous one.
///
/// Passing `None` removes the handler. The hook has no effect on codec
/// behavior; faults remain flag-and-continue either way.
pub fn set_fault_handler(handler: Option<FaultHandler>) {
    if let Ok(mut guard) = FAULT_HANDLER.write() {
        *guard = handler;
    }
}

pub(crate) fn raise_fault(error: Error, debug_name: Option<&str>) {
    if let Ok(guard) = FAULT_HANDLER.read() {
        if let Some(handler) = *guard {
            handler(error, debug_name);
        }
    }
}
