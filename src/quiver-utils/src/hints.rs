//! Optimization hints for steering codegen on hot paths.

/// Marks the enclosing branch as unlikely to be taken, keeping failure
/// handling out of the hot path. Stands in for [`std::hint::cold_path`]
/// while that API is still nightly-only.
#[cold]
#[inline(always)]
pub fn cold_path() {}
