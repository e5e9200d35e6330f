//! Board module tests.
//!
//! - `fen.rs` - FEN parsing and printing
//! - `make_unmake.rs` - do/undo correctness and state diffs
//! - `proptest.rs` - Property-based tests
