//! Board module tests.
//!
//! Tests are organized into separate files by category:
//! - `perft.rs` - node-count oracles for move generation
//! - `fen.rs` - FEN parsing, validation, and round-trips
//! - `make_unmake.rs` - make/unmake restoration
//! - `draw.rs` - draw detection (50-move, repetition, material)
//! - `edge_cases.rs` - special positions
//! - `proptest.rs` - property-based tests over random games

mod edge_cases;
mod proptest;
