//! Property-Based Tests Entry Point
//!
//! This suite uses proptest to verify invariants that must hold for all
//! valid inputs to the composition layer: pairing symmetry and idempotence,
//! bootstrap payload ordering and threshold-wiring atomicity.

mod property;
