//! Infrastructure topology composer
//!
//! Turns typed tier configurations into a fully wired multi-tier deployment
//! graph and serializes it to the provider's declarative template form.
//! Composition is pure, synchronous graph construction: reciprocal
//! security-group pairing, bootstrap payload assembly, threshold
//! autoscaling and cross-stack references, with every emitted reference
//! validated before a single byte of template is produced.

pub mod compose;
pub mod errors;
pub mod profiles;
pub mod resources;
pub mod template;

// Re-export commonly used types
pub use compose::{Assembler, BuiltTiers, NetworkContext, TierBuilder, TierHandles};
pub use errors::{ComposeError, ComposeResult};
pub use template::{Parameter, Topology, Value};
