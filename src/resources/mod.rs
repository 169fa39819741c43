//! Typed Provider Resource Properties
//!
//! Property structs for the provider resources the composition layer emits.
//! Field names and resource type identifiers reproduce the provider's
//! resource-description schema exactly; these shapes are the externally
//! observable contract of the composed template.

pub mod autoscaling;
pub mod cloudwatch;
pub mod ec2;
pub mod elb;
pub mod iam;
pub mod sqs;
