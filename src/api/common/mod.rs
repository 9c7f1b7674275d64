//! HTTP plumbing shared by every resource router.

pub mod tracing;
