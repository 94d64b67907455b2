//! Provider sync tests
//!
//! End-to-end syncs against a mocked directory: what lands in the
//! registry, what never gets touched, and how failures are reported.

mod failures;
