//! Hashing primitives for fingerprints and code signatures.

pub mod digest;
