//! Content fingerprints of compiled output.

pub mod hasher;
