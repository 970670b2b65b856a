//! SC-015: BLAKE3 fingerprints of compiled functions and resources.
//!
//! Fingerprints hash the canonical JSON form of the typed output. Ordering in
//! [`ParseResult`] is deterministic, so equal templates give equal digests.

use crate::core::types::{FunctionSpec, ParseResult};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

const STREAM_BUF_SIZE: usize = 65536;

/// Digests for one compile result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fingerprints {
    /// Composite of every function digest plus the resources digest
    pub result: String,
    pub resources: String,
    /// By function logical id; names can collide, logical ids cannot
    pub functions: BTreeMap<String, String>,
}

/// Hash a string. Returns `"blake3:{hex}"`.
pub fn hash_string(s: &str) -> String {
    format!("blake3:{}", blake3::hash(s.as_bytes()).to_hex())
}

/// Hash a template file's contents. Returns `"blake3:{hex}"`.
pub fn hash_file(path: &Path) -> Result<String, String> {
    let mut file =
        std::fs::File::open(path).map_err(|e| format!("cannot open {}: {}", path.display(), e))?;
    let mut hasher = blake3::Hasher::new();
    let mut buf = [0u8; STREAM_BUF_SIZE];
    loop {
        let n = file
            .read(&mut buf)
            .map_err(|e| format!("read error {}: {}", path.display(), e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("blake3:{}", hasher.finalize().to_hex()))
}

/// Compute a composite hash from multiple component hashes.
pub fn composite_hash(components: &[&str]) -> String {
    let mut hasher = blake3::Hasher::new();
    for c in components {
        hasher.update(c.as_bytes());
        hasher.update(b"\0");
    }
    format!("blake3:{}", hasher.finalize().to_hex())
}

/// Hash the canonical JSON of any output value.
pub fn hash_json<T: Serialize>(value: &T) -> Result<String, String> {
    let json = serde_json::to_string(value).map_err(|e| format!("serialize error: {}", e))?;
    Ok(hash_string(&json))
}

pub fn function_fingerprint(function: &FunctionSpec) -> Result<String, String> {
    hash_json(function)
}

/// Fingerprint a whole result. Warnings do not contribute.
pub fn fingerprint_result(result: &ParseResult) -> Result<Fingerprints, String> {
    let resources = hash_json(&result.resources)?;
    let mut functions = BTreeMap::new();
    let mut components = Vec::with_capacity(result.functions.len() + 1);
    for function in &result.functions {
        let digest = function_fingerprint(function)?;
        components.push(digest.clone());
        functions.insert(function.logical_id.clone(), digest);
    }
    components.push(resources.clone());
    let refs: Vec<&str> = components.iter().map(String::as_str).collect();
    Ok(Fingerprints {
        result: composite_hash(&refs),
        resources,
        functions,
    })
}
