use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Deserialize;

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    samples: HashMap<String, String>,
}

/// Dense samples of one animated channel.
///
/// `op` is the snake_case name of the matrix operation the channel drives.
#[derive(Clone, Debug, Deserialize)]
pub struct SampleStream {
    #[serde(default)]
    pub description: String,
    pub op: String,
    pub times: Vec<i32>,
    pub values: Vec<f32>,
    pub derivatives: Vec<f32>,
}

impl SampleStream {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures")
}

fn resolve_path(rel: &str) -> PathBuf {
    fixtures_root().join(rel)
}

fn read_to_string(rel: &str) -> Result<String> {
    let path = resolve_path(rel);
    fs::read_to_string(&path)
        .with_context(|| format!("failed to read fixture at {}", path.display()))
}

fn load_json<T: DeserializeOwned>(rel: &str) -> Result<T> {
    let text = read_to_string(rel)?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse JSON fixture {rel}"))
}

fn lookup<'a, T>(map: &'a HashMap<String, T>, kind: &str, name: &str) -> Result<&'a T> {
    map.get(name)
        .ok_or_else(|| anyhow!("unknown {kind} fixture '{name}'"))
}

pub mod samples {
    use super::*;

    pub fn keys() -> Vec<String> {
        let mut keys: Vec<String> = MANIFEST.samples.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn json(name: &str) -> Result<String> {
        let rel = lookup(&MANIFEST.samples, "sample", name)?;
        read_to_string(rel)
    }

    pub fn load(name: &str) -> Result<SampleStream> {
        let rel = lookup(&MANIFEST.samples, "sample", name)?;
        let stream: SampleStream = load_json(rel)?;
        if stream.values.len() != stream.len() || stream.derivatives.len() != stream.len() {
            return Err(anyhow!("sample fixture '{name}' has mismatched array lengths"));
        }
        Ok(stream)
    }

    pub fn path(name: &str) -> Result<PathBuf> {
        let rel = lookup(&MANIFEST.samples, "sample", name)?;
        Ok(resolve_path(rel))
    }
}
