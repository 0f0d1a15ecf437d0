//! JSON fixtures shared by the workspace's tests and benches.
//!
//! `fixtures/manifest.json` maps each fixture name to a file, grouped by kind.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Deserialize;

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../../../fixtures/manifest.json"))
        .expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    paths: BTreeMap<String, String>,
    layers: BTreeMap<String, String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    /// Waypoint sets (`[{ "latitude": .., "longitude": .. }, ..]`).
    Paths,
    /// Polylines with levels plus the layer's animation duration.
    Layers,
}

impl Kind {
    fn files(self) -> &'static BTreeMap<String, String> {
        match self {
            Kind::Paths => &MANIFEST.paths,
            Kind::Layers => &MANIFEST.layers,
        }
    }
}

/// Fixture names of one kind, sorted.
pub fn names(kind: Kind) -> Vec<&'static str> {
    kind.files().keys().map(String::as_str).collect()
}

/// Absolute location of a fixture file.
pub fn file(kind: Kind, name: &str) -> Result<PathBuf> {
    let rel = kind
        .files()
        .get(name)
        .with_context(|| format!("no {kind:?} fixture named '{name}'"))?;
    Ok(PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../../fixtures")
        .join(rel))
}

pub fn load<T: DeserializeOwned>(kind: Kind, name: &str) -> Result<T> {
    let file = file(kind, name)?;
    let text = fs::read_to_string(&file)
        .with_context(|| format!("reading {}", file.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", file.display()))
}

pub mod paths {
    use super::{Kind, Result};
    use serde::de::DeserializeOwned;

    pub fn load<T: DeserializeOwned>(name: &str) -> Result<T> {
        super::load(Kind::Paths, name)
    }
}

pub mod layers {
    use super::{Kind, Result};
    use serde::de::DeserializeOwned;

    pub fn load<T: DeserializeOwned>(name: &str) -> Result<T> {
        super::load(Kind::Layers, name)
    }
}
