// ============================================================
// Layer 3 — Label Registry
// ============================================================
// Maps integer class ids to human-readable moderation labels.
// Training writes the registry next to the model weights as
// `label_map.json`; inference reads it back verbatim so the
// classifier head's output indices always decode to the same
// names they were trained with.
//
// File format matches the side-car convention: a JSON object
// with string-encoded integer keys, e.g. {"0": "normal", ...}.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;

/// File name of the side-car registry inside the model directory
pub const LABEL_MAP_FILE: &str = "label_map.json";

/// The integer-id → label-name registry.
///
/// Backed by a BTreeMap so iteration order is the class-id order,
/// which keeps logs and reports stable across runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMap {
    names: BTreeMap<usize, String>,
}

impl Default for LabelMap {
    /// The built-in 4-class moderation registry.
    fn default() -> Self {
        let mut names = BTreeMap::new();
        names.insert(0, "normal".to_string());
        names.insert(1, "offensive".to_string());
        names.insert(2, "hateful".to_string());
        names.insert(3, "spam".to_string());
        Self { names }
    }
}

impl LabelMap {
    /// Number of classes in the registry — the classifier head's
    /// output dimensionality must match this.
    pub fn num_labels(&self) -> usize {
        self.names.len()
    }

    /// Look up the name for a class id.
    pub fn name_of(&self, label_id: usize) -> Option<&str> {
        self.names.get(&label_id).map(String::as_str)
    }

    /// Name for a class id, or "unknown" when the id is not in the
    /// registry — a model that predicts an unmapped index must still
    /// produce a usable result.
    pub fn name_or_unknown(&self, label_id: usize) -> String {
        self.name_of(label_id)
            .unwrap_or("unknown")
            .to_string()
    }

    /// Iterate (id, name) pairs in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.names.iter().map(|(id, name)| (*id, name.as_str()))
    }

    /// Write the registry as `label_map.json` into `dir`.
    /// Keys are string-encoded integers, matching the side-car format.
    pub fn save(&self, dir: &Path) -> Result<()> {
        let by_string_key: BTreeMap<String, &str> = self
            .names
            .iter()
            .map(|(id, name)| (id.to_string(), name.as_str()))
            .collect();

        let path = dir.join(LABEL_MAP_FILE);
        let json = serde_json::to_string_pretty(&by_string_key)?;
        std::fs::write(&path, json)
            .with_context(|| format!("Cannot write label map to '{}'", path.display()))?;

        tracing::debug!("Saved label map to '{}'", path.display());
        Ok(())
    }

    /// Read a registry back from `dir/label_map.json`.
    /// String keys are converted back to integers; a key that does
    /// not parse as an integer is a corrupt side-car and is an error.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(LABEL_MAP_FILE);
        let json = std::fs::read_to_string(&path)
            .with_context(|| format!("Cannot read label map from '{}'", path.display()))?;

        let by_string_key: BTreeMap<String, String> = serde_json::from_str(&json)?;

        let mut names = BTreeMap::new();
        for (key, name) in by_string_key {
            let id: usize = key
                .parse()
                .with_context(|| format!("Invalid label id '{key}' in '{}'", path.display()))?;
            names.insert(id, name);
        }

        Ok(Self { names })
    }

    /// Load the side-car registry if present, falling back to the
    /// built-in default. The fallback is logged at warn level so a
    /// missing side-car in a packaged model is visible to operators.
    pub fn load_or_default(dir: &Path) -> Self {
        if dir.join(LABEL_MAP_FILE).exists() {
            match Self::load(dir) {
                Ok(map) => {
                    tracing::info!("Loaded label map: {:?}", map.names);
                    return map;
                }
                Err(e) => {
                    tracing::warn!("Failed to parse '{}': {e} — using default labels", LABEL_MAP_FILE);
                }
            }
        } else {
            tracing::warn!(
                "No '{}' found in '{}' — falling back to default 4-class labels",
                LABEL_MAP_FILE,
                dir.display(),
            );
        }
        Self::default()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry() {
        let map = LabelMap::default();
        assert_eq!(map.num_labels(), 4);
        assert_eq!(map.name_of(0), Some("normal"));
        assert_eq!(map.name_of(2), Some("hateful"));
        assert_eq!(map.name_of(3), Some("spam"));
    }

    #[test]
    fn test_unknown_id_gets_sentinel_name() {
        let map = LabelMap::default();
        assert_eq!(map.name_of(9), None);
        assert_eq!(map.name_or_unknown(9), "unknown");
    }

    #[test]
    fn test_round_trip_is_identity() {
        let dir = tempfile::tempdir().unwrap();
        let map = LabelMap::default();
        map.save(dir.path()).unwrap();

        let reloaded = LabelMap::load(dir.path()).unwrap();
        assert_eq!(reloaded, map);
    }

    #[test]
    fn test_missing_side_car_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let map = LabelMap::load_or_default(dir.path());
        assert_eq!(map, LabelMap::default());
    }

    #[test]
    fn test_side_car_uses_string_keys() {
        let dir = tempfile::tempdir().unwrap();
        LabelMap::default().save(dir.path()).unwrap();

        let raw = std::fs::read_to_string(dir.path().join(LABEL_MAP_FILE)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["0"], "normal");
        assert_eq!(value["3"], "spam");
    }
}
