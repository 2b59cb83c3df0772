//! Survival forest adapter: Implementation of `SurvivalModel`.
//!
//! Loads a random survival forest exported by the training pipeline as
//! `forest.json`:
//!
//! ```json
//! {
//!   "feature_names": ["Age at Initial Diagnosis", "..."],
//!   "unique_times": [0.08, 0.25, "..."],
//!   "trees": [
//!     { "nodes": [
//!         { "split": { "feature": 4, "threshold": 6.5, "left": 1, "right": 2 } },
//!         { "leaf": { "survival": [0.99, 0.97, "..."] } },
//!         { "leaf": { "survival": [0.95, 0.90, "..."] } }
//!     ] }
//!   ]
//! }
//! ```
//!
//! A row goes left at a split when `x[feature] <= threshold`. The predicted
//! survival function is the mean of the reached leaves' survival functions
//! over all trees, evaluated at `unique_times`.
//!
//! # Security
//!
//! The directory must hold a manifest signed by the configured Ed25519 key
//! (see [`manifest`]); debug builds may opt out with [`ModelTrust::Unsigned`].

pub mod manifest;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{FeatureVector, SurvivalCurve, FEATURE_NAMES, NUM_FEATURES};
use crate::ports::{ModelError, SurvivalModel};

pub use manifest::ModelTrust;

/// File name of the exported forest inside a model directory.
pub const FOREST_FILE: &str = "forest.json";

/// Errors raised while loading a model artifact.
#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid model format: {0}")]
    Format(String),

    #[error("Model verification failed: {0}")]
    Signature(String),

    #[error("Model was trained on {expected:?}, this build assembles {actual:?}")]
    Schema {
        expected: Vec<String>,
        actual: Vec<String>,
    },
}

/// One node of an exported survival tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportedNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        survival: Vec<f64>,
    },
}

/// One exported survival tree; node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedTree {
    pub nodes: Vec<ExportedNode>,
}

/// Forest parameters exported by the training pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedSurvivalForest {
    pub feature_names: Vec<String>,
    pub unique_times: Vec<f64>,
    pub trees: Vec<ExportedTree>,
}

/// Random survival forest held in memory for inference.
///
/// Read-only after construction; share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct ForestSurvivalModel {
    forest: ExportedSurvivalForest,
}

impl ForestSurvivalModel {
    /// Load and verify a forest from a model directory.
    ///
    /// # Errors
    /// Returns error if verification fails, the file is malformed, or the
    /// forest was trained on a different feature schema.
    pub fn load(model_dir: &Path, trust: &ModelTrust) -> Result<Self, ModelLoadError> {
        let manifest = manifest::verify_model_dir(model_dir, trust)?;
        if let Some(manifest) = &manifest {
            // The file actually loaded must be bound by the signed manifest.
            if !manifest.files.contains_key(FOREST_FILE) {
                return Err(ModelLoadError::Signature(format!(
                    "{} must include {FOREST_FILE}",
                    manifest::MANIFEST_FILE
                )));
            }
        }

        let path = model_dir.join(FOREST_FILE);
        let content = std::fs::read_to_string(&path)?;
        let forest: ExportedSurvivalForest = serde_json::from_str(&content)
            .map_err(|e| ModelLoadError::Format(e.to_string()))?;

        let model = Self::from_export(forest)?;
        tracing::info!(
            "Loaded survival forest from {:?} (trees={}, time_points={})",
            path,
            model.forest.trees.len(),
            model.forest.unique_times.len()
        );
        Ok(model)
    }

    /// Build a model from already-parsed parameters.
    ///
    /// # Errors
    /// Returns error if the forest is structurally invalid or its feature
    /// schema differs from [`FEATURE_NAMES`].
    pub fn from_export(forest: ExportedSurvivalForest) -> Result<Self, ModelLoadError> {
        if forest.feature_names.iter().map(String::as_str).ne(FEATURE_NAMES) {
            return Err(ModelLoadError::Schema {
                expected: forest.feature_names.clone(),
                actual: FEATURE_NAMES.iter().map(|s| (*s).to_string()).collect(),
            });
        }

        let n_times = forest.unique_times.len();
        if n_times == 0 {
            return Err(ModelLoadError::Format("unique_times is empty".into()));
        }
        if forest.unique_times[0] < 0.0
            || forest.unique_times.windows(2).any(|w| !(w[1] > w[0]))
            || forest.unique_times.iter().any(|t| !t.is_finite())
        {
            return Err(ModelLoadError::Format(
                "unique_times must be finite, non-negative and strictly increasing".into(),
            ));
        }
        if forest.trees.is_empty() {
            return Err(ModelLoadError::Format("forest has no trees".into()));
        }

        for (t, tree) in forest.trees.iter().enumerate() {
            Self::validate_tree(t, tree, n_times)?;
        }

        Ok(Self { forest })
    }

    fn validate_tree(index: usize, tree: &ExportedTree, n_times: usize) -> Result<(), ModelLoadError> {
        let n_nodes = tree.nodes.len();
        if n_nodes == 0 {
            return Err(ModelLoadError::Format(format!("tree {index} has no nodes")));
        }
        for (i, node) in tree.nodes.iter().enumerate() {
            match node {
                ExportedNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    // Children must come after their parent so routing always terminates.
                    if *feature >= NUM_FEATURES
                        || !threshold.is_finite()
                        || *left <= i
                        || *right <= i
                        || *left >= n_nodes
                        || *right >= n_nodes
                    {
                        return Err(ModelLoadError::Format(format!(
                            "tree {index} node {i}: invalid split"
                        )));
                    }
                }
                ExportedNode::Leaf { survival } => {
                    if survival.len() != n_times {
                        return Err(ModelLoadError::Format(format!(
                            "tree {index} node {i}: {} survival values for {n_times} time points",
                            survival.len()
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Feature names the forest was trained on.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.forest.feature_names
    }

    /// Number of trees in the forest.
    #[must_use]
    pub fn num_trees(&self) -> usize {
        self.forest.trees.len()
    }

    fn leaf_for<'a>(tree: &'a ExportedTree, x: &[f64; NUM_FEATURES]) -> &'a [f64] {
        let mut idx = 0;
        loop {
            match &tree.nodes[idx] {
                ExportedNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[*feature] <= *threshold { *left } else { *right };
                }
                ExportedNode::Leaf { survival } => return survival,
            }
        }
    }
}

impl SurvivalModel for ForestSurvivalModel {
    fn predict_survival(&self, features: &FeatureVector) -> Result<SurvivalCurve, ModelError> {
        let attempted = features.names();
        if self.forest.feature_names.iter().map(String::as_str).ne(attempted.iter().copied()) {
            return Err(ModelError::SchemaMismatch {
                expected: self.forest.feature_names.clone(),
                attempted: attempted.iter().map(|s| (*s).to_string()).collect(),
            });
        }

        let x = features.values();
        let n_times = self.forest.unique_times.len();
        let mut mean = vec![0.0; n_times];
        for tree in &self.forest.trees {
            for (acc, s) in mean.iter_mut().zip(Self::leaf_for(tree, x)) {
                *acc += s;
            }
        }
        let n_trees = self.forest.trees.len() as f64;
        mean.iter_mut().for_each(|s| *s /= n_trees);

        let mut times = self.forest.unique_times.clone();
        if times[0] > 0.0 {
            times.insert(0, 0.0);
            mean.insert(0, 1.0);
        }

        Ok(SurvivalCurve::new(times, mean)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ClinicalInput, Grade, ScoreResult, Stage};

    fn names() -> Vec<String> {
        FEATURE_NAMES.iter().map(|s| (*s).to_string()).collect()
    }

    /// Two stumps splitting on EORTC progression score and age.
    fn toy_forest() -> ExportedSurvivalForest {
        ExportedSurvivalForest {
            feature_names: names(),
            unique_times: vec![0.5, 1.0, 5.0, 10.0],
            trees: vec![
                ExportedTree {
                    nodes: vec![
                        ExportedNode::Split {
                            feature: 5,
                            threshold: 10.5,
                            left: 1,
                            right: 2,
                        },
                        ExportedNode::Leaf {
                            survival: vec![1.0, 0.95, 0.9, 0.85],
                        },
                        ExportedNode::Leaf {
                            survival: vec![0.9, 0.8, 0.5, 0.4],
                        },
                    ],
                },
                ExportedTree {
                    nodes: vec![
                        ExportedNode::Split {
                            feature: 0,
                            threshold: 70.0,
                            left: 1,
                            right: 2,
                        },
                        ExportedNode::Leaf {
                            survival: vec![1.0, 0.9, 0.8, 0.7],
                        },
                        ExportedNode::Leaf {
                            survival: vec![0.9, 0.7, 0.6, 0.5],
                        },
                    ],
                },
            ],
        }
    }

    fn features(input: &ClinicalInput) -> FeatureVector {
        FeatureVector::assemble(input, &ScoreResult::from(input))
    }

    #[test]
    fn test_predict_averages_reached_leaves() {
        let model = ForestSurvivalModel::from_export(toy_forest()).expect("Valid forest");

        // Default patient: T1 G3 CIS, large, age 72 -> EORTC progression 18, right in both trees.
        let curve = model
            .predict_survival(&features(&ClinicalInput::default()))
            .expect("Should predict");
        assert_eq!(curve.times(), &[0.0, 0.5, 1.0, 5.0, 10.0]);
        let expected = [1.0, 0.9, 0.75, 0.55, 0.45];
        for (got, want) in curve.probabilities().iter().zip(expected) {
            assert!((got - want).abs() < 1e-12, "{got} vs {want}");
        }
    }

    #[test]
    fn test_low_risk_patient_takes_left_branches() {
        let model = ForestSurvivalModel::from_export(toy_forest()).expect("Valid forest");
        let input = ClinicalInput {
            age: 50,
            stage: Stage::Ta,
            grade: Grade::G1,
            ..Default::default()
        };
        let curve = model.predict_survival(&features(&input)).expect("Should predict");
        assert!((curve.interpolate(1.0) - 0.925).abs() < 1e-12);
        assert!((curve.interpolate(5.0) - 0.85).abs() < 1e-12);
    }

    #[test]
    fn test_prediction_is_deterministic() {
        let model = ForestSurvivalModel::from_export(toy_forest()).expect("Valid forest");
        let row = features(&ClinicalInput::default());
        assert_eq!(
            model.predict_survival(&row).expect("first"),
            model.predict_survival(&row).expect("second")
        );
    }

    #[test]
    fn test_misordered_schema_fails_fast() {
        let mut forest = toy_forest();
        forest.feature_names.swap(0, 1);
        let err = ForestSurvivalModel::from_export(forest).unwrap_err();
        match err {
            ModelLoadError::Schema { expected, actual } => {
                assert_eq!(expected[0], "Tumour Grade");
                assert_eq!(actual[0], "Age at Initial Diagnosis");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_feature_fails_fast() {
        let mut forest = toy_forest();
        forest.feature_names.pop();
        assert!(matches!(
            ForestSurvivalModel::from_export(forest),
            Err(ModelLoadError::Schema { .. })
        ));
    }

    #[test]
    fn test_structural_validation() {
        let mut bad_leaf = toy_forest();
        bad_leaf.trees[0].nodes[1] = ExportedNode::Leaf {
            survival: vec![1.0],
        };
        assert!(matches!(
            ForestSurvivalModel::from_export(bad_leaf),
            Err(ModelLoadError::Format(_))
        ));

        let mut cyclic = toy_forest();
        cyclic.trees[1].nodes[0] = ExportedNode::Split {
            feature: 0,
            threshold: 70.0,
            left: 0,
            right: 2,
        };
        assert!(ForestSurvivalModel::from_export(cyclic).is_err());

        let mut unsorted = toy_forest();
        unsorted.unique_times = vec![0.5, 0.4, 5.0, 10.0];
        assert!(ForestSurvivalModel::from_export(unsorted).is_err());

        let mut empty = toy_forest();
        empty.trees.clear();
        assert!(ForestSurvivalModel::from_export(empty).is_err());
    }

    #[test]
    #[cfg(debug_assertions)]
    fn test_load_unsigned_from_directory() {
        let temp = tempfile::tempdir().expect("tempdir");
        let json = serde_json::to_string(&toy_forest()).expect("serialize forest");
        std::fs::write(temp.path().join(FOREST_FILE), json).expect("write forest");

        let model = ForestSurvivalModel::load(temp.path(), &ModelTrust::Unsigned)
            .expect("Should load");
        assert_eq!(model.num_trees(), 2);
        assert_eq!(model.feature_names().len(), NUM_FEATURES);
    }

    #[test]
    fn test_load_signed_requires_forest_in_manifest() {
        use ed25519_dalek::{Signer, SigningKey};
        use std::collections::BTreeMap;

        let temp = tempfile::tempdir().expect("tempdir");
        let dir = temp.path();
        let forest_json = serde_json::to_vec(&toy_forest()).expect("serialize forest");
        std::fs::write(dir.join(FOREST_FILE), &forest_json).expect("write forest");
        std::fs::write(dir.join("notes.txt"), b"release notes").expect("write notes");

        let key = SigningKey::from_bytes(&[7u8; 32]);
        let sign = |files: BTreeMap<String, String>| {
            let manifest = manifest::ModelManifest {
                version: manifest::MANIFEST_VERSION,
                created_at: None,
                files,
            };
            let bytes = serde_json::to_vec(&manifest).expect("serialize manifest");
            std::fs::write(dir.join(manifest::MANIFEST_FILE), &bytes).expect("write manifest");
            std::fs::write(dir.join(manifest::SIGNATURE_FILE), key.sign(&bytes).to_bytes())
                .expect("write sig");
        };
        let trust = ModelTrust::Signed(key.verifying_key());

        let mut only_notes = BTreeMap::new();
        only_notes.insert("notes.txt".to_string(), manifest::sha256_hex(b"release notes"));
        sign(only_notes);
        assert!(matches!(
            ForestSurvivalModel::load(dir, &trust),
            Err(ModelLoadError::Signature(_))
        ));

        let mut with_forest = BTreeMap::new();
        with_forest.insert(FOREST_FILE.to_string(), manifest::sha256_hex(&forest_json));
        sign(with_forest);
        let model = ForestSurvivalModel::load(dir, &trust).expect("Should load signed forest");
        assert_eq!(model.num_trees(), 2);
    }
}
