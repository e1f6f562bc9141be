//! Built-in scorer families that can be described inside an artifact file.
//!
//! Each family is a plain data description ([`ScorerSpec`]) that is turned
//! into a validated [`Scorer`] implementation at load time. Downstream code
//! only ever sees `Arc<dyn Scorer>`, so tests and embedders can plug in their
//! own scorers through [`crate::ModelArtifact::new`].

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storecast_abstraction::{FeatureMatrix, ScoreError, Scorer};

/// Serialized description of a scorer, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScorerSpec {
    /// Returns the same value for every row.
    Constant { value: f64 },
    /// `intercept + sum(coefficient * feature)`.
    Linear {
        intercept: f64,
        coefficients: Vec<f64>,
        /// When present, coefficients are matched to columns by name;
        /// otherwise positionally.
        #[serde(default)]
        feature_names: Option<Vec<String>>,
    },
    /// Sum of regression trees plus a base score.
    TreeEnsemble {
        #[serde(default)]
        base_score: f64,
        trees: Vec<RegressionTree>,
    },
}

impl ScorerSpec {
    /// Validates the description and builds the scorer.
    ///
    /// # Errors
    /// Returns a human-readable reason when the description is inconsistent.
    pub fn build(self) -> Result<Arc<dyn Scorer>, String> {
        match self {
            Self::Constant { value } => {
                if !value.is_finite() {
                    return Err("constant scorer value must be finite".to_string());
                }
                Ok(Arc::new(ConstantScorer::new(value)))
            }
            Self::Linear { intercept, coefficients, feature_names } => {
                if coefficients.is_empty() {
                    return Err("linear scorer has no coefficients".to_string());
                }
                if let Some(names) = &feature_names {
                    if names.len() != coefficients.len() {
                        return Err(format!(
                            "linear scorer has {} coefficients but {} feature names",
                            coefficients.len(),
                            names.len()
                        ));
                    }
                }
                Ok(Arc::new(LinearScorer { intercept, coefficients, feature_names }))
            }
            Self::TreeEnsemble { base_score, trees } => {
                for (i, tree) in trees.iter().enumerate() {
                    tree.validate().map_err(|reason| format!("tree {i}: {reason}"))?;
                }
                Ok(Arc::new(TreeEnsembleScorer { base_score, trees }))
            }
        }
    }
}

/// Scorer returning a fixed value.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantScorer {
    value: f64,
}

impl ConstantScorer {
    #[must_use]
    pub const fn new(value: f64) -> Self {
        Self { value }
    }
}

impl Scorer for ConstantScorer {
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<f64>, ScoreError> {
        Ok(vec![self.value; features.n_rows()])
    }

    fn kind(&self) -> &str {
        "constant"
    }
}

/// Linear regression scorer.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearScorer {
    intercept: f64,
    coefficients: Vec<f64>,
    feature_names: Option<Vec<String>>,
}

impl LinearScorer {
    fn column_positions(&self, features: &FeatureMatrix) -> Result<Vec<usize>, ScoreError> {
        match &self.feature_names {
            Some(names) => names
                .iter()
                .map(|name| {
                    features.column_index(name).ok_or_else(|| ScoreError::UnknownFeature(name.clone()))
                })
                .collect(),
            None => {
                if features.n_cols() != self.coefficients.len() {
                    return Err(ScoreError::FeatureCountMismatch {
                        expected: self.coefficients.len(),
                        actual: features.n_cols(),
                    });
                }
                Ok((0..self.coefficients.len()).collect())
            }
        }
    }
}

impl Scorer for LinearScorer {
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<f64>, ScoreError> {
        let positions = self.column_positions(features)?;
        Ok(features
            .rows()
            .iter()
            .map(|row| {
                positions
                    .iter()
                    .zip(&self.coefficients)
                    .fold(self.intercept, |acc, (&pos, coef)| acc + coef * row[pos])
            })
            .collect())
    }

    fn kind(&self) -> &str {
        "linear"
    }

    fn n_features(&self) -> Option<usize> {
        self.feature_names.is_none().then_some(self.coefficients.len())
    }
}

/// One node of a flattened regression tree.
///
/// A split sends a row to `left` when its value at `feature` is less than or
/// equal to `threshold`, and to `right` otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split { feature: usize, threshold: f64, left: usize, right: usize },
    Leaf { value: f64 },
}

/// A regression tree stored as a flat node array rooted at index 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

impl RegressionTree {
    /// Children must point strictly forward, which rules out cycles.
    fn validate(&self) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            if let TreeNode::Split { left, right, .. } = node {
                for child in [*left, *right] {
                    if child <= idx || child >= self.nodes.len() {
                        return Err(format!("node {idx} has invalid child index {child}"));
                    }
                }
            }
        }
        Ok(())
    }

    fn evaluate(&self, row: &[f64]) -> Result<f64, ScoreError> {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { value } => return Ok(*value),
                TreeNode::Split { feature, threshold, left, right } => {
                    let value = row.get(*feature).ok_or_else(|| {
                        ScoreError::UnknownFeature(format!("column index {feature}"))
                    })?;
                    idx = if *value <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

/// Additive ensemble of regression trees.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeEnsembleScorer {
    base_score: f64,
    trees: Vec<RegressionTree>,
}

impl Scorer for TreeEnsembleScorer {
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<f64>, ScoreError> {
        features
            .rows()
            .iter()
            .map(|row| {
                self.trees
                    .iter()
                    .try_fold(self.base_score, |acc, tree| {
                        Ok::<f64, ScoreError>(acc + tree.evaluate(row)?)
                    })
            })
            .collect()
    }

    fn kind(&self) -> &str {
        "tree_ensemble"
    }
}
