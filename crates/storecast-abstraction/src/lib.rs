//! Scorer abstraction layer for Storecast.
//!
//! This module defines the core trait and types shared by every scoring
//! backend: the fixed-order numeric [`FeatureMatrix`] a scorer consumes, the
//! [`Scorer`] trait itself, and [`ScoreError`].

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Represents an error that can occur while scoring a feature matrix.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScoreError {
    /// The matrix does not have the number of columns the scorer was trained on.
    #[error("Feature count mismatch: scorer expects {expected} columns, got {actual}")]
    FeatureCountMismatch {
        /// Number of columns the scorer expects.
        expected: usize,
        /// Number of columns that were supplied.
        actual: usize,
    },

    /// A column the scorer refers to by name is missing from the matrix.
    #[error("Unknown feature: {0}")]
    UnknownFeature(String),

    /// The scorer produced a value that cannot be used as a prediction.
    #[error("Invalid output: {0}")]
    InvalidOutput(String),

    /// Other scorer-internal failures.
    #[error("Scorer error: {0}")]
    Other(String),
}

/// A dense, row-major matrix of named numeric feature columns.
///
/// Column order is significant: scorers read values positionally, so the
/// matrix must be built in exactly the order the scorer was trained on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    /// Creates a matrix of `n_rows` rows with every cell set to zero.
    #[must_use]
    pub fn zeros(columns: Vec<String>, n_rows: usize) -> Self {
        let width = columns.len();
        Self { columns, rows: vec![vec![0.0; width]; n_rows] }
    }

    /// Creates a matrix from explicit rows.
    ///
    /// # Errors
    /// Returns `ScoreError::FeatureCountMismatch` if any row is not as wide
    /// as the column list.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self, ScoreError> {
        if let Some(bad) = rows.iter().find(|row| row.len() != columns.len()) {
            return Err(ScoreError::FeatureCountMismatch {
                expected: columns.len(),
                actual: bad.len(),
            });
        }
        Ok(Self { columns, rows })
    }

    /// Column names, in order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// Position of a named column.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All rows, in input order.
    #[must_use]
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// A single row.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<&[f64]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// Copy of a named column's values.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| row[idx]).collect())
    }

    /// Overwrites one cell. Out-of-range positions are ignored.
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        if let Some(cell) = self.rows.get_mut(row).and_then(|r| r.get_mut(col)) {
            *cell = value;
        }
    }

    /// Applies `f` to every value of the column at `col`.
    pub fn map_column(&mut self, col: usize, mut f: impl FnMut(f64) -> f64) {
        for row in &mut self.rows {
            if let Some(cell) = row.get_mut(col) {
                *cell = f(*cell);
            }
        }
    }
}

/// The opaque prediction function inside a model artifact.
///
/// Implementations receive a matrix whose columns are already in the order
/// the scorer expects and return exactly one numeric estimate per row.
/// Scorers must be `Send + Sync` so a single loaded artifact can serve
/// concurrent requests.
pub trait Scorer: Send + Sync + fmt::Debug {
    /// Scores every row of `features`.
    ///
    /// # Errors
    /// Returns a `ScoreError` if the matrix does not match the scorer's shape
    /// or the scorer fails internally.
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<f64>, ScoreError>;

    /// Short name of the scorer family (e.g. "linear").
    fn kind(&self) -> &str;

    /// Number of input columns the scorer was fitted on, if it knows.
    fn n_features(&self) -> Option<usize> {
        None
    }
}
