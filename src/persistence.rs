//! Model serialization and persistence
//!
//! A fitted [`Classifier`] is captured as a [`ModelSnapshot`]: the kernel
//! identity, the solver configuration, the multipliers and the recovered
//! decision function. Snapshots are stored as JSON.

use crate::api::Classifier;
use crate::core::{FitReport, Result, SVMError, SolverConfig};
use crate::kernel::{Kernel, KernelType};
use crate::optimizer::{SVMOptimizer, TrainedSVM};
use crate::recovery::DecisionFunction;
use crate::solver::ConstrainedMinimizer;
use chrono::{DateTime, Utc};
use log::info;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Relative difference up to which two kernel bandwidths are considered equal
const SIGMA_MATCH_TOLERANCE: f64 = 1e-12;

/// Serializable representation of a fitted classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    /// Kernel the model was trained with
    pub kernel: KernelType,
    /// Training parameters used
    pub config: SolverConfig,
    /// One multiplier per training sample
    pub multipliers: Array1<f64>,
    /// Weights or support vectors, plus the bias
    pub decision: DecisionFunction,
    pub report: FitReport,
    /// Model metadata
    pub metadata: ModelMetadata,
}

/// Model metadata for tracking and validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Library version used to create the model
    pub library_version: String,
    pub n_features: usize,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl ModelSnapshot {
    /// Capture a fitted classifier
    pub fn from_classifier<K, M>(classifier: &Classifier<K, M>) -> Result<Self>
    where
        K: Kernel,
        M: ConstrainedMinimizer,
    {
        let model = classifier.trained()?;
        Ok(Self {
            kernel: model.kernel().kernel_type(),
            config: classifier.config().clone(),
            multipliers: model.alpha_values().clone(),
            decision: model.decision().clone(),
            report: model.report().clone(),
            metadata: ModelMetadata {
                library_version: env!("CARGO_PKG_VERSION").to_string(),
                n_features: model.decision().n_features(),
                created_at: Utc::now(),
            },
        })
    }

    /// Save model to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)
            .map_err(|e| SVMError::SerializationError(e.to_string()))?;
        info!("saved {} model to {}", self.kernel, path.as_ref().display());
        Ok(())
    }

    /// Load model from file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let snapshot: Self = serde_json::from_reader(reader)
            .map_err(|e| SVMError::SerializationError(e.to_string()))?;
        snapshot.check()?;
        Ok(snapshot)
    }

    pub fn bias(&self) -> f64 {
        self.decision.bias()
    }

    /// Weight vector, present for linear models only
    pub fn weights(&self) -> Option<&Array1<f64>> {
        self.decision.weights()
    }

    /// Internal consistency of a deserialized snapshot
    fn check(&self) -> Result<()> {
        self.config.validate()?;
        if self.decision.n_features() != self.metadata.n_features {
            return Err(SVMError::shape(
                "snapshot feature dimension",
                self.metadata.n_features,
                self.decision.n_features(),
            ));
        }
        if let DecisionFunction::Dual {
            support_vectors,
            coefficients,
            ..
        } = &self.decision
        {
            if support_vectors.nrows() != coefficients.len() {
                return Err(SVMError::shape(
                    "snapshot coefficients",
                    support_vectors.nrows(),
                    coefficients.len(),
                ));
            }
        }
        if matches!(self.kernel, KernelType::Linear) != self.weights().is_some() {
            return Err(SVMError::SerializationError(format!(
                "decision function form does not match kernel {}",
                self.kernel
            )));
        }
        Ok(())
    }
}

impl fmt::Display for ModelSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== SVM Model Summary ===")?;
        writeln!(f, "Kernel Type: {}", self.kernel)?;
        writeln!(f, "Support Vectors: {}", self.report.n_support_vectors)?;
        writeln!(f, "Bias: {:.6}", self.bias())?;
        writeln!(f, "Dual Objective: {:.6}", self.report.dual_objective)?;
        writeln!(f, "Library Version: {}", self.metadata.library_version)?;
        writeln!(f, "Created: {}", self.metadata.created_at.to_rfc3339())?;
        writeln!(f, "Training Parameters:")?;
        writeln!(f, "  C: {}", self.config.c)?;
        writeln!(f, "  Tolerance: {}", self.config.tolerance)?;
        write!(f, "  Max Iterations: {}", self.config.max_iterations)
    }
}

fn same_kernel(a: KernelType, b: KernelType) -> bool {
    match (a, b) {
        (KernelType::Linear, KernelType::Linear) => true,
        (KernelType::Gaussian { sigma: s1 }, KernelType::Gaussian { sigma: s2 }) => {
            (s1 - s2).abs() <= SIGMA_MATCH_TOLERANCE * s1.abs().max(s2.abs())
        }
        _ => false,
    }
}

impl<K: Kernel> Classifier<K> {
    /// Rebuild a fitted classifier from a snapshot; `kernel` must match the
    /// kernel the snapshot was trained with
    pub fn from_snapshot(kernel: K, snapshot: ModelSnapshot) -> Result<Self> {
        snapshot.check()?;
        if !same_kernel(kernel.kernel_type(), snapshot.kernel) {
            return Err(SVMError::InvalidParameter(format!(
                "snapshot was trained with kernel {}, got {}",
                snapshot.kernel,
                kernel.kernel_type()
            )));
        }

        let optimizer = SVMOptimizer::new(kernel, snapshot.config)?;
        let model = TrainedSVM::from_parts(
            optimizer.kernel_arc(),
            snapshot.multipliers,
            snapshot.decision,
            optimizer.config(),
            snapshot.report,
        );
        Ok(Classifier::from_parts(optimizer, model))
    }
}

impl<K: Kernel, M: ConstrainedMinimizer> Classifier<K, M> {
    /// Snapshot of the current fit
    pub fn snapshot(&self) -> Result<ModelSnapshot> {
        ModelSnapshot::from_classifier(self)
    }

    /// Save the current fit as JSON
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.snapshot()?.save_to_file(path)
    }
}
