//! Recognition pipeline shared by the binary and its tests.
//!
//! [`Database`] bundles the label names with the descriptor database.
//! [`recognize`] runs one query file through the index and the vote classifier
//! and returns a [`QueryReport`].

use featurematch_core::dataset::{
    load_descriptor_database, load_keypoints, load_label_names, DescriptorDatabase, LoadError,
};
use featurematch_core::{classify, config, FeatureIndex, Label, MatchError, Prediction};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Label names plus labeled reference descriptors.
#[derive(Debug, Clone)]
pub struct Database {
    names: BTreeMap<Label, String>,
    descriptors: DescriptorDatabase,
    num_classes: u32,
}

impl Database {
    /// Pairs a name table with a descriptor database.
    ///
    /// Fails with [`MatchError::InvalidParameter`] if any label is `Label::MAX`,
    /// which leaves no room for a class count.
    pub fn new(
        names: BTreeMap<Label, String>,
        descriptors: DescriptorDatabase,
    ) -> Result<Self, MatchError> {
        let largest = names
            .keys()
            .next_back()
            .copied()
            .max(descriptors.vectors.labels().iter().max().copied());
        let num_classes = match largest {
            Some(label) => label.checked_add(1).ok_or_else(|| {
                MatchError::InvalidParameter(format!("label {label} is reserved"))
            })?,
            None => 0,
        };
        Ok(Self {
            names,
            descriptors,
            num_classes,
        })
    }

    /// Loads the label table and the descriptor database.
    pub fn load(objects: &Path, descriptions: &Path) -> Result<Self, LoadError> {
        let names = load_label_names(objects)?;
        let descriptors = load_descriptor_database(descriptions)?;
        let unnamed = descriptors
            .vectors
            .labels()
            .iter()
            .filter(|&&l| !names.contains_key(&l))
            .count();
        if unnamed > 0 {
            tracing::warn!(unnamed, "Descriptors carry labels missing from the name table");
        }
        Ok(Self::new(names, descriptors)?)
    }

    /// Number of classes voted over: one past the largest label seen in either
    /// the name table or the descriptors.
    pub fn num_classes(&self) -> u32 {
        self.num_classes
    }

    pub fn names(&self) -> &BTreeMap<Label, String> {
        &self.names
    }

    pub fn descriptors(&self) -> &DescriptorDatabase {
        &self.descriptors
    }

    /// Display name for a label.
    pub fn name(&self, label: Label) -> Option<&str> {
        self.names.get(&label).map(String::as_str)
    }
}

/// Outcome of recognizing one query file.
#[derive(Debug, Clone, Serialize)]
pub struct QueryReport {
    pub query: PathBuf,
    /// Descriptors extracted from the query image.
    pub descriptors: usize,
    pub prediction: Prediction,
    pub name: Option<String>,
    pub elapsed_ms: f64,
}

impl QueryReport {
    /// One-line human-readable result.
    pub fn summary(&self) -> String {
        match self.prediction {
            Prediction::Match { votes, total, .. } => format!(
                "{}: Result: {} ({}/{} votes, {} descriptors, {:.1} ms)",
                self.query.display(),
                self.name.as_deref().unwrap_or("unknown"),
                votes,
                total,
                self.descriptors,
                self.elapsed_ms
            ),
            Prediction::NoMatch => format!(
                "{}: Result: no match ({} descriptors, {:.1} ms)",
                self.query.display(),
                self.descriptors,
                self.elapsed_ms
            ),
        }
    }
}

/// Loads a keypoint file, matches each descriptor against the index, and votes.
pub fn recognize(
    index: &FeatureIndex<'_>,
    db: &Database,
    query: &Path,
    check_budget: usize,
) -> Result<QueryReport, LoadError> {
    let start = Instant::now();
    let keypoints = load_keypoints(query)?;
    let descriptors: Vec<&[f32]> = keypoints.iter().map(|k| k.descriptor.as_slice()).collect();

    let neighbors = index.find_knn(&descriptors, config::DEFAULT_K, check_budget)?;
    let prediction = classify(&neighbors, index.vectors(), db.num_classes())?;
    let name = prediction
        .label()
        .and_then(|label| db.name(label))
        .map(str::to_string);
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

    tracing::info!(
        query = %query.display(),
        descriptors = descriptors.len(),
        label = ?prediction.label(),
        elapsed_ms,
        "Recognition complete"
    );
    Ok(QueryReport {
        query: query.to_path_buf(),
        descriptors: descriptors.len(),
        prediction,
        name,
        elapsed_ms,
    })
}
