// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Lookup of pipelines by operation.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::operation::Operation;
use crate::pipeline::Pipeline;

/// Maps each operation to its pipeline.
///
/// The built-in operations have a pipeline from construction. A custom operation gets one the
/// first time it is looked up.
///
/// A manager created with [`PipelineManager::with_parent`] mirrors the pipelines its parent has
/// at that moment, each parented to the corresponding parent pipeline. Custom pipelines the
/// parent creates later are not mirrored: looking them up in the child creates a fresh
/// pipeline without a parent.
///
/// # Examples
///
/// ```
/// use hookmap::{Operation, PipelineManager};
///
/// let parent = PipelineManager::new();
/// let child = PipelineManager::with_parent(&parent);
///
/// assert!(child.pipeline(&Operation::Set).parent().is_some());
/// assert!(child.pipeline(&Operation::custom("export")).parent().is_none());
/// ```
#[derive(Debug)]
pub struct PipelineManager {
    pipelines: RwLock<HashMap<Operation, Arc<Pipeline>>>,
}

impl PipelineManager {
    /// Creates a manager holding the built-in pipelines.
    #[must_use]
    pub fn new() -> Self {
        let pipelines = Operation::BUILT_IN
            .into_iter()
            .map(|operation| (operation.clone(), Arc::new(Pipeline::new(operation))))
            .collect();

        Self {
            pipelines: RwLock::new(pipelines),
        }
    }

    /// Creates a manager whose pipelines are children of those `parent` holds now.
    #[must_use]
    pub fn with_parent(parent: &Self) -> Self {
        let pipelines = parent
            .pipelines
            .read()
            .iter()
            .map(|(operation, pipeline)| {
                (operation.clone(), Arc::new(Pipeline::with_parent(operation.clone(), pipeline)))
            })
            .collect();

        Self {
            pipelines: RwLock::new(pipelines),
        }
    }

    /// Returns the pipeline of `operation`, creating it if needed.
    #[must_use]
    pub fn pipeline(&self, operation: &Operation) -> Arc<Pipeline> {
        let existing = self.pipelines.read().get(operation).map(Arc::clone);
        if let Some(pipeline) = existing {
            return pipeline;
        }

        let mut pipelines = self.pipelines.write();
        let pipeline = pipelines
            .entry(operation.clone())
            .or_insert_with(|| Arc::new(Pipeline::new(operation.clone())));
        Arc::clone(pipeline)
    }

    /// Returns `true` if a pipeline exists for `operation`.
    #[must_use]
    pub fn contains(&self, operation: &Operation) -> bool {
        self.pipelines.read().contains_key(operation)
    }

    /// Returns the operations that currently have a pipeline, in no particular order.
    #[must_use]
    pub fn operations(&self) -> Vec<Operation> {
        self.pipelines.read().keys().cloned().collect()
    }
}

impl Default for PipelineManager {
    fn default() -> Self {
        Self::new()
    }
}
