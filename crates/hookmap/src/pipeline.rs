// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Ordered before/after hook chains wrapping one operation.

use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::action::Action;
use crate::context::{Outcome, PipelineContext};
use crate::error::{Error, Result};
use crate::operation::Operation;

#[derive(Debug, Clone, Copy)]
enum Stage {
    Before,
    After,
}

/// The hook chain of one operation.
///
/// A pipeline runs its before-hooks, then the main function, then its after-hooks. It may have
/// a parent, whose hooks run first in each stage. The parent is held weakly: once it is dropped
/// only this pipeline's own hooks run.
///
/// Hook order is resolved on every execution, so hooks registered after a call still apply to
/// the next one.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use hookmap::{Action, Operation, Pipeline};
///
/// let parent = Arc::new(Pipeline::new(Operation::Set));
/// parent.before(Action::new(|_| Ok(())).with_priority(5));
///
/// let child = Pipeline::with_parent(Operation::Set, &parent);
/// child.before(Action::new(|_| Ok(())).with_priority(1));
///
/// let priorities: Vec<_> = child.resolved_before().iter().map(Action::priority).collect();
/// assert_eq!(priorities, [5, 1]);
/// ```
#[derive(Debug)]
pub struct Pipeline {
    operation: Operation,
    parent: Option<Weak<Self>>,
    before: RwLock<Vec<Action>>,
    after: RwLock<Vec<Action>>,
}

impl Pipeline {
    /// Creates a pipeline without a parent.
    #[must_use]
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            parent: None,
            before: RwLock::default(),
            after: RwLock::default(),
        }
    }

    /// Creates a pipeline whose hooks run after those of `parent` in each stage.
    #[must_use]
    pub fn with_parent(operation: Operation, parent: &Arc<Self>) -> Self {
        Self {
            parent: Some(Arc::downgrade(parent)),
            ..Self::new(operation)
        }
    }

    /// Returns the operation this pipeline wraps.
    #[must_use]
    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    /// Returns the parent pipeline if it is still alive.
    #[must_use]
    pub fn parent(&self) -> Option<Arc<Self>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// Appends a hook that runs before the main function.
    pub fn before(&self, action: Action) {
        self.actions(Stage::Before).write().push(action);
    }

    /// Appends a hook that runs after the main function.
    pub fn after(&self, action: Action) {
        self.actions(Stage::After).write().push(action);
    }

    /// Returns the before-hooks in execution order.
    ///
    /// That is the parent's resolved list followed by this pipeline's own hooks sorted by
    /// priority. Ties keep registration order.
    #[must_use]
    pub fn resolved_before(&self) -> Vec<Action> {
        self.resolve(Stage::Before)
    }

    /// Returns the after-hooks in execution order.
    #[must_use]
    pub fn resolved_after(&self) -> Vec<Action> {
        self.resolve(Stage::After)
    }

    /// Runs `main` wrapped by the hooks that apply to the context's collection.
    ///
    /// `main` sees the arguments as left by the before-hooks. Its return value is stored in the
    /// context's result slot, the after-hooks run, and the final content of the slot is
    /// returned.
    ///
    /// # Errors
    ///
    /// The first error returned by a hook or by `main` is returned unchanged and stops the
    /// invocation. Hooks that already ran are not undone.
    pub fn execute<F>(&self, ctx: &mut PipelineContext<'_>, main: F) -> Result<Outcome>
    where
        F: FnOnce(&PipelineContext<'_>) -> Result<Outcome>,
    {
        let collection = ctx.collection();

        let before = self.resolved_before();
        self.run(Stage::Before, &before, ctx, collection)?;

        let outcome = main(ctx)?;
        ctx.set_result(outcome);

        let after = self.resolved_after();
        self.run(Stage::After, &after, ctx, collection)?;

        ctx.take_result()
            .ok_or_else(|| Error::hook(format!("{} pipeline lost its result", self.operation)))
    }

    fn run(&self, stage: Stage, actions: &[Action], ctx: &mut PipelineContext<'_>, collection: &str) -> Result<()> {
        let mut ran = 0_usize;
        for action in actions.iter().filter(|action| action.applies_to(collection)) {
            action.run(ctx)?;
            ran += 1;
        }

        tracing::trace!(
            pipeline.operation = %self.operation,
            pipeline.stage = ?stage,
            pipeline.collection = collection,
            pipeline.hooks = ran,
            "pipeline.stage"
        );
        Ok(())
    }

    fn actions(&self, stage: Stage) -> &RwLock<Vec<Action>> {
        match stage {
            Stage::Before => &self.before,
            Stage::After => &self.after,
        }
    }

    fn resolve(&self, stage: Stage) -> Vec<Action> {
        let mut resolved = self.parent().map(|parent| parent.resolve(stage)).unwrap_or_default();

        let mut own = self.actions(stage).read().clone();
        own.sort_by_key(Action::priority);
        resolved.extend(own);
        resolved
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use hookmap_storage::testing::MockStorage;
    use static_assertions::assert_impl_all;

    use super::*;

    fn recorder(log: &Arc<Mutex<Vec<String>>>, label: &str) -> Action {
        let log = Arc::clone(log);
        let label = label.to_owned();
        Action::new(move |_| {
            log.lock().unwrap().push(label.clone());
            Ok(())
        })
    }

    fn execute(pipeline: &Pipeline, collection: &str) -> Result<Outcome> {
        let storage = MockStorage::new();
        let mut ctx = PipelineContext::new(pipeline.operation().clone(), &storage, "_id", collection, "1", None);
        pipeline.execute(&mut ctx, |_| Ok(Outcome::Written))
    }

    #[test]
    fn thread_safe_type() {
        assert_impl_all!(Pipeline: Send, Sync);
    }

    #[test]
    fn sorts_by_priority_with_stable_ties() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new(Operation::Get);
        pipeline.before(recorder(&log, "three").with_priority(3));
        pipeline.before(recorder(&log, "one-a").with_priority(1));
        pipeline.before(recorder(&log, "two").with_priority(2));
        pipeline.before(recorder(&log, "one-b").with_priority(1));

        execute(&pipeline, "users").unwrap();

        assert_eq!(*log.lock().unwrap(), ["one-a", "one-b", "two", "three"]);
    }

    #[test]
    fn parent_block_runs_first_in_each_stage() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let parent = Arc::new(Pipeline::new(Operation::Set));
        parent.before(recorder(&log, "parent-before").with_priority(50));
        parent.after(recorder(&log, "parent-after").with_priority(50));

        let child = Pipeline::with_parent(Operation::Set, &parent);
        child.before(recorder(&log, "child-before").with_priority(-50));
        child.after(recorder(&log, "child-after").with_priority(-50));

        execute(&child, "users").unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            ["parent-before", "child-before", "parent-after", "child-after"]
        );
    }

    #[test]
    fn dropped_parent_is_ignored() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let parent = Arc::new(Pipeline::new(Operation::Set));
        parent.before(recorder(&log, "parent"));
        let child = Pipeline::with_parent(Operation::Set, &parent);
        child.before(recorder(&log, "child"));

        drop(parent);
        assert!(child.parent().is_none());
        execute(&child, "users").unwrap();

        assert_eq!(*log.lock().unwrap(), ["child"]);
    }

    #[test]
    fn filtered_hooks_skip_other_collections() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new(Operation::Get);
        pipeline.before(recorder(&log, "users-only").for_collection("users"));
        pipeline.after(recorder(&log, "everyone"));

        execute(&pipeline, "orders").unwrap();
        assert_eq!(*log.lock().unwrap(), ["everyone"]);
    }

    #[test]
    fn failing_before_hook_skips_main_and_later_hooks() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new(Operation::Set);
        pipeline.before(recorder(&log, "first"));
        pipeline.before(Action::new(|_| Err(Error::hook("stop"))).with_priority(2));
        pipeline.before(recorder(&log, "never").with_priority(3));
        pipeline.after(recorder(&log, "after"));

        let storage = MockStorage::new();
        let mut ctx = PipelineContext::new(Operation::Set, &storage, "_id", "users", "1", None);
        let main_ran = Mutex::new(false);
        let error = pipeline
            .execute(&mut ctx, |_| {
                *main_ran.lock().unwrap() = true;
                Ok(Outcome::Written)
            })
            .unwrap_err();

        assert_eq!(error.to_string(), "hook failed: stop");
        assert!(!*main_ran.lock().unwrap());
        assert_eq!(*log.lock().unwrap(), ["first"]);
    }

    #[test]
    fn after_hooks_see_and_replace_result() {
        let pipeline = Pipeline::new(Operation::Get);
        pipeline.after(Action::new(|ctx| {
            assert_eq!(ctx.result(), Some(&Outcome::Fetched(None)));
            ctx.set_result(Outcome::Written);
            Ok(())
        }));

        let storage = MockStorage::new();
        let mut ctx = PipelineContext::new(Operation::Get, &storage, "_id", "users", "1", None);
        let outcome = pipeline.execute(&mut ctx, |_| Ok(Outcome::Fetched(None))).unwrap();

        assert_eq!(outcome, Outcome::Written);
    }

    #[test]
    fn main_sees_rewritten_arguments() {
        let pipeline = Pipeline::new(Operation::Get);
        pipeline.before(Action::new(|ctx| {
            *ctx.key_mut() = "rewritten".to_owned();
            ctx.scratch_mut().insert("seen", true);
            Ok(())
        }));

        let storage = MockStorage::new();
        let mut ctx = PipelineContext::new(Operation::Get, &storage, "_id", "users", "1", None);
        pipeline
            .execute(&mut ctx, |ctx| {
                assert_eq!(ctx.key(), "rewritten");
                assert_eq!(ctx.scratch().get::<bool>("seen"), Some(&true));
                Ok(Outcome::Fetched(None))
            })
            .unwrap();
    }

    #[test]
    fn hooks_registered_later_take_effect() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new(Operation::Delete);
        execute(&pipeline, "users").unwrap();

        pipeline.after(recorder(&log, "late"));
        execute(&pipeline, "users").unwrap();

        assert_eq!(*log.lock().unwrap(), ["late"]);
    }
}
