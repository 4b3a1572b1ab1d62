// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Hooks registered on a pipeline.

use std::fmt::Debug;
use std::sync::Arc;

use crate::context::PipelineContext;
use crate::error::Result;

/// Priority given to actions that do not set one.
pub const DEFAULT_PRIORITY: i32 = 1;

type Hook = dyn Fn(&mut PipelineContext<'_>) -> Result<()> + Send + Sync;

/// A hook together with its priority and collection filter.
///
/// Lower priorities run earlier. An action without a collection filter runs for every
/// collection; a filtered action runs only when the context's collection equals the filter.
///
/// # Examples
///
/// ```
/// use hookmap::Action;
///
/// let audit = Action::new(|ctx| {
///     println!("writing {}", ctx.key());
///     Ok(())
/// })
/// .with_priority(10)
/// .for_collection("users");
///
/// assert_eq!(audit.priority(), 10);
/// assert!(audit.applies_to("users"));
/// assert!(!audit.applies_to("orders"));
/// ```
#[derive(Clone)]
pub struct Action {
    hook: Arc<Hook>,
    priority: i32,
    collection: Option<Arc<str>>,
}

impl Action {
    /// Creates an action with the default priority and no collection filter.
    pub fn new<F>(hook: F) -> Self
    where
        F: Fn(&mut PipelineContext<'_>) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            hook: Arc::new(hook),
            priority: DEFAULT_PRIORITY,
            collection: None,
        }
    }

    /// Sets the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Restricts the action to one collection.
    #[must_use]
    pub fn for_collection(mut self, collection: impl Into<Arc<str>>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// Returns the priority.
    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Returns the collection filter, if any.
    #[must_use]
    pub fn collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    /// Returns `true` if the action fires for `collection`.
    #[must_use]
    pub fn applies_to(&self, collection: &str) -> bool {
        self.collection.as_deref().is_none_or(|filter| filter == collection)
    }

    /// Invokes the hook.
    ///
    /// # Errors
    ///
    /// Returns whatever error the hook returns.
    pub fn run(&self, ctx: &mut PipelineContext<'_>) -> Result<()> {
        (self.hook)(ctx)
    }
}

impl Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action")
            .field("priority", &self.priority)
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;

    #[test]
    fn thread_safe_type() {
        assert_impl_all!(Action: Send, Sync, Clone);
    }

    #[test]
    fn defaults() {
        let action = Action::new(|_| Ok(()));
        assert_eq!(action.priority(), DEFAULT_PRIORITY);
        assert_eq!(action.collection(), None);
        assert!(action.applies_to("anything"));
    }

    #[test]
    fn collection_filter() {
        let action = Action::new(|_| Ok(())).for_collection(String::from("users"));
        assert_eq!(action.collection(), Some("users"));
        assert!(action.applies_to("users"));
        assert!(!action.applies_to("user"));
    }

    #[test]
    fn debug_omits_hook() {
        let action = Action::new(|_| Ok(())).with_priority(-4);
        let debug = format!("{action:?}");
        assert!(debug.contains("priority: -4"));
        assert!(debug.contains(".."));
    }
}
