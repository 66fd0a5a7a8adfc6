//! The overall graph state.

use crate::context::{Context, ContextKind};
use crate::error::{CoreError, CoreResult};
use crate::types::ContextId;
use crate::version::Version;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Every isolation context and the versions each one sees.
///
/// This is the single value the caller threads through engine calls (the
/// "transshot"). Operations borrow it and return a new `GraphState`; a failed
/// operation returns an error and the caller keeps using the value it passed
/// in. Cloning is cheap: contexts, versions and item maps are shared until
/// written.
///
/// The `current` context always exists and can never be removed.
#[derive(Clone)]
pub struct GraphState {
    current: Context,
    others: HashMap<ContextId, Context>,
}

impl GraphState {
    /// Creates a state with an empty `current` context and nothing else.
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: Context::new(ContextKind::Current),
            others: HashMap::new(),
        }
    }

    /// Returns the `current` context.
    #[must_use]
    pub fn current(&self) -> &Context {
        &self.current
    }

    /// Returns the context named `context_id`.
    #[must_use]
    pub fn context(&self, context_id: &str) -> Option<&Context> {
        if context_id == ContextId::CURRENT {
            Some(&self.current)
        } else {
            self.others.get(context_id)
        }
    }

    /// Returns true if a context named `context_id` exists.
    #[must_use]
    pub fn has_context(&self, context_id: &str) -> bool {
        self.context(context_id).is_some()
    }

    /// Returns the number of contexts, `current` included.
    #[must_use]
    pub fn context_count(&self) -> usize {
        self.others.len() + 1
    }

    /// Iterates the ids of every context of the given kind.
    pub fn context_ids(&self, kind: ContextKind) -> impl Iterator<Item = &str> + '_ {
        let current = (kind == ContextKind::Current).then_some(ContextId::CURRENT);
        let others = self
            .others
            .iter()
            .filter(move |(_, context)| context.kind() == kind)
            .map(|(id, _)| id.as_str());
        current.into_iter().chain(others)
    }

    /// Resolves a context id, failing with `InvalidTransaction`.
    pub(crate) fn resolve(&self, context_id: &str) -> CoreResult<&Context> {
        self.context(context_id)
            .ok_or_else(|| CoreError::invalid_transaction(context_id))
    }

    /// Resolves a (context, version) pair for reading.
    pub(crate) fn resolve_version(
        &self,
        context_id: &str,
        version_id: &str,
    ) -> CoreResult<&Arc<Version>> {
        self.resolve(context_id)?
            .version(version_id)
            .ok_or_else(|| CoreError::invalid_version(context_id, version_id))
    }

    /// Resolves a context that must accept writes.
    pub(crate) fn writable_context_mut(&mut self, context_id: &str) -> CoreResult<&mut Context> {
        let context = if context_id == ContextId::CURRENT {
            &mut self.current
        } else {
            self.others
                .get_mut(context_id)
                .ok_or_else(|| CoreError::invalid_transaction(context_id))?
        };

        if !context.kind().is_writable() {
            return Err(CoreError::ReadOnlyContext {
                context_id: context_id.to_owned(),
                kind: context.kind(),
            });
        }
        Ok(context)
    }

    /// Resolves a (context, version) pair for writing, detaching the version
    /// from every other holder.
    pub(crate) fn writable_version_mut(
        &mut self,
        context_id: &str,
        version_id: &str,
    ) -> CoreResult<&mut Version> {
        let context = self.writable_context_mut(context_id)?;
        if !context.has_version(version_id) {
            return Err(CoreError::invalid_version(context_id, version_id));
        }
        let version = context
            .versions_mut()
            .get_mut(version_id)
            .ok_or_else(|| CoreError::invalid_version(context_id, version_id))?;
        Ok(Arc::make_mut(version))
    }

    pub(crate) fn insert_context(&mut self, context_id: ContextId, context: Context) {
        self.others.insert(context_id, context);
    }

    pub(crate) fn remove_context(&mut self, context_id: &str) -> Option<Context> {
        self.others.remove(context_id)
    }

    pub(crate) fn current_mut(&mut self) -> &mut Context {
        &mut self.current
    }

    pub(crate) fn replace_current(&mut self, context: Context) {
        self.current = context.alias(ContextKind::Current);
    }
}

impl Default for GraphState {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for GraphState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphState")
            .field("current", &self.current)
            .field("contexts", &self.others.len())
            .finish()
    }
}
