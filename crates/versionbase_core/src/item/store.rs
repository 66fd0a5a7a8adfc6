//! Item CRUD scoped by (version, context).

use crate::error::{CoreError, CoreResult};
use crate::item::Item;
use crate::query::{ItemFilter, ItemProjection, MatchAll, WholeItem};
use crate::state::GraphState;
use crate::types::{ItemId, VersionId};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::trace;

impl GraphState {
    /// Returns the item `item_id` in `version_id` as seen through `context_id`,
    /// or `None` if the version does not hold it.
    ///
    /// # Errors
    ///
    /// `InvalidTransaction` or `InvalidVersion`.
    pub fn get_item(
        &self,
        item_id: &str,
        version_id: &str,
        context_id: &str,
    ) -> CoreResult<Option<&Item>> {
        let version = self.resolve_version(context_id, version_id)?;
        Ok(version.items().get(item_id).map(Arc::as_ref))
    }

    /// Stores `data` under a freshly generated item id.
    ///
    /// # Errors
    ///
    /// `InvalidTransaction`, `InvalidVersion` or `ReadOnlyContext`.
    pub fn create_item(
        &self,
        version_id: &str,
        context_id: &str,
        data: Map<String, Value>,
    ) -> CoreResult<(GraphState, ItemId)> {
        let item_id = ItemId::generate();
        let next = self.put_item(item_id.clone(), version_id, context_id, data)?;
        trace!(item = %item_id, version = version_id, context = context_id, "created item");
        Ok((next, item_id))
    }

    /// Stores `data` under `item_id`, replacing whatever was there.
    ///
    /// There is no existence check: updating an absent id creates it.
    ///
    /// # Errors
    ///
    /// `InvalidTransaction`, `InvalidVersion` or `ReadOnlyContext`.
    pub fn update_item(
        &self,
        item_id: &str,
        version_id: &str,
        context_id: &str,
        data: Map<String, Value>,
    ) -> CoreResult<GraphState> {
        let next = self.put_item(ItemId::from(item_id), version_id, context_id, data)?;
        trace!(item = item_id, version = version_id, context = context_id, "updated item");
        Ok(next)
    }

    /// Removes `item_id` from the version.
    ///
    /// # Errors
    ///
    /// `ItemNotFound` if the version does not hold the item, otherwise as
    /// [`update_item`](Self::update_item).
    pub fn delete_item(
        &self,
        item_id: &str,
        version_id: &str,
        context_id: &str,
    ) -> CoreResult<GraphState> {
        if self.get_item(item_id, version_id, context_id)?.is_none() {
            return Err(CoreError::item_not_found(version_id, item_id));
        }

        let mut next = self.clone();
        next.writable_version_mut(context_id, version_id)?
            .items_mut()
            .remove(item_id);
        trace!(item = item_id, version = version_id, context = context_id, "deleted item");
        Ok(next)
    }

    /// Evaluates `filter` over every item of the version and returns the
    /// projection of each match, in the version's insertion order.
    ///
    /// `None` for `filter` matches everything; `None` for `select` returns
    /// whole items.
    ///
    /// # Errors
    ///
    /// `InvalidTransaction` or `InvalidVersion`.
    pub fn find_items(
        &self,
        version_id: &str,
        context_id: &str,
        filter: Option<&dyn ItemFilter>,
        select: Option<&dyn ItemProjection>,
    ) -> CoreResult<Vec<Value>> {
        let filter = filter.unwrap_or(&MatchAll);
        let select = select.unwrap_or(&WholeItem);
        let version = self.resolve_version(context_id, version_id)?;

        Ok(version
            .items()
            .iter()
            .filter(|item| filter.matches(item))
            .map(|item| select.project(item))
            .collect())
    }

    fn put_item(
        &self,
        item_id: ItemId,
        version_id: &str,
        context_id: &str,
        data: Map<String, Value>,
    ) -> CoreResult<GraphState> {
        let item = Item::new(item_id, VersionId::from(version_id), data);
        let mut next = self.clone();
        next.writable_version_mut(context_id, version_id)?
            .items_mut()
            .insert(Arc::new(item));
        Ok(next)
    }
}
