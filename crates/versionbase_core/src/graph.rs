//! Version graph operations.

use crate::error::{CoreError, CoreResult};
use crate::item::ItemMap;
use crate::state::GraphState;
use crate::types::VersionId;
use crate::version::Version;
use std::sync::Arc;
use tracing::debug;

impl GraphState {
    /// Adds a version to `current`.
    ///
    /// - No parents: a root version with no items. `data_parent_id` must be
    ///   absent.
    /// - One or more parents: every parent must exist in `current`. The new
    ///   version starts with the items of `data_parent_id` (default: the first
    ///   parent), which must be one of the parents.
    ///
    /// # Errors
    ///
    /// `DuplicateVersion`, `UnknownParent` or `InvalidDataParent`.
    pub fn create_version(
        &self,
        commit_id: &str,
        data_parent_id: Option<&str>,
        parent_ids: &[&str],
    ) -> CoreResult<GraphState> {
        let current = self.current();
        if current.has_version(commit_id) {
            return Err(CoreError::DuplicateVersion {
                version_id: commit_id.to_owned(),
            });
        }

        let parents = parent_ids
            .iter()
            .map(|parent_id| {
                current
                    .version(parent_id)
                    .cloned()
                    .ok_or_else(|| CoreError::UnknownParent {
                        version_id: commit_id.to_owned(),
                        parent_id: (*parent_id).to_owned(),
                    })
            })
            .collect::<CoreResult<Vec<Arc<Version>>>>()?;

        let version_id = VersionId::from(commit_id);
        let version = match (parents.first(), data_parent_id) {
            (None, None) => Version::root(version_id),
            (None, Some(data_parent_id)) => {
                return Err(CoreError::InvalidDataParent {
                    version_id: commit_id.to_owned(),
                    data_parent_id: data_parent_id.to_owned(),
                })
            }
            (Some(first), None) => {
                let items = first.items().clone();
                Version::child(version_id, parents, items)
            }
            (Some(_), Some(data_parent_id)) => {
                let data_parent = parents
                    .iter()
                    .find(|parent| parent.id().as_str() == data_parent_id)
                    .ok_or_else(|| CoreError::InvalidDataParent {
                        version_id: commit_id.to_owned(),
                        data_parent_id: data_parent_id.to_owned(),
                    })?;
                let items = data_parent.items().clone();
                Version::child(version_id, parents, items)
            }
        };

        debug!(
            version = commit_id,
            parents = parent_ids.len(),
            items = version.items().len(),
            "created version"
        );

        let mut next = self.clone();
        next.current_mut()
            .versions_mut()
            .insert(version.id().clone(), Arc::new(version));
        Ok(next)
    }

    /// Returns true if `commit_id` exists in `current`.
    #[must_use]
    pub fn version_exists(&self, commit_id: &str) -> bool {
        self.current().has_version(commit_id)
    }

    /// Copies items from one (context, version) cell into another.
    ///
    /// All ids are validated before anything is written: either every item is
    /// copied or none is.
    ///
    /// # Errors
    ///
    /// `InvalidTransaction`/`InvalidVersion` for either cell, `ReadOnlyContext`
    /// for the destination, `ItemNotFound` if the source lacks an id, and
    /// `ItemAlreadyExists` if the destination holds an id and `replace` is false.
    #[allow(clippy::too_many_arguments)]
    pub fn copy_version_items(
        &self,
        source_context: &str,
        dest_context: &str,
        source_version: &str,
        dest_version: &str,
        item_ids: &[&str],
        replace: bool,
    ) -> CoreResult<GraphState> {
        let source = self.resolve_version(source_context, source_version)?;
        let dest = self.resolve_version(dest_context, dest_version)?;

        let items = item_ids
            .iter()
            .map(|item_id| {
                let item = source
                    .items()
                    .get(item_id)
                    .ok_or_else(|| CoreError::item_not_found(source_version, *item_id))?;
                if !replace && dest.items().contains(item_id) {
                    return Err(CoreError::ItemAlreadyExists {
                        version_id: dest_version.to_owned(),
                        item_id: (*item_id).to_owned(),
                    });
                }
                Ok(Arc::clone(item))
            })
            .collect::<CoreResult<Vec<_>>>()?;

        let mut next = self.clone();
        let version = next.writable_version_mut(dest_context, dest_version)?;
        for item in items {
            version.items_mut().insert(item);
        }
        Ok(next)
    }

    /// Replaces the destination version's item map with the source's.
    ///
    /// The map is shared, not copied.
    ///
    /// # Errors
    ///
    /// `InvalidTransaction`/`InvalidVersion` for either cell and
    /// `ReadOnlyContext` for the destination.
    pub fn set_all_version_items(
        &self,
        source_context: &str,
        dest_context: &str,
        source_version: &str,
        dest_version: &str,
    ) -> CoreResult<GraphState> {
        let items: ItemMap = self
            .resolve_version(source_context, source_version)?
            .items()
            .clone();

        let mut next = self.clone();
        *next.writable_version_mut(dest_context, dest_version)?.items_mut() = items;
        Ok(next)
    }

    /// Returns the ids of every version in `current`, sorted.
    #[must_use]
    pub fn version_ids(&self) -> Vec<&VersionId> {
        let mut ids: Vec<&VersionId> = self.current().versions().keys().collect();
        ids.sort_unstable();
        ids
    }

    /// Returns the version `version_id` as seen through `context_id`.
    ///
    /// # Errors
    ///
    /// `InvalidTransaction` or `InvalidVersion`.
    pub fn version(&self, context_id: &str, version_id: &str) -> CoreResult<&Arc<Version>> {
        self.resolve_version(context_id, version_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextKind;
    use serde_json::{json, Map, Value};

    fn fields(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn tree() -> GraphState {
        GraphState::new()
            .create_version("A", None, &[])
            .unwrap()
            .create_version("B", None, &["A"])
            .unwrap()
            .create_version("C", None, &["A"])
            .unwrap()
            .create_version("D", None, &["C"])
            .unwrap()
    }

    fn parents_of<'a>(state: &'a GraphState, id: &str) -> Vec<&'a str> {
        state
            .current()
            .version(id)
            .unwrap()
            .parent_ids()
            .map(VersionId::as_str)
            .collect()
    }

    #[test]
    fn creates_a_version_tree() {
        let state = tree();
        assert_eq!(state.current().len(), 4);
        assert_eq!(parents_of(&state, "D"), vec!["C"]);
        assert_eq!(parents_of(&state, "B"), vec!["A"]);
        assert!(parents_of(&state, "A").is_empty());

        let d = state.current().version("D").unwrap();
        assert_eq!(d.parents()[0].parents()[0].id().as_str(), "A");
    }

    #[test]
    fn rejects_unknown_parent() {
        let err = GraphState::new().create_version("B", None, &["A"]).unwrap_err();
        assert_eq!(
            err,
            CoreError::UnknownParent {
                version_id: "B".into(),
                parent_id: "A".into()
            }
        );
    }

    #[test]
    fn rejects_duplicate_version() {
        let state = tree();
        let err = state.create_version("B", None, &["A"]).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateVersion { .. }));
        // the failed call left the original untouched
        assert_eq!(state.current().len(), 4);
    }

    #[test]
    fn merge_version_takes_items_from_data_parent() {
        let state = tree();
        let (state, in_b) = state
            .create_item("B", "current", fields(json!({"side": "b"})))
            .unwrap();
        let (state, in_d) = state
            .create_item("D", "current", fields(json!({"side": "d"})))
            .unwrap();

        let default = state.create_version("E", None, &["B", "D"]).unwrap();
        let e = default.current().version("E").unwrap();
        assert!(e.items().contains(in_b.as_str()));
        assert!(!e.items().contains(in_d.as_str()));

        let chosen = state.create_version("E", Some("D"), &["B", "D"]).unwrap();
        let e = chosen.current().version("E").unwrap();
        assert!(e.items().contains(in_d.as_str()));
        assert_eq!(parents_of(&chosen, "E"), vec!["B", "D"]);
    }

    #[test]
    fn rejects_data_parent_outside_parents() {
        let state = tree();
        let err = state.create_version("E", Some("A"), &["B", "D"]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidDataParent { .. }));

        let err = state.create_version("R", Some("A"), &[]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidDataParent { .. }));
    }

    #[test]
    fn version_exists_queries_current() {
        let state = tree();
        assert!(state.version_exists("C"));
        assert!(!state.version_exists("Z"));
        assert_eq!(
            state.version_ids().iter().map(|id| id.as_str()).collect::<Vec<_>>(),
            vec!["A", "B", "C", "D"]
        );
    }

    #[test]
    fn copy_items_between_versions() {
        let state = tree();
        let (state, id) = state
            .create_item("B", "current", fields(json!({"n": 1})))
            .unwrap();
        let state = state
            .copy_version_items("current", "current", "B", "C", &[id.as_str()], false)
            .unwrap();

        let copied = state.get_item(id.as_str(), "C", "current").unwrap().unwrap();
        assert_eq!(copied.get("n"), Some(json!(1)));

        // later source mutation does not leak into the copy
        let state = state
            .update_item(id.as_str(), "B", "current", fields(json!({"n": 2})))
            .unwrap();
        let copied = state.get_item(id.as_str(), "C", "current").unwrap().unwrap();
        assert_eq!(copied.get("n"), Some(json!(1)));
    }

    #[test]
    fn copy_requires_replace_for_existing_items() {
        let state = tree();
        let (state, id) = state
            .create_item("A", "current", fields(json!({"n": 1})))
            .unwrap();
        // C was created before the item existed in A
        let state = state
            .copy_version_items("current", "current", "A", "C", &[id.as_str()], false)
            .unwrap();
        let err = state
            .copy_version_items("current", "current", "A", "C", &[id.as_str()], false)
            .unwrap_err();
        assert!(matches!(err, CoreError::ItemAlreadyExists { .. }));
        assert!(state
            .copy_version_items("current", "current", "A", "C", &[id.as_str()], true)
            .is_ok());
    }

    #[test]
    fn copy_is_all_or_nothing() {
        let state = tree();
        let (state, id) = state
            .create_item("A", "current", fields(json!({"n": 1})))
            .unwrap();
        let err = state
            .copy_version_items("current", "current", "A", "C", &[id.as_str(), "missing"], false)
            .unwrap_err();
        assert!(matches!(err, CoreError::ItemNotFound { .. }));
        assert!(state.get_item(id.as_str(), "C", "current").unwrap().is_none());
    }

    #[test]
    fn set_all_items_shares_the_map() {
        let state = tree();
        let (state, _) = state
            .create_item("B", "current", fields(json!({"n": 1})))
            .unwrap();
        let state = state
            .set_all_version_items("current", "current", "B", "D")
            .unwrap();
        let b = state.current().version("B").unwrap();
        let d = state.current().version("D").unwrap();
        assert!(b.items().ptr_eq(d.items()));
        assert_eq!(parents_of(&state, "D"), vec!["C"]);
    }

    #[test]
    fn copy_into_snapshot_is_rejected() {
        let state = tree();
        let (state, snapshot) = state.create_snapshot("current").unwrap();
        let err = state
            .set_all_version_items("current", snapshot.as_str(), "B", "D")
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::ReadOnlyContext {
                kind: ContextKind::Snapshot,
                ..
            }
        ));
    }
}
