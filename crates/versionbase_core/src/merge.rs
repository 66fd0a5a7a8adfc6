//! Three-way merge of transaction working copies into `current`.
//!
//! The merge compares by reference only. An item or item map that was never
//! written since it was shared is the *same* `Arc`, so "unchanged" is a
//! pointer comparison and two separately written but equal values still
//! count as two changes.

use crate::context::{Context, VersionMap};
use crate::error::{CoreError, CoreResult};
use crate::item::ItemMap;
use std::sync::Arc;
use tracing::trace;

/// Merges one version's item map.
///
/// `base` is the map captured when the transaction began (`None` if the
/// version did not exist then), `current` is the live map and `completed` is
/// the transaction's map. Items keep `current`'s order; items that only exist
/// in `completed` are appended in `completed`'s order.
///
/// # Errors
///
/// `ConcurrentModificationConflict`, `ConcurrentCreationConflict` or
/// `UpdateDeleteConflict`, naming the first offending item.
pub fn merge_items(
    version_id: &str,
    base: Option<&ItemMap>,
    current: &ItemMap,
    completed: &ItemMap,
) -> CoreResult<ItemMap> {
    if current.ptr_eq(completed) {
        return Ok(current.clone());
    }
    if let Some(base) = base {
        if current.ptr_eq(base) {
            return Ok(completed.clone());
        }
        if completed.ptr_eq(base) {
            return Ok(current.clone());
        }
    }

    let conflict = |make: fn(String, String) -> CoreError, item_id: &str| {
        make(version_id.to_owned(), item_id.to_owned())
    };
    let original = |item_id: &str| base.and_then(|base| base.get(item_id));
    let mut merged = current.clone();

    for ours in current.iter() {
        let item_id = ours.id().as_str();
        match (completed.get(item_id), original(item_id)) {
            (Some(theirs), _) if Arc::ptr_eq(ours, theirs) => {}
            (Some(theirs), Some(was)) => {
                if Arc::ptr_eq(ours, was) {
                    merged.insert(Arc::clone(theirs));
                } else if !Arc::ptr_eq(theirs, was) {
                    return Err(conflict(modification, item_id));
                }
            }
            (Some(_), None) => return Err(conflict(creation, item_id)),
            (None, Some(was)) => {
                if Arc::ptr_eq(ours, was) {
                    merged.remove(item_id);
                } else {
                    return Err(conflict(update_delete, item_id));
                }
            }
            // created on the current side only
            (None, None) => {}
        }
    }

    for theirs in completed.iter() {
        let item_id = theirs.id().as_str();
        if current.contains(item_id) {
            continue;
        }
        match original(item_id) {
            Some(was) if Arc::ptr_eq(theirs, was) => {}
            Some(_) => return Err(conflict(update_delete, item_id)),
            None => {
                merged.insert(Arc::clone(theirs));
            }
        }
    }

    Ok(merged)
}

/// Merges a completed transaction context into `current`.
///
/// The result starts from `current`'s mapping, so versions created there
/// while the transaction was open survive. Every version of `completed` is
/// then reconciled: reference-identical versions are kept, versions that only
/// exist in `completed` are carried over, and the rest are merged item by item
/// against the same version in `original`.
///
/// # Errors
///
/// Any conflict from [`merge_items`], or `DuplicateVersion` when both sides
/// created the same version id with different parents.
pub fn merge_contexts(
    original: &Context,
    current: &Context,
    completed: &Context,
) -> CoreResult<VersionMap> {
    let mut merged = current.versions().clone();

    for (version_id, theirs) in completed.versions() {
        let Some(ours) = current.version(version_id.as_str()) else {
            merged.insert(version_id.clone(), Arc::clone(theirs));
            continue;
        };
        if Arc::ptr_eq(ours, theirs) {
            continue;
        }

        let base = original.version(version_id.as_str());
        if base.is_none() && !ours.parent_ids().eq(theirs.parent_ids()) {
            return Err(CoreError::DuplicateVersion {
                version_id: version_id.to_string(),
            });
        }

        let items = merge_items(
            version_id.as_str(),
            base.map(|version| version.items()),
            ours.items(),
            theirs.items(),
        )?;
        if items.ptr_eq(ours.items()) {
            continue;
        }
        trace!(version = %version_id, items = items.len(), "merged version");
        merged.insert(version_id.clone(), Arc::new(ours.with_items(items)));
    }

    Ok(merged)
}

fn modification(version_id: String, item_id: String) -> CoreError {
    CoreError::ConcurrentModificationConflict {
        version_id,
        item_id,
        transaction_id: None,
    }
}

fn creation(version_id: String, item_id: String) -> CoreError {
    CoreError::ConcurrentCreationConflict {
        version_id,
        item_id,
        transaction_id: None,
    }
}

fn update_delete(version_id: String, item_id: String) -> CoreError {
    CoreError::UpdateDeleteConflict {
        version_id,
        item_id,
        transaction_id: None,
    }
}
