//! Maps requests onto engine calls.

use crate::error::{ServerError, ServerResult};
use crate::protocol::{Operation, Request};
use serde_json::Value;
use versionbase_core::{ContextId, GraphState, Item, ItemFilter, ItemProjection};

/// Applies one request to `state`.
///
/// Returns the new state and the operation result. This is a pure function:
/// on error `state` is still the one to keep.
pub fn dispatch(state: &GraphState, request: &Request) -> ServerResult<(GraphState, Value)> {
    let context = request
        .transaction_id
        .as_deref()
        .unwrap_or(ContextId::CURRENT);

    match &request.operation {
        Operation::Get {
            item_id,
            version_id,
        } => {
            let item = state.get_item(item_id, version_id, context)?;
            Ok((state.clone(), item.map_or(Value::Null, Item::to_value)))
        }

        Operation::Create { version_id, data } => {
            let (next, item_id) = state.create_item(version_id, context, data.clone())?;
            Ok((next, Value::String(item_id.into_string())))
        }

        Operation::Update {
            item_id,
            version_id,
            data,
        } => {
            let next = state.update_item(item_id, version_id, context, data.clone())?;
            Ok((next, Value::Null))
        }

        Operation::Delete {
            item_id,
            version_id,
        } => {
            let next = state.delete_item(item_id, version_id, context)?;
            Ok((next, Value::Null))
        }

        Operation::Find {
            version_id,
            filter,
            select,
        } => {
            let filter = filter.as_ref().map(|f| f as &dyn ItemFilter);
            let select = select.as_ref().map(|s| s as &dyn ItemProjection);
            let found = state.find_items(version_id, context, filter, select)?;
            Ok((state.clone(), Value::Array(found)))
        }

        Operation::Begin { snapshot_id } => {
            let base = snapshot_id.as_deref().unwrap_or(ContextId::CURRENT);
            let (next, transaction_id) = state.begin_transaction(base)?;
            Ok((next, Value::String(transaction_id.into_string())))
        }

        Operation::Commit => {
            let next = state.commit_transaction(required_transaction(request)?)?;
            Ok((next, Value::Null))
        }

        Operation::Rollback => {
            let next = state.rollback_transaction(required_transaction(request)?)?;
            Ok((next, Value::Null))
        }

        Operation::CreateSnapshot { snapshot_id } => {
            let base = snapshot_id.as_deref().unwrap_or(ContextId::CURRENT);
            let (next, snapshot_id) = state.create_snapshot(base)?;
            Ok((next, Value::String(snapshot_id.into_string())))
        }

        Operation::DeleteSnapshot { snapshot_id } => {
            let next = state.delete_snapshot(snapshot_id)?;
            Ok((next, Value::Null))
        }

        Operation::CreateVersion {
            commit_id,
            data_parent_id,
            parents,
            parent_commit_id,
        } => {
            let parents: Vec<&str> = if parents.is_empty() {
                parent_commit_id.as_deref().into_iter().collect()
            } else {
                parents.iter().map(String::as_str).collect()
            };
            let next = state.create_version(commit_id, data_parent_id.as_deref(), &parents)?;
            Ok((next, Value::Null))
        }

        Operation::VersionExists { commit_id } => {
            Ok((state.clone(), Value::Bool(state.version_exists(commit_id))))
        }

        Operation::SetAllVersionItems {
            source_snapshot_id,
            dest_snapshot_id,
            source_commit_id,
            dest_commit_id,
        } => {
            let next = state.set_all_version_items(
                source_snapshot_id.as_deref().unwrap_or(context),
                dest_snapshot_id.as_deref().unwrap_or(context),
                source_commit_id,
                dest_commit_id,
            )?;
            Ok((next, Value::Null))
        }

        Operation::CopyVersionItems {
            source_snapshot_id,
            dest_snapshot_id,
            source_commit_id,
            dest_commit_id,
            item_ids,
            replace,
        } => {
            let item_ids: Vec<&str> = item_ids.iter().map(String::as_str).collect();
            let next = state.copy_version_items(
                source_snapshot_id.as_deref().unwrap_or(context),
                dest_snapshot_id.as_deref().unwrap_or(context),
                source_commit_id,
                dest_commit_id,
                &item_ids,
                *replace,
            )?;
            Ok((next, Value::Null))
        }
    }
}

fn required_transaction(request: &Request) -> ServerResult<&str> {
    request.transaction_id.as_deref().ok_or_else(|| {
        ServerError::InvalidRequest(format!(
            "{} requires a transaction_id",
            request.operation.name()
        ))
    })
}
