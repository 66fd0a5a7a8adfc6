//! Benchmark utilities.

use rand::Rng;
use serde_json::{Map, Value};
use versionbase_core::{GraphState, ItemId};

/// Generate a random payload with `fields` integer fields.
pub fn random_payload(fields: usize) -> Map<String, Value> {
    let mut rng = rand::thread_rng();
    (0..fields)
        .map(|i| (format!("field_{i}"), Value::from(rng.gen::<i64>())))
        .collect()
}

/// Build a graph with versions `A <- B` and `count` items in `B`.
pub fn populated_graph(count: usize) -> (GraphState, Vec<ItemId>) {
    let mut state = GraphState::new()
        .create_version("A", None, &[])
        .and_then(|state| state.create_version("B", None, &["A"]))
        .expect("Failed to create versions");

    let mut ids = Vec::with_capacity(count);
    for _ in 0..count {
        let (next, id) = state
            .create_item("B", "current", random_payload(4))
            .expect("Failed to create item");
        state = next;
        ids.push(id);
    }
    (state, ids)
}
