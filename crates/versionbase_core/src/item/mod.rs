//! Items and the per-version item store.

mod map;
mod record;
mod store;

pub use map::ItemMap;
pub use record::Item;
