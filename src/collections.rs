//! Storage used by multicast sources.

mod free_list;

pub use free_list::{FreeList, Snapshot};
