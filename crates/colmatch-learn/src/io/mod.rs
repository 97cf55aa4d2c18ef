//! Snapshot file I/O.

mod load;
mod save;

pub(crate) use load::load_snapshot;
pub use load::load_json;
pub use save::{encode_json, save_json, write_atomic};
