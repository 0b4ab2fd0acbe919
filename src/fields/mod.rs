pub mod field_set;
pub mod global;
pub mod io;
pub mod stats;

pub use field_set::{DistributedField, FieldState};
pub use global::GlobalField;
pub use io::{decode_gridded, encode_gridded, KELVIN_OFFSET};
pub use stats::FieldStats;
