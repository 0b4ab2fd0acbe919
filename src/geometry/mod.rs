pub mod aux_fields;
pub mod domain;
pub mod landmask;
pub mod length_scale;
pub mod lonlat_grid;
pub mod partition;

pub use aux_fields::{AuxField, AuxFieldSet, AuxValues};
pub use domain::{GridDomain, GridSummary, AREA, LAND_MASK};
pub use landmask::global_mask_from_dataset;
pub use length_scale::{parse_scattered_points, read_scattered_points};
pub use lonlat_grid::{GridSpec, RegularLonLatGrid, EARTH_RADIUS};
pub use partition::Partition;
