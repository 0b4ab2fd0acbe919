pub mod scattered;
pub mod sphere;

pub use scattered::{IdwOptions, PointIndex, ScatteredDataInterpolator, ScatteredPoint};
pub use sphere::{chord_squared, lonlat_to_xyz};
