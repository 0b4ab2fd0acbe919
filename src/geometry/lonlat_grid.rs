use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::errors::{GridError, GridResult};

/// Earth radius (m) used for the cell area approximation.
pub const EARTH_RADIUS: f64 = 6371229.0;

///
/// Grid description as it appears in configuration: either a grid name
/// (`L<nx>x<ny>` includes the poles, `S<nx>x<ny>` is shifted by half a cell
/// in both directions) or the explicit point counts.
///
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GridSpec
{
    Name(String),
    Structured
    {
        nx: usize,
        ny: usize,
        #[serde(default)]
        shifted: bool,
    },
}

impl GridSpec
{
    pub fn to_grid(&self) -> GridResult<RegularLonLatGrid>
    {
        match self
        {
            GridSpec::Name(name) => RegularLonLatGrid::from_name(name),
            GridSpec::Structured { nx, ny, shifted } => RegularLonLatGrid::new(*nx, *ny, *shifted),
        }
    }
}

impl From<&str> for GridSpec
{
    fn from(value: &str) -> Self {
        GridSpec::Name(value.to_string())
    }
}

///
/// Global regular lon-lat grid. Row `j = 0` is the northern edge and
/// longitudes start at 0 degrees, so the global index of cell `(i, j)` is
/// `j * nx + i`.
///
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegularLonLatGrid
{
    nx: usize,
    ny: usize,
    shifted: bool,
}

impl RegularLonLatGrid
{
    pub fn new(nx: usize, ny: usize, shifted: bool) -> GridResult<Self>
    {
        if nx == 0 || ny == 0
        {
            return Err(GridError::InvalidGridSpec(format!("grid needs at least one point in each direction, got {nx}x{ny}")));
        }
        if !shifted && ny < 2
        {
            return Err(GridError::InvalidGridSpec(format!("pole-inclusive grid needs ny >= 2, got {ny}")));
        }
        Ok(Self { nx, ny, shifted })
    }

    /// Parse `L<nx>x<ny>` or `S<nx>x<ny>`.
    pub fn from_name(name: &str) -> GridResult<Self>
    {
        let invalid = || GridError::InvalidGridSpec(format!("unrecognised grid name '{name}'"));
        let mut chars = name.trim().chars();
        let shifted = match chars.next()
        {
            Some('L') | Some('l') => false,
            Some('S') | Some('s') => true,
            _ => return Err(invalid()),
        };
        let rest = chars.as_str();
        let (nx, ny) = rest.split_once(['x', 'X']).ok_or_else(invalid)?;
        let nx = nx.parse::<usize>().map_err(|_| invalid())?;
        let ny = ny.parse::<usize>().map_err(|_| invalid())?;
        Self::new(nx, ny, shifted)
    }

    #[inline]
    pub fn nx(&self) -> usize
    {
        self.nx
    }

    #[inline]
    pub fn ny(&self) -> usize
    {
        self.ny
    }

    #[inline]
    pub fn is_shifted(&self) -> bool
    {
        self.shifted
    }

    /// Number of cells in the global grid.
    #[inline]
    pub fn len(&self) -> usize
    {
        self.nx * self.ny
    }

    #[inline]
    pub fn is_empty(&self) -> bool
    {
        self.len() == 0
    }

    pub fn name(&self) -> String
    {
        format!("{}{}x{}", if self.shifted { 'S' } else { 'L' }, self.nx, self.ny)
    }

    #[inline]
    pub fn dlon(&self) -> f64
    {
        360.0 / self.nx as f64
    }

    #[inline]
    pub fn dlat(&self) -> f64
    {
        if self.shifted { 180.0 / self.ny as f64 } else { 180.0 / (self.ny - 1) as f64 }
    }

    #[inline]
    pub fn lon(&self, i: usize) -> f64
    {
        if self.shifted { (i as f64 + 0.5) * self.dlon() } else { i as f64 * self.dlon() }
    }

    #[inline]
    pub fn lat(&self, j: usize) -> f64
    {
        if self.shifted { 90.0 - (j as f64 + 0.5) * self.dlat() } else { 90.0 - j as f64 * self.dlat() }
    }

    #[inline]
    pub fn lonlat(&self, i: usize, j: usize) -> [f64; 2]
    {
        [self.lon(i), self.lat(j)]
    }

    #[inline]
    pub fn global_index(&self, i: usize, j: usize) -> usize
    {
        j * self.nx + i
    }

    /// `(i, j)` of a global index.
    #[inline]
    pub fn ij(&self, global: usize) -> (usize, usize)
    {
        (global % self.nx, global / self.nx)
    }

    ///
    /// Zonal cell width at the equator. Cell areas use `dx^2 cos(lat)`, a
    /// flat approximation rather than the exact spherical area.
    ///
    #[inline]
    pub fn dx(&self) -> f64
    {
        2.0 * std::f64::consts::PI * EARTH_RADIUS / self.nx as f64
    }

    #[inline]
    pub fn cell_area(&self, j: usize) -> f64
    {
        let dx = self.dx();
        dx * dx * self.lat(j).to_radians().cos()
    }

    ///
    /// Reverse the row order of a global array. Datasets on disk run from
    /// south to north while rows here run from north to south; the mapping
    /// is its own inverse.
    ///
    pub fn flip_latitude<T: Copy>(&self, global: &[T]) -> Vec<T>
    {
        global.chunks(self.nx).rev().flatten().copied().collect()
    }

    /// Check that a dataset's `lat`/`lon` dimensions match this grid.
    pub fn check_dataset_dims(&self, dataset: &Dataset, context: &'static str) -> GridResult<()>
    {
        let lat = dataset.dim("lat")?;
        let lon = dataset.dim("lon")?;
        if lat != self.ny || lon != self.nx
        {
            return Err(GridError::DimensionMismatch { context, expected: vec![self.ny, self.nx], found: vec![lat, lon] });
        }
        Ok(())
    }
}

impl Display for RegularLonLatGrid
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn parse_grid_names()
    {
        let g = RegularLonLatGrid::from_name("L360x181").unwrap();
        assert_eq!((g.nx(), g.ny(), g.is_shifted()), (360, 181, false));
        assert_eq!(g.lat(0), 90.0);
        assert_eq!(g.lat(180), -90.0);
        assert_eq!(g.name(), "L360x181");

        let s = RegularLonLatGrid::from_name("S1440x720").unwrap();
        assert!(s.is_shifted());
        assert_relative_eq!(s.lon(0), 0.125);
        assert_relative_eq!(s.lat(719), -89.875);

        assert!(RegularLonLatGrid::from_name("O32").is_err());
        assert!(RegularLonLatGrid::from_name("L10").is_err());
        assert!(RegularLonLatGrid::from_name("L0x4").is_err());
        assert!(RegularLonLatGrid::from_name("L4x1").is_err());
    }

    #[test]
    fn indices_round_trip()
    {
        let g = RegularLonLatGrid::new(4, 3, true).unwrap();
        for j in 0..3
        {
            for i in 0..4
            {
                assert_eq!(g.ij(g.global_index(i, j)), (i, j));
            }
        }
        assert_eq!(g.len(), 12);
        let rows: Vec<usize> = (0..12).collect();
        let flipped = g.flip_latitude(&rows);
        assert_eq!(&flipped[..4], &[8, 9, 10, 11]);
        assert_eq!(g.flip_latitude(&flipped), rows);
    }

    #[test]
    fn area_follows_cosine_of_latitude()
    {
        let g = RegularLonLatGrid::new(360, 181, false).unwrap();
        let dx = 2.0 * std::f64::consts::PI * EARTH_RADIUS / 360.0;
        assert_relative_eq!(g.cell_area(90), dx * dx, max_relative = 1e-12);
        assert_relative_eq!(g.cell_area(30), dx * dx * 60f64.to_radians().cos(), max_relative = 1e-12);
        assert!(g.cell_area(0).abs() < 1e-3 * dx * dx);
    }
}
