use kdtree::KdTree;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::{GridError, GridResult};

use super::sphere::{chord_squared, lonlat_to_xyz};

/// One sample of an irregular point dataset, coordinates in degrees.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScatteredPoint
{
    pub lon: f64,
    pub lat: f64,
    pub value: f64,
}

impl ScatteredPoint
{
    pub fn new(lon: f64, lat: f64, value: f64) -> Self
    {
        Self { lon, lat, value }
    }
}

/// Inverse-distance weighting parameters.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdwOptions
{
    /// Number of nearest source points blended per destination.
    pub neighbors: usize,
    /// Chord distance on the unit sphere below which the nearest source
    /// value is copied instead of weighted.
    pub tolerance: f64,
}

impl Default for IdwOptions
{
    fn default() -> Self {
        Self { neighbors: 4, tolerance: 1e-6 }
    }
}

///
/// Static k-d tree over scattered points placed on the unit sphere, each
/// carrying its scalar value.
///
pub struct PointIndex
{
    tree: KdTree<f64, f64, [f64; 3]>,
    len: usize,
}

impl PointIndex
{
    pub fn build(points: &[ScatteredPoint]) -> GridResult<Self>
    {
        if points.is_empty()
        {
            return Err(GridError::InvalidInput("cannot index an empty point set".to_string()));
        }
        let mut tree = KdTree::with_capacity(3, points.len());
        for p in points
        {
            if !p.value.is_finite()
            {
                return Err(GridError::InvalidInput(format!("non-finite value at lon={}, lat={}", p.lon, p.lat)));
            }
            tree.add(lonlat_to_xyz(p.lon, p.lat), p.value)?;
        }
        Ok(Self { tree, len: points.len() })
    }

    pub fn len(&self) -> usize
    {
        self.len
    }

    pub fn is_empty(&self) -> bool
    {
        self.len == 0
    }

    /// Up to `k` nearest points as `(squared chord distance, value)`, closest first.
    pub fn nearest(&self, xyz: &[f64; 3], k: usize) -> GridResult<Vec<(f64, f64)>>
    {
        let found = self.tree.nearest(xyz, k, &chord_squared)?;
        Ok(found.into_iter().map(|(d2, &v)| (d2, v)).collect())
    }

    ///
    /// Value at `xyz`: the nearest source value when it lies within the
    /// tolerance (or coincides with `xyz`), otherwise the `1/d^2` weighted
    /// mean of the neighbours. The weights are normalised, so the result
    /// never leaves the range of the neighbour values.
    ///
    pub fn estimate(&self, xyz: &[f64; 3], options: &IdwOptions) -> GridResult<f64>
    {
        let neighbors = self.nearest(xyz, options.neighbors)?;
        let Some(&(d2_min, closest)) = neighbors.first() else
        {
            return Err(GridError::InvalidInput("no neighbours found".to_string()));
        };
        if d2_min == 0.0 || d2_min.sqrt() < options.tolerance
        {
            return Ok(closest);
        }
        let mut weighted = 0.0;
        let mut total = 0.0;
        for (d2, value) in neighbors
        {
            let w = 1.0 / d2;
            weighted += w * value;
            total += w;
        }
        Ok(weighted / total)
    }
}

///
/// Projects scattered point datasets onto a fixed set of destination
/// locations (normally the cells of one grid partition). Holds no mutable
/// state, so one instance serves any number of point datasets.
///
#[derive(Clone, Debug)]
pub struct ScatteredDataInterpolator
{
    targets: Vec<[f64; 3]>,
    options: IdwOptions,
}

impl ScatteredDataInterpolator
{
    /// Destinations as `[lon, lat]` pairs in degrees.
    pub fn new(lonlat: &[[f64; 2]], options: IdwOptions) -> Self
    {
        let targets = lonlat.iter().map(|&[lon, lat]| lonlat_to_xyz(lon, lat)).collect();
        Self { targets, options }
    }

    pub fn options(&self) -> &IdwOptions
    {
        &self.options
    }

    pub fn len(&self) -> usize
    {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.targets.is_empty()
    }

    /// One value per destination, in destination order.
    pub fn interpolate(&self, points: &[ScatteredPoint]) -> GridResult<Vec<f64>>
    {
        if self.options.neighbors == 0
        {
            return Err(GridError::InvalidInput("interpolation needs at least one neighbour".to_string()));
        }
        if !(self.options.tolerance >= 0.0)
        {
            return Err(GridError::InvalidInput(format!("invalid tolerance {}", self.options.tolerance)));
        }
        let index = PointIndex::build(points)?;
        if index.len() < self.options.neighbors
        {
            warn!("only {} source points for {} neighbours", index.len(), self.options.neighbors);
        }
        debug!("interpolating {} points onto {} destinations", index.len(), self.targets.len());
        self.targets.par_iter().map(|xyz| index.estimate(xyz, &self.options)).collect()
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use approx::assert_relative_eq;

    fn sample_points() -> Vec<ScatteredPoint>
    {
        vec![
            ScatteredPoint::new(0.0, 0.0, 10.0),
            ScatteredPoint::new(10.0, 0.0, 20.0),
            ScatteredPoint::new(0.0, 10.0, 30.0),
            ScatteredPoint::new(10.0, 10.0, 40.0),
            ScatteredPoint::new(180.0, -45.0, 1000.0),
            ScatteredPoint::new(359.0, 5.0, 50.0),
        ]
    }

    #[test]
    fn exact_locations_return_source_values()
    {
        let points = sample_points();
        let targets: Vec<[f64; 2]> = points.iter().map(|p| [p.lon, p.lat]).collect();
        let interp = ScatteredDataInterpolator::new(&targets, IdwOptions::default());
        let values = interp.interpolate(&points).unwrap();
        for (v, p) in values.iter().zip(&points)
        {
            assert_eq!(*v, p.value);
        }
    }

    #[test]
    fn zero_tolerance_still_copies_exact_hits()
    {
        let points = sample_points();
        let options = IdwOptions { neighbors: 4, tolerance: 0.0 };
        let interp = ScatteredDataInterpolator::new(&[[0.0, 0.0], [10.0, 10.0]], options);
        let values = interp.interpolate(&points).unwrap();
        assert_eq!(values, vec![10.0, 40.0]);
    }

    #[test]
    fn values_stay_within_nearest_neighbours()
    {
        let points = sample_points();
        let index = PointIndex::build(&points).unwrap();
        let options = IdwOptions::default();
        for &(lon, lat) in &[(5.0, 5.0), (2.0, 8.0), (100.0, -20.0), (355.0, 2.0), (0.5, -60.0)]
        {
            let xyz = lonlat_to_xyz(lon, lat);
            let v = index.estimate(&xyz, &options).unwrap();
            let near = index.nearest(&xyz, 4).unwrap();
            let lo = near.iter().map(|n| n.1).fold(f64::INFINITY, f64::min);
            let hi = near.iter().map(|n| n.1).fold(f64::NEG_INFINITY, f64::max);
            assert!(v >= lo - 1e-9 && v <= hi + 1e-9, "{v} outside [{lo}, {hi}]");
        }
    }

    #[test]
    fn centre_of_symmetric_square_is_the_mean()
    {
        let points = &sample_points()[..4];
        let index = PointIndex::build(points).unwrap();
        // (5, 5) is not exactly equidistant on the sphere, but close
        let v = index.estimate(&lonlat_to_xyz(5.0, 5.0), &IdwOptions::default()).unwrap();
        assert_relative_eq!(v, 25.0, max_relative = 1e-2);
    }

    #[test]
    fn wrap_around_uses_nearby_points()
    {
        let index = PointIndex::build(&sample_points()).unwrap();
        let near = index.nearest(&lonlat_to_xyz(359.5, 5.0), 1).unwrap();
        assert_eq!(near[0].1, 50.0);
    }

    #[test]
    fn fewer_points_than_neighbours()
    {
        let points = vec![ScatteredPoint::new(0.0, 0.0, 1.0), ScatteredPoint::new(90.0, 0.0, 3.0)];
        let interp = ScatteredDataInterpolator::new(&[[45.0, 0.0]], IdwOptions::default());
        let values = interp.interpolate(&points).unwrap();
        assert_relative_eq!(values[0], 2.0, max_relative = 1e-12);
    }

    #[test]
    fn invalid_inputs()
    {
        let interp = ScatteredDataInterpolator::new(&[[0.0, 0.0]], IdwOptions::default());
        assert!(interp.interpolate(&[]).is_err());
        let bad = ScatteredDataInterpolator::new(&[[0.0, 0.0]], IdwOptions { neighbors: 0, tolerance: 1e-6 });
        assert!(bad.interpolate(&sample_points()).is_err());
        assert!(PointIndex::build(&[ScatteredPoint::new(0.0, 0.0, f64::NAN)]).is_err());
    }
}
