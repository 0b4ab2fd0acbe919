use std::fmt::Display;
use std::sync::Arc;

use tracing::{info, trace};

use crate::config::GeometryConfig;
use crate::dataset::DatasetStore;
use crate::errors::{GridError, GridResult};
use crate::interpolation::{IdwOptions, ScatteredDataInterpolator, ScatteredPoint};
use crate::parallel::{Communicator, ParallelReduction};

use super::aux_fields::{AuxField, AuxFieldSet};
use super::lonlat_grid::{GridSpec, RegularLonLatGrid};
use super::partition::Partition;

/// Cell area auxiliary field.
pub const AREA: &str = "area";
/// Ocean (1) / land (0) auxiliary field.
pub const LAND_MASK: &str = "gmask";

///
/// The grid as seen from one PE: the global lon-lat grid, this PE's band of
/// cells, the communicator linking the PEs, and the auxiliary per-cell
/// fields of the local band.
///
/// Auxiliary fields are added while the domain is being assembled (which
/// needs `&mut self`); once the domain is shared behind an `Arc` by the
/// fields built on it, they can no longer change. Cloning shares the
/// auxiliary fields and never repeats any I/O or interpolation.
///
#[derive(Clone, Debug)]
pub struct GridDomain
{
    grid: RegularLonLatGrid,
    partition: Partition,
    comm: Arc<dyn Communicator>,
    lonlat: Vec<[f64; 2]>,
    aux: AuxFieldSet,
}

impl GridDomain
{
    pub fn new(spec: &GridSpec, comm: Arc<dyn Communicator>) -> GridResult<Self>
    {
        Self::from_grid(spec.to_grid()?, comm)
    }

    /// Partition `grid` over `comm` and compute the cell areas.
    pub fn from_grid(grid: RegularLonLatGrid, comm: Arc<dyn Communicator>) -> GridResult<Self>
    {
        let partition = Partition::new(&grid, comm.rank(), comm.size())?;
        let rows = partition.row_range();
        let mut lonlat = Vec::with_capacity(partition.local_size());
        let mut area = Vec::with_capacity(partition.local_size());
        for j in rows
        {
            let cell_area = grid.cell_area(j);
            for i in 0..grid.nx()
            {
                lonlat.push(grid.lonlat(i, j));
                area.push(cell_area);
            }
        }
        let mut aux = AuxFieldSet::new();
        aux.insert(AuxField::real(AREA, area))?;
        trace!("GridDomain {} on PE {}/{}: {} local cells", grid, comm.rank(), comm.size(), lonlat.len());
        Ok(Self { grid, partition, comm, lonlat, aux })
    }

    ///
    /// Build the domain and every auxiliary field the configuration asks
    /// for. Collective: all PEs must call it with the same configuration.
    ///
    pub fn from_config(config: &GeometryConfig, comm: Arc<dyn Communicator>, store: &dyn DatasetStore) -> GridResult<Self>
    {
        let mut domain = Self::new(&config.grid, comm)?;
        if let Some(mask) = &config.landmask
        {
            info!("loading landmask from {}", mask.filename.display());
            domain.load_land_mask(mask, store)?;
        }
        if let Some(length_scale) = &config.length_scale
        {
            domain.load_length_scale(length_scale)?;
        }
        Ok(domain)
    }

    #[inline]
    pub fn grid(&self) -> &RegularLonLatGrid
    {
        &self.grid
    }

    #[inline]
    pub fn partition(&self) -> &Partition
    {
        &self.partition
    }

    #[inline]
    pub fn comm(&self) -> &dyn Communicator
    {
        self.comm.as_ref()
    }

    pub fn comm_handle(&self) -> Arc<dyn Communicator>
    {
        self.comm.clone()
    }

    /// `[lon, lat]` of every local cell, in local order.
    #[inline]
    pub fn lonlat(&self) -> &[[f64; 2]]
    {
        &self.lonlat
    }

    #[inline]
    pub fn local_size(&self) -> usize
    {
        self.partition.local_size()
    }

    #[inline]
    pub fn global_size(&self) -> usize
    {
        self.grid.len()
    }

    pub fn aux_fields(&self) -> &AuxFieldSet
    {
        &self.aux
    }

    pub fn aux_field(&self, name: &str) -> Option<&Arc<AuxField>>
    {
        self.aux.get(name)
    }

    pub fn has_aux_field(&self, name: &str) -> bool
    {
        self.aux.contains(name)
    }

    /// A real-valued auxiliary field, or an error if absent.
    pub fn real_field(&self, name: &str) -> GridResult<&[f64]>
    {
        self.aux.get(name).and_then(|f| f.as_real()).ok_or_else(|| GridError::MissingAuxField(name.to_string()))
    }

    pub fn area(&self) -> GridResult<&[f64]>
    {
        self.real_field(AREA)
    }

    /// The land mask, when one has been loaded.
    pub fn mask(&self) -> Option<&[i32]>
    {
        self.aux.get(LAND_MASK).and_then(|f| f.as_integer())
    }

    /// Attach a field computed for the local cells.
    pub fn insert_aux_field(&mut self, field: AuxField) -> GridResult<()>
    {
        if field.len() != self.local_size()
        {
            return Err(GridError::DimensionMismatch
            {
                context: "GridDomain::insert_aux_field",
                expected: vec![self.local_size()],
                found: vec![field.len()],
            });
        }
        info!("adding auxiliary field '{}'", field.name());
        self.aux.insert(field)
    }

    ///
    /// Interpolate a scattered point dataset onto the local cells and keep
    /// the result as auxiliary field `name`. Purely local; every PE must
    /// hold the full point set.
    ///
    pub fn interpolate_scattered(&mut self, name: &str, points: &[ScatteredPoint], options: IdwOptions) -> GridResult<()>
    {
        if self.has_aux_field(name)
        {
            return Err(GridError::DuplicateField(name.to_string()));
        }
        let interpolator = ScatteredDataInterpolator::new(&self.lonlat, options);
        let values = interpolator.interpolate(points)?;
        self.insert_aux_field(AuxField::real(name, values))
    }

    ///
    /// True when both domains describe the same grid, decomposed the same
    /// way, from the same PE's point of view.
    ///
    pub fn is_compatible(&self, other: &GridDomain) -> bool
    {
        self.grid == other.grid && self.partition.rank() == other.partition.rank() && self.partition.same_layout(&other.partition)
    }

    ///
    /// Global ocean/land cell counts. Collective. Fails on every PE if any
    /// PE holds a mask value other than 0 or 1.
    ///
    pub fn summary(&self) -> GridResult<GridSummary>
    {
        let mut counts = [0.0; 3];
        if let Some(mask) = self.mask()
        {
            for &m in mask
            {
                match m
                {
                    1 => counts[0] += 1.0,
                    0 => counts[1] += 1.0,
                    _ => counts[2] += 1.0,
                }
            }
        }
        ParallelReduction::new(self.comm()).sum_many(&mut counts);
        if counts[2] > 0.0
        {
            let (cell, value) = self.mask().and_then(|m| m.iter().enumerate().find(|&(_, &v)| v != 0 && v != 1))
                .map(|(i, &v)| (self.partition.global_index(i), v as f64))
                .unwrap_or((usize::MAX, f64::NAN));
            return Err(GridError::InvalidMaskValue { cell, value });
        }
        Ok(GridSummary
        {
            nx: self.grid.nx(),
            ny: self.grid.ny(),
            masked: self.mask().is_some(),
            ocean: counts[0] as usize,
            land: counts[1] as usize,
        })
    }
}

impl Display for GridDomain
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Geometry: nx = {}, ny = {}", self.grid.nx(), self.grid.ny())
    }
}

/// Grid extent and global land/ocean counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridSummary
{
    pub nx: usize,
    pub ny: usize,
    pub masked: bool,
    pub ocean: usize,
    pub land: usize,
}

impl Display for GridSummary
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Geometry: nx = {}, ny = {}", self.nx, self.ny)?;
        if self.masked
        {
            write!(f, "Geometry: # of unmasked ocean grid = {}, # of masked land grid = {}", self.ocean, self.land)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::parallel::{LocalGroup, SerialCommunicator};

    fn serial() -> Arc<dyn Communicator>
    {
        Arc::new(SerialCommunicator)
    }

    #[test]
    fn single_pe_owns_everything()
    {
        let domain = GridDomain::new(&"S8x4".into(), serial()).unwrap();
        assert_eq!(domain.local_size(), 32);
        assert_eq!(domain.lonlat()[0], [22.5, 67.5]);
        assert_eq!(domain.area().unwrap().len(), 32);
        assert!(domain.mask().is_none());
        assert_eq!(domain.to_string(), "Geometry: nx = 8, ny = 4");
    }

    #[test]
    fn bands_cover_the_grid_once()
    {
        let sizes = LocalGroup::run(3, |comm|
        {
            let domain = GridDomain::new(&GridSpec::Structured { nx: 5, ny: 7, shifted: true }, comm).unwrap();
            let first = domain.partition().global_index(0);
            (domain.local_size(), first, domain.lonlat().first().copied())
        });
        assert_eq!(sizes.iter().map(|s| s.0).sum::<usize>(), 35);
        assert_eq!(sizes[0].0, 15);
        assert_eq!(sizes[1].1, 15);
        assert_eq!(sizes[2].2.unwrap()[1], 90.0 - 5.5 * (180.0 / 7.0));
    }

    #[test]
    fn clones_share_auxiliary_fields()
    {
        let mut domain = GridDomain::new(&"L4x3".into(), serial()).unwrap();
        domain.insert_aux_field(AuxField::real("depth", vec![1.0; 12])).unwrap();
        let copy = domain.clone();
        assert!(Arc::ptr_eq(domain.aux_field("depth").unwrap(), copy.aux_field("depth").unwrap()));
        assert!(copy.is_compatible(&domain));
        assert!(domain.insert_aux_field(AuxField::real("short", vec![1.0; 3])).is_err());
    }

    #[test]
    fn scattered_field_is_attached()
    {
        let mut domain = GridDomain::new(&"S4x2".into(), serial()).unwrap();
        let points: Vec<ScatteredPoint> = domain.lonlat().iter().enumerate()
            .map(|(k, ll)| ScatteredPoint::new(ll[0], ll[1], k as f64)).collect();
        domain.interpolate_scattered("rossby_radius", &points, IdwOptions::default()).unwrap();
        let values = domain.real_field("rossby_radius").unwrap();
        assert_eq!(values, (0..8).map(|k| k as f64).collect::<Vec<_>>().as_slice());
        assert!(matches!(domain.interpolate_scattered("rossby_radius", &points, IdwOptions::default()), Err(GridError::DuplicateField(_))));
    }

    #[test]
    fn summary_without_mask()
    {
        let domain = GridDomain::new(&"S4x2".into(), serial()).unwrap();
        let summary = domain.summary().unwrap();
        assert!(!summary.masked);
        assert_eq!(summary.to_string(), "Geometry: nx = 4, ny = 2\n");
    }
}
