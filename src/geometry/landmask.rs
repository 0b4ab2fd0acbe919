use tracing::{debug, info};

use crate::config::LandMaskConfig;
use crate::dataset::{Dataset, DatasetStore};
use crate::errors::{GridError, GridResult};
use crate::parallel::ParallelReduction;

use super::aux_fields::AuxField;
use super::domain::{GridDomain, LAND_MASK};
use super::lonlat_grid::RegularLonLatGrid;

///
/// Global land mask in internal row order (north first), checked to hold
/// only 0 (land) and 1 (ocean).
///
pub fn global_mask_from_dataset(dataset: &Dataset, variable: &str, grid: &RegularLonLatGrid) -> GridResult<Vec<f64>>
{
    grid.check_dataset_dims(dataset, "land mask")?;
    let values = dataset.variable(variable)?.data.to_f64();
    if values.len() != grid.len()
    {
        return Err(GridError::DimensionMismatch
        {
            context: "land mask",
            expected: vec![grid.len()],
            found: vec![values.len()],
        });
    }
    let mask = grid.flip_latitude(&values);
    if let Some((cell, &value)) = mask.iter().enumerate().find(|&(_, &v)| v != 0.0 && v != 1.0)
    {
        return Err(GridError::InvalidMaskValue { cell, value });
    }
    Ok(mask)
}

impl GridDomain
{
    ///
    /// Read the land mask on the root PE, then hand every PE its band as
    /// the integer field `gmask`. Collective. A bad file fails on every PE
    /// and leaves the domain untouched.
    ///
    pub fn load_land_mask(&mut self, config: &LandMaskConfig, store: &dyn DatasetStore) -> GridResult<()>
    {
        if self.has_aux_field(LAND_MASK)
        {
            return Err(GridError::DuplicateField(LAND_MASK.to_string()));
        }
        let mut pieces = Vec::new();
        let mut failure = None;
        if self.comm().is_root()
        {
            let global = store.read(&config.filename)
                .and_then(|ds| global_mask_from_dataset(&ds, &config.variable, self.grid()))
                .and_then(|mask| self.partition().split(&mask));
            match global
            {
                Ok(p) => pieces = p,
                Err(e) => failure = Some(e),
            }
        }
        if !ParallelReduction::new(self.comm()).root_status(failure.is_none())
        {
            return Err(failure.unwrap_or(GridError::RootFailure("land mask read")));
        }
        let local = self.comm().scatter_f64(pieces);
        debug!("PE {} received {} mask cells", self.comm().rank(), local.len());
        let mask: Vec<i32> = local.into_iter().map(|v| v as i32).collect();
        info!("land mask '{}' loaded from {}", config.variable, config.filename.display());
        self.insert_aux_field(AuxField::integer(LAND_MASK, mask))
    }
}
