use std::sync::Arc;

use tracing::info;

use crate::config::CorrelationLengthConfig;
use crate::errors::{GridError, GridResult};
use crate::fields::DistributedField;
use crate::geometry::GridDomain;

/// Name of the horizontal correlation length variable.
pub const COR_RH: &str = "cor_rh";

/// Auxiliary field the Rossby radius term reads.
pub const ROSSBY_RADIUS: &str = "rossby_radius";

///
/// Horizontal correlation lengths built from the Rossby radius and the
/// local cell size.
///
#[derive(Clone, Debug)]
pub struct CorrelationLengths
{
    config: CorrelationLengthConfig,
}

impl CorrelationLengths
{
    pub fn new(config: CorrelationLengthConfig) -> GridResult<Self>
    {
        if config.min_value > config.max_value
        {
            return Err(GridError::InvalidInput(format!(
                "correlation length min_value {} exceeds max_value {}", config.min_value, config.max_value)));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &CorrelationLengthConfig
    {
        &self.config
    }

    /// Length for one cell, before any masking.
    #[inline]
    pub fn length(&self, rossby_radius: f64, area: f64) -> f64
    {
        let c = &self.config;
        let mut rh = c.base_value + c.rossby_mult * rossby_radius;
        rh = rh.max(c.min_grid_mult * area.sqrt());
        rh = rh.max(c.min_value);
        rh = rh.min(c.max_value);
        rh * c.gaussian_to_cutoff
    }

    ///
    /// Field `cor_rh` over the local cells of `domain`. Needs the `area`
    /// auxiliary field, and `rossby_radius` unless its multiplier is 0.
    /// Land cells are missing when the domain carries a mask.
    ///
    pub fn compute(&self, domain: &Arc<GridDomain>) -> GridResult<DistributedField>
    {
        let area = domain.area()?;
        let rossby = if self.config.rossby_mult != 0.0
        {
            Some(domain.real_field(ROSSBY_RADIUS)?)
        }
        else
        {
            None
        };
        let values = area.iter().enumerate()
            .map(|(k, &a)| self.length(rossby.map_or(0.0, |r| r[k]), a))
            .collect();
        let mut field = DistributedField::new(domain.clone(), &[COR_RH])?;
        field.set_values(COR_RH, values)?;
        field.apply_mask();
        if let Some(stats) = field.diagnostics().first()
        {
            info!("horizontal correlation length: {stats}");
        }
        Ok(field)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::geometry::AuxField;
    use crate::parallel::SerialCommunicator;
    use approx::assert_relative_eq;

    #[test]
    fn clamps_then_converts_to_cutoff()
    {
        let config = CorrelationLengthConfig
        {
            base_value: 10.0,
            rossby_mult: 2.0,
            min_grid_mult: 1.0,
            min_value: 50.0,
            max_value: 100.0,
            gaussian_to_cutoff: 3.57,
        };
        let c = CorrelationLengths::new(config).unwrap();
        // min_value wins
        assert_relative_eq!(c.length(5.0, 100.0), 50.0 * 3.57);
        // rossby term
        assert_relative_eq!(c.length(30.0, 100.0), 70.0 * 3.57);
        // grid size term
        assert_relative_eq!(c.length(0.0, 80.0 * 80.0), 80.0 * 3.57);
        // max_value wins
        assert_relative_eq!(c.length(1000.0, 1.0), 100.0 * 3.57);
    }

    #[test]
    fn rossby_radius_required_only_when_used()
    {
        let comm = Arc::new(SerialCommunicator);
        let plain = Arc::new(GridDomain::new(&"S4x2".into(), comm.clone()).unwrap());
        let by_grid = CorrelationLengths::new(CorrelationLengthConfig { min_grid_mult: 1.0, ..Default::default() }).unwrap();
        let field = by_grid.compute(&plain).unwrap();
        let area = plain.area().unwrap();
        assert_relative_eq!(field.values(COR_RH).unwrap()[0], area[0].sqrt() * 3.57);

        let by_rossby = CorrelationLengths::new(CorrelationLengthConfig { rossby_mult: 1.0, ..Default::default() }).unwrap();
        assert!(matches!(by_rossby.compute(&plain), Err(GridError::MissingAuxField(_))));

        let mut domain = GridDomain::new(&"S4x2".into(), comm).unwrap();
        domain.insert_aux_field(AuxField::real(ROSSBY_RADIUS, vec![1000.0; 8])).unwrap();
        let field = by_rossby.compute(&Arc::new(domain)).unwrap();
        assert_relative_eq!(field.values(COR_RH).unwrap()[7], 3570.0);
    }

    #[test]
    fn inverted_bounds_are_rejected()
    {
        let config = CorrelationLengthConfig { min_value: 2.0, max_value: 1.0, ..Default::default() };
        assert!(CorrelationLengths::new(config).is_err());
    }
}
