use std::sync::Arc;

use tracing::info;

use crate::config::StdDevConfig;
use crate::errors::{GridError, GridResult};
use crate::fields::DistributedField;
use crate::geometry::GridDomain;

///
/// Diagonal background error standard deviation with one fixed value on
/// every ocean cell. The operator is its own adjoint.
///
#[derive(Clone, Debug)]
pub struct StdDev
{
    sigma: DistributedField,
}

impl StdDev
{
    pub fn new(domain: &Arc<GridDomain>, variables: &[&str], config: &StdDevConfig) -> GridResult<Self>
    {
        let fixed = config.fixed.ok_or_else(|| GridError::InvalidInput("standard deviation needs a fixed value".to_string()))?;
        let mut sigma = DistributedField::new(domain.clone(), variables)?;
        sigma.ones();
        sigma.scale(fixed);
        sigma.apply_mask();
        info!("fixed standard deviation {fixed} for {:?}", variables);
        Ok(Self { sigma })
    }

    pub fn sigma(&self) -> &DistributedField
    {
        &self.sigma
    }

    /// `dx *= sigma`
    pub fn multiply(&self, dx: &mut DistributedField) -> GridResult<()>
    {
        dx.schur_product(&self.sigma)
    }

    pub fn multiply_ad(&self, dx: &mut DistributedField) -> GridResult<()>
    {
        self.multiply(dx)
    }

    /// `dx /= sigma`
    pub fn multiply_inverse(&self, dx: &mut DistributedField) -> GridResult<()>
    {
        dx.schur_product_inverse(&self.sigma)
    }

    pub fn multiply_inverse_ad(&self, dx: &mut DistributedField) -> GridResult<()>
    {
        self.multiply_inverse(dx)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::geometry::{AuxField, LAND_MASK};
    use crate::missing::MissingValue;
    use crate::parallel::SerialCommunicator;

    fn masked_domain() -> Arc<GridDomain>
    {
        let mut d = GridDomain::new(&"S2x1".into(), Arc::new(SerialCommunicator)).unwrap();
        d.insert_aux_field(AuxField::integer(LAND_MASK, vec![1, 0])).unwrap();
        Arc::new(d)
    }

    #[test]
    fn multiply_and_inverse()
    {
        let domain = masked_domain();
        let sd = StdDev::new(&domain, &["sst"], &StdDevConfig { fixed: Some(0.5) }).unwrap();
        let mut dx = DistributedField::new(domain.clone(), &["sst"]).unwrap();
        dx.set_values("sst", vec![4.0, 4.0]).unwrap();
        sd.multiply(&mut dx).unwrap();
        assert_eq!(dx.values("sst").unwrap()[0], 2.0);
        assert!(dx.values("sst").unwrap()[1].is_missing());
        sd.multiply_inverse_ad(&mut dx).unwrap();
        assert_eq!(dx.values("sst").unwrap()[0], 4.0);
    }

    #[test]
    fn needs_a_fixed_value()
    {
        assert!(StdDev::new(&masked_domain(), &["sst"], &StdDevConfig::default()).is_err());
    }
}
