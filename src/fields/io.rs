use tracing::info;

use crate::config::FieldIoConfig;
use crate::dataset::{AttrValue, Dataset, DatasetStore, Variable, VariableData};
use crate::errors::{GridError, GridResult};
use crate::geometry::RegularLonLatGrid;
use crate::missing::{missing_value, MissingValue, DATASET_FILL_VALUE};
use crate::parallel::ParallelReduction;

use super::field_set::DistributedField;

/// Celsius to Kelvin.
pub const KELVIN_OFFSET: f64 = 273.15;

/// Distance from the fill value below which a dataset value counts as missing.
pub const FILL_TOLERANCE: f64 = 1e-6;

///
/// Turn a `time, lat, lon` dataset variable into globally ordered field
/// values: fill values become missing, Kelvin optionally becomes Celsius,
/// and rows are flipped to run north to south.
///
pub fn decode_gridded(dataset: &Dataset, config: &FieldIoConfig, grid: &RegularLonLatGrid) -> GridResult<Vec<f64>>
{
    let time = dataset.dim("time")?;
    if time != 1
    {
        return Err(GridError::DimensionMismatch { context: "gridded dataset time", expected: vec![1], found: vec![time] });
    }
    grid.check_dataset_dims(dataset, "gridded dataset")?;
    let raw = dataset.variable(&config.variable)?.data.to_f64();
    if raw.len() != grid.len()
    {
        return Err(GridError::DimensionMismatch { context: "gridded dataset", expected: vec![grid.len()], found: vec![raw.len()] });
    }
    let fill = DATASET_FILL_VALUE as f64;
    let values: Vec<f64> = raw.into_iter().map(|v|
    {
        if (v - fill).abs() < FILL_TOLERANCE
        {
            missing_value()
        }
        else if config.kelvin
        {
            v - KELVIN_OFFSET
        }
        else
        {
            v
        }
    }).collect();
    Ok(grid.flip_latitude(&values))
}

///
/// Inverse of [`decode_gridded`]: a single-record `f32` dataset with the
/// fill value written in place of missing cells.
///
pub fn encode_gridded(values: &[f64], config: &FieldIoConfig, grid: &RegularLonLatGrid) -> GridResult<Dataset>
{
    let data: Vec<f32> = grid.flip_latitude(values).into_iter().map(|v|
    {
        if v.is_missing()
        {
            DATASET_FILL_VALUE
        }
        else if config.kelvin
        {
            (v + KELVIN_OFFSET) as f32
        }
        else
        {
            v as f32
        }
    }).collect();
    let variable = Variable::new(&["time", "lat", "lon"], VariableData::Float(data))
        .with_attribute("units", AttrValue::Text(config.units.clone()))
        .with_attribute("_FillValue", AttrValue::Float(DATASET_FILL_VALUE))
        .with_attribute("missing_value", AttrValue::Float(DATASET_FILL_VALUE));
    let mut dataset = Dataset::new();
    dataset.add_dim("time", 1).add_dim("lat", grid.ny()).add_dim("lon", grid.nx());
    dataset.add_variable(&config.variable, variable)?;
    Ok(dataset)
}

impl DistributedField
{
    ///
    /// Read `config.variable` from a gridded dataset into the variable of
    /// the same name, then mask land cells. Only the root PE opens the
    /// dataset. Collective.
    ///
    pub fn read(&mut self, store: &dyn DatasetStore, config: &FieldIoConfig) -> GridResult<()>
    {
        let grid = *self.domain().grid();
        let root_data = if self.domain().comm().is_root()
        {
            info!("reading '{}' from {}", config.variable, config.filename.display());
            store.read(&config.filename).and_then(|ds| decode_gridded(&ds, config, &grid))
        }
        else
        {
            Ok(Vec::new())
        };
        self.scatter_variable(&config.variable, root_data)?;
        self.apply_mask();
        Ok(())
    }

    ///
    /// Gather `config.variable` and write it as a gridded dataset from the
    /// root PE. Collective; a failed write is reported on every PE.
    ///
    pub fn write(&self, store: &dyn DatasetStore, config: &FieldIoConfig) -> GridResult<()>
    {
        let values = self.values(&config.variable)?;
        let comm = self.domain().comm();
        let global = comm.gather_f64(values).concat();
        let mut failure = None;
        if comm.is_root()
        {
            let grid = self.domain().grid();
            if let Err(e) = encode_gridded(&global, config, grid).and_then(|ds| store.write(&config.filename, &ds))
            {
                failure = Some(e);
            }
            else
            {
                info!("wrote '{}' to {}", config.variable, config.filename.display());
            }
        }
        if !ParallelReduction::new(comm).root_status(failure.is_none())
        {
            return Err(failure.unwrap_or(GridError::RootFailure("field write")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::dataset::MemoryStore;
    use crate::geometry::GridDomain;
    use crate::parallel::SerialCommunicator;
    use approx::assert_relative_eq;
    use std::sync::Arc;

    fn sst_dataset(values: Vec<f32>, nx: usize, ny: usize) -> Dataset
    {
        let mut ds = Dataset::new();
        ds.add_dim("time", 1).add_dim("lat", ny).add_dim("lon", nx);
        ds.add_variable("sst", Variable::new(&["time", "lat", "lon"], VariableData::Float(values))).unwrap();
        ds
    }

    #[test]
    fn decode_flips_and_converts()
    {
        let grid = RegularLonLatGrid::new(2, 2, true).unwrap();
        let mut config = FieldIoConfig::new("sst.nc");
        config.kelvin = true;
        let ds = sst_dataset(vec![273.15, -32768.0, 283.15, 300.0], 2, 2);
        let v = decode_gridded(&ds, &config, &grid).unwrap();
        assert_relative_eq!(v[0], 10.0, epsilon = 1e-4);
        assert_relative_eq!(v[1], 26.85, epsilon = 1e-4);
        assert_relative_eq!(v[2], 0.0, epsilon = 1e-4);
        assert!(v[3].is_missing());
    }

    #[test]
    fn decode_checks_dimensions()
    {
        let grid = RegularLonLatGrid::new(2, 2, true).unwrap();
        let config = FieldIoConfig::new("sst.nc");
        let mut ds = Dataset::new();
        ds.add_dim("time", 2).add_dim("lat", 2).add_dim("lon", 2);
        assert!(matches!(decode_gridded(&ds, &config, &grid), Err(GridError::DimensionMismatch { .. })));
        let ds = sst_dataset(vec![0.0; 6], 3, 2);
        assert!(matches!(decode_gridded(&ds, &config, &grid), Err(GridError::DimensionMismatch { .. })));
    }

    #[test]
    fn encode_writes_fill_values_and_attributes()
    {
        let grid = RegularLonLatGrid::new(1, 2, true).unwrap();
        let config = FieldIoConfig::new("out.nc");
        let ds = encode_gridded(&[1.5, missing_value()], &config, &grid).unwrap();
        let var = ds.variable("sst").unwrap();
        assert_eq!(var.data, VariableData::Float(vec![DATASET_FILL_VALUE, 1.5]));
        assert_eq!(var.attribute("units"), Some(&AttrValue::Text("K".to_string())));
        assert_eq!(var.attribute("_FillValue"), Some(&AttrValue::Float(-32768.0)));
        assert_eq!(ds.dim("time").unwrap(), 1);
    }

    #[test]
    fn write_then_read_through_a_store()
    {
        let store = MemoryStore::new();
        let domain = Arc::new(GridDomain::new(&"S2x2".into(), Arc::new(SerialCommunicator)).unwrap());
        let mut config = FieldIoConfig::new("sst.out");
        config.kelvin = true;
        let mut f = DistributedField::new(domain.clone(), &["sst"]).unwrap();
        f.set_values("sst", vec![1.0, missing_value(), 20.5, -1.75]).unwrap();
        f.write(&store, &config).unwrap();
        assert!(store.contains("sst.out"));

        let mut g = DistributedField::new(domain, &["sst"]).unwrap();
        g.read(&store, &config).unwrap();
        let back = g.values("sst").unwrap();
        assert!(back[1].is_missing());
        for k in [0, 2, 3]
        {
            assert_relative_eq!(back[k], f.values("sst").unwrap()[k], epsilon = 1e-4);
        }
        assert!(g.read(&store, &FieldIoConfig::new("absent")).is_err());
    }
}
