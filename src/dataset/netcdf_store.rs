use std::path::Path;

use tracing::info;

use crate::errors::GridResult;

use super::{AttrValue, Dataset, DatasetStore, Variable, VariableData};

///
/// NetCDF files through the `netcdf` crate. Variables are read back as
/// `f64` (the library converts the stored type); attributes are written but
/// not read, since no consumer relies on them.
///
#[derive(Clone, Copy, Debug, Default)]
pub struct NetcdfStore;

impl DatasetStore for NetcdfStore
{
    fn read(&self, path: &Path) -> GridResult<Dataset> {
        let file = netcdf::open(path)?;
        let mut dataset = Dataset::new();
        for dim in file.dimensions()
        {
            dataset.add_dim(&dim.name(), dim.len());
        }
        for var in file.variables()
        {
            let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
            let values: Vec<f64> = var.get_values(..)?;
            dataset.variables.insert(var.name(), Variable
            {
                dims,
                data: VariableData::Double(values),
                attributes: Default::default(),
            });
        }
        info!("read {} variables from {}", dataset.variables.len(), path.display());
        Ok(dataset)
    }

    fn write(&self, path: &Path, dataset: &Dataset) -> GridResult<()> {
        let mut file = netcdf::create(path)?;
        for (name, len) in &dataset.dims
        {
            file.add_dimension(name, *len)?;
        }
        for (name, variable) in &dataset.variables
        {
            let dims: Vec<&str> = variable.dims.iter().map(String::as_str).collect();
            match &variable.data
            {
                VariableData::Int(values) =>
                {
                    let mut var = file.add_variable::<i32>(name, &dims)?;
                    put_attributes(&mut var, variable)?;
                    var.put_values(values, ..)?;
                }
                VariableData::Float(values) =>
                {
                    let mut var = file.add_variable::<f32>(name, &dims)?;
                    put_attributes(&mut var, variable)?;
                    var.put_values(values, ..)?;
                }
                VariableData::Double(values) =>
                {
                    let mut var = file.add_variable::<f64>(name, &dims)?;
                    put_attributes(&mut var, variable)?;
                    var.put_values(values, ..)?;
                }
            }
        }
        info!("wrote {} variables to {}", dataset.variables.len(), path.display());
        Ok(())
    }
}

/// Attributes go in before the data so `_FillValue` is accepted.
fn put_attributes(var: &mut netcdf::VariableMut<'_>, variable: &Variable) -> GridResult<()>
{
    for (attr, value) in &variable.attributes
    {
        match value
        {
            AttrValue::Text(s) => var.put_attribute(attr, s.as_str())?,
            AttrValue::Int(v) => var.put_attribute(attr, *v)?,
            AttrValue::Float(v) => var.put_attribute(attr, *v)?,
            AttrValue::Double(v) => var.put_attribute(attr, *v)?,
        };
    }
    Ok(())
}
