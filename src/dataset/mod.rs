//!
//! In-memory model of the gridded datasets exchanged with the outside world
//! (landmask, sea-surface temperature), and the stores that persist them.
//!
//! Only the root PE ever touches a store; everything else goes through the
//! gather/scatter collectives.
//!
pub mod store;
#[cfg(feature = "netcdf")]
pub mod netcdf_store;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::errors::{GridError, GridResult};

pub use store::{BinaryStore, DatasetStore, MemoryStore};
#[cfg(feature = "netcdf")]
pub use netcdf_store::NetcdfStore;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum VariableData
{
    Int(Vec<i32>),
    Float(Vec<f32>),
    Double(Vec<f64>),
}

impl VariableData
{
    pub fn len(&self) -> usize
    {
        match self
        {
            VariableData::Int(v) => v.len(),
            VariableData::Float(v) => v.len(),
            VariableData::Double(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool
    {
        self.len() == 0
    }

    /// Values widened to `f64`, whatever the stored type.
    pub fn to_f64(&self) -> Vec<f64>
    {
        match self
        {
            VariableData::Int(v) => v.iter().map(|&x| x as f64).collect(),
            VariableData::Float(v) => v.iter().map(|&x| x as f64).collect(),
            VariableData::Double(v) => v.clone(),
        }
    }

    /// Values as `f32`, the on-disk precision of gridded scalar datasets.
    pub fn to_f32(&self) -> Vec<f32>
    {
        match self
        {
            VariableData::Int(v) => v.iter().map(|&x| x as f32).collect(),
            VariableData::Float(v) => v.clone(),
            VariableData::Double(v) => v.iter().map(|&x| x as f32).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AttrValue
{
    Text(String),
    Int(i32),
    Float(f32),
    Double(f64),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Variable
{
    pub dims: Vec<String>,
    pub data: VariableData,
    pub attributes: IndexMap<String, AttrValue>,
}

impl Variable
{
    pub fn new(dims: &[&str], data: VariableData) -> Self
    {
        Self { dims: dims.iter().map(|d| d.to_string()).collect(), data, attributes: IndexMap::new() }
    }

    pub fn with_attribute(mut self, name: &str, value: AttrValue) -> Self
    {
        self.attributes.insert(name.to_string(), value);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&AttrValue>
    {
        self.attributes.get(name)
    }
}

///
/// Named dimensions and variables, with variables stored as flat row-major
/// arrays over their dimensions.
///
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset
{
    pub dims: IndexMap<String, usize>,
    pub variables: IndexMap<String, Variable>,
}

impl Dataset
{
    pub fn new() -> Self
    {
        Self::default()
    }

    pub fn add_dim(&mut self, name: &str, len: usize) -> &mut Self
    {
        self.dims.insert(name.to_string(), len);
        self
    }

    ///
    /// Add a variable after checking its dimensions exist and its length
    /// matches their product.
    ///
    pub fn add_variable(&mut self, name: &str, variable: Variable) -> GridResult<&mut Self>
    {
        let mut expected = 1;
        for d in &variable.dims
        {
            expected *= self.dim(d)?;
        }
        if expected != variable.data.len()
        {
            return Err(GridError::DimensionMismatch
            {
                context: "Dataset::add_variable",
                expected: vec![expected],
                found: vec![variable.data.len()],
            });
        }
        self.variables.insert(name.to_string(), variable);
        Ok(self)
    }

    pub fn dim(&self, name: &str) -> GridResult<usize>
    {
        self.dims.get(name).copied().ok_or_else(|| GridError::MissingDimension(name.to_string()))
    }

    pub fn variable(&self, name: &str) -> GridResult<&Variable>
    {
        self.variables.get(name).ok_or_else(|| GridError::MissingVariable(name.to_string()))
    }
}

#[test]
fn variables_must_match_their_dimensions()
{
    let mut ds = Dataset::new();
    ds.add_dim("lat", 2).add_dim("lon", 3);
    ds.add_variable("landmask", Variable::new(&["lat", "lon"], VariableData::Int(vec![0; 6]))).unwrap();
    assert!(ds.add_variable("bad", Variable::new(&["lat", "lon"], VariableData::Int(vec![0; 5]))).is_err());
    assert!(matches!(ds.add_variable("bad", Variable::new(&["time"], VariableData::Int(vec![0]))), Err(GridError::MissingDimension(_))));
    assert!(matches!(ds.variable("sst"), Err(GridError::MissingVariable(_))));
    assert_eq!(ds.variable("landmask").unwrap().data.to_f64(), vec![0.0; 6]);
}
