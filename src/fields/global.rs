use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::{GridError, GridResult};
use crate::serialization::{deserialize, serialize, SerializationFormat};

///
/// A field gathered onto the root PE: every variable holds the whole grid
/// in global cell order. On the other PEs the same call yields a
/// placeholder whose variables are empty.
///
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalField
{
    nx: usize,
    ny: usize,
    variables: IndexMap<String, Vec<f64>>,
}

impl GlobalField
{
    pub fn new(nx: usize, ny: usize) -> Self
    {
        Self { nx, ny, variables: IndexMap::new() }
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

    /// Add a variable; its length must be the global cell count, or zero for a placeholder.
    pub fn insert(&mut self, name: &str, values: Vec<f64>) -> GridResult<()>
    {
        if !values.is_empty() && values.len() != self.nx * self.ny
        {
            return Err(GridError::DimensionMismatch
            {
                context: "GlobalField::insert",
                expected: vec![self.nx * self.ny],
                found: vec![values.len()],
            });
        }
        self.variables.insert(name.to_string(), values);
        Ok(())
    }

    pub fn values(&self, name: &str) -> GridResult<&[f64]>
    {
        self.variables.get(name).map(|v| v.as_slice()).ok_or_else(|| GridError::UnknownVariable(name.to_string()))
    }

    pub fn variables(&self) -> impl Iterator<Item = &str>
    {
        self.variables.keys().map(|k| k.as_str())
    }

    /// True on every PE but the root after a gather.
    pub fn is_placeholder(&self) -> bool
    {
        self.variables.values().all(|v| v.is_empty())
    }

    /// Write a restart snapshot. Call on the root only.
    pub fn save(&self, path: &Path, format: SerializationFormat) -> GridResult<()>
    {
        let bytes = serialize(self, format)?;
        std::fs::write(path, &bytes)?;
        info!("saved {} variables ({} bytes) to {}", self.variables.len(), bytes.len(), path.display());
        Ok(())
    }

    pub fn load(path: &Path, format: SerializationFormat) -> GridResult<Self>
    {
        let bytes = std::fs::read(path)?;
        deserialize(&bytes, format)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::missing::missing_value;

    #[test]
    fn placeholder_and_length_checks()
    {
        let mut g = GlobalField::new(2, 2);
        g.insert("sst", Vec::new()).unwrap();
        assert!(g.is_placeholder());
        assert!(g.insert("sss", vec![1.0; 3]).is_err());
        g.insert("sst", vec![1.0, 2.0, missing_value(), 4.0]).unwrap();
        assert!(!g.is_placeholder());
        assert!(matches!(g.values("sss"), Err(GridError::UnknownVariable(_))));
    }

    #[test]
    fn snapshot_round_trip()
    {
        let dir = std::env::temp_dir().join(format!("sstgrid-global-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("restart.bin");
        let mut g = GlobalField::new(3, 1);
        g.insert("sst", vec![10.5, missing_value(), -1.25]).unwrap();
        g.save(&path, SerializationFormat::BincodeLz4).unwrap();
        let back = GlobalField::load(&path, SerializationFormat::BincodeLz4).unwrap();
        assert_eq!(back, g);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
