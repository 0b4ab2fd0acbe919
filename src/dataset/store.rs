use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::info;

use crate::errors::{GridError, GridResult};
use crate::serialization::{self, SerializationFormat};

use super::Dataset;

/// Somewhere datasets can be read from and written to by path.
pub trait DatasetStore: Send + Sync
{
    fn read(&self, path: &Path) -> GridResult<Dataset>;

    /// Create or replace the dataset at `path`.
    fn write(&self, path: &Path, dataset: &Dataset) -> GridResult<()>;
}

/// Datasets kept in a map inside the process.
#[derive(Default)]
pub struct MemoryStore
{
    datasets: Mutex<FxHashMap<PathBuf, Dataset>>,
}

impl MemoryStore
{
    pub fn new() -> Self
    {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<PathBuf>, dataset: Dataset)
    {
        self.datasets.lock().insert(path.into(), dataset);
    }

    pub fn contains(&self, path: impl AsRef<Path>) -> bool
    {
        self.datasets.lock().contains_key(path.as_ref())
    }
}

impl DatasetStore for MemoryStore
{
    fn read(&self, path: &Path) -> GridResult<Dataset> {
        self.datasets.lock().get(path).cloned().ok_or_else(||
            GridError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, format!("no dataset at {}", path.display()))))
    }

    fn write(&self, path: &Path, dataset: &Dataset) -> GridResult<()> {
        self.datasets.lock().insert(path.to_path_buf(), dataset.clone());
        Ok(())
    }
}

/// Datasets encoded to files through the crate's serialization formats.
#[derive(Clone, Copy, Debug, Default)]
pub struct BinaryStore
{
    format: SerializationFormat,
}

impl BinaryStore
{
    pub fn new(format: SerializationFormat) -> Self
    {
        Self { format }
    }
}

impl DatasetStore for BinaryStore
{
    fn read(&self, path: &Path) -> GridResult<Dataset> {
        let bytes = std::fs::read(path)?;
        serialization::deserialize(&bytes, self.format)
    }

    fn write(&self, path: &Path, dataset: &Dataset) -> GridResult<()> {
        let bytes = serialization::serialize(dataset, self.format)?;
        std::fs::write(path, &bytes)?;
        info!("wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::dataset::{AttrValue, Variable, VariableData};

    fn sample() -> Dataset
    {
        let mut ds = Dataset::new();
        ds.add_dim("time", 1).add_dim("lat", 1).add_dim("lon", 2);
        let var = Variable::new(&["time", "lat", "lon"], VariableData::Float(vec![1.5, -32768.0]))
            .with_attribute("units", AttrValue::Text("K".to_string()));
        ds.add_variable("sst", var).unwrap();
        ds
    }

    #[test]
    fn memory_store_round_trip()
    {
        let store = MemoryStore::new();
        assert!(store.read(Path::new("a.nc")).is_err());
        store.write(Path::new("a.nc"), &sample()).unwrap();
        assert!(store.contains("a.nc"));
        assert_eq!(store.read(Path::new("a.nc")).unwrap(), sample());
    }

    #[test]
    fn binary_store_writes_files()
    {
        let path = std::env::temp_dir().join(format!("sstgrid_store_{}.bin", std::process::id()));
        let store = BinaryStore::new(SerializationFormat::BincodeLz4);
        store.write(&path, &sample()).unwrap();
        let back = store.read(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(back, sample());
    }
}
