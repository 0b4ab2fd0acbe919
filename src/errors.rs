use thiserror::Error;

pub type GridResult<T> = Result<T, GridError>;

#[derive(Debug, Error)]
pub enum GridError
{
    #[error("invalid grid specification: {0}")]
    InvalidGridSpec(String),

    /// Dataset extents do not match the grid they are read onto.
    #[error("{context}: dataset is {found:?} but grid expects {expected:?}")]
    DimensionMismatch
    {
        context: &'static str,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("dataset has no dimension '{0}'")]
    MissingDimension(String),

    #[error("dataset has no variable '{0}'")]
    MissingVariable(String),

    #[error("landmask value {value} at cell {cell} is neither 0 nor 1")]
    InvalidMaskValue
    {
        cell: usize,
        value: f64,
    },

    #[error("variable sets differ: {left:?} vs {right:?}")]
    VariableMismatch
    {
        left: Vec<String>,
        right: Vec<String>,
    },

    #[error("fields are defined on different grid partitions")]
    PartitionMismatch,

    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    #[error("auxiliary field '{0}' already exists")]
    DuplicateField(String),

    #[error("auxiliary field '{0}' is not attached to the grid")]
    MissingAuxField(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("parse error in {file} line {line}: {reason}")]
    Parse
    {
        file: String,
        line: usize,
        reason: String,
    },

    #[error("kd-tree error: {0}")]
    KdTree(String),

    #[error("serialization failed")]
    SerializationFailed,

    #[error("deserialization failed")]
    DeserializationFailed,

    #[error("LZ4 decompression failed")]
    LZ4DecompressionFailed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),

    /// Raised on every PE when the root PE failed inside a collective I/O step.
    #[error("{0}: root PE reported a failure")]
    RootFailure(&'static str),

    #[cfg(feature = "netcdf")]
    #[error("NetCDF error: {0}")]
    NetCDF(#[from] netcdf::Error),
}

impl From<kdtree::ErrorKind> for GridError
{
    fn from(value: kdtree::ErrorKind) -> Self {
        GridError::KdTree(format!("{value:?}"))
    }
}
