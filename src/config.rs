//!
//! Configuration structures. Everything deserializes with serde; the JSON
//! helpers are what the executables use to load their run configuration.
//!
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::errors::GridResult;
use crate::geometry::GridSpec;
use crate::interpolation::IdwOptions;

/// Parse any configuration structure from a JSON string.
pub fn from_json_str<T: DeserializeOwned>(text: &str) -> GridResult<T>
{
    Ok(serde_json::from_str(text)?)
}

/// Parse any configuration structure from a JSON file.
pub fn from_json_path<T: DeserializeOwned>(path: impl AsRef<Path>) -> GridResult<T>
{
    let reader = std::io::BufReader::new(std::fs::File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeometryConfig
{
    pub grid: GridSpec,
    #[serde(default)]
    pub landmask: Option<LandMaskConfig>,
    #[serde(default)]
    pub length_scale: Option<LengthScaleConfig>,
}

impl GeometryConfig
{
    pub fn new(grid: GridSpec) -> Self
    {
        Self { grid, landmask: None, length_scale: None }
    }

    pub fn from_json_str(text: &str) -> GridResult<Self>
    {
        from_json_str(text)
    }

    pub fn from_path(path: impl AsRef<Path>) -> GridResult<Self>
    {
        from_json_path(path)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LandMaskConfig
{
    pub filename: PathBuf,
    #[serde(default = "LandMaskConfig::default_variable")]
    pub variable: String,
}

impl LandMaskConfig
{
    fn default_variable() -> String
    {
        "landmask".to_string()
    }

    pub fn new(filename: impl Into<PathBuf>) -> Self
    {
        Self { filename: filename.into(), variable: Self::default_variable() }
    }
}

///
/// Scattered `(lat, lon, unused, value)` text file interpolated onto the
/// grid as an auxiliary field.
///
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LengthScaleConfig
{
    pub filename: PathBuf,
    #[serde(default = "LengthScaleConfig::default_name")]
    pub name: String,
    /// Unit conversion applied to every value (km to m by default).
    #[serde(default = "LengthScaleConfig::default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub interpolation: IdwOptions,
}

impl LengthScaleConfig
{
    fn default_name() -> String
    {
        "rossby_radius".to_string()
    }

    fn default_scale() -> f64
    {
        1000.0
    }

    pub fn new(filename: impl Into<PathBuf>) -> Self
    {
        Self
        {
            filename: filename.into(),
            name: Self::default_name(),
            scale: Self::default_scale(),
            interpolation: IdwOptions::default(),
        }
    }
}

/// Gridded dataset read/write settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldIoConfig
{
    pub filename: PathBuf,
    /// Name of the variable inside the dataset.
    #[serde(default = "FieldIoConfig::default_variable")]
    pub variable: String,
    /// Dataset values are Kelvin; fields hold Celsius.
    #[serde(default)]
    pub kelvin: bool,
    #[serde(default = "FieldIoConfig::default_units")]
    pub units: String,
}

impl FieldIoConfig
{
    fn default_variable() -> String
    {
        "sst".to_string()
    }

    fn default_units() -> String
    {
        "K".to_string()
    }

    pub fn new(filename: impl Into<PathBuf>) -> Self
    {
        Self
        {
            filename: filename.into(),
            variable: Self::default_variable(),
            kelvin: false,
            units: Self::default_units(),
        }
    }
}

///
/// Horizontal correlation length settings. Lengths are built from the
/// Rossby radius and the cell size, clamped, then converted from a Gaussian
/// sigma to a Gaspari-Cohn cutoff distance.
///
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationLengthConfig
{
    pub base_value: f64,
    pub rossby_mult: f64,
    pub min_grid_mult: f64,
    pub min_value: f64,
    pub max_value: f64,
    pub gaussian_to_cutoff: f64,
}

impl Default for CorrelationLengthConfig
{
    fn default() -> Self {
        Self
        {
            base_value: 0.0,
            rossby_mult: 0.0,
            min_grid_mult: 0.0,
            min_value: 0.0,
            max_value: f64::MAX,
            gaussian_to_cutoff: 3.57,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StdDevConfig
{
    #[serde(default)]
    pub fixed: Option<f64>,
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn geometry_config_defaults()
    {
        let conf = GeometryConfig::from_json_str(r#"{
            "grid": "S360x180",
            "landmask": { "filename": "mask.nc" },
            "length_scale": { "filename": "rossby.dat" }
        }"#).unwrap();
        assert_eq!(conf.grid, GridSpec::Name("S360x180".to_string()));
        let mask = conf.landmask.unwrap();
        assert_eq!(mask.variable, "landmask");
        let ls = conf.length_scale.unwrap();
        assert_eq!(ls.name, "rossby_radius");
        assert_eq!(ls.scale, 1000.0);
        assert_eq!(ls.interpolation.neighbors, 4);
        assert_eq!(ls.interpolation.tolerance, 1e-6);
    }

    #[test]
    fn structured_grid_spec()
    {
        let conf = GeometryConfig::from_json_str(r#"{ "grid": { "nx": 8, "ny": 4, "shifted": true } }"#).unwrap();
        assert_eq!(conf.grid, GridSpec::Structured { nx: 8, ny: 4, shifted: true });
        assert!(conf.landmask.is_none());
    }

    #[test]
    fn field_io_and_correlation_defaults()
    {
        let io: FieldIoConfig = from_json_str(r#"{ "filename": "sst.nc", "kelvin": true }"#).unwrap();
        assert_eq!(io.variable, "sst");
        assert!(io.kelvin);
        let corr: CorrelationLengthConfig = from_json_str(r#"{ "rossby_mult": 1.5 }"#).unwrap();
        assert_eq!(corr.rossby_mult, 1.5);
        assert_eq!(corr.gaussian_to_cutoff, 3.57);
        assert_eq!(corr.max_value, f64::MAX);
    }

    #[test]
    fn malformed_json_is_a_config_error()
    {
        let err = GeometryConfig::from_json_str("{ \"grid\": ").unwrap_err();
        assert!(matches!(err, crate::errors::GridError::Config(_)));
    }
}
