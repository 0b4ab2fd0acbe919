use std::io::BufRead;
use std::path::Path;

use tracing::info;

use crate::config::LengthScaleConfig;
use crate::errors::{GridError, GridResult};
use crate::interpolation::ScatteredPoint;
use crate::parallel::ParallelReduction;

use super::domain::GridDomain;

///
/// Parse whitespace separated `lat lon unused value` records. Every value
/// is multiplied by `scale`. Blank lines and lines starting with `#` are
/// skipped; anything else that does not parse is an error naming the line.
///
pub fn parse_scattered_points<R: BufRead>(reader: R, source: &str, scale: f64) -> GridResult<Vec<ScatteredPoint>>
{
    let mut points = Vec::new();
    for (n, line) in reader.lines().enumerate()
    {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#')
        {
            continue;
        }
        let parse_error = |reason: String| GridError::Parse { file: source.to_string(), line: n + 1, reason };
        let columns = trimmed.split_whitespace()
            .map(|c| c.parse::<f64>().map_err(|e| parse_error(format!("'{c}': {e}"))))
            .collect::<GridResult<Vec<f64>>>()?;
        if columns.len() < 4
        {
            return Err(parse_error(format!("expected 4 columns, found {}", columns.len())));
        }
        points.push(ScatteredPoint::new(columns[1], columns[0], columns[3] * scale));
    }
    Ok(points)
}

pub fn read_scattered_points(path: &Path, scale: f64) -> GridResult<Vec<ScatteredPoint>>
{
    let reader = std::io::BufReader::new(std::fs::File::open(path)?);
    parse_scattered_points(reader, &path.display().to_string(), scale)
}

impl GridDomain
{
    ///
    /// Read the length-scale text file on the root PE, broadcast the points
    /// and interpolate them onto every PE's cells. Collective.
    ///
    pub fn load_length_scale(&mut self, config: &LengthScaleConfig) -> GridResult<()>
    {
        let mut flat = Vec::new();
        let mut failure = None;
        if self.comm().is_root()
        {
            match read_scattered_points(&config.filename, config.scale)
            {
                Ok(points) => flat = points.iter().flat_map(|p| [p.lon, p.lat, p.value]).collect(),
                Err(e) => failure = Some(e),
            }
        }
        if !ParallelReduction::new(self.comm()).root_status(failure.is_none())
        {
            return Err(failure.unwrap_or(GridError::RootFailure("length scale read")));
        }
        let flat = self.comm().broadcast_f64(flat);
        let points: Vec<ScatteredPoint> = flat.chunks_exact(3).map(|c| ScatteredPoint::new(c[0], c[1], c[2])).collect();
        info!("interpolating {} '{}' points from {}", points.len(), config.name, config.filename.display());
        self.interpolate_scattered(&config.name, &points, config.interpolation)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn columns_are_lat_lon_unused_value()
    {
        let text = "# header\n10.0  20.0 0 1.5\n\n-5 350 9 2\n";
        let points = parse_scattered_points(text.as_bytes(), "rossby.dat", 1000.0).unwrap();
        assert_eq!(points, vec![ScatteredPoint::new(20.0, 10.0, 1500.0), ScatteredPoint::new(350.0, -5.0, 2000.0)]);
    }

    #[test]
    fn bad_lines_report_their_number()
    {
        let err = parse_scattered_points("1 2 3 4\n1 2 x 4\n".as_bytes(), "f", 1.0).unwrap_err();
        assert!(matches!(err, GridError::Parse { line: 2, .. }));
        let err = parse_scattered_points("1 2 3\n".as_bytes(), "f", 1.0).unwrap_err();
        assert!(matches!(err, GridError::Parse { line: 1, .. }));
    }
}
