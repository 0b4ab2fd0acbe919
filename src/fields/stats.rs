use std::fmt::Display;

/// Global statistics of one variable over its valid cells.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldStats
{
    pub name: String,
    /// `f64::MAX` when no cell is valid.
    pub min: f64,
    /// `f64::MIN` when no cell is valid.
    pub max: f64,
    /// 0 when no cell is valid.
    pub mean: f64,
    pub valid: usize,
}

impl FieldStats
{
    pub fn has_valid_cells(&self) -> bool
    {
        self.valid > 0
    }
}

impl Display for FieldStats
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "min = {}, max = {}, mean = {}", self.min, self.max, self.mean)
    }
}

#[test]
fn display_format()
{
    let s = FieldStats { name: "sst".to_string(), min: -1.5, max: 30.0, mean: 12.25, valid: 3 };
    assert_eq!(s.to_string(), "min = -1.5, max = 30, mean = 12.25");
    assert!(s.has_valid_cells());
}
