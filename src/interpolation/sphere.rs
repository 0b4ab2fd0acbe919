///
/// Position on the unit sphere for a longitude/latitude pair in degrees.
/// Euclidean distance between these points is the chord length, which is
/// monotone in great-circle distance and has no seam at the date line.
///
#[inline]
pub fn lonlat_to_xyz(lon: f64, lat: f64) -> [f64; 3]
{
    let (lon, lat) = (lon.to_radians(), lat.to_radians());
    let cl = lat.cos();
    [cl * lon.cos(), cl * lon.sin(), lat.sin()]
}

/// Squared chord distance between two unit-sphere points. Used as the
/// k-d tree metric.
#[inline]
pub fn chord_squared(a: &[f64], b: &[f64]) -> f64
{
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}
