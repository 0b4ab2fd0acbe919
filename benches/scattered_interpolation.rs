use criterion::{criterion_group, criterion_main, Criterion};
use sstgrid::{errors::GridError, geometry::RegularLonLatGrid, interpolation::{IdwOptions, ScatteredDataInterpolator, ScatteredPoint}};

fn build_points(n: usize) -> Vec<ScatteredPoint>
{
    // Deterministic pseudo-random scatter over the sphere.
    let mut points = Vec::with_capacity(n);
    let golden = (1.0 + 5f64.sqrt()) / 2.0;
    for k in 0..n
    {
        let lat = (1.0 - 2.0 * (k as f64 + 0.5) / n as f64).asin().to_degrees();
        let lon = (360.0 * k as f64 / golden) % 360.0;
        points.push(ScatteredPoint::new(lon, lat, lat.to_radians().cos() * 200.0));
    }
    points
}

fn one_degree_grid(points: &[ScatteredPoint]) -> Result<Vec<f64>, GridError>
{
    let grid = RegularLonLatGrid::from_name("S360x180")?;
    let targets: Vec<[f64; 2]> = (0..grid.len()).map(|g| { let (i, j) = grid.ij(g); grid.lonlat(i, j) }).collect();
    let interp = ScatteredDataInterpolator::new(&targets, IdwOptions::default());
    interp.interpolate(points)
}

fn run_one_degree(c: &mut Criterion)
{
    let points = build_points(20_000);
    c.bench_function("idw S360x180 from 20k points", |b| b.iter(|| one_degree_grid(&points).unwrap()));
}

criterion_group!(benches, run_one_degree);
criterion_main!(benches);
