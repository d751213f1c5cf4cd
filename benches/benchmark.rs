//! Performance benchmarks for datum-shift
//!
//! Run with: cargo bench
//!
//! Grids are synthesized into a temporary directory, so no dataset files
//! are needed.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use datum_shift::transforms::{CatalogDescription, DatasetDescriptor, InMemoryDefinitions};
use datum_shift::{GeoPoint, GridFileReader, RegressionParameters, RegressionTransform, TransformCatalog};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const COLS: usize = 241;
const ROWS: usize = 121;
/// 0.25 degree spacing in arc-seconds
const SPACING: i16 = 900;

/// Write a 2 byte little-endian grid from (-90, 30) with a smooth field
fn write_grid(dir: &Path, name: &str, scale: f64) -> PathBuf {
    let west: i32 = -90 * 3600;
    let south: i32 = 30 * 3600;
    let east = west + (COLS as i32 - 1) * SPACING as i32;
    let north = south + (ROWS as i32 - 1) * SPACING as i32;

    let mut out = vec![0u8; 80];
    out[0..4].copy_from_slice(&south.to_le_bytes());
    out[4..8].copy_from_slice(&north.to_le_bytes());
    out[8..12].copy_from_slice(&west.to_le_bytes());
    out[12..16].copy_from_slice(&east.to_le_bytes());
    out[16..18].copy_from_slice(&SPACING.to_le_bytes());
    out[18..20].copy_from_slice(&SPACING.to_le_bytes());
    out[24..32].copy_from_slice(&1000.0f64.to_le_bytes());
    out[32..34].copy_from_slice(&2i16.to_le_bytes());
    out[48..50].copy_from_slice(&1i16.to_le_bytes());
    for row in 0..ROWS {
        for col in 0..COLS {
            let v = scale * ((col as f64 * 0.05).sin() + (row as f64 * 0.07).cos());
            out.extend_from_slice(&((v * 1000.0).round() as i16).to_le_bytes());
        }
    }

    let path = dir.join(name);
    std::fs::write(&path, out).unwrap();
    path
}

/// Deterministic points spread over the grid interior
fn points(n: usize) -> Vec<GeoPoint> {
    (0..n)
        .map(|i| {
            let t = i as f64 / n as f64;
            GeoPoint::new(-89.5 + 59.0 * t, 30.5 + 29.0 * ((t * 37.0).fract()), 0.0)
        })
        .collect()
}

/// Lookups with a whole-file buffer versus a three record window
fn bench_grid_lookup(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let path = write_grid(dir.path(), "geoid.byn", 15.0);
    let pts = points(1_000);

    let mut group = c.benchmark_group("grid_lookup");
    group.throughput(Throughput::Elements(pts.len() as u64));
    for (name, buffer_size) in [("whole_file", usize::MAX), ("minimal_window", 0)] {
        let mut reader = GridFileReader::new(&path, buffer_size, 0.0, 0).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(name), &pts, |b, pts| {
            b.iter(|| {
                for p in pts {
                    black_box(reader.lookup(black_box(p)).ok());
                }
            })
        });
    }
    group.finish();
}

/// Catalog forward and inverse shifts, with and without the cell cache
fn bench_catalog(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let lat = write_grid(dir.path(), "lat.byn", 10.0);
    let lng = write_grid(dir.path(), "lng.byn", -8.0);
    let geoid = write_grid(dir.path(), "geoid.byn", 15.0);
    let datasets = vec![
        DatasetDescriptor::new(lat).with_longitude_path(lng),
        DatasetDescriptor::new(geoid),
    ];
    let definitions = InMemoryDefinitions::new();
    let pts = points(1_000);

    let mut group = c.benchmark_group("catalog");
    group.throughput(Throughput::Elements(pts.len() as u64));
    for cache_capacity in [0, 32] {
        let description = CatalogDescription {
            cache_capacity,
            ..CatalogDescription::new(datasets.clone())
        };
        let mut catalog = TransformCatalog::new(&description, &definitions).unwrap();
        group.bench_with_input(BenchmarkId::new("forward", cache_capacity), &pts, |b, pts| {
            b.iter(|| {
                for p in pts {
                    black_box(catalog.compute_forward(black_box(p)));
                }
            })
        });
        group.bench_with_input(BenchmarkId::new("inverse", cache_capacity), &pts, |b, pts| {
            b.iter(|| {
                for p in pts {
                    black_box(catalog.compute_inverse(black_box(p)));
                }
            })
        });
    }
    group.finish();
}

/// Full degree-9 regression evaluation
fn bench_regression(c: &mut Criterion) {
    let mut params = RegressionParameters::new(-45.0, 75.0, 0.1, 1.5);
    for u in 0..10 {
        for v in 0..10 {
            let k = (u * 10 + v) as f64;
            params = params.with_term(u, v, 0.01 * k.sin(), 0.01 * k.cos(), 0.001 * k);
        }
    }
    let transform = RegressionTransform::new(&params).unwrap();
    let p = GeoPoint::new(-74.25, 46.5, 120.0);

    c.bench_function("regression_forward", |b| b.iter(|| black_box(transform.forward(black_box(&p)))));
    c.bench_function("regression_inverse", |b| b.iter(|| black_box(transform.inverse(black_box(&p)))));
}

criterion_group!(benches, bench_grid_lookup, bench_catalog, bench_regression);
criterion_main!(benches);
