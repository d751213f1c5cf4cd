//! Property-based tests for GridFileReader
//!
//! **Feature: datum-shift, Property 1-5: 网格读取与插值正确性**

mod common;

use common::{TestGrid, NO_DATA_RAW};
use datum_shift::core::{GeoPoint, GridFileReader, GridValue, HEADER_SIZE, NO_DATA_VALUE};
use proptest::prelude::*;
use tempfile::TempDir;

const SPACING: f64 = 0.25;

/// 7 x 7 grid holding col^2 + 2 row^2 + col * row
fn quadratic_grid() -> TestGrid {
    TestGrid::new(-80.0, 40.0, 7, 7, SPACING)
        .fill_raw(|row, col| (col * col + 2 * row * row + col * row) as i64)
}

fn open_whole(path: &std::path::Path) -> GridFileReader {
    GridFileReader::new(path, usize::MAX, 0.0, 0).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// **Property 1: 内部点二次精确**
    ///
    /// Away from the edges, biquadratic interpolation reproduces any field
    /// that is quadratic in each axis.
    #[test]
    fn prop_interior_quadratic_is_exact(cf in 0.5f64..4.49, rf in 0.5f64..4.49) {
        let dir = TempDir::new().unwrap();
        let grid = quadratic_grid();
        let path = grid.write(dir.path(), "quad.byn");
        let mut reader = open_whole(&path);

        let p = GeoPoint::from_lng_lat(
            grid.west_degrees() + cf * SPACING,
            grid.north_degrees() - rf * SPACING,
        );
        let expected = cf * cf + 2.0 * rf * rf + cf * rf;
        match reader.lookup(&p).unwrap() {
            GridValue::Value(v) => prop_assert!((v - expected).abs() < 1e-8, "{} vs {}", v, expected),
            GridValue::NoData => prop_assert!(false, "unexpected no-data"),
        }
    }

    /// **Property 2: 边界外覆盖为零**
    ///
    /// Points on or outside the bounding box never report coverage.
    #[test]
    fn prop_outside_or_on_boundary_has_no_coverage(
        lng in -82.0f64..-76.0,
        lat in 38.0f64..44.0,
        edge in 0usize..4,
        snap in proptest::bool::ANY,
    ) {
        let dir = TempDir::new().unwrap();
        let grid = quadratic_grid();
        let path = grid.write(dir.path(), "quad.byn");
        let mut reader = open_whole(&path);

        let (west, east) = (grid.west_degrees(), grid.east_degrees());
        let (south, north) = (grid.south_degrees(), grid.north_degrees());
        let mut p = GeoPoint::from_lng_lat(lng, lat);
        if snap {
            match edge {
                0 => p.lng = west,
                1 => p.lng = east,
                2 => p.lat = south,
                _ => p.lat = north,
            }
        }
        let strictly_inside = p.lng > west && p.lng < east && p.lat > south && p.lat < north;
        prop_assume!(!strictly_inside);

        prop_assert_eq!(reader.coverage_test(&p), 0.0);
    }

    /// **Property 3: 无数据单元**
    ///
    /// Points whose stencil touches a no-data node report no-data with
    /// status 1 and value 9999, never an error.
    #[test]
    fn prop_no_data_is_reported(dx in -0.49f64..0.49, dy in -0.49f64..0.49) {
        let dir = TempDir::new().unwrap();
        let mut grid = TestGrid::new(10.0, 50.0, 5, 5, SPACING).fill_raw(|_, _| 10);
        grid.set_raw(2, 2, NO_DATA_RAW);
        let path = grid.write(dir.path(), "holes.byn");
        let mut reader = open_whole(&path);

        let p = GeoPoint::from_lng_lat(grid.lng(2) + dx * SPACING, grid.lat(2) + dy * SPACING);
        let value = reader.lookup(&p).unwrap();
        prop_assert_eq!(value, GridValue::NoData);
        prop_assert_eq!(value.status_code(), 1);
        prop_assert_eq!(value.value(), NO_DATA_VALUE);
        prop_assert_eq!(reader.coverage_test(&p), 0.0);
    }

    /// **Property 4: 缓冲窗口包含所需记录**
    ///
    /// After any successful lookup the three records it needed lie inside
    /// the buffer window, and partial windows always fill the buffer.
    #[test]
    fn prop_buffer_window_contains_stencil(
        requested in 0usize..500,
        points in proptest::collection::vec((0.0f64..1.0, 0.0f64..1.0), 1..12),
    ) {
        let dir = TempDir::new().unwrap();
        let grid = TestGrid::new(0.0, 0.0, 5, 40, SPACING).fill_raw(|row, col| (row * 7 + col) as i64);
        let path = grid.write(dir.path(), "tall.byn");
        let mut partial = GridFileReader::new(&path, requested, 0.0, 0).unwrap();
        let mut whole = open_whole(&path);
        let record_size = partial.record_size() as u64;

        for (fx, fy) in points {
            let lng = grid.west_degrees() + fx * (grid.east_degrees() - grid.west_degrees());
            let lat = grid.south_degrees() + fy * (grid.north_degrees() - grid.south_degrees());
            let p = GeoPoint::from_lng_lat(lng, lat);

            let a = partial.lookup(&p).unwrap().value();
            let b = whole.lookup(&p).unwrap().value();
            prop_assert!((a - b).abs() < 1e-12);

            let rec = ((grid.north_degrees() - lat) / SPACING + 0.5).floor() as i64;
            let rec_c = rec.clamp(1, grid.rows as i64 - 2) as u64;
            let begin = HEADER_SIZE + (rec_c - 1) * record_size;
            let end = begin + 3 * record_size;

            let window = partial.buffer_window().unwrap();
            prop_assert!(window.start <= begin && end <= window.end);
            prop_assert_eq!((window.end - window.start) as usize, partial.buffer_size());
        }
    }

    /// **Property 5: release 幂等**
    ///
    /// Any interleaving of lookups and releases gives the same values as a
    /// reader that is never released.
    #[test]
    fn prop_release_is_transparent(
        ops in proptest::collection::vec(proptest::option::of((0.05f64..0.95, 0.05f64..0.95)), 1..16),
    ) {
        let dir = TempDir::new().unwrap();
        let grid = quadratic_grid();
        let path = grid.write(dir.path(), "quad.byn");
        let mut reader = GridFileReader::new(&path, 0, 0.0, 0).unwrap();
        let mut reference = open_whole(&path);

        for op in ops {
            match op {
                Some((fx, fy)) => {
                    let p = GeoPoint::from_lng_lat(
                        grid.west_degrees() + fx * (grid.east_degrees() - grid.west_degrees()),
                        grid.south_degrees() + fy * (grid.north_degrees() - grid.south_degrees()),
                    );
                    prop_assert_eq!(reader.lookup(&p).unwrap(), reference.lookup(&p).unwrap());
                }
                None => {
                    reader.release();
                    reader.release();
                    prop_assert!(reader.is_released());
                }
            }
        }
    }
}

/// Scenario: 3 x 3 grid of equal values, looked up at its center
#[test]
fn test_center_of_constant_grid() {
    let dir = TempDir::new().unwrap();
    let path = TestGrid::new(0.0, 0.0, 3, 3, 0.5)
        .fill_raw(|_, _| 1234)
        .with_factor(100.0)
        .write(dir.path(), "flat.byn");
    let mut reader = open_whole(&path);

    let value = reader.lookup(&GeoPoint::from_lng_lat(0.5, 0.5)).unwrap();
    assert_eq!(value.status_code(), 0);
    assert!((value.value() - 12.34).abs() < 1e-12);
    assert_eq!(reader.coverage_test(&GeoPoint::from_lng_lat(0.5, 0.5)), 0.5);
}

#[test]
fn test_four_byte_big_endian_grid() {
    let dir = TempDir::new().unwrap();
    let mut grid = TestGrid::new(-1.0, -1.0, 4, 4, 0.5)
        .with_element_size(4)
        .with_factor(1000.0)
        .fill(|lng, lat| 40.0 + 2.0 * lng - lat);
    grid.little_endian = false;
    let path = grid.write(dir.path(), "big.byn");
    let mut reader = open_whole(&path);

    assert_eq!(reader.swaps_bytes(), cfg!(target_endian = "little"));
    let value = reader.lookup(&GeoPoint::from_lng_lat(-0.3, 0.1)).unwrap().value();
    assert!((value - (40.0 - 0.6 - 0.1)).abs() < 1e-9);
}
