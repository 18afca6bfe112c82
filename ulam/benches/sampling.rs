use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tempfile::TempDir;
use ulam::{Dataset, GeoPoint, GridSpec, RawDataset, Session};

/// A full 0.4° dataset with smooth synthetic fields.
fn create_raw_dataset() -> RawDataset {
    let spec = GridSpec::default();
    let grid = |base: f64, scale: f64| -> Vec<Vec<f64>> {
        (0..spec.lat_cells())
            .map(|j| {
                (0..spec.lon_cells())
                    .map(|i| base + scale * ((j as f64 * 0.02).sin() + (i as f64 * 0.01).cos()))
                    .collect()
            })
            .collect()
    };
    RawDataset {
        ds_datetime: "2024-03-01T00:00:00.000".to_string(),
        ulamlist: (0..36)
            .map(|k| (k as f64 * 600.0, (10.0 + k as f64, 20.0 - k as f64)))
            .collect(),
        t_initial: grid(285.0, 12.0),
        p_initial: grid(100_500.0, 900.0),
        t_final: grid(287.0, 11.0),
        p_final: grid(100_800.0, 850.0),
        initial_timestep: 0.0,
        final_timestep: 21_600.0,
        resolution: spec.resolution(),
    }
}

fn create_session() -> Session {
    let dataset = Arc::new(Dataset::try_from(create_raw_dataset()).unwrap());
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap() + Duration::minutes(95);
    Session::new(dataset, None, now)
}

fn bench_single_sample(c: &mut Criterion) {
    let session = create_session();

    c.bench_function("single_sample", |b| {
        b.iter(|| {
            black_box(session.sample_at(black_box(GeoPoint::new(35.3606, 138.7274)), 3.0));
        });
    });
}

fn bench_sample_pair(c: &mut Criterion) {
    let session = create_session();

    c.bench_function("sample_pair", |b| {
        b.iter(|| {
            black_box(session.sample_pair(black_box(GeoPoint::new(50.0, -80.0)), 3.0));
        });
    });
}

fn bench_batch_sweep(c: &mut Criterion) {
    let session = create_session();

    // 1000 points from pole to pole, once around the globe
    let points: Vec<GeoPoint> = (0..1000)
        .map(|i| {
            let frac = i as f64 / 1000.0;
            GeoPoint::new(-90.0 + frac * 180.0, -180.0 + frac * 360.0)
        })
        .collect();

    c.bench_function("batch_1000_sweep", |b| {
        b.iter(|| {
            for point in &points {
                black_box(session.sample_at(black_box(*point), 5.0));
            }
        });
    });
}

fn bench_load_file(c: &mut Criterion) {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("bu.js");
    let json = serde_json::to_string(&create_raw_dataset()).unwrap();
    std::fs::write(&path, format!("const bu = {};", json)).unwrap();

    c.bench_function("load_full_dataset", |b| {
        b.iter(|| {
            black_box(ulam::loader::load_file(black_box(&path)).unwrap());
        });
    });
}

criterion_group!(
    benches,
    bench_single_sample,
    bench_sample_pair,
    bench_batch_sweep,
    bench_load_file,
);
criterion_main!(benches);
