use criterion::{Criterion, black_box, criterion_group, criterion_main};
use lapwise::telemetry::DataPoint;
use lapwise::track::{Point2D, TrackReconstructor};
use lapwise::{AnalysisThresholds, RawLap, Session, SessionMetadata, analyze_lap, comprehensive_analysis};
use std::time::Duration;

fn create_sample_lap(lap_number: u32, samples: usize) -> RawLap {
    let radius = 400.0;
    let points: Vec<DataPoint> = (0..samples)
        .map(|i| {
            let phase = i as f64 / samples as f64;
            let angle = phase * std::f64::consts::TAU;
            [
                ("SPEED", 160.0 + 60.0 * (angle * 6.0).sin()),
                ("THROTTLE", if (angle * 6.0).sin() > -0.3 { 100.0 } else { 10.0 }),
                ("BRAKE", if (angle * 6.0).sin() < -0.6 { 70.0 } else { 0.0 }),
                ("STEERANGLE", 20.0 * (angle * 12.0).cos()),
                ("G_LAT", 1.5 * (angle * 12.0).cos()),
                ("RPM", 6000.0 + 2500.0 * (angle * 6.0).sin()),
                ("GEAR", 4.0),
                ("TIME", phase * 100.0),
                ("POS_X", radius * angle.cos()),
                ("POS_Y", radius * angle.sin()),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
        })
        .collect();
    RawLap::new(lap_number, 100.0 + lap_number as f64 * 0.3, points)
}

fn bench_lap_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("lap_analysis");
    let thresholds = AnalysisThresholds::default();

    for samples in [600, 6000] {
        let lap = create_sample_lap(1, samples);
        group.bench_function(format!("analyze_lap_{samples}_samples"), |b| {
            b.iter(|| black_box(analyze_lap(black_box(&lap), &thresholds, None)));
        });
    }

    group.finish();
}

fn bench_track_reconstruction(c: &mut Criterion) {
    let mut group = c.benchmark_group("track_reconstruction");
    let thresholds = AnalysisThresholds::default();
    let reconstructor = TrackReconstructor::new(&thresholds);

    let trace: Vec<Point2D> = (0..3000)
        .map(|i| {
            let angle = i as f64 / 3000.0 * std::f64::consts::TAU;
            Point2D::new(
                900.0 * angle.cos() + 40.0 * (angle * 7.0).sin(),
                500.0 * angle.sin(),
            )
        })
        .collect();
    group.bench_function("reconstruct_3000_points", |b| {
        b.iter(|| black_box(reconstructor.reconstruct("bench", black_box(&trace), None)));
    });

    group.finish();
}

fn bench_session_report(c: &mut Criterion) {
    let mut group = c.benchmark_group("session_report");
    let thresholds = AnalysisThresholds::default();
    let session = Session {
        metadata: SessionMetadata::default(),
        laps: (1..=20).map(|n| create_sample_lap(n, 1200)).collect(),
    };

    group.bench_function("comprehensive_analysis_20_laps", |b| {
        b.iter(|| black_box(comprehensive_analysis(black_box(&session), &thresholds)));
    });

    let report = comprehensive_analysis(&session, &thresholds);
    group.bench_function("serialize_report", |b| {
        b.iter(|| black_box(serde_json::to_string(&report).unwrap()));
    });

    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(10))
        .sample_size(50);
    targets = bench_lap_analysis, bench_track_reconstruction, bench_session_report
}
criterion_main!(benches);
