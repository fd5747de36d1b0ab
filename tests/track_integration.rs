// Track reconstruction, lap-vs-layout performance, SVG output and thresholds files

use std::f64::consts::PI;

use approx::assert_relative_eq;
use lapwise::config::SpeedUnit;
use lapwise::telemetry::DataPoint;
use lapwise::track::{Direction, LayoutSource, SectorType};
use lapwise::{
    AnalysisThresholds, LapwiseError, RawLap, Session, SessionAnalyzer, SessionMetadata,
    TrackMapGenerator,
};
use tempfile::TempDir;

/// Rounded rectangle: two 600 m straights joined by 80 m radius hairpins
fn oval_lap(lap_number: u32, lap_time: f64, samples: usize) -> RawLap {
    let straight = 600.0;
    let radius = 80.0;
    let perimeter = 2.0 * straight + 2.0 * PI * radius;

    let points: Vec<DataPoint> = (0..samples)
        .map(|i| {
            let s = perimeter * i as f64 / samples as f64;
            let (x, y) = if s < straight {
                (s, 0.0)
            } else if s < straight + PI * radius {
                let a = (s - straight) / radius - PI / 2.0;
                (straight + radius * a.cos(), radius + radius * a.sin())
            } else if s < 2.0 * straight + PI * radius {
                (straight - (s - straight - PI * radius), 2.0 * radius)
            } else {
                let a = (s - 2.0 * straight - PI * radius) / radius + PI / 2.0;
                (radius * a.cos(), radius + radius * a.sin())
            };
            let on_straight = s < straight
                || (s >= straight + PI * radius && s < 2.0 * straight + PI * radius);
            [
                ("POS_X", x),
                ("POS_Y", y),
                ("SPEED", if on_straight { 220.0 } else { 90.0 }),
                ("THROTTLE", if on_straight { 100.0 } else { 30.0 }),
                ("STEERANGLE", if on_straight { 0.0 } else { 25.0 }),
                ("TIME", lap_time * i as f64 / samples as f64),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
        })
        .collect();
    RawLap::new(lap_number, lap_time, points)
}

fn session(track: &str, laps: Vec<RawLap>) -> Session {
    Session {
        metadata: SessionMetadata {
            track: Some(track.to_string()),
            ..Default::default()
        },
        laps,
    }
}

#[test]
fn test_layout_from_positions() {
    let analyzer = SessionAnalyzer::default();
    let layout = analyzer.detect_track(&session(
        "Test Oval",
        vec![oval_lap(1, 62.0, 400), oval_lap(2, 61.0, 400)],
    ));

    assert_eq!(layout.source, LayoutSource::Reconstructed);
    assert_eq!(layout.name, "Test Oval");
    assert_relative_eq!(
        layout.total_length,
        layout.points.last().unwrap().distance,
        epsilon = 1e-9
    );
    // the closing segment is not part of the trace
    let perimeter = 1200.0 + 2.0 * PI * 80.0;
    assert!(layout.total_length > perimeter * 0.95 && layout.total_length < perimeter * 1.01);
    assert!(
        layout
            .points
            .windows(2)
            .all(|pair| pair[1].distance >= pair[0].distance)
    );
    // driven anticlockwise in a y-up frame
    assert_eq!(layout.direction, Direction::Counterclockwise);
    assert_eq!(layout.sectors.len(), 3);
    let straight_radius = AnalysisThresholds::default().track.straight_radius;
    assert!(
        layout
            .points
            .iter()
            .any(|p| p.corner_radius < straight_radius)
    );
}

#[test]
fn test_known_track_without_positions_is_synthesized() {
    let lap = RawLap::new(
        1,
        88.0,
        (0..50)
            .map(|_| [("SPEED".to_string(), 180.0)].into_iter().collect())
            .collect(),
    );
    let layout = SessionAnalyzer::default().detect_track(&session("Imola", vec![lap]));

    assert_eq!(layout.source, LayoutSource::Synthesized);
    assert_eq!(layout.name, "Autodromo Enzo e Dino Ferrari");
    assert_eq!(layout.direction, Direction::Counterclockwise);
    assert_relative_eq!(layout.total_length, 4909.0, max_relative = 1e-3);
    assert!(layout.sectors.iter().all(|s| s.sector_type == SectorType::Mixed));
}

#[test]
fn test_lap_performance_against_layout() {
    let analyzer = SessionAnalyzer::default();
    let lap = oval_lap(1, 62.0, 400);
    let layout = analyzer.detect_track(&session("Test Oval", vec![lap.clone()]));
    let performance = analyzer.lap_performance(&lap, &layout);

    assert_eq!(performance.lap_number, 1);
    assert_eq!(performance.sector_times.len(), layout.sectors.len());
    let sector_total: f64 = performance.sector_times.iter().map(|s| s.time).sum();
    assert!(sector_total > 0.0 && sector_total <= 62.0 + 1e-6);

    let cornering = performance.cornering_analysis.as_option().unwrap();
    assert!(cornering.total_corners >= 2);
    let racing_line = performance.racing_line.as_option().unwrap();
    assert_relative_eq!(racing_line.length_ratio, 1.0, max_relative = 0.05);
    assert!(performance.efficiency_score > 0.0 && performance.efficiency_score <= 100.0);
}

#[test]
fn test_svg_written_for_layout() {
    let analyzer = SessionAnalyzer::default();
    let layout = analyzer.detect_track(&session("Test Oval", vec![oval_lap(1, 62.0, 300)]));
    let svg = TrackMapGenerator::new().generate_svg(&layout).unwrap();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("oval.svg");
    std::fs::write(&path, &svg).unwrap();
    let written = std::fs::read_to_string(&path).unwrap();

    assert!(written.starts_with("<svg"));
    assert_eq!(written.matches("<polyline").count(), layout.sectors.len());
    assert!(written.contains("<title>Test Oval</title>"));
}

#[test]
fn test_thresholds_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("thresholds.json");

    let mut thresholds = AnalysisThresholds::default();
    thresholds.speed_unit = SpeedUnit::MilesPerHour;
    thresholds.sector_count = 4;
    thresholds.save_to(&path).unwrap();

    let loaded = AnalysisThresholds::from_file(&path).unwrap();
    assert_eq!(loaded, thresholds);

    // missing fields fall back to their defaults
    std::fs::write(&path, r#"{"sector_count": 5, "track": {"straight_radius": 800.0}}"#).unwrap();
    let partial = AnalysisThresholds::from_file(&path).unwrap();
    assert_eq!(partial.sector_count, 5);
    assert_relative_eq!(partial.track.straight_radius, 800.0);
    assert_relative_eq!(
        partial.track.fast_corner_radius,
        AnalysisThresholds::default().track.fast_corner_radius
    );
    assert_eq!(partial.speed_unit, AnalysisThresholds::default().speed_unit);

    std::fs::write(&path, r#"{"sector_count": 0}"#).unwrap();
    assert!(matches!(
        AnalysisThresholds::from_file(&path),
        Err(LapwiseError::InvalidThreshold { .. })
    ));
}
