// SVG track map rendering for reconstructed layouts

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::types::{BoundingBox, Point2D, SectorType, TrackLayout};
use crate::LapwiseError;
use crate::telemetry::signal::EPSILON;

/// Configuration for SVG track map generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackMapConfig {
    /// Canvas dimensions (width, height) in pixels
    pub canvas_size: (u32, u32),
    /// Stroke width for the track line
    pub stroke_width: f64,
    /// Margin around the track as percentage of canvas size
    pub margin_percentage: f64,
}

impl Default for TrackMapConfig {
    fn default() -> Self {
        Self {
            canvas_size: (800, 600),
            stroke_width: 3.0,
            margin_percentage: 0.1, // 10% margin
        }
    }
}

fn sector_colour(sector_type: SectorType) -> &'static str {
    match sector_type {
        SectorType::Straight => "#2e7d32",
        SectorType::FastCorner => "#f9a825",
        SectorType::SlowCorner => "#c62828",
        SectorType::Mixed => "#333",
    }
}

fn sector_class(sector_type: SectorType) -> &'static str {
    match sector_type {
        SectorType::Straight => "straight",
        SectorType::FastCorner => "fast-corner",
        SectorType::SlowCorner => "slow-corner",
        SectorType::Mixed => "mixed",
    }
}

/// Renders a [`TrackLayout`] as one polyline per sector, coloured by sector type
pub struct TrackMapGenerator {
    config: TrackMapConfig,
}

impl TrackMapGenerator {
    pub fn new() -> Self {
        Self::with_config(TrackMapConfig::default())
    }

    pub fn with_config(config: TrackMapConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrackMapConfig {
        &self.config
    }

    pub fn generate_svg(&self, layout: &TrackLayout) -> Result<String, LapwiseError> {
        if layout.points.len() < 2 {
            return Err(LapwiseError::SvgGenerationError {
                reason: format!(
                    "Need at least 2 points to draw a track, got {}",
                    layout.points.len()
                ),
            });
        }
        if self.config.stroke_width <= 0.0 || self.config.stroke_width > 50.0 {
            return Err(LapwiseError::SvgGenerationError {
                reason: format!(
                    "Invalid stroke width: {} (must be 0.1-50.0)",
                    self.config.stroke_width
                ),
            });
        }
        let positions = layout.positions();
        if positions.iter().any(|p| !p.is_finite()) {
            return Err(LapwiseError::SvgGenerationError {
                reason: "Layout has non-finite coordinates".to_string(),
            });
        }

        let canvas = self.fit_to_canvas(&positions);
        let (width, height) = self.config.canvas_size;
        let mut svg = String::with_capacity(1024 + canvas.len() * 20);
        svg.push_str(&format!(
            r#"<svg width="{width}" height="{height}" xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {width} {height}">
  <title>{}</title>
  <defs>
    <style>
      .track-line {{ stroke-width: {:.2}; fill: none; stroke-linecap: round; stroke-linejoin: round; }}
      .start-marker {{ fill: #fff; stroke: #000; stroke-width: 1; }}
    </style>
  </defs>"#,
            escape(&layout.name),
            self.config.stroke_width
        ));

        for sector in &layout.sectors {
            // include the next point so consecutive sectors join up
            let indices: Vec<usize> = layout
                .points
                .iter()
                .enumerate()
                .filter(|(_, point)| point.sector == sector.id)
                .map(|(i, _)| i)
                .collect();
            let (Some(&first), Some(&last)) = (indices.first(), indices.last()) else {
                debug!("Sector {} has no points to draw", sector.id);
                continue;
            };
            let end = (last + 1).min(canvas.len() - 1);
            let path = canvas[first..=end]
                .iter()
                .map(|p| format!("{:.2},{:.2}", p.x, p.y))
                .collect::<Vec<_>>()
                .join(" ");
            svg.push_str(&format!(
                "\n  <polyline class=\"track-line {}\" stroke=\"{}\" data-sector=\"{}\" points=\"{}\" />",
                sector_class(sector.sector_type),
                sector_colour(sector.sector_type),
                sector.id,
                path
            ));
        }

        let start = canvas[0];
        svg.push_str(&format!(
            "\n  <circle class=\"start-marker\" cx=\"{:.2}\" cy=\"{:.2}\" r=\"{:.2}\" />",
            start.x,
            start.y,
            self.config.stroke_width * 2.0
        ));
        if layout.is_synthesized() {
            svg.push_str("\n  <!-- Synthesized placeholder layout, not recorded geometry -->");
        }
        svg.push_str("\n</svg>");

        debug!(
            "Generated SVG with {} characters for {}",
            svg.len(),
            layout.name
        );
        Ok(svg)
    }

    /// Uniform scale into the canvas margins, centred, with y pointing up
    fn fit_to_canvas(&self, points: &[Point2D]) -> Vec<Point2D> {
        let bbox = BoundingBox::from_points(points);
        let (width, height) = (
            self.config.canvas_size.0 as f64,
            self.config.canvas_size.1 as f64,
        );
        let usable_width = width * (1.0 - 2.0 * self.config.margin_percentage);
        let usable_height = height * (1.0 - 2.0 * self.config.margin_percentage);

        let scale = match (bbox.width() > EPSILON, bbox.height() > EPSILON) {
            (true, true) => (usable_width / bbox.width()).min(usable_height / bbox.height()),
            (true, false) => usable_width / bbox.width(),
            (false, true) => usable_height / bbox.height(),
            (false, false) => {
                warn!("Track has no extent, drawing it as a point");
                1.0
            }
        };
        let center = bbox.center();
        points
            .iter()
            .map(|p| {
                Point2D::new(
                    width / 2.0 + (p.x - center.x) * scale,
                    height / 2.0 - (p.y - center.y) * scale,
                )
            })
            .collect()
    }
}

impl Default for TrackMapGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisThresholds;
    use crate::track::TrackReconstructor;
    use crate::track::types::Direction;

    fn square_trace() -> Vec<Point2D> {
        let mut points = Vec::new();
        for i in 0..50 {
            points.push(Point2D::new(i as f64 * 10.0, 0.0));
        }
        for i in 0..50 {
            points.push(Point2D::new(500.0, i as f64 * 10.0));
        }
        for i in 0..50 {
            points.push(Point2D::new(500.0 - i as f64 * 10.0, 500.0));
        }
        points
    }

    #[test]
    fn test_generate_svg_from_layout() {
        let thresholds = AnalysisThresholds::default();
        let layout = TrackReconstructor::new(&thresholds)
            .reconstruct("Square <Test>", &square_trace(), None)
            .unwrap();
        let svg = TrackMapGenerator::new().generate_svg(&layout).unwrap();

        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("Square &lt;Test&gt;"));
        assert_eq!(svg.matches("<polyline").count(), 3);
        assert!(svg.contains("start-marker"));
        assert!(!svg.contains("placeholder"));
    }

    #[test]
    fn test_points_fit_inside_margins() {
        let generator = TrackMapGenerator::new();
        let canvas = generator.fit_to_canvas(&square_trace());
        for p in &canvas {
            assert!(p.x >= 80.0 - 1e-9 && p.x <= 720.0 + 1e-9);
            assert!(p.y >= 60.0 - 1e-9 && p.y <= 540.0 + 1e-9);
        }
        // north is up: the first point (y = 0) is drawn below the last (y = 500)
        assert!(canvas[0].y > canvas[149].y);
    }

    #[test]
    fn test_synthesized_layout_is_marked() {
        let thresholds = AnalysisThresholds::default();
        let layout = TrackReconstructor::new(&thresholds).synthesize(
            "unknown_track",
            5000.0,
            Direction::Clockwise,
        );
        let svg = TrackMapGenerator::new().generate_svg(&layout).unwrap();
        assert!(svg.contains("placeholder"));
        assert!(svg.contains("class=\"track-line mixed\""));
    }

    #[test]
    fn test_invalid_input() {
        let thresholds = AnalysisThresholds::default();
        let mut layout =
            TrackReconstructor::new(&thresholds).synthesize("x", 1000.0, Direction::Clockwise);
        let generator = TrackMapGenerator::with_config(TrackMapConfig {
            stroke_width: 0.0,
            ..Default::default()
        });
        assert!(generator.generate_svg(&layout).is_err());

        layout.points.truncate(1);
        assert!(matches!(
            TrackMapGenerator::new().generate_svg(&layout),
            Err(LapwiseError::SvgGenerationError { .. })
        ));
    }
}
