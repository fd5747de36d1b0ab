use serde::Serialize;

use crate::analysis::LapAnalysis;
use crate::config::InsightThresholds;
use crate::session::{SessionOverview, Trend};
use crate::telemetry::signal;

pub mod recommendations;
pub use recommendations::{RecommendationEngine, SetupCategory, SetupIssue, SetupRecommendation};

/// Minimum timed laps before lap time consistency is judged
const MIN_LAPS_FOR_CONSISTENCY: usize = 3;
/// Minimum timed laps before first and second half of a session are compared
const MIN_LAPS_FOR_PROGRESS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Area of driving an insight is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightCategory {
    Consistency,
    Progress,
    Trend,
    Throttle,
    Braking,
    Handling,
}

impl std::fmt::Display for InsightCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InsightCategory::Consistency => write!(f, "Consistency"),
            InsightCategory::Progress => write!(f, "Progress"),
            InsightCategory::Trend => write!(f, "Trend"),
            InsightCategory::Throttle => write!(f, "Throttle"),
            InsightCategory::Braking => write!(f, "Braking"),
            InsightCategory::Handling => write!(f, "Handling"),
        }
    }
}

/// A rule-based observation about the driver's session.
///
/// Insights are regenerated on every analysis pass and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriverInsight {
    pub category: InsightCategory,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub recommendation: String,
    /// The measurements that triggered the insight
    pub data_points: Vec<f64>,
}

/// Evaluates fixed thresholds against the session and lap analyses.
///
/// Every rule is evaluated on its own: an insight is never dropped because another
/// one fired.
pub struct InsightGenerator<'a> {
    thresholds: &'a InsightThresholds,
}

impl<'a> InsightGenerator<'a> {
    pub fn new(thresholds: &'a InsightThresholds) -> Self {
        Self { thresholds }
    }

    pub fn generate(&self, overview: &SessionOverview, laps: &[LapAnalysis]) -> Vec<DriverInsight> {
        let lap_times: Vec<f64> = laps
            .iter()
            .filter(|lap| lap.is_timed())
            .map(|lap| lap.lap_time)
            .collect();

        let mut insights = Vec::new();
        insights.extend(self.consistency_insight(&lap_times));
        insights.extend(self.progress_insight(&lap_times));
        insights.extend(self.trend_insight(overview, &lap_times));
        for lap in laps.iter().filter(|lap| lap.valid) {
            insights.extend(self.throttle_insight(lap));
            insights.extend(self.braking_insight(lap));
            insights.extend(self.handling_insights(lap));
        }
        insights
    }

    fn consistency_insight(&self, lap_times: &[f64]) -> Option<DriverInsight> {
        if lap_times.len() < MIN_LAPS_FOR_CONSISTENCY {
            return None;
        }
        let mean = signal::mean(lap_times);
        let std_dev = signal::std_dev(lap_times);
        let score = (1.0 - std_dev / mean) * 100.0;
        if score >= self.thresholds.consistency_warning {
            return None;
        }

        Some(DriverInsight {
            category: InsightCategory::Consistency,
            title: "Inconsistent lap times".to_string(),
            description: format!(
                "Lap times vary by {std_dev:.2}s around an average of {mean:.2}s (consistency {score:.1}%)"
            ),
            severity: if score < self.thresholds.consistency_critical {
                Severity::Critical
            } else {
                Severity::Warning
            },
            recommendation: "Focus on repeating the same braking points and lines every lap"
                .to_string(),
            data_points: lap_times.to_vec(),
        })
    }

    fn progress_insight(&self, lap_times: &[f64]) -> Option<DriverInsight> {
        if lap_times.len() < MIN_LAPS_FOR_PROGRESS {
            return None;
        }
        let (first_half, second_half) = lap_times.split_at(lap_times.len() / 2);
        let first = signal::mean(first_half);
        let second = signal::mean(second_half);
        let improvement = first - second;
        if improvement <= self.thresholds.improvement_seconds {
            return None;
        }

        Some(DriverInsight {
            category: InsightCategory::Progress,
            title: "Pace improved during the session".to_string(),
            description: format!(
                "Second half laps averaged {second:.2}s, {improvement:.2}s quicker than the first half"
            ),
            severity: Severity::Info,
            recommendation: "Keep building on the changes made during the session".to_string(),
            data_points: vec![first, second],
        })
    }

    fn trend_insight(&self, overview: &SessionOverview, lap_times: &[f64]) -> Option<DriverInsight> {
        if overview.improvement_trend != Trend::Declining {
            return None;
        }
        Some(DriverInsight {
            category: InsightCategory::Trend,
            title: "Lap times are getting slower".to_string(),
            description: "Lap times rise steadily over the session".to_string(),
            severity: Severity::Warning,
            recommendation: "Check tire wear and fatigue, consider a break or a fresh set"
                .to_string(),
            data_points: lap_times.to_vec(),
        })
    }

    fn throttle_insight(&self, lap: &LapAnalysis) -> Option<DriverInsight> {
        let throttle = lap.throttle_analysis.as_option()?;
        if throttle.full_throttle_percentage >= self.thresholds.low_full_throttle_pct
            || throttle.avg_throttle >= self.thresholds.low_avg_throttle
        {
            return None;
        }
        Some(DriverInsight {
            category: InsightCategory::Throttle,
            title: format!("Throttle under-used on lap {}", lap.lap_number),
            description: format!(
                "Full throttle for {:.1}% of the lap with an average of {:.1}%",
                throttle.full_throttle_percentage, throttle.avg_throttle
            ),
            severity: Severity::Info,
            recommendation: "Get back to full throttle earlier on corner exit".to_string(),
            data_points: vec![throttle.full_throttle_percentage, throttle.avg_throttle],
        })
    }

    fn braking_insight(&self, lap: &LapAnalysis) -> Option<DriverInsight> {
        let brake = lap.brake_analysis.as_option()?;
        if brake.max_brake_pressure <= self.thresholds.heavy_brake_pressure
            || brake.braking_events <= self.thresholds.heavy_brake_events
        {
            return None;
        }
        Some(DriverInsight {
            category: InsightCategory::Braking,
            title: format!("Aggressive braking on lap {}", lap.lap_number),
            description: format!(
                "{} braking events with pressure peaking at {:.1}",
                brake.braking_events, brake.max_brake_pressure
            ),
            severity: Severity::Warning,
            recommendation: "Brake progressively and release smoothly into the corner".to_string(),
            data_points: vec![brake.max_brake_pressure, brake.braking_events as f64],
        })
    }

    fn handling_insights(&self, lap: &LapAnalysis) -> Vec<DriverInsight> {
        let Some(steering) = lap.steering_analysis.as_option() else {
            return Vec::new();
        };

        let mut insights = Vec::new();
        if steering.understeer_indicator > self.thresholds.understeer_pct {
            insights.push(DriverInsight {
                category: InsightCategory::Handling,
                title: format!("Understeer on lap {}", lap.lap_number),
                description: format!(
                    "{:.1}% of high steering inputs produced little lateral grip",
                    steering.understeer_indicator
                ),
                severity: Severity::Warning,
                recommendation: "Slow the entry speed and wait for the front to bite before adding lock"
                    .to_string(),
                data_points: vec![steering.understeer_indicator],
            });
        }
        if steering.oversteer_indicator > self.thresholds.oversteer_per_minute {
            insights.push(DriverInsight {
                category: InsightCategory::Handling,
                title: format!("Oversteer on lap {}", lap.lap_number),
                description: format!(
                    "{:.1} steering corrections per minute",
                    steering.oversteer_indicator
                ),
                severity: Severity::Warning,
                recommendation: "Be smoother on throttle and brake release to keep the rear settled"
                    .to_string(),
                data_points: vec![steering.oversteer_indicator],
            });
        }
        insights
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisThresholds;
    use crate::telemetry::{Analysis, SessionMetadata, SteeringAnalysis, ThrottleAnalysis};

    fn timed_laps(times: &[f64]) -> Vec<LapAnalysis> {
        times
            .iter()
            .enumerate()
            .map(|(i, t)| LapAnalysis::empty(i as u32 + 1, *t))
            .collect()
    }

    fn generate(laps: &[LapAnalysis]) -> Vec<DriverInsight> {
        let thresholds = AnalysisThresholds::default();
        let overview = SessionOverview::new(&SessionMetadata::default(), laps, &thresholds);
        InsightGenerator::new(&thresholds.insights).generate(&overview, laps)
    }

    fn valid_lap(number: u32) -> LapAnalysis {
        LapAnalysis {
            valid: true,
            ..LapAnalysis::empty(number, 90.0)
        }
    }

    #[test]
    fn test_consistent_session_has_no_consistency_insight() {
        let insights = generate(&timed_laps(&[90.0, 90.2, 89.9, 90.1]));
        assert!(
            insights
                .iter()
                .all(|insight| insight.category != InsightCategory::Consistency)
        );
    }

    #[test]
    fn test_inconsistent_session() {
        let insights = generate(&timed_laps(&[90.0, 100.0, 85.0]));
        let consistency = insights
            .iter()
            .find(|insight| insight.category == InsightCategory::Consistency)
            .expect("consistency insight");
        assert_eq!(consistency.severity, Severity::Warning);
        assert_eq!(consistency.data_points, vec![90.0, 100.0, 85.0]);
    }

    #[test]
    fn test_progress_and_consistency_are_independent() {
        // big improvement also makes the session inconsistent, both insights must appear
        let insights = generate(&timed_laps(&[110.0, 108.0, 100.0, 92.0, 90.0, 89.0]));
        let categories: Vec<InsightCategory> =
            insights.iter().map(|insight| insight.category).collect();
        assert!(categories.contains(&InsightCategory::Progress));
        assert!(categories.contains(&InsightCategory::Consistency));
        assert!(!categories.contains(&InsightCategory::Trend));
    }

    #[test]
    fn test_declining_trend_warns() {
        let insights = generate(&timed_laps(&[90.0, 90.5, 91.0, 91.5, 92.0]));
        let trend = insights
            .iter()
            .find(|insight| insight.category == InsightCategory::Trend)
            .expect("trend insight");
        assert_eq!(trend.severity, Severity::Warning);
    }

    #[test]
    fn test_handling_insights_name_the_lap() {
        let mut lap = valid_lap(4);
        lap.steering_analysis = Analysis::Available(SteeringAnalysis {
            max_steering_angle: 120.0,
            avg_steering_angle: 30.0,
            steering_smoothness: 80.0,
            steering_corrections: 40,
            lock_to_lock_time: 0.0,
            understeer_indicator: 55.0,
            oversteer_indicator: 40.0,
        });
        let insights = generate(&[lap]);
        let titles: Vec<&str> = insights.iter().map(|i| i.title.as_str()).collect();
        assert!(titles.contains(&"Understeer on lap 4"));
        assert!(titles.contains(&"Oversteer on lap 4"));
    }

    #[test]
    fn test_throttle_insight() {
        let mut lap = valid_lap(2);
        lap.throttle_analysis = Analysis::Available(ThrottleAnalysis {
            full_throttle_percentage: 40.0,
            partial_throttle_percentage: 40.0,
            off_throttle_percentage: 20.0,
            avg_throttle: 60.0,
            max_throttle: 100.0,
            throttle_smoothness: 90.0,
            application_rate: 10.0,
            lift_and_coast_events: 0,
        });
        let insights = generate(&[lap]);
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].category, InsightCategory::Throttle);
        assert_eq!(insights[0].severity, Severity::Info);
    }
}
