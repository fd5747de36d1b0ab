use std::collections::HashMap;

use itertools::Itertools;
use log::debug;

use crate::analysis::LapAnalysis;
use crate::config::InsightThresholds;
use crate::session::SessionOverview;
use crate::telemetry::signal;

/// Car behaviours detected across a session that a setup change can address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetupIssue {
    /// Large steering inputs that produce little lateral grip
    Understeer,
    /// Frequent steering corrections
    Oversteer,
    /// Little speed shed per unit of brake applied
    PoorBrakingEfficiency,
    /// Top speed below what the straights allow
    LowTopSpeed,
    /// Top speed so high that downforce is probably missing in the corners
    HighTopSpeed,
    /// Lap times scatter too much
    InconsistentLapTimes,
}

impl std::fmt::Display for SetupIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SetupIssue::Understeer => write!(f, "Understeer"),
            SetupIssue::Oversteer => write!(f, "Oversteer"),
            SetupIssue::PoorBrakingEfficiency => write!(f, "Poor Braking Efficiency"),
            SetupIssue::LowTopSpeed => write!(f, "Low Top Speed"),
            SetupIssue::HighTopSpeed => write!(f, "High Top Speed"),
            SetupIssue::InconsistentLapTimes => write!(f, "Inconsistent Lap Times"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetupCategory {
    /// Wings and downforce level
    Aerodynamics,
    /// Springs and anti-roll bars
    Suspension,
    /// Brake bias and pressure
    Brakes,
    /// Electronic aids (TC, ABS)
    Electronics,
}

impl std::fmt::Display for SetupCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SetupCategory::Aerodynamics => write!(f, "Aero"),
            SetupCategory::Suspension => write!(f, "Suspension"),
            SetupCategory::Brakes => write!(f, "Brakes"),
            SetupCategory::Electronics => write!(f, "Electronics"),
        }
    }
}

/// A single parameter adjustment
#[derive(Debug, Clone, PartialEq)]
pub struct SetupRecommendation {
    pub category: SetupCategory,
    /// The parameter to adjust (e.g., "Front Wing")
    pub parameter: String,
    /// Direction of the change (e.g., "Increase")
    pub adjustment: String,
    pub description: String,
    /// 1-5, where 5 is the highest priority
    pub priority: u8,
}

impl std::fmt::Display for SetupRecommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} {} - {}",
            self.category, self.adjustment, self.parameter, self.description
        )
    }
}

fn recommendation(
    category: SetupCategory,
    parameter: &str,
    adjustment: &str,
    description: &str,
    priority: u8,
) -> SetupRecommendation {
    SetupRecommendation {
        category,
        parameter: parameter.to_string(),
        adjustment: adjustment.to_string(),
        description: description.to_string(),
        priority,
    }
}

/// Maps detected setup issues to the adjustments that address them.
pub struct RecommendationEngine {
    recommendation_map: HashMap<SetupIssue, Vec<SetupRecommendation>>,
}

impl RecommendationEngine {
    pub fn new() -> Self {
        Self {
            recommendation_map: Self::build_recommendation_map(),
        }
    }

    fn build_recommendation_map() -> HashMap<SetupIssue, Vec<SetupRecommendation>> {
        let mut map = HashMap::new();

        map.insert(
            SetupIssue::Understeer,
            vec![
                recommendation(
                    SetupCategory::Aerodynamics,
                    "Front Wing",
                    "Increase",
                    "More front downforce helps the car turn in",
                    5,
                ),
                recommendation(
                    SetupCategory::Aerodynamics,
                    "Rear Wing",
                    "Reduce",
                    "Less rear downforce shifts the aero balance forward",
                    4,
                ),
                recommendation(
                    SetupCategory::Suspension,
                    "Front Antirollbar",
                    "Soften",
                    "A softer front bar gives the front tires more mechanical grip",
                    3,
                ),
            ],
        );

        map.insert(
            SetupIssue::Oversteer,
            vec![
                recommendation(
                    SetupCategory::Aerodynamics,
                    "Rear Wing",
                    "Increase",
                    "More rear downforce stabilises the rear in fast corners",
                    5,
                ),
                recommendation(
                    SetupCategory::Suspension,
                    "Rear Antirollbar",
                    "Soften",
                    "A softer rear bar lets the rear tires keep grip over kerbs and bumps",
                    4,
                ),
                recommendation(
                    SetupCategory::Electronics,
                    "Traction Control",
                    "Increase",
                    "More traction control limits wheelspin on corner exit",
                    3,
                ),
            ],
        );

        map.insert(
            SetupIssue::PoorBrakingEfficiency,
            vec![
                recommendation(
                    SetupCategory::Brakes,
                    "Brake Bias",
                    "Adjust",
                    "Balance the brakes so both axles work near their limit",
                    5,
                ),
                recommendation(
                    SetupCategory::Brakes,
                    "Brake Pressure",
                    "Increase",
                    "More pressure sheds speed faster for the same pedal input",
                    3,
                ),
            ],
        );

        map.insert(
            SetupIssue::LowTopSpeed,
            vec![recommendation(
                SetupCategory::Aerodynamics,
                "Downforce",
                "Reduce",
                "Less wing angle cuts drag on the straights",
                4,
            )],
        );

        map.insert(
            SetupIssue::HighTopSpeed,
            vec![recommendation(
                SetupCategory::Aerodynamics,
                "Downforce",
                "Increase",
                "There is speed to spare, trade some for cornering grip",
                3,
            )],
        );

        map.insert(
            SetupIssue::InconsistentLapTimes,
            vec![
                recommendation(
                    SetupCategory::Suspension,
                    "Springs",
                    "Soften",
                    "A more compliant car is easier to drive at the limit every lap",
                    3,
                ),
                recommendation(
                    SetupCategory::Electronics,
                    "ABS",
                    "Increase",
                    "More ABS makes braking points easier to repeat",
                    2,
                ),
            ],
        );

        map
    }

    pub fn get_recommendations(&self, issue: &SetupIssue) -> Vec<SetupRecommendation> {
        self.recommendation_map
            .get(issue)
            .cloned()
            .unwrap_or_default()
    }

    /// Looks for setup issues across every valid lap of the session
    pub fn detect_issues(
        &self,
        overview: &SessionOverview,
        laps: &[LapAnalysis],
        thresholds: &InsightThresholds,
    ) -> Vec<SetupIssue> {
        let mut issues = Vec::new();
        let steering: Vec<_> = laps
            .iter()
            .filter_map(|lap| lap.steering_analysis.as_option())
            .collect();

        if steering
            .iter()
            .any(|s| s.understeer_indicator > thresholds.understeer_pct)
        {
            issues.push(SetupIssue::Understeer);
        }
        if steering
            .iter()
            .any(|s| s.oversteer_indicator > thresholds.oversteer_per_minute)
        {
            issues.push(SetupIssue::Oversteer);
        }

        // laps without braking zones report zero efficiency and say nothing about the brakes
        let efficiencies: Vec<f64> = laps
            .iter()
            .filter_map(|lap| lap.brake_analysis.as_option())
            .map(|brake| brake.braking_efficiency)
            .filter(|efficiency| *efficiency > 0.0)
            .collect();
        if !efficiencies.is_empty() && signal::mean(&efficiencies) < thresholds.low_braking_efficiency
        {
            issues.push(SetupIssue::PoorBrakingEfficiency);
        }

        let top_speed = laps
            .iter()
            .filter_map(|lap| lap.speed_analysis.as_option())
            .map(|speed| speed.max_speed)
            .max_by(f64::total_cmp);
        if let Some(top_speed) = top_speed {
            if top_speed < thresholds.low_top_speed {
                issues.push(SetupIssue::LowTopSpeed);
            } else if top_speed > thresholds.high_top_speed {
                issues.push(SetupIssue::HighTopSpeed);
            }
        }

        if overview.valid_laps >= 3
            && let Some(index) = overview.consistency_index
            && 100.0 - index < thresholds.consistency_warning
        {
            issues.push(SetupIssue::InconsistentLapTimes);
        }

        debug!("Detected setup issues: {issues:?}");
        issues
    }

    /// Sorts recommendations by priority and keeps one adjustment per parameter.
    ///
    /// When two issues ask for the same parameter to move in opposite directions the
    /// higher-priority adjustment wins; on equal priority the first detected issue wins.
    pub fn resolve_conflicts(
        recommendations: Vec<SetupRecommendation>,
    ) -> Vec<SetupRecommendation> {
        let mut kept: Vec<SetupRecommendation> = Vec::new();
        for rec in recommendations
            .into_iter()
            .sorted_by(|a, b| b.priority.cmp(&a.priority))
        {
            match kept
                .iter()
                .find(|k| k.category == rec.category && k.parameter == rec.parameter)
            {
                Some(existing) if existing.adjustment != rec.adjustment => debug!(
                    "Dropping '{} {}', conflicts with higher priority '{} {}'",
                    rec.adjustment, rec.parameter, existing.adjustment, existing.parameter
                ),
                Some(_) => {}
                None => kept.push(rec),
            }
        }
        kept
    }

    /// Human-readable recommendations, highest priority first, without duplicates or
    /// contradicting adjustments
    pub fn recommend(
        &self,
        overview: &SessionOverview,
        laps: &[LapAnalysis],
        thresholds: &InsightThresholds,
    ) -> Vec<String> {
        let recommendations = self
            .detect_issues(overview, laps, thresholds)
            .iter()
            .flat_map(|issue| self.get_recommendations(issue))
            .collect();
        Self::resolve_conflicts(recommendations)
            .iter()
            .map(|rec| rec.to_string())
            .unique()
            .collect()
    }
}

impl Default for RecommendationEngine {
    fn default() -> Self {
        Self::new()
    }
}
