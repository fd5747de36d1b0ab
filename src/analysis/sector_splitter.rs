// Splits a lap into sectors and re-runs the speed analysis on each of them

use serde::Serialize;

use crate::config::AnalysisThresholds;
use crate::telemetry::signal;
use crate::telemetry::{Analysis, Channel, ChannelAnalyzer, ChannelSet, SpeedAnalysis, SpeedAnalyzer};

/// How the sample ranges of a split were chosen
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitPolicy {
    /// Known sector boundaries matched against the distance driven
    TrackDistance,
    /// Boundaries placed on the elapsed lap time
    ElapsedTime,
    /// Boundaries placed on the sample count when the lap has no time channel
    SampleCount,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SectorResult {
    /// 1-based
    pub sector_number: usize,
    pub start_index: usize,
    /// Exclusive
    pub end_index: usize,
    pub speed_analysis: Analysis<SpeedAnalysis>,
    /// Seconds spent in the sector
    pub time_estimate: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SectorSplit {
    pub policy: SplitPolicy,
    pub sectors: Vec<SectorResult>,
    /// Sector with the highest average speed
    pub best_sector: Option<usize>,
    /// Consistency of the average speed across sectors
    pub sector_consistency: f64,
}

impl SectorSplit {
    pub fn sector_times(&self) -> Vec<f64> {
        self.sectors
            .iter()
            .map(|sector| sector.time_estimate)
            .collect()
    }
}

/// Splits one lap into contiguous sample ranges.
///
/// `boundaries` are the sector ends as fractions of the lap length (the final 1.0 excluded),
/// typically taken from a reconstructed track. Without them the lap is cut into
/// `thresholds.sector_count` equal parts of elapsed time.
pub struct SectorSplitter<'a> {
    thresholds: &'a AnalysisThresholds,
    boundaries: Option<&'a [f64]>,
}

impl<'a> SectorSplitter<'a> {
    pub fn new(thresholds: &'a AnalysisThresholds) -> Self {
        Self {
            thresholds,
            boundaries: None,
        }
    }

    pub fn with_boundaries(mut self, boundaries: &'a [f64]) -> Self {
        self.boundaries = Some(boundaries);
        self
    }

    pub fn split(&self, channels: &ChannelSet, lap_time: f64) -> Analysis<SectorSplit> {
        let fractions: Vec<f64> = match self.boundaries {
            Some(boundaries) => boundaries
                .iter()
                .copied()
                .filter(|fraction| *fraction > 0.0 && *fraction < 1.0)
                .collect(),
            None => {
                let count = self.thresholds.sector_count.max(1);
                (1..count).map(|k| k as f64 / count as f64).collect()
            }
        };
        let sector_count = fractions.len() + 1;
        let n = channels.len();
        if n < sector_count {
            return Analysis::Unavailable;
        }

        let (policy, progress) = self.progress(channels);
        let cuts = cut_indices(&progress, &fractions);
        let ranges: Vec<(usize, usize)> = std::iter::once(0)
            .chain(cuts.iter().copied())
            .zip(cuts.iter().copied().chain(std::iter::once(n)))
            .collect();

        let sectors: Vec<SectorResult> = ranges
            .iter()
            .enumerate()
            .map(|(i, &(start, end))| {
                let sector = channels.slice(start..end);
                SectorResult {
                    sector_number: i + 1,
                    start_index: start,
                    end_index: end,
                    speed_analysis: SpeedAnalyzer.analyze(&sector, self.thresholds),
                    time_estimate: self.sector_time(channels, start, end, lap_time),
                }
            })
            .collect();

        let sector_speeds: Vec<(usize, f64)> = sectors
            .iter()
            .filter_map(|sector| {
                sector
                    .speed_analysis
                    .as_option()
                    .map(|speed| (sector.sector_number, speed.avg_speed))
            })
            .collect();
        let best_sector = sector_speeds
            .iter()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(number, _)| *number);
        let averages: Vec<f64> = sector_speeds.iter().map(|(_, speed)| *speed).collect();

        Analysis::Available(SectorSplit {
            policy,
            sectors,
            best_sector,
            sector_consistency: signal::consistency(&averages, self.thresholds.speed.consistency_k),
        })
    }

    /// Lap progress in `[0, 1]` at each sample
    fn progress(&self, channels: &ChannelSet) -> (SplitPolicy, Vec<f64>) {
        let n = channels.len();
        let default_hz = self.thresholds.default_sample_rate_hz;

        if self.boundaries.is_some() && channels.is_present(Channel::Speed) {
            let distance = channels.cumulative_distance(self.thresholds.speed_unit, default_hz);
            if let Some(total) = distance.last().copied().filter(|total| *total > signal::EPSILON)
            {
                return (
                    SplitPolicy::TrackDistance,
                    distance.iter().map(|d| d / total).collect(),
                );
            }
        }

        let time = channels.time();
        if let (Some(first), Some(last)) = (time.first(), time.last())
            && last > first
        {
            let duration = last - first;
            return (
                SplitPolicy::ElapsedTime,
                time.iter().map(|t| (t - first) / duration).collect(),
            );
        }

        (
            SplitPolicy::SampleCount,
            (0..n).map(|i| i as f64 / n as f64).collect(),
        )
    }

    fn sector_time(&self, channels: &ChannelSet, start: usize, end: usize, lap_time: f64) -> f64 {
        let n = channels.len();
        let time = channels.time();
        if channels.is_present(Channel::Time) && time[n - 1] > time[0] {
            // the next sector starts where this one ends, the last one at the final sample
            let exit = end.min(n - 1);
            return (time[exit] - time[start]).max(0.0);
        }
        let samples = (end - start) as f64;
        if lap_time > 0.0 {
            lap_time * samples / n as f64
        } else {
            samples / channels.sample_rate_hz(self.thresholds.default_sample_rate_hz)
        }
    }
}

/// First sample reaching each fraction, forced strictly increasing so no sector is empty
fn cut_indices(progress: &[f64], fractions: &[f64]) -> Vec<usize> {
    let n = progress.len();
    let sector_count = fractions.len() + 1;
    let mut cuts = Vec::with_capacity(fractions.len());
    let mut previous = 0;

    for (k, fraction) in fractions.iter().enumerate() {
        let reached = progress
            .iter()
            .position(|p| *p >= *fraction)
            .unwrap_or(n);
        // leave at least one sample for each of the remaining sectors
        let latest = n - (sector_count - k - 1);
        let cut = reached.clamp(previous + 1, latest);
        cuts.push(cut);
        previous = cut;
    }
    cuts
}
