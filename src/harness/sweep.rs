//! Pattern sweep orchestration and the sweep report.
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use super::monitor::{monitor, WindowResult};
use super::stimulus;
use super::testbench::{HarnessWarning, Testbench};
use crate::error::HarnessError;

/// The monitoring window of the default patterns, in cycles.
pub const DEFAULT_DURATION: u64 = 1000;

/// A named stimulus configuration and its monitoring window.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct PatternConfig {
    pub name: String,
    /// Firing-pattern selector, 0–7.
    pub pattern_id: u32,
    /// Base input current, 0–31.
    pub base_current: u32,
    /// Inter-neuron coupling strength, 0–255.
    pub coupling: u32,
    /// The monitoring window, in cycles.
    pub duration: u64,
}

impl PatternConfig {
    pub fn new(
        name: &str,
        pattern_id: u32,
        base_current: u32,
        coupling: u32,
        duration: u64,
    ) -> Self {
        PatternConfig {
            name: name.to_string(),
            pattern_id,
            base_current,
            coupling,
            duration,
        }
    }

    /// Returns the `(ui_in, uio_in)` bus values of the pattern.
    pub fn encode(&self) -> (u8, u8) {
        stimulus::encode(self.pattern_id, self.base_current, self.coupling)
    }
}

/// The five firing patterns of the ring, monitored for [`DEFAULT_DURATION`] cycles each.
pub fn default_patterns() -> Vec<PatternConfig> {
    vec![
        PatternConfig::new("Independent", 0, 12, 0, DEFAULT_DURATION),
        PatternConfig::new("Wave", 1, 16, 160, DEFAULT_DURATION),
        PatternConfig::new("Synchronous", 2, 20, 64, DEFAULT_DURATION),
        PatternConfig::new("Clustered", 3, 18, 96, DEFAULT_DURATION),
        PatternConfig::new("Burst", 4, 24, 32, DEFAULT_DURATION),
    ]
}

pub fn save_patterns<P: AsRef<Path>>(
    patterns: &[PatternConfig],
    path: P,
) -> Result<(), HarnessError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, patterns)?;
    writer.flush()?;
    Ok(())
}

pub fn load_patterns<P: AsRef<Path>>(path: P) -> Result<Vec<PatternConfig>, HarnessError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}

/// The outcome of one pattern of the sweep.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct PatternResult {
    pub config: PatternConfig,
    pub window: WindowResult,
    pub warnings: Vec<HarnessWarning>,
    /// False if the session failed before the window covered the whole pattern duration.
    pub complete: bool,
}

/// Totals accumulated over the sweep, in sweep order.
#[derive(Debug, PartialEq, Eq, Clone, Default, Serialize, Deserialize)]
pub struct SweepReport {
    pub total_spikes: u64,
    pub total_transitions: u64,
    pub patterns: Vec<PatternResult>,
}

impl SweepReport {
    pub fn new() -> Self {
        SweepReport::default()
    }

    /// Add the result of one pattern to the totals. A window shorter than the pattern duration is
    /// recorded as incomplete.
    pub fn record(
        &mut self,
        config: PatternConfig,
        window: WindowResult,
        warnings: Vec<HarnessWarning>,
    ) {
        self.total_spikes += window.spike_count;
        self.total_transitions += window.transition_count;
        let complete = window.cycles >= config.duration;
        self.patterns.push(PatternResult {
            config,
            window,
            warnings,
            complete,
        });
    }

    /// Returns the result of the pattern with the given name, if it ran.
    pub fn pattern(&self, name: &str) -> Option<&PatternResult> {
        self.patterns.iter().find(|p| p.config.name == name)
    }

    /// Returns all warnings raised during the sweep.
    pub fn warnings(&self) -> impl Iterator<Item = &HarnessWarning> + '_ {
        self.patterns.iter().flat_map(|p| p.warnings.iter())
    }

    /// One line per pattern, then the totals.
    pub fn summary(&self) -> String {
        let lines = self
            .patterns
            .iter()
            .map(|p| {
                format!(
                    "{:<12} spikes={:<6} transitions={:<6} onsets={:<6} ambiguous={}{}",
                    p.config.name,
                    p.window.spike_count,
                    p.window.transition_count,
                    p.window.onsets,
                    p.window.ambiguous,
                    if p.complete { "" } else { " (incomplete)" }
                )
            })
            .join("\n");
        format!(
            "{}\nTOTAL        spikes={:<6} transitions={}",
            lines, self.total_spikes, self.total_transitions
        )
    }

    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), HarnessError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }
}

/// Runs a list of patterns one after the other.
#[derive(Debug, PartialEq, Clone)]
pub struct PatternSweep {
    patterns: Vec<PatternConfig>,
    inter_pattern_cycles: u64,
}

impl PatternSweep {
    pub fn new(patterns: Vec<PatternConfig>, inter_pattern_cycles: u64) -> Self {
        PatternSweep {
            patterns,
            inter_pattern_cycles,
        }
    }

    pub fn patterns(&self) -> &[PatternConfig] {
        &self.patterns[..]
    }

    /// For each pattern in order: apply its stimulus, monitor it for its duration, record the
    /// result in `report`, then hold `inter_pattern_cycles` cycles without sampling.
    ///
    /// Results are recorded as soon as a window completes, so `report` keeps the partial totals
    /// if the sweep fails. The window in progress at that point stays on the testbench.
    pub async fn run(
        &self,
        tb: &Testbench,
        report: &RefCell<SweepReport>,
    ) -> Result<(), HarnessError> {
        log::info!(
            "{} sweep over {}",
            tb.sim().now(),
            self.patterns.iter().map(|p| p.name.as_str()).join(", ")
        );
        for config in self.patterns.iter() {
            log::info!(
                "{} pattern {} (id={}, current={}, coupling={}) for {} cycles",
                tb.sim().now(),
                config.name,
                config.pattern_id,
                config.base_current,
                config.coupling,
                config.duration
            );
            stimulus::apply(tb, config.pattern_id, config.base_current, config.coupling)?;
            let window = monitor(tb, config.duration, &config.name).await?;
            report
                .borrow_mut()
                .record(config.clone(), window, tb.take_warnings());
            tb.sim().clock_cycles(self.inter_pattern_cycles).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn window(label: &str, spike_count: u64, transition_count: u64) -> WindowResult {
        WindowResult {
            label: label.to_string(),
            spike_count,
            transition_count,
            ..WindowResult::default()
        }
    }

    #[test]
    fn test_default_patterns() {
        let patterns = default_patterns();
        let names = patterns.iter().map(|p| p.name.as_str()).collect_vec();
        assert_eq!(names, vec!["Independent", "Wave", "Synchronous", "Clustered", "Burst"]);
        assert!(patterns.iter().all(|p| p.duration == DEFAULT_DURATION));
        assert!(patterns
            .iter()
            .all(|p| stimulus::truncations(p.pattern_id, p.base_current, p.coupling).is_empty()));
    }

    #[test]
    fn test_report_is_additive() {
        let mut report = SweepReport::new();
        report.record(PatternConfig::new("a", 0, 1, 2, 10), window("a", 3, 5), vec![]);
        report.record(PatternConfig::new("b", 1, 1, 2, 10), window("b", 0, 0), vec![]);
        report.record(PatternConfig::new("c", 2, 1, 2, 10), window("c", 7, 4), vec![]);
        assert_eq!(report.total_spikes, 10);
        assert_eq!(report.total_transitions, 9);
        assert_eq!(
            report.total_spikes,
            report.patterns.iter().map(|p| p.window.spike_count).sum::<u64>()
        );
        assert_eq!(report.pattern("c").unwrap().window.spike_count, 7);
        assert!(report.pattern("d").is_none());
        assert!(report.summary().ends_with("TOTAL        spikes=10     transitions=9"));
    }

    #[test]
    fn test_short_window_is_incomplete() {
        let mut report = SweepReport::new();
        let full = WindowResult {
            cycles: 10,
            ..window("a", 1, 1)
        };
        let cut = WindowResult {
            cycles: 4,
            ..window("b", 2, 3)
        };
        report.record(PatternConfig::new("a", 0, 1, 2, 10), full, vec![]);
        report.record(PatternConfig::new("b", 0, 1, 2, 10), cut, vec![]);
        assert!(report.pattern("a").unwrap().complete);
        assert!(!report.pattern("b").unwrap().complete);
        assert_eq!(report.total_spikes, 3);
        assert!(report.summary().contains("(incomplete)"));
    }

    #[test]
    fn test_save_and_load_patterns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("patterns.json");
        save_patterns(&default_patterns(), &path).unwrap();
        assert_eq!(load_patterns(&path).unwrap(), default_patterns());
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            load_patterns("does/not/exist.json"),
            Err(HarnessError::IOError(_))
        ));
    }
}
