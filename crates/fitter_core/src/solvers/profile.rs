//! Per-phase timing of a fitting run.
//!
//! [`PhaseTimer`] is a set of named accumulating stopwatches used while the
//! solver runs; [`CalculationProfile`] is the frozen, insertion-ordered result
//! stored on the fitting state. Neither is ever read by the algorithm.

use std::time::{Duration, Instant};

/// Cumulative elapsed time per named computation phase.
///
/// Phases keep the order in which they were first timed.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CalculationProfile {
    phases: Vec<(String, Duration)>,
}

impl CalculationProfile {
    /// Create an empty profile.
    pub fn new() -> Self {
        Self::default()
    }

    /// Elapsed time recorded for `phase`.
    pub fn get(&self, phase: &str) -> Option<Duration> {
        self.phases
            .iter()
            .find(|(name, _)| name == phase)
            .map(|(_, elapsed)| *elapsed)
    }

    /// Iterate over `(phase, elapsed)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Duration)> {
        self.phases.iter().map(|(name, elapsed)| (name.as_str(), *elapsed))
    }

    /// Number of phases.
    pub fn len(&self) -> usize {
        self.phases.len()
    }

    /// True if no phase was recorded.
    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    /// Sum over all phases.
    pub fn total(&self) -> Duration {
        self.phases.iter().map(|(_, elapsed)| *elapsed).sum()
    }

    /// Add `elapsed` to `phase`, appending it if new.
    pub fn add(&mut self, phase: &str, elapsed: Duration) {
        match self.phases.iter_mut().find(|(name, _)| name == phase) {
            Some((_, total)) => *total += elapsed,
            None => self.phases.push((phase.to_string(), elapsed)),
        }
    }
}

#[derive(Debug)]
struct Stopwatch {
    name: &'static str,
    elapsed: Duration,
    started: Option<Instant>,
}

/// Named accumulating stopwatches.
///
/// # Example
///
/// ```
/// use fitter_core::solvers::PhaseTimer;
///
/// let mut timer = PhaseTimer::new();
/// let sum = timer.time("sum", || (1..=10).sum::<i32>());
/// assert_eq!(sum, 55);
///
/// timer.start("outer");
/// timer.stop("outer");
///
/// let profile = timer.into_profile();
/// let names: Vec<&str> = profile.iter().map(|(name, _)| name).collect();
/// assert_eq!(names, vec!["sum", "outer"]);
/// ```
#[derive(Debug, Default)]
pub struct PhaseTimer {
    watches: Vec<Stopwatch>,
}

impl PhaseTimer {
    /// Create a timer with no phases.
    pub fn new() -> Self {
        Self::default()
    }

    fn watch(&mut self, name: &'static str) -> &mut Stopwatch {
        let index = match self.watches.iter().position(|w| w.name == name) {
            Some(index) => index,
            None => {
                self.watches.push(Stopwatch {
                    name,
                    elapsed: Duration::ZERO,
                    started: None,
                });
                self.watches.len() - 1
            }
        };
        &mut self.watches[index]
    }

    /// Start (or resume) the stopwatch for `name`.
    pub fn start(&mut self, name: &'static str) {
        let watch = self.watch(name);
        if watch.started.is_none() {
            watch.started = Some(Instant::now());
        }
    }

    /// Stop the stopwatch for `name`, accumulating the running interval.
    pub fn stop(&mut self, name: &'static str) {
        let watch = self.watch(name);
        if let Some(started) = watch.started.take() {
            watch.elapsed += started.elapsed();
        }
    }

    /// Run `f` with the stopwatch for `name` running.
    pub fn time<T>(&mut self, name: &'static str, f: impl FnOnce() -> T) -> T {
        self.start(name);
        let out = f();
        self.stop(name);
        out
    }

    /// Freeze into a profile; running stopwatches are stopped first.
    pub fn into_profile(mut self) -> CalculationProfile {
        let mut profile = CalculationProfile::new();
        for watch in &mut self.watches {
            if let Some(started) = watch.started.take() {
                watch.elapsed += started.elapsed();
            }
            profile.add(watch.name, watch.elapsed);
        }
        profile
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================
    // CalculationProfile Tests
    // ========================================

    #[test]
    fn test_profile_preserves_insertion_order() {
        let mut profile = CalculationProfile::new();
        profile.add("jacobian", Duration::from_millis(3));
        profile.add("residual", Duration::from_millis(1));
        profile.add("hessian", Duration::from_millis(2));

        let names: Vec<&str> = profile.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["jacobian", "residual", "hessian"]);
    }

    #[test]
    fn test_profile_add_accumulates() {
        let mut profile = CalculationProfile::new();
        profile.add("step", Duration::from_millis(2));
        profile.add("step", Duration::from_millis(5));
        assert_eq!(profile.len(), 1);
        assert_eq!(profile.get("step"), Some(Duration::from_millis(7)));
    }

    #[test]
    fn test_profile_total() {
        let mut profile = CalculationProfile::new();
        profile.add("a", Duration::from_millis(2));
        profile.add("b", Duration::from_millis(3));
        assert_eq!(profile.total(), Duration::from_millis(5));
        assert_eq!(profile.get("missing"), None);
    }

    // ========================================
    // PhaseTimer Tests
    // ========================================

    #[test]
    fn test_timer_accumulates_across_intervals() {
        let mut timer = PhaseTimer::new();
        timer.time("sleep", || std::thread::sleep(Duration::from_millis(2)));
        timer.time("sleep", || std::thread::sleep(Duration::from_millis(2)));

        let profile = timer.into_profile();
        assert_eq!(profile.len(), 1);
        assert!(profile.get("sleep").unwrap() >= Duration::from_millis(4));
    }

    #[test]
    fn test_timer_stops_running_watch_on_freeze() {
        let mut timer = PhaseTimer::new();
        timer.start("open");
        std::thread::sleep(Duration::from_millis(1));

        let profile = timer.into_profile();
        assert!(profile.get("open").unwrap() >= Duration::from_millis(1));
    }

    #[test]
    fn test_timer_stop_without_start_is_zero() {
        let mut timer = PhaseTimer::new();
        timer.stop("never");
        assert_eq!(timer.into_profile().get("never"), Some(Duration::ZERO));
    }

    #[test]
    fn test_double_start_keeps_first_instant() {
        let mut timer = PhaseTimer::new();
        timer.start("x");
        std::thread::sleep(Duration::from_millis(2));
        timer.start("x");
        timer.stop("x");
        assert!(timer.into_profile().get("x").unwrap() >= Duration::from_millis(2));
    }
}
