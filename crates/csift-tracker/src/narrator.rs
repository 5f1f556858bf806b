//! Synthesized progress narration for the processing phase.
//!
//! The server reports only a coarse status while processing, so the phase
//! label and percentage shown to the user are synthesized from elapsed time.
//! The narration is cosmetic: it is capped below 100 and never feeds back
//! into job status, which comes from the poll loop alone.

use std::time::Duration;

/// Ordered phase labels shown while the server is processing.
pub const PROCESSING_PHASES: [&str; 4] = [
    "Extracting audio",
    "Analyzing content",
    "Applying filters",
    "Finalizing",
];

/// Narration ceiling until completion snaps the display to 100.
const MAX_SYNTH_PERCENT: f64 = 95.0;

/// One narration tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Narration {
    /// Phase label for display
    pub phase: String,
    /// Display percentage, in [0, 95]
    pub percent: u8,
}

/// Derives a phase label and display percentage from elapsed processing
/// time. Pure: the same elapsed time always narrates the same way, and the
/// percentage is monotone in elapsed time.
#[derive(Debug, Clone)]
pub struct ProgressNarrator {
    expected: Duration,
}

impl ProgressNarrator {
    /// `expected` is the typical end-to-end processing time; narration
    /// reaches its ceiling once that much time has passed.
    pub fn new(expected: Duration) -> Self {
        Self { expected }
    }

    pub fn narrate(&self, elapsed: Duration) -> Narration {
        let expected_secs = self.expected.as_secs_f64().max(1.0);
        let fraction = (elapsed.as_secs_f64() / expected_secs).min(1.0);

        let phase_count = PROCESSING_PHASES.len();
        let index = ((fraction * phase_count as f64) as usize).min(phase_count - 1);

        Narration {
            phase: PROCESSING_PHASES[index].to_string(),
            percent: (fraction * MAX_SYNTH_PERCENT) as u8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_first_phase() {
        let narrator = ProgressNarrator::new(Duration::from_secs(120));
        let n = narrator.narrate(Duration::ZERO);
        assert_eq!(n.phase, "Extracting audio");
        assert_eq!(n.percent, 0);
    }

    #[test]
    fn test_advances_through_phases_in_order() {
        let narrator = ProgressNarrator::new(Duration::from_secs(120));
        let labels: Vec<String> = (0..=120)
            .step_by(10)
            .map(|s| narrator.narrate(Duration::from_secs(s)).phase)
            .collect();

        // Every phase appears, in list order
        let mut last_index = 0;
        for label in &labels {
            let index = PROCESSING_PHASES
                .iter()
                .position(|p| p == label)
                .expect("label from the phase list");
            assert!(index >= last_index, "phases must not go backwards");
            last_index = index;
        }
        assert_eq!(last_index, PROCESSING_PHASES.len() - 1);
    }

    #[test]
    fn test_percent_is_monotone_and_capped() {
        let narrator = ProgressNarrator::new(Duration::from_secs(60));
        let mut last = 0;
        for s in 0..600 {
            let n = narrator.narrate(Duration::from_secs(s));
            assert!(n.percent >= last);
            assert!(n.percent < 100);
            last = n.percent;
        }
        // Long past the expected duration, narration saturates at the cap
        assert_eq!(last, 95);
    }

    #[test]
    fn test_zero_expected_duration_is_safe() {
        let narrator = ProgressNarrator::new(Duration::ZERO);
        let n = narrator.narrate(Duration::from_secs(5));
        assert_eq!(n.phase, "Finalizing");
        assert_eq!(n.percent, 95);
    }
}
