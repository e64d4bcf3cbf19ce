use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Phase and assignment construction errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssignmentError {
    #[error("{what}: low bound {low} cannot be greater than high bound {high}")]
    InvertedRange {
        what: &'static str,
        low: u32,
        high: u32,
    },
    #[error("phase '{phase}' must run at least one thread")]
    NoThreads { phase: String },
    #[error("cannot split {skiers} skiers across {threads} threads")]
    PopulationTooSmall { skiers: u32, threads: usize },
    #[error("trigger fraction denominator cannot be zero")]
    ZeroDenominator,
}

/// Inclusive window of minutes within the ski day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub low: u32,
    pub high: u32,
}

impl TimeWindow {
    pub fn new(low: u32, high: u32) -> Result<Self, AssignmentError> {
        if low > high {
            return Err(AssignmentError::InvertedRange {
                what: "time window",
                low,
                high,
            });
        }
        Ok(Self { low, high })
    }

    pub fn range(&self) -> RangeInclusive<u32> {
        self.low..=self.high
    }

    pub fn minutes(&self) -> u32 {
        self.high - self.low + 1
    }
}

/// Share of a phase's workers that must finish before the next phase starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerFraction {
    numerator: u32,
    denominator: u32,
}

impl TriggerFraction {
    pub const ONE_TENTH: TriggerFraction = TriggerFraction {
        numerator: 1,
        denominator: 10,
    };

    pub fn new(numerator: u32, denominator: u32) -> Result<Self, AssignmentError> {
        if denominator == 0 {
            return Err(AssignmentError::ZeroDenominator);
        }
        Ok(Self {
            numerator,
            denominator,
        })
    }

    /// `ceil(threads * numerator / denominator)`, capped at `threads`.
    pub fn trigger_count(&self, threads: usize) -> usize {
        let scaled = threads as u64 * self.numerator as u64;
        let den = self.denominator as u64;
        let count = (scaled + den - 1) / den;
        (count as usize).min(threads)
    }
}

/// Immutable description of one traffic phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseSpec {
    pub name: String,
    pub thread_count: usize,
    pub time_window: TimeWindow,
    pub writes_per_thread: u32,
    pub reads_per_thread_per_endpoint: u32,
    /// `None` for the final phase: nothing waits on it.
    pub trigger: Option<TriggerFraction>,
}

impl PhaseSpec {
    pub fn new(
        name: impl Into<String>,
        thread_count: usize,
        time_window: TimeWindow,
        writes_per_thread: u32,
        reads_per_thread_per_endpoint: u32,
        trigger: Option<TriggerFraction>,
    ) -> Result<Self, AssignmentError> {
        let name = name.into();
        if thread_count == 0 {
            return Err(AssignmentError::NoThreads { phase: name });
        }
        Ok(Self {
            name,
            thread_count,
            time_window,
            writes_per_thread,
            reads_per_thread_per_endpoint,
            trigger,
        })
    }

    /// Records produced by one worker: writes plus reads on both endpoints.
    pub fn requests_per_thread(&self) -> u64 {
        self.writes_per_thread as u64 + 2 * self.reads_per_thread_per_endpoint as u64
    }

    pub fn total_requests(&self) -> u64 {
        self.requests_per_thread() * self.thread_count as u64
    }

    /// Number of worker completions that release the next phase.
    pub fn trigger_count(&self) -> usize {
        self.trigger
            .map(|fraction| fraction.trigger_count(self.thread_count))
            .unwrap_or(0)
    }
}

/// What a finished phase contributed to the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseSummary {
    pub name: String,
    pub threads: usize,
    pub requests: u64,
}

/// One worker's slice of a phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerAssignment {
    pub skier_ids: RangeInclusive<u32>,
    pub time_window: TimeWindow,
    pub write_count: u32,
    pub read_count: u32,
}

impl WorkerAssignment {
    pub fn new(
        skier_ids: RangeInclusive<u32>,
        time_window: TimeWindow,
        write_count: u32,
        read_count: u32,
    ) -> Result<Self, AssignmentError> {
        if skier_ids.start() > skier_ids.end() {
            return Err(AssignmentError::InvertedRange {
                what: "skier id range",
                low: *skier_ids.start(),
                high: *skier_ids.end(),
            });
        }
        Ok(Self {
            skier_ids,
            time_window,
            write_count,
            read_count,
        })
    }

    pub fn expected_records(&self) -> usize {
        self.write_count as usize + 2 * self.read_count as usize
    }
}

/// Splits `[1, total_skiers]` into contiguous ranges, one per thread.
///
/// Every thread gets `total_skiers / threads` ids; the last range is
/// stretched to `total_skiers` to absorb the division remainder.
pub fn partition_skiers(
    total_skiers: u32,
    threads: usize,
) -> Result<Vec<RangeInclusive<u32>>, AssignmentError> {
    if threads == 0 {
        return Err(AssignmentError::NoThreads {
            phase: "partition".to_string(),
        });
    }
    if (total_skiers as u64) < threads as u64 {
        return Err(AssignmentError::PopulationTooSmall {
            skiers: total_skiers,
            threads,
        });
    }

    let per_thread = total_skiers / threads as u32;
    let mut ranges = Vec::with_capacity(threads);
    let mut low = 1u32;
    for index in 0..threads {
        let high = if index == threads - 1 {
            total_skiers
        } else {
            low + per_thread - 1
        };
        ranges.push(low..=high);
        low = high + 1;
    }
    Ok(ranges)
}

/// Builds the assignment for every worker of `phase`.
pub fn assignments_for_phase(
    phase: &PhaseSpec,
    total_skiers: u32,
) -> Result<Vec<WorkerAssignment>, AssignmentError> {
    partition_skiers(total_skiers, phase.thread_count)?
        .into_iter()
        .map(|skier_ids| {
            WorkerAssignment::new(
                skier_ids,
                phase.time_window,
                phase.writes_per_thread,
                phase.reads_per_thread_per_endpoint,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> TimeWindow {
        TimeWindow::new(1, 90).unwrap()
    }

    #[test]
    fn trigger_count_rounds_up() {
        let tenth = TriggerFraction::ONE_TENTH;
        assert_eq!(tenth.trigger_count(37), 4);
        assert_eq!(tenth.trigger_count(40), 4);
        assert_eq!(tenth.trigger_count(1), 1);
        assert_eq!(tenth.trigger_count(0), 0);
    }

    #[test]
    fn final_phase_has_no_trigger() {
        let phase = PhaseSpec::new("cooldown", 8, window(), 10, 4, None).unwrap();
        assert_eq!(phase.trigger_count(), 0);
    }

    #[test]
    fn phase_request_totals() {
        let phase =
            PhaseSpec::new("warmup", 4, window(), 10, 2, Some(TriggerFraction::ONE_TENTH)).unwrap();
        assert_eq!(phase.requests_per_thread(), 14);
        assert_eq!(phase.total_requests(), 56);
        assert_eq!(phase.trigger_count(), 1);
    }

    #[test]
    fn rejects_empty_phase_and_zero_denominator() {
        assert!(matches!(
            PhaseSpec::new("peak", 0, window(), 1, 1, None),
            Err(AssignmentError::NoThreads { .. })
        ));
        assert_eq!(
            TriggerFraction::new(1, 0),
            Err(AssignmentError::ZeroDenominator)
        );
    }

    #[test]
    fn inverted_ranges_are_rejected() {
        assert!(TimeWindow::new(91, 90).is_err());
        let err = WorkerAssignment::new(10..=9, window(), 1, 1).unwrap_err();
        assert!(matches!(err, AssignmentError::InvertedRange { low: 10, high: 9, .. }));
    }

    #[test]
    fn last_thread_absorbs_remainder() {
        let ranges = partition_skiers(10, 3).unwrap();
        assert_eq!(ranges, vec![1..=3, 4..=6, 7..=10]);
    }

    #[test]
    fn population_smaller_than_threads_is_an_error() {
        assert_eq!(
            partition_skiers(3, 4),
            Err(AssignmentError::PopulationTooSmall {
                skiers: 3,
                threads: 4
            })
        );
    }

    #[test]
    fn assignments_carry_phase_volumes() {
        let phase = PhaseSpec::new("peak", 2, window(), 7, 3, None).unwrap();
        let assignments = assignments_for_phase(&phase, 100).unwrap();
        assert_eq!(assignments.len(), 2);
        assert_eq!(assignments[1].skier_ids, 51..=100);
        assert!(assignments.iter().all(|a| a.expected_records() == 13));
    }
}
