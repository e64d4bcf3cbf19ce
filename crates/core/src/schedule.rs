//! The fixed three-phase day: warm-up, peak and cooldown.

use skiload_types::{AssignmentError, PhaseSpec, TimeWindow, TriggerFraction};

pub const DAY_LENGTH_MINUTES: u32 = 420;
pub const WARMUP_END_MINUTE: u32 = 90;
pub const PEAK_END_MINUTE: u32 = 360;

pub const WRITES_PER_THREAD: u32 = 1_000;
pub const READS_PER_THREAD_PER_ENDPOINT: u32 = 5;

/// Phases for a run with `max_threads` at peak and the standard volumes.
pub fn standard_schedule(max_threads: usize) -> Result<Vec<PhaseSpec>, AssignmentError> {
    schedule_with_volumes(max_threads, WRITES_PER_THREAD, READS_PER_THREAD_PER_ENDPOINT)
}

/// Same phase layout with custom per-thread volumes. Cooldown doubles the
/// reads.
pub fn schedule_with_volumes(
    max_threads: usize,
    writes_per_thread: u32,
    reads_per_thread_per_endpoint: u32,
) -> Result<Vec<PhaseSpec>, AssignmentError> {
    let shoulder_threads = max_threads / 4;
    Ok(vec![
        PhaseSpec::new(
            "warmup",
            shoulder_threads,
            TimeWindow::new(1, WARMUP_END_MINUTE)?,
            writes_per_thread,
            reads_per_thread_per_endpoint,
            Some(TriggerFraction::ONE_TENTH),
        )?,
        PhaseSpec::new(
            "peak",
            max_threads,
            TimeWindow::new(WARMUP_END_MINUTE + 1, PEAK_END_MINUTE)?,
            writes_per_thread,
            reads_per_thread_per_endpoint,
            Some(TriggerFraction::ONE_TENTH),
        )?,
        PhaseSpec::new(
            "cooldown",
            shoulder_threads,
            TimeWindow::new(PEAK_END_MINUTE + 1, DAY_LENGTH_MINUTES)?,
            writes_per_thread,
            reads_per_thread_per_endpoint * 2,
            None,
        )?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_layout_for_thirty_two_threads() {
        let phases = standard_schedule(32).unwrap();
        let names: Vec<&str> = phases.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["warmup", "peak", "cooldown"]);

        assert_eq!(phases[0].thread_count, 8);
        assert_eq!(phases[0].time_window.range(), 1..=90);
        assert_eq!(phases[0].trigger_count(), 1);
        assert_eq!(phases[0].requests_per_thread(), 1_010);

        assert_eq!(phases[1].thread_count, 32);
        assert_eq!(phases[1].time_window.range(), 91..=360);
        assert_eq!(phases[1].trigger_count(), 4);

        assert_eq!(phases[2].thread_count, 8);
        assert_eq!(phases[2].time_window.range(), 361..=420);
        assert_eq!(phases[2].reads_per_thread_per_endpoint, 10);
        assert_eq!(phases[2].trigger, None);
        assert_eq!(phases[2].trigger_count(), 0);
    }

    #[test]
    fn shoulder_phases_round_down() {
        let phases = standard_schedule(7).unwrap();
        assert_eq!(phases[0].thread_count, 1);
        assert_eq!(phases[2].thread_count, 1);
    }

    #[test]
    fn fewer_than_four_threads_leaves_warmup_empty() {
        assert!(matches!(
            standard_schedule(3),
            Err(AssignmentError::NoThreads { .. })
        ));
    }
}
