//! Ramp stages and the schedule that turns them into a concurrency level per instant

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::StageError;

/// One window of the run: move toward `target` virtual clients over `duration`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RampStage {
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
    pub target: u32,
}

impl RampStage {
    pub fn new(duration: Duration, target: u32) -> Self {
        Self { duration, target }
    }
}

impl FromStr for RampStage {
    type Err = StageError;

    /// Parses `<duration>:<target>`, e.g. `30s:15` or `1m:0`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (duration, target) = s
            .trim()
            .rsplit_once(':')
            .ok_or_else(|| StageError::Syntax(s.to_string()))?;

        let duration =
            humantime::parse_duration(duration.trim()).map_err(|e| StageError::Duration {
                input: s.to_string(),
                reason: e.to_string(),
            })?;
        let target = target
            .trim()
            .parse::<u32>()
            .map_err(|_| StageError::Target(s.to_string()))?;

        Ok(Self { duration, target })
    }
}

impl fmt::Display for RampStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} VUs",
            humantime::format_duration(self.duration),
            self.target
        )
    }
}

/// Where the driver is at a given instant of the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverPhase {
    RampingUp(usize),
    Holding(usize),
    RampingDown(usize),
    Finished,
}

impl fmt::Display for DriverPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RampingUp(i) => write!(f, "ramping-up(stage {})", i + 1),
            Self::Holding(i) => write!(f, "holding(stage {})", i + 1),
            Self::RampingDown(i) => write!(f, "ramping-down(stage {})", i + 1),
            Self::Finished => write!(f, "finished"),
        }
    }
}

/// Ordered stage list plus the level the first stage ramps from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RampSchedule {
    start_vus: u32,
    stages: Vec<RampStage>,
}

/// Position inside the schedule resolved for one instant
struct StagePosition {
    index: usize,
    from: u32,
    stage: RampStage,
    offset: Duration,
}

impl RampSchedule {
    pub fn new(start_vus: u32, stages: Vec<RampStage>) -> Result<Self, StageError> {
        if stages.is_empty() {
            return Err(StageError::Empty);
        }
        Ok(Self { start_vus, stages })
    }

    pub fn start_vus(&self) -> u32 {
        self.start_vus
    }

    pub fn stages(&self) -> &[RampStage] {
        &self.stages
    }

    /// Sum of all stage durations
    pub fn total_duration(&self) -> Duration {
        self.stages.iter().map(|s| s.duration).sum()
    }

    /// Highest concurrency the schedule ever asks for
    pub fn max_target(&self) -> u32 {
        self.stages
            .iter()
            .map(|s| s.target)
            .fold(self.start_vus, u32::max)
    }

    fn position(&self, elapsed: Duration) -> Option<StagePosition> {
        let mut from = self.start_vus;
        let mut stage_start = Duration::ZERO;

        for (index, stage) in self.stages.iter().enumerate() {
            let stage_end = stage_start + stage.duration;
            if elapsed < stage_end {
                return Some(StagePosition {
                    index,
                    from,
                    stage: *stage,
                    offset: elapsed - stage_start,
                });
            }
            from = stage.target;
            stage_start = stage_end;
        }

        None
    }

    /// Number of virtual clients that should be active `elapsed` into the run.
    ///
    /// Interpolation is linear and rounds toward the level the stage started
    /// from, so the result never overshoots either end of the ramp.
    pub fn target_at(&self, elapsed: Duration) -> u32 {
        let Some(pos) = self.position(elapsed) else {
            return self.stages.last().map(|s| s.target).unwrap_or(0);
        };

        let progress = pos.offset.as_secs_f64() / pos.stage.duration.as_secs_f64();
        let to = pos.stage.target;

        if to >= pos.from {
            let step = (f64::from(to - pos.from) * progress).floor() as u32;
            pos.from + step.min(to - pos.from)
        } else {
            let step = (f64::from(pos.from - to) * progress).floor() as u32;
            pos.from - step.min(pos.from - to)
        }
    }

    pub fn phase_at(&self, elapsed: Duration) -> DriverPhase {
        match self.position(elapsed) {
            None => DriverPhase::Finished,
            Some(pos) if pos.stage.target > pos.from => DriverPhase::RampingUp(pos.index),
            Some(pos) if pos.stage.target < pos.from => DriverPhase::RampingDown(pos.index),
            Some(pos) => DriverPhase::Holding(pos.index),
        }
    }
}

impl fmt::Display for RampSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "start {} VUs", self.start_vus)?;
        for stage in &self.stages {
            write!(f, ", {}", stage)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    fn source_stages() -> Vec<RampStage> {
        vec![
            RampStage::new(secs(30), 15),
            RampStage::new(secs(60), 15),
            RampStage::new(secs(20), 0),
        ]
    }

    #[test]
    fn test_parse_stage() {
        assert_eq!("30s:15".parse::<RampStage>(), Ok(RampStage::new(secs(30), 15)));
        assert_eq!("1m:0".parse::<RampStage>(), Ok(RampStage::new(secs(60), 0)));
        assert_eq!(
            " 500ms : 3 ".parse::<RampStage>(),
            Ok(RampStage::new(Duration::from_millis(500), 3))
        );
    }

    #[test]
    fn test_parse_stage_rejects_garbage() {
        assert!(matches!(
            "30s".parse::<RampStage>(),
            Err(StageError::Syntax(_))
        ));
        assert!(matches!(
            "soon:15".parse::<RampStage>(),
            Err(StageError::Duration { .. })
        ));
        assert!(matches!(
            "30s:-1".parse::<RampStage>(),
            Err(StageError::Target(_))
        ));
    }

    #[test]
    fn test_empty_schedule_is_rejected() {
        assert_eq!(RampSchedule::new(1, vec![]), Err(StageError::Empty));
    }

    #[test]
    fn test_total_duration_is_sum_of_stages() {
        let schedule = RampSchedule::new(0, source_stages()).unwrap();
        assert_eq!(schedule.total_duration(), secs(110));
        assert_eq!(schedule.max_target(), 15);
    }

    #[test]
    fn test_linear_ramp_up_and_down() {
        let schedule = RampSchedule::new(
            0,
            vec![RampStage::new(secs(10), 10), RampStage::new(secs(10), 0)],
        )
        .unwrap();

        assert_eq!(schedule.target_at(Duration::ZERO), 0);
        assert_eq!(schedule.target_at(Duration::from_millis(2500)), 2);
        assert_eq!(schedule.target_at(secs(5)), 5);
        assert_eq!(schedule.target_at(Duration::from_millis(9999)), 9);
        assert_eq!(schedule.target_at(secs(10)), 10);
        // ramping down rounds toward the starting level
        assert_eq!(schedule.target_at(Duration::from_millis(12500)), 8);
        assert_eq!(schedule.target_at(secs(15)), 5);
        assert_eq!(schedule.target_at(secs(25)), 0);
    }

    #[test]
    fn test_target_never_leaves_ramp_bounds() {
        let schedule = RampSchedule::new(3, source_stages()).unwrap();
        let mut elapsed = Duration::ZERO;
        let mut stage_start = Duration::ZERO;
        let mut from = schedule.start_vus();
        for stage in schedule.stages() {
            let (low, high) = (from.min(stage.target), from.max(stage.target));
            while elapsed < stage_start + stage.duration {
                let target = schedule.target_at(elapsed);
                assert!(low <= target && target <= high, "{} at {:?}", target, elapsed);
                elapsed += Duration::from_millis(250);
            }
            stage_start += stage.duration;
            from = stage.target;
        }
    }

    #[test]
    fn test_phases_follow_stage_sequence() {
        let schedule = RampSchedule::new(0, source_stages()).unwrap();

        assert_eq!(schedule.phase_at(secs(0)), DriverPhase::RampingUp(0));
        assert_eq!(schedule.phase_at(secs(29)), DriverPhase::RampingUp(0));
        assert_eq!(schedule.phase_at(secs(30)), DriverPhase::Holding(1));
        assert_eq!(schedule.phase_at(secs(95)), DriverPhase::RampingDown(2));
        assert_eq!(schedule.phase_at(secs(110)), DriverPhase::Finished);
    }

    #[test]
    fn test_start_vus_holds_single_stage() {
        let schedule = RampSchedule::new(1, vec![RampStage::new(secs(5), 1)]).unwrap();
        assert_eq!(schedule.phase_at(secs(0)), DriverPhase::Holding(0));
        assert_eq!(schedule.target_at(secs(0)), 1);
        assert_eq!(schedule.target_at(secs(4)), 1);
    }

    #[test]
    fn test_zero_length_stage_jumps_to_target() {
        let schedule = RampSchedule::new(
            0,
            vec![RampStage::new(Duration::ZERO, 4), RampStage::new(secs(2), 4)],
        )
        .unwrap();
        assert_eq!(schedule.target_at(Duration::ZERO), 4);
        assert_eq!(schedule.phase_at(Duration::ZERO), DriverPhase::Holding(1));
    }
}
