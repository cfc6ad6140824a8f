//! Playback scenarios for the delayed reader.

use crate::oracle::Hazard;

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// GS-001: Straight run, baseline tracking error
    SteadyRun,

    /// GS-002: Frequent lane changes, lane index must snap
    LaneWeave,

    /// GS-003: Repeated jumps, airborne state must come through
    Hurdles,

    /// GS-004: Collisions injected as terminal events
    Crash,

    /// GS-005: Lag longer than the retained window
    TimeLapse,

    /// GS-006: Noisy frame times with random input
    Jitter,
}

/// Inputs and overrides a scenario applies to the runner and reader.
#[derive(Debug, Clone, Default)]
pub struct ScenarioPlan {
    /// Overrides the configured simulated lag
    pub lag: Option<f64>,

    /// Overrides the configured buffer capacity
    pub capacity: Option<usize>,

    /// Relative std-dev of frame time noise (0 = fixed frame rate)
    pub frame_jitter: f64,

    /// Per-frame probability of a random lane change
    pub lane_change_chance: f64,

    /// Per-frame probability of a jump
    pub jump_chance: f64,

    /// Obstacles placed on the track
    pub hazards: Vec<Hazard>,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::SteadyRun,
            ScenarioId::LaneWeave,
            ScenarioId::Hurdles,
            ScenarioId::Crash,
            ScenarioId::TimeLapse,
            ScenarioId::Jitter,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::SteadyRun => "steady_run",
            ScenarioId::LaneWeave => "lane_weave",
            ScenarioId::Hurdles => "hurdles",
            ScenarioId::Crash => "crash",
            ScenarioId::TimeLapse => "time_lapse",
            ScenarioId::Jitter => "jitter",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::SteadyRun => "Straight run at constant speed, checks lag-aligned error",
            ScenarioId::LaneWeave => "Random lane changes, lane index snaps to the lower sample",
            ScenarioId::Hurdles => "Random jumps, ghost must leave the ground too",
            ScenarioId::Crash => "Three hazards in the runner's lane, crashes reach the ghost after the lag",
            ScenarioId::TimeLapse => "8-slot buffer with 1s lag, reads degrade to the newest sample",
            ScenarioId::Jitter => "30% frame time noise plus random input",
        }
    }

    /// Builds the inputs for this scenario.
    pub fn plan(&self) -> ScenarioPlan {
        match self {
            ScenarioId::SteadyRun => ScenarioPlan::default(),
            ScenarioId::LaneWeave => ScenarioPlan {
                lane_change_chance: 0.03,
                ..Default::default()
            },
            ScenarioId::Hurdles => ScenarioPlan {
                jump_chance: 0.02,
                ..Default::default()
            },
            ScenarioId::Crash => ScenarioPlan {
                hazards: vec![
                    Hazard::new(15.0, 1),
                    Hazard::new(35.0, 1),
                    Hazard::new(55.0, 1),
                ],
                ..Default::default()
            },
            ScenarioId::TimeLapse => ScenarioPlan {
                lag: Some(1.0),
                capacity: Some(8),
                ..Default::default()
            },
            ScenarioId::Jitter => ScenarioPlan {
                frame_jitter: 0.3,
                lane_change_chance: 0.03,
                jump_chance: 0.01,
                ..Default::default()
            },
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "steady_run" | "steadyrun" | "gs-001" => Ok(ScenarioId::SteadyRun),
            "lane_weave" | "laneweave" | "gs-002" => Ok(ScenarioId::LaneWeave),
            "hurdles" | "gs-003" => Ok(ScenarioId::Hurdles),
            "crash" | "gs-004" => Ok(ScenarioId::Crash),
            "time_lapse" | "timelapse" | "gs-005" => Ok(ScenarioId::TimeLapse),
            "jitter" | "gs-006" => Ok(ScenarioId::Jitter),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for scenario in ScenarioId::all() {
            let parsed: ScenarioId = scenario.name().parse().unwrap();
            assert_eq!(parsed, scenario);
        }
        assert_eq!("GS-004".parse::<ScenarioId>(), Ok(ScenarioId::Crash));
        assert!("nope".parse::<ScenarioId>().is_err());
    }

    #[test]
    fn test_time_lapse_plan_overrides_reader() {
        let plan = ScenarioId::TimeLapse.plan();
        assert_eq!(plan.lag, Some(1.0));
        assert_eq!(plan.capacity, Some(8));
        assert!(ScenarioId::SteadyRun.plan().hazards.is_empty());
    }
}
