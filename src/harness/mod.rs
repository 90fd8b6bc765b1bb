pub mod agent;
pub mod cli;
pub mod types;

pub use agent::{AgentExit, AgentRun, LogTail, run_agent};
pub use cli::{
    ComponentResults, TrajectoryResults, component_header, playground_url, run_component_harness,
    run_trajectory_harness, select_components, select_trajectories, trajectory_header,
};
pub use types::{
    ComponentSelection, HarnessConfig, HarnessError, HarnessResult, StopRule, TrajectorySelection,
};
