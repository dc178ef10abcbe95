pub mod autopilot;
pub mod constants;
pub mod engine;
pub mod logging;
pub mod maze;
pub mod pathfinding;
pub mod types;
