// Kernel - provider wiring and background jobs
pub mod providers;
pub mod scheduled_tasks;

pub use providers::build_coordinator;
pub use scheduled_tasks::start_scheduler;
