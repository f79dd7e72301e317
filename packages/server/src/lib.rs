// Market Scout - Provider API
//
// HTTP surface over the provider fallback core. The composition root in
// kernel/ registers every adapter with its priority and rate limit; routes
// in server/ stay thin and delegate to the shared coordinator.

pub mod config;
pub mod kernel;
pub mod server;

pub use config::*;
