// HTTP routes
pub mod error;
pub mod health;
pub mod providers;
pub mod resolve;

pub use error::*;
pub use health::*;
pub use providers::*;
pub use resolve::*;
