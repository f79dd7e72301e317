//! Concrete provider adapters and the HTTP plumbing they share.

pub mod extract;
pub mod html;
pub mod http;
pub mod paced;
pub mod search;
pub mod text;
