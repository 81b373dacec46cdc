//! Data models for OffChat

mod session;
mod user;

pub use session::*;
pub use user::*;
