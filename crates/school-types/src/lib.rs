pub mod auth;
pub mod school;

pub use auth::*;
pub use school::*;
