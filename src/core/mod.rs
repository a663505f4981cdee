pub mod config;
pub mod errors;

pub use config::GuardConfig;
pub use errors::GuardError;
