//! HTTP protocol layer module
//!
//! Response builders decoupled from specific business logic.

pub mod response;

// Re-export commonly used builders
pub use response::{build_404_response, build_405_response, build_413_response, build_500_response};
