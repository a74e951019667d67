//! Request handler module
//!
//! Responsible for request routing dispatch and template page serving.

pub mod page;
pub mod router;

// Re-export main entry point
pub use router::handle_request;
