//! Background Tasks Module
//!
//! # Tasks
//! - TTL Cleanup: Physically removes expired cache entries so memory does not
//!   hold on to responses nobody asks for again

mod cleanup;

pub use cleanup::spawn_cleanup_task;
