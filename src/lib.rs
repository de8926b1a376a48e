// ABOUTME: Library root for sitepush - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod compress;
pub mod config;
pub mod deploy;
pub mod diagnostics;
pub mod error;
pub mod output;
pub mod process;
pub mod prompt;
pub mod release;
pub mod retry;
pub mod routing;
pub mod storage;
pub mod types;
pub mod upload;
