//! # NVMe Bridge Common
//!
//! Shared types, error taxonomy and configuration used by the bridge core
//! and its JSON-RPC backend client.

pub mod types;
pub mod error;
pub mod config;
pub mod utils;

// Re-export commonly used types
pub use types::*;
pub use error::{BridgeError, Result};
pub use config::{BackendAddress, BackendConfig, BridgeConfig, ConfigLoader};

/// Resource collection segment for subsystems
pub const SUBSYSTEMS_SEGMENT: &str = "subsystems";

/// Resource collection segment for controllers
pub const CONTROLLERS_SEGMENT: &str = "controllers";

/// Resource collection segment for namespaces
pub const NAMESPACES_SEGMENT: &str = "namespaces";

/// Firmware revision reported by Get until the backend value is mapped
pub const PLACEHOLDER_FIRMWARE_REVISION: &str = "TBD";
