//! Utility modules.

/// Date/time serialization helpers shared by drivers.
pub mod datetime;

/// Log sanitization utilities to prevent sensitive data exposure.
pub mod log_sanitizer;
