//! Common test utilities for redplanet.
//!
//! This module provides shared fixtures and helpers for testing the
//! redplanet library and server.

// Re-export all common test utilities
pub mod assertions;
pub mod http_client;
pub mod test_data;
