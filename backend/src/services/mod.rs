//! Module for core business logic services.
//!
//! This module encapsulates services that hold state across requests, such as
//! the registry of per-credential sessions.

pub mod session_registry;
