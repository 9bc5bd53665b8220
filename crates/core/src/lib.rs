//! flightloop_core - Pure no_std scheduling logic for flight-controller firmware
//!
//! This crate contains the platform-agnostic scheduler and can be tested on
//! the host without any feature flags or embedded dependencies.
//!
//! # Design Principles
//!
//! - **Zero cfg**: No `#[cfg(feature = ...)]` directives
//! - **Pure no_std**: No std library dependencies outside tests
//! - **Trait abstractions**: Platform services injected via traits
//!
//! # Modules
//!
//! - [`traits`]: Platform-agnostic trait abstractions (TimeSource)
//! - [`scheduler`]: Task registry, estimator, realtime guard and scheduler core

#![no_std]

pub mod scheduler;
pub mod traits;
