//! Newton Common Library
//!
//! This crate provides the shared vocabulary of the Newton station workspace:
//! device driver traits, value types, error enums and configuration loading.
//!
//! # Module Structure
//!
//! - [`camera`] - Camera driver traits, frame types and errors
//! - [`fieldbus`] - Fieldbus transport trait, CiA 402 object model and errors
//! - [`config`] - Configuration loading traits and station configuration
//! - [`consts`] - Timing constants and defaults
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use newton_common::prelude::*;
//! use newton_common::fieldbus::ControlWord;
//! ```

pub mod camera;
pub mod config;
pub mod consts;
pub mod fieldbus;
pub mod prelude;
