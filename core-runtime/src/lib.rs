//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the music client core:
//! - Logging and tracing bootstrap
//! - Configuration and capability validation
//! - Event bus between the core and the presentation layer
//!
//! ## Overview
//!
//! Every other core crate depends on this one for its event types and for the
//! network settings that drive the retry layer.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
