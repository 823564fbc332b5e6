//! Common utilities shared across BionicPRO services.

#![warn(clippy::pedantic)]

/// Module for JWT utilities (size limits, clock skew, header inspection)
pub mod jwt;
