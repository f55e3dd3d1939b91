//! Common utilities shared by JWT consumers.

#![warn(clippy::pedantic)]

/// Module for JWT utilities (compact splitting, segment decoding, time claims)
pub mod jwt;
