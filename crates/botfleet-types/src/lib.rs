//! Shared domain types for the Botfleet automation engine.
//!
//! This crate holds the plain data types and error enums used across the
//! workspace. It has no async or IO dependencies.

pub mod bot;
pub mod config;
pub mod error;
pub mod match_record;
pub mod platform;
pub mod session;
