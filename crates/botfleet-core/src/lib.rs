//! Automation engine and trait definitions for Botfleet.
//!
//! This crate defines the "ports" (repository and adapter traits) that the
//! infrastructure layer and platform adapters implement, plus the engine
//! itself: session bundle, authorization state machine, per-bot automation
//! loops, the automation manager, and the bot service façade. It depends
//! only on `botfleet-types` -- never on `botfleet-infra` or any
//! database/wire crate.

pub mod auth;
pub mod automation;
pub mod event;
pub mod manager;
pub mod platform;
pub mod reply;
pub mod repository;
pub mod service;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;
