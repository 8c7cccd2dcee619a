//! Infrastructure layer for Botfleet.
//!
//! Contains implementations of the storage traits defined in
//! `botfleet-core`: SQLite-backed bot, session, and match repositories over
//! a split reader/writer pool, plus the `config.toml` loader.

pub mod config;
pub mod sqlite;
