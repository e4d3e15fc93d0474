//! Storage and synchronization core for a puzzle-hunt helper bot: guild and
//! hunt settings, puzzle records, and the periodic nexus dashboard refresh.

pub mod config;
pub mod dao;
pub mod error;
pub mod services;
pub mod state;
