//! Noteboard - private notes and public news with moderated comments
//!
//! This library provides everything the `noteboard` binary serves: the
//! notes and news pages, accounts and sessions, and the storage behind them.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
