//! co2dash: terminal client for a CO₂ air-quality monitoring backend.
//!
//! The binary in `main.rs` is a thin clap front end over these modules.

pub mod alerts;
pub mod api;
pub mod cli;
pub mod config;
pub mod display;
pub mod events;
pub mod live;
pub mod overview;
pub mod runtime;
pub mod settings;
pub mod state;
pub mod web;
