pub mod boulder;
pub mod commands;
pub mod config;
pub mod detectors;
pub mod gate;
pub mod hooks;
mod patterns;
pub mod protocol;
pub mod ralph;
pub mod rules;
pub mod sandbox;
pub mod state;
pub mod transcript;
pub mod workflow;
