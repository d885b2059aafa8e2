//! Hearthstead - Tick-Driven Village Base Simulation Engine

pub mod assets;
pub mod core;
pub mod player;
pub mod village;
