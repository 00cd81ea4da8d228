// Public API for integration tests and the gatectl binary

pub mod broadcast;
pub mod config;
pub mod edge;
pub mod gate;
pub mod probes;
pub mod protocol;
pub mod registry;
pub mod state;
pub mod ws;
