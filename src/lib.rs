pub mod cache;
pub mod codec;
pub mod config;
pub mod errors;
pub mod orchestrator;
pub mod protocol;
pub mod renderer;
pub mod web;
