//! HTTP handlers, one module per route family

pub mod device;
pub mod health;
pub mod images;
pub mod render;
