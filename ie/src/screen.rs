//! Screen-specific detection built on top of the match engine.

pub mod window;
