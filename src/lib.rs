// Optimg image optimization library

pub mod cache;
pub mod config;
pub mod constants;
pub mod error;
pub mod image_optimizer;
pub mod logging;
