pub mod api_football;
pub mod assembler;
pub mod config;
pub mod evaluation;
pub mod grading;
pub mod leg_pool;
pub mod logging;
pub mod market;
pub mod payload;
pub mod store;
pub mod thresholds;
