pub mod config;
pub mod forecast;
pub mod lunar;
pub mod output;
pub mod providers;
pub mod scoring;
pub mod types;
