pub mod benchmark;
pub mod client;
pub mod config;
pub mod error;
pub mod fetch;
pub mod output;
pub mod parser;
pub mod query;
pub mod siri;
pub mod stats;
