pub mod analyzers;
pub mod climate;
pub mod config;
pub mod error;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod spatial;
pub mod transit;

pub use error::HeatError;
