pub mod config;
pub mod dataset;
pub mod db;
pub mod error;
pub mod fetch;
pub mod parse;
pub mod pipeline;

#[cfg(test)]
mod testing;
