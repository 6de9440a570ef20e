pub mod config;
pub mod content;
pub mod db;
pub mod domain;
pub mod error;
pub mod exam;
pub mod handlers;
pub mod paths;
pub mod scoring;
pub mod services;
pub mod state;

#[cfg(test)]
pub mod testing;
