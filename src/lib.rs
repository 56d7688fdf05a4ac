pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod search;
pub mod utils;

#[cfg(test)]
mod test_support;

pub use error::{ContentError, Result};
