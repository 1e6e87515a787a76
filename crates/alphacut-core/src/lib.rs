pub mod config;
pub mod debug;
pub mod error;
pub mod pipeline;
pub mod segment;
pub mod sink;
pub mod video;

#[cfg(test)]
mod test_utils;
