//! Museum poster: posts a random museum artwork with its image to X/Twitter
//! on a fixed interval.

pub mod config;
pub mod error;
pub mod jobs;
pub mod services;
