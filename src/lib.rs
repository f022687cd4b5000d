//! Song resolution for Open Music: a daily genre cache in front of a
//! rate-limited catalog proxy, with bundled data as the last resort.

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod sources;
pub mod storage;
