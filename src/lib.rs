// src/lib.rs

//! subsnap: subreddit submission snapshots and combined tables

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
