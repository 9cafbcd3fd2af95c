//! Ask a local language model to solve a structured task, have it check its
//! own answer, and repair the answer a bounded number of times.

pub mod api;
pub mod banner;
pub mod client;
pub mod config;
pub mod consts;
pub mod engine;
pub mod error;
pub mod parser;
pub mod prompts;
pub mod spinner;
pub mod task;
pub mod verifier;
