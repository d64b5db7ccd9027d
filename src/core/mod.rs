//! Configuration and the data carried through the message pipeline

pub mod config;
pub mod models;
