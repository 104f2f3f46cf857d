//! Discovery engine, broker and shared infrastructure

pub mod broker;
pub mod logging;
pub mod retrieval;
