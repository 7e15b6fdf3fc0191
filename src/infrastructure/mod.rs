//! Shared infrastructure

pub mod lwlock;
