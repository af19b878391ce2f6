// lib.rs - Library exports for the binary and integration tests

pub mod config;
pub mod bootstrap;
pub mod chain;
pub mod math;
pub mod models;
pub mod storage;
pub mod stores;
pub mod engine;
