//! Core domain types and logic.

pub mod ohlcv;
pub mod instrument;
pub mod indicator;
pub mod indicator_cache;
pub mod eligibility;
pub mod ranking;
pub mod sizing;
pub mod benchmark_gate;
pub mod scheduler;
pub mod engine;
pub mod config;
pub mod config_validation;
pub mod universe;
pub mod position;
pub mod portfolio;
pub mod sim_broker;
pub mod backtest;
pub mod metrics;
pub mod error;
