//! Integration tests for dlmm-bot.
//!
//! These drive the full control loop against scripted venues:
//! - terminal conditions (missing position, failed rebalance, exit triggers)
//! - per-tick error isolation
//! - status reporting

pub mod common;
