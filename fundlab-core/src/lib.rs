//! FundLab Core — fund time-series reconciliation and financial metrics.
//!
//! This crate contains the heart of the fund analytics engine:
//! - Domain types (series points, instrument series, fee records)
//! - Extract parsing and multi-source merge with deterministic precedence
//! - Multi-series date alignment with forward-fill and rebasing
//! - Heuristic split detection and prefix rescaling
//! - Return/risk/risk-adjusted metrics at daily and monthly frequency
//! - Null-safe ranking with fee attribute joins
//!
//! Every public function is a pure, synchronous transformation over
//! in-memory data. The core performs no I/O; hosts feed it already-fetched
//! rows and consume the computed series and metrics.

pub mod data;
pub mod domain;
pub mod metrics;
pub mod rank;
