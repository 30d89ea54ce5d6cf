//! Adaptive prediction engine for virtual football leagues.
//!
//! Scores fixtures with a multi-factor heuristic, adapts its confidence
//! threshold to recent results, pauses itself after a bad run, and archives
//! and resets its state at season boundaries. A reinforcement-learning model
//! can ride along in shadow mode through the [`shadow::ShadowScorer`] trait
//! without ever touching the official predictions.
//!
//! Upstream data collection (odds, standings, results) and any front-end are
//! external: they feed the SQLite store and call
//! [`orchestrator::on_round_collected`] once per newly observed round.

pub mod adaptive;
pub mod archive;
pub mod config;
pub mod features;
pub mod form;
pub mod orchestrator;
pub mod scoring;
pub mod session;
pub mod shadow;
pub mod store;
