//! Prompt gallery and video generation client.
//!
//! This library provides the core functionality for vidgen: the fal.ai
//! queue client (submission, status polling, result resolution), the
//! model/prompt catalog served to the gallery, and the offline build that
//! aggregates per-item catalog files.

pub mod app_state;
pub mod config;
pub mod models;
pub mod routes;
pub mod services;
