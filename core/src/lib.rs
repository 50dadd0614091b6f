//! Core library for the ASA24 dietary recall dashboard.
//!
//! Loads the six CSV exports of an ASA24 study directory into typed, immutable
//! tables and derives the dashboard's reports from them: nutrient and food
//! group summaries, supplements, meals, food items and the Healthy Eating
//! Index 2015. Reports are plain [`table::Table`]s that the front ends render,
//! chart and export.

pub mod aggregate;
pub mod chart;
pub mod dataset;
pub mod error;
pub mod export;
pub mod glossary;
pub mod hei;
pub mod loader;
pub mod meals;
pub mod models;
pub mod report;
pub mod service;
pub mod supplements;
pub mod table;

#[cfg(test)]
pub(crate) mod testing;
