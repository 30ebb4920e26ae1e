//! Job application tracker: a content-addressed resume store and a durable
//! application registry, exposed through [`tracker::Tracker`] and a small
//! HTTP API.

pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod registry;
pub mod resume_store;
pub mod routes;
pub mod state;
pub mod tracker;
