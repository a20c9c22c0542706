//! Waste records: REST API for waste-collection records
//!
//! Staff log in with a username/password, receive a bearer token (JWT) and
//! use it to create, list, update and delete waste items held in memory.
//!
//! This lib exposes the stores, auth primitives and the Axum router; the
//! `waste_records` binary wires them to configuration and logging.

pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
// OpenAPI document generated from the handler annotations in `rest`
pub mod openapi;
// REST API module: Axum HTTP handlers, bearer-token extractor, router
pub mod rest;
pub mod storage;
