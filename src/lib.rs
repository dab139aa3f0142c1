//! Barcode lookup bridge and RGB565 image proxy.
//!
//! This crate mediates between embedded barcode scanners on an MQTT broker
//! and a product lookup API over HTTP. Lookup requests arrive as JSON
//! messages on per-device topics and are answered with compact, normalized
//! product records. Product images are served through an HTTP proxy that
//! resizes them and re-encodes them as packed RGB565 buffers sized for the
//! scanner's display, backed by a TTL-bounded in-memory cache.

pub mod cache;
pub mod config;
pub mod errors;
pub mod imaging;
pub mod models;
pub mod resolver;
pub mod services;
pub mod web;
