//! Error type definitions for the barcode proxy service.

pub mod types;

pub use types::ImageProxyError;
