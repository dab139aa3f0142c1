//! Wire-facing data models for the scanner messaging protocol.

use serde::{Deserialize, Serialize};

/// Barcode lookup request published by a scanner device.
///
/// The originating device is identified by the topic the request arrived
/// on, not by the payload. A request without a barcode is invalid and never
/// answered.
#[derive(Debug, Clone, Deserialize)]
pub struct LookupRequest {
    pub barcode: String,
    /// Opaque correlation id chosen by the device, echoed back verbatim.
    pub request_id: Option<String>,
}

/// Response published back to the requesting device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LookupResponse {
    pub request_id: String,
    pub success: bool,
    pub barcode: String,
    /// `None` (serialized as JSON null) when the barcode resolved to nothing.
    pub product: Option<ProductRecord>,
    pub lookup_time_ms: u64,
    /// Unix seconds at response time.
    pub timestamp: i64,
}

/// Normalized projection of a provider product.
///
/// Every field carries a defined fallback; the response encoder never sees
/// a missing value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductRecord {
    pub name: String,
    pub brand: String,
    pub model: String,
    pub price: String,
    /// URL of the local RGB565 image proxy for the product image, when the
    /// provider listed one.
    pub image_url: Option<String>,
    pub upc: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_without_barcode_fails_to_parse() {
        let result: Result<LookupRequest, _> =
            serde_json::from_value(json!({ "request_id": "abc123", "timestamp": 1700000000 }));
        assert!(result.is_err());
    }

    #[test]
    fn request_parses_with_optional_request_id_absent() {
        let request: LookupRequest =
            serde_json::from_value(json!({ "barcode": "012345678905" })).unwrap();
        assert_eq!(request.barcode, "012345678905");
        assert_eq!(request.request_id, None);
    }

    #[test]
    fn failed_lookup_serializes_product_as_null() {
        let response = LookupResponse {
            request_id: "abc123".to_string(),
            success: false,
            barcode: "000000000000".to_string(),
            product: None,
            lookup_time_ms: 42,
            timestamp: 1700000000,
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            json!({
                "request_id": "abc123",
                "success": false,
                "barcode": "000000000000",
                "product": null,
                "lookup_time_ms": 42,
                "timestamp": 1700000000
            })
        );
    }
}
