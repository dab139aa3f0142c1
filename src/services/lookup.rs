//! Product lookup client.
//!
//! Wraps the remote product API: issues the bounded-time lookup call,
//! normalizes the provider's loosely shaped JSON into a [`ProductRecord`],
//! and rewrites product image URLs to point at the local RGB565 proxy.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::models::ProductRecord;

/// Dimensions requested for proxied product images.
const PROXY_IMAGE_SIZE: u32 = 80;

const USER_AGENT: &str = concat!("barcode-proxy/", env!("CARGO_PKG_VERSION"));

/// Client for the product lookup API.
///
/// Failures never escape this boundary: timeouts, transport errors,
/// non-success statuses, parse failures and empty product lists all collapse
/// to `None`, with the reason available in the log only.
#[derive(Clone)]
pub struct LookupClient {
    client: Client,
    api_base: String,
    api_key: String,
    public_base_url: String,
}

/// Provider response envelope.
#[derive(Debug, Deserialize)]
struct LookupReply {
    #[serde(default)]
    products: Vec<ProviderProduct>,
}

/// A single product as returned by the provider.
///
/// The provider schema has no formal contract: names vary between
/// `title`/`product_name` and `mpn`/`model`, prices arrive as strings or
/// numbers, and any field may be absent.
#[derive(Debug, Default, Deserialize)]
struct ProviderProduct {
    title: Option<String>,
    product_name: Option<String>,
    brand: Option<String>,
    mpn: Option<String>,
    model: Option<String>,
    barcode_number: Option<String>,
    #[serde(default)]
    stores: Vec<ProviderStore>,
    #[serde(default)]
    images: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderStore {
    price: Option<Value>,
}

impl LookupClient {
    pub fn new(config: &Config, api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http.request_timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_base: config.lookup.api_base.clone(),
            api_key,
            public_base_url: config.web.base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Resolve `barcode` to a normalized product record, or `None` when the
    /// product is unknown or the provider is unreachable.
    pub async fn lookup(&self, barcode: &str) -> Option<ProductRecord> {
        debug!("Looking up barcode: {}", barcode);

        let response = match self
            .client
            .get(&self.api_base)
            .query(&[
                ("barcode", barcode),
                ("formatted", "y"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                warn!("Lookup timed out for barcode {}", barcode);
                return None;
            }
            Err(e) => {
                warn!("Lookup request failed for barcode {}: {}", barcode, e);
                return None;
            }
        };

        if !response.status().is_success() {
            warn!(
                "Lookup API returned {} for barcode {}",
                response.status(),
                barcode
            );
            return None;
        }

        let reply: LookupReply = match response.json().await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Failed to parse lookup response for {}: {}", barcode, e);
                return None;
            }
        };

        let Some(product) = reply.products.into_iter().next() else {
            info!("No products found for barcode: {}", barcode);
            return None;
        };

        Some(self.normalize(product, barcode))
    }

    /// Collapse the provider's optional fields into the fixed-shape record
    /// the scanner expects.
    fn normalize(&self, product: ProviderProduct, barcode: &str) -> ProductRecord {
        let image_url = product
            .images
            .first()
            .and_then(Value::as_str)
            .map(|source| self.proxy_image_url(source));

        ProductRecord {
            name: first_nonempty([product.title, product.product_name])
                .unwrap_or_else(|| "Unknown Product".to_string()),
            brand: product
                .brand
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "Unknown Brand".to_string()),
            model: first_nonempty([product.mpn, product.model]).unwrap_or_default(),
            price: format_price(product.stores.first()),
            image_url,
            upc: product
                .barcode_number
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| barcode.to_string()),
        }
    }

    /// Rewrite a product image URL to the local proxy endpoint, which serves
    /// the image as a device-ready RGB565 buffer. The path segment is a
    /// digest of the source URL so devices get a stable, short identifier.
    fn proxy_image_url(&self, source: &str) -> String {
        let digest = format!("{:x}", md5::compute(source.as_bytes()));
        format!(
            "{}/image/{}?url={}&w={}&h={}",
            self.public_base_url,
            &digest[..16],
            urlencoding::encode(source),
            PROXY_IMAGE_SIZE,
            PROXY_IMAGE_SIZE
        )
    }
}

fn first_nonempty<const N: usize>(candidates: [Option<String>; N]) -> Option<String> {
    candidates.into_iter().flatten().find(|s| !s.is_empty())
}

/// Price display string: first store's price when any store is listed, or
/// the explicit unavailable marker when none are.
fn format_price(store: Option<&ProviderStore>) -> String {
    match store {
        Some(store) => match &store.price {
            Some(Value::String(price)) if !price.is_empty() => format!("${}", price),
            Some(Value::Number(price)) => format!("${}", price),
            _ => "$N/A".to_string(),
        },
        None => "Price N/A".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_client() -> LookupClient {
        let mut config = Config::default();
        config.web.base_url = "http://proxy.local:3000".to_string();
        LookupClient::new(&config, "test-key".to_string())
    }

    fn provider_product(value: Value) -> ProviderProduct {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn normalizes_sparse_product_with_full_fallbacks() {
        let client = test_client();
        let product = provider_product(json!({
            "title": "Widget",
            "brand": "Acme",
            "images": ["http://img.example/x.jpg"]
        }));

        let record = client.normalize(product, "012345678905");

        assert_eq!(
            record,
            ProductRecord {
                name: "Widget".to_string(),
                brand: "Acme".to_string(),
                model: String::new(),
                price: "Price N/A".to_string(),
                image_url: Some(
                    "http://proxy.local:3000/image/c1b41749d3177fb5\
                     ?url=http%3A%2F%2Fimg.example%2Fx.jpg&w=80&h=80"
                        .to_string()
                ),
                upc: "012345678905".to_string(),
            }
        );
    }

    #[test]
    fn falls_back_to_alternate_field_names() {
        let client = test_client();
        let product = provider_product(json!({
            "product_name": "Widget Deluxe",
            "model": "WD-2",
            "barcode_number": "00000000001"
        }));

        let record = client.normalize(product, "012345678905");

        assert_eq!(record.name, "Widget Deluxe");
        assert_eq!(record.model, "WD-2");
        assert_eq!(record.upc, "00000000001");
        assert_eq!(record.brand, "Unknown Brand");
        assert_eq!(record.image_url, None);
    }

    #[test]
    fn primary_field_names_win_over_alternates() {
        let client = test_client();
        let product = provider_product(json!({
            "title": "Widget",
            "product_name": "Widget (marketplace)",
            "mpn": "W-1",
            "model": "WD-2"
        }));

        let record = client.normalize(product, "012345678905");
        assert_eq!(record.name, "Widget");
        assert_eq!(record.model, "W-1");
    }

    #[test]
    fn empty_strings_fall_through_like_missing_fields() {
        let client = test_client();
        let product = provider_product(json!({
            "title": "",
            "product_name": "Widget",
            "brand": "",
            "barcode_number": ""
        }));

        let record = client.normalize(product, "012345678905");
        assert_eq!(record.name, "Widget");
        assert_eq!(record.brand, "Unknown Brand");
        assert_eq!(record.upc, "012345678905");
    }

    #[test]
    fn price_uses_first_store_and_handles_both_json_shapes() {
        let client = test_client();

        let record = client.normalize(
            provider_product(json!({ "stores": [{ "price": "12.99" }, { "price": "9.99" }] })),
            "0",
        );
        assert_eq!(record.price, "$12.99");

        let record = client.normalize(
            provider_product(json!({ "stores": [{ "price": 5 }] })),
            "0",
        );
        assert_eq!(record.price, "$5");

        let record = client.normalize(provider_product(json!({ "stores": [{}] })), "0");
        assert_eq!(record.price, "$N/A");
    }

    #[test]
    fn non_string_image_entries_yield_no_proxy_url() {
        let client = test_client();
        let product = provider_product(json!({ "images": [{ "src": "nested" }] }));
        assert_eq!(client.normalize(product, "0").image_url, None);
    }

    #[test]
    fn proxy_url_embeds_encoded_source_and_default_dimensions() {
        let client = test_client();
        let url = client.proxy_image_url("http://img.example/a b.png");
        assert!(url.starts_with("http://proxy.local:3000/image/"));
        assert!(url.contains("url=http%3A%2F%2Fimg.example%2Fa%20b.png"));
        assert!(url.ends_with("&w=80&h=80"));
    }
}
