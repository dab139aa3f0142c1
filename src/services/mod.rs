//! Service layer: outbound calls to the product lookup provider.

pub mod lookup;

pub use lookup::LookupClient;
