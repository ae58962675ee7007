//! Records supplied by the host application and the intents sent back to it.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub logo_image_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    pub amount: f64,
    pub currency_code: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub price: Option<Money>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl Product {
    /// Label text shown under a placed product: title and formatted price when present.
    pub fn price_tag(&self) -> Option<String> {
        let price = self
            .price
            .as_ref()
            .map(|p| format!("{:.2} {}", p.amount, p.currency_code));
        match (self.title.as_deref(), price) {
            (Some(title), Some(price)) => Some(format!("{title} {price}")),
            (Some(title), None) => Some(title.to_owned()),
            (None, Some(price)) => Some(price),
            (None, None) => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProductQuery {
    pub limit: usize,
    pub search: Option<String>,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            limit: crate::constants::PRODUCT_QUERY_LIMIT,
            search: None,
        }
    }
}

/// Host-provided tenant and product catalogue.
pub trait VenueDataSource {
    /// May be empty; the venue still renders without tenants.
    fn recommended_tenants(&self) -> Vec<Tenant>;

    /// `None` means the lookup failed. Callers place nothing for that tenant.
    fn products_for_tenant(&self, tenant_id: &str, query: &ProductQuery) -> Option<Vec<Product>>;
}

/// Request to the host to open a product page or a tenant checkout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum NavigationIntent {
    Product {
        #[serde(rename = "productId")]
        product_id: String,
    },
    Checkout {
        #[serde(rename = "shopId")]
        shop_id: String,
    },
}

/// Receiver of navigation intents. Fire and forget.
pub trait NavigationSink {
    fn navigate(&self, intent: &NavigationIntent);
}
