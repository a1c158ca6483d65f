//! Wire types for the storefront REST API.
//!
//! These mirror the backend's JSON (camelCase, `_id` identifiers) and ignore
//! fields this client does not use.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use partstore_core::{
    Email, ImageId, LineItemId, OrderId, Price, ProductId, Role, ShippingAddress, StatusEvent,
    StatusTimeline, TimelineEntry, UserId,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// Envelope
// =============================================================================

/// Every backend response is wrapped in this envelope.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

/// Pagination metadata for list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
}

impl Pagination {
    /// Whether another page exists after this one.
    #[must_use]
    pub fn has_more(&self) -> bool {
        u64::from(self.page) * u64::from(self.limit) < self.total
    }
}

/// One page of a list endpoint.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Option<Pagination>,
}

impl<T> Page<T> {
    /// Whether another page exists; without pagination metadata a full page
    /// is assumed to have a successor.
    #[must_use]
    pub fn has_more(&self, limit: u32) -> bool {
        self.pagination.map_or_else(
            || u32::try_from(self.items.len()).is_ok_and(|n| n >= limit && limit > 0),
            |p| p.has_more(),
        )
    }
}

// =============================================================================
// Auth Types
// =============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Successful login or registration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user_id: UserId,
    pub token: String,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub status: Option<String>,
}

/// New account details.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub email: Email,
    pub password: String,
    pub role: Role,
    pub name: String,
    pub phone: String,
}

/// The signed-in user's profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(rename = "_id", alias = "id", alias = "userId", default)]
    pub id: Option<UserId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

// =============================================================================
// Catalog Types
// =============================================================================

/// A part listed in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id", alias = "id")]
    pub id: ProductId,
    #[serde(default, alias = "name")]
    pub title: String,
    pub price: Price,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub make: Vec<String>,
    #[serde(default)]
    pub model: Vec<String>,
    #[serde(default)]
    pub images: Vec<ImageId>,
}

/// A product reference that is either a bare id or the embedded document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductRef {
    Id(ProductId),
    Embedded(Box<Product>),
}

impl ProductRef {
    #[must_use]
    pub fn id(&self) -> &ProductId {
        match self {
            Self::Id(id) => id,
            Self::Embedded(product) => &product.id,
        }
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        match self {
            Self::Id(_) => None,
            Self::Embedded(product) => Some(product.title.as_str()),
        }
    }

    #[must_use]
    pub fn price(&self) -> Option<Price> {
        match self {
            Self::Id(_) => None,
            Self::Embedded(product) => Some(product.price),
        }
    }
}

/// Filter metadata for the catalog search form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterOptions {
    pub condition: Vec<String>,
    pub brand: Vec<String>,
    pub oem: Vec<String>,
    pub material: Vec<String>,
    pub availability: Vec<String>,
    pub aftermarket: Vec<String>,
    pub make: Vec<String>,
    pub model: Vec<String>,
    pub years: Vec<String>,
    #[serde(rename = "category")]
    pub categories: Vec<serde_json::Value>,
    pub price_range: Option<PriceRange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: Price,
    pub max: Price,
}

/// A single search filter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    One(String),
    Many(Vec<String>),
}

/// Catalog search filters keyed by backend parameter name
/// (`condition`, `brand`, `make`, `categoryId`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilters(BTreeMap<String, FilterValue>);

impl SearchFilters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a single-valued filter.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), FilterValue::One(value.into()));
        self
    }

    /// Set a multi-valued filter.
    #[must_use]
    pub fn with_all<I, S>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0.insert(
            key.into(),
            FilterValue::Many(values.into_iter().map(Into::into).collect()),
        );
        self
    }

    /// Query parameters sent to the backend.
    ///
    /// Multi-valued filters are joined with `,`. Empty values and the `All`
    /// placeholder are dropped.
    #[must_use]
    pub fn to_query(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .filter_map(|(key, value)| {
                let value = match value {
                    FilterValue::One(v) => v.trim().to_owned(),
                    FilterValue::Many(vs) => vs
                        .iter()
                        .map(|v| v.trim())
                        .filter(|v| !v.is_empty())
                        .collect::<Vec<_>>()
                        .join(","),
                };
                (!value.is_empty() && value != "All").then(|| (key.clone(), value))
            })
            .collect()
    }
}

// =============================================================================
// Cart Types
// =============================================================================

/// One line of the server-side cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    #[serde(rename = "productId", alias = "product")]
    pub product: ProductRef,
    pub quantity: u32,
    #[serde(default, alias = "price", skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<Price>,
}

impl CartItem {
    /// Unit price snapshot, falling back to the embedded product's price.
    #[must_use]
    pub fn unit_price(&self) -> Option<Price> {
        self.unit_price.or_else(|| self.product.price())
    }
}

/// The server-side cart. `total` is authoritative.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cart {
    pub items: Vec<CartItem>,
    pub total: Price,
}

impl Cart {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The line for `product`, if present.
    #[must_use]
    pub fn item(&self, product: &ProductId) -> Option<&CartItem> {
        self.items.iter().find(|i| i.product.id() == product)
    }

    /// Sum of unit price x quantity over lines with a known price.
    ///
    /// For display only; [`Cart::total`] from the server is authoritative.
    #[must_use]
    pub fn computed_total(&self) -> Price {
        self.items
            .iter()
            .filter_map(|i| i.unit_price().map(|p| p * i.quantity))
            .sum()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CartMutation<'a> {
    pub product_id: &'a ProductId,
    pub quantity: u32,
}

// =============================================================================
// Order Types
// =============================================================================

/// A product and quantity in an order request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Body of the order-creation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub items: Vec<OrderItemRequest>,
    pub shipping_address: ShippingAddress,
}

/// Provider-specific payment payload issued by the backend with a new order.
///
/// Opaque to this client apart from the `sandbox` flag it stamps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentPayload(serde_json::Map<String, serde_json::Value>);

impl PaymentPayload {
    #[must_use]
    pub const fn new(fields: serde_json::Map<String, serde_json::Value>) -> Self {
        Self(fields)
    }

    /// Copy with the `sandbox` flag set.
    #[must_use]
    pub fn with_sandbox(mut self, sandbox: bool) -> Self {
        self.0
            .insert("sandbox".to_string(), serde_json::Value::Bool(sandbox));
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    #[must_use]
    pub const fn fields(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.0
    }
}

/// Result of a successful order creation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedOrder {
    #[serde(alias = "_id")]
    pub order_id: OrderId,
    #[serde(alias = "payhere", alias = "payhereData", alias = "paymentData")]
    pub payment: PaymentPayload,
}

/// One line of a placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: Option<LineItemId>,
    #[serde(rename = "productId", alias = "product")]
    pub product: ProductRef,
    pub quantity: u32,
    #[serde(default)]
    pub seller_status: Option<String>,
    #[serde(default)]
    pub courier_status: Option<String>,
    #[serde(default)]
    pub status_history: Vec<StatusEvent>,
}

impl OrderLine {
    fn timeline_entries(&self) -> impl Iterator<Item = TimelineEntry> + '_ {
        self.status_history.iter().map(|event| TimelineEntry {
            line: self.id.clone(),
            product_title: self.product.title().map(str::to_owned),
            status: event.status.clone(),
            updated_at: event.updated_at,
        })
    }
}

/// A placed order as returned by history and tracking endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id", alias = "id")]
    pub id: OrderId,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub items: Vec<OrderLine>,
    #[serde(default)]
    pub shipping_address: Option<ShippingAddress>,
    #[serde(default)]
    pub total_amount: Option<Price>,
    #[serde(default)]
    pub status: Option<String>,
}

impl Order {
    /// The combined status history of every line, newest first.
    #[must_use]
    pub fn timeline(&self) -> StatusTimeline {
        StatusTimeline::from_entries(self.items.iter().flat_map(OrderLine::timeline_entries))
    }

    /// The status history of the lines for `product`, newest first.
    ///
    /// Falls back to every line when none match, since the tracking endpoint
    /// may already have narrowed the order to the requested product.
    #[must_use]
    pub fn timeline_for(&self, product: &ProductId) -> StatusTimeline {
        let matching: Vec<&OrderLine> = self
            .items
            .iter()
            .filter(|line| line.product.id() == product)
            .collect();
        if matching.is_empty() {
            return self.timeline();
        }
        StatusTimeline::from_entries(matching.into_iter().flat_map(OrderLine::timeline_entries))
    }
}

/// Body of the tracking response.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum TrackingData {
    Order(Box<Order>),
    History {
        #[serde(rename = "statusHistory")]
        status_history: Vec<StatusEvent>,
    },
}

/// Body of the order history response.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum HistoryData {
    List(Vec<Order>),
    Wrapped {
        orders: Vec<Order>,
        #[serde(default)]
        pagination: Option<Pagination>,
    },
}

// =============================================================================
// Complaint Types
// =============================================================================

/// A complaint about a delivered order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Complaint {
    pub product_id: ProductId,
    pub description: String,
    pub refund_requested: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_amount: Option<Price>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_deserializes_backend_shape() {
        let product: Product = serde_json::from_str(
            r#"{"_id":"p1","title":"Brake Pads","price":80,"stock":3,"make":["Toyota"],"extra":true}"#,
        )
        .unwrap();
        assert_eq!(product.id.as_str(), "p1");
        assert_eq!(product.stock, 3);
        assert_eq!(product.price, Price::from_cents(8000));
    }

    #[test]
    fn test_cart_item_accepts_id_or_embedded_product() {
        let by_id: CartItem =
            serde_json::from_str(r#"{"productId":"p1","quantity":2,"price":15}"#).unwrap();
        assert_eq!(by_id.product.id().as_str(), "p1");
        assert_eq!(by_id.unit_price(), Some(Price::from_cents(1500)));

        let embedded: CartItem = serde_json::from_str(
            r#"{"productId":{"_id":"p2","title":"Filter","price":25,"stock":9},"quantity":1}"#,
        )
        .unwrap();
        assert_eq!(embedded.product.id().as_str(), "p2");
        assert_eq!(embedded.unit_price(), Some(Price::from_cents(2500)));
    }

    #[test]
    fn test_cart_computed_total() {
        let cart: Cart = serde_json::from_str(
            r#"{"items":[{"productId":"p1","quantity":1,"price":80},{"productId":"p2","quantity":2,"price":15}],"total":110}"#,
        )
        .unwrap();
        assert_eq!(cart.computed_total(), Price::from_cents(11000));
        assert_eq!(cart.total, cart.computed_total());
        assert_eq!(cart.item(&ProductId::new("p2")).unwrap().quantity, 2);
    }

    #[test]
    fn test_search_filters_query() {
        let filters = SearchFilters::new()
            .with_all("make", ["Toyota", "Honda"])
            .with("condition", "All")
            .with("brand", "Bosch")
            .with("material", "")
            .with_all("model", Vec::<String>::new());
        assert_eq!(
            filters.to_query(),
            vec![
                ("brand".to_string(), "Bosch".to_string()),
                ("make".to_string(), "Toyota,Honda".to_string()),
            ]
        );
    }

    #[test]
    fn test_created_order_accepts_payhere_payload() {
        let created: CreatedOrder = serde_json::from_str(
            r#"{"orderId":"o1","payhere":{"merchant_id":"121","order_id":"o1","amount":"110.00"}}"#,
        )
        .unwrap();
        assert_eq!(created.order_id.as_str(), "o1");
        assert_eq!(created.payment.get("amount").unwrap(), "110.00");

        let stamped = created.payment.with_sandbox(true);
        assert_eq!(stamped.get("sandbox").unwrap(), true);
    }

    #[test]
    fn test_order_timeline_for_product() {
        let order: Order = serde_json::from_str(
            r#"{
                "_id":"o1",
                "items":[
                    {"_id":"l1","productId":{"_id":"p1","title":"Pads","price":80},"quantity":1,
                     "statusHistory":[{"status":"Pending","updatedAt":"2025-03-01T00:00:00Z"},
                                      {"status":"Shipped","updatedAt":"2025-03-03T00:00:00Z"}]},
                    {"_id":"l2","productId":"p2","quantity":1,
                     "statusHistory":[{"status":"Delivered","updatedAt":"2025-03-09T00:00:00Z"}]}
                ]
            }"#,
        )
        .unwrap();

        let p1 = order.timeline_for(&ProductId::new("p1"));
        let statuses: Vec<_> = p1.entries().iter().map(|e| e.status.as_str()).collect();
        assert_eq!(statuses, ["Shipped", "Pending"]);
        assert_eq!(p1.latest().unwrap().product_title.as_deref(), Some("Pads"));

        let all = order.timeline();
        assert_eq!(all.len(), 3);
        assert_eq!(all.latest().unwrap().status, "Delivered");
    }

    #[test]
    fn test_pagination_has_more() {
        let p = Pagination {
            page: 1,
            limit: 5,
            total: 7,
        };
        assert!(p.has_more());
        let last = Pagination {
            page: 2,
            limit: 5,
            total: 7,
        };
        assert!(!last.has_more());
    }
}
