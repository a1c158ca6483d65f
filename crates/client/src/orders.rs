//! Order creation, history, tracking and cancellation.

use std::collections::HashSet;

use partstore_core::{OrderId, ProductId, StatusTimeline, TimelineEntry};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::error::{ApiError, add_breadcrumb};
use crate::http::{ApiClient, segment};
use crate::types::{CreatedOrder, HistoryData, Order, OrderRequest, Page, TrackingData};

pub const DEFAULT_HISTORY_PAGE: u32 = 1;
pub const DEFAULT_HISTORY_LIMIT: u32 = 5;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TrackRequest<'a> {
    product_id: &'a ProductId,
}

/// Order endpoints under `buyer/order`.
#[derive(Debug, Clone)]
pub struct OrderService {
    api: ApiClient,
}

impl OrderService {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Create an order and receive its payment payload.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` for an empty order, a zero quantity or
    /// an incomplete address (no request is sent), or an error if the API
    /// request fails.
    #[instrument(skip(self, request), fields(items = request.items.len()))]
    pub async fn create_order(&self, request: &OrderRequest) -> Result<CreatedOrder, ApiError> {
        self.api.credentials().require("create an order")?;

        if request.items.is_empty() {
            return Err(ApiError::Validation("Your cart is empty".to_string()));
        }
        if request.items.iter().any(|item| item.quantity < 1) {
            return Err(ApiError::Validation(
                "Quantity must be at least 1".to_string(),
            ));
        }
        request.shipping_address.validate()?;

        let created = self
            .api
            .post::<_, CreatedOrder>("buyer/order", request)
            .await?
            .data
            .ok_or_else(|| ApiError::Decode("order response carried no data".to_string()))?;

        add_breadcrumb("order", "Order created", &[("order_id", created.order_id.as_str())]);
        info!(order_id = %created.order_id, "Order created");
        Ok(created)
    }

    /// Cancel an order.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthenticated` when signed out, or an error if
    /// the API request fails.
    #[instrument(skip(self), fields(order_id = %order))]
    pub async fn cancel_order(&self, order: &OrderId) -> Result<(), ApiError> {
        self.api.credentials().require("cancel an order")?;
        if order.is_blank() {
            return Err(ApiError::Validation("Order ID is required".to_string()));
        }

        let path = format!("buyer/order/cancel/{}", segment(order.as_str()));
        self.api.post_empty::<serde_json::Value>(&path).await?;

        add_breadcrumb("order", "Order cancelled", &[("order_id", order.as_str())]);
        Ok(())
    }

    /// One page of the signed-in buyer's orders.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthenticated` when signed out, or an error if
    /// the API request fails.
    #[instrument(skip(self))]
    pub async fn order_history(&self, page: u32, limit: u32) -> Result<Page<Order>, ApiError> {
        self.api.credentials().require("view order history")?;

        let query = [
            ("page".to_string(), page.max(1).to_string()),
            ("limit".to_string(), limit.max(1).to_string()),
        ];
        let envelope = self.api.get::<HistoryData>("buyer/orders", &query).await?;

        let page = match envelope.data {
            Some(HistoryData::List(items)) => Page {
                items,
                pagination: envelope.pagination,
            },
            Some(HistoryData::Wrapped { orders, pagination }) => Page {
                items: orders,
                pagination: pagination.or(envelope.pagination),
            },
            None => Page {
                items: Vec::new(),
                pagination: envelope.pagination,
            },
        };

        debug!(count = page.items.len(), "Fetched order history page");
        Ok(page)
    }

    /// Fetch the next page into `history`. Returns how many new orders were
    /// added.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails; `history` is unchanged.
    pub async fn load_more(&self, history: &mut OrderHistory) -> Result<usize, ApiError> {
        if !history.has_more() {
            return Ok(0);
        }
        let page = self
            .order_history(history.next_page, history.limit)
            .await?;
        Ok(history.append_page(page))
    }

    /// Status events of `product`'s line within `order`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` when `product` is blank, or an error if
    /// the API request fails.
    #[instrument(skip(self), fields(order_id = %order, product_id = %product))]
    pub async fn track_order(
        &self,
        order: &OrderId,
        product: &ProductId,
    ) -> Result<StatusTimeline, ApiError> {
        self.api.credentials().require("track an order")?;
        if product.is_blank() {
            return Err(ApiError::Validation("productId is required".to_string()));
        }

        let path = format!("buyer/order/track/{}", segment(order.as_str()));
        let body = TrackRequest {
            product_id: product,
        };

        let envelope = match self.api.post::<_, TrackingData>(&path, &body).await {
            Err(ApiError::NotFound(_)) => {
                debug!("Tracking POST not found, retrying as GET");
                let query = [("productId".to_string(), product.as_str().to_string())];
                self.api.get::<TrackingData>(&path, &query).await?
            }
            other => other?,
        };

        let timeline = match envelope.data {
            Some(TrackingData::Order(order)) => order.timeline_for(product),
            Some(TrackingData::History { status_history }) => {
                StatusTimeline::from_entries(status_history.into_iter().map(|event| {
                    TimelineEntry {
                        line: None,
                        product_title: None,
                        status: event.status,
                        updated_at: event.updated_at,
                    }
                }))
            }
            None => StatusTimeline::default(),
        };

        Ok(timeline)
    }
}

/// Orders accumulated across "load more" pages.
///
/// Pages can shift while the server is being written to, so the same order
/// may come back on two pages. The first occurrence is kept.
#[derive(Debug, Clone)]
pub struct OrderHistory {
    orders: Vec<Order>,
    seen: HashSet<OrderId>,
    next_page: u32,
    limit: u32,
    exhausted: bool,
}

impl Default for OrderHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl OrderHistory {
    #[must_use]
    pub fn new(limit: u32) -> Self {
        Self {
            orders: Vec::new(),
            seen: HashSet::new(),
            next_page: DEFAULT_HISTORY_PAGE,
            limit: limit.max(1),
            exhausted: false,
        }
    }

    /// Add a page, skipping orders already present. Returns how many were added.
    pub fn append_page(&mut self, page: Page<Order>) -> usize {
        self.exhausted = !page.has_more(self.limit);
        self.next_page += 1;

        let before = self.orders.len();
        for order in page.items {
            if self.seen.insert(order.id.clone()) {
                self.orders.push(order);
            }
        }
        self.orders.len() - before
    }

    #[must_use]
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Whether another page may exist.
    #[must_use]
    pub const fn has_more(&self) -> bool {
        !self.exhausted
    }

    #[must_use]
    pub fn get(&self, id: &OrderId) -> Option<&Order> {
        self.orders.iter().find(|order| &order.id == id)
    }
}
