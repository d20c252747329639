use std::collections::HashMap;

use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::DbPool;
use crate::errors::ApiError;
use crate::models::cart::Cart;
use crate::models::cart_item::CartItem;
use crate::models::order::{NewOrder, Order};
use crate::models::order_item::{NewOrderItem, OrderItem};
use crate::models::product::Product;
use crate::schema::{cart_items, carts, order_items, orders, products};

use super::catalog::ProductResponse;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct RequestedProduct {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PlaceOrderRequest {
    pub user_id: Uuid,
    /// Line items echoed by some clients. The server-side cart is the
    /// source of truth; this field is accepted but never read.
    #[serde(default)]
    pub products: Vec<RequestedProduct>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderItemResponse {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub products: Vec<OrderItemResponse>,
    /// Decimal total as a string to avoid floating-point issues, e.g. "25.00"
    pub total_price: String,
    pub order_date: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderDetailItemResponse {
    /// `None` when the product has since disappeared from the catalog.
    pub product: Option<ProductResponse>,
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderDetailsResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub products: Vec<OrderDetailItemResponse>,
    pub total_price: String,
    pub order_date: String,
}

fn order_response(order: Order, items: Vec<OrderItemResponse>) -> OrderResponse {
    OrderResponse {
        id: order.id,
        user_id: order.user_id,
        products: items,
        total_price: order.total_price.to_string(),
        order_date: order.order_date.to_rfc3339(),
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /order/place
///
/// Reads the user's cart, totals it against current catalog prices,
/// persists the order with a snapshot of the lines, and empties the
/// cart. The whole flow is one transaction with the cart row locked, so
/// two concurrent placements for the same user cannot both consume the
/// same cart.
#[utoipa::path(
    post,
    path = "/order/place",
    request_body = PlaceOrderRequest,
    responses(
        (status = 200, description = "Order placed", body = OrderResponse),
        (status = 404, description = "Cart not found or empty"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn place_order(
    pool: web::Data<DbPool>,
    body: web::Json<PlaceOrderRequest>,
) -> Result<HttpResponse, ApiError> {
    let user_id = body.into_inner().user_id;

    let order = web::block(move || {
        let mut conn = pool.get()?;

        conn.transaction::<_, ApiError, _>(|conn| {
            // 1. Lock the cart row; concurrent placements for one user queue here.
            let cart = carts::table
                .filter(carts::user_id.eq(user_id))
                .select(Cart::as_select())
                .for_update()
                .first(conn)
                .optional()?
                .ok_or_else(|| ApiError::NotFound("Cart not found.".to_string()))?;

            // 2. Resolve each line against its own product row. Two lines
            //    holding the same product id are priced independently.
            let lines: Vec<(CartItem, Product)> = cart_items::table
                .inner_join(products::table)
                .filter(cart_items::cart_id.eq(cart.id))
                .order(cart_items::added_at.asc())
                .select((CartItem::as_select(), Product::as_select()))
                .load(conn)?;

            if lines.is_empty() {
                return Err(ApiError::NotFound("Cart is empty.".to_string()));
            }

            // 3. Total at the current catalog price, not the add-to-cart price.
            let total_price = lines.iter().fold(BigDecimal::from(0), |acc, (item, product)| {
                acc + BigDecimal::from(item.quantity) * &product.price
            });

            // 4. Persist the order and the line snapshot.
            let order_id = Uuid::new_v4();
            diesel::insert_into(orders::table)
                .values(&NewOrder {
                    id: order_id,
                    user_id,
                    total_price,
                })
                .execute(conn)?;

            let new_items: Vec<NewOrderItem> = lines
                .iter()
                .map(|(item, product)| NewOrderItem {
                    id: Uuid::new_v4(),
                    order_id,
                    product_id: item.product_id,
                    quantity: item.quantity,
                    unit_price: product.price.clone(),
                })
                .collect();
            diesel::insert_into(order_items::table)
                .values(&new_items)
                .execute(conn)?;

            // 5. Empty the cart; the cart row itself survives.
            diesel::delete(cart_items::table.filter(cart_items::cart_id.eq(cart.id)))
                .execute(conn)?;

            let order = orders::table
                .filter(orders::id.eq(order_id))
                .select(Order::as_select())
                .first(conn)?;

            let items = new_items
                .iter()
                .map(|i| OrderItemResponse {
                    product_id: i.product_id,
                    quantity: i.quantity,
                })
                .collect();

            Ok(order_response(order, items))
        })
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(order))
}

/// GET /order/history/{user_id}
///
/// All of the user's orders, most recent first.
#[utoipa::path(
    get,
    path = "/order/history/{user_id}",
    params(
        ("user_id" = Uuid, Path, description = "User UUID"),
    ),
    responses(
        (status = 200, description = "Order history, newest first", body = [OrderResponse]),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn order_history(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let user_id = path.into_inner();

    let history = web::block(move || {
        let mut conn = pool.get()?;

        let rows = orders::table
            .filter(orders::user_id.eq(user_id))
            .order(orders::order_date.desc())
            .select(Order::as_select())
            .load(&mut conn)?;

        // Batch-fetch every order's items in one query, then group.
        let order_ids: Vec<Uuid> = rows.iter().map(|o| o.id).collect();
        let items = order_items::table
            .filter(order_items::order_id.eq_any(order_ids))
            .select(OrderItem::as_select())
            .load(&mut conn)?;

        let mut by_order: HashMap<Uuid, Vec<OrderItemResponse>> = HashMap::new();
        for item in items {
            by_order.entry(item.order_id).or_default().push(OrderItemResponse {
                product_id: item.product_id,
                quantity: item.quantity,
            });
        }

        let history: Vec<OrderResponse> = rows
            .into_iter()
            .map(|o| {
                let items = by_order.remove(&o.id).unwrap_or_default();
                order_response(o, items)
            })
            .collect();

        Ok::<_, ApiError>(history)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(history))
}

/// GET /order/details/{order_id}
///
/// The order with each line's product reference resolved to the full
/// product record: order row, then its items, then one batched product
/// fetch by id.
#[utoipa::path(
    get,
    path = "/order/details/{order_id}",
    params(
        ("order_id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Order with resolved products", body = OrderDetailsResponse),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn order_details(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let order_id = path.into_inner();

    let details = web::block(move || {
        let mut conn = pool.get()?;

        let order = orders::table
            .filter(orders::id.eq(order_id))
            .select(Order::as_select())
            .first(&mut conn)
            .optional()?;

        let Some(order) = order else {
            return Ok::<_, ApiError>(None);
        };

        let items = order_items::table
            .filter(order_items::order_id.eq(order.id))
            .select(OrderItem::as_select())
            .load(&mut conn)?;

        let product_ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
        let resolved: HashMap<Uuid, Product> = products::table
            .filter(products::id.eq_any(product_ids))
            .select(Product::as_select())
            .load(&mut conn)?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let products = items
            .into_iter()
            .map(|item| OrderDetailItemResponse {
                product: resolved.get(&item.product_id).cloned().map(ProductResponse::from),
                quantity: item.quantity,
            })
            .collect();

        Ok(Some(OrderDetailsResponse {
            id: order.id,
            user_id: order.user_id,
            products,
            total_price: order.total_price.to_string(),
            order_date: order.order_date.to_rfc3339(),
        }))
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    match details {
        Some(details) => Ok(HttpResponse::Ok().json(details)),
        None => Err(ApiError::NotFound("Order not found.".to_string())),
    }
}
