use actix_web::{web, HttpResponse};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::DbPool;
use crate::errors::ApiError;
use crate::models::cart::{Cart, NewCart};
use crate::models::cart_item::{CartItem, NewCartItem};
use crate::schema::{cart_items, carts, products};

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddCartItemRequest {
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RemoveCartItemRequest {
    pub user_id: Uuid,
    pub product_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartItemResponse {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<CartItemResponse>,
}

fn cart_response(conn: &mut PgConnection, cart: Cart) -> Result<CartResponse, ApiError> {
    let items = cart_items::table
        .filter(cart_items::cart_id.eq(cart.id))
        .order(cart_items::added_at.asc())
        .select(CartItem::as_select())
        .load(conn)?;

    Ok(CartResponse {
        id: cart.id,
        user_id: cart.user_id,
        items: items
            .into_iter()
            .map(|i| CartItemResponse {
                product_id: i.product_id,
                quantity: i.quantity,
            })
            .collect(),
    })
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /cart/{user_id}
#[utoipa::path(
    get,
    path = "/cart/{user_id}",
    params(
        ("user_id" = Uuid, Path, description = "User UUID"),
    ),
    responses(
        (status = 200, description = "The user's cart", body = CartResponse),
        (status = 404, description = "Cart not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "cart"
)]
pub async fn get_cart(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let user_id = path.into_inner();

    let cart = web::block(move || {
        let mut conn = pool.get()?;
        let cart = carts::table
            .filter(carts::user_id.eq(user_id))
            .select(Cart::as_select())
            .first(&mut conn)
            .optional()?
            .ok_or_else(|| ApiError::NotFound("Cart not found.".to_string()))?;
        cart_response(&mut conn, cart)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(cart))
}

/// POST /cart/add
///
/// Appends a line item to the user's cart, creating the cart on first
/// use. The same product may appear on several lines.
#[utoipa::path(
    post,
    path = "/cart/add",
    request_body = AddCartItemRequest,
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
        (status = 400, description = "Invalid quantity"),
        (status = 404, description = "Product not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "cart"
)]
pub async fn add_item(
    pool: web::Data<DbPool>,
    body: web::Json<AddCartItemRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    if body.quantity < 1 {
        return Err(ApiError::BadRequest(
            "Quantity must be at least 1.".to_string(),
        ));
    }

    let cart = web::block(move || {
        let mut conn = pool.get()?;
        conn.transaction::<_, ApiError, _>(|conn| {
            let product_exists = products::table
                .filter(products::id.eq(body.product_id))
                .select(products::id)
                .first::<Uuid>(conn)
                .optional()?;
            if product_exists.is_none() {
                return Err(ApiError::NotFound("Product not found.".to_string()));
            }

            let cart = carts::table
                .filter(carts::user_id.eq(body.user_id))
                .select(Cart::as_select())
                .first(conn)
                .optional()?;
            let cart = match cart {
                Some(cart) => cart,
                None => {
                    let new_cart = NewCart {
                        id: Uuid::new_v4(),
                        user_id: body.user_id,
                    };
                    diesel::insert_into(carts::table)
                        .values(&new_cart)
                        .execute(conn)?;
                    carts::table
                        .filter(carts::id.eq(new_cart.id))
                        .select(Cart::as_select())
                        .first(conn)?
                }
            };

            diesel::insert_into(cart_items::table)
                .values(&NewCartItem {
                    id: Uuid::new_v4(),
                    cart_id: cart.id,
                    product_id: body.product_id,
                    quantity: body.quantity,
                })
                .execute(conn)?;

            cart_response(conn, cart)
        })
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(cart))
}

/// POST /cart/remove
///
/// Drops every line item for the given product from the user's cart.
#[utoipa::path(
    post,
    path = "/cart/remove",
    request_body = RemoveCartItemRequest,
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
        (status = 404, description = "Cart not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "cart"
)]
pub async fn remove_item(
    pool: web::Data<DbPool>,
    body: web::Json<RemoveCartItemRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();

    let cart = web::block(move || {
        let mut conn = pool.get()?;
        conn.transaction::<_, ApiError, _>(|conn| {
            let cart = carts::table
                .filter(carts::user_id.eq(body.user_id))
                .select(Cart::as_select())
                .first(conn)
                .optional()?
                .ok_or_else(|| ApiError::NotFound("Cart not found.".to_string()))?;

            diesel::delete(
                cart_items::table
                    .filter(cart_items::cart_id.eq(cart.id))
                    .filter(cart_items::product_id.eq(body.product_id)),
            )
            .execute(conn)?;

            cart_response(conn, cart)
        })
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(cart))
}
