use actix_web::{web, HttpResponse};
use diesel::prelude::*;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::DbPool;
use crate::errors::ApiError;
use crate::models::category::Category;
use crate::models::product::Product;
use crate::schema::{categories, products};

// ── Response DTOs ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryResponse {
    pub id: Uuid,
    pub name: String,
}

/// Projection used by the per-category listing.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProductSummaryResponse {
    pub title: String,
    /// Decimal price as a string to avoid floating-point issues, e.g. "9.99"
    pub price: String,
    pub description: String,
    pub availability: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub title: String,
    pub price: String,
    pub description: String,
    pub availability: bool,
    pub category_id: Uuid,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        ProductResponse {
            id: p.id,
            title: p.title,
            price: p.price.to_string(),
            description: p.description,
            availability: p.availability,
            category_id: p.category_id,
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /categories
#[utoipa::path(
    get,
    path = "/categories",
    responses(
        (status = 200, description = "All categories", body = [CategoryResponse]),
        (status = 500, description = "Internal server error"),
    ),
    tag = "catalog"
)]
pub async fn list_categories(pool: web::Data<DbPool>) -> Result<HttpResponse, ApiError> {
    let rows = web::block(move || {
        let mut conn = pool.get()?;
        let rows = categories::table
            .select(Category::as_select())
            .load(&mut conn)?;
        Ok::<_, ApiError>(rows)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    let items: Vec<CategoryResponse> = rows
        .into_iter()
        .map(|c| CategoryResponse {
            id: c.id,
            name: c.name,
        })
        .collect();

    Ok(HttpResponse::Ok().json(items))
}

/// GET /products/{category_id}
///
/// A category with no products yields an empty list, not an error.
#[utoipa::path(
    get,
    path = "/products/{category_id}",
    params(
        ("category_id" = Uuid, Path, description = "Category UUID"),
    ),
    responses(
        (status = 200, description = "Products in the category", body = [ProductSummaryResponse]),
        (status = 500, description = "Internal server error"),
    ),
    tag = "catalog"
)]
pub async fn list_products(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let category_id = path.into_inner();

    let rows = web::block(move || {
        let mut conn = pool.get()?;
        let rows = products::table
            .filter(products::category_id.eq(category_id))
            .select(Product::as_select())
            .load(&mut conn)?;
        Ok::<_, ApiError>(rows)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    let items: Vec<ProductSummaryResponse> = rows
        .into_iter()
        .map(|p| ProductSummaryResponse {
            title: p.title,
            price: p.price.to_string(),
            description: p.description,
            availability: p.availability,
        })
        .collect();

    Ok(HttpResponse::Ok().json(items))
}

/// GET /product/{product_id}
#[utoipa::path(
    get,
    path = "/product/{product_id}",
    params(
        ("product_id" = Uuid, Path, description = "Product UUID"),
    ),
    responses(
        (status = 200, description = "Product found", body = ProductResponse),
        (status = 404, description = "Product not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "catalog"
)]
pub async fn get_product(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let product_id = path.into_inner();

    let product = web::block(move || {
        let mut conn = pool.get()?;
        let product = products::table
            .filter(products::id.eq(product_id))
            .select(Product::as_select())
            .first(&mut conn)
            .optional()?;
        Ok::<_, ApiError>(product)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    match product {
        Some(product) => Ok(HttpResponse::Ok().json(ProductResponse::from(product))),
        None => Err(ApiError::NotFound("Product not found.".to_string())),
    }
}
