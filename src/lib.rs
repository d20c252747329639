pub mod auth;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod schema;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use auth::token::TokenSigner;
pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) {
    let mut conn = pool.get().expect("Failed to get DB connection for migrations");
    conn.run_pending_migrations(MIGRATIONS)
        .expect("Failed to run database migrations");
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::catalog::list_categories,
        handlers::catalog::list_products,
        handlers::catalog::get_product,
        handlers::cart::get_cart,
        handlers::cart::add_item,
        handlers::cart::remove_item,
        handlers::orders::place_order,
        handlers::orders::order_history,
        handlers::orders::order_details,
        handlers::auth::register,
        handlers::auth::login,
    ),
    components(schemas(
        handlers::catalog::CategoryResponse,
        handlers::catalog::ProductSummaryResponse,
        handlers::catalog::ProductResponse,
        handlers::cart::AddCartItemRequest,
        handlers::cart::RemoveCartItemRequest,
        handlers::cart::CartItemResponse,
        handlers::cart::CartResponse,
        handlers::orders::RequestedProduct,
        handlers::orders::PlaceOrderRequest,
        handlers::orders::OrderItemResponse,
        handlers::orders::OrderResponse,
        handlers::orders::OrderDetailItemResponse,
        handlers::orders::OrderDetailsResponse,
        handlers::auth::CredentialsRequest,
    )),
    tags(
        (name = "catalog", description = "Category and product browsing"),
        (name = "cart", description = "Shopping cart management"),
        (name = "orders", description = "Order placement and history"),
        (name = "auth", description = "User registration and login"),
    )
)]
pub struct ApiDoc;

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server. The signing key is injected here and shared read-only
/// by every worker; nothing else in the process holds mutable state.
pub fn build_server(
    pool: DbPool,
    signer: TokenSigner,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let openapi = ApiDoc::openapi();

    Ok(HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(signer.clone()))
            .wrap(Logger::default())
            .route("/categories", web::get().to(handlers::catalog::list_categories))
            .route("/products/{category_id}", web::get().to(handlers::catalog::list_products))
            .route("/product/{product_id}", web::get().to(handlers::catalog::get_product))
            .service(
                web::scope("/cart")
                    .route("/add", web::post().to(handlers::cart::add_item))
                    .route("/remove", web::post().to(handlers::cart::remove_item))
                    .route("/{user_id}", web::get().to(handlers::cart::get_cart)),
            )
            .service(
                web::scope("/order")
                    .route("/place", web::post().to(handlers::orders::place_order))
                    .route("/history/{user_id}", web::get().to(handlers::orders::order_history))
                    .route("/details/{order_id}", web::get().to(handlers::orders::order_details)),
            )
            .route("/register", web::post().to(handlers::auth::register))
            .route("/login", web::post().to(handlers::auth::login))
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}
