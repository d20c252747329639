use actix_web::{web, HttpResponse};
use diesel::prelude::*;
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::password;
use crate::auth::token::TokenSigner;
use crate::db::DbPool;
use crate::errors::ApiError;
use crate::models::user::{NewUser, User};
use crate::schema::users;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

/// POST /register
///
/// Hashes the password and stores the user. The response acknowledges
/// only; neither the password nor its hash ever leaves the server.
#[utoipa::path(
    post,
    path = "/register",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "User registered"),
        (status = 400, description = "Missing username or password"),
        (status = 409, description = "Username already taken"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "auth"
)]
pub async fn register(
    pool: web::Data<DbPool>,
    body: web::Json<CredentialsRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    if body.username.trim().is_empty() || body.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Username and password are required.".to_string(),
        ));
    }

    web::block(move || {
        // Argon2 is CPU-heavy; keep it off the async executor.
        let password_hash = password::hash_password(&body.password)?;

        let mut conn = pool.get()?;
        diesel::insert_into(users::table)
            .values(&NewUser {
                id: Uuid::new_v4(),
                username: body.username,
                password_hash,
            })
            .execute(&mut conn)
            .map_err(|e| match e {
                diesel::result::Error::DatabaseError(
                    diesel::result::DatabaseErrorKind::UniqueViolation,
                    _,
                ) => ApiError::Conflict("Username is already taken.".to_string()),
                other => other.into(),
            })?;
        Ok::<_, ApiError>(())
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(json!({ "message": "User registered successfully." })))
}

/// POST /login
///
/// An unknown username and a wrong password are indistinguishable to
/// the caller: both are 401.
#[utoipa::path(
    post,
    path = "/login",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "Signed session token"),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "auth"
)]
pub async fn login(
    pool: web::Data<DbPool>,
    signer: web::Data<TokenSigner>,
    body: web::Json<CredentialsRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();

    let user_id = web::block(move || {
        let mut conn = pool.get()?;
        let user = users::table
            .filter(users::username.eq(&body.username))
            .select(User::as_select())
            .first(&mut conn)
            .optional()?;

        let Some(user) = user else {
            return Err(ApiError::Unauthorized);
        };
        if !password::verify_password(&user.password_hash, &body.password)? {
            return Err(ApiError::Unauthorized);
        }
        Ok::<_, ApiError>(user.id)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    let token = signer.issue(user_id)?;
    Ok(HttpResponse::Ok().json(json!({ "token": token })))
}
