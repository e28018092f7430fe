use std::collections::HashMap;

use actix_session::Session;
use actix_web::{HttpResponse, web};
use serde::Deserialize;

use crate::auth::session::require_user;
use crate::db::DbPool;
use crate::errors::AppError;
use crate::models::reputation::{self, voting_power};

const DEFAULT_LEADERBOARD_LIMIT: i64 = 10;

/// GET /api/translations/contributors?language=xx&limit=N
/// Top contributors for a language by reputation.
pub async fn leaderboard(
    pool: web::Data<DbPool>,
    query: web::Query<HashMap<String, String>>,
) -> Result<HttpResponse, AppError> {
    let language = query
        .get("language")
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Validation("language query parameter is required".to_string()))?;
    let limit = query
        .get("limit")
        .and_then(|s| s.parse::<i64>().ok())
        .unwrap_or(DEFAULT_LEADERBOARD_LIMIT);

    let entries = reputation::leaderboard(&pool, language, limit).await?;
    let count = entries.len();

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "leaderboard": entries,
        "count": count,
    })))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub language: String,
}

/// POST /api/translations/contributors
/// Ensures the session user has a reputation row for the language and
/// reports their current voting power.
pub async fn register(
    pool: web::Data<DbPool>,
    session: Session,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    let user_id = require_user(&session)?;
    let language = body.language.trim();
    if language.is_empty() {
        return Err(AppError::Validation("language is required".to_string()));
    }

    let rep = reputation::get_or_create(&pool, user_id, language).await?;
    let power = voting_power(rep.rep_points);

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "reputation": rep,
        "votingPower": power,
    })))
}
