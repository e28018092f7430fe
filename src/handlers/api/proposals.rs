use std::collections::HashMap;

use actix_session::Session;
use actix_web::{HttpResponse, web};
use serde::Deserialize;

use crate::auth::session::require_user;
use crate::db::DbPool;
use crate::errors::AppError;
use crate::models::proposal::{self, DEFAULT_QUORUM, NewProposal, VoteValue};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProposalRequest {
    pub translation_id: i64,
    pub new_title: Option<String>,
    pub new_lyrics: Option<Vec<String>>,
    pub change_reason: String,
    pub required_quorum: Option<i64>,
}

/// POST /api/translations/proposals
/// Creates a pending proposal against an existing translation.
pub async fn create(
    pool: web::Data<DbPool>,
    session: Session,
    body: web::Json<CreateProposalRequest>,
) -> Result<HttpResponse, AppError> {
    let user_id = require_user(&session)?;
    let body = body.into_inner();

    let proposal = proposal::create(
        &pool,
        &NewProposal {
            translation_id: body.translation_id,
            proposed_by: user_id,
            new_title: body.new_title,
            new_lyrics: body.new_lyrics,
            change_reason: body.change_reason,
            required_quorum: body.required_quorum.unwrap_or(DEFAULT_QUORUM),
        },
    )
    .await?;

    Ok(HttpResponse::Created().json(serde_json::json!({ "proposal": proposal })))
}

/// GET /api/translations/proposals?translationId=N
/// Lists pending proposals for a translation, oldest first.
pub async fn list(
    pool: web::Data<DbPool>,
    query: web::Query<HashMap<String, String>>,
) -> Result<HttpResponse, AppError> {
    let translation_id = query
        .get("translationId")
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| {
            AppError::Validation("translationId query parameter is required".to_string())
        })?;

    let proposals = proposal::find_pending_for_translation(&pool, translation_id).await?;
    let count = proposals.len();

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "proposals": proposals,
        "count": count,
    })))
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub vote: String,
}

/// POST /api/translations/proposals/{id}/vote
/// Casts the session user's vote; resolves the proposal when quorum lands.
pub async fn vote(
    pool: web::Data<DbPool>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<VoteRequest>,
) -> Result<HttpResponse, AppError> {
    let user_id = require_user(&session)?;
    let value = VoteValue::from_api(&body.vote).ok_or_else(|| {
        AppError::Validation("vote must be \"upvote\" or \"downvote\"".to_string())
    })?;

    proposal::cast_vote(&pool, path.into_inner(), user_id, value).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Vote recorded",
        "vote": value.as_str(),
    })))
}
