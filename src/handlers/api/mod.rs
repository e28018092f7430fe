pub mod contributors;
pub mod proposals;

use actix_web::{
    Error, HttpResponse,
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
    web,
};

/// CSRF protection for the JSON API mutation endpoints.
///
/// Rejects POST/PUT/DELETE requests that don't have Content-Type:
/// application/json. Browsers cannot send cross-origin JSON with cookies via
/// simple form POST, so the Content-Type check acts as a CSRF guard without
/// requiring tokens. GET requests are exempt (read-only, no state changes).
async fn require_json_content_type(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let method = req.method().clone();

    if method == actix_web::http::Method::POST
        || method == actix_web::http::Method::PUT
        || method == actix_web::http::Method::DELETE
    {
        let content_type = req
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if !content_type.starts_with("application/json") {
            let body = serde_json::json!({
                "error": "Content-Type must be application/json for mutation requests"
            });
            let response = HttpResponse::BadRequest().json(body);
            return Ok(req.into_response(response).map_into_right_body());
        }
    }

    next.call(req).await.map(|res| res.map_into_left_body())
}

/// Configure the /api/translations routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/proposals")
            .wrap(actix_web::middleware::from_fn(require_json_content_type))
            .route("", web::get().to(proposals::list))
            .route("", web::post().to(proposals::create))
            .route("/{id}/vote", web::post().to(proposals::vote)),
    );
    cfg.service(
        web::scope("/contributors")
            .wrap(actix_web::middleware::from_fn(require_json_content_type))
            .route("", web::get().to(contributors::leaderboard))
            .route("", web::post().to(contributors::register)),
    );
}
