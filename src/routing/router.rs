//! Route table.

use axum::{
    extract::{rejection::RawPathParamsRejection, MatchedPath, RawPathParams, Request},
    middleware::Next,
    response::Response,
    routing::get,
    Router,
};

use crate::http::handlers::{health, users};
use crate::http::request::RequestContext;
use crate::http::server::AppState;
use crate::routing::template::normalize;

pub const USERS: &str = "/api/v1/users";
pub const USER: &str = "/api/v1/users/{id}";

/// Every enveloped route of the service. `/metrics` is mounted separately.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/live", get(health::live))
        .route("/container", get(health::live))
        .route(USERS, get(users::list_users).post(users::create_user))
        .route(
            USER,
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
}

/// Runs only for matched routes: records the template and path parameters.
///
/// Parameters that cannot be decoded are left out; the handler reports them.
pub async fn bind_route(
    params: Result<RawPathParams, RawPathParamsRejection>,
    req: Request,
    next: Next,
) -> Response {
    if let Some(template) = req.extensions().get::<MatchedPath>() {
        let route = normalize(template.as_str());
        tracing::Span::current().record("route", route.as_str());

        if let Some(ctx) = req.extensions().get::<RequestContext>() {
            ctx.insert("route", route);
            if let Ok(params) = &params {
                for (name, value) in params {
                    ctx.insert(format!("param.{name}"), value);
                }
            }
        }
    }

    next.run(req).await
}
