use axum::{extract::Request, middleware::Next, response::Response};

/// Who performed the operation, taken from the `x-actor` header. Ledger
/// entries record it; there is no authentication on this service.
#[derive(Debug, Clone)]
pub struct ActorContext {
    pub name: String,
}

pub const DEFAULT_ACTOR: &str = "operator";

pub async fn with_actor(mut req: Request, next: Next) -> Response {
    let name = req
        .headers()
        .get("x-actor")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_ACTOR)
        .to_string();
    req.extensions_mut().insert(ActorContext { name });
    next.run(req).await
}
