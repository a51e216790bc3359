use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::{
    models::account::Account, services::token::TokenValidation, state::AppState, store::AuthStore,
};

/// Public identifier of the device the caller's token is bound to, attached
/// to the request by the auth middleware.
#[derive(Clone, Debug)]
pub struct CurrentDevice(pub String);

pub async fn auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_bearer_token)
        .ok_or(StatusCode::UNAUTHORIZED)?
        .to_string();

    let (account_id, device_identifier) = match state.tokens.validate(&token).await {
        TokenValidation::Valid {
            account_id,
            device_identifier,
        } => (account_id, device_identifier),
        TokenValidation::Invalid => return Err(StatusCode::UNAUTHORIZED),
    };

    let account = state
        .store
        .find_account_by_id(account_id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::UNAUTHORIZED)?;

    request.extensions_mut().insert(account);
    request
        .extensions_mut()
        .insert(CurrentDevice(device_identifier));

    Ok(next.run(request).await)
}

fn parse_bearer_token(header: &str) -> Option<&str> {
    if let Some(rest) = header.strip_prefix("Bearer ") {
        return Some(rest);
    }
    if let Some(space_idx) = header.find(' ') {
        let (scheme, rest) = header.split_at(space_idx);
        if scheme.eq_ignore_ascii_case("bearer") {
            return Some(rest.trim_start());
        }
    }
    None
}
