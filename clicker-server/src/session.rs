use {
    axum::{
        extract::FromRequestParts,
        http::{HeaderMap, HeaderValue, header::COOKIE, request::Parts},
    },
    crate::{
        database::{UserId, sessions::SessionRecord},
        error::ServerError,
        http::AppState,
    },
};

pub const SESSION_COOKIE: &str = "session";

/// Session attached to the request via cookie. Empty when there is no cookie or it is unknown.
#[derive(Debug, Clone, Default)]
pub struct Session {
    record: Option<SessionRecord>,
}

impl Session {
    pub fn token(&self) -> Option<&str> {
        self.record.as_ref().map(|v| v.token.as_str())
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.record.as_ref().and_then(|v| v.user_id)
    }
}

impl FromRequestParts<AppState> for Session {
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let record = match session_token(&parts.headers) {
            Some(token) => state.database.session(&token)?,
            None => None,
        };
        Ok(Self { record })
    }
}

pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers.get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, token)| token.to_owned())
        .filter(|token| !token.is_empty())
}

/// Browser-session cookie: no expiry, gone when the browser closes.
pub fn session_cookie(token: &str) -> Result<HeaderValue, ServerError> {
    HeaderValue::try_from(format!("{SESSION_COOKIE}={token}; HttpOnly; Path=/; SameSite=Lax"))
        .map_err(|err| ServerError::InvalidHeader { reason: err.to_string() })
}
