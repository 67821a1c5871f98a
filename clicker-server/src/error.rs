use {
    std::net::SocketAddr,
    thiserror::Error,
    tracing::error,
    axum::{http::StatusCode, response::{IntoResponse, Response}},
    crate::database::DatabaseError,
};

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("failed to hash password with cost {cost}")]
    PasswordHash { cost: u8 },

    #[error("invalid header value: {reason}")]
    InvalidHeader { reason: String },

    #[error("failed to bind tcp listener on {addr}: {reason}")]
    Bind { addr: SocketAddr, reason: String },

    #[error("http server failed: {reason}")]
    Serve { reason: String },
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        error!("internal error while serving request: {self}");
        (StatusCode::INTERNAL_SERVER_ERROR, "clicker: internal server error.\n").into_response()
    }
}
