use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;
use trafficdb_core::EngineError;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type ServerResult<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Engine(e) => match e {
                EngineError::UnsupportedTable(_)
                | EngineError::UnknownTable(_)
                | EngineError::SchemaFetch(_) => StatusCode::NOT_FOUND,
                EngineError::EmptyUpdate(_)
                | EngineError::PayloadShape { .. }
                | EngineError::KeyArity { .. }
                | EngineError::UnknownColumn { .. } => StatusCode::BAD_REQUEST,
                EngineError::InvalidCatalog(_)
                | EngineError::UnexpectedResult(_)
                | EngineError::Execution(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            Self::Engine(EngineError::Execution(e)) => {
                error!(error = %e.driver_message(), "request failed");
            }
            _ if status.is_server_error() => error!(error = %self, "request failed"),
            _ => (),
        }

        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
