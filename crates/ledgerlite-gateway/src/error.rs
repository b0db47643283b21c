use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Query, Request, rejection::JsonRejection},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use ledgerlite_core::LedgerError;
use ledgerlite_platform::ErrorResponse;
use serde::de::DeserializeOwned;
use tracing::error;

/// Handler error. Domain failures carried as [`LedgerError`] keep their
/// message; everything else is logged and answered with a generic 500.
pub struct ApiError(pub anyhow::Error);

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0.downcast_ref::<LedgerError>() {
            Some(
                LedgerError::Validation(_)
                | LedgerError::Unbalanced { .. }
                | LedgerError::InvalidStatusTransition { .. },
            ) => StatusCode::BAD_REQUEST,
            Some(LedgerError::Unauthorized(_)) => StatusCode::UNAUTHORIZED,
            Some(LedgerError::NotFound(_)) => StatusCode::NOT_FOUND,
            Some(LedgerError::Conflict(_)) => StatusCode::CONFLICT,
            None => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("request failed: {:#}", self.0);
            "internal server error".to_string()
        } else {
            self.0.to_string()
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

/// `Json` whose rejections are reported as `{"error": …}` with status 400.
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> ApiError {
    LedgerError::validation(rejection.body_text()).into()
}

/// `Query` with the same error shape as [`ApiJson`].
pub struct ApiQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(rejection) => Err(LedgerError::validation(rejection.body_text()).into()),
        }
    }
}
