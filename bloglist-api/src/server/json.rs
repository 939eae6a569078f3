use crate::server::ServerError;
use axum::{
    Json as AxumJson,
    extract::{FromRequest, Request},
    response::{IntoResponse, Response},
};
use axum_extra::TypedHeader;
use headers::ContentType;
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

/// JSON body extractor and responder. A body that does not parse into `T` becomes a
/// `validation_error` like any other bad input.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

impl<T, S> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        match AxumJson::<T>::from_request(request, state).await {
            Ok(AxumJson(value)) => Ok(Self(value)),
            Err(rejection) => {
                debug!(
                    status = %rejection.status(),
                    reason = %rejection.body_text(),
                    "Rejecting JSON body"
                );
                Err(rejection.into())
            }
        }
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        let body = match serde_json::to_vec(&self.0) {
            Ok(body) => body,
            Err(err) => return ServerError::JsonResponse(err).into_response(),
        };

        (TypedHeader(ContentType::json()), body).into_response()
    }
}
