//! JSON extractor that runs `validator` rules before the handler sees the body.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::ServerError;

pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + Send,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(data) = Json::<T>::from_request(req, state)
            .await
            .map_err(|err: JsonRejection| {
                let message = match err {
                    JsonRejection::JsonDataError(e) => format!("invalid JSON data: {e}"),
                    JsonRejection::JsonSyntaxError(e) => format!("JSON syntax error: {e}"),
                    JsonRejection::MissingJsonContentType(_) => {
                        "missing Content-Type: application/json header".to_owned()
                    }
                    other => format!("failed to parse JSON: {other}"),
                };
                ServerError::BadRequest(message)
            })?;

        data.validate()
            .map_err(|e| ServerError::BadRequest(e.to_string()))?;
        Ok(ValidatedJson(data))
    }
}
