//! The platform's response envelope.
//!
//! Every JSON endpoint answers with `{ error?, data?, meta? }`. An `error`
//! member wins over everything else; `meta.pagination` must appear exactly
//! when the caller asked for a page. Unknown envelope members are rejected so
//! that upstream API drift surfaces as a loud error instead of silently
//! dropped data.

use serde::Deserialize;
use tracing::error;

use concentriq_model::{ApiErrorBody, PageInfo};

use crate::error::ClientError;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ApiEnvelope {
    #[serde(default)]
    error: Option<ApiErrorBody>,
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default)]
    meta: Option<Meta>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Meta {
    #[serde(default)]
    pagination: Option<PageInfo>,
}

impl ApiEnvelope {
    /// Unwrap a non-paginated response.
    pub(crate) fn into_data(self) -> Result<serde_json::Value, ClientError> {
        let (data, pagination) = self.unwrap_checked()?;
        if pagination.is_some() {
            return Err(ClientError::UnexpectedResponse(
                "response is paginated; this might be unintended".to_owned(),
            ));
        }
        Ok(data)
    }

    /// Unwrap a paginated response into its data and page info.
    pub(crate) fn into_page(self) -> Result<(serde_json::Value, PageInfo), ClientError> {
        let (data, pagination) = self.unwrap_checked()?;
        let info = pagination.ok_or_else(|| {
            ClientError::UnexpectedResponse(
                "expected pagination metadata in response".to_owned(),
            )
        })?;
        Ok((data, info))
    }

    fn unwrap_checked(self) -> Result<(serde_json::Value, Option<PageInfo>), ClientError> {
        if let Some(body) = self.error {
            error!(name = %body.name, status = body.status, message = %body.message, "API error");
            return Err(ClientError::Api(body));
        }
        let data = self.data.ok_or_else(|| {
            ClientError::UnexpectedResponse("response envelope has no data member".to_owned())
        })?;
        Ok((data, self.meta.and_then(|meta| meta.pagination)))
    }
}

/// Pull a named member out of a JSON object, consuming the rest.
pub(crate) fn take_member(
    mut value: serde_json::Value,
    key: &str,
) -> Result<serde_json::Value, ClientError> {
    value
        .as_object_mut()
        .and_then(|object| object.remove(key))
        .ok_or_else(|| {
            ClientError::UnexpectedResponse(format!("response data has no {key:?} member"))
        })
}
