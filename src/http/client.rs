//! Outbound JSON calls to other services.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// POST `request` as JSON to `url` and decode the JSON reply.
///
/// The reply is decoded whatever its status; callers that care inspect the
/// decoded payload.
pub async fn post_json<Req, Resp>(
    client: &reqwest::Client,
    url: &str,
    request: &Req,
    headers: &[(&str, &str)],
) -> Result<Resp, ClientError>
where
    Req: Serialize + ?Sized,
    Resp: DeserializeOwned,
{
    let mut builder = client.post(url).json(request);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }

    let response = builder.send().await?;
    let status = response.status();
    let body = response.bytes().await?;
    tracing::debug!(url = %url, status = %status, bytes = body.len(), "Outbound call completed");

    Ok(serde_json::from_slice(&body)?)
}
