//! reqwest client for the Hoxton subscription API.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use tracing::{debug, instrument};
use url::Url;

use super::{PartnerApi, PartnerError, SubscriptionPayload};
use crate::config::{PartnerAuth, PartnerConfig};

pub struct HoxtonClient {
    client: Client,
    base_url: Url,
    api_key: String,
    auth: PartnerAuth,
}

impl HoxtonClient {
    pub fn new(config: &PartnerConfig) -> Result<Self, PartnerError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        let base_url = Url::parse(&config.base_url)?;

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
            auth: config.auth,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, PartnerError> {
        Ok(ensure_slash(&self.base_url).join(path)?)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.auth {
            PartnerAuth::Basic => request.basic_auth(&self.api_key, Some("")),
            PartnerAuth::Bearer => request.bearer_auth(&self.api_key),
        }
    }
}

/// Makes sure a url has a trailing slash, so `join` appends instead of replacing the last segment.
fn ensure_slash(url: &Url) -> Url {
    if url.path().ends_with('/') {
        url.clone()
    } else {
        let mut new_url = url.clone();
        let mut path = new_url.path().to_string();
        path.push('/');
        new_url.set_path(&path);
        new_url
    }
}

/// Turn a non-2xx response into an error carrying the response body.
async fn check_status(response: Response) -> Result<Response, PartnerError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    tracing::error!(status, body = %body, "Partner API returned an error");
    Err(PartnerError::Status { status, body })
}

#[async_trait]
impl PartnerApi for HoxtonClient {
    #[instrument(skip(self, payload), fields(external_id = %payload.external_id), err)]
    async fn create_subscription(&self, payload: &SubscriptionPayload) -> Result<serde_json::Value, PartnerError> {
        let url = self.endpoint("subscription")?;
        debug!("Creating partner subscription at {}", url);

        let response = self.authorize(self.client.post(url)).json(payload).send().await?;
        let response = check_status(response).await?;

        // Some deployments answer 201 with an empty body
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }

        serde_json::from_str(&body).map_err(|e| PartnerError::InvalidResponse(format!("error decoding response body: {e}")))
    }

    #[instrument(skip(self), err)]
    async fn subscription_status(&self, external_id: &str) -> Result<String, PartnerError> {
        let url = self.endpoint(&format!("subscription/{external_id}"))?;

        let response = self.authorize(self.client.get(url)).send().await?;
        let body: serde_json::Value = check_status(response).await?.json().await?;

        body.get("subscription")
            .and_then(|s| s.get("status"))
            .and_then(|s| s.as_str())
            .map(str::to_string)
            .ok_or_else(|| PartnerError::InvalidResponse("missing subscription.status".to_string()))
    }

    #[instrument(skip(self), err)]
    async fn stop_subscription(&self, external_id: &str) -> Result<(), PartnerError> {
        let url = self.endpoint(&format!("subscription/{external_id}/stop/END_OF_TERM/Requested"))?;

        let response = self.authorize(self.client.post(url)).send().await?;
        check_status(response).await?;

        Ok(())
    }
}
