use {
    tracing::{debug, warn},
    reqwest::StatusCode,
    serde::de::DeserializeOwned,
    serde_json::Number,
    clicker_core::{MineResponse, UpgradeKind, UpgradeRequest, UpgradeResponse, ErrorResponse},
    crate::{display::CounterDisplay, error::ClientError},
};

pub const MINE_PATH: &str = "/mine";
pub const UPGRADE_PATH: &str = "/upgrade";

#[derive(Debug, Clone, PartialEq)]
pub enum UpgradeOutcome {
    Purchased(UpgradeResponse),
    /// Server refused the purchase, e.g. not enough blocks.
    Rejected(ErrorResponse),
    Ignored { status: u16 },
}

#[derive(Clone, Debug)]
pub struct ClickerClient {
    http: reqwest::Client,
    base_url: String,
}

impl ClickerClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Use a preconfigured client, e.g. one carrying a session cookie store.
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }

    /// Sends one `POST /mine`. `Ok(None)` means the server answered with a non-success status.
    /// Any JSON number is accepted as the block count.
    pub async fn mine(&self) -> Result<Option<MineResponse<Number>>, ClientError> {
        let endpoint = self.endpoint(MINE_PATH);
        debug!("sending mine request to {endpoint}");

        let response = self.http.post(&endpoint)
            .send()
            .await
            .map_err(|source| ClientError::Request { endpoint: endpoint.clone(), source })?;

        let status = response.status();
        if !status.is_success() {
            warn!("mine request rejected with status {status}, ignoring");
            return Ok(None);
        }

        let body = response.bytes()
            .await
            .map_err(|source| ClientError::Request { endpoint: endpoint.clone(), source })?;

        decode(endpoint, &body).map(Some)
    }

    pub async fn purchase_upgrade(&self, kind: UpgradeKind) -> Result<UpgradeOutcome, ClientError> {
        let endpoint = self.endpoint(UPGRADE_PATH);
        debug!("purchasing {kind} at {endpoint}");

        let response = self.http.post(&endpoint)
            .json(&UpgradeRequest::new(kind))
            .send()
            .await
            .map_err(|source| ClientError::Request { endpoint: endpoint.clone(), source })?;

        let status = response.status();
        let body = response.bytes()
            .await
            .map_err(|source| ClientError::Request { endpoint: endpoint.clone(), source })?;

        Ok(if status.is_success() {
            UpgradeOutcome::Purchased(decode(endpoint, &body)?)
        } else if status == StatusCode::BAD_REQUEST {
            UpgradeOutcome::Rejected(decode(endpoint, &body)?)
        } else {
            warn!("upgrade request failed with status {status}, ignoring");
            UpgradeOutcome::Ignored { status: status.as_u16() }
        })
    }

    /// Mines one block and shows the new total. Non-success statuses leave the display as is.
    pub async fn increment_blocks(&self, display: &impl CounterDisplay) -> Result<(), ClientError> {
        if let Some(response) = self.mine().await? {
            debug!("mined, blocks: {}", response.blocks);
            display.set_text(&response.blocks.to_string())?;
        }
        Ok(())
    }
}

fn decode<T: DeserializeOwned>(endpoint: String, body: &[u8]) -> Result<T, ClientError> {
    serde_json::from_slice(body).map_err(|source| ClientError::Decode { endpoint, source })
}
