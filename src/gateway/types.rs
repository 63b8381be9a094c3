use serde::{Deserialize, Serialize};

/// ABDM session token request (spec.md §4.A, §6.3).
#[derive(Debug, Serialize)]
pub struct TokenRequest<'a> {
    #[serde(rename = "clientId")]
    pub client_id: &'a str,
    #[serde(rename = "clientSecret")]
    pub client_secret: &'a str,
    #[serde(rename = "grantType")]
    pub grant_type: &'static str,
}

impl<'a> TokenRequest<'a> {
    pub fn new(client_id: &'a str, client_secret: &'a str) -> Self {
        Self {
            client_id,
            client_secret,
            grant_type: "client_credentials",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "expiresIn")]
    pub expires_in: u64,
}

/// Envelope the gateway returns for both the consent-init and HI-request
/// calls (spec.md §6.3): both return `{abdmRequestId}`.
#[derive(Debug, Deserialize)]
pub struct GatewayRequestAck {
    #[serde(rename = "abdmRequestId")]
    pub abdm_request_id: uuid::Uuid,
}

#[derive(Debug, Deserialize)]
pub struct GatewayErrorBody {
    pub code: Option<String>,
    pub message: Option<String>,
}
