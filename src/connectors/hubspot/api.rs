use crate::error::ConnectorError;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

/// HubSpot contact properties used for normalization.
///
/// HubSpot returns `null` for unset properties.
#[derive(Debug, Default, Deserialize)]
pub struct ContactProperties {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
    #[serde(default)]
    pub createdate: Option<String>,
    #[serde(default)]
    pub lastmodifieddate: Option<String>,
}

/// HubSpot CRM contact.
#[derive(Debug, Deserialize)]
pub struct HubSpotContact {
    /// String in the v3 API; older payloads carry a number.
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub properties: Option<ContactProperties>,
}

/// HTTP client for the HubSpot CRM API.
pub struct HubSpotClient {
    access_token: String,
    http_client: Client,
    contacts_url: String,
}

impl HubSpotClient {
    pub fn new(access_token: String, http_client: Client, contacts_url: String) -> Self {
        Self {
            access_token,
            http_client,
            contacts_url,
        }
    }

    /// Fetch the first page of contacts.
    pub async fn fetch_contacts(&self) -> Result<Vec<HubSpotContact>, ConnectorError> {
        let response = self
            .http_client
            .get(&self.contacts_url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(ConnectorError::ProviderHttp)?;

        let status = response.status();
        let body = response.text().await.map_err(ConnectorError::ProviderHttp)?;

        if !status.is_success() {
            return Err(ConnectorError::ProviderRejected {
                status: status.as_u16(),
                body,
            });
        }

        let mut json: Value = serde_json::from_str(&body).map_err(|e| {
            ConnectorError::MalformedResponse(format!("contacts response: {}", e))
        })?;

        let results = json
            .get_mut("results")
            .map(Value::take)
            .ok_or(ConnectorError::MissingField("results"))?;

        serde_json::from_value(results)
            .map_err(|e| ConnectorError::MalformedResponse(format!("contacts results: {}", e)))
    }
}
