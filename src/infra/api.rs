use crate::domain::{
    AiPrompt, AiSuggestions, AudienceResult, Campaign, ConditionGroup, Customer,
    DashboardSummary, DeliveryOutcome, ListEnvelope, NewCampaign, NewCustomer, UserInfo,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "https://crm-backend-gsa9.onrender.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("server responded with status {status}")]
    Status { status: u16 },

    #[error("unexpected response body: {0}")]
    Decode(String),
}

/// Blocking client for the CRM backend. Every request carries the session
/// cookie, when one is known, as an opaque `Cookie` header.
#[derive(Clone)]
pub struct ApiClient {
    agent: ureq::Agent,
    base_url: String,
    cookie: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, cookie: Option<String>) -> Self {
        Self {
            agent: make_agent(REQUEST_TIMEOUT),
            base_url: base_url.trim_end_matches('/').to_string(),
            cookie,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_cookie(&self) -> bool {
        self.cookie.is_some()
    }

    pub fn set_cookie(&mut self, cookie: Option<String>) {
        self.cookie = cookie;
    }

    pub fn login_url(&self) -> String {
        self.url("/auth/google")
    }

    pub fn current_user(&self) -> Result<UserInfo, ApiError> {
        self.get_json("/auth/me")
    }

    pub fn logout(&self) -> Result<(), ApiError> {
        let url = self.url("/auth/logout");
        let mut request = self.agent.get(&url);
        if let Some(cookie) = &self.cookie {
            request = request.header("Cookie", cookie.as_str());
        }
        request.call().map_err(map_call_error)?;
        Ok(())
    }

    pub fn list_customers(&self) -> Result<Vec<Customer>, ApiError> {
        let envelope: ListEnvelope<Customer> = self.get_json("/customers")?;
        Ok(envelope.data)
    }

    pub fn create_customer(&self, customer: &NewCustomer) -> Result<(), ApiError> {
        self.post_json_ignoring_body("/customers", customer)
    }

    pub fn delete_customer(&self, id: &str) -> Result<(), ApiError> {
        let url = self.url(&format!("/customers/{id}"));
        let mut request = self.agent.delete(&url);
        if let Some(cookie) = &self.cookie {
            request = request.header("Cookie", cookie.as_str());
        }
        request.call().map_err(map_call_error)?;
        Ok(())
    }

    pub fn list_campaigns(&self) -> Result<Vec<Campaign>, ApiError> {
        let envelope: ListEnvelope<Campaign> = self.get_json("/campaigns")?;
        Ok(envelope.data)
    }

    pub fn create_campaign(&self, campaign: &NewCampaign) -> Result<(), ApiError> {
        self.post_json_ignoring_body("/campaigns", campaign)
    }

    pub fn deliver_campaign(&self, id: &str) -> Result<DeliveryOutcome, ApiError> {
        let url = self.url(&format!("/campaigns/{id}/deliver"));
        let mut request = self.agent.post(&url);
        if let Some(cookie) = &self.cookie {
            request = request.header("Cookie", cookie.as_str());
        }
        let mut response = request
            .send_json(serde_json::json!({}))
            .map_err(map_call_error)?;
        response
            .body_mut()
            .read_json::<DeliveryOutcome>()
            .map_err(|error| ApiError::Decode(error.to_string()))
    }

    pub fn evaluate_segment(&self, rules: &ConditionGroup) -> Result<AudienceResult, ApiError> {
        self.post_json("/segments/evaluate", rules)
    }

    pub fn ai_suggestions(&self, prompt: &AiPrompt) -> Result<Vec<String>, ApiError> {
        let parsed: AiSuggestions = self.post_json("/ai/messages", prompt)?;
        Ok(parsed.suggestions)
    }

    pub fn dashboard_summary(&self) -> Result<DashboardSummary, ApiError> {
        self.get_json("/dashboard/summary")
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path);
        let mut request = self.agent.get(&url).header("Accept", "application/json");
        if let Some(cookie) = &self.cookie {
            request = request.header("Cookie", cookie.as_str());
        }
        let mut response = request.call().map_err(map_call_error)?;
        response
            .body_mut()
            .read_json::<T>()
            .map_err(|error| ApiError::Decode(error.to_string()))
    }

    fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        let mut request = self.agent.post(&url).header("Accept", "application/json");
        if let Some(cookie) = &self.cookie {
            request = request.header("Cookie", cookie.as_str());
        }
        let mut response = request.send_json(body).map_err(map_call_error)?;
        response
            .body_mut()
            .read_json::<T>()
            .map_err(|error| ApiError::Decode(error.to_string()))
    }

    fn post_json_ignoring_body<B: Serialize>(&self, path: &str, body: &B) -> Result<(), ApiError> {
        let url = self.url(path);
        let mut request = self.agent.post(&url);
        if let Some(cookie) = &self.cookie {
            request = request.header("Cookie", cookie.as_str());
        }
        request.send_json(body).map_err(map_call_error)?;
        Ok(())
    }
}

fn make_agent(timeout: Duration) -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build();
    config.into()
}

fn map_call_error(error: ureq::Error) -> ApiError {
    match error {
        ureq::Error::StatusCode(status) => ApiError::Status { status },
        other => ApiError::Transport(other.to_string()),
    }
}
