//! Planner capability: chat-completion style, producing a RefactorPlan.
//!
//! HTTP-JSON with bearer-token auth, matching `ai-llm-service`'s and
//! `mr-reviewer`'s existing `reqwest` usage.

use core_config::BackoffPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{AdapterError, Result};
use crate::retry::retry_with_backoff;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanOperation {
    Create,
    Modify,
    Delete,
    Rename,
    Move,
    Extract,
    Inline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanChangeType {
    Import,
    Class,
    Function,
    Method,
    Variable,
    Parameter,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanChange {
    pub target_file: String,
    pub operation: PlanOperation,
    pub change_type: PlanChangeType,
    pub start_line: u32,
    pub end_line: u32,
    pub old_content: Option<String>,
    pub new_content: Option<String>,
    pub symbol_name: Option<String>,
    pub new_symbol_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefactorPlan {
    pub plan_id: String,
    pub description: String,
    pub primary_changes: Vec<PlanChange>,
}

/// Thin HTTP-JSON client for the Planner endpoint.
pub struct PlannerClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
    backoff: BackoffPolicy,
}

#[derive(Serialize)]
struct PlannerRequest<'a> {
    system: &'a str,
    user: &'a str,
}

#[derive(Deserialize)]
struct PlannerResponse {
    content: String,
}

impl PlannerClient {
    pub fn new(endpoint: String, api_key: Option<String>, timeout: Duration, backoff: BackoffPolicy) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
            api_key,
            timeout,
            backoff,
        }
    }

    /// Sends a system+user prompt and parses the response body as a
    /// [`RefactorPlan`] JSON object embedded in the text response.
    pub async fn plan(&self, system: &str, user: &str) -> Result<RefactorPlan> {
        retry_with_backoff(&self.backoff, || async {
            let mut req = self
                .http
                .post(&self.endpoint)
                .timeout(self.timeout)
                .json(&PlannerRequest { system, user });
            if let Some(key) = &self.api_key {
                req = req.bearer_auth(key);
            }

            let resp = req.send().await?.error_for_status()?;
            let body: PlannerResponse = resp.json().await?;
            extract_plan(&body.content).map_err(AdapterError::from)
        })
        .await
    }
}

fn extract_plan(content: &str) -> std::result::Result<RefactorPlan, crate::error::ProviderError> {
    let start = content
        .find('{')
        .ok_or_else(|| crate::error::ProviderError::InvalidResponse("no JSON object in planner response".into()))?;
    let end = content
        .rfind('}')
        .ok_or_else(|| crate::error::ProviderError::InvalidResponse("unterminated JSON object in planner response".into()))?;
    serde_json::from_str(&content[start..=end]).map_err(crate::error::ProviderError::Serde)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_plan_from_surrounding_prose() {
        let content = r#"Here is the plan:
        {"plan_id":"p1","description":"rename args","primary_changes":[]}
        Thanks."#;
        let plan = extract_plan(content).unwrap();
        assert_eq!(plan.plan_id, "p1");
        assert!(plan.primary_changes.is_empty());
    }

    #[test]
    fn rejects_content_with_no_json_object() {
        assert!(extract_plan("no json here").is_err());
    }
}
