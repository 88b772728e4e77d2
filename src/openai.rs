//! Clients for OpenAI-compatible APIs (Groq, OpenAI, local gateways).

use crate::error::Result;
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Create a client for an OpenAI-compatible endpoint with a request timeout.
pub fn create_client(api_base: &str, api_key: &str, timeout: Duration) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder().timeout(timeout).build()?;

    let config = OpenAIConfig::new()
        .with_api_base(api_base.trim_end_matches('/'))
        .with_api_key(api_key);

    Ok(Client::with_config(config).with_http_client(http_client))
}
