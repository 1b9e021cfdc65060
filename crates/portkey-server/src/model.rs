use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ShortenRequest {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct ShortenResponse {
    pub result: String,
}

#[derive(Debug, Deserialize)]
pub struct BatchRequestEntry {
    pub correlation_id: String,
    pub original_url: String,
}

#[derive(Debug, Serialize)]
pub struct BatchResponseEntry {
    pub correlation_id: String,
    pub short_url: String,
}

#[derive(Debug, Serialize)]
pub struct UserUrl {
    pub short_url: String,
    pub original_url: String,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub urls: u64,
    pub users: u64,
}
