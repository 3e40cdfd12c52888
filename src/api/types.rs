//! API request and response types

use serde::Deserialize;
use serde::Serialize;

/// Body of every chat failure; internal detail is only logged
pub const CHAT_ERROR_MESSAGE: &str = "An error occurred while processing your request";
/// Body of every scrape failure
pub const SCRAPE_ERROR_MESSAGE: &str = "An error occurred while processing the link";
pub const SCRAPE_SUCCESS_MESSAGE: &str = "Professor data scraped and inserted successfully";

/// Standard API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// `{"error": "..."}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// Scrape request
#[derive(Debug, Deserialize)]
pub struct ScrapeRequest {
    pub link: String,
}

/// Scrape response
#[derive(Debug, Serialize, Deserialize)]
pub struct ScrapeResponse {
    pub message: String,
    pub inserted: usize,
}
