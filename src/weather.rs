//! One-shot weather lookup against a wttr.in-style service.
//!
//! The service is asked for a one-line report with five fields (condition,
//! temperature, humidity, wind, feels-like) separated by spaces. There is no
//! retry: one request, one answer.

use reqwest::Url;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "https://wttr.in";

/// Format string asking for condition, temperature, humidity, wind, feels-like.
pub const REPORT_FORMAT: &str = "%C+%t+%h+%w+%f";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("city name is empty")]
    EmptyCity,
    #[error("invalid weather service URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("Could not reach weather service: {0}")]
    Request(#[from] reqwest::Error),
    #[error("malformed weather response: {0:?}")]
    MalformedResponse(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeatherReport {
    pub location: String,
    pub condition: String,
    pub temperature: String,
    pub humidity: String,
    pub wind: String,
    pub feels_like: String,
}

/// Blocking client for the weather service.
pub struct WeatherClient {
    base_url: String,
    http: reqwest::blocking::Client,
}

impl WeatherClient {
    pub fn new() -> Result<Self, WeatherError> {
        Self::with_base_url(DEFAULT_BASE_URL, DEFAULT_TIMEOUT)
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, WeatherError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("nexus/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            base_url: base_url.to_string(),
            http,
        })
    }

    /// Builds `{base_url}/{city}?format=...`, with the city percent-encoded.
    pub fn request_url(&self, city: &str) -> Result<Url, WeatherError> {
        let city = city.trim();
        if city.is_empty() {
            return Err(WeatherError::EmptyCity);
        }

        let invalid = |reason: &str| WeatherError::InvalidUrl {
            url: self.base_url.clone(),
            reason: reason.to_string(),
        };

        let mut url = Url::parse(&self.base_url).map_err(|e| invalid(&e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("URL cannot take a path"))?
            .pop_if_empty()
            .push(city);
        url.set_query(Some(&format!("format={}", REPORT_FORMAT)));
        Ok(url)
    }

    /// Fetches and parses the report for `city`.
    pub fn fetch(&self, city: &str) -> Result<WeatherReport, WeatherError> {
        let url = self.request_url(city)?;
        info!(city = city.trim(), "fetching weather report");

        let body = self
            .http
            .get(url.clone())
            .send()?
            .error_for_status()?
            .text()?;
        debug!(url = %url, body = body.trim(), "weather response");

        parse_report(city, &body)
    }
}

/// Parses a five-field response body.
///
/// Conditions may span several words ("Partly cloudy"); the last four fields
/// are always temperature, humidity, wind and feels-like.
pub fn parse_report(city: &str, body: &str) -> Result<WeatherReport, WeatherError> {
    let fields: Vec<&str> = body.split_whitespace().collect();
    if fields.len() < 5 {
        return Err(WeatherError::MalformedResponse(body.trim().to_string()));
    }

    let (condition, rest) = fields.split_at(fields.len() - 4);
    Ok(WeatherReport {
        location: capitalize(city.trim()),
        condition: condition.join(" "),
        temperature: rest[0].to_string(),
        humidity: rest[1].to_string(),
        wind: rest[2].to_string(),
        feels_like: rest[3].to_string(),
    })
}

/// Upper-cases the first character and lower-cases the rest.
fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_word_condition() {
        let report = parse_report("london", "Sunny +21°C 40% ↗11km/h +21°C\n").unwrap();
        assert_eq!(
            report,
            WeatherReport {
                location: "London".to_string(),
                condition: "Sunny".to_string(),
                temperature: "+21°C".to_string(),
                humidity: "40%".to_string(),
                wind: "↗11km/h".to_string(),
                feels_like: "+21°C".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_multi_word_condition() {
        let report = parse_report("paris", "Partly cloudy +9°C 81% ←7km/h +7°C").unwrap();
        assert_eq!(report.condition, "Partly cloudy");
        assert_eq!(report.temperature, "+9°C");
        assert_eq!(report.feels_like, "+7°C");
    }

    #[test]
    fn test_parse_short_body() {
        let result = parse_report("oslo", "Sunny +3°C");
        assert!(matches!(result, Err(WeatherError::MalformedResponse(_))));
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("new york"), "New york");
        assert_eq!(capitalize("TOKYO"), "Tokyo");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_request_url() {
        let client = WeatherClient::new().unwrap();
        let url = client.request_url("New York").unwrap();
        assert_eq!(
            url.as_str(),
            "https://wttr.in/New%20York?format=%C+%t+%h+%w+%f"
        );
    }

    #[test]
    fn test_request_url_with_trailing_slash() {
        let client =
            WeatherClient::with_base_url("http://localhost:8080/", DEFAULT_TIMEOUT).unwrap();
        let url = client.request_url("Rome").unwrap();
        assert_eq!(url.path(), "/Rome");
    }

    #[test]
    fn test_empty_city_rejected() {
        let client = WeatherClient::new().unwrap();
        assert!(matches!(
            client.request_url("   "),
            Err(WeatherError::EmptyCity)
        ));
    }

    #[test]
    fn test_invalid_base_url() {
        let client = WeatherClient::with_base_url("not a url", DEFAULT_TIMEOUT).unwrap();
        assert!(matches!(
            client.request_url("Rome"),
            Err(WeatherError::InvalidUrl { .. })
        ));
    }
}
