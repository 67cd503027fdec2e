//! StreetWalk server API client

#![allow(dead_code)]

use std::time::Duration;

use crate::models::{ContentType, DashboardSummary, Mode, Street};

type ApiError = Box<dyn std::error::Error + Send + Sync>;

/// Thin blocking client for the dashboard/delete endpoints.
/// Runs on worker threads, never on the UI thread.
pub struct SummaryClient {
    server: String,
    timeout_secs: u64,
}

impl SummaryClient {
    pub fn new(server: &str) -> Self {
        Self {
            server: server.trim_end_matches('/').to_string(),
            timeout_secs: 30,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    fn agent(&self) -> ureq::Agent {
        ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(self.timeout_secs)))
            .build()
            .new_agent()
    }

    fn summary_url(&self, days: u32) -> String {
        format!("{}/api/dashboard/summary?days={}", self.server, days)
    }

    fn delete_url(&self, street_id: &str) -> String {
        format!("{}/street/{}/delete", self.server, street_id)
    }

    /// Fetch the dashboard summary for an N-day reporting window.
    /// Non-2xx responses surface as errors (ureq treats them as Err).
    pub fn fetch_summary(&self, days: u32) -> Result<DashboardSummary, ApiError> {
        let mut response = self.agent()
            .get(&self.summary_url(days))
            .header("Accept", "application/json")
            .call()?;
        let body = response.body_mut().read_to_string()?;
        let summary: DashboardSummary = serde_json::from_str(&body)?;
        Ok(summary)
    }

    /// Submit the destructive delete for one street. The caller is
    /// responsible for the confirmation gate; there is no local removal,
    /// the list refreshes on the next summary fetch.
    pub fn delete_street(&self, street_id: &str) -> Result<(), ApiError> {
        self.agent()
            .post(&self.delete_url(street_id))
            .send_form([("confirm", "1")])?;
        Ok(())
    }
}

/// Build the world destination for a street row click. Type 3d gets the
/// dedicated 3D route; video streets branch by mode with walk as the base
/// route. Every destination carries the street id as a query parameter.
pub fn world_route(street: &Street) -> String {
    let path = if street.content_type == ContentType::ThreeD {
        "/world3d"
    } else {
        match street.mode {
            Mode::Drive => "/world/drive",
            Mode::Fly => "/world/fly",
            Mode::Sit => "/world/sit",
            Mode::Walk => "/world",
        }
    };
    format!("{}?street_id={}", path, street.id)
}
