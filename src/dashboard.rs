//! Dashboard state and the pure data transforms behind it: street
//! filtering, count/date formatting and the fetch race guard.

use chrono::NaiveDate;

use crate::models::{DashboardSummary, Mode, Street, ViewsChart};

/// Case-insensitive substring check without allocation
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() { return true; }
    if needle.len() > haystack.len() { return false; }

    haystack.as_bytes()
        .windows(needle.len())
        .any(|window| window.eq_ignore_ascii_case(needle.as_bytes()))
}

/// Mode selector for the street quick list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModeFilter {
    #[default]
    All,
    Only(Mode),
}

impl ModeFilter {
    pub fn label(&self) -> &'static str {
        match self {
            ModeFilter::All => "All modes",
            ModeFilter::Only(m) => m.badge(),
        }
    }

    fn accepts(&self, street: &Street) -> bool {
        match self {
            ModeFilter::All => true,
            ModeFilter::Only(m) => street.mode == *m,
        }
    }
}

/// Filter the full street collection by mode and free-text query. The
/// query matches case-insensitively against the concatenation of name,
/// city, country, content type and mode. Always recomputed from the
/// authoritative collection, never from a previous subset.
pub fn filter_streets<'a>(
    streets: &'a [Street],
    query: &str,
    mode_filter: ModeFilter,
) -> Vec<&'a Street> {
    let query = query.trim();
    streets
        .iter()
        .filter(|s| mode_filter.accepts(s))
        .filter(|s| {
            if query.is_empty() {
                return true;
            }
            let haystack = format!(
                "{} {} {} {} {}",
                s.name,
                s.city,
                s.country,
                s.content_type.as_str(),
                s.mode.as_str()
            );
            contains_ignore_case(&haystack, query)
        })
        .collect()
}

/// Locale-style count with comma thousands separators
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Short chart label from an ISO date string. Malformed dates fall back
/// to the raw label text, never an error.
pub fn format_chart_label(raw: &str) -> String {
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => date.format("%b %-d").to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Summary line under the chart, e.g. "30 views in range"
pub fn chart_meta(chart: &ViewsChart) -> String {
    let total: u64 = chart.data.iter().sum();
    format!("{} views in range", format_count(total))
}

/// Dashboard session state. Holds the last successfully applied summary;
/// a failed fetch leaves it untouched.
pub struct DashboardState {
    pub summary: Option<DashboardSummary>,
    pub window_days: u32,
    pub query: String,
    pub mode_filter: ModeFilter,
    pub loading: bool,
    latest_token: u64,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardState {
    pub fn new() -> Self {
        Self {
            summary: None,
            window_days: 7,
            query: String::new(),
            mode_filter: ModeFilter::All,
            loading: false,
            latest_token: 0,
        }
    }

    /// Issue a token for a new fetch. Rapid window changes can leave
    /// several requests in flight; only the response carrying the latest
    /// token may update state.
    pub fn begin_fetch(&mut self) -> u64 {
        self.latest_token += 1;
        self.loading = true;
        self.latest_token
    }

    /// Apply a fetched summary if its token is still current. Returns
    /// false for stale responses, which are dropped without touching
    /// state.
    pub fn apply(&mut self, token: u64, summary: DashboardSummary) -> bool {
        if token != self.latest_token {
            return false;
        }
        self.summary = Some(summary);
        self.loading = false;
        true
    }

    /// A failed fetch clears the loading flag but keeps prior state
    /// intact. Stale failures are ignored entirely.
    pub fn fail(&mut self, token: u64) -> bool {
        if token != self.latest_token {
            return false;
        }
        self.loading = false;
        true
    }

    /// Authoritative street collection from the last applied summary
    pub fn streets(&self) -> &[Street] {
        self.summary.as_ref().map(|s| s.streets.as_slice()).unwrap_or(&[])
    }

    pub fn filtered_streets(&self) -> Vec<&Street> {
        filter_streets(self.streets(), &self.query, self.mode_filter)
    }
}
