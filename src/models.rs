//! Data models for StreetWalk Desktop

use serde::{Deserialize, Serialize};

/// UI Tab selection
#[derive(Debug, Clone, PartialEq)]
pub enum Tab {
    Dashboard,
    Drive,
    Console,
}

/// Viewing mode of a street
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Walk,
    Drive,
    Fly,
    Sit,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Walk => "walk",
            Mode::Drive => "drive",
            Mode::Fly => "fly",
            Mode::Sit => "sit",
        }
    }

    /// Uppercase badge text for list rows
    pub fn badge(&self) -> &'static str {
        match self {
            Mode::Walk => "WALK",
            Mode::Drive => "DRIVE",
            Mode::Fly => "FLY",
            Mode::Sit => "SIT",
        }
    }
}

/// Kind of uploaded content backing a street
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ContentType {
    #[default]
    #[serde(rename = "video")]
    Video,
    #[serde(rename = "3d")]
    ThreeD,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Video => "video",
            ContentType::ThreeD => "3d",
        }
    }
}

/// A street content record. Treated as an immutable snapshot on the
/// client; deletion goes through a server round-trip.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Street {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(rename = "type", default)]
    pub content_type: ContentType,
    #[serde(default)]
    pub mode: Mode,
    /// Ordered video segment URLs (empty for 3d streets)
    #[serde(default)]
    pub segments: Vec<String>,
    /// Known segment durations in seconds, index-aligned with `segments`.
    /// Missing entries mean the duration is unknown until media load.
    #[serde(default)]
    pub segment_durations: Vec<f64>,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub views: u64,
}

impl Street {
    /// "City, Country" with graceful degradation when either is empty
    pub fn location(&self) -> String {
        match (self.city.is_empty(), self.country.is_empty()) {
            (false, false) => format!("{}, {}", self.city, self.country),
            (false, true) => self.city.clone(),
            (true, false) => self.country.clone(),
            (true, true) => String::new(),
        }
    }

    pub fn has_coords(&self) -> bool {
        matches!((self.lat, self.lng), (Some(lat), Some(lng))
            if lat.is_finite() && lng.is_finite())
    }
}

/// Aggregate counters for the stat tiles
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Totals {
    #[serde(default)]
    pub total_streets: u64,
    #[serde(default)]
    pub total_likes: u64,
    #[serde(default)]
    pub total_views: u64,
    #[serde(default)]
    pub walk_count: u64,
    #[serde(default)]
    pub drive_count: u64,
    #[serde(default)]
    pub fly_count: u64,
    #[serde(default)]
    pub sit_count: u64,
}

/// Daily view counts for the reporting window.
/// `labels` and `data` are equal length and index-aligned.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ViewsChart {
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub data: Vec<u64>,
}

/// One entry in the recent-activity log
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ActivityEvent {
    pub event: String,
    #[serde(default)]
    pub street_name: String,
    #[serde(default)]
    pub timestamp: String,
}

/// Dashboard summary payload for one reporting window
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DashboardSummary {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub totals: Totals,
    #[serde(default)]
    pub views_chart: ViewsChart,
    #[serde(default)]
    pub top_viewed: Vec<Street>,
    #[serde(default)]
    pub top_liked: Vec<Street>,
    #[serde(default)]
    pub recent_activity: Vec<ActivityEvent>,
    /// Full collection, the authoritative source for local filtering
    #[serde(default)]
    pub streets: Vec<Street>,
}

/// World/app configuration embedded in the bootstrap blob
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldConfig {
    #[serde(default = "default_server")]
    pub server: String,
    #[serde(default = "default_center_lat")]
    pub map_center_lat: f64,
    #[serde(default = "default_center_lng")]
    pub map_center_lng: f64,
}

fn default_server() -> String { "http://localhost:5000".to_string() }
// Dubai, the original deployment's default map center
fn default_center_lat() -> f64 { 25.2048 }
fn default_center_lng() -> f64 { 55.2708 }

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            map_center_lat: default_center_lat(),
            map_center_lng: default_center_lng(),
        }
    }
}

/// The three startup blobs: app config, full street collection, and the
/// initially selected street (nullable). Consumed once at initialization.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Bootstrap {
    #[serde(default)]
    pub config: WorldConfig,
    #[serde(default)]
    pub streets: Vec<Street>,
    #[serde(default)]
    pub selected: Option<Street>,
}

impl Bootstrap {
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }
}
