use crate::domain::state_machine::ConnectionStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl Position {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn approx_eq(&self, other: &Position, epsilon: f64) -> bool {
        (self.latitude - other.latitude).abs() <= epsilon
            && (self.longitude - other.longitude).abs() <= epsilon
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationUpdate {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub bearing: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocationSample {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub speed: Option<f64>,
    pub bearing: Option<f64>,
    pub received_at: DateTime<Utc>,
}

impl LocationSample {
    pub fn from_update(update: LocationUpdate, received_at: DateTime<Utc>) -> Self {
        Self {
            latitude: update.lat,
            longitude: update.lng,
            speed: update.speed,
            bearing: update.bearing,
            received_at,
        }
    }

    /// Returns `None` when either coordinate is missing, zero or not finite.
    pub fn position(&self) -> Option<Position> {
        let latitude = present(self.latitude)?;
        let longitude = present(self.longitude)?;
        Some(Position::new(latitude, longitude))
    }

    pub fn display_speed(&self) -> Option<f64> {
        present(self.speed)
    }

    pub fn display_bearing(&self) -> Option<f64> {
        present(self.bearing)
    }
}

// Zero counts as "no data" on this wire, same as an absent field.
fn present(value: Option<f64>) -> Option<f64> {
    value.filter(|value| value.is_finite() && *value != 0.0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trajectory {
    pub start: Position,
    pub end: Position,
    pub started_at: Instant,
    pub duration_ms: u64,
}

impl Trajectory {
    pub fn fraction(&self, now: Instant) -> f64 {
        if self.duration_ms == 0 {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.started_at).as_secs_f64() * 1000.0;
        (elapsed / self.duration_ms as f64).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingSnapshot {
    pub connection_status: ConnectionStatus,
    pub status_label: String,
    pub current_position: Option<Position>,
    pub target_position: Option<Position>,
    pub displayed_position: Position,
    pub last_update_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanOptions {
    pub duration_seconds: f64,
    pub ease_linearity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlyOptions {
    pub duration_seconds: f64,
    pub ease_linearity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerSettings {
    pub transport: TransportConfig,
    pub view: ViewSettings,
    pub motion: MotionSettings,
    pub follow: FollowSettings,
    pub rate_guard: RateGuardSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportConfig {
    pub endpoint: String,
    pub transports: Vec<String>,
    pub reconnection: bool,
    pub reconnection_attempts: u32,
    pub reconnection_delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewSettings {
    pub default_center: Position,
    pub default_zoom: f64,
    pub center_zoom: f64,
    pub fly_duration_seconds: f64,
    pub zoom_step: f64,
    pub resize_delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotionSettings {
    pub frame_interval_ms: u64,
    pub min_duration_ms: u64,
    pub max_duration_ms: u64,
    pub meters_per_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowSettings {
    pub delay_ratio: f64,
    pub ease_linearity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatePolicy {
    Observe,
    Drop,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateGuardSettings {
    pub min_interval_ms: u64,
    pub policy: RatePolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppError {
    pub code: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl AppError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        suggestion: Option<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            suggestion,
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:3000/rider".to_string(),
            transports: vec!["websocket".to_string(), "polling".to_string()],
            reconnection: true,
            reconnection_attempts: 5,
            reconnection_delay_ms: 1000,
        }
    }
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            default_center: Position::new(23.8, 90.4),
            default_zoom: 13.0,
            center_zoom: 15.0,
            fly_duration_seconds: 1.5,
            zoom_step: 0.5,
            resize_delay_ms: 100,
        }
    }
}

impl Default for MotionSettings {
    fn default() -> Self {
        Self {
            frame_interval_ms: 16,
            min_duration_ms: 500,
            max_duration_ms: 2000,
            meters_per_ms: 10.0,
        }
    }
}

impl Default for FollowSettings {
    fn default() -> Self {
        Self {
            delay_ratio: 0.3,
            ease_linearity: 0.25,
        }
    }
}

impl Default for RateGuardSettings {
    fn default() -> Self {
        Self {
            min_interval_ms: 100,
            policy: RatePolicy::Observe,
        }
    }
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            view: ViewSettings::default(),
            motion: MotionSettings::default(),
            follow: FollowSettings::default(),
            rate_guard: RateGuardSettings::default(),
        }
    }
}
