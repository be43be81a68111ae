//! Road obstacles reported by users

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use geo::Point;
use serde::{Deserialize, Serialize};

use crate::{Error, NodeId};

pub type ObstacleId = String;
/// Identity issued by the external auth provider
pub type UserId = String;

/// Kind of hazard, spelled on the wire the way the mobile form lists them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ObstacleKind {
    Pothole,
    Accident,
    Construction,
    Debris,
    Flooding,
    TrafficJam,
    Protest,
    Other,
}

impl ObstacleKind {
    pub const ALL: [ObstacleKind; 8] = [
        ObstacleKind::Pothole,
        ObstacleKind::Accident,
        ObstacleKind::Construction,
        ObstacleKind::Debris,
        ObstacleKind::Flooding,
        ObstacleKind::TrafficJam,
        ObstacleKind::Protest,
        ObstacleKind::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ObstacleKind::Pothole => "Pothole",
            ObstacleKind::Accident => "Accident",
            ObstacleKind::Construction => "Construction",
            ObstacleKind::Debris => "Debris",
            ObstacleKind::Flooding => "Flooding",
            ObstacleKind::TrafficJam => "Traffic Jam",
            ObstacleKind::Protest => "Protest",
            ObstacleKind::Other => "Other",
        }
    }
}

impl FromStr for ObstacleKind {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized: String = raw
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "pothole" => Ok(ObstacleKind::Pothole),
            "accident" => Ok(ObstacleKind::Accident),
            "construction" => Ok(ObstacleKind::Construction),
            "debris" => Ok(ObstacleKind::Debris),
            "flooding" | "flood" => Ok(ObstacleKind::Flooding),
            "trafficjam" => Ok(ObstacleKind::TrafficJam),
            "protest" => Ok(ObstacleKind::Protest),
            "other" | "others" => Ok(ObstacleKind::Other),
            _ => Err(Error::InvalidObstacle(format!("unknown obstacle type '{raw}'"))),
        }
    }
}

impl TryFrom<String> for ObstacleKind {
    type Error = Error;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl From<ObstacleKind> for String {
    fn from(kind: ObstacleKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ObstacleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Obstacle urgency, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Severity {
    Low,
    Moderate,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Moderate => "Moderate",
            Severity::High => "High",
            Severity::Critical => "Critical",
        }
    }
}

impl FromStr for Severity {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "moderate" | "medium" => Ok(Severity::Moderate),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            _ => Err(Error::InvalidObstacle(format!("unknown severity '{raw}'"))),
        }
    }
}

impl TryFrom<String> for Severity {
    type Error = Error;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl From<Severity> for String {
    fn from(severity: Severity) -> Self {
        severity.as_str().to_string()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Obstacle as submitted by its owner, before the overlay assigns an id
#[derive(Debug, Clone)]
pub struct NewObstacle {
    pub node_id: NodeId,
    pub owner: UserId,
    pub name: String,
    pub kind: ObstacleKind,
    pub severity: Severity,
    pub expected_duration: TimeDelta,
    pub comments: String,
    pub image_url: Option<String>,
    /// Reported position; the node position is used when absent
    pub location: Option<Point<f64>>,
}

impl NewObstacle {
    /// Minimal report, mostly useful in tests and tools
    pub fn new(
        node_id: impl Into<NodeId>,
        owner: impl Into<UserId>,
        severity: Severity,
        expected_duration: TimeDelta,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            owner: owner.into(),
            name: String::new(),
            kind: ObstacleKind::Other,
            severity,
            expected_duration,
            comments: String::new(),
            image_url: None,
            location: None,
        }
    }
}

/// Active (or expired but not yet compacted) obstacle record
#[derive(Debug, Clone, PartialEq)]
pub struct Obstacle {
    pub id: ObstacleId,
    pub node_id: NodeId,
    pub owner: UserId,
    pub name: String,
    pub kind: ObstacleKind,
    pub severity: Severity,
    pub expected_duration: TimeDelta,
    pub created_at: DateTime<Utc>,
    pub comments: String,
    pub image_url: Option<String>,
    /// x = longitude, y = latitude
    pub location: Point<f64>,
}

impl Obstacle {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at
            .checked_add_signed(self.expected_duration)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Active while `created_at + expected_duration` is still ahead of `as_of`
    pub fn is_active_at(&self, as_of: DateTime<Utc>) -> bool {
        self.expires_at() > as_of
    }
}

/// Parses `H:MM:SS`, `H:MM` or a plain number of seconds
pub fn parse_duration(raw: &str) -> Result<TimeDelta, Error> {
    let invalid = || Error::InvalidObstacle(format!("invalid expected duration '{raw}'"));
    let raw_trimmed = raw.trim();

    let seconds: i64 = if raw_trimmed.contains(':') {
        let parts = raw_trimmed
            .split(':')
            .map(|part| part.trim().parse::<i64>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;
        if parts.iter().any(|part| *part < 0) {
            return Err(invalid());
        }
        let (hours, minutes, seconds) = match parts.as_slice() {
            [hours, minutes] => (*hours, *minutes, 0),
            [hours, minutes, seconds] => (*hours, *minutes, *seconds),
            _ => return Err(invalid()),
        };
        hours
            .checked_mul(3600)
            .and_then(|total| total.checked_add(minutes.checked_mul(60)?))
            .and_then(|total| total.checked_add(seconds))
            .ok_or_else(invalid)?
    } else {
        raw_trimmed.parse().map_err(|_| invalid())?
    };

    TimeDelta::try_seconds(seconds).ok_or_else(invalid)
}

/// Formats a duration as `H:MM:SS`
pub fn format_duration(duration: TimeDelta) -> String {
    let total = duration.num_seconds().max(0);
    format!(
        "{}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}
