// SPDX-License-Identifier: MIT OR Apache-2.0
//! Route files describing a sequence.
//!
//! RON is the primary format; JSON is accepted as well. A route lists its
//! segments in playback order, each with its points and motion options:
//!
//! ```ron
//! (
//!     name: "harbour loop",
//!     segments: [
//!         (
//!             points: [(lat: 47.60, lng: -122.34), (lat: 47.61, lng: -122.33)],
//!             options: (speed: Some(40.0), follow_marker: true),
//!         ),
//!     ],
//! )
//! ```

use crate::context::MotionContext;
use crate::options::MotionOptions;
use crate::segment::Segment;
use crate::sequence::Sequence;
use serde::{Deserialize, Serialize};
use std::path::{Path as FsPath, PathBuf};
use thiserror::Error;
use trailmotion_geo::GeoPoint;

/// Errors loading or saving a route
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// RON parse error
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    /// RON serialization error
    #[error("RON serialization error: {0}")]
    RonWrite(#[from] ron::Error),

    /// JSON parse error
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// File extension is neither `.ron` nor `.json`
    #[error("Unknown route format: {0:?}")]
    UnknownFormat(PathBuf),

    /// The route has no segments
    #[error("Route has no segments")]
    EmptySequence,
}

/// Result type for route operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// One segment of a route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentConfig {
    /// Path points
    pub points: Vec<GeoPoint>,
    /// Motion options
    #[serde(default)]
    pub options: MotionOptions,
}

/// A whole route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceConfig {
    /// Route name
    #[serde(default = "default_name")]
    pub name: String,
    /// Segments in playback order
    pub segments: Vec<SegmentConfig>,
}

fn default_name() -> String {
    "Untitled Route".to_string()
}

impl SequenceConfig {
    /// Parse RON
    pub fn from_ron(s: &str) -> Result<Self> {
        Ok(ron::from_str(s)?)
    }

    /// Serialize to pretty RON
    pub fn to_ron(&self) -> Result<String> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    /// Parse JSON
    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Load a route, picking the format from the file extension
    pub fn load(path: impl AsRef<FsPath>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("ron") => Self::from_ron(&text)?,
            Some("json") => Self::from_json(&text)?,
            _ => return Err(ConfigError::UnknownFormat(path.to_path_buf())),
        };
        tracing::info!("Loaded route '{}' ({} segments) from {:?}", config.name, config.segments.len(), path);
        Ok(config)
    }

    /// Set speed on every segment
    pub fn override_speed(&mut self, speed_kmh: f64) {
        for seg in &mut self.segments {
            seg.options.speed = Some(speed_kmh);
            seg.options.duration = None;
        }
    }

    /// Enable camera follow on every segment
    pub fn follow_marker(&mut self) {
        for seg in &mut self.segments {
            seg.options.follow_marker = true;
        }
    }

    /// Build a sequence driven by `ctx`
    pub fn build(self, ctx: MotionContext) -> Result<Sequence> {
        if self.segments.is_empty() {
            return Err(ConfigError::EmptySequence);
        }
        let mut sequence = Sequence::new(self.name, ctx);
        for seg in self.segments {
            sequence.add_segment(Segment::new(seg.points, seg.options));
        }
        Ok(sequence)
    }
}
