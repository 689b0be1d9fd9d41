//! Validation and normalization of user-entered job settings.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

// HH 00-23, MM/SS 00-59. Same pattern the upload form enforces.
static TIME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[01]\d|2[0-3]):[0-5]\d:[0-5]\d$").unwrap());

/// The two server-side video-combination algorithms. Opaque to this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessingType {
    #[serde(rename = "panoramaStitching")]
    PanoramaStitching,
    #[serde(rename = "opticalFlowMixer")]
    OpticalFlowMixer,
}

/// Canonical job settings, immutable once built.
///
/// Serializes with the wire field names the server expects; `start_time` and
/// `end_time` are seconds, never the `HH:MM:SS` strings the user typed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSettings {
    #[serde(rename = "videoProcessingType")]
    pub processing_type: ProcessingType,
    #[serde(rename = "videoOutputFps")]
    pub output_fps: f64,
    #[serde(rename = "startTime")]
    pub start_time: u32,
    #[serde(rename = "endTime")]
    pub end_time: u32,
    #[serde(rename = "uploadToYoutube")]
    pub upload_to_youtube: bool,
    #[serde(rename = "youtubeTitle", default, skip_serializing_if = "Option::is_none")]
    pub youtube_title: Option<String>,
    #[serde(rename = "burnLogo")]
    pub burn_logo: bool,
}

/// Settings as entered by the user, before validation.
#[derive(Debug, Clone)]
pub struct RawJobSettings {
    pub processing_type: ProcessingType,
    pub output_fps: f64,
    /// `HH:MM:SS`
    pub start_time: String,
    /// `HH:MM:SS`
    pub end_time: String,
    pub upload_to_youtube: bool,
    pub youtube_title: String,
    pub burn_logo: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationReason {
    BadFormat,
    NotAfterStart,
    OutOfRange,
    Required,
}

impl fmt::Display for ValidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationReason::BadFormat => write!(f, "bad-format"),
            ValidationReason::NotAfterStart => write!(f, "not-after-start"),
            ValidationReason::OutOfRange => write!(f, "out-of-range"),
            ValidationReason::Required => write!(f, "required"),
        }
    }
}

/// A settings field that cannot be submitted as entered. Local to the
/// client; never sent over the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: ValidationReason,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

impl std::error::Error for ValidationError {}

fn time_to_seconds(field: &'static str, value: &str) -> Result<u32, ValidationError> {
    if !TIME_PATTERN.is_match(value) {
        return Err(ValidationError {
            field,
            reason: ValidationReason::BadFormat,
        });
    }
    // The pattern guarantees three numeric groups
    let mut parts = value.split(':').map(|p| p.parse::<u32>().unwrap());
    let hours = parts.next().unwrap();
    let minutes = parts.next().unwrap();
    let seconds = parts.next().unwrap();
    Ok(hours * 3600 + minutes * 60 + seconds)
}

/// Validate raw user input and produce canonical settings.
///
/// Pure function of its input; reports the first failing field.
pub fn validate(raw: &RawJobSettings) -> Result<JobSettings, ValidationError> {
    let start_time = time_to_seconds("startTime", &raw.start_time)?;
    let end_time = time_to_seconds("endTime", &raw.end_time)?;

    if start_time >= end_time {
        return Err(ValidationError {
            field: "endTime",
            reason: ValidationReason::NotAfterStart,
        });
    }

    if !(30.0..=60.0).contains(&raw.output_fps) {
        return Err(ValidationError {
            field: "videoOutputFps",
            reason: ValidationReason::OutOfRange,
        });
    }

    let youtube_title = if raw.upload_to_youtube {
        if raw.youtube_title.trim().is_empty() {
            return Err(ValidationError {
                field: "youtubeTitle",
                reason: ValidationReason::Required,
            });
        }
        Some(raw.youtube_title.clone())
    } else {
        None
    };

    Ok(JobSettings {
        processing_type: raw.processing_type,
        output_fps: raw.output_fps,
        start_time,
        end_time,
        upload_to_youtube: raw.upload_to_youtube,
        youtube_title,
        burn_logo: raw.burn_logo,
    })
}
