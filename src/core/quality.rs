use serde::{Deserialize, Serialize};
use std::fmt;

/// Face offset from the frame center, normalized to [-1, 1] on each axis,
/// and its size relative to the reference distance (1.0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacePosition {
    pub x: f32,
    pub y: f32,
    pub scale: f32,
}

impl Default for FacePosition {
    fn default() -> Self {
        Self { x: 0.0, y: 0.0, scale: 1.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityAttributes {
    pub eyes_open: bool,
    pub is_smiling: bool,
    pub is_well_lit: bool,
    pub is_ideal_lighting: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CenteringThresholds {
    pub max_offset_x: f32,
    pub max_offset_y: f32,
    pub max_scale_deviation: f32,
}

impl Default for CenteringThresholds {
    fn default() -> Self {
        Self {
            max_offset_x: 0.1,
            max_offset_y: 0.1,
            max_scale_deviation: 0.1,
        }
    }
}

/// A single enrollment precondition that was not satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateFailure {
    FaceNotDetected,
    NotCentered,
    EyesClosed,
    NotSmiling,
    PoorLighting,
}

impl fmt::Display for GateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            GateFailure::FaceNotDetected => "No face detected",
            GateFailure::NotCentered => "Center your face in the frame",
            GateFailure::EyesClosed => "Please open your eyes",
            GateFailure::NotSmiling => "Please smile",
            GateFailure::PoorLighting => "Please move to a well-lit area",
        };
        f.write_str(message)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GateEvaluation {
    pub is_centered: bool,
    pub ready_to_enroll: bool,
    pub failures: Vec<GateFailure>,
}

pub fn is_centered(position: &FacePosition, thresholds: &CenteringThresholds) -> bool {
    // Strict inequality: a face exactly on a threshold is not centered
    position.x.abs() < thresholds.max_offset_x
        && position.y.abs() < thresholds.max_offset_y
        && (position.scale - 1.0).abs() < thresholds.max_scale_deviation
}

/// Decide whether a live capture is good enough to enroll.
pub fn evaluate(
    position: &FacePosition,
    quality: &QualityAttributes,
    thresholds: &CenteringThresholds,
) -> GateEvaluation {
    let is_centered = is_centered(position, thresholds);

    let mut failures = Vec::new();
    if !is_centered {
        failures.push(GateFailure::NotCentered);
    }
    if !quality.eyes_open {
        failures.push(GateFailure::EyesClosed);
    }
    if !quality.is_smiling {
        failures.push(GateFailure::NotSmiling);
    }
    if !quality.is_well_lit {
        failures.push(GateFailure::PoorLighting);
    }

    GateEvaluation {
        is_centered,
        ready_to_enroll: failures.is_empty(),
        failures,
    }
}

/// Human-readable feedback for the current capture.
pub fn guidance(evaluation: &GateEvaluation, quality: &QualityAttributes) -> String {
    let mut messages: Vec<String> = evaluation
        .failures
        .iter()
        .map(|f| f.to_string())
        .collect();

    if quality.is_well_lit && !quality.is_ideal_lighting {
        messages.push("Better lighting would improve face detection".to_string());
    }

    if messages.is_empty() {
        "Ready to enroll".to_string()
    } else {
        messages.join(" | ")
    }
}
