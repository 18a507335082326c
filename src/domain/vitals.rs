//! Threshold checks on recorded vital signs

use serde::{Deserialize, Serialize};

use crate::models::NewVitals;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalsFlag {
    pub measurement: String,
    pub severity: Severity,
    pub message: String,
}

impl VitalsFlag {
    fn new(measurement: &str, severity: Severity, message: String) -> Self {
        Self {
            measurement: measurement.to_string(),
            severity,
            message,
        }
    }
}

pub fn assess(vitals: &NewVitals) -> Vec<VitalsFlag> {
    let mut flags = Vec::new();

    if let Some(hr) = vitals.pulse {
        if hr > 150 {
            flags.push(VitalsFlag::new("pulse", Severity::Critical, format!("Critical high heart rate: {} bpm", hr)));
        } else if hr < 40 {
            flags.push(VitalsFlag::new("pulse", Severity::Critical, format!("Critical low heart rate: {} bpm", hr)));
        } else if hr > 120 {
            flags.push(VitalsFlag::new("pulse", Severity::High, format!("High heart rate: {} bpm", hr)));
        } else if hr < 50 {
            flags.push(VitalsFlag::new("pulse", Severity::High, format!("Low heart rate: {} bpm", hr)));
        }
    }

    // Either reading alone is enough to raise a flag
    let reading = match (vitals.systolic_bp, vitals.diastolic_bp) {
        (Some(sbp), Some(dbp)) => format!("{}/{} mmHg", sbp, dbp),
        (Some(sbp), None) => format!("systolic {} mmHg", sbp),
        (None, Some(dbp)) => format!("diastolic {} mmHg", dbp),
        (None, None) => String::new(),
    };
    let high = vitals.systolic_bp.map_or(false, |sbp| sbp > 180)
        || vitals.diastolic_bp.map_or(false, |dbp| dbp > 120);
    if high {
        flags.push(VitalsFlag::new(
            "blood_pressure",
            Severity::Critical,
            format!("Critical high blood pressure: {}", reading),
        ));
    } else if vitals.systolic_bp.map_or(false, |sbp| sbp < 90) {
        flags.push(VitalsFlag::new(
            "blood_pressure",
            Severity::Critical,
            format!("Critical low blood pressure: {}", reading),
        ));
    }

    if let Some(spo2) = vitals.spo2 {
        if spo2 < 90 {
            flags.push(VitalsFlag::new("spo2", Severity::Critical, format!("Critical low oxygen saturation: {}%", spo2)));
        } else if spo2 < 92 {
            flags.push(VitalsFlag::new("spo2", Severity::High, format!("Low oxygen saturation: {}%", spo2)));
        }
    }

    if let Some(rr) = vitals.respiratory_rate {
        if rr > 30 {
            flags.push(VitalsFlag::new("respiratory_rate", Severity::High, format!("High respiratory rate: {} breaths/min", rr)));
        } else if rr < 8 {
            flags.push(VitalsFlag::new(
                "respiratory_rate",
                Severity::Critical,
                format!("Critical low respiratory rate: {} breaths/min", rr),
            ));
        }
    }

    if let Some(temp) = vitals.temperature_c {
        if temp > 39.0 {
            flags.push(VitalsFlag::new("temperature", Severity::High, format!("High temperature: {}°C", temp)));
        } else if temp < 35.0 {
            flags.push(VitalsFlag::new("temperature", Severity::High, format!("Low temperature: {}°C", temp)));
        }
    }

    if let Some(glucose) = vitals.blood_glucose {
        if glucose < 54 {
            flags.push(VitalsFlag::new("blood_glucose", Severity::Critical, format!("Critical low blood glucose: {} mg/dL", glucose)));
        } else if glucose > 300 {
            flags.push(VitalsFlag::new("blood_glucose", Severity::High, format!("High blood glucose: {} mg/dL", glucose)));
        }
    }

    flags
}
