// ============================================================
// Layer 3 — Prediction Domain Types
// ============================================================
// What the predictor hands back to the request layer:
//   - PredictionResult: label, risk score, confidence, advice
//   - Explanation:      feature → importance, most important first
//
// The recommendation rules live here too. They read the raw
// request values (not the scaled vector), so they stay
// meaningful to school staff reading the output.

use serde::{
    ser::SerializeMap,
    Deserialize, Serialize, Serializer,
};

use crate::domain::error::PreprocessingError;
use crate::domain::student::{FeatureMap, FeatureValue};

pub const ATTENDANCE_THRESHOLD: f64 = 75.0;
pub const MARKS_THRESHOLD: f64      = 50.0;
pub const LOWEST_INCOME: &str       = "Low";

pub const LOW_RISK_MESSAGE: &str   = "Student is performing well. Continue monitoring progress.";
pub const ATTENDANCE_MESSAGE: &str = "Improve attendance - currently below 75%";
pub const ACADEMIC_MESSAGE: &str   = "Academic support needed - provide tutoring or extra classes";
pub const FINANCIAL_MESSAGE: &str  = "Consider financial assistance programs";
pub const MONITOR_MESSAGE: &str    = "Monitor closely and provide counseling support";
pub const RECOMMENDATION_SEPARATOR: &str = " | ";

/// Binary dropout-risk label. Class index 0 is Low, 1 is High.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    High,
}

impl RiskLevel {
    pub fn class_index(self) -> usize {
        match self {
            Self::Low  => 0,
            Self::High => 1,
        }
    }
}

/// Response for one prediction request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub dropout_risk:   RiskLevel,
    /// Probability of High, whichever label wins.
    pub risk_score:     f32,
    /// Probability of the chosen label.
    pub confidence:     f32,
    pub recommendation: String,
}

impl PredictionResult {
    /// Build a result from the High-class probability.
    ///
    /// Low probability is taken as `1 - p_high` so that
    /// `confidence == max(risk_score, 1 - risk_score)` holds exactly.
    /// Ties go to Low, matching argmax's first-index rule.
    pub fn from_high_probability(p_high: f32, features: &FeatureMap) -> Self {
        let p_low = 1.0 - p_high;
        let (dropout_risk, confidence) = if p_high > p_low {
            (RiskLevel::High, p_high)
        } else {
            (RiskLevel::Low, p_low)
        };
        Self {
            dropout_risk,
            risk_score: p_high,
            confidence,
            recommendation: recommend(dropout_risk, features),
        }
    }
}

/// Human-readable advice for a prediction.
///
/// Low → fixed reassurance. High → one message per triggered
/// rule in order (attendance, marks, income), joined with
/// `RECOMMENDATION_SEPARATOR`, or a generic monitoring message.
pub fn recommend(level: RiskLevel, features: &FeatureMap) -> String {
    if level == RiskLevel::Low {
        return LOW_RISK_MESSAGE.to_string();
    }

    let number = |key: &str| features.get(key).and_then(FeatureValue::as_number);

    let mut messages = Vec::new();
    if number("attendance").is_some_and(|a| a < ATTENDANCE_THRESHOLD) {
        messages.push(ATTENDANCE_MESSAGE);
    }
    if number("marks").is_some_and(|m| m < MARKS_THRESHOLD) {
        messages.push(ACADEMIC_MESSAGE);
    }
    let income = features.get("income").and_then(FeatureValue::as_category);
    if income.as_deref() == Some(LOWEST_INCOME) {
        messages.push(FINANCIAL_MESSAGE);
    }
    if messages.is_empty() {
        messages.push(MONITOR_MESSAGE);
    }
    messages.join(RECOMMENDATION_SEPARATOR)
}

/// Per-feature importance, sorted by descending importance.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Explanation {
    entries: Vec<(String, f32)>,
}

impl Explanation {
    /// Pair names with weights and sort descending. Ties keep feature order.
    /// One weight per name, or WidthMismatch.
    pub fn from_weights(names: &[String], weights: &[f32]) -> Result<Self, PreprocessingError> {
        if names.len() != weights.len() {
            return Err(PreprocessingError::WidthMismatch {
                expected: names.len(),
                actual:   weights.len(),
            });
        }
        let mut entries: Vec<(String, f32)> = names
            .iter()
            .cloned()
            .zip(weights.iter().copied())
            .collect();
        entries.sort_by(|a, b| b.1.total_cmp(&a.1));
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[(String, f32)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, feature: &str) -> Option<f32> {
        self.entries.iter().find(|(f, _)| f == feature).map(|(_, w)| *w)
    }
}

// Serialised as a JSON object whose key order is the ranking.
impl Serialize for Explanation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (feature, importance) in &self.entries {
            map.serialize_entry(feature, importance)?;
        }
        map.end()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn features(attendance: f64, marks: f64, income: &str) -> FeatureMap {
        let mut m = FeatureMap::new();
        m.insert("attendance".into(), attendance.into());
        m.insert("marks".into(), marks.into());
        m.insert("income".into(), income.into());
        m
    }

    #[test]
    fn test_low_risk_gets_reassurance() {
        let f = features(30.0, 10.0, "Low");
        assert_eq!(recommend(RiskLevel::Low, &f), LOW_RISK_MESSAGE);
    }

    #[test]
    fn test_high_risk_rules_in_order() {
        let f = features(65.5, 45.0, "Low");
        let r = recommend(RiskLevel::High, &f);
        assert_eq!(
            r,
            format!("{ATTENDANCE_MESSAGE} | {ACADEMIC_MESSAGE} | {FINANCIAL_MESSAGE}")
        );
    }

    #[test]
    fn test_high_risk_without_triggers_monitors() {
        let f = features(90.0, 80.0, "High");
        assert_eq!(recommend(RiskLevel::High, &f), MONITOR_MESSAGE);
    }

    #[test]
    fn test_confidence_is_max_probability() {
        let f = features(90.0, 80.0, "High");
        for p in [0.0f32, 0.2, 0.5, 0.73, 1.0] {
            let r = PredictionResult::from_high_probability(p, &f);
            assert_eq!(r.risk_score, p);
            assert_eq!(r.confidence, p.max(1.0 - p));
            assert!((r.risk_score + (1.0 - r.risk_score) - 1.0).abs() < 1e-6);
        }
        let tie = PredictionResult::from_high_probability(0.5, &f);
        assert_eq!(tie.dropout_risk, RiskLevel::Low);
    }

    #[test]
    fn test_explanation_sorted_and_serialised_in_order() {
        let names = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let e = Explanation::from_weights(&names, &[0.1, 0.7, 0.2]).unwrap();
        let order: Vec<&str> = e.entries().iter().map(|(f, _)| f.as_str()).collect();
        assert_eq!(order, ["b", "c", "a"]);
        assert_eq!(serde_json::to_string(&e).unwrap(), r#"{"b":0.7,"c":0.2,"a":0.1}"#);
    }

    #[test]
    fn test_explanation_rejects_length_mismatch() {
        let names = vec!["a".to_string(), "b".to_string()];
        assert!(matches!(
            Explanation::from_weights(&names, &[0.5]),
            Err(PreprocessingError::WidthMismatch { expected: 2, actual: 1 })
        ));
        assert!(Explanation::from_weights(&names, &[0.5, 0.5, 0.1]).is_err());
    }

    #[test]
    fn test_risk_level_serialises_as_label() {
        assert_eq!(serde_json::to_string(&RiskLevel::High).unwrap(), "\"High\"");
        assert_eq!(RiskLevel::High.class_index(), 1);
    }
}
