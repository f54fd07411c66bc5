use std::time::Duration;

use serde::Serialize;

/// Output width of the digit classifier.
pub const DIGIT_CLASSES: usize = 10;

/// Softmax over `logits`.
///
/// The maximum is subtracted before exponentiating so large logits cannot
/// overflow `exp`; for finite input the result equals the plain
/// `exp(v_i) / sum(exp(v_j))`.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if !max.is_finite() {
        return vec![0.0; logits.len()];
    }
    let exps: Vec<f32> = logits.iter().map(|&v| (v - max).exp()).collect();
    let total: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

/// Index of the first maximum; ties resolve to the lowest index.
pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ if v.is_nan() => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub label: usize,
    pub confidence: f32,
    pub is_top: bool,
}

/// One classification: a confidence per digit plus how long the forward
/// pass took.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    pub predictions: Vec<Prediction>,
    /// `None` for the idle (reset) result.
    pub elapsed: Option<Duration>,
}

impl PredictionResult {
    /// Pairs each label with its softmax confidence; the top flag goes to
    /// the arg-max of the raw logits.
    pub fn from_logits(logits: &[f32], elapsed: Duration) -> Self {
        let top = argmax(logits);
        let predictions = softmax(logits)
            .into_iter()
            .enumerate()
            .map(|(label, confidence)| Prediction { label, confidence, is_top: Some(label) == top })
            .collect();
        PredictionResult { predictions, elapsed: Some(elapsed) }
    }

    /// Ten zero-confidence entries with no top class.
    pub fn empty() -> Self {
        let predictions = (0..DIGIT_CLASSES)
            .map(|label| Prediction { label, confidence: 0.0, is_top: false })
            .collect();
        PredictionResult { predictions, elapsed: None }
    }

    pub fn top(&self) -> Option<&Prediction> {
        self.predictions.iter().find(|p| p.is_top)
    }

    /// Latency in milliseconds with two decimals, e.g. `1.27ms`; `-` when idle.
    pub fn latency_label(&self) -> String {
        match self.elapsed {
            Some(d) => format!("{:.2}ms", d.as_secs_f64() * 1000.0),
            None => "-".to_owned(),
        }
    }
}

/// Summary line items shown next to the predictions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkStats {
    pub inference_time: String,
    pub subgroups_status: String,
    pub prediction_label: String,
}

impl NetworkStats {
    /// `subgroups` is `None` while no device has been opened.
    pub fn new(result: &PredictionResult, subgroups: Option<bool>) -> Self {
        let prediction_label = match result.elapsed {
            Some(_) => format!("Predictions ({})", result.latency_label()),
            None => "Predictions (-.--ms)".to_owned(),
        };
        let subgroups_status = match subgroups {
            Some(true) => "enabled",
            Some(false) => "disabled",
            None => "-",
        };
        NetworkStats {
            inference_time: result.latency_label(),
            subgroups_status: subgroups_status.to_owned(),
            prediction_label,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argmax_prefers_lowest_index_on_ties() {
        assert_eq!(argmax(&[1.0, 3.0, 3.0, 2.0]), Some(1));
        assert_eq!(argmax(&[f32::NAN, 0.5]), Some(1));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn latency_has_two_decimals() {
        let result = PredictionResult::from_logits(&[0.0; 10], Duration::from_micros(1234));
        assert_eq!(result.latency_label(), "1.23ms");
        let stats = NetworkStats::new(&result, Some(true));
        assert_eq!(stats.prediction_label, "Predictions (1.23ms)");
        assert_eq!(stats.subgroups_status, "enabled");
    }
}
