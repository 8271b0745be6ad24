//! Processing settings for one restoration pass

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Settings consumed by the restoration pipeline.
///
/// A settings value is fixed for the lifetime of the channel it is handed
/// to; tweaking parameters means building a new channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingSettings {
    /// AR model order (number of prediction coefficients)
    pub coefficients: usize,
    /// Prediction history window length (samples)
    pub history_samples: usize,
    /// Detection threshold as a multiple of the running error norm
    pub detection_threshold: f64,
    /// Maximum length of a single correction (samples)
    pub max_correction_samples: usize,
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            coefficients: 4,
            history_samples: 512,
            detection_threshold: 10.0,
            max_correction_samples: 250,
        }
    }
}

impl ProcessingSettings {
    /// Number of past samples the predictor requires before the first
    /// position it can score (history window plus model order).
    pub fn input_data_size(&self) -> usize {
        self.history_samples + self.coefficients
    }

    /// Check field ranges before a scan is allowed to start
    pub fn validate(&self) -> CoreResult<()> {
        if self.coefficients == 0 {
            return Err(CoreError::InvalidSettings(
                "coefficients must be at least 1".into(),
            ));
        }
        if self.history_samples < self.coefficients * 2 {
            return Err(CoreError::InvalidSettings(format!(
                "history window of {} samples is too short for model order {}",
                self.history_samples, self.coefficients
            )));
        }
        if !self.detection_threshold.is_finite() || self.detection_threshold <= 0.0 {
            return Err(CoreError::InvalidSettings(format!(
                "detection threshold {} must be finite and positive",
                self.detection_threshold
            )));
        }
        if self.max_correction_samples == 0 {
            return Err(CoreError::InvalidSettings(
                "max correction length must be at least 1 sample".into(),
            ));
        }
        Ok(())
    }
}
