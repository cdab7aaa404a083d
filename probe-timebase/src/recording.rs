//! Recordings and concatenated recording groups.

use crate::clock::AffineModel;
use crate::error::{Result, TimebaseError};
use serde::{Deserialize, Serialize};

/// Timing metadata of one recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recording {
    /// Recording identifier
    pub id: String,
    /// Probe-clock duration in samples
    pub duration_samples: i64,
    /// Probe sample rate in Hz
    pub sample_rate: f64,
    /// Probe clock to auxiliary clock correction
    pub probe_to_aux: AffineModel,
    /// Auxiliary clock to behavioral clock correction; absent when the
    /// drift model could not be fitted for this recording
    pub aux_to_behavioral: Option<AffineModel>,
}

impl Recording {
    /// Probe-clock duration in seconds.
    pub fn duration_sec(&self) -> f64 {
        self.duration_samples as f64 / self.sample_rate
    }

    /// Check the timing metadata invariants.
    pub fn validate(&self) -> Result<()> {
        if !(self.sample_rate > 0.0) || !self.sample_rate.is_finite() {
            return Err(TimebaseError::InvalidParameter {
                parameter: format!("{}.sample_rate", self.id),
                value: self.sample_rate,
                reason: "must be positive and finite".to_string(),
            });
        }
        if self.duration_samples < 0 {
            return Err(TimebaseError::InvalidParameter {
                parameter: format!("{}.duration_samples", self.id),
                value: self.duration_samples as f64,
                reason: "must be non-negative".to_string(),
            });
        }
        Ok(())
    }
}

/// An ordered sequence of recordings whose probe-clock spike stream
/// arrives concatenated. Spikes before cumulative offset `t_k` belong to
/// recording `k`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingGroup {
    /// Members in concatenation order
    pub recordings: Vec<Recording>,
}

impl RecordingGroup {
    /// Build a group, checking it is non-empty, every member validates,
    /// and all members share one probe sample rate.
    pub fn new(recordings: Vec<Recording>) -> Result<Self> {
        if recordings.is_empty() {
            return Err(TimebaseError::EmptyGroup);
        }
        let group_rate = recordings[0].sample_rate;
        for rec in &recordings {
            rec.validate()?;
            if rec.sample_rate != group_rate {
                return Err(TimebaseError::MixedSampleRates {
                    recording: rec.id.clone(),
                    rate: rec.sample_rate,
                    group_rate,
                });
            }
        }
        Ok(Self { recordings })
    }

    /// A group of one, the non-concatenated case.
    pub fn single(recording: Recording) -> Result<Self> {
        Self::new(vec![recording])
    }

    /// Group identity: the member ids in order.
    pub fn id(&self) -> String {
        self.recordings
            .iter()
            .map(|r| r.id.as_str())
            .collect::<Vec<_>>()
            .join("+")
    }

    /// Shared probe sample rate.
    pub fn sample_rate(&self) -> f64 {
        self.recordings[0].sample_rate
    }

    /// Total probe-clock duration in seconds.
    pub fn total_duration_sec(&self) -> f64 {
        self.recordings.iter().map(|r| r.duration_sec()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str, samples: i64, rate: f64) -> Recording {
        Recording {
            id: id.to_string(),
            duration_samples: samples,
            sample_rate: rate,
            probe_to_aux: AffineModel::identity(),
            aux_to_behavioral: Some(AffineModel::identity()),
        }
    }

    #[test]
    fn test_duration_sec() {
        assert_eq!(rec("a", 30_000, 30_000.0).duration_sec(), 1.0);
    }

    #[test]
    fn test_empty_group_rejected() {
        assert!(matches!(
            RecordingGroup::new(vec![]),
            Err(TimebaseError::EmptyGroup)
        ));
    }

    #[test]
    fn test_mixed_rates_rejected() {
        let result =
            RecordingGroup::new(vec![rec("a", 100, 30_000.0), rec("b", 100, 25_000.0)]);
        assert!(matches!(
            result,
            Err(TimebaseError::MixedSampleRates { .. })
        ));
    }

    #[test]
    fn test_group_id_joins_members() {
        let group =
            RecordingGroup::new(vec![rec("r1", 100, 30_000.0), rec("r2", 100, 30_000.0)])
                .unwrap();
        assert_eq!(group.id(), "r1+r2");
        assert_eq!(group.sample_rate(), 30_000.0);
    }

    #[test]
    fn test_invalid_rate_rejected() {
        let result = RecordingGroup::single(rec("a", 100, 0.0));
        assert!(matches!(
            result,
            Err(TimebaseError::InvalidParameter { .. })
        ));
    }
}
