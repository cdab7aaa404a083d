//! Probe geometry: channel to electrode mapping and neighborhoods.

use crate::error::{Result, StitchError};
use serde::{Deserialize, Serialize};

/// Probe geometry, mapping each acquisition channel (by position) to its
/// electrode index along the shank.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeGeometry {
    electrode_index: Vec<i32>,
}

impl ProbeGeometry {
    /// Build from the per-channel electrode indices.
    pub fn new(electrode_index: Vec<i32>) -> Self {
        Self { electrode_index }
    }

    /// A linear probe where channel k sits on electrode k.
    pub fn linear(n_channels: usize) -> Self {
        Self {
            electrode_index: (0..n_channels as i32).collect(),
        }
    }

    /// Number of mapped channels.
    pub fn n_channels(&self) -> usize {
        self.electrode_index.len()
    }

    /// Electrode index of a channel.
    pub fn electrode_of(&self, channel: i32) -> Result<i32> {
        if channel < 0 || channel as usize >= self.electrode_index.len() {
            return Err(StitchError::UnknownChannel { channel });
        }
        Ok(self.electrode_index[channel as usize])
    }

    /// Channels whose electrode index is within `radius` of the given
    /// channel's electrode index, including the channel itself.
    pub fn neighborhood(&self, channel: i32, radius: i32) -> Result<Vec<i32>> {
        let center = self.electrode_of(channel)?;
        Ok(self
            .electrode_index
            .iter()
            .enumerate()
            .filter(|(_, &e)| (e - center).abs() <= radius)
            .map(|(c, _)| c as i32)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_neighborhood() {
        let geom = ProbeGeometry::linear(10);
        assert_eq!(geom.neighborhood(5, 2).unwrap(), vec![3, 4, 5, 6, 7]);
        assert_eq!(geom.neighborhood(0, 2).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_neighborhood_symmetry() {
        // Electrode indices are a total order, so membership is symmetric.
        let geom = ProbeGeometry::new(vec![4, 0, 2, 7, 1, 3]);
        let radius = 2;
        for a in 0..geom.n_channels() as i32 {
            for b in 0..geom.n_channels() as i32 {
                let a_in_b = geom.neighborhood(b, radius).unwrap().contains(&a);
                let b_in_a = geom.neighborhood(a, radius).unwrap().contains(&b);
                assert_eq!(a_in_b, b_in_a);
            }
        }
    }

    #[test]
    fn test_unknown_channel() {
        let geom = ProbeGeometry::linear(4);
        assert!(matches!(
            geom.electrode_of(9),
            Err(StitchError::UnknownChannel { channel: 9 })
        ));
    }
}
