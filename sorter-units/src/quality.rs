//! Curation quality labels assigned by the upstream sorter.

use crate::error::{Result, UnitsError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Quality label attached to a cluster by the sorter's curation output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityLabel {
    /// Artifact or non-neural cluster
    Noise,
    /// Multi-unit activity
    Mua,
    /// Well-isolated single unit
    Good,
    /// Never reviewed
    Unsorted,
}

impl QualityLabel {
    /// Whether the cluster carries the `good` curation label.
    pub fn is_good(&self) -> bool {
        matches!(self, QualityLabel::Good)
    }
}

impl fmt::Display for QualityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QualityLabel::Noise => "noise",
            QualityLabel::Mua => "mua",
            QualityLabel::Good => "good",
            QualityLabel::Unsorted => "unsorted",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for QualityLabel {
    type Err = UnitsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "noise" => Ok(QualityLabel::Noise),
            "mua" => Ok(QualityLabel::Mua),
            "good" => Ok(QualityLabel::Good),
            "unsorted" => Ok(QualityLabel::Unsorted),
            other => Err(UnitsError::UnknownQualityLabel {
                label: other.to_string(),
            }),
        }
    }
}

/// Parse the sorter's tab-separated quality table.
///
/// Expected columns are `cluster_id` and a label in
/// `{noise, mua, good, unsorted}`. A header row starting with a
/// non-numeric first column is skipped.
pub fn parse_quality_table(text: &str) -> Result<BTreeMap<i32, QualityLabel>> {
    let mut table = BTreeMap::new();

    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut fields = line.split('\t');
        let id_field = fields.next().unwrap_or("");
        let label_field = fields
            .next()
            .ok_or_else(|| UnitsError::MalformedQualityRow {
                line: lineno + 1,
                reason: "missing label column".to_string(),
            })?;

        // Header row: first column is not an integer
        let cluster: i32 = match id_field.trim().parse() {
            Ok(id) => id,
            Err(_) if lineno == 0 => continue,
            Err(_) => {
                return Err(UnitsError::MalformedQualityRow {
                    line: lineno + 1,
                    reason: format!("cluster id {:?} is not an integer", id_field),
                })
            }
        };

        table.insert(cluster, label_field.parse()?);
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_round_trip() {
        for s in ["noise", "mua", "good", "unsorted"] {
            let label: QualityLabel = s.parse().unwrap();
            assert_eq!(label.to_string(), s);
        }
    }

    #[test]
    fn test_unknown_label_fails() {
        let result = "excellent".parse::<QualityLabel>();
        assert!(matches!(
            result,
            Err(UnitsError::UnknownQualityLabel { .. })
        ));
    }

    #[test]
    fn test_parse_table_with_header() {
        let text = "cluster_id\tgroup\n0\tgood\n1\tmua\n7\tnoise\n";
        let table = parse_quality_table(text).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table[&0], QualityLabel::Good);
        assert_eq!(table[&7], QualityLabel::Noise);
    }

    #[test]
    fn test_parse_table_missing_column() {
        let text = "0\tgood\n1\n";
        assert!(matches!(
            parse_quality_table(text),
            Err(UnitsError::MalformedQualityRow { line: 2, .. })
        ));
    }

    #[test]
    fn test_is_good() {
        assert!(QualityLabel::Good.is_good());
        assert!(!QualityLabel::Mua.is_good());
    }
}
