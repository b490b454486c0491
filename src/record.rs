//! Per-spot result record handed to the storage collaborator.

use crate::baseline::BaselineModel;
use crate::staircase::StaircaseParameters;
use serde::{Deserialize, Serialize};

pub const UNIT_HEIGHT: &str = "nm";
pub const UNIT_POSITION: &str = "µm";
pub const UNIT_SLOPE: &str = "nm/µm";

/// Result of a staircase fit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FittedRecord {
    /// Background removed before fitting.
    pub baseline: BaselineModel,
    /// `false` when the baseline was supplied by the caller.
    pub baseline_fitted: bool,
    pub staircase: StaircaseParameters,
    pub extracted_positions: Vec<f64>,
    pub extracted_heights: Vec<f64>,
    pub measured_height: f64,
}

/// Either a fitted result or a height entered by an operator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultRecord {
    Fitted(FittedRecord),
    Manual { measured_height: f64 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Fitted,
    Manual,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fitted => "fitted",
            Self::Manual => "manual",
        }
    }
}

/// Unit attached to one persisted field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct FieldUnit {
    pub field: &'static str,
    pub unit: &'static str,
}

impl ResultRecord {
    pub fn manual(measured_height: f64) -> Self {
        Self::Manual { measured_height }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Fitted(_) => RecordKind::Fitted,
            Self::Manual { .. } => RecordKind::Manual,
        }
    }

    pub fn measured_height(&self) -> f64 {
        match self {
            Self::Fitted(fit) => fit.measured_height,
            Self::Manual { measured_height } => *measured_height,
        }
    }

    pub fn as_fitted(&self) -> Option<&FittedRecord> {
        match self {
            Self::Fitted(fit) => Some(fit),
            Self::Manual { .. } => None,
        }
    }

    /// Units the storage layer attaches to each field of this record.
    pub fn units(&self) -> Vec<FieldUnit> {
        let mut units = vec![FieldUnit {
            field: "measured_height",
            unit: UNIT_HEIGHT,
        }];
        if let Self::Fitted(_) = self {
            units.extend([
                FieldUnit {
                    field: "extracted_positions",
                    unit: UNIT_POSITION,
                },
                FieldUnit {
                    field: "extracted_heights",
                    unit: UNIT_HEIGHT,
                },
                FieldUnit {
                    field: "baseline",
                    unit: UNIT_SLOPE,
                },
            ]);
        }
        units
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staircase::Transition;

    fn fitted() -> ResultRecord {
        ResultRecord::Fitted(FittedRecord {
            baseline: BaselineModel::new(1e-6, 0.0, 0.0),
            baseline_fitted: true,
            staircase: StaircaseParameters::new(vec![
                Transition {
                    position: 0.0,
                    height: 0.0,
                },
                Transition {
                    position: 1.0,
                    height: 5.0,
                },
            ]),
            extracted_positions: vec![0.5],
            extracted_heights: vec![5.0],
            measured_height: 5.0,
        })
    }

    #[test]
    fn serialized_records_carry_kind_tag() {
        let json = serde_json::to_value(ResultRecord::manual(42.0)).unwrap();
        assert_eq!(json["kind"], "manual");
        assert_eq!(json["measured_height"], 42.0);

        let json = serde_json::to_value(fitted()).unwrap();
        assert_eq!(json["kind"], "fitted");
        assert_eq!(json["extracted_heights"][0], 5.0);
        let back: ResultRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, fitted());
    }

    #[test]
    fn units_depend_on_kind() {
        assert_eq!(ResultRecord::manual(1.0).units().len(), 1);
        let units = fitted().units();
        assert!(units
            .iter()
            .any(|u| u.field == "baseline" && u.unit == UNIT_SLOPE));
        assert_eq!(fitted().kind().as_str(), "fitted");
    }
}
