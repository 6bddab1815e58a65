//! Captain override of a cancellation recommendation.
//!
//! The captain has final authority. An override never touches the plan it
//! overrides: it is a separate, audited record that names who decided, why,
//! and the mitigations they accepted.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::audit::{AuditEvent, AuditSink};
use crate::model::{SafetyClass, VoyagePlan};
use crate::procedure::OVERRIDE_MITIGATIONS;

#[derive(Debug, thiserror::Error)]
pub enum OverrideError {
    #[error("plan {0} does not require an override")]
    NotRequired(String),

    #[error("an override must name the operator")]
    MissingOperator,

    #[error("an override must give a reason")]
    MissingReason,
}

/// Who is overriding and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptainOverride {
    pub operator_id: String,
    pub reason: String,
    #[serde(default)]
    pub force_majeure: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideRecord {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub at: Timestamp,
    pub operator_id: String,
    pub reason: String,
    pub force_majeure: bool,
    pub original_class: SafetyClass,
    pub original_cancellation_reason: String,

    /// Set when a critical verdict is overridden without force majeure.
    pub discouraged: bool,
    pub mitigations: Vec<String>,
}

impl CaptainOverride {
    pub fn new(operator_id: impl Into<String>, reason: impl Into<String>, force_majeure: bool) -> Self {
        Self {
            operator_id: operator_id.into(),
            reason: reason.into(),
            force_majeure,
        }
    }

    /// Record the override against `plan`.
    pub fn apply(
        &self,
        plan: &VoyagePlan,
        audit: &dyn AuditSink,
    ) -> Result<OverrideRecord, OverrideError> {
        if !plan.override_required {
            return Err(OverrideError::NotRequired(plan.short_id()));
        }
        if self.operator_id.trim().is_empty() {
            return Err(OverrideError::MissingOperator);
        }
        if self.reason.trim().is_empty() {
            return Err(OverrideError::MissingReason);
        }

        let class = plan.verdict.class;
        let discouraged = class == SafetyClass::Critical && !self.force_majeure;
        let record = OverrideRecord {
            id: Uuid::new_v4(),
            plan_id: plan.id,
            at: Timestamp::now(),
            operator_id: self.operator_id.clone(),
            reason: self.reason.clone(),
            force_majeure: self.force_majeure,
            original_class: class,
            original_cancellation_reason: plan
                .cancellation_reason
                .clone()
                .unwrap_or_else(|| plan.verdict.reason.clone()),
            discouraged,
            mitigations: OVERRIDE_MITIGATIONS.iter().map(|m| m.to_string()).collect(),
        };

        warn!(
            plan = %plan.short_id(),
            operator = %record.operator_id,
            %class,
            force_majeure = record.force_majeure,
            discouraged,
            "captain override"
        );
        audit.record(AuditEvent::CaptainOverride {
            override_id: record.id,
            plan_id: plan.id,
            operator: record.operator_id.clone(),
            reason: record.reason.clone(),
            force_majeure: record.force_majeure,
            discouraged,
        });

        Ok(record)
    }
}
