//! Periodic supplier performance evaluations.

use chrono::{DateTime, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{EvaluationWeights, GradeCutoffs};
use crate::errors::ProcurementError;
use crate::scoring::{self, DimensionScores, Grade};
use crate::workflow::{self, Action, DocumentKind, DocumentStatus};

const KIND: DocumentKind = DocumentKind::Evaluation;

/// Free-text commentary accompanying each scored dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionComments {
    pub quality: Option<String>,
    pub delivery: Option<String>,
    pub price: Option<String>,
    pub service: Option<String>,
    pub communication: Option<String>,
}

/// Observed performance figures for the review period, captured alongside
/// the scorecard for context. Not part of the composite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceStats {
    pub total_orders: Option<u32>,
    pub total_order_value: Option<Decimal>,
    /// Defective units over delivered units, 0-1.
    pub defect_rate: Option<Decimal>,
    /// Returned units over delivered units, 0-1.
    pub return_rate: Option<Decimal>,
    pub average_lead_time_days: Option<Decimal>,
}

/// Scorecard for one supplier over one review period. Scores are entered in
/// DRAFT, frozen with a composite and grade on completion, and optionally
/// approved afterwards to publish the rating onto the supplier record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplierEvaluation {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub number: String,
    pub supplier_id: Uuid,
    pub evaluation_date: NaiveDate,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub evaluator: String,
    pub strengths: Option<String>,
    pub weaknesses: Option<String>,
    pub recommendations: Option<String>,
    pub action_items: Option<String>,
    pub comments: Option<String>,
    pub dimension_comments: DimensionComments,
    pub statistics: PerformanceStats,

    status: DocumentStatus,
    scores: DimensionScores,
    overall_score: Option<Decimal>,
    grade: Option<Grade>,
    next_evaluation_date: Option<NaiveDate>,

    completed_at: Option<DateTime<Utc>>,
    reviewed_at: Option<DateTime<Utc>>,
    reviewed_by: Option<String>,
    approved_at: Option<DateTime<Utc>>,
    approved_by: Option<String>,
    cancelled_at: Option<DateTime<Utc>>,
    cancelled_by: Option<String>,
    cancellation_reason: Option<String>,

    pub created_by: String,
    pub updated_by: String,
    pub created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) version: u64,
}

impl SupplierEvaluation {
    /// Creates a draft evaluation. The review period must be well ordered.
    pub fn new(
        tenant_id: Uuid,
        number: String,
        supplier_id: Uuid,
        evaluation_date: NaiveDate,
        period_start: NaiveDate,
        period_end: NaiveDate,
        evaluator: String,
        created_by: String,
    ) -> Result<Self, ProcurementError> {
        if period_start > period_end {
            return Err(ProcurementError::Validation(format!(
                "evaluation period start {} is after its end {}",
                period_start, period_end
            )));
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            tenant_id,
            number,
            supplier_id,
            evaluation_date,
            period_start,
            period_end,
            evaluator,
            strengths: None,
            weaknesses: None,
            recommendations: None,
            action_items: None,
            comments: None,
            dimension_comments: DimensionComments::default(),
            statistics: PerformanceStats::default(),
            status: DocumentStatus::Draft,
            scores: DimensionScores::default(),
            overall_score: None,
            grade: None,
            next_evaluation_date: None,
            completed_at: None,
            reviewed_at: None,
            reviewed_by: None,
            approved_at: None,
            approved_by: None,
            cancelled_at: None,
            cancelled_by: None,
            cancellation_reason: None,
            updated_by: created_by.clone(),
            created_by,
            created_at: now,
            updated_at: now,
            version: 0,
        })
    }

    pub fn status(&self) -> DocumentStatus {
        self.status
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn scores(&self) -> &DimensionScores {
        &self.scores
    }

    pub fn overall_score(&self) -> Option<Decimal> {
        self.overall_score
    }

    pub fn grade(&self) -> Option<Grade> {
        self.grade
    }

    pub fn next_evaluation_date(&self) -> Option<NaiveDate> {
        self.next_evaluation_date
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn reviewed_by(&self) -> Option<&str> {
        self.reviewed_by.as_deref()
    }

    pub fn approved_by(&self) -> Option<&str> {
        self.approved_by.as_deref()
    }

    pub fn is_modifiable(&self) -> bool {
        workflow::is_modifiable(KIND, self.status)
    }

    /// Replaces the narrative findings and observed statistics while the
    /// evaluation is still in DRAFT.
    pub fn set_findings(
        &mut self,
        dimension_comments: DimensionComments,
        statistics: PerformanceStats,
        actor: &str,
    ) -> Result<(), ProcurementError> {
        workflow::ensure_modifiable(KIND, self.id, self.status)?;
        self.dimension_comments = dimension_comments;
        self.statistics = statistics;
        self.touch(actor);
        Ok(())
    }

    /// Replaces the scorecard while the evaluation is still in DRAFT.
    pub fn set_scores(
        &mut self,
        scores: DimensionScores,
        actor: &str,
    ) -> Result<(), ProcurementError> {
        workflow::ensure_modifiable(KIND, self.id, self.status)?;
        scores.validate()?;
        self.scores = scores;
        self.touch(actor);
        Ok(())
    }

    /// DRAFT -> COMPLETED. Freezes the composite, the grade, and the next
    /// evaluation due date. At least one dimension must have been scored.
    pub fn complete(
        &mut self,
        weights: &EvaluationWeights,
        cutoffs: &GradeCutoffs,
        frequency_months: u32,
        actor: &str,
    ) -> Result<(), ProcurementError> {
        workflow::ensure(KIND, self.id, self.status, Action::Complete)?;
        self.scores.validate()?;
        let composite = scoring::weighted_composite(&self.scores, weights).ok_or_else(|| {
            ProcurementError::Validation(
                "evaluation cannot complete without at least one scored dimension".to_string(),
            )
        })?;
        self.overall_score = Some(composite);
        self.grade = Some(scoring::grade_for(composite, cutoffs));
        self.next_evaluation_date = self
            .evaluation_date
            .checked_add_months(Months::new(frequency_months));
        self.status = DocumentStatus::Completed;
        self.completed_at = Some(Utc::now());
        self.touch(actor);
        Ok(())
    }

    /// Stamp-only: records a reviewer sign-off on a completed evaluation.
    pub fn review(&mut self, actor: &str) -> Result<(), ProcurementError> {
        if self.status != DocumentStatus::Completed {
            return Err(ProcurementError::NotModifiable {
                id: self.id,
                status: self.status,
            });
        }
        self.reviewed_at = Some(Utc::now());
        self.reviewed_by = Some(actor.to_string());
        self.touch(actor);
        Ok(())
    }

    /// COMPLETED -> APPROVED. The caller then publishes the rating onto the
    /// supplier record.
    pub fn approve(&mut self, actor: &str) -> Result<(), ProcurementError> {
        workflow::ensure(KIND, self.id, self.status, Action::Approve)?;
        self.status = DocumentStatus::Approved;
        self.approved_at = Some(Utc::now());
        self.approved_by = Some(actor.to_string());
        self.touch(actor);
        Ok(())
    }

    pub fn cancel(&mut self, actor: &str, reason: &str) -> Result<(), ProcurementError> {
        workflow::ensure(KIND, self.id, self.status, Action::Cancel)?;
        self.status = DocumentStatus::Cancelled;
        self.cancelled_at = Some(Utc::now());
        self.cancelled_by = Some(actor.to_string());
        self.cancellation_reason = Some(reason.to_string());
        self.touch(actor);
        Ok(())
    }

    fn touch(&mut self, actor: &str) {
        self.updated_by = actor.to_string();
        self.updated_at = Utc::now();
    }
}
