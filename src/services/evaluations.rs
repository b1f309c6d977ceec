//! Supplier evaluation lifecycle and rating publication.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::config::EngineConfig;
use crate::errors::ProcurementError;
use crate::events::{Event, EventSender};
use crate::models::{SupplierEvaluation, TenantContext};
use crate::numbering::SequenceNumbers;
use crate::models::{DimensionComments, PerformanceStats};
use crate::scoring::DimensionScores;
use crate::store::{DocumentFilter, EvaluationStore, Page, PageRequest, SupplierStore};

/// Input for opening a draft evaluation.
#[derive(Debug, Clone, Validate)]
pub struct CreateEvaluationInput {
    pub supplier_id: Uuid,
    pub evaluation_date: Option<NaiveDate>,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    #[validate(length(min = 1, max = 255))]
    pub evaluator: String,
    pub comments: Option<String>,
}

/// Service for managing supplier evaluations.
#[derive(Clone)]
pub struct EvaluationService {
    store: Arc<dyn EvaluationStore>,
    suppliers: Arc<dyn SupplierStore>,
    events: EventSender,
    numbers: Arc<SequenceNumbers>,
    config: Arc<EngineConfig>,
}

impl EvaluationService {
    pub fn new(
        store: Arc<dyn EvaluationStore>,
        suppliers: Arc<dyn SupplierStore>,
        events: EventSender,
        numbers: Arc<SequenceNumbers>,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            store,
            suppliers,
            events,
            numbers,
            config,
        }
    }

    async fn allocate_number(&self, tenant_id: Uuid) -> Result<String, ProcurementError> {
        loop {
            let candidate = self
                .numbers
                .next(tenant_id, &self.config.numbering.evaluation_prefix);
            if !self.store.number_taken(tenant_id, &candidate).await? {
                return Ok(candidate);
            }
        }
    }

    /// Opens a draft evaluation for an existing supplier.
    #[instrument(skip(self, input), fields(tenant_id = %ctx.tenant_id))]
    pub async fn create(
        &self,
        ctx: &TenantContext,
        input: CreateEvaluationInput,
    ) -> Result<SupplierEvaluation, ProcurementError> {
        input.validate()?;
        // Fails early if the supplier is unknown to the tenant.
        let supplier = self.suppliers.find(ctx.tenant_id, input.supplier_id).await?;

        let number = self.allocate_number(ctx.tenant_id).await?;
        let mut evaluation = SupplierEvaluation::new(
            ctx.tenant_id,
            number,
            supplier.id,
            input.evaluation_date.unwrap_or_else(|| Utc::now().date_naive()),
            input.period_start,
            input.period_end,
            input.evaluator,
            ctx.actor.clone(),
        )?;
        evaluation.comments = input.comments;

        let evaluation = self.store.insert(evaluation).await?;
        info!(evaluation_id = %evaluation.id, supplier_id = %supplier.id, "evaluation opened");
        Ok(evaluation)
    }

    #[instrument(skip(self))]
    pub async fn get(
        &self,
        ctx: &TenantContext,
        id: Uuid,
    ) -> Result<SupplierEvaluation, ProcurementError> {
        self.store.find(ctx.tenant_id, id).await
    }

    #[instrument(skip(self, filter))]
    pub async fn list(
        &self,
        ctx: &TenantContext,
        filter: DocumentFilter,
        page: PageRequest,
    ) -> Result<Page<SupplierEvaluation>, ProcurementError> {
        self.store.list(ctx.tenant_id, filter, page).await
    }

    #[instrument(skip(self, scores))]
    pub async fn set_scores(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        scores: DimensionScores,
    ) -> Result<SupplierEvaluation, ProcurementError> {
        let mut evaluation = self.store.find(ctx.tenant_id, id).await?;
        evaluation.set_scores(scores, &ctx.actor)?;
        self.store.save(evaluation).await
    }

    /// Records per-dimension commentary and observed performance figures on
    /// a draft evaluation.
    #[instrument(skip(self, dimension_comments, statistics))]
    pub async fn set_findings(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        dimension_comments: DimensionComments,
        statistics: PerformanceStats,
    ) -> Result<SupplierEvaluation, ProcurementError> {
        let mut evaluation = self.store.find(ctx.tenant_id, id).await?;
        evaluation.set_findings(dimension_comments, statistics, &ctx.actor)?;
        self.store.save(evaluation).await
    }

    /// DRAFT -> COMPLETED: freezes the composite score, grade, and the next
    /// evaluation due date.
    #[instrument(skip(self))]
    pub async fn complete(
        &self,
        ctx: &TenantContext,
        id: Uuid,
    ) -> Result<SupplierEvaluation, ProcurementError> {
        let mut evaluation = self.store.find(ctx.tenant_id, id).await?;
        evaluation.complete(
            &self.config.evaluation_weights,
            &self.config.grade_cutoffs,
            self.config.evaluation_frequency_months,
            &ctx.actor,
        )?;
        let evaluation = self.store.save(evaluation).await?;
        info!(evaluation_id = %evaluation.id, score = ?evaluation.overall_score(), "evaluation completed");
        self.events
            .emit(Event::EvaluationCompleted {
                evaluation_id: evaluation.id,
                supplier_id: evaluation.supplier_id,
            })
            .await;
        Ok(evaluation)
    }

    #[instrument(skip(self))]
    pub async fn review(
        &self,
        ctx: &TenantContext,
        id: Uuid,
    ) -> Result<SupplierEvaluation, ProcurementError> {
        let mut evaluation = self.store.find(ctx.tenant_id, id).await?;
        evaluation.review(&ctx.actor)?;
        self.store.save(evaluation).await
    }

    /// COMPLETED -> APPROVED, publishing the frozen score onto the supplier
    /// record as its current rating.
    #[instrument(skip(self))]
    pub async fn approve(
        &self,
        ctx: &TenantContext,
        id: Uuid,
    ) -> Result<SupplierEvaluation, ProcurementError> {
        let mut evaluation = self.store.find(ctx.tenant_id, id).await?;
        evaluation.approve(&ctx.actor)?;
        let evaluation = self.store.save(evaluation).await?;

        // The approval has committed at this point. Rating publication is
        // best-effort: a lost race on the supplier record must not surface
        // as a failed approval, the rating refreshes on the next one.
        if let Some(score) = evaluation.overall_score() {
            if let Err(e) = self.publish_rating(ctx, &evaluation, score).await {
                warn!(supplier_id = %evaluation.supplier_id, error = %e,
                    "rating publication skipped");
            }
        }

        info!(evaluation_id = %evaluation.id, "evaluation approved");
        self.events
            .emit(Event::EvaluationApproved(evaluation.id))
            .await;
        Ok(evaluation)
    }

    async fn publish_rating(
        &self,
        ctx: &TenantContext,
        evaluation: &SupplierEvaluation,
        score: Decimal,
    ) -> Result<(), ProcurementError> {
        let mut supplier = self
            .suppliers
            .find(ctx.tenant_id, evaluation.supplier_id)
            .await?;
        supplier.record_evaluation(score, evaluation.evaluation_date, &ctx.actor)?;
        self.suppliers.save(supplier).await?;
        Ok(())
    }

    #[instrument(skip(self, reason))]
    pub async fn cancel(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        reason: &str,
    ) -> Result<SupplierEvaluation, ProcurementError> {
        let mut evaluation = self.store.find(ctx.tenant_id, id).await?;
        evaluation.cancel(&ctx.actor, reason)?;
        self.store.save(evaluation).await
    }
}
