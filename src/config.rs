//! Engine configuration.
//!
//! Scoring weights, grade cutoffs, tax modes, numbering prefixes, and default
//! validity windows live here as named configuration with serde defaults, so
//! deployments can override them from a file or environment without touching
//! the computation code.

use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

const CONFIG_DIR: &str = "config";
const ENV_PREFIX: &str = "PROCUREMENT";

/// How document tax is derived for a document type.
///
/// `DocumentLevel` applies the document's own tax rate on top of item totals;
/// `ItemLevel` trusts the tax already embedded in each item total; `None`
/// applies no tax at all. The two taxed modes are alternatives, never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaxMode {
    #[default]
    DocumentLevel,
    ItemLevel,
    None,
}

/// Weights for the five supplier evaluation dimensions. The composite
/// renormalizes over the dimensions actually scored, so the weights need not
/// be exhaustive for partially scored evaluations.
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluationWeights {
    #[serde(default = "default_quality_weight")]
    pub quality: Decimal,
    #[serde(default = "default_delivery_weight")]
    pub delivery: Decimal,
    #[serde(default = "default_price_weight")]
    pub price: Decimal,
    #[serde(default = "default_service_weight")]
    pub service: Decimal,
    #[serde(default = "default_communication_weight")]
    pub communication: Decimal,
}

impl Default for EvaluationWeights {
    fn default() -> Self {
        Self {
            quality: default_quality_weight(),
            delivery: default_delivery_weight(),
            price: default_price_weight(),
            service: default_service_weight(),
            communication: default_communication_weight(),
        }
    }
}

fn default_quality_weight() -> Decimal {
    dec!(0.30)
}
fn default_delivery_weight() -> Decimal {
    dec!(0.25)
}
fn default_price_weight() -> Decimal {
    dec!(0.20)
}
fn default_service_weight() -> Decimal {
    dec!(0.15)
}
fn default_communication_weight() -> Decimal {
    dec!(0.10)
}

/// Lower bounds of the A/B/C/D grade bands on the 0-5 composite.
#[derive(Debug, Clone, Deserialize)]
pub struct GradeCutoffs {
    #[serde(default = "default_grade_a")]
    pub a: Decimal,
    #[serde(default = "default_grade_b")]
    pub b: Decimal,
    #[serde(default = "default_grade_c")]
    pub c: Decimal,
    #[serde(default = "default_grade_d")]
    pub d: Decimal,
}

impl Default for GradeCutoffs {
    fn default() -> Self {
        Self {
            a: default_grade_a(),
            b: default_grade_b(),
            c: default_grade_c(),
            d: default_grade_d(),
        }
    }
}

fn default_grade_a() -> Decimal {
    dec!(4.5)
}
fn default_grade_b() -> Decimal {
    dec!(3.5)
}
fn default_grade_c() -> Decimal {
    dec!(2.5)
}
fn default_grade_d() -> Decimal {
    dec!(1.5)
}

/// Weights combining the externally supplied technical and commercial scores
/// of a quotation into its overall score.
#[derive(Debug, Clone, Deserialize)]
pub struct QuotationScoreWeights {
    #[serde(default = "default_technical_weight")]
    pub technical: Decimal,
    #[serde(default = "default_commercial_weight")]
    pub commercial: Decimal,
}

impl Default for QuotationScoreWeights {
    fn default() -> Self {
        Self {
            technical: default_technical_weight(),
            commercial: default_commercial_weight(),
        }
    }
}

fn default_technical_weight() -> Decimal {
    dec!(0.6)
}
fn default_commercial_weight() -> Decimal {
    dec!(0.4)
}

/// Document number prefixes, one per document type.
#[derive(Debug, Clone, Deserialize)]
pub struct NumberingConfig {
    #[serde(default = "default_requisition_prefix")]
    pub requisition_prefix: String,
    #[serde(default = "default_rfq_prefix")]
    pub rfq_prefix: String,
    #[serde(default = "default_quotation_prefix")]
    pub quotation_prefix: String,
    #[serde(default = "default_purchase_order_prefix")]
    pub purchase_order_prefix: String,
    #[serde(default = "default_evaluation_prefix")]
    pub evaluation_prefix: String,
}

impl Default for NumberingConfig {
    fn default() -> Self {
        Self {
            requisition_prefix: default_requisition_prefix(),
            rfq_prefix: default_rfq_prefix(),
            quotation_prefix: default_quotation_prefix(),
            purchase_order_prefix: default_purchase_order_prefix(),
            evaluation_prefix: default_evaluation_prefix(),
        }
    }
}

fn default_requisition_prefix() -> String {
    "PR".to_string()
}
fn default_rfq_prefix() -> String {
    "RFQ".to_string()
}
fn default_quotation_prefix() -> String {
    "QUO".to_string()
}
fn default_purchase_order_prefix() -> String {
    "PO".to_string()
}
fn default_evaluation_prefix() -> String {
    "SE".to_string()
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Tax derivation for quotations.
    #[serde(default)]
    pub quotation_tax_mode: TaxMode,
    /// Tax derivation for purchase orders.
    #[serde(default)]
    pub purchase_order_tax_mode: TaxMode,
    #[serde(default)]
    pub evaluation_weights: EvaluationWeights,
    #[serde(default)]
    pub grade_cutoffs: GradeCutoffs,
    #[serde(default)]
    pub quotation_score_weights: QuotationScoreWeights,
    #[serde(default)]
    pub numbering: NumberingConfig,
    /// Days from issue to closing when an RFQ gives no closing date.
    #[serde(default = "default_rfq_closing_days")]
    pub rfq_closing_days: i64,
    /// Days of validity past the closing date when an RFQ gives none.
    #[serde(default = "default_rfq_validity_days")]
    pub rfq_validity_days: i64,
    /// Days of validity when a quotation gives none.
    #[serde(default = "default_quotation_validity_days")]
    pub quotation_validity_days: i64,
    /// Months until the next supplier evaluation when none is set.
    #[serde(default = "default_evaluation_frequency_months")]
    pub evaluation_frequency_months: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            quotation_tax_mode: TaxMode::default(),
            purchase_order_tax_mode: TaxMode::default(),
            evaluation_weights: EvaluationWeights::default(),
            grade_cutoffs: GradeCutoffs::default(),
            quotation_score_weights: QuotationScoreWeights::default(),
            numbering: NumberingConfig::default(),
            rfq_closing_days: default_rfq_closing_days(),
            rfq_validity_days: default_rfq_validity_days(),
            quotation_validity_days: default_quotation_validity_days(),
            evaluation_frequency_months: default_evaluation_frequency_months(),
        }
    }
}

fn default_rfq_closing_days() -> i64 {
    14
}
fn default_rfq_validity_days() -> i64 {
    30
}
fn default_quotation_validity_days() -> i64 {
    30
}
fn default_evaluation_frequency_months() -> u32 {
    12
}

impl EngineConfig {
    /// Loads configuration from `config/engine.toml` (optional) layered with
    /// `PROCUREMENT__`-prefixed environment variables. Missing sources fall
    /// back to the defaults above.
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(&format!("{}/engine", CONFIG_DIR)).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_weights() {
        let config = EngineConfig::default();
        let w = &config.evaluation_weights;
        assert_eq!(
            w.quality + w.delivery + w.price + w.service + w.communication,
            dec!(1.00)
        );
        assert_eq!(config.grade_cutoffs.a, dec!(4.5));
        assert_eq!(config.quotation_score_weights.technical, dec!(0.6));
        assert_eq!(config.numbering.purchase_order_prefix, "PO");
        assert_eq!(config.evaluation_frequency_months, 12);
    }

    #[test]
    fn tax_modes_default_to_document_level() {
        let config = EngineConfig::default();
        assert_eq!(config.quotation_tax_mode, TaxMode::DocumentLevel);
        assert_eq!(config.purchase_order_tax_mode, TaxMode::DocumentLevel);
    }
}
