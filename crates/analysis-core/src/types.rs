use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Wire sentinel for a signal that could not be produced.
pub const NOT_AVAILABLE: &str = "not available";

/// Neutral default substituted for any zero-confidence term in the
/// composite formulas.
pub const NEUTRAL_SCORE: u8 = 50;

/// Label derivable from its 0-100 numeric score.
///
/// For most signals higher means "better" (more positive tone, cleaner
/// ethics); for `RiskLevel` the score is a severity, so higher means riskier.
pub trait FromScore {
    fn from_score(score: u8) -> Self;
}

/// Document tone classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Positive,
    Neutral,
    Negative,
}

impl FromScore for Tone {
    fn from_score(score: u8) -> Self {
        match score {
            s if s >= 60 => Tone::Positive,
            s if s >= 40 => Tone::Neutral,
            _ => Tone::Negative,
        }
    }
}

/// Governance integrity classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EthicalFlag {
    Clean,
    Questionable,
    Concerning,
}

impl FromScore for EthicalFlag {
    fn from_score(score: u8) -> Self {
        match score {
            s if s >= 80 => EthicalFlag::Clean,
            s if s >= 60 => EthicalFlag::Questionable,
            _ => EthicalFlag::Concerning,
        }
    }
}

impl EthicalFlag {
    pub fn to_label(&self) -> &'static str {
        match self {
            EthicalFlag::Clean => "clean",
            EthicalFlag::Questionable => "questionable",
            EthicalFlag::Concerning => "concerning",
        }
    }
}

/// Financial/reputational exposure classification.
/// The backing score is a severity: higher = riskier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl FromScore for RiskLevel {
    fn from_score(severity: u8) -> Self {
        match severity {
            s if s <= 40 => RiskLevel::Low,
            s if s <= 70 => RiskLevel::Moderate,
            _ => RiskLevel::High,
        }
    }
}

impl RiskLevel {
    pub fn to_label(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Moderate => "moderate",
            RiskLevel::High => "high",
        }
    }
}

/// Reliability assessment of the analyzed inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceAuthenticity {
    Authentic,
    Unverified,
    Rumour,
}

impl FromScore for SourceAuthenticity {
    fn from_score(score: u8) -> Self {
        match score {
            s if s >= 75 => SourceAuthenticity::Authentic,
            s if s >= 40 => SourceAuthenticity::Unverified,
            _ => SourceAuthenticity::Rumour,
        }
    }
}

/// Operational cash-flow sufficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CashFlowAssessment {
    Positive,
    Negative,
    #[serde(rename = "insufficient-data")]
    InsufficientData,
}

/// Gross-margin trajectory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarginEffect {
    Expanding,
    Contracting,
    Stable,
}

impl FromScore for MarginEffect {
    fn from_score(score: u8) -> Self {
        match score {
            s if s >= 60 => MarginEffect::Expanding,
            s if s <= 40 => MarginEffect::Contracting,
            _ => MarginEffect::Stable,
        }
    }
}

/// Forward-looking outlook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outlook {
    Improving,
    Stable,
    Deteriorating,
}

/// Macro business-cycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CyclePhase {
    Bullish,
    Bearish,
}

/// Composite Integrity Index classification band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegrityBand {
    Strong,
    Moderate,
    Weak,
    Critical,
}

impl IntegrityBand {
    /// Boundary values belong to the higher band: a CII of exactly 75
    /// classifies as Strong.
    pub fn from_cii(cii: u8) -> Self {
        match cii {
            c if c >= 75 => IntegrityBand::Strong,
            c if c >= 50 => IntegrityBand::Moderate,
            c if c >= 25 => IntegrityBand::Weak,
            _ => IntegrityBand::Critical,
        }
    }

    pub fn to_label(&self) -> &'static str {
        match self {
            IntegrityBand::Strong => "Strong",
            IntegrityBand::Moderate => "Moderate",
            IntegrityBand::Weak => "Weak",
            IntegrityBand::Critical => "Critical",
        }
    }
}

/// Quarter-to-quarter integrity movement class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendClass {
    Improving,
    Stable,
    Declining,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Flat,
    Down,
}

/// Human feedback category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackType {
    Accuracy,
    Bias,
    Other,
}

/// A signal value that may be unavailable.
///
/// Serializes as the inner value, or as the literal string "not available"
/// when the signal could not be produced; downstream consumers key on that
/// exact spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Judgment<T> {
    Known(T),
    #[default]
    NotAvailable,
}

impl<T> Judgment<T> {
    pub fn is_known(&self) -> bool {
        matches!(self, Judgment::Known(_))
    }

    pub fn known(&self) -> Option<&T> {
        match self {
            Judgment::Known(v) => Some(v),
            Judgment::NotAvailable => None,
        }
    }
}

impl<T: Serialize> Serialize for Judgment<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Judgment::Known(v) => v.serialize(serializer),
            Judgment::NotAvailable => serializer.serialize_str(NOT_AVAILABLE),
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Judgment<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        if value.as_str() == Some(NOT_AVAILABLE) {
            return Ok(Judgment::NotAvailable);
        }
        T::deserialize(value)
            .map(Judgment::Known)
            .map_err(serde::de::Error::custom)
    }
}

/// A qualitative signal with its 0-100 numeric score and confidence.
///
/// Invariant: `confidence == 0` exactly when the value is unavailable. An
/// unavailable signal carries [`NEUTRAL_SCORE`] so the composite formulas
/// read one code path regardless of availability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub struct GradedSignal<T> {
    pub value: Judgment<T>,
    pub score: u8,
    pub confidence: u8,
}

impl<T> GradedSignal<T> {
    pub fn known(value: T, score: u8, confidence: u8) -> Self {
        if confidence == 0 {
            return Self::not_available();
        }
        Self {
            value: Judgment::Known(value),
            score: score.min(100),
            confidence: confidence.min(100),
        }
    }

    pub fn not_available() -> Self {
        Self {
            value: Judgment::NotAvailable,
            score: NEUTRAL_SCORE,
            confidence: 0,
        }
    }

    pub fn is_available(&self) -> bool {
        self.value.is_known()
    }

    /// Force the availability invariant. Returns true when the signal was
    /// modified. Applying this twice never changes the signal a second time.
    pub fn normalize(&mut self) -> bool {
        if self.confidence == 0 || !self.value.is_known() {
            let changed = self.value.is_known()
                || self.confidence != 0
                || self.score != NEUTRAL_SCORE;
            *self = Self::not_available();
            return changed;
        }
        let mut changed = false;
        if self.confidence > 100 {
            self.confidence = 100;
            changed = true;
        }
        if self.score > 100 {
            self.score = 100;
            changed = true;
        }
        changed
    }
}

impl<T> Default for GradedSignal<T> {
    fn default() -> Self {
        Self::not_available()
    }
}

/// Feature flags controlling the optional pipeline tasks
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AnalysisFlags {
    #[serde(default)]
    pub include_news: bool,
    #[serde(default)]
    pub include_feedback: bool,
    #[serde(default)]
    pub include_conclusion: bool,
}

/// Structured financial inputs. Absent fields stay absent; they must never
/// default to zero, or the derived ratios would be silently wrong.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinancialInputs {
    pub total_debt: Option<f64>,
    pub total_equity: Option<f64>,
    pub current_assets: Option<f64>,
    pub current_liabilities: Option<f64>,
    /// Ordered close prices, oldest first.
    #[serde(default)]
    pub stock_prices: Vec<f64>,
    /// Revenue per period, oldest first, aligned with `cost_history`.
    #[serde(default)]
    pub revenue_history: Vec<f64>,
    #[serde(default)]
    pub cost_history: Vec<f64>,
}

impl FinancialInputs {
    pub fn is_empty(&self) -> bool {
        self.total_debt.is_none()
            && self.total_equity.is_none()
            && self.current_assets.is_none()
            && self.current_liabilities.is_none()
            && self.stock_prices.is_empty()
            && self.revenue_history.is_empty()
            && self.cost_history.is_empty()
    }
}

/// Immutable input to one analysis run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub company: String,
    #[serde(default)]
    pub exchange: Option<String>,
    /// Free-text document content (report body, filing extract, ...).
    pub document: String,
    #[serde(default)]
    pub financials: Option<FinancialInputs>,
    /// Reporting year used for the business-cycle lookup. Falls back to the
    /// current UTC year when absent.
    #[serde(default)]
    pub effective_year: Option<i32>,
    #[serde(default)]
    pub flags: AnalysisFlags,
}

/// News article summary from the news collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub summary: String,
    pub published_at: DateTime<Utc>,
}

/// RSI/MA snapshot with per-indicator data-sufficiency flags
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnicalContext {
    pub rsi_14: Option<f64>,
    pub ma_200: Option<f64>,
    pub rsi_sufficient: bool,
    pub ma_sufficient: bool,
    pub last_price: Option<f64>,
    /// Proximity-to-neutral score feeding the CII technical term.
    pub score: u8,
    pub confidence: u8,
}

impl Default for TechnicalContext {
    fn default() -> Self {
        Self {
            rsi_14: None,
            ma_200: None,
            rsi_sufficient: false,
            ma_sufficient: false,
            last_price: None,
            score: NEUTRAL_SCORE,
            confidence: 0,
        }
    }
}

/// Macro business-cycle context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleContext {
    pub phase: CyclePhase,
    /// True when the matched band is the forward-projected one.
    pub projected: bool,
    pub band_start: i32,
    pub band_end: i32,
    /// Cycle Alignment Score.
    pub alignment_score: u8,
    pub confidence: u8,
}

/// Operational metrics derived from the financial inputs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperationalContext {
    pub cash_flow: GradedSignal<CashFlowAssessment>,
    pub gross_margin: GradedSignal<MarginEffect>,
    pub debt_to_equity: Option<f64>,
    pub current_ratio: Option<f64>,
}

/// Composite Integrity Index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityIndex {
    pub cii: u8,
    pub band: IntegrityBand,
    pub interpretation: String,
}

/// Temporal Integrity Trend versus the previous period. Absent entirely when
/// no previous record exists. A zero here always means "no change", never
/// "no baseline".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityTrend {
    pub previous_analysis_id: Uuid,
    pub previous_cii: u8,
    pub tit: i16,
    pub class: TrendClass,
    pub direction: TrendDirection,
}

/// Future Performance Perspective
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwardOutlook {
    pub outlook: Outlook,
    pub forward_risk: RiskLevel,
    pub confidence: u8,
    pub drivers: Vec<String>,
    pub interpretation: String,
}

/// Reliability metrics from the model-versus-reference comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HallucinationMetrics {
    /// Signed mean difference (model minus reference), 0-100 point scale.
    pub bias: f64,
    pub variance: f64,
    /// 0-100, higher = model output agrees with independent calculation.
    pub score: u8,
    pub confidence: u8,
    pub compared_pairs: usize,
    pub distribution_shape: String,
    pub interpretation: String,
}

/// Summary of the capped confidence nudge applied from human feedback
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackAdjustment {
    /// Analysis the aggregated feedback was submitted against.
    pub source_analysis_id: Uuid,
    pub entries: usize,
    pub accuracy_mean: f64,
    pub confidence_shift: i16,
}

/// The central record threaded through the four pipeline stages.
///
/// The orchestrator owns it for the lifetime of one request; each stage
/// receives it by value and returns the enriched version. Once the Judge
/// completes, the record is frozen and handed to the sinks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub analysis_id: Uuid,
    pub company: String,
    pub exchange: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub latency_ms: u64,

    pub tone: GradedSignal<Tone>,
    pub ethical_flag: GradedSignal<EthicalFlag>,
    pub risk_level: GradedSignal<RiskLevel>,
    pub source_authenticity: GradedSignal<SourceAuthenticity>,
    pub summary: String,

    pub technical: TechnicalContext,
    pub cycle: Option<CycleContext>,
    pub operational: OperationalContext,

    pub integrity: Option<IntegrityIndex>,
    pub trend: Option<IntegrityTrend>,
    pub outlook: Option<ForwardOutlook>,
    pub hallucination: Option<HallucinationMetrics>,
    pub feedback: Option<FeedbackAdjustment>,

    pub news_articles_used: usize,
    pub news_fetch_failed: bool,
    pub conclusion: String,
}

impl AnalysisRecord {
    /// Fresh record for a request. The analysis id is generated here, once,
    /// and never changes; it is the join key for feedback and storage.
    pub fn new(request: &AnalysisRequest) -> Self {
        Self {
            analysis_id: Uuid::new_v4(),
            company: request.company.clone(),
            exchange: request.exchange.clone(),
            timestamp: Utc::now(),
            latency_ms: 0,
            tone: GradedSignal::not_available(),
            ethical_flag: GradedSignal::not_available(),
            risk_level: GradedSignal::not_available(),
            source_authenticity: GradedSignal::not_available(),
            summary: String::new(),
            technical: TechnicalContext::default(),
            cycle: None,
            operational: OperationalContext::default(),
            integrity: None,
            trend: None,
            outlook: None,
            hallucination: None,
            feedback: None,
            news_articles_used: 0,
            news_fetch_failed: false,
            conclusion: String::new(),
        }
    }
}

/// One human feedback entry, keyed externally by analysis id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub feedback_type: FeedbackType,
    pub score: u8,
    pub notes: String,
    pub submitted_by: String,
    pub submitted_at: DateTime<Utc>,
}

/// Per-type aggregate over feedback entries, computed on read
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FeedbackAggregate {
    pub count: usize,
    pub mean_score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graded_signal_zero_confidence_is_not_available() {
        let signal: GradedSignal<Tone> = GradedSignal::known(Tone::Positive, 80, 0);
        assert!(!signal.is_available());
        assert_eq!(signal.score, NEUTRAL_SCORE);
        assert_eq!(signal.confidence, 0);
    }

    #[test]
    fn graded_signal_normalize_is_idempotent() {
        let mut signal = GradedSignal {
            value: Judgment::Known(Tone::Negative),
            score: 30,
            confidence: 0,
        };
        assert!(signal.normalize());
        let after_first = signal;
        assert!(!signal.normalize());
        assert_eq!(signal, after_first);
        assert_eq!(signal, GradedSignal::not_available());
    }

    #[test]
    fn graded_signal_clamps_out_of_range() {
        let mut signal = GradedSignal {
            value: Judgment::Known(Tone::Positive),
            score: 140,
            confidence: 130,
        };
        assert!(signal.normalize());
        assert_eq!(signal.score, 100);
        assert_eq!(signal.confidence, 100);
    }

    #[test]
    fn judgment_serializes_sentinel_string() {
        let known: Judgment<Tone> = Judgment::Known(Tone::Positive);
        assert_eq!(serde_json::to_value(known).unwrap(), serde_json::json!("positive"));

        let missing: Judgment<Tone> = Judgment::NotAvailable;
        assert_eq!(
            serde_json::to_value(missing).unwrap(),
            serde_json::json!(NOT_AVAILABLE)
        );

        let parsed: Judgment<Tone> = serde_json::from_str("\"not available\"").unwrap();
        assert_eq!(parsed, Judgment::NotAvailable);
        let parsed: Judgment<Tone> = serde_json::from_str("\"negative\"").unwrap();
        assert_eq!(parsed, Judgment::Known(Tone::Negative));
    }

    #[test]
    fn integrity_band_boundaries_belong_to_higher_band() {
        assert_eq!(IntegrityBand::from_cii(75), IntegrityBand::Strong);
        assert_eq!(IntegrityBand::from_cii(74), IntegrityBand::Moderate);
        assert_eq!(IntegrityBand::from_cii(50), IntegrityBand::Moderate);
        assert_eq!(IntegrityBand::from_cii(49), IntegrityBand::Weak);
        assert_eq!(IntegrityBand::from_cii(25), IntegrityBand::Weak);
        assert_eq!(IntegrityBand::from_cii(24), IntegrityBand::Critical);
        assert_eq!(IntegrityBand::from_cii(0), IntegrityBand::Critical);
        assert_eq!(IntegrityBand::from_cii(100), IntegrityBand::Strong);
    }

    #[test]
    fn enum_wire_spellings_are_stable() {
        assert_eq!(serde_json::to_value(Tone::Positive).unwrap(), "positive");
        assert_eq!(serde_json::to_value(EthicalFlag::Concerning).unwrap(), "concerning");
        assert_eq!(serde_json::to_value(RiskLevel::Moderate).unwrap(), "moderate");
        assert_eq!(serde_json::to_value(SourceAuthenticity::Rumour).unwrap(), "rumour");
        assert_eq!(
            serde_json::to_value(CashFlowAssessment::InsufficientData).unwrap(),
            "insufficient-data"
        );
        assert_eq!(serde_json::to_value(MarginEffect::Expanding).unwrap(), "expanding");
        assert_eq!(serde_json::to_value(Outlook::Deteriorating).unwrap(), "deteriorating");
        assert_eq!(serde_json::to_value(IntegrityBand::Strong).unwrap(), "Strong");
        assert_eq!(serde_json::to_value(TrendClass::Improving).unwrap(), "Improving");
        assert_eq!(serde_json::to_value(TrendDirection::Flat).unwrap(), "flat");
    }

    #[test]
    fn risk_level_from_severity() {
        assert_eq!(RiskLevel::from_score(40), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(41), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_score(70), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_score(71), RiskLevel::High);
    }
}
