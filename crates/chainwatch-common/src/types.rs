use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Risk classification returned by the extraction model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskType {
    Geopolitical,
    NaturalDisaster,
    Financial,
    Regulatory,
    Operational,
    Cybersecurity,
    Esg,
    SupplyDisruption,
    PriceVolatility,
}

impl RiskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Geopolitical => "geopolitical",
            Self::NaturalDisaster => "natural_disaster",
            Self::Financial => "financial",
            Self::Regulatory => "regulatory",
            Self::Operational => "operational",
            Self::Cybersecurity => "cybersecurity",
            Self::Esg => "esg",
            Self::SupplyDisruption => "supply_disruption",
            Self::PriceVolatility => "price_volatility",
        }
    }

    /// Title-cased form used in alert titles, e.g. "Natural Disaster".
    pub fn title(&self) -> String {
        self.as_str()
            .split('_')
            .map(|w| {
                let mut chars = w.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl std::fmt::Display for RiskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RiskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "geopolitical" => Ok(Self::Geopolitical),
            "natural_disaster" => Ok(Self::NaturalDisaster),
            "financial" => Ok(Self::Financial),
            "regulatory" => Ok(Self::Regulatory),
            "operational" => Ok(Self::Operational),
            "cybersecurity" => Ok(Self::Cybersecurity),
            "esg" => Ok(Self::Esg),
            "supply_disruption" => Ok(Self::SupplyDisruption),
            "price_volatility" => Ok(Self::PriceVolatility),
            _ => Err(format!("unknown risk type: {s}")),
        }
    }
}

/// Severity assigned by extraction, and the band derived from the composite
/// score. Ordered so that `Critical > High > Medium > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            _ => Err(format!("unknown severity: {s}")),
        }
    }
}

/// Confirmation status of an extracted risk. The extraction model
/// historically answered `"true"`/`"false"` here, so those spellings are
/// accepted as aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confirmation {
    #[serde(alias = "true")]
    Confirmed,
    #[serde(alias = "false")]
    Unconfirmed,
    Uncertain,
}

impl std::fmt::Display for Confirmation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Confirmation::Confirmed => write!(f, "confirmed"),
            Confirmation::Unconfirmed => write!(f, "unconfirmed"),
            Confirmation::Uncertain => write!(f, "uncertain"),
        }
    }
}

impl std::str::FromStr for Confirmation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "confirmed" | "true" => Ok(Confirmation::Confirmed),
            "unconfirmed" | "false" => Ok(Confirmation::Unconfirmed),
            "uncertain" => Ok(Confirmation::Uncertain),
            _ => Err(format!("unknown confirmation: {s}")),
        }
    }
}

/// Expected time until a risk materializes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeHorizon {
    Immediate,
    Days,
    Weeks,
    Months,
}

impl std::fmt::Display for TimeHorizon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeHorizon::Immediate => write!(f, "immediate"),
            TimeHorizon::Days => write!(f, "days"),
            TimeHorizon::Weeks => write!(f, "weeks"),
            TimeHorizon::Months => write!(f, "months"),
        }
    }
}

impl std::str::FromStr for TimeHorizon {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "immediate" => Ok(TimeHorizon::Immediate),
            "days" => Ok(TimeHorizon::Days),
            "weeks" => Ok(TimeHorizon::Weeks),
            "months" => Ok(TimeHorizon::Months),
            _ => Err(format!("unknown time horizon: {s}")),
        }
    }
}

/// Operational status of a supplier relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupplierStatus {
    Active,
    PreQualified,
    Alternate,
    Inactive,
}

impl SupplierStatus {
    /// Statuses that make a supplier usable as an alternate source.
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Active | Self::PreQualified | Self::Alternate)
    }
}

impl std::fmt::Display for SupplierStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SupplierStatus::Active => write!(f, "active"),
            SupplierStatus::PreQualified => write!(f, "pre_qualified"),
            SupplierStatus::Alternate => write!(f, "alternate"),
            SupplierStatus::Inactive => write!(f, "inactive"),
        }
    }
}

impl std::str::FromStr for SupplierStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(SupplierStatus::Active),
            "pre_qualified" => Ok(SupplierStatus::PreQualified),
            "alternate" => Ok(SupplierStatus::Alternate),
            "inactive" => Ok(SupplierStatus::Inactive),
            _ => Err(format!("unknown supplier status: {s}")),
        }
    }
}

/// A normalized external event, the canonical shape published to the
/// `normalized_events` stream. `event_id` is the dedup fingerprint and the
/// article store primary key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedEvent {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub headline: String,
    pub body: String,
    pub url: String,
}

/// Breakdown of the deterministic composite score.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RiskScoreComponents {
    pub probability: f64,
    pub impact: f64,
    pub urgency: f64,
    pub mitigation: f64,
}

/// Upstream (tier-2+) supplier descriptor carried on a supplier record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamSupplier {
    pub name: String,
    pub country: String,
    pub supply_volume_pct: f64,
}

/// A person notified about alerts, carried on the company profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertContact {
    pub name: String,
    pub email: String,
    pub role: String,
}

/// Per-factor breakdown of an alternate-supplier ranking score. Each factor
/// is normalized to `[0, 1]` before weighting.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub geographic_diversity: f64,
    pub capacity: f64,
    pub relationship: f64,
    pub esg: f64,
    pub financial: f64,
    pub switching_cost: f64,
    pub lead_time: f64,
}

/// A ranked alternate-supplier recommendation attached to an alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlternateRecommendation {
    pub supplier_id: String,
    pub name: String,
    pub country: String,
    pub score: f64,
    pub lead_time_weeks: i32,
    pub approved_vendor: bool,
    pub breakdown: ScoreBreakdown,
}
