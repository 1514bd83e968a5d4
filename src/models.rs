use std::fmt;

use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize, Serializer};

/// One activity row as supplied by the loader. The engine only reads it.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityRecord {
    pub agent_id: i64,
    pub agent_name: String,
    /// `None` when the source timestamp could not be parsed; such rows are
    /// dropped before monthly grouping.
    pub created: Option<NaiveDateTime>,
    pub player_id: String,
    pub ngr: f64,
    pub commission: f64,
    pub deposit_count: f64,
    pub withdrawal_count: f64,
    pub deposit_total: f64,
    pub withdrawal_total: f64,
    pub casino_ggr: f64,
    pub sportsbook_ggr: f64,
}

/// Calendar month key, ordered chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn of(timestamp: &NaiveDateTime) -> Self {
        Self::new(timestamp.year(), timestamp.month())
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyAggregate {
    pub month: MonthKey,
    pub ngr: f64,
    pub commission: f64,
    pub deposit_count: f64,
    pub withdrawal_count: f64,
    pub deposit_total: f64,
    pub withdrawal_total: f64,
    pub casino_ggr: f64,
    pub sportsbook_ggr: f64,
    pub active_players: usize,
}

impl MonthlyAggregate {
    pub fn empty(month: MonthKey) -> Self {
        Self {
            month,
            ngr: 0.0,
            commission: 0.0,
            deposit_count: 0.0,
            withdrawal_count: 0.0,
            deposit_total: 0.0,
            withdrawal_total: 0.0,
            casino_ggr: 0.0,
            sportsbook_ggr: 0.0,
            active_players: 0,
        }
    }

    pub fn total_ggr(&self) -> f64 {
        self.casino_ggr + self.sportsbook_ggr
    }
}

/// The eleven scored dimensions. Serialized keys are consumed downstream
/// and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Metric {
    #[serde(rename = "rentabilidad")]
    Profitability,
    #[serde(rename = "volumen")]
    Volume,
    #[serde(rename = "fidelidad")]
    Loyalty,
    #[serde(rename = "estabilidad")]
    Stability,
    #[serde(rename = "crecimiento")]
    Growth,
    #[serde(rename = "eficiencia_casino")]
    CasinoEfficiency,
    #[serde(rename = "eficiencia_deportes")]
    SportsbookEfficiency,
    #[serde(rename = "eficiencia_conversion")]
    Conversion,
    #[serde(rename = "tendencia")]
    Trend,
    #[serde(rename = "diversificacion")]
    Diversification,
    #[serde(rename = "calidad_jugadores")]
    PlayerQuality,
}

impl Metric {
    pub const ALL: [Metric; 11] = [
        Metric::Profitability,
        Metric::Volume,
        Metric::Loyalty,
        Metric::Stability,
        Metric::Growth,
        Metric::CasinoEfficiency,
        Metric::SportsbookEfficiency,
        Metric::Conversion,
        Metric::Trend,
        Metric::Diversification,
        Metric::PlayerQuality,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Metric::Profitability => "rentabilidad",
            Metric::Volume => "volumen",
            Metric::Loyalty => "fidelidad",
            Metric::Stability => "estabilidad",
            Metric::Growth => "crecimiento",
            Metric::CasinoEfficiency => "eficiencia_casino",
            Metric::SportsbookEfficiency => "eficiencia_deportes",
            Metric::Conversion => "eficiencia_conversion",
            Metric::Trend => "tendencia",
            Metric::Diversification => "diversificacion",
            Metric::PlayerQuality => "calidad_jugadores",
        }
    }
}

/// A full set of metric scores, either lifetime or for a single month.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MetricScores {
    #[serde(rename = "rentabilidad")]
    pub profitability: f64,
    #[serde(rename = "volumen")]
    pub volume: f64,
    #[serde(rename = "fidelidad")]
    pub loyalty: f64,
    #[serde(rename = "estabilidad")]
    pub stability: f64,
    #[serde(rename = "crecimiento")]
    pub growth: f64,
    #[serde(rename = "eficiencia_casino")]
    pub casino_efficiency: f64,
    #[serde(rename = "eficiencia_deportes")]
    pub sportsbook_efficiency: f64,
    #[serde(rename = "eficiencia_conversion")]
    pub conversion: f64,
    #[serde(rename = "tendencia")]
    pub trend: f64,
    #[serde(rename = "diversificacion")]
    pub diversification: f64,
    #[serde(rename = "calidad_jugadores")]
    pub player_quality: f64,
}

impl MetricScores {
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Profitability => self.profitability,
            Metric::Volume => self.volume,
            Metric::Loyalty => self.loyalty,
            Metric::Stability => self.stability,
            Metric::Growth => self.growth,
            Metric::CasinoEfficiency => self.casino_efficiency,
            Metric::SportsbookEfficiency => self.sportsbook_efficiency,
            Metric::Conversion => self.conversion,
            Metric::Trend => self.trend,
            Metric::Diversification => self.diversification,
            Metric::PlayerQuality => self.player_quality,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Metric, f64)> + '_ {
        Metric::ALL.into_iter().map(move |metric| (metric, self.get(metric)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "A+++")]
    APlusPlusPlus,
    #[serde(rename = "A++")]
    APlusPlus,
    #[serde(rename = "A+")]
    APlus,
    #[serde(rename = "B+++")]
    BPlusPlusPlus,
    #[serde(rename = "B++")]
    BPlusPlus,
    #[serde(rename = "B+")]
    BPlus,
    #[serde(rename = "C+++")]
    CPlusPlusPlus,
    #[serde(rename = "C++")]
    CPlusPlus,
    #[serde(rename = "C+")]
    CPlus,
    #[serde(rename = "C")]
    C,
}

impl Category {
    /// Best first.
    pub const ORDERED: [Category; 10] = [
        Category::APlusPlusPlus,
        Category::APlusPlus,
        Category::APlus,
        Category::BPlusPlusPlus,
        Category::BPlusPlus,
        Category::BPlus,
        Category::CPlusPlusPlus,
        Category::CPlusPlus,
        Category::CPlus,
        Category::C,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::APlusPlusPlus => "A+++",
            Category::APlusPlus => "A++",
            Category::APlus => "A+",
            Category::BPlusPlusPlus => "B+++",
            Category::BPlusPlus => "B++",
            Category::BPlus => "B+",
            Category::CPlusPlusPlus => "C+++",
            Category::CPlusPlus => "C++",
            Category::CPlus => "C+",
            Category::C => "C",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Category::APlusPlusPlus => "Excelencia excepcional",
            Category::APlusPlus => "Excelencia alta",
            Category::APlus => "Excelencia",
            Category::BPlusPlusPlus => "Consolidado superior",
            Category::BPlusPlus => "Consolidado alto",
            Category::BPlus => "Consolidado",
            Category::CPlusPlusPlus => "En desarrollo avanzado",
            Category::CPlusPlus => "En desarrollo medio",
            Category::CPlus => "Principiante",
            Category::C => "Critico",
        }
    }

    /// Safe when the leading letter is A or B.
    pub fn is_safe(self) -> bool {
        matches!(self.label().chars().next(), Some('A') | Some('B'))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyScoreRow {
    #[serde(flatten)]
    pub aggregate: MonthlyAggregate,
    pub metrics: MetricScores,
    pub score: f64,
    pub category: Category,
    pub risk_safe: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreditRecommendation {
    pub amount: f64,
    pub details: Option<CreditDetails>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreditDetails {
    pub qualifying_months: usize,
    pub p25: f64,
    pub median: f64,
    pub f_score: f64,
    pub f_volatility: f64,
    pub volatility_band: &'static str,
    pub f_trend: f64,
    pub trend_band: &'static str,
    pub f_turnover: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentProfile {
    pub agent_id: i64,
    pub agent_name: String,
    pub rank: usize,
    pub metrics: MetricScores,
    pub score: f64,
    pub category: Category,
    pub risk_safe: bool,
    pub credit: CreditRecommendation,
    pub forecast_ggr: f64,
    pub history: Vec<MonthlyScoreRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetentionRow {
    pub agent_id: i64,
    pub previous_month: MonthKey,
    pub month: MonthKey,
    pub previous_players: usize,
    pub retained_players: usize,
    pub retention_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthRow {
    pub agent_id: i64,
    pub month: MonthKey,
    pub total_players: usize,
    pub new_players: usize,
    pub returning_players: usize,
    pub pct_new: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentFailure {
    pub agent_id: Option<i64>,
    pub reason: String,
}
