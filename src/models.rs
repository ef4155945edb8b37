use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Study {
    pub id: String,
    pub name: String,
    pub effect_size: f64,
    pub effect_size_type: EffectSizeType,
    pub standard_error: f64,
    pub sample_size_treatment: Option<usize>,
    pub sample_size_control: Option<usize>,
    pub mean_treatment: Option<f64>,
    pub sd_treatment: Option<f64>,
    pub mean_control: Option<f64>,
    pub sd_control: Option<f64>,
    pub events_treatment: Option<usize>,
    pub events_control: Option<usize>,
    pub subgroup: Option<String>,
}

impl Study {
    /// Within-study sampling variance (squared standard error)
    pub fn variance(&self) -> f64 {
        self.standard_error * self.standard_error
    }

    pub fn total_sample_size(&self) -> Option<usize> {
        match (self.sample_size_treatment, self.sample_size_control) {
            (Some(nt), Some(nc)) => Some(nt + nc),
            (Some(nt), None) => Some(nt),
            (None, Some(nc)) => Some(nc),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectSizeType {
    #[serde(rename = "smd")]
    Smd,
    #[serde(rename = "or")]
    OddsRatio,
    #[serde(rename = "rr")]
    RiskRatio,
    #[serde(rename = "md")]
    MeanDifference,
    #[serde(rename = "hr")]
    HazardRatio,
    #[serde(rename = "correlation")]
    Correlation,
}

impl EffectSizeType {
    pub fn label(&self) -> &'static str {
        match self {
            EffectSizeType::Smd => "Standardized Mean Difference",
            EffectSizeType::OddsRatio => "Odds Ratio (log scale)",
            EffectSizeType::RiskRatio => "Risk Ratio (log scale)",
            EffectSizeType::MeanDifference => "Mean Difference",
            EffectSizeType::HazardRatio => "Hazard Ratio (log scale)",
            EffectSizeType::Correlation => "Correlation (Fisher z)",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PooledResult {
    pub pooled_effect: f64,
    pub pooled_se: f64,
    pub lower_ci: f64,
    pub upper_ci: f64,
    pub z_value: f64,
    pub p_value: f64,
    pub i_squared: f64,
    pub q_statistic: f64,
    pub q_p_value: f64,
    pub tau_squared: f64,
    pub per_study: Vec<StudyWeight>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyWeight {
    pub name: String,
    pub effect_size: f64,
    pub lower_ci: f64,
    pub upper_ci: f64,
    pub weight_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EggersTest {
    pub intercept: f64,
    pub standard_error: f64,
    pub t_value: f64,
    pub p_value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveOneOutResult {
    pub omitted_study: String,
    pub result: PooledResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubgroupResults {
    pub label: String,
    pub n_studies: usize,
    pub pooled: PooledResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaAnalysisReport {
    pub n_studies: usize,
    pub pooled: PooledResult,
    pub leave_one_out: Vec<LeaveOneOutResult>,
    pub subgroups: HashMap<String, SubgroupResults>,
    pub eggers: Option<EggersTest>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub confidence_level: f64,
    pub min_subgroup_size: usize,
    pub perform_leave_one_out: bool,
    pub perform_eggers: bool,
    pub output_path: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            confidence_level: 0.95,
            min_subgroup_size: 2,
            perform_leave_one_out: true,
            perform_eggers: true,
            output_path: "./meta_results".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StudyDesign {
    #[serde(rename = "two_means")]
    TwoMeans,
    #[serde(rename = "two_proportions")]
    TwoProportions,
    #[serde(rename = "correlation")]
    Correlation,
    #[serde(rename = "one_sample_mean")]
    OneSampleMean,
    #[serde(rename = "paired")]
    Paired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tails {
    One,
    Two,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SampleSizeRequest {
    pub study_type: StudyDesign,
    pub effect_size: f64,
    pub power: f64,
    pub alpha: f64,
    pub ratio: f64,
    pub tails: Tails,
}

impl SampleSizeRequest {
    pub fn new(study_type: StudyDesign, effect_size: f64, power: f64, alpha: f64) -> Self {
        Self {
            study_type,
            effect_size,
            power,
            alpha,
            ratio: 1.0,
            tails: Tails::Two,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleSizeEstimate {
    pub total: u64,
    pub group_sizes: Option<(u64, u64)>,
}

// --- Clinical score inputs and results ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NntResult {
    pub nnt: f64,
    pub arr: f64,
    pub rrr: f64,
    pub ci95: Option<(f64, f64)>,
    pub interpretation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    #[serde(rename = "male")]
    Male,
    #[serde(rename = "female")]
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CkdStage {
    G1,
    G2,
    G3a,
    G3b,
    G4,
    G5,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EgfrResult {
    pub egfr: f64,
    pub ckd_stage: CkdStage,
    pub interpretation: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Curb65Input {
    pub confusion: bool,
    pub urea_mmol_per_l: f64,
    pub respiratory_rate: u32,
    pub systolic_bp: f64,
    pub diastolic_bp: f64,
    pub age: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Curb65Result {
    pub score: u8,
    pub risk_category: String,
    pub recommendation: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WellsDvtInput {
    pub active_cancer: bool,
    pub paralysis_or_immobilization: bool,
    pub bedridden_or_major_surgery: bool,
    pub localized_tenderness: bool,
    pub entire_leg_swollen: bool,
    pub calf_swelling_over_3cm: bool,
    pub pitting_edema: bool,
    pub collateral_superficial_veins: bool,
    pub previous_dvt: bool,
    pub alternative_diagnosis_likely: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WellsDvtResult {
    pub score: i8,
    pub risk_category: String,
    pub recommendation: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChadsVascInput {
    pub congestive_heart_failure: bool,
    pub hypertension: bool,
    pub age: u32,
    pub diabetes: bool,
    pub stroke_or_tia: bool,
    pub vascular_disease: bool,
    pub female: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChadsVascResult {
    pub score: u8,
    pub annual_stroke_risk_percent: f64,
    pub risk_category: String,
    pub recommendation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApachePhysiology {
    pub temperature_celsius: f64,
    pub mean_arterial_pressure: f64,
    pub heart_rate: f64,
    pub respiratory_rate: f64,
    pub fio2: f64,
    pub pao2: f64,
    pub aa_gradient: Option<f64>,
    pub arterial_ph: f64,
    pub sodium: f64,
    pub potassium: f64,
    pub creatinine_mg_per_dl: f64,
    pub acute_renal_failure: bool,
    pub hematocrit: f64,
    pub white_blood_count: f64,
    pub glasgow_coma_scale: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApacheResult {
    pub score: u8,
    pub interpretation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProportionCi {
    pub proportion: f64,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticTestResult {
    pub sensitivity: f64,
    pub specificity: f64,
    pub ppv: f64,
    pub npv: f64,
    pub plr: f64,
    pub nlr: f64,
    pub accuracy: f64,
    pub prevalence: f64,
}
