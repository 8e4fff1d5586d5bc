//! Reference configuration: code tables, keyword lists, thresholds, and the
//! tradeoff hazard-ratio model.
//!
//! Loaded once at process start and passed by reference into the matcher,
//! extractor, and tradeoff calculator. Load failure is the one fatal
//! condition in this crate: without code tables, concept matching cannot
//! proceed meaningfully. Missing sections fall back to full defaults so
//! tests can build synthetic tables from small JSON fragments; threshold
//! sections are all-or-nothing when present.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::TradeoffModel;
use crate::units::{Analyte, UnitTable};

/// Configuration errors. All are fatal to the owning process.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

const BUILTIN_CONFIG: &str = include_str!("../../config/cdss_config.json");
const BUILTIN_TRADEOFF_MODEL: &str = include_str!("../../config/arc-hbr-model.json");

// =========================================================================
// Laboratory extraction tables
// =========================================================================

/// LOINC code lists and free-text search terms per analyte, used by the
/// FHIR adapter to bucket observations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LabExtractionConfig {
    pub egfr_loinc_codes: Vec<String>,
    pub creatinine_loinc_codes: Vec<String>,
    pub hemoglobin_loinc_codes: Vec<String>,
    pub white_blood_cell_loinc_codes: Vec<String>,
    pub platelet_loinc_codes: Vec<String>,
    pub egfr_text_search: Vec<String>,
    pub creatinine_text_search: Vec<String>,
    pub hemoglobin_text_search: Vec<String>,
    pub wbc_text_search: Vec<String>,
    pub platelet_text_search: Vec<String>,
}

impl Default for LabExtractionConfig {
    fn default() -> Self {
        Self {
            egfr_loinc_codes: strings(&["33914-3", "50044-7", "48642-3", "62238-1"]),
            creatinine_loinc_codes: strings(&["2160-0", "38483-4"]),
            hemoglobin_loinc_codes: strings(&["718-7", "59260-0", "30313-1"]),
            white_blood_cell_loinc_codes: strings(&["6690-2", "26464-8"]),
            platelet_loinc_codes: strings(&["777-3", "26515-7"]),
            egfr_text_search: strings(&["egfr", "glomerular filtration"]),
            creatinine_text_search: strings(&["creatinine"]),
            hemoglobin_text_search: strings(&["hemoglobin", "hgb"]),
            wbc_text_search: strings(&["white blood cell", "wbc", "leukocyte"]),
            platelet_text_search: strings(&["platelet"]),
        }
    }
}

impl LabExtractionConfig {
    /// LOINC codes identifying observations of the given analyte.
    pub fn loinc_codes(&self, analyte: Analyte) -> &[String] {
        match analyte {
            Analyte::Egfr => &self.egfr_loinc_codes,
            Analyte::Creatinine => &self.creatinine_loinc_codes,
            Analyte::Hemoglobin => &self.hemoglobin_loinc_codes,
            Analyte::Wbc => &self.white_blood_cell_loinc_codes,
            Analyte::Platelets => &self.platelet_loinc_codes,
        }
    }

    /// Lowercase text-search fallback terms for the given analyte.
    pub fn text_terms(&self, analyte: Analyte) -> &[String] {
        match analyte {
            Analyte::Egfr => &self.egfr_text_search,
            Analyte::Creatinine => &self.creatinine_text_search,
            Analyte::Hemoglobin => &self.hemoglobin_text_search,
            Analyte::Wbc => &self.wbc_text_search,
            Analyte::Platelets => &self.platelet_text_search,
        }
    }
}

// =========================================================================
// Concept code tables
// =========================================================================

/// Codes and keywords identifying one clinical concept. Matching precedence
/// is SNOMED, then ICD-10 prefix, then lowercase keyword substring.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConceptSpec {
    pub snomed_codes: Vec<String>,
    pub icd10cm_codes: Vec<String>,
    pub keywords: Vec<String>,
}

/// Liver cirrhosis spec. The composite rule requires an independent match
/// from `portal_hypertension` as well.
///
/// When the section appears in configuration it must be complete — a
/// partial override would silently drop code lists, so it fails the load
/// instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CirrhosisSpec {
    pub snomed_codes: Vec<String>,
    pub icd10cm_codes: Vec<String>,
    pub keywords: Vec<String>,
    pub portal_hypertension: ConceptSpec,
}

impl Default for CirrhosisSpec {
    fn default() -> Self {
        Self {
            snomed_codes: strings(&["19943007"]),
            icd10cm_codes: strings(&["K70.3", "K71.7", "K74"]),
            keywords: strings(&["cirrhosis"]),
            portal_hypertension: ConceptSpec {
                snomed_codes: strings(&["34742003"]),
                icd10cm_codes: strings(&["K76.6", "I85", "R18", "K72"]),
                keywords: strings(&[
                    "ascites",
                    "portal hypertension",
                    "esophageal varices",
                    "hepatic encephalopathy",
                ]),
            },
        }
    }
}

/// Active malignancy spec. ICD-10 matching is bare-prefix (`C` covers the
/// whole malignant-neoplasm chapter); the exclusion lists drop non-melanoma
/// skin cancers even when otherwise matched. Complete section required
/// when present.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CancerSpec {
    pub snomed_codes: Vec<String>,
    pub exclude_snomed_codes: Vec<String>,
    pub icd10_prefixes: Vec<String>,
    pub keywords: Vec<String>,
    pub exclusion_keywords: Vec<String>,
}

impl Default for CancerSpec {
    fn default() -> Self {
        Self {
            snomed_codes: strings(&["363346000"]),
            exclude_snomed_codes: strings(&["254637007", "254632001"]),
            icd10_prefixes: strings(&["C"]),
            keywords: strings(&[
                "cancer",
                "malignancy",
                "neoplasm",
                "carcinoma",
                "sarcoma",
                "lymphoma",
                "leukemia",
            ]),
            exclusion_keywords: strings(&["basal cell", "squamous cell", "skin cancer"]),
        }
    }
}

/// Thrombocytopenia: a lab threshold on platelets, or diagnosis codes.
/// A zero threshold would silently disable the lab check, so both fields
/// default individually.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThrombocytopeniaSpec {
    /// Platelet count below this (10⁹/L) counts as thrombocytopenia.
    #[serde(default = "default_platelet_threshold")]
    pub threshold: f64,
    #[serde(default = "default_thrombocytopenia_icd10")]
    pub icd10cm_codes: Vec<String>,
}

fn default_platelet_threshold() -> f64 {
    100.0
}

fn default_thrombocytopenia_icd10() -> Vec<String> {
    strings(&["D69.3", "D69.4", "D69.5", "D69.6"])
}

impl Default for ThrombocytopeniaSpec {
    fn default() -> Self {
        Self {
            threshold: default_platelet_threshold(),
            icd10cm_codes: default_thrombocytopenia_icd10(),
        }
    }
}

fn default_bleeding_diathesis() -> ConceptSpec {
    ConceptSpec {
        snomed_codes: strings(&["64779008"]),
        icd10cm_codes: strings(&["D65", "D66", "D67", "D68", "D69"]),
        keywords: strings(&[
            "bleeding disorder",
            "bleeding diathesis",
            "hemorrhagic diathesis",
            "hemophilia",
            "von willebrand",
            "coagulation disorder",
        ]),
    }
}

fn default_prior_bleeding() -> ConceptSpec {
    ConceptSpec {
        snomed_codes: strings(&["131148009"]),
        icd10cm_codes: strings(&[
            "K92.2", "K25.0", "K26.0", "K27.0", "I85.0", "I61", "I62", "K62.5", "R31",
        ]),
        keywords: strings(&[
            "gastrointestinal hemorrhage",
            "gi bleed",
            "intracranial hemorrhage",
            "hematemesis",
            "melena",
            "hemorrhagic stroke",
            "bleeding episode",
        ]),
    }
}

/// Code tables per clinical concept. A concept missing from configuration
/// keeps its full default table; sibling concepts are unaffected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConceptTables {
    #[serde(default = "default_bleeding_diathesis")]
    pub bleeding_diathesis: ConceptSpec,
    #[serde(default = "default_prior_bleeding")]
    pub prior_bleeding: ConceptSpec,
    pub liver_cirrhosis: CirrhosisSpec,
    pub active_cancer: CancerSpec,
    pub thrombocytopenia: ThrombocytopeniaSpec,
}

impl Default for ConceptTables {
    fn default() -> Self {
        Self {
            bleeding_diathesis: default_bleeding_diathesis(),
            prior_bleeding: default_prior_bleeding(),
            liver_cirrhosis: CirrhosisSpec::default(),
            active_cancer: CancerSpec::default(),
            thrombocytopenia: ThrombocytopeniaSpec::default(),
        }
    }
}

// =========================================================================
// Medication tables
// =========================================================================

/// Keywords and Taiwan NHI codes identifying one medication class.
/// Keyword lists hold generic and brand names together, lowercased.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MedicationConceptSpec {
    pub keywords: Vec<String>,
    pub nhi_codes: Vec<String>,
}

fn default_oral_anticoagulants() -> MedicationConceptSpec {
    MedicationConceptSpec {
        keywords: strings(&[
            "warfarin",
            "rivaroxaban",
            "apixaban",
            "dabigatran",
            "edoxaban",
            "coumadin",
            "xarelto",
            "eliquis",
            "pradaxa",
            "lixiana",
            "savaysa",
        ]),
        nhi_codes: strings(&["B023"]),
    }
}

fn default_nsaids_corticosteroids() -> MedicationConceptSpec {
    MedicationConceptSpec {
        keywords: strings(&[
            "ibuprofen",
            "naproxen",
            "diclofenac",
            "celecoxib",
            "etoricoxib",
            "ketorolac",
            "indomethacin",
            "mefenamic",
            "prednisone",
            "prednisolone",
            "methylprednisolone",
            "dexamethasone",
            "hydrocortisone",
        ]),
        nhi_codes: strings(&["AC36"]),
    }
}

/// Medication tables per class. Like the concept tables, a class missing
/// from configuration keeps its full default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MedicationTables {
    #[serde(default = "default_oral_anticoagulants")]
    pub oral_anticoagulants: MedicationConceptSpec,
    #[serde(default = "default_nsaids_corticosteroids")]
    pub nsaids_corticosteroids: MedicationConceptSpec,
}

impl Default for MedicationTables {
    fn default() -> Self {
        Self {
            oral_anticoagulants: default_oral_anticoagulants(),
            nsaids_corticosteroids: default_nsaids_corticosteroids(),
        }
    }
}

// =========================================================================
// Tradeoff analysis configuration
// =========================================================================

/// SNOMED codes for the tradeoff clinical flags. Complete section
/// required when present.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeoffSnomedCodes {
    pub diabetes: String,
    pub myocardial_infarction: String,
    pub nstemi: String,
    pub stemi: String,
    pub copd: String,
    pub complex_pci: String,
    pub bare_metal_stent: String,
    /// Observation value codes meaning "current smoker".
    pub current_smoker_codes: Vec<String>,
}

impl Default for TradeoffSnomedCodes {
    fn default() -> Self {
        Self {
            diabetes: "73211009".into(),
            myocardial_infarction: "22298006".into(),
            nstemi: "164868009".into(),
            stemi: "164869001".into(),
            copd: "13645005".into(),
            complex_pci: "397682003".into(),
            bare_metal_stent: "427183000".into(),
            current_smoker_codes: strings(&["449868002", "LA18978-9"]),
        }
    }
}

/// RxNorm codes for oral anticoagulants at discharge. Complete section
/// required when present.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RxnormCodes {
    pub warfarin: String,
    pub rivaroxaban: String,
    pub apixaban: String,
    pub dabigatran: String,
    pub edoxaban: String,
}

impl Default for RxnormCodes {
    fn default() -> Self {
        Self {
            warfarin: "11289".into(),
            rivaroxaban: "21821".into(),
            apixaban: "1364430".into(),
            dabigatran: "1037042".into(),
            edoxaban: "1537033".into(),
        }
    }
}

impl RxnormCodes {
    /// All oral-anticoagulant codes.
    pub fn all(&self) -> [&str; 5] {
        [
            &self.warfarin,
            &self.rivaroxaban,
            &self.apixaban,
            &self.dabigatran,
            &self.edoxaban,
        ]
    }
}

/// A half-open value band `[min, max)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RangeBand {
    pub min: f64,
    pub max: f64,
}

impl RangeBand {
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value < self.max
    }
}

/// Thresholds for tradeoff factor detection. These are intentionally
/// distinct from the scoring engine's clamp windows. Complete section
/// required when present.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskFactorThresholds {
    pub age_threshold: f64,
    pub hemoglobin_moderate: RangeBand,
    pub hemoglobin_severe_max: f64,
    pub egfr_moderate: RangeBand,
    pub egfr_severe_max: f64,
}

impl Default for RiskFactorThresholds {
    fn default() -> Self {
        Self {
            age_threshold: 65.0,
            hemoglobin_moderate: RangeBand { min: 11.0, max: 13.0 },
            hemoglobin_severe_max: 11.0,
            egfr_moderate: RangeBand { min: 30.0, max: 60.0 },
            egfr_severe_max: 30.0,
        }
    }
}

/// Baseline 1-year event rates (percent) for the Cox transform.
/// Complete section required when present.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BaselineEventRates {
    pub bleeding_rate_percent: f64,
    pub thrombotic_rate_percent: f64,
}

impl Default for BaselineEventRates {
    fn default() -> Self {
        Self {
            bleeding_rate_percent: 2.5,
            thrombotic_rate_percent: 2.5,
        }
    }
}

/// Tradeoff analysis configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TradeoffConfig {
    pub snomed_codes: TradeoffSnomedCodes,
    pub rxnorm_codes: RxnormCodes,
    pub risk_factor_thresholds: RiskFactorThresholds,
    pub baseline_event_rates: BaselineEventRates,
}

// =========================================================================
// Top-level reference configuration
// =========================================================================

/// All static reference data the pipeline needs. Immutable after load;
/// safe to share across concurrent scoring requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReferenceConfig {
    pub laboratory_value_extraction: LabExtractionConfig,
    #[serde(rename = "precise_hbr_codes")]
    pub concepts: ConceptTables,
    pub medication_keywords: MedicationTables,
    pub unit_conversion: UnitTable,
    pub tradeoff_analysis: TradeoffConfig,
}

impl ReferenceConfig {
    /// Load reference configuration from a JSON file. Errors are fatal:
    /// surface them to the owning process at startup.
    pub fn from_path<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let text = fs::read_to_string(&path)?;
        let config = Self::from_json_str(&text)?;
        tracing::info!(
            "loaded reference configuration from {}",
            path.as_ref().display()
        );
        Ok(config)
    }

    /// Parse reference configuration from a JSON string.
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// The reference configuration shipped with this crate.
    pub fn builtin() -> Self {
        serde_json::from_str(BUILTIN_CONFIG)
            .expect("builtin reference configuration is valid JSON")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TradeoffModelFile {
    tradeoff_model: TradeoffModel,
}

/// Load the tradeoff hazard-ratio model from its JSON file
/// (`{"tradeoffModel": {...}}` envelope).
pub fn load_tradeoff_model<P: AsRef<Path>>(path: P) -> ConfigResult<TradeoffModel> {
    let text = fs::read_to_string(&path)?;
    parse_tradeoff_model(&text)
}

/// Parse a tradeoff model from JSON text.
pub fn parse_tradeoff_model(json: &str) -> ConfigResult<TradeoffModel> {
    let file: TradeoffModelFile = serde_json::from_str(json)?;
    Ok(file.tradeoff_model)
}

/// The tradeoff model shipped with this crate.
pub fn builtin_tradeoff_model() -> TradeoffModel {
    parse_tradeoff_model(BUILTIN_TRADEOFF_MODEL)
        .expect("builtin tradeoff model is valid JSON")
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
