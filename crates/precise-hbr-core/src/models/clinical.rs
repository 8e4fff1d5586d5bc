//! Raw clinical record shapes consumed by the scoring pipeline.
//!
//! These mirror the subset of FHIR the pipeline reads. Every field is
//! optional: malformed records must degrade to "no match" / "value absent",
//! never to a parse failure that aborts scoring.

use serde::{Deserialize, Serialize};

/// A single coding entry (system + code + display).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Coding {
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub display: Option<String>,
}

/// A codeable concept: coded identifiers plus free text.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CodeableConcept {
    #[serde(default)]
    pub coding: Vec<Coding>,
    #[serde(default)]
    pub text: Option<String>,
}

impl CodeableConcept {
    /// All human-readable text in this concept (text field + coding displays),
    /// joined for keyword matching.
    pub fn full_text(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if let Some(text) = self.text.as_deref() {
            parts.push(text);
        }
        for coding in &self.coding {
            if let Some(display) = coding.display.as_deref() {
                parts.push(display);
            }
        }
        parts.join(" ")
    }

    /// Text blob for medication keyword matching: free text plus every
    /// coding's display and code.
    pub fn match_blob(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if let Some(text) = self.text.as_deref() {
            parts.push(text);
        }
        for coding in &self.coding {
            if let Some(display) = coding.display.as_deref() {
                parts.push(display);
            }
            if let Some(code) = coding.code.as_deref() {
                parts.push(code);
            }
        }
        parts.join(" ").to_lowercase()
    }

    /// Whether any coding matches the given system and code exactly.
    pub fn has_code(&self, system: &str, code: &str) -> bool {
        self.coding.iter().any(|c| {
            c.system.as_deref() == Some(system) && c.code.as_deref() == Some(code)
        })
    }
}

/// A numeric quantity with its source unit, as written by the source system.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Quantity {
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
}

/// A laboratory observation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    #[serde(default)]
    pub code: Option<CodeableConcept>,
    #[serde(default)]
    pub value_quantity: Option<Quantity>,
    #[serde(default)]
    pub effective_date_time: Option<String>,
}

impl Observation {
    /// The observation's effective date, or `"N/A"` when absent.
    pub fn effective_date(&self) -> &str {
        self.effective_date_time.as_deref().unwrap_or("N/A")
    }
}

/// Clinical status of a condition. Source systems emit either a codeable
/// concept or a bare string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ClinicalStatus {
    Concept(CodeableConcept),
    Text(String),
}

/// System URL carrying condition clinical-status codes.
pub const CONDITION_CLINICAL_SYSTEM: &str =
    "http://terminology.hl7.org/CodeSystem/condition-clinical";

/// A diagnosis / problem-list entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(default)]
    pub code: Option<CodeableConcept>,
    #[serde(default)]
    pub clinical_status: Option<ClinicalStatus>,
}

impl Condition {
    /// All matchable text for this condition (code text + coding displays).
    pub fn full_text(&self) -> String {
        self.code.as_ref().map(CodeableConcept::full_text).unwrap_or_default()
    }

    /// Whether any coding matches the given system and code exactly.
    pub fn has_code(&self, system: &str, code: &str) -> bool {
        self.code.as_ref().is_some_and(|c| c.has_code(system, code))
    }

    /// Clinical-status code, defaulting to `active` when unspecified.
    /// The default is deliberately conservative and can over-count.
    pub fn clinical_status_code(&self) -> String {
        match &self.clinical_status {
            Some(ClinicalStatus::Text(text)) => text.to_lowercase(),
            Some(ClinicalStatus::Concept(concept)) => concept
                .coding
                .iter()
                .find(|c| c.system.as_deref() == Some(CONDITION_CLINICAL_SYSTEM))
                .and_then(|c| c.code.clone())
                .unwrap_or_else(|| "active".to_string()),
            None => "active".to_string(),
        }
    }

    /// Whether this condition counts as clinically active.
    pub fn is_active(&self) -> bool {
        matches!(
            self.clinical_status_code().as_str(),
            "active" | "recurrence" | "relapse"
        )
    }

    /// First ICD-10 / ICD-10-CM coding, as `(code, display)`. The display
    /// falls back to the condition text when the coding carries none.
    pub fn icd10_code(&self) -> Option<(String, Option<String>)> {
        let concept = self.code.as_ref()?;
        for coding in &concept.coding {
            let system = coding.system.as_deref().unwrap_or_default();
            if system.to_lowercase().contains("icd-10") {
                if let Some(code) = coding.code.clone() {
                    let display = coding.display.clone().or_else(|| concept.text.clone());
                    return Some((code, display));
                }
            }
        }
        None
    }
}

/// Systems carrying Taiwan NHI medication codes.
const NHI_SYSTEM_MARKERS: [&str; 2] = ["medication-nhi-tw", "nhi.gov.tw"];

/// A medication order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MedicationRequest {
    #[serde(default)]
    pub medication_codeable_concept: Option<CodeableConcept>,
    #[serde(default)]
    pub status: Option<String>,
}

impl MedicationRequest {
    /// Taiwan NHI medication code, if present. Recognizes the TW-Core NHI
    /// code system, plus bare 12-character alphanumeric codes emitted by
    /// systems that omit the system URL.
    pub fn nhi_code(&self) -> Option<&str> {
        let concept = self.medication_codeable_concept.as_ref()?;
        for coding in &concept.coding {
            let Some(code) = coding.code.as_deref() else {
                continue;
            };
            let system = coding.system.as_deref().unwrap_or_default();
            if NHI_SYSTEM_MARKERS.iter().any(|m| system.contains(m)) {
                return Some(code);
            }
            if code.len() == 12 && code.chars().all(|ch| ch.is_ascii_alphanumeric()) {
                return Some(code);
            }
        }
        None
    }

    /// Lowercased text blob for keyword matching.
    pub fn match_blob(&self) -> String {
        self.medication_codeable_concept
            .as_ref()
            .map(CodeableConcept::match_blob)
            .unwrap_or_default()
    }

    /// Whether the order is in an active-family status.
    pub fn is_active(&self) -> bool {
        matches!(
            self.status.as_deref().map(str::to_lowercase).as_deref(),
            Some("active") | Some("on-hold") | Some("completed")
        )
    }
}

/// Patient gender as required by the eGFR equation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

/// Patient demographics, produced by an external demographics extractor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Demographics {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub age: Option<f64>,
    #[serde(default)]
    pub birth_date: Option<String>,
}

/// The raw clinical data bundle the pipeline scores. Each lab bucket holds
/// at most the single most-recent observation for that analyte.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClinicalBundle {
    #[serde(rename = "HEMOGLOBIN", default)]
    pub hemoglobin: Vec<Observation>,
    #[serde(rename = "CREATININE", default)]
    pub creatinine: Vec<Observation>,
    #[serde(rename = "EGFR", default)]
    pub egfr: Vec<Observation>,
    #[serde(rename = "WBC", default)]
    pub wbc: Vec<Observation>,
    #[serde(rename = "PLATELETS", default)]
    pub platelets: Vec<Observation>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub med_requests: Vec<MedicationRequest>,
}
