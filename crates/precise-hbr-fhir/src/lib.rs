//! FHIR JSON to scoring-input converter.
//!
//! Takes already-fetched FHIR resources (a `Bundle` or a resource list as
//! `serde_json::Value`), buckets laboratory observations per analyte by
//! LOINC code with a text-search fallback (most-recent observation wins),
//! extracts TW-Core-aware demographics, and detects the tradeoff clinical
//! flags from Condition / Procedure / Observation / MedicationRequest
//! resources. Network I/O, retries, and authentication live elsewhere;
//! this crate only reshapes materialized JSON.

use chrono::NaiveDate;
use serde_json::Value;
use thiserror::Error;

use precise_hbr_core::config::ReferenceConfig;
use precise_hbr_core::models::{
    ClinicalBundle, Condition, Demographics, Gender, MedicationRequest, Observation,
    TradeoffFlags,
};
use precise_hbr_core::units::Analyte;

/// LOINC code for smoking status observations.
const SMOKING_STATUS_LOINC: &str = "72166-2";

/// RxNorm code system URL.
const RXNORM_SYSTEM: &str = "http://www.nlm.nih.gov/research/umls/rxnorm";

/// Adapter errors.
#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type AdapterResult<T> = Result<T, AdapterError>;

/// Everything the scoring pipeline needs for one patient.
#[derive(Debug, Clone, Default)]
pub struct PatientData {
    pub demographics: Demographics,
    pub bundle: ClinicalBundle,
    pub flags: TradeoffFlags,
}

/// Build patient data from a JSON string (a FHIR `Bundle` or an array of
/// resources). `today` anchors age derivation so callers and tests get
/// reproducible results.
pub fn patient_data_from_str(
    json: &str,
    config: &ReferenceConfig,
    today: NaiveDate,
) -> AdapterResult<PatientData> {
    let value: Value = serde_json::from_str(json)?;
    patient_data_from_value(&value, config, today)
}

/// Build patient data from a parsed FHIR `Bundle` or resource array.
pub fn patient_data_from_value(
    root: &Value,
    config: &ReferenceConfig,
    today: NaiveDate,
) -> AdapterResult<PatientData> {
    let resources = collect_resources(root)?;

    let mut data = PatientData::default();
    let mut latest: [Option<(String, Observation)>; 5] = Default::default();
    let mut smoking: Option<(String, String)> = None;

    for resource in resources {
        match resource
            .get("resourceType")
            .and_then(Value::as_str)
            .unwrap_or_default()
        {
            "Patient" => data.demographics = extract_demographics(resource, today),
            "Observation" => {
                handle_observation(resource, config, &mut latest, &mut smoking);
            }
            "Condition" => match serde_json::from_value::<Condition>(resource.clone()) {
                Ok(condition) => data.bundle.conditions.push(condition),
                Err(err) => tracing::warn!("skipping malformed Condition: {err}"),
            },
            "MedicationRequest" => {
                match serde_json::from_value::<MedicationRequest>(resource.clone()) {
                    Ok(med) => data.bundle.med_requests.push(med),
                    Err(err) => tracing::warn!("skipping malformed MedicationRequest: {err}"),
                }
            }
            "Procedure" => {
                let codes = &config.tradeoff_analysis.snomed_codes;
                if value_has_code(resource, SNOMED_SYSTEM, &codes.complex_pci) {
                    data.flags.complex_pci = true;
                }
                if value_has_code(resource, SNOMED_SYSTEM, &codes.bare_metal_stent) {
                    data.flags.bms_used = true;
                }
            }
            _ => {}
        }
    }

    let [hemoglobin, creatinine, egfr, wbc, platelets] = latest;
    data.bundle.hemoglobin = bucket(hemoglobin);
    data.bundle.creatinine = bucket(creatinine);
    data.bundle.egfr = bucket(egfr);
    data.bundle.wbc = bucket(wbc);
    data.bundle.platelets = bucket(platelets);

    detect_condition_flags(&data.bundle.conditions, config, &mut data.flags);
    data.flags.oac_discharge = has_rxnorm_anticoagulant(&data.bundle.med_requests, config);
    if let Some((_, code)) = smoking {
        data.flags.smoker = config
            .tradeoff_analysis
            .snomed_codes
            .current_smoker_codes
            .iter()
            .any(|c| c == &code);
    }

    Ok(data)
}

const SNOMED_SYSTEM: &str = "http://snomed.info/sct";

fn collect_resources(root: &Value) -> AdapterResult<Vec<&Value>> {
    if let Some(resources) = root.as_array() {
        return Ok(resources.iter().collect());
    }
    match root.get("resourceType").and_then(Value::as_str) {
        Some("Bundle") => Ok(root
            .get("entry")
            .and_then(Value::as_array)
            .map(|entries| entries.iter().filter_map(|e| e.get("resource")).collect())
            .unwrap_or_default()),
        Some(_) => Ok(vec![root]),
        None => Err(AdapterError::InvalidInput(
            "expected a Bundle, a resource, or an array of resources".into(),
        )),
    }
}

fn handle_observation(
    resource: &Value,
    config: &ReferenceConfig,
    latest: &mut [Option<(String, Observation)>; 5],
    smoking: &mut Option<(String, String)>,
) {
    let date = resource
        .get("effectiveDateTime")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    // Smoking status is not a lab bucket; track the latest value code.
    if observation_has_loinc(resource, SMOKING_STATUS_LOINC) {
        if let Some(code) = resource
            .get("valueCodeableConcept")
            .and_then(|v| v.get("coding"))
            .and_then(Value::as_array)
            .and_then(|codings| codings.first())
            .and_then(|c| c.get("code"))
            .and_then(Value::as_str)
        {
            let newer = smoking
                .as_ref()
                .map(|(existing, _)| date > *existing)
                .unwrap_or(true);
            if newer {
                *smoking = Some((date, code.to_string()));
            }
        }
        return;
    }

    let Some(analyte) = classify_observation(resource, config) else {
        return;
    };
    let observation = match serde_json::from_value::<Observation>(resource.clone()) {
        Ok(obs) => obs,
        Err(err) => {
            tracing::warn!("skipping malformed Observation: {err}");
            return;
        }
    };

    let slot = &mut latest[analyte_index(analyte)];
    let newer = slot
        .as_ref()
        .map(|(existing, _)| date > *existing)
        .unwrap_or(true);
    if newer {
        *slot = Some((date, observation));
    }
}

fn analyte_index(analyte: Analyte) -> usize {
    match analyte {
        Analyte::Hemoglobin => 0,
        Analyte::Creatinine => 1,
        Analyte::Egfr => 2,
        Analyte::Wbc => 3,
        Analyte::Platelets => 4,
    }
}

fn bucket(slot: Option<(String, Observation)>) -> Vec<Observation> {
    slot.map(|(_, obs)| vec![obs]).unwrap_or_default()
}

/// Which analyte an Observation reports, by LOINC code first, then by
/// configured text terms against `code.text`.
fn classify_observation(resource: &Value, config: &ReferenceConfig) -> Option<Analyte> {
    let lab = &config.laboratory_value_extraction;
    let code = resource.get("code")?;

    if let Some(codings) = code.get("coding").and_then(Value::as_array) {
        for coding in codings {
            let Some(code_value) = coding.get("code").and_then(Value::as_str) else {
                continue;
            };
            for analyte in Analyte::ALL {
                if lab.loinc_codes(analyte).iter().any(|c| c == code_value) {
                    return Some(analyte);
                }
            }
        }
    }

    let text = code
        .get("text")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_lowercase();
    if !text.is_empty() {
        for analyte in Analyte::ALL {
            if lab
                .text_terms(analyte)
                .iter()
                .any(|term| text.contains(term.as_str()))
            {
                return Some(analyte);
            }
        }
    }
    None
}

fn observation_has_loinc(resource: &Value, loinc: &str) -> bool {
    resource
        .get("code")
        .and_then(|c| c.get("coding"))
        .and_then(Value::as_array)
        .map(|codings| {
            codings
                .iter()
                .any(|c| c.get("code").and_then(Value::as_str) == Some(loinc))
        })
        .unwrap_or(false)
}

/// Whether a raw resource's `code.coding` carries the given system+code.
fn value_has_code(resource: &Value, system: &str, code: &str) -> bool {
    resource
        .get("code")
        .and_then(|c| c.get("coding"))
        .and_then(Value::as_array)
        .map(|codings| {
            codings.iter().any(|c| {
                c.get("system").and_then(Value::as_str) == Some(system)
                    && c.get("code").and_then(Value::as_str) == Some(code)
            })
        })
        .unwrap_or(false)
}

fn detect_condition_flags(
    conditions: &[Condition],
    config: &ReferenceConfig,
    flags: &mut TradeoffFlags,
) {
    let codes = &config.tradeoff_analysis.snomed_codes;
    for condition in conditions {
        if condition.has_code(SNOMED_SYSTEM, &codes.diabetes) {
            flags.diabetes = true;
        }
        if condition.has_code(SNOMED_SYSTEM, &codes.myocardial_infarction) {
            flags.prior_mi = true;
        }
        if condition.has_code(SNOMED_SYSTEM, &codes.nstemi)
            || condition.has_code(SNOMED_SYSTEM, &codes.stemi)
        {
            flags.nstemi_stemi = true;
        }
        if condition.has_code(SNOMED_SYSTEM, &codes.copd) {
            flags.copd = true;
        }
    }
}

fn has_rxnorm_anticoagulant(medications: &[MedicationRequest], config: &ReferenceConfig) -> bool {
    let oac_codes = config.tradeoff_analysis.rxnorm_codes.all();
    medications.iter().any(|med| {
        med.medication_codeable_concept
            .as_ref()
            .map(|concept| oac_codes.iter().any(|code| concept.has_code(RXNORM_SYSTEM, code)))
            .unwrap_or(false)
    })
}

/// Extract demographics from a FHIR Patient resource, following the TW
/// Core profile: a Chinese name in `name[].text` takes precedence over the
/// structured given/family form.
pub fn extract_demographics(patient: &Value, today: NaiveDate) -> Demographics {
    let mut demographics = Demographics::default();

    let mut chinese_name: Option<String> = None;
    let mut english_name: Option<String> = None;
    if let Some(names) = patient.get("name").and_then(Value::as_array) {
        for name in names {
            if let Some(text) = name.get("text").and_then(Value::as_str) {
                if contains_cjk(text) {
                    chinese_name.get_or_insert_with(|| text.to_string());
                } else {
                    english_name.get_or_insert_with(|| text.to_string());
                }
            } else {
                let given = name
                    .get("given")
                    .and_then(Value::as_array)
                    .map(|parts| {
                        parts
                            .iter()
                            .filter_map(Value::as_str)
                            .collect::<Vec<_>>()
                            .join(" ")
                    })
                    .unwrap_or_default();
                let family = name.get("family").and_then(Value::as_str).unwrap_or_default();
                let full = format!("{given} {family}").trim().to_string();
                if !full.is_empty() {
                    english_name.get_or_insert(full);
                }
            }
        }
    }
    demographics.name = chinese_name.or(english_name);

    demographics.gender = match patient.get("gender").and_then(Value::as_str) {
        Some("male") => Some(Gender::Male),
        Some("female") => Some(Gender::Female),
        _ => None,
    };

    if let Some(birth_date) = patient.get("birthDate").and_then(Value::as_str) {
        demographics.birth_date = Some(birth_date.to_string());
        match NaiveDate::parse_from_str(birth_date, "%Y-%m-%d") {
            Ok(born) => demographics.age = Some(age_on(born, today) as f64),
            Err(err) => tracing::warn!("could not parse birthDate '{birth_date}': {err}"),
        }
    }

    demographics
}

fn contains_cjk(text: &str) -> bool {
    text.chars().any(|ch| ('\u{4e00}'..='\u{9fff}').contains(&ch))
}

fn age_on(born: NaiveDate, today: NaiveDate) -> i32 {
    use chrono::Datelike;
    let mut age = today.year() - born.year();
    if (today.month(), today.day()) < (born.month(), born.day()) {
        age -= 1;
    }
    age
}
