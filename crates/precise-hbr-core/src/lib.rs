//! PRECISE-HBR Core Library
//!
//! Deterministic clinical bleeding-risk scoring over structured patient
//! data, with a companion bleeding/thrombosis tradeoff estimate.
//!
//! # Architecture
//!
//! ```text
//! Raw clinical bundle ──► Unit Conversion ──┐
//!          │                                │
//!          └──────────► Concept Matching ───┤
//!                    (SNOMED / ICD-10 / NHI │
//!                     / keyword fallback)   │
//!                                           ▼
//!                                   Input Extraction
//!                                 (clamping, missing-
//!                                   field tracking)
//!                                           │
//!                                           ▼
//!                                    Scoring Engine ──► Risk Classifier
//!                                           │
//!  Detected tradeoff factors ───────────────┴──► Tradeoff Hazard Model
//! ```
//!
//! # Core principle
//!
//! Partial data never aborts a calculation. A lab value that cannot be
//! converted, a malformed condition record, or a missing demographic
//! degrades to "value absent" / "factor not detected" and scoring
//! proceeds; the report names what was missing. The single fatal error is
//! a reference-configuration load failure at startup.
//!
//! # Modules
//!
//! - [`config`]: reference configuration (code tables, keywords, thresholds)
//! - [`models`]: domain types (clinical records, score inputs/outputs)
//! - [`units`]: unit conversion and eGFR derivation
//! - [`matcher`]: concept matching across coding systems
//! - [`scoring`]: input extraction, the scoring engine, risk classification
//! - [`tradeoff`]: hazard-ratio composition and Cox probabilities

pub mod config;
pub mod matcher;
pub mod models;
pub mod scoring;
pub mod tradeoff;
pub mod units;

// Re-export commonly used types
pub use config::{builtin_tradeoff_model, ConfigError, ReferenceConfig};
pub use models::{
    ArcHbrFactors, ClinicalBundle, Demographics, DetectedFactors, Gender, MissingField,
    RiskCategory, RiskCategoryInfo, ScoreInputs, ScoreReport, TradeoffFlags, TradeoffModel,
    TradeoffResult,
};
pub use scoring::{calculate_pure_score, risk_category_info, Scorer};
pub use tradeoff::TradeoffCalculator;
