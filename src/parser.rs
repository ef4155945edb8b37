use crate::{errors::MetaError, models::*, Result};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

pub struct StudyParser;

impl StudyParser {
    /// Parse a study-level CSV dataset.
    ///
    /// Required columns: ID, EFFECT_SIZE, EFFECT_TYPE, and either SE or VAR
    /// (SE is derived as sqrt(VAR) when only the variance is given).
    /// Optional columns: NAME, N_TREAT, N_CONTROL, MEAN_TREAT, SD_TREAT,
    /// MEAN_CONTROL, SD_CONTROL, EVENTS_TREAT, EVENTS_CONTROL, SUBGROUP.
    pub fn parse_dataset<P: AsRef<Path>>(file_path: P) -> Result<Vec<Study>> {
        let file = File::open(file_path)?;
        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_uppercase())
            .collect();

        let mut studies = Vec::new();
        for result in reader.records() {
            let record = result?;
            let row = Self::parse_record(&headers, &record);
            studies.push(Self::process_row(&row)?);
        }

        if studies.is_empty() {
            return Err(MetaError::InsufficientData(
                "Dataset contains no study rows".to_string(),
            ));
        }

        Ok(studies)
    }

    fn parse_record(headers: &[String], record: &csv::StringRecord) -> HashMap<String, String> {
        let mut row = HashMap::new();
        for (i, value) in record.iter().enumerate() {
            if i < headers.len() {
                row.insert(headers[i].clone(), value.trim().to_string());
            }
        }
        row
    }

    fn process_row(row: &HashMap<String, String>) -> Result<Study> {
        let id = Self::parse_string(row, "ID")?;
        let name = Self::parse_string_optional(row, "NAME").unwrap_or_else(|| id.clone());
        let effect_size = Self::parse_float(row, "EFFECT_SIZE")?;
        let effect_size_type = Self::parse_effect_type(row)?;

        let standard_error = if let Some(se) = Self::parse_float_optional(row, "SE") {
            se
        } else if let Some(var) = Self::parse_float_optional(row, "VAR") {
            var.sqrt()
        } else {
            return Err(MetaError::ParseError(format!(
                "Study {} has neither SE nor VAR",
                id
            )));
        };

        if !standard_error.is_finite() || standard_error <= 0.0 {
            return Err(MetaError::ParseError(format!(
                "Study {} has non-positive SE ({})",
                id, standard_error
            )));
        }

        Ok(Study {
            id,
            name,
            effect_size,
            effect_size_type,
            standard_error,
            sample_size_treatment: Self::parse_usize_optional(row, "N_TREAT"),
            sample_size_control: Self::parse_usize_optional(row, "N_CONTROL"),
            mean_treatment: Self::parse_float_optional(row, "MEAN_TREAT"),
            sd_treatment: Self::parse_float_optional(row, "SD_TREAT"),
            mean_control: Self::parse_float_optional(row, "MEAN_CONTROL"),
            sd_control: Self::parse_float_optional(row, "SD_CONTROL"),
            events_treatment: Self::parse_usize_optional(row, "EVENTS_TREAT"),
            events_control: Self::parse_usize_optional(row, "EVENTS_CONTROL"),
            subgroup: Self::parse_string_optional(row, "SUBGROUP"),
        })
    }

    fn parse_effect_type(row: &HashMap<String, String>) -> Result<EffectSizeType> {
        let raw = Self::parse_string(row, "EFFECT_TYPE")?;
        match raw.to_lowercase().as_str() {
            "smd" | "d" => Ok(EffectSizeType::Smd),
            "or" | "log_or" => Ok(EffectSizeType::OddsRatio),
            "rr" | "log_rr" => Ok(EffectSizeType::RiskRatio),
            "md" => Ok(EffectSizeType::MeanDifference),
            "hr" | "log_hr" => Ok(EffectSizeType::HazardRatio),
            "correlation" | "r" | "z" => Ok(EffectSizeType::Correlation),
            other => Err(MetaError::ParseError(format!(
                "Unknown effect size type: {}",
                other
            ))),
        }
    }

    fn parse_string(row: &HashMap<String, String>, key: &str) -> Result<String> {
        let value = row
            .get(key)
            .ok_or_else(|| MetaError::ParseError(format!("Missing column: {}", key)))?;
        if value.is_empty() {
            return Err(MetaError::ParseError(format!("Empty value for {}", key)));
        }
        Ok(value.clone())
    }

    fn parse_string_optional(row: &HashMap<String, String>, key: &str) -> Option<String> {
        row.get(key).filter(|v| !v.is_empty()).cloned()
    }

    fn parse_float(row: &HashMap<String, String>, key: &str) -> Result<f64> {
        row.get(key)
            .ok_or_else(|| MetaError::ParseError(format!("Missing column: {}", key)))?
            .parse::<f64>()
            .map_err(|_| MetaError::ParseError(format!("Invalid float value for {}", key)))
    }

    fn parse_float_optional(row: &HashMap<String, String>, key: &str) -> Option<f64> {
        row.get(key)?.parse::<f64>().ok()
    }

    fn parse_usize_optional(row: &HashMap<String, String>, key: &str) -> Option<usize> {
        row.get(key)?.parse::<usize>().ok()
    }
}
