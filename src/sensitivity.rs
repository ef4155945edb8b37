use crate::{models::*, pooling::MetaAnalyzer, Result};
use rayon::prelude::*;

pub struct SensitivityAnalyzer;

impl SensitivityAnalyzer {
    /// Leave-one-out sensitivity analysis: re-pool with each study omitted in turn.
    ///
    /// Requires at least 3 studies so that every reduced set still contains
    /// 2 or more studies.
    pub fn leave_one_out(
        studies: &[Study],
        config: &AnalysisConfig,
    ) -> Result<Vec<LeaveOneOutResult>> {
        if studies.len() < 3 {
            return Err(crate::errors::MetaError::InsufficientData(format!(
                "Leave-one-out analysis requires at least 3 studies, got {}",
                studies.len()
            )));
        }

        (0..studies.len())
            .into_par_iter()
            .map(|omit_idx| {
                let subset: Vec<Study> = studies
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != omit_idx)
                    .map(|(_, s)| s.clone())
                    .collect();

                let result = MetaAnalyzer::pool(&subset, config)?;
                Ok(LeaveOneOutResult {
                    omitted_study: studies[omit_idx].name.clone(),
                    result,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn study(name: &str, effect: f64, se: f64) -> Study {
        Study {
            id: name.to_string(),
            name: name.to_string(),
            effect_size: effect,
            effect_size_type: EffectSizeType::Smd,
            standard_error: se,
            sample_size_treatment: None,
            sample_size_control: None,
            mean_treatment: None,
            sd_treatment: None,
            mean_control: None,
            sd_control: None,
            events_treatment: None,
            events_control: None,
            subgroup: None,
        }
    }

    #[test]
    fn test_leave_one_out_requires_three_studies() {
        let studies = vec![study("A", 0.5, 0.1), study("B", 0.6, 0.1)];
        assert!(SensitivityAnalyzer::leave_one_out(&studies, &AnalysisConfig::default()).is_err());
    }

    #[test]
    fn test_leave_one_out_produces_one_result_per_study() {
        let studies = vec![
            study("A", 0.5, 0.1),
            study("B", 0.6, 0.1),
            study("C", 0.4, 0.1),
        ];
        let results =
            SensitivityAnalyzer::leave_one_out(&studies, &AnalysisConfig::default()).unwrap();

        assert_eq!(results.len(), 3);
        let names: Vec<&str> = results.iter().map(|r| r.omitted_study.as_str()).collect();
        assert!(names.contains(&"A"));
        assert!(names.contains(&"B"));
        assert!(names.contains(&"C"));
    }

    #[test]
    fn test_leave_one_out_omitting_outlier_shifts_estimate() {
        let studies = vec![
            study("A", 0.5, 0.1),
            study("B", 0.5, 0.1),
            study("C", 2.0, 0.1),
        ];
        let results =
            SensitivityAnalyzer::leave_one_out(&studies, &AnalysisConfig::default()).unwrap();

        let without_outlier = results
            .iter()
            .find(|r| r.omitted_study == "C")
            .unwrap();
        assert!((without_outlier.result.pooled_effect - 0.5).abs() < 1e-9);

        let with_outlier = results
            .iter()
            .find(|r| r.omitted_study == "A")
            .unwrap();
        assert!(with_outlier.result.pooled_effect > 0.6);
    }
}
