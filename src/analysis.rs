use crate::bias::BiasAnalyzer;
use crate::sensitivity::SensitivityAnalyzer;
use crate::subgroup::SubgroupAnalyzer;
use crate::{models::*, pooling::MetaAnalyzer, Result};
use std::collections::HashMap;

pub struct ReportBuilder;

impl ReportBuilder {
    /// Run the full meta-analysis pipeline over a set of studies.
    ///
    /// The overall pooled estimate is mandatory; leave-one-out, subgroup
    /// and Egger analyses degrade to warnings when their preconditions
    /// are not met.
    pub fn build_report(
        studies: &[Study],
        config: &AnalysisConfig,
    ) -> Result<MetaAnalysisReport> {
        log::info!("Starting meta-analysis for {} studies", studies.len());
        let mut warnings = Vec::new();

        if studies.len() < 2 {
            warnings.push(
                "Fewer than 2 studies: pooled estimate is not a synthesis".to_string(),
            );
        }

        let pooled = MetaAnalyzer::pool(studies, config)?;
        log::info!(
            "Pooled effect {:.4} (95% CI {:.4} to {:.4}), I^2 = {:.1}%",
            pooled.pooled_effect,
            pooled.lower_ci,
            pooled.upper_ci,
            pooled.i_squared
        );

        if pooled.i_squared > 75.0 {
            warnings.push(format!(
                "Considerable heterogeneity (I^2 = {:.1}%): pooled estimate may not be meaningful",
                pooled.i_squared
            ));
        }

        if studies.len() > 1 && pooled.q_p_value < 0.10 {
            warnings.push(format!(
                "Q-test suggests heterogeneity beyond sampling error (Q = {:.3}, p = {:.4})",
                pooled.q_statistic, pooled.q_p_value
            ));
        }

        let leave_one_out = if config.perform_leave_one_out {
            match SensitivityAnalyzer::leave_one_out(studies, config) {
                Ok(results) => results,
                Err(e) => {
                    log::warn!("Leave-one-out analysis skipped: {}", e);
                    warnings.push(format!("Leave-one-out analysis skipped: {}", e));
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        let subgroups = match SubgroupAnalyzer::analyze_subgroups(studies, config) {
            Ok(results) => results,
            Err(e) => {
                log::warn!("Subgroup analysis failed: {}", e);
                warnings.push(format!("Subgroup analysis failed: {}", e));
                HashMap::new()
            }
        };

        let eggers = if config.perform_eggers {
            match BiasAnalyzer::eggers_regression(studies) {
                Ok(test) => {
                    if test.p_value < 0.05 {
                        warnings.push(format!(
                            "Egger's test suggests small-study effects (p = {:.4})",
                            test.p_value
                        ));
                    }
                    Some(test)
                }
                Err(e) => {
                    log::warn!("Egger's test skipped: {}", e);
                    warnings.push(format!("Egger's test skipped: {}", e));
                    None
                }
            }
        } else {
            None
        };

        log::info!("Meta-analysis complete ({} warnings)", warnings.len());

        Ok(MetaAnalysisReport {
            n_studies: studies.len(),
            pooled,
            leave_one_out,
            subgroups,
            eggers,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn study(name: &str, effect: f64, se: f64, subgroup: Option<&str>) -> Study {
        Study {
            id: name.to_string(),
            name: name.to_string(),
            effect_size: effect,
            effect_size_type: EffectSizeType::Smd,
            standard_error: se,
            sample_size_treatment: Some(50),
            sample_size_control: Some(50),
            mean_treatment: None,
            sd_treatment: None,
            mean_control: None,
            sd_control: None,
            events_treatment: None,
            events_control: None,
            subgroup: subgroup.map(|s| s.to_string()),
        }
    }

    #[test]
    fn test_full_report_with_all_analyses() {
        let studies = vec![
            study("A", 0.5, 0.10, Some("adults")),
            study("B", 0.6, 0.12, Some("adults")),
            study("C", 0.4, 0.15, Some("children")),
            study("D", 0.5, 0.09, Some("children")),
        ];
        let report = ReportBuilder::build_report(&studies, &AnalysisConfig::default()).unwrap();

        assert_eq!(report.n_studies, 4);
        assert_eq!(report.leave_one_out.len(), 4);
        assert_eq!(report.subgroups.len(), 2);
        assert!(report.eggers.is_some());
    }

    #[test]
    fn test_two_studies_soft_fail_optional_analyses() {
        let studies = vec![study("A", 0.5, 0.1, None), study("B", 0.7, 0.1, None)];
        let report = ReportBuilder::build_report(&studies, &AnalysisConfig::default()).unwrap();

        assert!((report.pooled.pooled_effect - 0.6).abs() < 1e-9);
        assert!(report.leave_one_out.is_empty());
        assert!(report.eggers.is_none());
        assert!(report
            .warnings
            .iter()
            .any(|w| w.contains("Leave-one-out")));
        assert!(report.warnings.iter().any(|w| w.contains("Egger")));
    }

    #[test]
    fn test_disabled_analyses_are_skipped_silently() {
        let studies = vec![
            study("A", 0.5, 0.1, None),
            study("B", 0.6, 0.1, None),
            study("C", 0.4, 0.1, None),
        ];
        let config = AnalysisConfig {
            perform_leave_one_out: false,
            perform_eggers: false,
            ..Default::default()
        };
        let report = ReportBuilder::build_report(&studies, &config).unwrap();

        assert!(report.leave_one_out.is_empty());
        assert!(report.eggers.is_none());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_heterogeneity_warning() {
        let studies = vec![
            study("A", -0.8, 0.05, None),
            study("B", 0.9, 0.05, None),
            study("C", 0.1, 0.05, None),
        ];
        let report = ReportBuilder::build_report(&studies, &AnalysisConfig::default()).unwrap();
        assert!(report
            .warnings
            .iter()
            .any(|w| w.contains("heterogeneity")));
    }

    #[test]
    fn test_empty_input_is_an_error() {
        assert!(ReportBuilder::build_report(&[], &AnalysisConfig::default()).is_err());
    }
}
