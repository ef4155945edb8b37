use crate::{models::*, Result};
use itertools::Itertools;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

pub struct OutputManager;

impl OutputManager {
    pub fn save_results<P: AsRef<Path>>(
        report: &MetaAnalysisReport,
        config: &AnalysisConfig,
        output_path: P,
    ) -> Result<()> {
        let output_dir = output_path.as_ref();
        fs::create_dir_all(output_dir)?;

        Self::save_forest_data(report, output_dir)?;
        Self::save_leave_one_out(report, output_dir)?;
        Self::save_subgroups(report, output_dir)?;
        Self::save_json_results(report, output_dir)?;
        Self::generate_analysis_report(report, config, output_dir)?;

        log::info!("Results saved to: {}", output_dir.display());
        Ok(())
    }

    fn save_forest_data(report: &MetaAnalysisReport, output_dir: &Path) -> Result<()> {
        let file_path = output_dir.join("forest_data.csv");
        let mut file = File::create(file_path)?;

        writeln!(file, "STUDY,EFFECT,CI_LOWER,CI_UPPER,WEIGHT_PERCENT")?;
        for weight in &report.pooled.per_study {
            writeln!(
                file,
                "{},{:.4},{:.4},{:.4},{:.2}",
                weight.name,
                weight.effect_size,
                weight.lower_ci,
                weight.upper_ci,
                weight.weight_percent
            )?;
        }
        writeln!(
            file,
            "POOLED,{:.4},{:.4},{:.4},100.00",
            report.pooled.pooled_effect, report.pooled.lower_ci, report.pooled.upper_ci
        )?;

        Ok(())
    }

    fn save_leave_one_out(report: &MetaAnalysisReport, output_dir: &Path) -> Result<()> {
        if report.leave_one_out.is_empty() {
            return Ok(());
        }

        let file_path = output_dir.join("leave_one_out.csv");
        let mut file = File::create(file_path)?;

        writeln!(
            file,
            "OMITTED_STUDY,POOLED_EFFECT,CI_LOWER,CI_UPPER,I_SQUARED,TAU_SQUARED"
        )?;
        for loo in &report.leave_one_out {
            writeln!(
                file,
                "{},{:.4},{:.4},{:.4},{:.1},{:.5}",
                loo.omitted_study,
                loo.result.pooled_effect,
                loo.result.lower_ci,
                loo.result.upper_ci,
                loo.result.i_squared,
                loo.result.tau_squared
            )?;
        }

        Ok(())
    }

    fn save_subgroups(report: &MetaAnalysisReport, output_dir: &Path) -> Result<()> {
        if report.subgroups.is_empty() {
            return Ok(());
        }

        let file_path = output_dir.join("subgroup_analysis.csv");
        let mut file = File::create(file_path)?;

        writeln!(
            file,
            "SUBGROUP,N_STUDIES,POOLED_EFFECT,CI_LOWER,CI_UPPER,I_SQUARED,P_VALUE"
        )?;
        for label in report.subgroups.keys().sorted() {
            let subgroup = &report.subgroups[label];
            writeln!(
                file,
                "{},{},{:.4},{:.4},{:.4},{:.1},{:.4}",
                subgroup.label,
                subgroup.n_studies,
                subgroup.pooled.pooled_effect,
                subgroup.pooled.lower_ci,
                subgroup.pooled.upper_ci,
                subgroup.pooled.i_squared,
                subgroup.pooled.p_value
            )?;
        }

        Ok(())
    }

    fn save_json_results(report: &MetaAnalysisReport, output_dir: &Path) -> Result<()> {
        let file_path = output_dir.join("complete_results.json");
        let json_string = serde_json::to_string_pretty(report)?;
        fs::write(file_path, json_string)?;
        Ok(())
    }

    fn heterogeneity_band(i_squared: f64) -> &'static str {
        if i_squared < 25.0 {
            "low"
        } else if i_squared < 50.0 {
            "moderate"
        } else if i_squared <= 75.0 {
            "substantial"
        } else {
            "considerable"
        }
    }

    fn generate_analysis_report(
        report: &MetaAnalysisReport,
        config: &AnalysisConfig,
        output_dir: &Path,
    ) -> Result<()> {
        let file_path = output_dir.join("analysis_report.txt");
        let mut file = File::create(file_path)?;

        writeln!(file, "RANDOM-EFFECTS META-ANALYSIS REPORT")?;
        writeln!(file, "===================================")?;
        writeln!(file, "Generated: {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(file)?;

        writeln!(file, "Analysis Configuration:")?;
        writeln!(
            file,
            "- Confidence level: {:.0}%",
            config.confidence_level * 100.0
        )?;
        writeln!(file, "- Minimum subgroup size: {}", config.min_subgroup_size)?;
        writeln!(file, "- Leave-one-out: {}", config.perform_leave_one_out)?;
        writeln!(file, "- Egger's test: {}", config.perform_eggers)?;
        writeln!(file)?;

        let pooled = &report.pooled;
        writeln!(file, "Pooled Estimate ({} studies):", report.n_studies)?;
        writeln!(
            file,
            "- Effect: {:.4} ({:.0}% CI {:.4} to {:.4})",
            pooled.pooled_effect,
            config.confidence_level * 100.0,
            pooled.lower_ci,
            pooled.upper_ci
        )?;
        writeln!(
            file,
            "- z = {:.3}, p = {:.4}",
            pooled.z_value, pooled.p_value
        )?;
        writeln!(file)?;

        writeln!(file, "Heterogeneity:")?;
        writeln!(
            file,
            "- Q = {:.3} (p = {:.4})",
            pooled.q_statistic, pooled.q_p_value
        )?;
        writeln!(
            file,
            "- I^2 = {:.1}% ({})",
            pooled.i_squared,
            Self::heterogeneity_band(pooled.i_squared)
        )?;
        writeln!(file, "- tau^2 = {:.5}", pooled.tau_squared)?;
        writeln!(file)?;

        if let Some(eggers) = &report.eggers {
            writeln!(file, "Publication Bias (Egger's test):")?;
            writeln!(
                file,
                "- Intercept: {:.4} (SE {:.4}), t = {:.3}, p = {:.4}",
                eggers.intercept, eggers.standard_error, eggers.t_value, eggers.p_value
            )?;
            writeln!(file)?;
        }

        if !report.subgroups.is_empty() {
            writeln!(file, "Subgroups:")?;
            for label in report.subgroups.keys().sorted() {
                let subgroup = &report.subgroups[label];
                writeln!(
                    file,
                    "- {} (n = {}): {:.4} ({:.4} to {:.4})",
                    subgroup.label,
                    subgroup.n_studies,
                    subgroup.pooled.pooled_effect,
                    subgroup.pooled.lower_ci,
                    subgroup.pooled.upper_ci
                )?;
            }
            writeln!(file)?;
        }

        if !report.warnings.is_empty() {
            writeln!(file, "Warnings:")?;
            for warning in &report.warnings {
                writeln!(file, "- {}", warning)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ReportBuilder;

    fn study(name: &str, effect: f64, se: f64, subgroup: Option<&str>) -> Study {
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
            subgroup: subgroup.map(|s| s.to_string()),
        }
    }

    #[test]
    fn test_save_results_writes_expected_files() {
        let studies = vec![
            study("A", 0.5, 0.10, Some("adults")),
            study("B", 0.6, 0.12, Some("adults")),
            study("C", 0.4, 0.15, Some("children")),
            study("D", 0.5, 0.09, Some("children")),
        ];
        let config = AnalysisConfig::default();
        let report = ReportBuilder::build_report(&studies, &config).unwrap();

        let dir = tempfile::tempdir().unwrap();
        OutputManager::save_results(&report, &config, dir.path()).unwrap();

        assert!(dir.path().join("forest_data.csv").exists());
        assert!(dir.path().join("leave_one_out.csv").exists());
        assert!(dir.path().join("subgroup_analysis.csv").exists());
        assert!(dir.path().join("complete_results.json").exists());
        assert!(dir.path().join("analysis_report.txt").exists());

        let json = std::fs::read_to_string(dir.path().join("complete_results.json")).unwrap();
        let parsed: MetaAnalysisReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.n_studies, 4);
    }

    #[test]
    fn test_optional_files_skipped_when_empty() {
        let studies = vec![study("A", 0.5, 0.1, None), study("B", 0.6, 0.1, None)];
        let config = AnalysisConfig::default();
        let report = ReportBuilder::build_report(&studies, &config).unwrap();

        let dir = tempfile::tempdir().unwrap();
        OutputManager::save_results(&report, &config, dir.path()).unwrap();

        assert!(!dir.path().join("leave_one_out.csv").exists());
        assert!(!dir.path().join("subgroup_analysis.csv").exists());
        assert!(dir.path().join("forest_data.csv").exists());
    }
}
