use anyhow::Context;
use clap::{Arg, Command};
use itertools::Itertools;
use meta_analysis::{
    analysis::ReportBuilder, example_data::ExampleDataGenerator, models::*,
    output::OutputManager, parser::StudyParser,
};
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let matches = Command::new("Meta-Analysis Tool")
        .version("1.0")
        .author("Research Statistics Suite")
        .about("Random-effects meta-analysis with sensitivity and publication-bias diagnostics")
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .value_name("FILE")
                .help("Input study-level CSV dataset")
                .required_unless_present("generate-example"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("DIR")
                .help("Output directory for results")
                .default_value("./meta_results"),
        )
        .arg(
            Arg::new("generate-example")
                .long("generate-example")
                .help("Generate an example dataset and analyze it")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("studies")
                .short('n')
                .long("studies")
                .value_name("NUMBER")
                .help("Number of studies for the example dataset")
                .default_value("15"),
        )
        .arg(
            Arg::new("confidence")
                .long("confidence")
                .value_name("LEVEL")
                .help("Confidence level for all intervals")
                .default_value("0.95"),
        )
        .arg(
            Arg::new("min-subgroup")
                .long("min-subgroup")
                .value_name("NUMBER")
                .help("Minimum number of studies per subgroup")
                .default_value("2"),
        )
        .arg(
            Arg::new("skip-leave-one-out")
                .long("skip-leave-one-out")
                .help("Skip the leave-one-out sensitivity analysis")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("skip-eggers")
                .long("skip-eggers")
                .help("Skip Egger's regression test for small-study effects")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let output_dir = PathBuf::from(matches.get_one::<String>("output").unwrap());

    if matches.get_flag("generate-example") {
        let n_studies: usize = matches
            .get_one::<String>("studies")
            .unwrap()
            .parse()
            .context("Invalid number of studies")?;

        let example_file = output_dir.join("example_studies.csv");
        std::fs::create_dir_all(&output_dir)?;

        ExampleDataGenerator::generate_dataset(&example_file, n_studies)?;
        println!("Generated example dataset: {}", example_file.display());

        if !matches.contains_id("input") {
            return run_analysis(&example_file, &output_dir, &matches);
        }
    }

    if let Some(input_file) = matches.get_one::<String>("input") {
        let input_path = PathBuf::from(input_file);
        run_analysis(&input_path, &output_dir, &matches)
    } else {
        println!("No input file specified. Use --generate-example to create sample data.");
        Ok(())
    }
}

fn run_analysis(
    input_path: &PathBuf,
    output_dir: &PathBuf,
    matches: &clap::ArgMatches,
) -> anyhow::Result<()> {
    println!("Starting meta-analysis...");
    println!("Input file: {}", input_path.display());
    println!("Output directory: {}", output_dir.display());

    let config = create_analysis_config(matches, output_dir)?;

    println!("Parsing dataset...");
    let studies = StudyParser::parse_dataset(input_path)
        .with_context(|| format!("Failed to parse {}", input_path.display()))?;
    println!("Loaded {} studies", studies.len());

    println!("Pooling studies...");
    let start_time = std::time::Instant::now();

    let report = ReportBuilder::build_report(&studies, &config)?;

    let duration = start_time.elapsed();
    println!("Analysis completed in {:.2} seconds", duration.as_secs_f64());

    println!("Saving results...");
    OutputManager::save_results(&report, &config, output_dir)?;

    print_analysis_summary(&report, &config);

    Ok(())
}

fn create_analysis_config(
    matches: &clap::ArgMatches,
    output_dir: &PathBuf,
) -> anyhow::Result<AnalysisConfig> {
    let confidence_level: f64 = matches
        .get_one::<String>("confidence")
        .unwrap()
        .parse()
        .context("Invalid confidence level")?;
    anyhow::ensure!(
        confidence_level > 0.0 && confidence_level < 1.0,
        "Confidence level must be strictly between 0 and 1"
    );

    let min_subgroup_size: usize = matches
        .get_one::<String>("min-subgroup")
        .unwrap()
        .parse()
        .context("Invalid minimum subgroup size")?;

    Ok(AnalysisConfig {
        confidence_level,
        min_subgroup_size,
        perform_leave_one_out: !matches.get_flag("skip-leave-one-out"),
        perform_eggers: !matches.get_flag("skip-eggers"),
        output_path: output_dir.to_string_lossy().to_string(),
    })
}

fn print_analysis_summary(report: &MetaAnalysisReport, config: &AnalysisConfig) {
    println!("\n=== ANALYSIS SUMMARY ===");
    println!("Studies analyzed: {}", report.n_studies);

    let pooled = &report.pooled;
    println!(
        "\nPooled effect: {:.4} ({:.0}% CI {:.4} to {:.4})",
        pooled.pooled_effect,
        config.confidence_level * 100.0,
        pooled.lower_ci,
        pooled.upper_ci
    );
    println!("z = {:.3}, p = {:.4}", pooled.z_value, pooled.p_value);
    println!(
        "Heterogeneity: I^2 = {:.1}%, tau^2 = {:.5}, Q = {:.3} (p = {:.4})",
        pooled.i_squared, pooled.tau_squared, pooled.q_statistic, pooled.q_p_value
    );

    if let Some(eggers) = &report.eggers {
        println!(
            "\nEgger's test: intercept = {:.4}, t = {:.3}, p = {:.4}",
            eggers.intercept, eggers.t_value, eggers.p_value
        );
    }

    if !report.subgroups.is_empty() {
        println!("\nSubgroup Summary:");
        for label in report.subgroups.keys().sorted() {
            let subgroup = &report.subgroups[label];
            println!(
                "  {} (n = {}): {:.4} ({:.4} to {:.4})",
                subgroup.label,
                subgroup.n_studies,
                subgroup.pooled.pooled_effect,
                subgroup.pooled.lower_ci,
                subgroup.pooled.upper_ci
            );
        }
    }

    if !report.warnings.is_empty() {
        println!("\nWarnings:");
        for warning in &report.warnings {
            println!("  - {}", warning);
        }
    }

    println!("\nResults saved to output directory.");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_example_data_generation() {
        let temp_dir = TempDir::new().unwrap();
        let example_file = temp_dir.path().join("test_dataset.csv");

        ExampleDataGenerator::generate_dataset(&example_file, 5).unwrap();
        assert!(example_file.exists());
    }

    #[test]
    fn test_dataset_parsing() {
        let temp_dir = TempDir::new().unwrap();
        let example_file = temp_dir.path().join("test_dataset.csv");

        ExampleDataGenerator::generate_dataset(&example_file, 6).unwrap();
        let studies = StudyParser::parse_dataset(&example_file).unwrap();

        assert_eq!(studies.len(), 6);
        assert!(studies.iter().all(|s| s.standard_error > 0.0));
    }
}
