use crate::models::*;
use statrs::distribution::{ContinuousCDF, Normal};

/// Annual stroke risk (%) by CHA2DS2-VASc score, from the Swedish cohort data.
const CHADS_VASC_STROKE_RISK: [f64; 10] = [0.0, 1.3, 2.2, 3.2, 4.0, 6.7, 9.8, 9.6, 6.7, 15.2];

pub struct ClinicalCalculator;

impl ClinicalCalculator {
    /// Number needed to treat from control and treatment event rates.
    ///
    /// A zero risk difference yields an infinite NNT. When group sizes are
    /// supplied and the risk-difference interval excludes zero, a 95% CI
    /// for the NNT is reported.
    pub fn nnt(
        control_event_rate: f64,
        treatment_event_rate: f64,
        n_control: Option<usize>,
        n_treatment: Option<usize>,
    ) -> NntResult {
        let arr = control_event_rate - treatment_event_rate;
        let rrr = if control_event_rate != 0.0 {
            arr / control_event_rate
        } else {
            0.0
        };

        let nnt = if arr == 0.0 {
            f64::INFINITY
        } else {
            (1.0 / arr).abs()
        };

        let ci95 = match (n_control, n_treatment) {
            (Some(nc), Some(nt)) if nc > 0 && nt > 0 && arr != 0.0 => {
                let se = (control_event_rate * (1.0 - control_event_rate) / nc as f64
                    + treatment_event_rate * (1.0 - treatment_event_rate) / nt as f64)
                    .sqrt();
                let lower_arr = arr - 1.96 * se;
                let upper_arr = arr + 1.96 * se;
                if lower_arr > 0.0 || upper_arr < 0.0 {
                    let a = (1.0 / lower_arr).abs();
                    let b = (1.0 / upper_arr).abs();
                    Some((a.min(b), a.max(b)))
                } else {
                    None
                }
            }
            _ => None,
        };

        let interpretation = if arr == 0.0 {
            "No difference in event rates between treatment and control".to_string()
        } else if arr > 0.0 {
            format!(
                "Treat {} patients to prevent one additional event",
                nnt.ceil() as u64
            )
        } else {
            format!(
                "Harm: one additional adverse event per {} patients treated (NNH)",
                nnt.ceil() as u64
            )
        };

        NntResult {
            nnt,
            arr,
            rrr,
            ci95,
            interpretation,
        }
    }

    /// Estimated GFR by the 2021 race-free CKD-EPI equations.
    ///
    /// Uses the creatinine-only equation, or the creatinine-cystatin C
    /// combination when a cystatin C value is supplied.
    pub fn egfr_ckd_epi(
        creatinine_mg_per_dl: f64,
        age: u32,
        sex: Sex,
        cystatin_c_mg_per_l: Option<f64>,
    ) -> EgfrResult {
        let (kappa, alpha_cr, female_factor) = match sex {
            Sex::Female => (0.7, -0.241, 1.012),
            Sex::Male => (0.9, -0.302, 1.0),
        };
        let scr_ratio = creatinine_mg_per_dl / kappa;

        let egfr = match cystatin_c_mg_per_l {
            Some(cystatin) => {
                let alpha_combined = match sex {
                    Sex::Female => -0.219,
                    Sex::Male => -0.144,
                };
                let female_combined = match sex {
                    Sex::Female => 0.963,
                    Sex::Male => 1.0,
                };
                let cys_ratio = cystatin / 0.8;
                135.0
                    * scr_ratio.min(1.0).powf(alpha_combined)
                    * scr_ratio.max(1.0).powf(-0.544)
                    * cys_ratio.min(1.0).powf(-0.323)
                    * cys_ratio.max(1.0).powf(-0.778)
                    * 0.9961_f64.powi(age as i32)
                    * female_combined
            }
            None => {
                142.0
                    * scr_ratio.min(1.0).powf(alpha_cr)
                    * scr_ratio.max(1.0).powf(-1.200)
                    * 0.993_f64.powi(age as i32)
                    * female_factor
            }
        };
        let egfr = (egfr * 10.0).round() / 10.0;

        let (ckd_stage, description) = if egfr >= 90.0 {
            (CkdStage::G1, "normal or high kidney function")
        } else if egfr >= 60.0 {
            (CkdStage::G2, "mildly decreased kidney function")
        } else if egfr >= 45.0 {
            (CkdStage::G3a, "mildly to moderately decreased kidney function")
        } else if egfr >= 30.0 {
            (CkdStage::G3b, "moderately to severely decreased kidney function")
        } else if egfr >= 15.0 {
            (CkdStage::G4, "severely decreased kidney function")
        } else {
            (CkdStage::G5, "kidney failure")
        };

        EgfrResult {
            egfr,
            ckd_stage,
            interpretation: format!("{:?}: {}", ckd_stage, description),
        }
    }

    /// CURB-65 pneumonia severity score.
    pub fn curb65(input: &Curb65Input) -> Curb65Result {
        let mut score = 0u8;
        if input.confusion {
            score += 1;
        }
        if input.urea_mmol_per_l > 7.0 {
            score += 1;
        }
        if input.respiratory_rate >= 30 {
            score += 1;
        }
        if input.systolic_bp < 90.0 || input.diastolic_bp <= 60.0 {
            score += 1;
        }
        if input.age >= 65 {
            score += 1;
        }

        let (risk_category, recommendation) = match score {
            0 | 1 => (
                "Low risk",
                "Outpatient treatment is usually appropriate",
            ),
            2 => (
                "Moderate risk",
                "Consider short inpatient stay or supervised outpatient treatment",
            ),
            _ => (
                "High risk",
                "Hospitalize and assess for intensive care admission",
            ),
        };

        Curb65Result {
            score,
            risk_category: risk_category.to_string(),
            recommendation: recommendation.to_string(),
        }
    }

    /// Wells score for deep vein thrombosis.
    pub fn wells_dvt(input: &WellsDvtInput) -> WellsDvtResult {
        let criteria = [
            input.active_cancer,
            input.paralysis_or_immobilization,
            input.bedridden_or_major_surgery,
            input.localized_tenderness,
            input.entire_leg_swollen,
            input.calf_swelling_over_3cm,
            input.pitting_edema,
            input.collateral_superficial_veins,
            input.previous_dvt,
        ];
        let mut score: i8 = criteria.iter().filter(|&&c| c).count() as i8;
        if input.alternative_diagnosis_likely {
            score -= 2;
        }

        let (risk_category, recommendation) = if score >= 3 {
            (
                "High probability",
                "Proceed directly to ultrasound imaging",
            )
        } else if score >= 1 {
            (
                "Moderate probability",
                "High-sensitivity D-dimer or ultrasound imaging",
            )
        } else {
            (
                "Low probability",
                "D-dimer testing to rule out DVT",
            )
        };

        WellsDvtResult {
            score,
            risk_category: risk_category.to_string(),
            recommendation: recommendation.to_string(),
        }
    }

    /// CHA2DS2-VASc stroke risk score for atrial fibrillation.
    pub fn chads_vasc(input: &ChadsVascInput) -> ChadsVascResult {
        let mut score = 0u8;
        if input.congestive_heart_failure {
            score += 1;
        }
        if input.hypertension {
            score += 1;
        }
        if input.age >= 75 {
            score += 2;
        } else if input.age >= 65 {
            score += 1;
        }
        if input.diabetes {
            score += 1;
        }
        if input.stroke_or_tia {
            score += 2;
        }
        if input.vascular_disease {
            score += 1;
        }
        if input.female {
            score += 1;
        }

        let annual_stroke_risk_percent = CHADS_VASC_STROKE_RISK[score.min(9) as usize];

        let (risk_category, recommendation) = match score {
            0 => ("Low risk", "No antithrombotic therapy indicated"),
            1 => ("Moderate risk", "Consider oral anticoagulation"),
            _ => ("High risk", "Oral anticoagulation recommended"),
        };

        ChadsVascResult {
            score,
            annual_stroke_risk_percent,
            risk_category: risk_category.to_string(),
            recommendation: recommendation.to_string(),
        }
    }

    /// APACHE II acute physiology score (the 12-variable physiology component).
    pub fn apache_ii_aps(physiology: &ApachePhysiology) -> ApacheResult {
        let mut score = 0u8;

        score += Self::band(
            physiology.temperature_celsius,
            &[
                (41.0, 4),
                (39.0, 3),
                (38.5, 1),
                (36.0, 0),
                (34.0, 1),
                (32.0, 2),
                (30.0, 3),
            ],
            4,
        );
        score += Self::band(
            physiology.mean_arterial_pressure,
            &[(160.0, 4), (130.0, 3), (110.0, 2), (70.0, 0), (50.0, 2)],
            4,
        );
        score += Self::band(
            physiology.heart_rate,
            &[
                (180.0, 4),
                (140.0, 3),
                (110.0, 2),
                (70.0, 0),
                (55.0, 2),
                (40.0, 3),
            ],
            4,
        );
        score += Self::band(
            physiology.respiratory_rate,
            &[
                (50.0, 4),
                (35.0, 3),
                (25.0, 1),
                (12.0, 0),
                (10.0, 1),
                (6.0, 2),
            ],
            4,
        );
        score += Self::oxygenation_points(physiology);
        score += Self::band(
            physiology.arterial_ph,
            &[
                (7.7, 4),
                (7.6, 3),
                (7.5, 1),
                (7.33, 0),
                (7.25, 2),
                (7.15, 3),
            ],
            4,
        );
        score += Self::band(
            physiology.sodium,
            &[
                (180.0, 4),
                (160.0, 3),
                (155.0, 2),
                (150.0, 1),
                (130.0, 0),
                (120.0, 2),
                (111.0, 3),
            ],
            4,
        );
        score += Self::band(
            physiology.potassium,
            &[
                (7.0, 4),
                (6.0, 3),
                (5.5, 1),
                (3.5, 0),
                (3.0, 1),
                (2.5, 2),
            ],
            4,
        );

        let creatinine_points =
            Self::band(physiology.creatinine_mg_per_dl, &[(3.5, 4), (2.0, 3), (1.5, 2), (0.6, 0)], 2);
        score += if physiology.acute_renal_failure {
            creatinine_points * 2
        } else {
            creatinine_points
        };

        score += Self::band(
            physiology.hematocrit,
            &[(60.0, 4), (50.0, 2), (46.0, 1), (30.0, 0), (20.0, 2)],
            4,
        );
        score += Self::band(
            physiology.white_blood_count,
            &[(40.0, 4), (20.0, 2), (15.0, 1), (3.0, 0), (1.0, 2)],
            4,
        );
        score += 15 - physiology.glasgow_coma_scale.min(15);

        let interpretation = if score < 10 {
            "Mild physiologic derangement"
        } else if score < 20 {
            "Moderate physiologic derangement"
        } else if score < 30 {
            "Severe physiologic derangement"
        } else {
            "Very severe physiologic derangement"
        };

        ApacheResult {
            score,
            interpretation: interpretation.to_string(),
        }
    }

    /// Points from a descending threshold table: the first threshold the
    /// value reaches wins, values below every threshold take the floor score.
    fn band(value: f64, thresholds: &[(f64, u8)], below_all: u8) -> u8 {
        for &(cutoff, points) in thresholds {
            if value >= cutoff {
                return points;
            }
        }
        below_all
    }

    fn oxygenation_points(physiology: &ApachePhysiology) -> u8 {
        if physiology.fio2 >= 0.5 {
            let gradient = physiology.aa_gradient.unwrap_or(0.0);
            Self::band(gradient, &[(500.0, 4), (350.0, 3), (200.0, 2)], 0)
        } else if physiology.pao2 > 70.0 {
            0
        } else if physiology.pao2 > 60.0 {
            1
        } else if physiology.pao2 >= 55.0 {
            3
        } else {
            4
        }
    }

    /// Wilson score confidence interval for a binomial proportion.
    pub fn wilson_interval(events: usize, total: usize, confidence_level: f64) -> ProportionCi {
        if total == 0 {
            return ProportionCi {
                proportion: 0.0,
                lower: 0.0,
                upper: 1.0,
            };
        }

        let n = total as f64;
        let p_hat = events as f64 / n;
        let normal = Normal::new(0.0, 1.0).unwrap();
        let z = normal.inverse_cdf(0.5 + confidence_level / 2.0);
        let z_sq = z * z;

        let denominator = 1.0 + z_sq / n;
        let center = (p_hat + z_sq / (2.0 * n)) / denominator;
        let half_width =
            z * (p_hat * (1.0 - p_hat) / n + z_sq / (4.0 * n * n)).sqrt() / denominator;

        ProportionCi {
            proportion: p_hat,
            lower: (center - half_width).max(0.0),
            upper: (center + half_width).min(1.0),
        }
    }

    /// Diagnostic accuracy measures from a 2x2 confusion table.
    pub fn diagnostic_test(
        true_positives: usize,
        false_positives: usize,
        false_negatives: usize,
        true_negatives: usize,
    ) -> DiagnosticTestResult {
        let tp = true_positives as f64;
        let fp = false_positives as f64;
        let fn_ = false_negatives as f64;
        let tn = true_negatives as f64;
        let total = tp + fp + fn_ + tn;

        let sensitivity = tp / (tp + fn_);
        let specificity = tn / (tn + fp);
        let ppv = tp / (tp + fp);
        let npv = tn / (tn + fn_);

        let plr = if specificity >= 1.0 {
            f64::INFINITY
        } else {
            sensitivity / (1.0 - specificity)
        };
        let nlr = if specificity == 0.0 {
            f64::INFINITY
        } else {
            (1.0 - sensitivity) / specificity
        };

        DiagnosticTestResult {
            sensitivity: Self::round(sensitivity, 3),
            specificity: Self::round(specificity, 3),
            ppv: Self::round(ppv, 3),
            npv: Self::round(npv, 3),
            plr: Self::round(plr, 2),
            nlr: Self::round(nlr, 2),
            accuracy: Self::round((tp + tn) / total, 3),
            prevalence: Self::round((tp + fn_) / total, 3),
        }
    }

    fn round(value: f64, decimals: i32) -> f64 {
        if value.is_finite() {
            let factor = 10_f64.powi(decimals);
            (value * factor).round() / factor
        } else {
            value
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nnt_benefit() {
        let result = ClinicalCalculator::nnt(0.20, 0.10, None, None);
        assert!((result.arr - 0.10).abs() < 1e-12);
        assert!((result.rrr - 0.5).abs() < 1e-12);
        assert!((result.nnt - 10.0).abs() < 1e-9);
        assert!(result.interpretation.contains("prevent"));
    }

    #[test]
    fn test_nnt_no_difference_is_infinite() {
        let result = ClinicalCalculator::nnt(0.15, 0.15, None, None);
        assert!(result.nnt.is_infinite());
        assert!(result.interpretation.contains("No difference"));
    }

    #[test]
    fn test_nnt_harm_reported_as_nnh() {
        let result = ClinicalCalculator::nnt(0.10, 0.20, None, None);
        assert!(result.arr < 0.0);
        assert!(result.interpretation.contains("NNH"));
    }

    #[test]
    fn test_nnt_ci_present_for_clear_benefit() {
        let result = ClinicalCalculator::nnt(0.30, 0.10, Some(500), Some(500));
        let (lower, upper) = result.ci95.unwrap();
        assert!(lower < 5.0 && 5.0 < upper);
    }

    #[test]
    fn test_egfr_healthy_male() {
        let result = ClinicalCalculator::egfr_ckd_epi(1.0, 50, Sex::Male, None);
        assert!(result.egfr > 60.0 && result.egfr < 90.0);
        assert_eq!(result.ckd_stage, CkdStage::G2);
    }

    #[test]
    fn test_egfr_kidney_failure() {
        let result = ClinicalCalculator::egfr_ckd_epi(8.0, 70, Sex::Male, None);
        assert!(result.egfr < 15.0);
        assert_eq!(result.ckd_stage, CkdStage::G5);
    }

    #[test]
    fn test_egfr_female_factor_raises_estimate() {
        let male = ClinicalCalculator::egfr_ckd_epi(1.4, 60, Sex::Male, None);
        let female = ClinicalCalculator::egfr_ckd_epi(1.4, 60, Sex::Female, None);
        // Same creatinine maps to a lower eGFR for females (lower kappa)
        assert!(female.egfr < male.egfr);
    }

    #[test]
    fn test_curb65_low_risk() {
        let input = Curb65Input {
            confusion: false,
            urea_mmol_per_l: 5.0,
            respiratory_rate: 18,
            systolic_bp: 120.0,
            diastolic_bp: 80.0,
            age: 40,
        };
        let result = ClinicalCalculator::curb65(&input);
        assert_eq!(result.score, 0);
        assert_eq!(result.risk_category, "Low risk");
    }

    #[test]
    fn test_curb65_all_criteria() {
        let input = Curb65Input {
            confusion: true,
            urea_mmol_per_l: 9.0,
            respiratory_rate: 32,
            systolic_bp: 85.0,
            diastolic_bp: 55.0,
            age: 80,
        };
        let result = ClinicalCalculator::curb65(&input);
        assert_eq!(result.score, 5);
        assert_eq!(result.risk_category, "High risk");
    }

    #[test]
    fn test_wells_alternative_diagnosis_subtracts() {
        let input = WellsDvtInput {
            active_cancer: true,
            localized_tenderness: true,
            alternative_diagnosis_likely: true,
            ..Default::default()
        };
        let result = ClinicalCalculator::wells_dvt(&input);
        assert_eq!(result.score, 0);
        assert_eq!(result.risk_category, "Low probability");
    }

    #[test]
    fn test_wells_high_probability() {
        let input = WellsDvtInput {
            active_cancer: true,
            entire_leg_swollen: true,
            previous_dvt: true,
            ..Default::default()
        };
        let result = ClinicalCalculator::wells_dvt(&input);
        assert_eq!(result.score, 3);
        assert_eq!(result.risk_category, "High probability");
    }

    #[test]
    fn test_chads_vasc_zero_score() {
        let input = ChadsVascInput {
            age: 50,
            ..Default::default()
        };
        let result = ClinicalCalculator::chads_vasc(&input);
        assert_eq!(result.score, 0);
        assert_eq!(result.annual_stroke_risk_percent, 0.0);
        assert_eq!(result.risk_category, "Low risk");
    }

    #[test]
    fn test_chads_vasc_elderly_female_with_stroke() {
        let input = ChadsVascInput {
            age: 78,
            female: true,
            stroke_or_tia: true,
            hypertension: true,
            ..Default::default()
        };
        let result = ClinicalCalculator::chads_vasc(&input);
        // 2 (age) + 1 (female) + 2 (stroke) + 1 (hypertension)
        assert_eq!(result.score, 6);
        assert!((result.annual_stroke_risk_percent - 9.8).abs() < 1e-12);
        assert_eq!(result.risk_category, "High risk");
    }

    fn normal_physiology() -> ApachePhysiology {
        ApachePhysiology {
            temperature_celsius: 37.0,
            mean_arterial_pressure: 90.0,
            heart_rate: 80.0,
            respiratory_rate: 16.0,
            fio2: 0.21,
            pao2: 95.0,
            aa_gradient: None,
            arterial_ph: 7.40,
            sodium: 140.0,
            potassium: 4.2,
            creatinine_mg_per_dl: 1.0,
            acute_renal_failure: false,
            hematocrit: 42.0,
            white_blood_count: 8.0,
            glasgow_coma_scale: 15,
        }
    }

    #[test]
    fn test_apache_normal_physiology_scores_zero() {
        let result = ClinicalCalculator::apache_ii_aps(&normal_physiology());
        assert_eq!(result.score, 0);
    }

    #[test]
    fn test_apache_renal_failure_doubles_creatinine_points() {
        let mut physiology = normal_physiology();
        physiology.creatinine_mg_per_dl = 2.5;

        let without_arf = ClinicalCalculator::apache_ii_aps(&physiology);
        physiology.acute_renal_failure = true;
        let with_arf = ClinicalCalculator::apache_ii_aps(&physiology);

        assert_eq!(without_arf.score, 3);
        assert_eq!(with_arf.score, 6);
    }

    #[test]
    fn test_apache_gcs_contributes_inverted() {
        let mut physiology = normal_physiology();
        physiology.glasgow_coma_scale = 9;
        let result = ClinicalCalculator::apache_ii_aps(&physiology);
        assert_eq!(result.score, 6);
    }

    #[test]
    fn test_apache_aa_gradient_used_at_high_fio2() {
        let mut physiology = normal_physiology();
        physiology.fio2 = 0.6;
        physiology.aa_gradient = Some(400.0);
        let result = ClinicalCalculator::apache_ii_aps(&physiology);
        assert_eq!(result.score, 3);
    }

    #[test]
    fn test_wilson_interval_matches_reference() {
        let ci = ClinicalCalculator::wilson_interval(45, 100, 0.95);
        assert!((ci.proportion - 0.45).abs() < 1e-12);
        assert!((ci.lower - 0.356).abs() < 0.001);
        assert!((ci.upper - 0.548).abs() < 0.001);
    }

    #[test]
    fn test_wilson_interval_extreme_proportions_stay_bounded() {
        let all = ClinicalCalculator::wilson_interval(10, 10, 0.95);
        assert!(all.upper <= 1.0);
        assert!(all.lower < 1.0);

        let none = ClinicalCalculator::wilson_interval(0, 10, 0.95);
        assert!(none.lower >= 0.0);
        assert!(none.upper > 0.0);
    }

    #[test]
    fn test_diagnostic_test_basic() {
        let result = ClinicalCalculator::diagnostic_test(90, 10, 10, 90);
        assert!((result.sensitivity - 0.9).abs() < 1e-12);
        assert!((result.specificity - 0.9).abs() < 1e-12);
        assert!((result.plr - 9.0).abs() < 1e-12);
        assert!((result.accuracy - 0.9).abs() < 1e-12);
        assert!((result.prevalence - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_diagnostic_test_perfect_specificity_gives_infinite_plr() {
        let result = ClinicalCalculator::diagnostic_test(80, 0, 20, 100);
        assert!(result.plr.is_infinite());
    }
}
