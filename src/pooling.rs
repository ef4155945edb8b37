use crate::{models::*, Result};
use statrs::distribution::{ChiSquared, ContinuousCDF, Normal};

pub struct MetaAnalyzer;

impl MetaAnalyzer {
    /// Pool study effect sizes under the DerSimonian-Laird random-effects model
    pub fn pool(studies: &[Study], config: &AnalysisConfig) -> Result<PooledResult> {
        if studies.is_empty() {
            return Err(crate::errors::MetaError::InvalidInput(
                "No studies available for pooling".to_string(),
            ));
        }

        for study in studies {
            if !study.standard_error.is_finite() || study.standard_error <= 0.0 {
                return Err(crate::errors::MetaError::InvalidInput(format!(
                    "Study {} has non-positive standard error ({})",
                    study.name, study.standard_error
                )));
            }
            if !study.effect_size.is_finite() {
                return Err(crate::errors::MetaError::InvalidInput(format!(
                    "Study {} has non-finite effect size",
                    study.name
                )));
            }
        }

        let n = studies.len();

        // Fixed-effect weights
        let fe_weights: Vec<f64> = studies.iter().map(|s| 1.0 / s.variance()).collect();
        let sum_w: f64 = fe_weights.iter().sum();
        let fe_pooled: f64 = studies
            .iter()
            .zip(fe_weights.iter())
            .map(|(s, w)| w * s.effect_size)
            .sum::<f64>()
            / sum_w;

        // Cochran's Q against the fixed-effect estimate
        let q_statistic: f64 = studies
            .iter()
            .zip(fe_weights.iter())
            .map(|(s, w)| w * (s.effect_size - fe_pooled).powi(2))
            .sum();
        let df = (n - 1) as f64;

        let q_p_value = if n > 1 {
            let chi_sq = ChiSquared::new(df).map_err(|e| {
                crate::errors::MetaError::CalculationError(format!(
                    "Chi-squared distribution setup failed: {}",
                    e
                ))
            })?;
            1.0 - chi_sq.cdf(q_statistic)
        } else {
            1.0
        };

        // Between-study variance (DerSimonian-Laird moment estimator)
        let sum_w_sq: f64 = fe_weights.iter().map(|w| w * w).sum();
        let c = sum_w - sum_w_sq / sum_w;
        let tau_squared = if n > 1 && c > 0.0 {
            ((q_statistic - df) / c).max(0.0)
        } else {
            0.0
        };

        let i_squared = if q_statistic > 0.0 && n > 1 {
            (((q_statistic - df) / q_statistic) * 100.0).max(0.0)
        } else {
            0.0
        };

        // Random-effects weights incorporate tau-squared
        let re_weights: Vec<f64> = studies
            .iter()
            .map(|s| 1.0 / (s.variance() + tau_squared))
            .collect();
        let sum_re_w: f64 = re_weights.iter().sum();

        let pooled_effect: f64 = studies
            .iter()
            .zip(re_weights.iter())
            .map(|(s, w)| w * s.effect_size)
            .sum::<f64>()
            / sum_re_w;
        let pooled_se = (1.0 / sum_re_w).sqrt();

        let normal = Normal::new(0.0, 1.0).map_err(|e| {
            crate::errors::MetaError::CalculationError(format!(
                "Normal distribution setup failed: {}",
                e
            ))
        })?;
        let z_crit = normal.inverse_cdf(0.5 + config.confidence_level / 2.0);

        let lower_ci = pooled_effect - z_crit * pooled_se;
        let upper_ci = pooled_effect + z_crit * pooled_se;

        let z_value = pooled_effect / pooled_se;
        let p_value = 2.0 * (1.0 - normal.cdf(z_value.abs()));

        let per_study = studies
            .iter()
            .zip(re_weights.iter())
            .map(|(s, w)| StudyWeight {
                name: s.name.clone(),
                effect_size: s.effect_size,
                lower_ci: s.effect_size - z_crit * s.standard_error,
                upper_ci: s.effect_size + z_crit * s.standard_error,
                weight_percent: w / sum_re_w * 100.0,
            })
            .collect();

        Ok(PooledResult {
            pooled_effect,
            pooled_se,
            lower_ci,
            upper_ci,
            z_value,
            p_value,
            i_squared,
            q_statistic,
            q_p_value,
            tau_squared,
            per_study,
        })
    }
}
