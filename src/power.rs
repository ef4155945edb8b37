use crate::{errors::MetaError, models::*, Result};
use statrs::distribution::{ContinuousCDF, Normal};

pub struct PowerCalculator;

impl PowerCalculator {
    /// Required sample size for the requested design, power and alpha.
    ///
    /// Effect sizes are standardized: Cohen's d for mean comparisons,
    /// Cohen's h for proportions, Pearson r for correlations. Group sizes
    /// are reported for two-group designs; the second group is scaled by
    /// the allocation ratio.
    pub fn sample_size(request: &SampleSizeRequest) -> Result<SampleSizeEstimate> {
        Self::validate_request(request)?;

        let z_alpha = Self::critical_z_alpha(request.alpha, request.tails)?;
        let z_beta = Self::critical_z_beta(request.power)?;
        let z_sum = z_alpha + z_beta;

        match request.study_type {
            StudyDesign::TwoMeans => {
                let base = (z_sum / request.effect_size).powi(2);
                let (n1, n2) = Self::allocate_groups(base, request.ratio);
                Ok(SampleSizeEstimate {
                    total: n1 + n2,
                    group_sizes: Some((n1, n2)),
                })
            }
            StudyDesign::TwoProportions => {
                let base = z_sum.powi(2) / (2.0 * request.effect_size.powi(2));
                let (n1, n2) = Self::allocate_groups(base, request.ratio);
                Ok(SampleSizeEstimate {
                    total: n1 + n2,
                    group_sizes: Some((n1, n2)),
                })
            }
            StudyDesign::Correlation => {
                let fisher_z = request.effect_size.atanh();
                let n = (z_sum / fisher_z).powi(2) + 3.0;
                Ok(SampleSizeEstimate {
                    total: Self::ceil_at_least_one(n),
                    group_sizes: None,
                })
            }
            StudyDesign::OneSampleMean => {
                let n = (z_sum / request.effect_size).powi(2);
                Ok(SampleSizeEstimate {
                    total: Self::ceil_at_least_one(n),
                    group_sizes: None,
                })
            }
            StudyDesign::Paired => {
                let n = 2.0 * (z_sum / request.effect_size).powi(2);
                Ok(SampleSizeEstimate {
                    total: Self::ceil_at_least_one(n),
                    group_sizes: None,
                })
            }
        }
    }

    /// Achieved power at a given total sample size for the requested design.
    pub fn power(request: &SampleSizeRequest, total_n: u64) -> Result<f64> {
        Self::validate_effect(request)?;
        if !(request.alpha > 0.0 && request.alpha < 1.0) {
            return Err(MetaError::InvalidInput(format!(
                "Alpha must be in (0, 1), got {}",
                request.alpha
            )));
        }
        if total_n == 0 {
            return Err(MetaError::InvalidInput(
                "Total sample size must be positive".to_string(),
            ));
        }

        let n = total_n as f64;
        let noncentrality = match request.study_type {
            StudyDesign::TwoMeans | StudyDesign::Paired => {
                request.effect_size.abs() * (n / 2.0).sqrt()
            }
            StudyDesign::TwoProportions => request.effect_size.abs() * n.sqrt(),
            StudyDesign::Correlation => {
                if total_n <= 3 {
                    return Err(MetaError::InsufficientData(
                        "Correlation power requires more than 3 observations".to_string(),
                    ));
                }
                request.effect_size.atanh().abs() * (n - 3.0).sqrt()
            }
            StudyDesign::OneSampleMean => request.effect_size.abs() * n.sqrt(),
        };

        let z_alpha = Self::critical_z_alpha(request.alpha, request.tails)?;
        let normal = Self::standard_normal()?;
        Ok(normal.cdf(noncentrality - z_alpha).clamp(0.0, 1.0))
    }

    fn validate_request(request: &SampleSizeRequest) -> Result<()> {
        Self::validate_effect(request)?;

        if !(request.power > 0.0 && request.power < 1.0) {
            return Err(MetaError::InvalidInput(format!(
                "Power must be in (0, 1), got {}",
                request.power
            )));
        }
        if !(request.alpha > 0.0 && request.alpha < 1.0) {
            return Err(MetaError::InvalidInput(format!(
                "Alpha must be in (0, 1), got {}",
                request.alpha
            )));
        }
        if !(request.ratio > 0.0) || !request.ratio.is_finite() {
            return Err(MetaError::InvalidInput(format!(
                "Allocation ratio must be positive, got {}",
                request.ratio
            )));
        }

        Ok(())
    }

    fn validate_effect(request: &SampleSizeRequest) -> Result<()> {
        if !request.effect_size.is_finite() || request.effect_size == 0.0 {
            return Err(MetaError::InvalidInput(
                "Effect size must be finite and non-zero".to_string(),
            ));
        }
        if request.study_type == StudyDesign::Correlation && request.effect_size.abs() >= 1.0 {
            return Err(MetaError::InvalidInput(format!(
                "Correlation effect size must lie strictly between -1 and 1, got {}",
                request.effect_size
            )));
        }
        Ok(())
    }

    fn allocate_groups(base_per_group: f64, ratio: f64) -> (u64, u64) {
        let n1 = Self::ceil_at_least_one(base_per_group);
        let n2 = Self::ceil_at_least_one(base_per_group * ratio);
        (n1, n2)
    }

    fn ceil_at_least_one(n: f64) -> u64 {
        (n.ceil() as u64).max(1)
    }

    fn critical_z_alpha(alpha: f64, tails: Tails) -> Result<f64> {
        let normal = Self::standard_normal()?;
        let tail_alpha = match tails {
            Tails::One => alpha,
            Tails::Two => alpha / 2.0,
        };
        Ok(normal.inverse_cdf(1.0 - tail_alpha))
    }

    fn critical_z_beta(power: f64) -> Result<f64> {
        let normal = Self::standard_normal()?;
        Ok(normal.inverse_cdf(power))
    }

    fn standard_normal() -> Result<Normal> {
        Normal::new(0.0, 1.0).map_err(|e| {
            MetaError::CalculationError(format!("Normal distribution setup failed: {}", e))
        })
    }
}
