use crate::{models::*, Result};
use nalgebra::{DMatrix, DVector};
use statrs::distribution::{ContinuousCDF, StudentsT};

pub struct BiasAnalyzer;

impl BiasAnalyzer {
    /// Egger's regression test for small-study effects.
    ///
    /// Regresses the standard normal deviate (effect / SE) on precision
    /// (1 / SE) by ordinary least squares and tests whether the intercept
    /// differs from zero on n - 2 degrees of freedom.
    pub fn eggers_regression(studies: &[Study]) -> Result<EggersTest> {
        if studies.len() < 3 {
            return Err(crate::errors::MetaError::InsufficientData(format!(
                "Egger's test requires at least 3 studies, got {}",
                studies.len()
            )));
        }

        for study in studies {
            if !study.standard_error.is_finite() || study.standard_error <= 0.0 {
                return Err(crate::errors::MetaError::InvalidInput(format!(
                    "Study {} has non-positive standard error ({})",
                    study.name, study.standard_error
                )));
            }
        }

        let n = studies.len();

        let mut design = DMatrix::zeros(n, 2);
        let mut response = DVector::zeros(n);
        for (i, study) in studies.iter().enumerate() {
            design[(i, 0)] = 1.0;
            design[(i, 1)] = 1.0 / study.standard_error;
            response[i] = study.effect_size / study.standard_error;
        }

        let xtx = design.transpose() * &design;
        let xty = design.transpose() * &response;
        let xtx_inv = xtx.try_inverse().ok_or_else(|| {
            crate::errors::MetaError::CalculationError(
                "Egger design matrix is singular (identical precisions?)".to_string(),
            )
        })?;
        let coefficients = &xtx_inv * xty;

        let intercept = coefficients[0];

        let fitted = &design * &coefficients;
        let residuals = &response - fitted;
        let ss_res: f64 = residuals.iter().map(|r| r * r).sum();
        let df = (n - 2) as f64;
        let mse = ss_res / df;

        let standard_error = (mse * xtx_inv[(0, 0)]).sqrt();
        if standard_error == 0.0 || !standard_error.is_finite() {
            return Err(crate::errors::MetaError::CalculationError(
                "Egger intercept standard error is degenerate".to_string(),
            ));
        }

        let t_value = intercept / standard_error;
        let t_dist = StudentsT::new(0.0, 1.0, df).map_err(|e| {
            crate::errors::MetaError::CalculationError(format!(
                "t-distribution setup failed: {}",
                e
            ))
        })?;
        let p_value = 2.0 * (1.0 - t_dist.cdf(t_value.abs()));

        Ok(EggersTest {
            intercept,
            standard_error,
            t_value,
            p_value,
        })
    }
}
