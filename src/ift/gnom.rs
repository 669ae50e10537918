//! # GNOM 正则化最小二乘
//!
//! 在固定 (α, Dmin, Dmax) 下直接求解
//!
//! ```text
//! [ T   ]       [ I ]
//! [ α·L ] · P ≈ [ 0 ]
//! ```
//!
//! T 为完全缩放的变换矩阵（包含 4πΔr），L 为 GNOM 正则化矩阵，
//! 用 SVD 求最小范数最小二乘解。端点固定为零时去掉首末两列后求解，
//! 再在结果两端补上 0。
//!
//! ## 依赖关系
//! - 被 `ift/search.rs` 使用
//! - 使用 `ift/matrix.rs`，`optimal_chi_squared` 使用 `ift/refine.rs`
//! - 使用 nalgebra 的 SVD

use crate::error::{IftError, Result};
use crate::ift::bift::MIN_PR_POINTS;
use crate::ift::control::CancelToken;
use crate::ift::matrix::{gnom_regularization_matrix, linspace, transform_matrix, Normalization};
use crate::ift::refine::{nelder_mead, RefineSettings};
use crate::models::ScatteringCurve;

use nalgebra::{DMatrix, DVector};

/// 固定 r 网格下的 GNOM 线性系统
#[derive(Debug, Clone)]
pub struct GnomSystem {
    r: Vec<f64>,
    intensity: Vec<f64>,
    sigma: Vec<f64>,
    /// 完全缩放的变换矩阵
    t: DMatrix<f64>,
    l: DMatrix<f64>,
    force_ends_zero: bool,
}

impl GnomSystem {
    pub fn new(
        curve: &ScatteringCurve,
        dmin: f64,
        dmax: f64,
        n: usize,
        force_ends_zero: bool,
    ) -> Result<Self> {
        if n < MIN_PR_POINTS {
            return Err(IftError::InvalidInputShape(format!(
                "P(r) needs at least {} points (got {})",
                MIN_PR_POINTS, n
            )));
        }
        if !dmin.is_finite() || !dmax.is_finite() || dmin < 0.0 || dmax <= dmin {
            return Err(IftError::InvalidArgument(format!(
                "expected 0 <= Dmin < Dmax (got Dmin = {}, Dmax = {})",
                dmin, dmax
            )));
        }

        let r = linspace(dmin, dmax, n);
        let t = transform_matrix(curve.q(), &r, Normalization::FullyScaled);

        Ok(Self {
            r,
            intensity: curve.intensity().to_vec(),
            sigma: curve.sigma().to_vec(),
            t,
            l: gnom_regularization_matrix(n),
            force_ends_zero,
        })
    }

    /// r 网格 linspace(Dmin, Dmax, N)
    pub fn r(&self) -> &[f64] {
        &self.r
    }

    pub fn intensity(&self) -> &[f64] {
        &self.intensity
    }

    pub fn sigma(&self) -> &[f64] {
        &self.sigma
    }

    pub fn dmin(&self) -> f64 {
        self.r[0]
    }

    pub fn dmax(&self) -> f64 {
        self.r[self.r.len() - 1]
    }

    /// 求解 P(r)，返回纯 p(r) 单位
    pub fn solve(&self, alpha: f64) -> Result<Vec<f64>> {
        let m = self.t.nrows();
        let n = self.r.len();

        let mut design = DMatrix::zeros(m + n, n);
        design.rows_mut(0, m).copy_from(&self.t);
        design.rows_mut(m, n).copy_from(&(&self.l * alpha));

        let mut rhs = DVector::zeros(m + n);
        rhs.rows_mut(0, m).copy_from_slice(&self.intensity);

        if !self.force_ends_zero {
            return least_squares(design, &rhs).map(|p| p.iter().cloned().collect());
        }

        let inner = design.columns(1, n - 2).into_owned();
        let solution = least_squares(inner, &rhs)?;

        let mut p = Vec::with_capacity(n);
        p.push(0.0);
        p.extend(solution.iter().cloned());
        p.push(0.0);
        Ok(p)
    }

    /// 正向变换 T·P
    pub fn forward(&self, p: &[f64]) -> Vec<f64> {
        let fit = &self.t * DVector::from_column_slice(p);
        fit.iter().cloned().collect()
    }

    /// 约化 χ² = mean(((I - T·P)/σ)²)
    pub fn reduced_chi_squared(&self, p: &[f64]) -> f64 {
        let fit = self.forward(p);
        let total: f64 = self
            .intensity
            .iter()
            .zip(&fit)
            .zip(&self.sigma)
            .map(|((i, f), s)| ((i - f) / s).powi(2))
            .sum();
        total / self.intensity.len() as f64
    }

    /// ln α 处的约化 χ²，求解失败时为 NaN
    fn chi_squared_at(&self, log_alpha: f64) -> f64 {
        match self.solve(log_alpha.exp()) {
            Ok(p) => self.reduced_chi_squared(&p),
            Err(_) => f64::NAN,
        }
    }
}

/// 最小范数最小二乘，截断阈值同 numpy.linalg.lstsq 的默认 rcond
fn least_squares(a: DMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>> {
    let (rows, cols) = a.shape();
    let svd = a.svd(true, true);
    let largest = svd.singular_values.iter().cloned().fold(0.0, f64::max);
    let eps = f64::EPSILON * rows.max(cols) as f64 * largest;

    svd.solve(b, eps)
        .map_err(|e| IftError::Other(format!("least squares solve failed: {}", e)))
}

/// 单次 GNOM 求解
pub fn calc_pr(
    curve: &ScatteringCurve,
    alpha: f64,
    dmin: f64,
    dmax: f64,
    n: usize,
    force_ends_zero: bool,
) -> Result<Vec<f64>> {
    GnomSystem::new(curve, dmin, dmax, n, force_ends_zero)?.solve(alpha)
}

/// 使 χ² 最小的 α 对应的约化 χ²，可作为 DISCRP 的参考值
///
/// 先在 `log_alphas` 网格上取 χ² 最小点（严格小于才更新），再在 ln α 上精修。
/// 没有任何有限 χ² 时返回 `None`。
pub fn optimal_chi_squared(
    system: &GnomSystem,
    log_alphas: &[f64],
    refine: &RefineSettings,
    cancel: &CancelToken,
) -> Result<Option<f64>> {
    let mut best: Option<(f64, f64)> = None;

    for &log_alpha in log_alphas {
        if cancel.is_cancelled() {
            break;
        }
        let chi = system.chi_squared_at(log_alpha);
        if chi.is_finite() && best.map_or(true, |(_, b)| chi < b) {
            best = Some((log_alpha, chi));
        }
    }

    let (start, mut chi) = match best {
        Some(point) => point,
        None => return Ok(None),
    };

    if refine.enabled && !cancel.is_cancelled() {
        let outcome = nelder_mead(&[start], refine, cancel, |x| system.chi_squared_at(x[0]))?;
        if let Some(outcome) = outcome {
            if outcome.best_cost < chi {
                chi = outcome.best_cost;
            }
        }
    }

    Ok(Some(chi))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ift::prior::sphere_pair_distribution;
    use crate::ift::simulate::sphere_curve;

    #[test]
    fn test_force_ends_zero() {
        let q = linspace(0.005, 0.35, 250);
        let curve = sphere_curve(&q, 45.0, 1000.0, 0.5, Some(3)).unwrap();
        let p = calc_pr(&curve, 1.0, 0.0, 45.0, 50, true).unwrap();

        assert_eq!(p.len(), 50);
        assert_eq!(p[0], 0.0);
        assert_eq!(p[49], 0.0);
        assert!(p.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_sphere_round_trip_without_regularization() {
        // 无噪声、α = 0：正向投影后应能还原 P(r)
        let dmax = 45.0;
        let n = 50;
        let r = linspace(0.0, dmax, n);
        let truth: Vec<f64> = sphere_pair_distribution(&r, dmax)
            .iter()
            .map(|v| v * 1e-3)
            .collect();

        let q = linspace(0.005, 0.35, 250);
        let t = transform_matrix(&q, &r, Normalization::FullyScaled);
        let intensity: Vec<f64> = (&t * DVector::from_column_slice(&truth)).iter().cloned().collect();
        let curve = ScatteringCurve::new("sphere", q, intensity, vec![1.0; 250]).unwrap();

        let p = calc_pr(&curve, 0.0, 0.0, dmax, n, true).unwrap();

        let err: f64 = p.iter().zip(&truth).map(|(a, b)| (a - b).powi(2)).sum::<f64>().sqrt();
        let norm: f64 = truth.iter().map(|v| v * v).sum::<f64>().sqrt();
        assert!(
            err / norm < 1e-3,
            "relative L2 error should be below 1e-3, got {}",
            err / norm
        );
    }

    #[test]
    fn test_rejects_bad_grid() {
        let q = linspace(0.01, 0.3, 20);
        let curve = sphere_curve(&q, 30.0, 10.0, 0.1, None).unwrap();
        assert!(matches!(
            GnomSystem::new(&curve, 0.0, 30.0, 2, true),
            Err(IftError::InvalidInputShape(_))
        ));
        assert!(GnomSystem::new(&curve, 30.0, 30.0, 20, true).is_err());
        assert!(GnomSystem::new(&curve, -1.0, 30.0, 20, true).is_err());
    }

    #[test]
    fn test_optimal_chi_squared_beats_grid() {
        let q = linspace(0.01, 0.3, 60);
        let curve = sphere_curve(&q, 30.0, 10.0, 0.01, Some(2)).unwrap();
        let system = GnomSystem::new(&curve, 0.0, 30.0, 20, true).unwrap();
        let log_alphas = linspace(0.01_f64.ln(), 60.0_f64.ln(), 12);

        let grid_best = log_alphas
            .iter()
            .map(|a| system.chi_squared_at(*a))
            .fold(f64::INFINITY, f64::min);
        let optimal = optimal_chi_squared(&system, &log_alphas, &RefineSettings::default(), &CancelToken::new())
            .unwrap()
            .unwrap();

        assert!(optimal.is_finite());
        assert!(optimal <= grid_best);
    }

    #[test]
    fn test_optimal_chi_squared_cancelled_before_start() {
        let q = linspace(0.01, 0.3, 40);
        let curve = sphere_curve(&q, 30.0, 10.0, 0.01, Some(2)).unwrap();
        let system = GnomSystem::new(&curve, 0.0, 30.0, 10, true).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = optimal_chi_squared(&system, &[0.0, 1.0], &RefineSettings::default(), &cancel).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_free_ends_keep_grid_length() {
        let q = linspace(0.01, 0.3, 60);
        let curve = sphere_curve(&q, 30.0, 10.0, 0.01, Some(1)).unwrap();
        let p = calc_pr(&curve, 0.5, 0.0, 30.0, 20, false).unwrap();
        assert_eq!(p.len(), 20);
    }
}
