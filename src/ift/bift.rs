//! # BIFT 迭代求解器
//!
//! 在给定 (α, Dmax) 下求使后验最大的 P(r)。
//!
//! ## 算法概述
//! 1. INIT: P⁽⁰⁾ = 先验；预计算 sum_dia、B = Tᵀ(T/σ²) 及其对角线 bkk
//! 2. ITERATE:
//!    - 由当前 P 逐点计算平滑目标 m（每次迭代重新计算）
//!    - dP[k] = (α m[k] + sum_dia[k] - Σ_{j≠k} P[j] B[j,k]) / (bkk[k] + α)
//!    - P ← (1-ω) P + ω dP
//!    - dotsp = 平滑项梯度与数据项梯度的夹角余弦
//!    - dotsp < 0 时减半 ω 重试，不推进迭代计数
//! 3. 结束: 达到最大迭代数，或在最少迭代数之后同时满足 ω ≤ ω_min 与
//!    |1 - dotsp| ≤ 容差；两种结束都是正常结果
//!
//! T、B、sum_dia 与先验只依赖 Dmax，`BiftSystem` 在同一 Dmax 的多个 α
//! 之间复用它们，不影响结果。
//!
//! ## 依赖关系
//! - 被 `ift/search.rs`、`ift/montecarlo.rs` 调用
//! - 使用 `ift/matrix.rs`、`ift/prior.rs`、`ift/evidence.rs`

use crate::error::{IftError, Result};
use crate::ift::evidence::{bift_evidence, EvidenceMode};
use crate::ift::matrix::{linspace, transform_matrix, Normalization};
use crate::ift::prior::sphere_prior;
use crate::models::ScatteringCurve;

use nalgebra::{DMatrix, DVector};

/// P(r) 网格的最少点数
pub const MIN_PR_POINTS: usize = 3;

/// BIFT 求解器参数
#[derive(Debug, Clone, PartialEq)]
pub struct BiftSettings {
    /// 最大迭代次数
    pub max_iterations: usize,
    /// 最少迭代次数
    pub min_iterations: usize,
    /// |1 - dotsp| 的收敛容差
    pub dotsp_tolerance: f64,
    /// 初始步长 ω
    pub omega: f64,
    /// 步长下限
    pub omega_min: f64,
    /// 步长缩减因子
    pub omega_reduction: f64,
}

impl Default for BiftSettings {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            min_iterations: 10,
            dotsp_tolerance: 0.001,
            omega: 0.5,
            omega_min: 0.001,
            omega_reduction: 2.0,
        }
    }
}

/// 迭代结束状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// 步长降到下限且 |1 - dotsp| 达到容差
    Converged,
    /// 达到最大迭代次数（正常结果）
    MaxIterReached,
}

/// 单个 (α, Dmax) 的求解结果
#[derive(Debug, Clone)]
pub struct BiftSolution {
    /// 求解得到的 P（包含 4πΔr 因子），长度 N
    pub p: Vec<f64>,
    /// 平滑约束 s = -Σ(P - m)²
    pub s: f64,
    /// 数据网格上的 χ²
    pub chi_squared: f64,
    /// 拟合强度 T·P
    pub fit: Vec<f64>,
    /// 最终的归一化 dotsp
    pub dotsp: f64,
    /// 最终步长
    pub omega: f64,
    /// 迭代次数
    pub iterations: usize,
    pub termination: Termination,
}

/// 一次迭代后的梯度信息
struct Gradients {
    /// 该 P 的 P·B
    pb: Vec<f64>,
    s: f64,
    dotsp: f64,
    wgrads: f64,
    wgradc: f64,
}

impl Gradients {
    /// 归一化 dotsp，任一梯度为零时取 1
    fn normalized(&self) -> f64 {
        if self.wgrads == 0.0 || self.wgradc == 0.0 {
            1.0
        } else {
            self.dotsp / (self.wgrads.sqrt() * self.wgradc.sqrt())
        }
    }
}

/// 固定 Dmax 下的 BIFT 线性系统
#[derive(Debug, Clone)]
pub struct BiftSystem {
    dmax: f64,
    r: Vec<f64>,
    intensity: Vec<f64>,
    sigma: Vec<f64>,
    /// 未缩放的变换矩阵
    t: DMatrix<f64>,
    /// B = Tᵀ (T / σ²)
    b: DMatrix<f64>,
    bkk: Vec<f64>,
    sum_dia: Vec<f64>,
    prior: Vec<f64>,
}

impl BiftSystem {
    /// 为给定 Dmax 与分辨率 N 构造系统
    pub fn new(curve: &ScatteringCurve, dmax: f64, n: usize) -> Result<Self> {
        if n < MIN_PR_POINTS {
            return Err(IftError::InvalidInputShape(format!(
                "P(r) needs at least {} points (got {})",
                MIN_PR_POINTS, n
            )));
        }
        if !(dmax > 0.0) || !dmax.is_finite() {
            return Err(IftError::InvalidArgument(format!(
                "Dmax must be positive and finite (got {})",
                dmax
            )));
        }

        let q = curve.q();
        let intensity = curve.intensity();
        let sigma = curve.sigma();
        let r = linspace(0.0, dmax, n);
        let t = transform_matrix(q, &r, Normalization::Unscaled);

        let variance: Vec<f64> = sigma.iter().map(|s| s * s).collect();
        let weighted = DMatrix::from_fn(t.nrows(), n, |i, j| t[(i, j)] / variance[i]);

        let sum_dia: Vec<f64> = (0..n)
            .map(|k| (0..q.len()).map(|i| weighted[(i, k)] * intensity[i]).sum())
            .collect();
        let b = t.transpose() * &weighted;
        let bkk: Vec<f64> = b.diagonal().iter().cloned().collect();

        let prior = sphere_prior(n, intensity[0], dmax);

        Ok(Self {
            dmax,
            r,
            intensity: intensity.to_vec(),
            sigma: sigma.to_vec(),
            t,
            b,
            bkk,
            sum_dia,
            prior,
        })
    }

    pub fn dmax(&self) -> f64 {
        self.dmax
    }

    /// P(r) 网格 linspace(0, Dmax, N)
    pub fn r(&self) -> &[f64] {
        &self.r
    }

    pub fn len(&self) -> usize {
        self.r.len()
    }

    pub fn is_empty(&self) -> bool {
        self.r.is_empty()
    }

    /// 先验分布（同时也是迭代初值）
    pub fn prior(&self) -> &[f64] {
        &self.prior
    }

    /// 数据项 Hessian B
    pub fn hessian(&self) -> &DMatrix<f64> {
        &self.b
    }

    pub fn transform(&self) -> &DMatrix<f64> {
        &self.t
    }

    /// 在给定 α（≥ 0）下迭代求解
    pub fn solve(&self, alpha: f64, settings: &BiftSettings) -> BiftSolution {
        debug_assert!(!(alpha < 0.0), "alpha must be non-negative");

        let n = self.len();
        let bkk_max = 10.0 * self.bkk.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

        let mut p = self.prior.clone();
        let mut m = self.prior.clone();
        let mut p_old = vec![0.0; n];
        let mut dp = vec![0.0; n];

        let mut omega = settings.omega;
        let mut dotsp = 0.0;
        let mut s = 0.0;
        let mut iterations = 0;
        // 当前 P 的 P·B，由上一次梯度计算得到
        let mut pb = self.product(&p);

        while iterations < settings.max_iterations
            && !self.is_converged(iterations, omega, dotsp, settings)
        {
            if iterations != 0 {
                smoothness_target(&p, &mut m);

                // 非对角部分 Σ_{j≠k} P[j] B[j,k]，用更新前的 P 一次算完
                for k in 0..n {
                    let off_diagonal = pb[k] - p[k] * self.bkk[k];
                    dp[k] = (m[k] * alpha + self.sum_dia[k] - off_diagonal) / (self.bkk[k] + alpha);
                    p_old[k] = p[k];
                    p[k] = (1.0 - omega) * p[k] + omega * dp[k];
                }
            }

            iterations += 1;

            let mut gradients = self.gradients(&p, &m);

            // 步长过大：减半 ω 并从上一步重新更新
            while gradients.dotsp < 0.0
                && alpha < bkk_max
                && iterations > 1
                && omega > settings.omega_min
            {
                omega /= settings.omega_reduction;
                for k in 0..n {
                    p[k] = (1.0 - omega) * p_old[k] + omega * dp[k];
                }
                gradients = self.gradients(&p, &m);
            }

            s = gradients.s;
            dotsp = gradients.normalized();
            pb = gradients.pb;
        }

        let termination = if self.is_converged(iterations, omega, dotsp, settings) {
            Termination::Converged
        } else {
            Termination::MaxIterReached
        };

        let fit = self.forward(&p);
        let chi_squared = self.chi_squared(&fit);

        BiftSolution {
            p,
            s,
            chi_squared,
            fit,
            dotsp,
            omega,
            iterations,
            termination,
        }
    }

    /// 迭代数不少于下限、步长已降到下限且 |1 - dotsp| 达到容差
    fn is_converged(&self, iterations: usize, omega: f64, dotsp: f64, settings: &BiftSettings) -> bool {
        iterations >= settings.min_iterations
            && omega <= settings.omega_min
            && (1.0 - dotsp).abs() <= settings.dotsp_tolerance
    }

    /// 解的 evidence
    pub fn evidence(&self, alpha: f64, solution: &BiftSolution, mode: EvidenceMode) -> f64 {
        bift_evidence(alpha, solution.s, solution.chi_squared, &self.b, mode)
    }

    /// 正向变换 T·P
    pub fn forward(&self, p: &[f64]) -> Vec<f64> {
        let fit = &self.t * DVector::from_column_slice(p);
        fit.iter().cloned().collect()
    }

    /// 数据网格上的 χ²
    pub fn chi_squared(&self, fit: &[f64]) -> f64 {
        self.intensity
            .iter()
            .zip(fit)
            .zip(&self.sigma)
            .map(|((i, f), s)| ((i - f) / s).powi(2))
            .sum()
    }

    /// (P·B)_k = Σ_j P[j] B[j,k]
    fn product(&self, p: &[f64]) -> Vec<f64> {
        let pb = self.b.tr_mul(&DVector::from_column_slice(p));
        pb.iter().cloned().collect()
    }

    fn gradients(&self, p: &[f64], m: &[f64]) -> Gradients {
        let mut g = Gradients {
            pb: self.product(p),
            s: 0.0,
            dotsp: 0.0,
            wgrads: 0.0,
            wgradc: 0.0,
        };

        for k in 0..p.len() {
            let diff = p[k] - m[k];
            g.s -= diff * diff;

            let gradsi = -2.0 * diff;
            let gradci = 2.0 * g.pb[k] - 2.0 * self.sum_dia[k];

            g.wgrads += gradsi * gradsi;
            g.wgradc += gradci * gradci;
            g.dotsp += gradci * gradsi;
        }

        g
    }
}

/// 由当前 P 计算平滑目标 m
fn smoothness_target(p: &[f64], m: &mut [f64]) {
    let n = p.len();
    for k in 1..n - 1 {
        m[k] = (p[k - 1] + p[k + 1]) / 2.0;
    }
    m[0] = p[1] / 2.0;
    m[n - 1] = p[n - 2] / 2.0;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ift::simulate::sphere_curve;

    fn curve() -> ScatteringCurve {
        sphere_curve(&linspace(0.01, 0.3, 80), 40.0, 100.0, 0.05, Some(7)).unwrap()
    }

    #[test]
    fn test_rejects_small_grid() {
        let err = BiftSystem::new(&curve(), 40.0, 2).unwrap_err();
        assert!(matches!(err, IftError::InvalidInputShape(_)));
    }

    #[test]
    fn test_rejects_bad_dmax() {
        assert!(BiftSystem::new(&curve(), 0.0, 20).is_err());
        assert!(BiftSystem::new(&curve(), f64::NAN, 20).is_err());
    }

    #[test]
    fn test_hessian_is_symmetric() {
        let system = BiftSystem::new(&curve(), 40.0, 20).unwrap();
        let b = system.hessian();
        for i in 0..20 {
            for j in 0..20 {
                assert!((b[(i, j)] - b[(j, i)]).abs() <= 1e-9 * b[(i, j)].abs().max(1.0));
            }
        }
    }

    #[test]
    fn test_smoothness_target_stencil() {
        let p = [1.0, 2.0, 4.0, 8.0];
        let mut m = [0.0; 4];
        smoothness_target(&p, &mut m);
        assert_eq!(m, [1.0, 2.5, 5.0, 2.0]);
    }

    #[test]
    fn test_solve_respects_iteration_bounds() {
        let system = BiftSystem::new(&curve(), 40.0, 30).unwrap();
        let settings = BiftSettings::default();
        let solution = system.solve(1000.0, &settings);

        assert_eq!(solution.p.len(), 30);
        assert_eq!(solution.fit.len(), 80);
        assert!(solution.iterations >= settings.min_iterations);
        assert!(solution.iterations <= settings.max_iterations);
        assert!(solution.s <= 0.0);
        assert!(solution.chi_squared.is_finite());
    }

    #[test]
    fn test_max_iterations_is_a_normal_outcome() {
        let system = BiftSystem::new(&curve(), 40.0, 30).unwrap();
        let settings = BiftSettings {
            max_iterations: 3,
            min_iterations: 3,
            dotsp_tolerance: 0.0,
            ..BiftSettings::default()
        };
        let solution = system.solve(1000.0, &settings);
        assert_eq!(solution.iterations, 3);
        assert_eq!(solution.termination, Termination::MaxIterReached);
    }

    #[test]
    fn test_solve_improves_on_prior() {
        let system = BiftSystem::new(&curve(), 40.0, 30).unwrap();
        let prior_chi = system.chi_squared(&system.forward(system.prior()));
        let solution = system.solve(100.0, &BiftSettings::default());
        assert!(
            solution.chi_squared < prior_chi,
            "solution chi2 {} should beat prior chi2 {}",
            solution.chi_squared,
            prior_chi
        );
    }

    #[test]
    fn test_solve_is_deterministic() {
        let system = BiftSystem::new(&curve(), 40.0, 25).unwrap();
        let a = system.solve(500.0, &BiftSettings::default());
        let b = system.solve(500.0, &BiftSettings::default());
        assert_eq!(a.p, b.p);
        assert_eq!(a.s.to_bits(), b.s.to_bits());
    }
}
