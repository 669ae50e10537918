//! # BIFT Monte Carlo 不确定度
//!
//! 在最优 (ln α, Dmax) 附近随机扰动参数，对每组参数重新求解，
//! 再按 evidence 加权得到各量的均值与标准差。
//!
//! ## 流程
//! 1. 扰动: x = x_opt · (1 + 0.1 · (U - 0.5) · mult)，第一个样本固定为最优点
//! 2. 求解: 每个样本独立求解，rayon 并行
//! 3. 若 max|evidence| ≥ 9e8，mult 减半后重新抽样，直到 mult < 0.001
//! 4. 插值: 所有 P(r) 插值到公共网格 linspace(0, Dmax_opt·(1 + 0.05·mult), N+2)，
//!    样本自身 Dmax 之外为 0
//! 5. 加权: w = exp(ev - ev_max)^(1/χ²_min)，χ² 为约化值；非有限 evidence 的权重为 0
//!
//! ## 依赖关系
//! - 被 `ift/search.rs` 调用
//! - 使用 `ift/bift.rs`、`ift/derived.rs`
//! - 使用 rand 生成可复现的扰动，rayon 并行求解

use crate::error::{IftError, Result};
use crate::ift::bift::{BiftSettings, BiftSystem};
use crate::ift::control::{CancelToken, ProgressEvent, ProgressSink, SearchPhase};
use crate::ift::derived::{derive, pure_distribution};
use crate::ift::evidence::EvidenceMode;
use crate::ift::matrix::linspace;
use crate::models::ScatteringCurve;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// 视为数值爆炸的 evidence 绝对值
const EVIDENCE_BLOWUP: f64 = 9e8;

/// 扰动倍数的下限，低于此值停止重新抽样
const MIN_MULTIPLIER: f64 = 0.001;

/// Monte Carlo 参数
#[derive(Debug, Clone, PartialEq)]
pub struct MonteCarloSettings {
    /// 样本数，0 表示不做估计
    pub runs: usize,
    /// 随机数种子
    pub seed: u64,
    /// 初始扰动倍数
    pub multiplier: f64,
}

impl Default for MonteCarloSettings {
    fn default() -> Self {
        Self {
            runs: 300,
            seed: 0,
            multiplier: 3.0,
        }
    }
}

/// 加权均值与标准差
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub mean: f64,
    pub sd: f64,
}

impl Estimate {
    /// 以归一化权重计算，权重为 0 的项不参与
    fn weighted(values: &[f64], weights: &[f64]) -> Self {
        let mean: f64 = values
            .iter()
            .zip(weights)
            .filter(|(_, w)| **w > 0.0)
            .map(|(v, w)| v * w)
            .sum();
        let variance: f64 = values
            .iter()
            .zip(weights)
            .filter(|(_, w)| **w > 0.0)
            .map(|(v, w)| (v - mean).powi(2) * w)
            .sum();

        Estimate {
            mean,
            sd: variance.abs().sqrt(),
        }
    }
}

/// Monte Carlo 估计结果
#[derive(Debug, Clone, PartialEq)]
pub struct Uncertainty {
    /// 公共 r 网格
    pub r: Vec<f64>,
    /// 加权平均 P(r)
    pub pr_mean: Vec<f64>,
    /// 逐点标准差
    pub pr_error: Vec<f64>,
    pub alpha: Estimate,
    pub dmax: Estimate,
    /// 约化 χ²
    pub chi_squared: Estimate,
    pub evidence: Estimate,
    pub rg: Estimate,
    pub i0: Estimate,
    /// 参与加权的样本数
    pub runs: usize,
}

/// 单个样本
struct Sample {
    alpha: f64,
    dmax: f64,
    evidence: f64,
    /// 约化 χ²
    chi_squared: f64,
    /// 公共网格上的 P(r)
    pr: Vec<f64>,
}

/// 线性插值，x 超出 xp 范围时取端点值
pub(crate) fn interpolate(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    let last = xp.len() - 1;
    if x <= xp[0] {
        return fp[0];
    }
    if x >= xp[last] {
        return fp[last];
    }
    let upper = xp.partition_point(|v| *v <= x);
    let lower = upper - 1;
    let t = (x - xp[lower]) / (xp[upper] - xp[lower]);
    fp[lower] + t * (fp[upper] - fp[lower])
}

/// 求解一个扰动样本并插值到公共网格
fn evaluate_sample(
    curve: &ScatteringCurve,
    n: usize,
    log_alpha: f64,
    dmax: f64,
    solver: &BiftSettings,
    mode: EvidenceMode,
    reference_r: &[f64],
) -> Result<Sample> {
    let alpha = log_alpha.exp();
    let system = BiftSystem::new(curve, dmax, n)?;
    let solution = system.solve(alpha, solver);
    let evidence = system.evidence(alpha, &solution, mode);

    let (r, p) = pure_distribution(&solution.p, dmax);
    let pr = reference_r
        .iter()
        .map(|x| if *x < dmax { interpolate(*x, &r, &p) } else { 0.0 })
        .collect();

    Ok(Sample {
        alpha,
        dmax,
        evidence,
        chi_squared: solution.chi_squared / curve.len() as f64,
        pr,
    })
}

/// 在最优点附近估计 BIFT 结果的不确定度
///
/// 取消、样本数为 0 或没有任何有限 evidence 时返回 `None`。
#[allow(clippy::too_many_arguments)]
pub fn bift_uncertainty(
    curve: &ScatteringCurve,
    n: usize,
    log_alpha: f64,
    dmax: f64,
    solver: &BiftSettings,
    mode: EvidenceMode,
    settings: &MonteCarloSettings,
    cancel: &CancelToken,
    progress: &mut dyn ProgressSink,
) -> Result<Option<Uncertainty>> {
    if settings.runs == 0 {
        return Ok(None);
    }
    if !(dmax > 0.0) || !dmax.is_finite() || !log_alpha.is_finite() {
        return Err(IftError::InvalidArgument(format!(
            "Monte Carlo needs a finite optimum (got ln alpha = {}, Dmax = {})",
            log_alpha, dmax
        )));
    }

    progress.report(&ProgressEvent::Phase {
        phase: SearchPhase::MonteCarlo,
        total: settings.runs,
    });

    let mut multiplier = settings.multiplier;
    let reference_r = linspace(0.0, dmax * (1.0 + 0.05 * multiplier), n + 2);
    let mut rng = StdRng::seed_from_u64(settings.seed);

    let samples = loop {
        let params: Vec<(f64, f64)> = (0..settings.runs)
            .map(|i| {
                if i == 0 {
                    (log_alpha, dmax)
                } else {
                    let a = log_alpha + 0.1 * log_alpha * (rng.gen::<f64>() - 0.5) * multiplier;
                    let d = dmax + 0.1 * dmax * (rng.gen::<f64>() - 0.5) * multiplier;
                    (a, d)
                }
            })
            .collect();

        let samples: Vec<Option<Sample>> = params
            .par_iter()
            .map(|(a, d)| {
                if cancel.is_cancelled() {
                    return Ok(None);
                }
                evaluate_sample(curve, n, *a, *d, solver, mode, &reference_r).map(Some)
            })
            .collect::<Result<_>>()?;

        if cancel.is_cancelled() {
            return Ok(None);
        }
        let samples: Vec<Sample> = samples.into_iter().flatten().collect();

        progress.report(&ProgressEvent::MonteCarlo {
            completed: samples.len(),
            total: settings.runs,
        });

        let largest = samples
            .iter()
            .map(|s| s.evidence.abs())
            .fold(0.0, f64::max);
        if largest >= EVIDENCE_BLOWUP {
            multiplier /= 2.0;
            if multiplier >= MIN_MULTIPLIER {
                continue;
            }
        }
        break samples;
    };

    Ok(summarize(&samples, reference_r))
}

fn field(samples: &[Sample], f: impl Fn(&Sample) -> f64) -> Vec<f64> {
    samples.iter().map(f).collect()
}

/// 按 evidence 加权汇总样本
fn summarize(samples: &[Sample], r: Vec<f64>) -> Option<Uncertainty> {
    let finite = samples.iter().filter(|s| s.evidence.is_finite());
    let max_evidence = finite.clone().map(|s| s.evidence).fold(f64::NEG_INFINITY, f64::max);
    let min_chi = finite.map(|s| s.chi_squared).fold(f64::INFINITY, f64::min);
    if !max_evidence.is_finite() {
        return None;
    }

    let mut weights: Vec<f64> = samples
        .iter()
        .map(|s| {
            if s.evidence.is_finite() {
                (s.evidence - max_evidence).exp().powf(1.0 / min_chi)
            } else {
                0.0
            }
        })
        .collect();
    let total: f64 = weights.iter().filter(|w| w.is_finite()).sum();
    if !(total > 0.0) {
        return None;
    }
    for w in weights.iter_mut() {
        *w = if w.is_finite() { *w / total } else { 0.0 };
    }

    let points = r.len();
    let mut pr_mean = vec![0.0; points];
    let mut pr_error = vec![0.0; points];
    for (sample, w) in samples.iter().zip(&weights).filter(|(_, w)| **w > 0.0) {
        for j in 0..points {
            pr_mean[j] += sample.pr[j] * w;
        }
    }
    for (sample, w) in samples.iter().zip(&weights).filter(|(_, w)| **w > 0.0) {
        for j in 0..points {
            pr_error[j] += (sample.pr[j] - pr_mean[j]).powi(2) * w;
        }
    }
    for e in pr_error.iter_mut() {
        *e = e.abs().sqrt();
    }

    let derived: Vec<_> = samples.iter().map(|s| derive(&r, &s.pr)).collect();
    let rg: Vec<f64> = derived.iter().map(|d| d.rg).collect();
    let i0: Vec<f64> = derived.iter().map(|d| d.i0).collect();

    Some(Uncertainty {
        pr_mean,
        pr_error,
        alpha: Estimate::weighted(&field(samples, |s| s.alpha), &weights),
        dmax: Estimate::weighted(&field(samples, |s| s.dmax), &weights),
        chi_squared: Estimate::weighted(&field(samples, |s| s.chi_squared), &weights),
        evidence: Estimate::weighted(&field(samples, |s| s.evidence), &weights),
        rg: Estimate::weighted(&rg, &weights),
        i0: Estimate::weighted(&i0, &weights),
        runs: weights.iter().filter(|w| **w > 0.0).count(),
        r,
    })
}
