//! # 超参数搜索
//!
//! 状态机: GRID_SEARCH → LOCAL_REFINE → DONE
//!
//! ## BIFT
//! - 网格: Dmax（外层，线性）× ln α（内层，ln 空间线性），按 evidence 取最优
//! - 精修: 以网格最优点为起点，对 (ln α, Dmax) 做 Nelder–Mead，最小化 -evidence
//! - 可选 Monte Carlo 不确定度估计
//!
//! ## GNOM
//! - 网格: 固定 Dmax 下的 ln α，按 TOTAL 取最优
//! - 精修: ln α（`refine_dmax` 时联合精修 Dmax）
//!
//! ## 选择规则
//! - 代价为 -evidence 或 -TOTAL，严格小于才更新最优点，相等时保留先计算的点
//! - 非有限代价永远不会成为最优点
//! - 没有任何有限代价时退回先验分布，并设置 `degraded`
//! - 每个网格点和每次精修求值前检查取消标记；取消后直接返回当前最优解
//!
//! 求解是确定性的，最优点的解在内存中保留，DONE 阶段直接由它构造结果。
//!
//! ## 依赖关系
//! - 被 `commands/bift.rs`、`commands/gnom.rs` 调用
//! - 使用 `ift/` 下的所有求解与评分模块

use crate::error::{IftError, Result};
use crate::ift::bift::{BiftSettings, BiftSolution, BiftSystem, MIN_PR_POINTS};
use crate::ift::control::{CancelToken, ProgressEvent, ProgressSink, SearchPhase};
use crate::ift::criteria::{CriteriaInput, CriteriaSet, CriteriaWeights};
use crate::ift::derived::{chi_squared, derive, pure_distribution};
use crate::ift::evidence::EvidenceMode;
use crate::ift::gnom::{optimal_chi_squared, GnomSystem};
use crate::ift::matrix::{grid_spacing, linspace};
use crate::ift::montecarlo::{bift_uncertainty, interpolate, MonteCarloSettings, Uncertainty};
use crate::ift::prior::sphere_prior;
use crate::ift::refine::{nelder_mead, RefineSettings};
use crate::models::{AlgorithmKind, ChiSquaredBest, IftResult, ScatteringCurve, ScoreGrid};

use std::f64::consts::PI;

/// BIFT 搜索配置
#[derive(Debug, Clone, PartialEq)]
pub struct BiftSearch {
    /// P(r) 点数 N
    pub pr_points: usize,
    pub min_alpha: f64,
    pub max_alpha: f64,
    pub alpha_points: usize,
    pub min_dmax: f64,
    pub max_dmax: f64,
    pub dmax_points: usize,
    pub evidence_mode: EvidenceMode,
    pub solver: BiftSettings,
    pub refine: RefineSettings,
    pub monte_carlo: MonteCarloSettings,
}

impl Default for BiftSearch {
    fn default() -> Self {
        Self {
            pr_points: 50,
            min_alpha: 150.0,
            max_alpha: 1e10,
            alpha_points: 16,
            min_dmax: 10.0,
            max_dmax: 400.0,
            dmax_points: 10,
            evidence_mode: EvidenceMode::default(),
            solver: BiftSettings::default(),
            refine: RefineSettings::default(),
            monte_carlo: MonteCarloSettings::default(),
        }
    }
}

/// DISCRP 使用的参考 χ²
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChiReference {
    /// 固定值（约化 χ²）
    Fixed(f64),
    /// 先搜索使 χ² 最小的 α，取其约化 χ²
    Optimal,
}

/// GNOM 搜索配置
#[derive(Debug, Clone, PartialEq)]
pub struct GnomSettings {
    pub pr_points: usize,
    pub dmin: f64,
    pub dmax: f64,
    pub min_alpha: f64,
    pub max_alpha: f64,
    pub alpha_points: usize,
    pub force_ends_zero: bool,
    pub weights: CriteriaWeights,
    pub chi_reference: ChiReference,
    pub refine: RefineSettings,
    /// 精修时同时调整 Dmax
    pub refine_dmax: bool,
}

impl GnomSettings {
    /// 给定 Dmax，其余取默认值
    pub fn new(dmax: f64) -> Self {
        Self {
            pr_points: 50,
            dmin: 0.0,
            dmax,
            min_alpha: 0.01,
            max_alpha: 60.0,
            alpha_points: 100,
            force_ends_zero: true,
            weights: CriteriaWeights::default(),
            chi_reference: ChiReference::Fixed(0.0),
            refine: RefineSettings::default(),
            refine_dmax: false,
        }
    }
}

/// IFT 算法及其配置
#[derive(Debug, Clone, PartialEq)]
pub enum IftAlgorithm {
    Bift(BiftSearch),
    Gnom(GnomSettings),
}

/// 按算法分派搜索
pub fn run_search(
    curve: &ScatteringCurve,
    algorithm: &IftAlgorithm,
    cancel: &CancelToken,
    progress: &mut dyn ProgressSink,
) -> Result<IftResult> {
    match algorithm {
        IftAlgorithm::Bift(search) => bift_search(curve, search, cancel, progress),
        IftAlgorithm::Gnom(settings) => gnom_search(curve, settings, cancel, progress),
    }
}

// ─────────────────────────────────────────────────────────────
// 参数校验
// ─────────────────────────────────────────────────────────────

fn check_pr_points(n: usize) -> Result<()> {
    if n < MIN_PR_POINTS {
        return Err(IftError::InvalidInputShape(format!(
            "P(r) needs at least {} points (got {})",
            MIN_PR_POINTS, n
        )));
    }
    Ok(())
}

fn check_bounds(label: &str, min: f64, max: f64, points: usize, positive: bool) -> Result<()> {
    if points == 0 {
        return Err(IftError::InvalidArgument(format!(
            "{} grid needs at least one point",
            label
        )));
    }
    if !min.is_finite() || !max.is_finite() || min > max || (positive && !(min > 0.0)) {
        return Err(IftError::InvalidArgument(format!(
            "invalid {} range [{}, {}]",
            label, min, max
        )));
    }
    Ok(())
}

fn validate_bift(search: &BiftSearch) -> Result<()> {
    check_pr_points(search.pr_points)?;
    check_bounds("alpha", search.min_alpha, search.max_alpha, search.alpha_points, true)?;
    check_bounds("Dmax", search.min_dmax, search.max_dmax, search.dmax_points, true)
}

fn validate_gnom(settings: &GnomSettings) -> Result<()> {
    check_pr_points(settings.pr_points)?;
    check_bounds("alpha", settings.min_alpha, settings.max_alpha, settings.alpha_points, true)?;
    if !(settings.dmin >= 0.0) || !settings.dmax.is_finite() || settings.dmax <= settings.dmin {
        return Err(IftError::InvalidArgument(format!(
            "expected 0 <= Dmin < Dmax (got Dmin = {}, Dmax = {})",
            settings.dmin, settings.dmax
        )));
    }
    Ok(())
}

/// ln 空间等间距的 α 网格（返回 ln α）
fn log_alpha_grid(min: f64, max: f64, points: usize) -> Vec<f64> {
    linspace(min.ln(), max.ln(), points)
}

/// 严格小于才更新的最优点记录
#[derive(Debug)]
struct Best<T> {
    cost: f64,
    index: Option<usize>,
    value: Option<T>,
}

impl<T> Best<T> {
    fn new() -> Self {
        Self {
            cost: f64::INFINITY,
            index: None,
            value: None,
        }
    }

    /// 代价有限且严格更小时接受，返回是否更新
    fn offer(&mut self, index: usize, cost: f64, value: impl FnOnce() -> T) -> bool {
        if cost.is_finite() && (self.value.is_none() || cost < self.cost) {
            self.cost = cost;
            self.index = Some(index);
            self.value = Some(value());
            true
        } else {
            false
        }
    }

    /// 当前最优得分（代价取负），没有时为 NaN
    fn score(&self) -> f64 {
        if self.value.is_some() {
            -self.cost
        } else {
            f64::NAN
        }
    }
}

// ─────────────────────────────────────────────────────────────
// BIFT
// ─────────────────────────────────────────────────────────────

/// 一个 BIFT 试验点
#[derive(Debug, Clone)]
struct BiftTrial {
    alpha: f64,
    dmax: f64,
    evidence: f64,
    solution: BiftSolution,
}

/// 在给定点求解一次 BIFT
fn bift_trial(
    system: &BiftSystem,
    alpha: f64,
    solver: &BiftSettings,
    mode: EvidenceMode,
) -> BiftTrial {
    let solution = system.solve(alpha, solver);
    let evidence = system.evidence(alpha, &solution, mode);
    BiftTrial {
        alpha,
        dmax: system.dmax(),
        evidence,
        solution,
    }
}

/// 由试验点构造结果
fn bift_result(curve: &ScatteringCurve, trial: BiftTrial) -> IftResult {
    let (r, pr) = pure_distribution(&trial.solution.p, trial.dmax);
    let derived = derive(&r, &pr);

    IftResult {
        algorithm: AlgorithmKind::Bift,
        data: curve.clone(),
        r,
        pr,
        pr_error: None,
        fit: trial.solution.fit,
        alpha: trial.alpha,
        dmax: trial.dmax,
        i0: derived.i0,
        rg: derived.rg,
        rg_squared_negative: derived.rg_squared_negative,
        chi_squared: trial.solution.chi_squared,
        evidence: Some(trial.evidence),
        criteria: None,
        grid: None,
        best_chi_squared: None,
        uncertainty: None,
        degraded: false,
        cancelled: false,
    }
}

/// 没有有限 evidence 时的先验结果
fn bift_fallback(curve: &ScatteringCurve, dmax: f64, alpha: f64, n: usize) -> Result<IftResult> {
    let system = BiftSystem::new(curve, dmax, n)?;
    let fit = system.forward(system.prior());
    let chi = system.chi_squared(&fit);
    let (r, pr) = pure_distribution(system.prior(), dmax);
    let derived = derive(&r, &pr);

    Ok(IftResult {
        algorithm: AlgorithmKind::Bift,
        data: curve.clone(),
        r,
        pr,
        pr_error: None,
        fit,
        alpha,
        dmax,
        i0: derived.i0,
        rg: derived.rg,
        rg_squared_negative: derived.rg_squared_negative,
        chi_squared: chi,
        evidence: None,
        criteria: None,
        grid: None,
        best_chi_squared: None,
        uncertainty: None,
        degraded: true,
        cancelled: false,
    })
}

/// 把 Monte Carlo 误差带插值到结果的 r 网格
fn attach_uncertainty(result: &mut IftResult, uncertainty: Uncertainty) {
    let error = result
        .r
        .iter()
        .map(|x| interpolate(*x, &uncertainty.r, &uncertainty.pr_error))
        .collect();
    result.pr_error = Some(error);
    result.uncertainty = Some(uncertainty);
}

/// BIFT 网格搜索 + 精修
pub fn bift_search(
    curve: &ScatteringCurve,
    search: &BiftSearch,
    cancel: &CancelToken,
    progress: &mut dyn ProgressSink,
) -> Result<IftResult> {
    validate_bift(search)?;

    let n = search.pr_points;
    let mode = search.evidence_mode;
    let log_alphas = log_alpha_grid(search.min_alpha, search.max_alpha, search.alpha_points);
    let dmaxes = linspace(search.min_dmax, search.max_dmax, search.dmax_points);
    let total = dmaxes.len() * log_alphas.len();

    let mut grid = ScoreGrid::new(dmaxes.clone(), log_alphas.clone());
    let mut best: Best<BiftTrial> = Best::new();
    let mut best_chi: Option<ChiSquaredBest> = None;
    let mut cancelled = false;

    progress.report(&ProgressEvent::Phase {
        phase: SearchPhase::GridSearch,
        total,
    });

    'grid: for (dmax_index, &dmax) in dmaxes.iter().enumerate() {
        if cancel.is_cancelled() {
            cancelled = true;
            break;
        }
        // 同一 Dmax 的 α 试验共用 T、B 与先验
        let system = BiftSystem::new(curve, dmax, n)?;

        for (alpha_index, &log_alpha) in log_alphas.iter().enumerate() {
            if cancel.is_cancelled() {
                cancelled = true;
                break 'grid;
            }

            let index = dmax_index * log_alphas.len() + alpha_index;
            let alpha = log_alpha.exp();
            let trial = bift_trial(&system, alpha, &search.solver, mode);
            let score = if trial.evidence.is_finite() {
                trial.evidence
            } else {
                f64::NAN
            };
            let chi = trial.solution.chi_squared;

            grid.scores[dmax_index][alpha_index] = score;
            if chi.is_finite() && best_chi.map_or(true, |b| chi < b.chi_squared) {
                best_chi = Some(ChiSquaredBest {
                    alpha,
                    dmax,
                    chi_squared: chi,
                });
            }
            best.offer(index, -trial.evidence, || trial);

            progress.report(&ProgressEvent::GridPoint {
                index,
                total,
                dmax_index,
                alpha_index,
                alpha,
                dmax,
                score,
                chi_squared: chi,
                best_index: best.index,
                best_score: best.score(),
            });
        }
    }

    let mut chosen = best.value.take();

    if let Some(grid_best) = chosen.as_ref() {
        if search.refine.enabled && !cancelled {
            let start = [grid_best.alpha.ln(), grid_best.dmax];
            let mut refined: Best<BiftTrial> = Best::new();
            let mut evaluation = 0;

            progress.report(&ProgressEvent::Phase {
                phase: SearchPhase::LocalRefine,
                total: search.refine.max_iterations as usize,
            });

            let outcome = nelder_mead(&start, &search.refine, cancel, |x| {
                let (log_alpha, dmax) = (x[0], x[1]);
                let system = match BiftSystem::new(curve, dmax, n) {
                    Ok(system) if log_alpha.is_finite() => system,
                    _ => return f64::NAN,
                };
                let trial = bift_trial(&system, log_alpha.exp(), &search.solver, mode);
                let evidence = trial.evidence;

                progress.report(&ProgressEvent::RefineStep {
                    evaluation,
                    alpha: trial.alpha,
                    dmax,
                    score: evidence,
                });
                refined.offer(evaluation, -evidence, || trial);
                evaluation += 1;
                -evidence
            })?;

            // 精修开始前就取消时 outcome 为 None，仍需记录取消
            if let Some(outcome) = outcome {
                cancelled |= outcome.cancelled;
            }
            cancelled |= cancel.is_cancelled();
            if refined.value.is_some() && refined.cost < best.cost {
                chosen = refined.value.take();
            }
        }
    }

    let mut result = match chosen {
        Some(trial) => bift_result(curve, trial),
        None => bift_fallback(curve, dmaxes[0], log_alphas[0].exp(), n)?,
    };

    if !result.degraded && !cancelled {
        let uncertainty = bift_uncertainty(
            curve,
            n,
            result.alpha.ln(),
            result.dmax,
            &search.solver,
            mode,
            &search.monte_carlo,
            cancel,
            progress,
        )?;
        cancelled |= cancel.is_cancelled();
        if let Some(uncertainty) = uncertainty {
            attach_uncertainty(&mut result, uncertainty);
        }
    }

    result.grid = Some(grid);
    result.best_chi_squared = best_chi;
    result.cancelled = cancelled;

    progress.report(&ProgressEvent::Phase {
        phase: SearchPhase::Done,
        total: 0,
    });

    Ok(result)
}

/// 单点 BIFT 求解（默认求解参数与 evidence 形式）
pub fn single_solve_bift(curve: &ScatteringCurve, alpha: f64, dmax: f64, n: usize) -> Result<IftResult> {
    if !(alpha >= 0.0) || !alpha.is_finite() {
        return Err(IftError::InvalidArgument(format!(
            "alpha must be non-negative and finite (got {})",
            alpha
        )));
    }
    let system = BiftSystem::new(curve, dmax, n)?;
    let trial = bift_trial(&system, alpha, &BiftSettings::default(), EvidenceMode::default());
    Ok(bift_result(curve, trial))
}

// ─────────────────────────────────────────────────────────────
// GNOM
// ─────────────────────────────────────────────────────────────

/// 一个 GNOM 试验点
#[derive(Debug, Clone)]
struct GnomTrial {
    alpha: f64,
    dmax: f64,
    r: Vec<f64>,
    p: Vec<f64>,
    fit: Vec<f64>,
    criteria: CriteriaSet,
}

/// 在给定 α 求解并计算判据；求解失败时返回 `None`
fn gnom_trial(
    system: &GnomSystem,
    alpha: f64,
    weights: &CriteriaWeights,
    chi_reference: f64,
) -> Option<GnomTrial> {
    let p = system.solve(alpha).ok()?;
    let p_doubled = system.solve(2.0 * alpha).ok()?;
    let fit = system.forward(&p);

    let input = CriteriaInput {
        p: &p,
        p_doubled: &p_doubled,
        r: system.r(),
        intensity: system.intensity(),
        fit: &fit,
        sigma: system.sigma(),
        chi_reference,
    };
    let criteria = CriteriaSet::evaluate(&input, weights);

    Some(GnomTrial {
        alpha,
        dmax: system.dmax(),
        r: system.r().to_vec(),
        p,
        fit,
        criteria,
    })
}

fn gnom_result(curve: &ScatteringCurve, trial: GnomTrial) -> IftResult {
    let derived = derive(&trial.r, &trial.p);
    let chi = chi_squared(curve.intensity(), &trial.fit, curve.sigma());

    IftResult {
        algorithm: AlgorithmKind::Gnom,
        data: curve.clone(),
        r: trial.r,
        pr: trial.p,
        pr_error: None,
        fit: trial.fit,
        alpha: trial.alpha,
        dmax: trial.dmax,
        i0: derived.i0,
        rg: derived.rg,
        rg_squared_negative: derived.rg_squared_negative,
        chi_squared: chi,
        evidence: None,
        criteria: Some(trial.criteria),
        grid: None,
        best_chi_squared: None,
        uncertainty: None,
        degraded: false,
        cancelled: false,
    }
}

/// 没有有限 TOTAL 时以球形先验（纯 p(r) 单位）作为结果
fn gnom_fallback(curve: &ScatteringCurve, system: &GnomSystem, alpha: f64) -> IftResult {
    let r = system.r().to_vec();
    let factor = 4.0 * PI * grid_spacing(&r);
    let pr: Vec<f64> = sphere_prior(r.len(), curve.intensity()[0], system.dmax() - system.dmin())
        .iter()
        .map(|v| v / factor)
        .collect();
    let fit = system.forward(&pr);
    let derived = derive(&r, &pr);
    let chi = chi_squared(curve.intensity(), &fit, curve.sigma());

    IftResult {
        algorithm: AlgorithmKind::Gnom,
        data: curve.clone(),
        r,
        pr,
        pr_error: None,
        fit,
        alpha,
        dmax: system.dmax(),
        i0: derived.i0,
        rg: derived.rg,
        rg_squared_negative: derived.rg_squared_negative,
        chi_squared: chi,
        evidence: None,
        criteria: None,
        grid: None,
        best_chi_squared: None,
        uncertainty: None,
        degraded: true,
        cancelled: false,
    }
}

/// 解析 DISCRP 参考 χ²
fn chi_reference(
    system: &GnomSystem,
    settings: &GnomSettings,
    log_alphas: &[f64],
    cancel: &CancelToken,
) -> Result<f64> {
    match settings.chi_reference {
        ChiReference::Fixed(value) => Ok(value),
        ChiReference::Optimal => {
            Ok(optimal_chi_squared(system, log_alphas, &settings.refine, cancel)?.unwrap_or(0.0))
        }
    }
}

/// GNOM ln α 网格搜索 + 精修
pub fn gnom_search(
    curve: &ScatteringCurve,
    settings: &GnomSettings,
    cancel: &CancelToken,
    progress: &mut dyn ProgressSink,
) -> Result<IftResult> {
    validate_gnom(settings)?;

    let n = settings.pr_points;
    let log_alphas = log_alpha_grid(settings.min_alpha, settings.max_alpha, settings.alpha_points);
    let system = GnomSystem::new(curve, settings.dmin, settings.dmax, n, settings.force_ends_zero)?;
    let reference = chi_reference(&system, settings, &log_alphas, cancel)?;
    let total = log_alphas.len();

    let mut grid = ScoreGrid::new(vec![settings.dmax], log_alphas.clone());
    let mut best: Best<GnomTrial> = Best::new();
    let mut cancelled = false;

    progress.report(&ProgressEvent::Phase {
        phase: SearchPhase::GridSearch,
        total,
    });

    for (index, &log_alpha) in log_alphas.iter().enumerate() {
        if cancel.is_cancelled() {
            cancelled = true;
            break;
        }

        let alpha = log_alpha.exp();
        let trial = gnom_trial(&system, alpha, &settings.weights, reference);
        let score = trial
            .as_ref()
            .map(|t| t.criteria.total)
            .filter(|t| t.is_finite())
            .unwrap_or(f64::NAN);
        let chi = trial
            .as_ref()
            .map(|t| chi_squared(curve.intensity(), &t.fit, curve.sigma()))
            .unwrap_or(f64::NAN);

        grid.scores[0][index] = score;
        if let Some(trial) = trial {
            best.offer(index, -score, || trial);
        }

        progress.report(&ProgressEvent::GridPoint {
            index,
            total,
            dmax_index: 0,
            alpha_index: index,
            alpha,
            dmax: settings.dmax,
            score,
            chi_squared: chi,
            best_index: best.index,
            best_score: best.score(),
        });
    }

    let mut chosen = best.value.take();

    if let Some(grid_best) = chosen.as_ref() {
        if settings.refine.enabled && !cancelled {
            let start = if settings.refine_dmax {
                vec![grid_best.alpha.ln(), grid_best.dmax]
            } else {
                vec![grid_best.alpha.ln()]
            };
            let mut refined: Best<GnomTrial> = Best::new();
            let mut evaluation = 0;

            progress.report(&ProgressEvent::Phase {
                phase: SearchPhase::LocalRefine,
                total: settings.refine.max_iterations as usize,
            });

            let outcome = nelder_mead(&start, &settings.refine, cancel, |x| {
                let alpha = x[0].exp();
                let trial = if settings.refine_dmax {
                    GnomSystem::new(curve, settings.dmin, x[1], n, settings.force_ends_zero)
                        .ok()
                        .and_then(|s| gnom_trial(&s, alpha, &settings.weights, reference))
                } else {
                    gnom_trial(&system, alpha, &settings.weights, reference)
                };
                let trial = match trial {
                    Some(trial) if x[0].is_finite() => trial,
                    _ => return f64::NAN,
                };
                let score = trial.criteria.total;

                progress.report(&ProgressEvent::RefineStep {
                    evaluation,
                    alpha,
                    dmax: trial.dmax,
                    score,
                });
                refined.offer(evaluation, -score, || trial);
                evaluation += 1;
                -score
            })?;

            // 精修开始前就取消时 outcome 为 None，仍需记录取消
            if let Some(outcome) = outcome {
                cancelled |= outcome.cancelled;
            }
            cancelled |= cancel.is_cancelled();
            if refined.value.is_some() && refined.cost < best.cost {
                chosen = refined.value.take();
            }
        }
    }

    let mut result = match chosen {
        Some(trial) => gnom_result(curve, trial),
        None => gnom_fallback(curve, &system, log_alphas[0].exp()),
    };
    result.grid = Some(grid);
    result.cancelled = cancelled;

    progress.report(&ProgressEvent::Phase {
        phase: SearchPhase::Done,
        total: 0,
    });

    Ok(result)
}

/// 单点 GNOM 求解（`ChiReference::Optimal` 时 DISCRP 参考 χ² 取 0）
pub fn single_solve_gnom(
    curve: &ScatteringCurve,
    alpha: f64,
    settings: &GnomSettings,
) -> Result<IftResult> {
    validate_gnom(settings)?;
    if !(alpha >= 0.0) || !alpha.is_finite() {
        return Err(IftError::InvalidArgument(format!(
            "alpha must be non-negative and finite (got {})",
            alpha
        )));
    }

    let system = GnomSystem::new(
        curve,
        settings.dmin,
        settings.dmax,
        settings.pr_points,
        settings.force_ends_zero,
    )?;
    let reference = match settings.chi_reference {
        ChiReference::Fixed(value) => value,
        ChiReference::Optimal => 0.0,
    };

    match gnom_trial(&system, alpha, &settings.weights, reference) {
        Some(trial) => Ok(gnom_result(curve, trial)),
        None => Ok(gnom_fallback(curve, &system, alpha)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ift::control::NoProgress;
    use crate::ift::gnom::calc_pr;
    use crate::ift::simulate::{sphere_curve, sphere_radius_of_gyration};

    fn small_curve() -> ScatteringCurve {
        sphere_curve(&linspace(0.01, 0.3, 60), 40.0, 100.0, 0.05, Some(9)).unwrap()
    }

    /// 只做粗网格、不精修、不做 Monte Carlo
    fn quick_search() -> BiftSearch {
        BiftSearch {
            pr_points: 20,
            alpha_points: 3,
            dmax_points: 3,
            min_dmax: 30.0,
            max_dmax: 50.0,
            solver: BiftSettings {
                max_iterations: 50,
                ..BiftSettings::default()
            },
            refine: RefineSettings {
                enabled: false,
                ..RefineSettings::default()
            },
            monte_carlo: MonteCarloSettings {
                runs: 0,
                ..MonteCarloSettings::default()
            },
            ..BiftSearch::default()
        }
    }

    #[test]
    fn test_best_keeps_earliest_on_ties() {
        let mut best: Best<&str> = Best::new();
        assert!(best.offer(0, 1.0, || "first"));
        assert!(!best.offer(1, 1.0, || "second"));
        assert!(!best.offer(2, f64::NAN, || "nan"));
        assert!(!best.offer(3, f64::NEG_INFINITY, || "inf"));
        assert!(best.offer(4, 0.5, || "better"));
        assert_eq!(best.index, Some(4));
        assert_eq!(best.value, Some("better"));
        assert_eq!(best.score(), -0.5);
    }

    #[test]
    fn test_identical_grid_points_keep_first() {
        // 四个网格点的 (α, Dmax) 完全相同，得分必然相等
        let search = BiftSearch {
            min_alpha: 500.0,
            max_alpha: 500.0,
            alpha_points: 2,
            min_dmax: 40.0,
            max_dmax: 40.0,
            dmax_points: 2,
            ..quick_search()
        };
        let mut best_indices = Vec::new();
        let mut sink = |event: &ProgressEvent| {
            if let ProgressEvent::GridPoint { best_index, .. } = event {
                best_indices.push(*best_index);
            }
        };

        let result = bift_search(&small_curve(), &search, &CancelToken::new(), &mut sink).unwrap();

        assert_eq!(best_indices, vec![Some(0); 4]);
        let grid = result.grid.unwrap();
        assert_eq!(grid.evaluated(), 4);
        assert_eq!(grid.scores[0][0].to_bits(), grid.scores[1][1].to_bits());
    }

    #[test]
    fn test_rejects_bad_configuration_before_solving() {
        let curve = small_curve();
        let cancel = CancelToken::new();

        let err = bift_search(
            &curve,
            &BiftSearch {
                pr_points: 2,
                ..quick_search()
            },
            &cancel,
            &mut NoProgress,
        )
        .unwrap_err();
        assert!(matches!(err, IftError::InvalidInputShape(_)));

        let err = bift_search(
            &curve,
            &BiftSearch {
                min_alpha: 0.0,
                ..quick_search()
            },
            &cancel,
            &mut NoProgress,
        )
        .unwrap_err();
        assert!(matches!(err, IftError::InvalidArgument(_)));

        let mut gnom = GnomSettings::new(40.0);
        gnom.dmin = 50.0;
        assert!(gnom_search(&curve, &gnom, &cancel, &mut NoProgress).is_err());
    }

    #[test]
    fn test_mismatched_sigma_is_rejected() {
        let q = linspace(0.005, 0.35, 250);
        let intensity = vec![1.0; 250];
        let sigma = vec![0.5; 249];
        let err = ScatteringCurve::new("bad", q, intensity, sigma).unwrap_err();
        assert!(matches!(err, IftError::InvalidInputShape(_)));
    }

    #[test]
    fn test_gnom_single_solve_pins_ends() {
        let q = linspace(0.005, 0.35, 250);
        let curve = sphere_curve(&q, 45.0, 1000.0, 0.5, Some(42)).unwrap();

        let p = calc_pr(&curve, 1.0, 0.0, 45.0, 50, true).unwrap();
        assert_eq!(p.len(), 50);
        assert_eq!(p[0], 0.0);
        assert_eq!(p[49], 0.0);

        let result = single_solve_gnom(&curve, 1.0, &GnomSettings::new(45.0)).unwrap();
        assert_eq!(result.pr.first(), Some(&0.0));
        assert_eq!(result.pr.last(), Some(&0.0));
        assert!(result.criteria.is_some());
        assert_eq!(result.fit.len(), 250);
    }

    #[test]
    fn test_cancel_after_first_grid_point() {
        let curve = small_curve();
        let search = BiftSearch {
            refine: RefineSettings::default(),
            ..quick_search()
        };
        let cancel = CancelToken::new();
        let token = cancel.clone();
        let mut points = 0;
        let mut sink = |event: &ProgressEvent| {
            if let ProgressEvent::GridPoint { .. } = event {
                points += 1;
                token.cancel();
            }
        };

        let result = bift_search(&curve, &search, &cancel, &mut sink).unwrap();
        assert_eq!(points, 1);
        assert!(result.cancelled);
        assert!(!result.degraded);
        assert_eq!(result.grid.as_ref().map(|g| g.evaluated()), Some(1));

        // 第一个网格点: 最小 Dmax 与最小 α
        let first = BiftSystem::new(&curve, 30.0, 20)
            .unwrap()
            .solve(150.0_f64.ln().exp(), &search.solver);
        assert_eq!(result.dmax, 30.0);
        assert_eq!(result.alpha, 150.0_f64.ln().exp());
        assert_eq!(result.fit, first.fit);
        assert_eq!(result.chi_squared, first.chi_squared);
        assert_eq!(result.pr, pure_distribution(&first.p, 30.0).1);
    }

    #[test]
    fn test_cancel_matches_single_solve() {
        let curve = small_curve();
        let search = BiftSearch {
            pr_points: 20,
            solver: BiftSettings::default(),
            ..quick_search()
        };
        let cancel = CancelToken::new();
        let token = cancel.clone();
        let mut sink = |event: &ProgressEvent| {
            if let ProgressEvent::GridPoint { .. } = event {
                token.cancel();
            }
        };

        let result = bift_search(&curve, &search, &cancel, &mut sink).unwrap();
        let single = single_solve_bift(&curve, result.alpha, result.dmax, 20).unwrap();

        assert_eq!(result.pr, single.pr);
        assert_eq!(result.r, single.r);
        assert_eq!(result.fit, single.fit);
        assert_eq!(result.evidence, single.evidence);
        assert_eq!(result.rg.to_bits(), single.rg.to_bits());
    }

    #[test]
    fn test_cancel_before_start_is_degraded() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = bift_search(&small_curve(), &quick_search(), &cancel, &mut NoProgress).unwrap();
        assert!(result.cancelled);
        assert!(result.degraded);
        assert!(result.evidence.is_none());
        assert_eq!(result.pr.len(), 22);
    }

    #[test]
    fn test_all_degenerate_falls_back_to_prior() {
        // 零强度且 DISCRP 宽度为 0，每个点的 TOTAL 都是 NaN
        let q = linspace(0.01, 0.3, 40);
        let curve = ScatteringCurve::new("flat", q, vec![0.0; 40], vec![1.0; 40]).unwrap();
        let mut settings = GnomSettings::new(30.0);
        settings.pr_points = 10;
        settings.alpha_points = 4;
        settings.weights = CriteriaWeights {
            discrp: crate::ift::criteria::CriterionWeight::new(0.0, 0.0, 0.0),
            ..CriteriaWeights::default()
        };
        settings.refine.enabled = false;

        let result = gnom_search(&curve, &settings, &CancelToken::new(), &mut NoProgress).unwrap();
        assert!(result.degraded);
        assert!(result.criteria.is_none());
        assert_eq!(result.pr.len(), 10);
        assert!(result.chi_squared.is_finite());
        assert_eq!(result.grid.map(|g| g.scores[0].len()), Some(4));
    }

    #[test]
    fn test_gnom_search_on_sphere() {
        let q = linspace(0.01, 0.3, 80);
        let curve = sphere_curve(&q, 40.0, 100.0, 0.05, Some(4)).unwrap();
        let mut settings = GnomSettings::new(40.0);
        settings.pr_points = 30;
        settings.alpha_points = 20;

        let result = gnom_search(&curve, &settings, &CancelToken::new(), &mut NoProgress).unwrap();
        let criteria = result.criteria.unwrap();
        let expected = sphere_radius_of_gyration(40.0);

        assert!(!result.degraded);
        assert!(criteria.total > 0.0 && criteria.total <= 1.0);
        assert!(
            (result.rg - expected).abs() / expected < 0.15,
            "GNOM Rg should be near {}, got {}",
            expected,
            result.rg
        );
        assert_eq!(result.pr[0], 0.0);
    }

    #[test]
    fn test_evidence_has_single_interior_maximum() {
        // 无噪声球体，固定 Dmax 扫描 ln α
        let q = linspace(0.005, 0.35, 250);
        let curve = sphere_curve(&q, 45.0, 1000.0, 0.5, None).unwrap();
        let system = BiftSystem::new(&curve, 45.0, 50).unwrap();
        let settings = BiftSettings::default();

        let evidences: Vec<f64> = [-4.0, 0.0, 4.0, 8.0, 12.0, 16.0]
            .iter()
            .map(|la: &f64| {
                let alpha = la.exp();
                let solution = system.solve(alpha, &settings);
                system.evidence(alpha, &solution, EvidenceMode::Full)
            })
            .collect();

        let peak = evidences
            .iter()
            .enumerate()
            .fold(0, |best, (i, v)| if *v > evidences[best] { i } else { best });
        assert!(peak > 0 && peak < evidences.len() - 1, "{:?}", evidences);
        assert!(evidences[..=peak].windows(2).all(|w| w[0] < w[1]), "{:?}", evidences);
        assert!(evidences[peak..].windows(2).all(|w| w[0] > w[1]), "{:?}", evidences);
    }

    #[test]
    fn test_recovers_sphere_with_default_bounds() {
        let q = linspace(0.005, 0.35, 250);
        let curve = sphere_curve(&q, 45.0, 1000.0, 0.5, Some(42)).unwrap();
        let search = BiftSearch {
            monte_carlo: MonteCarloSettings {
                runs: 0,
                ..MonteCarloSettings::default()
            },
            ..BiftSearch::default()
        };

        let result = bift_search(&curve, &search, &CancelToken::new(), &mut NoProgress).unwrap();
        let expected_rg = sphere_radius_of_gyration(45.0);

        assert!(!result.degraded);
        assert!(
            (result.dmax - 45.0).abs() / 45.0 <= 0.2,
            "Dmax should be within 20% of 45, got {}",
            result.dmax
        );
        assert!(
            (result.rg - expected_rg).abs() / expected_rg <= 0.15,
            "Rg should be within 15% of {}, got {}",
            expected_rg,
            result.rg
        );
        assert_eq!(result.grid.map(|g| g.evaluated()), Some(160));
        assert!(result.best_chi_squared.is_some());
    }

    fn refining_search() -> BiftSearch {
        BiftSearch {
            refine: RefineSettings::default(),
            monte_carlo: MonteCarloSettings {
                runs: 4,
                ..MonteCarloSettings::default()
            },
            ..quick_search()
        }
    }

    fn refining_gnom() -> GnomSettings {
        let mut settings = GnomSettings::new(40.0);
        settings.pr_points = 20;
        settings.alpha_points = 6;
        settings
    }

    #[test]
    fn test_bift_cancel_when_refine_starts_keeps_grid_best() {
        let curve = small_curve();
        let cancel = CancelToken::new();
        let token = cancel.clone();
        let mut steps = 0;
        let mut sink = |event: &ProgressEvent| match event {
            ProgressEvent::Phase {
                phase: SearchPhase::LocalRefine,
                ..
            } => token.cancel(),
            ProgressEvent::RefineStep { .. } => steps += 1,
            _ => {}
        };

        let result = bift_search(&curve, &refining_search(), &cancel, &mut sink).unwrap();
        assert_eq!(steps, 0);
        assert!(result.cancelled);
        assert!(!result.degraded);
        assert!(result.uncertainty.is_none());

        let grid_only = bift_search(&curve, &quick_search(), &CancelToken::new(), &mut NoProgress).unwrap();
        assert_eq!(result.alpha, grid_only.alpha);
        assert_eq!(result.dmax, grid_only.dmax);
    }

    #[test]
    fn test_bift_cancel_on_first_refine_step() {
        let curve = small_curve();
        let cancel = CancelToken::new();
        let token = cancel.clone();
        let mut steps = 0;
        let mut sink = |event: &ProgressEvent| {
            if let ProgressEvent::RefineStep { evaluation, .. } = event {
                steps += 1;
                if *evaluation == 0 {
                    token.cancel();
                }
            }
        };

        let result = bift_search(&curve, &refining_search(), &cancel, &mut sink).unwrap();
        assert_eq!(steps, 1);
        assert!(result.cancelled);
        assert!(!result.degraded);
        assert!(result.uncertainty.is_none());
        assert!(result.evidence.is_some());
    }

    #[test]
    fn test_gnom_cancel_when_refine_starts_keeps_grid_best() {
        let curve = small_curve();
        let cancel = CancelToken::new();
        let token = cancel.clone();
        let mut steps = 0;
        let mut sink = |event: &ProgressEvent| match event {
            ProgressEvent::Phase {
                phase: SearchPhase::LocalRefine,
                ..
            } => token.cancel(),
            ProgressEvent::RefineStep { .. } => steps += 1,
            _ => {}
        };

        let result = gnom_search(&curve, &refining_gnom(), &cancel, &mut sink).unwrap();
        assert_eq!(steps, 0);
        assert!(result.cancelled);
        assert!(!result.degraded);
        assert!(result.criteria.is_some());

        let mut grid_settings = refining_gnom();
        grid_settings.refine.enabled = false;
        let grid_only = gnom_search(&curve, &grid_settings, &CancelToken::new(), &mut NoProgress).unwrap();
        assert!(!grid_only.cancelled);
        assert_eq!(result.alpha, grid_only.alpha);
        assert_eq!(result.dmax, grid_only.dmax);
    }

    #[test]
    fn test_gnom_cancel_on_first_refine_step() {
        let curve = small_curve();
        let cancel = CancelToken::new();
        let token = cancel.clone();
        let mut steps = 0;
        let mut sink = |event: &ProgressEvent| {
            if let ProgressEvent::RefineStep { evaluation, .. } = event {
                steps += 1;
                if *evaluation == 0 {
                    token.cancel();
                }
            }
        };

        let result = gnom_search(&curve, &refining_gnom(), &cancel, &mut sink).unwrap();
        assert_eq!(steps, 1);
        assert!(result.cancelled);
        assert!(!result.degraded);
        assert!(result.criteria.is_some());
    }
}
