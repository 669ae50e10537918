//! # Nelder–Mead 局部精修
//!
//! 以网格搜索的最优点为起点，用 argmin 的 Nelder–Mead 单纯形法最小化代价函数。
//!
//! - 初始单纯形: x₀ 以及每个坐标放大 5% 的顶点（坐标为 0 时取 0.00025）
//! - 非有限代价替换为一个很大的有限惩罚值，单纯形排序要求代价可比较
//! - 每次求值前检查取消标记；取消后不再调用代价函数，只返回惩罚值，
//!   单纯形随即退化收敛，结果为已见到的最优点
//!
//! 精修过程中见到的最优点单独记录（严格小于才更新），不依赖求解器的内部状态。
//!
//! ## 依赖关系
//! - 被 `ift/search.rs` 使用
//! - 使用 `ift/control.rs` 的 CancelToken
//! - 使用 argmin 的 NelderMead 与 Executor

use crate::error::{IftError, Result};
use crate::ift::control::CancelToken;

use argmin::core::{CostFunction, Error, Executor};
use argmin::solver::neldermead::NelderMead;

use std::cell::{Cell, RefCell};

/// 非有限代价的替代值
pub const NON_FINITE_PENALTY: f64 = 1e20;

/// 精修参数
#[derive(Debug, Clone, PartialEq)]
pub struct RefineSettings {
    /// 是否执行精修
    pub enabled: bool,
    /// 最大迭代次数
    pub max_iterations: u64,
    /// 单纯形顶点代价标准差的收敛阈值
    pub sd_tolerance: f64,
    /// 初始单纯形的相对步长
    pub initial_step: f64,
}

impl Default for RefineSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_iterations: 400,
            sd_tolerance: 1e-4,
            initial_step: 0.05,
        }
    }
}

/// 精修结果
#[derive(Debug, Clone, PartialEq)]
pub struct RefineOutcome {
    /// 见到的最优参数
    pub best_param: Vec<f64>,
    /// 对应代价（有限）
    pub best_cost: f64,
    /// 代价函数求值次数
    pub evaluations: usize,
    pub cancelled: bool,
}

/// 把闭包包装成 argmin 问题
struct Objective<'a, F> {
    cost: &'a RefCell<F>,
    cancel: &'a CancelToken,
    best: &'a RefCell<Option<(Vec<f64>, f64)>>,
    evaluations: &'a Cell<usize>,
}

impl<'a, F> CostFunction for Objective<'a, F>
where
    F: FnMut(&[f64]) -> f64,
{
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> std::result::Result<Self::Output, Error> {
        // argmin 在初始化单纯形时对代价结果直接 unwrap，取消只能以惩罚值表示
        if self.cancel.is_cancelled() {
            return Ok(NON_FINITE_PENALTY);
        }

        let value = {
            let mut cost = self.cost.borrow_mut();
            (*cost)(param.as_slice())
        };
        self.evaluations.set(self.evaluations.get() + 1);

        if !value.is_finite() {
            return Ok(NON_FINITE_PENALTY);
        }

        let mut best = self.best.borrow_mut();
        let improved = match best.as_ref() {
            Some((_, cost)) => value < *cost,
            None => true,
        };
        if improved {
            *best = Some((param.clone(), value));
        }

        Ok(value)
    }
}

/// 初始单纯形
fn initial_simplex(start: &[f64], step: f64) -> Vec<Vec<f64>> {
    let mut vertices = vec![start.to_vec()];
    for k in 0..start.len() {
        let mut vertex = start.to_vec();
        vertex[k] = if vertex[k] != 0.0 {
            vertex[k] * (1.0 + step)
        } else {
            0.00025
        };
        vertices.push(vertex);
    }
    vertices
}

/// 从 `start` 出发最小化 `cost`
///
/// 没有任何有限代价时返回 `None`。
pub fn nelder_mead<F>(
    start: &[f64],
    settings: &RefineSettings,
    cancel: &CancelToken,
    cost: F,
) -> Result<Option<RefineOutcome>>
where
    F: FnMut(&[f64]) -> f64,
{
    if start.is_empty() {
        return Err(IftError::InvalidArgument(
            "refinement needs at least one parameter".to_string(),
        ));
    }

    let cost = RefCell::new(cost);
    let best = RefCell::new(None);
    let evaluations = Cell::new(0);
    let objective = Objective {
        cost: &cost,
        cancel,
        best: &best,
        evaluations: &evaluations,
    };

    let solver = NelderMead::new(initial_simplex(start, settings.initial_step))
        .with_sd_tolerance(settings.sd_tolerance)
        .map_err(|e| IftError::InvalidArgument(e.to_string()))?;

    let max_iterations = settings.max_iterations;
    Executor::new(objective, solver)
        .configure(|state| state.max_iters(max_iterations))
        .run()
        .map_err(|e| IftError::Other(format!("Nelder-Mead failed: {}", e)))?;

    let cancelled = cancel.is_cancelled();

    let evaluations = evaluations.get();
    Ok(best
        .into_inner()
        .map(|(best_param, best_cost)| RefineOutcome {
            best_param,
            best_cost,
            evaluations,
            cancelled,
        }))
}
