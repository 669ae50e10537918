//! # 导出量计算
//!
//! 由最终的 P(r) 通过梯形积分得到 I(0) 与 Rg，并在数据网格上计算 χ²。
//!
//! - I(0) = 4π ∫ p(r) dr
//! - Rg² = ∫ r² p(r) dr / (2 ∫ p(r) dr)，Rg = √|Rg²|
//!
//! Rg² 为负说明解已退化，取绝对值后照常输出，同时返回标记。
//!
//! ## 依赖关系
//! - 被 `ift/search.rs`、`ift/montecarlo.rs` 使用
//! - 无其他内部依赖

use std::f64::consts::PI;

/// I(0) 与 Rg
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedQuantities {
    pub i0: f64,
    pub rg: f64,
    /// Rg² < 0，数值被绝对值掩盖
    pub rg_squared_negative: bool,
}

/// 梯形积分
pub fn trapezoid(y: &[f64], x: &[f64]) -> f64 {
    y.windows(2)
        .zip(x.windows(2))
        .map(|(yw, xw)| (xw[1] - xw[0]) * (yw[0] + yw[1]) / 2.0)
        .sum()
}

/// 由纯单位的 p(r) 计算 I(0) 与 Rg
pub fn derive(r: &[f64], p: &[f64]) -> DerivedQuantities {
    let area = trapezoid(p, r);
    let weighted: Vec<f64> = p.iter().zip(r).map(|(v, ri)| v * ri * ri).collect();
    let second_moment = trapezoid(&weighted, r);

    let rg_squared = second_moment / (2.0 * area);

    DerivedQuantities {
        i0: 4.0 * PI * area,
        rg: rg_squared.abs().sqrt(),
        rg_squared_negative: rg_squared < 0.0,
    }
}

/// χ² = Σ ((I - I_model)/σ)²
pub fn chi_squared(intensity: &[f64], fit: &[f64], sigma: &[f64]) -> f64 {
    intensity
        .iter()
        .zip(fit)
        .zip(sigma)
        .map(|((i, f), s)| ((i - f) / s).powi(2))
        .sum()
}

/// 把求解器的 P（含 4πΔr 因子）转换为输出网格上的纯 p(r)
///
/// 两端补零后 r 网格为 linspace(0, Dmax, N+2)，再除以 4πΔr。
pub fn pure_distribution(p_solver: &[f64], dmax: f64) -> (Vec<f64>, Vec<f64>) {
    let n = p_solver.len() + 2;
    let r = crate::ift::matrix::linspace(0.0, dmax, n);
    let dr = r[1] - r[0];
    let factor = 4.0 * PI * dr;

    let mut p = Vec::with_capacity(n);
    p.push(0.0);
    p.extend(p_solver.iter().map(|v| v / factor));
    p.push(0.0);

    (r, p)
}
