//! # 球形先验分布
//!
//! 生成均匀球体的 P(r)，作为 BIFT 迭代的初值与平滑参考。
//!
//! P(r) = r² (1 - 1.5 r/D + 0.5 (r/D)³) · scale / (D³/24) · Δr
//!
//! 由于 ∫₀ᴰ r²(1 - 1.5 r/D + 0.5 (r/D)³) dr = D³/24，离散和 Σ P ≈ scale。
//! 不高于最大值 0.5% 的点被抬到该下限，然后整体缩放以保持总和不变，
//! 避免迭代从严格为零的端点出发。
//!
//! ## 依赖关系
//! - 被 `ift/bift.rs`、`ift/search.rs`、`ift/simulate.rs` 使用
//! - 使用 `ift/matrix.rs` 的 linspace

use crate::ift::matrix::linspace;

/// 先验下限（相对于最大值）
pub const PRIOR_FLOOR_FRACTION: f64 = 0.005;

/// 直径为 dmax 的均匀球的 P(r) 形状（未归一化），r > dmax 处为 0
pub fn sphere_pair_distribution(r: &[f64], dmax: f64) -> Vec<f64> {
    r.iter()
        .map(|&ri| {
            if ri > dmax {
                0.0
            } else {
                let x = ri / dmax;
                ri * ri * (1.0 - 1.5 * x + 0.5 * x.powi(3))
            }
        })
        .collect()
}

/// BIFT 使用的球形先验，定义在 linspace(0, dmax, n) 上
pub fn sphere_prior(n: usize, scale: f64, dmax: f64) -> Vec<f64> {
    let r = linspace(0.0, dmax, n);
    let dr = if n > 1 { r[1] } else { 0.0 };
    let norm = scale / (dmax.powi(3) / 24.0) * dr;

    let mut p: Vec<f64> = sphere_pair_distribution(&r, dmax)
        .into_iter()
        .map(|v| v * norm)
        .collect();

    let max = p.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let floor = PRIOR_FLOOR_FRACTION * max;
    let sum_before: f64 = p.iter().sum();

    for v in p.iter_mut() {
        if *v <= floor {
            *v = floor;
        }
    }

    let sum_after: f64 = p.iter().sum();
    if sum_after != 0.0 && sum_after.is_finite() {
        let factor = sum_before / sum_after;
        for v in p.iter_mut() {
            *v *= factor;
        }
    }

    p
}
