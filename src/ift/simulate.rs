//! # 合成球体散射曲线
//!
//! 用球形先验作为 P(r)，经未缩放的变换矩阵正变换得到 I(q)，
//! 再叠加给定标准差的高斯噪声。用于测试和 `simulate` 子命令。
//!
//! ## 依赖关系
//! - 被 `commands/simulate.rs` 和各模块的测试使用
//! - 使用 `ift/matrix.rs`、`ift/prior.rs`
//! - 使用 rand / rand_distr 生成可复现的噪声

use crate::error::{IftError, Result};
use crate::ift::matrix::{linspace, transform_matrix, Normalization};
use crate::ift::prior::sphere_prior;
use crate::models::ScatteringCurve;

use nalgebra::DVector;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

/// 生成曲线时 P(r) 的点数
pub const SIMULATION_PR_POINTS: usize = 50;

/// 直径为 dmax 的均匀球的解析回转半径 √(3/5)·R
pub fn sphere_radius_of_gyration(dmax: f64) -> f64 {
    (3.0_f64 / 5.0).sqrt() * dmax / 2.0
}

/// 无噪声的球体强度，I(q→0) ≈ scale
pub fn sphere_intensity(q: &[f64], dmax: f64, scale: f64) -> Vec<f64> {
    let r = linspace(0.0, dmax, SIMULATION_PR_POINTS);
    let p = sphere_prior(SIMULATION_PR_POINTS, scale, dmax);
    let t = transform_matrix(q, &r, Normalization::Unscaled);
    (t * DVector::from_vec(p)).iter().cloned().collect()
}

/// 合成球体曲线
///
/// `noise_sigma` 同时作为误差列；`seed` 为 `None` 时不加噪声。
pub fn sphere_curve(
    q: &[f64],
    dmax: f64,
    scale: f64,
    noise_sigma: f64,
    seed: Option<u64>,
) -> Result<ScatteringCurve> {
    if !(dmax > 0.0) || !dmax.is_finite() {
        return Err(IftError::InvalidArgument(format!(
            "Dmax must be positive and finite (got {})",
            dmax
        )));
    }

    let mut intensity = sphere_intensity(q, dmax, scale);

    if let Some(seed) = seed {
        let normal = Normal::new(0.0, noise_sigma)
            .map_err(|e| IftError::InvalidArgument(format!("noise sigma: {}", e)))?;
        let mut rng = StdRng::seed_from_u64(seed);
        for value in intensity.iter_mut() {
            *value += normal.sample(&mut rng);
        }
    }

    ScatteringCurve::new(
        format!("sphere_D{}", dmax),
        q.to_vec(),
        intensity,
        vec![noise_sigma; q.len()],
    )
}
