//! # 变换矩阵与正则化矩阵
//!
//! 构造离散的正向 Fourier 变换算子 T（I_model = T · P）以及两种平滑算子。
//!
//! ## 变换矩阵
//! T[i,j] = sin(q_i r_j) / (q_i r_j)。当 q_i r_j = 0 时取 0.5（不是极限值 1），
//! 与历史结果保持一致。
//!
//! ## 正则化矩阵
//! BIFT 与 GNOM 使用不同的二阶差分算子，两者的边界行不同，保持为两个独立函数：
//! - `gnom_regularization_matrix`: 内部行 [-0.5, 1, -0.5]，边界行为单位行
//! - `bift_curvature_matrix`: 每一行都是 [-0.5, 1, -0.5]（边界行保留单侧耦合）
//!
//! ## 依赖关系
//! - 被 `ift/bift.rs`、`ift/gnom.rs`、`ift/evidence.rs`、`ift/simulate.rs` 使用
//! - 使用 nalgebra 的 DMatrix

use nalgebra::DMatrix;

use std::f64::consts::PI;

/// q·r = 0 时的核函数取值
pub const DEGENERATE_KERNEL_VALUE: f64 = 0.5;

/// 变换矩阵的归一化方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Normalization {
    /// 仅核函数，解出的 P 包含 4πΔr 因子（BIFT）
    #[default]
    Unscaled,
    /// 核函数 × 4πΔr，解出的 P 即为纯 p(r)（GNOM）
    FullyScaled,
}

/// 等间距网格，语义同 numpy.linspace（含端点）
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// 网格间距 Δr = r[1] - r[0]
pub fn grid_spacing(r: &[f64]) -> f64 {
    if r.len() < 2 {
        0.0
    } else {
        r[1] - r[0]
    }
}

/// 构造变换矩阵 T，形状为 (len(q), len(r))
///
/// 不校验输入，非有限值按 IEEE 规则传播。
pub fn transform_matrix(q: &[f64], r: &[f64], normalization: Normalization) -> DMatrix<f64> {
    let scale = match normalization {
        Normalization::Unscaled => 1.0,
        Normalization::FullyScaled => 4.0 * PI * grid_spacing(r),
    };

    DMatrix::from_fn(q.len(), r.len(), |i, j| {
        let qr = q[i] * r[j];
        let kernel = if qr == 0.0 {
            DEGENERATE_KERNEL_VALUE
        } else {
            qr.sin() / qr
        };
        scale * kernel
    })
}

/// GNOM 正则化矩阵
pub fn gnom_regularization_matrix(n: usize) -> DMatrix<f64> {
    DMatrix::from_fn(n, n, |i, j| {
        let boundary = i == 0 || i + 1 == n;
        if i == j {
            1.0
        } else if !boundary && i.abs_diff(j) == 1 {
            -0.5
        } else {
            0.0
        }
    })
}

/// BIFT 平滑项的 Hessian A
///
/// 三对角矩阵，对角线 1，次对角线 -0.5，ln det A = ln(n+1) - n ln 2。
pub fn bift_curvature_matrix(n: usize) -> DMatrix<f64> {
    DMatrix::from_fn(n, n, |i, j| {
        if i == j {
            1.0
        } else if i.abs_diff(j) == 1 {
            -0.5
        } else {
            0.0
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_linspace_endpoints() {
        let r = linspace(0.0, 45.0, 50);
        assert_eq!(r.len(), 50);
        assert_eq!(r[0], 0.0);
        assert_eq!(r[49], 45.0);
        assert_relative_eq!(grid_spacing(&r), 45.0 / 49.0, epsilon = 1e-12);

        assert!(linspace(1.0, 2.0, 0).is_empty());
        assert_eq!(linspace(1.0, 2.0, 1), vec![1.0]);
    }

    #[test]
    fn test_degenerate_kernel_is_one_half() {
        let q = [0.0, 0.01, 0.2];
        let r = linspace(0.0, 40.0, 10);
        let t = transform_matrix(&q, &r, Normalization::Unscaled);

        assert_eq!(t.shape(), (3, 10));
        // q = 0 整行以及 r = 0 整列都取 0.5
        for j in 0..10 {
            assert_eq!(t[(0, j)], 0.5);
        }
        for i in 0..3 {
            assert_eq!(t[(i, 0)], 0.5);
        }
        assert!(t.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_kernel_values() {
        let q = [0.1];
        let r = [0.0, 10.0];
        let t = transform_matrix(&q, &r, Normalization::Unscaled);
        assert_relative_eq!(t[(0, 1)], 1.0_f64.sin(), epsilon = 1e-12);
    }

    #[test]
    fn test_fully_scaled_factor() {
        let q = [0.05, 0.1, 0.15];
        let r = linspace(0.0, 30.0, 16);
        let dr = grid_spacing(&r);
        let t0 = transform_matrix(&q, &r, Normalization::Unscaled);
        let t1 = transform_matrix(&q, &r, Normalization::FullyScaled);

        for (a, b) in t0.iter().zip(t1.iter()) {
            assert_relative_eq!(*b, a * 4.0 * PI * dr, epsilon = 1e-12);
        }
        assert_relative_eq!(t1[(0, 0)], 0.5 * 4.0 * PI * dr, epsilon = 1e-12);
    }

    #[test]
    fn test_gnom_matrix_row_sums() {
        let l = gnom_regularization_matrix(8);
        for i in 0..8 {
            let sum: f64 = l.row(i).iter().sum();
            if i == 0 || i == 7 {
                assert_eq!(sum, 1.0, "boundary row {} should be identity", i);
                assert_eq!(l[(i, i)], 1.0);
            } else {
                assert!(sum.abs() < 1e-15, "interior row {} sums to {}", i, sum);
                assert_eq!(l[(i, i - 1)], -0.5);
                assert_eq!(l[(i, i + 1)], -0.5);
            }
        }
        assert_eq!(l[(0, 1)], 0.0);
        assert_eq!(l[(7, 6)], 0.0);
    }

    #[test]
    fn test_bift_matrix_row_sums_and_determinant() {
        let n = 12;
        let a = bift_curvature_matrix(n);
        for i in 1..n - 1 {
            let sum: f64 = a.row(i).iter().sum();
            assert!(sum.abs() < 1e-15);
        }
        // 边界行只有一侧耦合
        assert_eq!(a.row(0).iter().sum::<f64>(), 0.5);
        assert_eq!(a.row(n - 1).iter().sum::<f64>(), 0.5);

        let expected = ((n + 1) as f64).ln() - n as f64 * 2.0_f64.ln();
        assert_relative_eq!(a.determinant().ln(), expected, epsilon = 1e-10);
    }
}
