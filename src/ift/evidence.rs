//! # BIFT evidence
//!
//! 对给定 (α, Dmax) 的解打分，搜索时最小化 -evidence。
//!
//! ## 完整形式（默认）
//! ```text
//! Q        = α·s - χ²/2
//! evidence = ln det(A)/2 + Q - ln det(B/α + A)/2 + ln α
//! ```
//! 其中 A 为平滑项 Hessian（`bift_curvature_matrix`），ln det A = ln(N+1) - N ln 2，
//! B 为数据项 Hessian，ln α 来自 α 的均匀先验 1/α。
//!
//! ## 简化形式
//! 只保留 Q = α·s - χ²/2，不含行列式项。对同一 Dmax 的 α 扫描仍能给出
//! 排序，但在不同 N 之间不可比较。
//!
//! ## 依赖关系
//! - 被 `ift/bift.rs`、`ift/search.rs` 使用
//! - 使用 `ift/matrix.rs` 的 bift_curvature_matrix

use crate::ift::matrix::bift_curvature_matrix;

use nalgebra::DMatrix;

use std::f64::consts::LN_2;

/// evidence 的计算方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvidenceMode {
    /// 含行列式项的完整 evidence
    #[default]
    Full,
    /// 仅 α·s - χ²/2
    Simplified,
}

/// 计算 BIFT evidence
///
/// 矩阵不可 Cholesky 分解（例如 α = 0）时返回 NaN，由搜索端排除。
pub fn bift_evidence(alpha: f64, s: f64, chi_squared: f64, b: &DMatrix<f64>, mode: EvidenceMode) -> f64 {
    let q = alpha * s - 0.5 * chi_squared;

    match mode {
        EvidenceMode::Simplified => q,
        EvidenceMode::Full => {
            let n = b.nrows();
            let log_det_a = ((n + 1) as f64).ln() - n as f64 * LN_2;
            let ab = b / alpha + bift_curvature_matrix(n);

            0.5 * log_det_a + q - 0.5 * log_determinant(ab) + alpha.ln()
        }
    }
}

/// 对称正定矩阵的 ln det
fn log_determinant(matrix: DMatrix<f64>) -> f64 {
    if matrix.iter().any(|v| !v.is_finite()) {
        return f64::NAN;
    }

    match matrix.cholesky() {
        Some(chol) => 2.0 * chol.l().diagonal().iter().map(|d| d.ln()).sum::<f64>(),
        None => f64::NAN,
    }
}
