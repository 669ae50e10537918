//! # 散射曲线数据模型
//!
//! 存储一条测量得到的小角散射曲线 I(q) ± σ(q)。
//!
//! ## 不变量
//! - q、I、σ 三个数组等长
//! - q 严格递增
//! - σ > 0（BIFT/GNOM 都要除以 σ²）
//!
//! 构造时校验，之后不可变。引擎只读这个结构，不会修改调用方的数据。
//!
//! ## 依赖关系
//! - 被 `parsers/`、`ift/`、`export/` 使用
//! - 使用 `error.rs`

use crate::error::{IftError, Result};
use serde::{Deserialize, Serialize};

/// 求解器需要的最少数据点数
pub const MIN_CURVE_POINTS: usize = 3;

/// 小角散射曲线
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatteringCurve {
    /// 曲线标识（通常为文件名），只用于标注结果
    name: String,
    /// 散射矢量 q
    q: Vec<f64>,
    /// 强度 I(q)
    intensity: Vec<f64>,
    /// 误差 σ(q)
    sigma: Vec<f64>,
}

impl ScatteringCurve {
    /// 从三列数据创建曲线并校验
    pub fn new(
        name: impl Into<String>,
        q: Vec<f64>,
        intensity: Vec<f64>,
        sigma: Vec<f64>,
    ) -> Result<Self> {
        if q.len() != intensity.len() || q.len() != sigma.len() {
            return Err(IftError::InvalidInputShape(format!(
                "q, I and sigma must have equal length (got {}, {}, {})",
                q.len(),
                intensity.len(),
                sigma.len()
            )));
        }

        if q.len() < MIN_CURVE_POINTS {
            return Err(IftError::InvalidInputShape(format!(
                "at least {} data points are required (got {})",
                MIN_CURVE_POINTS,
                q.len()
            )));
        }

        if let Some(w) = q.windows(2).position(|w| !(w[1] > w[0])) {
            return Err(IftError::InvalidCurve(format!(
                "q must be strictly increasing (q[{}] = {}, q[{}] = {})",
                w,
                q[w],
                w + 1,
                q[w + 1]
            )));
        }

        if let Some(i) = sigma.iter().position(|s| !(*s > 0.0) || !s.is_finite()) {
            return Err(IftError::InvalidCurve(format!(
                "sigma must be positive and finite (sigma[{}] = {})",
                i, sigma[i]
            )));
        }

        Ok(ScatteringCurve {
            name: name.into(),
            q,
            intensity,
            sigma,
        })
    }

    /// 曲线名称
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn q(&self) -> &[f64] {
        &self.q
    }

    pub fn intensity(&self) -> &[f64] {
        &self.intensity
    }

    pub fn sigma(&self) -> &[f64] {
        &self.sigma
    }

    /// 数据点数
    pub fn len(&self) -> usize {
        self.q.len()
    }

    pub fn is_empty(&self) -> bool {
        self.q.is_empty()
    }

    /// 选取 [start, end) 区间的子曲线
    pub fn select_range(&self, start: usize, end: usize) -> Result<ScatteringCurve> {
        if start >= end || end > self.len() {
            return Err(IftError::InvalidRange(format!(
                "point range {}..{} is outside 0..{}",
                start,
                end,
                self.len()
            )));
        }

        ScatteringCurve::new(
            self.name.clone(),
            self.q[start..end].to_vec(),
            self.intensity[start..end].to_vec(),
            self.sigma[start..end].to_vec(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ScatteringCurve {
        ScatteringCurve::new(
            "sample",
            vec![0.01, 0.02, 0.03, 0.04, 0.05],
            vec![10.0, 8.0, 5.0, 3.0, 1.0],
            vec![0.1, 0.1, 0.1, 0.1, 0.1],
        )
        .unwrap()
    }

    #[test]
    fn test_mismatched_sigma_is_rejected() {
        let err = ScatteringCurve::new(
            "bad",
            vec![0.01, 0.02, 0.03],
            vec![1.0, 2.0, 3.0],
            vec![0.1, 0.1],
        )
        .unwrap_err();
        assert!(matches!(err, IftError::InvalidInputShape(_)));
    }

    #[test]
    fn test_non_increasing_q_is_rejected() {
        let err = ScatteringCurve::new(
            "bad",
            vec![0.01, 0.03, 0.02],
            vec![1.0, 2.0, 3.0],
            vec![0.1, 0.1, 0.1],
        )
        .unwrap_err();
        assert!(matches!(err, IftError::InvalidCurve(_)));
    }

    #[test]
    fn test_zero_sigma_is_rejected() {
        let err = ScatteringCurve::new(
            "bad",
            vec![0.01, 0.02, 0.03],
            vec![1.0, 2.0, 3.0],
            vec![0.1, 0.0, 0.1],
        )
        .unwrap_err();
        assert!(matches!(err, IftError::InvalidCurve(_)));
    }

    #[test]
    fn test_select_range() {
        let curve = sample();
        let sub = curve.select_range(1, 4).unwrap();
        assert_eq!(sub.len(), 3);
        assert_eq!(sub.q(), &[0.02, 0.03, 0.04]);
        assert_eq!(sub.name(), "sample");

        assert!(curve.select_range(3, 3).is_err());
        assert!(curve.select_range(0, 6).is_err());
        // 子曲线不足 3 个点
        assert!(curve.select_range(0, 2).is_err());
    }
}
