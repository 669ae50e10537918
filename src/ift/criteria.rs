//! # GNOM 感知判据
//!
//! 六项独立判据及其加权组合 TOTAL（Svergun 1992）：
//!
//! | 判据   | 含义                                     | 理想值 |
//! |--------|------------------------------------------|--------|
//! | DISCRP | 残差的 χ² 与参考 χ² 之差                 | 0.7    |
//! | OSCILL | P(r) 一阶导数范数与 P(r) 范数之比        | 1.1    |
//! | STABIL | α 加倍时 P(r) 的相对变化                 | 0.0    |
//! | SYSDEV | 相邻残差的符号变化比例                   | 1.0    |
//! | POSITV | P(r) 正值部分的范数占比                  | 1.0    |
//! | VALCEN | 中心区域 (1/4, 3/4) 的范数占比           | 0.95   |
//!
//! TOTAL = Σ wᵢ exp(-((targetᵢ - valueᵢ)/scaleᵢ)²) / Σ wᵢ，搜索时最大化。
//!
//! 所有函数都是纯函数。P(r) 范数为零时比值类判据返回 0，不会把 NaN 传给搜索。
//!
//! ## 依赖关系
//! - 被 `ift/search.rs` 使用
//! - 无其他内部依赖

use serde::{Deserialize, Serialize};

use std::f64::consts::PI;

/// 单项判据的 (权重, 宽度, 目标值)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriterionWeight {
    pub weight: f64,
    pub scale: f64,
    pub target: f64,
}

impl CriterionWeight {
    pub const fn new(weight: f64, scale: f64, target: f64) -> Self {
        Self {
            weight,
            scale,
            target,
        }
    }

    /// exp(-((target - value)/scale)²)
    fn probability(&self, value: f64) -> f64 {
        (-((self.target - value) / self.scale).powi(2)).exp()
    }
}

/// 六项判据的权重
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriteriaWeights {
    pub discrp: CriterionWeight,
    pub oscill: CriterionWeight,
    pub stabil: CriterionWeight,
    pub sysdev: CriterionWeight,
    pub positv: CriterionWeight,
    pub valcen: CriterionWeight,
}

impl Default for CriteriaWeights {
    fn default() -> Self {
        Self {
            discrp: CriterionWeight::new(0.0, 0.3, 0.7),
            oscill: CriterionWeight::new(3.0, 0.6, 1.1),
            stabil: CriterionWeight::new(3.0, 0.12, 0.0),
            sysdev: CriterionWeight::new(3.0, 0.12, 1.0),
            positv: CriterionWeight::new(1.0, 0.12, 1.0),
            valcen: CriterionWeight::new(1.0, 0.12, 0.95),
        }
    }
}

/// 一个解的全部判据
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriteriaSet {
    pub discrp: f64,
    pub oscill: f64,
    pub stabil: f64,
    pub sysdev: f64,
    pub positv: f64,
    pub valcen: f64,
    pub total: f64,
}

/// 计算判据所需的输入
#[derive(Debug, Clone, Copy)]
pub struct CriteriaInput<'a> {
    /// P(r)
    pub p: &'a [f64],
    /// 2α 下的 P(r)
    pub p_doubled: &'a [f64],
    pub r: &'a [f64],
    pub intensity: &'a [f64],
    pub fit: &'a [f64],
    pub sigma: &'a [f64],
    /// DISCRP 使用的参考 χ²（约化）
    pub chi_reference: f64,
}

impl CriteriaSet {
    /// 计算六项判据与 TOTAL
    pub fn evaluate(input: &CriteriaInput<'_>, weights: &CriteriaWeights) -> Self {
        let mut set = CriteriaSet {
            discrp: discrp(input.intensity, input.fit, input.sigma, input.chi_reference),
            oscill: oscill(input.p, input.r),
            stabil: stabil(input.p, input.p_doubled),
            sysdev: sysdev(input.intensity, input.fit),
            positv: positv(input.p),
            valcen: valcen(input.p, input.r),
            total: 0.0,
        };
        set.total = set.combine(weights);
        set
    }

    /// 加权组合 TOTAL
    pub fn combine(&self, weights: &CriteriaWeights) -> f64 {
        let terms = [
            (weights.discrp, self.discrp),
            (weights.oscill, self.oscill),
            (weights.stabil, self.stabil),
            (weights.sysdev, self.sysdev),
            (weights.positv, self.positv),
            (weights.valcen, self.valcen),
        ];

        let weight_sum: f64 = terms.iter().map(|(w, _)| w.weight).sum();
        if weight_sum == 0.0 {
            return 0.0;
        }

        terms
            .iter()
            .map(|(w, v)| w.weight * w.probability(*v))
            .sum::<f64>()
            / weight_sum
    }
}

fn norm(values: impl Iterator<Item = f64>) -> f64 {
    values.map(|v| v * v).sum::<f64>().sqrt()
}

/// 比值，分母为零时返回 0
fn guarded_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 || !denominator.is_finite() {
        0.0
    } else {
        numerator / denominator
    }
}

/// DISCRP = √(mean((I - I_model)²/σ²) - χ²_ref)，负值截断为 0
pub fn discrp(intensity: &[f64], fit: &[f64], sigma: &[f64], chi_reference: f64) -> f64 {
    if intensity.is_empty() {
        return 0.0;
    }
    let mean = intensity
        .iter()
        .zip(fit)
        .zip(sigma)
        .map(|((i, f), s)| ((i - f) / s).powi(2))
        .sum::<f64>()
        / intensity.len() as f64;

    (mean - chi_reference).max(0.0).sqrt()
}

/// OSCILL = (‖dP/dr‖ / ‖P‖) / (π / (Dmax - Dmin))
pub fn oscill(p: &[f64], r: &[f64]) -> f64 {
    if p.len() < 2 || r.len() < 2 {
        return 0.0;
    }
    let dr = r[1] - r[0];
    let span = r[r.len() - 1] - r[0];
    let derivative = norm(p.windows(2).map(|w| (w[1] - w[0]) / dr));

    guarded_ratio(guarded_ratio(derivative, norm(p.iter().cloned())), PI / span)
}

/// STABIL = ‖P - P(2α)‖ / ‖P‖
pub fn stabil(p: &[f64], p_doubled: &[f64]) -> f64 {
    let diff = norm(p.iter().zip(p_doubled).map(|(a, b)| a - b));
    guarded_ratio(diff, norm(p.iter().cloned()))
}

/// SYSDEV = 相邻残差符号变化次数 / floor((M-1)/2)
pub fn sysdev(intensity: &[f64], fit: &[f64]) -> f64 {
    let residual_sign: Vec<i8> = intensity
        .iter()
        .zip(fit)
        .map(|(i, f)| sign(i - f))
        .collect();

    let changes = residual_sign.windows(2).filter(|w| w[0] != w[1]).count();
    let expected = (residual_sign.len().saturating_sub(1) / 2) as f64;

    guarded_ratio(changes as f64, expected)
}

/// 符号函数，0 的符号为 0
fn sign(x: f64) -> i8 {
    if x > 0.0 {
        1
    } else if x < 0.0 {
        -1
    } else {
        0
    }
}

/// POSITV = ‖P⁺‖ / ‖P‖
pub fn positv(p: &[f64]) -> f64 {
    let positive = norm(p.iter().map(|v| v.max(0.0)));
    guarded_ratio(positive, norm(p.iter().cloned()))
}

/// VALCEN = max(‖P*⁻‖, ‖P*⁺‖) / ‖P‖，P* 为 (Dmin + ΔD/4, Dmax - ΔD/4) 内的部分
pub fn valcen(p: &[f64], r: &[f64]) -> f64 {
    if r.is_empty() {
        return 0.0;
    }
    let dmin = r[0];
    let dmax = r[r.len() - 1];
    let quarter = (dmax - dmin) / 4.0;
    let (low, high) = (dmin + quarter, dmax - quarter);

    let center: Vec<f64> = p
        .iter()
        .zip(r)
        .map(|(v, ri)| if *ri > low && *ri < high { *v } else { 0.0 })
        .collect();

    let negative = norm(center.iter().map(|v| v.min(0.0)));
    let positive = norm(center.iter().map(|v| v.max(0.0)));

    guarded_ratio(negative.max(positive), norm(p.iter().cloned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ift::matrix::linspace;
    use crate::ift::prior::sphere_pair_distribution;
    use approx::assert_relative_eq;

    fn sphere() -> (Vec<f64>, Vec<f64>) {
        let r = linspace(0.0, 50.0, 101);
        let p = sphere_pair_distribution(&r, 50.0);
        (r, p)
    }

    #[test]
    fn test_sphere_reference_values() {
        let (r, p) = sphere();
        let osc = oscill(&p, &r);
        let val = valcen(&p, &r);
        assert!((osc - 1.1).abs() < 0.1, "OSCILL of a sphere should be ~1.1, got {}", osc);
        assert!((val - 0.95).abs() < 0.05, "VALCEN of a sphere should be ~0.95, got {}", val);
        assert_eq!(positv(&p), 1.0);
    }

    #[test]
    fn test_zero_distribution_is_guarded() {
        let r = linspace(0.0, 10.0, 11);
        let p = vec![0.0; 11];
        assert_eq!(oscill(&p, &r), 0.0);
        assert_eq!(stabil(&p, &p), 0.0);
        assert_eq!(positv(&p), 0.0);
        assert_eq!(valcen(&p, &r), 0.0);
    }

    #[test]
    fn test_sysdev_counts_sign_changes() {
        let intensity = [1.0, 1.0, 1.0, 1.0, 1.0];
        // 残差: +, -, +, -, +
        let fit = [0.5, 1.5, 0.5, 1.5, 0.5];
        assert_relative_eq!(sysdev(&intensity, &fit), 4.0 / 2.0);

        let same = [0.5; 5];
        assert_eq!(sysdev(&intensity, &same), 0.0);
    }

    #[test]
    fn test_positv_and_stabil() {
        let p = [3.0, -4.0];
        assert_relative_eq!(positv(&p), 3.0 / 5.0);
        assert_relative_eq!(stabil(&[3.0, 4.0], &[3.0, 4.0]), 0.0);
        assert_relative_eq!(stabil(&[3.0, 4.0], &[0.0, 0.0]), 1.0);
    }

    #[test]
    fn test_discrp_is_clamped() {
        let intensity = [1.0, 2.0];
        let fit = [1.1, 1.9];
        let sigma = [0.1, 0.1];
        assert_relative_eq!(discrp(&intensity, &fit, &sigma, 0.0), 1.0, epsilon = 1e-12);
        assert_eq!(discrp(&intensity, &fit, &sigma, 5.0), 0.0);
    }

    #[test]
    fn test_total_at_targets_is_one() {
        let weights = CriteriaWeights::default();
        let set = CriteriaSet {
            discrp: 0.7,
            oscill: 1.1,
            stabil: 0.0,
            sysdev: 1.0,
            positv: 1.0,
            valcen: 0.95,
            total: 0.0,
        };
        assert_relative_eq!(set.combine(&weights), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_evaluate_is_idempotent() {
        let (r, p) = sphere();
        let p2: Vec<f64> = p.iter().map(|v| v * 0.98).collect();
        let intensity = [5.0, 4.0, 3.0, 2.0, 1.0];
        let fit = [5.1, 3.9, 3.05, 1.9, 1.02];
        let sigma = [0.1; 5];
        let input = CriteriaInput {
            p: &p,
            p_doubled: &p2,
            r: &r,
            intensity: &intensity,
            fit: &fit,
            sigma: &sigma,
            chi_reference: 0.0,
        };
        let weights = CriteriaWeights::default();

        let a = CriteriaSet::evaluate(&input, &weights);
        let b = CriteriaSet::evaluate(&input, &weights);
        assert_eq!(a.total.to_bits(), b.total.to_bits());
        assert_eq!(a, b);
    }
}
