//! # IFT 结果数据模型
//!
//! 一次 IFT 调用（网格搜索或单点求解）的完整输出。结果独占自己的
//! P(r)、r 网格与拟合曲线，引擎返回后不再持有任何引用。
//!
//! ## 依赖关系
//! - 由 `ift/search.rs` 构造
//! - 被 `export/` 和 `commands/` 使用
//! - 使用 `ift/criteria.rs`、`ift/montecarlo.rs` 的结果类型

use crate::ift::criteria::CriteriaSet;
use crate::ift::montecarlo::Uncertainty;
use crate::models::ScatteringCurve;

use serde::{Deserialize, Serialize};

/// 使用的 IFT 算法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlgorithmKind {
    Bift,
    Gnom,
}

impl std::fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlgorithmKind::Bift => write!(f, "BIFT"),
            AlgorithmKind::Gnom => write!(f, "GNOM"),
        }
    }
}

/// 网格搜索的得分矩阵（用于热图诊断）
///
/// `scores[d][a]` 对应 `dmax_points[d]` 与 `log_alpha_points[a]`。BIFT 为
/// evidence，GNOM 为 TOTAL，两者都是越大越好；未计算或非有限的点为 NaN。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreGrid {
    pub dmax_points: Vec<f64>,
    pub log_alpha_points: Vec<f64>,
    pub scores: Vec<Vec<f64>>,
}

impl ScoreGrid {
    pub fn new(dmax_points: Vec<f64>, log_alpha_points: Vec<f64>) -> Self {
        let scores = vec![vec![f64::NAN; log_alpha_points.len()]; dmax_points.len()];
        ScoreGrid {
            dmax_points,
            log_alpha_points,
            scores,
        }
    }

    /// 已计算的点数
    pub fn evaluated(&self) -> usize {
        self.scores
            .iter()
            .flatten()
            .filter(|s| s.is_finite())
            .count()
    }
}

/// 网格中 χ² 最小的点（仅用于诊断，不参与选择）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChiSquaredBest {
    pub alpha: f64,
    pub dmax: f64,
    pub chi_squared: f64,
}

/// IFT 结果
#[derive(Debug, Clone)]
pub struct IftResult {
    /// 使用的算法
    pub algorithm: AlgorithmKind,
    /// 参与拟合的数据（q 范围选择之后）
    pub data: ScatteringCurve,

    /// r 网格
    pub r: Vec<f64>,
    /// P(r)（已去除 4πΔr 因子）
    pub pr: Vec<f64>,
    /// P(r) 误差带（Monte Carlo 估计时才有）
    pub pr_error: Option<Vec<f64>>,
    /// 在数据 q 点上的拟合强度
    pub fit: Vec<f64>,

    /// 最终的正则化参数 α
    pub alpha: f64,
    /// 最终的最大尺寸 Dmax
    pub dmax: f64,
    /// P(r) 积分得到的 I(0)
    pub i0: f64,
    /// 回转半径 Rg = √|Rg²|
    pub rg: f64,
    /// Rg² 为负（被绝对值掩盖的退化解）
    pub rg_squared_negative: bool,
    /// 数据网格上的 χ²
    pub chi_squared: f64,

    /// BIFT evidence
    pub evidence: Option<f64>,
    /// GNOM 六项判据
    pub criteria: Option<CriteriaSet>,
    /// 网格搜索得分
    pub grid: Option<ScoreGrid>,
    /// 网格中 χ² 最小的点
    pub best_chi_squared: Option<ChiSquaredBest>,
    /// Monte Carlo 不确定度
    pub uncertainty: Option<Uncertainty>,

    /// 没有任何有限得分的试验点，结果退回到先验分布
    pub degraded: bool,
    /// 搜索被用户取消，结果为取消前的最优解
    pub cancelled: bool,
}

impl IftResult {
    /// 曲线名称
    pub fn name(&self) -> &str {
        self.data.name()
    }

    /// 结果是否可信（未退化、Rg² 非负）
    pub fn is_reliable(&self) -> bool {
        !self.degraded && !self.rg_squared_negative && self.chi_squared.is_finite()
    }
}
