//! # IFT 计算模块
//!
//! 小角散射数据的间接 Fourier 变换：由 I(q) 求实空间对分布函数 P(r)。
//!
//! ## 子模块
//! - `matrix`: 变换矩阵与两种正则化矩阵
//! - `prior`: 球形先验
//! - `bift`: BIFT 不动点迭代求解器
//! - `gnom`: GNOM 正则化最小二乘
//! - `evidence`: BIFT evidence
//! - `criteria`: GNOM 六项判据与 TOTAL
//! - `derived`: I(0)、Rg、χ²
//! - `refine`: Nelder–Mead 精修
//! - `search`: 网格搜索与单点求解入口
//! - `montecarlo`: BIFT 不确定度
//! - `control`: 取消与进度
//! - `simulate`: 合成球体曲线
//!
//! 所有计算都是同步、可重入的，不持有全局状态，也不做任何 I/O。
//!
//! ## 依赖关系
//! - 被 `commands/`、`export/` 使用
//! - 使用 `models/` 的 ScatteringCurve 与 IftResult

pub mod bift;
pub mod control;
pub mod criteria;
pub mod derived;
pub mod evidence;
pub mod gnom;
pub mod matrix;
pub mod montecarlo;
pub mod prior;
pub mod refine;
pub mod search;
pub mod simulate;

pub use bift::{BiftSettings, BiftSolution, BiftSystem, Termination};
pub use control::{CancelToken, NoProgress, ProgressEvent, ProgressSink, SearchPhase};
pub use criteria::{CriteriaSet, CriteriaWeights, CriterionWeight};
pub use evidence::EvidenceMode;
pub use gnom::calc_pr;
pub use montecarlo::{Estimate, MonteCarloSettings, Uncertainty};
pub use refine::RefineSettings;
pub use search::{
    bift_search, gnom_search, run_search, single_solve_bift, single_solve_gnom, BiftSearch,
    ChiReference, GnomSettings, IftAlgorithm,
};
