//! # 数据模型模块
//!
//! 定义散射曲线与 IFT 结果的数据模型。
//!
//! ## 依赖关系
//! - 被 `parsers/`、`ift/`、`export/` 和 `commands/` 使用
//! - 子模块: curve, result

pub mod curve;
pub mod result;

pub use curve::ScatteringCurve;
pub use result::{AlgorithmKind, ChiSquaredBest, IftResult, ScoreGrid};
