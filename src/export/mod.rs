//! # 结果导出模块
//!
//! 把 IFT 结果写成 CSV 表格和 PNG/SVG 图表，把曲线写成三列文本。
//!
//! ## 子模块
//! - `csv`: P(r)、拟合曲线、得分网格与汇总表
//! - `plot`: P(r) 与拟合曲线的双栏图
//!
//! ## 依赖关系
//! - 被 `commands/` 调用
//! - 使用 `models/` 的 IftResult、ScatteringCurve

pub mod csv;
pub mod plot;

pub use self::csv::{write_curve, write_fit, write_grid, write_pr, write_summary};
pub use self::plot::generate_result_plot;
