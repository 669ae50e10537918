//! # 批量处理模块
//!
//! 对目录中的多条散射曲线并行执行同一分析。
//!
//! ## 功能
//! - 单文件/目录输入
//! - 逗号分隔的多个 glob 模式，可选递归
//! - rayon 并行，indicatif 进度条
//! - 成功结果收集与失败汇总
//!
//! ## 依赖关系
//! - 被 `commands/bift.rs`、`commands/gnom.rs` 使用
//! - 使用 `rayon` 进行并行处理
//! - 使用 `indicatif` 显示进度

pub mod collector;
pub mod runner;

pub use collector::FileCollector;
pub use runner::{BatchResult, BatchRunner, ProcessResult};
