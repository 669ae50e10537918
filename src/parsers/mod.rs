//! # 解析器模块
//!
//! 读取散射曲线文件。
//!
//! ## 依赖关系
//! - 被 `commands/` 模块使用
//! - 使用 `models/curve.rs` 数据模型
//! - 子模块: dat

pub mod dat;

pub use dat::{parse_dat_content, parse_dat_file};
