//! # saxsift - 小角散射间接 Fourier 变换
//!
//! 由 SAXS 曲线 I(q) 求对分布函数 P(r)，提供 BIFT（贝叶斯）与 GNOM（感知判据）两种方法。
//!
//! ## 依赖关系
//! ```text
//! lib.rs
//!   ├── error.rs    (错误处理)
//!   ├── models/     (数据模型)
//!   ├── ift/        (求解、评分与超参数搜索)
//!   ├── parsers/    (三列 ASCII 曲线读取)
//!   └── export/     (CSV 与图表输出)
//! ```

pub mod error;
pub mod export;
pub mod ift;
pub mod models;
pub mod parsers;

pub use error::{IftError, Result};
