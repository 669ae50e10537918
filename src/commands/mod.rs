//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/`、`batch/`、`utils/` 以及 `saxsift` 库
//! - 子模块: bift, gnom, simulate, fit

pub mod bift;
pub mod fit;
pub mod gnom;
pub mod simulate;

use crate::cli::Commands;
use saxsift::error::Result;

/// 执行命令
pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Bift(args) => bift::execute(args),
        Commands::Gnom(args) => gnom::execute(args),
        Commands::Simulate(args) => simulate::execute(args),
    }
}
