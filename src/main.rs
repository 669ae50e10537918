//! # saxsift - 小角散射间接 Fourier 变换
//!
//! 由实验散射曲线 I(q) 求对分布函数 P(r)，并给出 Dmax、Rg、I(0)。
//!
//! ## 子命令
//! - `bift` - 贝叶斯 IFT（evidence 选 α 与 Dmax，Monte Carlo 误差）
//! - `gnom` - GNOM 风格正则化 IFT（固定 Dmax，感知判据选 α）
//! - `simulate` - 合成球体曲线
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     └── saxsift 库 (parsers/, ift/, export/, models/)
//!   ├── batch/      (目录批量处理)
//!   └── utils/      (终端输出与进度条)
//! ```

mod batch;
mod cli;
mod commands;
mod utils;

use clap::Parser;
use cli::Cli;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}
