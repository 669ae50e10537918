//! # 终端输出
//!
//! 拟合流程的状态行。`ift` 库本身不打印，命令层的所有提示都经由这里，
//! 每行以一个着色标签开头，错误走 stderr，其余走 stdout。
//!
//! ## 依赖关系
//! - 被所有 `commands/` 模块使用
//! - 使用 `colored` crate

use colored::{ColoredString, Colorize};
use std::path::Path;

/// 标题栏与分隔线的宽度（字符数）
const RULE_WIDTH: usize = 60;

/// 状态行的种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Ok,
    Error,
    Warning,
    Info,
    Skip,
    Done,
}

impl Status {
    fn label(self) -> &'static str {
        match self {
            Status::Ok => "[OK]",
            Status::Error => "[ERR]",
            Status::Warning => "[WARN]",
            Status::Info => "[*]",
            Status::Skip => "[SKIP]",
            Status::Done => "[DONE]",
        }
    }

    fn tag(self) -> ColoredString {
        let label = self.label();
        match self {
            Status::Ok | Status::Done => label.green().bold(),
            Status::Error => label.red().bold(),
            Status::Warning => label.yellow().bold(),
            Status::Info => label.blue().bold(),
            Status::Skip => label.dimmed(),
        }
    }

    fn emit(self, msg: &str) {
        if self == Status::Error {
            eprintln!("{} {}", self.tag(), msg);
        } else {
            println!("{} {}", self.tag(), msg);
        }
    }
}

fn rule() -> ColoredString {
    "─".repeat(RULE_WIDTH).dimmed()
}

/// 单步成功，例如一条曲线拟合完成
pub fn print_success(msg: &str) {
    Status::Ok.emit(msg);
}

/// 致命或单文件失败，写到 stderr
pub fn print_error(msg: &str) {
    Status::Error.emit(msg);
}

/// 结果可用但需要留意（退化解、Rg² 为负、部分文件失败）
pub fn print_warning(msg: &str) {
    Status::Warning.emit(msg);
}

/// 运行参数与进度说明
pub fn print_info(msg: &str) {
    Status::Info.emit(msg);
}

/// 输出已存在且未要求覆盖
pub fn print_skip(msg: &str) {
    Status::Skip.emit(msg);
}

/// 整个命令收尾
pub fn print_done(msg: &str) {
    Status::Done.emit(msg);
}

/// 写出的结果文件: `[OK] <what> -> <path>`
pub fn print_saved(what: &str, path: &Path) {
    println!(
        "{} {} {} {}",
        Status::Ok.tag(),
        what.dimmed(),
        "->".cyan(),
        path.display()
    );
}

/// 命令开头的算法名称栏
pub fn print_header(title: &str) {
    println!("\n{}", rule());
    println!("  {}", title.bold());
    println!("{}\n", rule());
}

/// 批处理汇总表之前的分隔线
pub fn print_separator() {
    println!("{}", rule());
}
