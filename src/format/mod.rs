//! Format Module
//!
//! 数値パターン（`#,##0`, `0%`など）の構文解析と適用を提供します。

mod parser;
mod tokens;

pub(crate) use parser::NumericPattern;
