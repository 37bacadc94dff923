//! FormatToken Module
//!
//! 数値パターン（例: `#,##0`, `0%`, `0.00`）のトークン定義を提供します。

/// フォーマットトークン
///
/// 数値パターンを解析した際に生成されるトークンです。
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FormatToken {
    /// 整数部のゼロパディング（例: "0" -> 1桁, "00" -> 2桁）
    IntegerZero(usize),

    /// 整数部の任意桁（例: "#"）
    IntegerHash,

    /// 小数点
    DecimalPoint,

    /// 小数部の必須桁（例: "0" -> 1桁, "00" -> 2桁）
    DecimalZero(usize),

    /// 小数部の任意桁（例: "#"）
    DecimalHash,

    /// 千の位区切り
    ThousandSeparator,

    /// パーセント記号（値を100倍する）
    Percent,

    /// リテラル文字列（例: "$", "-", " "）
    Literal(String),
}

impl FormatToken {
    /// トークンが桁の指定かどうかを判定
    pub fn is_digit(&self) -> bool {
        matches!(
            self,
            FormatToken::IntegerZero(_)
                | FormatToken::IntegerHash
                | FormatToken::DecimalZero(_)
                | FormatToken::DecimalHash
        )
    }
}
