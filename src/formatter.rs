//! Formatter Module
//!
//! セルの生テキストを表示形式に従って整形するモジュール。
//! 対応する表示形式は`mmm-yy`（日付）、`0%`と`#,##0`（数値パターン）、`General`の4つのみで、
//! それ以外は致命的なエラーになります。

use chrono::NaiveDate;

use crate::error::XlsxDeckError;
use crate::format::NumericPattern;

/// 月・年の表示形式
pub(crate) const FORMAT_MONTH_YEAR: &str = "mmm-yy";
/// パーセントの表示形式
pub(crate) const FORMAT_PERCENT: &str = "0%";
/// 千の位区切りの表示形式
pub(crate) const FORMAT_GROUPED: &str = "#,##0";
/// 標準の表示形式
pub(crate) const FORMAT_GENERAL: &str = "General";

/// テキストフォーマッター
///
/// テキスト整形のファサードとして機能します。
#[derive(Debug, Clone)]
pub(crate) struct TextFormatter {
    /// 日付フォーマッター
    date_formatter: DateFormatter,

    /// 数値フォーマッター
    number_formatter: NumberFormatter,
}

impl TextFormatter {
    /// 新しいTextFormatterインスタンスを生成
    pub fn new() -> Result<Self, XlsxDeckError> {
        Ok(Self {
            date_formatter: DateFormatter,
            number_formatter: NumberFormatter::new()?,
        })
    }

    /// 生テキストを表示形式に従って整形
    ///
    /// 空白のみのテキストはそのまま返します。
    ///
    /// # 引数
    ///
    /// * `raw` - セルの生テキスト
    /// * `format` - セルの表示形式文字列
    ///
    /// # 戻り値
    ///
    /// * `Ok(String)` - 整形済みテキスト
    /// * `Err(XlsxDeckError::UnsupportedFormat)` - 対応外の表示形式
    /// * `Err(XlsxDeckError::InvalidDate)` - `mmm-yy`で日付として解釈できない場合
    /// * `Err(XlsxDeckError::InvalidNumber)` - `0%` / `#,##0`で数値として解釈できない場合
    pub fn format(&self, raw: &str, format: &str) -> Result<String, XlsxDeckError> {
        if raw.trim().is_empty() {
            return Ok(raw.to_string());
        }

        match format {
            FORMAT_MONTH_YEAR => self.date_formatter.format_month_year(raw),
            FORMAT_PERCENT | FORMAT_GROUPED => self.number_formatter.format_pattern(raw, format),
            FORMAT_GENERAL => Ok(self.number_formatter.format_general(raw)),
            _ => Err(XlsxDeckError::UnsupportedFormat {
                format: format.to_string(),
            }),
        }
    }
}

/// 日付フォーマッター
#[derive(Debug, Clone)]
struct DateFormatter;

impl DateFormatter {
    /// `日-月名-年`形式のテキストを`月略称-年2桁`に変換
    ///
    /// 月名は完全形（`March`）と略称（`Mar`）のどちらも受け付け、大文字小文字を区別しません。
    fn format_month_year(&self, text: &str) -> Result<String, XlsxDeckError> {
        let date = NaiveDate::parse_from_str(text.trim(), "%d-%B-%Y").map_err(|_| {
            XlsxDeckError::InvalidDate {
                text: text.to_string(),
            }
        })?;
        Ok(date.format("%b-%y").to_string())
    }
}

/// 数値フォーマッター
#[derive(Debug, Clone)]
struct NumberFormatter {
    /// `0%`
    percent: NumericPattern,
    /// `#,##0`
    grouped: NumericPattern,
}

impl NumberFormatter {
    fn new() -> Result<Self, XlsxDeckError> {
        Ok(Self {
            percent: NumericPattern::parse(FORMAT_PERCENT)?,
            grouped: NumericPattern::parse(FORMAT_GROUPED)?,
        })
    }

    /// 数値パターンで整形
    fn format_pattern(&self, text: &str, format: &str) -> Result<String, XlsxDeckError> {
        let value: f64 = text
            .trim()
            .parse()
            .map_err(|_| XlsxDeckError::InvalidNumber {
                text: text.to_string(),
                format: format.to_string(),
            })?;

        let pattern = if format == FORMAT_PERCENT {
            &self.percent
        } else {
            &self.grouped
        };
        Ok(pattern.format(value))
    }

    /// `General`で整形
    ///
    /// 小数部のない値は整数として、それ以外は最短の十進表現で出力します。
    /// 数値として解釈できないテキストはそのまま返します。
    fn format_general(&self, text: &str) -> String {
        let value: f64 = match text.trim().parse() {
            Ok(value) => value,
            Err(_) => return text.to_string(),
        };

        if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
            format!("{}", value as i64)
        } else {
            format!("{}", value)
        }
    }
}
