//! NumericPattern Module
//!
//! 数値パターン（`#,##0`, `0%`, `0.00` など）の構文解析と適用を提供します。
//! 丸めは偶数丸め（銀行丸め）で、負数には`-`を前置します。

use crate::error::XlsxDeckError;

use super::tokens::FormatToken;

/// 数値パターン
///
/// 単一セクションの数値パターンを解析し、数値を文字列化します。
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NumericPattern {
    /// 数字より前のリテラル
    prefix: String,
    /// 数字より後のリテラル
    suffix: String,
    /// 整数部の最小桁数
    min_integer_digits: usize,
    /// 千の位区切りの間隔（0は区切りなし）
    grouping_size: usize,
    /// 小数部の最小桁数
    min_fraction_digits: usize,
    /// 小数部の最大桁数
    max_fraction_digits: usize,
    /// パーセント表示（値を100倍）
    percent: bool,
}

impl NumericPattern {
    /// パターン文字列をパース
    ///
    /// # 引数
    ///
    /// * `pattern` - 数値パターン（例: `#,##0`）
    ///
    /// # 戻り値
    ///
    /// * `Ok(Self)` - パース成功
    /// * `Err(XlsxDeckError::UnsupportedFormat)` - 数字を含まない、複数セクション、小数点が複数ある場合
    pub fn parse(pattern: &str) -> Result<Self, XlsxDeckError> {
        let tokens = Self::tokenize(pattern)?;
        let unsupported = || XlsxDeckError::UnsupportedFormat {
            format: pattern.to_string(),
        };

        let first_digit = tokens.iter().position(FormatToken::is_digit).ok_or_else(unsupported)?;
        let last_digit = tokens.iter().rposition(FormatToken::is_digit).ok_or_else(unsupported)?;

        let mut result = Self {
            prefix: String::new(),
            suffix: String::new(),
            min_integer_digits: 0,
            grouping_size: 0,
            min_fraction_digits: 0,
            max_fraction_digits: 0,
            percent: false,
        };

        let mut has_separator = false;
        let mut digits_since_separator = 0;

        for (index, token) in tokens.iter().enumerate() {
            match token {
                FormatToken::IntegerZero(count) => {
                    result.min_integer_digits += count;
                    digits_since_separator += count;
                }
                FormatToken::IntegerHash => digits_since_separator += 1,
                FormatToken::ThousandSeparator => {
                    has_separator = true;
                    digits_since_separator = 0;
                }
                FormatToken::DecimalPoint => {}
                FormatToken::DecimalZero(count) => {
                    result.min_fraction_digits += count;
                    result.max_fraction_digits += count;
                }
                FormatToken::DecimalHash => result.max_fraction_digits += 1,
                FormatToken::Percent => {
                    result.percent = true;
                    result.push_literal(index < first_digit, "%");
                }
                FormatToken::Literal(text) => {
                    if index < first_digit {
                        result.prefix.push_str(text);
                    } else if index > last_digit {
                        result.suffix.push_str(text);
                    } else {
                        // 数字の間のリテラルはサポート外
                        return Err(unsupported());
                    }
                }
            }
        }

        if has_separator {
            result.grouping_size = digits_since_separator;
        }

        Ok(result)
    }

    fn push_literal(&mut self, before_digits: bool, text: &str) {
        if before_digits {
            self.prefix.push_str(text);
        } else {
            self.suffix.push_str(text);
        }
    }

    /// パターン文字列をトークンに分解
    ///
    /// `"..."` / `'...'` で囲まれた部分と`\`に続く1文字はリテラルとして扱います。
    fn tokenize(pattern: &str) -> Result<Vec<FormatToken>, XlsxDeckError> {
        let unsupported = || XlsxDeckError::UnsupportedFormat {
            format: pattern.to_string(),
        };

        let mut tokens = Vec::new();
        let mut chars = pattern.chars().peekable();
        let mut in_fraction = false;

        while let Some(ch) = chars.next() {
            match ch {
                '"' | '\'' => {
                    let literal: String = chars.by_ref().take_while(|c| *c != ch).collect();
                    tokens.push(FormatToken::Literal(literal));
                }
                '\\' => {
                    let escaped = chars.next().ok_or_else(unsupported)?;
                    tokens.push(FormatToken::Literal(escaped.to_string()));
                }
                ';' => return Err(unsupported()),
                '0' => {
                    let mut count = 1;
                    while chars.next_if_eq(&'0').is_some() {
                        count += 1;
                    }
                    tokens.push(if in_fraction {
                        FormatToken::DecimalZero(count)
                    } else {
                        FormatToken::IntegerZero(count)
                    });
                }
                '#' => tokens.push(if in_fraction {
                    FormatToken::DecimalHash
                } else {
                    FormatToken::IntegerHash
                }),
                '.' => {
                    if in_fraction {
                        return Err(unsupported());
                    }
                    in_fraction = true;
                    tokens.push(FormatToken::DecimalPoint);
                }
                ',' if !in_fraction => tokens.push(FormatToken::ThousandSeparator),
                '%' => tokens.push(FormatToken::Percent),
                _ => tokens.push(FormatToken::Literal(ch.to_string())),
            }
        }

        Ok(tokens)
    }

    /// 数値をフォーマット
    ///
    /// 値の最短表現（十進）を基準に偶数丸めを行います。
    pub fn format(&self, value: f64) -> String {
        if value.is_nan() {
            return "NaN".to_string();
        }

        let sign = if value.is_sign_negative() { "-" } else { "" };
        let mut magnitude = value.abs();
        if self.percent {
            magnitude *= 100.0;
        }
        if magnitude.is_infinite() {
            return format!("{}{}\u{221E}{}", sign, self.prefix, self.suffix);
        }

        let repr = format!("{}", magnitude);
        let (integer, mut fraction) = round_half_even(&repr, self.max_fraction_digits);

        while fraction.len() > self.min_fraction_digits && fraction.ends_with('0') {
            fraction.pop();
        }

        let significant = integer.trim_start_matches('0');
        let mut integer = format!(
            "{}{}",
            "0".repeat(self.min_integer_digits.saturating_sub(significant.len())),
            significant
        );
        if integer.is_empty() && fraction.is_empty() {
            integer.push('0');
        }
        if self.grouping_size > 0 {
            integer = group_digits(&integer, self.grouping_size);
        }

        let mut result = format!("{}{}{}", sign, self.prefix, integer);
        if !fraction.is_empty() {
            result.push('.');
            result.push_str(&fraction);
        }
        result.push_str(&self.suffix);
        result
    }
}

/// 十進表現を小数`scale`桁に偶数丸め
///
/// # 戻り値
///
/// (整数部の数字列, 小数部の数字列)
fn round_half_even(repr: &str, scale: usize) -> (String, String) {
    let (integer, fraction) = repr.split_once('.').unwrap_or((repr, ""));
    let kept: String = fraction
        .chars()
        .chain(std::iter::repeat('0'))
        .take(scale)
        .collect();
    let rest = fraction.get(scale..).unwrap_or("");

    let mut digits: Vec<u8> = integer
        .bytes()
        .chain(kept.bytes())
        .map(|b| b - b'0')
        .collect();

    let round_up = match rest.as_bytes() {
        [first, ..] if *first > b'5' => true,
        [b'5', tail @ ..] => {
            tail.iter().any(|b| *b != b'0') || digits.last().is_some_and(|d| d % 2 == 1)
        }
        _ => false,
    };

    if round_up {
        let mut index = digits.len();
        loop {
            if index == 0 {
                digits.insert(0, 1);
                break;
            }
            index -= 1;
            if digits[index] == 9 {
                digits[index] = 0;
            } else {
                digits[index] += 1;
                break;
            }
        }
    }

    let split = digits.len() - scale;
    let to_string = |d: &[u8]| d.iter().map(|d| char::from(b'0' + d)).collect::<String>();
    (to_string(&digits[..split]), to_string(&digits[split..]))
}

/// 整数部に千の位区切りを挿入
fn group_digits(integer: &str, size: usize) -> String {
    let len = integer.len();
    let mut result = String::with_capacity(len + len / size);
    for (index, ch) in integer.chars().enumerate() {
        if index > 0 && (len - index) % size == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    result
}
