//! Types Module
//!
//! クレート全体で使用する共通データ型を定義するモジュール。

use chrono::{Duration, NaiveDate};

/// セルの値を表す列挙型
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CellValue {
    /// 数値（f64）
    Number(f64),

    /// 日付書式が適用された数値（Excelシリアル値）
    DateTime(f64),

    /// 文字列
    String(String),

    /// 論理値
    Bool(bool),

    /// エラー値（例: #DIV/0!）
    Error(String),

    /// 空セル
    Empty,
}

impl CellValue {
    /// セルの生テキストを取得（書式適用前）
    ///
    /// テキスト整形の入力となる文字列です。
    /// 数値は整数でも`1200.0`のように小数点付きで、日付は`15-Mar-2024`形式で表現します。
    ///
    /// # 引数
    ///
    /// * `is_1904` - 1904年エポックを使用するか
    pub fn to_raw_text(&self, is_1904: bool) -> String {
        match self {
            CellValue::Number(n) => format!("{:?}", n),
            CellValue::DateTime(serial) => match serial_to_date(*serial, is_1904) {
                Some(date) => date.format("%d-%b-%Y").to_string(),
                None => format!("{:?}", serial),
            },
            CellValue::String(s) => s.clone(),
            CellValue::Bool(b) => {
                if *b {
                    "TRUE".to_string()
                } else {
                    "FALSE".to_string()
                }
            }
            CellValue::Error(e) => e.clone(),
            CellValue::Empty => String::new(),
        }
    }
}

/// Excelシリアル値を日付に変換
///
/// 1900年エポックでは、Excelが存在しない1900-02-29を数える互換仕様に合わせ、
/// シリアル値60以下を1日ずらして扱います。
pub(crate) fn serial_to_date(serial: f64, is_1904: bool) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }

    let days = serial.floor() as i64;
    let (epoch, offset) = if is_1904 {
        (NaiveDate::from_ymd_opt(1904, 1, 1)?, days)
    } else if days < 61 {
        (NaiveDate::from_ymd_opt(1899, 12, 31)?, days)
    } else {
        (NaiveDate::from_ymd_opt(1899, 12, 30)?, days)
    };

    epoch.checked_add_signed(Duration::days(offset))
}

/// セル座標（0始まり）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellCoord {
    pub row: u32,
    pub col: u32,
}

impl CellCoord {
    /// 新しい座標を生成
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// A1形式の文字列に変換（例: (0, 0) -> "A1"）
    pub fn to_a1_notation(self) -> String {
        format!("{}{}", Self::col_index_to_letter(self.col), self.row + 1)
    }

    /// A1形式のセル参照を座標に変換（例: "B3" -> (2, 1)）
    ///
    /// `$`による絶対参照記号は無視します。
    pub fn parse_a1(reference: &str) -> Option<Self> {
        let mut col: u32 = 0;
        let mut row_digits = String::new();

        for ch in reference.chars().filter(|c| *c != '$') {
            if ch.is_ascii_alphabetic() {
                if !row_digits.is_empty() {
                    return None;
                }
                let value = (ch.to_ascii_uppercase() as u32) - ('A' as u32) + 1;
                col = col.checked_mul(26)?.checked_add(value)?;
            } else if ch.is_ascii_digit() {
                row_digits.push(ch);
            } else {
                return None;
            }
        }

        let row = row_digits.parse::<u32>().ok()?;
        if col == 0 || row == 0 {
            return None;
        }

        Some(Self::new(row - 1, col - 1))
    }

    /// 列インデックスを文字列に変換（0 -> "A", 25 -> "Z", 26 -> "AA"）
    fn col_index_to_letter(mut col: u32) -> String {
        let mut result = String::new();
        loop {
            let remainder = col % 26;
            result.insert(0, (b'A' + remainder as u8) as char);
            if col < 26 {
                break;
            }
            col = col / 26 - 1;
        }
        result
    }
}

/// セル範囲（結合範囲の記述子）
///
/// 開始・終了ともに範囲に含まれます（`firstRow..=lastRow`, `firstCol..=lastCol`）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub start: CellCoord,
    pub end: CellCoord,
}

impl CellRange {
    /// 新しい範囲を生成
    pub fn new(start: CellCoord, end: CellCoord) -> Self {
        Self { start, end }
    }

    /// 指定された座標が範囲内にあるかを判定
    pub fn contains(&self, coord: CellCoord) -> bool {
        coord.row >= self.start.row
            && coord.row <= self.end.row
            && coord.col >= self.start.col
            && coord.col <= self.end.col
    }

    /// 行数
    pub fn row_span(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    /// 列数
    pub fn col_span(&self) -> u32 {
        self.end.col - self.start.col + 1
    }

    /// 単一セルのみの範囲かどうか
    pub fn is_single_cell(&self) -> bool {
        self.start == self.end
    }

    /// 原点を`origin`に移した新しい範囲を返す
    ///
    /// 元の範囲は変更しません。範囲の一部でも原点より上・左にある場合は`None`を返します。
    pub fn shifted(&self, origin: CellCoord) -> Option<Self> {
        Some(Self::new(
            CellCoord::new(
                self.start.row.checked_sub(origin.row)?,
                self.start.col.checked_sub(origin.col)?,
            ),
            CellCoord::new(
                self.end.row.checked_sub(origin.row)?,
                self.end.col.checked_sub(origin.col)?,
            ),
        ))
    }

    /// `rows` x `cols` の表に収まるよう切り詰めた範囲を返す
    ///
    /// 開始位置が表の外にある場合は`None`を返します。
    pub fn clipped(&self, rows: u32, cols: u32) -> Option<Self> {
        if rows == 0 || cols == 0 || self.start.row >= rows || self.start.col >= cols {
            return None;
        }
        Some(Self::new(
            self.start,
            CellCoord::new(self.end.row.min(rows - 1), self.end.col.min(cols - 1)),
        ))
    }
}

/// シートから読み込んだ1セル
///
/// 生テキストとスタイルIDのみを保持し、スタイル本体は`StyleSheet`から都度引きます。
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SheetCell {
    /// セル座標（シート上の絶対位置）
    pub coord: CellCoord,

    /// 生テキスト（`CellValue::to_raw_text`の結果）
    pub text: String,

    /// `cellXfs`のインデックス
    pub style_id: u32,
}

impl SheetCell {
    /// 新しいセルを生成
    pub fn new(coord: CellCoord, text: impl Into<String>, style_id: u32) -> Self {
        Self {
            coord,
            text: text.into(),
            style_id,
        }
    }

    /// テキストが空白のみかどうか
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}
