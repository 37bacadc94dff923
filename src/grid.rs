//! Grid Module
//!
//! スライドに挿入する表の中間表現（稠密な行優先の2次元グリッド）を提供するモジュール。
//! セル結合の属性付けと、結合セルの罫線補正（隣接セルへの罫線の移し替え）を実装します。

use crate::types::CellRange;

/// 既定の行の高さ（ポイント）
pub(crate) const DEFAULT_ROW_HEIGHT: f64 = 20.0;

/// 既定の列幅（ポイント）
pub(crate) const DEFAULT_COLUMN_WIDTH: f64 = 100.0;

/// 色（RGBA）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    /// 不透明度（255で不透明）
    pub alpha: u8,
}

impl Color {
    /// 不透明な色を生成
    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red,
            green,
            blue,
            alpha: 255,
        }
    }

    /// 不透明度付きの色を生成
    pub const fn rgba(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// `RRGGBB`形式の16進文字列
    pub fn to_hex(self) -> String {
        format!("{:02X}{:02X}{:02X}", self.red, self.green, self.blue)
    }
}

/// 段落の水平配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TextAlign {
    Left,
    Center,
    Right,
    Justify,
    JustifyLow,
    Dist,
    ThaiDist,
}

impl TextAlign {
    /// DrawingMLの`algn`属性値
    pub fn to_xml(self) -> &'static str {
        match self {
            TextAlign::Left => "l",
            TextAlign::Center => "ctr",
            TextAlign::Right => "r",
            TextAlign::Justify => "just",
            TextAlign::JustifyLow => "justLow",
            TextAlign::Dist => "dist",
            TextAlign::ThaiDist => "thaiDist",
        }
    }
}

/// セル内テキストの垂直配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VerticalAnchor {
    Top,
    Middle,
    Bottom,
    Justified,
    Distributed,
}

impl VerticalAnchor {
    /// DrawingMLの`anchor`属性値
    pub fn to_xml(self) -> &'static str {
        match self {
            VerticalAnchor::Top => "t",
            VerticalAnchor::Middle => "ctr",
            VerticalAnchor::Bottom => "b",
            VerticalAnchor::Justified => "just",
            VerticalAnchor::Distributed => "dist",
        }
    }
}

/// 罫線の辺
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum BorderSide {
    Top,
    Bottom,
    Left,
    Right,
}

impl BorderSide {
    /// すべての辺
    pub const ALL: [BorderSide; 4] = [
        BorderSide::Top,
        BorderSide::Bottom,
        BorderSide::Left,
        BorderSide::Right,
    ];

    /// 反対側の辺
    pub fn opposite(self) -> Self {
        match self {
            BorderSide::Top => BorderSide::Bottom,
            BorderSide::Bottom => BorderSide::Top,
            BorderSide::Left => BorderSide::Right,
            BorderSide::Right => BorderSide::Left,
        }
    }
}

/// 罫線（色と幅）
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Stroke {
    pub color: Color,
    /// 幅（ポイント）
    pub width: f64,
}

/// テキストランのフォント
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RunFont {
    pub family: String,
    /// サイズ（ポイント）
    pub size: f64,
    pub bold: bool,
    pub italic: bool,
    pub color: Option<Color>,
}

/// 表の1セル
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct TableCell {
    /// 表示テキスト
    pub text: String,
    /// 塗りつぶし色
    pub fill: Option<Color>,
    /// 段落の水平配置
    pub text_align: Option<TextAlign>,
    /// 垂直配置
    pub anchor: Option<VerticalAnchor>,
    /// テキストランのフォント（元セルのないパディングセルは`None`）
    pub font: Option<RunFont>,
    top: Option<Stroke>,
    bottom: Option<Stroke>,
    left: Option<Stroke>,
    right: Option<Stroke>,
    /// 横方向の結合数（結合範囲の先頭列）
    pub grid_span: Option<u32>,
    /// 縦方向の結合数（結合範囲の先頭行）
    pub row_span: Option<u32>,
    /// 横方向の結合の継続セル
    pub h_merge: bool,
    /// 縦方向の結合の継続セル
    pub v_merge: bool,
}

impl TableCell {
    /// 辺の罫線を取得
    pub fn border(&self, side: BorderSide) -> Option<Stroke> {
        match side {
            BorderSide::Top => self.top,
            BorderSide::Bottom => self.bottom,
            BorderSide::Left => self.left,
            BorderSide::Right => self.right,
        }
    }

    /// 辺の罫線を設定（既存の罫線は置き換え）
    pub fn set_border(&mut self, side: BorderSide, stroke: Stroke) {
        *self.border_slot(side) = Some(stroke);
    }

    /// 辺の罫線を削除
    pub fn remove_border(&mut self, side: BorderSide) {
        *self.border_slot(side) = None;
    }

    fn border_slot(&mut self, side: BorderSide) -> &mut Option<Stroke> {
        match side {
            BorderSide::Top => &mut self.top,
            BorderSide::Bottom => &mut self.bottom,
            BorderSide::Left => &mut self.left,
            BorderSide::Right => &mut self.right,
        }
    }

    /// 結合セルの一部かどうか
    pub fn is_merged(&self) -> bool {
        self.grid_span.is_some() || self.row_span.is_some() || self.h_merge || self.v_merge
    }
}

/// 表の配置矩形（ポイント）
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// スライドに挿入する表
///
/// セルは行優先の1次元配列に格納し、`(行, 列)`のインデックスでアクセスします。
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SlideTable {
    anchor: Rect,
    rows: usize,
    cols: usize,
    cells: Vec<TableCell>,
    column_widths: Vec<f64>,
    row_heights: Vec<f64>,
}

impl SlideTable {
    /// 空セルで埋めた`rows` x `cols`の表を生成
    pub fn new(anchor: Rect, rows: usize, cols: usize) -> Self {
        Self {
            anchor,
            rows,
            cols,
            cells: vec![TableCell::default(); rows * cols],
            column_widths: vec![DEFAULT_COLUMN_WIDTH; cols],
            row_heights: vec![DEFAULT_ROW_HEIGHT; rows],
        }
    }

    /// 配置矩形
    pub fn anchor(&self) -> Rect {
        self.anchor
    }

    /// 行数
    pub fn row_count(&self) -> usize {
        self.rows
    }

    /// 列数
    pub fn column_count(&self) -> usize {
        self.cols
    }

    /// 列幅（ポイント）
    pub fn column_widths(&self) -> &[f64] {
        &self.column_widths
    }

    /// 行の高さ（ポイント）
    pub fn row_heights(&self) -> &[f64] {
        &self.row_heights
    }

    /// セルを取得
    pub fn cell(&self, row: usize, col: usize) -> Option<&TableCell> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.cells.get(row * self.cols + col)
    }

    /// セルを可変で取得
    pub fn cell_mut(&mut self, row: usize, col: usize) -> Option<&mut TableCell> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.cells.get_mut(row * self.cols + col)
    }

    /// 1行分のセル
    pub fn row(&self, row: usize) -> Option<&[TableCell]> {
        if row >= self.rows {
            return None;
        }
        self.cells.get(row * self.cols..(row + 1) * self.cols)
    }

    /// 1行分のセルを可変で取得
    pub fn row_mut(&mut self, row: usize) -> Option<&mut [TableCell]> {
        if row >= self.rows {
            return None;
        }
        self.cells.get_mut(row * self.cols..(row + 1) * self.cols)
    }

    /// 列幅を設定
    ///
    /// # 戻り値
    ///
    /// 列が表の範囲外の場合は`false`（何もしない）
    pub fn set_column_width(&mut self, col: usize, width: f64) -> bool {
        match self.column_widths.get_mut(col) {
            Some(slot) => {
                *slot = width;
                true
            }
            None => false,
        }
    }

    /// セルを結合
    ///
    /// 複数列にまたがる場合は各行の先頭列に`gridSpan`、残りに`hMerge`を、
    /// 複数行にまたがる場合は先頭行の各列に`rowSpan`、残りの行に`vMerge`を設定します。
    ///
    /// # 戻り値
    ///
    /// 範囲が表からはみ出す、または単一セルの場合は`false`（何もしない）
    pub fn merge_cells(&mut self, range: &CellRange) -> bool {
        let (first_row, last_row) = (range.start.row as usize, range.end.row as usize);
        let (first_col, last_col) = (range.start.col as usize, range.end.col as usize);
        if first_row > last_row
            || first_col > last_col
            || last_row >= self.rows
            || last_col >= self.cols
            || range.is_single_cell()
        {
            return false;
        }

        let col_span = range.col_span();
        let row_span = range.row_span();

        for row in first_row..=last_row {
            for col in first_col..=last_col {
                let Some(cell) = self.cell_mut(row, col) else {
                    continue;
                };
                if col_span > 1 {
                    if col == first_col {
                        cell.grid_span = Some(col_span);
                    } else {
                        cell.h_merge = true;
                    }
                }
                if row_span > 1 {
                    if row == first_row {
                        cell.row_span = Some(row_span);
                    } else {
                        cell.v_merge = true;
                    }
                }
            }
        }
        true
    }

    /// 辺の向こう側にある隣接セルの位置
    fn neighbor(&self, row: usize, col: usize, side: BorderSide) -> Option<(usize, usize)> {
        let (row, col) = match side {
            BorderSide::Top => (row.checked_sub(1)?, col),
            BorderSide::Bottom => (row + 1, col),
            BorderSide::Left => (row, col.checked_sub(1)?),
            BorderSide::Right => (row, col + 1),
        };
        (row < self.rows && col < self.cols).then_some((row, col))
    }

    /// 結合セルの罫線を補正
    ///
    /// 結合セルの各辺の罫線を隣接セルの反対側の辺に移し、結合セル自身の罫線を削除します。
    /// 隣接セルがない（表の端に接する）辺の罫線は削除のみ行います。
    ///
    /// 補正前の罫線をすべて記録してから、削除、設定の順に適用するため、
    /// 結果はセルの走査順に依存しません。結合セルのない表では何も変更しません。
    pub fn repair_merged_borders(&mut self) {
        let mut moves: Vec<(usize, usize, BorderSide, Stroke)> = Vec::new();
        for row in 0..self.rows {
            for col in 0..self.cols {
                let Some(cell) = self.cell(row, col) else {
                    continue;
                };
                if !cell.is_merged() {
                    continue;
                }
                for side in BorderSide::ALL {
                    if let Some(stroke) = cell.border(side) {
                        moves.push((row, col, side, stroke));
                    }
                }
            }
        }

        for (row, col, side, _) in &moves {
            if let Some(cell) = self.cell_mut(*row, *col) {
                cell.remove_border(*side);
            }
        }

        for (row, col, side, stroke) in moves {
            if let Some((n_row, n_col)) = self.neighbor(row, col, side) {
                if let Some(neighbor) = self.cell_mut(n_row, n_col) {
                    neighbor.set_border(side.opposite(), stroke);
                }
            }
        }
    }
}
