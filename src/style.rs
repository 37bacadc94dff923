//! Cell Style Module
//!
//! ワークブック側のセルスタイル（塗りつぶし、フォント、罫線、配置、表示形式）を表すモジュール。
//! `xl/styles.xml`とテーマから読み込んだレコードを保持し、
//! スタイルIDから`CellStyle`をその都度導出します。

use std::collections::HashMap;

/// スタイル定義内の色指定
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ColorSpec {
    /// `rgb`属性のバイト列（通常はARGBの4バイト）
    Rgb(Vec<u8>),
    /// テーマ色（インデックスと明度補正）
    Theme { index: u32, tint: f64 },
    /// インデックスカラー（レガシーパレット）
    Indexed(u32),
    /// 自動色
    Auto,
}

impl ColorSpec {
    /// `rgb`属性の16進文字列から色指定を作成
    ///
    /// 2文字ずつバイトに変換し、不正な文字が現れた時点で打ち切ります。
    pub fn from_hex(hex: &str) -> Self {
        let bytes = hex
            .as_bytes()
            .chunks(2)
            .map_while(|pair| {
                std::str::from_utf8(pair)
                    .ok()
                    .filter(|s| s.len() == 2)
                    .and_then(|s| u8::from_str_radix(s, 16).ok())
            })
            .collect();
        ColorSpec::Rgb(bytes)
    }
}

/// テーマの配色（POIのテーマ要素順: lt1, dk1, lt2, dk2, accent1-6, hlink, folHlink）
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ThemePalette {
    colors: Vec<Option<[u8; 3]>>,
}

impl ThemePalette {
    /// テーマ要素名（`dk1`など）に色を設定
    pub fn set(&mut self, element: &str, rgb: [u8; 3]) {
        let index = match element {
            "lt1" => 0,
            "dk1" => 1,
            "lt2" => 2,
            "dk2" => 3,
            "accent1" => 4,
            "accent2" => 5,
            "accent3" => 6,
            "accent4" => 7,
            "accent5" => 8,
            "accent6" => 9,
            "hlink" => 10,
            "folHlink" => 11,
            _ => return,
        };
        if self.colors.len() <= index {
            self.colors.resize(index + 1, None);
        }
        self.colors[index] = Some(rgb);
    }

    /// テーマインデックスの色を取得
    pub fn get(&self, index: u32) -> Option<[u8; 3]> {
        self.colors.get(index as usize).copied().flatten()
    }
}

/// 水平方向の配置（ワークブック側）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum HorizontalAlignment {
    #[default]
    General,
    Left,
    Center,
    Right,
    Fill,
    Justify,
    CenterSelection,
    Distributed,
}

impl HorizontalAlignment {
    /// `horizontal`属性値から変換（未知の値は`General`）
    pub fn from_xml(value: &str) -> Self {
        match value {
            "left" => Self::Left,
            "center" => Self::Center,
            "right" => Self::Right,
            "fill" => Self::Fill,
            "justify" => Self::Justify,
            "centerContinuous" => Self::CenterSelection,
            "distributed" => Self::Distributed,
            _ => Self::General,
        }
    }

    /// すべての値
    #[cfg(test)]
    pub const ALL: [HorizontalAlignment; 8] = [
        Self::General,
        Self::Left,
        Self::Center,
        Self::Right,
        Self::Fill,
        Self::Justify,
        Self::CenterSelection,
        Self::Distributed,
    ];
}

/// 垂直方向の配置（ワークブック側）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum VerticalAlignment {
    Top,
    Center,
    #[default]
    Bottom,
    Justify,
    Distributed,
}

impl VerticalAlignment {
    /// `vertical`属性値から変換（未知の値は`Bottom`）
    pub fn from_xml(value: &str) -> Self {
        match value {
            "top" => Self::Top,
            "center" => Self::Center,
            "justify" => Self::Justify,
            "distributed" => Self::Distributed,
            _ => Self::Bottom,
        }
    }

    /// すべての値
    #[cfg(test)]
    pub const ALL: [VerticalAlignment; 5] = [
        Self::Top,
        Self::Center,
        Self::Bottom,
        Self::Justify,
        Self::Distributed,
    ];
}

/// `<font>`レコード
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FontRecord {
    pub name: String,
    pub bold: bool,
    pub italic: bool,
    pub color: Option<ColorSpec>,
}

impl Default for FontRecord {
    fn default() -> Self {
        Self {
            name: "Calibri".to_string(),
            bold: false,
            italic: false,
            color: None,
        }
    }
}

/// `<fill>`レコード（前景色のみ使用）
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct FillRecord {
    pub fg_color: Option<ColorSpec>,
}

/// 罫線の1辺
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BorderLine {
    /// 線種（`thin`, `dashed`など）
    pub style: String,
    pub color: Option<ColorSpec>,
}

/// `<border>`レコード
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct BorderRecord {
    pub left: Option<BorderLine>,
    pub right: Option<BorderLine>,
    pub top: Option<BorderLine>,
    pub bottom: Option<BorderLine>,
}

/// `<cellXfs>`内の`<xf>`レコード
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct CellXf {
    pub num_fmt_id: u32,
    pub font_id: u32,
    pub fill_id: u32,
    pub border_id: u32,
    pub horizontal: HorizontalAlignment,
    pub vertical: VerticalAlignment,
}

/// 罫線の1辺（解決済み）
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BorderEdge {
    /// 色のバイト列（ARGBまたはRGB）
    pub color: Vec<u8>,
}

/// フォント（解決済み）
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FontStyle {
    pub family: String,
    pub bold: bool,
    pub italic: bool,
    /// 色のバイト列（ARGBまたはRGB）。自動色の場合は`None`
    pub color: Option<Vec<u8>>,
}

/// セルスタイル（スタイルIDから導出）
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CellStyle {
    /// 塗りつぶしの前景色のバイト列
    pub fill: Option<Vec<u8>>,
    pub horizontal: HorizontalAlignment,
    pub vertical: VerticalAlignment,
    pub font: FontStyle,
    pub top: Option<BorderEdge>,
    pub bottom: Option<BorderEdge>,
    pub left: Option<BorderEdge>,
    pub right: Option<BorderEdge>,
    /// 表示形式文字列
    pub format: String,
}

/// ワークブックのスタイル表
#[derive(Debug, Clone, Default)]
pub(crate) struct StyleSheet {
    /// numFmtId -> formatCode（カスタム書式のみ）
    pub num_formats: HashMap<u32, String>,
    pub fonts: Vec<FontRecord>,
    pub fills: Vec<FillRecord>,
    pub borders: Vec<BorderRecord>,
    pub cell_xfs: Vec<CellXf>,
    pub theme: ThemePalette,
}

impl StyleSheet {
    /// スタイルIDからセルスタイルを導出
    ///
    /// 範囲外のIDや欠落したレコードは既定値として扱います。
    pub fn cell_style(&self, style_id: u32) -> CellStyle {
        let xf = self
            .cell_xfs
            .get(style_id as usize)
            .cloned()
            .unwrap_or_default();
        let font = self
            .fonts
            .get(xf.font_id as usize)
            .cloned()
            .unwrap_or_default();
        let fill = self.fills.get(xf.fill_id as usize);
        let border = self
            .borders
            .get(xf.border_id as usize)
            .cloned()
            .unwrap_or_default();

        CellStyle {
            fill: fill
                .and_then(|f| f.fg_color.as_ref())
                .and_then(|c| self.resolve_color(c)),
            horizontal: xf.horizontal,
            vertical: xf.vertical,
            font: FontStyle {
                family: font.name,
                bold: font.bold,
                italic: font.italic,
                color: font.color.as_ref().and_then(|c| self.resolve_color(c)),
            },
            top: self.resolve_border(border.top.as_ref()),
            bottom: self.resolve_border(border.bottom.as_ref()),
            left: self.resolve_border(border.left.as_ref()),
            right: self.resolve_border(border.right.as_ref()),
            format: self.format_string(xf.num_fmt_id),
        }
    }

    /// numFmtIdから表示形式文字列を取得
    ///
    /// 未知のIDは`General`として扱います。
    pub fn format_string(&self, num_fmt_id: u32) -> String {
        self.num_formats
            .get(&num_fmt_id)
            .map(String::as_str)
            .or_else(|| builtin_format(num_fmt_id))
            .unwrap_or("General")
            .to_string()
    }

    /// 色指定をバイト列に解決
    ///
    /// RGB指定は格納されたバイト列（通常ARGB）をそのまま返し、
    /// テーマ色・インデックスカラーはRGBの3バイトを返します。
    /// 自動色や解決できない指定は`None`です。
    pub fn resolve_color(&self, spec: &ColorSpec) -> Option<Vec<u8>> {
        match spec {
            ColorSpec::Rgb(bytes) => Some(bytes.clone()),
            ColorSpec::Theme { index, tint } => self
                .theme
                .get(*index)
                .map(|rgb| apply_tint(rgb, *tint).to_vec()),
            ColorSpec::Indexed(index) => indexed_color(*index).map(|rgb| rgb.to_vec()),
            ColorSpec::Auto => None,
        }
    }

    fn resolve_border(&self, line: Option<&BorderLine>) -> Option<BorderEdge> {
        let line = line?;
        if line.style.is_empty() || line.style == "none" {
            return None;
        }
        // 色の指定がない罫線は黒
        let color = line
            .color
            .as_ref()
            .and_then(|c| self.resolve_color(c))
            .unwrap_or_else(|| vec![0, 0, 0]);
        Some(BorderEdge { color })
    }
}

/// テーマ色に明度補正（tint）を適用
fn apply_tint(rgb: [u8; 3], tint: f64) -> [u8; 3] {
    if tint == 0.0 || !tint.is_finite() {
        return rgb;
    }

    let (h, l, s) = rgb_to_hls(rgb);
    let l = if tint < 0.0 {
        l * (1.0 + tint)
    } else {
        l * (1.0 - tint) + tint
    };
    hls_to_rgb(h, l.clamp(0.0, 1.0), s)
}

fn rgb_to_hls(rgb: [u8; 3]) -> (f64, f64, f64) {
    let r = f64::from(rgb[0]) / 255.0;
    let g = f64::from(rgb[1]) / 255.0;
    let b = f64::from(rgb[2]) / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    if max == min {
        return (0.0, l, 0.0);
    }

    let d = max - min;
    let s = if l > 0.5 {
        d / (2.0 - max - min)
    } else {
        d / (max + min)
    };
    let h = if max == r {
        ((g - b) / d).rem_euclid(6.0)
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    } / 6.0;

    (h, l, s)
}

fn hls_to_rgb(h: f64, l: f64, s: f64) -> [u8; 3] {
    if s == 0.0 {
        let v = (l * 255.0).round() as u8;
        return [v, v, v];
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let channel = |t: f64| {
        let t = t.rem_euclid(1.0);
        let v = if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 0.5 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * (2.0 / 3.0 - t) * 6.0
        } else {
            p
        };
        (v * 255.0).round().clamp(0.0, 255.0) as u8
    };

    [channel(h + 1.0 / 3.0), channel(h), channel(h - 1.0 / 3.0)]
}

/// レガシーのインデックスカラーパレット
///
/// 64はシステム前景色（黒）、65はシステム背景色（白）として扱います。
fn indexed_color(index: u32) -> Option<[u8; 3]> {
    const PALETTE: [u32; 56] = [
        0x000000, 0xFFFFFF, 0xFF0000, 0x00FF00, 0x0000FF, 0xFFFF00, 0xFF00FF, 0x00FFFF, // 8-15
        0x800000, 0x008000, 0x000080, 0x808000, 0x800080, 0x008080, 0xC0C0C0, 0x808080, // 16-23
        0x9999FF, 0x993366, 0xFFFFCC, 0xCCFFFF, 0x660066, 0xFF8080, 0x0066CC, 0xCCCCFF, // 24-31
        0x000080, 0xFF00FF, 0xFFFF00, 0x00FFFF, 0x800080, 0x800000, 0x008080, 0x0000FF, // 32-39
        0x00CCFF, 0xCCFFFF, 0xCCFFCC, 0xFFFF99, 0x99CCFF, 0xFF99CC, 0xCC99FF, 0xFFCC99, // 40-47
        0x3366FF, 0x33CCCC, 0x99CC00, 0xFFCC00, 0xFF9900, 0xFF6600, 0x666699, 0x969696, // 48-55
        0x003366, 0x339966, 0x003300, 0x333300, 0x993300, 0x993366, 0x333399, 0x333333, // 56-63
    ];

    let value = match index {
        0..=7 => PALETTE[index as usize],
        8..=63 => PALETTE[(index - 8) as usize],
        64 => 0x000000,
        65 => 0xFFFFFF,
        _ => return None,
    };
    Some([(value >> 16) as u8, (value >> 8) as u8, value as u8])
}

/// ビルトイン書式ID（0-163）のマッピング
///
/// Excelの標準書式IDとフォーマット文字列の対応表です。
fn builtin_format(id: u32) -> Option<&'static str> {
    match id {
        0 => Some("General"),
        1 => Some("0"),
        2 => Some("0.00"),
        3 => Some("#,##0"),
        4 => Some("#,##0.00"),
        5 => Some("\"$\"#,##0_);(\"$\"#,##0)"),
        6 => Some("\"$\"#,##0_);[Red](\"$\"#,##0)"),
        7 => Some("\"$\"#,##0.00_);(\"$\"#,##0.00)"),
        8 => Some("\"$\"#,##0.00_);[Red](\"$\"#,##0.00)"),
        9 => Some("0%"),
        10 => Some("0.00%"),
        11 => Some("0.00E+00"),
        12 => Some("# ?/?"),
        13 => Some("# ??/??"),
        14 => Some("m/d/yy"),
        15 => Some("d-mmm-yy"),
        16 => Some("d-mmm"),
        17 => Some("mmm-yy"),
        18 => Some("h:mm AM/PM"),
        19 => Some("h:mm:ss AM/PM"),
        20 => Some("h:mm"),
        21 => Some("h:mm:ss"),
        22 => Some("m/d/yy h:mm"),
        37 => Some("#,##0_);(#,##0)"),
        38 => Some("#,##0_);[Red](#,##0)"),
        39 => Some("#,##0.00_);(#,##0.00)"),
        40 => Some("#,##0.00_);[Red](#,##0.00)"),
        41 => Some("_(* #,##0_);_(* (#,##0);_(* \"-\"_);_(@_)"),
        42 => Some("_(\"$\"* #,##0_);_(\"$\"* (#,##0);_(\"$\"* \"-\"_);_(@_)"),
        43 => Some("_(* #,##0.00_);_(* (#,##0.00);_(* \"-\"??_);_(@_)"),
        44 => Some("_(\"$\"* #,##0.00_);_(\"$\"* (#,##0.00);_(\"$\"* \"-\"??_);_(@_)"),
        45 => Some("mm:ss"),
        46 => Some("[h]:mm:ss"),
        47 => Some("mm:ss.0"),
        48 => Some("##0.0E+0"),
        49 => Some("@"),
        _ => None,
    }
}
