//! Security Module
//!
//! 入力ファイル（XLSX / PPTX）を開く際のセキュリティ対策を実装するモジュール。
//! ZIP bomb攻撃、パストラバーサル攻撃、巨大入力への対策を提供します。

use std::io::{Read, Seek};
use zip::ZipArchive;

use crate::error::XlsxDeckError;

/// セキュリティ設定
///
/// アーカイブ処理時のセキュリティ制限を定義します。
#[derive(Debug, Clone)]
pub(crate) struct SecurityConfig {
    /// 展開後の最大サイズ（バイト）
    /// デフォルト: 1GB (1_073_741_824 bytes)
    pub max_decompressed_size: u64,
    /// ZIPアーカイブ内の最大ファイル数
    /// デフォルト: 10000
    pub max_file_count: usize,
    /// 単一ファイルの最大サイズ（バイト）
    /// デフォルト: 100MB (104_857_600 bytes)
    pub max_file_size: u64,
    /// 入力ファイルの最大サイズ（バイト）
    /// デフォルト: 2GB (2_147_483_648 bytes)
    pub max_input_file_size: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_decompressed_size: 1_073_741_824, // 1GB
            max_file_count: 10_000,
            max_file_size: 104_857_600,         // 100MB
            max_input_file_size: 2_147_483_648, // 2GB
        }
    }
}

/// 入力全体をメモリに読み込む
///
/// 上限を1バイト超えた時点で読み込みを打ち切り、`SecurityViolation`を返します。
///
/// # 引数
///
/// * `reader` - 入力ファイルのリーダー
/// * `config` - セキュリティ設定
///
/// # 戻り値
///
/// * `Ok(Vec<u8>)` - 読み込んだバイト列
/// * `Err(XlsxDeckError)` - I/Oエラー、またはサイズ上限を超えた場合
pub(crate) fn read_input<R: Read>(
    reader: R,
    config: &SecurityConfig,
) -> Result<Vec<u8>, XlsxDeckError> {
    let mut buffer = Vec::new();
    reader
        .take(config.max_input_file_size.saturating_add(1))
        .read_to_end(&mut buffer)?;

    if buffer.len() as u64 > config.max_input_file_size {
        return Err(XlsxDeckError::SecurityViolation(format!(
            "Input file size exceeds maximum: more than {} bytes",
            config.max_input_file_size
        )));
    }

    Ok(buffer)
}

/// ZIPアーカイブを開き、全エントリを検査する
///
/// ファイル数、各エントリのパスとサイズ、展開後の合計サイズを検証します。
///
/// # 引数
///
/// * `reader` - アーカイブのリーダー（Read + Seek）
/// * `config` - セキュリティ設定
///
/// # 戻り値
///
/// * `Ok(ZipArchive<R>)` - 検査済みのアーカイブ
/// * `Err(XlsxDeckError)` - ZIPとして読めない、または制限に違反した場合
pub(crate) fn open_archive<R: Read + Seek>(
    reader: R,
    config: &SecurityConfig,
) -> Result<ZipArchive<R>, XlsxDeckError> {
    let mut archive = ZipArchive::new(reader).map_err(|e| XlsxDeckError::Zip(format!("{}", e)))?;

    // ファイル数の上限
    if archive.len() > config.max_file_count {
        return Err(XlsxDeckError::SecurityViolation(format!(
            "ZIP archive contains too many files: {} (max: {})",
            archive.len(),
            config.max_file_count
        )));
    }

    let mut total_decompressed_size = 0u64;
    for i in 0..archive.len() {
        let file = archive
            .by_index(i)
            .map_err(|e| XlsxDeckError::Zip(format!("{}", e)))?;

        let file_name = file.name();
        validate_zip_path(file_name)
            .map_err(|e| XlsxDeckError::SecurityViolation(format!("Invalid ZIP path: {}", e)))?;

        let file_size = file.size();
        if file_size > config.max_file_size {
            return Err(XlsxDeckError::SecurityViolation(format!(
                "File '{}' exceeds maximum size: {} bytes (max: {} bytes)",
                file_name, file_size, config.max_file_size
            )));
        }

        total_decompressed_size = total_decompressed_size
            .checked_add(file_size)
            .ok_or_else(|| {
                XlsxDeckError::SecurityViolation(
                    "Total decompressed size calculation overflow".to_string(),
                )
            })?;

        if total_decompressed_size > config.max_decompressed_size {
            return Err(XlsxDeckError::SecurityViolation(format!(
                "Total decompressed size exceeds maximum: {} bytes (max: {} bytes)",
                total_decompressed_size, config.max_decompressed_size
            )));
        }
    }

    Ok(archive)
}

/// アーカイブ内の1エントリを読み込む
///
/// # 戻り値
///
/// * `Ok(Some(Vec<u8>))` - エントリが存在した場合
/// * `Ok(None)` - エントリが存在しない場合
pub(crate) fn read_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<Vec<u8>>, XlsxDeckError> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(XlsxDeckError::Zip(format!("{}: {}", name, e))),
    };

    let mut content = Vec::new();
    file.read_to_end(&mut content)?;
    Ok(Some(content))
}

/// ファイルパスの検証
///
/// パストラバーサル攻撃を防ぐため、ファイルパスを検証します。
///
/// # 引数
///
/// * `path` - 検証するファイルパス
///
/// # 戻り値
///
/// * `Ok(())` - パスが安全な場合
/// * `Err(String)` - パスが危険な場合（`..`や絶対パスを含む）
pub(crate) fn validate_zip_path(path: &str) -> Result<(), String> {
    if path.is_empty() {
        return Err("Empty path is not allowed".to_string());
    }

    // 絶対パスを拒否（Windows形式の`C:\`やUnix形式の`/`で始まるパス）
    let bytes = path.as_bytes();
    let has_drive = bytes.len() >= 3 && bytes[0].is_ascii_alphabetic() && &bytes[1..3] == b":\\";
    if path.starts_with('/') || has_drive {
        return Err(format!("Absolute path is not allowed: {}", path));
    }

    if path.split('/').any(|segment| segment == "..") {
        return Err(format!("Path traversal detected: {}", path));
    }

    if path.contains('\\') {
        return Err(format!("Backslash in path is not allowed: {}", path));
    }

    Ok(())
}
