// ==========================================
// CRM 批量导入引擎 - 文件解析器实现
// ==========================================
// 支持: 逗号分隔文本 (.csv / .txt)
// 前置检查（任意行解析前）: 文件大小 → 内容类型 → 编码采样
// 约束: 引号包裹的单元格可包含逗号与换行；仅表头之前的 '#' 行视为说明行，表头之后按数据处理
// ==========================================

use crate::config::ImportSettings;
use crate::config::import_config_trait::{DEFAULT_ENCODING_SAMPLE_CHARS, DEFAULT_MAX_FILE_BYTES};
use crate::domain::row::Row;
use crate::importer::error::{EngineResult, ImportError};
use crate::importer::import_trait::FileParser;
use csv::{ReaderBuilder, Trim};
use std::fs;
use std::path::Path;
use tracing::debug;

/// 可接受的 MIME 类型
pub const ACCEPTED_CONTENT_TYPES: &[&str] = &[
    "text/csv",
    "application/csv",
    "text/plain",
    "application/vnd.ms-excel",
    "text/comma-separated-values",
];

/// 可接受的文件扩展名
pub const ACCEPTED_EXTENSIONS: &[&str] = &["csv", "txt"];

const UTF8_BOM: char = '\u{FEFF}';

// ==========================================
// CSV Parser 实现
// ==========================================
#[derive(Debug, Clone)]
pub struct CsvParser {
    max_file_bytes: u64,
    encoding_sample_chars: usize,
}

impl Default for CsvParser {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FILE_BYTES, DEFAULT_ENCODING_SAMPLE_CHARS)
    }
}

impl CsvParser {
    pub fn new(max_file_bytes: u64, encoding_sample_chars: usize) -> Self {
        Self {
            max_file_bytes,
            encoding_sample_chars,
        }
    }

    pub fn from_settings(settings: &ImportSettings) -> Self {
        Self::new(settings.max_file_bytes, settings.encoding_sample_chars)
    }

    fn check_size(&self, size: u64) -> EngineResult<()> {
        if size > self.max_file_bytes {
            return Err(ImportError::FileTooLarge {
                size,
                limit: self.max_file_bytes,
            });
        }
        Ok(())
    }

    // 采样前 N 个字符，出现替换字符说明原始字节不是合法 UTF-8
    fn check_encoding(&self, text: &str) -> EngineResult<()> {
        if text
            .chars()
            .take(self.encoding_sample_chars)
            .any(|c| c == char::REPLACEMENT_CHARACTER)
        {
            return Err(ImportError::EncodingError {
                sample: self.encoding_sample_chars,
            });
        }
        Ok(())
    }
}

/// 校验声明的内容类型（未声明视为通过）
pub fn check_content_type(content_type: Option<&str>) -> EngineResult<()> {
    let Some(declared) = content_type else {
        return Ok(());
    };

    // 忽略参数部分，如 "text/csv; charset=utf-8"
    let mime = declared
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    if mime.is_empty() || ACCEPTED_CONTENT_TYPES.contains(&mime.as_str()) {
        Ok(())
    } else {
        Err(ImportError::UnsupportedFormat(declared.to_string()))
    }
}

/// 按扩展名推断内容类型
///
/// # 返回
/// - Ok(Some(mime)): 已识别的扩展名
/// - Ok(None): 无扩展名
/// - Err(UnsupportedFormat): 不支持的扩展名
pub fn content_type_for_path(path: &Path) -> EngineResult<Option<&'static str>> {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return Ok(None);
    };

    match ext.to_ascii_lowercase().as_str() {
        "csv" => Ok(Some("text/csv")),
        "txt" => Ok(Some("text/plain")),
        other => Err(ImportError::UnsupportedFormat(format!(".{}", other))),
    }
}

/// 去掉表头之前的 '#' 说明行与空行（模板导出格式）
///
/// 表头之后以 '#' 开头的行按数据行处理
fn strip_preamble(text: &str) -> &str {
    let mut rest = text;
    while !rest.is_empty() {
        let line_end = rest.find('\n').map_or(rest.len(), |i| i + 1);
        let line = rest[..line_end].trim();
        if !line.is_empty() && !line.starts_with('#') {
            break;
        }
        rest = &rest[line_end..];
    }
    rest
}

impl FileParser for CsvParser {
    fn parse_bytes(&self, bytes: &[u8], content_type: Option<&str>) -> EngineResult<Vec<Row>> {
        self.check_size(bytes.len() as u64)?;
        check_content_type(content_type)?;

        let decoded = String::from_utf8_lossy(bytes);
        self.check_encoding(&decoded)?;

        let text = strip_preamble(decoded.strip_prefix(UTF8_BOM).unwrap_or(&decoded));
        if text.trim().is_empty() {
            return Err(ImportError::EmptyFile);
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .trim(Trim::All)
            .from_reader(text.as_bytes());

        // 读取表头
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        if headers.iter().all(String::is_empty) {
            return Err(ImportError::EmptyFile);
        }

        // 读取所有行
        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            let mut row = Row::new();

            // 单元格数 = min(表头数, 本行单元格数)；缺失的尾部单元格读取时视为空串
            for (header, value) in headers.iter().zip(record.iter()) {
                if header.is_empty() || row.contains(header) {
                    continue;
                }
                row.set(header.as_str(), value);
            }

            // 跳过完全空白的行
            if row.is_blank() {
                continue;
            }
            rows.push(row);
        }

        debug!(columns = headers.len(), rows = rows.len(), "CSV 解析完成");
        Ok(rows)
    }

    fn parse_path(&self, path: &Path) -> EngineResult<Vec<Row>> {
        // 检查文件存在
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        // 读取前先检查大小与扩展名
        let metadata = fs::metadata(path)?;
        self.check_size(metadata.len())?;
        let content_type = content_type_for_path(path)?;

        let bytes = fs::read(path)?;
        self.parse_bytes(&bytes, content_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn parse(text: &str) -> EngineResult<Vec<Row>> {
        CsvParser::default().parse_bytes(text.as_bytes(), Some("text/csv"))
    }

    #[test]
    fn test_quoted_cells_keep_commas_and_newlines() {
        let rows = parse("name,notes\n\"Acme, Inc.\",\"line one\nline two\"\n").unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("name"), Some("Acme, Inc."));
        assert_eq!(rows[0].get("notes"), Some("line one\nline two"));
    }

    #[test]
    fn test_short_rows_and_blank_rows() {
        let rows = parse("name,email,phone\nAcme\n , , \nGlobex,g@globex.com\n").unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].len(), 1);
        assert_eq!(rows[0].value("email"), "");
        assert_eq!(rows[1].get("email"), Some("g@globex.com"));
    }

    #[test]
    fn test_extra_cells_are_ignored() {
        let rows = parse("name\nAcme,unexpected\n").unwrap();
        assert_eq!(rows[0].len(), 1);
    }

    #[test]
    fn test_bom_and_preamble_lines() {
        let rows = parse("\u{FEFF}# 必填字段: name\n\n# - name: 客户名称\nname,email\nAcme,a@acme.com\n").unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("name"), Some("Acme"));
    }

    #[test]
    fn test_hash_prefixed_data_rows_are_kept() {
        let rows = parse("name,email\nAcme,a@acme.com\n#1 Digital Agency,hi@one.com\nGlobex,g@globex.com\n").unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].get("name"), Some("#1 Digital Agency"));
        assert_eq!(rows[2].get("name"), Some("Globex"));
    }

    #[test]
    fn test_preamble_only_file_is_empty() {
        assert!(matches!(parse("# 说明\n# 另一行\n"), Err(ImportError::EmptyFile)));
    }

    #[test]
    fn test_empty_file() {
        assert!(matches!(parse(""), Err(ImportError::EmptyFile)));
        assert!(matches!(parse("  \n\n"), Err(ImportError::EmptyFile)));
    }

    #[test]
    fn test_header_only_file_has_no_rows() {
        assert!(parse("name,email\n").unwrap().is_empty());
    }

    #[test]
    fn test_file_too_large() {
        let parser = CsvParser::new(8, DEFAULT_ENCODING_SAMPLE_CHARS);
        let result = parser.parse_bytes(b"name\nAcme Corporation\n", None);
        assert!(matches!(
            result,
            Err(ImportError::FileTooLarge { limit: 8, .. })
        ));
    }

    #[test]
    fn test_content_type_check() {
        assert!(check_content_type(None).is_ok());
        assert!(check_content_type(Some("text/csv; charset=utf-8")).is_ok());
        assert!(check_content_type(Some("Application/VND.MS-EXCEL")).is_ok());
        assert!(matches!(
            check_content_type(Some("application/pdf")),
            Err(ImportError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_invalid_utf8_is_encoding_error() {
        let bytes = b"name\n\xff\xfeAcme\n";
        let result = CsvParser::default().parse_bytes(bytes, None);
        assert!(matches!(result, Err(ImportError::EncodingError { .. })));
    }

    #[test]
    fn test_invalid_bytes_after_sample_are_tolerated() {
        let parser = CsvParser::new(DEFAULT_MAX_FILE_BYTES, 5);
        let rows = parser.parse_bytes(b"name\nAcme \xff\n", None).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_parse_path_valid_file() {
        let mut temp_file = NamedTempFile::with_suffix(".csv").unwrap();
        writeln!(temp_file, "name,client_name").unwrap();
        writeln!(temp_file, "Acme Website Redesign,Acme Corporation").unwrap();

        let rows = CsvParser::default().parse_path(temp_file.path()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("client_name"), Some("Acme Corporation"));
    }

    #[test]
    fn test_parse_path_rejects_extension() {
        let temp_file = NamedTempFile::with_suffix(".xlsx").unwrap();
        let result = CsvParser::default().parse_path(temp_file.path());
        assert!(matches!(result, Err(ImportError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_parse_path_missing_file() {
        let result = CsvParser::default().parse_path(Path::new("/nonexistent/accounts.csv"));
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }
}
