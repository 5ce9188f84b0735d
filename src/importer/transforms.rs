// ==========================================
// CRM 批量导入引擎 - 字段转换
// ==========================================
// 职责: TRIM / 大小写 / 数字 / 日期 / 季度日期 / 布尔 标准化
// 约束: 空值原样返回空串；无法识别的值返回 Err(描述)，由调用方降级为空值 + 警告
// ==========================================

use crate::config::HeuristicTables;
use crate::domain::schema::Transform;
use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

/// 标准日期输出格式
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// 可接受的日期输入格式（按顺序尝试）
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d", "%d/%m/%Y", "%d.%m.%Y"];

// 季度日期: Q125 / Q1 25 / Q1-2025 / q4'12
static QUARTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[Qq]([1-4])\s*[-/']?\s*(\d{2}|\d{4})$").expect("valid quarter regex")
});

/// 应用单个字段转换
///
/// # 返回
/// - Ok(String): 转换后的值（可能为空串）
/// - Err(String): 转换失败原因
pub fn apply(transform: &Transform, raw: &str, tables: &HeuristicTables) -> Result<String, String> {
    let value = raw.trim();

    match transform {
        Transform::Trim => Ok(value.to_string()),
        Transform::Lowercase => Ok(value.to_lowercase()),
        Transform::Uppercase => Ok(value.to_uppercase()),
        Transform::Custom(f) => f(value),
        _ if value.is_empty() => Ok(String::new()),
        Transform::Number => normalize_number(value),
        Transform::Date => parse_date(value)
            .map(|d| d.format(ISO_DATE_FORMAT).to_string())
            .ok_or_else(|| format!("无法识别的日期: {}", value)),
        Transform::QuarterDate => {
            if tables.is_date_sentinel(value) {
                return Ok(String::new());
            }
            parse_quarter_date(value)
                .or_else(|| parse_date(value))
                .map(|d| d.format(ISO_DATE_FORMAT).to_string())
                .ok_or_else(|| format!("无法识别的季度日期: {}", value))
        }
        Transform::Boolean => parse_boolean(value)
            .map(|b| b.to_string())
            .ok_or_else(|| format!("无法识别的是/否值: {}", value)),
    }
}

/// 解析常见日期格式
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();

    // 带时间部分的 ISO 时间戳只取日期
    let date_part = match value.get(..10) {
        Some(prefix) if value.len() > 10 && matches!(value.as_bytes()[10], b'T' | b' ') => prefix,
        _ => value,
    };

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}

/// 解析季度日期为季度首月第一天
///
/// # 示例
/// - "Q125" → 2025-01-01
/// - "Q412" → 2012-10-01
pub fn parse_quarter_date(value: &str) -> Option<NaiveDate> {
    let caps = QUARTER_RE.captures(value.trim())?;
    let quarter: u32 = caps[1].parse().ok()?;
    let year_raw = &caps[2];
    let year: i32 = match year_raw.len() {
        2 => 2000 + year_raw.parse::<i32>().ok()?,
        _ => year_raw.parse().ok()?,
    };

    NaiveDate::from_ymd_opt(year, (quarter - 1) * 3 + 1, 1)
}

/// 解析是/否标记
pub fn parse_boolean(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" | "1" | "x" => Some(true),
        "no" | "n" | "false" | "0" => Some(false),
        _ => None,
    }
}

/// 数字标准化：去除千分位、货币符号与空白
fn normalize_number(value: &str) -> Result<String, String> {
    let cleaned: String = value
        .chars()
        .filter(|c| !matches!(c, ',' | '$' | '£' | '€' | '¥') && !c.is_whitespace())
        .collect();

    let number: f64 = cleaned
        .parse()
        .map_err(|_| format!("无法解析为数字: {}", value))?;
    if !number.is_finite() {
        return Err(format!("无法解析为数字: {}", value));
    }

    if number.fract() == 0.0 && number.abs() < 1e15 {
        Ok(format!("{}", number as i64))
    } else {
        Ok(number.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> HeuristicTables {
        HeuristicTables::default()
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_quarter_dates() {
        assert_eq!(parse_quarter_date("Q125"), Some(ymd(2025, 1, 1)));
        assert_eq!(parse_quarter_date("Q412"), Some(ymd(2012, 10, 1)));
        assert_eq!(parse_quarter_date("Q3 24"), Some(ymd(2024, 7, 1)));
        assert_eq!(parse_quarter_date("q2-2026"), Some(ymd(2026, 4, 1)));
        assert_eq!(parse_quarter_date("Q525"), None);
        assert_eq!(parse_quarter_date("Opportunity"), None);
    }

    #[test]
    fn test_quarter_sentinels_yield_no_date() {
        let tables = tables();
        assert_eq!(
            apply(&Transform::QuarterDate, "Opportunity", &tables),
            Ok(String::new())
        );
        assert_eq!(
            apply(&Transform::QuarterDate, "exploration", &tables),
            Ok(String::new())
        );
        assert_eq!(
            apply(&Transform::QuarterDate, "Q125", &tables),
            Ok("2025-01-01".to_string())
        );
        assert!(apply(&Transform::QuarterDate, "someday", &tables).is_err());
    }

    #[test]
    fn test_date_formats() {
        assert_eq!(parse_date("2025-03-14"), Some(ymd(2025, 3, 14)));
        assert_eq!(parse_date("2025/03/14"), Some(ymd(2025, 3, 14)));
        assert_eq!(parse_date("20250314"), Some(ymd(2025, 3, 14)));
        assert_eq!(parse_date("14/03/2025"), Some(ymd(2025, 3, 14)));
        assert_eq!(parse_date("14.03.2025"), Some(ymd(2025, 3, 14)));
        assert_eq!(parse_date("2025-03-14T09:30:00Z"), Some(ymd(2025, 3, 14)));
        assert_eq!(parse_date("March 14"), None);
    }

    #[test]
    fn test_number_normalization() {
        let tables = tables();
        assert_eq!(
            apply(&Transform::Number, "$1,250,000", &tables),
            Ok("1250000".to_string())
        );
        assert_eq!(
            apply(&Transform::Number, " 12.5 ", &tables),
            Ok("12.5".to_string())
        );
        assert!(apply(&Transform::Number, "twelve", &tables).is_err());
        assert_eq!(apply(&Transform::Number, "", &tables), Ok(String::new()));
    }

    #[test]
    fn test_boolean_and_case() {
        let tables = tables();
        assert_eq!(apply(&Transform::Boolean, "Yes", &tables), Ok("true".to_string()));
        assert_eq!(apply(&Transform::Boolean, "x", &tables), Ok("true".to_string()));
        assert_eq!(apply(&Transform::Boolean, "N", &tables), Ok("false".to_string()));
        assert!(apply(&Transform::Boolean, "maybe", &tables).is_err());
        assert_eq!(
            apply(&Transform::Lowercase, " A@Acme.COM ", &tables),
            Ok("a@acme.com".to_string())
        );
        assert_eq!(apply(&Transform::Uppercase, "univ", &tables), Ok("UNIV".to_string()));
    }

    #[test]
    fn test_custom_transform() {
        let strip_plus = Transform::custom(|v| Ok(v.trim_start_matches('+').to_string()));
        assert_eq!(
            apply(&strip_plus, "+4420", &tables()),
            Ok("4420".to_string())
        );
    }
}
