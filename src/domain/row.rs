// ==========================================
// CRM 批量导入引擎 - 行数据模型
// ==========================================
// 职责: 表头 → 单元格值 的有序映射（一行输入一条）
// 约束: 保持表头顺序；不要求包含全部表头键
// ==========================================

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// 单行数据（列名 → 原始字符串值，按列顺序）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    cells: Vec<(String, String)>,
}

impl Row {
    pub fn new() -> Self {
        Self { cells: Vec::new() }
    }

    /// 读取列值（列不存在返回 None）
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    /// 读取列值，列不存在视为空字符串
    pub fn value(&self, column: &str) -> &str {
        self.get(column).unwrap_or("")
    }

    /// 读取去除首尾空白后的非空值
    pub fn non_empty(&self, column: &str) -> Option<&str> {
        self.get(column)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// 写入列值（已存在则原位替换，否则追加到末尾）
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        match self.cells.iter_mut().find(|(name, _)| *name == column) {
            Some(cell) => cell.1 = value,
            None => self.cells.push((column, value)),
        }
    }

    pub fn contains(&self, column: &str) -> bool {
        self.cells.iter().any(|(name, _)| name == column)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// 所有单元格去除空白后均为空
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|(_, value)| value.trim().is_empty())
    }
}

impl<K, V> FromIterator<(K, V)> for Row
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (column, value) in iter {
            row.set(column, value);
        }
        row
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (name, value) in &self.cells {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_preserves_column_order() {
        let row: Row = [("name", "Acme"), ("email", "a@acme.com"), ("phone", "")]
            .into_iter()
            .collect();

        let columns: Vec<&str> = row.iter().map(|(c, _)| c).collect();
        assert_eq!(columns, vec!["name", "email", "phone"]);
    }

    #[test]
    fn test_row_set_replaces_in_place() {
        let mut row: Row = [("name", ""), ("industry", "")].into_iter().collect();
        row.set("name", "Acme");
        row.set("legal_name", "Acme Ltd");

        assert_eq!(row.get("name"), Some("Acme"));
        assert_eq!(row.len(), 3);
        assert_eq!(row.iter().next(), Some(("name", "Acme")));
    }

    #[test]
    fn test_row_blank_and_missing() {
        let row: Row = [("a", "  "), ("b", "")].into_iter().collect();
        assert!(row.is_blank());
        assert_eq!(row.value("missing"), "");
        assert_eq!(row.non_empty("a"), None);
    }

    #[test]
    fn test_row_serializes_as_map() {
        let row: Row = [("name", "Acme")].into_iter().collect();
        assert_eq!(serde_json::to_string(&row).unwrap(), r#"{"name":"Acme"}"#);
    }
}
