// ==========================================
// CRM 批量导入引擎 - 模板导出
// ==========================================
// 输出: '#' 注释行（必填 / 可选字段说明）+ 表头行 + 示例行
// 约束: 纯格式化，不访问存储；导出的模板可直接回传导入（注释行被解析器跳过）
// ==========================================

use crate::domain::schema::{ColumnSpec, ImportSchema};
use crate::importer::error::{EngineResult, ImportError};
use csv::WriterBuilder;

/// 生成导入模板
pub fn generate_template(schema: &ImportSchema) -> EngineResult<String> {
    let columns = template_columns(schema);
    let (required, optional): (Vec<&ColumnSpec>, Vec<&ColumnSpec>) =
        columns.iter().partition(|c| schema.is_required(&c.name));

    let mut out = String::new();
    out.push_str(&format!("# {} 导入模板\n", schema.name));
    out.push_str(&format!("# 必填字段: {}\n", join_names(&required)));
    if !optional.is_empty() {
        out.push_str(&format!("# 可选字段: {}\n", join_names(&optional)));
    }
    for column in columns.iter().filter(|c| !c.description.is_empty()) {
        out.push_str(&format!("# - {}: {}\n", column.name, column.description));
    }

    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(columns.iter().map(|c| c.name.as_str()))?;
    writer.write_record(columns.iter().map(|c| c.example.as_str()))?;
    let bytes = writer
        .into_inner()
        .map_err(|e| ImportError::InternalError(format!("模板写入失败: {}", e)))?;
    let body = String::from_utf8(bytes)
        .map_err(|e| ImportError::InternalError(format!("模板编码失败: {}", e)))?;

    out.push_str(&body);
    Ok(out)
}

// 未声明列时，按 必填 → 规则 → 转换 的顺序收集字段
fn template_columns(schema: &ImportSchema) -> Vec<ColumnSpec> {
    if !schema.columns.is_empty() {
        return schema.columns.clone();
    }

    let mut names: Vec<&str> = schema.required_fields();
    let declared = schema
        .rules
        .iter()
        .map(|r| r.field.as_str())
        .chain(schema.transforms.iter().map(|(f, _)| f.as_str()));
    for name in declared {
        if !names.contains(&name) {
            names.push(name);
        }
    }

    names
        .into_iter()
        .map(|name| ColumnSpec::new(name, "", ""))
        .collect()
}

fn join_names(columns: &[&ColumnSpec]) -> String {
    if columns.is_empty() {
        return "（无）".to_string();
    }
    columns
        .iter()
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
