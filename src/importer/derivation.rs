// ==========================================
// CRM 批量导入引擎 - 字段派生（启发式）
// ==========================================
// 职责: 行业 / 行业分组 / 团队 / 项目阶段 推断
// 红线: 只读启发式表，不含副作用；表由调用方注入
// ==========================================

use crate::config::{HeuristicTables, KeywordGroup};

/// 按客户名称关键字推断行业
///
/// # 规则
/// - 名称（小写）包含任一关键字 → 该组标签（按表顺序取第一个命中）
/// - 无命中 → default_industry
pub fn derive_industry(tables: &HeuristicTables, name: &str) -> String {
    match_keyword_group(&tables.industry_keywords, name)
        .unwrap_or(&tables.default_industry)
        .to_string()
}

/// 按简码推断行业分组
///
/// # 规则
/// 1. 简码与分组代码 / 别名 / 名称精确匹配（忽略大小写）
/// 2. 简码包含分组关键字（按表顺序取第一个命中）
/// 3. 兜底 → default_industry_group
pub fn derive_industry_group(tables: &HeuristicTables, short_code: &str) -> String {
    let code = short_code.trim().to_uppercase();
    if code.is_empty() {
        return tables.default_industry_group.clone();
    }

    let exact = tables.industry_groups.iter().find(|group| {
        group.code.eq_ignore_ascii_case(&code)
            || group.name.eq_ignore_ascii_case(&code)
            || group.aliases.iter().any(|a| a.eq_ignore_ascii_case(&code))
    });
    if let Some(group) = exact {
        return group.name.clone();
    }

    tables
        .industry_groups
        .iter()
        .find(|group| {
            group
                .keywords
                .iter()
                .any(|k| !k.is_empty() && code.contains(&k.to_uppercase()))
        })
        .map(|group| group.name.clone())
        .unwrap_or_else(|| tables.default_industry_group.clone())
}

/// 按项目名称关键字推断团队（无命中返回 None）
pub fn derive_team(tables: &HeuristicTables, job_name: &str) -> Option<String> {
    match_keyword_group(&tables.team_keywords, job_name).map(str::to_string)
}

/// 按"新业务"标记选择项目阶段
pub fn derive_job_stage(tables: &HeuristicTables, new_business: bool) -> String {
    if new_business {
        tables.job_defaults.new_business_stage.clone()
    } else {
        tables.job_defaults.existing_business_stage.clone()
    }
}

fn match_keyword_group<'a>(groups: &'a [KeywordGroup], text: &str) -> Option<&'a str> {
    let text = text.to_lowercase();
    groups
        .iter()
        .find(|group| {
            group
                .keywords
                .iter()
                .any(|k| !k.is_empty() && text.contains(&k.to_lowercase()))
        })
        .map(|group| group.label.as_str())
}
