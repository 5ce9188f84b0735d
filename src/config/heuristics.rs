// ==========================================
// CRM 批量导入引擎 - 启发式映射表
// ==========================================
// 职责: 字段别名、行业关键字、行业分组代码、团队关键字、季度日期占位符
// 约束: 不可变配置数据，由部署方通过 config_kv(import.heuristics) 覆写
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// KeywordGroup - 关键字分组
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordGroup {
    pub label: String,
    pub keywords: Vec<String>,
}

impl KeywordGroup {
    fn new(label: &str, keywords: &[&str]) -> Self {
        Self {
            label: label.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

// ==========================================
// IndustryGroup - 行业分组
// ==========================================
// 匹配顺序: 代码/别名精确匹配 → 简码关键字包含匹配
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndustryGroup {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl IndustryGroup {
    fn new(name: &str, code: &str, aliases: &[&str], keywords: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            code: code.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

// ==========================================
// JobDefaults - 项目默认值
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDefaults {
    pub new_business_stage: String,
    pub existing_business_stage: String,
    pub status: String,
    pub priority: String,
}

impl Default for JobDefaults {
    fn default() -> Self {
        Self {
            new_business_stage: "Opportunity".to_string(),
            existing_business_stage: "Active".to_string(),
            status: "active".to_string(),
            priority: "medium".to_string(),
        }
    }
}

// ==========================================
// HeuristicTables - 启发式表全集
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicTables {
    /// 实体 → 字段 → 备选列名（按优先级）
    pub field_aliases: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    pub industry_keywords: Vec<KeywordGroup>,
    pub default_industry: String,
    pub industry_groups: Vec<IndustryGroup>,
    pub default_industry_group: String,
    pub team_keywords: Vec<KeywordGroup>,
    /// 表示"尚未确定日期"的占位字符串（不区分大小写）
    pub date_sentinels: Vec<String>,
    pub job_defaults: JobDefaults,
}

impl HeuristicTables {
    /// 查询字段的备选列名
    pub fn aliases_for(&self, entity: &str, field: &str) -> &[String] {
        self.field_aliases
            .get(entity)
            .and_then(|fields| fields.get(field))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_date_sentinel(&self, value: &str) -> bool {
        let value = value.trim();
        self.date_sentinels
            .iter()
            .any(|s| s.eq_ignore_ascii_case(value))
    }
}

fn alias_table(entries: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
    entries
        .iter()
        .map(|(field, aliases)| {
            (
                field.to_string(),
                aliases.iter().map(|a| a.to_string()).collect(),
            )
        })
        .collect()
}

impl Default for HeuristicTables {
    fn default() -> Self {
        let mut field_aliases = BTreeMap::new();
        field_aliases.insert(
            "accounts".to_string(),
            alias_table(&[
                (
                    "name",
                    &[
                        "company_name",
                        "client_name",
                        "organization",
                        "account_name",
                        "business_name",
                    ],
                ),
                ("email", &["email_address", "contact_email"]),
            ]),
        );
        field_aliases.insert(
            "jobs".to_string(),
            alias_table(&[
                ("name", &["job_name", "project_name", "project", "title"]),
                (
                    "client_name",
                    &[
                        "account_name",
                        "company_name",
                        "client",
                        "account",
                        "customer",
                        "organization",
                    ],
                ),
            ]),
        );
        field_aliases.insert(
            "users".to_string(),
            alias_table(&[
                ("email", &["email_address", "e-mail", "mail", "work_email"]),
                ("name", &["full_name", "display_name"]),
            ]),
        );

        Self {
            field_aliases,
            industry_keywords: vec![
                KeywordGroup::new(
                    "Education",
                    &["university", "college", "school", "academy", "institute", "education"],
                ),
                KeywordGroup::new(
                    "Financial Services",
                    &["bank", "capital", "financial", "finance", "insurance", "investment", "credit"],
                ),
                KeywordGroup::new(
                    "Healthcare",
                    &["health", "hospital", "clinic", "medical", "pharma", "dental"],
                ),
                KeywordGroup::new(
                    "Technology",
                    &["tech", "software", "digital", "systems", "data", "cloud", "labs"],
                ),
                KeywordGroup::new(
                    "Travel & Hospitality",
                    &["travel", "hotel", "tours", "airline", "hospitality", "resort", "cruise"],
                ),
                KeywordGroup::new(
                    "Manufacturing",
                    &["manufacturing", "industrial", "industries", "engineering", "factory", "motors"],
                ),
                KeywordGroup::new(
                    "Retail",
                    &["retail", "store", "shop", "market", "boutique", "outlet"],
                ),
                KeywordGroup::new(
                    "Non-Profit",
                    &["foundation", "charity", "trust", "society", "association"],
                ),
                KeywordGroup::new(
                    "Government",
                    &["council", "government", "ministry", "department", "agency", "municipal"],
                ),
            ],
            default_industry: "Professional Services".to_string(),
            industry_groups: vec![
                IndustryGroup::new(
                    "Education & Non-Profit",
                    "EDU",
                    &["EDUCATION", "NFP", "NON-PROFIT", "NONPROFIT"],
                    &["UNIV", "COLL", "SCHOOL", "ACAD", "EDU", "FOUND", "CHARITY"],
                ),
                IndustryGroup::new(
                    "Technology",
                    "TEC",
                    &["TECH", "TECHNOLOGY", "IT"],
                    &["TECH", "SOFT", "DIGI", "DATA", "CLOUD"],
                ),
                IndustryGroup::new(
                    "Financial Services",
                    "FIN",
                    &["FINANCE", "BANKING", "FS"],
                    &["BANK", "FIN", "CAP", "INSUR", "INVEST"],
                ),
                IndustryGroup::new(
                    "Healthcare",
                    "HLT",
                    &["HEALTH", "HC", "MEDICAL"],
                    &["HEALTH", "HOSP", "MED", "CLINIC", "PHARM"],
                ),
                IndustryGroup::new(
                    "Travel & Hospitality",
                    "TRV",
                    &["TRAVEL", "HOSPITALITY", "TH"],
                    &["TRAV", "HOTEL", "TOUR", "AIR", "RESORT"],
                ),
                IndustryGroup::new(
                    "Manufacturing & Industrial",
                    "MFG",
                    &["MANUFACTURING", "INDUSTRIAL"],
                    &["MFG", "MANU", "FACT", "MOTOR"],
                ),
                IndustryGroup::new(
                    "Retail & Consumer",
                    "RTL",
                    &["RETAIL", "CONSUMER"],
                    &["RETAIL", "SHOP", "STORE", "MART"],
                ),
                IndustryGroup::new(
                    "Government & Public Sector",
                    "GOV",
                    &["GOVERNMENT", "PUBLIC"],
                    &["GOV", "COUNCIL", "DEPT"],
                ),
            ],
            default_industry_group: "New Business".to_string(),
            team_keywords: vec![
                KeywordGroup::new(
                    "Digital",
                    &["website", "web", "app", "digital", "platform", "portal"],
                ),
                KeywordGroup::new("Brand", &["brand", "logo", "identity"]),
                KeywordGroup::new(
                    "Marketing",
                    &["campaign", "marketing", "social", "seo", "advert"],
                ),
                KeywordGroup::new(
                    "Strategy",
                    &["strategy", "research", "workshop", "discovery"],
                ),
            ],
            date_sentinels: ["Opportunity", "Exploration", "TBC", "TBD", "Pipeline", "Ongoing", "N/A"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            job_defaults: JobDefaults::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_aliases() {
        let tables = HeuristicTables::default();
        let aliases = tables.aliases_for("accounts", "name");
        assert_eq!(aliases.first().map(String::as_str), Some("company_name"));
        assert!(tables.aliases_for("accounts", "unknown").is_empty());
        assert!(tables.aliases_for("unknown", "name").is_empty());
    }

    #[test]
    fn test_date_sentinel_case_insensitive() {
        let tables = HeuristicTables::default();
        assert!(tables.is_date_sentinel("opportunity"));
        assert!(tables.is_date_sentinel(" Exploration "));
        assert!(!tables.is_date_sentinel("Q125"));
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let json = r#"{"default_industry": "Consulting"}"#;
        let tables: HeuristicTables = serde_json::from_str(json).unwrap();

        assert_eq!(tables.default_industry, "Consulting");
        assert_eq!(tables.default_industry_group, "New Business");
        assert!(!tables.industry_keywords.is_empty());
    }
}
