// ==========================================
// CRM 批量导入引擎 - Schema 注册表
// ==========================================
// 职责: 按名称注册 / 查找导入 schema
// 红线: 同名 schema 不允许覆盖；注册后不可变；未知名称属于配置错误
// ==========================================

use crate::domain::schema::ImportSchema;
use crate::importer::error::{EngineResult, ImportError};
use crate::importer::schemas::{accounts_schema, jobs_schema, users_schema};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Arc<ImportSchema>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册表 + 内置 schema（accounts / jobs / users）
    pub fn with_builtin_schemas() -> EngineResult<Self> {
        let mut registry = Self::new();
        registry.register(accounts_schema()?)?;
        registry.register(jobs_schema()?)?;
        registry.register(users_schema()?)?;
        Ok(registry)
    }

    /// 注册 schema（以 schema.name 为键）
    ///
    /// # 错误
    /// - ImportError::SchemaAlreadyRegistered: 同名 schema 已存在
    pub fn register(&mut self, schema: ImportSchema) -> EngineResult<()> {
        if self.schemas.contains_key(&schema.name) {
            return Err(ImportError::SchemaAlreadyRegistered(schema.name));
        }
        debug!(schema = %schema.name, entity = %schema.entity, "注册导入 schema");
        self.schemas.insert(schema.name.clone(), Arc::new(schema));
        Ok(())
    }

    /// 查找 schema
    ///
    /// # 错误
    /// - ImportError::UnknownSchema: 未注册
    pub fn get(&self, name: &str) -> EngineResult<Arc<ImportSchema>> {
        self.schemas
            .get(name)
            .cloned()
            .ok_or_else(|| ImportError::UnknownSchema(name.to_string()))
    }

    /// 已注册名称（排序）
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::EntityKind;

    #[test]
    fn test_builtin_lookup() {
        let registry = SchemaRegistry::with_builtin_schemas().unwrap();
        assert_eq!(registry.names(), vec!["accounts", "jobs", "users"]);
        assert_eq!(registry.get("jobs").unwrap().entity, EntityKind::Job);
    }

    #[test]
    fn test_unknown_schema_is_error() {
        let registry = SchemaRegistry::new();
        assert!(matches!(
            registry.get("contacts"),
            Err(ImportError::UnknownSchema(name)) if name == "contacts"
        ));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = SchemaRegistry::with_builtin_schemas().unwrap();
        let again = accounts_schema().unwrap();
        assert!(matches!(
            registry.register(again),
            Err(ImportError::SchemaAlreadyRegistered(_))
        ));
    }

    #[test]
    fn test_custom_schema_registration() {
        let mut registry = SchemaRegistry::new();
        let vendors = ImportSchema::builder("vendors", EntityKind::Generic)
            .key_field("vendor_code")
            .build()
            .unwrap();
        registry.register(vendors).unwrap();
        assert_eq!(registry.get("vendors").unwrap().table, "vendors");
    }
}
