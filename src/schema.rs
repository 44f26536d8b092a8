//! 表模式定义
//!
//! 描述一次实时内省得到的表结构；每次请求都会重新内省，
//! 不跨调用缓存，以便反映线上的 DDL 变更

use crate::typemap::FieldType;
use serde::{Deserialize, Serialize};

/// 列模式 - 一列/字段的内省结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    /// 列名
    pub name: String,
    /// 数据库原生类型名
    pub native_type: String,
    /// 映射后的语义字段类型
    pub field_type: FieldType,
    /// 是否可为空
    pub nullable: bool,
    /// 是否有默认值（含自增/标识列）
    pub has_default: bool,
    /// 是否为主键列
    pub is_primary_key: bool,
    /// 最大长度（字符串类型）
    pub max_length: Option<u32>,
    /// 精度（数值类型）
    pub precision: Option<u32>,
    /// 小数位数（数值类型）
    pub scale: Option<u32>,
}

/// 表模式 - 有序列序列加主键
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    /// 表名
    pub name: String,
    /// 列定义（按表定义顺序）
    pub columns: Vec<ColumnSchema>,
    /// 主键列名（可能是复合主键）
    pub primary_key: Vec<String>,
}

impl TableSchema {
    /// 主键列名，无主键时回退到约定的 id 列
    pub fn primary_key_column(&self) -> &str {
        self.primary_key
            .first()
            .map(|s| s.as_str())
            .unwrap_or("id")
    }

    /// 所有文本类型列的列名（搜索路径使用）
    pub fn text_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.field_type == FieldType::Text)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// 按名称查找列
    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_column(name: &str, field_type: FieldType) -> ColumnSchema {
        ColumnSchema {
            name: name.to_string(),
            native_type: "text".to_string(),
            field_type,
            nullable: true,
            has_default: false,
            is_primary_key: false,
            max_length: None,
            precision: None,
            scale: None,
        }
    }

    #[test]
    fn test_text_columns() {
        let schema = TableSchema {
            name: "users".to_string(),
            columns: vec![
                make_column("name", FieldType::Text),
                make_column("age", FieldType::Number),
                make_column("email", FieldType::Text),
            ],
            primary_key: vec![],
        };
        assert_eq!(schema.text_columns(), vec!["name", "email"]);
        assert_eq!(schema.primary_key_column(), "id");
    }

    #[test]
    fn test_primary_key_column() {
        let schema = TableSchema {
            name: "orders".to_string(),
            columns: vec![],
            primary_key: vec!["order_id".to_string(), "line_no".to_string()],
        };
        assert_eq!(schema.primary_key_column(), "order_id");
    }
}
