//! 类型映射模块
//!
//! 将各方言的原生列类型映射到一个封闭的语义字段类型集合；
//! MongoDB 没有固定目录，改为从采样文档的值推断类型

use mongodb::bson::Bson;
use serde::{Deserialize, Serialize};

/// 语义字段类型 - UI 生成器据此选择控件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// 文本
    Text,
    /// 数值
    Number,
    /// 布尔
    Boolean,
    /// 日期（无时间部分）
    Date,
    /// 日期时间
    DateTime,
    /// 货币
    Currency,
    /// JSON
    Json,
    /// 二进制
    Binary,
    /// UUID
    Uuid,
    /// 数组
    Array,
}

/// PostgreSQL 原生类型映射
///
/// money 类优先映射到 Currency，再考虑普通数值
pub fn map_postgres_type(native: &str) -> FieldType {
    match native.to_lowercase().as_str() {
        "money" => FieldType::Currency,
        "smallint" | "integer" | "bigint" | "int2" | "int4" | "int8" | "numeric" | "decimal"
        | "real" | "double precision" | "float4" | "float8" | "serial" | "bigserial"
        | "smallserial" => FieldType::Number,
        "boolean" | "bool" => FieldType::Boolean,
        "date" => FieldType::Date,
        "timestamp" | "timestamptz" | "timestamp without time zone"
        | "timestamp with time zone" | "time" | "timetz" | "time without time zone"
        | "time with time zone" => FieldType::DateTime,
        "json" | "jsonb" => FieldType::Json,
        "bytea" => FieldType::Binary,
        "uuid" => FieldType::Uuid,
        "array" => FieldType::Array,
        s if s.starts_with('_') || s.ends_with("[]") => FieldType::Array,
        // text/varchar/char/enum/inet 等全部落到文本
        _ => FieldType::Text,
    }
}

/// MySQL 原生类型映射
pub fn map_mysql_type(native: &str) -> FieldType {
    match native.to_lowercase().as_str() {
        "decimal" | "numeric" => FieldType::Currency,
        "tinyint" | "smallint" | "mediumint" | "int" | "integer" | "bigint" | "float"
        | "double" | "real" => FieldType::Number,
        // MySQL 没有原生布尔，bit(1) 是约定写法
        "bit" | "boolean" | "bool" => FieldType::Boolean,
        "date" => FieldType::Date,
        "datetime" | "timestamp" | "time" => FieldType::DateTime,
        "json" => FieldType::Json,
        "binary" | "varbinary" | "blob" | "tinyblob" | "mediumblob" | "longblob" => {
            FieldType::Binary
        }
        _ => FieldType::Text,
    }
}

/// SQL Server 原生类型映射
pub fn map_sqlserver_type(native: &str) -> FieldType {
    match native.to_lowercase().as_str() {
        "money" | "smallmoney" => FieldType::Currency,
        "tinyint" | "smallint" | "int" | "bigint" | "decimal" | "numeric" | "float" | "real" => {
            FieldType::Number
        }
        "bit" => FieldType::Boolean,
        "date" => FieldType::Date,
        "datetime" | "datetime2" | "smalldatetime" | "datetimeoffset" | "time" => {
            FieldType::DateTime
        }
        "binary" | "varbinary" | "image" => FieldType::Binary,
        "uniqueidentifier" => FieldType::Uuid,
        // SQL Server 没有 JSON 列类型，惯例存 nvarchar(max)
        _ => FieldType::Text,
    }
}

/// 从采样到的 BSON 值推断语义字段类型（MongoDB 路径）
pub fn infer_bson_field_type(value: &Bson) -> Option<FieldType> {
    match value {
        Bson::Null | Bson::Undefined => None,
        Bson::Boolean(_) => Some(FieldType::Boolean),
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => {
            Some(FieldType::Number)
        }
        Bson::DateTime(_) | Bson::Timestamp(_) => Some(FieldType::DateTime),
        Bson::Array(_) => Some(FieldType::Array),
        Bson::Document(_) => Some(FieldType::Json),
        Bson::Binary(_) => Some(FieldType::Binary),
        // ObjectId 以十六进制字符串形式对外暴露
        _ => Some(FieldType::Text),
    }
}

/// 合并两次采样观察到的字段类型，取最一般的公共类型
///
/// 同一字段在不同文档中观察到冲突类型时（如 number 与 text 混用），
/// 退化到能容纳两者的类型；推断出的模式是尽力而为的投影，不是真值
pub fn merge_field_types(a: FieldType, b: FieldType) -> FieldType {
    use FieldType::*;
    if a == b {
        return a;
    }
    match (a, b) {
        (Number, Currency) | (Currency, Number) => Number,
        (Date, DateTime) | (DateTime, Date) => DateTime,
        // 其余一切冲突都退化为文本
        _ => Text,
    }
}

/// BSON 原生类型名（用于 ColumnSchema.native_type 展示）
pub fn bson_type_name(value: &Bson) -> &'static str {
    match value {
        Bson::Double(_) => "double",
        Bson::String(_) => "string",
        Bson::Array(_) => "array",
        Bson::Document(_) => "object",
        Bson::Boolean(_) => "bool",
        Bson::Null => "null",
        Bson::Int32(_) => "int",
        Bson::Int64(_) => "long",
        Bson::Decimal128(_) => "decimal",
        Bson::DateTime(_) => "date",
        Bson::Timestamp(_) => "timestamp",
        Bson::ObjectId(_) => "objectId",
        Bson::Binary(_) => "binData",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_mapping() {
        assert_eq!(map_postgres_type("timestamptz"), FieldType::DateTime);
        assert_eq!(map_postgres_type("numeric"), FieldType::Number);
        assert_eq!(map_postgres_type("money"), FieldType::Currency);
        assert_eq!(map_postgres_type("jsonb"), FieldType::Json);
        assert_eq!(map_postgres_type("uuid"), FieldType::Uuid);
        assert_eq!(map_postgres_type("_int4"), FieldType::Array);
        assert_eq!(map_postgres_type("character varying"), FieldType::Text);
    }

    #[test]
    fn test_mysql_mapping() {
        assert_eq!(map_mysql_type("bit"), FieldType::Boolean);
        assert_eq!(map_mysql_type("decimal"), FieldType::Currency);
        assert_eq!(map_mysql_type("bigint"), FieldType::Number);
        assert_eq!(map_mysql_type("enum"), FieldType::Text);
        assert_eq!(map_mysql_type("datetime"), FieldType::DateTime);
    }

    #[test]
    fn test_sqlserver_mapping() {
        assert_eq!(map_sqlserver_type("money"), FieldType::Currency);
        assert_eq!(map_sqlserver_type("uniqueidentifier"), FieldType::Uuid);
        assert_eq!(map_sqlserver_type("bit"), FieldType::Boolean);
        assert_eq!(map_sqlserver_type("nvarchar"), FieldType::Text);
        assert_eq!(map_sqlserver_type("datetime2"), FieldType::DateTime);
    }

    #[test]
    fn test_merge_field_types() {
        // 混合 number/text 退化为 text
        assert_eq!(
            merge_field_types(FieldType::Number, FieldType::Text),
            FieldType::Text
        );
        assert_eq!(
            merge_field_types(FieldType::Number, FieldType::Currency),
            FieldType::Number
        );
        assert_eq!(
            merge_field_types(FieldType::Date, FieldType::DateTime),
            FieldType::DateTime
        );
        assert_eq!(
            merge_field_types(FieldType::Json, FieldType::Json),
            FieldType::Json
        );
    }
}
