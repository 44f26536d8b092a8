//! 数据库类型定义和通用数据模型
//!
//! 定义支持的数据库类型、跨数据库的数据值表示、过滤条件、
//! 分页结果和聚合查询参数

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// 支持的数据库类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatabaseType {
    /// PostgreSQL 数据库
    PostgreSQL,
    /// MySQL 数据库
    MySQL,
    /// SQL Server 数据库
    SqlServer,
    /// MongoDB 数据库
    MongoDB,
}

impl DatabaseType {
    /// 获取数据库类型的字符串表示
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseType::PostgreSQL => "postgresql",
            DatabaseType::MySQL => "mysql",
            DatabaseType::SqlServer => "sqlserver",
            DatabaseType::MongoDB => "mongodb",
        }
    }

    /// 从字符串解析数据库类型
    pub fn from_str(s: &str) -> Result<Self, crate::error::PanelDbError> {
        match s.to_lowercase().as_str() {
            "postgresql" | "postgres" | "pg" => Ok(DatabaseType::PostgreSQL),
            "mysql" | "mariadb" => Ok(DatabaseType::MySQL),
            "sqlserver" | "mssql" => Ok(DatabaseType::SqlServer),
            "mongodb" | "mongo" => Ok(DatabaseType::MongoDB),
            _ => Err(crate::panel_error!(
                config,
                format!("不支持的数据库类型: {}", s)
            )),
        }
    }
}

/// 适配器配置 - 连接池参数在构造时固定，之后不再变更
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// 连接池大小
    pub pool_size: u32,
    /// 获取连接超时时间（秒）
    pub connection_timeout: u64,
    /// 空闲连接超时时间（秒）
    pub idle_timeout: u64,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            pool_size: 5,
            connection_timeout: 10,
            idle_timeout: 600,
        }
    }
}

/// 通用数据值类型 - 支持跨数据库的数据表示
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataValue {
    /// 空值
    Null,
    /// 布尔值
    Bool(bool),
    /// 整数
    Int(i64),
    /// 浮点数
    Float(f64),
    /// 字符串
    String(String),
    /// 字节数组
    Bytes(Vec<u8>),
    /// 日期时间
    DateTime(DateTime<Utc>),
    /// UUID
    Uuid(Uuid),
    /// JSON 对象
    Json(serde_json::Value),
    /// 数组
    Array(Vec<DataValue>),
    /// 对象/文档
    Object(HashMap<String, DataValue>),
}

impl std::fmt::Display for DataValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataValue::Null => write!(f, "null"),
            DataValue::Bool(b) => write!(f, "{}", b),
            DataValue::Int(i) => write!(f, "{}", i),
            DataValue::Float(fl) => write!(f, "{}", fl),
            DataValue::String(s) => write!(f, "{}", s),
            DataValue::Bytes(bytes) => write!(f, "[{} bytes]", bytes.len()),
            DataValue::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            DataValue::Uuid(uuid) => write!(f, "{}", uuid),
            DataValue::Json(json) => write!(f, "{}", json),
            DataValue::Array(arr) => {
                let json_str = serde_json::to_string(arr).unwrap_or_default();
                write!(f, "{}", json_str)
            }
            DataValue::Object(obj) => {
                let json_str = serde_json::to_string(obj).unwrap_or_default();
                write!(f, "{}", json_str)
            }
        }
    }
}

impl DataValue {
    /// 判断是否为空值
    pub fn is_null(&self) -> bool {
        matches!(self, DataValue::Null)
    }

    /// 转换为 JSON 值
    pub fn to_json_value(&self) -> serde_json::Value {
        match self {
            DataValue::Null => serde_json::Value::Null,
            DataValue::Bool(b) => serde_json::Value::Bool(*b),
            DataValue::Int(i) => serde_json::Value::from(*i),
            DataValue::Float(f) => serde_json::Value::from(*f),
            DataValue::String(s) => serde_json::Value::String(s.clone()),
            DataValue::Bytes(bytes) => {
                serde_json::Value::String(format!("[{} bytes]", bytes.len()))
            }
            DataValue::DateTime(dt) => serde_json::Value::String(dt.to_rfc3339()),
            DataValue::Uuid(uuid) => serde_json::Value::String(uuid.to_string()),
            DataValue::Json(json) => json.clone(),
            DataValue::Array(arr) => {
                serde_json::Value::Array(arr.iter().map(|v| v.to_json_value()).collect())
            }
            DataValue::Object(obj) => {
                let map = obj
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json_value()))
                    .collect();
                serde_json::Value::Object(map)
            }
        }
    }

    /// 从 JSON 值解析
    pub fn from_json_value(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => DataValue::Null,
            serde_json::Value::Bool(b) => DataValue::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    DataValue::Int(i)
                } else {
                    DataValue::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => DataValue::String(s),
            serde_json::Value::Array(arr) => {
                DataValue::Array(arr.into_iter().map(DataValue::from_json_value).collect())
            }
            serde_json::Value::Object(obj) => DataValue::Object(
                obj.into_iter()
                    .map(|(k, v)| (k, DataValue::from_json_value(v)))
                    .collect(),
            ),
        }
    }
}

/// 一行记录 - 列名到数据值的映射
pub type Row = HashMap<String, DataValue>;

/// 查询结果 - 按顺序返回的行序列
pub type QueryResult = Vec<Row>;

/// 过滤操作符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOperator {
    /// 等于
    Eq,
    /// 不等于
    Ne,
    /// 大于
    Gt,
    /// 大于等于
    Gte,
    /// 小于
    Lt,
    /// 小于等于
    Lte,
    /// 包含（子串，不区分大小写视方言而定）
    Contains,
    /// 开始于
    StartsWith,
    /// 结束于
    EndsWith,
    /// 在列表中
    In,
    /// 不在列表中
    NotIn,
    /// 为空
    IsNull,
    /// 不为空
    IsNotNull,
}

/// 单个过滤条件
///
/// IsNull/IsNotNull 忽略 value；In/NotIn 要求数组值，
/// 空数组会使该条件被整体跳过
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    /// 列名
    pub column: String,
    /// 操作符
    pub operator: FilterOperator,
    /// 值（IsNull/IsNotNull 不需要）
    pub value: Option<DataValue>,
}

impl Filter {
    /// 创建带值的过滤条件
    pub fn new(column: impl Into<String>, operator: FilterOperator, value: DataValue) -> Self {
        Self {
            column: column.into(),
            operator,
            value: Some(value),
        }
    }

    /// 创建无值的过滤条件（IsNull/IsNotNull）
    pub fn unary(column: impl Into<String>, operator: FilterOperator) -> Self {
        Self {
            column: column.into(),
            operator,
            value: None,
        }
    }
}

/// 过滤条件组合逻辑
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterLogic {
    /// 所有条件同时成立
    And,
    /// 任一条件成立
    Or,
}

/// 过滤条件组 - 按 logic 组合的有序条件序列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterGroup {
    /// 组合逻辑
    pub logic: FilterLogic,
    /// 条件序列
    pub filters: Vec<Filter>,
}

impl FilterGroup {
    /// 创建 AND 条件组
    pub fn and(filters: Vec<Filter>) -> Self {
        Self {
            logic: FilterLogic::And,
            filters,
        }
    }

    /// 创建 OR 条件组
    pub fn or(filters: Vec<Filter>) -> Self {
        Self {
            logic: FilterLogic::Or,
            filters,
        }
    }
}

/// 排序方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    /// 升序
    Asc,
    /// 降序
    Desc,
}

impl SortDirection {
    /// SQL 关键字
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// 列表查询选项
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListOptions {
    /// 页码（从 1 开始）
    pub page: u64,
    /// 每页记录数
    pub limit: u64,
    /// 过滤条件
    pub filter: Option<FilterGroup>,
    /// 排序列
    pub order_by: Option<String>,
    /// 排序方向
    pub order_direction: SortDirection,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 20,
            filter: None,
            order_by: None,
            order_direction: SortDirection::Asc,
        }
    }
}

/// 搜索查询选项
///
/// `search` 在所有文本列上做子串匹配（OR 组合）；`filters` 按列叠加
/// 谓词（与搜索词以及彼此之间 AND 组合）：字符串值做不区分大小写的
/// 子串匹配，其他值做等值匹配；键 `<col>_from`/`<col>_to` 解释为
/// `<col>` 上的闭区间日期范围边界
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchOptions {
    /// 全文搜索词
    pub search: Option<String>,
    /// 按列过滤条件
    pub filters: HashMap<String, DataValue>,
    /// 页码（从 1 开始）
    pub page: u64,
    /// 每页记录数
    pub limit: u64,
    /// 排序列
    pub order_by: Option<String>,
    /// 排序方向
    pub order_direction: Option<SortDirection>,
}

/// 分页信息
///
/// 不变量: `total_pages = ceil(total / limit)`，total 来自与数据查询
/// 使用相同 WHERE 子句的 COUNT
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pagination {
    /// 当前页码
    pub page: u64,
    /// 每页记录数
    pub limit: u64,
    /// 总记录数
    pub total: u64,
    /// 总页数
    pub total_pages: u64,
}

impl Pagination {
    /// 根据总数计算分页信息
    pub fn new(page: u64, limit: u64, total: u64) -> Self {
        let total_pages = if limit == 0 {
            0
        } else {
            (total + limit - 1) / limit
        };
        Self {
            page,
            limit,
            total,
            total_pages,
        }
    }
}

/// 分页查询结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResult {
    /// 当前页数据
    pub items: QueryResult,
    /// 分页信息
    pub pagination: Pagination,
}

/// 表/视图信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    /// 表名
    pub name: String,
    /// 类型（表或视图）
    pub kind: TableKind,
}

/// 表类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableKind {
    /// 普通表/集合
    Table,
    /// 视图
    View,
}

/// 连接测试结果 - 永不抛出错误，总是返回结果对象
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionTestResult {
    /// 是否连接成功
    pub success: bool,
    /// 服务器版本信息
    pub version: Option<String>,
    /// 失败时的错误信息
    pub error: Option<String>,
}

impl ConnectionTestResult {
    /// 构造成功结果
    pub fn ok(version: Option<String>) -> Self {
        Self {
            success: true,
            version,
            error: None,
        }
    }

    /// 构造失败结果
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            version: None,
            error: Some(error.into()),
        }
    }
}

/// 聚合函数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateFunction {
    /// 计数
    Count,
    /// 求和
    Sum,
    /// 平均值
    Avg,
    /// 最小值
    Min,
    /// 最大值
    Max,
}

impl AggregateFunction {
    /// SQL 函数名
    pub fn as_sql(&self) -> &'static str {
        match self {
            AggregateFunction::Count => "COUNT",
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Avg => "AVG",
            AggregateFunction::Min => "MIN",
            AggregateFunction::Max => "MAX",
        }
    }
}

/// 日期截断周期
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatePeriod {
    /// 按天
    Day,
    /// 按周
    Week,
    /// 按月
    Month,
    /// 按年
    Year,
}

impl DatePeriod {
    /// 周期的字符串表示（PostgreSQL date_trunc 和 MongoDB $dateTrunc 通用）
    pub fn as_str(&self) -> &'static str {
        match self {
            DatePeriod::Day => "day",
            DatePeriod::Week => "week",
            DatePeriod::Month => "month",
            DatePeriod::Year => "year",
        }
    }
}

/// 聚合查询选项
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateOptions {
    /// 聚合函数
    pub function: AggregateFunction,
    /// 聚合列（Count 可省略）
    pub column: Option<String>,
    /// 分组列
    pub group_by: Option<String>,
    /// 日期截断周期（分组列为时间列时生效）
    pub date_period: Option<DatePeriod>,
    /// 过滤条件
    pub filter: Option<FilterGroup>,
    /// 分类分组结果的上限
    pub limit: u64,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            function: AggregateFunction::Count,
            column: None,
            group_by: None,
            date_period: None,
            filter: None,
            limit: 50,
        }
    }
}

/// 一条聚合结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRow {
    /// 分组键（未分组时为 None）
    pub group: Option<DataValue>,
    /// 聚合值
    pub value: DataValue,
}
