//! SQL 查询编译器
//!
//! 把方言无关的操作请求（过滤、分页、聚合）编译为方言正确的
//! SQL 文本加有序参数列表。标识符一律经过安全层校验，值一律
//! 走绑定参数，语句文本里永远不出现调用方提供的值

use crate::error::PanelDbResult;
use crate::ident;
use crate::schema::TableSchema;
use crate::types::*;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// 编译结果 - SQL 文本加按占位符顺序排列的参数
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    /// SQL 语句
    pub sql: String,
    /// 有序参数列表
    pub params: Vec<DataValue>,
}

/// ISO 组合日期时间形式（2024-01-02T03:04:05 及带时区/毫秒变体）
static ISO_DATETIME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}(:\d{2}(\.\d+)?)?(Z|[+-]\d{2}:?\d{2})?$")
        .expect("日期时间正则必然合法")
});

/// 纯日期形式（2024-01-02）
static ISO_DATE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("日期正则必然合法"));

/// 解析 ISO 日期时间字符串，容忍常见变体
fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }
    None
}

/// 把 ISO 组合日期时间输入归一化为目标方言的绑定形式
///
/// PostgreSQL 以强类型参数绑定，文本参数无法与 timestamp 比较，
/// 因此解析为 DateTime；MySQL/SQL Server 接受字面时间戳字符串，
/// 归一化为空格分隔形式
pub fn normalize_temporal(db_type: DatabaseType, value: DataValue) -> DataValue {
    let DataValue::String(ref s) = value else {
        return value;
    };
    if ISO_DATETIME_PATTERN.is_match(s) {
        if let Some(naive) = parse_iso_datetime(s) {
            return match db_type {
                DatabaseType::PostgreSQL | DatabaseType::MongoDB => {
                    DataValue::DateTime(Utc.from_utc_datetime(&naive))
                }
                DatabaseType::MySQL | DatabaseType::SqlServer => {
                    DataValue::String(naive.format("%Y-%m-%d %H:%M:%S").to_string())
                }
            };
        }
    } else if ISO_DATE_PATTERN.is_match(s) {
        // 纯日期在强类型比较的方言里同样解析为当日零点，
        // 否则 BSON 的跨类型排序会让字符串边界永远匹配不到日期值
        if matches!(db_type, DatabaseType::PostgreSQL | DatabaseType::MongoDB) {
            if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
                    return DataValue::DateTime(Utc.from_utc_datetime(&midnight));
                }
            }
        }
    }
    value
}

/// 编译单个过滤条件，返回 None 表示该条件被整体跳过
fn compile_filter(
    db_type: DatabaseType,
    filter: &Filter,
    params: &mut Vec<DataValue>,
    next_index: &mut usize,
) -> PanelDbResult<Option<String>> {
    let column = ident::escape_identifier(db_type, &filter.column)?;

    match filter.operator {
        FilterOperator::IsNull => Ok(Some(format!("{} IS NULL", column))),
        FilterOperator::IsNotNull => Ok(Some(format!("{} IS NOT NULL", column))),
        FilterOperator::In | FilterOperator::NotIn => {
            let Some(DataValue::Array(values)) = &filter.value else {
                return Err(crate::panel_error!(
                    validation,
                    format!("{:?} 操作符需要非空数组值", filter.operator)
                ));
            };
            // 空数组直接跳过该条件，不生成恒真/恒假子句
            if values.is_empty() {
                return Ok(None);
            }
            let mut placeholders = Vec::with_capacity(values.len());
            for value in values {
                placeholders.push(ident::placeholder(db_type, *next_index));
                *next_index += 1;
                params.push(normalize_temporal(db_type, value.clone()));
            }
            let keyword = if filter.operator == FilterOperator::In {
                "IN"
            } else {
                "NOT IN"
            };
            Ok(Some(format!(
                "{} {} ({})",
                column,
                keyword,
                placeholders.join(", ")
            )))
        }
        FilterOperator::Contains | FilterOperator::StartsWith | FilterOperator::EndsWith => {
            let raw = match &filter.value {
                Some(DataValue::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => {
                    return Err(crate::panel_error!(
                        validation,
                        format!("{:?} 操作符需要值", filter.operator)
                    ));
                }
            };
            let pattern = match filter.operator {
                FilterOperator::Contains => format!("%{}%", raw),
                FilterOperator::StartsWith => format!("{}%", raw),
                _ => format!("%{}", raw),
            };
            // PostgreSQL 用 ILIKE 保证大小写不敏感；其余方言依赖排序规则
            let like = if db_type == DatabaseType::PostgreSQL {
                "ILIKE"
            } else {
                "LIKE"
            };
            let placeholder = ident::placeholder(db_type, *next_index);
            *next_index += 1;
            params.push(DataValue::String(pattern));
            Ok(Some(format!("{} {} {}", column, like, placeholder)))
        }
        _ => {
            let Some(value) = &filter.value else {
                return Err(crate::panel_error!(
                    validation,
                    format!("{:?} 操作符需要值", filter.operator)
                ));
            };
            let op = match (filter.operator, db_type) {
                (FilterOperator::Eq, _) => "=",
                // 语义相同，仅风格差异
                (FilterOperator::Ne, DatabaseType::SqlServer) => "<>",
                (FilterOperator::Ne, _) => "!=",
                (FilterOperator::Gt, _) => ">",
                (FilterOperator::Gte, _) => ">=",
                (FilterOperator::Lt, _) => "<",
                (FilterOperator::Lte, _) => "<=",
                _ => unreachable!("前面的分支已覆盖其余操作符"),
            };
            let placeholder = ident::placeholder(db_type, *next_index);
            *next_index += 1;
            params.push(normalize_temporal(db_type, value.clone()));
            Ok(Some(format!("{} {} {}", column, op, placeholder)))
        }
    }
}

/// 编译过滤条件组序列为 WHERE 子句体
///
/// 占位符索引从调用方提供的偏移量开始连续分配，保证 WHERE 参数
/// 与后续 LIMIT/OFFSET 参数在按索引编号的方言里保持连续
pub fn compile_filter_groups(
    db_type: DatabaseType,
    groups: &[FilterGroup],
    start_index: usize,
) -> PanelDbResult<(Option<String>, Vec<DataValue>, usize)> {
    let mut params = Vec::new();
    let mut next_index = start_index;
    let mut group_clauses = Vec::new();

    for group in groups {
        let mut clauses = Vec::new();
        for filter in &group.filters {
            if let Some(clause) = compile_filter(db_type, filter, &mut params, &mut next_index)? {
                clauses.push(clause);
            }
        }
        if clauses.is_empty() {
            continue;
        }
        let joiner = match group.logic {
            FilterLogic::And => " AND ",
            FilterLogic::Or => " OR ",
        };
        if clauses.len() == 1 {
            group_clauses.push(clauses.remove(0));
        } else {
            group_clauses.push(format!("({})", clauses.join(joiner)));
        }
    }

    if group_clauses.is_empty() {
        Ok((None, params, next_index))
    } else {
        Ok((Some(group_clauses.join(" AND ")), params, next_index))
    }
}

/// 编译方言正确的分页子句
///
/// SQL Server 的 OFFSET/FETCH 语法要求语句带 ORDER BY，
/// 由 select 构建器负责补齐
pub fn compile_pagination(
    db_type: DatabaseType,
    next_index: usize,
    limit: u64,
    offset: u64,
) -> (String, Vec<DataValue>) {
    match db_type {
        DatabaseType::PostgreSQL => (
            format!(
                "LIMIT {} OFFSET {}",
                ident::placeholder(db_type, next_index),
                ident::placeholder(db_type, next_index + 1)
            ),
            vec![DataValue::Int(limit as i64), DataValue::Int(offset as i64)],
        ),
        DatabaseType::MySQL => (
            "LIMIT ? OFFSET ?".to_string(),
            vec![DataValue::Int(limit as i64), DataValue::Int(offset as i64)],
        ),
        DatabaseType::SqlServer => (
            format!(
                "OFFSET {} ROWS FETCH NEXT {} ROWS ONLY",
                ident::placeholder(db_type, next_index),
                ident::placeholder(db_type, next_index + 1)
            ),
            vec![DataValue::Int(offset as i64), DataValue::Int(limit as i64)],
        ),
        DatabaseType::MongoDB => (String::new(), Vec::new()),
    }
}

/// 编译方言的日期截断表达式，column 必须是已转义的列
pub fn compile_date_trunc(db_type: DatabaseType, period: DatePeriod, column: &str) -> String {
    match db_type {
        DatabaseType::PostgreSQL => {
            format!("date_trunc('{}', {})", period.as_str(), column)
        }
        DatabaseType::MySQL => match period {
            DatePeriod::Day => format!("DATE({})", column),
            DatePeriod::Week => format!(
                "DATE_SUB(DATE({}), INTERVAL WEEKDAY({}) DAY)",
                column, column
            ),
            DatePeriod::Month => format!("DATE_FORMAT({}, '%Y-%m-01')", column),
            DatePeriod::Year => format!("DATE_FORMAT({}, '%Y-01-01')", column),
        },
        DatabaseType::SqlServer => match period {
            DatePeriod::Day => format!("CAST({} AS DATE)", column),
            DatePeriod::Week => format!(
                "DATEADD(DAY, 1 - DATEPART(WEEKDAY, {}), CAST({} AS DATE))",
                column, column
            ),
            DatePeriod::Month => {
                format!("DATEFROMPARTS(YEAR({}), MONTH({}), 1)", column, column)
            }
            DatePeriod::Year => format!("DATEFROMPARTS(YEAR({}), 1, 1)", column),
        },
        DatabaseType::MongoDB => String::new(),
    }
}

/// 构建 COUNT 查询，与数据查询共用同一 WHERE 子句
pub fn build_count(
    db_type: DatabaseType,
    table: &str,
    groups: &[FilterGroup],
) -> PanelDbResult<CompiledQuery> {
    let table = ident::escape_identifier(db_type, table)?;
    let (where_clause, params, _) = compile_filter_groups(db_type, groups, 1)?;
    let mut sql = format!("SELECT COUNT(*) AS total FROM {}", table);
    if let Some(clause) = where_clause {
        sql.push_str(&format!(" WHERE {}", clause));
    }
    Ok(CompiledQuery { sql, params })
}

/// 构建分页 SELECT 查询
///
/// `fallback_order` 是调用方未指定排序时 SQL Server 用来满足
/// OFFSET/FETCH 约束的列（通常取表的第一列）
pub fn build_select_page(
    db_type: DatabaseType,
    table: &str,
    groups: &[FilterGroup],
    order_by: Option<&str>,
    order_direction: SortDirection,
    fallback_order: Option<&str>,
    limit: u64,
    offset: u64,
) -> PanelDbResult<CompiledQuery> {
    let escaped_table = ident::escape_identifier(db_type, table)?;
    let (where_clause, mut params, next_index) = compile_filter_groups(db_type, groups, 1)?;

    let mut sql = format!("SELECT * FROM {}", escaped_table);
    if let Some(clause) = where_clause {
        sql.push_str(&format!(" WHERE {}", clause));
    }

    match order_by {
        Some(column) => {
            let column = ident::escape_identifier(db_type, column)?;
            sql.push_str(&format!(
                " ORDER BY {} {}",
                column,
                order_direction.as_sql()
            ));
        }
        None if db_type == DatabaseType::SqlServer => {
            // SQL Server 不允许没有 ORDER BY 的 OFFSET/FETCH
            match fallback_order {
                Some(column) => {
                    let column = ident::escape_identifier(db_type, column)?;
                    sql.push_str(&format!(" ORDER BY {} ASC", column));
                }
                None => sql.push_str(" ORDER BY (SELECT NULL)"),
            }
        }
        None => {}
    }

    let (pagination_clause, pagination_params) =
        compile_pagination(db_type, next_index, limit, offset);
    sql.push_str(&format!(" {}", pagination_clause));
    params.extend(pagination_params);

    Ok(CompiledQuery { sql, params })
}

/// 构建单条记录按主键查询
pub fn build_get(db_type: DatabaseType, table: &str, pk_column: &str) -> PanelDbResult<CompiledQuery> {
    let table = ident::escape_identifier(db_type, table)?;
    let pk = ident::escape_identifier(db_type, pk_column)?;
    let placeholder = ident::placeholder(db_type, 1);
    let sql = match db_type {
        DatabaseType::SqlServer => {
            format!("SELECT TOP 1 * FROM {} WHERE {} = {}", table, pk, placeholder)
        }
        _ => format!(
            "SELECT * FROM {} WHERE {} = {} LIMIT 1",
            table, pk, placeholder
        ),
    };
    Ok(CompiledQuery {
        sql,
        params: Vec::new(),
    })
}

/// 构建 INSERT 语句，列按名称排序保证确定性
///
/// PostgreSQL 用 RETURNING 取回插入行，SQL Server 用 OUTPUT，
/// MySQL 由适配器回读
pub fn build_insert(
    db_type: DatabaseType,
    table: &str,
    data: &HashMap<String, DataValue>,
) -> PanelDbResult<CompiledQuery> {
    if data.is_empty() {
        return Err(crate::panel_error!(validation, "插入数据不能为空"));
    }
    let escaped_table = ident::escape_identifier(db_type, table)?;

    let mut columns: Vec<&String> = data.keys().collect();
    columns.sort();

    let mut escaped_columns = Vec::with_capacity(columns.len());
    let mut placeholders = Vec::with_capacity(columns.len());
    let mut params = Vec::with_capacity(columns.len());
    for (index, column) in columns.iter().enumerate() {
        escaped_columns.push(ident::escape_identifier(db_type, column)?);
        placeholders.push(ident::placeholder(db_type, index + 1));
        params.push(normalize_temporal(db_type, data[*column].clone()));
    }

    let sql = match db_type {
        DatabaseType::PostgreSQL => format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
            escaped_table,
            escaped_columns.join(", "),
            placeholders.join(", ")
        ),
        DatabaseType::SqlServer => format!(
            "INSERT INTO {} ({}) OUTPUT INSERTED.* VALUES ({})",
            escaped_table,
            escaped_columns.join(", "),
            placeholders.join(", ")
        ),
        _ => format!(
            "INSERT INTO {} ({}) VALUES ({})",
            escaped_table,
            escaped_columns.join(", "),
            placeholders.join(", ")
        ),
    };

    Ok(CompiledQuery { sql, params })
}

/// 构建按主键 UPDATE 语句，主键值是最后一个参数
pub fn build_update(
    db_type: DatabaseType,
    table: &str,
    pk_column: &str,
    data: &HashMap<String, DataValue>,
) -> PanelDbResult<CompiledQuery> {
    if data.is_empty() {
        return Err(crate::panel_error!(validation, "更新数据不能为空"));
    }
    let escaped_table = ident::escape_identifier(db_type, table)?;
    let escaped_pk = ident::escape_identifier(db_type, pk_column)?;

    let mut columns: Vec<&String> = data.keys().collect();
    columns.sort();

    let mut set_clauses = Vec::with_capacity(columns.len());
    let mut params = Vec::with_capacity(columns.len() + 1);
    for (index, column) in columns.iter().enumerate() {
        let escaped = ident::escape_identifier(db_type, column)?;
        set_clauses.push(format!(
            "{} = {}",
            escaped,
            ident::placeholder(db_type, index + 1)
        ));
        params.push(normalize_temporal(db_type, data[*column].clone()));
    }

    let sql = format!(
        "UPDATE {} SET {} WHERE {} = {}",
        escaped_table,
        set_clauses.join(", "),
        escaped_pk,
        ident::placeholder(db_type, columns.len() + 1)
    );

    Ok(CompiledQuery { sql, params })
}

/// 构建按主键 DELETE 语句
pub fn build_delete(
    db_type: DatabaseType,
    table: &str,
    pk_column: &str,
) -> PanelDbResult<CompiledQuery> {
    let table = ident::escape_identifier(db_type, table)?;
    let pk = ident::escape_identifier(db_type, pk_column)?;
    let sql = format!(
        "DELETE FROM {} WHERE {} = {}",
        table,
        pk,
        ident::placeholder(db_type, 1)
    );
    Ok(CompiledQuery {
        sql,
        params: Vec::new(),
    })
}

/// 构建聚合查询
///
/// 时间序列按截断日期升序，分类分组按聚合值降序并受 limit 上限约束
pub fn build_aggregate(
    db_type: DatabaseType,
    table: &str,
    options: &AggregateOptions,
) -> PanelDbResult<CompiledQuery> {
    let escaped_table = ident::escape_identifier(db_type, table)?;

    let func_expr = match (&options.function, &options.column) {
        (AggregateFunction::Count, None) => "COUNT(*)".to_string(),
        (_, Some(column)) => {
            let column = ident::escape_identifier(db_type, column)?;
            format!("{}({})", options.function.as_sql(), column)
        }
        (function, None) => {
            return Err(crate::panel_error!(
                validation,
                format!("{:?} 聚合需要指定列", function)
            ));
        }
    };

    let groups: Vec<FilterGroup> = options.filter.clone().into_iter().collect();
    let (where_clause, mut params, next_index) = compile_filter_groups(db_type, &groups, 1)?;
    let where_sql = where_clause
        .map(|clause| format!(" WHERE {}", clause))
        .unwrap_or_default();

    let sql = match &options.group_by {
        Some(group_column) => {
            let escaped_group = ident::escape_identifier(db_type, group_column)?;
            let group_expr = match options.date_period {
                Some(period) => compile_date_trunc(db_type, period, &escaped_group),
                None => escaped_group,
            };
            let mut sql = format!(
                "SELECT {} AS bucket, {} AS value FROM {}{} GROUP BY {}",
                group_expr, func_expr, escaped_table, where_sql, group_expr
            );
            if options.date_period.is_some() {
                // 时间序列按截断日期升序，不设上限
                sql.push_str(&format!(" ORDER BY {} ASC", group_expr));
            } else {
                sql.push_str(&format!(" ORDER BY {} DESC", func_expr));
                let (cap_clause, cap_params) = match db_type {
                    DatabaseType::SqlServer => compile_pagination(db_type, next_index, options.limit, 0),
                    _ => {
                        let clause = format!("LIMIT {}", ident::placeholder(db_type, next_index));
                        (clause, vec![DataValue::Int(options.limit as i64)])
                    }
                };
                sql.push_str(&format!(" {}", cap_clause));
                params.extend(cap_params);
            }
            sql
        }
        None => format!(
            "SELECT {} AS value FROM {}{}",
            func_expr, escaped_table, where_sql
        ),
    };

    Ok(CompiledQuery { sql, params })
}

/// 从搜索选项构建过滤条件组序列（方言无关，MongoDB 路径同样复用）
///
/// 搜索词在所有文本列上 OR 组合做子串匹配；按列过滤条件之间
/// AND 组合；`<col>_from`/`<col>_to` 解释为闭区间范围边界
pub fn build_search_groups(schema: &TableSchema, options: &SearchOptions) -> Vec<FilterGroup> {
    let mut groups = Vec::new();

    if let Some(term) = options.search.as_deref() {
        let term = term.trim();
        if !term.is_empty() {
            let filters: Vec<Filter> = schema
                .text_columns()
                .into_iter()
                .map(|column| {
                    Filter::new(
                        column,
                        FilterOperator::Contains,
                        DataValue::String(term.to_string()),
                    )
                })
                .collect();
            if !filters.is_empty() {
                groups.push(FilterGroup::or(filters));
            }
        }
    }

    let mut keys: Vec<&String> = options.filters.keys().collect();
    keys.sort();

    let mut column_filters = Vec::new();
    for key in keys {
        let value = options.filters[key].clone();
        if let Some(column) = key.strip_suffix("_from") {
            column_filters.push(Filter::new(column, FilterOperator::Gte, value));
        } else if let Some(column) = key.strip_suffix("_to") {
            column_filters.push(Filter::new(column, FilterOperator::Lte, value));
        } else if matches!(value, DataValue::String(_)) {
            column_filters.push(Filter::new(key.clone(), FilterOperator::Contains, value));
        } else {
            column_filters.push(Filter::new(key.clone(), FilterOperator::Eq, value));
        }
    }
    if !column_filters.is_empty() {
        groups.push(FilterGroup::and(column_filters));
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnSchema;
    use crate::typemap::FieldType;

    fn column(name: &str, field_type: FieldType) -> ColumnSchema {
        ColumnSchema {
            name: name.to_string(),
            native_type: String::new(),
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
    fn test_filter_group_postgres_placeholders() {
        let groups = vec![FilterGroup::and(vec![
            Filter::new("age", FilterOperator::Gte, DataValue::Int(18)),
            Filter::new("status", FilterOperator::Eq, DataValue::String("ok".into())),
        ])];
        let (clause, params, next) =
            compile_filter_groups(DatabaseType::PostgreSQL, &groups, 1).unwrap();
        assert_eq!(
            clause.unwrap(),
            "(\"age\" >= $1 AND \"status\" = $2)"
        );
        assert_eq!(params.len(), 2);
        assert_eq!(next, 3);
    }

    #[test]
    fn test_filter_group_or_logic() {
        let groups = vec![FilterGroup::or(vec![
            Filter::new("name", FilterOperator::Contains, DataValue::String("a".into())),
            Filter::new("email", FilterOperator::Contains, DataValue::String("a".into())),
        ])];
        let (clause, params, _) =
            compile_filter_groups(DatabaseType::MySQL, &groups, 1).unwrap();
        assert_eq!(clause.unwrap(), "(`name` LIKE ? OR `email` LIKE ?)");
        assert_eq!(
            params,
            vec![
                DataValue::String("%a%".into()),
                DataValue::String("%a%".into())
            ]
        );
    }

    #[test]
    fn test_contains_uses_ilike_on_postgres() {
        let groups = vec![FilterGroup::and(vec![Filter::new(
            "name",
            FilterOperator::Contains,
            DataValue::String("smith".into()),
        )])];
        let (clause, _, _) =
            compile_filter_groups(DatabaseType::PostgreSQL, &groups, 1).unwrap();
        assert_eq!(clause.unwrap(), "\"name\" ILIKE $1");
    }

    #[test]
    fn test_is_null_emits_no_param() {
        let groups = vec![FilterGroup::and(vec![
            Filter::unary("deleted_at", FilterOperator::IsNull),
            Filter::new("age", FilterOperator::Lt, DataValue::Int(30)),
        ])];
        let (clause, params, next) =
            compile_filter_groups(DatabaseType::PostgreSQL, &groups, 1).unwrap();
        assert_eq!(
            clause.unwrap(),
            "(\"deleted_at\" IS NULL AND \"age\" < $1)"
        );
        assert_eq!(params.len(), 1);
        assert_eq!(next, 2);
    }

    #[test]
    fn test_in_expands_placeholders() {
        let groups = vec![FilterGroup::and(vec![Filter::new(
            "id",
            FilterOperator::In,
            DataValue::Array(vec![
                DataValue::Int(1),
                DataValue::Int(2),
                DataValue::Int(3),
            ]),
        )])];
        let (clause, params, next) =
            compile_filter_groups(DatabaseType::PostgreSQL, &groups, 1).unwrap();
        assert_eq!(clause.unwrap(), "\"id\" IN ($1, $2, $3)");
        assert_eq!(params.len(), 3);
        assert_eq!(next, 4);
    }

    #[test]
    fn test_empty_in_array_skips_condition() {
        let groups = vec![FilterGroup::and(vec![
            Filter::new("id", FilterOperator::In, DataValue::Array(vec![])),
            Filter::new("age", FilterOperator::Gt, DataValue::Int(1)),
        ])];
        let (clause, params, _) =
            compile_filter_groups(DatabaseType::PostgreSQL, &groups, 1).unwrap();
        // 空数组条件被跳过，只剩下另一个条件
        assert_eq!(clause.unwrap(), "\"age\" > $1");
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_ne_rendering_per_dialect() {
        let groups = vec![FilterGroup::and(vec![Filter::new(
            "x",
            FilterOperator::Ne,
            DataValue::Int(1),
        )])];
        let (pg, _, _) = compile_filter_groups(DatabaseType::PostgreSQL, &groups, 1).unwrap();
        assert_eq!(pg.unwrap(), "\"x\" != $1");
        let (ms, _, _) = compile_filter_groups(DatabaseType::SqlServer, &groups, 1).unwrap();
        assert_eq!(ms.unwrap(), "[x] <> @P1");
    }

    #[test]
    fn test_invalid_column_rejected_before_compile() {
        let groups = vec![FilterGroup::and(vec![Filter::new(
            "x; DROP TABLE users",
            FilterOperator::Eq,
            DataValue::Int(1),
        )])];
        let err = compile_filter_groups(DatabaseType::PostgreSQL, &groups, 1).unwrap_err();
        assert!(matches!(
            err,
            crate::error::PanelDbError::InvalidIdentifierError { .. }
        ));
    }

    #[test]
    fn test_pagination_clause_per_dialect() {
        let (pg, params) = compile_pagination(DatabaseType::PostgreSQL, 3, 10, 20);
        assert_eq!(pg, "LIMIT $3 OFFSET $4");
        assert_eq!(params, vec![DataValue::Int(10), DataValue::Int(20)]);

        let (my, params) = compile_pagination(DatabaseType::MySQL, 1, 10, 20);
        assert_eq!(my, "LIMIT ? OFFSET ?");
        assert_eq!(params, vec![DataValue::Int(10), DataValue::Int(20)]);

        // SQL Server 先 OFFSET 后 FETCH，参数顺序相应调换
        let (ms, params) = compile_pagination(DatabaseType::SqlServer, 2, 10, 20);
        assert_eq!(ms, "OFFSET @P2 ROWS FETCH NEXT @P3 ROWS ONLY");
        assert_eq!(params, vec![DataValue::Int(20), DataValue::Int(10)]);
    }

    #[test]
    fn test_where_params_contiguous_with_pagination() {
        let groups = vec![FilterGroup::and(vec![Filter::new(
            "age",
            FilterOperator::Gt,
            DataValue::Int(18),
        )])];
        let query = build_select_page(
            DatabaseType::PostgreSQL,
            "users",
            &groups,
            Some("name"),
            SortDirection::Desc,
            None,
            10,
            20,
        )
        .unwrap();
        assert_eq!(
            query.sql,
            "SELECT * FROM \"users\" WHERE \"age\" > $1 ORDER BY \"name\" DESC LIMIT $2 OFFSET $3"
        );
        assert_eq!(query.params.len(), 3);
    }

    #[test]
    fn test_sqlserver_supplies_fallback_order() {
        let query = build_select_page(
            DatabaseType::SqlServer,
            "users",
            &[],
            None,
            SortDirection::Asc,
            Some("id"),
            10,
            0,
        )
        .unwrap();
        assert_eq!(
            query.sql,
            "SELECT * FROM [users] ORDER BY [id] ASC OFFSET @P1 ROWS FETCH NEXT @P2 ROWS ONLY"
        );
    }

    #[test]
    fn test_date_trunc_per_dialect() {
        assert_eq!(
            compile_date_trunc(DatabaseType::PostgreSQL, DatePeriod::Month, "\"created_at\""),
            "date_trunc('month', \"created_at\")"
        );
        assert_eq!(
            compile_date_trunc(DatabaseType::MySQL, DatePeriod::Month, "`created_at`"),
            "DATE_FORMAT(`created_at`, '%Y-%m-01')"
        );
        assert_eq!(
            compile_date_trunc(DatabaseType::SqlServer, DatePeriod::Month, "[created_at]"),
            "DATEFROMPARTS(YEAR([created_at]), MONTH([created_at]), 1)"
        );
        assert_eq!(
            compile_date_trunc(DatabaseType::MySQL, DatePeriod::Week, "`d`"),
            "DATE_SUB(DATE(`d`), INTERVAL WEEKDAY(`d`) DAY)"
        );
        assert_eq!(
            compile_date_trunc(DatabaseType::SqlServer, DatePeriod::Day, "[d]"),
            "CAST([d] AS DATE)"
        );
    }

    #[test]
    fn test_build_insert_postgres_returning() {
        let data = HashMap::from([
            ("name".to_string(), DataValue::String("张三".into())),
            ("age".to_string(), DataValue::Int(30)),
        ]);
        let query = build_insert(DatabaseType::PostgreSQL, "users", &data).unwrap();
        // 列按名称排序保证确定性
        assert_eq!(
            query.sql,
            "INSERT INTO \"users\" (\"age\", \"name\") VALUES ($1, $2) RETURNING *"
        );
        assert_eq!(query.params[0], DataValue::Int(30));
    }

    #[test]
    fn test_build_insert_sqlserver_output() {
        let data = HashMap::from([("name".to_string(), DataValue::String("a".into()))]);
        let query = build_insert(DatabaseType::SqlServer, "users", &data).unwrap();
        assert_eq!(
            query.sql,
            "INSERT INTO [users] ([name]) OUTPUT INSERTED.* VALUES (@P1)"
        );
    }

    #[test]
    fn test_build_insert_rejects_empty_payload() {
        let err = build_insert(DatabaseType::MySQL, "users", &HashMap::new()).unwrap_err();
        assert!(matches!(
            err,
            crate::error::PanelDbError::ValidationError { .. }
        ));
    }

    #[test]
    fn test_build_update_pk_param_is_last() {
        let data = HashMap::from([
            ("name".to_string(), DataValue::String("b".into())),
            ("age".to_string(), DataValue::Int(2)),
        ]);
        let query = build_update(DatabaseType::PostgreSQL, "users", "id", &data).unwrap();
        assert_eq!(
            query.sql,
            "UPDATE \"users\" SET \"age\" = $1, \"name\" = $2 WHERE \"id\" = $3"
        );
        assert_eq!(query.params.len(), 2);
    }

    #[test]
    fn test_build_aggregate_month_series() {
        let options = AggregateOptions {
            function: AggregateFunction::Count,
            column: None,
            group_by: Some("created_at".to_string()),
            date_period: Some(DatePeriod::Month),
            filter: None,
            limit: 50,
        };
        let pg = build_aggregate(DatabaseType::PostgreSQL, "orders", &options).unwrap();
        assert_eq!(
            pg.sql,
            "SELECT date_trunc('month', \"created_at\") AS bucket, COUNT(*) AS value \
             FROM \"orders\" GROUP BY date_trunc('month', \"created_at\") \
             ORDER BY date_trunc('month', \"created_at\") ASC"
        );

        let my = build_aggregate(DatabaseType::MySQL, "orders", &options).unwrap();
        assert!(my.sql.contains("DATE_FORMAT(`created_at`, '%Y-%m-01')"));
        assert!(my.sql.ends_with("ASC"));

        let ms = build_aggregate(DatabaseType::SqlServer, "orders", &options).unwrap();
        assert!(ms
            .sql
            .contains("DATEFROMPARTS(YEAR([created_at]), MONTH([created_at]), 1)"));
    }

    #[test]
    fn test_build_aggregate_categorical_capped() {
        let options = AggregateOptions {
            function: AggregateFunction::Sum,
            column: Some("amount".to_string()),
            group_by: Some("status".to_string()),
            date_period: None,
            filter: None,
            limit: 5,
        };
        let pg = build_aggregate(DatabaseType::PostgreSQL, "orders", &options).unwrap();
        assert_eq!(
            pg.sql,
            "SELECT \"status\" AS bucket, SUM(\"amount\") AS value FROM \"orders\" \
             GROUP BY \"status\" ORDER BY SUM(\"amount\") DESC LIMIT $1"
        );
        assert_eq!(pg.params, vec![DataValue::Int(5)]);

        let ms = build_aggregate(DatabaseType::SqlServer, "orders", &options).unwrap();
        assert!(ms
            .sql
            .ends_with("ORDER BY SUM([amount]) DESC OFFSET @P1 ROWS FETCH NEXT @P2 ROWS ONLY"));
    }

    #[test]
    fn test_build_aggregate_requires_column() {
        let options = AggregateOptions {
            function: AggregateFunction::Sum,
            column: None,
            ..Default::default()
        };
        assert!(build_aggregate(DatabaseType::PostgreSQL, "t", &options).is_err());
    }

    #[test]
    fn test_normalize_temporal() {
        // PostgreSQL 参数是强类型的，ISO 字符串解析为 DateTime
        let normalized = normalize_temporal(
            DatabaseType::PostgreSQL,
            DataValue::String("2024-01-02T03:04:05Z".into()),
        );
        assert!(matches!(normalized, DataValue::DateTime(_)));

        // MySQL/SQL Server 归一化为空格分隔的字面时间戳
        let normalized = normalize_temporal(
            DatabaseType::MySQL,
            DataValue::String("2024-01-02T03:04:05".into()),
        );
        assert_eq!(normalized, DataValue::String("2024-01-02 03:04:05".into()));

        // 非时间字符串原样保留
        let normalized = normalize_temporal(
            DatabaseType::MySQL,
            DataValue::String("not a date".into()),
        );
        assert_eq!(normalized, DataValue::String("not a date".into()));
    }

    #[test]
    fn test_normalize_temporal_date_only() {
        // 纯日期在 PostgreSQL 和 MongoDB 路径解析为当日零点
        for db_type in [DatabaseType::PostgreSQL, DatabaseType::MongoDB] {
            let normalized =
                normalize_temporal(db_type, DataValue::String("2024-01-01".into()));
            match normalized {
                DataValue::DateTime(dt) => {
                    assert_eq!(dt.to_rfc3339(), "2024-01-01T00:00:00+00:00")
                }
                other => panic!("应解析为 DateTime，得到 {:?}", other),
            }
        }

        // MySQL/SQL Server 按字面日期字符串比较，原样保留
        let normalized =
            normalize_temporal(DatabaseType::MySQL, DataValue::String("2024-01-01".into()));
        assert_eq!(normalized, DataValue::String("2024-01-01".into()));
    }

    #[test]
    fn test_build_search_groups() {
        let schema = TableSchema {
            name: "users".to_string(),
            columns: vec![
                column("name", FieldType::Text),
                column("email", FieldType::Text),
                column("age", FieldType::Number),
                column("created_at", FieldType::DateTime),
            ],
            primary_key: vec!["id".to_string()],
        };
        let options = SearchOptions {
            search: Some("smith".to_string()),
            filters: HashMap::from([
                ("age".to_string(), DataValue::Int(40)),
                (
                    "created_at_from".to_string(),
                    DataValue::String("2024-01-01".into()),
                ),
                ("name".to_string(), DataValue::String("smi".into())),
            ]),
            page: 1,
            limit: 10,
            order_by: None,
            order_direction: None,
        };

        let groups = build_search_groups(&schema, &options);
        assert_eq!(groups.len(), 2);

        // 搜索词在所有文本列上 OR 组合
        assert_eq!(groups[0].logic, FilterLogic::Or);
        assert_eq!(groups[0].filters.len(), 2);
        assert!(groups[0]
            .filters
            .iter()
            .all(|f| f.operator == FilterOperator::Contains));

        // 按列过滤条件 AND 组合，_from 解释为范围下界
        assert_eq!(groups[1].logic, FilterLogic::And);
        let range = groups[1]
            .filters
            .iter()
            .find(|f| f.column == "created_at")
            .unwrap();
        assert_eq!(range.operator, FilterOperator::Gte);
        let eq = groups[1].filters.iter().find(|f| f.column == "age").unwrap();
        assert_eq!(eq.operator, FilterOperator::Eq);
        let contains = groups[1]
            .filters
            .iter()
            .find(|f| f.column == "name")
            .unwrap();
        assert_eq!(contains.operator, FilterOperator::Contains);
    }
}
