//! PostgreSQL 数据库适配器
//!
//! 基于 sqlx 连接池实现，模式内省走 information_schema，
//! 占位符采用 $n 编号形式

use super::query_builder::{self, CompiledQuery};
use super::DatabaseAdapter;
use crate::error::{ErrorBuilder, PanelDbResult};
use crate::ident;
use crate::schema::{ColumnSchema, TableSchema};
use crate::typemap::{map_postgres_type, FieldType};
use crate::types::*;
use async_trait::async_trait;
use bigdecimal::ToPrimitive;
use rat_logger::{debug, warn};
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Column, Postgres, Row as SqlxRow, TypeInfo};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// PostgreSQL 适配器
pub struct PostgresAdapter {
    pool: PgPool,
    closed: AtomicBool,
}

impl PostgresAdapter {
    /// 建立连接池
    pub async fn connect(connection_string: &str, config: &AdapterConfig) -> PanelDbResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .idle_timeout(Duration::from_secs(config.idle_timeout))
            .connect(connection_string)
            .await
            .map_err(|e| ErrorBuilder::connection_error(format!("PostgreSQL 连接失败: {}", e)))?;
        Ok(Self {
            pool,
            closed: AtomicBool::new(false),
        })
    }

    fn ensure_open(&self) -> PanelDbResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(ErrorBuilder::connection_error("适配器已断开"))
        } else {
            Ok(())
        }
    }

    /// 绑定一个 DataValue 参数
    fn bind_value<'q>(
        query: Query<'q, Postgres, PgArguments>,
        value: &'q DataValue,
    ) -> Query<'q, Postgres, PgArguments> {
        match value {
            DataValue::Null => query.bind(Option::<String>::None),
            DataValue::Bool(b) => query.bind(*b),
            DataValue::Int(i) => query.bind(*i),
            DataValue::Float(f) => query.bind(*f),
            DataValue::String(s) => query.bind(s.as_str()),
            DataValue::Bytes(bytes) => query.bind(bytes.as_slice()),
            DataValue::DateTime(dt) => query.bind(*dt),
            DataValue::Uuid(uuid) => query.bind(*uuid),
            DataValue::Json(json) => query.bind(json.clone()),
            DataValue::Array(_) | DataValue::Object(_) => query.bind(value.to_json_value()),
        }
    }

    /// 执行编译后的查询并返回全部行
    async fn fetch_all(&self, compiled: &CompiledQuery) -> PanelDbResult<Vec<PgRow>> {
        debug!("PostgreSQL 执行: {}", compiled.sql);
        let mut query = sqlx::query(&compiled.sql);
        for param in &compiled.params {
            query = Self::bind_value(query, param);
        }
        query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ErrorBuilder::query_error(format!("PostgreSQL 查询失败: {}", e)))
    }

    /// 将行转换为通用数据映射
    fn row_to_data_map(row: &PgRow) -> Row {
        let mut map = HashMap::new();
        for column in row.columns() {
            let name = column.name();
            let value = match column.type_info().name() {
                "INT2" | "INT4" | "INT8" => {
                    if let Ok(Some(v)) = row.try_get::<Option<i64>, _>(name) {
                        DataValue::Int(v)
                    } else if let Ok(Some(v)) = row.try_get::<Option<i32>, _>(name) {
                        DataValue::Int(v as i64)
                    } else if let Ok(Some(v)) = row.try_get::<Option<i16>, _>(name) {
                        DataValue::Int(v as i64)
                    } else {
                        DataValue::Null
                    }
                }
                "FLOAT4" | "FLOAT8" => {
                    if let Ok(Some(v)) = row.try_get::<Option<f64>, _>(name) {
                        DataValue::Float(v)
                    } else if let Ok(Some(v)) = row.try_get::<Option<f32>, _>(name) {
                        DataValue::Float(v as f64)
                    } else {
                        DataValue::Null
                    }
                }
                "NUMERIC" => {
                    // NUMERIC 经 BigDecimal 解码后投影为浮点
                    match row.try_get::<Option<bigdecimal::BigDecimal>, _>(name) {
                        Ok(Some(v)) => v.to_f64().map(DataValue::Float).unwrap_or(DataValue::Null),
                        _ => DataValue::Null,
                    }
                }
                "MONEY" => match row.try_get::<Option<sqlx::postgres::types::PgMoney>, _>(name) {
                    Ok(Some(v)) => v
                        .to_bigdecimal(2)
                        .to_f64()
                        .map(DataValue::Float)
                        .unwrap_or(DataValue::Null),
                    _ => DataValue::Null,
                },
                "BOOL" => match row.try_get::<Option<bool>, _>(name) {
                    Ok(Some(v)) => DataValue::Bool(v),
                    _ => DataValue::Null,
                },
                "UUID" => match row.try_get::<Option<uuid::Uuid>, _>(name) {
                    Ok(Some(v)) => DataValue::Uuid(v),
                    _ => DataValue::Null,
                },
                "JSON" | "JSONB" => match row.try_get::<Option<serde_json::Value>, _>(name) {
                    Ok(Some(v)) => DataValue::from_json_value(v),
                    _ => DataValue::Null,
                },
                "TIMESTAMP" => match row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
                    Ok(Some(v)) => DataValue::DateTime(chrono::DateTime::from_naive_utc_and_offset(
                        v,
                        chrono::Utc,
                    )),
                    _ => DataValue::Null,
                },
                "TIMESTAMPTZ" => {
                    match row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
                        Ok(Some(v)) => DataValue::DateTime(v),
                        _ => DataValue::Null,
                    }
                }
                "DATE" => match row.try_get::<Option<chrono::NaiveDate>, _>(name) {
                    Ok(Some(v)) => DataValue::String(v.format("%Y-%m-%d").to_string()),
                    _ => DataValue::Null,
                },
                "BYTEA" => match row.try_get::<Option<Vec<u8>>, _>(name) {
                    Ok(Some(v)) => DataValue::Bytes(v),
                    _ => DataValue::Null,
                },
                _ => {
                    // 未知类型尽量以字符串取出（text/varchar/enum/inet 等）
                    match row.try_get::<Option<String>, _>(name) {
                        Ok(Some(v)) => DataValue::String(v),
                        _ => DataValue::Null,
                    }
                }
            };
            map.insert(name.to_string(), value);
        }
        map
    }

    /// 主键值按列类型做尽力而为的转换（URL 路径参数总是字符串）
    fn coerce_pk(schema: &TableSchema, id: &DataValue) -> DataValue {
        let pk = schema.primary_key_column();
        let Some(column) = schema.column(pk) else {
            return id.clone();
        };
        if let DataValue::String(s) = id {
            match column.field_type {
                FieldType::Uuid => {
                    if let Ok(uuid) = uuid::Uuid::parse_str(s) {
                        return DataValue::Uuid(uuid);
                    }
                }
                FieldType::Number => {
                    if let Ok(i) = s.parse::<i64>() {
                        return DataValue::Int(i);
                    }
                }
                _ => {}
            }
        }
        id.clone()
    }

    /// 分页查询的共用路径：COUNT 与数据查询使用同一 WHERE 子句
    async fn fetch_page(
        &self,
        table: &str,
        groups: &[FilterGroup],
        order_by: Option<&str>,
        order_direction: SortDirection,
        page: u64,
        limit: u64,
    ) -> PanelDbResult<PaginatedResult> {
        let page = page.max(1);
        let limit = limit.max(1);
        let offset = (page - 1) * limit;

        let count_query = query_builder::build_count(DatabaseType::PostgreSQL, table, groups)?;
        let count_rows = self.fetch_all(&count_query).await?;
        let total = count_rows
            .first()
            .and_then(|row| row.try_get::<i64, _>("total").ok())
            .unwrap_or(0) as u64;

        let select_query = query_builder::build_select_page(
            DatabaseType::PostgreSQL,
            table,
            groups,
            order_by,
            order_direction,
            None,
            limit,
            offset,
        )?;
        let rows = self.fetch_all(&select_query).await?;
        let items = rows.iter().map(Self::row_to_data_map).collect();

        Ok(PaginatedResult {
            items,
            pagination: Pagination::new(page, limit, total),
        })
    }
}

#[async_trait]
impl DatabaseAdapter for PostgresAdapter {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::PostgreSQL
    }

    async fn test_connection(&self) -> ConnectionTestResult {
        if self.ensure_open().is_err() {
            return ConnectionTestResult::failed("适配器已断开");
        }
        match sqlx::query("SELECT version()").fetch_one(&self.pool).await {
            Ok(row) => ConnectionTestResult::ok(row.try_get::<String, _>(0).ok()),
            Err(e) => {
                warn!("PostgreSQL 连接测试失败: {}", e);
                ConnectionTestResult::failed(e.to_string())
            }
        }
    }

    async fn list_tables(&self) -> PanelDbResult<Vec<TableInfo>> {
        self.ensure_open()?;
        let rows = sqlx::query(
            "SELECT table_name, table_type FROM information_schema.tables \
             WHERE table_schema = 'public' ORDER BY table_name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ErrorBuilder::query_error(format!("PostgreSQL 列表查询失败: {}", e)))?;

        Ok(rows
            .iter()
            .map(|row| {
                let name: String = row.try_get("table_name").unwrap_or_default();
                let table_type: String = row.try_get("table_type").unwrap_or_default();
                TableInfo {
                    name,
                    kind: if table_type == "VIEW" {
                        TableKind::View
                    } else {
                        TableKind::Table
                    },
                }
            })
            .collect())
    }

    async fn get_table_schema(&self, table: &str) -> PanelDbResult<TableSchema> {
        self.ensure_open()?;
        ident::validate_identifier(table)?;

        let rows = sqlx::query(
            "SELECT column_name, data_type, is_nullable, column_default, \
             character_maximum_length, numeric_precision, numeric_scale \
             FROM information_schema.columns \
             WHERE table_schema = 'public' AND table_name = $1 \
             ORDER BY ordinal_position",
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ErrorBuilder::query_error(format!("PostgreSQL 模式查询失败: {}", e)))?;

        if rows.is_empty() {
            return Err(crate::panel_error!(table_not_found, table));
        }

        let pk_rows = sqlx::query(
            "SELECT kcu.column_name FROM information_schema.table_constraints tc \
             JOIN information_schema.key_column_usage kcu \
             ON tc.constraint_name = kcu.constraint_name AND tc.table_schema = kcu.table_schema \
             WHERE tc.table_schema = 'public' AND tc.table_name = $1 \
             AND tc.constraint_type = 'PRIMARY KEY' \
             ORDER BY kcu.ordinal_position",
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ErrorBuilder::query_error(format!("PostgreSQL 主键查询失败: {}", e)))?;

        let primary_key: Vec<String> = pk_rows
            .iter()
            .filter_map(|row| row.try_get::<String, _>("column_name").ok())
            .collect();

        let columns = rows
            .iter()
            .map(|row| {
                let name: String = row.try_get("column_name").unwrap_or_default();
                let native_type: String = row.try_get("data_type").unwrap_or_default();
                let is_nullable: String = row.try_get("is_nullable").unwrap_or_default();
                let has_default = row
                    .try_get::<Option<String>, _>("column_default")
                    .ok()
                    .flatten()
                    .is_some();
                let is_primary_key = primary_key.contains(&name);
                ColumnSchema {
                    field_type: map_postgres_type(&native_type),
                    max_length: row
                        .try_get::<Option<i32>, _>("character_maximum_length")
                        .ok()
                        .flatten()
                        .map(|v| v as u32),
                    precision: row
                        .try_get::<Option<i32>, _>("numeric_precision")
                        .ok()
                        .flatten()
                        .map(|v| v as u32),
                    scale: row
                        .try_get::<Option<i32>, _>("numeric_scale")
                        .ok()
                        .flatten()
                        .map(|v| v as u32),
                    name,
                    native_type,
                    nullable: is_nullable == "YES",
                    has_default,
                    is_primary_key,
                }
            })
            .collect();

        Ok(TableSchema {
            name: table.to_string(),
            columns,
            primary_key,
        })
    }

    async fn get(&self, table: &str, id: &DataValue) -> PanelDbResult<Option<Row>> {
        self.ensure_open()?;
        let schema = self.get_table_schema(table).await?;
        let pk = schema.primary_key_column();
        let mut compiled = query_builder::build_get(DatabaseType::PostgreSQL, table, pk)?;
        compiled.params.push(Self::coerce_pk(&schema, id));
        let rows = self.fetch_all(&compiled).await?;
        Ok(rows.first().map(Self::row_to_data_map))
    }

    async fn list(&self, table: &str, options: &ListOptions) -> PanelDbResult<PaginatedResult> {
        self.ensure_open()?;
        let groups: Vec<FilterGroup> = options.filter.clone().into_iter().collect();
        self.fetch_page(
            table,
            &groups,
            options.order_by.as_deref(),
            options.order_direction,
            options.page,
            options.limit,
        )
        .await
    }

    async fn search(&self, table: &str, options: &SearchOptions) -> PanelDbResult<PaginatedResult> {
        self.ensure_open()?;
        let schema = self.get_table_schema(table).await?;
        let groups = query_builder::build_search_groups(&schema, options);
        self.fetch_page(
            table,
            &groups,
            options.order_by.as_deref(),
            options.order_direction.unwrap_or(SortDirection::Asc),
            options.page,
            options.limit,
        )
        .await
    }

    async fn insert(&self, table: &str, data: &HashMap<String, DataValue>) -> PanelDbResult<Row> {
        self.ensure_open()?;
        let compiled = query_builder::build_insert(DatabaseType::PostgreSQL, table, data)?;
        let rows = self.fetch_all(&compiled).await?;
        rows.first()
            .map(Self::row_to_data_map)
            .ok_or_else(|| ErrorBuilder::query_error("插入未返回行"))
    }

    async fn update(
        &self,
        table: &str,
        id: &DataValue,
        data: &HashMap<String, DataValue>,
    ) -> PanelDbResult<Option<Row>> {
        self.ensure_open()?;
        let schema = self.get_table_schema(table).await?;
        let pk = schema.primary_key_column();

        // 主键列不可更新，静默剔除
        let mut data = data.clone();
        data.remove(pk);
        data.remove("id");
        data.remove("_id");
        if data.is_empty() {
            return Err(crate::panel_error!(validation, "更新数据不能为空"));
        }

        let mut compiled = query_builder::build_update(DatabaseType::PostgreSQL, table, pk, &data)?;
        compiled.sql.push_str(" RETURNING *");
        compiled.params.push(Self::coerce_pk(&schema, id));
        let rows = self.fetch_all(&compiled).await?;
        Ok(rows.first().map(Self::row_to_data_map))
    }

    async fn delete(&self, table: &str, id: &DataValue) -> PanelDbResult<bool> {
        self.ensure_open()?;
        let schema = self.get_table_schema(table).await?;
        let pk = schema.primary_key_column();
        let compiled = query_builder::build_delete(DatabaseType::PostgreSQL, table, pk)?;

        debug!("PostgreSQL 执行: {}", compiled.sql);
        let result = Self::bind_value(sqlx::query(&compiled.sql), &Self::coerce_pk(&schema, id))
            .execute(&self.pool)
            .await
            .map_err(|e| ErrorBuilder::query_error(format!("PostgreSQL 删除失败: {}", e)))?;
        Ok(result.rows_affected() > 0)
    }

    async fn aggregate(
        &self,
        table: &str,
        options: &AggregateOptions,
    ) -> PanelDbResult<Vec<AggregateRow>> {
        self.ensure_open()?;
        let compiled = query_builder::build_aggregate(DatabaseType::PostgreSQL, table, options)?;
        let rows = self.fetch_all(&compiled).await?;
        Ok(rows
            .iter()
            .map(|row| {
                let mut map = Self::row_to_data_map(row);
                AggregateRow {
                    group: map.remove("bucket"),
                    value: map.remove("value").unwrap_or(DataValue::Null),
                }
            })
            .collect())
    }

    async fn query(&self, sql: &str, params: &[DataValue]) -> PanelDbResult<QueryResult> {
        self.ensure_open()?;
        let compiled = CompiledQuery {
            sql: sql.to_string(),
            params: params.to_vec(),
        };
        let rows = self.fetch_all(&compiled).await?;
        Ok(rows.iter().map(Self::row_to_data_map).collect())
    }

    async fn disconnect(&self) -> PanelDbResult<()> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.pool.close().await;
            debug!("PostgreSQL 连接池已关闭");
        }
        Ok(())
    }
}
