//! MySQL 数据库适配器
//!
//! 基于 sqlx 连接池实现，占位符为匿名 ?，插入行通过
//! last_insert_id 回读。information_schema 列头在不同版本间
//! 大小写不一致，查询里全部显式小写别名

use super::query_builder::{self, CompiledQuery};
use super::DatabaseAdapter;
use crate::error::{ErrorBuilder, PanelDbResult};
use crate::ident;
use crate::schema::{ColumnSchema, TableSchema};
use crate::typemap::{map_mysql_type, FieldType};
use crate::types::*;
use async_trait::async_trait;
use bigdecimal::ToPrimitive;
use rat_logger::{debug, warn};
use sqlx::mysql::{MySqlArguments, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, MySql, Row as SqlxRow, TypeInfo};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// MySQL 适配器
pub struct MySqlAdapter {
    pool: MySqlPool,
    closed: AtomicBool,
}

impl MySqlAdapter {
    /// 建立连接池
    pub async fn connect(connection_string: &str, config: &AdapterConfig) -> PanelDbResult<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .idle_timeout(Duration::from_secs(config.idle_timeout))
            .connect(connection_string)
            .await
            .map_err(|e| ErrorBuilder::connection_error(format!("MySQL 连接失败: {}", e)))?;
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
        query: Query<'q, MySql, MySqlArguments>,
        value: &'q DataValue,
    ) -> Query<'q, MySql, MySqlArguments> {
        match value {
            DataValue::Null => query.bind(Option::<String>::None),
            DataValue::Bool(b) => query.bind(*b),
            DataValue::Int(i) => query.bind(*i),
            DataValue::Float(f) => query.bind(*f),
            DataValue::String(s) => query.bind(s.as_str()),
            DataValue::Bytes(bytes) => query.bind(bytes.as_slice()),
            // MySQL 驱动按字面时间戳处理
            DataValue::DateTime(dt) => query.bind(dt.naive_utc()),
            DataValue::Uuid(uuid) => query.bind(uuid.to_string()),
            DataValue::Json(json) => query.bind(json.clone()),
            DataValue::Array(_) | DataValue::Object(_) => query.bind(value.to_json_value()),
        }
    }

    async fn fetch_all(&self, compiled: &CompiledQuery) -> PanelDbResult<Vec<MySqlRow>> {
        debug!("MySQL 执行: {}", compiled.sql);
        let mut query = sqlx::query(&compiled.sql);
        for param in &compiled.params {
            query = Self::bind_value(query, param);
        }
        query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ErrorBuilder::query_error(format!("MySQL 查询失败: {}", e)))
    }

    async fn execute(&self, compiled: &CompiledQuery) -> PanelDbResult<sqlx::mysql::MySqlQueryResult> {
        debug!("MySQL 执行: {}", compiled.sql);
        let mut query = sqlx::query(&compiled.sql);
        for param in &compiled.params {
            query = Self::bind_value(query, param);
        }
        query
            .execute(&self.pool)
            .await
            .map_err(|e| ErrorBuilder::query_error(format!("MySQL 执行失败: {}", e)))
    }

    /// 将行转换为通用数据映射
    fn row_to_data_map(row: &MySqlRow) -> Row {
        let mut map = HashMap::new();
        for column in row.columns() {
            let name = column.name();
            let value = match column.type_info().name() {
                "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "TINYINT UNSIGNED"
                | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
                | "BIGINT UNSIGNED" => {
                    if let Ok(Some(v)) = row.try_get::<Option<i64>, _>(name) {
                        DataValue::Int(v)
                    } else if let Ok(Some(v)) = row.try_get::<Option<u64>, _>(name) {
                        DataValue::Int(v as i64)
                    } else {
                        DataValue::Null
                    }
                }
                "FLOAT" | "DOUBLE" => {
                    if let Ok(Some(v)) = row.try_get::<Option<f64>, _>(name) {
                        DataValue::Float(v)
                    } else if let Ok(Some(v)) = row.try_get::<Option<f32>, _>(name) {
                        DataValue::Float(v as f64)
                    } else {
                        DataValue::Null
                    }
                }
                "DECIMAL" => match row.try_get::<Option<bigdecimal::BigDecimal>, _>(name) {
                    Ok(Some(v)) => v.to_f64().map(DataValue::Float).unwrap_or(DataValue::Null),
                    _ => DataValue::Null,
                },
                "BOOLEAN" | "BIT" => {
                    if let Ok(Some(v)) = row.try_get::<Option<bool>, _>(name) {
                        DataValue::Bool(v)
                    } else if let Ok(Some(v)) = row.try_get::<Option<u64>, _>(name) {
                        DataValue::Bool(v != 0)
                    } else {
                        DataValue::Null
                    }
                }
                "DATETIME" | "TIMESTAMP" => {
                    match row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
                        Ok(Some(v)) => DataValue::DateTime(
                            chrono::DateTime::from_naive_utc_and_offset(v, chrono::Utc),
                        ),
                        _ => DataValue::Null,
                    }
                }
                "DATE" => match row.try_get::<Option<chrono::NaiveDate>, _>(name) {
                    Ok(Some(v)) => DataValue::String(v.format("%Y-%m-%d").to_string()),
                    _ => DataValue::Null,
                },
                "JSON" => match row.try_get::<Option<serde_json::Value>, _>(name) {
                    Ok(Some(v)) => DataValue::from_json_value(v),
                    _ => DataValue::Null,
                },
                "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BINARY" | "VARBINARY" => {
                    match row.try_get::<Option<Vec<u8>>, _>(name) {
                        Ok(Some(v)) => DataValue::Bytes(v),
                        _ => DataValue::Null,
                    }
                }
                _ => match row.try_get::<Option<String>, _>(name) {
                    Ok(Some(v)) => DataValue::String(v),
                    _ => DataValue::Null,
                },
            };
            map.insert(name.to_string(), value);
        }
        map
    }

    /// 推导插入后回读用的主键值
    ///
    /// 自增列优先取 last_insert_id，否则取载荷里调用方提供的主键；
    /// 两者都没有时无法定位插入行
    fn insert_read_back_id(
        pk: &str,
        data: &HashMap<String, DataValue>,
        last_insert_id: u64,
    ) -> Option<DataValue> {
        if last_insert_id > 0 {
            Some(DataValue::Int(last_insert_id as i64))
        } else {
            data.get(pk).cloned()
        }
    }

    fn coerce_pk(schema: &TableSchema, id: &DataValue) -> DataValue {
        let pk = schema.primary_key_column();
        if let (Some(column), DataValue::String(s)) = (schema.column(pk), id) {
            if column.field_type == FieldType::Number {
                if let Ok(i) = s.parse::<i64>() {
                    return DataValue::Int(i);
                }
            }
        }
        id.clone()
    }

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

        let count_query = query_builder::build_count(DatabaseType::MySQL, table, groups)?;
        let count_rows = self.fetch_all(&count_query).await?;
        let total = count_rows
            .first()
            .and_then(|row| row.try_get::<i64, _>("total").ok())
            .unwrap_or(0) as u64;

        let select_query = query_builder::build_select_page(
            DatabaseType::MySQL,
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
impl DatabaseAdapter for MySqlAdapter {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::MySQL
    }

    async fn test_connection(&self) -> ConnectionTestResult {
        if self.ensure_open().is_err() {
            return ConnectionTestResult::failed("适配器已断开");
        }
        match sqlx::query("SELECT VERSION()").fetch_one(&self.pool).await {
            Ok(row) => ConnectionTestResult::ok(row.try_get::<String, _>(0).ok()),
            Err(e) => {
                warn!("MySQL 连接测试失败: {}", e);
                ConnectionTestResult::failed(e.to_string())
            }
        }
    }

    async fn list_tables(&self) -> PanelDbResult<Vec<TableInfo>> {
        self.ensure_open()?;
        let rows = sqlx::query(
            "SELECT table_name AS table_name, table_type AS table_type \
             FROM information_schema.tables \
             WHERE table_schema = DATABASE() ORDER BY table_name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ErrorBuilder::query_error(format!("MySQL 列表查询失败: {}", e)))?;

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
            "SELECT column_name AS column_name, data_type AS data_type, \
             is_nullable AS is_nullable, column_default AS column_default, \
             character_maximum_length AS character_maximum_length, \
             numeric_precision AS numeric_precision, numeric_scale AS numeric_scale, \
             column_key AS column_key, extra AS extra \
             FROM information_schema.columns \
             WHERE table_schema = DATABASE() AND table_name = ? \
             ORDER BY ordinal_position",
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ErrorBuilder::query_error(format!("MySQL 模式查询失败: {}", e)))?;

        if rows.is_empty() {
            return Err(crate::panel_error!(table_not_found, table));
        }

        let mut primary_key = Vec::new();
        let columns = rows
            .iter()
            .map(|row| {
                let name: String = row.try_get("column_name").unwrap_or_default();
                let native_type: String = row.try_get("data_type").unwrap_or_default();
                let is_nullable: String = row.try_get("is_nullable").unwrap_or_default();
                let column_key: String = row.try_get("column_key").unwrap_or_default();
                let extra: String = row.try_get("extra").unwrap_or_default();
                let is_primary_key = column_key == "PRI";
                if is_primary_key {
                    primary_key.push(name.clone());
                }
                // 自增列视为有默认值
                let has_default = row
                    .try_get::<Option<String>, _>("column_default")
                    .ok()
                    .flatten()
                    .is_some()
                    || extra.to_lowercase().contains("auto_increment");
                ColumnSchema {
                    field_type: map_mysql_type(&native_type),
                    max_length: row
                        .try_get::<Option<u64>, _>("character_maximum_length")
                        .ok()
                        .flatten()
                        .map(|v| v as u32),
                    precision: row
                        .try_get::<Option<u64>, _>("numeric_precision")
                        .ok()
                        .flatten()
                        .map(|v| v as u32),
                    scale: row
                        .try_get::<Option<u64>, _>("numeric_scale")
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
        let mut compiled = query_builder::build_get(DatabaseType::MySQL, table, pk)?;
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
        let schema = self.get_table_schema(table).await?;
        let compiled = query_builder::build_insert(DatabaseType::MySQL, table, data)?;
        let result = self.execute(&compiled).await?;

        // MySQL 没有 RETURNING，通过 last_insert_id 或载荷里的主键回读；
        // 回显输入会掩盖服务端默认值，定位不到插入行时宁可报错
        let pk = schema.primary_key_column();
        let read_back_id = Self::insert_read_back_id(pk, data, result.last_insert_id())
            .ok_or_else(|| {
                ErrorBuilder::query_error("插入成功但主键不可回读，无法返回插入行")
            })?;
        self.get(table, &read_back_id)
            .await?
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

        let mut data = data.clone();
        data.remove(pk);
        data.remove("id");
        data.remove("_id");
        if data.is_empty() {
            return Err(crate::panel_error!(validation, "更新数据不能为空"));
        }

        let mut compiled = query_builder::build_update(DatabaseType::MySQL, table, pk, &data)?;
        compiled.params.push(Self::coerce_pk(&schema, id));
        self.execute(&compiled).await?;

        // rows_affected 在值未变化时为 0，通过回读判断记录是否存在
        self.get(table, id).await
    }

    async fn delete(&self, table: &str, id: &DataValue) -> PanelDbResult<bool> {
        self.ensure_open()?;
        let schema = self.get_table_schema(table).await?;
        let pk = schema.primary_key_column();
        let mut compiled = query_builder::build_delete(DatabaseType::MySQL, table, pk)?;
        compiled.params.push(Self::coerce_pk(&schema, id));
        let result = self.execute(&compiled).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn aggregate(
        &self,
        table: &str,
        options: &AggregateOptions,
    ) -> PanelDbResult<Vec<AggregateRow>> {
        self.ensure_open()?;
        let compiled = query_builder::build_aggregate(DatabaseType::MySQL, table, options)?;
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
            debug!("MySQL 连接池已关闭");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_read_back_prefers_auto_increment() {
        let data = HashMap::from([("name".to_string(), DataValue::String("a".into()))]);
        assert_eq!(
            MySqlAdapter::insert_read_back_id("id", &data, 42),
            Some(DataValue::Int(42))
        );
    }

    #[test]
    fn test_insert_read_back_uses_payload_pk() {
        let data = HashMap::from([
            ("id".to_string(), DataValue::String("user-7".into())),
            ("name".to_string(), DataValue::String("a".into())),
        ]);
        assert_eq!(
            MySqlAdapter::insert_read_back_id("id", &data, 0),
            Some(DataValue::String("user-7".into()))
        );
    }

    #[test]
    fn test_insert_read_back_missing_key_is_none() {
        // 既无自增 id 也无载荷主键时无法定位插入行
        let data = HashMap::from([("name".to_string(), DataValue::String("a".into()))]);
        assert_eq!(MySqlAdapter::insert_read_back_id("id", &data, 0), None);
    }
}
