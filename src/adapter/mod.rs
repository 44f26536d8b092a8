//! 数据库适配器模块
//!
//! 定义统一的 DatabaseAdapter 异步契约并按数据库类型创建适配器。
//! 四种数据库（PostgreSQL、MySQL、SQL Server、MongoDB）在同一
//! 契约后面提供行为一致的记录读写、模式内省、搜索与聚合

pub mod mongodb;
pub mod mysql;
pub mod postgres;
pub mod query_builder;
pub mod sqlserver;

use crate::error::PanelDbResult;
use crate::schema::TableSchema;
use crate::types::*;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

pub use query_builder::CompiledQuery;

/// 数据库适配器统一契约
///
/// 所有实现必须满足同一批不变量：标识符先校验后使用、值只走
/// 绑定参数、分页总数与数据共用同一过滤条件、断开后的适配器
/// 拒绝新操作
#[async_trait]
pub trait DatabaseAdapter: Send + Sync {
    /// 适配器对应的数据库类型
    fn database_type(&self) -> DatabaseType;

    /// 测试连接并获取服务器版本
    ///
    /// 该方法从不返回 Err，连接失败同样以结果对象表达
    async fn test_connection(&self) -> ConnectionTestResult;

    /// 列出可访问的表和视图
    async fn list_tables(&self) -> PanelDbResult<Vec<TableInfo>>;

    /// 实时内省表结构（每次调用都重新读取，不做缓存）
    async fn get_table_schema(&self, table: &str) -> PanelDbResult<TableSchema>;

    /// 按主键读取单条记录
    async fn get(&self, table: &str, id: &DataValue) -> PanelDbResult<Option<Row>>;

    /// 分页列出记录
    async fn list(&self, table: &str, options: &ListOptions) -> PanelDbResult<PaginatedResult>;

    /// 搜索记录（文本列全文搜索 + 按列过滤）
    async fn search(&self, table: &str, options: &SearchOptions) -> PanelDbResult<PaginatedResult>;

    /// 插入记录并返回数据库视角的完整插入行
    async fn insert(&self, table: &str, data: &HashMap<String, DataValue>) -> PanelDbResult<Row>;

    /// 按主键更新记录，返回更新后的行；无匹配记录时返回 None
    async fn update(
        &self,
        table: &str,
        id: &DataValue,
        data: &HashMap<String, DataValue>,
    ) -> PanelDbResult<Option<Row>>;

    /// 按主键删除记录，返回是否确实删除了一条
    async fn delete(&self, table: &str, id: &DataValue) -> PanelDbResult<bool>;

    /// 聚合查询（计数/求和等，可分组，可按日期截断）
    async fn aggregate(
        &self,
        table: &str,
        options: &AggregateOptions,
    ) -> PanelDbResult<Vec<AggregateRow>>;

    /// 执行原始参数化查询（MongoDB 不支持，返回错误）
    async fn query(&self, sql: &str, params: &[DataValue]) -> PanelDbResult<QueryResult>;

    /// 按方言转义标识符
    fn escape_identifier(&self, name: &str) -> PanelDbResult<String> {
        crate::ident::escape_identifier(self.database_type(), name)
    }

    /// 方言的参数占位符（index 从 1 开始）
    fn parameter_placeholder(&self, index: usize) -> String {
        crate::ident::placeholder(self.database_type(), index)
    }

    /// 方言的分页子句（返回子句文本与参数）
    fn pagination_clause(
        &self,
        next_index: usize,
        limit: u64,
        offset: u64,
    ) -> (String, Vec<DataValue>) {
        query_builder::compile_pagination(self.database_type(), next_index, limit, offset)
    }

    /// 释放连接池资源，幂等；断开后的适配器拒绝新操作
    async fn disconnect(&self) -> PanelDbResult<()>;
}

/// 按数据库类型创建适配器并建立连接池
pub async fn create_adapter(
    db_type: DatabaseType,
    connection_string: &str,
    config: &AdapterConfig,
) -> PanelDbResult<Arc<dyn DatabaseAdapter>> {
    rat_logger::info!("创建 {} 适配器", db_type.as_str());
    let adapter: Arc<dyn DatabaseAdapter> = match db_type {
        DatabaseType::PostgreSQL => {
            Arc::new(postgres::PostgresAdapter::connect(connection_string, config).await?)
        }
        DatabaseType::MySQL => {
            Arc::new(mysql::MySqlAdapter::connect(connection_string, config).await?)
        }
        DatabaseType::SqlServer => {
            Arc::new(sqlserver::SqlServerAdapter::connect(connection_string, config).await?)
        }
        DatabaseType::MongoDB => {
            Arc::new(mongodb::MongoAdapter::connect(connection_string, config).await?)
        }
    };
    Ok(adapter)
}
