//! MongoDB 数据库适配器
//!
//! 没有固定模式目录，表结构通过采样文档推断；过滤条件编译为
//! 查询文档而不是 SQL，聚合走 aggregation pipeline

use super::query_builder::{self, normalize_temporal};
use super::DatabaseAdapter;
use crate::error::{ErrorBuilder, PanelDbResult};
use crate::ident;
use crate::schema::{ColumnSchema, TableSchema};
use crate::typemap::{bson_type_name, infer_bson_field_type, merge_field_types};
use crate::types::*;
use async_trait::async_trait;
use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use mongodb::options::{ClientOptions, FindOptions};
use mongodb::{Client, Collection, Database};
use rat_logger::{debug, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// 模式推断的采样文档数上限
const SCHEMA_SAMPLE_SIZE: i64 = 100;

/// MongoDB 适配器
pub struct MongoAdapter {
    database: Database,
    closed: AtomicBool,
}

impl MongoAdapter {
    /// 建立客户端连接
    pub async fn connect(connection_string: &str, config: &AdapterConfig) -> PanelDbResult<Self> {
        let mut options = ClientOptions::parse(connection_string)
            .await
            .map_err(|e| ErrorBuilder::connection_error(format!("MongoDB 连接失败: {}", e)))?;
        options.max_pool_size = Some(config.pool_size);
        options.connect_timeout = Some(Duration::from_secs(config.connection_timeout));
        options.max_idle_time = Some(Duration::from_secs(config.idle_timeout));

        let client = Client::with_options(options)
            .map_err(|e| ErrorBuilder::connection_error(format!("MongoDB 连接失败: {}", e)))?;
        let database = client.default_database().ok_or_else(|| {
            ErrorBuilder::config_error("MongoDB 连接字符串未指定数据库名")
        })?;

        Ok(Self {
            database,
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

    fn collection(&self, table: &str) -> Collection<Document> {
        self.database.collection::<Document>(table)
    }

    /// DataValue 转 BSON
    fn data_value_to_bson(value: &DataValue) -> Bson {
        match value {
            DataValue::Null => Bson::Null,
            DataValue::Bool(b) => Bson::Boolean(*b),
            DataValue::Int(i) => Bson::Int64(*i),
            DataValue::Float(f) => Bson::Double(*f),
            DataValue::String(s) => Bson::String(s.clone()),
            DataValue::Bytes(bytes) => Bson::Binary(mongodb::bson::Binary {
                subtype: mongodb::bson::spec::BinarySubtype::Generic,
                bytes: bytes.clone(),
            }),
            DataValue::DateTime(dt) => Bson::DateTime(mongodb::bson::DateTime::from_chrono(*dt)),
            DataValue::Uuid(uuid) => Bson::String(uuid.to_string()),
            DataValue::Json(json) => {
                mongodb::bson::to_bson(json).unwrap_or_else(|_| Bson::String(json.to_string()))
            }
            DataValue::Array(arr) => {
                Bson::Array(arr.iter().map(Self::data_value_to_bson).collect())
            }
            DataValue::Object(obj) => {
                let mut doc = Document::new();
                for (key, value) in obj {
                    doc.insert(key.clone(), Self::data_value_to_bson(value));
                }
                Bson::Document(doc)
            }
        }
    }

    /// BSON 转 DataValue（ObjectId 以十六进制字符串对外）
    fn bson_to_data_value(bson: &Bson) -> DataValue {
        match bson {
            Bson::Null | Bson::Undefined => DataValue::Null,
            Bson::Boolean(b) => DataValue::Bool(*b),
            Bson::Int32(i) => DataValue::Int(*i as i64),
            Bson::Int64(i) => DataValue::Int(*i),
            Bson::Double(f) => DataValue::Float(*f),
            Bson::String(s) => DataValue::String(s.clone()),
            Bson::ObjectId(oid) => DataValue::String(oid.to_hex()),
            Bson::DateTime(dt) => DataValue::DateTime(dt.to_chrono()),
            Bson::Decimal128(d) => {
                let text = d.to_string();
                text.parse::<f64>()
                    .map(DataValue::Float)
                    .unwrap_or(DataValue::String(text))
            }
            Bson::Binary(binary) => DataValue::Bytes(binary.bytes.clone()),
            Bson::Array(arr) => {
                DataValue::Array(arr.iter().map(Self::bson_to_data_value).collect())
            }
            Bson::Document(doc) => DataValue::Object(
                doc.iter()
                    .map(|(k, v)| (k.clone(), Self::bson_to_data_value(v)))
                    .collect(),
            ),
            other => DataValue::String(other.to_string()),
        }
    }

    fn doc_to_row(doc: &Document) -> Row {
        doc.iter()
            .map(|(k, v)| (k.clone(), Self::bson_to_data_value(v)))
            .collect()
    }

    /// 过滤值转 BSON，ISO 日期时间字符串归一化为 BSON 日期
    fn filter_value_to_bson(value: &DataValue) -> Bson {
        Self::data_value_to_bson(&normalize_temporal(DatabaseType::MongoDB, value.clone()))
    }

    /// 编译单个过滤条件为查询文档，空 In/NotIn 返回 None 跳过
    fn filter_to_document(filter: &Filter) -> PanelDbResult<Option<Document>> {
        ident::validate_identifier(&filter.column)?;
        let column = filter.column.as_str();
        let mut query_doc = Document::new();

        match filter.operator {
            FilterOperator::IsNull => {
                query_doc.insert(column, Bson::Null);
            }
            FilterOperator::IsNotNull => {
                query_doc.insert(column, doc! { "$ne": Bson::Null });
            }
            FilterOperator::In | FilterOperator::NotIn => {
                let Some(DataValue::Array(values)) = &filter.value else {
                    return Err(crate::panel_error!(
                        validation,
                        format!("{:?} 操作符需要非空数组值", filter.operator)
                    ));
                };
                if values.is_empty() {
                    return Ok(None);
                }
                let bson_values: Vec<Bson> =
                    values.iter().map(Self::filter_value_to_bson).collect();
                let op = if filter.operator == FilterOperator::In {
                    "$in"
                } else {
                    "$nin"
                };
                query_doc.insert(column, doc! { op: bson_values });
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
                // 正则元字符全部转义，语义与 SQL LIKE 对齐
                let escaped = regex::escape(&raw);
                let pattern = match filter.operator {
                    FilterOperator::Contains => escaped,
                    FilterOperator::StartsWith => format!("^{}", escaped),
                    _ => format!("{}$", escaped),
                };
                query_doc.insert(column, doc! { "$regex": pattern, "$options": "i" });
            }
            _ => {
                let Some(value) = &filter.value else {
                    return Err(crate::panel_error!(
                        validation,
                        format!("{:?} 操作符需要值", filter.operator)
                    ));
                };
                let bson = Self::filter_value_to_bson(value);
                match filter.operator {
                    FilterOperator::Eq => {
                        query_doc.insert(column, bson);
                    }
                    FilterOperator::Ne => {
                        query_doc.insert(column, doc! { "$ne": bson });
                    }
                    FilterOperator::Gt => {
                        query_doc.insert(column, doc! { "$gt": bson });
                    }
                    FilterOperator::Gte => {
                        query_doc.insert(column, doc! { "$gte": bson });
                    }
                    FilterOperator::Lt => {
                        query_doc.insert(column, doc! { "$lt": bson });
                    }
                    FilterOperator::Lte => {
                        query_doc.insert(column, doc! { "$lte": bson });
                    }
                    _ => unreachable!("前面的分支已覆盖其余操作符"),
                }
            }
        }
        Ok(Some(query_doc))
    }

    /// 编译过滤条件组序列为查询文档
    fn groups_to_document(groups: &[FilterGroup]) -> PanelDbResult<Document> {
        let mut group_docs = Vec::new();
        for group in groups {
            let mut docs = Vec::new();
            for filter in &group.filters {
                if let Some(doc) = Self::filter_to_document(filter)? {
                    docs.push(doc);
                }
            }
            if docs.is_empty() {
                continue;
            }
            if docs.len() == 1 {
                group_docs.push(docs.remove(0));
            } else {
                let op = match group.logic {
                    FilterLogic::And => "$and",
                    FilterLogic::Or => "$or",
                };
                let mut group_doc = Document::new();
                group_doc.insert(op, docs);
                group_docs.push(group_doc);
            }
        }

        Ok(match group_docs.len() {
            0 => Document::new(),
            1 => group_docs.remove(0),
            _ => doc! { "$and": group_docs },
        })
    }

    /// 主键值转查询条件，能解析为 ObjectId 的字符串优先按 ObjectId 匹配
    fn id_filter(id: &DataValue) -> Document {
        match id {
            DataValue::String(s) => match ObjectId::parse_str(s) {
                Ok(oid) => doc! { "_id": oid },
                Err(_) => doc! { "_id": s.clone() },
            },
            other => doc! { "_id": Self::data_value_to_bson(other) },
        }
    }

    async fn collection_exists(&self, table: &str) -> PanelDbResult<bool> {
        let names = self
            .database
            .list_collection_names(None)
            .await
            .map_err(|e| ErrorBuilder::query_error(format!("MongoDB 集合列表查询失败: {}", e)))?;
        Ok(names.iter().any(|n| n == table))
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
        let collection = self.collection(table);
        let query = Self::groups_to_document(groups)?;
        debug!("MongoDB 查询: {:?}", query);

        let total = collection
            .count_documents(query.clone(), None)
            .await
            .map_err(|e| ErrorBuilder::query_error(format!("MongoDB 计数失败: {}", e)))?;

        let mut find_options = FindOptions::default();
        find_options.skip = Some((page - 1) * limit);
        find_options.limit = Some(limit as i64);
        if let Some(order_by) = order_by {
            ident::validate_identifier(order_by)?;
            let direction = match order_direction {
                SortDirection::Asc => 1,
                SortDirection::Desc => -1,
            };
            let mut sort_doc = Document::new();
            sort_doc.insert(order_by, direction);
            find_options.sort = Some(sort_doc);
        }

        let mut cursor = collection
            .find(query, find_options)
            .await
            .map_err(|e| ErrorBuilder::query_error(format!("MongoDB 查询失败: {}", e)))?;

        let mut items = Vec::new();
        while cursor
            .advance()
            .await
            .map_err(|e| ErrorBuilder::query_error(format!("MongoDB 游标遍历失败: {}", e)))?
        {
            let doc = cursor.deserialize_current().map_err(|e| {
                ErrorBuilder::query_error(format!("MongoDB 文档反序列化失败: {}", e))
            })?;
            items.push(Self::doc_to_row(&doc));
        }

        Ok(PaginatedResult {
            items,
            pagination: Pagination::new(page, limit, total),
        })
    }
}

#[async_trait]
impl DatabaseAdapter for MongoAdapter {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::MongoDB
    }

    async fn test_connection(&self) -> ConnectionTestResult {
        if self.ensure_open().is_err() {
            return ConnectionTestResult::failed("适配器已断开");
        }
        match self.database.run_command(doc! { "buildInfo": 1 }, None).await {
            Ok(info) => ConnectionTestResult::ok(info.get_str("version").ok().map(String::from)),
            Err(e) => {
                warn!("MongoDB 连接测试失败: {}", e);
                ConnectionTestResult::failed(e.to_string())
            }
        }
    }

    async fn list_tables(&self) -> PanelDbResult<Vec<TableInfo>> {
        self.ensure_open()?;
        let mut names = self
            .database
            .list_collection_names(None)
            .await
            .map_err(|e| ErrorBuilder::query_error(format!("MongoDB 集合列表查询失败: {}", e)))?;
        names.sort();
        Ok(names
            .into_iter()
            .map(|name| TableInfo {
                name,
                kind: TableKind::Table,
            })
            .collect())
    }

    /// 采样最多 100 个文档推断集合结构
    ///
    /// 推断结果是尽力而为的投影，同一字段类型冲突时退化到
    /// 能容纳所有观察值的类型
    async fn get_table_schema(&self, table: &str) -> PanelDbResult<TableSchema> {
        self.ensure_open()?;
        ident::validate_identifier(table)?;
        if !self.collection_exists(table).await? {
            return Err(crate::panel_error!(table_not_found, table));
        }

        let mut find_options = FindOptions::default();
        find_options.limit = Some(SCHEMA_SAMPLE_SIZE);
        let mut cursor = self
            .collection(table)
            .find(Document::new(), find_options)
            .await
            .map_err(|e| ErrorBuilder::query_error(format!("MongoDB 采样失败: {}", e)))?;

        // 按首次出现顺序累积字段
        let mut order: Vec<String> = Vec::new();
        let mut fields: HashMap<String, ColumnSchema> = HashMap::new();
        let mut sampled = 0u64;

        while cursor
            .advance()
            .await
            .map_err(|e| ErrorBuilder::query_error(format!("MongoDB 游标遍历失败: {}", e)))?
        {
            let doc = cursor.deserialize_current().map_err(|e| {
                ErrorBuilder::query_error(format!("MongoDB 文档反序列化失败: {}", e))
            })?;
            sampled += 1;
            for (key, value) in doc.iter() {
                let Some(observed) = infer_bson_field_type(value) else {
                    continue;
                };
                match fields.get_mut(key) {
                    Some(column) => {
                        column.field_type = merge_field_types(column.field_type, observed);
                    }
                    None => {
                        order.push(key.clone());
                        fields.insert(
                            key.clone(),
                            ColumnSchema {
                                name: key.clone(),
                                native_type: bson_type_name(value).to_string(),
                                field_type: observed,
                                nullable: key != "_id",
                                has_default: key == "_id",
                                is_primary_key: key == "_id",
                                max_length: None,
                                precision: None,
                                scale: None,
                            },
                        );
                    }
                }
            }
        }
        debug!("MongoDB 模式推断: {} 采样 {} 个文档", table, sampled);

        // _id 永远排在最前
        order.sort_by_key(|name| name != "_id");
        let columns = order
            .iter()
            .filter_map(|name| fields.remove(name))
            .collect();

        Ok(TableSchema {
            name: table.to_string(),
            columns,
            primary_key: vec!["_id".to_string()],
        })
    }

    async fn get(&self, table: &str, id: &DataValue) -> PanelDbResult<Option<Row>> {
        self.ensure_open()?;
        ident::validate_identifier(table)?;
        let doc = self
            .collection(table)
            .find_one(Self::id_filter(id), None)
            .await
            .map_err(|e| ErrorBuilder::query_error(format!("MongoDB 查询失败: {}", e)))?;
        Ok(doc.as_ref().map(Self::doc_to_row))
    }

    async fn list(&self, table: &str, options: &ListOptions) -> PanelDbResult<PaginatedResult> {
        self.ensure_open()?;
        ident::validate_identifier(table)?;
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
        ident::validate_identifier(table)?;
        if data.is_empty() {
            return Err(crate::panel_error!(validation, "插入数据不能为空"));
        }

        let mut doc = Document::new();
        for (key, value) in data {
            ident::validate_identifier(key)?;
            doc.insert(key.clone(), Self::data_value_to_bson(value));
        }

        let collection = self.collection(table);
        let result = collection
            .insert_one(doc, None)
            .await
            .map_err(|e| ErrorBuilder::query_error(format!("MongoDB 插入失败: {}", e)))?;

        let inserted = collection
            .find_one(doc! { "_id": result.inserted_id.clone() }, None)
            .await
            .map_err(|e| ErrorBuilder::query_error(format!("MongoDB 回读失败: {}", e)))?;
        inserted
            .as_ref()
            .map(Self::doc_to_row)
            .ok_or_else(|| ErrorBuilder::query_error("插入未返回文档"))
    }

    async fn update(
        &self,
        table: &str,
        id: &DataValue,
        data: &HashMap<String, DataValue>,
    ) -> PanelDbResult<Option<Row>> {
        self.ensure_open()?;
        ident::validate_identifier(table)?;

        let mut set_doc = Document::new();
        for (key, value) in data {
            // 主键不可更新
            if key == "_id" || key == "id" {
                continue;
            }
            ident::validate_identifier(key)?;
            set_doc.insert(key.clone(), Self::data_value_to_bson(value));
        }
        if set_doc.is_empty() {
            return Err(crate::panel_error!(validation, "更新数据不能为空"));
        }

        let collection = self.collection(table);
        let filter = Self::id_filter(id);
        let result = collection
            .update_one(filter.clone(), doc! { "$set": set_doc }, None)
            .await
            .map_err(|e| ErrorBuilder::query_error(format!("MongoDB 更新失败: {}", e)))?;
        if result.matched_count == 0 {
            return Ok(None);
        }

        let updated = collection
            .find_one(filter, None)
            .await
            .map_err(|e| ErrorBuilder::query_error(format!("MongoDB 回读失败: {}", e)))?;
        Ok(updated.as_ref().map(Self::doc_to_row))
    }

    async fn delete(&self, table: &str, id: &DataValue) -> PanelDbResult<bool> {
        self.ensure_open()?;
        ident::validate_identifier(table)?;
        let result = self
            .collection(table)
            .delete_one(Self::id_filter(id), None)
            .await
            .map_err(|e| ErrorBuilder::query_error(format!("MongoDB 删除失败: {}", e)))?;
        Ok(result.deleted_count > 0)
    }

    async fn aggregate(
        &self,
        table: &str,
        options: &AggregateOptions,
    ) -> PanelDbResult<Vec<AggregateRow>> {
        self.ensure_open()?;
        ident::validate_identifier(table)?;

        let accumulator = match (&options.function, &options.column) {
            (AggregateFunction::Count, _) => doc! { "$sum": 1 },
            (function, Some(column)) => {
                ident::validate_identifier(column)?;
                let field = format!("${}", column);
                match function {
                    AggregateFunction::Sum => doc! { "$sum": field },
                    AggregateFunction::Avg => doc! { "$avg": field },
                    AggregateFunction::Min => doc! { "$min": field },
                    AggregateFunction::Max => doc! { "$max": field },
                    AggregateFunction::Count => unreachable!(),
                }
            }
            (function, None) => {
                return Err(crate::panel_error!(
                    validation,
                    format!("{:?} 聚合需要指定列", function)
                ));
            }
        };

        let mut pipeline = Vec::new();
        let groups: Vec<FilterGroup> = options.filter.clone().into_iter().collect();
        let match_doc = Self::groups_to_document(&groups)?;
        if !match_doc.is_empty() {
            pipeline.push(doc! { "$match": match_doc });
        }

        match &options.group_by {
            Some(group_column) => {
                ident::validate_identifier(group_column)?;
                let id_expr: Bson = match options.date_period {
                    Some(period) => Bson::Document(doc! {
                        "$dateTrunc": {
                            "date": format!("${}", group_column),
                            "unit": period.as_str(),
                        }
                    }),
                    None => Bson::String(format!("${}", group_column)),
                };
                pipeline.push(doc! { "$group": { "_id": id_expr, "value": accumulator } });
                if options.date_period.is_some() {
                    pipeline.push(doc! { "$sort": { "_id": 1 } });
                } else {
                    pipeline.push(doc! { "$sort": { "value": -1 } });
                    pipeline.push(doc! { "$limit": options.limit as i64 });
                }
            }
            None => {
                pipeline.push(doc! { "$group": { "_id": Bson::Null, "value": accumulator } });
            }
        }
        debug!("MongoDB 聚合管道: {:?}", pipeline);

        let mut cursor = self
            .collection(table)
            .aggregate(pipeline, None)
            .await
            .map_err(|e| ErrorBuilder::query_error(format!("MongoDB 聚合失败: {}", e)))?;

        let mut results = Vec::new();
        while cursor
            .advance()
            .await
            .map_err(|e| ErrorBuilder::query_error(format!("MongoDB 游标遍历失败: {}", e)))?
        {
            let doc = cursor.deserialize_current().map_err(|e| {
                ErrorBuilder::query_error(format!("MongoDB 文档反序列化失败: {}", e))
            })?;
            let group = match doc.get("_id") {
                Some(Bson::Null) | None => None,
                Some(bson) => Some(Self::bson_to_data_value(bson)),
            };
            let value = doc
                .get("value")
                .map(Self::bson_to_data_value)
                .unwrap_or(DataValue::Null);
            results.push(AggregateRow { group, value });
        }
        Ok(results)
    }

    async fn query(&self, _sql: &str, _params: &[DataValue]) -> PanelDbResult<QueryResult> {
        Err(ErrorBuilder::query_error("MongoDB 不支持原始 SQL 查询"))
    }

    async fn disconnect(&self) -> PanelDbResult<()> {
        // 客户端连接随适配器释放，这里只做状态标记
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!("MongoDB 适配器已断开");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_to_document_regex_escaped() {
        let filter = Filter::new(
            "name",
            FilterOperator::Contains,
            DataValue::String("a.b*c".into()),
        );
        let doc = MongoAdapter::filter_to_document(&filter).unwrap().unwrap();
        let inner = doc.get_document("name").unwrap();
        // 正则元字符必须被转义
        assert_eq!(inner.get_str("$regex").unwrap(), r"a\.b\*c");
        assert_eq!(inner.get_str("$options").unwrap(), "i");
    }

    #[test]
    fn test_empty_in_skipped() {
        let filter = Filter::new("id", FilterOperator::In, DataValue::Array(vec![]));
        assert!(MongoAdapter::filter_to_document(&filter).unwrap().is_none());
    }

    #[test]
    fn test_groups_to_document_or_logic() {
        let groups = vec![FilterGroup::or(vec![
            Filter::new("name", FilterOperator::Eq, DataValue::String("a".into())),
            Filter::new("email", FilterOperator::Eq, DataValue::String("b".into())),
        ])];
        let doc = MongoAdapter::groups_to_document(&groups).unwrap();
        assert!(doc.contains_key("$or"));
    }

    #[test]
    fn test_invalid_column_rejected() {
        let filter = Filter::new(
            "bad; column",
            FilterOperator::Eq,
            DataValue::Int(1),
        );
        assert!(MongoAdapter::filter_to_document(&filter).is_err());
    }

    #[test]
    fn test_id_filter_objectid_probe() {
        // 合法的 ObjectId 十六进制串按 ObjectId 匹配
        let filter =
            MongoAdapter::id_filter(&DataValue::String("507f1f77bcf86cd799439011".into()));
        assert!(matches!(filter.get("_id"), Some(Bson::ObjectId(_))));

        // 普通字符串按原样匹配
        let filter = MongoAdapter::id_filter(&DataValue::String("user-42".into()));
        assert!(matches!(filter.get("_id"), Some(Bson::String(_))));
    }

    #[test]
    fn test_date_range_bounds_become_bson_dates() {
        // 纯日期的范围边界必须编译为 BSON 日期，
        // 字符串边界与 Date 字段跨类型比较永远不匹配
        let filter = Filter::new(
            "created_at",
            FilterOperator::Gte,
            DataValue::String("2024-01-01".into()),
        );
        let doc = MongoAdapter::filter_to_document(&filter).unwrap().unwrap();
        let inner = doc.get_document("created_at").unwrap();
        assert!(matches!(inner.get("$gte"), Some(Bson::DateTime(_))));

        // 完整 ISO 日期时间同样编译为 BSON 日期
        let filter = Filter::new(
            "created_at",
            FilterOperator::Lte,
            DataValue::String("2024-06-30T23:59:59Z".into()),
        );
        let doc = MongoAdapter::filter_to_document(&filter).unwrap().unwrap();
        let inner = doc.get_document("created_at").unwrap();
        assert!(matches!(inner.get("$lte"), Some(Bson::DateTime(_))));
    }

    #[test]
    fn test_is_null_document() {
        let filter = Filter::unary("deleted_at", FilterOperator::IsNull);
        let doc = MongoAdapter::filter_to_document(&filter).unwrap().unwrap();
        assert_eq!(doc.get("deleted_at"), Some(&Bson::Null));
    }
}
