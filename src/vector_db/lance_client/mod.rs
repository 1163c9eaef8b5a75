//! LanceDB vector store client
//!
//! One table holds every section record. Metadata is denormalized into columns so
//! repository filters run inside LanceDB; the attribute map is kept as a JSON string.

use crate::types::{RecordMetadata, SectionKind};
use crate::vector_db::{
    DistanceMetric, QueryMatch, RecordFilter, StoredEntry, StoredRecord, VectorStore,
    quote_literal,
};
use anyhow::{Context, Result};
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, Int64Array, RecordBatch, RecordBatchIterator,
    StringArray, UInt32Array, types::Float32Type,
};
use arrow_schema::{DataType, Field, Schema};
use futures::stream::TryStreamExt;
use lancedb::Table;
use lancedb::connection::Connection;
use lancedb::query::{ExecutableQuery, QueryBase};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;

/// Maximum number of keys placed in a single `IN (...)` delete filter
const DELETE_CHUNK_SIZE: usize = 500;

/// Columns read back for entries and query matches
const METADATA_COLUMNS: [&str; 10] = [
    "id",
    "repo",
    "file_path",
    "name",
    "kind",
    "start_line",
    "end_line",
    "attributes",
    "indexed_at",
    "document",
];

/// LanceDB vector store (embedded, no server required)
pub struct LanceVectorDB {
    connection: Connection,
    table_name: String,
    db_path: String,
}

impl LanceVectorDB {
    /// Connect to a database directory, using `table_name` as the collection
    pub async fn with_path(db_path: impl AsRef<Path>, table_name: &str) -> Result<Self> {
        let db_path = db_path.as_ref().to_string_lossy().to_string();
        tracing::info!("Connecting to LanceDB at: {}", db_path);

        let connection = lancedb::connect(&db_path)
            .execute()
            .await
            .context("Failed to connect to LanceDB")?;

        Ok(Self {
            connection,
            table_name: table_name.to_string(),
            db_path,
        })
    }

    fn create_schema(dimension: usize) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    dimension as i32,
                ),
                false,
            ),
            Field::new("id", DataType::Utf8, false),
            Field::new("repo", DataType::Utf8, false),
            Field::new("file_path", DataType::Utf8, false),
            Field::new("name", DataType::Utf8, false),
            Field::new("kind", DataType::Utf8, false),
            Field::new("start_line", DataType::UInt32, false),
            Field::new("end_line", DataType::UInt32, false),
            Field::new("attributes", DataType::Utf8, false),
            Field::new("indexed_at", DataType::Int64, false),
            Field::new("document", DataType::Utf8, false),
        ]))
    }

    async fn table_exists(&self) -> Result<bool> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .context("Failed to list tables")?;
        Ok(table_names.contains(&self.table_name))
    }

    async fn get_table(&self) -> Result<Table> {
        self.connection
            .open_table(&self.table_name)
            .execute()
            .await
            .context("Failed to open table")
    }

    async fn create_empty_table(&self, schema: Arc<Schema>) -> Result<()> {
        let empty_batch = RecordBatch::new_empty(schema.clone());
        let batches = RecordBatchIterator::new(vec![empty_batch].into_iter().map(Ok), schema);

        self.connection
            .create_table(&self.table_name, Box::new(batches))
            .execute()
            .await
            .context("Failed to create table")?;
        Ok(())
    }

    fn create_record_batch(records: &[StoredRecord], schema: Arc<Schema>) -> Result<RecordBatch> {
        let dimension = records[0].vector.len();
        if let Some(bad) = records.iter().find(|r| r.vector.len() != dimension) {
            anyhow::bail!(
                "Vector for '{}' has dimension {}, expected {}",
                bad.key,
                bad.vector.len(),
                dimension
            );
        }

        let vector_array = FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(
            records
                .iter()
                .map(|r| Some(r.vector.iter().copied().map(Some))),
            dimension as i32,
        );

        let id_array =
            StringArray::from(records.iter().map(|r| r.key.as_str()).collect::<Vec<_>>());
        let repo_array = StringArray::from(
            records
                .iter()
                .map(|r| r.metadata.repo.as_str())
                .collect::<Vec<_>>(),
        );
        let file_path_array = StringArray::from(
            records
                .iter()
                .map(|r| r.metadata.file_path.as_str())
                .collect::<Vec<_>>(),
        );
        let name_array = StringArray::from(
            records
                .iter()
                .map(|r| r.metadata.name.as_str())
                .collect::<Vec<_>>(),
        );
        let kind_array = StringArray::from(
            records
                .iter()
                .map(|r| r.metadata.kind.as_str())
                .collect::<Vec<_>>(),
        );
        let start_line_array = UInt32Array::from(
            records
                .iter()
                .map(|r| r.metadata.start_line as u32)
                .collect::<Vec<_>>(),
        );
        let end_line_array = UInt32Array::from(
            records
                .iter()
                .map(|r| r.metadata.end_line as u32)
                .collect::<Vec<_>>(),
        );
        let attributes = records
            .iter()
            .map(|r| serde_json::to_string(&r.metadata.attributes))
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to serialize attributes")?;
        let attributes_array = StringArray::from(attributes);
        let indexed_at_array = Int64Array::from(
            records
                .iter()
                .map(|r| r.metadata.indexed_at)
                .collect::<Vec<_>>(),
        );
        let document_array = StringArray::from(
            records
                .iter()
                .map(|r| r.document.as_str())
                .collect::<Vec<_>>(),
        );

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(vector_array),
                Arc::new(id_array),
                Arc::new(repo_array),
                Arc::new(file_path_array),
                Arc::new(name_array),
                Arc::new(kind_array),
                Arc::new(start_line_array),
                Arc::new(end_line_array),
                Arc::new(attributes_array),
                Arc::new(indexed_at_array),
                Arc::new(document_array),
            ],
        )
        .context("Failed to create RecordBatch")
    }

    fn filter_expression(filter: &RecordFilter) -> Option<String> {
        filter
            .repo
            .as_deref()
            .map(|repo| format!("repo = {}", quote_literal(repo)))
    }

    fn keys_expression(keys: &[String]) -> String {
        let quoted: Vec<String> = keys.iter().map(|k| quote_literal(k)).collect();
        format!("id IN ({})", quoted.join(", "))
    }

    /// Decode entries from a result batch; `_distance` is read when present
    fn read_batch(batch: &RecordBatch) -> Result<Vec<(StoredEntry, Option<f32>)>> {
        let ids = string_column(batch, "id")?;
        let repos = string_column(batch, "repo")?;
        let file_paths = string_column(batch, "file_path")?;
        let names = string_column(batch, "name")?;
        let kinds = string_column(batch, "kind")?;
        let start_lines = typed_column::<UInt32Array>(batch, "start_line")?;
        let end_lines = typed_column::<UInt32Array>(batch, "end_line")?;
        let attributes = string_column(batch, "attributes")?;
        let indexed_at = typed_column::<Int64Array>(batch, "indexed_at")?;
        let documents = string_column(batch, "document")?;
        let distances = match batch.column_by_name("_distance") {
            Some(column) => Some(
                column
                    .as_any()
                    .downcast_ref::<Float32Array>()
                    .context("Invalid distance type")?,
            ),
            None => None,
        };

        let mut rows = Vec::with_capacity(batch.num_rows());
        for i in 0..batch.num_rows() {
            let attribute_map: BTreeMap<String, String> =
                serde_json::from_str(attributes.value(i)).with_context(|| {
                    format!("Invalid attributes for record '{}'", ids.value(i))
                })?;

            let entry = StoredEntry {
                key: ids.value(i).to_string(),
                metadata: RecordMetadata {
                    repo: repos.value(i).to_string(),
                    file_path: file_paths.value(i).to_string(),
                    name: names.value(i).to_string(),
                    kind: SectionKind::from(kinds.value(i)),
                    start_line: start_lines.value(i) as usize,
                    end_line: end_lines.value(i) as usize,
                    attributes: attribute_map,
                    indexed_at: indexed_at.value(i),
                },
                document: documents.value(i).to_string(),
            };
            rows.push((entry, distances.map(|d| d.value(i))));
        }
        Ok(rows)
    }

    async fn delete_where(&self, table: &Table, filter: String) -> Result<usize> {
        let matching = table
            .count_rows(Some(filter.clone()))
            .await
            .context("Failed to count records")?;
        if matching == 0 {
            return Ok(0);
        }

        table
            .delete(&filter)
            .await
            .context("Failed to delete records")?;
        Ok(matching)
    }
}

fn typed_column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .with_context(|| format!("Missing {} column", name))?
        .as_any()
        .downcast_ref::<T>()
        .with_context(|| format!("Invalid {} type", name))
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    typed_column::<StringArray>(batch, name)
}

#[async_trait::async_trait]
impl VectorStore for LanceVectorDB {
    async fn initialize(&self, dimension: usize) -> Result<()> {
        tracing::info!(
            "Initializing LanceDB with dimension {} at {}",
            dimension,
            self.db_path
        );

        if self.table_exists().await? {
            tracing::info!("Table '{}' already exists", self.table_name);
            return Ok(());
        }

        self.create_empty_table(Self::create_schema(dimension))
            .await?;

        tracing::info!("Created table '{}'", self.table_name);
        Ok(())
    }

    async fn upsert(&self, records: Vec<StoredRecord>) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let schema = Self::create_schema(records[0].vector.len());
        let batch = Self::create_record_batch(&records, schema.clone())?;
        let count = batch.num_rows();

        let table = self.get_table().await?;

        let keys: Vec<String> = records.iter().map(|r| r.key.clone()).collect();
        for chunk in keys.chunks(DELETE_CHUNK_SIZE) {
            table
                .delete(&Self::keys_expression(chunk))
                .await
                .context("Failed to replace existing records")?;
        }

        let batches = RecordBatchIterator::new(vec![batch].into_iter().map(Ok), schema);
        table
            .add(Box::new(batches))
            .execute()
            .await
            .context("Failed to add records to table")?;

        tracing::debug!("Stored {} records in '{}'", count, self.table_name);
        Ok(count)
    }

    async fn get(&self, filter: &RecordFilter, limit: Option<usize>) -> Result<Vec<StoredEntry>> {
        let table = self.get_table().await?;

        let mut query = table.query().select(lancedb::query::Select::Columns(
            METADATA_COLUMNS.iter().map(|c| c.to_string()).collect(),
        ));
        if let Some(expr) = Self::filter_expression(filter) {
            query = query.only_if(expr);
        }
        if let Some(limit) = limit {
            query = query.limit(limit);
        }

        let stream = query.execute().await.context("Failed to query records")?;
        let batches: Vec<RecordBatch> = stream
            .try_collect()
            .await
            .context("Failed to collect records")?;

        let mut entries = Vec::new();
        for batch in &batches {
            entries.extend(Self::read_batch(batch)?.into_iter().map(|(entry, _)| entry));
        }
        if let Some(limit) = limit {
            entries.truncate(limit);
        }
        Ok(entries)
    }

    async fn keys(&self, filter: &RecordFilter) -> Result<HashSet<String>> {
        let table = self.get_table().await?;

        let mut query = table
            .query()
            .select(lancedb::query::Select::Columns(vec!["id".to_string()]));
        if let Some(expr) = Self::filter_expression(filter) {
            query = query.only_if(expr);
        }

        let stream = query.execute().await.context("Failed to query keys")?;
        let batches: Vec<RecordBatch> = stream
            .try_collect()
            .await
            .context("Failed to collect keys")?;

        let mut keys = HashSet::new();
        for batch in &batches {
            let ids = string_column(batch, "id")?;
            for i in 0..batch.num_rows() {
                keys.insert(ids.value(i).to_string());
            }
        }
        Ok(keys)
    }

    async fn query(
        &self,
        vector: Vec<f32>,
        k: usize,
        filter: &RecordFilter,
    ) -> Result<Vec<QueryMatch>> {
        if k == 0 {
            return Ok(vec![]);
        }
        let table = self.get_table().await?;

        let mut query = table
            .vector_search(vector)
            .context("Failed to create vector search")?
            .distance_type(lancedb::DistanceType::Cosine)
            .limit(k);
        if let Some(expr) = Self::filter_expression(filter) {
            query = query.only_if(expr);
        }

        let stream = query.execute().await.context("Failed to execute search")?;
        let batches: Vec<RecordBatch> = stream
            .try_collect()
            .await
            .context("Failed to collect search results")?;

        let mut matches = Vec::new();
        for batch in &batches {
            for (entry, distance) in Self::read_batch(batch)? {
                let distance = distance.context("Missing _distance column")?;
                matches.push(QueryMatch {
                    key: entry.key,
                    distance,
                    metadata: entry.metadata,
                    document: entry.document,
                });
            }
        }
        matches.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        matches.truncate(k);
        Ok(matches)
    }

    async fn delete(&self, keys: &[String]) -> Result<usize> {
        if keys.is_empty() {
            return Ok(0);
        }
        let table = self.get_table().await?;

        let mut deleted = 0;
        for chunk in keys.chunks(DELETE_CHUNK_SIZE) {
            deleted += self
                .delete_where(&table, Self::keys_expression(chunk))
                .await?;
        }
        tracing::info!("Deleted {} records from '{}'", deleted, self.table_name);
        Ok(deleted)
    }

    async fn delete_matching(&self, filter: &RecordFilter) -> Result<usize> {
        let Some(expr) = Self::filter_expression(filter) else {
            let deleted = self.count().await?;
            self.clear().await?;
            return Ok(deleted);
        };
        let table = self.get_table().await?;
        let deleted = self.delete_where(&table, expr).await?;
        tracing::info!("Deleted {} records from '{}'", deleted, self.table_name);
        Ok(deleted)
    }

    async fn count(&self) -> Result<usize> {
        let table = self.get_table().await?;
        table
            .count_rows(None)
            .await
            .context("Failed to count rows")
    }

    async fn clear(&self) -> Result<()> {
        if !self.table_exists().await? {
            return Ok(());
        }

        let schema = self
            .get_table()
            .await?
            .schema()
            .await
            .context("Failed to read table schema")?;

        // Drop and recreate with the same schema (empty namespace array for default namespace)
        self.connection
            .drop_table(&self.table_name, &[])
            .await
            .context("Failed to drop table")?;
        self.create_empty_table(schema).await?;

        tracing::info!("Cleared all records from '{}'", self.table_name);
        Ok(())
    }

    fn distance_metric(&self) -> DistanceMetric {
        DistanceMetric::Cosine
    }

    fn collection_name(&self) -> &str {
        &self.table_name
    }
}
