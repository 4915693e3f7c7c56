//! SQLite implementation of VersionedStore.

use std::collections::BTreeSet;
use std::marker::PhantomData;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use sea_query::{Alias, Expr, Order, Query, SelectStatement, SimpleExpr, SqliteQueryBuilder};
use serde_json::{Map, Value};
use sqlx::pool::PoolConnection;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use super::schema::{column, columns, create_statements, CoreColumn};
use super::{kinds, FieldError, Result, SearchQuery, StoreContext, StoreError, VersionedStore};
use crate::entity::{body_loc, Entity, FieldDef, FieldKind, NewRecord, Patch, Record, Reference};
use crate::urn::{format_urn, validate_name, validate_urn, Identifier};

/// Largest LIMIT or OFFSET SQLite accepts.
const MAX_WINDOW: u64 = i64::MAX as u64;

/// SQLite implementation of VersionedStore, bound to one entity table.
pub struct SqliteVersionedStore<E: Entity> {
    pool: SqlitePool,
    context: StoreContext,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> SqliteVersionedStore<E> {
    /// Create a new store over an existing pool.
    pub fn new(pool: SqlitePool, context: StoreContext) -> Self {
        Self {
            pool,
            context,
            _entity: PhantomData,
        }
    }

    /// Create the entity table and its indexes if they don't exist.
    pub async fn init_schema(&self) -> Result<()> {
        for statement in create_statements::<E>() {
            sqlx::query(&statement).execute(&self.pool).await?;
        }
        debug!(entity = E::ENTITY_TYPE, table = E::TABLE, "schema initialized");
        Ok(())
    }

    fn table() -> Alias {
        Alias::new(E::TABLE)
    }

    fn column_names() -> impl Iterator<Item = Alias> {
        columns::<E>().map(|f| Alias::new(f.name))
    }

    fn select() -> SelectStatement {
        let mut stmt = Query::select();
        stmt.columns(Self::column_names()).from(Self::table());
        stmt
    }

    fn not_found(identifier: &str) -> StoreError {
        StoreError::NotFound {
            entity: E::ENTITY_TYPE,
            identifier: identifier.to_string(),
        }
    }

    fn ambiguous(identifier: &str, matches: usize) -> StoreError {
        StoreError::invalid(
            vec!["path".to_string(), "identifier".to_string()],
            format!(
                "identifier '{}' matches {} {} records; use the URN",
                identifier,
                matches,
                E::ENTITY_TYPE
            ),
        )
    }

    /// Start a write transaction.
    ///
    /// BEGIN IMMEDIATE acquires the write lock upfront, so concurrent writers
    /// queue instead of racing between their checks and their inserts.
    async fn begin(&self) -> Result<PoolConnection<Sqlite>> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
        Ok(conn)
    }

    /// Commit on success, roll back on failure.
    async fn finish<T>(mut conn: PoolConnection<Sqlite>, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                sqlx::query("COMMIT")
                    .execute(&mut *conn)
                    .await
                    .map_err(StoreError::from_write)?;
                Ok(value)
            }
            Err(e) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                Err(e)
            }
        }
    }

    /// Run a rendered select. sea-query statements hold `Rc` idens, so they
    /// are rendered to strings before any await.
    async fn fetch(conn: &mut SqliteConnection, query: &str) -> Result<Vec<Record<E::Attributes>>> {
        let rows = sqlx::query(query).fetch_all(&mut *conn).await?;
        rows.iter().map(Self::decode).collect()
    }

    /// Select of the rows matching an identifier, optionally active only.
    fn identifier_query(identifier: &Identifier, only_active: bool) -> String {
        let mut stmt = Self::select();
        stmt.and_where(identifier_filter(identifier));
        if only_active {
            stmt.and_where(Expr::col(CoreColumn::Active).eq(true));
        }
        stmt.order_by(CoreColumn::Version, Order::Asc)
            .to_string(SqliteQueryBuilder)
    }

    fn decode(row: &SqliteRow) -> Result<Record<E::Attributes>> {
        let mut attributes = Map::new();
        for field in E::FIELDS {
            let value = match field.kind {
                FieldKind::Text => row
                    .try_get::<Option<String>, _>(field.name)?
                    .map(Value::String),
                FieldKind::Integer => row.try_get::<Option<i64>, _>(field.name)?.map(Value::from),
                FieldKind::Boolean => row.try_get::<Option<bool>, _>(field.name)?.map(Value::Bool),
            };
            attributes.insert(field.name.to_string(), value.unwrap_or(Value::Null));
        }

        let deleted: Option<String> = row.try_get("deleted")?;

        Ok(Record {
            row_id: parse_uuid("row_id", row.try_get("row_id")?)?,
            surrogate_id: parse_uuid("surrogate_id", row.try_get("surrogate_id")?)?,
            urn: row.try_get("urn")?,
            name: row.try_get("name")?,
            created: parse_timestamp("created", row.try_get("created")?)?,
            modified: parse_timestamp("modified", row.try_get("modified")?)?,
            deleted: deleted
                .map(|ts| parse_timestamp("deleted", ts))
                .transpose()?,
            version: row.try_get("version")?,
            active: row.try_get("active")?,
            attributes: serde_json::from_value(Value::Object(attributes))?,
        })
    }

    /// Column values for a row, in table column order.
    fn encode(record: &Record<E::Attributes>) -> Result<Vec<SimpleExpr>> {
        let mut values: Vec<SimpleExpr> = vec![
            record.row_id.to_string().into(),
            record.surrogate_id.to_string().into(),
            record.urn.clone().into(),
            record.name.clone().into(),
            record.created.to_rfc3339().into(),
            record.modified.to_rfc3339().into(),
            record.deleted.map(|ts| ts.to_rfc3339()).into(),
            record.version.into(),
            record.active.into(),
        ];

        let attributes = attributes_map(&record.attributes)?;
        for field in E::FIELDS {
            let value = attributes.get(field.name).unwrap_or(&Value::Null);
            values.push(to_sql_value(field, value)?.into());
        }
        Ok(values)
    }

    async fn insert(conn: &mut SqliteConnection, record: &Record<E::Attributes>) -> Result<()> {
        let query = Query::insert()
            .into_table(Self::table())
            .columns(Self::column_names())
            .values_panic(Self::encode(record)?)
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query)
            .execute(&mut *conn)
            .await
            .map_err(StoreError::from_write)?;
        Ok(())
    }

    /// Stamp `deleted` and clear `active` on the given version.
    async fn retire(
        conn: &mut SqliteConnection,
        record: &Record<E::Attributes>,
        now: DateTime<FixedOffset>,
    ) -> Result<()> {
        let query = Query::update()
            .table(Self::table())
            .values([
                (CoreColumn::Deleted, now.to_rfc3339().into()),
                (CoreColumn::Active, false.into()),
            ])
            .and_where(Expr::col(CoreColumn::RowId).eq(record.row_id.to_string()))
            .and_where(Expr::col(CoreColumn::Active).eq(true))
            .to_string(SqliteQueryBuilder);

        let result = sqlx::query(&query)
            .execute(&mut *conn)
            .await
            .map_err(StoreError::from_write)?;

        if result.rows_affected() != 1 {
            return Err(StoreError::Integrity(format!(
                "version {} of {} is no longer active",
                record.version, record.urn
            )));
        }
        Ok(())
    }

    /// Current active version, if any. A bare name shared by several active
    /// records is ambiguous.
    async fn resolve_active(
        conn: &mut SqliteConnection,
        identifier: &str,
    ) -> Result<Option<Record<E::Attributes>>> {
        let parsed = Identifier::parse(identifier);
        debug!(entity = E::ENTITY_TYPE, identifier = ?parsed, "resolving active record");

        let query = Self::identifier_query(&parsed, true);
        let mut matches = Self::fetch(conn, &query).await?;
        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop()),
            n => Err(Self::ambiguous(identifier, n)),
        }
    }

    /// Any row, active or retired, carrying this URN.
    async fn find_by_urn(
        conn: &mut SqliteConnection,
        urn: &str,
    ) -> Result<Option<Record<E::Attributes>>> {
        let query = Self::select()
            .and_where(Expr::col(CoreColumn::Urn).eq(urn))
            .order_by(CoreColumn::Version, Order::Desc)
            .limit(1)
            .to_string(SqliteQueryBuilder);

        Ok(Self::fetch(conn, &query).await?.pop())
    }

    async fn reference_exists(conn: &mut SqliteConnection, reference: &Reference) -> Result<bool> {
        let query = Query::select()
            .column(CoreColumn::RowId)
            .from(Alias::new(reference.table))
            .and_where(Expr::col(CoreColumn::Urn).eq(reference.urn.as_str()))
            .and_where(Expr::col(CoreColumn::Active).eq(true))
            .limit(1)
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&mut *conn).await?;
        Ok(row.is_some())
    }

    async fn validate_in(
        conn: &mut SqliteConnection,
        name: &str,
        attributes: &E::Attributes,
    ) -> Result<()> {
        let mut errors = Vec::new();
        if let Err(e) = validate_name(name) {
            errors.push(FieldError::value(body_loc("name"), e.to_string()));
        }
        errors.extend(E::validate(name, attributes));
        if !errors.is_empty() {
            return Err(StoreError::Validation(errors));
        }

        for reference in E::references(attributes) {
            if !Self::reference_exists(conn, &reference).await? {
                errors.push(FieldError::new(
                    body_loc(reference.field),
                    format!("{} does not reference an active record", reference.urn),
                    kinds::REFERENCE_ERROR,
                ));
            }
        }
        if !errors.is_empty() {
            return Err(StoreError::Validation(errors));
        }
        Ok(())
    }

    fn urn_for(&self, name: &str, attributes: &E::Attributes) -> Result<String> {
        let urn = format_urn(
            &self.context.namespace,
            E::ENTITY_TYPE,
            &E::discriminator(name, attributes),
        );
        validate_urn(&urn)
            .map_err(|e| StoreError::invalid(vec!["body".to_string()], format!("{}: {}", e, urn)))?;
        Ok(urn)
    }

    async fn create_in(
        &self,
        conn: &mut SqliteConnection,
        data: NewRecord<E::Attributes>,
    ) -> Result<Record<E::Attributes>> {
        Self::validate_in(conn, &data.name, &data.attributes).await?;
        let urn = self.urn_for(&data.name, &data.attributes)?;

        // URNs stay reserved once used, even after the record is deleted.
        if let Some(existing) = Self::find_by_urn(conn, &urn).await? {
            debug!(
                entity = E::ENTITY_TYPE,
                urn = %urn,
                active = existing.active,
                "create rejected, urn in use"
            );
            return Err(StoreError::AlreadyExists { urn });
        }

        let now = self.context.now();
        let record = Record {
            row_id: Uuid::now_v7(),
            surrogate_id: Uuid::now_v7(),
            urn,
            name: data.name,
            created: now,
            modified: now,
            deleted: None,
            version: 1,
            active: true,
            attributes: data.attributes,
        };
        Self::insert(conn, &record).await?;

        info!(
            entity = E::ENTITY_TYPE,
            urn = %record.urn,
            surrogate_id = %record.surrogate_id,
            "record created"
        );
        Ok(record)
    }

    async fn update_in(
        &self,
        conn: &mut SqliteConnection,
        identifier: &str,
        patch: Patch<E>,
    ) -> Result<Record<E::Attributes>> {
        let current = Self::resolve_active(conn, identifier)
            .await?
            .ok_or_else(|| Self::not_found(identifier))?;

        let merged = patch.apply(attributes_map(&current.attributes)?);
        let attributes: E::Attributes = serde_json::from_value(Value::Object(merged))
            .map_err(|e| StoreError::invalid(vec!["body".to_string()], e.to_string()))?;
        Self::validate_in(conn, &current.name, &attributes).await?;

        let now = self.context.now();
        Self::retire(conn, &current, now).await?;

        // Everything but row id, modified, deleted, version and active
        // carries forward from the retired version.
        let next = Record {
            row_id: Uuid::now_v7(),
            surrogate_id: current.surrogate_id,
            urn: current.urn,
            name: current.name,
            created: current.created,
            modified: now,
            deleted: None,
            version: current.version + 1,
            active: true,
            attributes,
        };
        Self::insert(conn, &next).await?;

        info!(
            entity = E::ENTITY_TYPE,
            urn = %next.urn,
            version = next.version,
            "record updated"
        );
        Ok(next)
    }

    async fn delete_in(
        &self,
        conn: &mut SqliteConnection,
        identifier: &str,
    ) -> Result<Record<E::Attributes>> {
        let mut current = Self::resolve_active(conn, identifier)
            .await?
            .ok_or_else(|| Self::not_found(identifier))?;

        let now = self.context.now();
        Self::retire(conn, &current, now).await?;
        current.deleted = Some(now);
        current.active = false;

        info!(
            entity = E::ENTITY_TYPE,
            urn = %current.urn,
            version = current.version,
            "record deleted"
        );
        Ok(current)
    }

    fn search_statement(query: &SearchQuery) -> Result<String> {
        let mut stmt = Self::select();

        if query.only_active {
            if query.filters.contains_key("active") {
                return Err(StoreError::invalid(
                    query_loc("active"),
                    "cannot filter on 'active' when searching active records only",
                ));
            }
            stmt.and_where(Expr::col(CoreColumn::Active).eq(true));
        }

        for (field, raw) in &query.filters {
            let def = column::<E>(field).ok_or_else(|| {
                StoreError::invalid(
                    query_loc(field),
                    format!("unknown {} field '{}'", E::ENTITY_TYPE, field),
                )
            })?;
            let value = parse_filter(def, raw)?;
            stmt.and_where(Expr::col(Alias::new(def.name)).eq(value));
        }

        stmt.order_by(CoreColumn::SurrogateId, Order::Asc)
            .order_by(CoreColumn::Version, Order::Asc);

        // SQLite takes LIMIT and OFFSET as signed 64-bit integers and
        // rejects OFFSET without LIMIT.
        let offset = query.offset.min(MAX_WINDOW);
        match query.limit {
            Some(limit) => {
                stmt.limit(limit.min(MAX_WINDOW)).offset(offset);
            }
            None if offset == 0 => {}
            None => {
                stmt.limit(MAX_WINDOW).offset(offset);
            }
        }
        Ok(stmt.to_string(SqliteQueryBuilder))
    }
}

#[async_trait]
impl<E: Entity> VersionedStore<E> for SqliteVersionedStore<E> {
    async fn create(&self, data: NewRecord<E::Attributes>) -> Result<Record<E::Attributes>> {
        let mut conn = self.begin().await?;
        let result = self.create_in(&mut conn, data).await;
        Self::finish(conn, result).await
    }

    async fn get(&self, identifier: &str) -> Result<Record<E::Attributes>> {
        self.find(identifier)
            .await?
            .ok_or_else(|| Self::not_found(identifier))
    }

    async fn find(&self, identifier: &str) -> Result<Option<Record<E::Attributes>>> {
        let mut conn = self.pool.acquire().await?;
        Self::resolve_active(&mut conn, identifier).await
    }

    async fn get_history(&self, identifier: &str) -> Result<Vec<Record<E::Attributes>>> {
        // URN and name are immutable, so every version of a record matches
        // the same filter and one statement returns the full history.
        let query = Self::identifier_query(&Identifier::parse(identifier), false);

        let mut conn = self.pool.acquire().await?;
        let rows = Self::fetch(&mut conn, &query).await?;

        let surrogates: BTreeSet<Uuid> = rows.iter().map(|r| r.surrogate_id).collect();
        match surrogates.len() {
            0 => Err(Self::not_found(identifier)),
            1 => Ok(rows),
            n => Err(Self::ambiguous(identifier, n)),
        }
    }

    async fn update(&self, identifier: &str, patch: Patch<E>) -> Result<Record<E::Attributes>> {
        let mut conn = self.begin().await?;
        let result = self.update_in(&mut conn, identifier, patch).await;
        Self::finish(conn, result).await
    }

    async fn delete(&self, identifier: &str) -> Result<Record<E::Attributes>> {
        let mut conn = self.begin().await?;
        let result = self.delete_in(&mut conn, identifier).await;
        Self::finish(conn, result).await
    }

    async fn list_active(&self) -> Result<Vec<Record<E::Attributes>>> {
        self.search(SearchQuery::active()).await
    }

    async fn list_history(&self) -> Result<Vec<Record<E::Attributes>>> {
        self.search(SearchQuery::default()).await
    }

    async fn search(&self, query: SearchQuery) -> Result<Vec<Record<E::Attributes>>> {
        let statement = Self::search_statement(&query)?;
        let mut conn = self.pool.acquire().await?;
        Self::fetch(&mut conn, &statement).await
    }

    async fn validate_data(&self, name: &str, attributes: &E::Attributes) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        Self::validate_in(&mut conn, name, attributes).await
    }
}

fn identifier_filter(identifier: &Identifier) -> SimpleExpr {
    match identifier {
        Identifier::Urn(urn) => Expr::col(CoreColumn::Urn).eq(urn.as_str()),
        Identifier::SurrogateId(id) => Expr::col(CoreColumn::SurrogateId).eq(id.to_string()),
        Identifier::Name(name) => Expr::col(CoreColumn::Name).eq(name.as_str()),
    }
}

fn query_loc(field: &str) -> Vec<String> {
    vec!["query".to_string(), field.to_string()]
}

fn attributes_map<A: serde::Serialize>(attributes: &A) -> Result<Map<String, Value>> {
    match serde_json::to_value(attributes)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}

fn to_sql_value(field: &FieldDef, value: &Value) -> Result<sea_query::Value> {
    let converted = match (field.kind, value) {
        (FieldKind::Text, Value::Null) => sea_query::Value::from(None::<String>),
        (FieldKind::Integer, Value::Null) => sea_query::Value::from(None::<i64>),
        (FieldKind::Boolean, Value::Null) => sea_query::Value::from(None::<bool>),
        (FieldKind::Text, Value::String(s)) => s.clone().into(),
        (FieldKind::Integer, Value::Number(n)) if n.is_i64() => n.as_i64().into(),
        (FieldKind::Boolean, Value::Bool(b)) => (*b).into(),
        (kind, other) => {
            return Err(StoreError::invalid(
                body_loc(field.name),
                format!("expected {} value, got {}", kind.sql_type(), other),
            ))
        }
    };
    Ok(converted)
}

fn parse_filter(field: &FieldDef, raw: &str) -> Result<sea_query::Value> {
    match field.kind {
        FieldKind::Text => Ok(raw.to_string().into()),
        FieldKind::Integer => raw.parse::<i64>().map(Into::into).map_err(|_| {
            StoreError::invalid(query_loc(field.name), format!("'{}' is not an integer", raw))
        }),
        FieldKind::Boolean => match raw {
            "true" | "1" => Ok(true.into()),
            "false" | "0" => Ok(false.into()),
            _ => Err(StoreError::invalid(
                query_loc(field.name),
                format!("'{}' is not a boolean", raw),
            )),
        },
    }
}

fn parse_uuid(column: &'static str, value: String) -> Result<Uuid> {
    Uuid::parse_str(&value).map_err(|_| StoreError::InvalidStoredValue { column, value })
}

fn parse_timestamp(column: &'static str, value: String) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(&value).map_err(|_| StoreError::InvalidStoredValue { column, value })
}
