//! Route dispatch for gateway requests.

use crate::database::{BoundStatement, ColumnDefinition, QueryResult, sql_builder};
use crate::error::{DatabaseError, GatewayError, ProtocolError, Result, ValidationError};
use crate::protocol::{GatewayRequest, GatewayResponse, Handler, PageMeta, RequestId};
use crate::security::{Identifier, IdentifierKind, Pagination, RowData};
use crate::server::routes::{Route, parse_query_string, split_query};
use crate::server::state::ServerState;
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Deserialize)]
struct CreateKeyBody {
    name: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SqlBody {
    #[serde(default)]
    sql: Option<Value>,
    #[serde(default)]
    params: Vec<Value>,
}

impl SqlBody {
    /// A missing body reads as an empty one so the statement check reports it.
    fn from_body(body: Option<Value>) -> Result<Self> {
        match body {
            Some(body) => parse_body(Some(body)),
            None => Ok(Self::default()),
        }
    }

    /// The statement text. Absent or non-string `sql` is rejected like an
    /// empty statement.
    fn into_parts(self) -> Result<(String, Vec<Value>)> {
        match self.sql {
            Some(Value::String(sql)) => Ok((sql, self.params)),
            _ => Err(ValidationError::EmptyStatement.into()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddColumnBody {
    #[serde(alias = "columnName")]
    name: String,
    #[serde(alias = "columnType")]
    r#type: String,
    #[serde(default)]
    not_null: bool,
    #[serde(default)]
    unique: bool,
    #[serde(default, alias = "defaultValue")]
    default: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenameBody {
    #[serde(alias = "newColumnName", alias = "newTableName")]
    new_name: String,
}

/// Gateway request handler.
pub struct GatewayHandler {
    state: Arc<ServerState>,
}

impl GatewayHandler {
    pub fn new(state: Arc<ServerState>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &Arc<ServerState> {
        &self.state
    }

    async fn dispatch(&self, request: GatewayRequest) -> Result<GatewayResponse> {
        let route = Route::parse(request.method, &request.path)?;
        debug!("Matched route: {:?}", route);

        if !route.is_public() {
            self.state
                .authenticator
                .authenticate(request.authorization.as_deref())
                .await?;
        }

        let page = request.query_i64("page");
        let limit = request.query_i64("limit");
        let GatewayRequest {
            id,
            body,
            authorization,
            ..
        } = request;
        let state = &self.state;

        match route {
            Route::KeysStatus => {
                let has_keys = match state.key_manager() {
                    Ok(keys) => keys.has_any().await?,
                    Err(_) => false,
                };
                Ok(GatewayResponse::ok(id, json!({ "hasKeys": has_keys })))
            }
            Route::CreateKey => self.create_key(id, authorization, body).await,
            Route::ListKeys => {
                let keys = state.key_manager()?.list().await?;
                Ok(GatewayResponse::ok(id, serde_json::to_value(keys)?))
            }
            Route::DeleteKey { name } => {
                state.key_manager()?.delete(&name).await?;
                Ok(GatewayResponse::empty(id))
            }

            Route::ListTables => {
                let tables = state.driver.list_tables().await?;
                Ok(GatewayResponse::ok(id, serde_json::to_value(tables)?))
            }
            Route::CreateTable => {
                let (sql, _) = SqlBody::from_body(body)?.into_parts()?;
                state.create_table_validator.validate(&sql)?;
                let result = state.driver.execute(BoundStatement::new(sql)).await?;
                info!("Created table");
                query_response(id, result)
            }
            Route::DropTable { table } => {
                let table = Identifier::parse(table, IdentifierKind::Table)?;
                let result = state.driver.execute(sql_builder::drop_table(&table)).await?;
                state.schema_cache.invalidate(table.as_str());
                info!("Dropped table: {}", table);
                query_response(id, result)
            }
            Route::TableSchema { table } => {
                let table = Identifier::parse(table, IdentifierKind::Table)?;
                let columns = state.table_schema(&table).await?;
                Ok(GatewayResponse::ok(id, serde_json::to_value(columns)?))
            }

            Route::Query => {
                let (sql, params) = SqlBody::from_body(body)?.into_parts()?;
                let verb = state.validator.validate(&sql)?;
                let result = state
                    .driver
                    .execute(BoundStatement::with_params(sql, params))
                    .await?;
                if verb.is_read_only() {
                    debug!("{} returned {} rows", verb, result.row_count);
                } else if verb.is_schema_change() {
                    info!("Executed {}", verb);
                } else {
                    info!("{} changed {} rows", verb, result.changes);
                }
                query_response(id, result)
            }

            Route::ListRows { table } => {
                let table = Identifier::parse(table, IdentifierKind::Table)?;
                self.list_rows(id, &table, state.pagination(page, limit)).await
            }
            Route::InsertRow { table } => {
                let table = Identifier::parse(table, IdentifierKind::Table)?;
                let data = RowData::try_from(body.unwrap_or(Value::Null))?;
                let result = state
                    .driver
                    .execute(sql_builder::insert_row(&table, &data))
                    .await?;
                query_response(id, result)
            }
            Route::GetRow { table, id: row_id } => {
                let table = Identifier::parse(table, IdentifierKind::Table)?;
                let key = state.primary_key(&table).await?;
                let row = state
                    .driver
                    .execute(sql_builder::select_row(&table, &key, Value::String(row_id.clone())))
                    .await?
                    .into_first()
                    .ok_or(DatabaseError::RowNotFound(row_id))?;
                Ok(GatewayResponse::ok(id, Value::Object(row)))
            }
            Route::UpdateRow { table, id: row_id } => {
                let table = Identifier::parse(table, IdentifierKind::Table)?;
                let data = RowData::try_from(body.unwrap_or(Value::Null))?;
                let key = state.primary_key(&table).await?;
                let result = state
                    .driver
                    .execute(sql_builder::update_row(
                        &table,
                        &data,
                        &key,
                        Value::String(row_id.clone()),
                    ))
                    .await?;
                require_changes(&result, row_id)?;
                query_response(id, result)
            }
            Route::DeleteRow { table, id: row_id } => {
                let table = Identifier::parse(table, IdentifierKind::Table)?;
                let key = state.primary_key(&table).await?;
                let result = state
                    .driver
                    .execute(sql_builder::delete_row(
                        &table,
                        &key,
                        Value::String(row_id.clone()),
                    ))
                    .await?;
                require_changes(&result, row_id)?;
                query_response(id, result)
            }

            Route::AddColumn { table } => {
                let table = Identifier::parse(table, IdentifierKind::Table)?;
                let body: AddColumnBody = parse_body(body)?;
                let column = ColumnDefinition::parse(&body.name, &body.r#type)?
                    .not_null(body.not_null)
                    .unique(body.unique)
                    .default_value(body.default);
                let result = state
                    .driver
                    .execute(sql_builder::add_column(&table, &column))
                    .await?;
                state.schema_cache.invalidate(table.as_str());
                query_response(id, result)
            }
            Route::RenameColumn { table, column } => {
                let table = Identifier::parse(table, IdentifierKind::Table)?;
                let from = Identifier::parse(column, IdentifierKind::Column)?;
                let RenameBody { new_name } = parse_body(body)?;
                let to = Identifier::parse(new_name, IdentifierKind::Column)?;
                let result = state
                    .driver
                    .execute(sql_builder::rename_column(&table, &from, &to))
                    .await?;
                state.schema_cache.invalidate(table.as_str());
                query_response(id, result)
            }
            Route::DropColumn { table, column } => {
                let table = Identifier::parse(table, IdentifierKind::Table)?;
                let column = Identifier::parse(column, IdentifierKind::Column)?;
                let result = state
                    .driver
                    .execute(sql_builder::drop_column(&table, &column))
                    .await?;
                state.schema_cache.invalidate(table.as_str());
                query_response(id, result)
            }
            Route::RenameTable { table } => {
                let from = Identifier::parse(table, IdentifierKind::Table)?;
                let RenameBody { new_name } = parse_body(body)?;
                let to = Identifier::parse(new_name, IdentifierKind::Table)?;
                let result = state
                    .driver
                    .execute(sql_builder::rename_table(&from, &to))
                    .await?;
                state.schema_cache.invalidate(from.as_str());
                state.schema_cache.invalidate(to.as_str());
                info!("Renamed table {} to {}", from, to);
                query_response(id, result)
            }
        }
    }

    /// The first key may be created anonymously; after that, creating a key
    /// needs a valid one.
    async fn create_key(
        &self,
        id: RequestId,
        authorization: Option<String>,
        body: Option<Value>,
    ) -> Result<GatewayResponse> {
        let keys = self.state.key_manager()?;
        if keys.has_any().await? {
            self.state
                .authenticator
                .authenticate(authorization.as_deref())
                .await?;
        }

        let CreateKeyBody { name, description } = parse_body(body)?;
        let data = keys.create(&name, description).await?;
        Ok(GatewayResponse::ok(id, serde_json::to_value(data)?))
    }

    async fn list_rows(
        &self,
        id: RequestId,
        table: &Identifier,
        page: Pagination,
    ) -> Result<GatewayResponse> {
        let total = self
            .state
            .driver
            .execute(sql_builder::count_rows(table))
            .await?
            .into_first()
            .and_then(|row| row.get("count").and_then(Value::as_i64))
            .unwrap_or(0);
        let rows = self
            .state
            .driver
            .execute(sql_builder::select_page(table, &page))
            .await?
            .rows;

        let data = rows.into_iter().map(Value::Object).collect();
        Ok(GatewayResponse::ok(id, Value::Array(data)).with_meta(PageMeta {
            page: page.page,
            limit: page.limit,
            total,
        }))
    }
}

#[async_trait]
impl Handler for GatewayHandler {
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    async fn handle(&self, mut request: GatewayRequest) -> GatewayResponse {
        let request_id = self.state.next_request_id();
        debug!("Handling request #{}", request_id);

        if let (_, Some(query)) = split_query(&request.path) {
            for (name, value) in parse_query_string(query) {
                request.query.entry(name).or_insert(Value::String(value));
            }
        }

        let id = request.id.clone();
        match self.dispatch(request).await {
            Ok(response) => response,
            Err(e) => {
                let response = GatewayResponse::error(id, &e);
                if response.status >= 500 {
                    error!("Request failed: {}", e);
                } else if let Some(code) = e.code() {
                    warn!("Request rejected ({}): {}", code, e);
                } else {
                    warn!("Request rejected: {}", e);
                }
                response
            }
        }
    }
}

fn parse_body<T: DeserializeOwned>(body: Option<Value>) -> Result<T> {
    let body = body.ok_or(ProtocolError::InvalidRequest("Missing request body".into()))?;
    serde_json::from_value(body)
        .map_err(|e| GatewayError::Protocol(ProtocolError::InvalidRequest(e.to_string().into())))
}

fn query_response(id: RequestId, result: QueryResult) -> Result<GatewayResponse> {
    Ok(GatewayResponse::ok(id, serde_json::to_value(result)?))
}

fn require_changes(result: &QueryResult, row_id: String) -> Result<()> {
    if result.changes == 0 {
        return Err(DatabaseError::RowNotFound(row_id).into());
    }
    Ok(())
}
