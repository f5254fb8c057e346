//! Route table for `/api/` paths.

use crate::error::{ProtocolError, ProtocolResult};
use crate::protocol::Method;

/// A matched route with its decoded path parameters.
///
/// Path parameters are still raw strings here; identifier validation happens
/// in the handler so rejections carry the policy's messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    KeysStatus,
    CreateKey,
    ListKeys,
    DeleteKey { name: String },
    ListTables,
    CreateTable,
    DropTable { table: String },
    TableSchema { table: String },
    Query,
    ListRows { table: String },
    InsertRow { table: String },
    GetRow { table: String, id: String },
    UpdateRow { table: String, id: String },
    DeleteRow { table: String, id: String },
    AddColumn { table: String },
    RenameColumn { table: String, column: String },
    DropColumn { table: String, column: String },
    RenameTable { table: String },
}

impl Route {
    /// Match a method and path. Anything after `?` is ignored.
    pub fn parse(method: Method, path: &str) -> ProtocolResult<Self> {
        let (path, _) = split_query(path);
        let rest = path
            .strip_prefix("/api/")
            .ok_or(ProtocolError::RouteNotFound)?;

        let segments = rest
            .trim_end_matches('/')
            .split('/')
            .map(decode_segment)
            .collect::<ProtocolResult<Vec<_>>>()?;
        let parts: Vec<&str> = segments.iter().map(String::as_str).collect();

        let route = match (method, parts.as_slice()) {
            (Method::Get, ["keys", "status"]) => Self::KeysStatus,
            (Method::Post, ["keys"]) => Self::CreateKey,
            (Method::Get, ["keys"]) => Self::ListKeys,
            (Method::Delete, ["keys", name]) => Self::DeleteKey {
                name: name.to_string(),
            },

            (Method::Get, ["tables"]) => Self::ListTables,
            (Method::Post, ["tables"]) => Self::CreateTable,
            (Method::Delete, ["tables", table]) => Self::DropTable {
                table: table.to_string(),
            },
            (Method::Get, ["tables", table, "schema"]) => Self::TableSchema {
                table: table.to_string(),
            },
            (Method::Put, ["tables", table, "rename"]) => Self::RenameTable {
                table: table.to_string(),
            },

            (Method::Post, ["query"]) => Self::Query,

            (Method::Get, ["tables", table, "rows"]) => Self::ListRows {
                table: table.to_string(),
            },
            (Method::Post, ["tables", table, "rows"]) => Self::InsertRow {
                table: table.to_string(),
            },
            (Method::Get, ["tables", table, "rows", id]) => Self::GetRow {
                table: table.to_string(),
                id: id.to_string(),
            },
            (Method::Put, ["tables", table, "rows", id]) => Self::UpdateRow {
                table: table.to_string(),
                id: id.to_string(),
            },
            (Method::Delete, ["tables", table, "rows", id]) => Self::DeleteRow {
                table: table.to_string(),
                id: id.to_string(),
            },

            (Method::Post, ["tables", table, "columns"]) => Self::AddColumn {
                table: table.to_string(),
            },
            (Method::Put, ["tables", table, "columns", column]) => Self::RenameColumn {
                table: table.to_string(),
                column: column.to_string(),
            },
            (Method::Delete, ["tables", table, "columns", column]) => Self::DropColumn {
                table: table.to_string(),
                column: column.to_string(),
            },

            _ => return Err(ProtocolError::RouteNotFound),
        };
        Ok(route)
    }

    /// Routes reachable without credentials. Key creation is decided by the
    /// handler, since only the very first key may be created anonymously.
    pub fn is_public(&self) -> bool {
        matches!(self, Self::KeysStatus | Self::CreateKey)
    }
}

fn decode_segment(segment: &str) -> ProtocolResult<String> {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .map_err(|_| ProtocolError::InvalidPath(segment.to_string()))
}

/// Split `path?query` into its parts.
pub fn split_query(path: &str) -> (&str, Option<&str>) {
    match path.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (path, None),
    }
}

/// Decode `a=1&b=two` into pairs. Undecodable pairs are skipped.
pub fn parse_query_string(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            let name = urlencoding::decode(name).ok()?.into_owned();
            let value = value.replace('+', " ");
            let value = urlencoding::decode(&value).ok()?.into_owned();
            Some((name, value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_routes() {
        assert_eq!(
            Route::parse(Method::Get, "/api/keys/status").unwrap(),
            Route::KeysStatus
        );
        assert_eq!(
            Route::parse(Method::Post, "/api/keys").unwrap(),
            Route::CreateKey
        );
        assert_eq!(
            Route::parse(Method::Delete, "/api/keys/ci%20bot").unwrap(),
            Route::DeleteKey {
                name: "ci bot".into()
            }
        );
    }

    #[test]
    fn test_table_routes() {
        assert_eq!(
            Route::parse(Method::Get, "/api/tables/users/schema").unwrap(),
            Route::TableSchema {
                table: "users".into()
            }
        );
        assert_eq!(
            Route::parse(Method::Put, "/api/tables/users/rows/7").unwrap(),
            Route::UpdateRow {
                table: "users".into(),
                id: "7".into()
            }
        );
        assert_eq!(
            Route::parse(Method::Get, "/api/tables/users/rows?page=2").unwrap(),
            Route::ListRows {
                table: "users".into()
            }
        );
        assert_eq!(
            Route::parse(Method::Delete, "/api/tables/users/columns/age/").unwrap(),
            Route::DropColumn {
                table: "users".into(),
                column: "age".into()
            }
        );
    }

    #[test]
    fn test_segments_are_decoded_before_matching_parameters() {
        // The decoded name still has to pass identifier validation later.
        assert_eq!(
            Route::parse(Method::Delete, "/api/tables/users%3B%20DROP").unwrap(),
            Route::DropTable {
                table: "users; DROP".into()
            }
        );
    }

    #[test]
    fn test_unknown_routes() {
        assert!(matches!(
            Route::parse(Method::Get, "/api/nothing"),
            Err(ProtocolError::RouteNotFound)
        ));
        assert!(matches!(
            Route::parse(Method::Post, "/api/tables/users"),
            Err(ProtocolError::RouteNotFound)
        ));
        assert!(matches!(
            Route::parse(Method::Get, "/tables"),
            Err(ProtocolError::RouteNotFound)
        ));
    }

    #[test]
    fn test_invalid_encoding() {
        assert!(matches!(
            Route::parse(Method::Get, "/api/tables/%FF/schema"),
            Err(ProtocolError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_parse_query_string() {
        let pairs = parse_query_string("page=2&limit=10&name=a+b&flag");
        assert_eq!(
            pairs,
            vec![
                ("page".to_string(), "2".to_string()),
                ("limit".to_string(), "10".to_string()),
                ("name".to_string(), "a b".to_string()),
                ("flag".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn test_parse_query_string_decodes_values() {
        let pairs = parse_query_string("q=a%20b%2Bc&bad=%FF&t=users");
        assert_eq!(
            pairs,
            vec![
                ("q".to_string(), "a b+c".to_string()),
                ("t".to_string(), "users".to_string()),
            ]
        );
    }

    #[test]
    fn test_public_routes() {
        assert!(Route::KeysStatus.is_public());
        assert!(Route::CreateKey.is_public());
        assert!(!Route::ListKeys.is_public());
        assert!(!Route::Query.is_public());
    }
}
