//! Server-to-client responses.

use serde::{Deserialize, Serialize};

use crate::{Document, ErrorType, GameSnapshot, MessageName, PossibleOrders, RequestId, Token};

/// A response: the id of the request it answers, plus the body.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub request_id: RequestId,
    pub body: ResponseBody,
}

impl Response {
    /// A response to `request_id` carrying `body`.
    pub fn new(request_id: RequestId, body: ResponseBody) -> Self {
        Self { request_id, body }
    }

    /// A generic success marker.
    pub fn ok(request_id: RequestId) -> Self {
        Self::new(request_id, ResponseBody::Ok {})
    }

    /// A typed error.
    pub fn error(
        request_id: RequestId,
        error_type: ErrorType,
        message: impl Into<String>,
    ) -> Self {
        Self::new(
            request_id,
            ResponseBody::Error {
                error_type,
                message: message.into(),
            },
        )
    }

    pub fn name(&self) -> MessageName {
        self.body.name()
    }
}

/// Response payloads, discriminated by `name`.
///
/// Every `data_*` variant carries its payload under a single `data` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case", deny_unknown_fields)]
pub enum ResponseBody {
    Ok {},
    Error { error_type: ErrorType, message: String },
    DataToken { data: Token },
    DataGame { data: GameSnapshot },
    DataGameInfo { data: Document },
    DataGames { data: Vec<Document> },
    DataMaps { data: Vec<String> },
    DataPowerNames { data: Vec<String> },
    DataPossibleOrders { data: PossibleOrders },
    DataGamePhases { data: Vec<Document> },
    DataSavedGame { data: Document },
    DataPort { data: u16 },
}

impl ResponseBody {
    pub fn name(&self) -> MessageName {
        match self {
            Self::Ok {} => MessageName::Ok,
            Self::Error { .. } => MessageName::Error,
            Self::DataToken { .. } => MessageName::DataToken,
            Self::DataGame { .. } => MessageName::DataGame,
            Self::DataGameInfo { .. } => MessageName::DataGameInfo,
            Self::DataGames { .. } => MessageName::DataGames,
            Self::DataMaps { .. } => MessageName::DataMaps,
            Self::DataPowerNames { .. } => MessageName::DataPowerNames,
            Self::DataPossibleOrders { .. } => MessageName::DataPossibleOrders,
            Self::DataGamePhases { .. } => MessageName::DataGamePhases,
            Self::DataSavedGame { .. } => MessageName::DataSavedGame,
            Self::DataPort { .. } => MessageName::DataPort,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_response_json_format() {
        let body = ResponseBody::Error {
            error_type: ErrorType::GameNotFound,
            message: "Game NONEXISTENT not found".into(),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["name"], "error");
        assert_eq!(value["error_type"], "GAME_NOT_FOUND");
        assert_eq!(value["message"], "Game NONEXISTENT not found");
    }

    #[test]
    fn test_ok_response_serializes_name_only() {
        let value = serde_json::to_value(ResponseBody::Ok {}).unwrap();
        assert_eq!(value, json!({"name": "ok"}));
    }

    #[test]
    fn test_data_possible_orders_shape() {
        let body: ResponseBody = serde_json::from_value(json!({
            "name": "data_possible_orders",
            "data": {"PAR": ["A PAR H", "A PAR - BUR"]}
        }))
        .unwrap();
        match body {
            ResponseBody::DataPossibleOrders { data } => {
                assert_eq!(data["PAR"], vec!["A PAR H", "A PAR - BUR"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_response_helpers() {
        let id = RequestId::new("r1");
        assert_eq!(Response::ok(id.clone()).name(), MessageName::Ok);
        let err = Response::error(id, ErrorType::Parsing, "bad");
        assert!(err.body.is_error());
    }
}
