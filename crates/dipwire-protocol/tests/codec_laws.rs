//! Round-trip and rejection laws for the JSON codec.
//!
//! The sample set covers every variant in the catalogue once, so adding a
//! variant without a sample fails `test_samples_cover_catalogue`.

use std::collections::{BTreeMap, HashSet};

use dipwire_protocol::{
    Codec, Document, ErrorType, GameId, GameRole, GameSnapshot, JsonCodec,
    Message, MessageName, Notification, ProtocolError, Request, RequestBody,
    RequestId, Response, ResponseBody, Scope, Token, Vote,
};
use serde_json::json;

fn doc(value: serde_json::Value) -> Document {
    match value {
        serde_json::Value::Object(map) => map,
        _ => panic!("not an object"),
    }
}

fn snapshot() -> GameSnapshot {
    GameSnapshot::new(doc(json!({
        "game_id": "GAME_0001",
        "map_name": "standard",
        "phase": "S1901M",
        "powers": {"FRANCE": {"centers": ["PAR", "BRE", "MAR"]}}
    })))
}

fn channel() -> Scope {
    Scope::Channel {
        token: Token::new("fake_token_abc"),
    }
}

fn game(phase: Option<&str>) -> Scope {
    Scope::Game {
        token: Token::new("fake_token_abc"),
        game_id: GameId::new("GAME_0001"),
        game_role: GameRole::power("FRANCE"),
        phase: phase.map(str::to_string),
    }
}

fn request(scope: Scope, body: RequestBody) -> Message {
    Message::Request(
        Request::new(scope, body).with_request_id(RequestId::generate()),
    )
}

fn response(body: ResponseBody) -> Message {
    Message::Response(Response::new(RequestId::new("r-42"), body))
}

fn samples() -> Vec<Message> {
    let g = || GameId::new("GAME_0001");
    let mut resent = Request::new(game(None), RequestBody::ProcessGame {})
        .with_request_id(RequestId::new("again"));
    resent.re_sent = true;

    vec![
        // Requests
        request(
            Scope::Connection,
            RequestBody::SignIn {
                username: "player1".into(),
                password: "password".into(),
            },
        ),
        request(Scope::Connection, RequestBody::GetDaidePort { game_id: g() }),
        request(
            channel(),
            RequestBody::CreateGame {
                map_name: "standard".into(),
                rules: vec!["NO_PRESS".into(), "IGNORE_ERRORS".into()],
                n_controls: 1,
                deadline: Some(300),
                registration_password: None,
                power_name: Some("FRANCE".into()),
            },
        ),
        request(
            channel(),
            RequestBody::JoinGame {
                game_id: g(),
                power_name: None,
                registration_password: Some("secret".into()),
            },
        ),
        request(
            channel(),
            RequestBody::JoinPowers {
                game_id: g(),
                power_names: vec!["FRANCE".into(), "ITALY".into()],
                registration_password: None,
            },
        ),
        request(
            channel(),
            RequestBody::ListGames {
                game_id_filter: None,
                map_name: Some("standard".into()),
                status: None,
                include_protected: true,
            },
        ),
        request(channel(), RequestBody::GetPlayablePowers { game_id: g() }),
        request(channel(), RequestBody::GetAvailableMaps {}),
        request(channel(), RequestBody::GetDummyWaitingPowers { game_id: g() }),
        request(
            channel(),
            RequestBody::SetGrade {
                username: "player1".into(),
                grade: "admin".into(),
            },
        ),
        request(channel(), RequestBody::DeleteAccount {}),
        request(channel(), RequestBody::Logout {}),
        request(
            game(Some("S1901M")),
            RequestBody::SetOrders {
                orders: vec!["A PAR H".into(), "F BRE - MAO".into()],
            },
        ),
        request(game(None), RequestBody::SetWaitFlag { wait: false }),
        request(
            game(None),
            RequestBody::SendGameMessage {
                recipient: "ENGLAND".into(),
                message: "Shall we talk?".into(),
                message_type: "DIPLOMATIC".into(),
            },
        ),
        request(game(None), RequestBody::GetAllPossibleOrders {}),
        request(
            game(None),
            RequestBody::GetPhaseHistory {
                from_phase: Some("S1901M".into()),
                to_phase: None,
            },
        ),
        Message::Request(resent),
        request(game(None), RequestBody::Vote { vote: Vote::Yes }),
        request(game(None), RequestBody::SaveGame {}),
        request(
            game(None),
            RequestBody::SetGameState {
                state: doc(json!({"phase": "F1901M", "units": {}})),
            },
        ),
        request(
            game(None),
            RequestBody::SetGameStatus {
                status: "active".into(),
            },
        ),
        request(
            game(None),
            RequestBody::SetDummyPowers {
                power_names: vec!["TURKEY".into()],
            },
        ),
        request(game(None), RequestBody::DeleteGame {}),
        request(game(None), RequestBody::LeaveGame {}),
        // Responses
        response(ResponseBody::Ok {}),
        response(ResponseBody::Error {
            error_type: ErrorType::Other("GAME_FULL".into()),
            message: "no seats left".into(),
        }),
        response(ResponseBody::DataToken {
            data: Token::new("fake_token_abc"),
        }),
        response(ResponseBody::DataGame { data: snapshot() }),
        response(ResponseBody::DataGameInfo {
            data: doc(json!({"game_id": "GAME_0001", "status": "FORMING"})),
        }),
        response(ResponseBody::DataGames {
            data: vec![doc(json!({"game_id": "GAME_0001", "n_controls": 7}))],
        }),
        response(ResponseBody::DataMaps {
            data: vec!["standard".into(), "ancmed".into()],
        }),
        response(ResponseBody::DataPowerNames {
            data: vec!["AUSTRIA".into(), "ENGLAND".into()],
        }),
        response(ResponseBody::DataPossibleOrders {
            data: BTreeMap::from([(
                "PAR".to_string(),
                vec!["A PAR H".to_string(), "A PAR - BUR".to_string()],
            )]),
        }),
        response(ResponseBody::DataGamePhases {
            data: vec![doc(json!({"name": "S1901M", "orders": {}}))],
        }),
        response(ResponseBody::DataSavedGame {
            data: doc(json!({"id": "GAME_0001", "phases": []})),
        }),
        response(ResponseBody::DataPort { data: 8434 }),
        // Notifications
        Message::Notification(Notification::GameProcessed {
            game_id: g(),
            phase: "F1901M".into(),
            game_state: snapshot(),
        }),
        Message::Notification(Notification::GamePhaseUpdate {
            game_id: g(),
            phase: "F1901M".into(),
            game_state: snapshot(),
        }),
        Message::Notification(Notification::GameStatusUpdate {
            game_id: g(),
            status: "active".into(),
        }),
        Message::Notification(Notification::PowersControllers {
            game_id: g(),
            controllers: BTreeMap::from([(
                "FRANCE".to_string(),
                "player1".to_string(),
            )]),
        }),
        Message::Notification(Notification::PowerOrdersUpdate {
            game_id: g(),
            power_name: "FRANCE".into(),
            orders: vec!["A PAR H".into()],
            phase: "S1901M".into(),
        }),
        Message::Notification(Notification::PowerOrdersFlag {
            game_id: g(),
            power_name: "FRANCE".into(),
            order_is_set: true,
            phase: "S1901M".into(),
        }),
        Message::Notification(Notification::PowerWaitFlag {
            game_id: g(),
            power_name: "FRANCE".into(),
            wait: true,
        }),
        Message::Notification(Notification::GameMessageReceived {
            game_id: g(),
            sender: "ENGLAND".into(),
            recipient: "FRANCE".into(),
            message: "Agreed.".into(),
            message_type: "DIPLOMATIC".into(),
            time_sent: 1_700_000_000_000_000,
        }),
        Message::Notification(Notification::VoteUpdated {
            game_id: g(),
            votes: BTreeMap::from([("FRANCE".to_string(), "yes".to_string())]),
        }),
        Message::Notification(Notification::VoteCountUpdated {
            game_id: g(),
            count_yes: 3,
            count_no: 1,
        }),
        Message::Notification(Notification::PowerVoteUpdated {
            game_id: g(),
            power_name: "FRANCE".into(),
            vote: "no".into(),
        }),
        Message::Notification(Notification::GameDeleted { game_id: g() }),
        Message::Notification(Notification::OmniscientUpdated {
            game_id: g(),
            omniscient_type: "OMNISCIENT_TYPE".into(),
        }),
        Message::Notification(Notification::AccountDeleted {
            username: "player1".into(),
        }),
        Message::Notification(Notification::ClearedCenters {
            game_id: g(),
            power_name: "FRANCE".into(),
        }),
        Message::Notification(Notification::ClearedOrders {
            game_id: g(),
            power_name: "FRANCE".into(),
            phase: "S1901M".into(),
        }),
        Message::Notification(Notification::ClearedUnits {
            game_id: g(),
            power_name: "FRANCE".into(),
        }),
    ]
}

// =========================================================================
// Round-trip law
// =========================================================================

#[test]
fn test_samples_cover_catalogue() {
    let covered: HashSet<MessageName> =
        samples().iter().map(Message::name).collect();
    for name in MessageName::ALL {
        assert!(covered.contains(name), "no sample for {name}");
    }
}

#[test]
fn test_decode_encode_round_trip_every_sample() {
    let codec = JsonCodec;
    for message in samples() {
        let bytes = codec.encode(&message).expect("encode");
        let decoded = codec.decode(&bytes).expect("decode");
        assert_eq!(decoded, message, "round trip changed {}", message.name());
    }
}

#[test]
fn test_encode_omits_absent_optional_fields() {
    let message = request(
        channel(),
        RequestBody::JoinGame {
            game_id: GameId::new("GAME_0001"),
            power_name: None,
            registration_password: None,
        },
    );
    let bytes = JsonCodec.encode(&message).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    let object = value.as_object().unwrap();
    assert!(!object.contains_key("power_name"));
    assert!(!object.contains_key("registration_password"));
    assert_eq!(object["re_sent"], json!(false));
}

// =========================================================================
// Rejection law
// =========================================================================

#[test]
fn test_decode_missing_name_is_missing_name() {
    let err = JsonCodec
        .decode(br#"{"request_id":"r1","username":"u","password":"p"}"#)
        .unwrap_err();
    assert!(matches!(err, ProtocolError::MissingName));
}

#[test]
fn test_decode_unknown_name_is_unknown_message() {
    let err = JsonCodec
        .decode(br#"{"name":"teleport","request_id":"r1"}"#)
        .unwrap_err();
    match err {
        ProtocolError::UnknownMessage(name) => assert_eq!(name, "teleport"),
        other => panic!("expected UnknownMessage, got {other:?}"),
    }
}

#[test]
fn test_decode_extra_field_rejected_for_every_kind() {
    let frames = [
        json!({"name": "sign_in", "request_id": "r1", "re_sent": false,
               "username": "u", "password": "p", "extra": true}),
        json!({"name": "set_orders", "request_id": "r1", "token": "t",
               "game_id": "g", "game_role": "FRANCE", "orders": [],
               "extra": true}),
        json!({"name": "get_available_maps", "request_id": "r1",
               "token": "t", "extra": true}),
        json!({"name": "ok", "request_id": "r1", "extra": true}),
        json!({"name": "data_port", "request_id": "r1", "data": 1,
               "extra": true}),
        json!({"name": "game_deleted", "game_id": "g", "extra": true}),
    ];
    for frame in frames {
        let bytes = serde_json::to_vec(&frame).unwrap();
        let err = JsonCodec.decode(&bytes).unwrap_err();
        assert!(
            matches!(err, ProtocolError::InvalidBody { .. }),
            "{frame} gave {err:?}"
        );
    }
}

#[test]
fn test_decode_missing_required_field_rejected() {
    let err = JsonCodec
        .decode(br#"{"name":"sign_in","request_id":"r1","username":"u"}"#)
        .unwrap_err();
    assert_eq!(err.message_name(), Some(MessageName::SignIn));
}

#[test]
fn test_decode_game_request_missing_game_role_rejected() {
    let err = JsonCodec
        .decode(
            br#"{"name":"process_game","request_id":"r1","token":"t","game_id":"g"}"#,
        )
        .unwrap_err();
    assert_eq!(err.message_name(), Some(MessageName::ProcessGame));
}

#[test]
fn test_decode_wrong_field_type_rejected() {
    let err = JsonCodec
        .decode(br#"{"name":"data_port","request_id":"r1","data":"8434"}"#)
        .unwrap_err();
    assert!(matches!(err, ProtocolError::InvalidBody { .. }));
}
