//! JSON request handling for line-oriented front ends.
//!
//! Each request is one JSON object tagged by `op`. Each response is one JSON
//! object carrying a `status` code next to the result fields, or next to a
//! `detail` message on failure.

use goldrush_rules::{Direction, EntityKey, GameError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::session::{Caller, GameSession};

/// Status for requests that fail to parse or carry empty fields.
pub const UNPROCESSABLE: u16 = 422;

/// Status for responses that could not be encoded.
pub const INTERNAL_ERROR: u16 = 500;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Register {
        name: String,
        emoji: String,
    },
    Look {
        #[serde(rename = "entityKey")]
        entity_key: String,
    },
    Walk {
        #[serde(rename = "entityKey")]
        entity_key: String,
        direction: Direction,
    },
    Score {
        #[serde(rename = "entityKey")]
        entity_key: String,
    },
    Leaderboard {
        #[serde(rename = "adminToken", default)]
        admin_token: Option<String>,
    },
    AdminWorld {
        #[serde(rename = "adminToken", default)]
        admin_token: Option<String>,
    },
    AdminStop {
        #[serde(rename = "adminToken", default)]
        admin_token: Option<String>,
    },
    AdminRestart {
        #[serde(rename = "adminToken", default)]
        admin_token: Option<String>,
    },
}

/// Parse one request line and answer it.
pub fn handle_line(session: &GameSession, line: &str) -> Value {
    match serde_json::from_str::<Request>(line) {
        Ok(request) => handle(session, request),
        Err(err) => failure(UNPROCESSABLE, err.to_string()),
    }
}

/// Dispatch a request to the session.
pub fn handle(session: &GameSession, request: Request) -> Value {
    let admin_token = session.config().admin_token.as_deref();
    match request {
        Request::Register { name, emoji } => {
            if name.trim().is_empty() || emoji.trim().is_empty() {
                return failure(UNPROCESSABLE, "name and emoji are required".into());
            }
            respond(session.register(name, emoji))
        }
        Request::Look { entity_key } => {
            respond(parse_key(&entity_key).and_then(|key| session.observe(key)))
        }
        Request::Walk {
            entity_key,
            direction,
        } => respond(
            parse_key(&entity_key)
                .and_then(|key| session.move_entity(key, direction))
                .map(|report| {
                    json!({
                        "x": report.position.x,
                        "y": report.position.y,
                        "score": report.score,
                        "outcome": report.outcome,
                        "pickedUpGold": report.picked_up_gold,
                    })
                }),
        ),
        Request::Score { entity_key } => {
            respond(parse_key(&entity_key).and_then(|key| session.get_player(key)))
        }
        Request::Leaderboard { admin_token: given } => respond(
            session
                .leaderboard(caller(admin_token, given))
                .map(|board| json!({ "leaderboard": board })),
        ),
        Request::AdminWorld { admin_token: given } => {
            respond(session.admin_snapshot(caller(admin_token, given)))
        }
        Request::AdminStop { admin_token: given } => respond(
            session
                .admin_stop(caller(admin_token, given))
                .map(|()| json!({ "detail": "game stopped and all data cleared" })),
        ),
        Request::AdminRestart { admin_token: given } => respond(
            session
                .admin_restart(caller(admin_token, given))
                .map(|()| json!({ "detail": "game restarted" })),
        ),
    }
}

/// Malformed keys are reported like unknown ones.
fn parse_key(text: &str) -> Result<EntityKey, GameError> {
    EntityKey::parse(text).ok_or(GameError::NotFound(EntityKey::nil()))
}

/// Privileged only when a token is configured and the request repeats it.
fn caller(expected: Option<&str>, given: Option<String>) -> Caller {
    let authorized = matches!((expected, given), (Some(expected), Some(given)) if expected == given);
    Caller::from_authorized(authorized)
}

fn respond<T: Serialize>(result: Result<T, GameError>) -> Value {
    let value = match result {
        Ok(value) => value,
        Err(err) => return failure(err.status_code(), err.to_string()),
    };
    match serde_json::to_value(value) {
        Ok(Value::Object(mut map)) => {
            map.insert("status".into(), json!(200));
            Value::Object(map)
        }
        Ok(other) => json!({ "status": 200, "result": other }),
        Err(err) => {
            tracing::error!(%err, "failed to encode response");
            failure(INTERNAL_ERROR, err.to_string())
        }
    }
}

fn failure(status: u16, detail: String) -> Value {
    json!({ "status": status, "detail": detail })
}
