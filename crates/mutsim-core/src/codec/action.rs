use serde::{Deserialize, Serialize};

use super::{malformed, strip_terminator, terminate};
use crate::domain::{Action, Direction};
use crate::error::CodecError;

/// Outgoing shape: `{"action":"attack","target":"north"}`.
#[derive(Serialize)]
struct ActionOut {
    action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<Direction>,
}

/// Incoming shape, before the variant is checked.
///
/// `target` stays untyped here so that a junk target on a `rest` reply is
/// ignored like any other unknown field.
#[derive(Deserialize)]
struct ActionWire {
    action: String,
    #[serde(default)]
    target: Option<serde_json::Value>,
}

impl TryFrom<ActionWire> for Action {
    type Error = CodecError;

    fn try_from(wire: ActionWire) -> Result<Self, Self::Error> {
        match wire.action.as_str() {
            "rest" => Ok(Action::Rest),
            "replicate" => Ok(Action::Replicate),
            "attack" => {
                let target = wire.target.ok_or_else(|| {
                    CodecError::MalformedMessage("attack: missing field `target`".to_string())
                })?;
                let target = target
                    .as_str()
                    .ok_or_else(|| {
                        CodecError::MalformedMessage(format!("attack: target {target} is not a string"))
                    })?
                    .parse::<Direction>()
                    .map_err(|e| CodecError::MalformedMessage(format!("attack: {e}")))?;
                Ok(Action::Attack { target })
            }
            other => Err(CodecError::UnknownActionVariant(other.to_string())),
        }
    }
}

pub fn encode_action(action: &Action) -> Result<String, CodecError> {
    let out = ActionOut {
        action: action.name(),
        target: match action {
            Action::Attack { target } => Some(*target),
            _ => None,
        },
    };
    serde_json::to_string(&out)
        .map(terminate)
        .map_err(|e| CodecError::Encode(e.to_string()))
}

/// Decode one action line.
///
/// Garbage and missing/invalid fields are `MalformedMessage`; a well-formed
/// record naming an action we do not support is `UnknownActionVariant`.
pub fn decode_action(line: &str) -> Result<Action, CodecError> {
    let wire: ActionWire = serde_json::from_str(strip_terminator(line)).map_err(malformed)?;
    Action::try_from(wire)
}
