use super::{malformed, strip_terminator, terminate};
use crate::domain::Observation;
use crate::error::CodecError;

pub fn encode_observation(observation: &Observation) -> Result<String, CodecError> {
    serde_json::to_string(observation)
        .map(terminate)
        .map_err(|e| CodecError::Encode(e.to_string()))
}

/// Decode one observation line.
///
/// Unknown keys are ignored; `tick` and `energy` are required.
pub fn decode_observation(line: &str) -> Result<Observation, CodecError> {
    serde_json::from_str(strip_terminator(line)).map_err(malformed)
}
