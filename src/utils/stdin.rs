use crate::errors::StepError;
use serde_json::{Map, Value};
use std::io::Read;

/// Where the Data Flow payload comes from.
pub enum PayloadSource<'a> {
    Reader(Box<dyn Read + 'a>),
    Text(&'a str),
    Map(Map<String, Value>),
}

impl PayloadSource<'static> {
    pub fn stdin() -> Self {
        PayloadSource::Reader(Box::new(std::io::stdin()))
    }
}

pub fn read_payload(source: PayloadSource<'_>) -> Result<Map<String, Value>, StepError> {
    let value: Value = match source {
        PayloadSource::Reader(reader) => serde_json::from_reader(reader)?,
        PayloadSource::Text(text) => serde_json::from_str(text)?,
        PayloadSource::Map(map) => return Ok(map),
    };
    match value {
        Value::Object(map) => Ok(map),
        other => Err(StepError::invalid_payload(format!(
            "Data Flow payload must be a JSON object, got {}",
            json_type_name(&other)
        ))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
