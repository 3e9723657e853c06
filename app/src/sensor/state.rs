use serde::Serialize;
use serde_json::Number;

/// Snapshot of the sensor as exposed to consumers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SensorState {
    pub name: String,
    pub state: Option<Number>,
    //true iff the last raw fetch succeeded, regardless of the data it contained
    pub available: bool,
    pub unit_of_measurement: String,
    pub force_update: bool,
}
