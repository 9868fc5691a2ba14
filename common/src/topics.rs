pub const TOPIC_SENSOR_READING: &str = "stove/sensor/reading";
pub const TOPIC_APPLIANCE_SUMMARY: &str = "stove/appliance/summary";

pub const TOPIC_CONTROLLER_STATE: &str = "stove/controller/state";

pub const TOPIC_CMD_POWER: &str = "stove/cmnd/appliance/power";
pub const TOPIC_CMD_CONVECTOR: &str = "stove/cmnd/appliance/convector";
