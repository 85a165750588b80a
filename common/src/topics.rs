pub const TOPIC_SENSOR_TEMP: &str = "hvac/sensor/temperature";

pub const TOPIC_CONTROLLER_STATE: &str = "hvac/controller/state";

pub const TOPIC_CMD_MODE: &str = "hvac/cmnd/mode";
pub const TOPIC_CMD_FAN: &str = "hvac/cmnd/fan";
pub const TOPIC_CMD_COOL_SETPOINT: &str = "hvac/cmnd/setpoint/cool";
pub const TOPIC_CMD_HEAT_SETPOINT: &str = "hvac/cmnd/setpoint/heat";

pub const COMMAND_TOPICS: [&str; 5] = [
    TOPIC_SENSOR_TEMP,
    TOPIC_CMD_MODE,
    TOPIC_CMD_FAN,
    TOPIC_CMD_COOL_SETPOINT,
    TOPIC_CMD_HEAT_SETPOINT,
];
