pub const PATH_UPDATE_DATA: &str = "/api/p/stable-room-device/update-data";
pub const PATH_THRESHOLD: &str = "/api/p/stable-room-device/threshold";
pub const PATH_ALERT_MAIL: &str = "/api/p/stable-room-device/alert-mail";
pub const PATH_DEVICE: &str = "/api/p/stable-room-device/device";
