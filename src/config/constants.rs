pub const DEFAULT_READY_THRESHOLD: u8 = 90;
pub const DEFAULT_WARN_THRESHOLD: u8 = 70;
pub const DEFAULT_CHECK_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_STAGE_ENDPOINT: &str = "http://127.0.0.1:8080/stages";
pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 2_000;
pub const DEFAULT_STAGE_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_PUBLISH_PLATFORMS: &[&str] = &["youtube", "tiktok"];
pub const DEFAULT_BREAKER_THRESHOLD: u32 = 5;
pub const DEFAULT_BREAKER_COOLDOWN_SECS: u64 = 60;
pub const DEFAULT_TERMINAL_FIELD: &str = "published";

pub const CONFIG_RELATIVE_PATH: &str = ".reelpipe/config";
pub const RECORDS_RELATIVE_PATH: &str = ".reelpipe/records";
