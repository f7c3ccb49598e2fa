/// Application name
pub const APP_NAME: &str = "Dosewise";

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Minimum accepted password length at registration
pub const MIN_PASSWORD_LEN: usize = 6;

/// Oldest accepted patient age
pub const MAX_PATIENT_AGE: u32 = 130;

/// Default adherence window in days (dashboards and clinic roster)
pub const DEFAULT_ADHERENCE_DAYS: u32 = 7;

/// Default session lifetime in hours (30 days)
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 720;

/// How long a clinician's "resolved" mark applies to a recomputed alert
pub const ALERT_RESOLUTION_TTL_HOURS: i64 = 24;

/// Client refresh cadences, in seconds
pub const SHARED_PATIENTS_REFRESH_SECS: u64 = 30;
pub const CLINIC_ALERTS_REFRESH_SECS: u64 = 60;
pub const TODAY_LOGS_REFRESH_SECS: u64 = 60;

/// Client-side navigation targets
pub const ROUTE_PROFILE_CHOICE: &str = "/auth/profile-choice";
pub const ROUTE_PATIENT_DASHBOARD: &str = "/patient/dashboard";
pub const ROUTE_CLINIC_DASHBOARD: &str = "/clinic/dashboard";
