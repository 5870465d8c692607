use crate::identity::Role;

/// Coordinator configuration.
///
/// Recognized options: the two party ids (either may be absent and resolved
/// later), the caller's role, and the two backend endpoints.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub student_id: Option<i64>,
    pub therapist_id: Option<i64>,
    pub role: Option<Role>,

    /// Base URL of the connection REST API.
    pub api_base: String,

    /// WebSocket endpoint of the push transport.
    pub transport_endpoint: String,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            student_id: None,
            therapist_id: None,
            role: None,
            api_base: "http://localhost:5000/api/connection".to_string(),
            transport_endpoint: "ws://localhost:5000/socket".to_string(),
        }
    }
}

impl CoordinatorConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to defaults when a variable is not set. Calls
    /// `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            student_id: parse_env_id("CARELINK_STUDENT_ID"),
            therapist_id: parse_env_id("CARELINK_THERAPIST_ID"),
            role: std::env::var("CARELINK_ROLE")
                .ok()
                .and_then(|v| v.parse().ok()),
            api_base: std::env::var("CARELINK_API_BASE")
                .unwrap_or_else(|_| Self::default().api_base),
            transport_endpoint: std::env::var("CARELINK_TRANSPORT_ENDPOINT")
                .unwrap_or_else(|_| Self::default().transport_endpoint),
        }
    }

    /// Both party ids, when already configured.
    pub fn identity_pair(&self) -> Option<(i64, i64)> {
        match (self.student_id, self.therapist_id) {
            (Some(student), Some(therapist)) => Some((student, therapist)),
            _ => None,
        }
    }
}

fn parse_env_id(key: &str) -> Option<i64> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
