//! External data gateway for the Moodle REST API.
//!
//! One method per remote `wsfunction`. Every call carries the shared token
//! and the JSON response-format flag; course and user identifiers are always
//! caller-supplied. Calls time out after [`REQUEST_TIMEOUT_SECS`] and are
//! never retried — a failure belongs to the invocation that caused it.

use super::records::{
    AssignmentCourse, AssignmentCoursesPayload, AttemptsPayload, Conversation,
    ConversationsPayload, Course, Quiz, QuizAttempt, QuizzesPayload, SiteInfo,
};
use crate::config::MoodleSettings;
use crate::error::{ManabuError, Result};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Timeout applied to every outbound Moodle call.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Path of the single REST endpoint all web-service functions share.
const REST_PATH: &str = "webservice/rest/server.php";

/// Authenticated client for the Moodle web-service endpoint.
pub struct MoodleGateway {
    http: reqwest::Client,
    endpoint: Url,
    token: String,
}

impl MoodleGateway {
    /// Create a gateway from settings. Fails if the base URL is not parseable.
    pub fn new(settings: &MoodleSettings) -> Result<Self> {
        let endpoint = Url::parse(&format!(
            "{}/{}",
            settings.base_url.trim_end_matches('/'),
            REST_PATH
        ))
        .map_err(|e| ManabuError::Config(format!("Invalid moodle.base_url: {}", e)))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ManabuError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint,
            token: settings.token.clone(),
        })
    }

    /// Get the calling user's id from the site info function.
    pub async fn site_user_id(&self) -> Result<u64> {
        let info: SiteInfo = self.call("core_webservice_get_site_info", &[]).await?;
        Ok(info.userid)
    }

    /// Fetch all assignments, grouped by course.
    pub async fn assignment_courses(&self) -> Result<Vec<AssignmentCourse>> {
        let payload: AssignmentCoursesPayload =
            self.call("mod_assign_get_assignments", &[]).await?;
        Ok(payload.courses)
    }

    /// Fetch the most recent conversations for a user.
    pub async fn conversations(&self, user_id: u64, limit: u32) -> Result<Vec<Conversation>> {
        let payload: ConversationsPayload = self
            .call(
                "core_message_get_conversations",
                &[
                    ("userid", user_id.to_string()),
                    ("limitfrom", "0".to_string()),
                    ("limitnum", limit.to_string()),
                ],
            )
            .await?;
        Ok(payload.conversations)
    }

    /// Fetch the courses a user is enrolled in.
    pub async fn enrolled_courses(&self, user_id: u64) -> Result<Vec<Course>> {
        self.call(
            "core_enrol_get_users_courses",
            &[("userid", user_id.to_string())],
        )
        .await
    }

    /// Fetch the quizzes of one course.
    pub async fn course_quizzes(&self, course_id: u64) -> Result<Vec<Quiz>> {
        let payload: QuizzesPayload = self
            .call(
                "mod_quiz_get_quizzes_by_courses",
                &[("courseids[0]", course_id.to_string())],
            )
            .await?;
        Ok(payload.quizzes)
    }

    /// Fetch a user's attempts at one quiz.
    pub async fn quiz_attempts(&self, quiz_id: u64, user_id: u64) -> Result<Vec<QuizAttempt>> {
        let payload: AttemptsPayload = self
            .call(
                "mod_quiz_get_user_attempts",
                &[
                    ("quizid", quiz_id.to_string()),
                    ("userid", user_id.to_string()),
                ],
            )
            .await?;
        Ok(payload.attempts)
    }

    /// Issue one authenticated GET and deserialize the JSON response.
    async fn call<T: DeserializeOwned>(
        &self,
        wsfunction: &str,
        extra: &[(&str, String)],
    ) -> Result<T> {
        let params = request_params(&self.token, wsfunction, extra);
        debug!("Calling Moodle function {}", wsfunction);

        let response = self
            .http
            .get(self.endpoint.clone())
            .query(&params)
            .send()
            .await
            .map_err(|e| ManabuError::RemoteUnavailable(format!("{}: {}", wsfunction, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ManabuError::RemoteBadStatus(status.as_u16()));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ManabuError::RemoteMalformedPayload(format!("{}: {}", wsfunction, e)))
    }
}

/// Build the query parameter set for one web-service call.
///
/// The token and the JSON format flag go on every request, followed by the
/// function name and its per-function parameters.
fn request_params(token: &str, wsfunction: &str, extra: &[(&str, String)]) -> Vec<(String, String)> {
    let mut params = vec![
        ("wstoken".to_string(), token.to_string()),
        ("moodlewsrestformat".to_string(), "json".to_string()),
        ("wsfunction".to_string(), wsfunction.to_string()),
    ];
    for (key, value) in extra {
        params.push((key.to_string(), value.clone()));
    }
    params
}
