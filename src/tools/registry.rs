//! The tool registry: catalog lookup and the single dispatch table.

use super::catalog::catalog;
use super::descriptor::ToolDescriptor;
use super::result::ToolResult;
use super::ToolHost;
use crate::error::{ManabuError, Result};
use crate::moodle::shape::{
    assignments_due_within, quiz_in_window, quiz_is_pending, unread_messages, CourseSummary,
    PendingQuiz,
};
use crate::moodle::MoodleGateway;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::warn;

/// How many conversations to fetch when checking for unread messages.
const CONVERSATION_FETCH_LIMIT: u32 = 10;

/// Static catalog of callable tools plus their implementations.
///
/// Holds no mutable state; all side effects are delegated to the gateway.
pub struct ToolRegistry {
    gateway: Arc<MoodleGateway>,
    tools: Vec<ToolDescriptor>,
}

impl ToolRegistry {
    pub fn new(gateway: Arc<MoodleGateway>) -> Self {
        Self {
            gateway,
            tools: catalog(),
        }
    }

    /// The catalog, in declaration order.
    pub fn list(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    /// Look up a tool by name.
    pub fn find(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|t| t.name == name)
    }

    /// Validate arguments against the tool's schema and execute it.
    ///
    /// Gateway failures do not escape here; they become an `Unavailable`
    /// result so the model can tell the user what could not be fetched.
    pub async fn invoke(&self, name: &str, arguments: &Map<String, Value>) -> Result<ToolResult> {
        let descriptor = self
            .find(name)
            .ok_or_else(|| ManabuError::UnknownTool(name.to_string()))?;
        descriptor.validate(arguments)?;

        match name {
            "get_my_userid" => Ok(self.fetch_user_id().await),
            "get_due_assignments" => {
                let days = required_days(arguments)?;
                Ok(self.fetch_due_assignments(days).await)
            }
            "check_new_messages" => Ok(self.fetch_new_messages().await),
            "get_pending_quizzes" => {
                let days = optional_days(arguments)?;
                Ok(self.fetch_pending_quizzes(days).await)
            }
            "get_my_courses" => Ok(self.fetch_courses().await),
            // A catalog entry without a dispatch arm is a bug; treat it the
            // same as a name the catalog never contained.
            _ => Err(ManabuError::UnknownTool(name.to_string())),
        }
    }

    async fn fetch_user_id(&self) -> ToolResult {
        match self.gateway.site_user_id().await {
            Ok(userid) => ToolResult::UserId { userid },
            Err(e) => unavailable("your user id", e),
        }
    }

    async fn fetch_due_assignments(&self, days: u64) -> ToolResult {
        match self.gateway.assignment_courses().await {
            Ok(courses) => ToolResult::Assignments {
                assignments: assignments_due_within(&courses, Utc::now(), days),
            },
            Err(e) => unavailable("assignments", e),
        }
    }

    async fn fetch_new_messages(&self) -> ToolResult {
        let user_id = match self.gateway.site_user_id().await {
            Ok(id) => id,
            Err(e) => return unavailable("messages", e),
        };
        match self
            .gateway
            .conversations(user_id, CONVERSATION_FETCH_LIMIT)
            .await
        {
            Ok(conversations) => ToolResult::Messages {
                messages: unread_messages(&conversations),
            },
            Err(e) => unavailable("messages", e),
        }
    }

    async fn fetch_pending_quizzes(&self, days: Option<u64>) -> ToolResult {
        let user_id = match self.gateway.site_user_id().await {
            Ok(id) => id,
            Err(e) => return unavailable("quizzes", e),
        };
        let courses = match self.gateway.enrolled_courses(user_id).await {
            Ok(courses) => courses,
            Err(e) => return unavailable("your courses", e),
        };

        let now = Utc::now();
        let mut pending = Vec::new();

        for course in courses {
            let quizzes = match self.gateway.course_quizzes(course.id).await {
                Ok(quizzes) => quizzes,
                Err(e) => {
                    warn!("Skipping quizzes of course {}: {}", course.id, e);
                    continue;
                }
            };

            for quiz in quizzes {
                // Apply the window before fetching attempts; quizzes outside
                // it never cost an extra round trip.
                if !quiz_in_window(quiz.due(), now, days) {
                    continue;
                }
                let attempts = match self.gateway.quiz_attempts(quiz.id, user_id).await {
                    Ok(attempts) => attempts,
                    Err(e) => {
                        warn!("Skipping attempts of quiz {}: {}", quiz.id, e);
                        continue;
                    }
                };
                if quiz_is_pending(&attempts) {
                    let due = quiz.due();
                    pending.push(PendingQuiz {
                        course: course.fullname.clone(),
                        name: quiz.name,
                        due,
                    });
                }
            }
        }

        ToolResult::Quizzes { quizzes: pending }
    }

    async fn fetch_courses(&self) -> ToolResult {
        let user_id = match self.gateway.site_user_id().await {
            Ok(id) => id,
            Err(e) => return unavailable("your courses", e),
        };
        match self.gateway.enrolled_courses(user_id).await {
            Ok(courses) => ToolResult::Courses {
                courses: courses
                    .into_iter()
                    .map(|c| CourseSummary {
                        id: c.id,
                        shortname: c.shortname,
                        fullname: c.fullname,
                    })
                    .collect(),
            },
            Err(e) => unavailable("your courses", e),
        }
    }
}

#[async_trait]
impl ToolHost for ToolRegistry {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        Ok(self.tools.clone())
    }

    async fn invoke(&self, name: &str, arguments: &Map<String, Value>) -> Result<String> {
        Ok(ToolRegistry::invoke(self, name, arguments).await?.render())
    }
}

/// Log a gateway failure and degrade it to an `Unavailable` result.
fn unavailable(what: &str, error: ManabuError) -> ToolResult {
    warn!("Gateway failure while fetching {}: {}", what, error);
    ToolResult::Unavailable {
        what: what.to_string(),
    }
}

fn required_days(arguments: &Map<String, Value>) -> Result<u64> {
    match arguments.get("days") {
        Some(value) => non_negative_days(value),
        None => Err(ManabuError::InvalidArguments(
            "missing required parameter 'days'".to_string(),
        )),
    }
}

fn optional_days(arguments: &Map<String, Value>) -> Result<Option<u64>> {
    arguments.get("days").map(non_negative_days).transpose()
}

fn non_negative_days(value: &Value) -> Result<u64> {
    value.as_u64().ok_or_else(|| {
        ManabuError::InvalidArguments("'days' must be a non-negative integer".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MoodleSettings;
    use serde_json::json;

    fn registry() -> ToolRegistry {
        let settings = MoodleSettings {
            base_url: "https://lms.example.ac.jp".to_string(),
            token: "test-token".to_string(),
        };
        ToolRegistry::new(Arc::new(MoodleGateway::new(&settings).unwrap()))
    }

    fn args(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_list_and_find_return_descriptors_unchanged() {
        let registry = registry();
        let listed = registry.list().to_vec();
        assert_eq!(listed, catalog());

        let found = registry.find("get_due_assignments").unwrap();
        assert_eq!(found, &listed[1]);
        assert!(registry.find("no_such_tool").is_none());
    }

    #[tokio::test]
    async fn test_invoke_unknown_tool_fails() {
        let result = registry().invoke("drop_tables", &Map::new()).await;
        assert!(matches!(result, Err(ManabuError::UnknownTool(_))));
    }

    #[tokio::test]
    async fn test_invoke_rejects_missing_required_days() {
        let result = registry().invoke("get_due_assignments", &Map::new()).await;
        assert!(matches!(result, Err(ManabuError::InvalidArguments(_))));
    }

    #[tokio::test]
    async fn test_invoke_rejects_negative_days() {
        let result = registry()
            .invoke("get_due_assignments", &args(&[("days", json!(-2))]))
            .await;
        assert!(matches!(result, Err(ManabuError::InvalidArguments(_))));
    }

    #[tokio::test]
    async fn test_invoke_rejects_days_of_wrong_type() {
        let result = registry()
            .invoke("get_pending_quizzes", &args(&[("days", json!("soon"))]))
            .await;
        assert!(matches!(result, Err(ManabuError::InvalidArguments(_))));
    }

    #[test]
    fn test_day_extraction() {
        assert_eq!(required_days(&args(&[("days", json!(3))])).unwrap(), 3);
        assert_eq!(optional_days(&Map::new()).unwrap(), None);
        assert_eq!(
            optional_days(&args(&[("days", json!(7))])).unwrap(),
            Some(7)
        );
    }
}
