//! Payload shapes returned by the Moodle web-service functions.
//!
//! Moodle responses are function-specific: assignments arrive nested under
//! courses, messages nested under conversations, and courses/quizzes/attempts
//! as flat lists. Timestamps are Unix seconds; `0` means "no due date".

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Response of `core_webservice_get_site_info` (only the field we need).
#[derive(Debug, Clone, Deserialize)]
pub struct SiteInfo {
    pub userid: u64,
}

/// Response of `mod_assign_get_assignments`.
#[derive(Debug, Clone, Deserialize)]
pub struct AssignmentCoursesPayload {
    #[serde(default)]
    pub courses: Vec<AssignmentCourse>,
}

/// A course with its assignments.
#[derive(Debug, Clone, Deserialize)]
pub struct AssignmentCourse {
    pub fullname: String,
    #[serde(default)]
    pub assignments: Vec<Assignment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Assignment {
    pub name: String,
    #[serde(default)]
    pub duedate: i64,
}

impl Assignment {
    /// Due date as an absolute instant, None when the assignment has none.
    pub fn due(&self) -> Option<DateTime<Utc>> {
        instant(self.duedate)
    }
}

/// Response of `core_message_get_conversations`.
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationsPayload {
    #[serde(default)]
    pub conversations: Vec<Conversation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Conversation {
    #[serde(default = "default_isread")]
    pub isread: bool,
    #[serde(default)]
    pub members: Vec<ConversationMember>,
    #[serde(default)]
    pub messages: Vec<ConversationMessage>,
}

fn default_isread() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConversationMember {
    pub fullname: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConversationMessage {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub timecreated: i64,
}

impl ConversationMessage {
    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        instant(self.timecreated)
    }
}

/// One entry of the `core_enrol_get_users_courses` list (a bare JSON array).
#[derive(Debug, Clone, Deserialize)]
pub struct Course {
    pub id: u64,
    #[serde(default)]
    pub shortname: String,
    pub fullname: String,
}

/// Response of `mod_quiz_get_quizzes_by_courses`.
#[derive(Debug, Clone, Deserialize)]
pub struct QuizzesPayload {
    #[serde(default)]
    pub quizzes: Vec<Quiz>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Quiz {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub timedue: i64,
}

impl Quiz {
    pub fn due(&self) -> Option<DateTime<Utc>> {
        instant(self.timedue)
    }
}

/// Response of `mod_quiz_get_user_attempts`.
#[derive(Debug, Clone, Deserialize)]
pub struct AttemptsPayload {
    #[serde(default)]
    pub attempts: Vec<QuizAttempt>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuizAttempt {
    pub state: String,
}

/// Convert a Moodle Unix timestamp to an instant; 0 means "not set".
fn instant(unix: i64) -> Option<DateTime<Utc>> {
    if unix <= 0 {
        return None;
    }
    DateTime::from_timestamp(unix, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_timestamp_means_no_due_date() {
        let assignment = Assignment {
            name: "Report".to_string(),
            duedate: 0,
        };
        assert!(assignment.due().is_none());
    }

    #[test]
    fn test_assignments_nested_under_courses() {
        let json = r#"{
            "courses": [
                {
                    "fullname": "Linear Algebra",
                    "assignments": [{"name": "Problem set 1", "duedate": 1735689600}]
                }
            ]
        }"#;
        let payload: AssignmentCoursesPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.courses.len(), 1);
        assert_eq!(payload.courses[0].assignments[0].name, "Problem set 1");
        assert!(payload.courses[0].assignments[0].due().is_some());
    }

    #[test]
    fn test_conversation_isread_defaults_to_true() {
        let conv: Conversation = serde_json::from_str(r#"{"members": [], "messages": []}"#).unwrap();
        assert!(conv.isread);
    }
}
