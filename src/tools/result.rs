//! Structured tool results and their user-facing text rendering.

use crate::moodle::shape::{
    to_jst_date, to_jst_string, CourseSummary, DueAssignment, PendingQuiz, UnreadMessage,
};
use serde::Serialize;

/// The structured value a tool invocation produces.
///
/// Always serializable; empty collections are valid results. The
/// "nothing found" sentinels exist only in [`ToolResult::render`], never in
/// the structured value itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolResult {
    UserId { userid: u64 },
    Assignments { assignments: Vec<DueAssignment> },
    Messages { messages: Vec<UnreadMessage> },
    Quizzes { quizzes: Vec<PendingQuiz> },
    Courses { courses: Vec<CourseSummary> },
    /// The gateway could not supply data; rendered as "could not retrieve".
    Unavailable { what: String },
}

impl ToolResult {
    /// Render the result as text for re-insertion into the conversation.
    pub fn render(&self) -> String {
        match self {
            ToolResult::UserId { userid } => format!("Your Moodle user id is {}.", userid),

            ToolResult::Assignments { assignments } => {
                if assignments.is_empty() {
                    return "No assignments are due within the requested window.".to_string();
                }
                let lines: Vec<String> = assignments
                    .iter()
                    .map(|a| format!("- {} / {}: due {}", a.course, a.name, to_jst_date(a.due)))
                    .collect();
                format!("Assignments due soon:\n{}", lines.join("\n"))
            }

            ToolResult::Messages { messages } => {
                if messages.is_empty() {
                    return "No unread messages.".to_string();
                }
                let lines: Vec<String> = messages
                    .iter()
                    .map(|m| match m.sent_at {
                        Some(at) => {
                            format!("From {} ({}): {}", m.sender, to_jst_string(at), m.text)
                        }
                        None => format!("From {}: {}", m.sender, m.text),
                    })
                    .collect();
                format!("Unread messages:\n{}", lines.join("\n"))
            }

            ToolResult::Quizzes { quizzes } => {
                if quizzes.is_empty() {
                    return "No pending quizzes.".to_string();
                }
                let lines: Vec<String> = quizzes
                    .iter()
                    .map(|q| {
                        let due = q
                            .due
                            .map(|d| format!("due {}", to_jst_date(d)))
                            .unwrap_or_else(|| "no deadline".to_string());
                        format!("- {} / {}: {}", q.course, q.name, due)
                    })
                    .collect();
                format!("Pending quizzes:\n{}", lines.join("\n"))
            }

            ToolResult::Courses { courses } => {
                if courses.is_empty() {
                    return "You are not enrolled in any courses.".to_string();
                }
                let lines: Vec<String> = courses
                    .iter()
                    .map(|c| format!("- {} ({}, id {})", c.fullname, c.shortname, c.id))
                    .collect();
                format!("Enrolled courses:\n{}", lines.join("\n"))
            }

            ToolResult::Unavailable { what } => format!("Could not retrieve {}.", what),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_empty_results_render_sentinels() {
        let empty = ToolResult::Assignments {
            assignments: vec![],
        };
        assert_eq!(
            empty.render(),
            "No assignments are due within the requested window."
        );
        assert_eq!(
            ToolResult::Messages { messages: vec![] }.render(),
            "No unread messages."
        );
        assert_eq!(
            ToolResult::Quizzes { quizzes: vec![] }.render(),
            "No pending quizzes."
        );
    }

    #[test]
    fn test_empty_structured_result_is_well_formed_json() {
        let json = serde_json::to_value(ToolResult::Assignments {
            assignments: vec![],
        })
        .unwrap();
        assert_eq!(json["kind"], "assignments");
        assert!(json["assignments"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_assignments_render_course_name_and_date() {
        let result = ToolResult::Assignments {
            assignments: vec![DueAssignment {
                course: "Databases".to_string(),
                name: "ER modelling".to_string(),
                due: Utc.with_ymd_and_hms(2025, 6, 3, 0, 0, 0).unwrap(),
            }],
        };
        let text = result.render();
        assert!(text.contains("Databases / ER modelling"));
        assert!(text.contains("2025-06-03"));
    }

    #[test]
    fn test_message_timestamps_render_as_jst() {
        let result = ToolResult::Messages {
            messages: vec![UnreadMessage {
                sender: "Prof. Tanaka".to_string(),
                text: "Room change".to_string(),
                sent_at: Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()),
            }],
        };
        assert!(result.render().contains("2025-01-01 09:00:00 JST"));
    }

    #[test]
    fn test_quiz_without_deadline_renders_placeholder() {
        let result = ToolResult::Quizzes {
            quizzes: vec![PendingQuiz {
                course: "Statistics".to_string(),
                name: "Week 4 quiz".to_string(),
                due: None,
            }],
        };
        assert!(result.render().contains("no deadline"));
    }

    #[test]
    fn test_unavailable_renders_could_not_retrieve() {
        let result = ToolResult::Unavailable {
            what: "assignments".to_string(),
        };
        assert_eq!(result.render(), "Could not retrieve assignments.");
    }
}
