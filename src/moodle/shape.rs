//! Result shaping: pure functions from raw Moodle payloads to tool values.
//!
//! Filtering always compares UTC instants; timestamps are rendered to a
//! UTC+9 calendar string only at the display boundary.

use super::records::{AssignmentCourse, Conversation, QuizAttempt};
use chrono::{DateTime, Duration, FixedOffset, Utc};
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// An assignment due inside the requested window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DueAssignment {
    pub course: String,
    pub name: String,
    pub due: DateTime<Utc>,
}

/// One unread message with its sender and (optional) send instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnreadMessage {
    pub sender: String,
    pub text: String,
    pub sent_at: Option<DateTime<Utc>>,
}

/// A quiz the user has not completed yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingQuiz {
    pub course: String,
    pub name: String,
    pub due: Option<DateTime<Utc>>,
}

/// An enrolled course.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseSummary {
    pub id: u64,
    pub shortname: String,
    pub fullname: String,
}

/// Assignments whose due date falls within `now <= due <= now + days`.
///
/// Both boundaries are inclusive. Assignments without a due date are
/// excluded. Results are sorted by due date so rendering is deterministic.
pub fn assignments_due_within(
    courses: &[AssignmentCourse],
    now: DateTime<Utc>,
    days: u64,
) -> Vec<DueAssignment> {
    let deadline = window_end(now, days);
    let mut results: Vec<DueAssignment> = courses
        .iter()
        .flat_map(|course| {
            course.assignments.iter().filter_map(|a| {
                let due = a.due()?;
                (now <= due && due <= deadline).then(|| DueAssignment {
                    course: course.fullname.clone(),
                    name: a.name.clone(),
                    due,
                })
            })
        })
        .collect();
    results.sort_by_key(|a| a.due);
    results
}

/// Flatten unread conversations into individual messages.
///
/// Conversations flagged as read are skipped. Message bodies arrive as HTML
/// and are reduced to plain text; the sender is the first listed member.
pub fn unread_messages(conversations: &[Conversation]) -> Vec<UnreadMessage> {
    conversations
        .iter()
        .filter(|conv| !conv.isread)
        .flat_map(|conv| {
            let sender = conv
                .members
                .first()
                .map(|m| m.fullname.clone())
                .unwrap_or_else(|| "unknown".to_string());
            conv.messages.iter().map(move |msg| UnreadMessage {
                sender: sender.clone(),
                text: strip_html(&msg.text),
                sent_at: msg.sent_at(),
            })
        })
        .collect()
}

/// Whether a quiz due date falls inside the requested window.
///
/// With no window requested every quiz passes; with a window, quizzes
/// without a due date still pass (they can be taken any time).
pub fn quiz_in_window(due: Option<DateTime<Utc>>, now: DateTime<Utc>, days: Option<u64>) -> bool {
    match (days, due) {
        (None, _) => true,
        (Some(_), None) => true,
        (Some(days), Some(due)) => now <= due && due <= window_end(now, days),
    }
}

/// Upper end of a day window, saturating at the maximum representable
/// instant. An oversized window therefore matches every future due date
/// instead of overflowing.
fn window_end(now: DateTime<Utc>, days: u64) -> DateTime<Utc> {
    i64::try_from(days)
        .ok()
        .and_then(Duration::try_days)
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// A quiz is pending iff it has no attempts, or at least one attempt still
/// in progress or overdue.
pub fn quiz_is_pending(attempts: &[QuizAttempt]) -> bool {
    attempts.is_empty()
        || attempts
            .iter()
            .any(|a| a.state == "inprogress" || a.state == "overdue")
}

/// Remove all HTML markup tags, leaving plain text.
pub fn strip_html(html: &str) -> String {
    fn tag_pattern() -> &'static Regex {
        static TAG: OnceLock<Regex> = OnceLock::new();
        TAG.get_or_init(|| Regex::new(r"<[^>]+>").expect("Invalid regex"))
    }
    tag_pattern().replace_all(html, "").trim().to_string()
}

/// Render an instant as a UTC+9 timestamp string, suffixed "JST".
pub fn to_jst_string(instant: DateTime<Utc>) -> String {
    instant
        .with_timezone(&jst())
        .format("%Y-%m-%d %H:%M:%S JST")
        .to_string()
}

/// Render an instant as a UTC+9 calendar date.
pub fn to_jst_date(instant: DateTime<Utc>) -> String {
    instant.with_timezone(&jst()).format("%Y-%m-%d").to_string()
}

fn jst() -> FixedOffset {
    FixedOffset::east_opt(9 * 3600).expect("Valid offset")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moodle::records::{Assignment, ConversationMember, ConversationMessage};
    use chrono::TimeZone;

    fn course_with_due_dates(dues: &[i64]) -> Vec<AssignmentCourse> {
        vec![AssignmentCourse {
            fullname: "Databases".to_string(),
            assignments: dues
                .iter()
                .enumerate()
                .map(|(i, due)| Assignment {
                    name: format!("Assignment {}", i + 1),
                    duedate: *due,
                })
                .collect(),
        }]
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_due_window_is_inclusive_at_both_ends() {
        let now = now();
        let at_start = now.timestamp();
        let at_end = (now + Duration::days(3)).timestamp();
        let courses = course_with_due_dates(&[at_start, at_end]);

        let due = assignments_due_within(&courses, now, 3);
        assert_eq!(due.len(), 2);
    }

    #[test]
    fn test_due_window_excludes_past_and_far_future() {
        let now = now();
        let yesterday = (now - Duration::days(1)).timestamp();
        let in_two_days = (now + Duration::days(2)).timestamp();
        let in_five_days = (now + Duration::days(5)).timestamp();
        let courses = course_with_due_dates(&[yesterday, in_two_days, in_five_days]);

        let due = assignments_due_within(&courses, now, 3);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].name, "Assignment 2");
    }

    #[test]
    fn test_assignments_without_due_date_are_excluded() {
        let courses = course_with_due_dates(&[0]);
        assert!(assignments_due_within(&courses, now(), 30).is_empty());
    }

    #[test]
    fn test_empty_course_list_shapes_to_empty_result() {
        assert!(assignments_due_within(&[], now(), 3).is_empty());
    }

    #[test]
    fn test_results_sorted_by_due_date() {
        let now = now();
        let later = (now + Duration::days(2)).timestamp();
        let sooner = (now + Duration::days(1)).timestamp();
        let courses = course_with_due_dates(&[later, sooner]);

        let due = assignments_due_within(&courses, now, 3);
        assert_eq!(due[0].name, "Assignment 2");
        assert_eq!(due[1].name, "Assignment 1");
    }

    #[test]
    fn test_oversized_window_saturates() {
        let now = now();
        let next_year = (now + Duration::days(365)).timestamp();
        let courses = course_with_due_dates(&[next_year]);

        let due = assignments_due_within(&courses, now, 200_000_000_000);
        assert_eq!(due.len(), 1);
    }

    #[test]
    fn test_oversized_quiz_window_matches_future_due_dates() {
        let now = now();
        assert!(quiz_in_window(
            Some(now + Duration::days(10)),
            now,
            Some(400_000_000)
        ));
    }

    #[test]
    fn test_unread_messages_skip_read_conversations() {
        let conversations = vec![
            Conversation {
                isread: true,
                members: vec![ConversationMember {
                    fullname: "Prof. Sato".to_string(),
                }],
                messages: vec![ConversationMessage {
                    text: "<p>old</p>".to_string(),
                    timecreated: 1735689600,
                }],
            },
            Conversation {
                isread: false,
                members: vec![ConversationMember {
                    fullname: "Prof. Tanaka".to_string(),
                }],
                messages: vec![ConversationMessage {
                    text: "<p>Class is <b>cancelled</b> tomorrow.</p>".to_string(),
                    timecreated: 1735689600,
                }],
            },
        ];

        let unread = unread_messages(&conversations);
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].sender, "Prof. Tanaka");
        assert_eq!(unread[0].text, "Class is cancelled tomorrow.");
    }

    #[test]
    fn test_unread_sender_falls_back_to_unknown() {
        let conversations = vec![Conversation {
            isread: false,
            members: vec![],
            messages: vec![ConversationMessage {
                text: "hi".to_string(),
                timecreated: 0,
            }],
        }];
        let unread = unread_messages(&conversations);
        assert_eq!(unread[0].sender, "unknown");
        assert!(unread[0].sent_at.is_none());
    }

    #[test]
    fn test_strip_html_removes_all_tags() {
        assert_eq!(strip_html("<p>Hello <b>world</b></p>"), "Hello world");
        assert_eq!(strip_html("plain"), "plain");
        assert_eq!(strip_html("  <br/>  "), "");
    }

    #[test]
    fn test_jst_rendering_shifts_nine_hours() {
        // 2025-01-01 00:00:00 UTC is 09:00 the same day in JST
        let instant = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(to_jst_string(instant), "2025-01-01 09:00:00 JST");
        // 23:00 UTC rolls over to the next JST day
        let late = Utc.with_ymd_and_hms(2025, 1, 1, 23, 0, 0).unwrap();
        assert_eq!(to_jst_date(late), "2025-01-02");
    }

    #[test]
    fn test_quiz_pending_rules() {
        let state = |s: &str| QuizAttempt {
            state: s.to_string(),
        };
        assert!(quiz_is_pending(&[]));
        assert!(quiz_is_pending(&[state("inprogress")]));
        assert!(quiz_is_pending(&[state("finished"), state("overdue")]));
        assert!(!quiz_is_pending(&[state("finished")]));
    }

    #[test]
    fn test_quiz_window_rules() {
        let now = now();
        let in_two = Some(now + Duration::days(2));
        let in_ten = Some(now + Duration::days(10));

        // No window requested: everything passes
        assert!(quiz_in_window(in_ten, now, None));
        // Window requested: same inclusive rule as assignments
        assert!(quiz_in_window(in_two, now, Some(3)));
        assert!(!quiz_in_window(in_ten, now, Some(3)));
        assert!(quiz_in_window(Some(now), now, Some(0)));
        // No due date: can be taken any time, passes regardless of window
        assert!(quiz_in_window(None, now, Some(3)));
    }
}
