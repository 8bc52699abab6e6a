//! The static tool catalog.

use super::descriptor::{ParamType, ToolDescriptor};

/// All tools the assistant may offer to the model, in catalog order.
///
/// The order is stable: it is echoed verbatim into model prompts and tests
/// depend on it.
pub fn catalog() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new(
            "get_my_userid",
            "Get the calling user's Moodle user id.",
        ),
        ToolDescriptor::new(
            "get_due_assignments",
            "Get Moodle assignments whose deadline falls within the given number of days from today.",
        )
        .with_param(
            "days",
            ParamType::Integer,
            "How many days from today to include",
            true,
        ),
        ToolDescriptor::new(
            "check_new_messages",
            "Get unread Moodle messages with sender and time received.",
        ),
        ToolDescriptor::new(
            "get_pending_quizzes",
            "Get quizzes that are not completed yet, optionally limited to deadlines within the given number of days.",
        )
        .with_param(
            "days",
            ParamType::Integer,
            "How many days from today to include (may be omitted)",
            false,
        ),
        ToolDescriptor::new(
            "get_my_courses",
            "Get the list of Moodle courses the user is enrolled in.",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_order_is_stable() {
        let names: Vec<String> = catalog().into_iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![
                "get_my_userid",
                "get_due_assignments",
                "check_new_messages",
                "get_pending_quizzes",
                "get_my_courses",
            ]
        );
    }

    #[test]
    fn test_days_required_only_for_assignments() {
        let tools = catalog();
        let assignments = tools.iter().find(|t| t.name == "get_due_assignments").unwrap();
        assert!(assignments.parameters[0].1.required);

        let quizzes = tools.iter().find(|t| t.name == "get_pending_quizzes").unwrap();
        assert!(!quizzes.parameters[0].1.required);
    }
}
