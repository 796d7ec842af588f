// Reviewer surface - slash commands and the Approve/Reject buttons.

pub mod commands;
pub mod review_buttons;

use crate::core::moderation::DecisionOutcome;
use crate::core::users::UserStore;
use crate::discord::{Data, Error};

/// Whether the user is flagged as a reviewer. Unknown users are not.
pub(crate) async fn is_reviewer(data: &Data, user_id: u64) -> Result<bool, Error> {
    let user = data
        .store
        .get_user(user_id)
        .await
        .map_err(|e| Error::from(e.to_string()))?;
    Ok(user.is_some_and(|u| u.reviewer))
}

/// Text shown to the reviewer after a decision.
pub(crate) fn describe_decision(outcome: &DecisionOutcome) -> String {
    let icon = match (outcome.ok, outcome.already_decided) {
        (true, _) => "✅",
        (false, true) => "ℹ️",
        (false, false) => "❌",
    };
    match &outcome.link {
        Some(link) => format!("{icon} {}\n{link}", outcome.message),
        None => format!("{icon} {}", outcome.message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::RequestStatus;

    #[test]
    fn decisions_read_differently() {
        let approved =
            DecisionOutcome::success("Approved and published in Jobs", Some("https://x".into()));
        assert_eq!(
            describe_decision(&approved),
            "✅ Approved and published in Jobs\nhttps://x"
        );

        let late = DecisionOutcome::already_decided(RequestStatus::Rejected);
        assert!(describe_decision(&late).starts_with("ℹ️"));

        let failed = DecisionOutcome::failure("Publishing failed");
        assert_eq!(describe_decision(&failed), "❌ Publishing failed");
    }
}
