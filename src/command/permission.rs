use super::CommandContext;
use crate::error::Result;
use crate::github::PermissionLevel;

/// Outcome of one or more permission checks.
///
/// A denial is a normal outcome, not an error. `message` carries the reasons
/// of every check that denied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionCheckResult {
    pub user_is_approved: bool,
    pub message: String,
}

impl PermissionCheckResult {
    pub fn approved() -> Self {
        Self {
            user_is_approved: true,
            message: String::new(),
        }
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            user_is_approved: false,
            message: reason.into(),
        }
    }

    /// Comment explaining why `command` was not executed for `login`.
    pub fn denial_message(&self, login: &str, verb: &str, command: &str) -> String {
        format!(
            "Hey @{login}! The `{command}` command you {verb} was not executed because {}.",
            self.message
        )
    }
}

/// Who may trigger a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionCheck {
    Anybody,
    /// Collaborator with `admin` permission on the repository.
    Admin,
    PullRequestCreator,
    /// Requested reviewer, or someone who already submitted a review.
    Reviewer,
    /// Approves when any inner check approves.
    AnyOf(Vec<PermissionCheck>),
}

impl PermissionCheck {
    pub fn evaluate(&self, login: &str, ctx: &CommandContext) -> Result<PermissionCheckResult> {
        match self {
            PermissionCheck::Anybody => Ok(PermissionCheckResult::approved()),
            PermissionCheck::Admin => {
                let level = ctx.client.get_permission_level(ctx.repo(), login)?;
                Ok(verdict(
                    level == PermissionLevel::Admin,
                    "you are not an admin of this repository",
                ))
            }
            PermissionCheck::PullRequestCreator => {
                let pr = ctx.pull_request.load()?;
                Ok(verdict(
                    same_login(&pr.user.login, login),
                    "you are not the creator of this pull request",
                ))
            }
            PermissionCheck::Reviewer => {
                let pr = ctx.pull_request.load()?;
                let mut is_reviewer = pr
                    .requested_reviewers
                    .iter()
                    .any(|u| same_login(&u.login, login));
                if !is_reviewer {
                    let reviewers = ctx.client.list_reviews(ctx.repo(), ctx.number())?;
                    is_reviewer = reviewers.iter().any(|r| same_login(r, login));
                }
                Ok(verdict(is_reviewer, "you are not a reviewer of this pull request"))
            }
            PermissionCheck::AnyOf(checks) => {
                let mut reasons = Vec::new();
                let mut approved = false;
                for check in checks {
                    let result = check.evaluate(login, ctx)?;
                    if result.user_is_approved {
                        approved = true;
                    } else {
                        reasons.push(result.message);
                    }
                }
                if approved {
                    Ok(PermissionCheckResult::approved())
                } else {
                    Ok(PermissionCheckResult::denied(reasons.join(" and ")))
                }
            }
        }
    }
}

/// Evaluate every check and approve only if all of them approve.
///
/// All checks run even after a denial so the message lists every reason.
/// The first hard error aborts and is returned as is.
pub fn all_of(
    checks: &[PermissionCheck],
    login: &str,
    ctx: &CommandContext,
) -> Result<PermissionCheckResult> {
    let mut reasons = Vec::new();
    for check in checks {
        let result = check.evaluate(login, ctx)?;
        if !result.user_is_approved {
            reasons.push(result.message);
        }
    }
    if reasons.is_empty() {
        Ok(PermissionCheckResult::approved())
    } else {
        Ok(PermissionCheckResult::denied(reasons.join("; ")))
    }
}

fn verdict(approved: bool, reason: &str) -> PermissionCheckResult {
    if approved {
        PermissionCheckResult::approved()
    } else {
        PermissionCheckResult::denied(reason)
    }
}

// GitHub logins are case-insensitive.
fn same_login(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}
