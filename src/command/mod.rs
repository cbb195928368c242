//! ChatOps commands: comment text mapped to gated effects.
//!
//! A [`CommandRule`] owns one command string and an ordered list of bindings.
//! Each binding says which comment actions it reacts to, who may trigger it
//! and what to do:
//!
//! ```ignore
//! let rule = CommandRule::register("/ok-without-tests", false)
//!     .when(&[CommentAction::Triggered])
//!     .by(vec![PermissionCheck::Admin])
//!     .then_do(|| approve())
//!     .when(&[CommentAction::Deleted])
//!     .by(vec![PermissionCheck::Admin])
//!     .then_do(|| recheck());
//! ```

pub mod context;
pub mod permission;

pub use context::CommandContext;
pub use permission::{PermissionCheck, PermissionCheckResult, all_of};

use log::{debug, warn};

use crate::error::Result;
use crate::github::IssueCommentEvent;

/// Comment lifecycle a binding reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentAction {
    Deleted,
    /// Posting or editing a comment.
    Triggered,
}

impl CommentAction {
    /// Webhook `action` values covered by this lifecycle.
    pub fn actions(self) -> &'static [&'static str] {
        match self {
            CommentAction::Deleted => &["deleted"],
            CommentAction::Triggered => &["edited", "created"],
        }
    }

    /// How the denial comment refers to what the user did.
    pub fn verb(self) -> &'static str {
        match self {
            CommentAction::Deleted => "deleted",
            CommentAction::Triggered => "used",
        }
    }

    pub fn matches(self, action: &str) -> bool {
        self.actions().contains(&action)
    }
}

pub type Effect<'a> = Box<dyn Fn() -> Result<()> + 'a>;

struct Binding<'a> {
    actions: Vec<CommentAction>,
    checks: Vec<PermissionCheck>,
    effect: Effect<'a>,
}

/// A command string and its bindings, evaluated in registration order.
pub struct CommandRule<'a> {
    command: String,
    quiet: bool,
    bindings: Vec<Binding<'a>>,
}

/// Rule narrowed to comment actions, waiting for its permission gate.
pub struct PendingBinding<'a> {
    rule: CommandRule<'a>,
    actions: Vec<CommentAction>,
}

/// Rule narrowed and gated, waiting for its effect.
pub struct GatedBinding<'a> {
    rule: CommandRule<'a>,
    actions: Vec<CommentAction>,
    checks: Vec<PermissionCheck>,
}

impl<'a> CommandRule<'a> {
    /// A quiet rule never answers a denied user.
    pub fn register(command: &str, quiet: bool) -> Self {
        Self {
            command: command.trim().to_string(),
            quiet,
            bindings: Vec::new(),
        }
    }

    pub fn when(self, actions: &[CommentAction]) -> PendingBinding<'a> {
        PendingBinding {
            rule: self,
            actions: actions.to_vec(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn matches(&self, body: &str) -> bool {
        body.trim() == self.command
    }

    /// Run every binding whose actions match the event.
    ///
    /// A body other than the command is a no-op. Effect errors and permission
    /// lookup failures abort the remaining bindings; denials do not.
    pub fn execute(&self, event: &IssueCommentEvent, ctx: &CommandContext) -> Result<()> {
        if !self.matches(&event.comment.body) {
            return Ok(());
        }
        // The sender acted; on edits and deletions it need not be the author.
        let login = &event.sender.login;

        for binding in &self.bindings {
            let Some(action) = binding
                .actions
                .iter()
                .copied()
                .find(|a| a.matches(&event.action))
            else {
                continue;
            };

            let result = all_of(&binding.checks, login, ctx)?;
            if result.user_is_approved {
                debug!("{} {} by {login} on {}#{}", self.command, event.action, ctx.repo(), ctx.number());
                (binding.effect)()?;
                continue;
            }

            let message = result.denial_message(login, action.verb(), &self.command);
            warn!("{message}");
            if !self.quiet {
                ctx.client.create_comment(ctx.repo(), ctx.number(), &message)?;
            }
        }
        Ok(())
    }
}

impl<'a> PendingBinding<'a> {
    pub fn by(self, checks: Vec<PermissionCheck>) -> GatedBinding<'a> {
        GatedBinding {
            rule: self.rule,
            actions: self.actions,
            checks,
        }
    }
}

impl<'a> GatedBinding<'a> {
    pub fn then_do(self, effect: impl Fn() -> Result<()> + 'a) -> CommandRule<'a> {
        let mut rule = self.rule;
        rule.bindings.push(Binding {
            actions: self.actions,
            checks: self.checks,
            effect: Box::new(effect),
        });
        rule
    }
}

/// All command rules of one plugin.
#[derive(Default)]
pub struct CommandRegistry<'a> {
    rules: Vec<CommandRule<'a>>,
}

impl<'a> CommandRegistry<'a> {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn add(&mut self, rule: CommandRule<'a>) -> &mut Self {
        self.rules.push(rule);
        self
    }

    pub fn is_command(&self, body: &str) -> bool {
        self.rules.iter().any(|r| r.matches(body))
    }

    /// Hand the comment to every rule; the first error stops dispatch.
    pub fn execute(&self, event: &IssueCommentEvent, ctx: &CommandContext) -> Result<()> {
        for rule in &self.rules {
            rule.execute(event, ctx)?;
        }
        Ok(())
    }
}
