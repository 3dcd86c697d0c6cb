use super::state::ResourceState;
use crate::config::schema::ResourceConfig;
use std::fmt;

/// Whether a command change requires running it again.
///
/// Exact string comparison: whitespace and newlines count, so a cosmetic
/// edit to a multi-line script still forces a rerun.
pub fn needs_rerun(prior_command: &str, proposed_command: &str) -> bool {
    prior_command != proposed_command
}

/// What an apply will do to one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    /// Declared with no prior state.
    Create,
    /// Command text changed; it runs again and the result is replaced.
    Rerun,
    /// Only settings changed; nothing runs.
    UpdateInPlace,
    NoOp,
    /// In state but no longer declared.
    Destroy,
}

impl Plan {
    /// Whether carrying out this plan spawns the resource's `command`.
    pub fn runs_command(self) -> bool {
        matches!(self, Plan::Create | Plan::Rerun)
    }

    fn symbol(self) -> char {
        match self {
            Plan::Create => '+',
            Plan::Rerun => '±',
            Plan::UpdateInPlace => '~',
            Plan::NoOp => ' ',
            Plan::Destroy => '-',
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Plan::Create => "create",
            Plan::Rerun => "rerun",
            Plan::UpdateInPlace => "update in-place",
            Plan::NoOp => "no changes",
            Plan::Destroy => "destroy",
        };
        write!(f, "{} {name}", self.symbol())
    }
}

/// Plan a declared resource against its prior state.
pub fn plan(prior: Option<&ResourceState>, config: &ResourceConfig) -> Plan {
    match prior {
        None => Plan::Create,
        Some(prior) if needs_rerun(&prior.command, &config.command) => Plan::Rerun,
        Some(prior) if !prior.settings_match(config) => Plan::UpdateInPlace,
        Some(_) => Plan::NoOp,
    }
}
