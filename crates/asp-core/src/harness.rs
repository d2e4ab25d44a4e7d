// SPDX-License-Identifier: MIT OR Apache-2.0
//! Harness identifiers.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An external coding-agent runtime that can load a composed bundle.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "kebab-case")]
pub enum HarnessId {
    /// Claude Code CLI.
    Claude,
    /// Claude Agent SDK. Materializes exactly like Claude Code; differs only
    /// in output path and id.
    ClaudeAgentSdk,
    /// Pi coding agent.
    Pi,
    /// Pi SDK loader.
    PiSdk,
    /// Codex CLI.
    Codex,
}

impl HarnessId {
    /// All known harnesses, in a stable order.
    pub const ALL: [Self; 5] = [
        Self::Claude,
        Self::ClaudeAgentSdk,
        Self::Pi,
        Self::PiSdk,
        Self::Codex,
    ];

    /// The stable kebab-case identifier used in paths and config.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Claude => "claude",
            Self::ClaudeAgentSdk => "claude-agent-sdk",
            Self::Pi => "pi",
            Self::PiSdk => "pi-sdk",
            Self::Codex => "codex",
        }
    }

    /// Whether this harness consumes Claude-shaped plugin artifacts.
    #[must_use]
    pub fn is_claude_family(self) -> bool {
        matches!(self, Self::Claude | Self::ClaudeAgentSdk)
    }

    /// Whether this harness consumes Pi-shaped extension artifacts.
    #[must_use]
    pub fn is_pi_family(self) -> bool {
        matches!(self, Self::Pi | Self::PiSdk)
    }
}

impl fmt::Display for HarnessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HarnessId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "claude" => Ok(Self::Claude),
            "claude-agent-sdk" => Ok(Self::ClaudeAgentSdk),
            "pi" => Ok(Self::Pi),
            "pi-sdk" => Ok(Self::PiSdk),
            "codex" => Ok(Self::Codex),
            other => Err(format!("unknown harness '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- 1. Round-trip every id ------------------------------------------------

    #[test]
    fn round_trips_every_id() {
        for h in HarnessId::ALL {
            assert_eq!(h.as_str().parse::<HarnessId>().unwrap(), h);
        }
    }

    // -- 2. Families -----------------------------------------------------------

    #[test]
    fn family_grouping() {
        assert!(HarnessId::Claude.is_claude_family());
        assert!(HarnessId::ClaudeAgentSdk.is_claude_family());
        assert!(HarnessId::Pi.is_pi_family());
        assert!(HarnessId::PiSdk.is_pi_family());
        assert!(!HarnessId::Codex.is_claude_family());
        assert!(!HarnessId::Codex.is_pi_family());
    }

    // -- 3. Serde names are kebab-case -----------------------------------------

    #[test]
    fn serde_kebab_case() {
        assert_eq!(
            serde_json::to_string(&HarnessId::ClaudeAgentSdk).unwrap(),
            "\"claude-agent-sdk\""
        );
        assert_eq!(
            serde_json::from_str::<HarnessId>("\"pi-sdk\"").unwrap(),
            HarnessId::PiSdk
        );
    }
}
