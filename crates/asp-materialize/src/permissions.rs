// SPDX-License-Identifier: MIT OR Apache-2.0
//! Canonical permission translation.
//!
//! `permissions.toml` is harness-neutral; each harness enforces the facets
//! it can. Claude translates read/write/exec into settings permission
//! entries; Pi can only best-effort exec through its tool allowlist; network
//! facets are lint-only everywhere.

use asp_core::HarnessId;
use asp_manifest::PermissionsConfig;

// ---------------------------------------------------------------------------
// Enforcement matrix
// ---------------------------------------------------------------------------

/// How a harness treats one permission facet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enforcement {
    /// The harness enforces the facet natively.
    Enforced,
    /// The harness approximates the facet (Pi's tool allowlist).
    BestEffort,
    /// The facet is only surfaced by the linter.
    LintOnly,
}

/// A permission facet of the canonical schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Facet {
    /// `read.paths`
    Read,
    /// `write.paths`
    Write,
    /// `exec.commands` / `exec.patterns`
    Exec,
    /// `network.hosts`
    Network,
    /// `deny.read.paths`
    DenyRead,
    /// `deny.write.paths`
    DenyWrite,
    /// `deny.exec.*`
    DenyExec,
    /// `deny.network.hosts`
    DenyNetwork,
}

impl Facet {
    /// Every facet, in schema order.
    pub const ALL: [Self; 8] = [
        Self::Read,
        Self::Write,
        Self::Exec,
        Self::Network,
        Self::DenyRead,
        Self::DenyWrite,
        Self::DenyExec,
        Self::DenyNetwork,
    ];

    /// The facet's name in `permissions.toml`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Exec => "exec",
            Self::Network => "network",
            Self::DenyRead => "deny.read",
            Self::DenyWrite => "deny.write",
            Self::DenyExec => "deny.exec",
            Self::DenyNetwork => "deny.network",
        }
    }
}

/// The enforcement level of `facet` on `harness`.
#[must_use]
pub fn enforcement(harness: HarnessId, facet: Facet) -> Enforcement {
    use Enforcement::{BestEffort, Enforced, LintOnly};
    match asp_harness::artifact_family(harness) {
        HarnessId::Claude => match facet {
            Facet::Network | Facet::DenyNetwork => LintOnly,
            _ => Enforced,
        },
        HarnessId::Pi => match facet {
            Facet::Exec => BestEffort,
            _ => LintOnly,
        },
        _ => LintOnly,
    }
}

/// Facets that are declared in `config` but not enforced on `harness`.
#[must_use]
pub fn lint_only_facets(harness: HarnessId, config: &PermissionsConfig) -> Vec<Facet> {
    let declared = |facet: Facet| match facet {
        Facet::Read => !config.read.is_empty(),
        Facet::Write => !config.write.is_empty(),
        Facet::Exec => !config.exec.is_empty(),
        Facet::Network => !config.network.is_empty(),
        Facet::DenyRead => !config.deny.read.is_empty(),
        Facet::DenyWrite => !config.deny.write.is_empty(),
        Facet::DenyExec => !config.deny.exec.is_empty(),
        Facet::DenyNetwork => !config.deny.network.is_empty(),
    };
    Facet::ALL
        .into_iter()
        .filter(|f| declared(*f))
        .filter(|f| enforcement(harness, *f) == Enforcement::LintOnly)
        .collect()
}

// ---------------------------------------------------------------------------
// Claude settings translation
// ---------------------------------------------------------------------------

/// Translate a canonical permissions document into Claude settings
/// `permissions.allow` / `permissions.deny` entries.
///
/// Read/write paths become `Read(<path>)` / `Write(<path>)` entries, with
/// the bare `Read` / `Write` tool tokens emitted ahead of them whenever any
/// paths are present. Exec commands become `Bash(<cmd> *)` and exec
/// patterns `Bash(<pattern>)`. Network facets translate to nothing.
#[must_use]
pub fn to_claude_settings_permissions(config: &PermissionsConfig) -> (Vec<String>, Vec<String>) {
    let mut allow = Vec::new();
    let mut deny = Vec::new();

    if !config.read.paths.is_empty() {
        allow.push("Read".to_owned());
        allow.extend(config.read.paths.iter().map(|p| format!("Read({p})")));
    }
    if !config.write.paths.is_empty() {
        allow.push("Write".to_owned());
        allow.extend(config.write.paths.iter().map(|p| format!("Write({p})")));
    }
    allow.extend(config.exec.commands.iter().map(|c| format!("Bash({c} *)")));
    allow.extend(config.exec.patterns.iter().map(|p| format!("Bash({p})")));

    deny.extend(config.deny.read.paths.iter().map(|p| format!("Read({p})")));
    deny.extend(config.deny.write.paths.iter().map(|p| format!("Write({p})")));
    deny.extend(
        config
            .deny
            .exec
            .commands
            .iter()
            .map(|c| format!("Bash({c} *)")),
    );
    deny.extend(config.deny.exec.patterns.iter().map(|p| format!("Bash({p})")));

    (allow, deny)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn config(toml: &str) -> PermissionsConfig {
        PermissionsConfig::parse(toml, "permissions.toml").unwrap()
    }

    // -- 1. Translation law: deny entries map per facet ----------------------------

    #[test]
    fn deny_entries_map_per_facet() {
        let p = config(
            r#"
            [deny.read]
            paths = [".env"]
            [deny.write]
            paths = ["secrets/**"]
            [deny.exec]
            commands = ["curl"]
            patterns = ["rm -rf *"]
            "#,
        );
        let (allow, deny) = to_claude_settings_permissions(&p);
        assert!(allow.is_empty());
        assert_eq!(
            deny,
            vec![
                "Read(.env)",
                "Write(secrets/**)",
                "Bash(curl *)",
                "Bash(rm -rf *)",
            ]
        );
    }

    // -- 2. Tool tokens emitted when paths present -----------------------------------

    #[test]
    fn tool_tokens_precede_path_entries() {
        let p = config(
            r#"
            [read]
            paths = ["src/**"]
            [write]
            paths = ["out/**"]
            [exec]
            commands = ["npm"]
            "#,
        );
        let (allow, _) = to_claude_settings_permissions(&p);
        assert_eq!(
            allow,
            vec!["Read", "Read(src/**)", "Write", "Write(out/**)", "Bash(npm *)"]
        );
    }

    // -- 3. Network facets translate to nothing ------------------------------------------

    #[test]
    fn network_translates_to_nothing() {
        let p = config("[network]\nhosts = [\"api.example.com\"]\n");
        let (allow, deny) = to_claude_settings_permissions(&p);
        assert!(allow.is_empty());
        assert!(deny.is_empty());
    }

    // -- 4. Enforcement matrix ------------------------------------------------------------

    #[test]
    fn enforcement_matrix() {
        use Enforcement::{BestEffort, Enforced, LintOnly};
        assert_eq!(enforcement(HarnessId::Claude, Facet::Read), Enforced);
        assert_eq!(enforcement(HarnessId::Claude, Facet::Exec), Enforced);
        assert_eq!(enforcement(HarnessId::Claude, Facet::Network), LintOnly);
        assert_eq!(enforcement(HarnessId::Claude, Facet::DenyExec), Enforced);
        assert_eq!(enforcement(HarnessId::Claude, Facet::DenyNetwork), LintOnly);

        assert_eq!(enforcement(HarnessId::Pi, Facet::Read), LintOnly);
        assert_eq!(enforcement(HarnessId::Pi, Facet::Exec), BestEffort);
        assert_eq!(enforcement(HarnessId::Pi, Facet::DenyRead), LintOnly);

        // The SDK variants follow their family.
        assert_eq!(enforcement(HarnessId::ClaudeAgentSdk, Facet::Write), Enforced);
        assert_eq!(enforcement(HarnessId::PiSdk, Facet::Exec), BestEffort);
    }

    // -- 5. Lint-only facet detection ------------------------------------------------------

    #[test]
    fn lint_only_facet_detection() {
        let p = config(
            r#"
            [read]
            paths = ["src/**"]
            [network]
            hosts = ["api.example.com"]
            "#,
        );
        let claude = lint_only_facets(HarnessId::Claude, &p);
        assert_eq!(claude, vec![Facet::Network]);

        let pi = lint_only_facets(HarnessId::Pi, &p);
        assert_eq!(pi, vec![Facet::Read, Facet::Network]);

        let empty = PermissionsConfig::default();
        assert!(lint_only_facets(HarnessId::Pi, &empty).is_empty());
    }
}
