// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-harness argv construction.
//!
//! Each harness gets exactly the flags it documents; everything else rides
//! in the environment overlay. The rendered display form is shell-quoted
//! and prefixed with its `KEY=VALUE` pairs so a printed dry-run command is
//! copy-pasteable.

use asp_core::{ComposedTargetBundle, HarnessId};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::Path;

/// `--setting-sources` tri-state for the Claude family.
///
/// The default keeps Claude from loading user and project settings behind
/// ASP's back; `Omit` drops the flag entirely; `Value` passes through.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SettingSources {
    /// Pass `--setting-sources ""`.
    #[default]
    Empty,
    /// Do not pass the flag.
    Omit,
    /// Pass the given value through.
    Value(String),
}

/// Per-run options the orchestrators hand the invoker.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Model override.
    pub model: Option<String>,
    /// Skip permission prompts.
    pub yolo: bool,
    /// Interactive session rather than one-shot print mode.
    pub interactive: bool,
    /// Prompt for one-shot runs.
    pub prompt: Option<String>,
    /// Claude `--permission-mode`.
    pub permission_mode: Option<String>,
    /// Claude `--setting-sources` behavior.
    pub setting_sources: SettingSources,
    /// Codex `--approval-policy`.
    pub approval_policy: Option<String>,
    /// Codex `--sandbox-mode`.
    pub sandbox_mode: Option<String>,
    /// Codex `--profile`.
    pub profile: Option<String>,
    /// Project root the run operates in.
    pub project_root: std::path::PathBuf,
    /// Working directory for the harness process.
    pub cwd: std::path::PathBuf,
}

/// A fully assembled harness invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessCommand {
    /// The binary to launch.
    pub binary: String,
    /// Arguments, in order.
    pub args: Vec<String>,
    /// Environment overlay applied to the child only.
    pub env: BTreeMap<String, String>,
    /// Working directory for the child.
    pub cwd: std::path::PathBuf,
}

impl HarnessCommand {
    /// The shell-quoted, env-prefixed display form.
    #[must_use]
    pub fn display(&self) -> String {
        let mut parts: Vec<String> = self
            .env
            .iter()
            .map(|(k, v)| format!("{k}={}", quote(v)))
            .collect();
        parts.push(quote(&self.binary));
        parts.extend(self.args.iter().map(|a| quote(a)));
        parts.join(" ")
    }
}

fn quote(value: &str) -> String {
    shell_escape::escape(Cow::Borrowed(value)).into_owned()
}

/// Build the harness command for `bundle` with `opts`.
#[must_use]
pub fn build_run_command(bundle: &ComposedTargetBundle, opts: &RunOptions) -> HarnessCommand {
    match bundle.harness {
        HarnessId::Claude | HarnessId::ClaudeAgentSdk => claude_command(bundle, opts),
        HarnessId::Pi => pi_command(bundle, opts),
        HarnessId::PiSdk => pi_sdk_command(bundle, opts),
        HarnessId::Codex => codex_command(bundle, opts),
    }
}

// ---------------------------------------------------------------------------
// Claude family
// ---------------------------------------------------------------------------

fn claude_command(bundle: &ComposedTargetBundle, opts: &RunOptions) -> HarnessCommand {
    let mut args = Vec::new();

    for dir in &bundle.plugin_dirs {
        args.push("--plugin-dir".into());
        args.push(display_path(dir));
    }
    if let Some(mcp) = &bundle.mcp_config_path {
        args.push("--mcp-config".into());
        args.push(display_path(mcp));
    }
    // Always pass --settings so composed permissions apply even when empty.
    if let Some(settings) = &bundle.settings_path {
        args.push("--settings".into());
        args.push(display_path(settings));
    }
    match &opts.setting_sources {
        SettingSources::Omit => {}
        SettingSources::Empty => {
            args.push("--setting-sources".into());
            args.push(String::new());
        }
        SettingSources::Value(value) => {
            args.push("--setting-sources".into());
            args.push(value.clone());
        }
    }
    if let Some(model) = &opts.model {
        args.push("--model".into());
        args.push(model.clone());
    }
    if let Some(mode) = &opts.permission_mode {
        args.push("--permission-mode".into());
        args.push(mode.clone());
    }
    if opts.yolo {
        args.push("--dangerously-skip-permissions".into());
    }
    if !opts.interactive
        && let Some(prompt) = &opts.prompt
    {
        args.push("-p".into());
        args.push(prompt.clone());
    }

    let mut env = BTreeMap::new();
    env.insert("ASP_PLUGIN_ROOT".into(), display_path(&bundle.root_dir));

    HarnessCommand {
        binary: "claude".into(),
        args,
        env,
        cwd: opts.cwd.clone(),
    }
}

// ---------------------------------------------------------------------------
// Pi
// ---------------------------------------------------------------------------

/// Translate shorthand model names onto Pi's `claude-*` names.
fn pi_model(model: &str) -> String {
    match model {
        "sonnet" | "opus" | "haiku" => format!("claude-{model}"),
        other => other.to_owned(),
    }
}

fn pi_command(bundle: &ComposedTargetBundle, opts: &RunOptions) -> HarnessCommand {
    let mut args = Vec::new();
    let mut extensions = Vec::new();

    if let Some(pi) = &bundle.pi {
        if let Ok(entries) = std::fs::read_dir(&pi.extensions_dir) {
            let mut paths: Vec<_> = entries
                .filter_map(Result::ok)
                .map(|e| e.path())
                .filter(|p| p.extension().is_some_and(|e| e == "js"))
                .collect();
            paths.sort();
            extensions.extend(paths);
        }
    }

    for extension in &extensions {
        args.push("--extension".into());
        args.push(display_path(extension));
    }
    // Pi must not load user or project skills behind ASP's back.
    args.push("--no-skills".into());
    if extensions.is_empty() {
        args.push("--no-extensions".into());
    }
    if let Some(model) = &opts.model {
        args.push("--model".into());
        args.push(pi_model(model));
    }
    if !opts.interactive
        && let Some(prompt) = &opts.prompt
    {
        args.push(prompt.clone());
    }

    HarnessCommand {
        binary: "pi".into(),
        args,
        env: BTreeMap::new(),
        cwd: opts.cwd.clone(),
    }
}

// ---------------------------------------------------------------------------
// Pi SDK
// ---------------------------------------------------------------------------

fn pi_sdk_command(bundle: &ComposedTargetBundle, opts: &RunOptions) -> HarnessCommand {
    let mut args = vec![
        display_path(&bundle.root_dir.join("runner.ts")),
        "--bundle".into(),
        display_path(&bundle.root_dir),
        "--project".into(),
        display_path(&opts.project_root),
        "--cwd".into(),
        display_path(&opts.cwd),
        "--mode".into(),
        if opts.interactive { "interactive" } else { "print" }.into(),
    ];
    if let Some(prompt) = &opts.prompt {
        args.push("--prompt".into());
        args.push(prompt.clone());
    }
    if let Some(model) = &opts.model {
        args.push("--model".into());
        args.push(model.clone());
    }
    if opts.yolo {
        args.push("--yolo".into());
    }
    if let Some(pi) = &bundle.pi {
        let has_extensions = std::fs::read_dir(&pi.extensions_dir)
            .map(|mut entries| entries.any(|e| e.is_ok()))
            .unwrap_or(false);
        if !has_extensions {
            args.push("--no-extensions".into());
        }
        if pi.skills_dir.is_none() {
            args.push("--no-skills".into());
        }
    }

    HarnessCommand {
        binary: "bun".into(),
        args,
        env: BTreeMap::new(),
        cwd: opts.cwd.clone(),
    }
}

// ---------------------------------------------------------------------------
// Codex
// ---------------------------------------------------------------------------

fn codex_command(bundle: &ComposedTargetBundle, opts: &RunOptions) -> HarnessCommand {
    let mut args = Vec::new();

    let approval = opts
        .approval_policy
        .clone()
        .or_else(|| opts.yolo.then(|| "never".to_owned()));
    if let Some(policy) = approval {
        args.push("--approval-policy".into());
        args.push(policy);
    }
    let sandbox = opts
        .sandbox_mode
        .clone()
        .or_else(|| opts.yolo.then(|| "danger-full-access".to_owned()));
    if let Some(mode) = sandbox {
        args.push("--sandbox-mode".into());
        args.push(mode);
    }
    if let Some(profile) = &opts.profile {
        args.push("--profile".into());
        args.push(profile.clone());
    }
    if let Some(model) = &opts.model {
        args.push("--model".into());
        args.push(model.clone());
    }
    if !opts.interactive
        && let Some(prompt) = &opts.prompt
    {
        args.push(prompt.clone());
    }

    let mut env = BTreeMap::new();
    if let Some(codex) = &bundle.codex {
        env.insert(
            "CODEX_HOME".into(),
            display_path(&codex.home_template_path),
        );
    }

    HarnessCommand {
        binary: "codex".into(),
        args,
        env,
        cwd: opts.cwd.clone(),
    }
}

fn display_path(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use asp_core::{CodexBundle, PiBundle};

    fn claude_bundle() -> ComposedTargetBundle {
        ComposedTargetBundle {
            harness: HarnessId::Claude,
            target_name: "dev".into(),
            root_dir: "/b".into(),
            plugin_dirs: vec!["/b/plugins/000-base".into(), "/b/plugins/001-frontend".into()],
            mcp_config_path: Some("/b/mcp.json".into()),
            settings_path: Some("/b/settings.json".into()),
            pi: None,
            pi_sdk: None,
            codex: None,
        }
    }

    // -- 1. Claude argv covers plugins, mcp, settings in order -----------------------

    #[test]
    fn claude_argv_order() {
        let cmd = build_run_command(&claude_bundle(), &RunOptions::default());
        assert_eq!(cmd.binary, "claude");
        assert_eq!(
            cmd.args,
            vec![
                "--plugin-dir",
                "/b/plugins/000-base",
                "--plugin-dir",
                "/b/plugins/001-frontend",
                "--mcp-config",
                "/b/mcp.json",
                "--settings",
                "/b/settings.json",
                "--setting-sources",
                "",
            ]
        );
        assert_eq!(cmd.env["ASP_PLUGIN_ROOT"], "/b");
    }

    // -- 2. Setting-sources tri-state -------------------------------------------------

    #[test]
    fn setting_sources_tri_state() {
        let mut opts = RunOptions {
            setting_sources: SettingSources::Omit,
            ..Default::default()
        };
        let cmd = build_run_command(&claude_bundle(), &opts);
        assert!(!cmd.args.contains(&"--setting-sources".to_owned()));

        opts.setting_sources = SettingSources::Value("user,project".into());
        let cmd = build_run_command(&claude_bundle(), &opts);
        let idx = cmd
            .args
            .iter()
            .position(|a| a == "--setting-sources")
            .unwrap();
        assert_eq!(cmd.args[idx + 1], "user,project");
    }

    // -- 3. Yolo and model flags -------------------------------------------------------

    #[test]
    fn claude_yolo_model_prompt() {
        let opts = RunOptions {
            model: Some("sonnet".into()),
            yolo: true,
            prompt: Some("do the thing".into()),
            permission_mode: Some("plan".into()),
            ..Default::default()
        };
        let cmd = build_run_command(&claude_bundle(), &opts);
        assert!(cmd.args.contains(&"--dangerously-skip-permissions".to_owned()));
        assert!(cmd.args.contains(&"--model".to_owned()));
        assert!(cmd.args.contains(&"plan".to_owned()));
        let p = cmd.args.iter().position(|a| a == "-p").unwrap();
        assert_eq!(cmd.args[p + 1], "do the thing");
    }

    // -- 4. Pi model aliasing and skills policy ------------------------------------------

    #[test]
    fn pi_model_aliasing_and_flags() {
        let dir = tempfile::tempdir().unwrap();
        let ext_dir = dir.path().join("extensions");
        std::fs::create_dir_all(&ext_dir).unwrap();
        std::fs::write(ext_dir.join("base__util.js"), "//").unwrap();

        let bundle = ComposedTargetBundle {
            harness: HarnessId::Pi,
            target_name: "dev".into(),
            root_dir: dir.path().to_path_buf(),
            plugin_dirs: vec![],
            mcp_config_path: None,
            settings_path: None,
            pi: Some(PiBundle {
                extensions_dir: ext_dir,
                bridge_path: None,
                skills_dir: None,
            }),
            pi_sdk: None,
            codex: None,
        };
        let opts = RunOptions {
            model: Some("sonnet".into()),
            ..Default::default()
        };
        let cmd = build_run_command(&bundle, &opts);
        assert_eq!(cmd.binary, "pi");
        assert!(cmd.args.contains(&"--extension".to_owned()));
        assert!(cmd.args.contains(&"--no-skills".to_owned()));
        assert!(!cmd.args.contains(&"--no-extensions".to_owned()));
        let m = cmd.args.iter().position(|a| a == "--model").unwrap();
        assert_eq!(cmd.args[m + 1], "claude-sonnet");

        assert_eq!(pi_model("gpt-5"), "gpt-5");
        assert_eq!(pi_model("opus"), "claude-opus");
    }

    // -- 5. Pi with no extensions passes --no-extensions ------------------------------------

    #[test]
    fn pi_empty_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = ComposedTargetBundle {
            harness: HarnessId::Pi,
            target_name: "dev".into(),
            root_dir: dir.path().to_path_buf(),
            plugin_dirs: vec![],
            mcp_config_path: None,
            settings_path: None,
            pi: Some(PiBundle {
                extensions_dir: dir.path().join("extensions"),
                bridge_path: None,
                skills_dir: None,
            }),
            pi_sdk: None,
            codex: None,
        };
        let cmd = build_run_command(&bundle, &RunOptions::default());
        assert!(cmd.args.contains(&"--no-extensions".to_owned()));
    }

    // -- 6. Codex env overlay and yolo defaults ---------------------------------------------

    #[test]
    fn codex_env_and_yolo() {
        let bundle = ComposedTargetBundle {
            harness: HarnessId::Codex,
            target_name: "dev".into(),
            root_dir: "/b".into(),
            plugin_dirs: vec![],
            mcp_config_path: None,
            settings_path: None,
            pi: None,
            pi_sdk: None,
            codex: Some(CodexBundle {
                home_template_path: "/b/codex.home".into(),
            }),
        };
        let opts = RunOptions {
            yolo: true,
            ..Default::default()
        };
        let cmd = build_run_command(&bundle, &opts);
        assert_eq!(cmd.binary, "codex");
        assert_eq!(cmd.env["CODEX_HOME"], "/b/codex.home");
        let a = cmd.args.iter().position(|x| x == "--approval-policy").unwrap();
        assert_eq!(cmd.args[a + 1], "never");
        let s = cmd.args.iter().position(|x| x == "--sandbox-mode").unwrap();
        assert_eq!(cmd.args[s + 1], "danger-full-access");
    }

    // -- 7. Pi SDK argv shape ------------------------------------------------------------------

    #[test]
    fn pi_sdk_argv_shape() {
        let bundle = ComposedTargetBundle {
            harness: HarnessId::PiSdk,
            target_name: "dev".into(),
            root_dir: "/b".into(),
            plugin_dirs: vec![],
            mcp_config_path: None,
            settings_path: None,
            pi: None,
            pi_sdk: None,
            codex: None,
        };
        let opts = RunOptions {
            prompt: Some("hello".into()),
            project_root: "/proj".into(),
            cwd: "/proj".into(),
            ..Default::default()
        };
        let cmd = build_run_command(&bundle, &opts);
        assert_eq!(cmd.binary, "bun");
        assert_eq!(cmd.args[0], "/b/runner.ts");
        assert!(cmd.args.windows(2).any(|w| w == ["--mode", "print"]));
        assert!(cmd.args.windows(2).any(|w| w == ["--prompt", "hello"]));
    }

    // -- 8. Display form is shell-quoted and env-prefixed ----------------------------------------

    #[test]
    fn display_is_copy_pasteable() {
        let opts = RunOptions {
            prompt: Some("fix the \"bug\"".into()),
            ..Default::default()
        };
        let cmd = build_run_command(&claude_bundle(), &opts);
        let display = cmd.display();
        assert!(display.starts_with("ASP_PLUGIN_ROOT=/b claude "));
        assert!(display.contains("'fix the \"bug\"'"));
    }
}
