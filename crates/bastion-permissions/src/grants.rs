use serde::{Deserialize, Serialize};

/// Database access mode granted to a plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DbAccess {
    /// Only `SELECT`-shaped reads are permitted.
    ReadOnly,
    /// Reads and writes are permitted.
    ReadWrite,
}

/// `db` grant (§4.2): `{ tables: [name|"*"], access: read-only|read-write }`.
///
/// Per the supplemented rule in `SPEC_FULL.md` §B.6, `tables: ["*"]` is only
/// honored when `privileged` is also set; otherwise it is treated as
/// granting no tables (Design Note §9: `"*"` must only reach privileged
/// plugins).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DbGrant {
    /// Table name allow-list; `"*"` is recognized syntax but only honored
    /// when `privileged` is `true`.
    #[serde(default)]
    pub tables: Vec<String>,
    /// Read-only by default; fail-closed if unspecified.
    #[serde(default = "default_db_access")]
    pub access: DbAccess,
    /// Whether this plugin may use the `"*"` table wildcard.
    #[serde(default)]
    pub privileged: bool,
}

fn default_db_access() -> DbAccess {
    DbAccess::ReadOnly
}

/// `network` grant (§4.2): `{ allowed_domains: [host|"*.suffix"], allow_all }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkGrant {
    /// Domains or `*.suffix` patterns permitted for outbound fetches.
    #[serde(default)]
    pub allowed_domains: Vec<String>,
    /// Short-circuits all domain checks when `true`.
    #[serde(default)]
    pub allow_all: bool,
}

/// `llm` grant (§4.2): pipeline-participation flags plus an optional token cap.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmGrant {
    /// May intercept (`processPrompt`/`beforeLLMCall`) by returning early.
    #[serde(default)]
    pub can_intercept_task: bool,
    /// May run in the `processPrompt` pipeline.
    #[serde(default)]
    pub can_modify_prompt: bool,
    /// May run in `transformSystemMessage`.
    #[serde(default)]
    pub can_modify_system_message: bool,
    /// May run in `afterLLMCall` (§9: required, treated as a bug if absent).
    #[serde(default)]
    pub can_modify_response: bool,
    /// Optional per-request token ceiling.
    #[serde(default)]
    pub max_tokens_per_request: Option<u32>,
}

/// `api` grant (§4.2): `{ routes: [route spec], methods?: [verb] }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiGrant {
    /// Route specs, each `"<VERBS> <pattern>"` or a bare pattern.
    #[serde(default)]
    pub routes: Vec<String>,
    /// Verbs allowed when a matched route spec declares none of its own.
    #[serde(default)]
    pub methods: Vec<String>,
}

/// `socket` grant (§4.2).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SocketGrant {
    /// May intercept socket messages.
    #[serde(default)]
    pub can_intercept: bool,
    /// May emit socket messages.
    #[serde(default)]
    pub can_emit: bool,
    /// Declared event names, or `"*"`.
    #[serde(default)]
    pub events: Vec<String>,
}

/// `skills` grant (§4.2): list of `name`, `plugin__name`, or `plugin__*`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkillsGrant(#[serde(default)] pub Vec<String>);

/// `memory` grant (§4.2): `{ read: [...], write: [...] }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryGrant {
    /// Read-allowed key/prefix patterns.
    #[serde(default)]
    pub read: Vec<String>,
    /// Write-allowed key/prefix patterns.
    #[serde(default)]
    pub write: Vec<String>,
}

/// `log` grant (§4.2): `{ enabled, levels: [...] }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogGrant {
    /// Whether the plugin may log at all.
    #[serde(default)]
    pub enabled: bool,
    /// Permitted levels (`debug`, `info`, `warn`, `error`).
    #[serde(default)]
    pub levels: Vec<String>,
}

/// The full permission grant set declared by a manifest. Every field is
/// optional; an absent grant denies the corresponding capability family
/// entirely (§4.2 "fail-closed").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Permissions {
    /// Database access grant.
    #[serde(default)]
    pub db: Option<DbGrant>,
    /// Network access grant.
    #[serde(default)]
    pub network: Option<NetworkGrant>,
    /// LLM pipeline participation grant.
    #[serde(default)]
    pub llm: Option<LlmGrant>,
    /// HTTP route grant.
    #[serde(default)]
    pub api: Option<ApiGrant>,
    /// Socket participation grant.
    #[serde(default)]
    pub socket: Option<SocketGrant>,
    /// Skill invocation grant.
    #[serde(default)]
    pub skills: Option<SkillsGrant>,
    /// Memory namespace grant.
    #[serde(default)]
    pub memory: Option<MemoryGrant>,
    /// Logging grant.
    #[serde(default)]
    pub log: Option<LogGrant>,
}
