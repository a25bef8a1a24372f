//! CLI Tooling
//!
//! Command-line interface for charter operations. All state lives in a
//! sled-backed data directory, so invocations compose: register a rule-set
//! version in one call, have an agent agree rule-by-rule in the next, then
//! register the agent as a member.

use crate::access::{AccessControl, AllowAll, SingleController};
use crate::config::{CharterConfig, ConfigLoader, PauseState, RuntimeFlags};
use crate::hash::hash_rule_set;
use crate::membership::MembershipRegistry;
use crate::oracle::{ComplianceCheckable, ComplianceOracle};
use crate::store::persistence::{
    SledAgreementStore, SledEventLog, SledMembershipStore, SledVersionStore,
};
use crate::types::{PrincipalId, PrincipalKind, Rule};
use crate::version::RuleVersionRegistry;
use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Charter CLI - versioned rule-set registration and compliance
#[derive(Parser)]
#[command(name = "charter")]
#[command(about = "Versioned rule-set registration and compliance verification")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Data directory (defaults to the platform data dir)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rule-set version operations
    Version {
        #[command(subcommand)]
        command: VersionCommands,
    },
    /// Per-agent compliance oracle operations
    Oracle {
        #[command(subcommand)]
        command: OracleCommands,
    },
    /// Membership operations
    Member {
        #[command(subcommand)]
        command: MemberCommands,
    },
    /// Show the emitted event log
    Events {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Pause state-changing operations
    Pause,
    /// Resume state-changing operations
    Resume,
}

#[derive(Subcommand)]
pub enum VersionCommands {
    /// Register a new rule set and assign the next version number
    Register {
        /// Rules, one argument per rule
        rules: Vec<String>,
        /// Caller identity (must be the designated updater if one is set)
        #[arg(long, default_value = "controller")]
        caller: String,
    },
    /// Resolve a rule set to its version
    Resolve {
        /// Rules, one argument per rule
        rules: Vec<String>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show the rule list of a version
    Show {
        version: u64,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show the highest version assigned so far
    Current,
}

#[derive(Subcommand)]
pub enum OracleCommands {
    /// Record an agent's agreement to a rule
    Add { agent: String, rule: String },
    /// Revoke an agent's agreement to a rule
    Remove { agent: String, rule: String },
    /// Set or clear the attestation flag for an agreed rule
    Attest {
        agent: String,
        rule: String,
        /// Clear the flag instead of setting it
        #[arg(long)]
        revoke: bool,
    },
    /// Check an agent's compliance to a single rule
    Check { agent: String, rule: String },
}

#[derive(Subcommand)]
pub enum MemberCommands {
    /// Register a principal under the version its rule set resolves to
    Register {
        principal: String,
        /// Rules, one argument per rule
        rules: Vec<String>,
        /// Register as an autonomous agent (verified through its oracle)
        #[arg(long)]
        agent: bool,
    },
    /// Leave the system (self-service; agents are re-verified first)
    Leave { principal: String },
    /// Show all registered members
    Status {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Read-only compliance check against a claimed rule set
    Check {
        principal: String,
        /// Rules, one argument per rule
        rules: Vec<String>,
    },
}

const PAUSED_KEY: &[u8] = b"paused";

/// CLI execution context: configuration, stores, and wired registries.
pub struct CliContext {
    config: CharterConfig,
    db: sled::Db,
    flags: Arc<RuntimeFlags>,
    events: Arc<SledEventLog>,
    versions: Arc<RuleVersionRegistry>,
    membership: MembershipRegistry,
}

impl CliContext {
    pub fn new(data_dir: Option<PathBuf>, config_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let config = ConfigLoader::load(config_path.as_deref())
            .context("failed to load configuration")?;

        let data_dir = match data_dir.or_else(|| config.storage.path.clone()) {
            Some(dir) => dir,
            None => default_data_dir()?,
        };
        let db = sled::open(data_dir.join("charter.db"))
            .with_context(|| format!("failed to open data directory {:?}", data_dir))?;

        let flags = Arc::new(RuntimeFlags::new(load_paused(&db, config.paused)?));
        let events = Arc::new(SledEventLog::with_db(&db)?);

        let access: Arc<dyn AccessControl> = match &config.controller {
            Some(controller) => Arc::new(SingleController::new(PrincipalId::new(controller.clone()))),
            None => Arc::new(AllowAll),
        };

        let versions = Arc::new(RuleVersionRegistry::new(
            Arc::new(SledVersionStore::with_db(&db)?),
            access.clone(),
            events.clone(),
        ));
        let membership = MembershipRegistry::new(
            versions.clone(),
            Arc::new(SledMembershipStore::with_db(&db)?),
            access,
            flags.clone(),
            events.clone(),
        );

        let context = Self {
            config,
            db,
            flags,
            events,
            versions,
            membership,
        };
        context.rebind_agent_oracles()?;
        Ok(context)
    }

    /// Re-attach persisted oracles for agents registered in earlier runs.
    fn rebind_agent_oracles(&self) -> anyhow::Result<()> {
        for (principal, record) in self.membership.members()? {
            if record.kind == PrincipalKind::Agent {
                let oracle = self.oracle_for(&principal)?;
                self.membership.bind_oracle(&principal, oracle);
            }
        }
        Ok(())
    }

    fn oracle_for(&self, agent: &PrincipalId) -> anyhow::Result<Arc<dyn ComplianceCheckable>> {
        Ok(Arc::new(self.concrete_oracle(agent)?))
    }

    fn concrete_oracle(&self, agent: &PrincipalId) -> anyhow::Result<ComplianceOracle> {
        let store = Arc::new(SledAgreementStore::with_db(&self.db, agent)?);
        Ok(ComplianceOracle::self_controlled(
            agent.clone(),
            self.config.compliance_mode,
            store,
            self.events.clone(),
        ))
    }

    pub fn execute(&self, command: &Commands) -> anyhow::Result<String> {
        match command {
            Commands::Version { command } => self.execute_version(command),
            Commands::Oracle { command } => self.execute_oracle(command),
            Commands::Member { command } => self.execute_member(command),
            Commands::Events { format } => self.show_events(format),
            Commands::Pause => self.set_paused(true),
            Commands::Resume => self.set_paused(false),
        }
    }

    fn execute_version(&self, command: &VersionCommands) -> anyhow::Result<String> {
        match command {
            VersionCommands::Register { rules, caller } => {
                let rules = parse_rules(rules);
                let caller = PrincipalId::new(caller.clone());
                let version = self.versions.register_version(&caller, &rules)?;
                let hash = hash_rule_set(&rules);
                Ok(format!(
                    "registered version {} ({})",
                    version,
                    hex::encode(hash)
                ))
            }
            VersionCommands::Resolve { rules, format } => {
                let rules = parse_rules(rules);
                let hash = hash_rule_set(&rules);
                let version = self.versions.resolve_version(&hash)?;
                if format == "json" {
                    Ok(serde_json::to_string_pretty(&json!({
                        "hash": hex::encode(hash),
                        "version": version,
                    }))?)
                } else {
                    match version {
                        Some(v) => Ok(format!("version {}", v)),
                        None => Ok("unknown rule set".to_string()),
                    }
                }
            }
            VersionCommands::Show { version, format } => {
                let rules = self
                    .versions
                    .rule_set(*version)?
                    .ok_or_else(|| anyhow!("version {} does not exist", version))?;
                if format == "json" {
                    Ok(serde_json::to_string_pretty(&json!({
                        "version": version,
                        "rules": rules.iter().map(|r| r.to_string()).collect::<Vec<_>>(),
                    }))?)
                } else {
                    Ok(rules
                        .iter()
                        .map(|r| r.to_string())
                        .collect::<Vec<_>>()
                        .join("\n"))
                }
            }
            VersionCommands::Current => {
                Ok(format!("current version {}", self.versions.current_version()?))
            }
        }
    }

    fn execute_oracle(&self, command: &OracleCommands) -> anyhow::Result<String> {
        match command {
            OracleCommands::Add { agent, rule } => {
                let agent = PrincipalId::new(agent.clone());
                let oracle = self.concrete_oracle(&agent)?;
                oracle.add_rule(&agent, &Rule::from(rule.as_str()))?;
                Ok(format!("{} agreed to rule {}", agent, rule))
            }
            OracleCommands::Remove { agent, rule } => {
                let agent = PrincipalId::new(agent.clone());
                let oracle = self.concrete_oracle(&agent)?;
                oracle.remove_rule(&agent, &Rule::from(rule.as_str()))?;
                Ok(format!("{} revoked rule {}", agent, rule))
            }
            OracleCommands::Attest {
                agent,
                rule,
                revoke,
            } => {
                let agent = PrincipalId::new(agent.clone());
                let oracle = self.concrete_oracle(&agent)?;
                oracle.set_attestation(&agent, &Rule::from(rule.as_str()), !revoke)?;
                Ok(format!(
                    "attestation for rule {} {}",
                    rule,
                    if *revoke { "cleared" } else { "set" }
                ))
            }
            OracleCommands::Check { agent, rule } => {
                let agent = PrincipalId::new(agent.clone());
                let oracle = self.concrete_oracle(&agent)?;
                oracle.check_compliance(&Rule::from(rule.as_str()))?;
                Ok(format!("{} is compliant with rule {}", agent, rule))
            }
        }
    }

    fn execute_member(&self, command: &MemberCommands) -> anyhow::Result<String> {
        match command {
            MemberCommands::Register {
                principal,
                rules,
                agent,
            } => {
                let principal = PrincipalId::new(principal.clone());
                let rules = parse_rules(rules);
                let (kind, oracle) = if *agent {
                    (
                        PrincipalKind::Agent,
                        Some(self.oracle_for(&principal)?),
                    )
                } else {
                    (PrincipalKind::Human, None)
                };
                let version = self.membership.register(&principal, kind, &rules, oracle)?;
                info!(principal = %principal, version, "member registered via cli");
                Ok(format!(
                    "registered {} {} under version {}",
                    kind, principal, version
                ))
            }
            MemberCommands::Leave { principal } => {
                let principal = PrincipalId::new(principal.clone());
                self.membership.leave_system(&principal)?;
                Ok(format!("{} left the system", principal))
            }
            MemberCommands::Status { format } => self.member_status(format),
            MemberCommands::Check { principal, rules } => {
                let principal = PrincipalId::new(principal.clone());
                self.membership
                    .check_compliance(&principal, &parse_rules(rules))?;
                Ok(format!("{} is compliant", principal))
            }
        }
    }

    fn member_status(&self, format: &str) -> anyhow::Result<String> {
        let members = self.membership.members()?;
        let current = self.versions.current_version()?;
        let paused = self.flags.is_paused();

        if format == "json" {
            let entries: Vec<_> = members
                .iter()
                .map(|(principal, record)| {
                    json!({
                        "principal": principal.to_string(),
                        "kind": record.kind.to_string(),
                        "version": record.version,
                    })
                })
                .collect();
            return Ok(serde_json::to_string_pretty(&json!({
                "total": members.len(),
                "current_version": current,
                "paused": paused,
                "members": entries,
            }))?);
        }

        let mut table = Table::new();
        table.set_header(vec!["principal", "kind", "version"]);
        for (principal, record) in &members {
            table.add_row(vec![
                principal.to_string(),
                record.kind.to_string(),
                record.version.to_string(),
            ]);
        }
        let state = if paused {
            "paused".red().to_string()
        } else {
            "active".green().to_string()
        };
        Ok(format!(
            "{} ({}, current version {})\n{}",
            "charter members".bold(),
            state,
            current,
            table
        ))
    }

    fn show_events(&self, format: &str) -> anyhow::Result<String> {
        let events = self.events.all()?;
        if format == "json" {
            return Ok(serde_json::to_string_pretty(&events)?);
        }
        let lines: Vec<String> = events
            .iter()
            .map(|e| serde_json::to_string(e).unwrap_or_else(|_| format!("{:?}", e)))
            .collect();
        Ok(lines.join("\n"))
    }

    fn set_paused(&self, paused: bool) -> anyhow::Result<String> {
        let runtime = self.db.open_tree("runtime")?;
        runtime.insert(PAUSED_KEY, vec![paused as u8])?;
        runtime.flush()?;
        if paused {
            self.flags.pause();
            Ok("system paused".to_string())
        } else {
            self.flags.resume();
            Ok("system resumed".to_string())
        }
    }
}

fn load_paused(db: &sled::Db, config_default: bool) -> anyhow::Result<bool> {
    let runtime = db.open_tree("runtime")?;
    Ok(match runtime.get(PAUSED_KEY)? {
        Some(value) => value.first().copied() == Some(1),
        None => config_default,
    })
}

fn default_data_dir() -> anyhow::Result<PathBuf> {
    directories::ProjectDirs::from("", "charter", "charter")
        .map(|dirs| dirs.data_local_dir().to_path_buf())
        .ok_or_else(|| anyhow!("could not determine platform data directory"))
}

fn parse_rules(rules: &[String]) -> Vec<Rule> {
    rules.iter().map(|r| Rule::from(r.as_str())).collect()
}
