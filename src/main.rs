//! Cloudflare Access Rules Agent
//!
//! Manages firewall access rules and virtual DNS clusters from the command
//! line. The API token comes from `CLOUDFLARE_API_TOKEN` or, failing that,
//! from Google Secret Manager.
//!
//! # Usage
//! ```bash
//! # List zone rules
//! cf-access-rules rule list --zone example.com
//!
//! # Block an IP range for the whole organization
//! cf-access-rules rule create --zone example.com --scope organization \
//!     --mode block --target ip_range --value 198.51.100.0/24
//!
//! # Inspect a rule by import ID
//! cf-access-rules rule show zone/example.com/92f17202ed8bd63d69a66b86a49a8f6b
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use cloudflare_access_rules::config::{ApiSettings, CredentialSettings};
use cloudflare_access_rules::{
    AccessRuleConfiguration, AccessRuleMode, AccessRuleResource, AccessRuleSpec,
    AccessRuleTarget, CloudflareClient, LookupCache, ScopeKind, VirtualDnsResource,
    VirtualDnsSpec,
};

// ============================================================
// CLI Definition
// ============================================================

#[derive(Parser)]
#[command(name = "cf-access-rules")]
#[command(about = "Cloudflare firewall access rule and virtual DNS agent", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    api: ApiSettings,

    #[command(flatten)]
    credentials: CredentialSettings,

    /// Account (organization) ID owning virtual DNS clusters
    #[arg(long, env = "CLOUDFLARE_ACCOUNT_ID")]
    account_id: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Firewall access rules
    #[command(subcommand)]
    Rule(RuleCommand),

    /// Virtual DNS clusters
    #[command(subcommand)]
    VirtualDns(VirtualDnsCommand),
}

#[derive(Subcommand)]
enum RuleCommand {
    /// List every rule in a zone or its organization
    List {
        /// Zone name (e.g., example.com)
        #[arg(long)]
        zone: String,

        /// zone or organization
        #[arg(long, default_value = "zone")]
        scope: ScopeKind,
    },

    /// Create a rule
    Create {
        #[arg(long)]
        zone: String,

        /// zone or organization
        #[arg(long)]
        scope: ScopeKind,

        /// block, challenge, whitelist or js_challenge
        #[arg(long)]
        mode: AccessRuleMode,

        /// ip, ip_range, asn or country
        #[arg(long)]
        target: AccessRuleTarget,

        /// Address, CIDR range, ASN (AS13335) or country code
        #[arg(long)]
        value: String,

        #[arg(long, default_value = "")]
        notes: String,
    },

    /// Show a rule by import ID (scope/zoneName/ruleID)
    Show { import_id: String },

    /// Change mode, match or notes of a rule
    Update {
        /// scope/zoneName/ruleID
        import_id: String,

        #[arg(long)]
        mode: Option<AccessRuleMode>,

        #[arg(long, requires = "value")]
        target: Option<AccessRuleTarget>,

        #[arg(long)]
        value: Option<String>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Delete a rule by import ID
    Delete { import_id: String },
}

#[derive(Subcommand)]
enum VirtualDnsCommand {
    /// Create a cluster
    Create {
        #[command(flatten)]
        settings: ClusterArgs,
    },

    /// Show a cluster
    Show { id: String },

    /// Replace a cluster's settings
    Update {
        id: String,

        #[command(flatten)]
        settings: ClusterArgs,

        /// Pin resolver addresses (repeatable)
        #[arg(long = "virtual-ip")]
        virtual_ips: Vec<String>,
    },

    /// Delete a cluster
    Delete { id: String },
}

#[derive(clap::Args)]
struct ClusterArgs {
    #[arg(long)]
    name: String,

    /// Upstream nameserver address (repeatable)
    #[arg(long = "origin-ip", required = true)]
    origin_ips: Vec<String>,

    #[arg(long, default_value_t = 60)]
    minimum_cache_ttl: u32,

    #[arg(long, default_value_t = 900)]
    maximum_cache_ttl: u32,

    #[arg(long)]
    deprecate_any_requests: bool,

    #[arg(long)]
    ecs_fallback: bool,

    #[arg(long, default_value_t = 5000)]
    ratelimit: u32,
}

impl ClusterArgs {
    fn into_spec(self, virtual_dns_ips: Vec<String>) -> VirtualDnsSpec {
        VirtualDnsSpec {
            virtual_dns_ips,
            minimum_cache_ttl: self.minimum_cache_ttl,
            maximum_cache_ttl: self.maximum_cache_ttl,
            deprecate_any_requests: self.deprecate_any_requests,
            ecs_fallback: self.ecs_fallback,
            ratelimit: self.ratelimit,
            ..VirtualDnsSpec::new(self.name, self.origin_ips)
        }
    }
}

// ============================================================
// Main Entry Point
// ============================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false);
    if cli.json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    info!("🚀 Cloudflare access rules agent starting...");

    let api_token = cli.credentials.resolve_token().await?;
    let client = Arc::new(
        CloudflareClient::new(api_token, &cli.api).context("Failed to build Cloudflare client")?,
    );

    match cli.command {
        Commands::Rule(command) => {
            let rules = AccessRuleResource::new(client, Arc::new(LookupCache::new()))
                .with_max_pages(cli.api.max_pages);
            run_rule_command(&rules, command).await
        }
        Commands::VirtualDns(command) => {
            let account_id = cli
                .account_id
                .context("virtual DNS commands need --account-id or CLOUDFLARE_ACCOUNT_ID")?;
            let clusters = VirtualDnsResource::new(client, account_id);
            run_virtual_dns_command(&clusters, command).await
        }
    }
}

async fn run_rule_command(
    rules: &AccessRuleResource<CloudflareClient>,
    command: RuleCommand,
) -> Result<()> {
    match command {
        RuleCommand::List { zone, scope } => {
            info!("📋 Listing {} access rules for zone: {}", scope, zone);
            let (scope, found) = rules.list(&zone, scope).await?;

            println!("\n{:<34} {:<13} {:<9} {:<40}", "ID", "MODE", "TARGET", "VALUE");
            println!("{}", "-".repeat(100));
            for rule in &found {
                println!(
                    "{:<34} {:<13} {:<9} {:<40}",
                    rule.id,
                    rule.mode.to_string(),
                    rule.configuration.target.to_string(),
                    truncate(&rule.configuration.value, 40)
                );
            }

            info!("✅ Listed {} rules in {}", found.len(), scope);
        }

        RuleCommand::Create { zone, scope, mode, target, value, notes } => {
            info!("➕ Creating {} rule: {} {} {}", scope, mode, target, value);
            let spec = AccessRuleSpec {
                zone,
                scope,
                mode,
                configuration: AccessRuleConfiguration { target, value },
                notes,
            };
            let state = rules.create(&spec).await?;
            print_json(&state)?;
        }

        RuleCommand::Show { import_id } => {
            let state = rules.import(&import_id).await?;
            print_json(&state)?;
        }

        RuleCommand::Update { import_id, mode, target, value, notes } => {
            let state = rules.import(&import_id).await?;
            let configuration = match value {
                Some(value) => AccessRuleConfiguration {
                    target: target.unwrap_or(state.configuration.target),
                    value,
                },
                None => state.configuration.clone(),
            };
            let spec = AccessRuleSpec {
                zone: state.zone.clone(),
                scope: state.scope.kind(),
                mode: mode.unwrap_or(state.mode),
                configuration,
                notes: notes.unwrap_or_else(|| state.notes.clone()),
            };

            info!("✏️  Updating access rule: {}", state.id);
            let updated = rules.update(&state, &spec).await?;
            print_json(&updated)?;
        }

        RuleCommand::Delete { import_id } => {
            let state = rules.import(&import_id).await?;
            warn!("🗑️  Deleting access rule: {}", state.id);
            rules.delete(&state).await?;
            println!("✅ Deleted rule: {}", state.id);
        }
    }

    Ok(())
}

async fn run_virtual_dns_command(
    clusters: &VirtualDnsResource<CloudflareClient>,
    command: VirtualDnsCommand,
) -> Result<()> {
    match command {
        VirtualDnsCommand::Create { settings } => {
            info!("➕ Creating virtual DNS cluster: {}", settings.name);
            let cluster = clusters.create(&settings.into_spec(Vec::new())).await?;
            print_json(&cluster)?;
        }

        VirtualDnsCommand::Show { id } => match clusters.read(&id).await? {
            Some(cluster) => print_json(&cluster)?,
            None => warn!("Virtual DNS cluster {} does not exist", id),
        },

        VirtualDnsCommand::Update { id, settings, virtual_ips } => {
            info!("✏️  Updating virtual DNS cluster: {}", id);
            let cluster = clusters.update(&id, &settings.into_spec(virtual_ips)).await?;
            print_json(&cluster)?;
        }

        VirtualDnsCommand::Delete { id } => {
            warn!("🗑️  Deleting virtual DNS cluster: {}", id);
            clusters.delete(&id).await?;
            println!("✅ Deleted virtual DNS cluster: {}", id);
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let head: String = s.chars().take(max - 3).collect();
        format!("{}...", head)
    } else {
        s.to_string()
    }
}
