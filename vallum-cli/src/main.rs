use std::fs;
use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use colored::Colorize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing_subscriber::EnvFilter;

use vallum_core::arn::Arn;
use vallum_provider_aws::{
    FirewallPolicySpec, FirewallSpec, NetworkFirewallProvider, RuleGroupKind, RuleGroupSpec,
    SubnetMappingSpec, TlsInspectionSpec, VpcEndpointAssociationSpec,
};

#[derive(Parser)]
#[command(name = "vallum")]
#[command(about = "Manage AWS Network Firewall resources", long_about = None)]
struct Cli {
    /// AWS region to operate in
    #[arg(long, global = true, default_value = "us-east-1")]
    region: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage firewalls
    Firewall {
        #[command(subcommand)]
        command: FirewallCommands,
    },
    /// Manage firewall policies
    Policy {
        #[command(subcommand)]
        command: PolicyCommands,
    },
    /// Manage rule groups
    RuleGroup {
        #[command(subcommand)]
        command: RuleGroupCommands,
    },
    /// Manage TLS inspection configurations
    TlsConfig {
        #[command(subcommand)]
        command: TlsCommands,
    },
    /// Manage VPC endpoint associations
    VpcEndpointAssociation {
        #[command(subcommand)]
        command: AssociationCommands,
    },
    /// Accept or reject transit gateway attachments
    TransitGateway {
        #[command(subcommand)]
        command: TransitGatewayCommands,
    },
    /// Generate shell completions
    Completions { shell: Shell },
}

#[derive(Subcommand)]
enum FirewallCommands {
    /// Create a firewall from a JSON spec and wait for READY
    Create {
        /// Path to the JSON spec file
        #[arg(long)]
        spec: PathBuf,
    },
    /// Show a firewall's current state
    Describe {
        #[arg(long)]
        name: String,
    },
    /// Apply in-place updates from a JSON spec
    Update {
        #[arg(long)]
        spec: PathBuf,
    },
    /// Reconcile the firewall's subnets to the given set
    SyncSubnets {
        #[arg(long)]
        name: String,

        /// Desired subnet id (repeatable)
        #[arg(long = "subnet-id")]
        subnet_ids: Vec<String>,
    },
    /// Delete a firewall and wait for teardown
    Delete {
        #[arg(long)]
        name: String,
    },
}

#[derive(Subcommand)]
enum PolicyCommands {
    /// Create a firewall policy from a JSON spec
    Create {
        #[arg(long)]
        spec: PathBuf,
    },
    /// Show a firewall policy's current state
    Describe {
        #[arg(long)]
        name: String,
    },
    /// Replace the policy document from a JSON spec
    Update {
        #[arg(long)]
        spec: PathBuf,
    },
    /// Delete a firewall policy
    Delete {
        #[arg(long)]
        name: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum RuleGroupKindArg {
    Stateless,
    Stateful,
}

impl From<RuleGroupKindArg> for RuleGroupKind {
    fn from(kind: RuleGroupKindArg) -> Self {
        match kind {
            RuleGroupKindArg::Stateless => RuleGroupKind::Stateless,
            RuleGroupKindArg::Stateful => RuleGroupKind::Stateful,
        }
    }
}

#[derive(Subcommand)]
enum RuleGroupCommands {
    /// Create a rule group from a JSON spec
    Create {
        #[arg(long)]
        spec: PathBuf,
    },
    /// Show a rule group's current state
    Describe {
        #[arg(long)]
        name: String,

        #[arg(long, value_enum)]
        kind: RuleGroupKindArg,
    },
    /// Replace the group's rules from a JSON spec
    Update {
        #[arg(long)]
        spec: PathBuf,
    },
    /// Delete a rule group
    Delete {
        #[arg(long)]
        name: String,

        #[arg(long, value_enum)]
        kind: RuleGroupKindArg,
    },
}

#[derive(Subcommand)]
enum TlsCommands {
    /// Create a TLS inspection configuration from a JSON spec
    Create {
        #[arg(long)]
        spec: PathBuf,
    },
    /// Show a TLS inspection configuration's current state
    Describe {
        #[arg(long)]
        name: String,
    },
    /// Replace the configuration from a JSON spec
    Update {
        #[arg(long)]
        spec: PathBuf,
    },
    /// Delete a TLS inspection configuration
    Delete {
        #[arg(long)]
        name: String,
    },
}

#[derive(Subcommand)]
enum AssociationCommands {
    /// Create a VPC endpoint association from a JSON spec
    Create {
        #[arg(long)]
        spec: PathBuf,
    },
    /// Show an association's current state
    Describe {
        #[arg(long)]
        arn: String,
    },
    /// Delete an association
    Delete {
        #[arg(long)]
        arn: String,
    },
}

#[derive(Subcommand)]
enum TransitGatewayCommands {
    /// Accept a pending attachment and wait for READY
    Accept {
        #[arg(long)]
        firewall_arn: String,

        #[arg(long)]
        attachment_id: String,
    },
    /// Reject a pending attachment
    Reject {
        #[arg(long)]
        firewall_arn: String,

        #[arg(long)]
        attachment_id: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
            Ok(())
        }
        command => {
            let provider = NetworkFirewallProvider::new(&cli.region).await;
            dispatch(&provider, command).await
        }
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn dispatch(
    provider: &NetworkFirewallProvider,
    command: Commands,
) -> Result<(), String> {
    match command {
        Commands::Firewall { command } => run_firewall(provider, command).await,
        Commands::Policy { command } => run_policy(provider, command).await,
        Commands::RuleGroup { command } => run_rule_group(provider, command).await,
        Commands::TlsConfig { command } => run_tls(provider, command).await,
        Commands::VpcEndpointAssociation { command } => run_association(provider, command).await,
        Commands::TransitGateway { command } => run_transit_gateway(provider, command).await,
        Commands::Completions { .. } => Ok(()),
    }
}

fn load_spec<T: DeserializeOwned>(path: &PathBuf) -> Result<T, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    serde_json::from_str(&content)
        .map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
}

fn print_state<T: Serialize>(state: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(state).map_err(|e| e.to_string())?;
    println!("{}", json);
    Ok(())
}

fn done(what: &str) {
    println!("{} {}", "✓".green().bold(), what);
}

async fn run_firewall(
    provider: &NetworkFirewallProvider,
    command: FirewallCommands,
) -> Result<(), String> {
    match command {
        FirewallCommands::Create { spec } => {
            let spec: FirewallSpec = load_spec(&spec)?;
            let state = provider
                .create_firewall(&spec)
                .await
                .map_err(|e| e.to_string())?;
            done(&format!("firewall {} is {}", state.name, state.status));
            print_state(&state)
        }
        FirewallCommands::Describe { name } => {
            let state = provider
                .describe_firewall(&name)
                .await
                .map_err(|e| e.to_string())?;
            print_state(&state)
        }
        FirewallCommands::Update { spec } => {
            let spec: FirewallSpec = load_spec(&spec)?;
            let state = provider
                .update_firewall(&spec)
                .await
                .map_err(|e| e.to_string())?;
            done(&format!("firewall {} updated", state.name));
            print_state(&state)
        }
        FirewallCommands::SyncSubnets { name, subnet_ids } => {
            let desired: Vec<SubnetMappingSpec> =
                subnet_ids.iter().map(SubnetMappingSpec::new).collect();
            let state = provider
                .sync_firewall_subnets(&name, &desired)
                .await
                .map_err(|e| e.to_string())?;
            done(&format!(
                "firewall {} subnets: {}",
                state.name,
                state.subnet_ids.join(", ")
            ));
            print_state(&state)
        }
        FirewallCommands::Delete { name } => {
            provider
                .delete_firewall(&name)
                .await
                .map_err(|e| e.to_string())?;
            done(&format!("firewall {} deleted", name));
            Ok(())
        }
    }
}

async fn run_policy(
    provider: &NetworkFirewallProvider,
    command: PolicyCommands,
) -> Result<(), String> {
    match command {
        PolicyCommands::Create { spec } => {
            let spec: FirewallPolicySpec = load_spec(&spec)?;
            let state = provider
                .create_firewall_policy(&spec)
                .await
                .map_err(|e| e.to_string())?;
            done(&format!("policy {} is {}", state.name, state.status));
            print_state(&state)
        }
        PolicyCommands::Describe { name } => {
            let state = provider
                .describe_firewall_policy(&name)
                .await
                .map_err(|e| e.to_string())?;
            print_state(&state)
        }
        PolicyCommands::Update { spec } => {
            let spec: FirewallPolicySpec = load_spec(&spec)?;
            let state = provider
                .update_firewall_policy(&spec)
                .await
                .map_err(|e| e.to_string())?;
            done(&format!("policy {} updated", state.name));
            print_state(&state)
        }
        PolicyCommands::Delete { name } => {
            provider
                .delete_firewall_policy(&name)
                .await
                .map_err(|e| e.to_string())?;
            done(&format!("policy {} deleted", name));
            Ok(())
        }
    }
}

async fn run_rule_group(
    provider: &NetworkFirewallProvider,
    command: RuleGroupCommands,
) -> Result<(), String> {
    match command {
        RuleGroupCommands::Create { spec } => {
            let spec: RuleGroupSpec = load_spec(&spec)?;
            let state = provider
                .create_rule_group(&spec)
                .await
                .map_err(|e| e.to_string())?;
            done(&format!("rule group {} is {}", state.name, state.status));
            print_state(&state)
        }
        RuleGroupCommands::Describe { name, kind } => {
            let state = provider
                .describe_rule_group(&name, kind.into())
                .await
                .map_err(|e| e.to_string())?;
            print_state(&state)
        }
        RuleGroupCommands::Update { spec } => {
            let spec: RuleGroupSpec = load_spec(&spec)?;
            let state = provider
                .update_rule_group(&spec)
                .await
                .map_err(|e| e.to_string())?;
            done(&format!("rule group {} updated", state.name));
            print_state(&state)
        }
        RuleGroupCommands::Delete { name, kind } => {
            provider
                .delete_rule_group(&name, kind.into())
                .await
                .map_err(|e| e.to_string())?;
            done(&format!("rule group {} deleted", name));
            Ok(())
        }
    }
}

async fn run_tls(provider: &NetworkFirewallProvider, command: TlsCommands) -> Result<(), String> {
    match command {
        TlsCommands::Create { spec } => {
            let spec: TlsInspectionSpec = load_spec(&spec)?;
            let state = provider
                .create_tls_inspection_configuration(&spec)
                .await
                .map_err(|e| e.to_string())?;
            done(&format!("TLS config {} is {}", state.name, state.status));
            print_state(&state)
        }
        TlsCommands::Describe { name } => {
            let state = provider
                .describe_tls_inspection_configuration(&name)
                .await
                .map_err(|e| e.to_string())?;
            print_state(&state)
        }
        TlsCommands::Update { spec } => {
            let spec: TlsInspectionSpec = load_spec(&spec)?;
            let state = provider
                .update_tls_inspection_configuration(&spec)
                .await
                .map_err(|e| e.to_string())?;
            done(&format!("TLS config {} updated", state.name));
            print_state(&state)
        }
        TlsCommands::Delete { name } => {
            provider
                .delete_tls_inspection_configuration(&name)
                .await
                .map_err(|e| e.to_string())?;
            done(&format!("TLS config {} deleted", name));
            Ok(())
        }
    }
}

async fn run_association(
    provider: &NetworkFirewallProvider,
    command: AssociationCommands,
) -> Result<(), String> {
    match command {
        AssociationCommands::Create { spec } => {
            let spec: VpcEndpointAssociationSpec = load_spec(&spec)?;
            let state = provider
                .create_vpc_endpoint_association(&spec)
                .await
                .map_err(|e| e.to_string())?;
            done(&format!("association {} is {}", state.arn, state.status));
            print_state(&state)
        }
        AssociationCommands::Describe { arn } => {
            let state = provider
                .describe_vpc_endpoint_association(&Arn::from(arn))
                .await
                .map_err(|e| e.to_string())?;
            print_state(&state)
        }
        AssociationCommands::Delete { arn } => {
            let arn = Arn::from(arn);
            provider
                .delete_vpc_endpoint_association(&arn)
                .await
                .map_err(|e| e.to_string())?;
            done(&format!("association {} deleted", arn));
            Ok(())
        }
    }
}

async fn run_transit_gateway(
    provider: &NetworkFirewallProvider,
    command: TransitGatewayCommands,
) -> Result<(), String> {
    match command {
        TransitGatewayCommands::Accept {
            firewall_arn,
            attachment_id,
        } => {
            let state = provider
                .accept_transit_gateway_attachment(&Arn::from(firewall_arn), &attachment_id)
                .await
                .map_err(|e| e.to_string())?;
            done(&format!(
                "attachment {} is {}",
                state.attachment_id, state.status
            ));
            print_state(&state)
        }
        TransitGatewayCommands::Reject {
            firewall_arn,
            attachment_id,
        } => {
            let state = provider
                .reject_transit_gateway_attachment(&Arn::from(firewall_arn), &attachment_id)
                .await
                .map_err(|e| e.to_string())?;
            done(&format!(
                "attachment {} is {}",
                state.attachment_id, state.status
            ));
            print_state(&state)
        }
    }
}
