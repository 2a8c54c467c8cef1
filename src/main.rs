//! webstack: compose a public ALB + Fargate web topology
//!
//! Composes the resource graph for one topology instance and emits it as
//! JSON for a provisioning engine to realize, or just validates the
//! configuration without emitting anything.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use webstack::config::{
    EnvConfig, NetworkConfig, ServiceConfig, StackConfig, DEFAULT_ADDRESS_SPACE, DEFAULT_AZ_COUNT,
    DEFAULT_CONTAINER_PORT, DEFAULT_DESIRED_COUNT, DEFAULT_IMAGE, DEFAULT_SUBNET_PREFIX_LEN,
};
use webstack::{compose, Ipv4Cidr};

#[derive(Parser, Debug)]
#[command(name = "webstack")]
#[command(about = "Composer for a public ALB + Fargate web topology")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

/// Inputs shared by every subcommand
#[derive(clap::Args, Debug)]
struct ComposeArgs {
    /// Name prefix for every resource in the topology
    #[arg(short, long)]
    prefix: String,

    /// 12-digit platform account id the topology is composed for
    #[arg(long, env = "WEBSTACK_ACCOUNT")]
    account: String,

    /// Region identifier
    #[arg(long, default_value = "ap-northeast-1")]
    region: String,

    /// Account id of the load-balancing service's log-delivery identity
    /// (platform and region specific)
    #[arg(long, env = "WEBSTACK_LOG_DELIVERY_ACCOUNT")]
    log_delivery_account: String,

    /// Address space to partition into public subnets
    #[arg(long, default_value = DEFAULT_ADDRESS_SPACE)]
    address_space: String,

    /// Number of availability zones (one public subnet each)
    #[arg(long, default_value_t = DEFAULT_AZ_COUNT)]
    az_count: u32,

    /// Prefix length of each public subnet
    #[arg(long, default_value_t = DEFAULT_SUBNET_PREFIX_LEN)]
    subnet_prefix_len: u8,

    /// Container image for the front service
    #[arg(long, default_value = DEFAULT_IMAGE)]
    image: String,

    /// Container port receiving traffic from the balancer
    #[arg(long, default_value_t = DEFAULT_CONTAINER_PORT)]
    container_port: u16,

    /// Desired replica count for the front service
    #[arg(long, default_value_t = DEFAULT_DESIRED_COUNT)]
    desired_count: u32,
}

impl ComposeArgs {
    fn into_config(self) -> Result<StackConfig> {
        let address_space: Ipv4Cidr = self
            .address_space
            .parse()
            .context("Invalid --address-space")?;
        Ok(StackConfig {
            name_prefix: self.prefix,
            log_delivery_account: self.log_delivery_account,
            env: EnvConfig {
                account_id: self.account,
                region: self.region,
            },
            network: NetworkConfig {
                address_space,
                az_count: self.az_count,
                subnet_prefix_len: self.subnet_prefix_len,
            },
            service: ServiceConfig {
                image: self.image,
                container_port: self.container_port,
                desired_count: self.desired_count,
            },
        })
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compose the topology and emit the resource graph as JSON
    Plan {
        #[command(flatten)]
        compose: ComposeArgs,

        /// Write the graph to a file instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Compose the topology and report success without emitting it
    Validate {
        #[command(flatten)]
        compose: ComposeArgs,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match args.command {
        Command::Plan { compose: inputs, output } => {
            let config = inputs.into_config()?;
            let topology = compose(&config).context("Composition failed")?;
            let json = serde_json::to_string_pretty(&topology)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json).with_context(|| format!("Writing {path}"))?;
                    info!(path = %path, "Topology written");
                }
                None => println!("{json}"),
            }
        }
        Command::Validate { compose: inputs } => {
            let config = inputs.into_config()?;
            let topology = compose(&config).context("Composition failed")?;
            info!(
                resources = topology.graph.len(),
                order = ?topology.graph.creation_order(),
                "Topology is internally consistent"
            );
            println!("ok: {} resources", topology.graph.len());
        }
    }
    Ok(())
}
