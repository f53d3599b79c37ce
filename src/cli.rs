//! Definitions of CLI arguments and commands for the deploy scripts

use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use ethers::providers::Middleware;

use crate::{
    commands::{deploy_nft, print_nft_status, set_base_uri},
    constants::DEFAULT_DEPLOYMENTS_PATH,
    errors::ScriptError,
};

/// The CLI for the ETH École NFT deploy scripts
#[derive(Parser)]
pub struct Cli {
    /// Private key of the deployer
    // TODO: Better key management
    #[arg(short, long)]
    pub priv_key: String,

    /// Network RPC URL
    #[arg(short, long)]
    pub rpc_url: String,

    /// Path of the file deployed contract addresses are recorded in
    #[arg(short, long, default_value = DEFAULT_DEPLOYMENTS_PATH)]
    pub deployments_path: String,

    /// The script to run
    #[command(subcommand)]
    pub command: Command,
}

/// The deploy scripts, run as subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Deploy the ticket NFT contract with its fixed constructor
    /// arguments and report the deployed address
    DeployNft,
    /// Print the deployed ticket NFT contract's configuration
    Status,
    /// Update the base URI ticket metadata is served under
    SetBaseUri(SetBaseUriArgs),
}

/// Update the base URI ticket metadata is served under
#[derive(Args)]
pub struct SetBaseUriArgs {
    /// The new base URI, including the trailing slash
    #[arg(short, long)]
    pub base_uri: String,
}

impl Command {
    /// Runs the selected deploy script to completion
    pub async fn run(
        self,
        client: Arc<impl Middleware>,
        deployments_path: &str,
    ) -> Result<(), ScriptError> {
        match self {
            Command::DeployNft => deploy_nft(client, deployments_path).await,
            Command::Status => print_nft_status(client, deployments_path).await,
            Command::SetBaseUri(args) => set_base_uri(args, client, deployments_path).await,
        }
    }
}
