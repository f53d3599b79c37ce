//! Implementations of the various deploy scripts

use std::{str::FromStr, sync::Arc};

use ethers::{
    abi::{Address, Token},
    providers::Middleware,
};
use tracing::info;

use crate::{
    cli::SetBaseUriArgs,
    constants::{
        METADATA_BASE_URI, NFT_CONTRACT_NAME, PAYMENT_TOKEN_ADDRESS, PAYMENT_TOKEN_DECIMALS,
        TICKET_PRICE, TICKET_SUPPLY_CAP,
    },
    environment::{DeployEnvironment, DeployOptions, Deployments, NamedAccounts},
    errors::ScriptError,
    utils::parse_token_units,
};

/// Deploys the ticket NFT contract with its fixed constructor arguments
/// and reports the deployed address
pub async fn deploy_nft(
    client: Arc<impl Middleware>,
    deployments_path: &str,
) -> Result<(), ScriptError> {
    let env = DeployEnvironment::new(client, deployments_path);

    // The chain id is resolved for reporting only, the deployment is
    // identical on every chain
    let chain_id = env.get_chain_id().await?;
    let NamedAccounts { deployer } = env.get_named_accounts()?;
    info!(
        "deploying {} from {:#x} on chain {}",
        NFT_CONTRACT_NAME, deployer, chain_id
    );

    let deployment = env
        .deployments()
        .deploy(NFT_CONTRACT_NAME, nft_deploy_options(deployer)?)
        .await?;

    println!("{}", nft_deployed_log_line(deployment.address));

    Ok(())
}

/// Prints the configuration of the deployed ticket NFT contract
pub async fn print_nft_status(
    client: Arc<impl Middleware>,
    deployments_path: &str,
) -> Result<(), ScriptError> {
    let env = DeployEnvironment::new(client, deployments_path);
    let deployments = env.deployments();

    let address = deployments.address_of(NFT_CONTRACT_NAME)?;
    let total_supply = read_single(deployments, "totalSupply")
        .await?
        .into_uint()
        .ok_or_else(|| unexpected_return_type("totalSupply"))?;
    let max_supply = read_single(deployments, "maxSupply")
        .await?
        .into_uint()
        .ok_or_else(|| unexpected_return_type("maxSupply"))?;
    let ticket_price = read_single(deployments, "ticketPrice")
        .await?
        .into_uint()
        .ok_or_else(|| unexpected_return_type("ticketPrice"))?;
    let payment_token = read_single(deployments, "paymentToken")
        .await?
        .into_address()
        .ok_or_else(|| unexpected_return_type("paymentToken"))?;
    let base_uri = read_single(deployments, "baseURI")
        .await?
        .into_string()
        .ok_or_else(|| unexpected_return_type("baseURI"))?;

    println!("{} at {:#x}", NFT_CONTRACT_NAME, address);
    println!("  tickets minted: {}/{}", total_supply, max_supply);
    println!("  ticket price: {} payment token units", ticket_price);
    println!("  payment token: {:#x}", payment_token);
    println!("  metadata base URI: {}", base_uri);

    Ok(())
}

/// Points the ticket NFT contract's metadata at a new base URI
pub async fn set_base_uri(
    args: SetBaseUriArgs,
    client: Arc<impl Middleware>,
    deployments_path: &str,
) -> Result<(), ScriptError> {
    let env = DeployEnvironment::new(client, deployments_path);

    let tx_hash = env
        .deployments()
        .execute(
            NFT_CONTRACT_NAME,
            "setBaseURI",
            &[Token::String(args.base_uri)],
        )
        .await?;

    println!("Set base URI in {:#x}", tx_hash);

    Ok(())
}

/// Builds the deployment options for the ticket NFT contract.
///
/// The deployment is always deterministic, so repeated deploys with
/// identical bytecode and arguments land at the same address.
fn nft_deploy_options(deployer: Address) -> Result<DeployOptions, ScriptError> {
    Ok(DeployOptions {
        from: deployer,
        args: nft_constructor_args()?,
        deterministic: true,
    })
}

/// The fixed constructor arguments of the ticket NFT contract
fn nft_constructor_args() -> Result<Vec<Token>, ScriptError> {
    // The constant is known to be a valid address
    let payment_token = Address::from_str(PAYMENT_TOKEN_ADDRESS).unwrap();
    let price = parse_token_units(TICKET_PRICE, PAYMENT_TOKEN_DECIMALS)?;

    Ok(vec![
        Token::Uint(TICKET_SUPPLY_CAP.into()),
        Token::Address(payment_token),
        Token::Uint(price),
        Token::String(METADATA_BASE_URI.to_string()),
    ])
}

/// The line reporting a successful NFT deployment
fn nft_deployed_log_line(address: Address) -> String {
    format!("Deployed NFT to {:#x}", address)
}

/// Reads a method expected to return a single value
/// from the ticket NFT contract
async fn read_single(
    deployments: &Deployments<impl Middleware>,
    method: &str,
) -> Result<Token, ScriptError> {
    deployments
        .read(NFT_CONTRACT_NAME, method, &[])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ScriptError::ContractInteraction(format!("{} returned no value", method)))
}

/// Builds the error for a value of unexpected type returned by a read
fn unexpected_return_type(method: &str) -> ScriptError {
    ScriptError::ContractInteraction(format!("{} returned an unexpected type", method))
}
