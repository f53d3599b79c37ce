//! Utilities for the deploy scripts.

use std::{
    fs::{self, File},
    io::Read,
    path::PathBuf,
    str::FromStr,
    sync::Arc,
};

use ethers::{
    abi::{Address, Contract},
    middleware::SignerMiddleware,
    providers::{Http, Middleware, Provider},
    signers::{LocalWallet, Signer},
    types::{Bytes, U256},
    utils::hex::FromHex,
};
use json::JsonValue;

use crate::{
    constants::{DEPLOYMENTS_KEY, NFT_CONTRACT_KEY, NFT_CONTRACT_NAME, TICKET_ABI, TICKET_BYTECODE},
    errors::ScriptError,
};

/// Sets up the client with which the deploy scripts interact with the chain,
/// attaching a signer derived from the given private key to the RPC provider.
pub async fn setup_client(
    priv_key: &str,
    rpc_url: &str,
) -> Result<Arc<impl Middleware>, ScriptError> {
    let provider = Provider::<Http>::try_from(rpc_url)
        .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;

    let wallet = LocalWallet::from_str(priv_key)
        .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;
    let chain_id = provider
        .get_chainid()
        .await
        .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?
        .as_u64();
    let client = Arc::new(SignerMiddleware::new(
        provider,
        wallet.with_chain_id(chain_id),
    ));

    Ok(client)
}

/// Looks up the embedded compilation artifact for the given contract name,
/// returning its parsed ABI and creation bytecode
pub fn contract_artifact(name: &str) -> Result<(Contract, Bytes), ScriptError> {
    let (abi_str, bytecode_str) = match name {
        NFT_CONTRACT_NAME => (TICKET_ABI, TICKET_BYTECODE),
        _ => return Err(ScriptError::UnknownContract(name.to_string())),
    };

    let abi: Contract =
        serde_json::from_str(abi_str).map_err(|e| ScriptError::ArtifactParsing(e.to_string()))?;

    let bytecode = Bytes::from_hex(bytecode_str.trim())
        .map_err(|e| ScriptError::ArtifactParsing(e.to_string()))?;

    Ok((abi, bytecode))
}

/// Maps a contract name to its key in the deployments file
pub fn deployments_file_key(name: &str) -> Result<&'static str, ScriptError> {
    match name {
        NFT_CONTRACT_NAME => Ok(NFT_CONTRACT_KEY),
        _ => Err(ScriptError::UnknownContract(name.to_string())),
    }
}

/// Parses the deployments file into a JSON value
pub fn get_json_from_file(file_path: &str) -> Result<JsonValue, ScriptError> {
    let mut file_contents = String::new();
    File::open(file_path)
        .map_err(|e| ScriptError::ReadDeployments(e.to_string()))?
        .read_to_string(&mut file_contents)
        .map_err(|e| ScriptError::ReadDeployments(e.to_string()))?;

    json::parse(&file_contents).map_err(|e| ScriptError::ReadDeployments(e.to_string()))
}

/// Reads the address recorded under the given contract key
/// from the deployments file
pub fn parse_addr_from_deployments_file(
    file_path: &str,
    contract_key: &str,
) -> Result<Address, ScriptError> {
    let parsed_json = get_json_from_file(file_path)?;

    Address::from_str(
        parsed_json[DEPLOYMENTS_KEY][contract_key]
            .as_str()
            .ok_or_else(|| {
                ScriptError::ReadDeployments(
                    "could not parse contract address from deployments file".to_string(),
                )
            })?,
    )
    .map_err(|e| ScriptError::ReadDeployments(e.to_string()))
}

/// Records the address of a deployed contract in the deployments file
pub fn write_deployed_address(
    file_path: &str,
    contract_key: &str,
    address: Address,
) -> Result<(), ScriptError> {
    // If the file doesn't exist, create it
    if !PathBuf::from(file_path).exists() {
        fs::write(file_path, "{}").map_err(|e| ScriptError::WriteDeployments(e.to_string()))?;
    }
    let mut parsed_json = get_json_from_file(file_path)?;

    parsed_json[DEPLOYMENTS_KEY][contract_key] = JsonValue::String(format!("{address:#x}"));

    fs::write(file_path, json::stringify_pretty(parsed_json, 4))
        .map_err(|e| ScriptError::WriteDeployments(e.to_string()))?;

    Ok(())
}

/// Converts a human-readable decimal amount into the smallest unit
/// of a token with the given number of decimals
pub fn parse_token_units(amount: &str, decimals: u32) -> Result<U256, ScriptError> {
    ethers::utils::parse_units(amount, decimals)
        .map(U256::from)
        .map_err(|e| ScriptError::CalldataConstruction(e.to_string()))
}

#[cfg(test)]
mod tests {
    use ethers::abi::{Address, ParamType};
    use ethers::types::U256;

    use crate::constants::{NFT_CONTRACT_KEY, NFT_CONTRACT_NAME};
    use crate::errors::ScriptError;

    use super::{
        contract_artifact, parse_addr_from_deployments_file, parse_token_units,
        write_deployed_address,
    };

    /// Returns a unique temp file path for a deployments file test
    fn temp_deployments_path(tag: &str) -> String {
        std::env::temp_dir()
            .join(format!("deployments-{tag}-{}.json", std::process::id()))
            .to_string_lossy()
            .into_owned()
    }

    #[test]
    fn test_parse_token_units() {
        assert_eq!(parse_token_units("1", 18).unwrap(), U256::exp10(18));
        assert_eq!(
            parse_token_units("0.5", 18).unwrap(),
            U256::exp10(17) * U256::from(5)
        );
        assert_eq!(parse_token_units("2", 6).unwrap(), U256::from(2_000_000));
        assert!(parse_token_units("not a number", 18).is_err());
    }

    #[test]
    fn test_ticket_artifact_parses() {
        let (abi, bytecode) = contract_artifact(NFT_CONTRACT_NAME).unwrap();
        assert!(!bytecode.is_empty());

        let constructor = abi.constructor().unwrap();
        let kinds: Vec<_> = constructor.inputs.iter().map(|p| p.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                ParamType::Uint(256),
                ParamType::Address,
                ParamType::Uint(256),
                ParamType::String,
            ]
        );
    }

    #[test]
    fn test_unknown_contract_artifact() {
        assert!(matches!(
            contract_artifact("NotARealContract"),
            Err(ScriptError::UnknownContract(_))
        ));
    }

    #[test]
    fn test_deployments_file_roundtrip() {
        let path = temp_deployments_path("roundtrip");
        let address: Address = "0x00000000000000000000000000000000deadbeef"
            .parse()
            .unwrap();

        write_deployed_address(&path, NFT_CONTRACT_KEY, address).unwrap();
        let parsed = parse_addr_from_deployments_file(&path, NFT_CONTRACT_KEY).unwrap();
        assert_eq!(parsed, address);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_deployments_file() {
        let path = temp_deployments_path("missing");
        assert!(matches!(
            parse_addr_from_deployments_file(&path, NFT_CONTRACT_KEY),
            Err(ScriptError::ReadDeployments(_))
        ));
    }
}
