//! The deployment environment handed to the deploy scripts: named-account
//! resolution, chain-id resolution, and the deploy/execute/read capabilities
//! over the recorded contract deployments

use std::{str::FromStr, sync::Arc};

use ethers::{
    abi::{Address, Contract, Token},
    contract::ContractFactory,
    providers::Middleware,
    types::{transaction::eip2718::TypedTransaction, Bytes, TransactionRequest, H256},
    utils::get_create2_address,
};
use tracing::log::warn;

use crate::{
    constants::{
        DETERMINISTIC_DEPLOYMENT_PROXY, DETERMINISTIC_DEPLOYMENT_SALT, NUM_DEPLOY_CONFIRMATIONS,
    },
    errors::ScriptError,
    utils::{
        contract_artifact, deployments_file_key, parse_addr_from_deployments_file,
        write_deployed_address,
    },
};

/// The named accounts available to the deploy scripts
pub struct NamedAccounts {
    /// The account which signs and funds deployment transactions
    pub deployer: Address,
}

/// Options controlling a single contract deployment
pub struct DeployOptions {
    /// The account the deployment transaction is sent from
    pub from: Address,
    /// The constructor arguments passed at contract creation time
    pub args: Vec<Token>,
    /// Whether to derive the deployment address from the contract's
    /// init code rather than the sender nonce
    pub deterministic: bool,
}

/// The result of a contract deployment
pub struct Deployment {
    /// The address of the deployed contract
    pub address: Address,
    /// The hash of the deployment transaction, `None` if an existing
    /// deterministic deployment was reused
    pub transaction_hash: Option<H256>,
    /// Whether the deployment created a new contract instance
    pub newly_deployed: bool,
}

/// The environment a deploy script runs against
pub struct DeployEnvironment<M: Middleware> {
    /// The RPC client used for chain metadata queries
    client: Arc<M>,
    /// The deploy/execute/read capabilities
    deployments: Deployments<M>,
}

impl<M: Middleware> DeployEnvironment<M> {
    /// Constructs a new deploy environment over the given client,
    /// recording deployments at the given path
    pub fn new(client: Arc<M>, deployments_path: &str) -> Self {
        Self {
            deployments: Deployments::new(client.clone(), deployments_path),
            client,
        }
    }

    /// Resolves the chain id of the connected node
    pub async fn get_chain_id(&self) -> Result<u64, ScriptError> {
        self.client
            .get_chainid()
            .await
            .map(|id| id.as_u64())
            .map_err(|e| ScriptError::ChainIdFetching(e.to_string()))
    }

    /// Resolves the named accounts from the client's attached signer
    pub fn get_named_accounts(&self) -> Result<NamedAccounts, ScriptError> {
        let deployer = self.client.default_sender().ok_or_else(|| {
            ScriptError::AccountResolution("client does not have sender attached".to_string())
        })?;

        Ok(NamedAccounts { deployer })
    }

    /// Returns the deployments capability set
    pub fn deployments(&self) -> &Deployments<M> {
        &self.deployments
    }
}

/// The deploy/execute/read capabilities over the contracts
/// recorded in the deployments file
pub struct Deployments<M: Middleware> {
    /// The RPC client transactions and calls are sent through
    client: Arc<M>,
    /// The path of the deployments file
    deployments_path: String,
}

impl<M: Middleware> Deployments<M> {
    /// Constructs a new capability set over the given client,
    /// recording deployments at the given path
    pub fn new(client: Arc<M>, deployments_path: &str) -> Self {
        Self {
            client,
            deployments_path: deployments_path.to_string(),
        }
    }

    /// Deploys the named contract and records its address
    /// in the deployments file
    pub async fn deploy(&self, name: &str, opts: DeployOptions) -> Result<Deployment, ScriptError> {
        let (abi, bytecode) = contract_artifact(name)?;

        let deployment = if opts.deterministic {
            let init_code = encode_init_code(&abi, &bytecode, &opts.args)?;
            self.deploy_deterministic(name, init_code, &opts).await?
        } else {
            self.deploy_from_factory(abi, bytecode, opts.args).await?
        };

        write_deployed_address(
            &self.deployments_path,
            deployments_file_key(name)?,
            deployment.address,
        )?;

        Ok(deployment)
    }

    /// Sends a state-mutating call to the recorded deployment of the
    /// named contract, returning the transaction hash once mined
    pub async fn execute(
        &self,
        name: &str,
        method: &str,
        args: &[Token],
    ) -> Result<H256, ScriptError> {
        let address = self.address_of(name)?;
        let (abi, _) = contract_artifact(name)?;
        let function = abi
            .function(method)
            .map_err(|e| ScriptError::CalldataConstruction(e.to_string()))?;
        let data = function
            .encode_input(args)
            .map_err(|e| ScriptError::CalldataConstruction(e.to_string()))?;

        let tx = TransactionRequest::new().to(address).data(data);
        let receipt = self
            .client
            .send_transaction(tx, None /* block */)
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?
            .ok_or_else(|| {
                ScriptError::ContractInteraction(
                    "transaction was dropped from the mempool".to_string(),
                )
            })?;

        Ok(receipt.transaction_hash)
    }

    /// Calls a view method on the recorded deployment of the named
    /// contract, decoding its outputs
    pub async fn read(
        &self,
        name: &str,
        method: &str,
        args: &[Token],
    ) -> Result<Vec<Token>, ScriptError> {
        let address = self.address_of(name)?;
        let (abi, _) = contract_artifact(name)?;
        let function = abi
            .function(method)
            .map_err(|e| ScriptError::CalldataConstruction(e.to_string()))?;
        let data = function
            .encode_input(args)
            .map_err(|e| ScriptError::CalldataConstruction(e.to_string()))?;

        let tx: TypedTransaction = TransactionRequest::new().to(address).data(data).into();
        let output = self
            .client
            .call(&tx, None /* block */)
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;

        function
            .decode_output(&output)
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))
    }

    /// Looks up the recorded address of the named contract
    pub fn address_of(&self, name: &str) -> Result<Address, ScriptError> {
        parse_addr_from_deployments_file(&self.deployments_path, deployments_file_key(name)?)
    }

    /// Deploys the given init code through the deterministic deployment
    /// proxy, reusing the existing contract if one is already deployed
    /// at the derived address
    async fn deploy_deterministic(
        &self,
        name: &str,
        init_code: Vec<u8>,
        opts: &DeployOptions,
    ) -> Result<Deployment, ScriptError> {
        // The proxy lives at the same address on every chain,
        // the constant is known to be a valid address
        let proxy = Address::from_str(DETERMINISTIC_DEPLOYMENT_PROXY).unwrap();
        let address = deterministic_deployment_address(&init_code);

        let existing = self
            .client
            .get_code(address, None /* block */)
            .await
            .map_err(|e| ScriptError::ContractDeployment(e.to_string()))?;
        if !existing.is_empty() {
            warn!("reusing existing deployment of {} at {:#x}", name, address);
            return Ok(Deployment {
                address,
                transaction_hash: None,
                newly_deployed: false,
            });
        }

        let data = [DETERMINISTIC_DEPLOYMENT_SALT.as_slice(), &init_code].concat();
        let tx = TransactionRequest::new()
            .from(opts.from)
            .to(proxy)
            .data(data);

        let receipt = self
            .client
            .send_transaction(tx, None /* block */)
            .await
            .map_err(|e| ScriptError::ContractDeployment(e.to_string()))?
            .confirmations(NUM_DEPLOY_CONFIRMATIONS)
            .await
            .map_err(|e| ScriptError::ContractDeployment(e.to_string()))?
            .ok_or_else(|| {
                ScriptError::ContractDeployment(
                    "deployment transaction was dropped from the mempool".to_string(),
                )
            })?;

        // The proxy reverts without deploying code if the create fails
        let deployed = self
            .client
            .get_code(address, None /* block */)
            .await
            .map_err(|e| ScriptError::ContractDeployment(e.to_string()))?;
        if deployed.is_empty() {
            return Err(ScriptError::ContractDeployment(format!(
                "no code at deterministic address {address:#x} after deployment"
            )));
        }

        Ok(Deployment {
            address,
            transaction_hash: Some(receipt.transaction_hash),
            newly_deployed: true,
        })
    }

    /// Deploys the contract through a nonce-derived factory deployment
    async fn deploy_from_factory(
        &self,
        abi: Contract,
        bytecode: Bytes,
        args: Vec<Token>,
    ) -> Result<Deployment, ScriptError> {
        let factory = ContractFactory::new(abi, bytecode, self.client.clone());

        let (contract, receipt) = factory
            .deploy_tokens(args)
            .map_err(|e| ScriptError::ContractDeployment(e.to_string()))?
            .confirmations(NUM_DEPLOY_CONFIRMATIONS)
            .send_with_receipt()
            .await
            .map_err(|e| ScriptError::ContractDeployment(e.to_string()))?;

        Ok(Deployment {
            address: contract.address(),
            transaction_hash: Some(receipt.transaction_hash),
            newly_deployed: true,
        })
    }
}

/// Encodes the constructor arguments onto the creation bytecode,
/// producing the init code for a deployment
pub fn encode_init_code(
    abi: &Contract,
    bytecode: &Bytes,
    args: &[Token],
) -> Result<Vec<u8>, ScriptError> {
    match abi.constructor() {
        Some(constructor) => constructor
            .encode_input(bytecode.to_vec(), args)
            .map_err(|e| ScriptError::CalldataConstruction(e.to_string())),
        None if args.is_empty() => Ok(bytecode.to_vec()),
        None => Err(ScriptError::CalldataConstruction(
            "constructor arguments provided for a contract without a constructor".to_string(),
        )),
    }
}

/// Computes the address at which the deterministic deployment proxy
/// creates the given init code.
///
/// The address depends only on the init code and the fixed salt, so
/// identical deployments land at the same address on every chain.
pub fn deterministic_deployment_address(init_code: &[u8]) -> Address {
    // The constant is known to be a valid address
    let proxy = Address::from_str(DETERMINISTIC_DEPLOYMENT_PROXY).unwrap();
    get_create2_address(proxy, DETERMINISTIC_DEPLOYMENT_SALT, init_code)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ethers::abi::{Address, Token};
    use ethers::providers::Provider;
    use ethers::types::{Bytes, U256};

    use crate::constants::{
        METADATA_BASE_URI, NFT_CONTRACT_KEY, NFT_CONTRACT_NAME, PAYMENT_TOKEN_ADDRESS,
    };
    use crate::errors::ScriptError;
    use crate::utils::{contract_artifact, parse_addr_from_deployments_file};

    use super::{
        deterministic_deployment_address, encode_init_code, DeployEnvironment, DeployOptions,
        Deployments,
    };

    fn nft_test_args() -> Vec<Token> {
        vec![
            Token::Uint(U256::from(100)),
            Token::Address(PAYMENT_TOKEN_ADDRESS.parse().unwrap()),
            Token::Uint(U256::exp10(18)),
            Token::String(METADATA_BASE_URI.to_string()),
        ]
    }

    fn nft_init_code(args: &[Token]) -> Vec<u8> {
        let (abi, bytecode) = contract_artifact(NFT_CONTRACT_NAME).unwrap();
        encode_init_code(&abi, &bytecode, args).unwrap()
    }

    #[test]
    fn test_deterministic_address_is_stable() {
        let first = deterministic_deployment_address(&nft_init_code(&nft_test_args()));
        let second = deterministic_deployment_address(&nft_init_code(&nft_test_args()));
        assert_eq!(first, second);
    }

    #[test]
    fn test_deterministic_address_varies_with_args() {
        let mut args = nft_test_args();
        let base = deterministic_deployment_address(&nft_init_code(&args));

        args[0] = Token::Uint(U256::from(101));
        let changed = deterministic_deployment_address(&nft_init_code(&args));
        assert_ne!(base, changed);
    }

    #[tokio::test]
    async fn test_deploy_error_propagates() {
        // A mocked provider with no queued responses fails the first RPC call
        let (provider, _mock) = Provider::mocked();
        let deployments = Deployments::new(Arc::new(provider), "unused-deployments.json");

        let opts = DeployOptions {
            from: Address::zero(),
            args: nft_test_args(),
            deterministic: true,
        };
        let res = deployments.deploy(NFT_CONTRACT_NAME, opts).await;
        assert!(matches!(res, Err(ScriptError::ContractDeployment(_))));
    }

    #[tokio::test]
    async fn test_deterministic_deployment_reuse() {
        let path = std::env::temp_dir()
            .join(format!("deployments-reuse-{}.json", std::process::id()))
            .to_string_lossy()
            .into_owned();

        let (provider, mock) = Provider::mocked();
        // Respond to the code probe with nonempty code at the derived address
        mock.push::<Bytes, _>(Bytes::from(vec![0x60u8, 0x80]))
            .unwrap();

        let deployments = Deployments::new(Arc::new(provider), &path);
        let args = nft_test_args();
        let expected = deterministic_deployment_address(&nft_init_code(&args));

        let deployment = deployments
            .deploy(
                NFT_CONTRACT_NAME,
                DeployOptions {
                    from: Address::zero(),
                    args,
                    deterministic: true,
                },
            )
            .await
            .unwrap();

        assert_eq!(deployment.address, expected);
        assert!(!deployment.newly_deployed);
        assert!(deployment.transaction_hash.is_none());

        // The reused address is still recorded for later script runs
        let recorded = parse_addr_from_deployments_file(&path, NFT_CONTRACT_KEY).unwrap();
        assert_eq!(recorded, expected);

        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_named_accounts_require_sender() {
        let (provider, _mock) = Provider::mocked();
        let env = DeployEnvironment::new(Arc::new(provider), "unused-deployments.json");

        assert!(matches!(
            env.get_named_accounts(),
            Err(ScriptError::AccountResolution(_))
        ));
    }
}
