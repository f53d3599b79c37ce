//! Constants used in the deploy scripts

/// The ABI of the ETHEcoleTicket contract
///
/// Compiled from the `eth-ecole-nft` contracts package
pub const TICKET_ABI: &str = include_str!("../artifacts/ETHEcoleTicket.abi");

/// The creation bytecode of the ETHEcoleTicket contract
///
/// Compiled from the `eth-ecole-nft` contracts package
pub const TICKET_BYTECODE: &str = include_str!("../artifacts/ETHEcoleTicket.bin");

/// The name of the ticket NFT contract, as registered in the artifact table
pub const NFT_CONTRACT_NAME: &str = "ETHEcoleTicket";

/// The maximum number of tickets the contract will ever mint,
/// passed as the first constructor argument
pub const TICKET_SUPPLY_CAP: u64 = 100;

/// The address of the ERC20 token used to pay for tickets,
/// passed as the second constructor argument
pub const PAYMENT_TOKEN_ADDRESS: &str = "0xf2d1f94310823fe26cfa9c9b6fd152834b8e7849";

/// The price of a single ticket, denominated in whole units
/// of the payment token
pub const TICKET_PRICE: &str = "1";

/// The number of decimals used by the payment token
pub const PAYMENT_TOKEN_DECIMALS: u32 = 18;

/// The base URI under which per-token metadata is served,
/// passed as the fourth constructor argument
pub const METADATA_BASE_URI: &str = "https://eth-ecole-nft-site.vercel.app/api/";

/// The address of the deterministic deployment proxy.
///
/// The proxy is presigned and deployed at the same address on every chain,
/// see https://github.com/Arachnid/deterministic-deployment-proxy
pub const DETERMINISTIC_DEPLOYMENT_PROXY: &str = "0x4e59b44847b379578588920ca78fbf26c0b4956c";

/// The salt prefixed to the init code when deploying through
/// the deterministic deployment proxy
pub const DETERMINISTIC_DEPLOYMENT_SALT: [u8; 32] = [0u8; 32];

/// The number of confirmations to wait for the contract deployment transaction
pub const NUM_DEPLOY_CONFIRMATIONS: usize = 1;

/// The deployments key in the deployments file
pub const DEPLOYMENTS_KEY: &str = "deployments";

/// The ticket NFT contract key in the deployments file
pub const NFT_CONTRACT_KEY: &str = "nft_contract";

/// The default path of the deployments file
pub const DEFAULT_DEPLOYMENTS_PATH: &str = "deployments.json";
