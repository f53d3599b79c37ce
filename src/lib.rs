//! Scripts for deploying and managing the ETH École ticket NFT contract.

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod cli;
mod commands;
pub mod constants;
pub mod environment;
pub mod errors;
pub mod utils;
