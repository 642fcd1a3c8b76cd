/*
 * GridHook agent - intent dispatcher for a Uniswap V4 grid-order hook
 * Core library exports and module declarations
 */

pub mod abi;
pub mod amount;
pub mod api;
pub mod catalog;
pub mod config;
pub mod conversation;
pub mod dispatcher;
pub mod models;
pub mod pool;
pub mod query;
pub mod rpc;
pub mod service;
pub mod tx;
pub mod utils;

pub use config::Config;
pub use models::*;
pub use service::GridService;
