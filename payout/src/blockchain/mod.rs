//! Chain access: the gateway seam, the Ronin RPC implementation behind it,
//! and bounded receipt polling.

pub mod gateway;
pub mod rpc_client;
pub mod confirm;

pub use confirm::{wait_for_receipt, Confirmation, ConfirmationPolicy};
pub use gateway::{ChainGateway, GatewayError, ReceiptStatus};
pub use rpc_client::RoninRpcClient;
