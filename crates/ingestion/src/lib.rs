//! Ingestion pipeline: poll the chain head, walk the trailing block
//! window, enrich every transaction, and persist each record exactly once.

pub mod block_ingestor;
pub mod enricher;
pub mod error;
pub mod poller;
pub mod rpc_client;

pub use block_ingestor::{BlockIngestor, BlockResult};
pub use enricher::Enricher;
pub use poller::{Poller, PollerConfig, Shutdown};
pub use rpc_client::{ChainClient, RpcClient};
