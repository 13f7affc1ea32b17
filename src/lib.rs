pub mod indexer;
pub mod metrics;
pub mod models;
pub mod storage;
pub mod utils;

pub use indexer::EventScanner;
pub use indexer::chunking::ChunkPolicy;
pub use indexer::rpc::{ArgFilter, LogQuery, LogSource, RpcLogSource};
pub use models::common::{BlockBound, BlockRange, Chain, ScanRequest, ScanResult, ScanState};
pub use models::datasets::deposits::{Deposit, DepositRecord, RawDepositLog};
pub use models::errors::{DecodeError, FetchError, ScanError, SinkError};
pub use storage::{DepositSink, csv::CsvSink};
