use alloy_rpc_types_eth::Log;

use crate::models::datasets::deposits::RawDepositLog;

pub trait LogParser {
    fn parse_deposit_logs(self) -> Vec<RawDepositLog>;
}

impl LogParser for Vec<Log> {
    fn parse_deposit_logs(self) -> Vec<RawDepositLog> {
        self.into_iter()
            .map(|log| RawDepositLog {
                block_number: log.block_number,
                log_index: log.log_index,
                transaction_hash: log.transaction_hash,
                address: log.inner.address,
                topics: log.inner.data.topics().to_vec(),
                data: log.inner.data.data,
            })
            .collect()
    }
}
