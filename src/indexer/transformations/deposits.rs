use alloy_primitives::Address;
use alloy_sol_types::SolEvent;
use tracing::debug;

use crate::models::common::Chain;
use crate::models::datasets::deposits::{Deposit, DepositRecord, RawDepositLog};
use crate::models::errors::DecodeError;
use crate::utils::bytes_to_hex;

// topic0 is the event signature, then one topic per indexed argument
const DEPOSIT_TOPIC_COUNT: usize = 3;

pub trait DepositTransformer {
    fn transform_deposits(
        logs: Vec<RawDepositLog>,
        chain: Chain,
        contract_address: Address,
    ) -> Result<Vec<DepositRecord>, DecodeError>;
}

impl DepositTransformer for RawDepositLog {
    fn transform_deposits(
        logs: Vec<RawDepositLog>,
        chain: Chain,
        contract_address: Address,
    ) -> Result<Vec<DepositRecord>, DecodeError> {
        logs.into_iter()
            .map(|log| normalize_deposit(log, chain, contract_address))
            .collect()
    }
}

/// Decodes a single `Deposit` log into an output row.
///
/// `chain` and `contract_address` are taken from the caller rather than the log, so logs
/// relayed through a proxy still carry the address that was scanned.
pub fn normalize_deposit(
    log: RawDepositLog,
    chain: Chain,
    contract_address: Address,
) -> Result<DepositRecord, DecodeError> {
    let transaction_hash = log.transaction_hash.ok_or(DecodeError::MissingField {
        field: "transactionHash",
    })?;

    let signature = log
        .topics
        .first()
        .copied()
        .ok_or(DecodeError::TopicCount {
            expected: DEPOSIT_TOPIC_COUNT,
            got: 0,
        })?;
    if signature != Deposit::SIGNATURE_HASH {
        return Err(DecodeError::UnexpectedSignature { got: signature });
    }
    if log.topics.len() != DEPOSIT_TOPIC_COUNT {
        return Err(DecodeError::TopicCount {
            expected: DEPOSIT_TOPIC_COUNT,
            got: log.topics.len(),
        });
    }

    let deposit = Deposit::decode_raw_log(log.topics.iter().copied(), &log.data)?;
    if log.address != contract_address {
        debug!(
            "Deposit in tx {} emitted by {}, recorded under {}",
            transaction_hash, log.address, contract_address
        );
    }

    Ok(DepositRecord {
        chain: chain.to_string(),
        token: bytes_to_hex(deposit.token),
        recipient: bytes_to_hex(deposit.recipient),
        amount: deposit.amount.to_string(),
        transaction_hash: bytes_to_hex(transaction_hash),
        address: bytes_to_hex(contract_address),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{B256, Bytes, U256};
    use alloy_sol_types::SolValue;

    fn deposit_log(amount: U256) -> RawDepositLog {
        RawDepositLog {
            block_number: Some(100),
            log_index: Some(0),
            transaction_hash: Some(B256::repeat_byte(0xab)),
            address: Address::repeat_byte(0x99),
            topics: vec![
                Deposit::SIGNATURE_HASH,
                Address::repeat_byte(0x01).into_word(),
                Address::repeat_byte(0x02).into_word(),
            ],
            data: Bytes::from(amount.abi_encode()),
        }
    }

    #[test]
    fn normalizes_to_lowercase_unprefixed_hex() {
        let contract = Address::repeat_byte(0xcd);
        let record = normalize_deposit(deposit_log(U256::from(5u64)), Chain::Avax, contract)
            .expect("valid deposit");

        assert_eq!(record.chain, "avax");
        assert_eq!(record.token, "01".repeat(20));
        assert_eq!(record.recipient, "02".repeat(20));
        assert_eq!(record.amount, "5");
        assert_eq!(record.transaction_hash, "ab".repeat(32));
        // Caller supplied address wins over the emitting address
        assert_eq!(record.address, "cd".repeat(20));
    }

    #[test]
    fn keeps_full_uint256_precision() {
        let record = normalize_deposit(deposit_log(U256::MAX), Chain::Bsc, Address::ZERO)
            .expect("valid deposit");
        assert_eq!(
            record.amount,
            "115792089237316195423570985008687907853269984665640564039457584007913129639935"
        );
    }

    #[test]
    fn rejects_missing_transaction_hash() {
        let mut log = deposit_log(U256::from(1u64));
        log.transaction_hash = None;
        assert!(matches!(
            normalize_deposit(log, Chain::Avax, Address::ZERO),
            Err(DecodeError::MissingField {
                field: "transactionHash"
            })
        ));
    }

    #[test]
    fn rejects_foreign_event_and_short_topics() {
        let mut foreign = deposit_log(U256::from(1u64));
        foreign.topics[0] = B256::repeat_byte(0x55);
        assert!(matches!(
            normalize_deposit(foreign, Chain::Avax, Address::ZERO),
            Err(DecodeError::UnexpectedSignature { .. })
        ));

        let mut short = deposit_log(U256::from(1u64));
        short.topics.pop();
        assert!(matches!(
            normalize_deposit(short, Chain::Avax, Address::ZERO),
            Err(DecodeError::TopicCount {
                expected: 3,
                got: 2
            })
        ));
    }

    #[test]
    fn rejects_truncated_data() {
        let mut log = deposit_log(U256::from(1u64));
        log.data = Bytes::from(vec![0u8; 4]);
        assert!(matches!(
            normalize_deposit(log, Chain::Avax, Address::ZERO),
            Err(DecodeError::Abi(_))
        ));
    }

    #[test]
    fn transform_preserves_input_order() {
        let logs = (1..=3u64).map(|i| deposit_log(U256::from(i))).collect();
        let records =
            <RawDepositLog as DepositTransformer>::transform_deposits(logs, Chain::Avax, Address::ZERO)
                .expect("valid deposits");
        let amounts: Vec<_> = records.iter().map(|r| r.amount.as_str()).collect();
        assert_eq!(amounts, ["1", "2", "3"]);
    }
}
