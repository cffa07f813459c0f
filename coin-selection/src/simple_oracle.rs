//! a deterministic, dependency-free reference [`LedgerOracle`].
//!
//! Implements the §6.2 linear-fee and coins-per-UTXO-byte rules against a
//! simplified, documented byte-size estimate rather than bit-exact CBOR
//! encoding -- the real encoding lives behind the `cml` feature's oracle.
//! The bundle-size formula below follows the same shape as CIP-0055's
//! minimum-UTXO-value calculation (a per-asset, per-policy, and
//! asset-name-byte cost, rounded up to 8-byte words).

use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use coin_core::tx::{AssetAmount, Utxo};
use coin_core::{Address, Quantity};

use crate::config::ProtocolParams;
use crate::model::{Certificate, Output, SerializedTx, Withdrawal};
use crate::oracle::LedgerOracle;

const BASE_TX_OVERHEAD_BYTES: u64 = 12;
const PER_INPUT_BYTES: u64 = 41;
const PER_WITNESS_BYTES: u64 = 102;
const PER_CERTIFICATE_BYTES: u64 = 35;
const PER_WITHDRAWAL_BYTES: u64 = 40;
const TTL_BYTES: u64 = 5;
const UTXO_ENTRY_BASE_BYTES: u64 = 27;

#[derive(Debug, Clone)]
pub struct SimpleOracle {
    params: ProtocolParams,
    num_inputs: usize,
    input_pointers: Vec<(String, u64)>,
    outputs: Vec<Output>,
    num_certificates: usize,
    num_withdrawals: usize,
    ttl: Option<u64>,
}

impl Default for SimpleOracle {
    fn default() -> Self {
        Self::new(ProtocolParams::default())
    }
}

impl SimpleOracle {
    pub fn new(params: ProtocolParams) -> Self {
        Self {
            params,
            num_inputs: 0,
            input_pointers: Vec::new(),
            outputs: Vec::new(),
            num_certificates: 0,
            num_withdrawals: 0,
            ttl: None,
        }
    }

    /// serialized byte cost of a multi-asset bundle, CIP-55 style: a
    /// fixed per-bundle overhead plus per-asset, per-policy, and
    /// asset-name-byte costs, rounded up to whole 8-byte words.
    fn bundle_size_bytes(amount: &[AssetAmount]) -> u64 {
        let tokens: Vec<&AssetAmount> = amount.iter().filter(|a| !a.unit.is_lovelace()).collect();
        if tokens.is_empty() {
            return 0;
        }
        let num_assets = tokens.len() as u64;
        let policies: HashSet<&str> = tokens.iter().map(|a| a.unit.as_ref()).collect();
        let num_pids = policies.len() as u64;
        let name_bytes: u64 = tokens
            .iter()
            .map(|a| (a.unit.as_ref().len() as u64 + 1) / 2)
            .sum();
        let words = (num_assets * 12 + num_pids * 28 + name_bytes + 7) / 8;
        6 + words
    }

    fn output_size_bytes(output: &Output) -> u64 {
        UTXO_ENTRY_BASE_BYTES + Self::bundle_size_bytes(&output.amount)
    }
}

impl LedgerOracle for SimpleOracle {
    fn min_ada(&self, output: &Output) -> Quantity {
        Quantity::from(self.params.coins_per_utxo_byte * Self::output_size_bytes(output))
    }

    fn value_size(&self, output: &Output) -> usize {
        Self::bundle_size_bytes(&output.amount) as usize
    }

    fn fee_for_input(&self, _utxo: &Utxo) -> Quantity {
        Quantity::from(self.params.fee_coefficient * (PER_INPUT_BYTES + PER_WITNESS_BYTES))
    }

    fn fee_for_output(&self, output: &Output) -> Quantity {
        Quantity::from(self.params.fee_coefficient * Self::output_size_bytes(output))
    }

    fn min_fee(&self) -> Quantity {
        Quantity::from(
            self.params.fee_coefficient * self.current_size() as u64 + self.params.fee_constant,
        )
    }

    fn add_input(&mut self, utxo: &Utxo) {
        self.num_inputs += 1;
        self.input_pointers.push((
            utxo.pointer.transaction_id.to_string(),
            u64::from(utxo.pointer.output_index),
        ));
    }

    fn add_output(&mut self, output: &Output) {
        self.outputs.push(output.clone());
    }

    fn add_certificate(&mut self, _certificate: &Certificate) {
        self.num_certificates += 1;
    }

    fn add_withdrawal(&mut self, _withdrawal: &Withdrawal) {
        self.num_withdrawals += 1;
    }

    fn set_ttl(&mut self, ttl: Option<u64>) {
        self.ttl = ttl;
    }

    fn serialize(&self) -> anyhow::Result<SerializedTx> {
        let size = self.current_size();
        let mut hasher = DefaultHasher::new();
        self.num_inputs.hash(&mut hasher);
        size.hash(&mut hasher);
        for output in &self.outputs {
            output.amount.len().hash(&mut hasher);
        }
        let digest = hasher.finish();

        Ok(SerializedTx {
            body: format!("{:0>width$x}", digest, width = size * 2),
            hash: format!("{digest:064x}"),
            size,
        })
    }

    fn derive_stake_credential(&self, account_pub_key: &str) -> anyhow::Result<String> {
        Ok(format!("stake_cred_{account_pub_key}"))
    }

    fn settled_input_order(&self) -> anyhow::Result<Vec<(String, u64)>> {
        // no reordering: this oracle never runs a real builder's input
        // selection pass, so `add_input`'s call order is the settled one.
        Ok(self.input_pointers.clone())
    }

    fn current_size(&self) -> usize {
        let mut total = BASE_TX_OVERHEAD_BYTES
            + self.num_inputs as u64 * (PER_INPUT_BYTES + PER_WITNESS_BYTES)
            + self.num_certificates as u64 * PER_CERTIFICATE_BYTES
            + self.num_withdrawals as u64 * PER_WITHDRAWAL_BYTES
            + self.outputs.iter().map(Self::output_size_bytes).sum::<u64>();
        if self.ttl.is_some() {
            total += TTL_BYTES;
        }
        total as usize
    }

    fn protocol_params(&self) -> &ProtocolParams {
        &self.params
    }

    fn placeholder_address(&self) -> Address {
        Address::new_static(
            "addr_test1qpuy9j3s0hxdr5jkc0fsu7q8sdjhwtjprp4f9300q0q0q0q0q0q0q0placeholder",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coin_core::TokenId;

    fn output(lovelace: u64, tokens: Vec<(&str, u64)>) -> Output {
        let mut amount = vec![AssetAmount::lovelace(Quantity::from(lovelace))];
        amount.extend(tokens.into_iter().map(|(unit, qty)| AssetAmount {
            unit: TokenId::new(unit.to_owned()),
            quantity: Quantity::from(qty),
        }));
        Output::change(Address::new_static("addr_test1"), amount)
    }

    #[test]
    fn min_ada_grows_with_token_count() {
        let oracle = SimpleOracle::default();
        let ada_only = output(0, vec![]);
        let with_token = output(0, vec![("cafe", 1)]);
        assert!(oracle.min_ada(&with_token) > oracle.min_ada(&ada_only));
    }

    #[test]
    fn min_fee_reflects_accumulated_size() {
        let mut oracle = SimpleOracle::default();
        let empty_fee = oracle.min_fee();
        oracle.add_output(&output(1_000_000, vec![]));
        assert!(oracle.min_fee() > empty_fee);
    }
}
