use coin_core::tx::Utxo;
use coin_core::{Address, Quantity};

use crate::config::ProtocolParams;
use crate::model::{Certificate, Output, SerializedTx, Withdrawal};

/// the external collaborator this engine treats as out of scope: bech32
/// parsing, CBOR serialization, BigInt arithmetic, the `min-ada` rule,
/// witness signing, and key derivation all live behind this trait (§6.1).
///
/// An implementor owns a single transaction builder's worth of mutable
/// state; `add_*` methods mutate it monotonically, while `fee_for_*`
/// methods are non-mutating marginal-cost previews a caller uses before
/// committing to adding an input or output.
pub trait LedgerOracle {
    /// minimum lovelace an output with this asset payload must carry.
    fn min_ada(&self, output: &Output) -> Quantity;

    /// serialized byte size of just this output's value payload, checked
    /// against `max_value_size`.
    fn value_size(&self, output: &Output) -> usize;

    /// marginal fee contribution of adding this input, without mutating
    /// the builder.
    fn fee_for_input(&self, utxo: &Utxo) -> Quantity;

    /// marginal fee contribution of adding this output, without mutating
    /// the builder.
    fn fee_for_output(&self, output: &Output) -> Quantity;

    /// total minimum fee given everything added to the builder so far:
    /// `a * size(tx) + b`.
    fn min_fee(&self) -> Quantity;

    fn add_input(&mut self, utxo: &Utxo);
    fn add_output(&mut self, output: &Output);
    fn add_certificate(&mut self, certificate: &Certificate);
    fn add_withdrawal(&mut self, withdrawal: &Withdrawal);
    fn set_ttl(&mut self, ttl: Option<u64>);

    /// CBOR body plus its Blake2b-256 hash; `None` in precompose mode,
    /// where the caller never calls this.
    fn serialize(&self) -> anyhow::Result<SerializedTx>;

    /// `(txHash, outputIndex)` for every input added so far, in the order
    /// the builder actually settles on once it finalizes the transaction
    /// body -- which need not match `add_input`'s call order, since a
    /// builder is free to canonically reorder inputs while finalizing.
    /// Callers that report an `inputs` list alongside `serialize`'s body
    /// must reorder against this rather than their own bookkeeping order.
    fn settled_input_order(&self) -> anyhow::Result<Vec<(String, u64)>>;

    /// derive path `2/0` from `account_pub_key` and hash the raw public
    /// key, yielding a bech32 stake credential.
    fn derive_stake_credential(&self, account_pub_key: &str) -> anyhow::Result<String>;

    fn current_size(&self) -> usize;

    fn protocol_params(&self) -> &ProtocolParams;

    /// a deterministic placeholder address substituted for a missing
    /// address in precompose mode, of a representative byte length.
    fn placeholder_address(&self) -> Address;
}
