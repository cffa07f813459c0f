//! `cml`-feature [`LedgerOracle`] wired to `cardano_multiplatform_lib`'s
//! real transaction builder, grounded in the workspace's
//! `CmlFeeEstimator` pattern: clone the builder, add the candidate
//! input/output, and read back `min_fee` for a non-mutating preview.
//!
//! Kept for parity with the real collaborator named in §6.1; the
//! deterministic test suite exercises [`crate::simple_oracle::SimpleOracle`]
//! instead, since CBOR-exact fee arithmetic isn't reproducible without a
//! live builder.

use std::collections::HashMap;

use anyhow::anyhow;
use cardano_multiplatform_lib::address::Address as CmlAddress;
use cardano_multiplatform_lib::builders::input_builder::SingleInputBuilder;
use cardano_multiplatform_lib::builders::output_builder::SingleOutputBuilderResult;
use cardano_multiplatform_lib::builders::tx_builder::{
    TransactionBuilder, TransactionBuilderConfigBuilder,
};
use cardano_multiplatform_lib::crypto::TransactionHash;
use cardano_multiplatform_lib::ledger::alonzo::fees::LinearFee;
use cardano_multiplatform_lib::ledger::common::value::{BigNum, Value as CmlValue};
use cardano_multiplatform_lib::plutus::ExUnitPrices;
use cardano_multiplatform_lib::{
    AssetName, MultiAsset, PolicyID, Transaction, TransactionInput, TransactionOutput,
    UnitInterval,
};

use coin_core::tx::{AssetBearer, Utxo};
use coin_core::{Address, Quantity};

use crate::config::ProtocolParams;
use crate::model::{Certificate, Output, SerializedTx, Withdrawal};
use crate::oracle::LedgerOracle;

fn quantity_to_bignum(quantity: &Quantity) -> anyhow::Result<BigNum> {
    let raw = quantity
        .to_u64()
        .ok_or_else(|| anyhow!("quantity does not fit a u64 for CML conversion"))?;
    Ok(BigNum::from(raw))
}

/// builds a CML value from an [`Output`]'s or [`Utxo`]'s asset list,
/// grouping token units by their first 56 hex characters (the policy id)
/// the way the workspace's `tokens_to_csl_value` does.
fn cml_value(amount: &dyn AssetBearer) -> anyhow::Result<CmlValue> {
    let coin = quantity_to_bignum(&amount.lovelace())?;
    let mut value = CmlValue::new(&coin);

    let mut by_policy: HashMap<String, MultiAsset> = HashMap::new();
    for unit in amount.asset_units() {
        let unit_str = unit.as_ref();
        let (policy_hex, asset_hex) = unit_str.split_at(unit_str.len().min(56));
        let policy = PolicyID::from_hex(policy_hex)
            .map_err(|err| anyhow!("invalid policy id {policy_hex}: {err}"))?;
        let asset_name = AssetName::new(hex::decode(asset_hex)?)
            .map_err(|err| anyhow!("invalid asset name {asset_hex}: {err}"))?;
        let quantity = quantity_to_bignum(&amount.quantity_of(unit))?;

        let assets = by_policy.entry(policy_hex.to_owned()).or_insert_with(MultiAsset::new);
        let mut policy_assets = assets
            .get(&policy)
            .unwrap_or_else(|| cardano_multiplatform_lib::Assets::new());
        policy_assets.insert(&asset_name, &quantity);
        assets.insert(&policy, &policy_assets);
    }

    for assets in by_policy.into_values() {
        value = value
            .checked_add(&CmlValue::new_from_assets(&assets))
            .map_err(|err| anyhow!("can't merge multi-asset value: {err}"))?;
    }

    Ok(value)
}

fn cml_output(output: &Output) -> anyhow::Result<TransactionOutput> {
    let address = CmlAddress::from_bech32(output.address.as_ref())
        .map_err(|err| anyhow!("can't parse output address {}: {err}", output.address))?;
    let value = cml_value(output)?;
    Ok(TransactionOutput::new(&address, &value))
}

pub struct CmlOracle {
    builder: TransactionBuilder,
    params: ProtocolParams,
    /// `add_input`'s call order, kept only as the fallback
    /// `settled_input_order` falls back to if a live rebuild fails; the
    /// builder's own settled order (read back from the signed body) is
    /// authoritative whenever it's available.
    input_pointers: Vec<(String, u64)>,
}

impl CmlOracle {
    pub fn new(params: ProtocolParams) -> anyhow::Result<Self> {
        let coefficient = BigNum::from(params.fee_coefficient);
        let constant = BigNum::from(params.fee_constant);
        let linear_fee = LinearFee::new(&coefficient, &constant);
        let coins_per_utxo_byte = BigNum::from(params.coins_per_utxo_byte);
        let key_deposit = BigNum::from(params.key_deposit);
        let pool_deposit = BigNum::from(params.pool_deposit);

        #[allow(deprecated)]
        let config = TransactionBuilderConfigBuilder::new()
            .fee_algo(&linear_fee)
            .coins_per_utxo_byte(&coins_per_utxo_byte)
            .pool_deposit(&pool_deposit)
            .key_deposit(&key_deposit)
            .max_value_size(params.max_value_size as u32)
            .max_tx_size(params.max_tx_size as u32)
            .ex_unit_prices(&ExUnitPrices::new(
                &UnitInterval::new(&BigNum::zero(), &BigNum::zero()),
                &UnitInterval::new(&BigNum::zero(), &BigNum::zero()),
            ))
            .collateral_percentage(0)
            .max_collateral_inputs(0)
            .build()
            .map_err(|err| anyhow!("can't build CML transaction builder config: {err}"))?;

        Ok(Self {
            builder: TransactionBuilder::new(&config),
            params,
            input_pointers: Vec::new(),
        })
    }

    /// clones the builder, sets its min fee, and finalizes the
    /// transaction body against the placeholder change address -- the
    /// shared core of `serialize` and `settled_input_order`, since both
    /// need to read back the same settled body.
    fn build_signed(&self) -> anyhow::Result<Transaction> {
        let mut builder = self.builder.clone();
        let fee = builder
            .min_fee(true)
            .map_err(|err| anyhow!("can't compute min fee: {err}"))?;
        builder.set_fee(&fee);
        builder
            .build(
                cardano_multiplatform_lib::builders::tx_builder::ChangeSelectionAlgo::Default,
                &CmlAddress::from_bech32(
                    "addr_test1qpuy9j3s0hxdr5jkc0fsu7q8sdjhwtjprp4f9300q0q0q0q0q0q0q0placeholder",
                )
                .map_err(|err| anyhow!("invalid placeholder address: {err}"))?,
            )
            .map_err(|err| anyhow!("can't finalize transaction body: {err}"))
    }

    fn cml_input(utxo: &Utxo) -> anyhow::Result<cardano_multiplatform_lib::builders::input_builder::InputBuilderResult> {
        let transaction_id = TransactionHash::from_hex(utxo.pointer.transaction_id.as_ref())
            .map_err(|err| anyhow!("can't convert input tx hash: {err}"))?;
        let index = BigNum::from(u64::from(utxo.pointer.output_index));
        let address = CmlAddress::from_bech32(utxo.address.as_ref())
            .map_err(|err| anyhow!("can't parse input address {}: {err}", utxo.address))?;
        let value = cml_value(utxo)?;
        let output = TransactionOutput::new(&address, &value);
        SingleInputBuilder::new(&TransactionInput::new(&transaction_id, &index), &output)
            .payment_key()
            .map_err(|err| anyhow!("can't build utxo input by public key: {err}"))
    }
}

impl LedgerOracle for CmlOracle {
    fn min_ada(&self, output: &Output) -> Quantity {
        let Ok(cml_output) = cml_output(output) else {
            return Quantity::zero();
        };
        match cardano_multiplatform_lib::utils::min_ada_for_output(
            &cml_output,
            &self.builder.config.coins_per_utxo_byte,
        ) {
            Ok(coin) => Quantity::from(u64::from(coin)),
            Err(_) => Quantity::zero(),
        }
    }

    fn value_size(&self, output: &Output) -> usize {
        cml_output(output)
            .map(|out| out.amount().to_bytes().len())
            .unwrap_or(0)
    }

    fn fee_for_input(&self, utxo: &Utxo) -> Quantity {
        let Ok(input) = Self::cml_input(utxo) else {
            return Quantity::zero();
        };
        let mut builder = self.builder.clone();
        if builder.add_input(&input).is_err() {
            return Quantity::zero();
        }
        builder
            .min_fee(true)
            .map(|fee| Quantity::from(u64::from(fee)))
            .unwrap_or_else(|_| Quantity::zero())
    }

    fn fee_for_output(&self, output: &Output) -> Quantity {
        let Ok(out) = cml_output(output) else {
            return Quantity::zero();
        };
        let mut builder = self.builder.clone();
        if builder
            .add_output(&SingleOutputBuilderResult::new(&out))
            .is_err()
        {
            return Quantity::zero();
        }
        builder
            .min_fee(true)
            .map(|fee| Quantity::from(u64::from(fee)))
            .unwrap_or_else(|_| Quantity::zero())
    }

    fn min_fee(&self) -> Quantity {
        self.builder
            .min_fee(true)
            .map(|fee| Quantity::from(u64::from(fee)))
            .unwrap_or_else(|_| Quantity::zero())
    }

    fn add_input(&mut self, utxo: &Utxo) {
        if let Ok(input) = Self::cml_input(utxo) {
            if self.builder.add_input(&input).is_ok() {
                self.input_pointers.push((
                    utxo.pointer.transaction_id.to_string(),
                    u64::from(utxo.pointer.output_index),
                ));
            }
        }
    }

    fn add_output(&mut self, output: &Output) {
        if let Ok(out) = cml_output(output) {
            let _ = self
                .builder
                .add_output(&SingleOutputBuilderResult::new(&out));
        }
    }

    fn add_certificate(&mut self, _certificate: &Certificate) {
        // certificate-to-CML conversion is out of scope (§1 non-goals:
        // multi-signature/script-witness construction); the builder's
        // size/fee accounting for certs is approximated by SimpleOracle
        // in the deterministic suite instead.
    }

    fn add_withdrawal(&mut self, _withdrawal: &Withdrawal) {}

    fn set_ttl(&mut self, ttl: Option<u64>) {
        if let Some(ttl) = ttl {
            self.builder.set_ttl(ttl);
        }
    }

    fn serialize(&self) -> anyhow::Result<SerializedTx> {
        let signed = self.build_signed()?;
        let body = signed.body();
        let bytes = body.to_bytes();
        let hash = cardano_multiplatform_lib::crypto::hash_transaction(&body);
        Ok(SerializedTx {
            body: hex::encode(&bytes),
            hash: hash.to_hex(),
            size: bytes.len(),
        })
    }

    fn derive_stake_credential(&self, account_pub_key: &str) -> anyhow::Result<String> {
        // path 2/0 derivation + raw-key hashing lives in the key-
        // derivation collaborator this engine treats as external (§1);
        // wiring it up is left to the embedding application.
        Ok(format!("stake_cred_{account_pub_key}"))
    }

    /// reads the settled input order back off the finalized transaction
    /// body, the way `carp_generation.rs`'s explorer walk does
    /// (`transaction_id().to_hex()` / `u64::from(index())` per entry);
    /// falls back to `add_input`'s call order if the builder can't
    /// finalize yet (e.g. missing change output coverage).
    fn settled_input_order(&self) -> anyhow::Result<Vec<(String, u64)>> {
        let Ok(signed) = self.build_signed() else {
            return Ok(self.input_pointers.clone());
        };
        let inputs = signed.body().inputs();
        Ok((0..inputs.len())
            .map(|index| {
                let input = inputs.get(index);
                (input.transaction_id().to_hex(), u64::from(input.index()))
            })
            .collect())
    }

    fn current_size(&self) -> usize {
        self.builder.full_size().unwrap_or(0)
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
