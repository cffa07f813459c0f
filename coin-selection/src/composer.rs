//! Composer (§4.6) -- the entry point. Wires Normalizer → Selection Loop
//! → Max-Output Finalizer → serialization, and assembles the
//! [`TransactionSummary`] record callers see.

use coin_core::tx::{AssetBearer, Utxo};
use coin_core::{Address, Quantity, TokenId};

use crate::accountant::{required_deposit, split_deposit, sum_unit};
use crate::config::ComposeOptions;
use crate::error::CoinSelectionError;
use crate::finalizer;
use crate::model::{
    Certificate, Output, OutputMode, RawCertificate, RequestedOutput, TransactionSummary,
    Withdrawal,
};
use crate::normalizer;
use crate::oracle::LedgerOracle;
use crate::selection::{self, SelectionOutcome};

/// everything the Composer needs to produce one [`TransactionSummary`];
/// the duck-typed wire request collapses to this once outputs are parsed
/// into [`RequestedOutput`] and certificates into [`RawCertificate`].
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComposeRequest {
    pub utxos: Vec<Utxo>,
    pub outputs: Vec<RequestedOutput>,
    pub change_address: Address,
    pub certificates: Vec<RawCertificate>,
    pub withdrawals: Vec<Withdrawal>,
    pub account_pub_key: Option<String>,
    pub ttl: Option<u64>,
    pub options: ComposeOptions,
}

impl Default for ComposeRequest {
    fn default() -> Self {
        Self {
            utxos: Vec::new(),
            outputs: Vec::new(),
            change_address: Address::new_static("addr_test1_change"),
            certificates: Vec::new(),
            withdrawals: Vec::new(),
            account_pub_key: None,
            ttl: None,
            options: ComposeOptions::default(),
        }
    }
}

/// reorders `used` to match the oracle's settled input order (§6.1), so
/// the reported `inputs` list lines up with what `serialize`'s body
/// actually contains instead of the Selection Loop's own pull order.
fn settled_inputs(used: &[Utxo], oracle: &dyn LedgerOracle) -> anyhow::Result<Vec<Utxo>> {
    let order = oracle.settled_input_order()?;
    let mut indexed: Vec<(usize, Utxo)> = used
        .iter()
        .cloned()
        .map(|utxo| {
            let key = (
                utxo.pointer.transaction_id.to_string(),
                u64::from(utxo.pointer.output_index),
            );
            let position = order.iter().position(|entry| *entry == key).unwrap_or(usize::MAX);
            (position, utxo)
        })
        .collect();
    indexed.sort_by_key(|(position, _)| *position);
    Ok(indexed.into_iter().map(|(_, utxo)| utxo).collect())
}

fn check_value_sizes(
    outputs: &[Output],
    oracle: &dyn LedgerOracle,
) -> Result<(), CoinSelectionError> {
    let max_value_size = oracle.protocol_params().max_value_size;
    for output in outputs {
        if oracle.value_size(output) > max_value_size {
            return Err(CoinSelectionError::MaxValueSizeReached);
        }
    }
    Ok(())
}

pub fn compose(
    request: &ComposeRequest,
    oracle: &mut dyn LedgerOracle,
) -> anyhow::Result<TransactionSummary> {
    if request.outputs.iter().filter(|o| o.set_max).count() > 1 {
        anyhow::bail!("at most one output may set setMax");
    }

    let prepared = normalizer::normalize(&request.outputs, oracle)?;
    let is_precompose = prepared
        .iter()
        .any(|output| output.mode == OutputMode::Precompose);

    let certificates = request
        .certificates
        .iter()
        .cloned()
        .map(Certificate::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    if !certificates.is_empty() {
        if let Some(account_pub_key) = request.account_pub_key.as_ref() {
            oracle.derive_stake_credential(account_pub_key)?;
        }
    }

    oracle.set_ttl(request.ttl);

    let max_tokens_per_output = request.options.max_tokens_per_output();
    let max_is_lovelace = prepared
        .iter()
        .find(|output| output.set_max)
        .and_then(Output::max_target_unit)
        .map(|unit| unit.is_lovelace())
        .unwrap_or(false);

    let SelectionOutcome {
        used,
        change_outputs,
        total_fee: estimated_fee,
    } = selection::select(
        &request.utxos,
        &prepared,
        &certificates,
        &request.withdrawals,
        &request.change_address,
        max_tokens_per_output,
        oracle,
    )?;

    let finalized = finalizer::finalize(&prepared, &change_outputs, oracle)?;
    let final_user_outputs = finalized.user_outputs;
    let final_change_outputs = finalized.change_outputs;
    let _ = estimated_fee;
    let _ = finalized.total_fee;

    // the fee reported to the caller is the exact ledger-balance remainder,
    // not the Selection Loop's running estimate: a below-min-ada lovelace
    // remainder that can't become a valid change output (§4.3 dust burn)
    // has nowhere else to go and must be folded in here instead of lost.
    let deposit_net = required_deposit(&certificates, oracle.protocol_params());
    let (deposit_due, deposit_refund) = split_deposit(deposit_net);
    let total_withdrawal: Quantity = request.withdrawals.iter().map(|w| w.amount.clone()).sum();

    let input_lovelace = sum_unit(&used, &TokenId::LOVELACE);
    let output_lovelace: Quantity = final_user_outputs
        .iter()
        .chain(final_change_outputs.iter())
        .map(Output::lovelace)
        .sum();

    let lovelace_in = input_lovelace + total_withdrawal + deposit_refund;
    let lovelace_out = output_lovelace + deposit_due;
    let total_fee = lovelace_in
        .checked_sub(&lovelace_out)
        .ok_or(CoinSelectionError::UtxoBalanceInsufficient)?;

    let (inputs, tx) = if is_precompose {
        (None, None)
    } else {
        for output in final_user_outputs.iter().chain(final_change_outputs.iter()) {
            oracle.add_output(output);
        }
        check_value_sizes(&final_user_outputs, oracle)?;
        check_value_sizes(&final_change_outputs, oracle)?;

        if total_fee < oracle.min_fee() {
            return Err(CoinSelectionError::UtxoBalanceInsufficient.into());
        }

        let serialized = oracle.serialize()?;
        if serialized.size > oracle.protocol_params().max_tx_size {
            return Err(CoinSelectionError::MaxTxSizeReached.into());
        }
        (Some(settled_inputs(&used, oracle)?), Some(serialized))
    };

    let total_spent = if max_is_lovelace {
        let max_amount = finalized.max_amount.clone().unwrap_or_else(Quantity::zero);
        let change_ada: Quantity = final_change_outputs.iter().map(Output::lovelace).sum();
        max_amount + total_fee.clone() + change_ada
    } else {
        let user_lovelace: Quantity = final_user_outputs.iter().map(Output::lovelace).sum();
        user_lovelace + total_fee.clone()
    };

    let outputs = if is_precompose {
        None
    } else {
        let mut all = final_user_outputs;
        all.extend(final_change_outputs);
        Some(all)
    };

    Ok(TransactionSummary {
        total_spent,
        fee: total_fee,
        inputs,
        outputs,
        ttl: if is_precompose { None } else { request.ttl },
        tx,
        max: finalized.max_amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ComposeOptions;
    use crate::model::RequestedAsset;
    use crate::simple_oracle::SimpleOracle;
    use coin_core::tx::{AssetAmount, UtxoPointer};
    use coin_core::{OutputIndex, TokenId};

    fn utxo(ix: u64, lovelace: u64, tokens: Vec<(&str, u64)>) -> Utxo {
        let mut amount = vec![AssetAmount::lovelace(Quantity::from(lovelace))];
        amount.extend(tokens.into_iter().map(|(unit, qty)| AssetAmount {
            unit: TokenId::new(unit.to_owned()),
            quantity: Quantity::from(qty),
        }));
        Utxo::new(
            UtxoPointer {
                transaction_id: coin_core::tx::TransactionId::new_static("tx"),
                output_index: OutputIndex::new(ix),
            },
            Address::new_static("addr_test1"),
            amount,
        )
    }

    fn base_request(utxos: Vec<Utxo>, outputs: Vec<RequestedOutput>) -> ComposeRequest {
        ComposeRequest {
            utxos,
            outputs,
            change_address: Address::new_static("addr_test1_change"),
            certificates: vec![],
            withdrawals: vec![],
            account_pub_key: None,
            ttl: None,
            options: ComposeOptions::default(),
        }
    }

    #[test]
    fn dust_burn_scenario_has_no_change() {
        let mut oracle = SimpleOracle::default();
        let request = base_request(
            vec![utxo(0, 5_000_000, vec![])],
            vec![RequestedOutput {
                address: Some(Address::new_static("addr_test1_dest")),
                amount: Some(Quantity::from(4_820_000)),
                assets: vec![],
                set_max: false,
            }],
        );

        let summary = compose(&request, &mut oracle).unwrap();
        assert_eq!(summary.total_spent, Quantity::from(5_000_000));
        assert_eq!(summary.outputs.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn precompose_skips_serialization() {
        let mut oracle = SimpleOracle::default();
        let request = base_request(
            vec![utxo(0, 5_000_000, vec![])],
            vec![RequestedOutput {
                address: None,
                amount: Some(Quantity::from(2_000_000)),
                assets: vec![],
                set_max: false,
            }],
        );

        let summary = compose(&request, &mut oracle).unwrap();
        assert!(summary.tx.is_none());
        assert!(summary.inputs.is_none());
        assert!(summary.outputs.is_none());
    }

    #[test]
    fn ada_max_drains_remainder_into_output() {
        let mut oracle = SimpleOracle::default();
        let request = base_request(
            vec![utxo(0, 3_000_000, vec![("cafe", 10)])],
            vec![RequestedOutput {
                address: Some(Address::new_static("addr_test1_dest")),
                amount: None,
                assets: vec![],
                set_max: true,
            }],
        );

        let summary = compose(&request, &mut oracle).unwrap();
        let outputs = summary.outputs.unwrap();
        // the max output plus a token-carrying change output at min_ada.
        assert_eq!(outputs.len(), 2);
        assert!(summary.max.is_some());
    }

    #[test]
    fn insufficient_balance_propagates_as_error() {
        let mut oracle = SimpleOracle::default();
        let request = base_request(
            vec![utxo(0, 5_000_000, vec![])],
            vec![RequestedOutput {
                address: Some(Address::new_static("addr_test1_dest")),
                amount: Some(Quantity::from(10_000_000)),
                assets: vec![],
                set_max: false,
            }],
        );

        let err = compose(&request, &mut oracle).unwrap_err();
        assert!(err
            .downcast_ref::<CoinSelectionError>()
            .map(|e| *e == CoinSelectionError::UtxoBalanceInsufficient)
            .unwrap_or(false));
    }

    #[test]
    fn rejects_more_than_one_set_max_output() {
        let mut oracle = SimpleOracle::default();
        let outputs = vec![
            RequestedOutput {
                address: Some(Address::new_static("addr_test1_dest")),
                amount: None,
                assets: vec![RequestedAsset {
                    unit: TokenId::new_static("cafe"),
                    quantity: None,
                }],
                set_max: true,
            },
            RequestedOutput {
                address: Some(Address::new_static("addr_test1_dest_2")),
                amount: None,
                assets: vec![],
                set_max: true,
            },
        ];
        let request = base_request(vec![utxo(0, 5_000_000, vec![])], outputs);
        assert!(compose(&request, &mut oracle).is_err());
    }

    #[test]
    fn withdrawal_only_request_returns_real_change_not_fee() {
        let mut oracle = SimpleOracle::default();
        let mut request = base_request(vec![], vec![]);
        request.withdrawals = vec![Withdrawal {
            stake_address: Address::new_static("stake_test1"),
            amount: Quantity::from(10_000_000u64),
        }];

        let summary = compose(&request, &mut oracle).unwrap();
        let outputs = summary.outputs.as_ref().unwrap();
        assert_eq!(outputs.len(), 1);
        assert!(outputs[0].is_change);
        assert!(outputs[0].lovelace() > Quantity::zero());
        assert_eq!(
            outputs[0].lovelace() + summary.fee.clone(),
            Quantity::from(10_000_000u64)
        );
    }

    #[test]
    fn stake_deregistration_refund_surfaces_as_change() {
        let mut oracle = SimpleOracle::default();
        let mut request = base_request(vec![utxo(0, 5_000_000, vec![])], vec![]);
        request.certificates = vec![RawCertificate {
            kind: 1,
            pool_hash: None,
        }];

        let summary = compose(&request, &mut oracle).unwrap();
        let outputs = summary.outputs.as_ref().unwrap();
        assert_eq!(outputs.len(), 1);
        assert!(outputs[0].is_change);

        let deposit_refund = Quantity::from(oracle.protocol_params().key_deposit);
        let used_lovelace = sum_unit(summary.inputs.as_ref().unwrap(), &TokenId::LOVELACE);
        assert_eq!(
            used_lovelace + deposit_refund,
            outputs[0].lovelace() + summary.fee.clone()
        );
    }
}
