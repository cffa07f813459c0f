//! Selection Loop (§4.4) -- the centerpiece fixed-point loop that picks
//! UTXOs until fees, outputs, and change all balance.

use coin_core::tx::{AssetBearer, Utxo};
use coin_core::{Address, Balance, Quantity, TokenId};

use crate::accountant::{required_deposit, split_deposit, sum_unit};
use crate::change_builder::{build_change_no_extra, ChangeRequest};
use crate::error::CoinSelectionError;
use crate::model::{Certificate, Output, Withdrawal};
use crate::oracle::LedgerOracle;

pub struct SelectionOutcome {
    pub used: Vec<Utxo>,
    pub change_outputs: Vec<Output>,
    pub total_fee: Quantity,
}

fn unique_units_dyn<'a>(items: impl Iterator<Item = &'a dyn AssetBearer>) -> Vec<TokenId> {
    let mut seen = Vec::new();
    for item in items {
        for unit in item.asset_units() {
            if !seen.contains(unit) {
                seen.push(unit.clone());
            }
        }
    }
    seen
}

fn sum_dyn<'a>(items: impl Iterator<Item = &'a dyn AssetBearer>, unit: &TokenId) -> Quantity {
    items.map(|item| item.quantity_of(unit)).sum()
}

/// sort `remaining` descending by `pick_unit`'s quantity, ties broken by
/// descending lovelace -- high-value UTXOs are pulled first.
fn sort_by_pick_unit(utxos: &mut [Utxo], pick_unit: &TokenId) {
    utxos.sort_by(|a, b| {
        let a_key = (a.quantity_of(pick_unit), a.lovelace());
        let b_key = (b.quantity_of(pick_unit), b.lovelace());
        b_key.cmp(&a_key)
    });
}

/// runs the fixed-point loop to convergence, or fails with
/// [`CoinSelectionError::UtxoBalanceInsufficient`] when `remaining` is
/// exhausted while a deficit remains.
#[allow(clippy::too_many_arguments)]
pub fn select(
    available_utxos: &[Utxo],
    user_outputs: &[Output],
    certificates: &[Certificate],
    withdrawals: &[Withdrawal],
    change_address: &Address,
    max_tokens_per_output: usize,
    oracle: &mut dyn LedgerOracle,
) -> Result<SelectionOutcome, CoinSelectionError> {
    for certificate in certificates {
        oracle.add_certificate(certificate);
    }
    for withdrawal in withdrawals {
        oracle.add_withdrawal(withdrawal);
    }

    let deposit_net = required_deposit(certificates, oracle.protocol_params());
    let (deposit_due, deposit_refund) = split_deposit(deposit_net);
    let total_withdrawal: Quantity = withdrawals.iter().map(|w| w.amount.clone()).sum();

    let max_target = user_outputs.iter().find_map(Output::max_target_unit);
    // absent a setMax output, still prefer covering the first requested
    // token with large-balance UTXOs first (scenario: "token selection
    // prefers the largest token UTXO").
    let requested_token = user_outputs
        .iter()
        .flat_map(|output| output.asset_units())
        .next()
        .cloned();
    let pick_unit = max_target
        .clone()
        .or(requested_token)
        .unwrap_or(TokenId::LOVELACE);

    let (mut used, mut remaining): (Vec<Utxo>, Vec<Utxo>) = match &max_target {
        Some(unit) if !unit.is_lovelace() => {
            available_utxos.iter().cloned().partition(|u| u.holds(unit))
        }
        Some(_) => (available_utxos.to_vec(), Vec::new()),
        None => (Vec::new(), available_utxos.to_vec()),
    };
    sort_by_pick_unit(&mut remaining, &pick_unit);

    let mut added_inputs = 0usize;
    let mut iteration = 0u32;

    loop {
        iteration += 1;
        tracing::trace!(iteration, used = used.len(), remaining = remaining.len(), "selection loop iteration");

        // 1. apply newly-used UTXOs to the builder.
        for utxo in used.iter().skip(added_inputs) {
            oracle.add_input(utxo);
        }
        added_inputs = used.len();

        // 2-4. running fee estimate: per-input/base cost from the oracle,
        // plus a non-mutating preview of each (already-normalized) user
        // output's marginal cost.
        let total_user_fee: Quantity = user_outputs
            .iter()
            .map(|output| oracle.fee_for_output(output))
            .sum();
        let total_fee_before_change = oracle.min_fee() + total_user_fee;

        // 5. change builder.
        let request = ChangeRequest {
            used_utxos: &used,
            prepared_outputs: user_outputs,
            total_fee_so_far: total_fee_before_change.clone(),
            change_address: change_address.clone(),
            max_tokens_per_output,
            extra_lovelace_credit: total_withdrawal.clone() + deposit_refund.clone(),
            deposit_due: deposit_due.clone(),
        };
        let change = build_change_no_extra(&request, oracle);
        let change_outputs: Vec<Output> = change
            .as_ref()
            .map(|costs| costs.iter().map(|cost| cost.output.clone()).collect())
            .unwrap_or_default();
        let change_fee: Quantity = change
            .as_ref()
            .map(|costs| costs.iter().map(|cost| cost.output_fee.clone()).sum())
            .unwrap_or_else(Quantity::zero);

        // 6. recompute total fee with change folded in.
        let total_fee = total_fee_before_change + change_fee;

        // 7. satisfaction test.
        let mut all_outputs: Vec<&Output> = user_outputs.iter().collect();
        all_outputs.extend(change_outputs.iter());

        let used_dyn: Vec<&dyn AssetBearer> =
            used.iter().map(|u| u as &dyn AssetBearer).collect();
        let output_dyn: Vec<&dyn AssetBearer> =
            all_outputs.iter().map(|o| *o as &dyn AssetBearer).collect();

        let mut units = unique_units_dyn(used_dyn.iter().copied());
        for unit in unique_units_dyn(output_dyn.iter().copied()) {
            if !units.contains(&unit) {
                units.push(unit);
            }
        }

        let unsatisfied: Vec<TokenId> = units
            .into_iter()
            .filter(|unit| !unit.is_lovelace())
            .filter(|unit| {
                let have = sum_dyn(used_dyn.iter().copied(), unit);
                let want = sum_dyn(output_dyn.iter().copied(), unit);
                (Balance::zero() + have - want).in_debt()
            })
            .collect();

        let lovelace_in = sum_unit(&used, &TokenId::LOVELACE) + total_withdrawal.clone() + deposit_refund.clone();
        let lovelace_out = sum_unit(all_outputs.iter().copied(), &TokenId::LOVELACE)
            + total_fee.clone()
            + deposit_due.clone();
        let lovelace_unsatisfied = lovelace_in < lovelace_out;

        // 8. converged.
        if unsatisfied.is_empty() && !lovelace_unsatisfied {
            tracing::debug!(iteration, inputs = used.len(), fee = %total_fee, "selection loop converged");
            return Ok(SelectionOutcome {
                used,
                change_outputs,
                total_fee,
            });
        }

        // 9. pick the next UTXO, preferring lovelace coverage.
        let next_index = if lovelace_unsatisfied {
            if remaining.is_empty() {
                None
            } else {
                Some(0)
            }
        } else {
            remaining
                .iter()
                .position(|utxo| unsatisfied.iter().any(|unit| utxo.holds(unit)))
        };

        match next_index {
            Some(index) => used.push(remaining.remove(index)),
            // 10. no eligible UTXO left while a deficit remains.
            None => return Err(CoinSelectionError::UtxoBalanceInsufficient),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OutputMode;
    use crate::simple_oracle::SimpleOracle;
    use coin_core::tx::{AssetAmount, UtxoPointer};
    use coin_core::OutputIndex;

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

    fn output(lovelace: u64) -> Output {
        Output::user(
            Address::new_static("addr_test1_dest"),
            vec![AssetAmount::lovelace(Quantity::from(lovelace))],
            false,
            OutputMode::Final,
        )
    }

    #[test]
    fn single_utxo_covers_output_and_fee() {
        let mut oracle = SimpleOracle::default();
        let utxos = vec![utxo(0, 5_000_000, vec![])];
        let outputs = vec![output(4_820_000)];
        let outcome = select(
            &utxos,
            &outputs,
            &[],
            &[],
            &Address::new_static("addr_test1_change"),
            100,
            &mut oracle,
        )
        .unwrap();
        assert_eq!(outcome.used.len(), 1);
    }

    #[test]
    fn pulls_second_utxo_when_first_is_insufficient() {
        let mut oracle = SimpleOracle::default();
        // the larger UTXO alone leaves a change remainder under min_ada
        // once its own fee is accounted for, so a second pull is required.
        let utxos = vec![utxo(0, 1_050_000, vec![]), utxo(1, 1_000_000, vec![])];
        let outputs = vec![output(1_000_000)];
        let outcome = select(
            &utxos,
            &outputs,
            &[],
            &[],
            &Address::new_static("addr_test1_change"),
            100,
            &mut oracle,
        )
        .unwrap();
        assert_eq!(outcome.used.len(), 2);
        assert_eq!(outcome.change_outputs.len(), 1);
    }

    #[test]
    fn insufficient_balance_is_reported() {
        let mut oracle = SimpleOracle::default();
        let utxos = vec![utxo(0, 5_000_000, vec![])];
        let outputs = vec![output(10_000_000)];
        let err = select(
            &utxos,
            &outputs,
            &[],
            &[],
            &Address::new_static("addr_test1_change"),
            100,
            &mut oracle,
        )
        .unwrap_err();
        assert_eq!(err, CoinSelectionError::UtxoBalanceInsufficient);
    }

    #[test]
    fn token_max_selection_prefers_largest_token_utxo() {
        let mut oracle = SimpleOracle::default();
        let utxo_small = utxo(0, 3_000_000, vec![("cafe", 1_000)]);
        let utxo_large = utxo(1, 3_000_000, vec![("cafe", 2_000), ("beef", 5)]);
        let utxos = vec![utxo_small.clone(), utxo_large.clone()];

        let mut amount = vec![AssetAmount::lovelace(Quantity::zero())];
        amount.push(AssetAmount {
            unit: TokenId::new_static("cafe"),
            quantity: Quantity::from(50u64),
        });
        let outputs = vec![Output::user(
            Address::new_static("addr_test1_dest"),
            amount,
            false,
            OutputMode::Final,
        )];

        let outcome = select(
            &utxos,
            &outputs,
            &[],
            &[],
            &Address::new_static("addr_test1_change"),
            100,
            &mut oracle,
        )
        .unwrap();

        assert!(outcome.used.iter().any(|u| u.pointer == utxo_large.pointer));
    }

    #[test]
    fn withdrawal_only_produces_change_instead_of_folding_into_fee() {
        // no UTXOs, no user outputs: the entire reward withdrawal must
        // come back as a real change output, not vanish into `fee`.
        let mut oracle = SimpleOracle::default();
        let withdrawals = vec![Withdrawal {
            stake_address: Address::new_static("stake_test1"),
            amount: Quantity::from(10_000_000u64),
        }];
        let outcome = select(
            &[],
            &[],
            &[],
            &withdrawals,
            &Address::new_static("addr_test1_change"),
            100,
            &mut oracle,
        )
        .unwrap();

        assert_eq!(outcome.used.len(), 0);
        assert_eq!(outcome.change_outputs.len(), 1);
        let change_lovelace = sum_unit(&outcome.change_outputs, &TokenId::LOVELACE);
        assert!(change_lovelace > Quantity::zero());
        // balance invariant: withdrawal == change + fee, since nothing
        // else moved lovelace in either direction.
        assert_eq!(
            change_lovelace + outcome.total_fee.clone(),
            Quantity::from(10_000_000u64)
        );
    }

    #[test]
    fn stake_deregistration_refund_feeds_change() {
        let mut oracle = SimpleOracle::default();
        let utxos = vec![utxo(0, 5_000_000, vec![])];
        let certificates = vec![Certificate::StakeDeregistration];
        let outcome = select(
            &utxos,
            &[],
            &certificates,
            &[],
            &Address::new_static("addr_test1_change"),
            100,
            &mut oracle,
        )
        .unwrap();

        assert_eq!(outcome.change_outputs.len(), 1);
        let change_lovelace = sum_unit(&outcome.change_outputs, &TokenId::LOVELACE);
        let deposit_refund = Quantity::from(oracle.protocol_params().key_deposit);
        let used_lovelace = sum_unit(&outcome.used, &TokenId::LOVELACE);
        // balance invariant: inputs + refund == change + fee.
        assert_eq!(
            used_lovelace + deposit_refund,
            change_lovelace + outcome.total_fee.clone()
        );
    }
}
