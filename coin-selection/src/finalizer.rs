//! Max-Output Finalizer (§4.5): runs once after the Selection Loop
//! converges, draining the remainder into the `setMax` output and
//! rebalancing change.

use coin_core::tx::{AssetAmount, AssetBearer};
use coin_core::{Quantity, TokenId};

use crate::error::CoinSelectionError;
use crate::model::Output;
use crate::oracle::LedgerOracle;

pub struct FinalizedTx {
    pub user_outputs: Vec<Output>,
    pub change_outputs: Vec<Output>,
    pub total_fee: Quantity,
    pub max_amount: Option<Quantity>,
}

fn recompute_fee(user_outputs: &[Output], change_outputs: &[Output], oracle: &dyn LedgerOracle) -> Quantity {
    let user_fee: Quantity = user_outputs.iter().map(|o| oracle.fee_for_output(o)).sum();
    let change_fee: Quantity = change_outputs.iter().map(|o| oracle.fee_for_output(o)).sum();
    oracle.min_fee() + user_fee + change_fee
}

/// case ADA max: no change means nothing to drain; change with no tokens
/// is absorbed whole (plus its own fee); change with tokens keeps exactly
/// `min_ada` and the remainder drains into `M`.
fn finalize_ada_max(
    user_outputs: &mut [Output],
    change_outputs: &mut Vec<Output>,
    max_index: usize,
    oracle: &dyn LedgerOracle,
) -> Result<Quantity, CoinSelectionError> {
    if change_outputs.is_empty() {
        user_outputs[max_index].set_lovelace(Quantity::zero());
        return Ok(Quantity::zero());
    }

    let has_tokens = change_outputs
        .iter()
        .any(|output| output.asset_units().next().is_some());

    if !has_tokens {
        let change = change_outputs.remove(0);
        let change_fee = oracle.fee_for_output(&change);
        let drained = change.lovelace() + change_fee;
        user_outputs[max_index].set_lovelace(drained.clone());
        return Ok(drained);
    }

    let change = &mut change_outputs[0];
    let min_ada = oracle.min_ada(change);
    let drained = change
        .lovelace()
        .checked_sub(&min_ada)
        .ok_or(CoinSelectionError::UtxoBalanceInsufficient)?;
    change.set_lovelace(min_ada);
    user_outputs[max_index].set_lovelace(drained.clone());

    let max_output = &user_outputs[max_index];
    if max_output.lovelace() < oracle.min_ada(max_output) {
        return Err(CoinSelectionError::UtxoBalanceInsufficient);
    }

    Ok(drained)
}

/// case token max: the entire change quantity of `target` moves into `M`,
/// and `M`'s lovelace is recomputed against its new asset payload.
fn finalize_token_max(
    user_outputs: &mut [Output],
    change_outputs: &mut [Output],
    max_index: usize,
    target: &TokenId,
    oracle: &dyn LedgerOracle,
) -> Quantity {
    let mut drained = Quantity::zero();
    for change in change_outputs.iter_mut() {
        let quantity = change.quantity_of(target);
        if !quantity.is_zero() {
            drained = drained + quantity;
            change.remove_unit(target);
        }
    }

    match user_outputs[max_index].quantity_of_mut(target) {
        Some(existing) => *existing = drained.clone(),
        None => user_outputs[max_index].amount.push(AssetAmount {
            unit: target.clone(),
            quantity: drained.clone(),
        }),
    }

    let min_ada = oracle.min_ada(&user_outputs[max_index]);
    user_outputs[max_index].set_lovelace(min_ada);

    drained
}

pub fn finalize(
    user_outputs: &[Output],
    change_outputs: &[Output],
    oracle: &dyn LedgerOracle,
) -> Result<FinalizedTx, CoinSelectionError> {
    let Some(max_index) = user_outputs.iter().position(|output| output.set_max) else {
        return Ok(FinalizedTx {
            total_fee: recompute_fee(user_outputs, change_outputs, oracle),
            user_outputs: user_outputs.to_vec(),
            change_outputs: change_outputs.to_vec(),
            max_amount: None,
        });
    };

    let mut user_outputs = user_outputs.to_vec();
    let mut change_outputs = change_outputs.to_vec();
    let target = user_outputs[max_index]
        .max_target_unit()
        .unwrap_or(TokenId::LOVELACE);

    let max_amount = if target.is_lovelace() {
        finalize_ada_max(&mut user_outputs, &mut change_outputs, max_index, oracle)?
    } else {
        finalize_token_max(&mut user_outputs, &mut change_outputs, max_index, &target, oracle)
    };

    let total_fee = recompute_fee(&user_outputs, &change_outputs, oracle);
    Ok(FinalizedTx {
        user_outputs,
        change_outputs,
        total_fee,
        max_amount: Some(max_amount),
    })
}
