//! Change Builder (§4.3): builds one or more change outputs, splitting
//! when the token count exceeds `maxTokensPerOutput`.

use coin_core::tx::{AssetAmount, Utxo};
use coin_core::{Address, Balance, Quantity, TokenId};

use crate::accountant::{sum_unit, unique_asset_units};
use crate::config::DUST_PULL_FLOOR;
use crate::model::Output;
use crate::oracle::LedgerOracle;

/// one change output plus the marginal fee and floor the oracle quoted
/// for it.
#[derive(Debug, Clone)]
pub struct OutputCost {
    pub output: Output,
    pub output_fee: Quantity,
    pub min_output_amount: Quantity,
}

pub struct ChangeRequest<'a> {
    pub used_utxos: &'a [Utxo],
    pub prepared_outputs: &'a [Output],
    pub total_fee_so_far: Quantity,
    pub change_address: Address,
    pub max_tokens_per_output: usize,
    /// lovelace the balance equation credits on the input side besides
    /// `used_utxos` -- reward withdrawals plus any certificate deposit
    /// refund (§3 invariant 1, §4.4 step 7's `lovelace_in`). Without this,
    /// a withdrawal- or refund-only composition looks like it has no
    /// leftover lovelace to turn into change, and the whole credit gets
    /// burned as fee instead (spec §8 scenarios 6-7).
    pub extra_lovelace_credit: Quantity,
    /// lovelace the balance equation owes on the output side besides
    /// `prepared_outputs` -- a net certificate deposit (§3 invariant 1's
    /// `Σ deposits`).
    pub deposit_due: Quantity,
}

enum ChangeOutcome {
    Built(Vec<OutputCost>),
    NeedsMore(Quantity),
}

/// `change[u] = sum_inputs(u) - sum_outputs(u)` for every unit the used
/// UTXOs carry, dropping units that are fully consumed or in debt (a
/// debt here just means this unit isn't satisfied yet -- the Selection
/// Loop's satisfaction test is what reports that, not the builder).
fn asset_change_vector(utxos: &[Utxo], outputs: &[Output]) -> Vec<AssetAmount> {
    unique_asset_units(utxos)
        .into_iter()
        .filter_map(|unit| {
            let input_qty = sum_unit(utxos, &unit);
            let output_qty = sum_unit(outputs, &unit);
            let balance = Balance::zero() + input_qty - output_qty;
            balance
                .excess()
                .cloned()
                .map(|quantity| AssetAmount { unit, quantity })
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn build_change_once(
    used_utxos: &[Utxo],
    prepared_outputs: &[Output],
    total_fee_so_far: &Quantity,
    change_address: &Address,
    max_tokens_per_output: usize,
    extra_lovelace_credit: &Quantity,
    deposit_due: &Quantity,
    oracle: &dyn LedgerOracle,
) -> ChangeOutcome {
    let change_assets = asset_change_vector(used_utxos, prepared_outputs);
    let has_change_tokens = !change_assets.is_empty();

    // even with no token change, a single ada-only bundle is always
    // costed: the "needed" test below must compare the leftover lovelace
    // against a real min_ada floor, not an absent one.
    let bundles: Vec<Vec<AssetAmount>> = if change_assets.is_empty() {
        vec![Vec::new()]
    } else if change_assets.len() > max_tokens_per_output {
        tracing::debug!(
            tokens = change_assets.len(),
            cap = max_tokens_per_output,
            "change token count exceeds cap, splitting into multiple outputs"
        );
        change_assets
            .chunks(max_tokens_per_output)
            .map(<[AssetAmount]>::to_vec)
            .collect()
    } else {
        vec![change_assets]
    };

    // size each bundle with a zero-ada placeholder to learn its floor and
    // marginal fee.
    let mut costed: Vec<OutputCost> = bundles
        .into_iter()
        .map(|tokens| {
            let mut amount = vec![AssetAmount::lovelace(Quantity::zero())];
            amount.extend(tokens);
            let output = Output::change(change_address.clone(), amount);
            let min_output_amount = oracle.min_ada(&output);
            let output_fee = oracle.fee_for_output(&output);
            OutputCost {
                output,
                output_fee,
                min_output_amount,
            }
        })
        .collect();

    let sum_output_fees: Quantity = costed
        .iter()
        .map(|cost| cost.output_fee.clone())
        .sum();
    let input_lovelace = sum_unit(used_utxos, &TokenId::LOVELACE);
    let output_lovelace = sum_unit(prepared_outputs, &TokenId::LOVELACE);

    // §3 invariant 1's `lovelace_in`/`lovelace_out` extend past the used
    // UTXOs and prepared outputs: reward withdrawals and a net deposit
    // refund are credit on the input side, a net deposit due is a debit
    // on the output side. Omitting them here makes a withdrawal- or
    // refund-only composition look like it has no change to build, so
    // the whole credit would otherwise be folded into `fee` upstream.
    let change_ada = input_lovelace + extra_lovelace_credit.clone()
        - output_lovelace
        - total_fee_so_far.clone()
        - sum_output_fees
        - deposit_due.clone();

    let min_required_ada: Quantity = costed
        .iter()
        .map(|cost| cost.min_output_amount.clone())
        .sum();

    let needed = has_change_tokens || change_ada >= min_required_ada;
    if !needed {
        return ChangeOutcome::NeedsMore(change_ada);
    }

    let total_ada_for_change = if change_ada < min_required_ada {
        min_required_ada.clone()
    } else {
        change_ada
    };

    let last_index = costed.len() - 1;
    let reserved_for_non_last: Quantity = costed[..last_index]
        .iter()
        .map(|cost| cost.min_output_amount.clone())
        .sum();
    let last_ada = total_ada_for_change
        .checked_sub(&reserved_for_non_last)
        .unwrap_or_else(|| costed[last_index].min_output_amount.clone());

    for (index, cost) in costed.iter_mut().enumerate() {
        let ada = if index == last_index {
            last_ada.clone()
        } else {
            cost.min_output_amount.clone()
        };
        cost.output.set_lovelace(ada);
    }

    ChangeOutcome::Built(costed)
}

/// builds change, optionally pulling extra UTXOs through `pick_extra_utxo`
/// when the would-be change is a near-dust shortfall (§4.3 step 5). The
/// Selection Loop (§4.4) calls this with no picker and relies on its own
/// iteration to cover shortfalls instead; `pick_extra_utxo` exists for a
/// caller building change directly, outside the main loop.
pub fn build_change<F: FnMut() -> Option<Utxo>>(
    request: &ChangeRequest<'_>,
    oracle: &dyn LedgerOracle,
    mut pick_extra_utxo: Option<F>,
) -> Option<Vec<OutputCost>> {
    let mut used_utxos = request.used_utxos.to_vec();
    loop {
        match build_change_once(
            &used_utxos,
            request.prepared_outputs,
            &request.total_fee_so_far,
            &request.change_address,
            request.max_tokens_per_output,
            &request.extra_lovelace_credit,
            &request.deposit_due,
            oracle,
        ) {
            ChangeOutcome::Built(costs) => return Some(costs),
            ChangeOutcome::NeedsMore(change_ada) => {
                let floor = Quantity::from(DUST_PULL_FLOOR);
                let picked = pick_extra_utxo
                    .as_mut()
                    .filter(|_| change_ada >= floor)
                    .and_then(|picker| picker());
                match picked {
                    Some(extra) => used_utxos.push(extra),
                    None => {
                        tracing::debug!(change_ada = %change_ada, "change below min_ada, burning as fee");
                        return None;
                    }
                }
            }
        }
    }
}

/// convenience for callers (the Selection Loop) that never pull extra
/// UTXOs from within the builder itself.
pub fn build_change_no_extra(
    request: &ChangeRequest<'_>,
    oracle: &dyn LedgerOracle,
) -> Option<Vec<OutputCost>> {
    build_change(request, oracle, None::<fn() -> Option<Utxo>>)
}
