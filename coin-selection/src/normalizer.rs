//! Output Normalizer (§4.1): adjusts user outputs to satisfy per-output
//! `min-ada`, and zeroes `setMax` targets ahead of selection.

use coin_core::tx::AssetAmount;
use coin_core::Quantity;

use crate::error::CoinSelectionError;
use crate::model::{Output, OutputMode, RequestedOutput};
use crate::oracle::LedgerOracle;

pub fn normalize(
    requested: &[RequestedOutput],
    oracle: &dyn LedgerOracle,
) -> Result<Vec<Output>, CoinSelectionError> {
    requested.iter().map(|req| normalize_one(req, oracle)).collect()
}

fn normalize_one(
    req: &RequestedOutput,
    oracle: &dyn LedgerOracle,
) -> Result<Output, CoinSelectionError> {
    let precompose = req.address.is_none()
        || (!req.set_max && req.amount.is_none())
        || req.assets.iter().any(|a| a.quantity.is_none());
    let mode = if precompose {
        OutputMode::Precompose
    } else {
        OutputMode::Final
    };

    let address = req
        .address
        .clone()
        .unwrap_or_else(|| oracle.placeholder_address());
    let has_tokens = !req.assets.is_empty();

    let initial_lovelace = req.amount.clone().unwrap_or_else(Quantity::zero);
    let mut amount = vec![AssetAmount::lovelace(initial_lovelace.clone())];
    for asset in &req.assets {
        amount.push(AssetAmount {
            unit: asset.unit.clone(),
            quantity: asset.quantity.clone().unwrap_or_else(Quantity::zero),
        });
    }

    let mut output = Output::user(address, amount, req.set_max, mode);

    // 1. minOutputAmount for the output's current asset payload.
    let min_output_amount = oracle.min_ada(&output);

    // 2. bump a token-carrying output up to its floor.
    if has_tokens && initial_lovelace < min_output_amount {
        output.set_lovelace(min_output_amount.clone());
    }

    // 3. zero the setMax target ahead of selection.
    if req.set_max {
        let target = req.target_unit();
        if target.is_lovelace() {
            output.set_lovelace(Quantity::zero());
        } else if let Some(quantity) = output.quantity_of_mut(&target) {
            *quantity = Quantity::zero();
        }
    } else if !has_tokens {
        // 4. explicit, too-small ADA-only amount is fatal.
        if let Some(explicit) = req.amount.as_ref() {
            if *explicit < min_output_amount {
                return Err(CoinSelectionError::UtxoValueTooSmall);
            }
        }
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RequestedAsset;
    use crate::simple_oracle::SimpleOracle;
    use coin_core::tx::AssetBearer;
    use coin_core::{Address, TokenId};

    #[test]
    fn bumps_token_output_to_min_ada() {
        let oracle = SimpleOracle::default();
        let requested = vec![RequestedOutput {
            address: Some(Address::new_static("addr_test1")),
            amount: Some(Quantity::from(1)),
            assets: vec![RequestedAsset {
                unit: TokenId::new_static("cafe"),
                quantity: Some(Quantity::from(10)),
            }],
            set_max: false,
        }];

        let prepared = normalize(&requested, &oracle).unwrap();
        assert_eq!(prepared.len(), 1);
        assert!(prepared[0].lovelace() >= oracle.min_ada(&prepared[0]));
    }

    #[test]
    fn rejects_too_small_explicit_ada_only_amount() {
        let oracle = SimpleOracle::default();
        let requested = vec![RequestedOutput {
            address: Some(Address::new_static("addr_test1")),
            amount: Some(Quantity::from(1)),
            assets: vec![],
            set_max: false,
        }];

        let err = normalize(&requested, &oracle).unwrap_err();
        assert_eq!(err, CoinSelectionError::UtxoValueTooSmall);
    }

    #[test]
    fn set_max_zeroes_lovelace_target() {
        let oracle = SimpleOracle::default();
        let requested = vec![RequestedOutput {
            address: Some(Address::new_static("addr_test1")),
            amount: None,
            assets: vec![],
            set_max: true,
        }];

        let prepared = normalize(&requested, &oracle).unwrap();
        assert_eq!(prepared[0].lovelace(), Quantity::zero());
    }

    #[test]
    fn missing_address_is_precompose() {
        let oracle = SimpleOracle::default();
        let requested = vec![RequestedOutput {
            address: None,
            amount: Some(Quantity::from(2_000_000)),
            assets: vec![],
            set_max: false,
        }];

        let prepared = normalize(&requested, &oracle).unwrap();
        assert_eq!(prepared[0].mode, OutputMode::Precompose);
    }
}
