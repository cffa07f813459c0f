//! pure multiset functions over asset-bearing collections (§4.2).

use coin_core::tx::AssetBearer;
use coin_core::{Quantity, TokenId};

use crate::config::ProtocolParams;
use crate::model::Certificate;

/// sums the quantity of `unit` across every item, whether that's a set
/// of UTXOs on the input side or a set of outputs (user and/or change)
/// on the output side.
pub fn sum_unit<'a, T: AssetBearer + 'a>(
    items: impl IntoIterator<Item = &'a T>,
    unit: &TokenId,
) -> Quantity {
    items
        .into_iter()
        .map(|item| item.quantity_of(unit))
        .sum()
}

/// the distinct non-lovelace asset units carried across `items`,
/// preserving first-seen order.
pub fn unique_asset_units<'a, T: AssetBearer + 'a>(
    items: impl IntoIterator<Item = &'a T>,
) -> Vec<TokenId> {
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

/// the signed deposit total of a set of certificates: positive for
/// registrations, negative for refunds, zero for delegations.
pub fn required_deposit(certs: &[Certificate], params: &ProtocolParams) -> i128 {
    certs.iter().map(|c| c.deposit(params)).sum()
}

/// splits a signed net deposit into the amount owed by the transaction
/// and the amount refunded to it; never both at once.
pub fn split_deposit(deposit_net: i128) -> (Quantity, Quantity) {
    if deposit_net >= 0 {
        (Quantity::from(deposit_net as u64), Quantity::zero())
    } else {
        (Quantity::zero(), Quantity::from((-deposit_net) as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coin_core::tx::{AssetAmount, Utxo, UtxoPointer};
    use coin_core::{Address, OutputIndex};
    use quickcheck::quickcheck;

    fn utxo(lovelace: u64, extra: Vec<(&str, u64)>) -> Utxo {
        let mut amount = vec![AssetAmount::lovelace(Quantity::from(lovelace))];
        amount.extend(extra.into_iter().map(|(unit, qty)| AssetAmount {
            unit: TokenId::new(unit.to_owned()),
            quantity: Quantity::from(qty),
        }));
        Utxo::new(
            UtxoPointer {
                transaction_id: coin_core::tx::TransactionId::new_static("tx"),
                output_index: OutputIndex::new(0),
            },
            Address::new_static("addr_test1"),
            amount,
        )
    }

    #[test]
    fn sums_lovelace_across_utxos() {
        let utxos = vec![utxo(1_000_000, vec![]), utxo(2_000_000, vec![])];
        assert_eq!(sum_unit(&utxos, &TokenId::LOVELACE), Quantity::from(3_000_000));
    }

    #[test]
    fn unique_units_preserve_first_seen_order() {
        let utxos = vec![
            utxo(1_000_000, vec![("beef", 1), ("cafe", 2)]),
            utxo(1_000_000, vec![("cafe", 3), ("dead", 4)]),
        ];
        let units = unique_asset_units(&utxos);
        assert_eq!(
            units,
            vec![
                TokenId::new_static("beef"),
                TokenId::new_static("cafe"),
                TokenId::new_static("dead"),
            ]
        );
    }

    #[test]
    fn required_deposit_matches_cert_kinds() {
        let params = ProtocolParams::default();
        let certs = vec![Certificate::StakeRegistration, Certificate::StakeDeregistration];
        assert_eq!(required_deposit(&certs, &params), 0);

        let certs = vec![Certificate::StakeRegistration];
        assert_eq!(required_deposit(&certs, &params), params.key_deposit as i128);
    }

    quickcheck! {
        fn sum_unit_over_two_utxos_is_additive(a: u64, b: u64) -> bool {
            let utxos = vec![utxo(a, vec![]), utxo(b, vec![])];
            sum_unit(&utxos, &TokenId::LOVELACE) == Quantity::from(a) + Quantity::from(b)
        }

        fn split_deposit_never_sets_both_sides(deposit_net: i64) -> bool {
            let deposit_net = deposit_net as i128;
            let (due, refund) = split_deposit(deposit_net);
            !(due.is_zero()) as i128 + !(refund.is_zero()) as i128 <= 1
        }
    }
}
