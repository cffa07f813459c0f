use crate::{Address, OutputIndex, Quantity, TokenId};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::TransactionId;

/// uniquely identifies a UTXO: `(txHash, outputIndex)`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UtxoPointer {
    pub transaction_id: TransactionId,
    pub output_index: OutputIndex,
}

impl fmt::Display for UtxoPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.transaction_id, self.output_index)
    }
}

/// one entry of a UTXO's or output's value: a quantity of a single asset
/// unit. `unit == TokenId::LOVELACE` denotes the native coin.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetAmount {
    pub unit: TokenId,
    pub quantity: Quantity,
}

impl AssetAmount {
    pub fn lovelace(quantity: Quantity) -> Self {
        Self {
            unit: TokenId::LOVELACE,
            quantity,
        }
    }
}

/// shared lookups over something that carries a multi-asset `amount`
/// vector -- implemented by [`Utxo`] here and by the engine's output
/// types, so the Asset Accountant's multiset functions can stay generic
/// over either.
pub trait AssetBearer {
    fn amounts(&self) -> &[AssetAmount];

    /// the lovelace quantity carried, or zero if somehow absent.
    fn lovelace(&self) -> Quantity {
        self.quantity_of(&TokenId::LOVELACE)
    }

    /// the quantity of `unit` carried, or zero if it doesn't hold that
    /// unit at all.
    fn quantity_of(&self, unit: &TokenId) -> Quantity {
        self.amounts()
            .iter()
            .find(|a| &a.unit == unit)
            .map(|a| a.quantity.clone())
            .unwrap_or_else(Quantity::zero)
    }

    /// the non-lovelace units carried, in the order they appear.
    fn asset_units(&self) -> Box<dyn Iterator<Item = &TokenId> + '_> {
        Box::new(
            self.amounts()
                .iter()
                .filter(|a| !a.unit.is_lovelace())
                .map(|a| &a.unit),
        )
    }

    fn holds(&self, unit: &TokenId) -> bool {
        self.amounts().iter().any(|a| &a.unit == unit)
    }
}

/// an unspent transaction output available for selection.
///
/// At least one entry of `amount` must carry `unit == TokenId::LOVELACE`;
/// this is a caller invariant, not enforced by the constructor, since
/// UTXOs are normally deserialized wholesale from the oracle's view of
/// the chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub pointer: UtxoPointer,
    pub address: Address,
    pub amount: Vec<AssetAmount>,
}

impl Utxo {
    pub fn new(pointer: UtxoPointer, address: Address, amount: Vec<AssetAmount>) -> Self {
        Self {
            pointer,
            address,
            amount,
        }
    }
}

impl AssetBearer for Utxo {
    fn amounts(&self) -> &[AssetAmount] {
        &self.amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pointer(ix: u64) -> UtxoPointer {
        UtxoPointer {
            transaction_id: TransactionId::new_static("deadbeef"),
            output_index: OutputIndex::new(ix),
        }
    }

    #[test]
    fn lovelace_and_asset_lookup() {
        let utxo = Utxo::new(
            pointer(0),
            Address::new_static("addr_test1"),
            vec![
                AssetAmount::lovelace(Quantity::from(5_000_000)),
                AssetAmount {
                    unit: TokenId::new_static("cafe"),
                    quantity: Quantity::from(10),
                },
            ],
        );

        assert_eq!(utxo.lovelace(), Quantity::from(5_000_000));
        assert_eq!(
            utxo.quantity_of(&TokenId::new_static("cafe")),
            Quantity::from(10)
        );
        assert_eq!(
            utxo.quantity_of(&TokenId::new_static("absent")),
            Quantity::zero()
        );
        assert_eq!(
            utxo.asset_units().collect::<Vec<_>>(),
            vec![&TokenId::new_static("cafe")]
        );
    }
}
