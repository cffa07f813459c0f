use coin_core::tx::{AssetAmount, AssetBearer};
use coin_core::{Address, Quantity, TokenId};
use serde::{Deserialize, Serialize};

use crate::error::CoinSelectionError;

/// one requested asset quantity within a [`RequestedOutput`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestedAsset {
    pub unit: TokenId,
    pub quantity: Option<Quantity>,
}

/// a caller-supplied output, possibly incomplete (see [`OutputMode`]).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestedOutput {
    pub address: Option<Address>,
    pub amount: Option<Quantity>,
    pub assets: Vec<RequestedAsset>,
    pub set_max: bool,
}

impl RequestedOutput {
    /// the asset this output's `setMax` flag (if any) targets: its first
    /// token if it carries one, else lovelace.
    pub fn target_unit(&self) -> TokenId {
        self.assets
            .first()
            .map(|a| a.unit.clone())
            .unwrap_or(TokenId::LOVELACE)
    }
}

/// whether an [`Output`] went through composition with every field
/// present (`Final`) or was missing an address/amount/quantity and had a
/// placeholder substituted for size/fee math (`Precompose`, §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputMode {
    Final,
    Precompose,
}

/// a single output of the composed transaction: a user output or a
/// change output (`is_change`), always carrying concrete, resolved
/// quantities once it leaves the Normalizer -- the "duck-typed" variance
/// of the wire format collapses to this one representation plus `mode`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Output {
    pub address: Address,
    pub amount: Vec<AssetAmount>,
    pub set_max: bool,
    pub is_change: bool,
    pub mode: OutputMode,
}

impl Output {
    pub fn user(address: Address, amount: Vec<AssetAmount>, set_max: bool, mode: OutputMode) -> Self {
        Self {
            address,
            amount,
            set_max,
            is_change: false,
            mode,
        }
    }

    pub fn change(address: Address, amount: Vec<AssetAmount>) -> Self {
        Self {
            address,
            amount,
            set_max: false,
            is_change: true,
            mode: OutputMode::Final,
        }
    }

    pub fn lovelace_amount(&self) -> Quantity {
        self.lovelace()
    }

    pub fn set_lovelace(&mut self, value: Quantity) {
        if let Some(entry) = self.amount.iter_mut().find(|a| a.unit.is_lovelace()) {
            entry.quantity = value;
        } else {
            self.amount.push(AssetAmount::lovelace(value));
        }
    }

    pub fn quantity_of_mut(&mut self, unit: &TokenId) -> Option<&mut Quantity> {
        self.amount
            .iter_mut()
            .find(|a| &a.unit == unit)
            .map(|a| &mut a.quantity)
    }

    pub fn remove_unit(&mut self, unit: &TokenId) {
        self.amount.retain(|a| &a.unit != unit);
    }

    /// the asset this output's `setMax` targets, if `set_max` is set: its
    /// first non-lovelace unit if it carries one, else lovelace.
    pub fn max_target_unit(&self) -> Option<TokenId> {
        if !self.set_max {
            return None;
        }
        Some(
            self.amount
                .iter()
                .find(|a| !a.unit.is_lovelace())
                .map(|a| a.unit.clone())
                .unwrap_or(TokenId::LOVELACE),
        )
    }
}

impl AssetBearer for Output {
    fn amounts(&self) -> &[AssetAmount] {
        &self.amount
    }
}

/// the four certificate kinds the ledger accepts, tagged `0..=3` on the
/// wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Certificate {
    StakeRegistration,
    StakeDeregistration,
    StakeDelegation { pool_hash: String },
    StakePoolRegistration,
}

impl Certificate {
    /// the deposit this certificate adds (positive) or refunds (negative)
    /// to the balance equation.
    pub fn deposit(&self, params: &crate::config::ProtocolParams) -> i128 {
        match self {
            Certificate::StakeRegistration => params.key_deposit as i128,
            Certificate::StakeDeregistration => -(params.key_deposit as i128),
            Certificate::StakeDelegation { .. } => 0,
            Certificate::StakePoolRegistration => params.pool_deposit as i128,
        }
    }
}

/// the wire shape of a certificate: a numeric tag plus certificate-kind
/// specific fields, convertible to the closed [`Certificate`] enum --
/// conversion is where `UNSUPPORTED_CERTIFICATE_TYPE` surfaces for tags
/// outside `{0,1,2,3}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCertificate {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub pool_hash: Option<String>,
}

impl TryFrom<RawCertificate> for Certificate {
    type Error = CoinSelectionError;

    fn try_from(raw: RawCertificate) -> Result<Self, Self::Error> {
        match raw.kind {
            0 => Ok(Certificate::StakeRegistration),
            1 => Ok(Certificate::StakeDeregistration),
            2 => Ok(Certificate::StakeDelegation {
                pool_hash: raw.pool_hash.unwrap_or_default(),
            }),
            3 => Ok(Certificate::StakePoolRegistration),
            other => Err(CoinSelectionError::UnsupportedCertificateType(other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Withdrawal {
    pub stake_address: Address,
    pub amount: Quantity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedTx {
    pub body: String,
    pub hash: String,
    pub size: usize,
}

/// the return record of a composition (§6.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    pub total_spent: Quantity,
    pub fee: Quantity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Vec<coin_core::tx::Utxo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Vec<Output>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx: Option<SerializedTx>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<Quantity>,
}
