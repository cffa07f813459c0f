use serde::{Deserialize, Serialize};

/// the dust-pull floor from the Change Builder (§4.3): below this, a
/// missing change output is burned as fee rather than triggering another
/// UTXO pull.
pub const DUST_PULL_FLOOR: u64 = 5_000;

/// default cap on distinct token units per change output before the
/// Change Builder splits into multiple outputs.
pub const DEFAULT_MAX_TOKENS_PER_OUTPUT: u32 = 100;

/// protocol constants the Ledger Oracle's arithmetic is parameterized by.
///
/// Defaults match Cardano mainnet at time of writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolParams {
    /// linear-fee coefficient `a` in `fee = a * size + b`.
    pub fee_coefficient: u64,
    /// linear-fee constant `b`.
    pub fee_constant: u64,
    pub coins_per_utxo_byte: u64,
    pub max_value_size: usize,
    pub max_tx_size: usize,
    pub key_deposit: u64,
    pub pool_deposit: u64,
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self {
            fee_coefficient: 44,
            fee_constant: 155_381,
            coins_per_utxo_byte: 4_310,
            max_value_size: 5_000,
            max_tx_size: 16_384,
            key_deposit: 2_000_000,
            pool_deposit: 500_000_000,
        }
    }
}

/// override for `feeParams.a`, carried as a string over the wire like the
/// rest of the request's quantities.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeeParamsOverride {
    pub a: Option<String>,
}

/// the `options` object of a compose request. Unknown keys are ignored by
/// `serde`'s default (non-`deny_unknown_fields`) behavior.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComposeOptions {
    #[serde(rename = "_maxTokensPerOutput")]
    pub max_tokens_per_output: Option<u32>,
    pub fee_params: Option<FeeParamsOverride>,
}

impl ComposeOptions {
    pub fn max_tokens_per_output(&self) -> usize {
        self.max_tokens_per_output
            .unwrap_or(DEFAULT_MAX_TOKENS_PER_OUTPUT) as usize
    }

    /// resolve a [`ProtocolParams`] baseline against this request's
    /// overrides.
    pub fn resolve_params(&self, base: ProtocolParams) -> ProtocolParams {
        let mut params = base;
        if let Some(a) = self.fee_params.as_ref().and_then(|f| f.a.as_ref()) {
            if let Ok(a) = a.parse() {
                params.fee_coefficient = a;
            }
        }
        params
    }
}
