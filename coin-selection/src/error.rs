use thiserror::Error;

/// the five fatal conditions composition can raise.
///
/// Carries only an identifying kind -- no chained source -- matching the
/// boundary contract: composition aborts on any of these and returns no
/// partial result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoinSelectionError {
    #[error("UTXO balance insufficient")]
    UtxoBalanceInsufficient,

    #[error("output value too small")]
    UtxoValueTooSmall,

    #[error("unsupported certificate type: {0}")]
    UnsupportedCertificateType(u8),

    #[error("serialized transaction exceeds max tx size")]
    MaxTxSizeReached,

    #[error("output value exceeds max value size")]
    MaxValueSizeReached,
}
