mod transaction_id;
mod utxo;

pub use transaction_id::*;
pub use utxo::*;
