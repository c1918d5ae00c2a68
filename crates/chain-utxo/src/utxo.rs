use crate::error::UtxoError;

/// A single unspent transaction output (UTXO).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utxo {
    /// Transaction ID as a hex string (big-endian / display order).
    pub txid: String,
    /// Output index within the transaction.
    pub vout: u32,
    /// Value in satoshis.
    pub amount_sat: u64,
    /// The locking script (scriptPubKey) serialized bytes.
    pub script_pubkey: Vec<u8>,
}

/// Result of UTXO selection: the chosen UTXOs and their aggregate value.
#[derive(Debug, Clone)]
pub struct UtxoSelection {
    /// The selected UTXOs, largest first.
    pub selected: Vec<Utxo>,
    /// Total value of the selected UTXOs in satoshis.
    pub total_sat: u64,
}

/// Orders UTXOs largest first. Ties keep a stable order on `(txid, vout)` so
/// every cosigner selects the same inputs.
fn largest_first(utxos: &[Utxo]) -> Vec<&Utxo> {
    let mut sorted: Vec<&Utxo> = utxos.iter().collect();
    sorted.sort_by(|a, b| {
        b.amount_sat
            .cmp(&a.amount_sat)
            .then_with(|| a.txid.cmp(&b.txid))
            .then_with(|| a.vout.cmp(&b.vout))
    });
    sorted
}

/// Select UTXOs to cover `target_sat` plus the fee.
///
/// Largest-first. `fee_for_inputs` returns the fee for a transaction with the
/// given number of inputs, so callers decide which outputs it accounts for.
pub fn select_utxos(
    utxos: &[Utxo],
    target_sat: u64,
    fee_for_inputs: impl Fn(usize) -> u64,
) -> Result<UtxoSelection, UtxoError> {
    if utxos.is_empty() {
        return Err(UtxoError::InvalidUtxo("no UTXOs available".into()));
    }

    let mut selected: Vec<Utxo> = Vec::new();
    let mut total_sat: u64 = 0;

    for utxo in largest_first(utxos) {
        selected.push(utxo.clone());
        total_sat = total_sat.saturating_add(utxo.amount_sat);

        let fee = fee_for_inputs(selected.len());
        if total_sat >= target_sat.saturating_add(fee) {
            return Ok(UtxoSelection { selected, total_sat });
        }
    }

    Err(UtxoError::InsufficientFunds {
        available: total_sat,
        required: target_sat.saturating_add(fee_for_inputs(selected.len())),
    })
}

/// Selects every UTXO, for max-amount sends.
pub fn select_all(utxos: &[Utxo]) -> Result<UtxoSelection, UtxoError> {
    if utxos.is_empty() {
        return Err(UtxoError::InvalidUtxo("no UTXOs available".into()));
    }
    let selected: Vec<Utxo> = largest_first(utxos).into_iter().cloned().collect();
    let total_sat = selected.iter().map(|u| u.amount_sat).sum();
    Ok(UtxoSelection { selected, total_sat })
}
