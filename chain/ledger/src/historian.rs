//! Transaction record hooks driven by `HederaLedger::commit`

/// Records historian consulted around the accounts commit.
///
/// `finalize_expirable_transaction_record` runs before the accounts ledger is
/// flushed; the other two run after it succeeds.
pub trait RecordsHistorian {
    fn finalize_expirable_transaction_record(&mut self);

    fn save_expirable_transaction_record(&mut self);

    fn note_new_expiration_events(&mut self);
}
