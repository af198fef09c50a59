use anyhow::Result;

use crate::{
    config::App,
    crawler::PriceSource,
    declare::PriceRecord,
    ledger::Ledger,
    logging,
    persistence::{self, PersistenceBackend},
};

/// 這次執行的結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The page shows the same price as the last ledger line.
    Unchanged(PriceRecord),
    /// A new line was appended and pushed.
    Updated(PriceRecord),
}

/// Compares the published price with the ledger tail and records it when it changed.
///
/// An unchanged price leaves the ledger and the repository untouched. A changed price,
/// including the first one in an empty ledger, is appended as one line and then
/// pushed through `backend`. Any error ends the run; an appended line is never
/// rolled back.
pub async fn update_price<S, B>(
    settings: &App,
    ledger: &mut Ledger,
    source: &S,
    backend: &B,
) -> Result<Outcome>
where
    S: PriceSource + Sync + ?Sized,
    B: PersistenceBackend + Sync + ?Sized,
{
    let theirs = source.fetch_price(&settings.source.ident).await?;
    let ours = ledger.last_record()?;

    if ours == theirs {
        logging::info_file_async(format!("Price unchanged: {}", theirs));
        return Ok(Outcome::Unchanged(theirs));
    }

    logging::info_file_async(format!(
        "Price changed from {:?} to {:?}, appending to {}",
        ours.encode(),
        theirs.encode(),
        ledger.path().display()
    ));
    ledger.append(&theirs)?;

    persistence::persist(
        backend,
        &settings.repo_dir(),
        &settings.repository.file_name,
        &theirs,
    )
    .await?;

    Ok(Outcome::Updated(theirs))
}
