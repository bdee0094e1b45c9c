//! Adding several funds from one line of user input

use crate::core::fund::{FundCode, FundError};
use crate::core::resolver::FundResolver;
use crate::store::fund_list::{FundListStore, StoreError};
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info};

/// Where each requested code ended up, in input order.
#[derive(Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    pub added: Vec<FundCode>,
    pub duplicates: Vec<FundCode>,
    pub not_found: Vec<FundCode>,
}

/// Adds every code the portal knows about. Codes already in the list, or
/// repeated within `codes`, are reported as duplicates without an upstream
/// lookup. Unknown codes are reported and left out of the list.
pub async fn add_codes(
    store: &FundListStore,
    resolver: &FundResolver,
    codes: Vec<FundCode>,
) -> Result<BatchOutcome, StoreError> {
    let mut outcome = BatchOutcome::default();
    let mut seen: HashSet<FundCode> = store.list().await?.into_iter().map(|f| f.code).collect();

    let mut candidates = Vec::new();
    for code in codes {
        if seen.insert(code.clone()) {
            candidates.push(code);
        } else {
            outcome.duplicates.push(code);
        }
    }

    let known = join_all(candidates.iter().map(|code| resolver.is_known(code))).await;
    for (code, known) in candidates.into_iter().zip(known) {
        if !known {
            debug!("Fund {} is unknown upstream", code);
            outcome.not_found.push(code);
            continue;
        }
        match store.add(code.as_str()).await {
            Ok(code) => outcome.added.push(code),
            Err(StoreError::Invalid(FundError::Duplicate(_))) => outcome.duplicates.push(code),
            Err(e) => return Err(e),
        }
    }

    info!(
        "Batch add: {} added, {} duplicates, {} not found",
        outcome.added.len(),
        outcome.duplicates.len(),
        outcome.not_found.len()
    );
    Ok(outcome)
}
