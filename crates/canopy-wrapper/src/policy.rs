use std::collections::HashSet;

use thiserror::Error;

use canopy_core::FormatId;

/// Why a format request was turned down.
///
/// Policy violations and hook failures are both surfaced to the creative as
/// `FORMAT_REJECTED`; the distinction exists for publisher diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("format is excluded for this wrapper")]
    Excluded,
    #[error("format is not in the wrapper's allow-list")]
    NotAllowed,
    #[error("another format is already active")]
    AlreadyActive,
    #[error("no recipe registered for this format")]
    UnknownFormat,
    #[error("integration setup failed: {0}")]
    IntegrationSetup(String),
    #[error("format setup failed: {0}")]
    FormatSetup(String),
}

/// Evaluates the allow/exclude policy for one identifier.
///
/// Exclusion always wins; an empty allow-list means unrestricted.
pub fn evaluate_policy(
    allowed: &HashSet<FormatId>,
    excluded: &HashSet<FormatId>,
    id: &FormatId,
) -> Result<(), RejectReason> {
    if excluded.contains(id) {
        return Err(RejectReason::Excluded);
    }
    if !allowed.is_empty() && !allowed.contains(id) {
        return Err(RejectReason::NotAllowed);
    }
    Ok(())
}

/// Parses a comma-separated identifier list, as read from the
/// `allowed-formats` / `exclude-formats` element attributes.
///
/// Blank entries are skipped; unknown names become custom identifiers.
pub fn parse_format_list(raw: &str) -> HashSet<FormatId> {
    raw.split(',')
        .filter_map(|entry| FormatId::parse(entry).ok())
        .collect()
}
