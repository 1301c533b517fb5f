use crate::ids::EvidenceId;

/// Upper bound on evidence ids per batch association call.
pub const ASSOCIATION_BATCH_LIMIT: usize = 50;

/// Splits ids into consecutive chunks of at most `limit`, keeping order.
pub fn association_batches(ids: &[EvidenceId], limit: usize) -> Vec<Vec<EvidenceId>> {
    let limit = limit.max(1);
    ids.chunks(limit).map(|c| c.to_vec()).collect()
}
