use super::RuleViolation;

/// Rejects a parent assignment that would put `feature_id` inside its own
/// subtree.
///
/// `ancestors_of_parent` is the chain walked upward from the proposed parent:
/// the parent's parent first, then its parent, and so on.
pub fn ensure_no_cycle(
    feature_id: i64,
    parent_id: i64,
    ancestors_of_parent: &[i64],
) -> Result<(), RuleViolation> {
    if parent_id == feature_id {
        return Err(RuleViolation::InvalidParent {
            feature_id,
            parent_id,
            reason: "a feature cannot be its own parent",
        });
    }

    if ancestors_of_parent.contains(&feature_id) {
        return Err(RuleViolation::InvalidParent {
            feature_id,
            parent_id,
            reason: "the parent is a descendant of this feature",
        });
    }

    Ok(())
}
