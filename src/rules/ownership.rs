use super::RuleViolation;

/// Fails unless the acting user is the recorded owner of the resource.
///
/// Callers look the resource up first so a missing record is reported as
/// not found before this runs.
pub fn ensure_owner(actor_id: i64, owner_id: i64, resource: &str) -> Result<(), RuleViolation> {
    if actor_id == owner_id {
        Ok(())
    } else {
        Err(RuleViolation::NotOwner {
            actor_id,
            resource: resource.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_passes() {
        assert!(ensure_owner(4, 4, "comment 1").is_ok());
    }

    #[test]
    fn other_user_rejected() {
        assert_eq!(
            ensure_owner(5, 4, "comment 1"),
            Err(RuleViolation::NotOwner {
                actor_id: 5,
                resource: "comment 1".to_string()
            })
        );
    }
}
