use crate::domain::{error::PipelineError, event::BuyerRef, id::UserId, store::LedgerStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBuyer {
    pub uid: UserId,
    pub email: Option<String>,
    /// Stored role, if the user exists yet.
    pub role: Option<String>,
}

/// Finds the platform user behind a payment.
///
/// A direct uid is trusted as-is. Otherwise the email is looked up once,
/// trimmed and case-insensitively. `None` means the payment has no owner.
pub async fn resolve_buyer(
    store: &dyn LedgerStore,
    buyer: &BuyerRef,
) -> Result<Option<ResolvedBuyer>, PipelineError> {
    if let Some(uid) = buyer.uid.as_deref().and_then(|raw| UserId::new(raw).ok()) {
        let stored = store.get_user(&uid).await?;
        return Ok(Some(ResolvedBuyer {
            email: buyer
                .email
                .clone()
                .or_else(|| stored.as_ref().and_then(|u| u.email.clone())),
            role: stored.and_then(|u| u.role),
            uid,
        }));
    }

    let Some(email) = buyer.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) else {
        return Ok(None);
    };

    let found = store.find_user_by_email(email).await?;
    if found.is_none() {
        tracing::info!("no user matches buyer email");
    }

    Ok(found.map(|user| ResolvedBuyer {
        uid: user.uid,
        email: user.email.or_else(|| Some(email.to_string())),
        role: user.role,
    }))
}
