//! The opaque admission token handed out by a [`crate::RateLimiter`].

/// An admission token for one processing attempt.
///
/// Deliberately opaque: the scheduler only ever holds and returns tickets,
/// never inspects or compares them (see `SPEC_FULL.md` §13 on the original's
/// ticket-equality ambiguity — it does not surface here because equality is
/// simply never asked of a `Ticket`).
#[derive(Debug)]
pub struct Ticket(pub(crate) TicketKind);

#[derive(Debug)]
pub(crate) enum TicketKind {
    /// Produced by [`crate::Unlimited`]; carries no resource to give back.
    Synthetic,
    /// Produced by [`crate::TokenBucketLimiter`]; returning it credits one
    /// token back to the bucket.
    Bucket,
}

impl Ticket {
    /// Mints a ticket without consulting any limiter. Used by
    /// [`crate::Unlimited`] and by callers (e.g. a scheduler honouring a
    /// "bypass the rate limiter entirely" control state) that need to hand
    /// out admission without a real resource behind it.
    pub fn synthetic() -> Self {
        Ticket(TicketKind::Synthetic)
    }

    pub(crate) fn bucket() -> Self {
        Ticket(TicketKind::Bucket)
    }
}
