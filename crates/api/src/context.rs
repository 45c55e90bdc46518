use tillworks_auth::{AccessScope, Actor};

/// Authenticated identity plus resolved store scope for one request.
///
/// Installed by the auth middleware; immutable for the life of the request.
/// Handlers never widen the scope, they only pass it down.
#[derive(Debug, Clone)]
pub struct RequestContext {
    actor: Actor,
    scope: AccessScope,
}

impl RequestContext {
    pub fn new(actor: Actor, scope: AccessScope) -> Self {
        Self { actor, scope }
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn scope(&self) -> &AccessScope {
        &self.scope
    }
}
