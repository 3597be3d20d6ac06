use uuid::Uuid;

/// Identity of the entity requesting an operation, passed explicitly through
/// admission and access-check layers instead of relying on ambient request
/// state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Option<Uuid>,
    pub anon_id: Option<String>,
    pub authenticated: bool,
}

impl Caller {
    pub fn authenticated(user_id: Uuid) -> Self {
        Self { user_id: Some(user_id), anon_id: None, authenticated: true }
    }

    pub fn anonymous(anon_id: String) -> Self {
        Self { user_id: None, anon_id: Some(anon_id), authenticated: false }
    }

    /// Owner key used for the per-owner concurrency gate (spec.md S4.1.4)
    /// and for the trial/usage lookups (spec.md S4.6).
    pub fn owner_key(&self) -> Option<OwnerKey> {
        if let Some(user_id) = self.user_id {
            Some(OwnerKey::User(user_id))
        } else {
            self.anon_id.clone().map(OwnerKey::Anon)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OwnerKey {
    User(Uuid),
    Anon(String),
}
