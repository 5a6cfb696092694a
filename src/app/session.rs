use crate::domain::UserInfo;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SessionState {
    Unknown,
    SignedIn(UserInfo),
    SignedOut,
}

/// Application-scoped identity. Probed once at startup and again only after an
/// explicit sign-in; logout invalidates it. `generation` ties probe responses
/// to the probe that asked for them.
#[derive(Clone, Debug)]
pub struct SessionContext {
    pub state: SessionState,
    pub generation: u64,
}

impl SessionContext {
    pub fn new() -> Self {
        Self {
            state: SessionState::Unknown,
            generation: 0,
        }
    }

    pub fn user(&self) -> Option<&UserInfo> {
        match &self.state {
            SessionState::SignedIn(user) => Some(user),
            _ => None,
        }
    }

    pub fn begin_probe(&mut self) -> u64 {
        self.generation += 1;
        self.state = SessionState::Unknown;
        self.generation
    }

    /// Applies a probe result. A failed probe reads as signed out. Returns
    /// `false` when the result belongs to a superseded probe.
    pub fn resolve(&mut self, generation: u64, user: Option<UserInfo>) -> bool {
        if generation != self.generation {
            return false;
        }
        self.state = match user {
            Some(user) => SessionState::SignedIn(user),
            None => SessionState::SignedOut,
        };
        true
    }

    pub fn invalidate(&mut self) {
        self.generation += 1;
        self.state = SessionState::SignedOut;
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserInfo {
        UserInfo {
            name: "Asha".to_string(),
            email: None,
            avatar: None,
        }
    }

    #[test]
    fn probe_resolves_to_signed_in() {
        let mut session = SessionContext::new();
        let generation = session.begin_probe();
        assert_eq!(session.state, SessionState::Unknown);
        assert!(session.resolve(generation, Some(user())));
        assert_eq!(session.user().map(|u| u.name.as_str()), Some("Asha"));
    }

    #[test]
    fn failed_probe_reads_as_signed_out() {
        let mut session = SessionContext::new();
        let generation = session.begin_probe();
        assert!(session.resolve(generation, None));
        assert_eq!(session.state, SessionState::SignedOut);
    }

    #[test]
    fn logout_discards_in_flight_probe() {
        let mut session = SessionContext::new();
        let generation = session.begin_probe();
        session.invalidate();
        assert!(!session.resolve(generation, Some(user())));
        assert_eq!(session.state, SessionState::SignedOut);
    }
}
