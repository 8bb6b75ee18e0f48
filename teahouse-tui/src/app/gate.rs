use std::collections::HashSet;

use teahouse_types::{NewProfile, Profile, User, ValidationError};

use crate::api::{ApiResult, Repository};

/// Which top-level screen the user can see
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Loading,
    /// Backend settings are missing; nothing else is reachable
    Misconfigured,
    Unauthenticated,
    NeedsProfileSetup,
    Ready,
}

/// Identity and profile snapshot of the signed-in user, plus the posts they
/// liked during this session.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub profile: Option<Profile>,
    liked_posts: HashSet<i64>,
}

impl Session {
    pub fn new(user: User) -> Self {
        Self {
            user,
            profile: None,
            liked_posts: HashSet::new(),
        }
    }

    pub fn has_liked(&self, post_id: i64) -> bool {
        self.liked_posts.contains(&post_id)
    }

    /// Lock the like control for a post. Returns false if already locked.
    pub fn lock_like(&mut self, post_id: i64) -> bool {
        self.liked_posts.insert(post_id)
    }

    pub fn release_like(&mut self, post_id: i64) {
        self.liked_posts.remove(&post_id);
    }
}

/// Session/profile gate. Re-evaluated whenever the identity changes.
#[derive(Debug)]
pub struct Gate {
    state: GateState,
    session: Option<Session>,
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}

impl Gate {
    pub fn new() -> Self {
        Self {
            state: GateState::Loading,
            session: None,
        }
    }

    /// Terminal state for a missing backend configuration
    pub fn misconfigured() -> Self {
        log::warn!("Backend URL or anonymous key missing; the app cannot start");
        Self {
            state: GateState::Misconfigured,
            session: None,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut Session> {
        self.session.as_mut()
    }

    pub fn user(&self) -> Option<&User> {
        self.session.as_ref().map(|s| &s.user)
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.session.as_ref().and_then(|s| s.profile.as_ref())
    }

    /// Evaluate the gate for the identity the provider reports.
    ///
    /// The like ledger survives re-evaluation for the same user.
    pub async fn evaluate(&mut self, repo: &Repository, user: Option<User>) -> ApiResult<GateState> {
        if self.state == GateState::Misconfigured {
            return Ok(self.state);
        }

        let Some(user) = user else {
            self.session = None;
            self.state = GateState::Unauthenticated;
            return Ok(self.state);
        };

        let mut session = match self.session.take() {
            Some(existing) if existing.user.id == user.id => Session { user, ..existing },
            _ => Session::new(user),
        };
        let was_ready = self.state == GateState::Ready && session.profile.is_some();

        let result = repo.fetch_profile(session.user.id).await;
        match result {
            Ok(profile) => {
                self.state = if profile.is_some() {
                    GateState::Ready
                } else {
                    GateState::NeedsProfileSetup
                };
                session.profile = profile;
                self.session = Some(session);
                Ok(self.state)
            }
            Err(e) => {
                // Keep the identity so a retry can re-run the check. A ready
                // user keeps the last profile snapshot.
                self.session = Some(session);
                if !was_ready {
                    self.state = GateState::Loading;
                }
                Err(e)
            }
        }
    }

    /// Name to prefill the profile setup form with
    pub fn suggested_name(&self) -> String {
        self.user()
            .and_then(|u| u.display_name.clone())
            .unwrap_or_default()
    }

    /// Create the profile on first login, then re-fetch it
    pub async fn complete_profile_setup(&mut self, repo: &Repository, full_name: &str) -> ApiResult<()> {
        let full_name = full_name.trim();
        if full_name.is_empty() {
            return Err(ValidationError::Empty { field: "full_name" }.into());
        }
        let Some(user) = self.user().cloned() else {
            return Err(crate::api::ApiError::Unauthorized("sign in first".to_string()));
        };

        repo.create_profile(&NewProfile {
            id: user.id,
            full_name: full_name.to_string(),
        })
        .await?;

        self.evaluate(repo, Some(user)).await?;
        Ok(())
    }

    /// Replace the profile snapshot after an edit
    pub fn set_profile(&mut self, profile: Profile) {
        if let Some(session) = self.session.as_mut() {
            if session.user.id == profile.id {
                session.profile = Some(profile);
            }
        }
    }
}

/// Email one-time-code sign-in form
#[derive(Debug, Clone, Default)]
pub struct SignInForm {
    pub email: String,
    pub code: String,
    pub code_sent: bool,
    pub busy: bool,
    pub error: Option<String>,
    pub message: Option<String>,
}

impl SignInForm {
    /// The field currently being typed into
    pub fn active_field(&mut self) -> &mut String {
        if self.code_sent {
            &mut self.code
        } else {
            &mut self.email
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
