//! Server-side store for pending MFA state.
//!
//! Two kinds of entries live here, both short-lived and held only in process
//! memory:
//!
//! - **Login challenges**: created when a password check succeeds for an
//!   MFA-enabled account. The client receives only the random challenge id;
//!   the secret snapshot stays server-side and is resolved when the code is
//!   submitted. Each challenge is consumed at most once.
//! - **Pending enrollments**: the freshly generated secret parked between
//!   `enroll/start` and `enroll/finish`, keyed by user id.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

pub(super) struct PendingChallenge {
    pub(super) user_id: Uuid,
    pub(super) secret: String,
    created_at: Instant,
}

pub(super) struct PendingEnrollment {
    pub(super) secret: String,
    created_at: Instant,
}

pub struct ChallengeStore {
    ttl: Duration,
    challenges: Mutex<HashMap<Uuid, PendingChallenge>>,
    enrollments: Mutex<HashMap<Uuid, PendingEnrollment>>,
}

impl ChallengeStore {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            challenges: Mutex::new(HashMap::new()),
            enrollments: Mutex::new(HashMap::new()),
        }
    }

    /// Store a login challenge and return the opaque id handed to the client.
    pub(super) async fn issue(&self, user_id: Uuid, secret: String) -> Uuid {
        let challenge_id = Uuid::new_v4();
        let mut challenges = self.challenges.lock().await;
        challenges.retain(|_, entry| entry.created_at.elapsed() < self.ttl);
        challenges.insert(
            challenge_id,
            PendingChallenge {
                user_id,
                secret,
                created_at: Instant::now(),
            },
        );
        challenge_id
    }

    /// Consume a login challenge. Expired or already-consumed ids yield `None`.
    pub(super) async fn take(&self, challenge_id: Uuid) -> Option<PendingChallenge> {
        let mut challenges = self.challenges.lock().await;
        challenges
            .remove(&challenge_id)
            .filter(|entry| entry.created_at.elapsed() < self.ttl)
    }

    /// Park a freshly generated secret until the user confirms the first code.
    /// A new `enroll/start` replaces any earlier pending secret for the user.
    pub(super) async fn park_enrollment(&self, user_id: Uuid, secret: String) {
        let mut enrollments = self.enrollments.lock().await;
        enrollments.retain(|_, entry| entry.created_at.elapsed() < self.ttl);
        enrollments.insert(
            user_id,
            PendingEnrollment {
                secret,
                created_at: Instant::now(),
            },
        );
    }

    /// Consume the pending enrollment secret for a user, if still valid.
    pub(super) async fn take_enrollment(&self, user_id: Uuid) -> Option<String> {
        let mut enrollments = self.enrollments.lock().await;
        enrollments
            .remove(&user_id)
            .filter(|entry| entry.created_at.elapsed() < self.ttl)
            .map(|entry| entry.secret)
    }
}
