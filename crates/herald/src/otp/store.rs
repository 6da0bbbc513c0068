//! In-memory challenge store.
//!
//! One entry per contact. The map sits behind a single mutex, so `put` and
//! `consume` on the same contact never interleave. Expired entries are
//! removed when a verification touches them, or by [`OtpStore::sweep_expired`].

use chrono::Duration;
use herald_common::{Challenge, DeliveryMethod, OtpError, mask_contact};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use subtle::ConstantTimeEq;

use crate::clock::Clock;

/// Contact-keyed challenge store
pub struct OtpStore {
    challenges: Mutex<HashMap<String, Challenge>>,
    clock: Arc<dyn Clock>,
}

impl OtpStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            challenges: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Insert or replace the challenge for `contact`
    ///
    /// Any unconsumed challenge for the same contact is superseded.
    pub fn put(
        &self,
        contact: &str,
        code: &str,
        method: DeliveryMethod,
        ttl: Duration,
    ) -> Challenge {
        let now = self.clock.now();
        let challenge = Challenge {
            contact: contact.to_string(),
            code: code.to_string(),
            method,
            expires_at: now + ttl,
        };

        let replaced = self
            .lock()
            .insert(contact.to_string(), challenge.clone())
            .is_some();

        tracing::debug!(
            contact = %mask_contact(contact),
            method = %method,
            expires_at = %challenge.expires_at,
            replaced,
            "Challenge stored"
        );

        challenge
    }

    /// Check `supplied` against the stored code, consuming it on a match
    pub fn consume(&self, contact: &str, supplied: &str) -> Result<(), OtpError> {
        let now = self.clock.now();
        let mut challenges = self.lock();

        let challenge = challenges.get(contact).ok_or(OtpError::NotFound)?;

        if challenge.is_expired_at(now) {
            challenges.remove(contact);
            tracing::debug!(contact = %mask_contact(contact), "Expired challenge reaped");
            return Err(OtpError::Expired);
        }

        let matches: bool = challenge.code.as_bytes().ct_eq(supplied.as_bytes()).into();
        if !matches {
            return Err(OtpError::Mismatch);
        }

        challenges.remove(contact);
        Ok(())
    }

    /// Drop every expired challenge, returning how many went
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut challenges = self.lock();
        let before = challenges.len();
        challenges.retain(|_, c| !c.is_expired_at(now));
        before - challenges.len()
    }

    /// Number of stored challenges, expired ones included until reaped
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Challenge>> {
        // A panic mid-operation cannot leave a half-written entry behind, so
        // the map is still usable after poisoning.
        self.challenges.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
