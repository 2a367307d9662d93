use uuid::Uuid;

use chrono::{DateTime, Utc};

use crate::domain::{CityName, EmailAddress, Frequency, SubscriptionToken};

/// New Subscription request, validated by the caller
#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub email: EmailAddress,
    pub city: CityName,
    pub frequency: Frequency,
}

/// Stored Subscription record
#[derive(Debug, Clone, PartialEq)]
pub struct Subscription {
    /// ID of the subscription
    pub id: Uuid,
    /// Identity pair, unique among live subscriptions
    pub email: String,
    pub city: String,
    pub frequency: Frequency,
    /// Only confirmed subscriptions receive weather updates
    pub confirmed: bool,
    pub token: SubscriptionToken,
    /// `None` until the first update is sent
    pub last_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Subscription {
    /// Build a fresh, unconfirmed subscription with a newly generated token
    pub fn new(new_subscription: NewSubscription) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: new_subscription.email.as_ref().to_string(),
            city: new_subscription.city.as_ref().to_string(),
            frequency: new_subscription.frequency,
            confirmed: false,
            token: SubscriptionToken::generate(),
            last_sent_at: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    pub fn confirm(&mut self, now: DateTime<Utc>) {
        self.confirmed = true;
        self.updated_at = Some(now);
    }

    pub fn mark_sent(&mut self, now: DateTime<Utc>) {
        self.last_sent_at = Some(now);
        self.updated_at = Some(now);
    }

    /// Whether an update is due at `now`.
    ///
    /// Mirrors the set query run by the Postgres store: confirmed, and either never
    /// sent or sent strictly longer ago than the frequency interval.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if !self.confirmed {
            return false;
        }
        match self.last_sent_at {
            None => true,
            Some(last_sent_at) => last_sent_at < now - self.frequency.interval(),
        }
    }
}
