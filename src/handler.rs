use tracing::{error, info, warn};

use crate::common::errors::Error;
use crate::common::{Invite, NotificationPayload};
use crate::push::PushGateway;
use crate::store::UserStore;

/// Terminal branch of one invite dispatch. Every branch completes the
/// invocation; none is retried here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A referenced user record was not found; nothing was sent.
    SkippedMissingUser { user_id: String },
    /// The invitee has no registered device token; nothing was sent.
    SkippedNoToken,
    /// The gateway accepted the payload for the invitee's device.
    Delivered,
    /// The gateway reported a per-token failure; logged, not retried.
    DeliveryFailed,
}

pub struct InviteNotifier<S, G> {
    users: S,
    gateway: G,
}

impl<S, G> InviteNotifier<S, G>
where
    S: UserStore,
    G: PushGateway,
{
    pub fn new(users: S, gateway: G) -> Self {
        Self { users, gateway }
    }

    /// Runs the dispatch workflow for one newly created invite record.
    ///
    /// Infrastructure faults propagate to the caller; every domain-level
    /// dead end (missing record, missing token, rejected token) resolves
    /// to an outcome.
    pub async fn handle_invite_created(
        &self,
        invite: &Invite,
        invite_id: &str,
    ) -> Result<DispatchOutcome, Error> {
        info!("Fetching user records for invite {}", invite_id);
        let (invitee, inviter) = tokio::try_join!(
            self.users.fetch_user(&invite.to_user_id),
            self.users.fetch_user(&invite.from_user_id),
        )?;

        // Invitee is checked first: with both records gone, this is the
        // outcome that gets observed.
        let invitee = match invitee {
            Some(user) => user,
            None => {
                error!("No user record for invitee {}", invite.to_user_id);
                return Ok(DispatchOutcome::SkippedMissingUser {
                    user_id: invite.to_user_id.clone(),
                });
            }
        };

        let inviter = match inviter {
            Some(user) => user,
            None => {
                error!("No user record for inviter {}", invite.from_user_id);
                return Ok(DispatchOutcome::SkippedMissingUser {
                    user_id: invite.from_user_id.clone(),
                });
            }
        };

        let token = match invitee.device_token() {
            Some(token) => token,
            None => {
                warn!(
                    "Invitee {} has no registered device, skipping invite {}",
                    invite.to_user_id, invite_id
                );
                return Ok(DispatchOutcome::SkippedNoToken);
            }
        };

        let payload = NotificationPayload::duo_challenge_invite(inviter.preferred_name(), invite_id);

        info!(
            "Dispatching invite {} to invitee {}",
            invite_id, invite.to_user_id
        );
        let report = self.gateway.send_to_device(token, &payload).await?;

        if report.failure_count > 0 {
            error!(
                "Gateway rejected invite {}: {}",
                invite_id,
                report.first_error().unwrap_or("unknown error")
            );
            return Ok(DispatchOutcome::DeliveryFailed);
        }

        info!(
            "Invite {} delivered to invitee {}",
            invite_id, invite.to_user_id
        );
        Ok(DispatchOutcome::Delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::UserProfile;
    use crate::push::{DeliveryReport, DeliveryResult};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    struct FakeUsers(HashMap<String, UserProfile>);

    #[async_trait]
    impl UserStore for FakeUsers {
        async fn fetch_user(&self, user_id: &str) -> Result<Option<UserProfile>, Error> {
            Ok(self.0.get(user_id).cloned())
        }
    }

    struct FailingUsers;

    #[async_trait]
    impl UserStore for FailingUsers {
        async fn fetch_user(&self, user_id: &str) -> Result<Option<UserProfile>, Error> {
            Err(Error::Store {
                user_id: user_id.into(),
                source: "connection reset".into(),
            })
        }
    }

    #[derive(Clone, Default)]
    struct RecordingGateway {
        report: DeliveryReport,
        sends: Arc<Mutex<Vec<(String, NotificationPayload)>>>,
    }

    #[async_trait]
    impl PushGateway for RecordingGateway {
        async fn send_to_device(
            &self,
            token: &str,
            payload: &NotificationPayload,
        ) -> Result<DeliveryReport, Error> {
            self.sends
                .lock()
                .unwrap()
                .push((token.to_string(), payload.clone()));
            Ok(self.report.clone())
        }
    }

    fn user(token: Option<&str>, username: Option<&str>, display_name: Option<&str>) -> UserProfile {
        UserProfile {
            fcm_token: token.map(Into::into),
            username: username.map(Into::into),
            display_name: display_name.map(Into::into),
        }
    }

    fn invite(from: &str, to: &str) -> Invite {
        Invite {
            from_user_id: from.into(),
            to_user_id: to.into(),
        }
    }

    fn users(entries: Vec<(&str, UserProfile)>) -> FakeUsers {
        FakeUsers(
            entries
                .into_iter()
                .map(|(id, profile)| (id.to_string(), profile))
                .collect(),
        )
    }

    #[tokio::test]
    async fn skips_invitee_without_device_token() {
        let store = users(vec![
            ("u1", user(None, Some("Alice"), None)),
            ("u2", user(None, None, None)),
        ]);
        let gateway = RecordingGateway::default();
        let notifier = InviteNotifier::new(store, gateway.clone());

        let outcome = notifier
            .handle_invite_created(&invite("u1", "u2"), "inv1")
            .await
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::SkippedNoToken);
        assert!(gateway.sends.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn skips_unknown_invitee() {
        let store = users(vec![("u1", user(None, Some("Alice"), None))]);
        let gateway = RecordingGateway::default();
        let notifier = InviteNotifier::new(store, gateway.clone());

        let outcome = notifier
            .handle_invite_created(&invite("u1", "ghost"), "inv1")
            .await
            .unwrap();

        assert_eq!(
            outcome,
            DispatchOutcome::SkippedMissingUser {
                user_id: "ghost".into()
            }
        );
        assert!(gateway.sends.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn skips_unknown_inviter() {
        let store = users(vec![("u2", user(Some("tok123"), None, None))]);
        let gateway = RecordingGateway::default();
        let notifier = InviteNotifier::new(store, gateway.clone());

        let outcome = notifier
            .handle_invite_created(&invite("ghost", "u2"), "inv1")
            .await
            .unwrap();

        assert_eq!(
            outcome,
            DispatchOutcome::SkippedMissingUser {
                user_id: "ghost".into()
            }
        );
        assert!(gateway.sends.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_invitee_wins_when_both_records_are_missing() {
        let store = users(vec![]);
        let notifier = InviteNotifier::new(store, RecordingGateway::default());

        let outcome = notifier
            .handle_invite_created(&invite("gone1", "gone2"), "inv1")
            .await
            .unwrap();

        assert_eq!(
            outcome,
            DispatchOutcome::SkippedMissingUser {
                user_id: "gone2".into()
            }
        );
    }

    #[tokio::test]
    async fn dispatches_payload_to_invitee_token() {
        let store = users(vec![
            ("u1", user(None, Some("Alice"), None)),
            ("u2", user(Some("tok123"), None, None)),
        ]);
        let gateway = RecordingGateway::default();
        let notifier = InviteNotifier::new(store, gateway.clone());

        let outcome = notifier
            .handle_invite_created(&invite("u1", "u2"), "inv42")
            .await
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::Delivered);

        let sends = gateway.sends.lock().unwrap();
        let (token, payload) = sends.first().expect("one dispatch");
        assert_eq!(token, "tok123");
        assert_eq!(
            payload.notification.body,
            "Alice is inviting you to a Duo Challenge!"
        );
        assert_eq!(payload.data.kind, "duo_challenge_invite");
        assert_eq!(payload.data.inviter_username, "Alice");
        assert_eq!(payload.data.invite_id, "inv42");
        assert_eq!(sends.len(), 1);
    }

    #[tokio::test]
    async fn falls_back_to_display_name_then_placeholder() {
        let store = users(vec![
            ("u1", user(None, None, Some("Al"))),
            ("u2", user(Some("tok123"), None, None)),
        ]);
        let gateway = RecordingGateway::default();
        let notifier = InviteNotifier::new(store, gateway.clone());

        notifier
            .handle_invite_created(&invite("u1", "u2"), "inv1")
            .await
            .unwrap();

        assert_eq!(gateway.sends.lock().unwrap()[0].1.data.inviter_username, "Al");

        let store = users(vec![
            ("u1", user(None, Some(""), None)),
            ("u2", user(Some("tok123"), None, None)),
        ]);
        let gateway = RecordingGateway::default();
        let notifier = InviteNotifier::new(store, gateway.clone());

        notifier
            .handle_invite_created(&invite("u1", "u2"), "inv1")
            .await
            .unwrap();

        assert_eq!(
            gateway.sends.lock().unwrap()[0].1.data.inviter_username,
            "Someone"
        );
    }

    #[tokio::test]
    async fn gateway_failure_is_logged_not_raised() {
        let store = users(vec![
            ("u1", user(None, Some("Alice"), None)),
            ("u2", user(Some("tok123"), None, None)),
        ]);
        let gateway = RecordingGateway {
            report: DeliveryReport {
                failure_count: 1,
                results: vec![DeliveryResult {
                    message_id: None,
                    error: Some("NotRegistered".into()),
                }],
            },
            ..Default::default()
        };
        let notifier = InviteNotifier::new(store, gateway.clone());

        let outcome = notifier
            .handle_invite_created(&invite("u1", "u2"), "inv1")
            .await
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::DeliveryFailed);
        assert_eq!(gateway.sends.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn store_fault_propagates() {
        let notifier = InviteNotifier::new(FailingUsers, RecordingGateway::default());

        let err = notifier
            .handle_invite_created(&invite("u1", "u2"), "inv1")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Store { .. }));
    }
}
