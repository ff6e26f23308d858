//! Threshold-confirmation notifications.
//!
//! When a join pushes a game or event across its attendance threshold, every
//! respondent with an email on file gets a confirmation message. Sending is
//! best-effort: failures are logged and never retried or surfaced to the
//! request that triggered them.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use futures::future::join_all;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::EmailConfig;
use crate::db::{
    EventRepository, EventTypeRepository, GameRepository, ParticipantRepository, PlayerRepository,
    SportRepository,
};
use crate::error::{AppError, AppResult};

/// What the confirmation message describes.
#[derive(Debug, Clone)]
pub struct ConfirmationNotice {
    /// Sport or event type name.
    pub kind_name: String,
    pub title: String,
    pub location: String,
    pub date: NaiveDateTime,
}

#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn send_confirmation(
        &self,
        to_name: &str,
        to_email: &str,
        notice: &ConfirmationNotice,
    ) -> AppResult<()>;
}

/// Keep only respondents that left a non-empty email address.
pub fn recipients_with_email(
    respondents: impl IntoIterator<Item = (String, Option<String>)>,
) -> Vec<(String, String)> {
    respondents
        .into_iter()
        .filter_map(|(name, email)| match email {
            Some(email) if !email.trim().is_empty() => Some((name, email)),
            _ => None,
        })
        .collect()
}

/// Send the confirmation to every recipient, logging individual failures.
/// Returns the number of successful sends.
pub async fn send_batch(
    notifier: &dyn Notifier,
    recipients: &[(String, String)],
    notice: &ConfirmationNotice,
) -> usize {
    let sends = recipients
        .iter()
        .map(|(name, email)| notifier.send_confirmation(name, email, notice));

    let mut sent = 0;
    for (result, (_, email)) in join_all(sends).await.into_iter().zip(recipients) {
        match result {
            Ok(()) => sent += 1,
            Err(e) => tracing::warn!("Failed to send confirmation to {email}: {e}"),
        }
    }
    sent
}

// ============================================================================
// Confirmation entry points
// ============================================================================

/// Email every game respondent with an address on file. Spawned off the join
/// request that crossed the threshold; any failure here only gets logged.
pub async fn game_confirmed(state: &crate::AppState, game_id: i64) {
    let Some(notifier) = state.notifier.as_deref() else {
        tracing::debug!("No notifier configured; skipping game confirmation");
        return;
    };
    if let Err(e) = confirm_game(state, notifier, game_id).await {
        tracing::warn!("Game {game_id} confirmation failed: {e}");
    }
}

pub async fn event_confirmed(state: &crate::AppState, event_id: i64) {
    let Some(notifier) = state.notifier.as_deref() else {
        tracing::debug!("No notifier configured; skipping event confirmation");
        return;
    };
    if let Err(e) = confirm_event(state, notifier, event_id).await {
        tracing::warn!("Event {event_id} confirmation failed: {e}");
    }
}

async fn confirm_game(
    state: &crate::AppState,
    notifier: &dyn Notifier,
    game_id: i64,
) -> AppResult<()> {
    let game = GameRepository::find_by_id(&state.db, game_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Game not found".to_string()))?;
    let kind_name = SportRepository::find_by_id(&state.db, game.sport_id)
        .await?
        .map(|s| s.name)
        .unwrap_or_else(|| "Game".to_string());

    let players = PlayerRepository::list_for_game(&state.db, game_id).await?;
    let recipients =
        recipients_with_email(players.into_iter().map(|p| (p.name, p.email)));

    let notice = ConfirmationNotice {
        kind_name,
        title: game.title,
        location: game.location,
        date: game.date,
    };

    let sent = send_batch(notifier, &recipients, &notice).await;
    tracing::info!(
        "Game {game_id} reached its threshold; sent {sent}/{} confirmations",
        recipients.len()
    );
    Ok(())
}

async fn confirm_event(
    state: &crate::AppState,
    notifier: &dyn Notifier,
    event_id: i64,
) -> AppResult<()> {
    let event = EventRepository::find_by_id(&state.db, event_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
    let kind_name = EventTypeRepository::find_by_id(&state.db, event.event_type_id)
        .await?
        .map(|t| t.name)
        .unwrap_or_else(|| "Event".to_string());

    let participants = ParticipantRepository::list_for_event(&state.db, event_id).await?;
    let recipients =
        recipients_with_email(participants.into_iter().map(|p| (p.name, p.email)));

    let notice = ConfirmationNotice {
        kind_name,
        title: event.title,
        location: event.location,
        date: event.date,
    };

    let sent = send_batch(notifier, &recipients, &notice).await;
    tracing::info!(
        "Event {event_id} reached its threshold; sent {sent}/{} confirmations",
        recipients.len()
    );
    Ok(())
}

// ============================================================================
// SMTP notifier
// ============================================================================

pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    /// Build the notifier from SMTP settings. Returns `Ok(None)` when no
    /// credentials are configured, which disables email confirmations.
    pub fn from_config(config: &EmailConfig) -> AppResult<Option<Self>> {
        let (Some(username), Some(password)) = (&config.username, &config.password) else {
            tracing::warn!("SMTP credentials not set; confirmation emails disabled");
            return Ok(None);
        };

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| AppError::Mail(format!("Invalid SMTP relay: {e}")))?
            .port(config.smtp_port)
            .credentials(Credentials::new(username.clone(), password.clone()))
            .build();

        let from_address = config.from_address.as_ref().unwrap_or(username);
        let from = from_address
            .parse::<Mailbox>()
            .map_err(|e| AppError::Mail(format!("Invalid from address: {e}")))?;

        Ok(Some(Self { transport, from }))
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send_confirmation(
        &self,
        to_name: &str,
        to_email: &str,
        notice: &ConfirmationNotice,
    ) -> AppResult<()> {
        let to = format!("{to_name} <{to_email}>")
            .parse::<Mailbox>()
            .or_else(|_| to_email.parse::<Mailbox>())
            .map_err(|e| AppError::Mail(format!("Invalid recipient address: {e}")))?;

        let body = format!(
            "<h2>Great news, {to_name}!</h2>\
             <p>The game you joined has reached its minimum attendance and is confirmed to happen!</p>\
             <ul>\
             <li><strong>What:</strong> {kind}</li>\
             <li><strong>Title:</strong> {title}</li>\
             <li><strong>Location:</strong> {location}</li>\
             <li><strong>Date:</strong> {date} UTC</li>\
             </ul>\
             <p>See you there!</p>",
            kind = notice.kind_name,
            title = notice.title,
            location = notice.location,
            date = notice.date.format("%Y-%m-%d %H:%M"),
        );

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(format!("Game On! {} has enough players!", notice.title))
            .header(ContentType::TEXT_HTML)
            .body(body)
            .map_err(|e| AppError::Mail(format!("Failed to build message: {e}")))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::Mail(format!("SMTP send failed: {e}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn recipients_require_nonempty_email() {
        let recipients = recipients_with_email(vec![
            ("Alice".to_string(), Some("alice@example.com".to_string())),
            ("Bob".to_string(), None),
            ("Carol".to_string(), Some("  ".to_string())),
            ("Dave".to_string(), Some("dave@example.com".to_string())),
        ]);
        let emails: Vec<&str> = recipients.iter().map(|(_, e)| e.as_str()).collect();
        assert_eq!(emails, vec!["alice@example.com", "dave@example.com"]);
    }

    struct RecordingNotifier {
        sent: Mutex<Vec<String>>,
        fail_for: Option<String>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send_confirmation(
            &self,
            _to_name: &str,
            to_email: &str,
            _notice: &ConfirmationNotice,
        ) -> AppResult<()> {
            if self.fail_for.as_deref() == Some(to_email) {
                return Err(AppError::Mail("boom".to_string()));
            }
            self.sent.lock().unwrap().push(to_email.to_string());
            Ok(())
        }
    }

    fn notice() -> ConfirmationNotice {
        ConfirmationNotice {
            kind_name: "Soccer".to_string(),
            title: "Sunday kickabout".to_string(),
            location: "Volunteer Park".to_string(),
            date: chrono::NaiveDate::from_ymd_opt(2025, 6, 1)
                .unwrap()
                .and_hms_opt(15, 0, 0)
                .unwrap(),
        }
    }

    #[tokio::test]
    async fn batch_sends_to_every_recipient() {
        let notifier = RecordingNotifier {
            sent: Mutex::new(Vec::new()),
            fail_for: None,
        };
        let recipients = vec![
            ("Alice".to_string(), "alice@example.com".to_string()),
            ("Bob".to_string(), "bob@example.com".to_string()),
        ];

        let sent = send_batch(&notifier, &recipients, &notice()).await;
        assert_eq!(sent, 2);
        assert_eq!(
            *notifier.sent.lock().unwrap(),
            vec!["alice@example.com", "bob@example.com"]
        );
    }

    #[tokio::test]
    async fn one_failed_send_does_not_stop_the_batch() {
        let notifier = RecordingNotifier {
            sent: Mutex::new(Vec::new()),
            fail_for: Some("bob@example.com".to_string()),
        };
        let recipients = vec![
            ("Alice".to_string(), "alice@example.com".to_string()),
            ("Bob".to_string(), "bob@example.com".to_string()),
            ("Carol".to_string(), "carol@example.com".to_string()),
        ];

        let sent = send_batch(&notifier, &recipients, &notice()).await;
        assert_eq!(sent, 2);
        assert_eq!(
            *notifier.sent.lock().unwrap(),
            vec!["alice@example.com", "carol@example.com"]
        );
    }

    #[tokio::test]
    async fn confirmation_goes_to_every_respondent_with_an_email() {
        use std::sync::Arc;

        use crate::db::{NewGame, NewPlayer};
        use crate::test_utils::test_state_with_notifier;

        let recorder = Arc::new(RecordingNotifier {
            sent: Mutex::new(Vec::new()),
            fail_for: None,
        });
        let state = test_state_with_notifier(Some(recorder.clone())).await;

        SportRepository::seed_defaults(&state.db).await.unwrap();
        let game = GameRepository::create(
            &state.db,
            NewGame {
                sport_id: 1,
                title: "Sunday kickabout".to_string(),
                location: "Volunteer Park".to_string(),
                date: chrono::Utc::now().naive_utc(),
                timezone: None,
                player_threshold: 2,
                creator_id: "creator-1".to_string(),
                creator_name: "Sam".to_string(),
            },
        )
        .await
        .unwrap();

        for (name, email) in [
            ("Alice", Some("alice@example.com")),
            ("Bob", None),
            ("Carol", Some("carol@example.com")),
        ] {
            PlayerRepository::join(
                &state.db,
                NewPlayer {
                    game_id: game.id,
                    name: name.to_string(),
                    email: email.map(str::to_string),
                    likelihood: 1.0,
                    comment: None,
                    response_token: format!("token-{name}"),
                },
            )
            .await
            .unwrap();
        }

        game_confirmed(&state, game.id).await;

        assert_eq!(
            *recorder.sent.lock().unwrap(),
            vec!["alice@example.com", "carol@example.com"]
        );
    }
}
