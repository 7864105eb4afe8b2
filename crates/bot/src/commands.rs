use advisor_core::delivery::telegram::TelegramClient;
use advisor_core::pipeline::{Pipeline, COMMAND_TIMEOUT};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(5);

const TEXT_STARTING: &str = "🔄 Запускаю анализ вашего портфеля...";
const TEXT_STATUS: &str = "✅ Бот работает. Ежедневный отчёт приходит автоматически.";
const TEXT_UNKNOWN: &str = "Неизвестная команда. Используйте /help для списка доступных команд.";
const TEXT_HELP: &str = "*Доступные команды:*\n\
/analyze - запустить анализ портфеля сейчас\n\
/status - проверить, что бот работает\n\
/help - показать это сообщение";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Analyze,
    Status,
    Help,
}

impl Command {
    /// Recognizes the leading `/command` token, tolerating the `@botname`
    /// suffix Telegram appends in group chats.
    fn lookup(text: &str) -> Option<Self> {
        let token = text.split_whitespace().next()?;
        let token = token.strip_prefix('/')?;
        let name = token.split('@').next().unwrap_or(token);
        match name {
            "analyze" => Some(Self::Analyze),
            "status" => Some(Self::Status),
            "help" => Some(Self::Help),
            _ => None,
        }
    }
}

/// Long-polls Telegram for commands until shutdown is signalled. Only the
/// configured chat is served; anything else is ignored without a reply.
pub async fn listen(
    telegram: Arc<TelegramClient>,
    pipeline: Arc<Pipeline>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut offset: i64 = 0;

    loop {
        let updates = tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    tracing::info!("command listener stopping");
                    return;
                }
                continue;
            }
            res = telegram.get_updates(offset) => res,
        };

        let updates = match updates {
            Ok(updates) => updates,
            Err(err) => {
                tracing::warn!(error = %err, "getUpdates failed; backing off");
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            return;
                        }
                    }
                    () = tokio::time::sleep(POLL_ERROR_BACKOFF) => {}
                }
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);

            let Some(message) = update.message else {
                continue;
            };
            if message.chat.id.to_string() != telegram.chat_id() {
                tracing::debug!(chat_id = message.chat.id, "ignoring message from unknown chat");
                continue;
            }
            let Some(command) = message.text.as_deref().and_then(Command::lookup) else {
                if message.text.is_some() {
                    reply(&telegram, TEXT_UNKNOWN, false).await;
                }
                continue;
            };

            tracing::info!(?command, "command received");
            match command {
                Command::Analyze => handle_analyze(&telegram, &pipeline).await,
                Command::Status => reply(&telegram, TEXT_STATUS, false).await,
                Command::Help => reply(&telegram, TEXT_HELP, true).await,
            }
        }
    }
}

/// Acknowledges immediately, then runs the analysis off the poll loop so a
/// slow run never stalls command handling.
async fn handle_analyze(telegram: &Arc<TelegramClient>, pipeline: &Arc<Pipeline>) {
    reply(telegram, TEXT_STARTING, false).await;

    let telegram = Arc::clone(telegram);
    let pipeline = Arc::clone(pipeline);
    tokio::spawn(async move {
        if let Err(err) = pipeline.run_with_deadline(false, COMMAND_TIMEOUT).await {
            tracing::error!(error = %format!("{err:#}"), "manual analysis failed");
            reply(
                &telegram,
                &format!("Ошибка при анализе портфеля: {err:#}"),
                false,
            )
            .await;
        }
    });
}

async fn reply(telegram: &TelegramClient, text: &str, markdown: bool) {
    if let Err(err) = telegram.send_message(text, markdown).await {
        tracing::warn!(error = %err, "failed to send reply");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_known_commands() {
        assert_eq!(Command::lookup("/analyze"), Some(Command::Analyze));
        assert_eq!(Command::lookup("/status"), Some(Command::Status));
        assert_eq!(Command::lookup("/help"), Some(Command::Help));
    }

    #[test]
    fn tolerates_bot_suffix_and_arguments() {
        assert_eq!(
            Command::lookup("/analyze@invest_advisor_bot"),
            Some(Command::Analyze)
        );
        assert_eq!(Command::lookup("/analyze now please"), Some(Command::Analyze));
        assert_eq!(Command::lookup("  /status  "), Some(Command::Status));
    }

    #[test]
    fn rejects_non_commands() {
        assert_eq!(Command::lookup("analyze"), None);
        assert_eq!(Command::lookup("/unknown"), None);
        assert_eq!(Command::lookup(""), None);
        assert_eq!(Command::lookup("hello there"), None);
    }
}
