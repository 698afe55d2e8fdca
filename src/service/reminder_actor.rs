use crate::config::ReminderConfig;
use crate::db::CrmStorage;
use crate::error::CrmError;

use chrono::Utc;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Messages handled by the follow-up reminder actor.
#[derive(Debug)]
pub enum ReminderMessage {
    /// Periodic scan; fired by the actor's own ticker.
    Tick,
    /// Scan now and reply with the number of reminders fired.
    ScanNow(RpcReplyPort<Result<usize, String>>),
}

/// Handle for interacting with the reminder actor.
#[derive(Clone)]
pub struct ReminderHandle {
    actor: ActorRef<ReminderMessage>,
}

impl ReminderHandle {
    /// Run a scan immediately and return how many follow-ups were reminded.
    pub async fn scan_now(&self) -> Result<usize, CrmError> {
        ractor::call!(self.actor, ReminderMessage::ScanNow)
            .map_err(|e| CrmError::RactorError(format!("ScanNow RPC failed: {e}")))?
            .map_err(CrmError::RactorError)
    }

    pub fn stop(&self) {
        self.actor.stop(None);
    }
}

struct ReminderActorState {
    storage: CrmStorage,
    ticker: Option<JoinHandle<()>>,
}

struct ReminderActor;

#[ractor::async_trait]
impl Actor for ReminderActor {
    type Msg = ReminderMessage;
    type State = ReminderActorState;
    type Arguments = (CrmStorage, ReminderConfig);

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let (storage, cfg) = args;
        let ticker = if cfg.enabled {
            let period = Duration::from_secs(cfg.scan_interval_secs.max(1));
            info!(
                "ReminderActor started, scanning follow-ups every {} secs",
                period.as_secs()
            );
            let me = myself.clone();
            Some(tokio::spawn(async move {
                let mut interval = tokio::time::interval(period);
                interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                loop {
                    interval.tick().await;
                    if ractor::cast!(me, ReminderMessage::Tick).is_err() {
                        break;
                    }
                }
            }))
        } else {
            info!("ReminderActor started with periodic scans disabled");
            None
        };

        Ok(ReminderActorState { storage, ticker })
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        if let Some(ticker) = state.ticker.take() {
            ticker.abort();
        }
        Ok(())
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            ReminderMessage::Tick => {
                if let Err(e) = self.scan(state).await {
                    warn!("Reminder scan failed: {}", e);
                }
            }
            ReminderMessage::ScanNow(rp) => {
                let res = self.scan(state).await.map_err(|e| e.to_string());
                let _ = rp.send(res);
            }
        }
        Ok(())
    }
}

impl ReminderActor {
    async fn scan(&self, state: &mut ReminderActorState) -> Result<usize, CrmError> {
        let now = Utc::now();
        let due = state.storage.due_unreminded_follow_ups(now).await?;
        if due.is_empty() {
            debug!("No follow-ups due for reminder");
            return Ok(0);
        }

        let mut fired = 0;
        for follow_up in &due {
            if state.storage.mark_follow_up_reminded(follow_up, now).await? {
                fired += 1;
                info!(
                    follow_up_id = follow_up.id,
                    client_id = follow_up.client_id,
                    client = %follow_up.client_name,
                    due_at = %follow_up.due_at,
                    "follow-up due: {}",
                    follow_up.subject
                );
            }
        }
        Ok(fired)
    }
}

/// Async spawn of the reminder actor and return a handle.
pub async fn spawn(storage: CrmStorage, cfg: ReminderConfig) -> Result<ReminderHandle, CrmError> {
    let (actor, _jh) = Actor::spawn(None, ReminderActor, (storage, cfg))
        .await
        .map_err(|e| CrmError::RactorError(format!("failed to spawn ReminderActor: {e}")))?;
    Ok(ReminderHandle { actor })
}
