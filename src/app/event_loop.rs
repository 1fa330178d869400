use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

use crate::app::{Activator, Effect, Page, PageEvent, ReadyState, SessionReport, update};

impl Activator {
    /// Drive `page` from `events` until `Close` or the channel closes.
    ///
    /// A page that is no longer loading is activated before the first event
    /// is read. Render passes never overlap: each one completes before the
    /// next event is taken, and toggle clicks already queued when a pass
    /// starts are folded into it.
    pub async fn run(
        &self,
        page: &mut Page,
        events: &mut mpsc::Receiver<PageEvent>,
    ) -> SessionReport {
        let _run_scope = crate::perf::scope("app.run.total");
        let mut session = SessionReport::default();

        if page.ready_state != ReadyState::Loading && !page.activated {
            session.activation = Some(self.on_ready(page).await);
        }

        while let Some(event) = events.recv().await {
            match update(page, event) {
                Effect::None => {}
                Effect::Activate => session.activation = Some(self.on_ready(page).await),
                Effect::Rerender => {
                    let (coalesced, stop) = drain_queued(page, events);
                    session.coalesced += coalesced;
                    let outcome = self.on_theme_toggle(page).await;
                    tracing::debug!(?outcome, coalesced, "theme re-render finished");
                    session.rerenders += 1;
                    if stop {
                        break;
                    }
                }
                Effect::Stop => break,
            }
        }
        session
    }
}

/// Apply every event already queued, counting the toggle clicks among them.
///
/// Returns the click count and whether a `Close` was seen.
fn drain_queued(page: &mut Page, events: &mut mpsc::Receiver<PageEvent>) -> (usize, bool) {
    let mut coalesced = 0;
    loop {
        match events.try_recv() {
            Ok(event) => match update(page, event) {
                Effect::Rerender => coalesced += 1,
                Effect::Stop => return (coalesced, true),
                Effect::None | Effect::Activate => {}
            },
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => return (coalesced, false),
        }
    }
}
