use std::time::Duration;

use log::{debug, info, warn};

use crate::backoff::Backoff;
use crate::display::{render_text, Display, DisplaySlot, Layout};
use crate::elapsed::compute_elapsed;
use crate::event::ReferenceEvent;
use crate::format::format_with_commas;
use crate::time_source::{RefreshState, TimeSource};

/// Pause between screen updates.
pub const RENDER_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Init,
    Syncing,
    Ready,
}

/// Everything the render loop owns between iterations.
pub struct Clock<S, D> {
    source: S,
    display: D,
    event: ReferenceEvent,
    layout: Layout,
    slots: Vec<DisplaySlot>,
    refresh: RefreshState,
    backoff: Backoff,
    state: State,
}

impl<S: TimeSource, D: Display> Clock<S, D> {
    pub fn new(
        source: S,
        display: D,
        event: ReferenceEvent,
        layout: Layout,
        backoff: Backoff,
    ) -> Self {
        Self {
            source,
            display,
            event,
            layout,
            slots: layout.slots(),
            refresh: RefreshState::default(),
            backoff,
            state: State::Init,
        }
    }

    /// Run one loop iteration and return how long to wait before the next.
    pub async fn tick(&mut self) -> Duration {
        if self.state == State::Init {
            self.state = State::Syncing;
        }

        if self.state == State::Ready && self.refresh.resync_due(self.source.monotonic()) {
            self.state = State::Syncing;
        }

        if self.state == State::Syncing {
            info!("time sync, attempt: {}", self.backoff.attempt() + 1);
            match self.source.sync().await {
                Ok(()) => {
                    self.refresh.record(self.source.monotonic());
                    self.backoff.reset();
                    self.state = State::Ready;
                }
                Err(err) => {
                    let delay = self.backoff.next_delay();
                    warn!("time sync failed, error: {}, retry in: {:.2?}", err, delay);
                    return delay;
                }
            }
        }

        self.render();
        RENDER_INTERVAL
    }

    fn render(&mut self) {
        let now = self.source.local_now();
        info!("current time: {}", now);

        let breakdown = compute_elapsed(&now, &self.event);
        info!("elapsed: {}", breakdown);
        if self.layout == Layout::Extended {
            info!(
                "totals, days: {}, minutes: {}, seconds: {}",
                format_with_commas(breakdown.total_days),
                format_with_commas(breakdown.total_minutes),
                format_with_commas(breakdown.total_seconds)
            );
        }

        let mut text = render_text(&breakdown, self.layout);
        for slot in self.slots.iter_mut() {
            if let Some(t) = text.remove(&slot.field) {
                slot.text = t;
            }
        }

        for slot in self.slots.iter() {
            debug!("draw, slot: {}, text: {}", slot.field, slot.text);
            if let Err(err) = self.display.draw(slot) {
                warn!("draw failed, slot: {}, error: {}", slot.field, err);
                return;
            }
        }

        if let Err(err) = self.display.present() {
            warn!("present failed, error: {}", err);
        }
    }

    /// Loop forever. The only way out is to drop the future.
    pub async fn run(mut self) {
        loop {
            let delay = self.tick().await;
            tokio::time::sleep(delay).await;
        }
    }
}
