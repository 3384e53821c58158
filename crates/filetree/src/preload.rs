// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Bounded, deduplicating queue of speculative loads.
//!
//! A load is identified by a caller-chosen id. While an id is queued or in
//! flight, further requests for it are ignored. At most `max_concurrent`
//! loads run at once; when more than `max_enqueued` are waiting, the oldest
//! waiting load is dropped. The outcome of a load is never inspected.
//!
//! Loads run as local tasks, so the preloader must be used from within a
//! `tokio::task::LocalSet`.

use std::cell::RefCell;
use std::collections::{BTreeSet, VecDeque};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::rc::Rc;

use diagnostics::*;
use futures::future::{FutureExt, LocalBoxFuture};
use tokio::sync::Notify;

use crate::config::PreloadConfig;
use crate::error::Result;

type Load = Box<dyn FnOnce() -> LocalBoxFuture<'static, ()>>;

#[derive(Clone)]
pub struct Preloader(Rc<RefCell<PreloadState>>);

struct PreloadState {
    config: PreloadConfig,
    queue: VecDeque<(String, Load)>,
    in_flight: BTreeSet<String>,
    idle: Rc<Notify>,
}

/// Frees the slot of a load whose task was cancelled, as happens when the
/// `LocalSet` is dropped. Nothing new is started from here.
struct SlotGuard {
    preloader: Preloader,
    id: String,
    settled: bool,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        if !self.settled {
            self.preloader.release(&self.id);
        }
    }
}

impl Preloader {
    pub fn new(config: PreloadConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self(Rc::new(RefCell::new(PreloadState {
            config,
            queue: VecDeque::new(),
            in_flight: BTreeSet::new(),
            idle: Rc::new(Notify::new()),
        }))))
    }

    #[must_use]
    pub fn config(&self) -> PreloadConfig {
        self.0.borrow().config
    }

    /// Requests a load. Returns false when `id` is already queued or running.
    pub fn preload<F, Fut>(&self, id: impl Into<String>, load: F) -> bool
    where
        F: FnOnce() -> Fut + 'static,
        Fut: Future + 'static,
    {
        let id = id.into();
        {
            let mut state = self.0.borrow_mut();
            if state.in_flight.contains(&id) || state.queue.iter().any(|(queued, _)| *queued == id) {
                debug!("preload '{id}' already pending", id: id);
                return false;
            }
            state
                .queue
                .push_back((id, Box::new(move || load().map(|_| ()).boxed_local())));
            if state.queue.len() > state.config.max_enqueued {
                if let Some((evicted, _)) = state.queue.pop_front() {
                    debug!("preload queue full, dropped '{evicted}'", evicted: evicted);
                }
            }
        }
        self.dequeue();
        true
    }

    /// Starts queued loads, oldest first, while slots are free
    fn dequeue(&self) {
        loop {
            let (id, load) = {
                let mut state = self.0.borrow_mut();
                if state.in_flight.len() >= state.config.max_concurrent {
                    return;
                }
                let Some((id, load)) = state.queue.pop_front() else {
                    return;
                };
                _ = state.in_flight.insert(id.clone());
                (id, load)
            };

            debug!("preload '{id}' started", id: id);
            let running = load();
            let mut guard = SlotGuard {
                preloader: self.clone(),
                id,
                settled: false,
            };
            _ = tokio::task::spawn_local(async move {
                // A panicking load settles like any other
                if AssertUnwindSafe(running).catch_unwind().await.is_err() {
                    let id = &guard.id;
                    warn!("preload '{id}' panicked", id: id);
                }
                guard.settled = true;
                let preloader = guard.preloader.clone();
                preloader.release(&guard.id);
                let id = &guard.id;
                debug!("preload '{id}' settled", id: id);
                preloader.dequeue();
            });
        }
    }

    /// Frees the slot held by `id` and wakes `idle` waiters once nothing
    /// is left to do
    fn release(&self, id: &str) {
        let idle = {
            let mut state = self.0.borrow_mut();
            _ = state.in_flight.remove(id);
            (state.queue.is_empty() && state.in_flight.is_empty()).then(|| state.idle.clone())
        };
        if let Some(idle) = idle {
            idle.notify_waiters();
        }
    }

    /// Resolves once nothing is queued or running
    pub async fn idle(&self) {
        loop {
            let notify = self.0.borrow().idle.clone();
            let notified = notify.notified();
            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }

    #[must_use]
    pub fn queued_count(&self) -> usize {
        self.0.borrow().queue.len()
    }

    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.0.borrow().in_flight.len()
    }

    /// Is `id` queued or running
    #[must_use]
    pub fn is_pending(&self, id: &str) -> bool {
        let state = self.0.borrow();
        state.in_flight.contains(id) || state.queue.iter().any(|(queued, _)| queued == id)
    }

    /// Ids waiting to start, oldest first
    #[must_use]
    pub fn queued_ids(&self) -> Vec<String> {
        self.0.borrow().queue.iter().map(|(id, _)| id.clone()).collect()
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        let state = self.0.borrow();
        state.queue.is_empty() && state.in_flight.is_empty()
    }
}

impl std::fmt::Debug for Preloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.0.borrow();
        f.debug_struct("Preloader")
            .field("config", &state.config)
            .field("queued", &state.queue.len())
            .field("in_flight", &state.in_flight)
            .finish()
    }
}
