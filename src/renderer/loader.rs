// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Zukai-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Zukai and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Memoized, retryable loading of the rendering library.
//!
//! The first caller starts the load; callers arriving while it is pending await the same shared
//! future, so the library is never loaded twice concurrently. Success is cached for the lifetime
//! of the loader. Failure is delivered to every waiter of that attempt and clears the slot, so the
//! next call starts a fresh attempt.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to load rendering library: {message}")]
pub struct LoadError {
    message: String,
}

impl LoadError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Something that can produce a ready-to-use library instance.
#[async_trait]
pub trait LibrarySource: Send + Sync + 'static {
    type Library: Send + Sync + 'static;

    async fn load(&self) -> Result<Self::Library, LoadError>;
}

type SharedLoad<L> = Shared<BoxFuture<'static, Result<Arc<L>, LoadError>>>;

enum Slot<L> {
    Empty,
    Pending(SharedLoad<L>),
    Loaded(Arc<L>),
}

pub struct LibraryLoader<S: LibrarySource> {
    source: Arc<S>,
    slot: Mutex<Slot<S::Library>>,
    attempts: AtomicUsize,
}

impl<S: LibrarySource> LibraryLoader<S> {
    pub fn new(source: S) -> Self {
        Self {
            source: Arc::new(source),
            slot: Mutex::new(Slot::Empty),
            attempts: AtomicUsize::new(0),
        }
    }

    fn lock_slot(&self) -> MutexGuard<'_, Slot<S::Library>> {
        self.slot.lock().unwrap_or_else(|err| err.into_inner())
    }

    pub fn is_loaded(&self) -> bool {
        matches!(*self.lock_slot(), Slot::Loaded(_))
    }

    /// Number of load attempts started so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Returns the loaded library, loading it first if needed.
    pub async fn get(&self) -> Result<Arc<S::Library>, LoadError> {
        let pending = {
            let mut slot = self.lock_slot();
            match &*slot {
                Slot::Loaded(library) => return Ok(library.clone()),
                Slot::Pending(pending) => pending.clone(),
                Slot::Empty => {
                    let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
                    tracing::debug!(attempt, "loading rendering library");
                    let source = self.source.clone();
                    let pending = async move { source.load().await.map(Arc::new) }
                        .boxed()
                        .shared();
                    *slot = Slot::Pending(pending.clone());
                    pending
                }
            }
        };

        let result = pending.clone().await;

        let mut slot = self.lock_slot();
        let still_current = matches!(&*slot, Slot::Pending(current) if current.ptr_eq(&pending));
        if still_current {
            match &result {
                Ok(library) => {
                    tracing::info!("rendering library loaded");
                    *slot = Slot::Loaded(library.clone());
                }
                Err(err) => {
                    tracing::warn!(error = %err, "rendering library failed to load");
                    *slot = Slot::Empty;
                }
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    use super::*;

    #[derive(Default)]
    struct CountingSource {
        loads: AtomicUsize,
        fail_next: AtomicBool,
    }

    #[async_trait]
    impl LibrarySource for Arc<CountingSource> {
        type Library = usize;

        async fn load(&self) -> Result<usize, LoadError> {
            let n = self.loads.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(Duration::from_millis(10)).await;
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(LoadError::new("script failed to load"));
            }
            Ok(n)
        }
    }

    #[tokio::test]
    async fn sequential_calls_load_once() {
        let source = Arc::new(CountingSource::default());
        let loader = LibraryLoader::new(source.clone());
        assert!(!loader.is_loaded());

        for _ in 0..5 {
            assert_eq!(*loader.get().await.unwrap(), 1);
            assert!(loader.is_loaded());
        }
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
        assert_eq!(loader.attempts(), 1);
    }

    #[tokio::test]
    async fn concurrent_calls_share_one_load() {
        let source = Arc::new(CountingSource::default());
        let loader = LibraryLoader::new(source.clone());

        let (a, b, c) = tokio::join!(loader.get(), loader.get(), loader.get());
        assert_eq!(*a.unwrap(), 1);
        assert_eq!(*b.unwrap(), 1);
        assert_eq!(*c.unwrap(), 1);
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failure_reaches_all_waiters_and_allows_retry() {
        let source = Arc::new(CountingSource::default());
        source.fail_next.store(true, Ordering::SeqCst);
        let loader = LibraryLoader::new(source.clone());

        let (a, b) = tokio::join!(loader.get(), loader.get());
        assert_eq!(a.unwrap_err().message(), "script failed to load");
        assert!(b.is_err());
        assert!(!loader.is_loaded());
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);

        assert_eq!(*loader.get().await.unwrap(), 2);
        assert!(loader.is_loaded());
        assert_eq!(loader.attempts(), 2);
    }
}
