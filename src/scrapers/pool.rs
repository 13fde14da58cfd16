use crate::scrapers::traits::{PageSession, SessionFactory};
use anyhow::Result;
use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Counters describing how sessions were obtained and retired
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub opened: u64,
    pub reused: u64,
    pub closed: u64,
    pub idle: usize,
}

struct PoolState {
    idle: Vec<Box<dyn PageSession>>,
    opened: u64,
    reused: u64,
    closed: u64,
}

/// Page sessions handed out through scoped leases.
///
/// Up to `max_idle` released sessions are kept for reuse. With `max_idle == 0`
/// every lease opens a fresh session and closes it on release.
pub struct PagePool {
    factory: Box<dyn SessionFactory>,
    max_idle: usize,
    state: Mutex<PoolState>,
}

impl PagePool {
    pub fn new(factory: Box<dyn SessionFactory>, max_idle: usize) -> Self {
        Self {
            factory,
            max_idle,
            state: Mutex::new(PoolState {
                idle: Vec::new(),
                opened: 0,
                reused: 0,
                closed: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lease a session. It goes back to the pool when the lease is dropped.
    pub fn acquire(&self) -> Result<PageLease<'_>> {
        let reused = {
            let mut state = self.lock();
            let session = state.idle.pop();
            if session.is_some() {
                state.reused += 1;
            }
            session
        };

        let session = match reused {
            Some(session) => session,
            None => {
                let session = self.factory.open()?;
                self.lock().opened += 1;
                debug!("Opened new page session");
                session
            }
        };

        Ok(PageLease {
            pool: self,
            session: Some(session),
            reusable: true,
        })
    }

    fn release(&self, session: Box<dyn PageSession>, reusable: bool) {
        let rejected = {
            let mut state = self.lock();
            if reusable && state.idle.len() < self.max_idle {
                state.idle.push(session);
                None
            } else {
                state.closed += 1;
                Some(session)
            }
        };

        if let Some(session) = rejected {
            session.close();
            debug!("Closed page session");
        }
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.lock();
        PoolStats {
            opened: state.opened,
            reused: state.reused,
            closed: state.closed,
            idle: state.idle.len(),
        }
    }
}

impl Drop for PagePool {
    fn drop(&mut self) {
        let idle = std::mem::take(&mut self.lock().idle);
        for session in idle {
            session.close();
        }
    }
}

/// Exclusive use of one pooled session
pub struct PageLease<'a> {
    pool: &'a PagePool,
    session: Option<Box<dyn PageSession>>,
    reusable: bool,
}

impl PageLease<'_> {
    /// Close the session on release instead of returning it to the pool.
    /// Used after a failed navigation, when the page state is unknown.
    pub fn discard(&mut self) {
        self.reusable = false;
    }
}

impl Deref for PageLease<'_> {
    type Target = dyn PageSession;

    fn deref(&self) -> &Self::Target {
        self.session
            .as_deref()
            .expect("lease holds its session until dropped")
    }
}

impl DerefMut for PageLease<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.session
            .as_deref_mut()
            .expect("lease holds its session until dropped")
    }
}

impl Drop for PageLease<'_> {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            self.pool.release(session, self.reusable);
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Canned-HTML sessions for pipeline tests

    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[derive(Default)]
    pub struct Site {
        pages: HashMap<String, String>,
        after_click: HashMap<String, String>,
        broken: Vec<String>,
        unreadable: Vec<String>,
        pub visits: Mutex<Vec<String>>,
        pub closed: Mutex<u64>,
    }

    impl Site {
        pub fn page(mut self, url: &str, html: impl Into<String>) -> Self {
            self.pages.insert(url.to_string(), html.into());
            self
        }

        /// HTML served for `url` once a click succeeded on it
        pub fn after_click(mut self, url: &str, html: impl Into<String>) -> Self {
            self.after_click.insert(url.to_string(), html.into());
            self
        }

        pub fn broken(mut self, url: &str) -> Self {
            self.broken.push(url.to_string());
            self
        }

        /// `url` navigates but its DOM snapshot fails
        pub fn unreadable(mut self, url: &str) -> Self {
            self.unreadable.push(url.to_string());
            self
        }

        pub fn visits(&self) -> Vec<String> {
            self.visits.lock().unwrap().clone()
        }
    }

    pub struct FakeSession {
        site: Arc<Site>,
        current: Option<String>,
        clicked: bool,
    }

    #[async_trait]
    impl PageSession for FakeSession {
        async fn goto(&mut self, url: &str) -> Result<()> {
            self.site.visits.lock().unwrap().push(url.to_string());
            self.clicked = false;
            if self.site.broken.iter().any(|b| b == url) {
                self.current = None;
                anyhow::bail!("net::ERR_CONNECTION_RESET");
            }
            self.current = Some(url.to_string());
            Ok(())
        }

        async fn scroll_to_bottom(&mut self) -> Result<()> {
            Ok(())
        }

        async fn click(&mut self, selector: &str) -> Result<bool> {
            let html = self.html().await?;
            let document = scraper::Html::parse_document(&html);
            let matched = scraper::Selector::parse(selector)
                .map(|s| document.select(&s).next().is_some())
                .unwrap_or(false);
            self.clicked = matched;
            Ok(matched)
        }

        async fn html(&mut self) -> Result<String> {
            let url = self.current.clone().unwrap_or_default();
            if self.site.unreadable.contains(&url) {
                anyhow::bail!("Could not get HTML from page");
            }
            if self.clicked {
                if let Some(html) = self.site.after_click.get(&url) {
                    return Ok(html.clone());
                }
            }
            Ok(self.site.pages.get(&url).cloned().unwrap_or_else(|| {
                "<html><body></body></html>".to_string()
            }))
        }

        fn close(self: Box<Self>) {
            *self.site.closed.lock().unwrap() += 1;
        }
    }

    pub struct FakeFactory(pub Arc<Site>);

    impl SessionFactory for FakeFactory {
        fn open(&self) -> Result<Box<dyn PageSession>> {
            Ok(Box::new(FakeSession {
                site: Arc::clone(&self.0),
                current: None,
                clicked: false,
            }))
        }
    }

    /// Factory for a browser that is gone for good; counts open attempts
    pub struct DeadFactory(pub Arc<Mutex<u64>>);

    impl SessionFactory for DeadFactory {
        fn open(&self) -> Result<Box<dyn PageSession>> {
            *self.0.lock().unwrap() += 1;
            anyhow::bail!("Failed to launch Chrome browser")
        }
    }
}
