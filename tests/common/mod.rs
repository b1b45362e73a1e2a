//! In-memory browser used by the integration tests
//!
//! Every launcher shares a `Counters` value so tests can check how many
//! engines and contexts were opened and closed.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use url_digest::{
    BrowserEngine, BrowserError, BrowserLauncher, BrowserResult, BrowsingContext, ContextProfile,
    PageHandle, Scraper,
};

pub const OG_TITLE: &str = r#"meta[property="og:title"]"#;
pub const OG_DESCRIPTION: &str = r#"meta[property="og:description"]"#;
pub const META_DESCRIPTION: &str = r#"meta[name="description"]"#;
pub const OG_SITE_NAME: &str = r#"meta[property="og:site_name"]"#;

/// What the fake page reports
#[derive(Debug, Clone, Default)]
pub struct PageFixture {
    pub title: Option<String>,
    pub meta: HashMap<String, String>,
    pub h1: Option<String>,
    pub html: String,
    pub readable: bool,
    pub hang_probes: bool,
    pub content_fails: bool,
}

impl PageFixture {
    pub fn new(html: &str) -> Self {
        Self {
            html: html.to_string(),
            readable: true,
            ..Self::default()
        }
    }

    pub fn title(mut self, value: &str) -> Self {
        self.title = Some(value.to_string());
        self
    }

    pub fn h1(mut self, value: &str) -> Self {
        self.h1 = Some(value.to_string());
        self
    }

    pub fn meta(mut self, selector: &str, value: &str) -> Self {
        self.meta.insert(selector.to_string(), value.to_string());
        self
    }

    /// Probes never answer and the page never looks ready
    pub fn hanging(mut self) -> Self {
        self.hang_probes = true;
        self.readable = false;
        self
    }

    /// Metadata queries never answer but the document already shows content
    pub fn stalled_metadata(mut self) -> Self {
        self.hang_probes = true;
        self.readable = true;
        self
    }

    /// Document snapshots fail, so readability has nothing to work on
    pub fn unreadable(mut self) -> Self {
        self.content_fails = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    Launch,
    Context,
    Navigation,
    NavigationTimeout,
}

#[derive(Debug, Default)]
pub struct Counters {
    pub launched: AtomicUsize,
    pub engines_closed: AtomicUsize,
    pub contexts_created: AtomicUsize,
    pub contexts_closed: AtomicUsize,
    pub pages_opened: AtomicUsize,
    pub image_strips: AtomicUsize,
}

impl Counters {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct FakeLauncher {
    fixture: PageFixture,
    fail: Option<FailAt>,
    pub counters: Arc<Counters>,
}

impl FakeLauncher {
    pub fn new(fixture: PageFixture) -> Self {
        Self {
            fixture,
            fail: None,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn failing_at(mut self, stage: FailAt) -> Self {
        self.fail = Some(stage);
        self
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    type Engine = FakeEngine;

    async fn launch(&self) -> BrowserResult<FakeEngine> {
        if self.fail == Some(FailAt::Launch) {
            return Err(BrowserError::NotFound("no browser in test".into()));
        }
        Counters::bump(&self.counters.launched);
        Ok(FakeEngine {
            fixture: self.fixture.clone(),
            fail: self.fail,
            counters: self.counters.clone(),
        })
    }
}

pub struct FakeEngine {
    fixture: PageFixture,
    fail: Option<FailAt>,
    counters: Arc<Counters>,
}

#[async_trait]
impl BrowserEngine for FakeEngine {
    type Context = FakeContext;

    async fn new_context(&self, _profile: &ContextProfile) -> BrowserResult<FakeContext> {
        if self.fail == Some(FailAt::Context) {
            return Err(BrowserError::ContextCreationFailed("refused".into()));
        }
        Counters::bump(&self.counters.contexts_created);
        Ok(FakeContext {
            fixture: self.fixture.clone(),
            fail: self.fail,
            counters: self.counters.clone(),
        })
    }

    async fn close(&mut self) -> BrowserResult<()> {
        Counters::bump(&self.counters.engines_closed);
        Ok(())
    }
}

pub struct FakeContext {
    fixture: PageFixture,
    fail: Option<FailAt>,
    counters: Arc<Counters>,
}

#[async_trait]
impl BrowsingContext for FakeContext {
    type Page = FakePage;

    async fn open_page(&self, url: &str, timeout: Duration) -> BrowserResult<FakePage> {
        match self.fail {
            Some(FailAt::Navigation) => {
                return Err(BrowserError::NavigationFailed(format!(
                    "net::ERR_NAME_NOT_RESOLVED at {}",
                    url
                )));
            }
            Some(FailAt::NavigationTimeout) => {
                tokio::time::sleep(timeout).await;
                return Err(BrowserError::NavigationTimeout(timeout));
            }
            _ => {}
        }
        Counters::bump(&self.counters.pages_opened);
        Ok(FakePage {
            fixture: self.fixture.clone(),
            counters: self.counters.clone(),
        })
    }

    async fn close(&mut self) -> BrowserResult<()> {
        Counters::bump(&self.counters.contexts_closed);
        Ok(())
    }
}

pub struct FakePage {
    fixture: PageFixture,
    counters: Arc<Counters>,
}

impl FakePage {
    pub fn new(fixture: PageFixture) -> Self {
        Self {
            fixture,
            counters: Arc::new(Counters::default()),
        }
    }

    async fn answer<T>(&self, value: T) -> BrowserResult<T> {
        if self.fixture.hang_probes {
            std::future::pending::<()>().await;
        }
        Ok(value)
    }
}

#[async_trait]
impl PageHandle for FakePage {
    async fn title(&self) -> BrowserResult<Option<String>> {
        self.answer(self.fixture.title.clone()).await
    }

    async fn attribute(&self, selector: &str, name: &str) -> BrowserResult<Option<String>> {
        assert_eq!(name, "content");
        self.answer(self.fixture.meta.get(selector).cloned()).await
    }

    async fn text_content(&self, selector: &str) -> BrowserResult<Option<String>> {
        assert_eq!(selector, "h1");
        self.answer(self.fixture.h1.clone()).await
    }

    async fn has_readable_content(&self) -> BrowserResult<bool> {
        Ok(self.fixture.readable)
    }

    async fn remove_elements(&self, _selector: &str) -> BrowserResult<usize> {
        Counters::bump(&self.counters.image_strips);
        Ok(0)
    }

    async fn content(&self) -> BrowserResult<String> {
        if self.fixture.content_fails {
            return Err(BrowserError::Evaluation("document unavailable".into()));
        }
        Ok(self.fixture.html.clone())
    }
}

pub fn scraper(launcher: FakeLauncher) -> Scraper<FakeLauncher> {
    Scraper::new(
        launcher,
        ContextProfile::default(),
        Duration::from_secs(15),
        Duration::from_secs(10),
    )
}
