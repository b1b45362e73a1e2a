//! Isolated browsing contexts and the pages they open
//!
//! Each request gets its own CDP browser context (separate cookies, cache
//! and storage). The context applies the request profile to its page before
//! navigating: user agent, viewport and extra request headers.

use async_trait::async_trait;
use chromiumoxide::page::Page;
use chromiumoxide_cdp::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide_cdp::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetUserAgentOverrideParams,
};
use chromiumoxide_cdp::cdp::browser_protocol::network::{
    EnableParams, Headers, SetExtraHttpHeadersParams,
};
use chromiumoxide_cdp::cdp::browser_protocol::page::{EventDomContentEventFired, NavigateParams};
use chromiumoxide_cdp::cdp::browser_protocol::target::{
    CreateTargetParams, DisposeBrowserContextParams,
};
use futures::StreamExt;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

use super::wrapper::BrowserWrapper;
use super::{
    BrowserError, BrowserResult, BrowsingContext, ContextProfile, PageHandle, READINESS_SCRIPT,
};

pub struct ChromeContext {
    browser: Arc<Mutex<Option<BrowserWrapper>>>,
    context_id: Option<BrowserContextId>,
    profile: ContextProfile,
}

impl ChromeContext {
    pub(crate) fn new(
        browser: Arc<Mutex<Option<BrowserWrapper>>>,
        context_id: BrowserContextId,
        profile: ContextProfile,
    ) -> Self {
        Self {
            browser,
            context_id: Some(context_id),
            profile,
        }
    }

    async fn new_blank_page(&self) -> BrowserResult<Page> {
        let context_id = self.context_id.clone().ok_or(BrowserError::Closed)?;
        let params = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context_id)
            .build()
            .map_err(BrowserError::PageCreationFailed)?;

        let guard = self.browser.lock().await;
        let wrapper = guard.as_ref().ok_or(BrowserError::Closed)?;
        wrapper
            .browser()
            .new_page(params)
            .await
            .map_err(|e| BrowserError::PageCreationFailed(e.to_string()))
    }

    async fn apply_profile(&self, page: &Page) -> BrowserResult<()> {
        let profile = &self.profile;
        let setup_failed = |e: chromiumoxide::error::CdpError| {
            BrowserError::PageCreationFailed(format!("Failed to apply context profile: {e}"))
        };

        page.execute(SetUserAgentOverrideParams::new(profile.user_agent.clone()))
            .await
            .map_err(setup_failed)?;

        page.execute(SetDeviceMetricsOverrideParams::new(
            i64::from(profile.viewport_width),
            i64::from(profile.viewport_height),
            1.0,
            false,
        ))
        .await
        .map_err(setup_failed)?;

        let headers: serde_json::Map<String, Value> = profile
            .headers
            .iter()
            .map(|(name, value)| (name.clone(), Value::String(value.clone())))
            .collect();

        page.execute(EnableParams::default())
            .await
            .map_err(setup_failed)?;
        page.execute(SetExtraHttpHeadersParams::new(Headers::new(Value::Object(
            headers,
        ))))
        .await
        .map_err(setup_failed)?;

        Ok(())
    }
}

#[async_trait]
impl BrowsingContext for ChromeContext {
    type Page = ChromePage;

    async fn open_page(&self, url: &str, timeout: Duration) -> BrowserResult<ChromePage> {
        let page = self.new_blank_page().await?;
        self.apply_profile(&page).await?;

        let page = ChromePage { page };
        page.navigate(url, timeout).await?;

        debug!("DOMContentLoaded reached for {}", url);
        Ok(page)
    }

    async fn close(&mut self) -> BrowserResult<()> {
        let Some(context_id) = self.context_id.take() else {
            return Ok(());
        };

        let guard = self.browser.lock().await;
        let Some(wrapper) = guard.as_ref() else {
            // Browser already gone, its contexts went with it
            return Ok(());
        };

        wrapper
            .browser()
            .execute(DisposeBrowserContextParams::new(context_id))
            .await
            .map_err(|e| BrowserError::ContextDisposeFailed(e.to_string()))?;

        Ok(())
    }
}

/// A navigated chromiumoxide page
pub struct ChromePage {
    page: Page,
}

impl ChromePage {
    /// Navigate and return once the main frame fires DOMContentLoaded
    ///
    /// chromiumoxide resolves a navigate command only after `load`, so the
    /// command is raced against the first `Page.domContentEventFired`.
    async fn navigate(&self, url: &str, timeout: Duration) -> BrowserResult<()> {
        let mut dom_ready = self
            .page
            .event_listener::<EventDomContentEventFired>()
            .await
            .map_err(|e| BrowserError::NavigationFailed(e.to_string()))?;

        let navigation = async {
            let response = self
                .page
                .execute(NavigateParams::new(url))
                .await
                .map_err(|e| BrowserError::NavigationFailed(e.to_string()))?;

            match response.result.error_text {
                Some(error_text) => Err(BrowserError::NavigationFailed(error_text)),
                None => Ok(()),
            }
        };

        wait_for_dom_content_loaded(navigation, async { dom_ready.next().await.is_some() }, timeout)
            .await
    }

    async fn eval(&self, script: &str) -> BrowserResult<Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| BrowserError::Evaluation(e.to_string()))?;

        // `undefined` has no value at all; treat it like null
        Ok(result.into_value::<Value>().unwrap_or(Value::Null))
    }

    async fn eval_string(&self, script: &str) -> BrowserResult<Option<String>> {
        match self.eval(script).await? {
            Value::String(text) => Ok(Some(text)),
            _ => Ok(None),
        }
    }
}

/// Settle a navigation at DOMContentLoaded, bounded by `timeout`
///
/// `navigation` finishing first decides the outcome (errors included).
/// `dom_ready` yields `false` when the event stream ends without the event.
async fn wait_for_dom_content_loaded<N, D>(
    navigation: N,
    dom_ready: D,
    timeout: Duration,
) -> BrowserResult<()>
where
    N: Future<Output = BrowserResult<()>>,
    D: Future<Output = bool>,
{
    let race = async {
        tokio::select! {
            biased;
            finished = navigation => finished,
            fired = dom_ready => {
                if fired {
                    Ok(())
                } else {
                    Err(BrowserError::NavigationFailed(
                        "page closed before DOMContentLoaded".to_string(),
                    ))
                }
            }
        }
    };

    tokio::time::timeout(timeout, race)
        .await
        .map_err(|_| BrowserError::NavigationTimeout(timeout))?
}

/// JS string literal for `value`
fn js_literal(value: &str) -> String {
    Value::String(value.to_string()).to_string()
}

#[async_trait]
impl PageHandle for ChromePage {
    async fn title(&self) -> BrowserResult<Option<String>> {
        self.page
            .get_title()
            .await
            .map_err(|e| BrowserError::Evaluation(e.to_string()))
    }

    async fn attribute(&self, selector: &str, name: &str) -> BrowserResult<Option<String>> {
        let script = format!(
            "(() => {{ const el = document.querySelector({}); return el ? el.getAttribute({}) : null; }})()",
            js_literal(selector),
            js_literal(name)
        );
        self.eval_string(&script).await
    }

    async fn text_content(&self, selector: &str) -> BrowserResult<Option<String>> {
        let script = format!(
            "(() => {{ const el = document.querySelector({}); return el ? el.textContent : null; }})()",
            js_literal(selector)
        );
        self.eval_string(&script).await
    }

    async fn has_readable_content(&self) -> BrowserResult<bool> {
        Ok(self.eval(READINESS_SCRIPT).await?.as_bool().unwrap_or(false))
    }

    async fn remove_elements(&self, selector: &str) -> BrowserResult<usize> {
        let script = format!(
            "(() => {{ const els = document.querySelectorAll({}); els.forEach(el => el.remove()); return els.length; }})()",
            js_literal(selector)
        );
        let removed = self.eval(&script).await?.as_u64().unwrap_or(0);
        Ok(usize::try_from(removed).unwrap_or(usize::MAX))
    }

    async fn content(&self) -> BrowserResult<String> {
        self.page
            .content()
            .await
            .map_err(|e| BrowserError::Evaluation(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors_are_embedded_as_js_strings() {
        assert_eq!(
            js_literal(r#"meta[property="og:title"]"#),
            r#""meta[property=\"og:title\"]""#
        );
        assert_eq!(js_literal("it's"), r#""it's""#);
    }

    #[tokio::test(start_paused = true)]
    async fn dom_content_loaded_settles_while_load_is_pending() {
        let started = tokio::time::Instant::now();
        let load = std::future::pending::<BrowserResult<()>>();
        let dom_ready = async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            true
        };

        wait_for_dom_content_loaded(load, dom_ready, Duration::from_secs(15))
            .await
            .unwrap();

        assert!(started.elapsed() >= Duration::from_secs(2));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn navigation_error_beats_dom_content_loaded() {
        let failed = async { Err(BrowserError::NavigationFailed("net::ERR_NAME_NOT_RESOLVED".into())) };
        let err = wait_for_dom_content_loaded(failed, async { true }, Duration::from_secs(15))
            .await
            .unwrap_err();
        assert!(matches!(err, BrowserError::NavigationFailed(msg) if msg.contains("ERR_NAME")));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_dom_content_loaded_times_out() {
        let started = tokio::time::Instant::now();
        let err = wait_for_dom_content_loaded(
            std::future::pending::<BrowserResult<()>>(),
            std::future::pending::<bool>(),
            Duration::from_secs(15),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, BrowserError::NavigationTimeout(t) if t == Duration::from_secs(15)));
        assert!(started.elapsed() >= Duration::from_secs(15));
        assert!(started.elapsed() < Duration::from_secs(16));
    }

    #[tokio::test]
    async fn closed_event_stream_is_a_navigation_failure() {
        let err = wait_for_dom_content_loaded(
            std::future::pending::<BrowserResult<()>>(),
            async { false },
            Duration::from_secs(15),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, BrowserError::NavigationFailed(_)));
    }
}
