//! Translation coordination: concurrency bounds, provider failover, fallback.
//!
//! This module owns everything between "here are the new papers" and
//! "here is Chinese text for each of them":
//! - [`Translator`]: holds the provider slots and the concurrency semaphore
//! - [`Translator::translate_one`]: one paper through the provider chain
//! - [`Translator::translate_batch`]: a whole batch, yielding results as
//!   they complete
//!
//! # Failover
//!
//! Each provider slot carries a consecutive-failure counter. A request
//! normally tries the primary first and the backup second; once the
//! primary has accumulated `max_failures` consecutive failures, the order
//! flips so the backup is tried first until a primary success resets the
//! counter. Counters are plain atomics updated from concurrent requests,
//! so the flip is a heuristic rather than a strict breaker: requests
//! already past the ordering decision keep their order.
//!
//! Every failed attempt is followed by a fixed cool-down while still
//! holding the concurrency permit, which keeps a flapping provider from
//! being hammered at full width.
//!
//! # Fallback
//!
//! Translation never fails upward. When every configured provider has
//! been tried (or none is configured), the paper's original English text
//! is returned in the same `{title}\n\n{summary}` shape a parsed
//! translation would have.

use futures::stream::{self, Stream, StreamExt};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::api::Generate;
use crate::models::FeedItem;
use crate::parser::{SYSTEM_PROMPT, build_user_prompt};

/// One configured provider plus its consecutive-failure counter.
struct ProviderSlot<G> {
    name: &'static str,
    client: G,
    failures: AtomicU32,
}

impl<G> ProviderSlot<G> {
    fn new(name: &'static str, client: G) -> Self {
        Self {
            name,
            client,
            failures: AtomicU32::new(0),
        }
    }
}

/// Coordinates translation requests across up to two providers.
pub struct Translator<G> {
    primary: Option<ProviderSlot<G>>,
    backup: Option<ProviderSlot<G>>,
    permits: Semaphore,
    max_failures: u32,
    cooldown: Duration,
}

impl<G: Generate> Translator<G> {
    /// Build a coordinator.
    ///
    /// # Arguments
    ///
    /// * `primary` - Preferred provider, if configured
    /// * `backup` - Second-choice provider, if configured
    /// * `max_concurrent` - Upper bound on in-flight requests (min 1)
    /// * `max_failures` - Consecutive primary failures before the order flips
    /// * `cooldown` - Pause after each failed attempt
    pub fn new(
        primary: Option<G>,
        backup: Option<G>,
        max_concurrent: usize,
        max_failures: u32,
        cooldown: Duration,
    ) -> Self {
        Self {
            primary: primary.map(|client| ProviderSlot::new("primary", client)),
            backup: backup.map(|client| ProviderSlot::new("backup", client)),
            permits: Semaphore::new(max_concurrent.max(1)),
            max_failures,
            cooldown,
        }
    }

    /// Providers in the order this request should try them.
    fn provider_order(&self) -> Vec<&ProviderSlot<G>> {
        match (&self.primary, &self.backup) {
            (Some(primary), Some(backup))
                if primary.failures.load(Ordering::Relaxed) >= self.max_failures =>
            {
                vec![backup, primary]
            }
            (primary, backup) => primary.iter().chain(backup.iter()).collect(),
        }
    }

    /// Translate one paper's title and abstract.
    ///
    /// Holds a concurrency permit for the whole attempt chain, cool-downs
    /// included. Infallible: when no provider produces a response the
    /// original text comes back in fallback shape.
    pub async fn translate_one(&self, title: &str, summary: &str) -> String {
        let _permit = self.permits.acquire().await.expect("semaphore closed");

        let order = self.provider_order();
        if order.is_empty() {
            debug!(title, "no provider configured; keeping original text");
            return fallback_text(title, summary);
        }

        let prompt = build_user_prompt(title, summary);
        for slot in order {
            match slot.client.generate(SYSTEM_PROMPT, &prompt).await {
                Ok(text) => {
                    slot.failures.store(0, Ordering::Relaxed);
                    debug!(provider = slot.name, title, "translation succeeded");
                    return text;
                }
                Err(e) => {
                    let failures = slot.failures.fetch_add(1, Ordering::Relaxed) + 1;
                    warn!(
                        provider = slot.name,
                        consecutive_failures = failures,
                        title,
                        error = %e,
                        "provider attempt failed; cooling down"
                    );
                    sleep(self.cooldown).await;
                }
            }
        }

        warn!(title, "every provider failed; keeping original text");
        fallback_text(title, summary)
    }

    /// Translate a batch of papers, yielding `(item, raw_text)` pairs in
    /// completion order.
    ///
    /// All items are dispatched up front; the semaphore inside
    /// [`translate_one`](Self::translate_one) is what actually bounds
    /// parallelism. Yielding in completion order lets the caller persist
    /// each paper the moment its translation lands.
    pub fn translate_batch<'a>(
        &'a self,
        items: Vec<FeedItem>,
    ) -> impl Stream<Item = (FeedItem, String)> + 'a {
        let width = items.len().max(1);
        stream::iter(items)
            .map(move |item| async move {
                let text = self.translate_one(&item.title, &item.summary).await;
                (item, text)
            })
            .buffer_unordered(width)
    }
}

/// The degraded output shape: original title, blank line, original abstract.
///
/// This round-trips through the response parser, so downstream code
/// treats fallbacks exactly like translations.
fn fallback_text(title: &str, summary: &str) -> String {
    format!("{title}\n\n{summary}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use futures::pin_mut;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Mutex};

    /// Provider that pops one scripted outcome per call and records which
    /// slot was called in a log shared across both slots.
    struct ScriptedProvider {
        name: &'static str,
        outcomes: Mutex<VecDeque<Result<String, ()>>>,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl ScriptedProvider {
        fn new(
            name: &'static str,
            outcomes: Vec<Result<String, ()>>,
            log: Arc<Mutex<Vec<&'static str>>>,
        ) -> Self {
            Self {
                name,
                outcomes: Mutex::new(outcomes.into()),
                log,
            }
        }
    }

    impl Generate for ScriptedProvider {
        async fn generate(&self, _system: &str, _user: &str) -> Result<String, ApiError> {
            self.log.lock().unwrap().push(self.name);
            match self.outcomes.lock().unwrap().pop_front() {
                Some(Ok(text)) => Ok(text),
                _ => Err(ApiError::EmptyResponse),
            }
        }
    }

    fn item(title: &str) -> FeedItem {
        FeedItem {
            id: "2508.00000v1".to_string(),
            title: title.to_string(),
            summary: format!("abstract of {title}"),
            link: String::new(),
        }
    }

    #[tokio::test]
    async fn test_primary_preferred_while_healthy() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let primary =
            ScriptedProvider::new("primary", vec![Ok("标题\n\n摘要".to_string())], log.clone());
        let backup = ScriptedProvider::new("backup", vec![], log.clone());
        let translator = Translator::new(Some(primary), Some(backup), 2, 3, Duration::ZERO);

        let text = translator.translate_one("T", "S").await;

        assert_eq!(text, "标题\n\n摘要");
        assert_eq!(*log.lock().unwrap(), vec!["primary"]);
    }

    #[tokio::test]
    async fn test_failover_flip_and_reset_on_success() {
        let log = Arc::new(Mutex::new(Vec::new()));
        // Call 1: primary fails (counter hits the threshold of 1), backup rescues.
        // Call 2: order is flipped; backup fails, primary succeeds and resets.
        // Call 3: primary is preferred again.
        let primary = ScriptedProvider::new(
            "primary",
            vec![
                Err(()),
                Ok("第二次\n\n成功".to_string()),
                Ok("第三次\n\n成功".to_string()),
            ],
            log.clone(),
        );
        let backup = ScriptedProvider::new(
            "backup",
            vec![Ok("后备\n\n救场".to_string()), Err(())],
            log.clone(),
        );
        let translator = Translator::new(Some(primary), Some(backup), 2, 1, Duration::ZERO);

        assert_eq!(translator.translate_one("a", "x").await, "后备\n\n救场");
        assert_eq!(translator.translate_one("b", "y").await, "第二次\n\n成功");
        assert_eq!(translator.translate_one("c", "z").await, "第三次\n\n成功");

        assert_eq!(
            *log.lock().unwrap(),
            vec!["primary", "backup", "backup", "primary", "primary"]
        );
    }

    #[tokio::test]
    async fn test_all_providers_failing_falls_back_to_original() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let primary = ScriptedProvider::new("primary", vec![], log.clone());
        let backup = ScriptedProvider::new("backup", vec![], log.clone());
        let translator = Translator::new(Some(primary), Some(backup), 2, 3, Duration::ZERO);

        let text = translator.translate_one("Paper Title", "Paper abstract.").await;

        assert_eq!(text, "Paper Title\n\nPaper abstract.");
        assert_eq!(*log.lock().unwrap(), vec!["primary", "backup"]);
    }

    #[tokio::test]
    async fn test_tripped_primary_without_backup_is_still_tried() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let primary = ScriptedProvider::new(
            "primary",
            vec![Err(()), Err(()), Ok("迟到的\n\n成功".to_string())],
            log.clone(),
        );
        let translator = Translator::new(Some(primary), None, 2, 1, Duration::ZERO);

        // Two failing calls push the counter past the threshold...
        translator.translate_one("a", "x").await;
        translator.translate_one("b", "y").await;
        // ...but with no backup the primary remains the only option.
        assert_eq!(translator.translate_one("c", "z").await, "迟到的\n\n成功");
        assert_eq!(*log.lock().unwrap(), vec!["primary", "primary", "primary"]);
    }

    #[tokio::test]
    async fn test_unconfigured_primary_uses_backup_only() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let backup =
            ScriptedProvider::new("backup", vec![Ok("后备\n\n翻译".to_string())], log.clone());
        let translator = Translator::new(None, Some(backup), 2, 3, Duration::ZERO);

        let text = translator.translate_one("T", "S").await;

        assert_eq!(text, "后备\n\n翻译");
        assert_eq!(*log.lock().unwrap(), vec!["backup"]);
    }

    #[tokio::test]
    async fn test_backup_only_outage_keeps_original_text() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let backup = ScriptedProvider::new("backup", vec![], log.clone());
        let translator = Translator::new(None, Some(backup), 2, 3, Duration::ZERO);

        let text = translator.translate_one("T", "S").await;

        // One attempt against the lone backup slot, then the fallback.
        assert_eq!(text, "T\n\nS");
        assert_eq!(*log.lock().unwrap(), vec!["backup"]);
    }

    #[tokio::test]
    async fn test_no_providers_returns_original_without_calls() {
        // The cool-down paces failed attempts; with no slots configured
        // there is no attempt, so none of it may be slept.
        let translator: Translator<ScriptedProvider> =
            Translator::new(None, None, 2, 3, Duration::from_secs(60));

        let started = std::time::Instant::now();
        let text = translator.translate_one("Paper Title", "Paper abstract.").await;

        assert_eq!(text, "Paper Title\n\nPaper abstract.");
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    /// Provider that tracks how many calls are in flight at once.
    struct GaugeProvider {
        current: Arc<AtomicUsize>,
        max_seen: Arc<AtomicUsize>,
    }

    impl Generate for GaugeProvider {
        async fn generate(&self, _system: &str, _user: &str) -> Result<String, ApiError> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_seen.fetch_max(now, Ordering::SeqCst);
            sleep(Duration::from_millis(20)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            Ok("标题\n\n摘要".to_string())
        }
    }

    #[tokio::test]
    async fn test_batch_respects_concurrency_bound() {
        let current = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let provider = GaugeProvider {
            current: current.clone(),
            max_seen: max_seen.clone(),
        };
        let translator = Translator::new(Some(provider), None, 3, 3, Duration::ZERO);

        let items: Vec<FeedItem> = (0..16).map(|i| item(&format!("paper {i}"))).collect();
        let results = translator.translate_batch(items);
        pin_mut!(results);

        let mut seen = 0;
        while let Some((_, text)) = results.next().await {
            assert_eq!(text, "标题\n\n摘要");
            seen += 1;
        }

        assert_eq!(seen, 16);
        assert!(
            max_seen.load(Ordering::SeqCst) <= 3,
            "observed {} concurrent requests",
            max_seen.load(Ordering::SeqCst)
        );
    }

    /// Provider whose latency depends on the prompt, to observe completion order.
    struct DelayedProvider;

    impl Generate for DelayedProvider {
        async fn generate(&self, _system: &str, user: &str) -> Result<String, ApiError> {
            let delay = if user.contains("slow") { 80 } else { 5 };
            sleep(Duration::from_millis(delay)).await;
            Ok("标题\n\n摘要".to_string())
        }
    }

    #[tokio::test]
    async fn test_batch_yields_in_completion_order() {
        let translator = Translator::new(Some(DelayedProvider), None, 4, 3, Duration::ZERO);

        let items = vec![item("slow paper"), item("fast paper")];
        let results = translator.translate_batch(items);
        pin_mut!(results);

        let (first, _) = results.next().await.unwrap();
        let (second, _) = results.next().await.unwrap();

        assert_eq!(first.title, "fast paper");
        assert_eq!(second.title, "slow paper");
        assert!(results.next().await.is_none());
    }
}
