use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::{
    config::Config,
    domain::{EntryId, HistoryEntry, NormalizedNumber},
    errors::Error,
    phone::normalize,
    ports::{ChatOpener, ExtractionGateway},
    store::HistoryStore,
    Result,
};

/// Loading indicator for the extraction call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExtractionState {
    #[default]
    Idle,
    Extracting,
}

/// Fewer digits than this and free text is not worth dialing as typed.
pub const MIN_DIRECT_DIGITS: usize = 5;

/// Where `ChatSession::submit` sends a piece of input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitRoute {
    Direct,
    Extraction,
    Rejected,
}

/// Enough digits ⇒ dial it; otherwise text that reads like a pasted
/// signature or message goes to the extraction gateway.
pub fn route_input(text: &str) -> SubmitRoute {
    let digits = text.chars().filter(|c| c.is_ascii_digit()).count();
    if digits >= MIN_DIRECT_DIGITS {
        return SubmitRoute::Direct;
    }
    let len = text.chars().count();
    let messy = len > 20 || (text.contains(' ') && len > 10 && !text.starts_with('+'));
    if messy {
        SubmitRoute::Extraction
    } else {
        SubmitRoute::Rejected
    }
}

/// Clears the in-flight flag when the extraction call ends, however it ends.
struct ExtractionGuard<'a>(&'a AtomicBool);

impl Drop for ExtractionGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Successful submission: the number was recorded and its chat opened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Opened {
    pub entry: HistoryEntry,
    pub url: String,
}

/// Orchestrates normalization, extraction, history and the open-chat action.
pub struct ChatSession {
    cfg: Arc<Config>,
    store: Arc<HistoryStore>,
    extractor: Arc<dyn ExtractionGateway>,
    opener: Arc<dyn ChatOpener>,
    extracting: AtomicBool,
}

impl ChatSession {
    pub fn new(
        cfg: Arc<Config>,
        store: Arc<HistoryStore>,
        extractor: Arc<dyn ExtractionGateway>,
        opener: Arc<dyn ChatOpener>,
    ) -> Self {
        Self {
            cfg,
            store,
            extractor,
            opener,
            extracting: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Free input from the text box: a number is opened directly, messy text
    /// is handed to extraction.
    pub async fn submit(&self, text: &str, country_code: Option<&str>) -> Result<Opened> {
        match route_input(text) {
            SubmitRoute::Direct => self.submit_direct(text, country_code).await,
            SubmitRoute::Extraction => self.submit_via_extraction(text).await,
            SubmitRoute::Rejected => Err(Error::InvalidInput(format!(
                "too few digits in {text:?}"
            ))),
        }
    }

    /// Typed or pasted number, with the user's country selection.
    pub async fn submit_direct(&self, text: &str, country_code: Option<&str>) -> Result<Opened> {
        let number = self.normalize_checked(text, country_code)?;
        Ok(self.record_and_open(number, None).await)
    }

    /// Re-open a number picked from the history list, moving it to the front.
    pub async fn submit_from_history(&self, number: &str) -> Result<Opened> {
        let number = self.normalize_checked(number, None)?;
        Ok(self.record_and_open(number, None).await)
    }

    /// Ask the extraction gateway for a number hidden in `text`, then open it.
    ///
    /// Only one extraction may be in flight; a second call fails fast with
    /// `ExtractionInFlight` instead of cancelling the first.
    pub async fn submit_via_extraction(&self, text: &str) -> Result<Opened> {
        if self
            .extracting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::ExtractionInFlight);
        }
        let guard = ExtractionGuard(&self.extracting);
        let result = self.extractor.extract(text).await;
        drop(guard);

        let Some(extraction) = result.filter(|x| !x.phone_number.trim().is_empty()) else {
            tracing::info!("extraction returned no number");
            return Err(Error::ExtractionUnavailable(
                "gateway returned no number".to_string(),
            ));
        };
        tracing::debug!(
            confidence = extraction.confidence,
            country_code_detected = extraction.country_code_detected,
            "extraction returned a candidate"
        );

        let number = self
            .normalize_checked(&extraction.phone_number, None)
            .map_err(|e| {
                tracing::info!(
                    candidate = %extraction.phone_number,
                    error = %e,
                    "extracted candidate rejected"
                );
                Error::ExtractionUnavailable(format!("unusable candidate: {e}"))
            })?;

        let preview = preview_of(text, self.cfg.preview_chars);
        Ok(self.record_and_open(number, preview).await)
    }

    pub fn extraction_state(&self) -> ExtractionState {
        if self.is_extracting() {
            ExtractionState::Extracting
        } else {
            ExtractionState::Idle
        }
    }

    pub fn is_extracting(&self) -> bool {
        self.extracting.load(Ordering::Acquire)
    }

    pub async fn entries(&self) -> Vec<HistoryEntry> {
        self.store.entries().await
    }

    pub async fn pending_undo(&self) -> Option<HistoryEntry> {
        self.store.pending_undo().await
    }

    pub async fn delete(&self, id: &EntryId) -> Option<HistoryEntry> {
        self.store.delete(id).await
    }

    pub async fn undo(&self) -> Option<HistoryEntry> {
        self.store.undo().await
    }

    /// Close the undo offer without restoring anything.
    pub async fn dismiss_undo(&self) -> Option<HistoryEntry> {
        self.store.dismiss_undo().await
    }

    pub async fn clear(&self) {
        self.store.clear().await
    }

    fn normalize_checked(
        &self,
        raw: &str,
        country_code: Option<&str>,
    ) -> Result<NormalizedNumber> {
        let number = normalize(raw, country_code)
            .ok_or_else(|| Error::InvalidInput(format!("no digits in {:?}", raw)))?;
        if self.cfg.enforce_length && !number.has_plausible_length() {
            return Err(Error::InvalidInput(format!(
                "{} has {} digits",
                number,
                number.len()
            )));
        }
        Ok(number)
    }

    async fn record_and_open(&self, number: NormalizedNumber, preview: Option<String>) -> Opened {
        let entry = self.store.insert(number, preview).await;
        let url = entry.number.chat_url(&self.cfg.chat_base_url);
        if let Err(e) = self.opener.open(&url) {
            tracing::warn!(url = %url, error = %e, "failed to open chat");
        }
        Opened { entry, url }
    }
}

/// Short snippet of free text kept next to an extracted number.
///
/// At most `limit` characters; longer text is cut and ends with `…`.
pub fn preview_of(text: &str, limit: usize) -> Option<String> {
    let text = text.trim();
    if text.is_empty() || limit == 0 {
        return None;
    }
    if text.chars().count() <= limit {
        return Some(text.to_string());
    }
    let mut out: String = text.chars().take(limit - 1).collect();
    out.push('…');
    Some(out)
}
