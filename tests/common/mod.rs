//! Shared fixtures for integration tests.
//!
//! [`FakePage`] implements every host trait over an in-memory list of cards
//! and records each presentation and menu call so tests can assert on them.

#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard};
use ytlens::config::ConfigValues;
use ytlens::host::{ExtractionError, HostError, MenuCandidate};
use ytlens::services::Collaborators;
use ytlens::{
    ContentItem, Extractor, FilterSettings, Highlight, HostRef, MemoryConfigStore, MenuHost,
    Presenter,
};

/// One recorded host call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Hide(HostRef),
    Highlight(HostRef, Highlight),
    Toggle(HostRef),
    Poll,
    Invoke(String),
    Cancel,
}

struct Card {
    handle: HostRef,
    trigger: Option<HostRef>,
    title: String,
    channel: String,
    description: String,
    badge: bool,
    broken: bool,
    processed: bool,
}

#[derive(Default)]
struct PageState {
    cards: Vec<Card>,
    menu_labels: Vec<String>,
    menu_open: bool,
    language: Option<String>,
    fail_toggle: bool,
    fail_poll: bool,
    fail_hide: bool,
}

#[derive(Default)]
pub struct FakePage {
    state: Mutex<PageState>,
    calls: Mutex<Vec<Call>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl FakePage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push_card(&self, title: &str, channel: &str, description: &str, badge: bool) -> HostRef {
        let handle = HostRef::new(format!("card:{}", title));
        let trigger = HostRef::new(format!("menu-button:{}", title));
        lock(&self.state).cards.push(Card {
            handle: handle.clone(),
            trigger: Some(trigger),
            title: title.to_string(),
            channel: channel.to_string(),
            description: description.to_string(),
            badge,
            broken: false,
            processed: false,
        });
        handle
    }

    pub fn add_item(&self, title: &str, channel: &str, description: &str) -> HostRef {
        self.push_card(title, channel, description, false)
    }

    pub fn add_badged_item(&self, title: &str, channel: &str) -> HostRef {
        self.push_card(title, channel, "", true)
    }

    /// A card whose fields cannot be read.
    pub fn add_broken_item(&self) -> HostRef {
        let handle = self.push_card("", "", "", false);
        self.with_card(&handle, |card| card.broken = true);
        handle
    }

    /// A badged card whose text fields cannot be read.
    pub fn add_broken_badged_item(&self, key: &str) -> HostRef {
        let handle = self.push_card(key, "", "", true);
        self.with_card(&handle, |card| card.broken = true);
        handle
    }

    pub fn remove_trigger(&self, handle: &HostRef) {
        self.with_card(handle, |card| card.trigger = None);
    }

    /// Labels shown while a menu is open.
    pub fn set_menu_labels(&self, labels: &[&str]) {
        lock(&self.state).menu_labels = labels.iter().map(|l| l.to_string()).collect();
    }

    pub fn set_language(&self, language: &str) {
        lock(&self.state).language = Some(language.to_string());
    }

    pub fn fail_toggles(&self, fail: bool) {
        lock(&self.state).fail_toggle = fail;
    }

    pub fn fail_polls(&self, fail: bool) {
        lock(&self.state).fail_poll = fail;
    }

    pub fn fail_hides(&self, fail: bool) {
        lock(&self.state).fail_hide = fail;
    }

    pub fn is_menu_open(&self) -> bool {
        lock(&self.state).menu_open
    }

    pub fn trigger_of(&self, handle: &HostRef) -> Option<HostRef> {
        lock(&self.state)
            .cards
            .iter()
            .find(|card| &card.handle == handle)
            .and_then(|card| card.trigger.clone())
    }

    fn with_card<F: FnOnce(&mut Card)>(&self, handle: &HostRef, f: F) {
        let mut state = lock(&self.state);
        if let Some(card) = state.cards.iter_mut().find(|card| &card.handle == handle) {
            f(card);
        }
    }

    fn record(&self, call: Call) {
        lock(&self.calls).push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        lock(&self.calls).clone()
    }

    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    pub fn hidden(&self) -> Vec<HostRef> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Hide(handle) => Some(handle),
                _ => None,
            })
            .collect()
    }

    pub fn highlights_for(&self, handle: &HostRef) -> Vec<Highlight> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Highlight(h, variant) if &h == handle => Some(variant),
                _ => None,
            })
            .collect()
    }

    pub fn toggles(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Toggle(_)))
            .count()
    }

    pub fn invoked(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Invoke(label) => Some(label),
                _ => None,
            })
            .collect()
    }

    pub fn cancels(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Cancel))
            .count()
    }

    pub fn collaborators(self: &Arc<Self>) -> Collaborators {
        Collaborators {
            extractor: self.clone(),
            presenter: self.clone(),
            menu: self.clone(),
        }
    }
}

impl Extractor for FakePage {
    fn find_unprocessed_items(&self) -> Vec<HostRef> {
        lock(&self.state)
            .cards
            .iter()
            .filter(|card| !card.processed)
            .map(|card| card.handle.clone())
            .collect()
    }

    fn extract_item(&self, handle: &HostRef) -> Result<ContentItem, ExtractionError> {
        let state = lock(&self.state);
        let card = state
            .cards
            .iter()
            .find(|card| &card.handle == handle)
            .ok_or_else(|| ExtractionError::new(handle, "not on page"))?;
        if card.broken {
            return Err(ExtractionError::new(handle, "title node missing"));
        }
        Ok(ContentItem::new(
            card.handle.clone(),
            card.title.as_str(),
            card.channel.as_str(),
            card.description.as_str(),
        )
        .with_badge(card.badge))
    }

    fn mark_processed(&self, handle: &HostRef) {
        self.with_card(handle, |card| card.processed = true);
    }

    fn has_suppressed_badge(&self, handle: &HostRef) -> bool {
        lock(&self.state)
            .cards
            .iter()
            .any(|card| &card.handle == handle && card.badge)
    }

    fn contains_item(&self, node: &HostRef) -> bool {
        lock(&self.state).cards.iter().any(|card| &card.handle == node)
    }
}

impl Presenter for FakePage {
    fn hide(&self, handle: &HostRef) -> Result<(), HostError> {
        if lock(&self.state).fail_hide {
            return Err(HostError::Detached(handle.clone()));
        }
        self.record(Call::Hide(handle.clone()));
        Ok(())
    }

    fn highlight(&self, handle: &HostRef, variant: Highlight) -> Result<(), HostError> {
        self.record(Call::Highlight(handle.clone(), variant));
        Ok(())
    }
}

impl MenuHost for FakePage {
    fn menu_trigger(&self, item: &HostRef) -> Option<HostRef> {
        self.trigger_of(item)
    }

    fn toggle_menu(&self, trigger: &HostRef) -> Result<(), HostError> {
        self.record(Call::Toggle(trigger.clone()));
        let mut state = lock(&self.state);
        if state.fail_toggle {
            return Err(HostError::failed("toggle_menu", "trigger not clickable"));
        }
        state.menu_open = !state.menu_open;
        Ok(())
    }

    fn poll_menu_candidates(&self) -> Result<Vec<MenuCandidate>, HostError> {
        self.record(Call::Poll);
        let state = lock(&self.state);
        if state.fail_poll {
            return Err(HostError::failed("poll_menu_candidates", "menu detached"));
        }
        if !state.menu_open {
            return Ok(Vec::new());
        }
        Ok(state
            .menu_labels
            .iter()
            .map(|label| MenuCandidate::new(label.as_str(), HostRef::new(label.clone())))
            .collect())
    }

    fn invoke_candidate(&self, candidate: &MenuCandidate) -> Result<(), HostError> {
        self.record(Call::Invoke(candidate.text.clone()));
        lock(&self.state).menu_open = false;
        Ok(())
    }

    fn dispatch_cancel_signal(&self) -> Result<(), HostError> {
        self.record(Call::Cancel);
        lock(&self.state).menu_open = false;
        Ok(())
    }

    fn document_language(&self) -> Option<String> {
        lock(&self.state).language.clone()
    }
}

/// Store pre-filled with `settings`.
pub fn store_with(settings: &FilterSettings) -> Arc<MemoryConfigStore> {
    let values: ConfigValues = settings.to_values().unwrap();
    Arc::new(MemoryConfigStore::with_values(values))
}
