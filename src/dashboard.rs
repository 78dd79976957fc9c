use crate::workflow::{
    resolve_display_items, Completion, CountryRecord, DisplayItem, FetchRun, Outcome, Protocol,
    Region,
};
use std::collections::VecDeque;
use tracing::{debug, error, info};

/// View state behind the country dialog.
///
/// Only the UI thread mutates it. Lookups report back as [`Completion`]s and
/// every dialog session gets a fresh epoch, so answers that arrive after their
/// dialog closed are dropped instead of leaking into the next session.
#[derive(Debug, Default)]
pub struct Dashboard {
    selection: Vec<String>,
    display_items: Vec<DisplayItem>,
    /// Pending choice, consumed by `invoke_popup`
    chosen: Option<Protocol>,
    protocol: Option<Protocol>,
    calls: u32,
    records: Vec<CountryRecord>,
    dialog_open: bool,
    epoch: u64,
    alerts: VecDeque<String>,
}

impl Dashboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the selection and rebuild the display items from scratch
    pub fn update_selection(&mut self, selection: Vec<String>, regions: &[Region]) {
        self.display_items = resolve_display_items(&selection, regions);
        self.selection = selection;
        self.records.clear();
        debug!(
            selected = self.selection.len(),
            resolved = self.display_items.len(),
            "selection changed"
        );
    }

    pub fn choose_protocol(&mut self, choice: &str) {
        self.chosen = Some(Protocol::from_choice(choice));
    }

    /// Open the dialog for the chosen protocol.
    ///
    /// Needs a pending protocol choice and at least one display item;
    /// otherwise the choice is discarded and nothing is fetched. An already
    /// open dialog keeps its protocol.
    pub fn invoke_popup(&mut self) -> Option<FetchRun> {
        if self.dialog_open {
            debug!("dialog already open, protocol choice ignored");
            self.chosen = None;
            return None;
        }

        let protocol = match self.chosen {
            Some(protocol) if !self.display_items.is_empty() => protocol,
            _ => {
                self.chosen = None;
                return None;
            }
        };

        self.protocol = Some(protocol);
        self.calls = 0;
        self.records.clear();
        self.epoch = self.epoch.wrapping_add(1);
        self.dialog_open = true;
        info!(epoch = self.epoch, %protocol, "dialog opened");

        Some(FetchRun {
            epoch: self.epoch,
            protocol,
            items: self.display_items.clone(),
        })
    }

    /// Close the dialog, discarding its records and any answers still in flight
    pub fn close_dialog(&mut self) {
        self.chosen = None;
        if !self.dialog_open {
            return;
        }
        self.dialog_open = false;
        self.records.clear();
        self.epoch = self.epoch.wrapping_add(1);
        debug!(epoch = self.epoch, "dialog closed");
    }

    /// Apply a finished request. Returns false when it belonged to an older session.
    pub fn apply(&mut self, completion: Completion) -> bool {
        if completion.epoch != self.epoch || !self.dialog_open {
            debug!(
                stale = completion.epoch,
                current = self.epoch,
                "dropping answer from a closed dialog"
            );
            return false;
        }

        match completion.outcome {
            Outcome::Country(record) => {
                self.calls += 1;
                self.records.push(record);
            }
            Outcome::CountryFailed { code, error } => {
                error!(%code, %error, "REST country lookup failed");
                self.alerts.push_back(format!("Error fetching {code}: {error}"));
            }
            Outcome::Countries(records) => {
                self.calls += 1;
                self.records.extend(records);
            }
            Outcome::QueryFailed(error) => {
                error!(%error, "GraphQL country query failed");
            }
        }
        true
    }

    /// "Protocol: {protocol} - Calls Made: {calls}"
    pub fn title(&self) -> String {
        let protocol = self
            .protocol
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string());
        format!("Protocol: {} - Calls Made: {}", protocol, self.calls)
    }

    pub fn selection(&self) -> &[String] {
        &self.selection
    }

    pub fn display_items(&self) -> &[DisplayItem] {
        &self.display_items
    }

    pub fn records(&self) -> &[CountryRecord] {
        &self.records
    }

    pub fn calls(&self) -> u32 {
        self.calls
    }

    pub fn protocol(&self) -> Option<Protocol> {
        self.protocol
    }

    pub fn is_dialog_open(&self) -> bool {
        self.dialog_open
    }

    /// Oldest alert not yet dismissed
    pub fn front_alert(&self) -> Option<&str> {
        self.alerts.front().map(String::as_str)
    }

    pub fn dismiss_alert(&mut self) -> Option<String> {
        self.alerts.pop_front()
    }

    pub fn pending_alerts(&self) -> usize {
        self.alerts.len()
    }
}
