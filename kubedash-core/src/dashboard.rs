//! Dashboard state machine
//!
//! All mutable dashboard state lives in [`DashboardState`] and changes only in
//! [`reduce`]. Work that needs the cluster is returned as [`Effect`]s; the
//! runtime executes them and feeds each result back as exactly one [`Event`].
//!
//! Every request carries a [`Ticket`]. A tab remembers the ticket of the last
//! request it issued and drops any completion carrying another one, so a slow
//! response for an old selection can never overwrite a newer one.

use tracing::debug;

use crate::client::CollaboratorError;
use crate::doctor::AnalysisResult;
use crate::events::EventSection;
use crate::fetch::LogSection;
use crate::resource::{ResourceItem, ResourceKind};
use crate::text::{TextLine, doctor_lines, error_lines, events_lines, logs_lines};

pub const MIN_LIST_WIDTH: u16 = 30;
pub const MIN_DETAILS_WIDTH: u16 = 40;
pub const MIN_HEIGHT: u16 = 10;
pub const MIN_VIEWPORT_HEIGHT: u16 = 5;

/// Rows taken by the tab bar and the detail borders.
const DETAILS_CHROME_HEIGHT: u16 = 4;
const DETAILS_BORDER_WIDTH: u16 = 2;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Tab {
    #[default]
    Overview,
    Logs,
    Events,
    Doctor,
}

impl Tab {
    pub const ALL: [Tab; 4] = [Tab::Overview, Tab::Logs, Tab::Events, Tab::Doctor];

    pub fn index(&self) -> usize {
        match self {
            Tab::Overview => 0,
            Tab::Logs => 1,
            Tab::Events => 2,
            Tab::Doctor => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<Tab> {
        Self::ALL.get(index).copied()
    }

    pub fn next(&self) -> Tab {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(&self) -> Tab {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tab::Overview => "Overview",
            Tab::Logs => "Logs",
            Tab::Events => "Events",
            Tab::Doctor => "Doctor",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Pane {
    #[default]
    List,
    Details,
}

/// Keyboard input, independent of the terminal library.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Tab,
    BackTab,
    Left,
    Right,
    Up,
    Down,
    PageUp,
    PageDown,
    Home,
    End,
    Enter,
    Char(char),
    /// Ctrl+C
    Interrupt,
}

/// Identifier of one fetch request. Strictly increasing per dashboard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl Ticket {
    pub fn value(&self) -> u64 {
        self.0
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Layout {
    pub width: u16,
    pub height: u16,
    pub list_width: u16,
    pub details_width: u16,
    pub viewport_height: u16,
}

impl Layout {
    pub fn compute(width: u16, height: u16) -> Self {
        let list_width = (width / 3).max(MIN_LIST_WIDTH);
        let details_width = width
            .saturating_sub(list_width)
            .saturating_sub(DETAILS_BORDER_WIDTH);
        let viewport_height = height
            .saturating_sub(DETAILS_CHROME_HEIGHT)
            .max(MIN_VIEWPORT_HEIGHT);
        Self {
            width,
            height,
            list_width,
            details_width,
            viewport_height,
        }
    }

    pub fn too_small(&self) -> bool {
        self.width < MIN_LIST_WIDTH + MIN_DETAILS_WIDTH || self.height < MIN_HEIGHT
    }
}

/// Scrollable content of one tab. `scroll` counts display rows, the lines
/// wrapped at the detail pane width.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Viewport {
    pub scroll: usize,
    pub lines: Vec<TextLine>,
    rows: Vec<TextLine>,
    width: u16,
    latest_requested: Option<Ticket>,
    loaded: Option<Ticket>,
    failed: bool,
}

impl Viewport {
    /// A request is outstanding whose result has not been shown yet.
    pub fn is_pending(&self) -> bool {
        self.latest_requested.is_some() && self.latest_requested != self.loaded
    }

    pub fn failed(&self) -> bool {
        self.failed
    }

    pub fn loaded_ticket(&self) -> Option<Ticket> {
        self.loaded
    }

    fn accepts(&self, ticket: Ticket) -> bool {
        self.latest_requested == Some(ticket)
    }

    /// Content as drawn: every line wrapped to the pane width.
    pub fn rows(&self) -> &[TextLine] {
        &self.rows
    }

    fn replace(&mut self, ticket: Ticket, lines: Vec<TextLine>, failed: bool, width: u16) {
        self.lines = lines;
        self.width = width;
        self.rewrap();
        self.scroll = 0;
        self.loaded = Some(ticket);
        self.failed = failed;
    }

    fn set_width(&mut self, width: u16) {
        if self.width != width {
            self.width = width;
            self.rewrap();
        }
    }

    fn rewrap(&mut self) {
        let width = self.width as usize;
        self.rows = self.lines.iter().flat_map(|l| l.wrap(width)).collect();
    }

    pub fn max_scroll(&self, height: u16) -> usize {
        self.rows.len().saturating_sub(height as usize)
    }

    fn scroll_to(&mut self, target: usize, height: u16) {
        self.scroll = target.min(self.max_scroll(height));
    }

    fn scroll_by(&mut self, delta: isize, height: u16) {
        let target = self.scroll.saturating_add_signed(delta);
        self.scroll_to(target, height);
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Enter on the list: name of the selected resource.
    Chosen(String),
    /// Quit or interrupt.
    Dismissed,
}

#[derive(Clone, Debug)]
pub enum Event {
    Resize {
        width: u16,
        height: u16,
    },
    Key(Key),
    /// Auto-refresh timer.
    Tick,
    ResourcesFetched {
        ticket: Ticket,
        result: Result<Vec<ResourceItem>, CollaboratorError>,
    },
    LogsFetched {
        ticket: Ticket,
        resource: String,
        result: Result<Vec<LogSection>, CollaboratorError>,
    },
    EventsFetched {
        ticket: Ticket,
        resource: String,
        result: Result<Vec<EventSection>, CollaboratorError>,
    },
    DoctorFetched {
        ticket: Ticket,
        result: Result<AnalysisResult, CollaboratorError>,
    },
}

/// Work the runtime must schedule. Each effect yields one completion event.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    FetchResources { ticket: Ticket, kind: ResourceKind },
    FetchLogs { ticket: Ticket, item: ResourceItem },
    FetchEvents { ticket: Ticket, item: ResourceItem },
    FetchDoctor { ticket: Ticket, item: ResourceItem },
}

impl Effect {
    pub fn ticket(&self) -> Ticket {
        match self {
            Effect::FetchResources { ticket, .. }
            | Effect::FetchLogs { ticket, .. }
            | Effect::FetchEvents { ticket, .. }
            | Effect::FetchDoctor { ticket, .. } => *ticket,
        }
    }
}

#[derive(Clone, Debug)]
pub struct DashboardState {
    pub kind: ResourceKind,
    pub items: Vec<ResourceItem>,
    pub selected: usize,
    pub pane: Pane,
    pub tab: Tab,
    pub logs: Viewport,
    pub events: Viewport,
    pub doctor: Viewport,
    pub doctor_loading: bool,
    pub analysis: Option<AnalysisResult>,
    /// Last resource list error, shown in the list pane.
    pub last_error: Option<String>,
    pub layout: Layout,
    /// False until the first resize.
    pub ready: bool,
    pub outcome: Option<Outcome>,
    pub auto_refresh: bool,
    next_ticket: u64,
    resources_requested: Option<Ticket>,
    resources_loaded: Option<Ticket>,
}

impl DashboardState {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            items: Vec::new(),
            selected: 0,
            pane: Pane::List,
            tab: Tab::Overview,
            logs: Viewport::default(),
            events: Viewport::default(),
            doctor: Viewport::default(),
            doctor_loading: false,
            analysis: None,
            last_error: None,
            layout: Layout::default(),
            ready: false,
            outcome: None,
            auto_refresh: false,
            next_ticket: 0,
            resources_requested: None,
            resources_loaded: None,
        }
    }

    pub fn with_auto_refresh(mut self, enabled: bool) -> Self {
        self.auto_refresh = enabled;
        self
    }

    pub fn selected_item(&self) -> Option<&ResourceItem> {
        self.items.get(self.selected)
    }

    pub fn viewport(&self, tab: Tab) -> Option<&Viewport> {
        match tab {
            Tab::Overview => None,
            Tab::Logs => Some(&self.logs),
            Tab::Events => Some(&self.events),
            Tab::Doctor => Some(&self.doctor),
        }
    }

    fn viewport_mut(&mut self, tab: Tab) -> Option<&mut Viewport> {
        match tab {
            Tab::Overview => None,
            Tab::Logs => Some(&mut self.logs),
            Tab::Events => Some(&mut self.events),
            Tab::Doctor => Some(&mut self.doctor),
        }
    }

    pub fn resources_pending(&self) -> bool {
        self.resources_requested.is_some() && self.resources_requested != self.resources_loaded
    }

    pub fn is_done(&self) -> bool {
        self.outcome.is_some()
    }

    fn issue_ticket(&mut self) -> Ticket {
        self.next_ticket += 1;
        Ticket(self.next_ticket)
    }

    fn request_resources(&mut self) -> Effect {
        let ticket = self.issue_ticket();
        self.resources_requested = Some(ticket);
        Effect::FetchResources {
            ticket,
            kind: self.kind,
        }
    }

    /// Schedule the fetch backing `tab` for the current selection.
    fn request_tab(&mut self, tab: Tab) -> Option<Effect> {
        if tab == Tab::Overview {
            return None;
        }
        let item = self.selected_item()?.clone();
        let ticket = self.issue_ticket();
        if let Some(viewport) = self.viewport_mut(tab) {
            viewport.latest_requested = Some(ticket);
        }
        debug!(tab = tab.label(), resource = item.name(), ticket = ticket.0, "requesting tab content");

        Some(match tab {
            Tab::Logs => Effect::FetchLogs { ticket, item },
            Tab::Events => Effect::FetchEvents { ticket, item },
            _ => {
                self.doctor_loading = true;
                self.analysis = None;
                Effect::FetchDoctor { ticket, item }
            }
        })
    }
}

/// Fresh state and the effects to run at startup.
pub fn init(kind: ResourceKind, auto_refresh: bool) -> (DashboardState, Vec<Effect>) {
    let mut state = DashboardState::new(kind).with_auto_refresh(auto_refresh);
    let effects = vec![state.request_resources()];
    (state, effects)
}

pub fn reduce(state: &mut DashboardState, event: Event) -> Vec<Effect> {
    if state.is_done() {
        return Vec::new();
    }

    match event {
        Event::Resize { width, height } => on_resize(state, width, height),
        Event::Key(key) => on_key(state, key),
        Event::Tick => {
            if state.auto_refresh && !state.resources_pending() {
                vec![state.request_resources()]
            } else {
                Vec::new()
            }
        }
        Event::ResourcesFetched { ticket, result } => on_resources(state, ticket, result),
        Event::LogsFetched {
            ticket,
            resource,
            result,
        } => {
            if !state.logs.accepts(ticket) {
                debug!(ticket = ticket.0, "discarding superseded logs result");
                return Vec::new();
            }
            let (lines, failed) = match result {
                Ok(sections) => (logs_lines(&resource, &sections), false),
                Err(e) => (error_lines("fetching logs", &e), true),
            };
            let width = state.layout.details_width;
            state.logs.replace(ticket, lines, failed, width);
            Vec::new()
        }
        Event::EventsFetched {
            ticket,
            resource,
            result,
        } => {
            if !state.events.accepts(ticket) {
                debug!(ticket = ticket.0, "discarding superseded events result");
                return Vec::new();
            }
            let (lines, failed) = match result {
                Ok(sections) => (events_lines(&resource, &sections), false),
                Err(e) => (error_lines("fetching events", &e), true),
            };
            let width = state.layout.details_width;
            state.events.replace(ticket, lines, failed, width);
            Vec::new()
        }
        Event::DoctorFetched { ticket, result } => {
            if !state.doctor.accepts(ticket) {
                debug!(ticket = ticket.0, "discarding superseded doctor result");
                return Vec::new();
            }
            state.doctor_loading = false;
            let width = state.layout.details_width;
            match result {
                Ok(analysis) => {
                    let lines = doctor_lines(&analysis);
                    state.analysis = Some(analysis);
                    state.doctor.replace(ticket, lines, false, width);
                }
                Err(e) => {
                    state.analysis = None;
                    let lines = error_lines("performing doctor analysis", &e);
                    state.doctor.replace(ticket, lines, true, width);
                }
            }
            Vec::new()
        }
    }
}

fn on_resize(state: &mut DashboardState, width: u16, height: u16) -> Vec<Effect> {
    state.layout = Layout::compute(width, height);
    state.ready = true;

    let height = state.layout.viewport_height;
    let width = state.layout.details_width;
    for tab in [Tab::Logs, Tab::Events, Tab::Doctor] {
        if let Some(viewport) = state.viewport_mut(tab) {
            viewport.set_width(width);
            let scroll = viewport.scroll;
            viewport.scroll_to(scroll, height);
        }
    }

    let mut effects = Vec::new();
    if state.last_error.is_some() && !state.resources_pending() {
        effects.push(state.request_resources());
    }
    let tab = state.tab;
    let retry_tab = state
        .viewport(tab)
        .is_some_and(|v| v.failed() && !v.is_pending());
    if retry_tab {
        effects.extend(state.request_tab(tab));
    }
    effects
}

fn on_key(state: &mut DashboardState, key: Key) -> Vec<Effect> {
    match key {
        Key::Interrupt | Key::Char('q') => {
            state.outcome = Some(Outcome::Dismissed);
            Vec::new()
        }
        Key::Tab => switch_tab(state, state.tab.next()),
        Key::BackTab => switch_tab(state, state.tab.prev()),
        Key::Char(c @ '1'..='4') => {
            let index = c as usize - '1' as usize;
            match Tab::from_index(index) {
                Some(tab) => switch_tab(state, tab),
                None => Vec::new(),
            }
        }
        Key::Enter => {
            if state.pane == Pane::List {
                if let Some(item) = state.selected_item() {
                    state.outcome = Some(Outcome::Chosen(item.name().to_string()));
                }
            }
            Vec::new()
        }
        Key::Left => {
            state.pane = Pane::List;
            Vec::new()
        }
        Key::Right => {
            state.pane = Pane::Details;
            Vec::new()
        }
        Key::Char('r') => vec![state.request_resources()],
        nav => match state.pane {
            Pane::List => move_selection(state, nav),
            Pane::Details => {
                scroll_details(state, nav);
                Vec::new()
            }
        },
    }
}

fn switch_tab(state: &mut DashboardState, tab: Tab) -> Vec<Effect> {
    state.tab = tab;
    state.request_tab(tab).into_iter().collect()
}

fn move_selection(state: &mut DashboardState, key: Key) -> Vec<Effect> {
    let len = state.items.len();
    if len == 0 {
        return Vec::new();
    }
    let last = len - 1;
    let page = state.layout.viewport_height.max(1) as usize;
    let current = state.selected;

    let next = match key {
        Key::Up | Key::Char('k') => current.saturating_sub(1),
        Key::Down | Key::Char('j') => (current + 1).min(last),
        Key::PageUp => current.saturating_sub(page),
        Key::PageDown => (current + page).min(last),
        Key::Home | Key::Char('g') => 0,
        Key::End | Key::Char('G') => last,
        _ => current,
    };

    if next == current {
        return Vec::new();
    }
    state.selected = next;
    let tab = state.tab;
    state.request_tab(tab).into_iter().collect()
}

fn scroll_details(state: &mut DashboardState, key: Key) {
    let height = state.layout.viewport_height;
    let page = height.max(1) as isize;
    let tab = state.tab;
    let Some(viewport) = state.viewport_mut(tab) else {
        return;
    };

    match key {
        Key::Up | Key::Char('k') => viewport.scroll_by(-1, height),
        Key::Down | Key::Char('j') => viewport.scroll_by(1, height),
        Key::PageUp => viewport.scroll_by(-page, height),
        Key::PageDown => viewport.scroll_by(page, height),
        Key::Home | Key::Char('g') => viewport.scroll_to(0, height),
        Key::End | Key::Char('G') => viewport.scroll_to(usize::MAX, height),
        _ => {}
    }
}

fn on_resources(
    state: &mut DashboardState,
    ticket: Ticket,
    result: Result<Vec<ResourceItem>, CollaboratorError>,
) -> Vec<Effect> {
    if state.resources_requested != Some(ticket) {
        debug!(ticket = ticket.0, "discarding superseded resource list");
        return Vec::new();
    }
    state.resources_loaded = Some(ticket);

    let items = match result {
        Ok(items) => items,
        Err(e) => {
            debug!(error = %e, "resource list failed");
            state.last_error = Some(e.to_string());
            return Vec::new();
        }
    };

    let previous = state.selected_item().map(|i| i.name().to_string());
    state.last_error = None;
    state.items = items;
    state.selected = previous
        .as_deref()
        .and_then(|name| state.items.iter().position(|i| i.name() == name))
        .unwrap_or_else(|| state.selected.min(state.items.len().saturating_sub(1)));

    let current = state.selected_item().map(|i| i.name().to_string());
    if current.is_some() && current != previous {
        let tab = state.tab;
        return state.request_tab(tab).into_iter().collect();
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Pod;

    fn pods(names: &[&str]) -> Vec<ResourceItem> {
        names
            .iter()
            .map(|n| ResourceItem::Pod(Pod::new(n, "Running")))
            .collect()
    }

    fn loaded(names: &[&str]) -> DashboardState {
        let (mut state, effects) = init(ResourceKind::Pod, false);
        let ticket = effects[0].ticket();
        reduce(&mut state, Event::Resize { width: 120, height: 40 });
        reduce(
            &mut state,
            Event::ResourcesFetched {
                ticket,
                result: Ok(pods(names)),
            },
        );
        state
    }

    fn logs_done(ticket: Ticket, text: &str) -> Event {
        Event::LogsFetched {
            ticket,
            resource: "api".into(),
            result: Ok(vec![LogSection {
                title: "Container: app".into(),
                text: Ok(text.into()),
            }]),
        }
    }

    fn shows(viewport: &Viewport, needle: &str) -> bool {
        viewport.lines.iter().any(|l| l.content() == needle)
    }

    #[test]
    fn test_init_requests_resource_list() {
        let (state, effects) = init(ResourceKind::PipelineRun, false);
        assert!(!state.ready);
        assert_eq!(state.tab, Tab::Overview);
        assert_eq!(state.pane, Pane::List);
        assert!(matches!(
            effects.as_slice(),
            [Effect::FetchResources {
                kind: ResourceKind::PipelineRun,
                ..
            }]
        ));
    }

    #[test]
    fn test_layout() {
        let layout = Layout::compute(100, 30);
        assert_eq!(layout.list_width, 33);
        assert_eq!(layout.details_width, 65);
        assert_eq!(layout.viewport_height, 26);
        assert!(!layout.too_small());

        let narrow = Layout::compute(60, 8);
        assert_eq!(narrow.list_width, MIN_LIST_WIDTH);
        assert_eq!(narrow.viewport_height, MIN_VIEWPORT_HEIGHT);
        assert!(narrow.too_small());
    }

    #[test]
    fn test_tab_cycle() {
        let mut state = loaded(&["api"]);
        let mut seen = Vec::new();
        for _ in 0..4 {
            reduce(&mut state, Event::Key(Key::Tab));
            seen.push(state.tab);
        }
        assert_eq!(seen, vec![Tab::Logs, Tab::Events, Tab::Doctor, Tab::Overview]);
        reduce(&mut state, Event::Key(Key::BackTab));
        assert_eq!(state.tab, Tab::Doctor);
    }

    #[test]
    fn test_overview_needs_no_fetch() {
        let mut state = loaded(&["api"]);
        state.tab = Tab::Doctor;
        assert!(reduce(&mut state, Event::Key(Key::Char('1'))).is_empty());
        assert_eq!(state.tab, Tab::Overview);
    }

    #[test]
    fn test_direct_tab_keys_schedule_fetches() {
        let mut state = loaded(&["api"]);
        let effects = reduce(&mut state, Event::Key(Key::Char('2')));
        assert!(matches!(effects.as_slice(), [Effect::FetchLogs { .. }]));
        let effects = reduce(&mut state, Event::Key(Key::Char('4')));
        assert!(matches!(effects.as_slice(), [Effect::FetchDoctor { .. }]));
        assert!(state.doctor_loading);
        assert!(reduce(&mut state, Event::Key(Key::Char('5'))).is_empty());
    }

    #[test]
    fn test_tab_without_items_does_nothing() {
        let (mut state, _) = init(ResourceKind::Pod, false);
        assert!(reduce(&mut state, Event::Key(Key::Char('3'))).is_empty());
        assert_eq!(state.tab, Tab::Events);
    }

    #[test]
    fn test_stale_completion_is_discarded() {
        let mut state = loaded(&["api", "worker"]);
        let first = reduce(&mut state, Event::Key(Key::Char('2')))[0].ticket();
        let second = reduce(&mut state, Event::Key(Key::Down))[0].ticket();
        assert!(second > first);

        reduce(&mut state, logs_done(second, "new"));
        reduce(&mut state, logs_done(first, "old"));
        assert!(shows(&state.logs, "new"));
        assert!(!shows(&state.logs, "old"));
        assert_eq!(state.logs.loaded_ticket(), Some(second));
    }

    #[test]
    fn test_old_completion_before_new_is_not_shown() {
        let mut state = loaded(&["api", "worker"]);
        let first = reduce(&mut state, Event::Key(Key::Char('2')))[0].ticket();
        let second = reduce(&mut state, Event::Key(Key::Down))[0].ticket();

        reduce(&mut state, logs_done(first, "old"));
        assert!(!shows(&state.logs, "old"));
        assert!(state.logs.is_pending());
        reduce(&mut state, logs_done(second, "new"));
        assert!(shows(&state.logs, "new"));
        assert!(!state.logs.is_pending());
    }

    #[test]
    fn test_pane_switch_has_no_side_effect() {
        let mut state = loaded(&["api"]);
        assert!(reduce(&mut state, Event::Key(Key::Right)).is_empty());
        assert_eq!(state.pane, Pane::Details);
        assert!(reduce(&mut state, Event::Key(Key::Left)).is_empty());
        assert_eq!(state.pane, Pane::List);
    }

    #[test]
    fn test_navigation_routed_by_pane() {
        let mut state = loaded(&["a", "b", "c"]);
        reduce(&mut state, Event::Key(Key::Char('2')));
        let ticket = state.logs.latest_requested.unwrap();
        let text: String = (0..100).map(|i| format!("line {}\n", i)).collect();
        reduce(&mut state, logs_done(ticket, &text));

        reduce(&mut state, Event::Key(Key::Right));
        assert!(reduce(&mut state, Event::Key(Key::Down)).is_empty());
        assert_eq!(state.selected, 0);
        assert_eq!(state.logs.scroll, 1);
        reduce(&mut state, Event::Key(Key::End));
        assert_eq!(state.logs.scroll, state.logs.max_scroll(state.layout.viewport_height));

        reduce(&mut state, Event::Key(Key::Left));
        reduce(&mut state, Event::Key(Key::Down));
        assert_eq!(state.selected, 1);
    }

    #[test]
    fn test_scroll_counts_wrapped_rows() {
        let mut state = loaded(&["api"]);
        reduce(&mut state, Event::Key(Key::Char('2')));
        let ticket = state.logs.latest_requested.unwrap();
        let long = "x".repeat(157);
        let mut text: String = (0..41).map(|i| format!("line{} {}\n", i, long)).collect();
        text.push_str("final-line\n");
        reduce(&mut state, logs_done(ticket, &text));
        assert!(state.logs.rows().len() > state.logs.lines.len());

        reduce(&mut state, Event::Key(Key::Right));
        reduce(&mut state, Event::Key(Key::End));
        let height = state.layout.viewport_height as usize;
        let rows = state.logs.rows();
        assert_eq!(state.logs.scroll + height, rows.len());
        assert!(rows[state.logs.scroll..].iter().any(|r| r.content() == "final-line"));

        let before = rows.len();
        reduce(&mut state, Event::Resize { width: 90, height: 40 });
        let width = state.layout.details_width as usize;
        assert!(state.logs.rows().len() > before);
        assert!(state.logs.rows().iter().all(|r| r.width() <= width));
        assert!(state.logs.scroll <= state.logs.max_scroll(state.layout.viewport_height));
    }

    #[test]
    fn test_list_navigation_on_overview_fetches_nothing() {
        let mut state = loaded(&["a", "b"]);
        assert!(reduce(&mut state, Event::Key(Key::Char('j'))).is_empty());
        assert_eq!(state.selected, 1);
        assert!(reduce(&mut state, Event::Key(Key::Down)).is_empty());
        assert_eq!(state.selected, 1);
    }

    #[test]
    fn test_enter_commits_only_from_list() {
        let mut state = loaded(&["a", "b"]);
        reduce(&mut state, Event::Key(Key::Right));
        reduce(&mut state, Event::Key(Key::Enter));
        assert!(state.outcome.is_none());

        reduce(&mut state, Event::Key(Key::Left));
        reduce(&mut state, Event::Key(Key::Down));
        reduce(&mut state, Event::Key(Key::Enter));
        assert_eq!(state.outcome, Some(Outcome::Chosen("b".into())));
        assert!(reduce(&mut state, Event::Key(Key::Up)).is_empty());
    }

    #[test]
    fn test_enter_on_empty_list_is_ignored() {
        let (mut state, _) = init(ResourceKind::Pod, false);
        reduce(&mut state, Event::Key(Key::Enter));
        assert!(state.outcome.is_none());
    }

    #[test]
    fn test_quit_and_interrupt() {
        let mut state = loaded(&["a"]);
        reduce(&mut state, Event::Key(Key::Char('q')));
        assert_eq!(state.outcome, Some(Outcome::Dismissed));

        let mut state = loaded(&["a"]);
        reduce(&mut state, Event::Key(Key::Right));
        reduce(&mut state, Event::Key(Key::Interrupt));
        assert_eq!(state.outcome, Some(Outcome::Dismissed));
    }

    #[test]
    fn test_list_error_kept_until_retry() {
        let (mut state, effects) = init(ResourceKind::Pod, false);
        reduce(
            &mut state,
            Event::ResourcesFetched {
                ticket: effects[0].ticket(),
                result: Err(CollaboratorError::command("get pods", "connection refused")),
            },
        );
        assert_eq!(
            state.last_error.as_deref(),
            Some("get pods: connection refused")
        );

        let effects = reduce(&mut state, Event::Resize { width: 100, height: 30 });
        assert!(matches!(effects.as_slice(), [Effect::FetchResources { .. }]));
        reduce(
            &mut state,
            Event::ResourcesFetched {
                ticket: effects[0].ticket(),
                result: Ok(pods(&["a"])),
            },
        );
        assert!(state.last_error.is_none());
        assert!(reduce(&mut state, Event::Resize { width: 100, height: 30 }).is_empty());
    }

    #[test]
    fn test_resize_retries_failed_tab() {
        let mut state = loaded(&["a"]);
        let ticket = reduce(&mut state, Event::Key(Key::Char('3')))[0].ticket();
        reduce(
            &mut state,
            Event::EventsFetched {
                ticket,
                resource: "a".into(),
                result: Err(CollaboratorError::command("get events", "timeout")),
            },
        );
        assert!(state.events.failed());
        assert!(shows(&state.events, "Error fetching events: get events: timeout"));

        let effects = reduce(&mut state, Event::Resize { width: 100, height: 30 });
        assert!(matches!(effects.as_slice(), [Effect::FetchEvents { .. }]));
    }

    #[test]
    fn test_doctor_error_clears_loading() {
        let mut state = loaded(&["a"]);
        let ticket = reduce(&mut state, Event::Key(Key::Char('4')))[0].ticket();
        reduce(
            &mut state,
            Event::DoctorFetched {
                ticket,
                result: Err(CollaboratorError::not_found("pod a")),
            },
        );
        assert!(!state.doctor_loading);
        assert!(state.analysis.is_none());
        assert!(shows(
            &state.doctor,
            "Error performing doctor analysis: pod a not found"
        ));
    }

    #[test]
    fn test_refresh_keeps_selection_by_name() {
        let mut state = loaded(&["a", "b", "c"]);
        reduce(&mut state, Event::Key(Key::Down));
        let ticket = reduce(&mut state, Event::Key(Key::Char('r')))[0].ticket();
        reduce(
            &mut state,
            Event::ResourcesFetched {
                ticket,
                result: Ok(pods(&["new", "a", "b", "c"])),
            },
        );
        assert_eq!(state.selected_item().map(|i| i.name()), Some("b"));
    }

    #[test]
    fn test_refresh_refetches_when_selection_disappears() {
        let mut state = loaded(&["a", "b"]);
        reduce(&mut state, Event::Key(Key::Down));
        reduce(&mut state, Event::Key(Key::Char('2')));
        let ticket = reduce(&mut state, Event::Key(Key::Char('r')))[0].ticket();
        let effects = reduce(
            &mut state,
            Event::ResourcesFetched {
                ticket,
                result: Ok(pods(&["a"])),
            },
        );
        assert_eq!(state.selected, 0);
        assert!(matches!(effects.as_slice(), [Effect::FetchLogs { item, .. }] if item.name() == "a"));
    }

    #[test]
    fn test_superseded_list_is_discarded() {
        let mut state = loaded(&["a"]);
        let old = reduce(&mut state, Event::Key(Key::Char('r')))[0].ticket();
        let new = reduce(&mut state, Event::Key(Key::Char('r')))[0].ticket();
        reduce(
            &mut state,
            Event::ResourcesFetched {
                ticket: new,
                result: Ok(pods(&["fresh"])),
            },
        );
        reduce(
            &mut state,
            Event::ResourcesFetched {
                ticket: old,
                result: Ok(pods(&["stale"])),
            },
        );
        assert_eq!(state.items[0].name(), "fresh");
    }

    #[test]
    fn test_tick_refresh() {
        let (mut state, _) = init(ResourceKind::Pod, true);
        assert!(reduce(&mut state, Event::Tick).is_empty());

        let mut state = loaded(&["a"]);
        assert!(reduce(&mut state, Event::Tick).is_empty());
        state.auto_refresh = true;
        let effects = reduce(&mut state, Event::Tick);
        assert_eq!(effects.len(), 1);
        assert!(reduce(&mut state, Event::Tick).is_empty());
    }
}
