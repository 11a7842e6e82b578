// Shell boundary: window lifecycle flags and UI event dispatch

use crate::error::Result;
use crate::models::{Category, Filter, Priority, SortKey, Stats, Task, TaskDraft};
use crate::store::TaskStore;
use crate::transfer::{CSV_EXPORT_NAME, JSON_EXPORT_NAME};
use chrono::NaiveDate;
use tracing::{debug, info};

/// A user or shell action forwarded into the task store.
///
/// One variant per wired-up control in the original window, plus the three
/// entrypoints the tray/hotkey host calls (`ToggleVisibility`,
/// `MinimizeWindow`, `Quit`).
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Add {
        text: String,
        category: Category,
        priority: Priority,
        due_date: Option<NaiveDate>,
    },
    Toggle(i64),
    Delete(i64),
    Edit(i64),
    ClearCompleted,
    Query,
    Stats,
    ExportJson,
    ExportCsv,
    Import(String),
    SetFilter(Filter),
    SetSort(SortKey),
    SetSearch(String),
    ToggleTheme,
    ToggleVisibility,
    MinimizeWindow,
    Quit,
}

/// What the renderer gets back from a dispatched event.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Added(Task),
    Toggled(Option<Task>),
    Deleted(bool),
    EditDraft(Option<TaskDraft>),
    Cleared(usize),
    List(Vec<Task>),
    Counters(Stats),
    /// Export payload plus the download name it should be written under.
    Exported { filename: &'static str, content: String },
    Imported(usize),
    FilterSet(Filter),
    SortSet(SortKey),
    SearchSet,
    ThemeSet(bool),
    Visibility(bool),
    Minimized,
    Quitting,
}

/// Process-wide lifecycle object owning the task store and the window-state
/// flags the tray host used to keep as globals.
///
/// Events are routed to store calls through [`dispatch`](Self::dispatch), the
/// moral equivalent of the original listener wiring: resolved once at init,
/// one arm per control. Errors coming back are recoverable; callers surface
/// them as a transient warning and keep running.
pub struct Shell {
    store: TaskStore,
    visible: bool,
    is_quitting: bool,
}

impl Shell {
    pub fn init(store: TaskStore) -> Self {
        debug!("Shell initialized");
        Self {
            store,
            visible: true,
            is_quitting: false,
        }
    }

    /// Marks the process as quitting, as the tray's "Sair" entry does before
    /// the window is allowed to close for real.
    pub fn shutdown(&mut self) {
        self.is_quitting = true;
        info!("Shell shutting down");
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn is_quitting(&self) -> bool {
        self.is_quitting
    }

    pub fn dispatch(&mut self, event: Event) -> Result<Reply> {
        match event {
            Event::Add {
                text,
                category,
                priority,
                due_date,
            } => {
                let task = self.store.add(&text, category, priority, due_date)?;
                Ok(Reply::Added(task))
            }
            Event::Toggle(id) => Ok(Reply::Toggled(self.store.toggle_completed(id)?)),
            Event::Delete(id) => Ok(Reply::Deleted(self.store.delete(id)?)),
            Event::Edit(id) => Ok(Reply::EditDraft(self.store.begin_edit(id)?)),
            Event::ClearCompleted => Ok(Reply::Cleared(self.store.clear_completed()?)),
            Event::Query => Ok(Reply::List(self.store.query())),
            Event::Stats => Ok(Reply::Counters(self.store.stats())),
            Event::ExportJson => Ok(Reply::Exported {
                filename: JSON_EXPORT_NAME,
                content: self.store.export_json()?,
            }),
            Event::ExportCsv => Ok(Reply::Exported {
                filename: CSV_EXPORT_NAME,
                content: self.store.export_csv()?,
            }),
            Event::Import(raw) => Ok(Reply::Imported(self.store.import_json(&raw)?)),
            Event::SetFilter(filter) => {
                self.store.set_filter(filter)?;
                Ok(Reply::FilterSet(filter))
            }
            Event::SetSort(sort) => {
                self.store.set_sort(sort)?;
                Ok(Reply::SortSet(sort))
            }
            Event::SetSearch(search) => {
                self.store.set_search(&search);
                Ok(Reply::SearchSet)
            }
            Event::ToggleTheme => Ok(Reply::ThemeSet(self.store.toggle_theme()?)),
            Event::ToggleVisibility => {
                self.visible = !self.visible;
                debug!(visible = self.visible, "Window visibility toggled");
                Ok(Reply::Visibility(self.visible))
            }
            Event::MinimizeWindow => Ok(Reply::Minimized),
            Event::Quit => {
                self.shutdown();
                Ok(Reply::Quitting)
            }
        }
    }
}
