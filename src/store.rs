// Task-list state manager: collection, filter/search/sort state, persistence

use crate::error::{Result, StoreError};
use crate::kv::TextStore;
use crate::models::{Filter, SortKey, Stats, Task, TaskDraft, now_ms};
use crate::transfer;
use chrono::{NaiveDate, Utc};
use rand::Rng;
use std::path::Path;
use tracing::{debug, info, warn};

const KEY_TASKS: &str = "tasks";
const KEY_FILTER: &str = "tm_currentFilter";
const KEY_SORT: &str = "tm_sortBy";
const KEY_THEME: &str = "darkMode";

/// Owns the in-memory task collection plus the active filter, search string,
/// sort key, and theme flag.
///
/// The backing [`TextStore`] is the single source of truth: the collection is
/// reloaded wholesale at open and rewritten wholesale after every mutation,
/// so reads within the process always see the latest write. Filter, sort, and
/// theme persist under their own keys; the search string is transient.
pub struct TaskStore {
    kv: TextStore,
    tasks: Vec<Task>,
    filter: Filter,
    search: String,
    sort: SortKey,
    dark_mode: bool,
}

impl TaskStore {
    /// Open or create a store in the given directory.
    ///
    /// A `tasks` value that no longer decodes is logged and replaced by an
    /// empty collection; startup never fails on corrupt state.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let kv = TextStore::open(dir)?;

        let tasks = match kv.get(KEY_TASKS) {
            Some(raw) => match Self::decode_tasks(raw) {
                Ok(tasks) => tasks,
                Err(StoreError::CorruptState(e)) => {
                    warn!(error = ?e, "Persisted task collection corrupt, starting empty");
                    Vec::new()
                }
                Err(e) => return Err(e),
            },
            None => Vec::new(),
        };

        let filter = kv
            .get(KEY_FILTER)
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default();
        let sort = kv
            .get(KEY_SORT)
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default();
        let dark_mode = kv.get(KEY_THEME) == Some("true");

        info!(count = tasks.len(), "Opened task store");
        Ok(Self {
            kv,
            tasks,
            filter,
            search: String::new(),
            sort,
            dark_mode,
        })
    }

    /// Open the store in the user's local data directory.
    pub fn open_default() -> Result<Self> {
        let mut dir = dirs::data_local_dir().unwrap_or_else(|| ".".into());
        dir.push("taskmaster");
        Self::open(dir)
    }

    fn decode_tasks(raw: &str) -> Result<Vec<Task>> {
        serde_json::from_str(raw).map_err(StoreError::CorruptState)
    }

    /// Rewrite the full collection under the `tasks` key.
    fn persist(&mut self) -> Result<()> {
        let json = serde_json::to_string(&self.tasks)?;
        self.kv.set(KEY_TASKS, &json)?;
        debug!(count = self.tasks.len(), "Persisted task collection");
        Ok(())
    }

    /// Id for a newly created task: current time in milliseconds, bumped past
    /// any id already in the collection so same-millisecond adds stay unique.
    fn fresh_id(&self) -> i64 {
        let mut id = now_ms();
        while self.tasks.iter().any(|t| t.id == id) {
            id += 1;
        }
        id
    }

    // ========================================================================
    // CRUD
    // ========================================================================

    /// Create a task and append it to the collection.
    ///
    /// Fails with [`StoreError::EmptyText`] when the text trims to nothing.
    pub fn add(
        &mut self,
        text: &str,
        category: crate::models::Category,
        priority: crate::models::Priority,
        due_date: Option<NaiveDate>,
    ) -> Result<Task> {
        let text = text.trim();
        if text.is_empty() {
            return Err(StoreError::EmptyText);
        }

        let task = Task {
            id: self.fresh_id(),
            text: text.to_string(),
            completed: false,
            category,
            priority,
            due_date,
            created_at: Utc::now(),
        };

        self.tasks.push(task.clone());
        self.persist()?;
        Ok(task)
    }

    /// Flip `completed` on the matching task. Unknown ids are a no-op.
    pub fn toggle_completed(&mut self, id: i64) -> Result<Option<Task>> {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        task.completed = !task.completed;
        let updated = task.clone();

        self.persist()?;
        Ok(Some(updated))
    }

    /// Remove the matching task. Idempotent: a second call is a no-op.
    pub fn delete(&mut self, id: i64) -> Result<bool> {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        if self.tasks.len() == before {
            return Ok(false);
        }

        self.persist()?;
        Ok(true)
    }

    /// Start editing a task: remove it and hand back its field values as a
    /// draft for a subsequent [`add`](Self::add).
    ///
    /// The original id and creation time are discarded; saving the draft
    /// issues a new identity. Inherited behavior from the desktop app, kept
    /// as-is pending a product decision.
    pub fn begin_edit(&mut self, id: i64) -> Result<Option<TaskDraft>> {
        let Some(pos) = self.tasks.iter().position(|t| t.id == id) else {
            return Ok(None);
        };
        let task = self.tasks.remove(pos);
        let draft = TaskDraft::from(&task);

        self.persist()?;
        Ok(Some(draft))
    }

    /// Remove every completed task. Returns the number removed.
    pub fn clear_completed(&mut self) -> Result<usize> {
        let before = self.tasks.len();
        self.tasks.retain(|t| !t.completed);
        let removed = before - self.tasks.len();

        self.persist()?;
        Ok(removed)
    }

    // ========================================================================
    // Query
    // ========================================================================

    /// Produce the working list: filter by completion state, then match the
    /// search string, then sort. Returns fresh clones; the stored order is
    /// never touched. Equal sort keys keep their filtered order (stable sort,
    /// no secondary key).
    pub fn query(&self) -> Vec<Task> {
        let mut out: Vec<Task> = self
            .tasks
            .iter()
            .filter(|t| self.filter.matches(t))
            .filter(|t| self.search_matches(t))
            .cloned()
            .collect();

        match self.sort {
            SortKey::Newest => out.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortKey::Oldest => out.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            SortKey::Priority => out.sort_by(|a, b| b.priority.rank().cmp(&a.priority.rank())),
            SortKey::Alphabetical => {
                out.sort_by(|a, b| a.text.to_lowercase().cmp(&b.text.to_lowercase()))
            }
        }

        out
    }

    /// Case-insensitive substring match against the task text and the
    /// localized category/priority labels, as the desktop app searched.
    fn search_matches(&self, task: &Task) -> bool {
        if self.search.is_empty() {
            return true;
        }
        task.text.to_lowercase().contains(&self.search)
            || task.category.label().to_lowercase().contains(&self.search)
            || task.priority.label().to_lowercase().contains(&self.search)
    }

    pub fn stats(&self) -> Stats {
        let total = self.tasks.len();
        let completed = self.tasks.iter().filter(|t| t.completed).count();
        let active = total - completed;
        let high_priority = self
            .tasks
            .iter()
            .filter(|t| t.priority == crate::models::Priority::High && !t.completed)
            .count();
        let percent = if total == 0 {
            0
        } else {
            (completed as f64 / total as f64 * 100.0).round() as u32
        };

        Stats {
            total,
            active,
            completed,
            high_priority,
            percent,
        }
    }

    // ========================================================================
    // Import / export
    // ========================================================================

    /// Serialize the full collection (ignoring filter and search) as pretty
    /// JSON. No empty guard, matching the original export.
    pub fn export_json(&self) -> Result<String> {
        transfer::to_json(&self.tasks)
    }

    /// Serialize the full collection as CSV. Fails with
    /// [`StoreError::EmptyExport`] when there is nothing to export.
    pub fn export_csv(&self) -> Result<String> {
        transfer::to_csv(&self.tasks)
    }

    /// Append the records in a JSON payload to the collection.
    ///
    /// Records arriving without an id get one synthesized from the current
    /// time plus a small random offset. No de-duplication is performed, so
    /// importing an export doubles the collection. All-or-nothing: a payload
    /// that fails to parse applies no records.
    pub fn import_json(&mut self, raw: &str) -> Result<usize> {
        let mut imported = transfer::parse_import(raw)?;

        let mut rng = rand::thread_rng();
        for task in &mut imported {
            if task.id == 0 {
                task.id = now_ms() + rng.gen_range(0..1000);
            }
        }

        let count = imported.len();
        self.tasks.extend(imported);
        self.persist()?;

        info!(count, "Imported tasks");
        Ok(count)
    }

    // ========================================================================
    // View parameters and theme
    // ========================================================================

    pub fn set_filter(&mut self, filter: Filter) -> Result<()> {
        self.filter = filter;
        self.kv.set(KEY_FILTER, filter.as_str())
    }

    pub fn set_sort(&mut self, sort: SortKey) -> Result<()> {
        self.sort = sort;
        self.kv.set(KEY_SORT, sort.as_str())
    }

    /// Set the search string. Not persisted; cleared on restart.
    pub fn set_search(&mut self, search: &str) {
        self.search = search.to_lowercase();
    }

    /// Flip the dark-mode flag and persist it. Returns the new state.
    pub fn toggle_theme(&mut self) -> Result<bool> {
        self.dark_mode = !self.dark_mode;
        self.kv
            .set(KEY_THEME, if self.dark_mode { "true" } else { "false" })?;
        Ok(self.dark_mode)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn sort(&self) -> SortKey {
        self.sort
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn dark_mode(&self) -> bool {
        self.dark_mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Priority};
    use tempfile::TempDir;

    fn open_store(temp: &TempDir) -> TaskStore {
        TaskStore::open(temp.path()).unwrap()
    }

    fn add(store: &mut TaskStore, text: &str, priority: Priority) -> Task {
        store.add(text, Category::Other, priority, None).unwrap()
    }

    #[test]
    fn test_add_appends_one_active_task() {
        let temp = TempDir::new().unwrap();
        let mut store = open_store(&temp);

        let task = add(&mut store, "Comprar leite", Priority::Medium);
        assert_eq!(store.tasks().len(), 1);
        assert!(!task.completed);
        assert_eq!(task.text, "Comprar leite");
    }

    #[test]
    fn test_add_rejects_blank_text() {
        let temp = TempDir::new().unwrap();
        let mut store = open_store(&temp);

        assert!(matches!(
            store.add("", Category::Other, Priority::Medium, None),
            Err(StoreError::EmptyText)
        ));
        assert!(matches!(
            store.add("   ", Category::Other, Priority::Medium, None),
            Err(StoreError::EmptyText)
        ));
        assert!(store.tasks().is_empty());
    }

    #[test]
    fn test_add_trims_text() {
        let temp = TempDir::new().unwrap();
        let mut store = open_store(&temp);

        let task = add(&mut store, "  Lavar roupa  ", Priority::Low);
        assert_eq!(task.text, "Lavar roupa");
    }

    #[test]
    fn test_rapid_adds_get_unique_ids() {
        let temp = TempDir::new().unwrap();
        let mut store = open_store(&temp);

        for i in 0..20 {
            add(&mut store, &format!("tarefa {i}"), Priority::Medium);
        }

        let mut ids: Vec<i64> = store.tasks().iter().map(|t| t.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 20);
    }

    #[test]
    fn test_toggle_is_its_own_inverse() {
        let temp = TempDir::new().unwrap();
        let mut store = open_store(&temp);
        let task = add(&mut store, "Estudar", Priority::Medium);

        let toggled = store.toggle_completed(task.id).unwrap().unwrap();
        assert!(toggled.completed);

        let toggled = store.toggle_completed(task.id).unwrap().unwrap();
        assert!(!toggled.completed);
    }

    #[test]
    fn test_toggle_unknown_id_is_noop() {
        let temp = TempDir::new().unwrap();
        let mut store = open_store(&temp);

        assert!(store.toggle_completed(12345).unwrap().is_none());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let mut store = open_store(&temp);
        let task = add(&mut store, "Apagar", Priority::Medium);

        assert!(store.delete(task.id).unwrap());
        assert!(!store.delete(task.id).unwrap());
        assert!(store.tasks().is_empty());
    }

    #[test]
    fn test_begin_edit_discards_identity() {
        let temp = TempDir::new().unwrap();
        let mut store = open_store(&temp);
        let task = store
            .add("Relatório", Category::Work, Priority::High, None)
            .unwrap();

        let draft = store.begin_edit(task.id).unwrap().unwrap();
        assert_eq!(draft.text, "Relatório");
        assert_eq!(draft.category, Category::Work);
        assert_eq!(draft.priority, Priority::High);
        assert!(store.tasks().is_empty());

        // Re-adding the draft issues a fresh identity
        let replacement = store
            .add(&draft.text, draft.category, draft.priority, draft.due_date)
            .unwrap();
        assert_ne!(replacement.id, task.id);
    }

    #[test]
    fn test_begin_edit_unknown_id() {
        let temp = TempDir::new().unwrap();
        let mut store = open_store(&temp);

        assert!(store.begin_edit(99).unwrap().is_none());
    }

    #[test]
    fn test_clear_completed() {
        let temp = TempDir::new().unwrap();
        let mut store = open_store(&temp);

        let keep = add(&mut store, "pendente", Priority::Medium);
        let done1 = add(&mut store, "feita 1", Priority::Medium);
        let done2 = add(&mut store, "feita 2", Priority::Medium);
        store.toggle_completed(done1.id).unwrap();
        store.toggle_completed(done2.id).unwrap();

        assert_eq!(store.clear_completed().unwrap(), 2);
        assert_eq!(store.tasks().len(), 1);
        assert_eq!(store.tasks()[0].id, keep.id);
    }

    #[test]
    fn test_query_honors_completion_filter() {
        let temp = TempDir::new().unwrap();
        let mut store = open_store(&temp);

        let active = add(&mut store, "ativa", Priority::Medium);
        let done = add(&mut store, "feita", Priority::Medium);
        store.toggle_completed(done.id).unwrap();

        store.set_filter(Filter::Completed).unwrap();
        let result = store.query();
        assert!(result.iter().all(|t| t.completed));
        assert_eq!(result.len(), 1);

        store.set_filter(Filter::Active).unwrap();
        let result = store.query();
        assert!(result.iter().all(|t| !t.completed));
        assert_eq!(result[0].id, active.id);
    }

    #[test]
    fn test_query_priority_sort_descending() {
        let temp = TempDir::new().unwrap();
        let mut store = open_store(&temp);

        add(&mut store, "baixa", Priority::Low);
        add(&mut store, "alta", Priority::High);
        add(&mut store, "média", Priority::Medium);

        store.set_sort(SortKey::Priority).unwrap();
        let ordered: Vec<Priority> = store.query().iter().map(|t| t.priority).collect();
        assert_eq!(ordered, vec![Priority::High, Priority::Medium, Priority::Low]);
    }

    #[test]
    fn test_query_alphabetical_sort_ignores_case() {
        let temp = TempDir::new().unwrap();
        let mut store = open_store(&temp);

        add(&mut store, "banana", Priority::Medium);
        add(&mut store, "Abacate", Priority::Medium);

        store.set_sort(SortKey::Alphabetical).unwrap();
        let texts: Vec<String> = store.query().iter().map(|t| t.text.clone()).collect();
        assert_eq!(texts, vec!["Abacate", "banana"]);
    }

    #[test]
    fn test_query_does_not_reorder_stored_tasks() {
        let temp = TempDir::new().unwrap();
        let mut store = open_store(&temp);

        let first = add(&mut store, "primeira", Priority::Low);
        let second = add(&mut store, "segunda", Priority::High);

        store.set_sort(SortKey::Priority).unwrap();
        store.query();

        assert_eq!(store.tasks()[0].id, first.id);
        assert_eq!(store.tasks()[1].id, second.id);
    }

    #[test]
    fn test_search_matches_text_and_labels() {
        let temp = TempDir::new().unwrap();
        let mut store = open_store(&temp);

        store
            .add("Relatório mensal", Category::Work, Priority::High, None)
            .unwrap();
        store
            .add("Caminhada", Category::Health, Priority::Low, None)
            .unwrap();

        // Matches the task text, case-insensitively
        store.set_search("RELATÓRIO");
        assert_eq!(store.query().len(), 1);

        // Matches the localized priority label ("Alta")
        store.set_search("alta");
        assert_eq!(store.query().len(), 1);

        // Matches the localized category label ("Saúde")
        store.set_search("saúde");
        let result = store.query();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].category, Category::Health);

        store.set_search("");
        assert_eq!(store.query().len(), 2);
    }

    #[test]
    fn test_stats_on_empty_collection() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        let stats = store.stats();
        assert_eq!(stats.total, 0);
        assert_eq!(stats.active, 0);
        assert_eq!(stats.completed, 0);
        assert_eq!(stats.high_priority, 0);
        assert_eq!(stats.percent, 0);
    }

    #[test]
    fn test_buy_milk_walkthrough() {
        let temp = TempDir::new().unwrap();
        let mut store = open_store(&temp);

        let task = store
            .add("Buy milk", Category::Personal, Priority::High, None)
            .unwrap();
        assert_eq!(store.tasks().len(), 1);

        let stats = store.stats();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.active, 1);
        assert_eq!(stats.high_priority, 1);

        store.toggle_completed(task.id).unwrap();
        let stats = store.stats();
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.active, 0);
        assert_eq!(stats.high_priority, 0);
        assert_eq!(stats.percent, 100);
    }

    #[test]
    fn test_import_of_own_export_doubles_collection() {
        let temp = TempDir::new().unwrap();
        let mut store = open_store(&temp);

        add(&mut store, "uma", Priority::Medium);
        add(&mut store, "duas", Priority::High);

        let exported = store.export_json().unwrap();
        let count = store.import_json(&exported).unwrap();
        assert_eq!(count, 2);
        assert_eq!(store.tasks().len(), 4);
    }

    #[test]
    fn test_import_synthesizes_missing_ids() {
        let temp = TempDir::new().unwrap();
        let mut store = open_store(&temp);

        store.import_json(r#"[{"text":"sem id"}]"#).unwrap();
        assert_eq!(store.tasks().len(), 1);
        assert!(store.tasks()[0].id > 0);
    }

    #[test]
    fn test_import_bad_payload_applies_nothing() {
        let temp = TempDir::new().unwrap();
        let mut store = open_store(&temp);
        add(&mut store, "existente", Priority::Medium);

        assert!(matches!(
            store.import_json(r#"{"oops": true}"#),
            Err(StoreError::ImportFormat)
        ));
        assert_eq!(store.tasks().len(), 1);
    }

    #[test]
    fn test_collection_survives_reopen() {
        let temp = TempDir::new().unwrap();
        let id = {
            let mut store = open_store(&temp);
            add(&mut store, "persistente", Priority::High).id
        };

        let store = open_store(&temp);
        assert_eq!(store.tasks().len(), 1);
        assert_eq!(store.tasks()[0].id, id);
        assert_eq!(store.tasks()[0].text, "persistente");
    }

    #[test]
    fn test_preferences_survive_reopen() {
        let temp = TempDir::new().unwrap();
        {
            let mut store = open_store(&temp);
            store.set_filter(Filter::Active).unwrap();
            store.set_sort(SortKey::Alphabetical).unwrap();
            assert!(store.toggle_theme().unwrap());
        }

        let store = open_store(&temp);
        assert_eq!(store.filter(), Filter::Active);
        assert_eq!(store.sort(), SortKey::Alphabetical);
        assert!(store.dark_mode());
        // Search is transient
        assert_eq!(store.search(), "");
    }

    #[test]
    fn test_corrupt_tasks_value_starts_empty() {
        let temp = TempDir::new().unwrap();
        {
            let mut kv = TextStore::open(temp.path()).unwrap();
            kv.set(KEY_TASKS, "{definitely not a list").unwrap();
            kv.set(KEY_FILTER, "completed").unwrap();
        }

        let store = open_store(&temp);
        assert!(store.tasks().is_empty());
        // Intact preference keys still load
        assert_eq!(store.filter(), Filter::Completed);
    }
}
