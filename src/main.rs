use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use colored::Colorize;
use eyre::Result;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use taskmaster::{
    Category, Event, Filter, Priority, Reply, Shell, SortKey, Stats, StoreError, Task, TaskStore,
};
use tracing::error;

#[derive(Parser)]
#[command(name = "taskmaster")]
#[command(about = "TaskMaster - suas tarefas rápidas, from the terminal")]
#[command(version)]
struct Cli {
    /// Store directory (default: the user's local data dir)
    #[arg(short, long)]
    store_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a task
    Add {
        text: String,
        #[arg(long, default_value = "other")]
        category: Category,
        #[arg(long, default_value = "medium")]
        priority: Priority,
        /// Due date, YYYY-MM-DD
        #[arg(long)]
        due: Option<NaiveDate>,
    },

    /// List tasks using the saved filter and sort (flags override)
    List {
        #[arg(long)]
        filter: Option<Filter>,
        #[arg(long)]
        sort: Option<SortKey>,
        #[arg(long)]
        search: Option<String>,
    },

    /// Toggle a task's completed state
    Toggle { id: i64 },

    /// Delete a task
    Delete { id: i64 },

    /// Remove a task and print its fields for re-adding
    Edit { id: i64 },

    /// Remove all completed tasks
    ClearCompleted,

    /// Show collection counters
    Stats,

    /// Write tarefas.json to the output directory
    ExportJson {
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },

    /// Write tarefas.csv to the output directory
    ExportCsv {
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },

    /// Append tasks from a JSON export
    Import { file: PathBuf },

    /// Set and persist the completion filter
    Filter { value: Filter },

    /// Set and persist the sort key
    Sort { value: SortKey },

    /// Toggle dark mode
    Theme,
}

fn main() -> ExitCode {
    // Setup tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Never unwind across the process boundary
            error!(error = ?e, "Command failed");
            eprintln!("{} {e:#}", "Erro:".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let store = match &cli.store_path {
        Some(path) => TaskStore::open(path)?,
        None => TaskStore::open_default()?,
    };
    let mut shell = Shell::init(store);

    let (event, out_dir) = match cli.command {
        Commands::Add {
            text,
            category,
            priority,
            due,
        } => (
            Event::Add {
                text,
                category,
                priority,
                due_date: due,
            },
            None,
        ),
        Commands::List {
            filter,
            sort,
            search,
        } => {
            if let Some(filter) = filter {
                shell.dispatch(Event::SetFilter(filter))?;
            }
            if let Some(sort) = sort {
                shell.dispatch(Event::SetSort(sort))?;
            }
            if let Some(search) = search {
                shell.dispatch(Event::SetSearch(search))?;
            }
            (Event::Query, None)
        }
        Commands::Toggle { id } => (Event::Toggle(id), None),
        Commands::Delete { id } => (Event::Delete(id), None),
        Commands::Edit { id } => (Event::Edit(id), None),
        Commands::ClearCompleted => (Event::ClearCompleted, None),
        Commands::Stats => (Event::Stats, None),
        Commands::ExportJson { out } => (Event::ExportJson, Some(out)),
        Commands::ExportCsv { out } => (Event::ExportCsv, Some(out)),
        Commands::Import { file } => (Event::Import(fs::read_to_string(file)?), None),
        Commands::Filter { value } => (Event::SetFilter(value), None),
        Commands::Sort { value } => (Event::SetSort(value), None),
        Commands::Theme => (Event::ToggleTheme, None),
    };

    match shell.dispatch(event) {
        Ok(reply) => render(&shell, reply, out_dir.as_deref()),
        // User-action failures become a transient warning, like the app's toasts
        Err(e @ (StoreError::EmptyText | StoreError::ImportFormat | StoreError::EmptyExport)) => {
            println!("{} {e}", "⚠".yellow());
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn render(shell: &Shell, reply: Reply, out_dir: Option<&std::path::Path>) -> Result<()> {
    match reply {
        Reply::Added(task) => {
            println!("{} Tarefa adicionada (id = {}).", "✔".green(), task.id);
        }
        Reply::Toggled(Some(task)) => {
            let state = if task.completed {
                "concluída"
            } else {
                "pendente"
            };
            println!("{} Tarefa {} marcada como {state}.", "✔".green(), task.id);
        }
        Reply::Toggled(None) | Reply::EditDraft(None) => {
            println!("{} Tarefa não encontrada.", "⚠".yellow());
        }
        Reply::Deleted(true) => println!("{} Tarefa excluída.", "✔".green()),
        Reply::Deleted(false) => println!("{} Tarefa não encontrada.", "⚠".yellow()),
        Reply::EditDraft(Some(draft)) => {
            // The window would refill its input fields; the CLI prints them
            println!("Editando tarefa. Salve novamente com:");
            let mut cmd = format!(
                "  taskmaster add {:?} --category {} --priority {}",
                draft.text,
                draft.category.as_str(),
                draft.priority.as_str()
            );
            if let Some(due) = draft.due_date {
                cmd.push_str(&format!(" --due {due}"));
            }
            println!("{}", cmd.cyan());
        }
        Reply::Cleared(count) => {
            println!("{} {count} tarefas concluídas removidas.", "✔".green());
        }
        Reply::List(tasks) => render_list(shell, &tasks),
        Reply::Counters(stats) => render_stats(&stats),
        Reply::Exported { filename, content } => {
            let path = out_dir.unwrap_or_else(|| std::path::Path::new(".")).join(filename);
            fs::write(&path, content)?;
            println!("{} Exportado para {}.", "✔".green(), path.display());
        }
        Reply::Imported(count) => {
            println!("{} {count} tarefas importadas.", "✔".green());
        }
        Reply::FilterSet(filter) => println!("Filtro: {}.", filter.as_str()),
        Reply::SortSet(sort) => println!("Ordenação: {}.", sort.as_str()),
        Reply::ThemeSet(dark) => {
            println!("Tema alternado para {}.", if dark { "escuro" } else { "claro" });
        }
        Reply::SearchSet | Reply::Visibility(_) | Reply::Minimized | Reply::Quitting => {}
    }
    Ok(())
}

fn render_list(shell: &Shell, tasks: &[Task]) {
    if tasks.is_empty() {
        let what = match shell.store().filter() {
            Filter::Active => "pendente",
            Filter::Completed => "concluída",
            Filter::All => "criada",
        };
        println!("Nenhuma tarefa {what}.");
        return;
    }

    for task in tasks {
        let check = if task.completed { "[x]" } else { "[ ]" };
        let text = match task.priority {
            Priority::High => task.text.red().bold(),
            Priority::Medium => task.text.normal(),
            Priority::Low => task.text.dimmed(),
        };
        let mut meta = format!("{} · {}", task.category.label(), task.priority.label());
        if let Some(due) = task.due_date {
            meta.push_str(&format!(" · vence {due}"));
        }
        println!("{check} {:>13}  {text}  {}", task.id, meta.dimmed());
    }
}

fn render_stats(stats: &Stats) {
    println!("Total:          {}", stats.total);
    println!("Pendentes:      {}", stats.active);
    println!("Concluídas:     {}", stats.completed);
    println!("Alta prioridade: {}", stats.high_priority);
    println!("Progresso:      {}%", stats.percent);
}
