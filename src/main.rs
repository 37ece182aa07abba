mod config;
mod diary_entry;
mod diary_index;
mod error;
mod logging;
#[cfg(test)]
mod memory_store;
mod menu;
mod operations;
mod remote_store;
mod ui;

use clap::{Parser, ValueEnum};
use color_eyre::eyre::{eyre, Result};
use config::Config;
use diary_index::DiaryIndex;
use menu::Menu;
use operations::Diary;
use remote_store::{JsonBinClient, RemoteStore};
use std::path::PathBuf;
use ui::{Action, UI};

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Frontend {
    /// Numbered text menu on stdin/stdout
    Menu,
    /// Full-screen terminal interface
    Tui,
}

#[derive(Parser, Debug)]
#[command(name = "cloud_diary", version, about = "Personal diary stored in a remote JSON document store")]
struct Cli {
    /// Which interface to run
    #[arg(long, value_enum, default_value_t = Frontend::Tui)]
    frontend: Frontend,

    /// Path of the local title index (overrides DIARY_INDEX_PATH)
    #[arg(long)]
    index: Option<PathBuf>,

    /// Log level written to the log file (overrides DIARY_LOG_LEVEL)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let mut config = Config::from_env().map_err(|e| eyre!("Failed to load configuration: {e}"))?;
    if let Some(index) = cli.index {
        config.index_path = index;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }

    let _logger = logging::init_logging(&config.log_level, &config.log_dir)?;
    log::info!("event=config_loaded config={config:?}");

    let store = JsonBinClient::new(&config)?;
    let index = DiaryIndex::new(config.index_path.clone());
    log::info!("event=index_open path={}", index.path().display());
    let diary = Diary::new(store, index);

    match cli.frontend {
        Frontend::Menu => {
            let stdin = std::io::stdin();
            Menu::new(stdin.lock(), std::io::stdout()).run(&diary).await
        }
        Frontend::Tui => run_tui(&diary).await,
    }
}

async fn run_tui<S: RemoteStore>(diary: &Diary<S>) -> Result<()> {
    let mut ui = UI::new()?;

    loop {
        let titles = match diary.list_titles() {
            Ok(titles) => titles,
            Err(e) => {
                ui.set_error(e.to_string());
                Vec::new()
            }
        };
        ui.display(&titles)?;

        let Some(action) = ui.handle_input(!titles.is_empty())? else {
            continue;
        };
        match action {
            Action::Write => {
                if let Some(form) = ui.get_new_entry()? {
                    match diary.create(&form.title, &form.body).await {
                        Ok(outcome) => match outcome.duplicate {
                            Some(warning) => ui.set_warning(warning.to_string()),
                            None => ui.set_info(format!("Saved \"{}\"", form.title)),
                        },
                        Err(e) => ui.set_error(e.to_string()),
                    }
                }
            }
            Action::View => {
                if let Some(title) = ui.select_entry("View Entries", &titles)? {
                    match diary.read(&title).await {
                        Ok(entry) => ui.view_full_entry(&entry)?,
                        Err(e) => ui.set_error(e.to_string()),
                    }
                }
            }
            Action::Edit => {
                let Some(title) = ui.select_entry("Select Entry to Edit", &titles)? else {
                    continue;
                };
                let entry = match diary.read(&title).await {
                    Ok(entry) => entry,
                    Err(e) => {
                        ui.set_error(e.to_string());
                        continue;
                    }
                };
                if let Some(form) = ui.edit_entry(&entry)? {
                    match diary
                        .edit(&title, Some(&form.body), Some(&form.title))
                        .await
                    {
                        Ok(outcome) => match outcome.duplicate {
                            Some(warning) => ui.set_warning(warning.to_string()),
                            None => ui.set_info(format!("Updated \"{}\"", outcome.entry.title)),
                        },
                        Err(e) => ui.set_error(e.to_string()),
                    }
                }
            }
            Action::Delete => {
                let Some(title) = ui.select_entry("Select Entry to Delete", &titles)? else {
                    continue;
                };
                if ui.confirm(&format!("Delete \"{title}\"?"))? {
                    match diary.delete(&title).await {
                        Ok(()) => ui.set_info(format!("Deleted \"{title}\"")),
                        Err(e) => ui.set_error(e.to_string()),
                    }
                }
            }
            Action::Search => {
                let query = ui.get_search_query()?;
                if query.is_empty() {
                    continue;
                }
                match diary.search(&query).await {
                    Ok(results) if results.is_empty() => {
                        ui.set_info(format!("No entries match \"{query}\""))
                    }
                    Ok(results) => {
                        if let Some(title) = ui.display_search_results(&results)? {
                            match diary.read(&title).await {
                                Ok(entry) => ui.view_full_entry(&entry)?,
                                Err(e) => ui.set_error(e.to_string()),
                            }
                        }
                    }
                    Err(e) => ui.set_error(e.to_string()),
                }
            }
            Action::Quit => break,
        }
    }

    Ok(())
}
