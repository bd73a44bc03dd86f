/*
 * Application entry point: initializes logging, resolves the application
 * data directories, wires the core stores into a `SessionController` and
 * drives it through a small line-oriented command loop. All real logic
 * lives in `core` and `app_logic`; this file only translates typed commands
 * into controller calls and prints the resulting reports.
 */
mod app_logic;
mod core;

use crate::app_logic::{PrintOutcome, SessionController, dispatch};
use crate::core::{
    BatchProgress, CollectionLoadMode, CoreCollectionManager, CoreConfigManager, CorePreviewCache,
    CoreWorkingListStore, PdfiumRasterizer, SilentProgress, SortOrder, path_utils,
};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

const APP_NAME: &str = "PrintStation";

/// Per-item progress printed to the terminal. Cancellation mid-batch is a
/// UI affordance this front-end does not offer; batches run to completion.
struct ConsoleProgress;

impl BatchProgress for ConsoleProgress {
    fn report(&mut self, done: usize, total: usize, label: &str) {
        println!("  [{done}/{total}] {label}");
    }

    fn is_cancelled(&self) -> bool {
        false
    }
}

fn main() -> ExitCode {
    let verbose = std::env::args().any(|arg| arg == "--verbose" || arg == "-v");
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    if let Err(e) = TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let Some(data_dir) = path_utils::get_base_app_data_dir(APP_NAME) else {
        eprintln!("Fatal: could not determine the application data directory.");
        return ExitCode::FAILURE;
    };
    let Some(previews_dir) =
        path_utils::ensure_subdir(&data_dir, path_utils::PREVIEWS_SUBFOLDER_NAME)
    else {
        eprintln!("Fatal: could not create the preview cache directory.");
        return ExitCode::FAILURE;
    };
    let Some(collections_dir) =
        path_utils::ensure_subdir(&data_dir, path_utils::COLLECTIONS_SUBFOLDER_NAME)
    else {
        eprintln!("Fatal: could not create the collections directory.");
        return ExitCode::FAILURE;
    };

    let rasterizer = match PdfiumRasterizer::new() {
        Ok(rasterizer) => rasterizer,
        Err(e) => {
            eprintln!("Fatal: PDF engine unavailable: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut controller = SessionController::new(
        Arc::new(CoreWorkingListStore::new(data_dir.clone())),
        Arc::new(CoreCollectionManager::new(collections_dir)),
        Box::new(CorePreviewCache::new(previews_dir, Box::new(rasterizer))),
        Arc::new(CoreConfigManager::new(data_dir)),
    );

    let restored = controller.startup();
    println!("print_station: {restored} tracked file(s) restored. Type 'help' for commands.");

    let stdin = io::stdin();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                log::error!("Main: Failed to read input: {e}");
                break;
            }
        }
        if !run_command(&mut controller, line.trim()) {
            break;
        }
    }

    controller.shutdown();
    ExitCode::SUCCESS
}

/// Executes one typed command. Returns `false` when the loop should end.
fn run_command(controller: &mut SessionController, line: &str) -> bool {
    let (command, rest) = match line.split_once(' ') {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };

    match command {
        "" => {}
        "help" => print_help(),
        "list" | "ls" => print_working_list(controller),
        "selection" => print_selection_list(controller),
        "add" => {
            if rest.is_empty() {
                println!("Usage: add <path-to-pdf>");
            } else {
                // One file per command; per-item progress lines are noise here.
                let report = controller.add_files(&[PathBuf::from(rest)], &mut SilentProgress);
                for (name, reason) in &report.rejected {
                    println!("  not added: {name} ({reason:?})");
                }
                println!("{} file(s) added.", report.added.len());
            }
        }
        "remove" => match working_paths_at(controller, rest) {
            Some(paths) => {
                let removed = controller.remove_files(&paths);
                println!("{removed} file(s) removed.");
            }
            None => println!("Usage: remove <index> [index...] (see 'list')"),
        },
        "sort" => match rest {
            "asc" => controller.sort_files(SortOrder::Ascending),
            "desc" => controller.sort_files(SortOrder::Descending),
            _ => println!("Usage: sort asc|desc"),
        },
        "search" => {
            for reference in controller.session().filter_working(rest) {
                println!("  {}", reference.name);
            }
        }
        "select" => match working_paths_at(controller, rest) {
            Some(paths) => {
                let staged = controller.add_to_selection(&paths);
                println!("{staged} file(s) staged for printing.");
            }
            None => println!("Usage: select <index> [index...] (see 'list')"),
        },
        "unselect" => {
            if rest == "all" {
                controller.clear_selection();
                println!("Selection cleared.");
            } else {
                match selection_paths_at(controller, rest) {
                    Some(paths) => {
                        let removed = controller.remove_from_selection(&paths);
                        println!("{removed} file(s) unstaged.");
                    }
                    None => println!("Usage: unselect all | unselect <index> [index...]"),
                }
            }
        }
        "collections" => match controller.list_collections() {
            Ok(names) if names.is_empty() => println!("No collections saved."),
            Ok(names) => {
                for name in names {
                    println!("  {name}");
                }
            }
            Err(e) => println!("Cannot list collections: {e}"),
        },
        "save" => {
            if rest.is_empty() {
                println!("Usage: save <collection name>");
            } else {
                match controller.save_collection(&controller.collection_path_for_name(rest)) {
                    Ok(path) => println!("Collection saved to {path:?}."),
                    Err(e) => println!("Failed to save collection: {e}"),
                }
            }
        }
        "load" => {
            let (mode, name) = match rest.split_once(' ') {
                Some(("replace", name)) => (CollectionLoadMode::Replace, name.trim()),
                Some(("append", name)) => (CollectionLoadMode::Append, name.trim()),
                _ => {
                    println!("Usage: load replace|append <collection name>");
                    return true;
                }
            };
            let path = controller.collection_path_for_name(name);
            match controller.load_collection(&path, mode) {
                Ok(report) => {
                    println!("{} file(s) loaded.", report.added);
                    if !report.missing.is_empty() {
                        println!("The following files were not found:");
                        for name in &report.missing {
                            println!("  {name}");
                        }
                    }
                }
                Err(e) => println!("Failed to load collection: {e}"),
            }
        }
        "delete" => {
            if rest.is_empty() {
                println!("Usage: delete <collection name>");
            } else {
                let path = controller.collection_path_for_name(rest);
                match controller.delete_collection(&path) {
                    Ok(()) => println!("Collection deleted."),
                    Err(e) => println!("Failed to delete collection: {e}"),
                }
            }
        }
        "print" => run_print(controller),
        "duplex" => match rest {
            "on" => controller.set_pad_for_duplex(true),
            "off" => controller.set_pad_for_duplex(false),
            _ => println!(
                "Duplex padding is {}. Usage: duplex on|off",
                if controller.print_settings().pad_for_duplex {
                    "on"
                } else {
                    "off"
                }
            ),
        },
        "cache-size" => {
            let bytes = controller.preview_cache().cache_size();
            println!("Preview cache: {:.2} MB", bytes as f64 / (1024.0 * 1024.0));
        }
        "clear-cache" => {
            let removed = controller.preview_cache().clear_all();
            println!("{removed} cache entries removed.");
        }
        "quit" | "exit" => return false,
        unknown => println!("Unknown command '{unknown}'. Type 'help' for commands."),
    }
    true
}

fn run_print(controller: &mut SessionController) {
    match controller.print_selection(&mut ConsoleProgress) {
        PrintOutcome::NoFilesSelected => {
            println!("No files selected. Stage files with 'select' first.");
        }
        PrintOutcome::Cancelled => println!("Print preparation cancelled."),
        PrintOutcome::AllSourcesFailed(failed) => {
            println!("Nothing to print; every file failed:");
            for failure in failed {
                println!("  {} ({})", failure.name, failure.reason);
            }
        }
        PrintOutcome::Error(message) => println!("Print failed: {message}"),
        PrintOutcome::Completed(job) => {
            if !job.failed.is_empty() {
                println!("The following files had errors:");
                for failure in &job.failed {
                    println!("  {} ({})", failure.name, failure.reason);
                }
            }
            match dispatch::open_with_default_viewer(&job.artifact_path) {
                Ok(()) => {
                    println!("Combined document handed to the system PDF viewer.");
                    // Detached cleanup; the artifact survives a quick exit.
                    dispatch::remove_after_delay(
                        job.artifact_path,
                        dispatch::ARTIFACT_CLEANUP_DELAY,
                    );
                }
                Err(e) => println!(
                    "Could not open {:?} with the system viewer: {e}",
                    job.artifact_path
                ),
            }
        }
    }
}

fn print_help() {
    println!(
        "\
Commands:
  list | ls                     show the working list
  add <path>                    track a PDF file
  remove <index>...             untrack files by list index
  sort asc|desc                 sort the working list by name
  search <text>                 filter the working list
  selection                     show the staged print batch
  select <index>...             stage working-list entries for printing
  unselect all|<index>...       unstage entries by selection index
  collections                   list saved collections
  save <name>                   save the working list as a collection
  load replace|append <name>    load a collection into the working list
  delete <name>                 delete a collection
  print                         merge the staged batch and open it
  duplex [on|off]               blank-page padding for double-sided printing
  cache-size | clear-cache      preview cache maintenance
  quit"
    );
}

fn print_working_list(controller: &SessionController) {
    let entries = controller.session().working_list();
    if entries.is_empty() {
        println!("Working list is empty. Use 'add <path>'.");
        return;
    }
    for (index, reference) in entries.iter().enumerate() {
        println!("  {:>3}  {}", index + 1, reference.name);
    }
}

fn print_selection_list(controller: &SessionController) {
    let entries = controller.session().selection();
    if entries.is_empty() {
        println!("Nothing staged for printing.");
        return;
    }
    for (index, reference) in entries.iter().enumerate() {
        println!("  {:>3}  {}", index + 1, reference.name);
    }
}

/// Parses 1-based indices into Working-List paths; `None` on any bad token.
fn working_paths_at(controller: &SessionController, tokens: &str) -> Option<Vec<PathBuf>> {
    paths_at(controller.session().working_list(), tokens)
}

fn selection_paths_at(controller: &SessionController, tokens: &str) -> Option<Vec<PathBuf>> {
    paths_at(controller.session().selection(), tokens)
}

fn paths_at(entries: &[crate::core::PdfReference], tokens: &str) -> Option<Vec<PathBuf>> {
    if tokens.is_empty() {
        return None;
    }
    let mut paths = Vec::new();
    for token in tokens.split_whitespace() {
        let index: usize = token.parse().ok()?;
        let reference = entries.get(index.checked_sub(1)?)?;
        paths.push(reference.path.clone());
    }
    Some(paths)
}
