//! Command-line front end. Each invocation loads one session, runs one
//! command against it and exits.

pub mod output;
pub mod table;

use std::{fs, path::{Path, PathBuf}};

use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;

use crate::{
    codec::{format_amount_with, Amount},
    config::{app_home, Config, ConfigManager, HOME_ENV},
    coordinator::Coordinator,
    domain::{local_entry_id, Allocation, EntryPatch, EntryStatus, LedgerEntry},
    errors::{LedgerError, Result},
    session::{Session, ViewState},
    store::{HttpTransport, LedgerStore, RemoteStore},
    utils::build_info,
};

use table::{Column, Table};

#[derive(Debug, Parser)]
#[command(name = "allotment_cli", version, about = "Track spending against budget allocations")]
pub struct Cli {
    /// Application home holding config and local data.
    #[arg(long, global = true, env = HOME_ENV)]
    home: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show authorized, used and remaining amounts per allocation.
    Status {
        /// Only this allocation.
        #[arg(long)]
        key: Option<String>,
    },
    /// List submitted requests.
    History {
        /// Include deleted requests.
        #[arg(long)]
        all: bool,
    },
    /// Show one request with its line items.
    Show { id: String },
    /// Render the request document through the remote backend.
    Document { id: String },
    /// Replace the allocation list with the JSON array in FILE.
    Import { file: PathBuf },
    /// Submit the request described by the JSON object in FILE.
    Submit { file: PathBuf },
    /// Apply the JSON patch in FILE (`docName` and/or `items`) to a request.
    Update { id: String, file: PathBuf },
    /// Mark a request as deleted.
    Delete { id: String },
    /// Test and save a remote endpoint for later sessions.
    Connect { url: String },
    /// Forget the remote endpoint; later sessions use local data.
    Disconnect,
    /// Print build information.
    Version,
}

pub fn run_cli() -> Result<()> {
    run(Cli::parse())
}

pub fn run(cli: Cli) -> Result<()> {
    let home = cli.home.unwrap_or_else(app_home);
    let manager = ConfigManager::with_base_dir(home)?;

    match cli.command {
        Command::Version => {
            println!("{}", build_info::current());
            Ok(())
        }
        Command::Connect { url } => connect(&manager, &url),
        Command::Disconnect => {
            manager.set_endpoint(None)?;
            output::success("Remote endpoint cleared. Next session uses local data.");
            Ok(())
        }
        command => {
            let config = manager.load()?.with_env_overrides();
            let (coordinator, mut session) = Coordinator::from_config(&config, manager.home())?;
            if let Some(cause) = coordinator.selector().fallback_cause() {
                output::warning(format!("Remote backend unavailable ({cause}); using local data."));
            }
            let ctx = Context {
                config: &config,
                coordinator: &coordinator,
            };
            ctx.dispatch(command, &mut session)
        }
    }
}

fn connect(manager: &ConfigManager, url: &str) -> Result<()> {
    let config = manager.load()?;
    let transport = HttpTransport::new(url.trim(), config.request_timeout())?;
    RemoteStore::new(Box::new(transport)).test_connection()?;
    manager.set_endpoint(Some(url))?;
    output::success(format!("Connected to {}. Next session uses it.", url.trim()));
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)?;
    serde_json::from_str(&text)
        .map_err(|err| LedgerError::validation(format!("{}: {err}", path.display())))
}

struct Context<'a> {
    config: &'a Config,
    coordinator: &'a Coordinator,
}

impl Context<'_> {
    fn amount(&self, amount: Amount) -> String {
        format_amount_with(amount, self.config.grouping_separator)
    }

    fn dispatch(&self, command: Command, session: &mut Session) -> Result<()> {
        match command {
            Command::Status { key } => self.status(session, key.as_deref()),
            Command::History { all } => {
                self.history(session, all);
                Ok(())
            }
            Command::Show { id } => self.show(session, &id),
            Command::Document { id } => {
                match self.coordinator.generate_document(session, &id)? {
                    Some(url) => output::success(format!("Document ready: {url}")),
                    None => output::info("Document generated."),
                }
                Ok(())
            }
            Command::Import { file } => {
                let allocations: Vec<Allocation> = read_json(&file)?;
                self.coordinator.import_allocations(session, allocations)?;
                self.note_local_write();
                output::success(format!("Imported {} allocations.", session.allocations().len()));
                self.status(session, None)
            }
            Command::Submit { file } => {
                let mut entry: LedgerEntry = read_json(&file)?;
                entry.id = local_entry_id();
                entry.status = EntryStatus::Active;
                let stored = self.coordinator.submit(session, entry)?;
                self.note_local_write();
                output::success(format!(
                    "Submitted {} ({}).",
                    stored.id,
                    self.amount(stored.total())
                ));
                self.status(session, None)
            }
            Command::Update { id, file } => {
                let patch: EntryPatch = read_json(&file)?;
                self.coordinator.update(session, &id, &patch)?;
                self.note_local_write();
                self.coordinator.refresh(session)?;
                output::success(format!("Updated {id}."));
                self.status(session, None)
            }
            Command::Delete { id } => {
                self.coordinator.delete(session, &id)?;
                self.note_local_write();
                self.coordinator.refresh(session)?;
                output::success(format!("Deleted {id}."));
                self.status(session, None)
            }
            Command::Version | Command::Connect { .. } | Command::Disconnect => Ok(()),
        }
    }

    fn note_local_write(&self) {
        if self.coordinator.writes_mocked() {
            output::info("LOCAL mode: the change is stored on this machine only.");
        }
    }

    fn status(&self, session: &Session, key: Option<&str>) -> Result<()> {
        let rows: Vec<_> = session
            .status_rows()
            .into_iter()
            .filter(|row| key.map_or(true, |key| row.key == key))
            .collect();
        if let Some(key) = key {
            if rows.is_empty() {
                return Err(LedgerError::validation(format!("unknown allocation `{key}`")));
            }
        }

        output::section(format!("Budget status [{}]", session.mode()));
        if session.view_state() == ViewState::Stale {
            output::warning("Figures are out of date; run `status` again to refresh.");
        }
        let mut table = Table::new(vec![
            Column::left("Category").max_width(16),
            Column::left("Sub-category").max_width(16),
            Column::left("Allocation").max_width(28),
            Column::right("Authorized"),
            Column::right("Used"),
            Column::right("Remaining"),
            Column::left(""),
        ]);
        for row in &rows {
            table.push_row(vec![
                row.category.clone(),
                row.sub_category.clone(),
                row.key.clone(),
                self.amount(row.authorized),
                self.amount(row.consumed),
                self.amount(row.remaining),
                if row.over_budget() { "OVER".into() } else { String::new() },
            ]);
        }
        println!("{}", table.render());

        if key.is_none() {
            let totals = session.totals();
            println!(
                "Total authorized {}  used {}  remaining {}",
                self.amount(totals.authorized),
                self.amount(totals.consumed),
                self.amount(totals.remaining)
            );
        }
        Ok(())
    }

    fn history(&self, session: &Session, include_deleted: bool) {
        output::section(format!("Requests [{}]", session.mode()));
        let mut table = Table::new(vec![
            Column::left("Id"),
            Column::left("Date"),
            Column::left("Document").max_width(32),
            Column::right("Items"),
            Column::right("Total"),
            Column::left("Status"),
        ]);
        for entry in session
            .entries()
            .iter()
            .filter(|entry| include_deleted || entry.is_active())
        {
            table.push_row(vec![
                entry.id.clone(),
                entry.created_at.format("%Y-%m-%d").to_string(),
                entry.doc_name.clone(),
                entry.items.len().to_string(),
                self.amount(entry.total()),
                entry.status.to_string(),
            ]);
        }
        if table.is_empty() {
            output::info("No requests yet.");
        } else {
            println!("{}", table.render());
        }
    }

    fn show(&self, session: &Session, id: &str) -> Result<()> {
        let resolved = session
            .resolve(id)
            .ok_or_else(|| LedgerError::UnknownEntry(id.to_string()))?;
        output::section(&resolved.doc_name);
        println!("Id      {}", resolved.id);
        println!("Date    {}", resolved.created_at.format("%Y-%m-%d %H:%M"));
        println!("Status  {}", resolved.status);

        let mut table = Table::new(vec![
            Column::right("No"),
            Column::left("Item").max_width(24),
            Column::left("Spec").max_width(16),
            Column::right("Qty"),
            Column::right("Unit price"),
            Column::right("Total"),
            Column::left("Allocation").max_width(24),
        ]);
        for (row, item) in resolved.request_rows().into_iter().zip(&resolved.items) {
            table.push_row(vec![
                row.seq.to_string(),
                row.name,
                row.spec,
                self.amount(row.qty),
                self.amount(row.price),
                self.amount(row.total),
                item.allocation_key.clone(),
            ]);
        }
        println!("{}", table.render());
        println!("Total   {}", self.amount(resolved.total_amount));
        for key in resolved.unresolved_keys() {
            output::warning(format!("Allocation `{key}` no longer exists."));
        }
        Ok(())
    }
}
