//! Line-oriented front-end: command parsing, dispatch and text rendering.
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::Write;
use thiserror::Error;
use tokio::io::{AsyncBufRead, Lines};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::api::ProductStore;
use crate::form::{Field, Form, FormMode};
use crate::inventory::{Confirm, Inventory};
use crate::notify::Channel;
use crate::view::{SortField, TableState, ViewQuery};

static COMMAND_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([A-Za-z]+)(?:\s+(.*?))?\s*$").expect("valid command regex"));
static SET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z]+)(?:\s+(.*))?$").expect("valid set regex"));

pub const LOADING_MARKER: &str = "Loading...";

pub const HELP: &str = "\
Commands:
  list                 show the product table
  refresh              re-fetch products from the backend
  filter [text]        filter by id, name or description (no text clears)
  sort <field>         sort by id|name|price|quantity (again to flip)
  form                 show the form
  set <field> [value]  set id|name|description|price|quantity
  edit <id>            load a product into the form
  cancel               leave edit mode and clear the form
  submit               add or update the product in the form
  delete <id>          delete a product (asks first)
  ping                 check the backend
  help                 this text
  quit                 exit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    List,
    Refresh,
    Filter(String),
    Sort(SortField),
    ShowForm,
    Set(Field, String),
    Edit(i64),
    Cancel,
    Submit,
    Delete(i64),
    Ping,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty input")]
    Empty,
    #[error("unknown command '{0}', try 'help'")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

fn parse_id(arg: Option<&str>, usage: &'static str) -> Result<i64, CommandError> {
    arg.and_then(|a| a.parse::<i64>().ok())
        .ok_or(CommandError::Usage(usage))
}

pub fn parse(line: &str) -> Result<Command, CommandError> {
    if line.trim().is_empty() {
        return Err(CommandError::Empty);
    }
    let caps = COMMAND_RE
        .captures(line)
        .ok_or_else(|| CommandError::Unknown(line.trim().to_string()))?;
    let verb = caps[1].to_ascii_lowercase();
    let arg = caps.get(2).map(|m| m.as_str()).filter(|a| !a.is_empty());

    match verb.as_str() {
        "list" | "ls" => Ok(Command::List),
        "refresh" => Ok(Command::Refresh),
        "filter" | "search" => Ok(Command::Filter(arg.unwrap_or_default().to_string())),
        "sort" => arg
            .and_then(SortField::parse)
            .map(Command::Sort)
            .ok_or(CommandError::Usage("sort id|name|price|quantity")),
        "form" => Ok(Command::ShowForm),
        "set" => {
            let usage = "set id|name|description|price|quantity [value]";
            let caps = arg
                .and_then(|a| SET_RE.captures(a))
                .ok_or(CommandError::Usage(usage))?;
            let field = Field::parse(&caps[1]).ok_or(CommandError::Usage(usage))?;
            let value = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
            Ok(Command::Set(field, value.to_string()))
        }
        "edit" => parse_id(arg, "edit <id>").map(Command::Edit),
        "cancel" => Ok(Command::Cancel),
        "submit" | "save" => Ok(Command::Submit),
        "delete" | "rm" => parse_id(arg, "delete <id>").map(Command::Delete),
        "ping" => Ok(Command::Ping),
        "help" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        _ => Err(CommandError::Unknown(verb)),
    }
}

/// US dollars with thousands separators, e.g. `$1,234.50`.
pub fn format_currency(amount: f64) -> String {
    let amount = if amount.is_finite() { amount } else { 0.0 };
    // Round through the float formatter so no integer cast can saturate.
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let is_zero = whole.bytes().all(|b| b == b'0') && cents.bytes().all(|b| b == b'0');
    let sign = if amount < 0.0 && !is_zero { "-" } else { "" };
    format!("{}${}.{}", sign, grouped, cents)
}

fn header(label: &str, field: Option<SortField>, query: &ViewQuery) -> String {
    match field {
        Some(f) if f == query.sort_field => format!("{} {}", label, query.direction.arrow()),
        _ => label.to_string(),
    }
}

pub fn render_table(state: &TableState, query: &ViewQuery, total: usize) -> String {
    let mut out = format!("Total: {}", total);
    if !query.filter.trim().is_empty() {
        out.push_str(&format!("  (filter: {:?})", query.filter.trim()));
    }
    out.push('\n');

    let rows = match state {
        TableState::Loading => {
            out.push_str(LOADING_MARKER);
            return out;
        }
        TableState::Empty => &[][..],
        TableState::Rows(rows) => rows.as_slice(),
    };

    let mut table: Vec<[String; 5]> = vec![[
        header("ID", Some(SortField::Id), query),
        header("Name", Some(SortField::Name), query),
        header("Description", None, query),
        header("Price", Some(SortField::Price), query),
        header("Quantity", Some(SortField::Quantity), query),
    ]];
    for p in rows {
        table.push([
            p.id.to_string(),
            p.name.clone(),
            p.description.clone(),
            format_currency(p.price),
            p.quantity.to_string(),
        ]);
    }

    let mut widths = [0usize; 5];
    for row in &table {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.chars().count());
        }
    }
    for row in &table {
        let line: Vec<String> = row
            .iter()
            .zip(widths.iter())
            .map(|(cell, w)| format!("{:<width$}", cell, width = *w))
            .collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    }
    if rows.is_empty() {
        out.push_str("No products found.\n");
    }
    out.trim_end().to_string()
}

pub fn render_form(form: &Form) -> String {
    let d = form.draft();
    let (title, action) = match form.mode() {
        FormMode::Create => ("Add Product".to_string(), "submit to Add"),
        FormMode::Editing { id } => (format!("Edit Product #{}", id), "submit to Update, cancel to discard"),
    };
    let mut out = format!("{}\n", title);
    if form.id_field_visible() {
        out.push_str(&format!("  id:          {}\n", d.id));
    }
    out.push_str(&format!("  name:        {}\n", d.name));
    out.push_str(&format!("  description: {}\n", d.description));
    out.push_str(&format!("  price:       {}\n", d.price));
    out.push_str(&format!("  quantity:    {}\n", d.quantity));
    out.push_str(&format!("({})", action));
    out
}

pub fn render_notices(success: Option<&str>, error: Option<&str>) -> String {
    let mut lines = Vec::new();
    if let Some(msg) = success {
        lines.push(format!("[ok] {}", msg));
    }
    if let Some(msg) = error {
        lines.push(format!("[error] {}", msg));
    }
    lines.join("\n")
}

fn with_notices<S: ProductStore>(inv: &Inventory<S>, body: String) -> String {
    let notices = render_notices(inv.notice(Channel::Success), inv.notice(Channel::Error));
    match (notices.is_empty(), body.is_empty()) {
        (true, _) => body,
        (false, true) => notices,
        (false, false) => format!("{}\n{}", notices, body),
    }
}

fn table_text<S: ProductStore>(inv: &mut Inventory<S>) -> String {
    let state = inv.table();
    render_table(&state, inv.query(), inv.total())
}

pub enum Flow {
    Continue(String),
    Quit,
}

/// Run one command against the view and return what to print.
pub async fn execute<S: ProductStore>(
    inv: &mut Inventory<S>,
    command: Command,
    confirm: &mut dyn Confirm,
) -> Flow {
    let body = match command {
        Command::Quit => return Flow::Quit,
        Command::Help => HELP.to_string(),
        Command::List => table_text(inv),
        Command::Refresh => {
            if let Err(err) = inv.refresh().await {
                debug!(?err, "refresh failed; error notice shown");
            }
            table_text(inv)
        }
        Command::Filter(text) => {
            inv.set_filter(text);
            table_text(inv)
        }
        Command::Sort(field) => {
            inv.sort_by(field);
            table_text(inv)
        }
        Command::ShowForm => render_form(inv.form()),
        Command::Set(field, value) => {
            if inv.set_field(field, value) {
                render_form(inv.form())
            } else {
                "ID is fixed while editing.".to_string()
            }
        }
        Command::Edit(id) => {
            if inv.start_edit_id(id) {
                render_form(inv.form())
            } else {
                format!("No product with id {}.", id)
            }
        }
        Command::Cancel => {
            inv.cancel_edit();
            render_form(inv.form())
        }
        Command::Submit => match inv.submit().await {
            Ok(_) => table_text(inv),
            Err(_) => render_form(inv.form()),
        },
        Command::Delete(id) => match inv.delete(id, confirm).await {
            Ok(true) => table_text(inv),
            _ => String::new(),
        },
        Command::Ping => match inv.ping().await {
            Ok(message) => message,
            Err(err) => {
                warn!(?err, "ping failed");
                format!("Backend unreachable: {}", err)
            }
        },
    };
    Flow::Continue(with_notices(inv, body))
}

/// Resolves with the loading marker each time a request starts, and with
/// `None` once the view is gone.
pub async fn loading_started(loading: &mut watch::Receiver<bool>) -> Option<&'static str> {
    loop {
        loading.changed().await.ok()?;
        if *loading.borrow_and_update() {
            return Some(LOADING_MARKER);
        }
    }
}

/// Asks on stdout and reads the answer from the shell's own input lines.
pub struct LineConfirm<'a, R> {
    lines: &'a mut Lines<R>,
}

impl<'a, R> LineConfirm<'a, R> {
    pub fn new(lines: &'a mut Lines<R>) -> Self {
        Self { lines }
    }
}

#[async_trait]
impl<'a, R> Confirm for LineConfirm<'a, R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn confirm(&mut self, prompt: &str) -> bool {
        print!("{} [y/N] ", prompt);
        let _ = std::io::stdout().flush();
        match self.lines.next_line().await {
            Ok(Some(answer)) => is_yes(&answer),
            _ => false,
        }
    }
}

pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
