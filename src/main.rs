mod app;
mod cli;
mod domain;
mod infra;
mod ui;

use crate::app::{ApiReply, ApiRequest, AppCommand, AppEvent, AppModel, RequestTicket};
use crate::cli::CliInvocation;
use crate::infra::{
    ApiClient, ApiError, ResolveStateDirError, clear_session_cookie, copy_text_to_clipboard,
    init_file_logging, load_session_cookie, normalize_cookie, read_text_from_clipboard,
    resolve_api_url, resolve_cookie_override, resolve_state_dir, save_session_cookie,
};
use crossterm::event::{
    self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyEventKind,
    KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use crossterm::{ExecutableCommand, execute};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::{self, Stdout, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
enum MainError {
    #[error(transparent)]
    App(#[from] crate::app::AppError),

    #[error(transparent)]
    Cli(#[from] crate::cli::CliRunError),

    #[error(transparent)]
    StateDir(#[from] ResolveStateDirError),
}

/// Everything the command executor needs besides the model: the backend
/// client (whose cookie changes on sign-in and logout), where the session is
/// persisted, and the channel workers report back on.
struct Runtime {
    client: ApiClient,
    state_dir: PathBuf,
    tx: Sender<AppEvent>,
}

fn main() {
    if let Err(error) = run_main() {
        tracing::error!(%error, "exiting with error");
        let mut err = io::stderr().lock();
        let _ = writeln!(err, "{error}");
        std::process::exit(1);
    }
}

fn run_main() -> Result<(), MainError> {
    let args = std::env::args().collect::<Vec<_>>();
    let invocation = match crate::cli::parse_invocation(&args) {
        Ok(invocation) => invocation,
        Err(error) => {
            let mut err = io::stderr().lock();
            let _ = writeln!(err, "{error}");
            let _ = writeln!(err);
            print_help();
            std::process::exit(2);
        }
    };

    match invocation {
        CliInvocation::PrintHelp => {
            print_help();
            Ok(())
        }
        CliInvocation::PrintVersion => {
            let mut out = io::stdout().lock();
            let _ = writeln!(out, "{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        CliInvocation::Tui { api } => {
            let state_dir = resolve_state_dir()?;
            let logging_notice = init_file_logging(&state_dir)
                .err()
                .map(|error| format!("Logging disabled: {error}"));
            let api_url = resolve_api_url(api.as_deref());
            let client = ApiClient::new(&api_url, initial_cookie(&state_dir));
            Ok(run_tui(api_url, client, state_dir, logging_notice)?)
        }
        CliInvocation::Command { api, command } => {
            let state_dir = resolve_state_dir()?;
            if let Err(error) = init_file_logging(&state_dir) {
                let mut err = io::stderr().lock();
                let _ = writeln!(err, "warning: logging disabled: {error}");
            }
            let api_url = resolve_api_url(api.as_deref());
            let mut client = ApiClient::new(&api_url, initial_cookie(&state_dir));
            crate::cli::run(command, &mut client, &state_dir)?;
            Ok(())
        }
    }
}

fn print_help() {
    let text = format!(
        "{name} - terminal client for the MiniCRM backend\n\nUSAGE:\n  {name} [--api URL]                  Start the TUI\n  {name} [--api URL] whoami           Print the signed-in user\n  {name} [--api URL] dashboard        Print dashboard totals\n  {name} [--api URL] customers        List customers\n  {name} [--api URL] campaigns        List campaigns\n  {name} [--api URL] segment FILE     Evaluate segment rules from a JSON file (- for stdin)\n  {name} [--api URL] deliver ID       Deliver a campaign\n  {name} [--api URL] login [COOKIE]   Store a session cookie (prompts when omitted)\n  {name} [--api URL] logout           Sign out and forget the stored cookie\n  {name} --help | --version\n\nOUTPUT:\n  customers: id<TAB>name<TAB>email<TAB>total_spend<TAB>visits<TAB>last_purchase\n  campaigns: id<TAB>name<TAB>audience<TAB>sent<TAB>failed<TAB>scheduled_date\n  segment:   audience_size<TAB>N, then one customer line per match\n  deliver:   status<TAB>customer<TAB>message\n\nTUI KEYS:\n  F1..F5 switch screens, Ctrl+R reload, Ctrl+L sign in, Ctrl+O sign out, Ctrl+Q quit\n\nENV:\n  MINICRM_API_URL         Backend base URL (default: {default_api})\n  MINICRM_STATE_DIR       Session and log directory (default: ~/.minicrm)\n  MINICRM_SESSION_COOKIE  Session cookie to use instead of the stored one\n  RUST_LOG                Log filter for <state dir>/minicrm.log (default: info)\n",
        name = env!("CARGO_PKG_NAME"),
        default_api = crate::infra::DEFAULT_API_URL,
    );
    let mut out = io::stdout().lock();
    let _ = write!(out, "{text}");
}

/// `MINICRM_SESSION_COOKIE` wins over the cookie stored by `login`.
fn initial_cookie(state_dir: &Path) -> Option<String> {
    if let Some(cookie) = resolve_cookie_override().and_then(|raw| normalize_cookie(&raw)) {
        return Some(cookie);
    }
    match load_session_cookie(state_dir) {
        Ok(cookie) => cookie,
        Err(error) => {
            tracing::warn!(%error, "failed to read stored session");
            None
        }
    }
}

fn run_tui(
    api_url: String,
    client: ApiClient,
    state_dir: PathBuf,
    notice: Option<String>,
) -> Result<(), crate::app::AppError> {
    tracing::info!(api = %api_url, "starting tui");
    let (tx, rx) = channel::<AppEvent>();
    let mut runtime = Runtime {
        client,
        state_dir,
        tx,
    };

    let (mut model, command) = app::start(AppModel::new(api_url).with_notice(notice));
    let mut terminal = setup_terminal()?;
    let result = if execute_command(command, &mut model, &mut runtime) {
        Ok(())
    } else {
        run(&mut terminal, &mut model, &mut runtime, &rx)
    };
    restore_terminal(&mut terminal)?;
    result
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>, app::AppError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    let _ = stdout.execute(EnableBracketedPaste);
    let _ = stdout.execute(PushKeyboardEnhancementFlags(
        KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES,
    ));
    let backend = CrosstermBackend::new(stdout);
    Ok(Terminal::new(backend)?)
}

fn restore_terminal(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
) -> Result<(), app::AppError> {
    disable_raw_mode()?;
    let _ = execute!(
        terminal.backend_mut(),
        DisableBracketedPaste,
        PopKeyboardEnhancementFlags
    );
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn run(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    model: &mut AppModel,
    runtime: &mut Runtime,
    rx: &Receiver<AppEvent>,
) -> Result<(), app::AppError> {
    loop {
        while let Ok(event) = rx.try_recv() {
            if apply_event(event, model, runtime) {
                return Ok(());
            }
        }

        terminal.draw(|frame| ui::render(frame, model))?;

        if event::poll(Duration::from_millis(200))? {
            let event = match event::read()? {
                Event::Key(key) => {
                    if key.kind == KeyEventKind::Release {
                        continue;
                    }
                    AppEvent::Key(key)
                }
                Event::Paste(text) => AppEvent::Paste(text),
                _ => continue,
            };
            if apply_event(event, model, runtime) {
                return Ok(());
            }
        }
    }
}

/// Feeds one event through `update` and runs the resulting command.
/// Returns `true` when the app should quit.
fn apply_event(event: AppEvent, model: &mut AppModel, runtime: &mut Runtime) -> bool {
    let (next, command) = app::update(model.clone(), event);
    *model = next;
    execute_command(command, model, runtime)
}

fn execute_command(command: AppCommand, model: &mut AppModel, runtime: &mut Runtime) -> bool {
    match command {
        AppCommand::None => false,
        AppCommand::Quit => true,
        AppCommand::Batch(commands) => {
            for command in commands {
                if execute_command(command, model, runtime) {
                    return true;
                }
            }
            false
        }
        AppCommand::Request { ticket, request } => {
            spawn_request(runtime.client.clone(), ticket, request, runtime.tx.clone());
            false
        }
        AppCommand::ProbeSession { generation } => {
            spawn_session_probe(runtime.client.clone(), generation, runtime.tx.clone());
            false
        }
        AppCommand::SignIn { cookie, generation } => {
            let Some(cookie) = normalize_cookie(&cookie) else {
                return apply_event(
                    AppEvent::SessionResolved {
                        generation,
                        user: None,
                    },
                    model,
                    runtime,
                );
            };
            if let Err(error) = save_session_cookie(&runtime.state_dir, &cookie) {
                tracing::warn!(%error, "failed to store session cookie");
                model.notice = Some(format!("Session not saved: {error}"));
            }
            runtime.client.set_cookie(Some(cookie));
            spawn_session_probe(runtime.client.clone(), generation, runtime.tx.clone());
            false
        }
        AppCommand::Logout => {
            spawn_logout(runtime.client.clone());
            if let Err(error) = clear_session_cookie(&runtime.state_dir) {
                tracing::warn!(%error, "failed to clear stored session");
                model.notice = Some(format!("Failed to clear stored session: {error}"));
            }
            runtime.client.set_cookie(None);
            false
        }
        AppCommand::CopyToClipboard { text } => {
            let notice = match copy_text_to_clipboard(&text) {
                Ok(()) => "Copied rules JSON to clipboard.".to_string(),
                Err(error) => {
                    tracing::warn!(%error, "clipboard copy failed");
                    format!("Copy failed: {error}")
                }
            };
            apply_event(AppEvent::Notice(notice), model, runtime)
        }
        AppCommand::PasteFromClipboard => match read_text_from_clipboard() {
            Ok(text) => apply_event(AppEvent::Paste(text), model, runtime),
            Err(error) => {
                tracing::warn!(%error, "clipboard read failed");
                apply_event(
                    AppEvent::Notice(format!("Paste failed: {error}")),
                    model,
                    runtime,
                )
            }
        },
    }
}

fn spawn_request(
    client: ApiClient,
    ticket: RequestTicket,
    request: ApiRequest,
    tx: Sender<AppEvent>,
) {
    std::thread::spawn(move || {
        let name = request.name();
        tracing::debug!(request = name, screen = ticket.screen.label(), "api request started");
        let reply = perform_request(&client, request);
        let _ = tx.send(AppEvent::Reply { ticket, reply });
    });
}

fn spawn_session_probe(client: ApiClient, generation: u64, tx: Sender<AppEvent>) {
    std::thread::spawn(move || {
        let user = match client.current_user() {
            Ok(user) => Some(user),
            Err(error) => {
                tracing::info!(%error, "session probe failed; treating as signed out");
                None
            }
        };
        let _ = tx.send(AppEvent::SessionResolved { generation, user });
    });
}

fn spawn_logout(client: ApiClient) {
    if !client.has_cookie() {
        return;
    }
    std::thread::spawn(move || {
        if let Err(error) = client.logout() {
            tracing::warn!(%error, "server logout failed");
        }
    });
}

fn perform_request(client: &ApiClient, request: ApiRequest) -> ApiReply {
    let name = request.name();
    match request {
        ApiRequest::DashboardSummary => {
            ApiReply::DashboardSummary(logged(name, client.dashboard_summary()))
        }
        ApiRequest::ListCustomers => ApiReply::Customers(logged(name, client.list_customers())),
        ApiRequest::CreateCustomer(customer) => {
            ApiReply::CustomerCreated(logged(name, client.create_customer(&customer)))
        }
        ApiRequest::DeleteCustomer { id } => {
            ApiReply::CustomerDeleted(logged(name, client.delete_customer(&id)))
        }
        ApiRequest::ListCampaigns => ApiReply::Campaigns(logged(name, client.list_campaigns())),
        ApiRequest::CreateCampaign(campaign) => {
            ApiReply::CampaignCreated(logged(name, client.create_campaign(&campaign)))
        }
        ApiRequest::DeliverCampaign { id } => {
            let result = logged(name, client.deliver_campaign(&id));
            ApiReply::CampaignDelivered { id, result }
        }
        ApiRequest::EvaluateSegment(rules) => {
            tracing::debug!(rules = %crate::domain::to_json(&rules), "evaluating segment");
            ApiReply::SegmentEvaluated(logged(name, client.evaluate_segment(&rules)))
        }
        ApiRequest::GenerateSuggestions(prompt) => {
            ApiReply::Suggestions(logged(name, client.ai_suggestions(&prompt)))
        }
    }
}

fn logged<T>(request: &'static str, result: Result<T, ApiError>) -> Result<T, String> {
    match result {
        Ok(value) => {
            tracing::info!(request, "api request succeeded");
            Ok(value)
        }
        Err(error) => {
            tracing::warn!(request, %error, "api request failed");
            Err(error.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::CustomersScreen;

    #[test]
    fn failed_request_reaches_the_screen_as_text() {
        let result: Result<(), String> =
            logged("list_customers", Err(ApiError::Status { status: 502 }));
        assert_eq!(result, Err("server responded with status 502".to_string()));

        let mut screen = CustomersScreen::new();
        screen.begin_fetch();
        screen.on_reply(ApiReply::Customers(result.map(|()| Vec::new())));
        assert_eq!(
            screen.error.as_deref(),
            Some(crate::app::screens::customers::LOAD_ERROR)
        );
    }
}
