use crate::domain::{
    AudienceResult, Campaign, ConditionGroup, Customer, DashboardSummary, DeliveryResult,
    UserInfo, format_amount, parse,
};
use crate::infra::{
    ApiClient, ApiError, clear_session_cookie, normalize_cookie, save_session_cookie,
};
use std::borrow::Cow;
use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CliInvocation {
    PrintHelp,
    PrintVersion,
    Tui { api: Option<String> },
    Command { api: Option<String>, command: CliCommand },
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RulesSource {
    Stdin,
    File(PathBuf),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CliCommand {
    Whoami,
    Dashboard,
    Customers,
    Campaigns,
    Segment { rules: RulesSource },
    Deliver { campaign_id: String },
    Login { cookie: Option<String> },
    Logout,
}

impl CliCommand {
    /// Log-safe name; never carries arguments such as the session cookie.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Whoami => "whoami",
            Self::Dashboard => "dashboard",
            Self::Customers => "customers",
            Self::Campaigns => "campaigns",
            Self::Segment { .. } => "segment",
            Self::Deliver { .. } => "deliver",
            Self::Login { .. } => "login",
            Self::Logout => "logout",
        }
    }
}

#[derive(Debug, Error)]
pub enum CliParseError {
    #[error("unknown subcommand: {0}")]
    UnknownSubcommand(String),

    #[error("unknown flag: {0}")]
    UnknownFlag(String),

    #[error("missing value for flag: {0}")]
    MissingFlagValue(String),

    #[error("missing argument: {0}")]
    MissingArgument(&'static str),

    #[error("unexpected argument: {0}")]
    UnexpectedArgument(String),
}

pub fn parse_invocation(args: &[String]) -> Result<CliInvocation, CliParseError> {
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        return Ok(CliInvocation::PrintHelp);
    }
    if args.iter().any(|arg| arg == "--version" || arg == "-V") {
        return Ok(CliInvocation::PrintVersion);
    }

    let mut iter = args.iter().skip(1).peekable();
    let mut api: Option<String> = None;
    while let Some(arg) = iter.peek() {
        match arg.as_str() {
            "--api" | "-a" => {
                let _ = iter.next();
                let value = iter
                    .next()
                    .ok_or_else(|| CliParseError::MissingFlagValue("--api".to_string()))?;
                api = Some(value.to_string());
            }
            "--" => {
                let _ = iter.next();
                break;
            }
            value if value.starts_with("--api=") => {
                api = Some(value.trim_start_matches("--api=").to_string());
                let _ = iter.next();
            }
            _ => break,
        }
    }

    let Some(subcommand) = iter.next() else {
        return Ok(CliInvocation::Tui { api });
    };

    let rest: Vec<&String> = iter.collect();
    if let Some(flag) = rest.iter().find(|arg| arg.starts_with('-') && arg.as_str() != "-") {
        return Err(CliParseError::UnknownFlag(flag.to_string()));
    }

    let command = match subcommand.as_str() {
        "whoami" => no_arguments(&rest, CliCommand::Whoami)?,
        "dashboard" => no_arguments(&rest, CliCommand::Dashboard)?,
        "customers" => no_arguments(&rest, CliCommand::Customers)?,
        "campaigns" => no_arguments(&rest, CliCommand::Campaigns)?,
        "logout" => no_arguments(&rest, CliCommand::Logout)?,
        "segment" => {
            let source = single_argument(&rest, "rules file (or - for stdin)")?;
            let rules = if source == "-" {
                RulesSource::Stdin
            } else {
                RulesSource::File(PathBuf::from(source))
            };
            CliCommand::Segment { rules }
        }
        "deliver" => CliCommand::Deliver {
            campaign_id: single_argument(&rest, "campaign id")?.to_string(),
        },
        "login" => match rest.as_slice() {
            [] => CliCommand::Login { cookie: None },
            [cookie] => CliCommand::Login {
                cookie: Some(cookie.to_string()),
            },
            [_, extra, ..] => return Err(CliParseError::UnexpectedArgument(extra.to_string())),
        },
        other => return Err(CliParseError::UnknownSubcommand(other.to_string())),
    };

    Ok(CliInvocation::Command { api, command })
}

fn no_arguments(rest: &[&String], command: CliCommand) -> Result<CliCommand, CliParseError> {
    match rest.first() {
        Some(extra) => Err(CliParseError::UnexpectedArgument(extra.to_string())),
        None => Ok(command),
    }
}

fn single_argument<'a>(
    rest: &[&'a String],
    name: &'static str,
) -> Result<&'a str, CliParseError> {
    match rest {
        [] => Err(CliParseError::MissingArgument(name)),
        [value] => Ok(value.as_str()),
        [_, extra, ..] => Err(CliParseError::UnexpectedArgument(extra.to_string())),
    }
}

#[derive(Debug, Error)]
pub enum CliRunError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to read rules from {path}: {source}")]
    ReadRules { path: String, source: io::Error },

    #[error("invalid rules JSON: {0}")]
    ParseRules(#[from] serde_json::Error),

    #[error("no session cookie given")]
    EmptyCookie,

    #[error(
        "the server did not accept the session cookie ({0})\nHint: sign in at the login URL again and copy a fresh connect.sid cookie."
    )]
    LoginRejected(ApiError),
}

pub fn run(
    command: CliCommand,
    client: &mut ApiClient,
    state_dir: &Path,
) -> Result<(), CliRunError> {
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());

    tracing::info!(command = command.name(), api = client.base_url(), "running cli command");

    match command {
        CliCommand::Whoami => {
            let user = client.current_user()?;
            write_line(&mut out, &format_user_line(&user))?;
        }
        CliCommand::Dashboard => {
            let summary = client.dashboard_summary()?;
            for line in format_dashboard_lines(&summary) {
                if !write_line(&mut out, &line)? {
                    return Ok(());
                }
            }
        }
        CliCommand::Customers => {
            for customer in client.list_customers()? {
                if !write_line(&mut out, &format_customer_line(&customer))? {
                    return Ok(());
                }
            }
        }
        CliCommand::Campaigns => {
            for campaign in client.list_campaigns()? {
                if !write_line(&mut out, &format_campaign_line(&campaign))? {
                    return Ok(());
                }
            }
        }
        CliCommand::Segment { rules } => {
            let rules = read_rules(&rules)?;
            let result = client.evaluate_segment(&rules)?;
            for line in format_audience_lines(&result) {
                if !write_line(&mut out, &line)? {
                    return Ok(());
                }
            }
        }
        CliCommand::Deliver { campaign_id } => {
            let outcome = client.deliver_campaign(&campaign_id)?;
            if let Some(message) = outcome.message.as_deref().filter(|m| !m.trim().is_empty()) {
                let mut err = io::stderr().lock();
                let _ = writeln!(err, "{message}");
            }
            for result in &outcome.results {
                if !write_line(&mut out, &format_delivery_line(result))? {
                    return Ok(());
                }
            }
        }
        CliCommand::Login { cookie } => {
            let raw = match cookie {
                Some(cookie) => cookie,
                None => prompt_for_cookie(&client.login_url())?,
            };
            let cookie = normalize_cookie(&raw).ok_or(CliRunError::EmptyCookie)?;
            client.set_cookie(Some(cookie.clone()));
            let user = client.current_user().map_err(CliRunError::LoginRejected)?;
            save_session_cookie(state_dir, &cookie)?;
            tracing::info!(user = %user.name, "signed in");
            write_line(&mut out, &format!("Signed in as {}", user.name))?;
        }
        CliCommand::Logout => {
            if client.has_cookie() {
                if let Err(error) = client.logout() {
                    tracing::warn!(%error, "server logout failed; clearing local session anyway");
                }
            }
            clear_session_cookie(state_dir)?;
            client.set_cookie(None);
            write_line(&mut out, "Signed out")?;
        }
    }

    out.flush()?;
    Ok(())
}

fn prompt_for_cookie(login_url: &str) -> Result<String, CliRunError> {
    {
        let mut err = io::stderr().lock();
        writeln!(err, "Open {login_url} in a browser and sign in.")?;
        write!(err, "Paste the connect.sid cookie: ")?;
        err.flush()?;
    }
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line)
}

fn read_rules(source: &RulesSource) -> Result<ConditionGroup, CliRunError> {
    let text = match source {
        RulesSource::Stdin => {
            let mut text = String::new();
            io::stdin()
                .lock()
                .read_to_string(&mut text)
                .map_err(|source| CliRunError::ReadRules {
                    path: "stdin".to_string(),
                    source,
                })?;
            text
        }
        RulesSource::File(path) => {
            fs::read_to_string(path).map_err(|source| CliRunError::ReadRules {
                path: path.display().to_string(),
                source,
            })?
        }
    };
    Ok(parse(&text)?)
}

fn write_line(out: &mut impl Write, line: &str) -> io::Result<bool> {
    match writeln!(out, "{line}") {
        Ok(()) => Ok(true),
        Err(error) if error.kind() == io::ErrorKind::BrokenPipe => Ok(false),
        Err(error) => Err(error),
    }
}

/// Keeps one record per line: tabs and newlines inside a value become spaces.
fn column(value: &str) -> Cow<'_, str> {
    if value.contains(['\t', '\n', '\r']) {
        Cow::Owned(value.replace(['\t', '\n', '\r'], " "))
    } else {
        Cow::Borrowed(value)
    }
}

fn format_user_line(user: &UserInfo) -> String {
    format!(
        "{}\t{}",
        column(&user.name),
        column(user.email.as_deref().unwrap_or(""))
    )
}

fn format_dashboard_lines(summary: &DashboardSummary) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(user) = &summary.user {
        lines.push(format!("user\t{}", column(&user.name)));
    }
    lines.push(format!("customers\t{}", summary.total_customers));
    lines.push(format!("campaigns\t{}", summary.total_campaigns));
    if let Some(revenue) = summary.total_revenue {
        lines.push(format!("revenue\t{}", format_amount(revenue)));
    }
    for campaign in &summary.recent_campaigns {
        lines.push(format!(
            "recent_campaign\t{}\t{}",
            column(&campaign.name),
            campaign.audience_count()
        ));
    }
    for customer in &summary.recent_customers {
        lines.push(format!(
            "recent_customer\t{}\t{}",
            column(&customer.name),
            format_amount(customer.total_spend)
        ));
    }
    lines
}

fn format_customer_line(customer: &Customer) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}\t{}",
        column(&customer.id),
        column(&customer.name),
        column(&customer.email),
        customer.total_spend,
        customer.visits,
        customer.last_purchase_label()
    )
}

fn format_campaign_line(campaign: &Campaign) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}\t{}",
        column(&campaign.id),
        column(&campaign.name),
        campaign.audience_count(),
        campaign.messages_sent,
        campaign.messages_failed,
        column(campaign.scheduled_date.as_deref().unwrap_or(""))
    )
}

fn format_audience_lines(result: &AudienceResult) -> Vec<String> {
    let mut lines = vec![format!("audience_size\t{}", result.audience_size)];
    lines.extend(result.data.iter().map(format_customer_line));
    lines
}

fn format_delivery_line(result: &DeliveryResult) -> String {
    format!(
        "{}\t{}\t{}",
        result.status.label(),
        column(&result.customer_name),
        column(&result.personalized_message)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AudienceSummary, DashboardUser, DeliveryStatus};

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    #[test]
    fn command_name_does_not_include_the_cookie() {
        let command = CliCommand::Login {
            cookie: Some("connect.sid=s%3Asecret".to_string()),
        };
        assert_eq!(command.name(), "login");
        assert!(!command.name().contains("secret"));
        assert_eq!(
            CliCommand::Deliver {
                campaign_id: "k1".to_string()
            }
            .name(),
            "deliver"
        );
    }

    #[test]
    fn parse_defaults_to_tui_when_no_args() {
        let parsed = parse_invocation(&args(&["minicrm"])).expect("parse");
        assert_eq!(parsed, CliInvocation::Tui { api: None });
    }

    #[test]
    fn parse_help_flag_wins() {
        let parsed = parse_invocation(&args(&["minicrm", "customers", "--help"])).expect("parse");
        assert_eq!(parsed, CliInvocation::PrintHelp);
    }

    #[test]
    fn parse_api_flag_applies_to_tui_and_commands() {
        let parsed =
            parse_invocation(&args(&["minicrm", "--api", "http://localhost:5000"])).expect("parse");
        assert_eq!(
            parsed,
            CliInvocation::Tui {
                api: Some("http://localhost:5000".to_string())
            }
        );

        let parsed = parse_invocation(&args(&["minicrm", "--api=http://x", "campaigns"]))
            .expect("parse");
        assert_eq!(
            parsed,
            CliInvocation::Command {
                api: Some("http://x".to_string()),
                command: CliCommand::Campaigns,
            }
        );
    }

    #[test]
    fn parse_segment_reads_file_or_stdin() {
        let parsed = parse_invocation(&args(&["minicrm", "segment", "rules.json"])).expect("parse");
        assert_eq!(
            parsed,
            CliInvocation::Command {
                api: None,
                command: CliCommand::Segment {
                    rules: RulesSource::File(PathBuf::from("rules.json"))
                },
            }
        );

        let parsed = parse_invocation(&args(&["minicrm", "segment", "-"])).expect("parse");
        assert_eq!(
            parsed,
            CliInvocation::Command {
                api: None,
                command: CliCommand::Segment {
                    rules: RulesSource::Stdin
                },
            }
        );
    }

    #[test]
    fn parse_rejects_missing_and_extra_arguments() {
        assert!(matches!(
            parse_invocation(&args(&["minicrm", "deliver"])),
            Err(CliParseError::MissingArgument(_))
        ));
        assert!(matches!(
            parse_invocation(&args(&["minicrm", "customers", "extra"])),
            Err(CliParseError::UnexpectedArgument(_))
        ));
        assert!(matches!(
            parse_invocation(&args(&["minicrm", "customers", "--json"])),
            Err(CliParseError::UnknownFlag(_))
        ));
        assert!(matches!(
            parse_invocation(&args(&["minicrm", "frobnicate"])),
            Err(CliParseError::UnknownSubcommand(_))
        ));
        assert!(matches!(
            parse_invocation(&args(&["minicrm", "--api"])),
            Err(CliParseError::MissingFlagValue(_))
        ));
    }

    #[test]
    fn parse_login_cookie_is_optional() {
        let parsed = parse_invocation(&args(&["minicrm", "login"])).expect("parse");
        assert_eq!(
            parsed,
            CliInvocation::Command {
                api: None,
                command: CliCommand::Login { cookie: None },
            }
        );
        let parsed = parse_invocation(&args(&["minicrm", "login", "abc"])).expect("parse");
        assert_eq!(
            parsed,
            CliInvocation::Command {
                api: None,
                command: CliCommand::Login {
                    cookie: Some("abc".to_string())
                },
            }
        );
    }

    #[test]
    fn customer_line_is_tab_separated() {
        let customer = Customer {
            id: "c1".to_string(),
            name: "Asha\tK".to_string(),
            email: "asha@example.com".to_string(),
            total_spend: 1500.0,
            visits: 4.0,
            last_purchase_date: Some("2025-03-14T09:30:00.000Z".to_string()),
        };
        assert_eq!(
            format_customer_line(&customer),
            "c1\tAsha K\tasha@example.com\t1500\t4\t2025-03-14"
        );
    }

    #[test]
    fn campaign_line_includes_audience_and_counters() {
        let campaign = Campaign {
            id: "k1".to_string(),
            name: "Spring".to_string(),
            audience: Some(AudienceSummary { audience_count: 12 }),
            messages_sent: 10,
            messages_failed: 2,
            ..Campaign::default()
        };
        assert_eq!(format_campaign_line(&campaign), "k1\tSpring\t12\t10\t2\t");
    }

    #[test]
    fn dashboard_lines_skip_missing_revenue() {
        let summary = DashboardSummary {
            user: Some(DashboardUser {
                name: "Meera".to_string(),
            }),
            total_customers: 3,
            total_campaigns: 1,
            ..DashboardSummary::default()
        };
        assert_eq!(
            format_dashboard_lines(&summary),
            vec!["user\tMeera", "customers\t3", "campaigns\t1"]
        );
    }

    #[test]
    fn audience_lines_start_with_size() {
        let result = AudienceResult {
            audience_size: 1,
            data: vec![Customer {
                id: "c9".to_string(),
                name: "Ravi".to_string(),
                ..Customer::default()
            }],
        };
        let lines = format_audience_lines(&result);
        assert_eq!(lines[0], "audience_size\t1");
        assert!(lines[1].starts_with("c9\tRavi\t"));
    }

    #[test]
    fn delivery_line_flattens_multiline_messages() {
        let result = DeliveryResult {
            customer_name: "Ravi".to_string(),
            personalized_message: "Hi Ravi,\nenjoy 10% off".to_string(),
            status: DeliveryStatus::Failed,
        };
        assert_eq!(
            format_delivery_line(&result),
            "FAILED\tRavi\tHi Ravi, enjoy 10% off"
        );
    }

    #[test]
    fn read_rules_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("rules.json");
        fs::write(
            &path,
            r#"{"logic":"OR","conditions":[{"field":"visits","operator":">","value":"10"}]}"#,
        )
        .expect("write");
        let rules = read_rules(&RulesSource::File(path)).expect("rules");
        assert_eq!(rules.conditions.len(), 1);

        let missing = read_rules(&RulesSource::File(dir.path().join("missing.json")));
        assert!(matches!(missing, Err(CliRunError::ReadRules { .. })));
    }
}
