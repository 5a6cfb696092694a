mod line_editor;
mod rule_editor;
pub mod screens;
mod session;

use crate::domain::{
    AiPrompt, AudienceResult, Campaign, ConditionGroup, Customer, DashboardSummary,
    DeliveryOutcome, NewCampaign, NewCustomer, UserInfo,
};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use thiserror::Error;

pub use line_editor::LineEditor;
pub use rule_editor::{LeafColumn, RuleEdit, RuleEditor, RuleRow, flatten};
pub use screens::{
    AiToolsFocus, AiToolsScreen, CampaignsFocus, CampaignsScreen, CustomersFocus,
    CustomersScreen, DashboardScreen, SegmentsFocus, SegmentsScreen,
};
pub use session::{SessionContext, SessionState};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("terminal I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScreenId {
    Dashboard,
    Customers,
    Segments,
    Campaigns,
    AiTools,
}

impl ScreenId {
    pub const ALL: [ScreenId; 5] = [
        Self::Dashboard,
        Self::Customers,
        Self::Segments,
        Self::Campaigns,
        Self::AiTools,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Dashboard => "Dashboard",
            Self::Customers => "Customers",
            Self::Segments => "Segments",
            Self::Campaigns => "Campaigns",
            Self::AiTools => "AI Tools",
        }
    }

    /// `F1`..`F5`, in tab order.
    pub fn function_key(self) -> u8 {
        match self {
            Self::Dashboard => 1,
            Self::Customers => 2,
            Self::Segments => 3,
            Self::Campaigns => 4,
            Self::AiTools => 5,
        }
    }

    pub fn from_function_key(n: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.function_key() == n)
    }
}

/// State of the active screen. A screen's state lives only while it is shown;
/// switching away drops it and switching back starts fresh.
#[derive(Clone, Debug)]
pub enum View {
    Dashboard(DashboardScreen),
    Customers(CustomersScreen),
    Segments(SegmentsScreen),
    Campaigns(CampaignsScreen),
    AiTools(AiToolsScreen),
}

impl View {
    pub fn id(&self) -> ScreenId {
        match self {
            Self::Dashboard(_) => ScreenId::Dashboard,
            Self::Customers(_) => ScreenId::Customers,
            Self::Segments(_) => ScreenId::Segments,
            Self::Campaigns(_) => ScreenId::Campaigns,
            Self::AiTools(_) => ScreenId::AiTools,
        }
    }

    fn fresh(id: ScreenId) -> Self {
        match id {
            ScreenId::Dashboard => Self::Dashboard(DashboardScreen::new()),
            ScreenId::Customers => Self::Customers(CustomersScreen::new()),
            ScreenId::Segments => Self::Segments(SegmentsScreen::new()),
            ScreenId::Campaigns => Self::Campaigns(CampaignsScreen::new()),
            ScreenId::AiTools => Self::AiTools(AiToolsScreen::new()),
        }
    }

    fn begin_fetch(&mut self) -> Option<ApiRequest> {
        match self {
            Self::Dashboard(screen) => Some(screen.begin_fetch()),
            Self::Customers(screen) => Some(screen.begin_fetch()),
            Self::Campaigns(screen) => Some(screen.begin_fetch()),
            Self::Segments(_) | Self::AiTools(_) => None,
        }
    }

    fn on_key(&mut self, key: KeyEvent) -> ScreenAction {
        match self {
            Self::Dashboard(_) => ScreenAction::None,
            Self::Customers(screen) => screen.on_key(key),
            Self::Segments(screen) => screen.on_key(key),
            Self::Campaigns(screen) => screen.on_key(key),
            Self::AiTools(screen) => screen.on_key(key),
        }
    }

    fn on_paste(&mut self, text: &str) {
        match self {
            Self::Customers(screen) => screen.on_paste(text),
            Self::Campaigns(screen) => screen.on_paste(text),
            Self::AiTools(screen) => screen.on_paste(text),
            Self::Dashboard(_) | Self::Segments(_) => {}
        }
    }

    fn on_reply(&mut self, reply: ApiReply) -> ScreenAction {
        match self {
            Self::Dashboard(screen) => screen.on_reply(reply),
            Self::Customers(screen) => screen.on_reply(reply),
            Self::Segments(screen) => screen.on_reply(reply),
            Self::Campaigns(screen) => screen.on_reply(reply),
            Self::AiTools(screen) => screen.on_reply(reply),
        }
    }
}

/// Identifies which activation of which screen a request was issued for.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RequestTicket {
    pub screen: ScreenId,
    pub generation: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ApiRequest {
    DashboardSummary,
    ListCustomers,
    CreateCustomer(NewCustomer),
    DeleteCustomer { id: String },
    ListCampaigns,
    CreateCampaign(NewCampaign),
    DeliverCampaign { id: String },
    EvaluateSegment(ConditionGroup),
    GenerateSuggestions(AiPrompt),
}

impl ApiRequest {
    pub fn name(&self) -> &'static str {
        match self {
            Self::DashboardSummary => "dashboard_summary",
            Self::ListCustomers => "list_customers",
            Self::CreateCustomer(_) => "create_customer",
            Self::DeleteCustomer { .. } => "delete_customer",
            Self::ListCampaigns => "list_campaigns",
            Self::CreateCampaign(_) => "create_campaign",
            Self::DeliverCampaign { .. } => "deliver_campaign",
            Self::EvaluateSegment(_) => "evaluate_segment",
            Self::GenerateSuggestions(_) => "generate_suggestions",
        }
    }
}

/// Outcome of an [`ApiRequest`]. Errors arrive already rendered to text; the
/// screens only decide which fixed message to show.
#[derive(Clone, Debug, PartialEq)]
pub enum ApiReply {
    DashboardSummary(Result<DashboardSummary, String>),
    Customers(Result<Vec<Customer>, String>),
    CustomerCreated(Result<(), String>),
    CustomerDeleted(Result<(), String>),
    Campaigns(Result<Vec<Campaign>, String>),
    CampaignCreated(Result<(), String>),
    CampaignDelivered {
        id: String,
        result: Result<DeliveryOutcome, String>,
    },
    SegmentEvaluated(Result<AudienceResult, String>),
    Suggestions(Result<Vec<String>, String>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum ScreenAction {
    None,
    Request(ApiRequest),
    CopyToClipboard(String),
}

pub fn is_submit_key(key: KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('s')
}

/// Cookie entry shown by `Ctrl+L`. The browser sign-in happens outside the
/// terminal; the user pastes the resulting session cookie here.
#[derive(Clone, Debug)]
pub struct LoginOverlay {
    pub login_url: String,
    pub cookie: LineEditor,
}

#[derive(Clone, Debug)]
pub struct AppModel {
    pub api_url: String,
    pub view: View,
    pub generation: u64,
    pub session: SessionContext,
    pub login: Option<LoginOverlay>,
    pub notice: Option<String>,
}

impl AppModel {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            view: View::fresh(ScreenId::Dashboard),
            generation: 0,
            session: SessionContext::new(),
            login: None,
            notice: None,
        }
    }

    pub fn ticket(&self) -> RequestTicket {
        RequestTicket {
            screen: self.view.id(),
            generation: self.generation,
        }
    }

    pub fn with_notice(mut self, notice: Option<String>) -> Self {
        self.notice = notice;
        self
    }

    fn request(&self, request: ApiRequest) -> AppCommand {
        AppCommand::Request {
            ticket: self.ticket(),
            request,
        }
    }
}

#[derive(Clone, Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Paste(String),
    Reply {
        ticket: RequestTicket,
        reply: ApiReply,
    },
    SessionResolved {
        generation: u64,
        user: Option<UserInfo>,
    },
    Notice(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum AppCommand {
    None,
    Quit,
    Batch(Vec<AppCommand>),
    Request {
        ticket: RequestTicket,
        request: ApiRequest,
    },
    ProbeSession {
        generation: u64,
    },
    SignIn {
        cookie: String,
        generation: u64,
    },
    Logout,
    CopyToClipboard {
        text: String,
    },
    PasteFromClipboard,
}

/// Initial commands: probe the session once and load the first screen.
pub fn start(model: AppModel) -> (AppModel, AppCommand) {
    let mut model = model;
    let generation = model.session.begin_probe();
    let load = activate(&mut model, ScreenId::Dashboard);
    (
        model,
        AppCommand::Batch(vec![AppCommand::ProbeSession { generation }, load]),
    )
}

pub fn update(model: AppModel, event: AppEvent) -> (AppModel, AppCommand) {
    match event {
        AppEvent::Key(key) => update_on_key(model, key),
        AppEvent::Paste(text) => update_on_paste(model, text),
        AppEvent::Reply { ticket, reply } => update_on_reply(model, ticket, reply),
        AppEvent::SessionResolved { generation, user } => {
            let mut model = model;
            let signed_in = user.is_some();
            if model.session.resolve(generation, user) {
                tracing::info!(signed_in, "session resolved");
            } else {
                tracing::debug!(generation, "dropping superseded session probe");
            }
            (model, AppCommand::None)
        }
        AppEvent::Notice(text) => (model.with_notice(Some(text)), AppCommand::None),
    }
}

fn update_on_key(model: AppModel, key: KeyEvent) -> (AppModel, AppCommand) {
    let mut model = model;
    model.notice = None;

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q')) {
        return (model, AppCommand::Quit);
    }

    if model.login.is_some() {
        return update_login_overlay(model, key);
    }

    if let KeyCode::F(n) = key.code {
        if let Some(id) = ScreenId::from_function_key(n) {
            if id == model.view.id() {
                return (model, AppCommand::None);
            }
            let command = activate(&mut model, id);
            return (model, command);
        }
        return (model, AppCommand::None);
    }

    if ctrl {
        match key.code {
            KeyCode::Char('r') => {
                let command = match model.view.begin_fetch() {
                    Some(request) => model.request(request),
                    None => AppCommand::None,
                };
                return (model, command);
            }
            KeyCode::Char('l') => {
                model.login = Some(LoginOverlay {
                    login_url: format!("{}/auth/google", model.api_url.trim_end_matches('/')),
                    cookie: LineEditor::new(),
                });
                return (model, AppCommand::None);
            }
            KeyCode::Char('o') => {
                model.session.invalidate();
                model.notice = Some("Logged out.".to_string());
                return (model, AppCommand::Logout);
            }
            _ => {}
        }
    }

    let action = model.view.on_key(key);
    let command = screen_command(&model, action);
    (model, command)
}

fn update_login_overlay(model: AppModel, key: KeyEvent) -> (AppModel, AppCommand) {
    let mut model = model;
    let Some(overlay) = model.login.as_mut() else {
        return (model, AppCommand::None);
    };

    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('v') {
        return (model, AppCommand::PasteFromClipboard);
    }

    match key.code {
        KeyCode::Esc => {
            model.login = None;
            (model, AppCommand::None)
        }
        KeyCode::Enter => {
            if overlay.cookie.is_blank() {
                model.notice = Some("Paste the session cookie first.".to_string());
                return (model, AppCommand::None);
            }
            let cookie = overlay.cookie.text.trim().to_string();
            model.login = None;
            let generation = model.session.begin_probe();
            (model, AppCommand::SignIn { cookie, generation })
        }
        _ => {
            overlay.cookie.handle_key(key);
            (model, AppCommand::None)
        }
    }
}

fn update_on_paste(model: AppModel, text: String) -> (AppModel, AppCommand) {
    let mut model = model;
    if let Some(overlay) = model.login.as_mut() {
        overlay.cookie.insert_str(&text);
        return (model, AppCommand::None);
    }
    model.view.on_paste(&text);
    (model, AppCommand::None)
}

fn update_on_reply(
    model: AppModel,
    ticket: RequestTicket,
    reply: ApiReply,
) -> (AppModel, AppCommand) {
    let mut model = model;
    if ticket != model.ticket() {
        tracing::debug!(
            screen = ticket.screen.label(),
            generation = ticket.generation,
            "dropping stale response"
        );
        return (model, AppCommand::None);
    }
    let action = model.view.on_reply(reply);
    let command = screen_command(&model, action);
    (model, command)
}

fn activate(model: &mut AppModel, id: ScreenId) -> AppCommand {
    model.generation += 1;
    model.view = View::fresh(id);
    tracing::debug!(screen = id.label(), generation = model.generation, "screen activated");
    match model.view.begin_fetch() {
        Some(request) => model.request(request),
        None => AppCommand::None,
    }
}

fn screen_command(model: &AppModel, action: ScreenAction) -> AppCommand {
    match action {
        ScreenAction::None => AppCommand::None,
        ScreenAction::Request(request) => model.request(request),
        ScreenAction::CopyToClipboard(text) => AppCommand::CopyToClipboard { text },
    }
}
