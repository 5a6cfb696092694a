use crate::app::{
    ApiReply, ApiRequest, LineEditor, RuleEdit, RuleEditor, ScreenAction, is_submit_key,
};
use crate::domain::{Campaign, ConditionGroup, DeliveryResult, NewCampaign};
use crossterm::event::{KeyCode, KeyEvent};
use std::collections::BTreeMap;

pub const LOAD_ERROR: &str = "Failed to load campaigns";
pub const CREATE_ERROR: &str = "Failed to create campaign";
pub const CREATED_MESSAGE: &str = "Campaign created!";
pub const DELIVERED_MESSAGE: &str = "Campaign delivered!";
pub const DELIVER_ERROR: &str = "Failed to deliver campaign";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CampaignsFocus {
    Name,
    Description,
    Message,
    ScheduledDate,
    Rules,
    List,
}

impl CampaignsFocus {
    const ORDER: [CampaignsFocus; 6] = [
        Self::Name,
        Self::Description,
        Self::Message,
        Self::ScheduledDate,
        Self::Rules,
        Self::List,
    ];

    fn step(self, forward: bool) -> Self {
        let index = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        let len = Self::ORDER.len();
        let next = if forward {
            (index + 1) % len
        } else {
            (index + len - 1) % len
        };
        Self::ORDER[next]
    }
}

#[derive(Clone, Debug)]
pub struct CampaignsScreen {
    pub campaigns: Vec<Campaign>,
    pub loading: bool,
    pub error: Option<String>,
    pub message: Option<String>,
    pub name: LineEditor,
    pub description: LineEditor,
    pub body: LineEditor,
    pub scheduled_date: LineEditor,
    pub rules: ConditionGroup,
    pub rule_editor: RuleEditor,
    /// Per-recipient results of the last delivery, keyed by campaign id.
    pub delivery_results: BTreeMap<String, Vec<DeliveryResult>>,
    pub focus: CampaignsFocus,
    pub selected: usize,
    pub busy: bool,
}

impl CampaignsScreen {
    pub fn new() -> Self {
        Self {
            campaigns: Vec::new(),
            loading: false,
            error: None,
            message: None,
            name: LineEditor::new(),
            description: LineEditor::new(),
            body: LineEditor::new(),
            scheduled_date: LineEditor::new(),
            rules: ConditionGroup::default(),
            rule_editor: RuleEditor::new(),
            delivery_results: BTreeMap::new(),
            focus: CampaignsFocus::Name,
            selected: 0,
            busy: false,
        }
    }

    pub fn begin_fetch(&mut self) -> ApiRequest {
        self.loading = true;
        self.error = None;
        ApiRequest::ListCampaigns
    }

    pub fn selected_campaign(&self) -> Option<&Campaign> {
        self.campaigns.get(self.selected)
    }

    pub fn on_key(&mut self, key: KeyEvent) -> ScreenAction {
        if is_submit_key(key) {
            return self.create();
        }
        match key.code {
            KeyCode::Tab => {
                self.focus = self.focus.step(true);
                return ScreenAction::None;
            }
            KeyCode::BackTab => {
                self.focus = self.focus.step(false);
                return ScreenAction::None;
            }
            _ => {}
        }

        match self.focus {
            CampaignsFocus::Rules => {
                if let RuleEdit::Changed(updated) = self.rule_editor.handle_key(&self.rules, key) {
                    self.rules = updated;
                }
                ScreenAction::None
            }
            CampaignsFocus::List => self.on_list_key(key),
            _ => {
                if key.code == KeyCode::Enter {
                    self.focus = self.focus.step(true);
                    return ScreenAction::None;
                }
                if let Some(editor) = self.focused_editor() {
                    editor.handle_key(key);
                }
                ScreenAction::None
            }
        }
    }

    pub fn on_paste(&mut self, text: &str) {
        if let Some(editor) = self.focused_editor() {
            editor.insert_str(text);
        }
    }

    pub fn on_reply(&mut self, reply: ApiReply) -> ScreenAction {
        match reply {
            ApiReply::Campaigns(Ok(campaigns)) => {
                self.campaigns = campaigns;
                self.loading = false;
                self.selected = self.selected.min(self.campaigns.len().saturating_sub(1));
                ScreenAction::None
            }
            ApiReply::Campaigns(Err(_)) => {
                self.loading = false;
                self.error = Some(LOAD_ERROR.to_string());
                ScreenAction::None
            }
            ApiReply::CampaignCreated(Ok(())) => {
                self.busy = false;
                self.message = Some(CREATED_MESSAGE.to_string());
                self.name.clear();
                self.description.clear();
                self.body.clear();
                self.scheduled_date.clear();
                self.rules = ConditionGroup::default();
                self.rule_editor = RuleEditor::new();
                ScreenAction::Request(self.begin_fetch())
            }
            ApiReply::CampaignCreated(Err(_)) => {
                self.busy = false;
                self.error = Some(CREATE_ERROR.to_string());
                ScreenAction::None
            }
            ApiReply::CampaignDelivered { id, result } => {
                self.busy = false;
                match result {
                    Ok(outcome) => {
                        self.message = Some(
                            outcome
                                .message
                                .filter(|message| !message.trim().is_empty())
                                .unwrap_or_else(|| DELIVERED_MESSAGE.to_string()),
                        );
                        self.delivery_results.insert(id, outcome.results);
                        ScreenAction::Request(self.begin_fetch())
                    }
                    Err(_) => {
                        self.message = Some(DELIVER_ERROR.to_string());
                        ScreenAction::None
                    }
                }
            }
            _ => ScreenAction::None,
        }
    }

    fn on_list_key(&mut self, key: KeyEvent) -> ScreenAction {
        match key.code {
            KeyCode::Up => {
                self.selected = self.selected.saturating_sub(1);
                ScreenAction::None
            }
            KeyCode::Down => {
                if self.selected + 1 < self.campaigns.len() {
                    self.selected += 1;
                }
                ScreenAction::None
            }
            KeyCode::Enter | KeyCode::Char('d') => {
                if self.busy {
                    return ScreenAction::None;
                }
                let Some(campaign) = self.selected_campaign() else {
                    return ScreenAction::None;
                };
                let id = campaign.id.clone();
                self.busy = true;
                self.message = None;
                ScreenAction::Request(ApiRequest::DeliverCampaign { id })
            }
            _ => ScreenAction::None,
        }
    }

    fn create(&mut self) -> ScreenAction {
        if self.busy {
            return ScreenAction::None;
        }
        self.busy = true;
        self.error = None;
        ScreenAction::Request(ApiRequest::CreateCampaign(NewCampaign {
            name: self.name.text.clone(),
            description: self.description.text.clone(),
            rules: self.rules.clone(),
            message: self.body.text.clone(),
            scheduled_date: self.scheduled_date.text.clone(),
        }))
    }

    fn focused_editor(&mut self) -> Option<&mut LineEditor> {
        match self.focus {
            CampaignsFocus::Name => Some(&mut self.name),
            CampaignsFocus::Description => Some(&mut self.description),
            CampaignsFocus::Message => Some(&mut self.body),
            CampaignsFocus::ScheduledDate => Some(&mut self.scheduled_date),
            CampaignsFocus::Rules | CampaignsFocus::List => None,
        }
    }
}

impl Default for CampaignsScreen {
    fn default() -> Self {
        Self::new()
    }
}
