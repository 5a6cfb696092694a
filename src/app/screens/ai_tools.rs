use crate::app::{ApiReply, ApiRequest, LineEditor, ScreenAction, is_submit_key};
use crate::domain::AiPrompt;
use crossterm::event::{KeyCode, KeyEvent};

pub const GENERATE_ERROR: &str = "Failed to generate AI suggestions. Try again.";
pub const REQUIRED_ERROR: &str = "Campaign objective and audience type are required";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AiToolsFocus {
    Objective,
    Audience,
}

#[derive(Clone, Debug)]
pub struct AiToolsScreen {
    pub objective: LineEditor,
    pub audience: LineEditor,
    pub suggestions: Vec<String>,
    pub loading: bool,
    pub error: Option<String>,
    pub focus: AiToolsFocus,
}

impl AiToolsScreen {
    pub fn new() -> Self {
        Self {
            objective: LineEditor::new(),
            audience: LineEditor::new(),
            suggestions: Vec::new(),
            loading: false,
            error: None,
            focus: AiToolsFocus::Objective,
        }
    }

    pub fn on_key(&mut self, key: KeyEvent) -> ScreenAction {
        if is_submit_key(key) || key.code == KeyCode::Enter {
            return self.generate();
        }
        if matches!(key.code, KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down) {
            self.focus = match self.focus {
                AiToolsFocus::Objective => AiToolsFocus::Audience,
                AiToolsFocus::Audience => AiToolsFocus::Objective,
            };
            return ScreenAction::None;
        }
        self.focused_editor().handle_key(key);
        ScreenAction::None
    }

    pub fn on_paste(&mut self, text: &str) {
        self.focused_editor().insert_str(text);
    }

    pub fn on_reply(&mut self, reply: ApiReply) -> ScreenAction {
        match reply {
            ApiReply::Suggestions(Ok(suggestions)) => {
                self.loading = false;
                self.suggestions = suggestions;
            }
            ApiReply::Suggestions(Err(_)) => {
                self.loading = false;
                self.error = Some(GENERATE_ERROR.to_string());
            }
            _ => {}
        }
        ScreenAction::None
    }

    fn generate(&mut self) -> ScreenAction {
        if self.loading {
            return ScreenAction::None;
        }
        if self.objective.is_blank() || self.audience.is_blank() {
            self.error = Some(REQUIRED_ERROR.to_string());
            return ScreenAction::None;
        }
        self.loading = true;
        self.error = None;
        self.suggestions.clear();
        ScreenAction::Request(ApiRequest::GenerateSuggestions(AiPrompt {
            campaign_objective: self.objective.text.clone(),
            audience_type: self.audience.text.clone(),
        }))
    }

    fn focused_editor(&mut self) -> &mut LineEditor {
        match self.focus {
            AiToolsFocus::Objective => &mut self.objective,
            AiToolsFocus::Audience => &mut self.audience,
        }
    }
}

impl Default for AiToolsScreen {
    fn default() -> Self {
        Self::new()
    }
}
