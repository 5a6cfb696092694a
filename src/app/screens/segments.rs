use crate::app::{ApiReply, ApiRequest, RuleEdit, RuleEditor, ScreenAction, is_submit_key};
use crate::domain::{AudienceResult, ConditionGroup, to_json_pretty};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

pub const EVALUATE_ERROR: &str = "Error evaluating segment. Please check rules.";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SegmentsFocus {
    Rules,
    Results,
}

#[derive(Clone, Debug)]
pub struct SegmentsScreen {
    pub rules: ConditionGroup,
    pub rule_editor: RuleEditor,
    pub result: Option<AudienceResult>,
    pub error: Option<String>,
    pub focus: SegmentsFocus,
    pub selected: usize,
    pub busy: bool,
}

impl SegmentsScreen {
    pub fn new() -> Self {
        Self {
            rules: ConditionGroup::default(),
            rule_editor: RuleEditor::new(),
            result: None,
            error: None,
            focus: SegmentsFocus::Rules,
            selected: 0,
            busy: false,
        }
    }

    pub fn rules_json(&self) -> String {
        to_json_pretty(&self.rules)
    }

    pub fn on_key(&mut self, key: KeyEvent) -> ScreenAction {
        if is_submit_key(key)
            || (key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('e'))
        {
            return self.evaluate();
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('y') {
            return ScreenAction::CopyToClipboard(self.rules_json());
        }
        if matches!(key.code, KeyCode::Tab | KeyCode::BackTab) {
            self.focus = match self.focus {
                SegmentsFocus::Rules => SegmentsFocus::Results,
                SegmentsFocus::Results => SegmentsFocus::Rules,
            };
            return ScreenAction::None;
        }

        match self.focus {
            SegmentsFocus::Rules => {
                if let RuleEdit::Changed(updated) = self.rule_editor.handle_key(&self.rules, key) {
                    self.rules = updated;
                }
            }
            SegmentsFocus::Results => {
                let rows = self.result.as_ref().map(|r| r.data.len()).unwrap_or(0);
                match key.code {
                    KeyCode::Up => self.selected = self.selected.saturating_sub(1),
                    KeyCode::Down if self.selected + 1 < rows => self.selected += 1,
                    _ => {}
                }
            }
        }
        ScreenAction::None
    }

    pub fn on_reply(&mut self, reply: ApiReply) -> ScreenAction {
        match reply {
            ApiReply::SegmentEvaluated(Ok(result)) => {
                self.busy = false;
                self.selected = 0;
                self.result = Some(result);
            }
            ApiReply::SegmentEvaluated(Err(_)) => {
                self.busy = false;
                self.error = Some(EVALUATE_ERROR.to_string());
            }
            _ => {}
        }
        ScreenAction::None
    }

    fn evaluate(&mut self) -> ScreenAction {
        if self.busy {
            return ScreenAction::None;
        }
        self.busy = true;
        self.error = None;
        self.result = None;
        ScreenAction::Request(ApiRequest::EvaluateSegment(self.rules.clone()))
    }
}

impl Default for SegmentsScreen {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Condition, Customer, Field, Logic, RuleNode};

    fn ctrl(ch: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL)
    }

    fn or_visits_rules() -> ConditionGroup {
        ConditionGroup {
            logic: Logic::Or,
            conditions: vec![RuleNode::Condition(Condition {
                field: Field::Visits,
                operator: ">".to_string(),
                value: "5".to_string(),
            })],
        }
    }

    #[test]
    fn evaluate_posts_rules_and_clears_previous_result() {
        let mut screen = SegmentsScreen::new();
        screen.rules = or_visits_rules();
        screen.result = Some(AudienceResult::default());
        screen.error = Some("old".to_string());

        let action = screen.on_key(ctrl('s'));
        assert_eq!(
            action,
            ScreenAction::Request(ApiRequest::EvaluateSegment(or_visits_rules()))
        );
        assert!(screen.result.is_none());
        assert!(screen.error.is_none());
    }

    #[test]
    fn result_replaces_single_slot() {
        let mut screen = SegmentsScreen::new();
        screen.on_key(ctrl('e'));
        screen.on_reply(ApiReply::SegmentEvaluated(Ok(AudienceResult {
            audience_size: 2,
            data: vec![Customer::default(), Customer::default()],
        })));
        let result = screen.result.as_ref().expect("result");
        assert_eq!(result.audience_size, 2);
        assert_eq!(result.data.len(), 2);
        assert!(!screen.busy);
    }

    #[test]
    fn failed_evaluation_leaves_empty_result_with_error() {
        let mut screen = SegmentsScreen::new();
        screen.result = Some(AudienceResult::default());
        screen.on_key(ctrl('s'));
        screen.on_reply(ApiReply::SegmentEvaluated(Err("400".to_string())));
        assert!(screen.result.is_none());
        assert_eq!(screen.error.as_deref(), Some(EVALUATE_ERROR));
    }

    #[test]
    fn ctrl_y_copies_pretty_json() {
        let mut screen = SegmentsScreen::new();
        let ScreenAction::CopyToClipboard(text) = screen.on_key(ctrl('y')) else {
            panic!("expected copy");
        };
        assert!(text.contains("\"logic\": \"AND\""));
    }
}
