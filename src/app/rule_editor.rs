use crate::domain::{
    Condition, ConditionGroup, ConditionKey, Logic, RuleNode, RulePath, add_condition,
    add_subgroup, edit_group_at, operators_for, remove_child, set_logic, update_condition_field,
};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// One line of the rendered tree, in display order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RuleRow {
    Group { path: RulePath, logic: Logic },
    Condition {
        group: RulePath,
        index: usize,
        condition: Condition,
    },
    AddCondition { group: RulePath },
    AddGroup { group: RulePath },
}

impl RuleRow {
    pub fn depth(&self) -> usize {
        match self {
            Self::Group { path, .. } => path.len(),
            Self::Condition { group, .. }
            | Self::AddCondition { group }
            | Self::AddGroup { group } => group.len() + 1,
        }
    }
}

pub fn flatten(root: &ConditionGroup) -> Vec<RuleRow> {
    let mut rows = Vec::new();
    push_group_rows(root, Vec::new(), &mut rows);
    rows
}

fn push_group_rows(group: &ConditionGroup, path: RulePath, rows: &mut Vec<RuleRow>) {
    rows.push(RuleRow::Group {
        path: path.clone(),
        logic: group.logic,
    });
    for (index, child) in group.conditions.iter().enumerate() {
        match child {
            RuleNode::Group(subgroup) => {
                let mut child_path = path.clone();
                child_path.push(index);
                push_group_rows(subgroup, child_path, rows);
            }
            RuleNode::Condition(condition) => rows.push(RuleRow::Condition {
                group: path.clone(),
                index,
                condition: condition.clone(),
            }),
        }
    }
    rows.push(RuleRow::AddCondition {
        group: path.clone(),
    });
    rows.push(RuleRow::AddGroup { group: path });
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum LeafColumn {
    #[default]
    Field,
    Operator,
    Value,
}

impl LeafColumn {
    fn next(self) -> Self {
        match self {
            Self::Field => Self::Operator,
            Self::Operator => Self::Value,
            Self::Value => Self::Value,
        }
    }

    fn prev(self) -> Self {
        match self {
            Self::Field => Self::Field,
            Self::Operator => Self::Field,
            Self::Value => Self::Operator,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RuleEdit {
    Ignored,
    Moved,
    Changed(ConditionGroup),
}

/// Cursor over the rows of a tree owned elsewhere. Holds no copy of the tree:
/// every edit is computed from the tree passed in and handed back as
/// [`RuleEdit::Changed`].
#[derive(Clone, Debug, Default)]
pub struct RuleEditor {
    pub cursor: usize,
    pub column: LeafColumn,
}

impl RuleEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clamp(&mut self, rules: &ConditionGroup) {
        let len = flatten(rules).len();
        self.cursor = self.cursor.min(len.saturating_sub(1));
    }

    pub fn handle_key(&mut self, rules: &ConditionGroup, key: KeyEvent) -> RuleEdit {
        if key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER)
        {
            return RuleEdit::Ignored;
        }

        let rows = flatten(rules);
        self.cursor = self.cursor.min(rows.len().saturating_sub(1));
        let Some(row) = rows.get(self.cursor).cloned() else {
            return RuleEdit::Ignored;
        };

        match key.code {
            KeyCode::Up => {
                if self.cursor == 0 {
                    return RuleEdit::Ignored;
                }
                self.cursor -= 1;
                return RuleEdit::Moved;
            }
            KeyCode::Down => {
                if self.cursor + 1 >= rows.len() {
                    return RuleEdit::Ignored;
                }
                self.cursor += 1;
                return RuleEdit::Moved;
            }
            _ => {}
        }

        match row {
            RuleRow::Group { path, logic } => self.on_group_key(rules, &path, logic, key),
            RuleRow::Condition {
                group,
                index,
                condition,
            } => self.on_condition_key(rules, &group, index, &condition, key),
            RuleRow::AddCondition { group } => match key.code {
                KeyCode::Enter | KeyCode::Char(' ') => {
                    // The new leaf is inserted above this row, so the cursor
                    // lands on it without moving.
                    self.column = LeafColumn::Field;
                    RuleEdit::Changed(edit_group_at(rules, &group, add_condition))
                }
                _ => RuleEdit::Ignored,
            },
            RuleRow::AddGroup { group } => match key.code {
                KeyCode::Enter | KeyCode::Char(' ') => {
                    // The new group's header takes the place of the sibling
                    // "+ Condition" row just above.
                    self.cursor = self.cursor.saturating_sub(1);
                    RuleEdit::Changed(edit_group_at(rules, &group, add_subgroup))
                }
                _ => RuleEdit::Ignored,
            },
        }
    }

    fn on_group_key(
        &mut self,
        rules: &ConditionGroup,
        path: &[usize],
        logic: Logic,
        key: KeyEvent,
    ) -> RuleEdit {
        match key.code {
            KeyCode::Left | KeyCode::Right | KeyCode::Enter | KeyCode::Char(' ') => {
                RuleEdit::Changed(edit_group_at(rules, path, |group| {
                    set_logic(group, logic.toggle())
                }))
            }
            KeyCode::Delete | KeyCode::Char('x') => {
                let Some((index, parent)) = path.split_last() else {
                    return RuleEdit::Ignored;
                };
                let index = *index;
                let updated = edit_group_at(rules, parent, |group| remove_child(group, index));
                self.clamp(&updated);
                RuleEdit::Changed(updated)
            }
            _ => RuleEdit::Ignored,
        }
    }

    fn on_condition_key(
        &mut self,
        rules: &ConditionGroup,
        group: &[usize],
        index: usize,
        condition: &Condition,
        key: KeyEvent,
    ) -> RuleEdit {
        let update = |key: ConditionKey, value: &str| {
            edit_group_at(rules, group, |parent| {
                update_condition_field(parent, index, key, value)
            })
        };

        match key.code {
            KeyCode::Left => {
                self.column = self.column.prev();
                RuleEdit::Moved
            }
            KeyCode::Right => {
                self.column = self.column.next();
                RuleEdit::Moved
            }
            KeyCode::Delete => {
                let updated = edit_group_at(rules, group, |parent| remove_child(parent, index));
                self.clamp(&updated);
                RuleEdit::Changed(updated)
            }
            KeyCode::Char('x') if self.column != LeafColumn::Value => {
                let updated = edit_group_at(rules, group, |parent| remove_child(parent, index));
                self.clamp(&updated);
                RuleEdit::Changed(updated)
            }
            KeyCode::Enter | KeyCode::Char(' ') if self.column == LeafColumn::Field => {
                RuleEdit::Changed(update(ConditionKey::Field, condition.field.next().key()))
            }
            KeyCode::Enter | KeyCode::Char(' ') if self.column == LeafColumn::Operator => {
                let operators = operators_for(condition.field);
                let next = match operators
                    .iter()
                    .position(|operator| *operator == condition.operator)
                {
                    Some(position) => operators[(position + 1) % operators.len()],
                    None => operators[0],
                };
                RuleEdit::Changed(update(ConditionKey::Operator, next))
            }
            KeyCode::Char(ch) if self.column == LeafColumn::Value => {
                let mut value = condition.value.clone();
                value.push(ch);
                RuleEdit::Changed(update(ConditionKey::Value, &value))
            }
            KeyCode::Backspace if self.column == LeafColumn::Value => {
                let mut value = condition.value.clone();
                if value.pop().is_none() {
                    return RuleEdit::Ignored;
                }
                RuleEdit::Changed(update(ConditionKey::Value, &value))
            }
            _ => RuleEdit::Ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Field, to_json};

    fn press(editor: &mut RuleEditor, rules: &mut ConditionGroup, code: KeyCode) -> bool {
        match editor.handle_key(rules, KeyEvent::new(code, KeyModifiers::NONE)) {
            RuleEdit::Changed(updated) => {
                *rules = updated;
                true
            }
            RuleEdit::Moved => true,
            RuleEdit::Ignored => false,
        }
    }

    fn type_text(editor: &mut RuleEditor, rules: &mut ConditionGroup, text: &str) {
        for ch in text.chars() {
            press(editor, rules, KeyCode::Char(ch));
        }
    }

    #[test]
    fn empty_tree_has_header_and_add_rows() {
        let rows = flatten(&ConditionGroup::default());
        assert_eq!(rows.len(), 3);
        assert!(matches!(&rows[0], RuleRow::Group { path, .. } if path.is_empty()));
        assert!(matches!(&rows[1], RuleRow::AddCondition { .. }));
        assert!(matches!(&rows[2], RuleRow::AddGroup { .. }));
    }

    #[test]
    fn builds_visits_condition_from_keys() {
        let mut rules = ConditionGroup::default();
        let mut editor = RuleEditor::new();

        press(&mut editor, &mut rules, KeyCode::Down);
        press(&mut editor, &mut rules, KeyCode::Enter);
        // Cursor now sits on the new leaf.
        press(&mut editor, &mut rules, KeyCode::Enter);
        press(&mut editor, &mut rules, KeyCode::Right);
        press(&mut editor, &mut rules, KeyCode::Right);
        type_text(&mut editor, &mut rules, "10");

        assert_eq!(
            to_json(&rules),
            r#"{"logic":"AND","conditions":[{"field":"visits","operator":">","value":"10"}]}"#
        );
    }

    #[test]
    fn nested_group_gets_its_own_rows_and_removal_targets_parent() {
        let mut rules = ConditionGroup::default();
        let mut editor = RuleEditor::new();

        // Root: add a leaf and a subgroup.
        editor.cursor = 1;
        press(&mut editor, &mut rules, KeyCode::Enter);
        editor.cursor = 3;
        press(&mut editor, &mut rules, KeyCode::Enter);
        assert!(matches!(&rules.conditions[1], RuleNode::Group(_)));

        // Inside the subgroup add a nested subgroup.
        let rows = flatten(&rules);
        let nested_add_group = rows
            .iter()
            .position(|row| matches!(row, RuleRow::AddGroup { group } if group == &vec![1]))
            .expect("nested add group row");
        editor.cursor = nested_add_group;
        press(&mut editor, &mut rules, KeyCode::Enter);

        // Cursor lands on the new group's header at path [1, 0]; remove it.
        let rows = flatten(&rules);
        assert!(matches!(&rows[editor.cursor], RuleRow::Group { path, .. } if path == &vec![1, 0]));
        press(&mut editor, &mut rules, KeyCode::Char('x'));

        assert_eq!(rules.conditions.len(), 2);
        let RuleNode::Group(child) = &rules.conditions[1] else {
            panic!("expected subgroup to remain");
        };
        assert!(child.conditions.is_empty());
    }

    #[test]
    fn root_header_cannot_be_removed() {
        let mut rules = ConditionGroup::default();
        let mut editor = RuleEditor::new();
        assert!(!press(&mut editor, &mut rules, KeyCode::Char('x')));
        assert_eq!(rules, ConditionGroup::default());
    }

    #[test]
    fn toggling_logic_on_header() {
        let mut rules = ConditionGroup::default();
        let mut editor = RuleEditor::new();
        press(&mut editor, &mut rules, KeyCode::Right);
        assert_eq!(rules.logic, Logic::Or);
        press(&mut editor, &mut rules, KeyCode::Char(' '));
        assert_eq!(rules.logic, Logic::And);
    }

    #[test]
    fn operator_cycle_repairs_invalid_operator_only_on_request() {
        let mut rules = add_condition(&ConditionGroup::default());
        let mut editor = RuleEditor::new();
        editor.cursor = 1;

        // Field: totalSpend -> visits -> lastPurchaseDate keeps ">".
        press(&mut editor, &mut rules, KeyCode::Enter);
        press(&mut editor, &mut rules, KeyCode::Enter);
        let RuleNode::Condition(condition) = &rules.conditions[0] else {
            panic!("leaf");
        };
        assert_eq!(condition.field, Field::LastPurchaseDate);
        assert_eq!(condition.operator, ">");

        press(&mut editor, &mut rules, KeyCode::Right);
        press(&mut editor, &mut rules, KeyCode::Enter);
        let RuleNode::Condition(condition) = &rules.conditions[0] else {
            panic!("leaf");
        };
        assert_eq!(condition.operator, "daysAgo");
    }

    #[test]
    fn backspace_and_x_edit_value_text() {
        let mut rules = add_condition(&ConditionGroup::default());
        let mut editor = RuleEditor::new();
        editor.cursor = 1;
        editor.column = LeafColumn::Value;
        type_text(&mut editor, &mut rules, "5x");
        press(&mut editor, &mut rules, KeyCode::Backspace);
        let RuleNode::Condition(condition) = &rules.conditions[0] else {
            panic!("leaf");
        };
        assert_eq!(condition.value, "5");
    }

    #[test]
    fn deleting_last_leaf_clamps_cursor() {
        let mut rules = add_condition(&ConditionGroup::default());
        let mut editor = RuleEditor::new();
        editor.cursor = 1;
        press(&mut editor, &mut rules, KeyCode::Delete);
        assert!(rules.conditions.is_empty());
        assert!(editor.cursor < flatten(&rules).len());
    }
}
