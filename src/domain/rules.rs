use serde::{Deserialize, Deserializer, Serialize};

pub const NUMBER_OPERATORS: [&str; 4] = [">", "<", "=", "!="];
pub const DATE_OPERATORS: [&str; 1] = ["daysAgo"];

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum Logic {
    #[default]
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

impl Logic {
    pub fn toggle(self) -> Self {
        match self {
            Self::And => Self::Or,
            Self::Or => Self::And,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FieldKind {
    Number,
    Date,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    TotalSpend,
    Visits,
    LastPurchaseDate,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::TotalSpend, Field::Visits, Field::LastPurchaseDate];
    pub const FIRST: Field = Field::TotalSpend;

    pub fn key(self) -> &'static str {
        match self {
            Self::TotalSpend => "totalSpend",
            Self::Visits => "visits",
            Self::LastPurchaseDate => "lastPurchaseDate",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::TotalSpend => "Total Spend",
            Self::Visits => "Visits",
            Self::LastPurchaseDate => "Last Purchase Date",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            Self::TotalSpend | Self::Visits => FieldKind::Number,
            Self::LastPurchaseDate => FieldKind::Date,
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.key() == key)
    }

    pub fn next(self) -> Self {
        let index = Self::ALL
            .iter()
            .position(|field| *field == self)
            .unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

/// Operators offered for `field`. Always derived from the field as it is now,
/// so a leaf whose field changed may carry an operator outside this list.
pub fn operators_for(field: Field) -> &'static [&'static str] {
    match field.kind() {
        FieldKind::Number => &NUMBER_OPERATORS,
        FieldKind::Date => &DATE_OPERATORS,
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: Field,
    pub operator: String,
    #[serde(deserialize_with = "value_as_text")]
    pub value: String,
}

/// Values are edited as text; stored trees may carry them as JSON numbers.
fn value_as_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(text) => text,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

impl Condition {
    pub fn new_default() -> Self {
        let field = Field::FIRST;
        Self {
            field,
            operator: operators_for(field)[0].to_string(),
            value: String::new(),
        }
    }

    pub fn operator_is_valid(&self) -> bool {
        operators_for(self.field).contains(&self.operator.as_str())
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ConditionGroup {
    pub logic: Logic,
    pub conditions: Vec<RuleNode>,
}

/// A child of a [`ConditionGroup`]. Untagged on the wire: a group is recognised
/// by its `logic`/`conditions` keys, a leaf by `field`/`operator`/`value`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleNode {
    Group(ConditionGroup),
    Condition(Condition),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConditionKey {
    Field,
    Operator,
    Value,
}

/// Child indices from the root down to a group. The empty path is the root.
pub type RulePath = Vec<usize>;

pub fn set_logic(group: &ConditionGroup, logic: Logic) -> ConditionGroup {
    ConditionGroup {
        logic,
        conditions: group.conditions.clone(),
    }
}

pub fn add_condition(group: &ConditionGroup) -> ConditionGroup {
    let mut conditions = group.conditions.clone();
    conditions.push(RuleNode::Condition(Condition::new_default()));
    ConditionGroup {
        logic: group.logic,
        conditions,
    }
}

pub fn add_subgroup(group: &ConditionGroup) -> ConditionGroup {
    let mut conditions = group.conditions.clone();
    conditions.push(RuleNode::Group(ConditionGroup::default()));
    ConditionGroup {
        logic: group.logic,
        conditions,
    }
}

/// Replaces one attribute of the leaf at `index`. Subgroups, out-of-range
/// indices and unknown field keys leave the group as it was.
pub fn update_condition_field(
    group: &ConditionGroup,
    index: usize,
    key: ConditionKey,
    value: &str,
) -> ConditionGroup {
    let Some(RuleNode::Condition(condition)) = group.conditions.get(index) else {
        return group.clone();
    };

    let mut updated = condition.clone();
    match key {
        ConditionKey::Field => {
            let Some(field) = Field::from_key(value) else {
                return group.clone();
            };
            updated.field = field;
        }
        ConditionKey::Operator => updated.operator = value.to_string(),
        ConditionKey::Value => updated.value = value.to_string(),
    }

    replace_child(group, index, RuleNode::Condition(updated))
}

pub fn remove_child(group: &ConditionGroup, index: usize) -> ConditionGroup {
    if index >= group.conditions.len() {
        return group.clone();
    }
    let conditions = group
        .conditions
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != index)
        .map(|(_, child)| child.clone())
        .collect();
    ConditionGroup {
        logic: group.logic,
        conditions,
    }
}

pub fn replace_child(group: &ConditionGroup, index: usize, child: RuleNode) -> ConditionGroup {
    if index >= group.conditions.len() {
        return group.clone();
    }
    let mut conditions = group.conditions.clone();
    conditions[index] = child;
    ConditionGroup {
        logic: group.logic,
        conditions,
    }
}

/// Applies `edit` to the group at `path`, rebuilding each ancestor around the
/// changed child. A path that does not address a group returns `root` unchanged.
pub fn edit_group_at(
    root: &ConditionGroup,
    path: &[usize],
    edit: impl FnOnce(&ConditionGroup) -> ConditionGroup,
) -> ConditionGroup {
    let Some((first, rest)) = path.split_first() else {
        return edit(root);
    };
    match root.conditions.get(*first) {
        Some(RuleNode::Group(child)) => {
            let updated = edit_group_at(child, rest, edit);
            replace_child(root, *first, RuleNode::Group(updated))
        }
        _ => root.clone(),
    }
}

pub fn to_json(group: &ConditionGroup) -> String {
    serde_json::to_string(group).unwrap_or_else(|_| "{}".to_string())
}

pub fn to_json_pretty(group: &ConditionGroup) -> String {
    serde_json::to_string_pretty(group).unwrap_or_else(|_| "{}".to_string())
}

pub fn parse(json: &str) -> Result<ConditionGroup, serde_json::Error> {
    serde_json::from_str(json)
}
