use crate::domain::ConditionGroup;
use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;

// Read-side types decode leniently: a `null` or missing field takes its
// default so one sparse record does not fail a whole list response.

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Customer {
    #[serde(alias = "_id", deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(deserialize_with = "null_as_default")]
    pub total_spend: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub visits: f64,
    pub last_purchase_date: Option<String>,
}

impl Customer {
    pub fn last_purchase_label(&self) -> String {
        match &self.last_purchase_date {
            Some(raw) => format_purchase_date(raw),
            None => "N/A".to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AudienceSummary {
    #[serde(deserialize_with = "null_as_default")]
    pub audience_count: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Campaign {
    #[serde(alias = "_id", deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(deserialize_with = "rules_or_default")]
    pub rules: ConditionGroup,
    #[serde(deserialize_with = "null_as_default")]
    pub message: String,
    pub scheduled_date: Option<String>,
    pub audience: Option<AudienceSummary>,
    #[serde(deserialize_with = "null_as_default")]
    pub messages_sent: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub messages_failed: u64,
}

impl Campaign {
    pub fn audience_count(&self) -> u64 {
        self.audience
            .as_ref()
            .map(|audience| audience.audience_count)
            .unwrap_or(0)
    }
}

/// Anything other than `SENT`, including a missing status, counts as failed.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize)]
pub enum DeliveryStatus {
    #[serde(rename = "SENT")]
    Sent,
    #[default]
    #[serde(rename = "FAILED", other)]
    Failed,
}

impl DeliveryStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Sent => "SENT",
            Self::Failed => "FAILED",
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeliveryResult {
    #[serde(deserialize_with = "null_as_default")]
    pub customer_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub personalized_message: String,
    #[serde(deserialize_with = "null_as_default")]
    pub status: DeliveryStatus,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub struct DeliveryOutcome {
    pub message: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub results: Vec<DeliveryResult>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AudienceResult {
    #[serde(deserialize_with = "null_as_default")]
    pub audience_size: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub data: Vec<Customer>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub struct AiSuggestions {
    #[serde(deserialize_with = "null_as_default")]
    pub suggestions: Vec<String>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub struct DashboardUser {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardSummary {
    pub user: Option<DashboardUser>,
    #[serde(deserialize_with = "null_as_default")]
    pub total_customers: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub total_campaigns: u64,
    pub total_revenue: Option<f64>,
    #[serde(deserialize_with = "null_as_default")]
    pub recent_campaigns: Vec<Campaign>,
    #[serde(deserialize_with = "null_as_default")]
    pub recent_customers: Vec<Customer>,
}

/// Identity returned by `/auth/me`. `name` is required so that an error
/// payload such as `{"message": "..."}` does not read as a signed-in user.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
pub struct UserInfo {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// `{ "data": [...] }` list envelope used by the list endpoints.
#[derive(Clone, Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ListEnvelope<T> {
    #[serde(default = "Vec::new", deserialize_with = "null_as_default")]
    pub data: Vec<T>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Stored rules are display-only in lists; a tree this client cannot read
/// becomes an empty group instead of failing the campaign.
fn rules_or_default<'de, D>(deserializer: D) -> Result<ConditionGroup, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    match serde_json::from_value(raw) {
        Ok(rules) => Ok(rules),
        Err(error) => {
            tracing::debug!(%error, "unreadable campaign rules replaced with an empty group");
            Ok(ConditionGroup::default())
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomer {
    pub name: String,
    pub email: String,
    pub total_spend: serde_json::Number,
    pub visits: serde_json::Number,
}

impl NewCustomer {
    pub fn from_form(name: &str, email: &str, total_spend: &str, visits: &str) -> Self {
        Self {
            name: name.to_string(),
            email: email.to_string(),
            total_spend: json_number(coerce_number(total_spend)),
            visits: json_number(coerce_number(visits)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCampaign {
    pub name: String,
    pub description: String,
    pub rules: ConditionGroup,
    pub message: String,
    pub scheduled_date: String,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiPrompt {
    pub campaign_objective: String,
    pub audience_type: String,
}

/// Lenient numeric coercion for form input: blank, unparsable and non-finite
/// input all become 0.
pub fn coerce_number(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

/// Integral values are sent as JSON integers (`12`, not `12.0`).
pub fn json_number(value: f64) -> serde_json::Number {
    if value.fract() == 0.0 && value.abs() < 9.0e15 {
        return serde_json::Number::from(value as i64);
    }
    serde_json::Number::from_f64(value).unwrap_or_else(|| serde_json::Number::from(0))
}

pub fn format_amount(value: f64) -> String {
    format!("₹{value}")
}

fn format_purchase_date(raw: &str) -> String {
    let Ok(parsed) = OffsetDateTime::parse(raw, &Rfc3339) else {
        return raw.to_string();
    };
    parsed
        .format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerce_number_falls_back_to_zero() {
        assert_eq!(coerce_number(""), 0.0);
        assert_eq!(coerce_number("  "), 0.0);
        assert_eq!(coerce_number("abc"), 0.0);
        assert_eq!(coerce_number("NaN"), 0.0);
        assert_eq!(coerce_number(" 42 "), 42.0);
        assert_eq!(coerce_number("12.5"), 12.5);
    }

    #[test]
    fn new_customer_serializes_integral_numbers_as_integers() {
        let customer = NewCustomer::from_form("Asha", "asha@example.com", "1500", "");
        let json = serde_json::to_string(&customer).expect("json");
        assert_eq!(
            json,
            r#"{"name":"Asha","email":"asha@example.com","totalSpend":1500,"visits":0}"#
        );
    }

    #[test]
    fn customer_accepts_mongo_ids_and_missing_fields() {
        let raw = r#"{"_id":"c1","name":"Ravi","email":"ravi@example.com","totalSpend":250.5}"#;
        let customer: Customer = serde_json::from_str(raw).expect("customer");
        assert_eq!(customer.id, "c1");
        assert_eq!(customer.total_spend, 250.5);
        assert_eq!(customer.visits, 0.0);
        assert_eq!(customer.last_purchase_label(), "N/A");
    }

    #[test]
    fn last_purchase_label_formats_rfc3339_as_date() {
        let customer = Customer {
            last_purchase_date: Some("2025-03-14T09:30:00.000Z".to_string()),
            ..Customer::default()
        };
        assert_eq!(customer.last_purchase_label(), "2025-03-14");

        let odd = Customer {
            last_purchase_date: Some("last tuesday".to_string()),
            ..Customer::default()
        };
        assert_eq!(odd.last_purchase_label(), "last tuesday");
    }

    #[test]
    fn campaign_without_audience_reports_zero() {
        let raw = r#"{"_id":"k1","name":"Spring","messagesSent":3}"#;
        let campaign: Campaign = serde_json::from_str(raw).expect("campaign");
        assert_eq!(campaign.audience_count(), 0);
        assert_eq!(campaign.messages_sent, 3);
        assert_eq!(campaign.rules, ConditionGroup::default());
    }

    #[test]
    fn delivery_status_treats_unknown_values_as_failed() {
        let raw = r#"{"message":"ok","results":[
            {"customerName":"A","personalizedMessage":"Hi A","status":"SENT"},
            {"customerName":"B","personalizedMessage":"Hi B","status":"BOUNCED"}
        ]}"#;
        let outcome: DeliveryOutcome = serde_json::from_str(raw).expect("outcome");
        assert_eq!(outcome.message.as_deref(), Some("ok"));
        assert_eq!(outcome.results[0].status, DeliveryStatus::Sent);
        assert_eq!(outcome.results[1].status, DeliveryStatus::Failed);
    }

    #[test]
    fn user_info_requires_a_name() {
        assert!(serde_json::from_str::<UserInfo>(r#"{"message":"Unauthorized"}"#).is_err());
        let user: UserInfo =
            serde_json::from_str(r#"{"name":"Asha","avatar":"https://x/a.png"}"#).expect("user");
        assert_eq!(user.name, "Asha");
    }

    #[test]
    fn null_campaign_fields_do_not_drop_the_list() {
        let raw = r#"{"data":[
            {"_id":"k1","name":"A","description":null,"message":null,"messagesSent":null},
            {"_id":"k2","name":"B"}
        ]}"#;
        let envelope: ListEnvelope<Campaign> = serde_json::from_str(raw).expect("campaigns");
        assert_eq!(envelope.data.len(), 2);
        assert_eq!(envelope.data[0].description, "");
        assert_eq!(envelope.data[0].messages_sent, 0);
        assert_eq!(envelope.data[1].name, "B");
    }

    #[test]
    fn unreadable_campaign_rules_fall_back_to_empty_group() {
        let raw = r#"{"data":[
            {"_id":"k1","name":"A","rules":{"logic":"XOR","conditions":"none"}},
            {"_id":"k2","name":"B","rules":null}
        ]}"#;
        let envelope: ListEnvelope<Campaign> = serde_json::from_str(raw).expect("campaigns");
        assert_eq!(envelope.data.len(), 2);
        assert_eq!(envelope.data[0].rules, ConditionGroup::default());
        assert_eq!(envelope.data[1].rules, ConditionGroup::default());
    }

    #[test]
    fn campaign_rules_with_numeric_values_are_kept() {
        let raw = r#"{"_id":"k1","name":"A","rules":{"logic":"AND","conditions":[
            {"field":"visits","operator":">","value":5}
        ]}}"#;
        let campaign: Campaign = serde_json::from_str(raw).expect("campaign");
        let crate::domain::RuleNode::Condition(condition) = &campaign.rules.conditions[0] else {
            panic!("expected a leaf");
        };
        assert_eq!(condition.value, "5");
    }

    #[test]
    fn null_customer_fields_default() {
        let raw = r#"{"data":[{"_id":"c1","name":null,"email":"a@x","totalSpend":null,"visits":2}]}"#;
        let envelope: ListEnvelope<Customer> = serde_json::from_str(raw).expect("customers");
        assert_eq!(envelope.data[0].name, "");
        assert_eq!(envelope.data[0].total_spend, 0.0);
        assert_eq!(envelope.data[0].visits, 2.0);
    }

    #[test]
    fn delivery_result_without_status_counts_as_failed() {
        let raw = r#"{"message":null,"results":[{"customerName":"A"},{"customerName":null,"status":null}]}"#;
        let outcome: DeliveryOutcome = serde_json::from_str(raw).expect("outcome");
        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.results[0].status, DeliveryStatus::Failed);
        assert_eq!(outcome.results[1].customer_name, "");
    }

    #[test]
    fn dashboard_summary_tolerates_null_totals_and_lists() {
        let raw = r#"{"user":{"name":"Asha"},"totalCustomers":null,"recentCampaigns":null,
            "recentCustomers":[{"_id":"c1","email":null}]}"#;
        let summary: DashboardSummary = serde_json::from_str(raw).expect("summary");
        assert_eq!(summary.total_customers, 0);
        assert!(summary.recent_campaigns.is_empty());
        assert_eq!(summary.recent_customers.len(), 1);
    }

    #[test]
    fn list_envelope_defaults_missing_data() {
        let envelope: ListEnvelope<Customer> = serde_json::from_str("{}").expect("envelope");
        assert!(envelope.data.is_empty());
    }
}
