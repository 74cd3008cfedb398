//! Turns the provider's payload dialects into a [`WebhookEvent`].
//!
//! Each field is found by walking an ordered list of [`ExtractionRule`]s over
//! the parsed body; the first rule yielding a usable value wins. Nothing here
//! fails: a field that cannot be found is `None` and the resolvers downstream
//! decide what that means.

use {
    crate::domain::{
        event::{BuyerRef, WebhookEvent},
        money::MoneyAmount,
    },
    regex::Regex,
    serde_json::{Map, Value},
    std::sync::LazyLock,
};

/// Event kinds that mean "the buyer has paid".
pub const SETTLEABLE_EVENT_KINDS: [&str; 5] = [
    "sale.completed",
    "order.completed",
    "payment.succeeded",
    "purchase.completed",
    "paid",
];

const LINE_ITEM_URL_FIELDS: [&str; 3] = ["product_link", "product_url", "url"];

/// One way of locating a value inside a payload tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionRule {
    /// Nested object keys, e.g. `["order", "email"]`.
    Path(&'static [&'static str]),
    /// Query parameter `param` of the product URL of any line item found at
    /// `items` (an array or a single object).
    LineItemQuery {
        items: &'static [&'static str],
        param: &'static str,
    },
}

impl ExtractionRule {
    pub fn apply(&self, tree: &Value) -> Option<Value> {
        match self {
            Self::Path(path) => lookup(tree, path).filter(|v| !v.is_null()).cloned(),
            Self::LineItemQuery { items, param } => {
                let items = lookup(tree, items)?;
                let items: Vec<&Value> = match items {
                    Value::Array(list) => list.iter().collect(),
                    Value::Object(_) => vec![items],
                    _ => return None,
                };
                items
                    .into_iter()
                    .flat_map(|item| LINE_ITEM_URL_FIELDS.iter().filter_map(|f| item.get(*f)))
                    .filter_map(Value::as_str)
                    .find_map(|link| query_param(link, param))
                    .map(Value::String)
            }
        }
    }
}

pub const AMOUNT_RULES: &[ExtractionRule] = &[
    ExtractionRule::Path(&["amount"]),
    ExtractionRule::Path(&["total"]),
    ExtractionRule::Path(&["price"]),
    ExtractionRule::Path(&["paid"]),
    ExtractionRule::Path(&["charged"]),
    ExtractionRule::Path(&["data", "amount"]),
    ExtractionRule::Path(&["data", "order", "total"]),
    ExtractionRule::Path(&["data", "order", "amount"]),
    ExtractionRule::Path(&["order", "amount"]),
    ExtractionRule::Path(&["order", "total"]),
];

pub const BUYER_UID_RULES: &[ExtractionRule] = &[
    ExtractionRule::Path(&["buyer"]),
    ExtractionRule::Path(&["metadata", "buyer"]),
    ExtractionRule::Path(&["custom_fields", "buyer"]),
    ExtractionRule::Path(&["custom", "buyer"]),
    ExtractionRule::Path(&["order", "buyer"]),
    ExtractionRule::Path(&["uid"]),
    ExtractionRule::Path(&["userId"]),
    ExtractionRule::Path(&["custom_fields", "uid"]),
    ExtractionRule::Path(&["data", "order", "custom_fields", "uid"]),
    ExtractionRule::Path(&["metadata", "uid"]),
    ExtractionRule::LineItemQuery { items: &["items"], param: "buyer" },
    ExtractionRule::LineItemQuery { items: &["order", "items"], param: "buyer" },
    ExtractionRule::LineItemQuery { items: &["items"], param: "ref" },
    ExtractionRule::LineItemQuery { items: &["order", "items"], param: "ref" },
];

pub const EMAIL_RULES: &[ExtractionRule] = &[
    ExtractionRule::Path(&["email"]),
    ExtractionRule::Path(&["customer_email"]),
    ExtractionRule::Path(&["order", "email"]),
    ExtractionRule::Path(&["customer", "email"]),
];

pub const ORDER_ID_RULES: &[ExtractionRule] = &[
    ExtractionRule::Path(&["order_id"]),
    ExtractionRule::Path(&["id"]),
    ExtractionRule::Path(&["order", "id"]),
    ExtractionRule::Path(&["data", "order", "id"]),
    ExtractionRule::Path(&["transaction_id"]),
];

pub const EVENT_KIND_RULES: &[ExtractionRule] = &[
    ExtractionRule::Path(&["event"]),
    ExtractionRule::Path(&["type"]),
];

pub const PACK_REF_RULES: &[ExtractionRule] = &[
    ExtractionRule::Path(&["pack"]),
    ExtractionRule::Path(&["pack_id"]),
    ExtractionRule::Path(&["metadata", "pack"]),
    ExtractionRule::Path(&["custom_fields", "pack"]),
];

// Heuristic only: catches amounts under keys no rule above knows about.
static AMOUNT_FALLBACK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)"(amount|total|price)"\s*:\s*"?(\d+(?:\.\d+)?)"#).expect("valid regex")
});

/// Parses a webhook body into a JSON object. JSON is tried first, then URL
/// encoding (reversed for form content types); anything else is empty.
pub fn parse_body(raw_body: &[u8], content_type: Option<&str>) -> Value {
    let form_first = content_type
        .is_some_and(|ct| ct.to_ascii_lowercase().starts_with("application/x-www-form-urlencoded"));

    let parsed = if form_first {
        parse_form(raw_body).or_else(|| parse_json(raw_body))
    } else {
        parse_json(raw_body).or_else(|| parse_form(raw_body))
    };
    parsed.unwrap_or_else(|| Value::Object(Map::new()))
}

pub fn normalize(raw_body: &[u8], content_type: Option<&str>) -> WebhookEvent {
    let tree = parse_body(raw_body, content_type);

    WebhookEvent {
        event_kind: first_text(&tree, EVENT_KIND_RULES),
        amount: extract_amount(&tree),
        buyer: BuyerRef {
            uid: first_text(&tree, BUYER_UID_RULES),
            email: first_text(&tree, EMAIL_RULES),
        },
        order_id: first_text(&tree, ORDER_ID_RULES),
        pack_ref: first_text(&tree, PACK_REF_RULES),
    }
}

/// `true` when the event should be settled: no declared kind, or a kind on
/// the allow-list.
pub fn is_settleable(event_kind: Option<&str>) -> bool {
    match event_kind {
        None => true,
        Some(kind) => SETTLEABLE_EVENT_KINDS.contains(&kind.trim()),
    }
}

pub fn extract_amount(tree: &Value) -> Option<MoneyAmount> {
    AMOUNT_RULES
        .iter()
        .filter_map(|rule| rule.apply(tree))
        .find_map(|v| positive_amount(&v))
        .or_else(|| {
            let serialized = tree.to_string();
            AMOUNT_FALLBACK
                .captures_iter(&serialized)
                .filter_map(|c| c.get(2))
                .filter_map(|m| m.as_str().parse::<f64>().ok())
                .find_map(amount_from_units)
        })
}

pub fn first_text(tree: &Value, rules: &[ExtractionRule]) -> Option<String> {
    rules.iter().filter_map(|rule| rule.apply(tree)).find_map(|v| text(&v))
}

fn positive_amount(value: &Value) -> Option<MoneyAmount> {
    let units = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    amount_from_units(units)
}

fn amount_from_units(units: f64) -> Option<MoneyAmount> {
    if !units.is_finite() || units <= 0.0 {
        return None;
    }
    MoneyAmount::from_decimal(units).ok().filter(|a| a.cents() > 0)
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn lookup<'a>(tree: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(tree, |node, key| node.get(*key))
}

fn query_param(link: &str, param: &str) -> Option<String> {
    let url = url::Url::parse(link.trim()).ok()?;
    url.query_pairs()
        .find(|(k, _)| k == param)
        .map(|(_, v)| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_json(raw_body: &[u8]) -> Option<Value> {
    serde_json::from_slice::<Value>(raw_body)
        .ok()
        .filter(Value::is_object)
}

fn parse_form(raw_body: &[u8]) -> Option<Value> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(raw_body).ok()?;
    if pairs.is_empty() {
        return None;
    }
    let object = pairs
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect::<Map<String, Value>>();
    Some(Value::Object(object))
}
