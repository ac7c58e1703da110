use serde::{Deserialize, Serialize};

/// Anything the content layer can offer for practice.
///
/// The scheduler only needs an identifier and, optionally, a category used
/// for session diversity.
pub trait CandidateItem {
  fn item_id(&self) -> &str;

  fn category(&self) -> Option<&str> {
    None
  }
}

/// Candidate as supplied by the content layer. Unknown fields are carried
/// through untouched so the caller gets its own payload back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
  #[serde(default)]
  pub id: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub category: Option<String>,
  #[serde(flatten)]
  pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Candidate {
  pub fn new(id: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      ..Self::default()
    }
  }

  pub fn with_category(mut self, category: impl Into<String>) -> Self {
    self.category = Some(category.into());
    self
  }
}

impl CandidateItem for Candidate {
  fn item_id(&self) -> &str {
    &self.id
  }

  fn category(&self) -> Option<&str> {
    self.category.as_deref()
  }
}

impl CandidateItem for String {
  fn item_id(&self) -> &str {
    self
  }
}

impl CandidateItem for &str {
  fn item_id(&self) -> &str {
    self
  }
}

/// Why a candidate was given its priority. Only the first matching signal is
/// reported, in the order overdue > struggling > weak memory > recent error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PriorityReason {
  New,
  Overdue,
  Struggling,
  WeakMemory,
  RecentError,
  Practice,
}

impl PriorityReason {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::New => "new",
      Self::Overdue => "overdue",
      Self::Struggling => "struggling",
      Self::WeakMemory => "weak-memory",
      Self::RecentError => "recent-error",
      Self::Practice => "practice",
    }
  }
}

/// Priority of one candidate in a single ranking pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateScore<'a, T> {
  pub item: &'a T,
  pub score: f64,
  pub reason: PriorityReason,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_candidate_deserialize_keeps_extra_fields() {
    let candidate: Candidate = serde_json::from_str(
      r#"{"id": "perro", "category": "animals", "german": "Hund", "difficulty": 1}"#,
    )
    .unwrap();
    assert_eq!(candidate.item_id(), "perro");
    assert_eq!(CandidateItem::category(&candidate), Some("animals"));
    assert_eq!(candidate.extra.get("german").and_then(|v| v.as_str()), Some("Hund"));

    let json = serde_json::to_value(&candidate).unwrap();
    assert_eq!(json["difficulty"], 1);
  }

  #[test]
  fn test_candidate_missing_id_defaults_to_empty() {
    let candidate: Candidate = serde_json::from_str(r#"{"category": "food"}"#).unwrap();
    assert_eq!(candidate.item_id(), "");
  }

  #[test]
  fn test_bare_ids_have_no_category() {
    let id = String::from("comer");
    assert_eq!(id.item_id(), "comer");
    assert_eq!(CandidateItem::category(&id), None);
    assert_eq!(CandidateItem::category(&"beber"), None);
  }

  #[test]
  fn test_priority_reason_serde_kebab_case() {
    assert_eq!(serde_json::to_string(&PriorityReason::WeakMemory).unwrap(), "\"weak-memory\"");
    assert_eq!(PriorityReason::RecentError.as_str(), "recent-error");
  }
}
