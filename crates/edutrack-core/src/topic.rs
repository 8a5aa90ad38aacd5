//! Curriculum roadmap topics.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Progress label on a topic. Any state may follow any other; there is no
/// transition graph.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TopicStatus {
  NotStarted,
  #[default]
  Upcoming,
  InProgress,
  Completed,
}

impl TopicStatus {
  pub fn parse(s: &str) -> Result<Self> {
    s.parse().map_err(|_| Error::UnknownStatus(s.to_owned()))
  }

  pub fn as_str(self) -> &'static str { self.into() }
}

/// A test scheduled against a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledTest {
  pub date:             NaiveDate,
  #[serde(default)]
  pub title:            String,
  pub duration_minutes: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
  pub topic_id:        Uuid,
  /// The teacher who created the topic; only they may edit it.
  pub owner_id:        Uuid,
  pub parent_id:       Option<Uuid>,
  pub title:           String,
  pub description:     String,
  /// Free-text links or reading material for the topic.
  pub resources:       String,
  /// Sibling sort key; ties are broken by title.
  pub order:           i32,
  pub status:          TopicStatus,
  pub subject:         String,
  pub grade:           String,
  pub estimated_hours: Option<u32>,
  pub test:            Option<ScheduledTest>,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

impl Topic {
  pub fn has_upcoming_test(&self, today: NaiveDate) -> bool {
    self.test.as_ref().is_some_and(|t| t.date >= today)
  }
}

/// Input to [`crate::store::SchoolStore::create_topic`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTopic {
  pub owner_id:        Uuid,
  pub title:           String,
  #[serde(default)]
  pub parent_id:       Option<Uuid>,
  #[serde(default)]
  pub description:     String,
  #[serde(default)]
  pub resources:       String,
  #[serde(default)]
  pub order:           i32,
  #[serde(default)]
  pub status:          TopicStatus,
  #[serde(default)]
  pub subject:         String,
  #[serde(default)]
  pub grade:           String,
  #[serde(default)]
  pub estimated_hours: Option<u32>,
  #[serde(default)]
  pub test:            Option<ScheduledTest>,
}

impl NewTopic {
  /// Convenience constructor with all optional fields set to their defaults.
  pub fn new(owner_id: Uuid, title: impl Into<String>) -> Self {
    Self {
      owner_id,
      title: title.into(),
      parent_id: None,
      description: String::new(),
      resources: String::new(),
      order: 0,
      status: TopicStatus::default(),
      subject: String::new(),
      grade: String::new(),
      estimated_hours: None,
      test: None,
    }
  }

  pub fn with_parent(mut self, parent_id: Uuid) -> Self {
    self.parent_id = Some(parent_id);
    self
  }

  pub fn with_order(mut self, order: i32) -> Self {
    self.order = order;
    self
  }

  pub fn with_status(mut self, status: TopicStatus) -> Self {
    self.status = status;
    self
  }
}

/// Partial update for [`crate::store::SchoolStore::update_topic`]. `None`
/// leaves a field unchanged; `parent_id: Some(None)` detaches the topic to
/// become a root.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopicPatch {
  pub title:           Option<String>,
  pub description:     Option<String>,
  pub resources:       Option<String>,
  #[serde(default, with = "double_option")]
  pub parent_id:       Option<Option<Uuid>>,
  pub order:           Option<i32>,
  pub status:          Option<TopicStatus>,
  pub subject:         Option<String>,
  pub grade:           Option<String>,
  #[serde(default, with = "double_option")]
  pub estimated_hours: Option<Option<u32>>,
  #[serde(default, with = "double_option")]
  pub test:            Option<Option<ScheduledTest>>,
}

impl TopicPatch {
  /// Apply the patch to `topic` in place. Parent validity is the caller's
  /// concern.
  pub fn apply(self, topic: &mut Topic) {
    if let Some(title) = self.title {
      topic.title = title;
    }
    if let Some(description) = self.description {
      topic.description = description;
    }
    if let Some(resources) = self.resources {
      topic.resources = resources;
    }
    if let Some(parent_id) = self.parent_id {
      topic.parent_id = parent_id;
    }
    if let Some(order) = self.order {
      topic.order = order;
    }
    if let Some(status) = self.status {
      topic.status = status;
    }
    if let Some(subject) = self.subject {
      topic.subject = subject;
    }
    if let Some(grade) = self.grade {
      topic.grade = grade;
    }
    if let Some(hours) = self.estimated_hours {
      topic.estimated_hours = hours;
    }
    if let Some(test) = self.test {
      topic.test = test;
    }
  }
}

/// Distinguishes an absent JSON field (`None`) from an explicit `null`
/// (`Some(None)`).
mod double_option {
  use serde::{Deserialize, Deserializer, Serialize, Serializer};

  pub fn serialize<T, S>(value: &Option<Option<T>>, s: S) -> Result<S::Ok, S::Error>
  where
    T: Serialize,
    S: Serializer,
  {
    match value {
      Some(inner) => inner.serialize(s),
      None => s.serialize_none(),
    }
  }

  pub fn deserialize<'de, T, D>(d: D) -> Result<Option<Option<T>>, D::Error>
  where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
  {
    Option::<T>::deserialize(d).map(Some)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_accepts_snake_case() {
    assert_eq!(TopicStatus::parse("in_progress").unwrap(), TopicStatus::InProgress);
    assert_eq!(TopicStatus::NotStarted.as_str(), "not_started");
    assert!(TopicStatus::parse("done").is_err());
  }

  #[test]
  fn patch_distinguishes_missing_and_null_parent() {
    let keep: TopicPatch = serde_json::from_str(r#"{"title":"Algebra"}"#).unwrap();
    assert!(keep.parent_id.is_none());

    let detach: TopicPatch = serde_json::from_str(r#"{"parent_id":null}"#).unwrap();
    assert_eq!(detach.parent_id, Some(None));

    let id = Uuid::new_v4();
    let move_to: TopicPatch =
      serde_json::from_str(&format!(r#"{{"parent_id":"{id}"}}"#)).unwrap();
    assert_eq!(move_to.parent_id, Some(Some(id)));
  }

  #[test]
  fn patch_updates_resources_only_when_present() {
    let now = Utc::now();
    let mut topic = Topic {
      topic_id:        Uuid::new_v4(),
      owner_id:        Uuid::new_v4(),
      parent_id:       None,
      title:           "Fractions".into(),
      description:     String::new(),
      resources:       "Chapter 4".into(),
      order:           0,
      status:          TopicStatus::Upcoming,
      subject:         String::new(),
      grade:           String::new(),
      estimated_hours: None,
      test:            None,
      created_at:      now,
      updated_at:      now,
    };

    let untouched: TopicPatch = serde_json::from_str(r#"{"title":"Decimals"}"#).unwrap();
    untouched.apply(&mut topic);
    assert_eq!(topic.resources, "Chapter 4");

    let replaced: TopicPatch =
      serde_json::from_str(r#"{"resources":"Worksheet 2"}"#).unwrap();
    replaced.apply(&mut topic);
    assert_eq!(topic.resources, "Worksheet 2");
    assert_eq!(topic.title, "Decimals");
  }

  #[test]
  fn upcoming_test_includes_today() {
    let now = Utc::now();
    let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
    let mut topic = Topic {
      topic_id:        Uuid::new_v4(),
      owner_id:        Uuid::new_v4(),
      parent_id:       None,
      title:           "Fractions".into(),
      description:     String::new(),
      resources:       String::new(),
      order:           0,
      status:          TopicStatus::Upcoming,
      subject:         "Maths".into(),
      grade:           "5".into(),
      estimated_hours: None,
      test:            None,
      created_at:      now,
      updated_at:      now,
    };
    assert!(!topic.has_upcoming_test(today));

    topic.test = Some(ScheduledTest {
      date:             today,
      title:            "Unit test".into(),
      duration_minutes: Some(45),
    });
    assert!(topic.has_upcoming_test(today));
    assert!(!topic.has_upcoming_test(today.succ_opt().unwrap()));
  }
}
