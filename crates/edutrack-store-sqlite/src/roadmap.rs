//! Topic persistence and the parent-link checks that keep the roadmap a
//! forest.

use std::collections::HashSet;

use chrono::Utc;
use edutrack_core::{
  Error as CoreError,
  roadmap::RoadmapForest,
  topic::{NewTopic, Topic, TopicPatch},
};
use rusqlite::{Connection, OptionalExtension as _};
use uuid::Uuid;

use crate::{
  Result,
  encode::{RawTopic, TOPIC_COLUMNS, encode_date, encode_dt, encode_uuid},
};

pub fn get_topic(conn: &Connection, id: Uuid) -> Result<Option<Topic>> {
  conn
    .query_row(
      &format!("SELECT {TOPIC_COLUMNS} FROM topics WHERE topic_id = ?1"),
      rusqlite::params![encode_uuid(id)],
      RawTopic::from_row,
    )
    .optional()?
    .map(RawTopic::into_topic)
    .transpose()
}

fn require_topic(conn: &Connection, id: Uuid) -> Result<Topic> {
  get_topic(conn, id)?.ok_or_else(|| CoreError::TopicNotFound(id).into())
}

pub fn list_topics(conn: &Connection, owner_id: Option<Uuid>) -> Result<Vec<Topic>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {TOPIC_COLUMNS} FROM topics
     WHERE (?1 IS NULL OR owner_id = ?1)
     ORDER BY sort_order, title, topic_id"
  ))?;
  let raws = stmt
    .query_map(rusqlite::params![owner_id.map(encode_uuid)], RawTopic::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawTopic::into_topic).collect()
}

/// The parent must exist and belong to `owner_id`.
fn check_parent(conn: &Connection, parent_id: Uuid, owner_id: Uuid) -> Result<()> {
  let parent = require_topic(conn, parent_id)?;
  if parent.owner_id != owner_id {
    return Err(CoreError::CrossOwnerParent { parent_id }.into());
  }
  Ok(())
}

pub fn create_topic(conn: &Connection, input: NewTopic) -> Result<Topic> {
  if let Some(parent_id) = input.parent_id {
    check_parent(conn, parent_id, input.owner_id)?;
  }

  let now = Utc::now();
  let topic = Topic {
    topic_id:        Uuid::new_v4(),
    owner_id:        input.owner_id,
    parent_id:       input.parent_id,
    title:           input.title,
    description:     input.description,
    resources:       input.resources,
    order:           input.order,
    status:          input.status,
    subject:         input.subject,
    grade:           input.grade,
    estimated_hours: input.estimated_hours,
    test:            input.test,
    created_at:      now,
    updated_at:      now,
  };

  conn.execute(
    "INSERT INTO topics (
       topic_id, owner_id, parent_id, title, description, sort_order, status,
       subject, grade, estimated_hours, test_date, test_title, test_duration,
       created_at, updated_at, resources
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
    rusqlite::params![
      encode_uuid(topic.topic_id),
      encode_uuid(topic.owner_id),
      topic.parent_id.map(encode_uuid),
      topic.title,
      topic.description,
      topic.order,
      topic.status.as_str(),
      topic.subject,
      topic.grade,
      topic.estimated_hours,
      topic.test.as_ref().map(|t| encode_date(t.date)),
      topic.test.as_ref().map(|t| t.title.as_str()).unwrap_or_default(),
      topic.test.as_ref().and_then(|t| t.duration_minutes),
      encode_dt(topic.created_at),
      encode_dt(topic.updated_at),
      topic.resources,
    ],
  )?;

  Ok(topic)
}

pub fn update_topic(
  conn: &Connection,
  id: Uuid,
  owner_id: Uuid,
  patch: TopicPatch,
) -> Result<Topic> {
  let mut topic = require_topic(conn, id)?;
  if topic.owner_id != owner_id {
    return Err(CoreError::NotTopicOwner(id).into());
  }

  let reparent = patch.parent_id.flatten().filter(|p| topic.parent_id != Some(*p));
  if let Some(parent_id) = reparent {
    if parent_id == id {
      return Err(CoreError::TopicCycle(id).into());
    }
    check_parent(conn, parent_id, topic.owner_id)?;
    if ancestors(conn, parent_id)?.contains(&id) {
      return Err(CoreError::TopicCycle(id).into());
    }
  }

  patch.apply(&mut topic);
  topic.updated_at = Utc::now();

  conn.execute(
    "UPDATE topics
     SET parent_id = ?2, title = ?3, description = ?4, sort_order = ?5, status = ?6,
         subject = ?7, grade = ?8, estimated_hours = ?9, test_date = ?10,
         test_title = ?11, test_duration = ?12, updated_at = ?13, resources = ?14
     WHERE topic_id = ?1",
    rusqlite::params![
      encode_uuid(topic.topic_id),
      topic.parent_id.map(encode_uuid),
      topic.title,
      topic.description,
      topic.order,
      topic.status.as_str(),
      topic.subject,
      topic.grade,
      topic.estimated_hours,
      topic.test.as_ref().map(|t| encode_date(t.date)),
      topic.test.as_ref().map(|t| t.title.as_str()).unwrap_or_default(),
      topic.test.as_ref().and_then(|t| t.duration_minutes),
      encode_dt(topic.updated_at),
      topic.resources,
    ],
  )?;

  Ok(topic)
}

/// Deletes `id` and its subtree, deepest topics first. Returns how many
/// topics were removed.
pub fn delete_topic(conn: &Connection, id: Uuid, owner_id: Uuid) -> Result<usize> {
  let topic = require_topic(conn, id)?;
  if topic.owner_id != owner_id {
    return Err(CoreError::NotTopicOwner(id).into());
  }

  let mut doomed: Vec<Uuid> = descendants(conn, id)?.iter().map(|t| t.topic_id).collect();
  doomed.insert(0, id);

  let mut stmt = conn.prepare("DELETE FROM topics WHERE topic_id = ?1")?;
  for topic_id in doomed.iter().rev() {
    stmt.execute(rusqlite::params![encode_uuid(*topic_id)])?;
  }

  Ok(doomed.len())
}

pub fn children_of(conn: &Connection, id: Uuid) -> Result<Vec<Topic>> {
  require_topic(conn, id)?;
  let mut stmt = conn.prepare(&format!(
    "SELECT {TOPIC_COLUMNS} FROM topics
     WHERE parent_id = ?1
     ORDER BY sort_order, title, topic_id"
  ))?;
  let raws = stmt
    .query_map(rusqlite::params![encode_uuid(id)], RawTopic::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawTopic::into_topic).collect()
}

fn parent_of(conn: &Connection, id: Uuid) -> Result<Option<Option<Uuid>>> {
  let parent: Option<Option<String>> = conn
    .query_row(
      "SELECT parent_id FROM topics WHERE topic_id = ?1",
      rusqlite::params![encode_uuid(id)],
      |row| row.get(0),
    )
    .optional()?;
  Ok(match parent {
    Some(p) => Some(p.as_deref().map(Uuid::parse_str).transpose()?),
    None => None,
  })
}

/// Ancestor ids of `id`, nearest first. Fails on a looping chain.
fn ancestors(conn: &Connection, id: Uuid) -> Result<Vec<Uuid>> {
  let mut out = Vec::new();
  let mut seen = HashSet::from([id]);
  let mut current = parent_of(conn, id)?.ok_or(CoreError::TopicNotFound(id))?;
  while let Some(parent) = current {
    if !seen.insert(parent) {
      return Err(CoreError::TopicCycle(id).into());
    }
    out.push(parent);
    // A dangling parent link ends the chain.
    current = parent_of(conn, parent)?.flatten();
  }
  Ok(out)
}

pub fn topic_depth(conn: &Connection, id: Uuid) -> Result<usize> {
  Ok(ancestors(conn, id)?.len())
}

/// Pre-order descendants, excluding `id` itself.
pub fn descendants(conn: &Connection, id: Uuid) -> Result<Vec<Topic>> {
  let topic = require_topic(conn, id)?;
  // Parent links never cross owners, so the owner's topics hold the subtree.
  let forest = RoadmapForest::new(list_topics(conn, Some(topic.owner_id))?)?;
  Ok(forest.descendants(id)?.into_iter().cloned().collect())
}
