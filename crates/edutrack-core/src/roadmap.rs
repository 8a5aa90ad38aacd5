//! The roadmap forest: an arena over a set of topics linked by parent id.
//!
//! Topics are stored flat and indexed by id. Construction rejects any parent
//! cycle inside the set, so every traversal afterwards terminates. A topic
//! whose parent is not part of the set is treated as a root ("orphan
//! promotion"): a filtered view, such as one teacher's topics, still renders
//! as a forest.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::{
  Error, Result,
  topic::{Topic, TopicStatus},
};

// ─── Forest ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RoadmapForest {
  topics:   HashMap<Uuid, Topic>,
  /// Child ids per parent, in sibling order.
  children: HashMap<Uuid, Vec<Uuid>>,
  /// Topics with no parent in the set, in sibling order.
  roots:    Vec<Uuid>,
}

impl RoadmapForest {
  /// Build the arena. Fails with [`Error::TopicCycle`] if any ancestor chain
  /// inside the set loops back on itself.
  pub fn new(topics: impl IntoIterator<Item = Topic>) -> Result<Self> {
    let topics: HashMap<Uuid, Topic> =
      topics.into_iter().map(|t| (t.topic_id, t)).collect();

    check_acyclic(&topics)?;

    let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    let mut roots = Vec::new();
    for topic in topics.values() {
      match topic.parent_id.filter(|p| topics.contains_key(p)) {
        Some(parent) => children.entry(parent).or_default().push(topic.topic_id),
        None => roots.push(topic.topic_id),
      }
    }

    let sort = |ids: &mut Vec<Uuid>| {
      ids.sort_by(|a, b| sibling_key(&topics[a]).cmp(&sibling_key(&topics[b])))
    };
    sort(&mut roots);
    for ids in children.values_mut() {
      sort(ids);
    }

    Ok(Self { topics, children, roots })
  }

  pub fn len(&self) -> usize { self.topics.len() }

  pub fn is_empty(&self) -> bool { self.topics.is_empty() }

  pub fn get(&self, id: Uuid) -> Option<&Topic> { self.topics.get(&id) }

  fn require(&self, id: Uuid) -> Result<&Topic> {
    self.topics.get(&id).ok_or(Error::TopicNotFound(id))
  }

  /// Root topics (including promoted orphans) in sibling order.
  pub fn roots(&self) -> Vec<&Topic> {
    self.roots.iter().map(|id| &self.topics[id]).collect()
  }

  /// Direct children ordered by `order`, ties broken by title.
  pub fn children_of(&self, id: Uuid) -> Result<Vec<&Topic>> {
    self.require(id)?;
    Ok(
      self
        .children
        .get(&id)
        .map(|ids| ids.iter().map(|c| &self.topics[c]).collect())
        .unwrap_or_default(),
    )
  }

  /// Number of ancestors of `id` inside the set; 0 for a root.
  pub fn depth(&self, id: Uuid) -> Result<usize> {
    let mut current = self.require(id)?;
    let mut depth = 0;
    while let Some(parent) = current.parent_id.and_then(|p| self.topics.get(&p)) {
      depth += 1;
      if depth > self.topics.len() {
        return Err(Error::TopicCycle(id));
      }
      current = parent;
    }
    Ok(depth)
  }

  /// Pre-order walk of the subtree under `id`, excluding `id` itself.
  pub fn descendants(&self, id: Uuid) -> Result<Vec<&Topic>> {
    self.require(id)?;
    let mut out = Vec::new();
    let mut stack: Vec<Uuid> = self.child_ids(id).iter().rev().copied().collect();
    while let Some(next) = stack.pop() {
      out.push(&self.topics[&next]);
      stack.extend(self.child_ids(next).iter().rev());
    }
    Ok(out)
  }

  fn child_ids(&self, id: Uuid) -> &[Uuid] {
    self.children.get(&id).map(Vec::as_slice).unwrap_or_default()
  }

  /// Nested tree nodes for every root. With `tests` set, nodes carry their
  /// scheduled-test metadata evaluated against that date.
  ///
  /// Nodes are assembled bottom-up from a pre-order listing, so chain length
  /// is bounded by the heap rather than the call stack.
  pub fn materialize(&self, tests: Option<NaiveDate>) -> Vec<TreeNode> {
    let mut order = Vec::with_capacity(self.topics.len());
    let mut stack: Vec<Uuid> = self.roots.iter().rev().copied().collect();
    while let Some(id) = stack.pop() {
      order.push(id);
      stack.extend(self.child_ids(id).iter().rev());
    }

    let mut built: HashMap<Uuid, TreeNode> = HashMap::with_capacity(order.len());
    for id in order.into_iter().rev() {
      let children = self
        .child_ids(id)
        .iter()
        .filter_map(|c| built.remove(c))
        .collect();
      built.insert(id, self.node(id, tests, children));
    }

    self.roots.iter().filter_map(|id| built.remove(id)).collect()
  }

  fn node(&self, id: Uuid, tests: Option<NaiveDate>, children: Vec<TreeNode>) -> TreeNode {
    let topic = &self.topics[&id];
    TreeNode {
      id:          topic.topic_id,
      name:        topic.title.clone(),
      status:      topic.status,
      description: topic.description.clone(),
      order:       topic.order,
      test:        tests.map(|today| TestInfo {
        test_scheduled:    topic.test.as_ref().map(|t| t.date),
        test_title:        topic.test.as_ref().map(|t| t.title.clone()).unwrap_or_default(),
        has_upcoming_test: topic.has_upcoming_test(today),
      }),
      children,
    }
  }

  pub fn completion_percentage(&self) -> f64 {
    completion_percentage(self.topics.values())
  }

  pub fn progress(&self, today: NaiveDate) -> RoadmapProgress {
    RoadmapProgress::from_topics(self.topics.values(), today)
  }
}

fn sibling_key(topic: &Topic) -> (i32, &str, Uuid) {
  (topic.order, topic.title.as_str(), topic.topic_id)
}

/// Three-colour walk over parent links: any chain that reaches a topic
/// already on the current path is a cycle.
fn check_acyclic(topics: &HashMap<Uuid, Topic>) -> Result<()> {
  let mut done: HashSet<Uuid> = HashSet::with_capacity(topics.len());
  for start in topics.keys() {
    let mut path: HashSet<Uuid> = HashSet::new();
    let mut cursor = Some(*start);
    while let Some(id) = cursor {
      if done.contains(&id) {
        break;
      }
      if !path.insert(id) {
        return Err(Error::TopicCycle(id));
      }
      cursor = topics[&id].parent_id.filter(|p| topics.contains_key(p));
    }
    done.extend(path);
  }
  Ok(())
}

/// Build a forest from `topics` and materialize every tree, promoting
/// orphans to roots.
pub fn materialize_tree(
  topics: impl IntoIterator<Item = Topic>,
  tests: Option<NaiveDate>,
) -> Result<Vec<TreeNode>> {
  Ok(RoadmapForest::new(topics)?.materialize(tests))
}

/// Share of completed topics, in percent rounded to one decimal. An empty
/// set is 0.
pub fn completion_percentage<'a>(topics: impl IntoIterator<Item = &'a Topic>) -> f64 {
  let (total, completed) = topics.into_iter().fold((0usize, 0usize), |(t, c), topic| {
    (t + 1, c + usize::from(topic.status == TopicStatus::Completed))
  });
  percentage(completed, total)
}

fn percentage(part: usize, total: usize) -> f64 {
  if total == 0 {
    return 0.0;
  }
  (part as f64 / total as f64 * 1000.0).round() / 10.0
}

// ─── Materialised view ───────────────────────────────────────────────────────

/// One node of a materialized roadmap tree, as rendered by dashboards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode {
  pub id:          Uuid,
  pub name:        String,
  pub status:      TopicStatus,
  pub description: String,
  pub order:       i32,
  #[serde(flatten)]
  pub test:        Option<TestInfo>,
  pub children:    Vec<TreeNode>,
}

impl Drop for TreeNode {
  // Unlinks descendants one at a time; the derived drop would recurse once
  // per level.
  fn drop(&mut self) {
    let mut pending = std::mem::take(&mut self.children);
    while let Some(mut node) = pending.pop() {
      pending.append(&mut node.children);
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestInfo {
  pub test_scheduled:    Option<NaiveDate>,
  pub test_title:        String,
  pub has_upcoming_test: bool,
}

/// Flatten a materialized forest back into `(topic, parent)` edges in
/// pre-order. Roots have no parent.
pub fn flatten_tree(nodes: &[TreeNode]) -> Vec<(Uuid, Option<Uuid>)> {
  let mut out = Vec::new();
  let mut stack: Vec<(&TreeNode, Option<Uuid>)> =
    nodes.iter().rev().map(|n| (n, None)).collect();
  while let Some((node, parent)) = stack.pop() {
    out.push((node.id, parent));
    stack.extend(node.children.iter().rev().map(|c| (c, Some(node.id))));
  }
  out
}

// ─── Progress ────────────────────────────────────────────────────────────────

/// Roadmap figures shown on teacher and parent dashboards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoadmapProgress {
  pub total:           usize,
  pub completed:       usize,
  pub in_progress:     usize,
  pub tests_scheduled: usize,
  pub upcoming_tests:  usize,
  pub percentage:      f64,
}

impl RoadmapProgress {
  pub fn from_topics<'a>(
    topics: impl IntoIterator<Item = &'a Topic>,
    today: NaiveDate,
  ) -> Self {
    let mut p = Self {
      total:           0,
      completed:       0,
      in_progress:     0,
      tests_scheduled: 0,
      upcoming_tests:  0,
      percentage:      0.0,
    };
    for topic in topics {
      p.total += 1;
      match topic.status {
        TopicStatus::Completed => p.completed += 1,
        TopicStatus::InProgress => p.in_progress += 1,
        TopicStatus::NotStarted | TopicStatus::Upcoming => {}
      }
      if topic.test.is_some() {
        p.tests_scheduled += 1;
      }
      if topic.has_upcoming_test(today) {
        p.upcoming_tests += 1;
      }
    }
    p.percentage = percentage(p.completed, p.total);
    p
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;
  use crate::topic::ScheduledTest;

  fn topic(id: u128, parent: Option<u128>, order: i32, title: &str) -> Topic {
    let now = Utc::now();
    Topic {
      topic_id:        Uuid::from_u128(id),
      owner_id:        Uuid::nil(),
      parent_id:       parent.map(Uuid::from_u128),
      title:           title.into(),
      description:     String::new(),
      resources:       String::new(),
      order,
      status:          TopicStatus::Upcoming,
      subject:         String::new(),
      grade:           String::new(),
      estimated_hours: None,
      test:            None,
      created_at:      now,
      updated_at:      now,
    }
  }

  fn ids(topics: &[&Topic]) -> Vec<u128> {
    topics.iter().map(|t| t.topic_id.as_u128()).collect()
  }

  #[test]
  fn depth_and_descendants_of_a_chain() {
    let forest = RoadmapForest::new([
      topic(1, None, 0, "Root"),
      topic(2, Some(1), 0, "Child"),
      topic(3, Some(2), 0, "Grandchild"),
    ])
    .unwrap();

    assert_eq!(forest.depth(Uuid::from_u128(1)).unwrap(), 0);
    assert_eq!(forest.depth(Uuid::from_u128(3)).unwrap(), 2);
    let desc = forest.descendants(Uuid::from_u128(1)).unwrap();
    assert_eq!(ids(&desc), vec![2, 3]);
  }

  #[test]
  fn descendants_are_preorder_in_sibling_order() {
    let forest = RoadmapForest::new([
      topic(1, None, 0, "Root"),
      topic(2, Some(1), 2, "B"),
      topic(3, Some(1), 1, "A"),
      topic(4, Some(3), 0, "A.1"),
      topic(5, Some(2), 0, "B.1"),
    ])
    .unwrap();

    let desc = forest.descendants(Uuid::from_u128(1)).unwrap();
    assert_eq!(ids(&desc), vec![3, 4, 2, 5]);
  }

  #[test]
  fn children_sort_by_order_then_title() {
    let forest = RoadmapForest::new([
      topic(1, None, 0, "Root"),
      topic(2, Some(1), 1, "Zeta"),
      topic(3, Some(1), 1, "Alpha"),
      topic(4, Some(1), 0, "Omega"),
    ])
    .unwrap();

    let children = forest.children_of(Uuid::from_u128(1)).unwrap();
    assert_eq!(ids(&children), vec![4, 3, 2]);
    assert!(forest.children_of(Uuid::from_u128(4)).unwrap().is_empty());
  }

  #[test]
  fn unknown_topic_is_not_found() {
    let forest = RoadmapForest::new([topic(1, None, 0, "Root")]).unwrap();
    assert!(matches!(
      forest.depth(Uuid::from_u128(9)),
      Err(Error::TopicNotFound(_))
    ));
  }

  #[test]
  fn cycles_are_rejected() {
    let err = RoadmapForest::new([
      topic(1, Some(3), 0, "A"),
      topic(2, Some(1), 0, "B"),
      topic(3, Some(2), 0, "C"),
    ])
    .unwrap_err();
    assert!(matches!(err, Error::TopicCycle(_)));

    let err = RoadmapForest::new([topic(1, Some(1), 0, "Self")]).unwrap_err();
    assert!(matches!(err, Error::TopicCycle(id) if id == Uuid::from_u128(1)));
  }

  #[test]
  fn orphans_are_promoted_to_roots() {
    let forest = RoadmapForest::new([
      topic(2, Some(1), 0, "Child of missing"),
      topic(3, Some(2), 0, "Grandchild"),
      topic(4, None, 1, "Real root"),
    ])
    .unwrap();

    assert_eq!(ids(&forest.roots()), vec![2, 4]);
    assert_eq!(forest.depth(Uuid::from_u128(2)).unwrap(), 0);
    assert_eq!(forest.depth(Uuid::from_u128(3)).unwrap(), 1);

    let tree = forest.materialize(None);
    assert_eq!(tree.len(), 2);
    assert_eq!(tree[0].children[0].id, Uuid::from_u128(3));
  }

  #[test]
  fn materialize_then_flatten_reproduces_edges() {
    let topics = vec![
      topic(1, None, 0, "Numbers"),
      topic(2, Some(1), 0, "Integers"),
      topic(3, Some(1), 1, "Fractions"),
      topic(4, Some(3), 0, "Equivalent fractions"),
      topic(5, None, 1, "Geometry"),
      topic(6, Some(5), 0, "Angles"),
    ];
    let mut expected: Vec<(Uuid, Option<Uuid>)> =
      topics.iter().map(|t| (t.topic_id, t.parent_id)).collect();

    let tree = materialize_tree(topics, None).unwrap();
    let mut edges = flatten_tree(&tree);
    assert_eq!(edges.len(), expected.len());

    edges.sort();
    expected.sort();
    assert_eq!(edges, expected);
  }

  #[test]
  fn deep_chains_materialize_and_flatten() {
    const DEPTH: u128 = 50_000;
    let topics: Vec<Topic> = (1..=DEPTH)
      .map(|n| topic(n, (n > 1).then(|| n - 1), 0, "Step"))
      .collect();

    let forest = RoadmapForest::new(topics).unwrap();
    assert_eq!(forest.depth(Uuid::from_u128(DEPTH)).unwrap(), DEPTH as usize - 1);

    let tree = forest.materialize(None);
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].children[0].id, Uuid::from_u128(2));

    let edges = flatten_tree(&tree);
    assert_eq!(edges.len(), DEPTH as usize);
    assert_eq!(edges[0], (Uuid::from_u128(1), None));
    assert_eq!(
      edges[DEPTH as usize - 1],
      (Uuid::from_u128(DEPTH), Some(Uuid::from_u128(DEPTH - 1)))
    );
  }

  #[test]
  fn completion_percentage_rounds_to_one_decimal() {
    let mut topics = vec![
      topic(1, None, 0, "A"),
      topic(2, None, 1, "B"),
      topic(3, None, 2, "C"),
    ];
    topics[0].status = TopicStatus::Completed;
    assert_eq!(completion_percentage(&topics), 33.3);

    topics[1].status = TopicStatus::Completed;
    assert_eq!(completion_percentage(&topics), 66.7);
  }

  #[test]
  fn completion_percentage_of_nothing_is_zero() {
    let none: Vec<Topic> = Vec::new();
    assert_eq!(completion_percentage(&none), 0.0);
    assert_eq!(RoadmapForest::new(none).unwrap().completion_percentage(), 0.0);
  }

  #[test]
  fn tree_json_includes_tests_only_when_asked() {
    let today = NaiveDate::from_ymd_opt(2026, 4, 1).unwrap();
    let mut root = topic(1, None, 0, "Root");
    root.test = Some(ScheduledTest {
      date:             today,
      title:            "Quiz".into(),
      duration_minutes: None,
    });
    let forest = RoadmapForest::new([root]).unwrap();

    let plain = serde_json::to_value(forest.materialize(None)).unwrap();
    assert!(plain[0].get("test_title").is_none());
    assert_eq!(plain[0]["name"], "Root");
    assert_eq!(plain[0]["status"], "upcoming");

    let with_tests = serde_json::to_value(forest.materialize(Some(today))).unwrap();
    assert_eq!(with_tests[0]["test_title"], "Quiz");
    assert_eq!(with_tests[0]["test_scheduled"], "2026-04-01");
    assert_eq!(with_tests[0]["has_upcoming_test"], true);
  }

  #[test]
  fn progress_counts() {
    let today = NaiveDate::from_ymd_opt(2026, 4, 1).unwrap();
    let mut topics = vec![
      topic(1, None, 0, "A"),
      topic(2, None, 1, "B"),
      topic(3, None, 2, "C"),
      topic(4, None, 3, "D"),
    ];
    topics[0].status = TopicStatus::Completed;
    topics[1].status = TopicStatus::InProgress;
    topics[2].test = Some(ScheduledTest {
      date:             today.pred_opt().unwrap(),
      title:            "Past".into(),
      duration_minutes: None,
    });
    topics[3].test = Some(ScheduledTest {
      date:             today,
      title:            "Today".into(),
      duration_minutes: Some(30),
    });

    let p = RoadmapProgress::from_topics(&topics, today);
    assert_eq!(p.total, 4);
    assert_eq!(p.completed, 1);
    assert_eq!(p.in_progress, 1);
    assert_eq!(p.tests_scheduled, 2);
    assert_eq!(p.upcoming_tests, 1);
    assert_eq!(p.percentage, 25.0);
  }
}
