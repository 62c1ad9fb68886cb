//! Entity graph explorer
//!
//! Builds the category tree below a root entity. The root's category
//! relations seed the top level; every non-dataset node is expanded through
//! its child relations until a dataset leaf, a visited node, the depth bound
//! or cancellation stops the branch.
//!
//! Sibling branches run concurrently and share one visited set. Claiming a
//! node is a single `HashSet::insert` under a mutex, so two branches racing
//! toward the same id cannot both expand it.

pub mod lookup;
pub mod matcher;

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use futures::future::{join_all, BoxFuture};
use futures::FutureExt;

use crate::cancel::CancelSignal;
use crate::config::ExplorerConfig;
use crate::transport::Transport;
use opengin_types::{AttributeTable, ExploreResult, GraphNode, RelationMeta};

pub use lookup::{find_entity, relations_from, GraphApi, TimeWindow};
pub use matcher::RelationMatcher;

/// Traversal settings
#[derive(Debug, Clone)]
pub struct ExploreOptions {
    /// Deepest level kept; root-level categories sit at depth 0
    pub max_depth: usize,
    /// Relation from the root entity to its top-level categories
    pub category_relation: String,
    /// `kind.major` marking a dataset leaf
    pub dataset_kind: String,
    pub matcher: RelationMatcher,
}

impl ExploreOptions {
    pub fn from_config(config: &ExplorerConfig) -> Self {
        Self {
            max_depth: config.max_depth,
            category_relation: config.category_relation.clone(),
            dataset_kind: config.dataset_kind.clone(),
            matcher: RelationMatcher::from_config(&config.child_relations),
        }
    }
}

impl Default for ExploreOptions {
    fn default() -> Self {
        Self::from_config(&ExplorerConfig::default())
    }
}

/// Category tree explorer over a graph API transport
#[derive(Clone)]
pub struct Explorer {
    api: GraphApi,
    options: ExploreOptions,
}

impl Explorer {
    pub fn new(transport: Arc<dyn Transport>, options: ExploreOptions) -> Self {
        Self {
            api: GraphApi::new(transport),
            options,
        }
    }

    pub fn from_config(transport: Arc<dyn Transport>, config: &ExplorerConfig) -> Self {
        Self::new(transport, ExploreOptions::from_config(config))
    }

    pub fn api(&self) -> &GraphApi {
        &self.api
    }

    pub fn options(&self) -> &ExploreOptions {
        &self.options
    }

    /// Explore the category tree below `root_id`
    ///
    /// Lookup failures prune branches silently. The only error ever reported
    /// is cancellation, and a cancelled result carries no partial tree.
    pub async fn explore(&self, root_id: &str, signal: &CancelSignal) -> ExploreResult {
        if signal.is_cancelled() {
            return ExploreResult::cancelled(root_id);
        }

        tracing::info!(entity_id = %root_id, "Exploring entity graph");

        let relations = self
            .api
            .fetch_entity_relations(root_id, Some(&self.options.category_relation), signal)
            .await;
        tracing::debug!(
            entity_id = %root_id,
            count = relations.len(),
            relation = %self.options.category_relation,
            "category relations"
        );

        let traversal = Traversal::new(self, signal);
        let roots = join_all(
            relations
                .iter()
                .map(|rel| traversal.explore_node(rel.related_entity_id.clone(), 0, None)),
        )
        .await;

        if signal.is_cancelled() {
            tracing::info!(entity_id = %root_id, "Exploration cancelled");
            return ExploreResult::cancelled(root_id);
        }

        let categories: Vec<GraphNode> = relations
            .iter()
            .zip(roots)
            .filter_map(|(rel, node)| {
                node.map(|mut node| {
                    node.relation =
                        Some(RelationMeta::from(rel).renamed(&self.options.category_relation));
                    node
                })
            })
            .collect();

        let result = ExploreResult {
            categories,
            relations,
            ..ExploreResult::new(root_id)
        };

        let stats = result.stats();
        tracing::info!(
            entity_id = %root_id,
            categories = result.categories.len(),
            nodes = stats.total,
            datasets = stats.datasets,
            "Exploration complete"
        );
        result
    }

    /// Explore the subtree rooted at a single node, at depth 0
    pub async fn explore_subtree(&self, node_id: &str, signal: &CancelSignal) -> Option<GraphNode> {
        Traversal::new(self, signal)
            .explore_node(node_id.to_string(), 0, None)
            .await
    }

    /// Table for a dataset leaf, addressed by `(parent id, dataset name)`
    pub async fn dataset_table(
        &self,
        node: &GraphNode,
        window: Option<&TimeWindow>,
        signal: &CancelSignal,
    ) -> Option<AttributeTable> {
        let (parent_id, name) = node.attribute_address()?;
        self.api
            .fetch_attribute_value(parent_id, name, window, signal)
            .await
    }
}

/// State shared by every branch of one explore request
struct Traversal<'a> {
    explorer: &'a Explorer,
    visited: Mutex<HashSet<String>>,
    signal: &'a CancelSignal,
}

impl<'a> Traversal<'a> {
    fn new(explorer: &'a Explorer, signal: &'a CancelSignal) -> Self {
        Self {
            explorer,
            visited: Mutex::new(HashSet::new()),
            signal,
        }
    }

    /// Claim `node_id` for this traversal; false if another branch has it
    fn claim(&self, node_id: &str) -> bool {
        self.visited
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(node_id.to_string())
    }

    fn explore_node(
        &self,
        node_id: String,
        depth: usize,
        parent: Option<(String, String)>,
    ) -> BoxFuture<'_, Option<GraphNode>> {
        async move {
            let options = &self.explorer.options;
            if depth > options.max_depth || self.signal.is_cancelled() || !self.claim(&node_id) {
                return None;
            }

            let api = &self.explorer.api;
            let entity = api.fetch_entity_by_id(&node_id, self.signal).await?;
            let is_dataset = entity.kind.is_major(&options.dataset_kind);
            tracing::debug!(
                node_id = %node_id,
                depth,
                kind = %entity.kind,
                is_dataset,
                "explored node"
            );

            let (parent_id, parent_name) = parent.unzip();
            let mut node = GraphNode {
                id: node_id,
                name: entity.name,
                kind: entity.kind,
                is_dataset,
                depth,
                children: Vec::new(),
                parent_id,
                parent_name,
                relation: None,
            };

            if is_dataset {
                return Some(node);
            }

            let relations = api.fetch_entity_relations(&node.id, None, self.signal).await;
            let chosen = options.matcher.select_children(&relations);
            tracing::debug!(
                node_id = %node.id,
                relations = relations.len(),
                children = chosen.len(),
                "child relations"
            );

            let children = join_all(chosen.iter().map(|rel| {
                self.explore_node(
                    rel.related_entity_id.clone(),
                    depth + 1,
                    Some((node.id.clone(), node.name.clone())),
                )
            }))
            .await;

            node.children = chosen
                .into_iter()
                .zip(children)
                .filter_map(|(rel, child)| {
                    child.map(|mut child| {
                        child.relation = Some(RelationMeta::from(rel));
                        child
                    })
                })
                .collect();

            Some(node)
        }
        .boxed()
    }
}
