//! Local syntactic context of a token
//!
//! A token's pattern key is its upos, its relation to its head, and the
//! signature of relations to its own dependents. Tokens sharing a key are
//! treated as interchangeable.

use crate::config::PatternConfig;
use crate::tree::{DepTree, Node, TokenId, TreeError};

/// Pseudo-relation marking the token's own position among its dependents
pub const SELF_RELATION: &str = "MOTHER";

/// An owned pattern key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatternKey {
    pub upos: String,
    pub deprel: String,
    pub signature: Vec<String>,
}

/// Computes children-relation signatures under a fixed configuration
#[derive(Debug, Clone, Default)]
pub struct ContextExtractor {
    config: PatternConfig,
}

impl ContextExtractor {
    pub fn new(config: PatternConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PatternConfig {
        &self.config
    }

    /// Relation labels linking token `id` to its dependents
    ///
    /// Fails with [`TreeError::NotFound`] if `id` is not in the tree.
    pub fn relations_to_children<'s>(
        &self,
        tree: &DepTree<'s>,
        id: TokenId,
    ) -> Result<Vec<&'s str>, TreeError> {
        Ok(self.node_relations(tree.find(id)?))
    }

    /// Relation labels linking an already located node to its dependents
    pub fn node_relations<'s>(&self, node: Node<'_, 's>) -> Vec<&'s str> {
        let upos = node.token().upos.as_str();

        let mut pairs: Vec<(TokenId, &'s str)> = node
            .children()
            .map(|child| (child.id(), child.token().deprel.as_str()))
            .filter(|(_, rel)| !self.config.ignores(upos, rel))
            .collect();

        if self.config.include_self {
            pairs.push((node.id(), SELF_RELATION));
        }
        // stable, so only the sentinel moves
        pairs.sort_by_key(|(child_id, _)| *child_id);

        let mut relations: Vec<&'s str> = pairs.into_iter().map(|(_, rel)| rel).collect();
        if self.config.ignore_dependent_order {
            relations.sort_unstable();
        }
        relations
    }

    /// Full pattern key for token `id`
    pub fn pattern_key(&self, tree: &DepTree<'_>, id: TokenId) -> Result<PatternKey, TreeError> {
        let token = tree.find(id)?.token();
        let signature = self
            .relations_to_children(tree, id)?
            .into_iter()
            .map(str::to_string)
            .collect();
        Ok(PatternKey {
            upos: token.upos.clone(),
            deprel: token.deprel.clone(),
            signature,
        })
    }
}
