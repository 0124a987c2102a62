//! Sentences and dependency trees
//!
//! A `Sentence` owns its tokens and is the only representation that is ever
//! mutated. A `DepTree` is a borrowed parent/child view derived from a
//! sentence; after changing a sentence, build a fresh view with
//! [`Sentence::tree`] instead of patching an old one.

use crate::features::Features;
use thiserror::Error;

/// 1-based token position within a sentence
pub type TokenId = usize;

/// MISC key carrying the no-space-after flag
pub const SPACE_AFTER: &str = "SpaceAfter";

/// MISC items in file order, usually `Key=Value`
pub type Misc = Vec<String>;

fn is_space_after(item: &str) -> bool {
    item.split_once('=').is_some_and(|(key, _)| key == SPACE_AFTER)
}

/// Errors raised when a sentence does not describe a well-formed tree
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("token {0} not found in tree")]
    NotFound(TokenId),

    #[error("token {id} has head {head}, which does not exist")]
    DanglingHead { id: TokenId, head: TokenId },

    #[error("sentence has no root token")]
    NoRoot,

    #[error("sentence has more than one root token ({0} and {1})")]
    MultipleRoots(TokenId, TokenId),

    #[error("token at position {position} has id {id}")]
    NonContiguousIds { position: usize, id: TokenId },
}

/// A single CoNLL-U word line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub id: TokenId,
    pub form: String,
    pub lemma: String,
    pub upos: String,
    pub xpos: Option<String>,
    /// `None` when the treebank has `_`, which is not the same as an empty map
    pub feats: Option<Features>,
    /// `None` for the root
    pub head: Option<TokenId>,
    pub deprel: String,
    pub deps: Option<String>,
    pub misc: Option<Misc>,
}

impl Token {
    /// Create a root token with no features
    pub fn new(id: TokenId, form: &str, lemma: &str, upos: &str, deprel: &str) -> Self {
        Self {
            id,
            form: form.to_string(),
            lemma: lemma.to_string(),
            upos: upos.to_string(),
            xpos: None,
            feats: None,
            head: None,
            deprel: deprel.to_string(),
            deps: None,
            misc: None,
        }
    }

    pub fn with_head(mut self, head: TokenId) -> Self {
        self.head = Some(head);
        self
    }

    pub fn with_feats(mut self, feats: Features) -> Self {
        self.feats = Some(feats);
        self
    }

    /// False iff MISC carries `SpaceAfter=No`
    pub fn space_after(&self) -> bool {
        !self
            .misc
            .as_ref()
            .is_some_and(|m| m.iter().any(|item| item == "SpaceAfter=No"))
    }

    /// Set or clear `SpaceAfter=No`, keeping the other MISC items in order.
    /// MISC becomes absent again when it empties.
    pub fn set_space_after(&mut self, space_after: bool) {
        if space_after {
            if let Some(misc) = self.misc.as_mut() {
                misc.retain(|item| !is_space_after(item));
                if misc.is_empty() {
                    self.misc = None;
                }
            }
        } else {
            let misc = self.misc.get_or_insert_with(Misc::new);
            match misc.iter_mut().find(|item| is_space_after(item)) {
                Some(item) => *item = format!("{}=No", SPACE_AFTER),
                None => misc.push(format!("{}=No", SPACE_AFTER)),
            }
        }
    }
}

/// A sentence: tokens in surface order plus comment metadata
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sentence {
    pub tokens: Vec<Token>,
    /// Comment lines in file order; `key = value` pairs, or bare comments with no value
    pub metadata: Vec<(String, Option<String>)>,
}

impl Sentence {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            metadata: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Value of a `key = value` metadata comment
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_deref())
    }

    /// Replace a metadata value in place, or append it
    pub fn set_metadata(&mut self, key: &str, value: &str) {
        match self.metadata.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = Some(value.to_string()),
            None => self
                .metadata
                .push((key.to_string(), Some(value.to_string()))),
        }
    }

    pub fn text(&self) -> Option<&str> {
        self.metadata("text")
    }

    /// Look a token up by id
    pub fn token(&self, id: TokenId) -> Option<&Token> {
        self.position(id).map(|pos| &self.tokens[pos])
    }

    /// Vector position of the token with the given id
    pub fn position(&self, id: TokenId) -> Option<usize> {
        // ids are normally contiguous, so try the direct slot first
        match id.checked_sub(1).and_then(|pos| self.tokens.get(pos)) {
            Some(tok) if tok.id == id => id.checked_sub(1),
            _ => self.tokens.iter().position(|t| t.id == id),
        }
    }

    /// Build the dependency tree view
    pub fn tree(&self) -> Result<DepTree<'_>, TreeError> {
        DepTree::build(self)
    }

    /// Surface string with every token followed by a single space
    pub fn surface(&self) -> String {
        self.tokens
            .iter()
            .map(|t| t.form.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Recompute the `text` comment from the token forms and SpaceAfter flags
    pub fn rebuild_text(&mut self) {
        let mut text = String::new();
        for tok in &self.tokens {
            text.push_str(&tok.form);
            if tok.space_after() {
                text.push(' ');
            }
        }
        let text = text.trim().to_string();
        self.set_metadata("text", &text);
    }
}

/// Parent/child view over a sentence
#[derive(Debug, Clone)]
pub struct DepTree<'s> {
    sentence: &'s Sentence,
    /// Children of each token (by vector position), in id order
    children: Vec<Vec<usize>>,
    root: usize,
}

impl<'s> DepTree<'s> {
    /// Derive the tree from the sentence's `head` fields
    pub fn build(sentence: &'s Sentence) -> Result<Self, TreeError> {
        let n = sentence.tokens.len();
        let mut children = vec![Vec::new(); n];
        let mut root = None;

        for (pos, tok) in sentence.tokens.iter().enumerate() {
            if tok.id != pos + 1 {
                return Err(TreeError::NonContiguousIds { position: pos, id: tok.id });
            }
        }

        for (pos, tok) in sentence.tokens.iter().enumerate() {
            match tok.head {
                None => match root {
                    None => root = Some(pos),
                    Some(first) => {
                        return Err(TreeError::MultipleRoots(
                            sentence.tokens[first].id,
                            tok.id,
                        ));
                    }
                },
                Some(head) => {
                    if head == 0 || head > n {
                        return Err(TreeError::DanglingHead { id: tok.id, head });
                    }
                    children[head - 1].push(pos);
                }
            }
        }

        let root = root.ok_or(TreeError::NoRoot)?;
        Ok(Self {
            sentence,
            children,
            root,
        })
    }

    pub fn sentence(&self) -> &'s Sentence {
        self.sentence
    }

    pub fn root(&self) -> Node<'_, 's> {
        Node { tree: self, pos: self.root }
    }

    /// Locate a token by depth-first search from the root
    ///
    /// Tokens that are not reachable from the root (e.g. in a head cycle) are
    /// reported as not found.
    pub fn find(&self, id: TokenId) -> Result<Node<'_, 's>, TreeError> {
        self.iter()
            .find(|node| node.id() == id)
            .ok_or(TreeError::NotFound(id))
    }

    /// Pre-order traversal from the root
    pub fn iter(&self) -> impl Iterator<Item = Node<'_, 's>> {
        let mut stack = vec![self.root];
        std::iter::from_fn(move || {
            let pos = stack.pop()?;
            stack.extend(self.children[pos].iter().rev());
            Some(Node { tree: self, pos })
        })
    }
}

/// A node of a `DepTree`
#[derive(Debug, Clone, Copy)]
pub struct Node<'t, 's> {
    tree: &'t DepTree<'s>,
    pos: usize,
}

impl<'t, 's> Node<'t, 's> {
    pub fn token(&self) -> &'s Token {
        &self.tree.sentence.tokens[self.pos]
    }

    pub fn id(&self) -> TokenId {
        self.token().id
    }

    /// Direct dependents, in id order
    pub fn children(self) -> impl Iterator<Item = Node<'t, 's>> {
        let tree = self.tree;
        tree.children[self.pos]
            .iter()
            .map(move |&pos| Node { tree, pos })
    }

    pub fn parent(self) -> Option<Node<'t, 's>> {
        self.token().head.map(|head| Node {
            tree: self.tree,
            pos: head - 1,
        })
    }
}
