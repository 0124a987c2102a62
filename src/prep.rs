//! Treebank preprocessing
//!
//! One-off repairs applied to a treebank before an index is built from it,
//! so that the features the lexicon is queried with are complete.

use crate::features::Features;
use crate::tree::{Sentence, TreeError};

/// Arabic combining marks: harakat, shadda and sukun (U+064B-U+0652), the
/// combining maddah and hamza marks up to U+065F, and superscript alef (U+0670)
pub fn is_arabic_diacritic(c: char) -> bool {
    ('\u{064B}'..='\u{065F}').contains(&c) || c == '\u{0670}'
}

/// Remove Arabic diacritics from every form and lemma
pub fn strip_arabic_diacritics(sentence: &mut Sentence) {
    for tok in &mut sentence.tokens {
        tok.form.retain(|c| !is_arabic_diacritic(c));
        tok.lemma.retain(|c| !is_arabic_diacritic(c));
    }
}

/// French: copy `Number` from the head onto adjectives that lack it
///
/// Only adjectives that already carry some features are touched. Returns the
/// number of tokens changed.
pub fn infer_adjective_number(sentence: &mut Sentence) -> usize {
    let mut inferred = Vec::new();
    for (pos, tok) in sentence.tokens.iter().enumerate() {
        if tok.upos != "ADJ" {
            continue;
        }
        let Some(feats) = &tok.feats else {
            continue;
        };
        if feats.contains_key("Number") {
            continue;
        }
        let number = tok
            .head
            .and_then(|head| sentence.token(head))
            .and_then(|head| head.feats.as_ref())
            .and_then(|feats| feats.get("Number"));
        if let Some(number) = number {
            inferred.push((pos, number.clone()));
        }
    }

    for (pos, number) in &inferred {
        if let Some(feats) = sentence.tokens[*pos].feats.as_mut() {
            feats.insert("Number".to_string(), number.clone());
        }
    }
    inferred.len()
}

/// Both sides either agree on `key` or one of them leaves it unset
fn agrees(a: &Features, b: &Features, key: &str) -> bool {
    match (a.get(key), b.get(key)) {
        (Some(x), Some(y)) => x == y,
        _ => true,
    }
}

/// German: fill a missing `Case` on nouns from a determiner or preposition
///
/// The first `det` daughter is consulted; if there is none, the first
/// `case` ADP daughter. Only that one daughter is looked at even when several
/// qualify. Its `Case` is copied when gender and number agree. Returns the
/// number of tokens changed.
pub fn infer_noun_case(sentence: &mut Sentence) -> Result<usize, TreeError> {
    let mut inferred = Vec::new();
    {
        let tree = sentence.tree()?;
        for node in tree.iter() {
            let tok = node.token();
            if tok.upos != "NOUN" && tok.upos != "PROPN" {
                continue;
            }
            let Some(feats) = &tok.feats else {
                continue;
            };
            if feats.contains_key("Case") {
                continue;
            }

            let daughter = node
                .children()
                .map(|child| child.token())
                .find(|child| child.deprel == "det")
                .or_else(|| {
                    node.children()
                        .map(|child| child.token())
                        .find(|child| child.deprel == "case" && child.upos == "ADP")
                });
            let Some(daughter_feats) = daughter.and_then(|d| d.feats.as_ref()) else {
                continue;
            };

            if agrees(feats, daughter_feats, "Gender") && agrees(feats, daughter_feats, "Number") {
                if let Some(case) = daughter_feats.get("Case") {
                    inferred.push((tok.id, case.clone()));
                }
            }
        }
    }

    for (id, case) in &inferred {
        let pos = sentence.position(*id).ok_or(TreeError::NotFound(*id))?;
        if let Some(feats) = sentence.tokens[pos].feats.as_mut() {
            feats.insert("Case".to_string(), case.clone());
        }
    }
    Ok(inferred.len())
}
