//! Language-specific finishing passes
//!
//! After a replacement pass, the word in front of a replaced token may no
//! longer agree with it phonologically: French `le`/`la`/`de` elide before a
//! vowel, English `a` becomes `an`. A post-processor only looks at pairs
//! whose second token was replaced in this pass, and only rewrites forms and
//! spacing flags.

use crate::config::Language;
use crate::onset::OnsetClassifier;
use crate::replace::MaskState;
use crate::tree::Sentence;
use std::fmt::Debug;
use std::sync::Arc;

pub trait SentencePostProcessor: Debug + Send + Sync {
    /// Rewrite the sentence in place. Never changes which tokens were replaced.
    fn postprocess(&self, sentence: &mut Sentence, mask: &[MaskState]);
}

/// Select the post-processor for a language
///
/// Without pronunciation data the classifier falls back to first letters.
pub fn for_language(
    language: Language,
    onsets: Option<Arc<OnsetClassifier>>,
) -> Box<dyn SentencePostProcessor> {
    let classifier =
        || onsets.unwrap_or_else(|| Arc::new(OnsetClassifier::letters_only(language)));
    match language {
        Language::French => Box::new(FrenchPostProcessor::new(classifier())),
        Language::English => Box::new(EnglishPostProcessor::new(classifier())),
        _ => Box::new(IdentityPostProcessor),
    }
}

/// Uppercase the first character
pub fn uppercase_first(form: &str) -> String {
    let mut chars = form.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Give `form` the capitalization of the first letter of `original`
fn match_case(form: &str, original: &str) -> String {
    if original.chars().next().is_some_and(char::is_uppercase) {
        uppercase_first(form)
    } else {
        form.to_string()
    }
}

/// Positions `i` whose successor was replaced in this pass
fn before_replaced(mask: &[MaskState]) -> impl Iterator<Item = usize> + '_ {
    mask.windows(2)
        .enumerate()
        .filter(|(_, pair)| pair[1] == MaskState::Replaced)
        .map(|(i, _)| i)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityPostProcessor;

impl SentencePostProcessor for IdentityPostProcessor {
    fn postprocess(&self, _sentence: &mut Sentence, _mask: &[MaskState]) {}
}

/// `le`/`la`/`de` <-> `l'`/`d'`
#[derive(Debug, Clone)]
pub struct FrenchPostProcessor {
    onsets: Arc<OnsetClassifier>,
}

impl FrenchPostProcessor {
    pub fn new(onsets: Arc<OnsetClassifier>) -> Self {
        Self { onsets }
    }

    /// Full article for an elided `l'`, from the features of its head
    fn full_article(sentence: &Sentence, pos: usize) -> Option<&'static str> {
        let head = sentence.tokens[pos]
            .head
            .and_then(|id| sentence.token(id))?;
        let feats = head.feats.as_ref()?;
        if feats.get("Number").is_some_and(|n| n == "Plur") {
            return Some("les");
        }
        match feats.get("Gender").map(String::as_str) {
            Some("Masc") => Some("le"),
            Some("Fem") => Some("la"),
            _ => None,
        }
    }
}

impl SentencePostProcessor for FrenchPostProcessor {
    fn postprocess(&self, sentence: &mut Sentence, mask: &[MaskState]) {
        for i in before_replaced(mask) {
            let form = sentence.tokens[i].form.to_lowercase();
            let elides = self.onsets.elides(&sentence.tokens[i + 1].form);

            let (new_form, space_after) = match form.as_str() {
                "le" | "la" if elides => ("l'", false),
                "de" if elides => ("d'", false),
                "l'" | "l’" if !elides => match Self::full_article(sentence, i) {
                    Some(article) => (article, true),
                    None => {
                        log::debug!("cannot expand {:?}: head has no gender", form);
                        continue;
                    }
                },
                "d'" | "d’" if !elides => ("de", true),
                _ => continue,
            };

            let tok = &mut sentence.tokens[i];
            tok.form = match_case(new_form, &tok.form);
            tok.set_space_after(space_after);
        }
    }
}

/// `a` <-> `an`
#[derive(Debug, Clone)]
pub struct EnglishPostProcessor {
    onsets: Arc<OnsetClassifier>,
}

impl EnglishPostProcessor {
    pub fn new(onsets: Arc<OnsetClassifier>) -> Self {
        Self { onsets }
    }
}

impl SentencePostProcessor for EnglishPostProcessor {
    fn postprocess(&self, sentence: &mut Sentence, mask: &[MaskState]) {
        for i in before_replaced(mask) {
            let form = sentence.tokens[i].form.to_lowercase();
            if form != "a" && form != "an" {
                continue;
            }
            let article = if self.onsets.starts_with_vowel_sound(&sentence.tokens[i + 1].form) {
                "an"
            } else {
                "a"
            };
            if article != form {
                let tok = &mut sentence.tokens[i];
                tok.form = match_case(article, &tok.form);
            }
        }
    }
}
