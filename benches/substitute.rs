use divan::AllocProfiler;
use divan::{Bencher, black_box};
use rand::SeedableRng;
use rand::rngs::StdRng;
use ud_substitute::{
    Language, Lexicon, PatternConfig, PatternIndex, ReplacementOptions, Replacer, Sentence, Token,
    decode, replace_parallel,
};

#[global_allocator]
static ALLOC: AllocProfiler = AllocProfiler::system();

fn main() {
    divan::main();
}

const NOUNS: [&str; 8] = ["chien", "chat", "âne", "cheval", "oiseau", "arbre", "homme", "enfant"];
const VERBS: [&str; 4] = ["mange", "voit", "aime", "suit"];

/// `le N1 V le N2 .` with varying nouns and verbs
fn corpus(n: usize) -> Vec<Sentence> {
    (0..n)
        .map(|i| {
            let subj = NOUNS[i % NOUNS.len()];
            let obj = NOUNS[(i / 3) % NOUNS.len()];
            let verb = VERBS[i % VERBS.len()];
            let noun_feats = decode("Gender=Masc|Number=Sing");
            Sentence::new(vec![
                Token::new(1, "le", "le", "DET", "det").with_head(2),
                Token::new(2, subj, subj, "NOUN", "nsubj")
                    .with_head(3)
                    .with_feats(noun_feats.clone()),
                Token::new(3, verb, verb, "VERB", "root"),
                Token::new(4, "le", "le", "DET", "det").with_head(5),
                Token::new(5, obj, obj, "NOUN", "obj")
                    .with_head(3)
                    .with_feats(noun_feats),
                Token::new(6, ".", ".", "PUNCT", "punct").with_head(3),
            ])
        })
        .collect()
}

fn lexicon() -> Lexicon {
    let mut lex = Lexicon::new(Language::French);
    for noun in NOUNS {
        lex.insert("NOUN", noun, noun, decode("Gender=Masc|Number=Sing"));
        lex.insert("NOUN", noun, &format!("{}s", noun), decode("Gender=Masc|Number=Plur"));
    }
    for verb in VERBS {
        lex.insert("VERB", verb, verb, decode("_"));
    }
    lex
}

#[divan::bench(args = [1_000, 10_000])]
fn build_pattern_index(bencher: Bencher, n: usize) {
    let sentences = corpus(n);
    bencher.bench_local(|| {
        let index = PatternIndex::build(
            black_box(&sentences),
            PatternConfig::for_language(Language::French),
            None,
        )
        .unwrap();
        black_box(index.num_keys());
    });
}

#[divan::bench(args = [1_000, 10_000])]
fn replace_sequential(bencher: Bencher, n: usize) {
    let sentences = corpus(n);
    let index =
        PatternIndex::build(&sentences, PatternConfig::for_language(Language::French), None).unwrap();
    let lex = lexicon();
    let replacer = Replacer::new(Language::French, &index, Some(&lex), ReplacementOptions::default());
    bencher.bench_local(|| {
        let mut rng = StdRng::seed_from_u64(0);
        let outcome = replacer
            .replace_tokens_in_sentences(black_box(&sentences), &mut rng)
            .unwrap();
        black_box(outcome.sentences.len());
    });
}

#[divan::bench(args = [1, 4])]
fn replace_batch(bencher: Bencher, workers: usize) {
    let sentences = corpus(10_000);
    let index =
        PatternIndex::build(&sentences, PatternConfig::for_language(Language::French), None).unwrap();
    let lex = lexicon();
    let replacer = Replacer::new(Language::French, &index, Some(&lex), ReplacementOptions::default());
    bencher.bench_local(|| {
        let outcome = replace_parallel(&replacer, black_box(&sentences), workers, 0).unwrap();
        black_box(outcome.sentences.len());
    });
}
