//! Portuguese text normalization for the keyword classifier.
//!
//! Strips punctuation, lowercases, drops stopwords and optionally stems.
//! The stopword set and stemmer are built once per process on first use.

use std::collections::HashSet;
use std::sync::{LazyLock, OnceLock};

use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use tracing::debug;

/// Anything that is not a word character or whitespace. `\w` is
/// Unicode-aware, so accented letters survive.
static PUNCTUATION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s]").unwrap());

static RESOURCES: OnceLock<TextResources> = OnceLock::new();

/// Portuguese stopwords.
const PORTUGUESE_STOPWORDS: &[&str] = &[
    "a", "à", "ao", "aos", "aquela", "aquelas", "aquele", "aqueles", "aquilo", "as", "às",
    "até", "com", "como", "da", "das", "de", "dela", "delas", "dele", "deles", "depois", "do",
    "dos", "e", "é", "ela", "elas", "ele", "eles", "em", "entre", "era", "eram", "éramos",
    "essa", "essas", "esse", "esses", "esta", "está", "estamos", "estão", "estar", "estas",
    "estava", "estavam", "estávamos", "este", "esteja", "estejam", "estejamos", "estes",
    "esteve", "estive", "estivemos", "estiver", "estivera", "estiveram", "estivéramos",
    "estiverem", "estivermos", "estivesse", "estivessem", "estivéssemos", "estou", "eu",
    "foi", "fomos", "for", "fora", "foram", "fôramos", "forem", "formos", "fosse", "fossem",
    "fôssemos", "fui", "há", "haja", "hajam", "hajamos", "hão", "havemos", "haver", "hei",
    "houve", "houvemos", "houver", "houvera", "houverá", "houveram", "houvéramos",
    "houverão", "houverei", "houverem", "houveremos", "houveria", "houveriam",
    "houveríamos", "houvermos", "houvesse", "houvessem", "houvéssemos", "isso", "isto", "já",
    "lhe", "lhes", "mais", "mas", "me", "mesmo", "meu", "meus", "minha", "minhas", "muito",
    "na", "não", "nas", "nem", "no", "nos", "nós", "nossa", "nossas", "nosso", "nossos",
    "num", "numa", "o", "os", "ou", "para", "pela", "pelas", "pelo", "pelos", "por", "qual",
    "quando", "que", "quem", "são", "se", "seja", "sejam", "sejamos", "sem", "ser", "será",
    "serão", "serei", "seremos", "seria", "seriam", "seríamos", "seu", "seus", "só",
    "somos", "sou", "sua", "suas", "também", "te", "tem", "tém", "temos", "tenha", "tenham",
    "tenhamos", "tenho", "terá", "terão", "terei", "teremos", "teria", "teriam", "teríamos",
    "teu", "teus", "teve", "tinha", "tinham", "tínhamos", "tive", "tivemos", "tiver",
    "tivera", "tiveram", "tivéramos", "tiverem", "tivermos", "tivesse", "tivessem",
    "tivéssemos", "tu", "tua", "tuas", "um", "uma", "você", "vocês", "vos",
];

/// Process-wide language resources.
struct TextResources {
    stopwords: HashSet<&'static str>,
    stemmer: Stemmer,
}

/// Fetch the shared resources, building them on the first call. Concurrent
/// first callers block on the same initialization.
fn resources() -> &'static TextResources {
    RESOURCES.get_or_init(|| {
        debug!(
            stopwords = PORTUGUESE_STOPWORDS.len(),
            "Loading Portuguese stopwords and stemmer"
        );
        TextResources {
            stopwords: PORTUGUESE_STOPWORDS.iter().copied().collect(),
            stemmer: Stemmer::create(Algorithm::Portuguese),
        }
    })
}

/// Text normalizer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Normalizer {
    stemming: bool,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stemming(mut self, enabled: bool) -> Self {
        self.stemming = enabled;
        self
    }

    /// Produce the canonical token string. Never fails; empty in, empty out.
    pub fn normalize(&self, text: &str) -> String {
        let resources = resources();
        let cleaned = PUNCTUATION_RE.replace_all(text, "").to_lowercase();

        let tokens: Vec<String> = cleaned
            .split_whitespace()
            .filter(|token| !resources.stopwords.contains(*token))
            .map(|token| {
                if self.stemming {
                    stem_or_keep(&resources.stemmer, token)
                } else {
                    token.to_string()
                }
            })
            .collect();

        tokens.join(" ")
    }
}

/// Stem a token, keeping it verbatim when the stemmer produces nothing.
fn stem_or_keep(stemmer: &Stemmer, token: &str) -> String {
    let stem = stemmer.stem(token);
    if stem.is_empty() {
        token.to_string()
    } else {
        stem.into_owned()
    }
}

/// Normalize without stemming.
pub fn normalize(text: &str) -> String {
    Normalizer::new().normalize(text)
}
