//! Keyword-scoring classifier.
//!
//! Deterministic fallback that never fails. It also repairs invalid or
//! incomplete model output anywhere else in the pipeline.
//!
//! Scoring counts how many keywords of each list occur as a substring of
//! the normalized text. Ties (including zero/zero) go to Productive.

use tracing::debug;

use crate::classifier::normalizer::Normalizer;
use crate::classifier::types::{Classification, ClassificationResult};

/// Signals that a message needs action.
const PRODUCTIVE_KEYWORDS: &[&str] = &[
    "ajuda",
    "erro",
    "suporte",
    "solicitação",
    "solicitacao",
    "solicito",
    "pendente",
    "status",
    "problema",
    "dúvida",
    "duvida",
    "urgente",
    "requisição",
    "pedido",
    "atualização",
    "prazo",
    "acesso",
    "falha",
    "reclamação",
    "preciso",
];

/// Signals that a message needs no action.
const UNPRODUCTIVE_KEYWORDS: &[&str] = &[
    "obrigado",
    "obrigada",
    "agradeço",
    "agradecemos",
    "agradecimento",
    "parabéns",
    "parabens",
    "feliz",
    "natal",
    "boas festas",
    "felicidades",
    "ótimo trabalho",
    "abraço",
    "bom dia",
    "boa tarde",
    "cumprimentos",
];

/// Canned reply for actionable messages.
pub const PRODUCTIVE_RESPONSE: &str = "Olá! Agradecemos o seu contato. Recebemos a sua \
     solicitação e nossa equipe já está analisando o caso. Retornaremos com uma \
     atualização o mais breve possível.";

/// Canned reply for messages that need no action.
pub const UNPRODUCTIVE_RESPONSE: &str = "Olá! Muito obrigado pela sua mensagem e pelas \
     gentis palavras. Ficamos à disposição sempre que precisar.";

/// Keyword hit counts for one text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeywordScore {
    pub productive: usize,
    pub unproductive: usize,
}

impl KeywordScore {
    pub fn classification(&self) -> Classification {
        if self.productive >= self.unproductive {
            Classification::Productive
        } else {
            Classification::Unproductive
        }
    }
}

/// Canned reply for a category.
pub fn canned_response(classification: Classification) -> &'static str {
    match classification {
        Classification::Productive => PRODUCTIVE_RESPONSE,
        Classification::Unproductive => UNPRODUCTIVE_RESPONSE,
    }
}

/// Rule-based classifier.
#[derive(Debug, Clone)]
pub struct RuleClassifier {
    normalizer: Normalizer,
    productive: Vec<String>,
    unproductive: Vec<String>,
}

impl RuleClassifier {
    /// Build the classifier. Keywords go through the same normalizer as the
    /// input so that stemmed text still matches.
    pub fn new(normalizer: Normalizer) -> Self {
        Self {
            normalizer,
            productive: prepare_keywords(&normalizer, PRODUCTIVE_KEYWORDS),
            unproductive: prepare_keywords(&normalizer, UNPRODUCTIVE_KEYWORDS),
        }
    }

    /// Count keyword hits in already-normalized text.
    ///
    /// A hit is a keyword occurring as a substring of the lowercased text,
    /// inside a larger word included. Both the keywords and the text have
    /// been through the same normalizer, so stopwords and punctuation are
    /// gone on both sides and stemming, when enabled, applies to both.
    pub fn score(&self, canonical: &str) -> KeywordScore {
        let lower = canonical.to_lowercase();
        KeywordScore {
            productive: count_hits(&lower, &self.productive),
            unproductive: count_hits(&lower, &self.unproductive),
        }
    }

    /// Classify raw text. Never returns a multi-result.
    pub fn classify(&self, text: &str) -> ClassificationResult {
        let canonical = self.normalizer.normalize(text);
        let score = self.score(&canonical);
        let classification = score.classification();
        debug!(
            productive = score.productive,
            unproductive = score.unproductive,
            classification = %classification,
            "Rule-based classification"
        );
        ClassificationResult::single(classification, canned_response(classification))
    }
}

impl Default for RuleClassifier {
    fn default() -> Self {
        Self::new(Normalizer::default())
    }
}

fn prepare_keywords(normalizer: &Normalizer, keywords: &[&str]) -> Vec<String> {
    let mut prepared: Vec<String> = Vec::with_capacity(keywords.len());
    for keyword in keywords {
        let normalized = normalizer.normalize(keyword);
        // An empty keyword would match every text.
        if !normalized.is_empty() && !prepared.contains(&normalized) {
            prepared.push(normalized);
        }
    }
    prepared
}

fn count_hits(text: &str, keywords: &[String]) -> usize {
    keywords
        .iter()
        .filter(|k| text.contains(k.as_str()))
        .count()
}
