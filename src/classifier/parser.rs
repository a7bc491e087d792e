//! Completion parsing and repair.
//!
//! Turns raw model output into a [`ClassificationResult`]. Never fails:
//! anything that cannot be read is filled in by the [`RuleClassifier`].

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, warn};

use crate::classifier::rules::RuleClassifier;
use crate::classifier::types::{Classification, ClassificationItem, ClassificationResult};

/// Response text for list items that carry none.
pub const MISSING_RESPONSE_PLACEHOLDER: &str = "Sem resposta sugerida.";

/// One record of a completion. Fields of the wrong JSON type read as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CompletionRecord {
    #[serde(default, deserialize_with = "string_or_none")]
    pub classification: Option<String>,
    #[serde(default, deserialize_with = "string_or_none")]
    pub suggested_response: Option<String>,
    /// Alias some models use for `suggested_response`.
    #[serde(default, deserialize_with = "string_or_none")]
    pub response: Option<String>,
}

impl CompletionRecord {
    /// First non-blank response field, `suggested_response` preferred.
    /// The text is returned as the model wrote it.
    pub fn response_text(&self) -> Option<&str> {
        [&self.suggested_response, &self.response]
            .into_iter()
            .filter_map(|field| field.as_deref())
            .find(|text| !text.trim().is_empty())
    }
}

fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

/// Shape of a decoded completion.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedCompletion {
    SingleRecord(CompletionRecord),
    /// Object elements of an array, in order. Non-object elements are dropped.
    RecordList(Vec<CompletionRecord>),
    Unrecognized,
}

impl ParsedCompletion {
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(_) => match serde_json::from_value(value) {
                Ok(record) => Self::SingleRecord(record),
                Err(_) => Self::Unrecognized,
            },
            Value::Array(elements) => Self::RecordList(
                elements
                    .into_iter()
                    .filter(Value::is_object)
                    .filter_map(|element| serde_json::from_value(element).ok())
                    .collect(),
            ),
            _ => Self::Unrecognized,
        }
    }
}

/// Pull a JSON value out of model output.
///
/// Tries the whole text first, then the span from the first opener to the
/// last matching closer: `{`..`}` or `[`..`]`, whichever opener comes first,
/// then the other kind.
pub fn extract_json(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }

    let mut delimiters = [('{', '}'), ('[', ']')];
    delimiters.sort_by_key(|&(open, _)| trimmed.find(open).unwrap_or(usize::MAX));
    delimiters
        .into_iter()
        .filter_map(|(open, close)| json_span(trimmed, open, close))
        .find_map(|span| serde_json::from_str(span).ok())
}

fn json_span(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

/// Parse a completion into a result, repairing it with `rules` as needed.
pub fn parse_completion(
    raw: &str,
    original_text: &str,
    rules: &RuleClassifier,
) -> ClassificationResult {
    let Some(value) = extract_json(raw) else {
        warn!(
            raw_preview = %raw.chars().take(200).collect::<String>(),
            "Completion is not JSON, using rule-based classification"
        );
        return rules.classify(original_text);
    };

    match ParsedCompletion::from_value(value) {
        ParsedCompletion::SingleRecord(record) => parse_single(record, original_text, rules),
        ParsedCompletion::RecordList(records) => parse_list(records, original_text, rules),
        ParsedCompletion::Unrecognized => {
            warn!("Completion JSON has an unexpected shape, using rule-based classification");
            rules.classify(original_text)
        }
    }
}

fn parse_single(
    record: CompletionRecord,
    original_text: &str,
    rules: &RuleClassifier,
) -> ClassificationResult {
    let Some(classification) = record
        .classification
        .as_deref()
        .and_then(Classification::from_label)
    else {
        warn!(
            classification = record.classification.as_deref().unwrap_or("<missing>"),
            "Unrecognized classification, replacing with rule-based result"
        );
        return rules.classify(original_text);
    };

    match record.response_text() {
        Some(response) => ClassificationResult::single(classification, response),
        None => {
            debug!(
                classification = %classification,
                "Completion has no response text, borrowing rule-based reply"
            );
            let fallback = rules.classify(original_text);
            ClassificationResult::single(classification, fallback.suggested_response)
        }
    }
}

fn parse_list(
    records: Vec<CompletionRecord>,
    original_text: &str,
    rules: &RuleClassifier,
) -> ClassificationResult {
    let mut items: Vec<ClassificationItem> = records
        .iter()
        .zip(1u32..)
        .map(|(record, id)| ClassificationItem {
            id,
            classification: Classification::from_label_lenient(
                record.classification.as_deref().unwrap_or_default(),
            ),
            suggested_response: record
                .response_text()
                .unwrap_or(MISSING_RESPONSE_PLACEHOLDER)
                .to_string(),
        })
        .collect();

    if items.is_empty() {
        warn!("Completion list has no usable items, synthesizing one from rules");
        let fallback = rules.classify(original_text);
        items.push(ClassificationItem {
            id: 1,
            classification: fallback.classification,
            suggested_response: fallback.suggested_response,
        });
    }

    debug!(items = items.len(), "Parsed multi-item completion");
    ClassificationResult::multiple(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::rules::{PRODUCTIVE_RESPONSE, UNPRODUCTIVE_RESPONSE};

    const THANKS: &str = "Feliz natal e parabéns pelo ótimo trabalho! Obrigado";
    const SUPPORT: &str = "Preciso de ajuda com erro de status pendente no sistema";

    fn parse(raw: &str, original: &str) -> ClassificationResult {
        parse_completion(raw, original, &RuleClassifier::default())
    }

    // ── Extraction ──────────────────────────────────────────────────

    #[test]
    fn extract_direct_object() {
        let value = extract_json(r#"{"classification": "Produtivo"}"#).unwrap();
        assert_eq!(value["classification"], "Produtivo");
    }

    #[test]
    fn extract_from_markdown_block() {
        let raw = "Aqui está:\n```json\n{\"classification\": \"Improdutivo\"}\n```";
        let value = extract_json(raw).unwrap();
        assert_eq!(value["classification"], "Improdutivo");
    }

    #[test]
    fn extract_array_embedded_in_prose() {
        let raw = "Resultado: [{\"classification\": \"Produtivo\"}] fim.";
        assert!(extract_json(raw).unwrap().is_array());
    }

    #[test]
    fn extract_object_followed_by_bracketed_prose() {
        let raw = "Resultado: {\"classification\": \"Improdutivo\"} [fim]";
        let value = extract_json(raw).unwrap();
        assert_eq!(value["classification"], "Improdutivo");
    }

    #[test]
    fn extract_array_containing_objects_in_prose() {
        let raw = "Itens: [{\"classification\": \"Produtivo\"}, {\"classification\": \"Improdutivo\"}] ok";
        assert_eq!(extract_json(raw).unwrap().as_array().unwrap().len(), 2);
    }

    #[test]
    fn extract_falls_back_to_other_delimiter() {
        // The leading `[` opens no valid array; the object still parses.
        let raw = "[nota] {\"classification\": \"Produtivo\"}";
        assert!(extract_json(raw).unwrap().is_object());
    }

    #[test]
    fn extract_rejects_garbage() {
        assert!(extract_json("not json at all").is_none());
        assert!(extract_json("").is_none());
        assert!(extract_json("} backwards {").is_none());
    }

    // ── Shape dispatch ──────────────────────────────────────────────

    #[test]
    fn shapes_are_tagged() {
        assert!(matches!(
            ParsedCompletion::from_value(serde_json::json!({"classification": "x"})),
            ParsedCompletion::SingleRecord(_)
        ));
        assert!(matches!(
            ParsedCompletion::from_value(serde_json::json!([1, {"response": "a"}])),
            ParsedCompletion::RecordList(ref r) if r.len() == 1
        ));
        assert_eq!(
            ParsedCompletion::from_value(serde_json::json!(42)),
            ParsedCompletion::Unrecognized
        );
        assert_eq!(
            ParsedCompletion::from_value(Value::Null),
            ParsedCompletion::Unrecognized
        );
    }

    #[test]
    fn wrong_field_types_read_as_missing() {
        let record: CompletionRecord =
            serde_json::from_value(serde_json::json!({"classification": 7, "response": "ok"}))
                .unwrap();
        assert_eq!(record.classification, None);
        assert_eq!(record.response_text(), Some("ok"));
    }

    // ── Single record ───────────────────────────────────────────────

    #[test]
    fn well_formed_single_passes_through() {
        let raw = r#"{"classification": "Produtivo", "suggested_response": "Vamos verificar o seu chamado."}"#;
        let result = parse(raw, THANKS);
        assert_eq!(
            result,
            ClassificationResult::single(Classification::Productive, "Vamos verificar o seu chamado.")
        );
    }

    #[test]
    fn classification_case_is_canonicalized() {
        let raw = r#"{"classification": "IMPRODUTIVO", "suggested_response": "Obrigado!"}"#;
        let result = parse(raw, SUPPORT);
        assert_eq!(result.classification, Classification::Unproductive);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["classification"], "Improdutivo");
    }

    #[test]
    fn unknown_classification_is_replaced_entirely() {
        let raw = r#"{"classification": "neutral", "suggested_response": "Hmm."}"#;
        let rules = RuleClassifier::default();
        assert_eq!(
            parse_completion(raw, THANKS, &rules),
            rules.classify(THANKS)
        );
    }

    #[test]
    fn missing_classification_is_replaced_entirely() {
        let raw = r#"{"suggested_response": "Hmm."}"#;
        let result = parse(raw, SUPPORT);
        assert_eq!(result.classification, Classification::Productive);
        assert_eq!(result.suggested_response, PRODUCTIVE_RESPONSE);
    }

    #[test]
    fn empty_response_keeps_model_classification() {
        // Model says Productive, rules say Unproductive for this text.
        let raw = r#"{"classification": "Produtivo", "suggested_response": ""}"#;
        let result = parse(raw, THANKS);
        assert_eq!(result.classification, Classification::Productive);
        assert_eq!(result.suggested_response, UNPRODUCTIVE_RESPONSE);
        assert!(!result.is_multiple);
    }

    #[test]
    fn object_before_bracketed_prose_is_used() {
        let raw = "Resultado: {\"classification\": \"Improdutivo\", \"suggested_response\": \"Obrigado pelo carinho!\"} [fim]";
        let result = parse(raw, "Preciso de ajuda com erro");
        assert_eq!(result.classification, Classification::Unproductive);
        assert_eq!(result.suggested_response, "Obrigado pelo carinho!");
    }

    #[test]
    fn response_whitespace_is_preserved() {
        let raw = r#"{"classification": "Produtivo", "suggested_response": "Olá,\n\nVamos verificar.\n"}"#;
        let result = parse(raw, THANKS);
        assert_eq!(result.suggested_response, "Olá,\n\nVamos verificar.\n");
    }

    #[test]
    fn whitespace_only_response_counts_as_empty() {
        let raw = r#"{"classification": "Produtivo", "suggested_response": "  \n ", "response": " Em análise. "}"#;
        assert_eq!(parse(raw, THANKS).suggested_response, " Em análise. ");
    }

    #[test]
    fn response_alias_is_accepted() {
        let raw = r#"{"classification": "produtivo", "response": "Em análise."}"#;
        assert_eq!(parse(raw, THANKS).suggested_response, "Em análise.");
    }

    #[test]
    fn single_embedded_in_prose() {
        let raw = "Claro! {\"classification\": \"Improdutivo\", \"suggested_response\": \"Obrigado pelo carinho!\"} Espero ter ajudado.";
        let result = parse(raw, SUPPORT);
        assert_eq!(result.classification, Classification::Unproductive);
        assert_eq!(result.suggested_response, "Obrigado pelo carinho!");
    }

    // ── Fallbacks ───────────────────────────────────────────────────

    #[test]
    fn garbage_delegates_to_rules() {
        let rules = RuleClassifier::default();
        assert_eq!(
            parse_completion("not json at all", THANKS, &rules),
            rules.classify(THANKS)
        );
    }

    #[test]
    fn scalar_delegates_to_rules() {
        let rules = RuleClassifier::default();
        let result = parse_completion("\"Produtivo\"", THANKS, &rules);
        assert_eq!(result, rules.classify(THANKS));
        assert!(!result.is_multiple);
    }

    // ── Lists ───────────────────────────────────────────────────────

    #[test]
    fn list_assigns_ids_in_order() {
        let raw = r#"[
            {"classification": "Improdutivo", "suggested_response": "Obrigado!"},
            {"classification": "Produtivo", "suggested_response": "Vamos verificar."},
            {"classification": "improdutivo", "response": "Boas festas!"}
        ]"#;
        let result = parse(raw, SUPPORT);
        assert!(result.is_multiple);
        let items = result.items.as_ref().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items.iter().map(|i| i.id).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(items[2].suggested_response, "Boas festas!");
        assert_eq!(result.classification, Classification::Productive);
        assert!(result.validate().is_ok());
    }

    #[test]
    fn list_all_unproductive() {
        let raw = r#"[{"classification": "Improdutivo", "suggested_response": "a"},
                      {"classification": "spam", "suggested_response": "b"}]"#;
        let result = parse(raw, SUPPORT);
        assert_eq!(result.classification, Classification::Unproductive);
        let items = result.items.unwrap();
        assert_eq!(items[1].classification, Classification::Unproductive);
    }

    #[test]
    fn list_skips_non_records_and_fills_placeholder() {
        let raw = r#"["texto solto", {"classification": "Produtivo"}, 3]"#;
        let result = parse(raw, THANKS);
        let items = result.items.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, 1);
        assert_eq!(items[0].suggested_response, MISSING_RESPONSE_PLACEHOLDER);
    }

    #[test]
    fn empty_list_synthesizes_rule_item() {
        let result = parse("[]", THANKS);
        assert!(result.is_multiple);
        let items = result.items.as_ref().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, 1);
        assert_eq!(items[0].classification, Classification::Unproductive);
        assert_eq!(items[0].suggested_response, UNPRODUCTIVE_RESPONSE);
        assert_eq!(result.classification, Classification::Unproductive);
    }
}
